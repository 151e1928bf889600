//! Advisory text generation.
//!
//! A trait-based provider abstraction for hosted language models, plus a
//! deterministic local fallback so the analysis flow always completes even
//! with no model configured or reachable.

mod advisor;
mod fallback;
mod hosted;
mod provider;

pub use advisor::{Advisor, ChatModes};
pub use fallback::{local_analysis, local_chat};
pub use hosted::HostedProvider;
pub use provider::{CompletionOptions, LlmError, LlmProvider};
