pub mod analysis;
pub mod config;
pub mod conversation_store;
pub mod llm;
pub mod processing;
pub mod server;
pub mod session;
