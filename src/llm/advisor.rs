//! High-level advisory text facade: hosted provider with local fallback.

use super::fallback::{local_analysis, local_chat};
use super::provider::{CompletionOptions, LlmProvider};
use crate::analysis::{format_metrics_for_prompt, AudioMetrics};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// System prompt establishing the mix-engineer persona for chat.
const SYSTEM_PROMPT: &str = "You are Engnr, an elite AI mix engineer who delivers mainstream, \
radio-ready, professional studio quality. Your mixes are known for being crispy, punchy, and \
polished: crystal-clear highs, controlled low-mids, intimate vocal presence, and professional \
loudness targets. Give EXACT settings (ratios, thresholds, attack/release times, EQ frequencies, \
gain amounts, Q values), recommend signal chains in order, and explain why a setting works. You \
can analyze audio and recommend changes but you cannot apply them through chat; processing \
happens only when the user confirms it.";

/// Per-request chat behavior flags.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatModes {
    /// Brief, 2-3 sentence answers.
    pub fast: bool,
    /// Comprehensive, in-depth guidance. Also accepted as `webSearch`, the
    /// key older clients send for this mode.
    #[serde(alias = "webSearch")]
    pub detailed: bool,
    /// Analyze attached lyrics for flow and structure.
    pub lyric_verify: bool,
}

impl ChatModes {
    /// Fast and detailed conflict; fast wins.
    fn resolved(mut self) -> Self {
        if self.fast && self.detailed {
            self.detailed = false;
        }
        self
    }
}

/// Generates advisory text, preferring the hosted provider and degrading to
/// the deterministic local generator on any failure. Callers always get a
/// usable string.
pub struct Advisor {
    provider: Option<Arc<dyn LlmProvider>>,
    timeout: Duration,
}

impl Advisor {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Generate a mixing/mastering critique for measured metrics.
    pub async fn generate_analysis(
        &self,
        metrics: &AudioMetrics,
        reference_context: &str,
        vision_context: &str,
    ) -> String {
        if let Some(provider) = &self.provider {
            let prompt = format!(
                "{}\n\nYou are analyzing an uploaded audio file for professional \
                 treatment.{}{}\n\n{}\n\nProvide a professional studio analysis: a quick \
                 assessment, critical issues, and a concrete processing chain with exact \
                 settings (compression ratio/threshold/attack/release, EQ frequencies and \
                 gains, limiting, loudness target). Be specific with numbers.",
                SYSTEM_PROMPT,
                reference_context,
                vision_context,
                format_metrics_for_prompt(metrics)
            );

            let options = CompletionOptions {
                timeout: self.timeout,
                ..Default::default()
            };

            match provider.generate(&prompt, &options).await {
                Ok(text) => return text,
                Err(e) => {
                    warn!(provider = provider.name(), "Analysis generation failed, using local fallback: {}", e);
                }
            }
        }

        local_analysis(metrics, reference_context, vision_context)
    }

    /// Generate a free-form chat reply.
    pub async fn generate_chat(
        &self,
        prompt: &str,
        modes: ChatModes,
        lyrics: &str,
        history: &[String],
    ) -> String {
        let modes = modes.resolved();

        if let Some(provider) = &self.provider {
            let mut full_prompt = String::from(SYSTEM_PROMPT);
            if modes.fast {
                full_prompt.push_str(
                    "\n\nMODE: FAST - Be extremely brief. Quick, actionable advice in 2-3 \
                     sentences max.",
                );
            } else if modes.detailed {
                full_prompt.push_str(
                    "\n\nMODE: DETAILED - Provide comprehensive, in-depth guidance with \
                     specific techniques, exact settings, and common mistakes to avoid.",
                );
            } else if modes.lyric_verify && !lyrics.is_empty() {
                full_prompt.push_str(&format!(
                    "\n\nMODE: LYRIC ANALYSIS - Analyze these lyrics for flow, rhythm, \
                     syllable structure and rhyme scheme:\n{}",
                    lyrics
                ));
            }

            for line in history {
                full_prompt.push('\n');
                full_prompt.push_str(line);
            }

            full_prompt.push_str(&format!("\n\nUser: {}\nAssistant:", prompt));

            let options = CompletionOptions {
                max_tokens: if modes.fast { 200 } else { 1024 },
                timeout: self.timeout,
                ..Default::default()
            };

            match provider.generate(&full_prompt, &options).await {
                Ok(text) => return text,
                Err(e) => {
                    warn!(provider = provider.name(), "Chat generation failed, using local fallback: {}", e);
                }
            }
        }

        local_chat(prompt, &modes)
    }
}
