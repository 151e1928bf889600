//! Translates free-text mixing advice into a concrete filter pipeline.
//!
//! The translation is a fixed, ordered list of keyword rules evaluated over
//! the lowercased advisory text plus the measured metrics. Rule order matters
//! in two places: compression tier selection (first match wins) and the
//! low-cut frequency override (last assignment wins). Everything else is
//! independent, so multiple rules may fire for the same input.

use super::{CompressorSettings, EqBand, FilterPipeline, UserPreferences};
use crate::analysis::AudioMetrics;

/// Keywords that signal a request for mainstream, professional-grade
/// treatment and escalate every derived setting.
const PRO_KEYWORDS: &[&str] = &[
    "professional",
    "radio-ready",
    "mainstream",
    "crispy",
    "drake",
    "ovo",
];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

fn issues_mention(metrics: &AudioMetrics, needle: &str) -> bool {
    metrics
        .issues
        .iter()
        .any(|issue| issue.to_lowercase().contains(needle))
}

/// Map advisory text plus measured metrics into a filter pipeline.
///
/// Deterministic: identical inputs always yield an identical pipeline, and
/// there is no failure path — sparse or empty text produces a minimal
/// configuration rather than an error.
pub fn parse_recommendations(
    metrics: &AudioMetrics,
    advisory_text: &str,
    prefs: &UserPreferences,
) -> FilterPipeline {
    let rec = advisory_text.to_lowercase();
    let pro_mode = prefs.professional || contains_any(&rec, PRO_KEYWORDS);

    let mut pipeline = FilterPipeline {
        highpass: Some(80),
        ..Default::default()
    };

    if rec.contains("vocal") || rec.contains("voice") {
        pipeline.highpass = Some(100);
    }

    if pro_mode
        || issues_mention(metrics, "quiet")
        || contains_any(
            &rec,
            &["normalize", "bring up the level", "too quiet", "lufs"],
        )
    {
        pipeline.normalize = Some(if pro_mode { -10.0 } else { -14.0 });
    }

    if pro_mode
        || issues_mention(metrics, "clipping")
        || contains_any(&rec, &["limiter", "clipping", "peaks", "limiting"])
    {
        pipeline.limiter = Some(if pro_mode { -0.3 } else { -1.0 });
    }

    if pro_mode || contains_any(&rec, &["compress", "dynamics", "punch"]) {
        // Exactly one tier applies; professional beats gentle beats heavy.
        pipeline.compression = Some(if pro_mode {
            CompressorSettings {
                ratio: 4.0,
                threshold_db: -18.0,
                attack_ms: 8.0,
                release_ms: 100.0,
            }
        } else if contains_any(&rec, &["gentle", "subtle", "light"]) {
            CompressorSettings {
                ratio: 2.0,
                threshold_db: -18.0,
                ..Default::default()
            }
        } else if contains_any(&rec, &["heavy", "aggressive"]) {
            CompressorSettings {
                ratio: 6.0,
                threshold_db: -24.0,
                ..Default::default()
            }
        } else {
            CompressorSettings::default()
        });
    }

    if contains_any(&rec, &["de-ess", "deess", "sibilan", "harsh s"]) {
        pipeline.de_ess = Some(6000);
    }

    if contains_any(&rec, &["rumble", "low cut", "high-pass", "highpass", "mud"]) {
        // Explicit frequency requests override the vocal default; when both
        // appear, the later check wins.
        if rec.contains("100") {
            pipeline.highpass = Some(100);
        }
        if rec.contains("120") {
            pipeline.highpass = Some(120);
        }
    }

    if contains_any(&rec, &["noise", "hiss"]) {
        pipeline.noise_reduction = Some(0.15);
    }

    let mut eq: Vec<EqBand> = Vec::new();

    if contains_any(
        &rec,
        &["muddy", "boomy", "too much low", "cut the low", "200hz", "250hz"],
    ) {
        eq.push(EqBand {
            freq: 250,
            gain: -3.0,
            width: 2.0,
        });
    }

    if contains_any(&rec, &["boxy", "nasal", "400hz", "500hz"]) {
        eq.push(EqBand {
            freq: 450,
            gain: -2.5,
            width: 1.5,
        });
    }

    if pro_mode
        || contains_any(
            &rec,
            &["presence", "clarity", "cut through", "definition", "3k", "3000"],
        )
    {
        eq.push(EqBand {
            freq: 3200,
            gain: if pro_mode { 2.5 } else { 2.0 },
            width: 1.2,
        });
    }

    if pro_mode
        || contains_any(
            &rec,
            &["air", "brightness", "sparkle", "crispy", "shimmer", "10k", "12k"],
        )
    {
        eq.push(EqBand {
            freq: 12000,
            gain: if pro_mode { 3.0 } else { 2.0 },
            width: 1.5,
        });
    }

    if contains_any(&rec, &["warmth", "body", "fullness", "low mids"]) {
        eq.push(EqBand {
            freq: 180,
            gain: 1.5,
            width: 1.0,
        });
    }

    if pro_mode {
        // Professional mode always gets a minimum competent curve: presence,
        // air, and a gentle low cut, whatever the advisory text mentioned.
        if !eq.iter().any(|b| (2500..=4000).contains(&b.freq)) {
            eq.push(EqBand {
                freq: 3200,
                gain: 2.0,
                width: 1.2,
            });
        }
        if !eq.iter().any(|b| b.freq >= 10000) {
            eq.push(EqBand {
                freq: 12000,
                gain: 2.5,
                width: 1.5,
            });
        }
        if !eq.iter().any(|b| (200..=300).contains(&b.freq)) {
            eq.push(EqBand {
                freq: 250,
                gain: -2.0,
                width: 2.0,
            });
        }
    }

    if !eq.is_empty() {
        pipeline.eq = Some(eq);
    }

    pipeline
}
