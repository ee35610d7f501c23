//! Session configuration: readiness poll schedule and highlight palette.
//!
//! Every field has a default, so a partial JSON document is a valid config:
//!
//! ```json
//! { "poll": { "attempts": 8 }, "palette": { "active": { "background": "#ff9800" } } }
//! ```

use crate::interface::{HighlightStyle, MatchTier};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid color {value:?} in {style}.{field}")]
    InvalidColor { style: &'static str, field: &'static str, value: String },
    #[error("Invalid poll schedule: {0}")]
    InvalidSchedule(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Backoff schedule for waiting on the text layer.
///
/// Attempt `n` (1-indexed) waits `base_delay_ms + step_ms * (n - 1)` before
/// reading the surface. Defaults: 5 attempts at 200, 400, 600, 800, 1000 ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSchedule {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub step_ms: u64,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self { attempts: 5, base_delay_ms: 200, step_ms: 200 }
    }
}

impl PollSchedule {
    /// Delay before the given 1-indexed attempt
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let n = u64::from(attempt.saturating_sub(1));
        Duration::from_millis(self.base_delay_ms.saturating_add(self.step_ms.saturating_mul(n)))
    }

    /// Sum of every delay in the schedule
    pub fn total_wait(&self) -> Duration {
        (1..=self.attempts).map(|n| self.delay_before(n)).sum()
    }
}

/// Styles keyed by match tier, plus the more prominent active style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub exact: HighlightStyle,
    pub partial: HighlightStyle,
    pub word: HighlightStyle,
    pub active: HighlightStyle,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            exact: HighlightStyle::background("rgba(255, 235, 59, 0.55)"),
            partial: HighlightStyle::background("rgba(129, 212, 250, 0.55)"),
            word: HighlightStyle::background("rgba(200, 200, 200, 0.45)"),
            active: HighlightStyle {
                background: "rgba(255, 152, 0, 0.85)".to_string(),
                text_color: "#000000".to_string(),
                outline: "2px solid #e65100".to_string(),
                box_shadow: "0 0 6px rgba(230, 81, 0, 0.8)".to_string(),
            },
        }
    }
}

impl Palette {
    pub fn for_tier(&self, tier: MatchTier) -> &HighlightStyle {
        match tier {
            MatchTier::Exact => &self.exact,
            MatchTier::Partial => &self.partial,
            MatchTier::Word => &self.word,
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        let styles = [
            ("exact", &self.exact),
            ("partial", &self.partial),
            ("word", &self.word),
            ("active", &self.active),
        ];
        for (name, style) in styles {
            check_color(name, "background", &style.background)?;
            check_color(name, "text_color", &style.text_color)?;
        }
        Ok(())
    }
}

/// Empty means unset; anything else must be a CSS color.
fn check_color(style: &'static str, field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() || csscolorparser::parse(value.trim()).is_ok() {
        return Ok(());
    }
    Err(ConfigError::InvalidColor { style, field, value: value.to_string() })
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub poll: PollSchedule,
    pub palette: Palette,
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.poll.attempts == 0 {
            return Err(ConfigError::InvalidSchedule("attempts must be at least 1".into()));
        }
        self.palette.validate()
    }
}
