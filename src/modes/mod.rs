//! Feature modes
//!
//! Each mode supplies a [`ModeProfile`] that shapes the primary and research
//! requests for one feature. All modes share the same orchestration flow.

mod chat;
mod image;
mod tips;
mod traits;

pub use chat::{ChatProfile, CHAT_FALLBACK, CHAT_SYSTEM_PROMPT};
pub use image::{ImageAnalysisProfile, IMAGE_FALLBACK, IMAGE_SYSTEM_PROMPT};
pub use tips::{TipProfile, TIP_FALLBACK};
pub use traits::{ModeProfile, RESEARCH_INSTRUCTION};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Topic of a requested tip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipCategory {
    Nutrition,
    Health,
    Exercise,
    #[default]
    General,
}

impl TipCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipCategory::Nutrition => "nutrition",
            TipCategory::Health => "health",
            TipCategory::Exercise => "exercise",
            TipCategory::General => "general",
        }
    }

    pub fn all() -> [TipCategory; 4] {
        [
            TipCategory::Nutrition,
            TipCategory::Health,
            TipCategory::Exercise,
            TipCategory::General,
        ]
    }
}

impl fmt::Display for TipCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TipCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown tip category: {s}"))
    }
}

/// Which feature a query belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Chat,
    ImageAnalysis,
    Tip(TipCategory),
}

impl Mode {
    /// Request profile for this mode
    pub fn profile(&self) -> Box<dyn ModeProfile> {
        match *self {
            Mode::Chat => Box::new(ChatProfile),
            Mode::ImageAnalysis => Box::new(ImageAnalysisProfile),
            Mode::Tip(category) => Box::new(TipProfile::new(category)),
        }
    }

    /// Fixed text shown when the primary call fails
    pub fn fallback_message(&self) -> &'static str {
        self.profile().fallback_message()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().name())
    }
}
