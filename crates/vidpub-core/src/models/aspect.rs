use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Coarse orientation bucket derived from a video's display aspect ratio.
///
/// Only used to pick a storage key prefix; never persisted on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectClass {
    Landscape,
    Portrait,
    Other,
}

impl AspectClass {
    /// Classify a display aspect ratio string such as `"16:9"`.
    ///
    /// Only the exact strings `16:9` and `9:16` are recognised; everything else,
    /// including ratios that reduce to the same value (`32:18`), is `Other`.
    pub fn from_ratio(ratio: &str) -> Self {
        match ratio {
            "16:9" => AspectClass::Landscape,
            "9:16" => AspectClass::Portrait,
            _ => AspectClass::Other,
        }
    }

    /// Path segment used as storage key prefix, including the trailing slash.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape/",
            AspectClass::Portrait => "portrait/",
            AspectClass::Other => "other/",
        }
    }
}

impl Display for AspectClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AspectClass::Landscape => write!(f, "landscape"),
            AspectClass::Portrait => write!(f, "portrait"),
            AspectClass::Other => write!(f, "other"),
        }
    }
}
