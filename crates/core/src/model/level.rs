use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LevelError {
    #[error("unknown CEFR level: {0}")]
    UnknownLevel(String),

    #[error("unknown test section: {0}")]
    UnknownSection(String),
}

//
// ─── CEFR LEVEL ────────────────────────────────────────────────────────────────
//

/// Ordered CEFR proficiency band used as the adaptive unit of granularity.
///
/// The ordering `A1 < A2 < B1 < B2 < C1` is load-bearing: level adaptation
/// and final scoring both rely on `Ord` and on `up`/`down` stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
}

impl CefrLevel {
    /// All levels from lowest to highest.
    pub const ORDER: [CefrLevel; 5] = [
        CefrLevel::A1,
        CefrLevel::A2,
        CefrLevel::B1,
        CefrLevel::B2,
        CefrLevel::C1,
    ];

    /// Position within [`CefrLevel::ORDER`], 0 for A1.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            CefrLevel::A1 => 0,
            CefrLevel::A2 => 1,
            CefrLevel::B1 => 2,
            CefrLevel::B2 => 3,
            CefrLevel::C1 => 4,
        }
    }

    /// The next level up, saturating at C1.
    #[must_use]
    pub fn up(self) -> CefrLevel {
        Self::ORDER[(self.index() + 1).min(Self::ORDER.len() - 1)]
    }

    /// The next level down, saturating at A1.
    #[must_use]
    pub fn down(self) -> CefrLevel {
        Self::ORDER[self.index().saturating_sub(1)]
    }

    /// Number of bands between two levels.
    #[must_use]
    pub fn distance(self, other: CefrLevel) -> usize {
        self.index().abs_diff(other.index())
    }

    #[must_use]
    pub fn is_top(self) -> bool {
        self == CefrLevel::C1
    }

    #[must_use]
    pub fn is_bottom(self) -> bool {
        self == CefrLevel::A1
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CefrLevel {
    type Err = LevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A1" => Ok(CefrLevel::A1),
            "A2" => Ok(CefrLevel::A2),
            "B1" => Ok(CefrLevel::B1),
            "B2" => Ok(CefrLevel::B2),
            "C1" => Ok(CefrLevel::C1),
            other => Err(LevelError::UnknownLevel(other.to_owned())),
        }
    }
}

//
// ─── TEST SECTION ──────────────────────────────────────────────────────────────
//

/// Skill section of the placement test.
///
/// Sections rotate in the fixed [`Section::ROTATION`] order while the test
/// runs, and each receives its own level estimate at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    Grammar,
    Vocabulary,
    Reading,
    Listening,
}

impl Section {
    /// Fixed rotation order of sections during the test.
    pub const ROTATION: [Section; 4] = [
        Section::Grammar,
        Section::Vocabulary,
        Section::Reading,
        Section::Listening,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Section::Grammar => "grammar",
            Section::Vocabulary => "vocabulary",
            Section::Reading => "reading",
            Section::Listening => "listening",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = LevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grammar" => Ok(Section::Grammar),
            "vocabulary" => Ok(Section::Vocabulary),
            "reading" => Ok(Section::Reading),
            "listening" => Ok(Section::Listening),
            other => Err(LevelError::UnknownSection(other.to_owned())),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
