use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Gender of the subject a gender switch is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    /// Picks the third option of a three-way switch when one is present.
    Undefined,
}

impl Default for Gender {
    fn default() -> Self {
        Self::Undefined
    }
}

impl Gender {
    /// Which option of a gender switch with `options` choices applies.
    ///
    /// Male always takes the first option. Everything else takes the
    /// second, except `Undefined`, which takes the third when it exists.
    pub fn switch_index(&self, options: usize) -> usize {
        match self {
            Self::Male => 0,
            Self::Female => 1,
            Self::Undefined if options > 2 => 2,
            Self::Undefined => 1,
        }
    }
}

/// The NPC a dialogue belongs to.
///
/// Owned by the host and shared by reference with every dialogue instance
/// compiled for it. The dialogue sheet maps keys to raw command text and is
/// where question fallbacks and response reactions are looked up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Speaker {
    pub name: String,
    /// Speaks a language the player can't follow without a translation aid.
    #[serde(default)]
    pub speaks_unintelligible: bool,
    #[serde(default)]
    pub dialogue: FxHashMap<String, String>,
}

impl Speaker {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            speaks_unintelligible: false,
            dialogue: FxHashMap::default(),
        }
    }

    pub fn with_line(mut self, key: &str, text: &str) -> Self {
        self.dialogue.insert(key.to_string(), text.to_string());
        self
    }

    pub fn dialogue(&self, key: &str) -> Option<&str> {
        self.dialogue.get(key).map(String::as_str)
    }

    /// Load a dialogue sheet (a RON map of key to raw text) and merge it in.
    /// Keys already present are overwritten.
    pub fn load_sheet_from_ron(&mut self, path: &Path) -> Result<(), SheetError> {
        let contents = std::fs::read_to_string(path)?;
        self.merge_sheet_ron(&contents)
    }

    pub fn merge_sheet_ron(&mut self, input: &str) -> Result<(), SheetError> {
        let sheet: FxHashMap<String, String> = ron::from_str(input)?;
        self.dialogue.extend(sheet);
        Ok(())
    }
}
