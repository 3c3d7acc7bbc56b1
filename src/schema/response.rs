use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum InstructionError {
    #[error("empty instruction")]
    Empty,
    #[error("unknown instruction verb '{0}'")]
    UnknownVerb(String),
    #[error("instruction '{0}' is missing its target")]
    MissingTarget(String),
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),
}

/// A selectable answer to a question line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseOption {
    /// Dialogue key of the reaction script. `None` marks a quick response,
    /// which is matched by position and carries its reply inline.
    pub response_key: Option<String>,
    pub friendship_delta: i32,
    /// Recorded as answered when chosen, so later questions can skip ahead.
    pub id: Option<String>,
    /// `verb_target_amount` instruction run when the response is accepted.
    pub extra_argument: Option<String>,
    pub display_text: String,
}

impl ResponseOption {
    pub fn keyed(key: &str, friendship_delta: i32, id: &str, display_text: &str) -> Self {
        Self {
            response_key: Some(key.to_string()),
            friendship_delta,
            id: Some(id.to_string()),
            extra_argument: None,
            display_text: display_text.to_string(),
        }
    }

    pub fn quick(display_text: &str) -> Self {
        Self {
            response_key: None,
            friendship_delta: 0,
            id: None,
            extra_argument: None,
            display_text: display_text.to_string(),
        }
    }

    pub fn is_quick(&self) -> bool {
        self.response_key.is_none()
    }
}

/// Parsed form of a response's extra argument.
///
/// Written as `verb_target_amount`:
/// - `friendship_<npc>_<amount>` changes friendship with another NPC
/// - `mail_<id>` adds a mail flag (the id may itself contain underscores)
/// - `item_<id>_<amount>` grants items
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraInstruction {
    Friendship { npc: String, amount: i32 },
    Mail { id: String },
    Item { id: String, amount: u32 },
}

impl FromStr for ExtraInstruction {
    type Err = InstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(InstructionError::Empty);
        }
        let (verb, rest) = s.split_once('_').unwrap_or((s, ""));
        match verb.to_lowercase().as_str() {
            "friendship" | "friend" => {
                let (npc, amount) = split_target_amount(s, rest)?;
                let amount = amount
                    .parse::<i32>()
                    .map_err(|_| InstructionError::InvalidAmount(amount.to_string()))?;
                Ok(Self::Friendship {
                    npc: npc.to_string(),
                    amount,
                })
            }
            "mail" => {
                if rest.is_empty() {
                    return Err(InstructionError::MissingTarget(s.to_string()));
                }
                Ok(Self::Mail {
                    id: rest.to_string(),
                })
            }
            "item" => {
                let (id, amount) = split_target_amount(s, rest)?;
                let amount = amount
                    .parse::<u32>()
                    .map_err(|_| InstructionError::InvalidAmount(amount.to_string()))?;
                Ok(Self::Item {
                    id: id.to_string(),
                    amount,
                })
            }
            other => Err(InstructionError::UnknownVerb(other.to_string())),
        }
    }
}

fn split_target_amount<'a>(
    whole: &str,
    rest: &'a str,
) -> Result<(&'a str, &'a str), InstructionError> {
    match rest.rsplit_once('_') {
        Some((target, amount)) if !target.is_empty() => Ok((target, amount)),
        _ => Err(InstructionError::MissingTarget(whole.to_string())),
    }
}
