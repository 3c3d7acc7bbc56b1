/// Appended to a line's text to chain it into the next line as another
/// page of the same turn.
pub const PAGE_BREAK: char = '{';

/// Marks a line during which the speaker keeps facing away.
pub const NO_TURN_MARKER: &str = "%noturn";

/// Work done when playback reaches a line, with no visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// Run an action string through the host's action runner.
    Action(String),
    /// Register a conversation topic that expires after `days`.
    Topic { id: String, days: u32 },
}

/// One entry of a compiled dialogue: display text, a side effect, or both.
///
/// An entry with empty text is side-effect only and is skipped silently
/// during playback once its effect has run.
#[derive(Debug, Clone, Default)]
pub struct CompiledLine {
    pub text: String,
    pub side_effect: Option<SideEffect>,
    /// Mail id recorded in the flag store the first time this line is shown.
    pub record_mail: Option<String>,
}

impl CompiledLine {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn effect(effect: SideEffect) -> Self {
        Self {
            side_effect: Some(effect),
            ..Self::default()
        }
    }

    pub fn is_side_effect_only(&self) -> bool {
        self.text.is_empty()
    }

    /// Neither text nor effect; never emitted by the tokenizer.
    pub fn is_noop(&self) -> bool {
        self.text.is_empty() && self.side_effect.is_none()
    }
}
