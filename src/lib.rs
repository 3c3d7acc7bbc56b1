//! Dialogue Engine: NPC conversation scripting for games.
//!
//! Compiles compact, author-written dialogue strings with inline commands
//! (page breaks, conditionals, random rolls, questions and responses,
//! gender switches, portrait emotions) into an ordered list of display
//! lines with attached side effects, then plays that list back as the
//! player advances through the conversation.

pub mod core;
pub mod schema;
