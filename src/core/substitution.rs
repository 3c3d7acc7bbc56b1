//! String transforms applied to dialogue text.
//!
//! Gender switches and the no-portrait prefix are resolved while compiling.
//! Percent tokens, the player name and bracketed item grants depend on the
//! moment a line is shown, so playback applies them right before display.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::core::engine::{DialogueEngine, WordPool};
use crate::core::host::{DialogueHost, InventorySink};
use crate::schema::context::GameContext;
use crate::schema::line::NO_TURN_MARKER;
use crate::schema::speaker::Gender;

const BLOCK_OPEN: &str = "${";
const BLOCK_CLOSE: &str = "}$";
const SWITCH: char = '^';
const ALT_SWITCH: char = '¦';

/// Percent tokens replaced at display time.
pub const PERCENT_TOKENS: &[&str] = &[
    "%adj", "%noun", "%place", "%name", "%time", "%season", "%year", "%spouse", "%farm",
    "%favorite", "%kid1", "%kid2", "%band", "%book", "%pet", "%fork",
];

const FORK_TOKEN: &str = "%fork";

/// Character replaced with the player's name at display time.
pub const PLAYER_NAME_MARKER: char = '@';

/// Resolve every `${male^female}$` (or `${male¦female¦other}$`) block.
///
/// Blocks are replaced one at a time from left to right and do not nest.
/// An unterminated block is left untouched.
pub fn apply_gender_switch_blocks(gender: Gender, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(BLOCK_OPEN) {
        let body_start = start + BLOCK_OPEN.len();
        let Some(body_len) = rest[body_start..].find(BLOCK_CLOSE) else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(pick_gendered(gender, &rest[body_start..body_start + body_len], true));
        rest = &rest[body_start + body_len + BLOCK_CLOSE.len()..];
    }
    out.push_str(rest);
    out
}

/// Resolve a bare switch that splits the whole line.
///
/// `¦` is always honored. With `alt_only` a bare `^` is kept as literal text.
pub fn apply_gender_switch(gender: Gender, text: &str, alt_only: bool) -> String {
    if text.contains(ALT_SWITCH) || (!alt_only && text.contains(SWITCH)) {
        pick_gendered(gender, text, !alt_only).to_string()
    } else {
        text.to_string()
    }
}

fn pick_gendered(gender: Gender, text: &str, allow_caret: bool) -> &str {
    let parts: Vec<&str> = if text.contains(ALT_SWITCH) || !allow_caret {
        text.split(ALT_SWITCH).collect()
    } else {
        text.split(SWITCH).collect()
    };
    let index = gender.switch_index(parts.len()).min(parts.len() - 1);
    parts[index]
}

/// True when `text` starts with one of the percent tokens.
pub fn starts_with_percent_token(text: &str) -> bool {
    PERCENT_TOKENS.iter().any(|token| text.starts_with(token))
}

/// A leading `%` that isn't a token hides the speaker portrait. Returns the
/// text without it, or `None` when the line keeps its portrait.
pub fn strip_no_portrait_prefix(text: &str) -> Option<&str> {
    if !text.starts_with('%') || text.starts_with(NO_TURN_MARKER) || starts_with_percent_token(text)
    {
        return None;
    }
    Some(&text[1..])
}

/// Result of a percent-token pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substituted {
    pub text: String,
    /// `%fork` appeared in the text.
    pub forked: bool,
}

/// Single left-to-right pass over the percent tokens. Tokens that can't be
/// resolved in this context stay in the text verbatim.
pub fn replace_percent_tokens(
    text: &str,
    ctx: &GameContext,
    engine: &mut DialogueEngine,
) -> Substituted {
    let mut out = String::with_capacity(text.len());
    let mut forked = false;
    let mut rest = text;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match PERCENT_TOKENS.iter().find(|token| tail.starts_with(**token)) {
            Some(&FORK_TOKEN) => {
                forked = true;
                rest = &tail[FORK_TOKEN.len()..];
            }
            Some(token) => {
                match resolve_token(token, ctx, engine) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(token),
                }
                rest = &tail[token.len()..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);

    Substituted { text: out, forked }
}

fn resolve_token(token: &str, ctx: &GameContext, engine: &mut DialogueEngine) -> Option<String> {
    match token {
        "%adj" => engine.pick_word(WordPool::Adjective),
        "%noun" => engine.pick_word(WordPool::Noun),
        "%place" => engine.pick_word(WordPool::Place),
        "%name" => Some(engine.random_name(&ctx.language)),
        "%time" => Some(ctx.formatted_time()),
        "%season" => Some(ctx.season.name().to_string()),
        "%year" => Some(ctx.year.to_string()),
        "%spouse" => ctx.spouse_name.clone(),
        "%farm" => Some(ctx.farm_name.clone()),
        "%favorite" => Some(ctx.favorite_thing.clone()),
        "%kid1" => ctx.child_name(0).map(str::to_string),
        "%kid2" => ctx.child_name(1).map(str::to_string),
        "%band" => ctx.band_name.clone(),
        "%book" => ctx.book_name.clone(),
        "%pet" => ctx.pet_name.clone(),
        _ => None,
    }
}

pub fn replace_player_name(text: &str, ctx: &GameContext) -> String {
    text.replace(PLAYER_NAME_MARKER, &ctx.player_name)
}

/// Grant one random item from each `[id id ...]` bracket and remove the
/// bracket from the text. Items that don't fit are queued for delivery.
/// Empty brackets are left alone.
pub fn grant_bracket_items(text: &str, host: &mut dyn DialogueHost, rng: &mut StdRng) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let Some(len) = rest[open..].find(']') else {
            break;
        };
        let close = open + len;
        let items: Vec<&str> = rest[open + 1..close].split_whitespace().collect();
        out.push_str(&rest[..open]);
        match items.choose(rng) {
            Some(item) => {
                if !host.try_add(item) {
                    host.queue_delivery(item);
                }
            }
            None => out.push_str(&rest[open..=close]),
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out.trim().to_string()
}
