//! Resumable tokenizer that compiles raw dialogue text into lines.
//!
//! The raw text is split on `#` into a token stream. The compile loop walks
//! it with an explicit cursor. Several commands rewrite the stream while it
//! is being walked (conditionals splice in the chosen branch, `$p` restarts
//! from the top), so every step returns where the loop resumes instead of
//! the loop simply moving to the next segment.

use rand::Rng;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::core::engine::Runtime;
use crate::core::host::{ConditionEvaluator, FlagStore, TokenResolver};
use crate::core::substitution::{apply_gender_switch, apply_gender_switch_blocks, strip_no_portrait_prefix};
use crate::schema::command::{
    Command, CommandError, CHANCE, DEPENDING_ON_WORLD_STATE, NEVER_SKIP, NULL_FALLBACK,
    PREREQUISITE, RESPONSE, SINGLE,
};
use crate::schema::line::{CompiledLine, SideEffect, PAGE_BREAK};
use crate::schema::response::ResponseOption;
use crate::schema::speaker::Speaker;

/// Separates segments of a script.
pub const SEGMENT_DELIMITER: char = '#';

/// Separates weekly variants of a whole script.
pub const VARIANT_DELIMITER: &str = "||";

/// Separates the branches of a conditional.
pub const BRANCH_DELIMITER: char = '|';

/// Upper bound on stream rewrites in one compile, so a script whose
/// fallback refers back to itself fails instead of looping forever.
pub const MAX_SPLICES: usize = 256;

#[derive(Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("command error: {0}")]
    Command(#[from] CommandError),
    #[error("'{command}' at segment {index} needs a segment that does not exist")]
    MissingSegment { command: &'static str, index: usize },
    #[error("dialogue key '{0}' not found")]
    MissingDialogueKey(String),
    #[error("script rewrote itself more than {0} times")]
    SpliceLimit(usize),
}

/// Segments of a script with in-place rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenStream {
    segments: Vec<String>,
}

impl TokenStream {
    pub fn split(text: &str) -> Self {
        Self {
            segments: text.split(SEGMENT_DELIMITER).map(str::to_string).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    pub fn set(&mut self, index: usize, text: String) {
        if let Some(segment) = self.segments.get_mut(index) {
            *segment = text;
        }
    }

    /// Everything from `index` on, re-joined with the segment delimiter.
    pub fn rest_from(&self, index: usize) -> String {
        self.segments
            .get(index..)
            .map(|rest| rest.join("#"))
            .unwrap_or_default()
    }

    /// Replace the segments from `index` to the end with `text`, split again.
    pub fn splice_from(&mut self, index: usize, text: &str) {
        self.segments.truncate(index);
        if !text.is_empty() {
            self.segments
                .extend(text.split(SEGMENT_DELIMITER).map(str::to_string));
        }
    }

    pub fn replace_all(&mut self, text: &str) {
        self.splice_from(0, text);
    }
}

/// Output of one compile pass.
#[derive(Debug, Clone, Default)]
pub struct CompiledScript {
    pub lines: Vec<CompiledLine>,
    pub no_portrait: FxHashSet<usize>,
    pub responses: Option<Vec<ResponseOption>>,
    pub quick_response_texts: Option<Vec<String>>,
    pub interactive_at_end: bool,
    pub quick_response: bool,
}

impl CompiledScript {
    /// A single plain line, used when a script cannot be compiled at all.
    pub fn literal(text: &str) -> Self {
        Self {
            lines: vec![CompiledLine::text(text)],
            ..Self::default()
        }
    }
}

/// Pick the weekly variant of a script split on `||`.
pub fn select_weekly_variant(text: &str, days_played: u32) -> &str {
    if !text.contains(VARIANT_DELIMITER) {
        return text;
    }
    let variants: Vec<&str> = text.split(VARIANT_DELIMITER).collect();
    variants[(days_played / 7) as usize % variants.len()]
}

/// Where the compile loop goes after a step.
enum Flow {
    Next(usize),
    /// The stream was rewritten; resume at this index.
    Spliced(usize),
    Stop,
}

/// Compile a raw script into lines, responses and flags.
pub fn compile_script(
    rt: &mut Runtime<'_>,
    speaker: Option<&Speaker>,
    raw: &str,
) -> Result<CompiledScript, CompileError> {
    let resolved = rt.host.resolve(raw);
    let text = select_weekly_variant(&resolved, rt.ctx.days_played);
    let mut compiler = Compiler {
        rt,
        speaker,
        stream: TokenStream::split(text),
        out: CompiledScript::default(),
        answered_question: false,
    };
    compiler.run()?;
    Ok(compiler.out)
}

struct Compiler<'r, 'a, 's> {
    rt: &'r mut Runtime<'a>,
    speaker: Option<&'s Speaker>,
    stream: TokenStream,
    out: CompiledScript,
    /// Set by a `$q` whose answer is already recorded and whose fallback is
    /// `null`; the `$r` lines after it are not offered.
    answered_question: bool,
}

impl Compiler<'_, '_, '_> {
    fn run(&mut self) -> Result<(), CompileError> {
        let mut cursor = 0;
        let mut splices = 0;
        while cursor < self.stream.len() {
            match self.step(cursor)? {
                Flow::Next(next) => cursor = next,
                Flow::Spliced(next) => {
                    splices += 1;
                    if splices > MAX_SPLICES {
                        return Err(CompileError::SpliceLimit(MAX_SPLICES));
                    }
                    cursor = next;
                }
                Flow::Stop => break,
            }
        }
        Ok(())
    }

    fn step(&mut self, i: usize) -> Result<Flow, CompileError> {
        let raw = match self.stream.get(i) {
            Some(segment) if segment.chars().count() >= 2 => segment,
            _ => return Ok(Flow::Next(i + 1)),
        };
        let segment = apply_gender_switch_blocks(self.rt.ctx.player_gender, raw);

        let Some(command) = Command::parse(&segment)? else {
            self.push_text(&segment);
            return Ok(Flow::Next(i + 1));
        };
        log::trace!("dispatching '{}' at segment {}", command.token(), i);

        let flow = match command {
            Command::Break => {
                self.append_to_previous(PAGE_BREAK);
                Flow::Next(i + 1)
            }
            Command::Single { mail_id } => {
                if self.rt.host.has_mail(&mail_id) {
                    let repeat = self.segment(i + 3, SINGLE)?;
                    self.push_text(&repeat);
                    Flow::Next(i + 4)
                } else {
                    let first = self.segment(i + 1, SINGLE)?;
                    let index = self.out.lines.len();
                    self.push_text(&first);
                    if let Some(line) = self.out.lines.get_mut(index) {
                        line.record_mail = Some(mail_id);
                    }
                    Flow::Stop
                }
            }
            Command::Chance { probability } => {
                if self.rt.engine.rng().gen::<f64>() < probability {
                    let hit = self.segment(i + 1, CHANCE)?;
                    self.push_text(&hit);
                    Flow::Next(i + 3)
                } else {
                    Flow::Next(i + 2)
                }
            }
            Command::Action { action } => {
                self.out
                    .lines
                    .push(CompiledLine::effect(SideEffect::Action(action)));
                Flow::Next(i + 1)
            }
            Command::Topic { id, days } => {
                let days = days.unwrap_or(self.rt.engine.config().topic_default_days);
                self.out
                    .lines
                    .push(CompiledLine::effect(SideEffect::Topic { id, days }));
                Flow::Next(i + 1)
            }
            Command::Question {
                answer_ids,
                fallback,
            } => self.question(i, &answer_ids, &fallback)?,
            Command::Response {
                key,
                friendship_delta,
                id,
                extra_argument,
            } => {
                let display = self.segment(i + 1, RESPONSE)?;
                if self.answered_question {
                    return Ok(Flow::Next(i + 2));
                }
                let display = apply_gender_switch(self.rt.ctx.player_gender, &display, false);
                self.out
                    .responses
                    .get_or_insert_with(Vec::new)
                    .push(ResponseOption {
                        response_key: Some(key),
                        friendship_delta,
                        id: Some(id),
                        extra_argument,
                        display_text: display,
                    });
                self.out.interactive_at_end = true;
                Flow::Next(i + 2)
            }
            Command::Query { condition } => {
                let rest = self.stream.rest_from(i + 1);
                let (yes, no) = rest.split_once(BRANCH_DELIMITER).unwrap_or((rest.as_str(), ""));
                let chosen = if self.rt.host.check(&condition, self.rt.ctx) {
                    yes
                } else {
                    no
                };
                let chosen = chosen.to_string();
                self.stream.splice_from(i, &chosen);
                Flow::Spliced(i)
            }
            Command::Prerequisite { answer_ids } => {
                let next = self.segment(i + 1, PREREQUISITE)?;
                let answered = answer_ids.iter().any(|id| self.rt.host.has_answered(id));
                if answered {
                    let first = next.split(BRANCH_DELIMITER).next().unwrap_or_default();
                    let first = first.to_string();
                    self.stream.replace_all(&first);
                    Flow::Spliced(0)
                } else {
                    let last = next.rsplit(BRANCH_DELIMITER).next().unwrap_or_default();
                    let last = last.to_string();
                    self.stream.set(i + 1, last);
                    Flow::Next(i + 1)
                }
            }
            Command::DependingOnWorldState {
                predicate,
                argument,
            } => {
                let confirmed = self.world_state(&predicate, argument.as_deref())?;
                let rest = self.stream.rest_from(i + 1);
                let delimiter = if rest.contains(BRANCH_DELIMITER) {
                    BRANCH_DELIMITER
                } else {
                    SEGMENT_DELIMITER
                };
                let (yes, no) = rest.split_once(delimiter).unwrap_or((rest.as_str(), ""));
                let chosen = if confirmed { yes } else { no }.to_string();
                self.stream.splice_from(i, &chosen);
                Flow::Spliced(i)
            }
            Command::QuickResponse { question, pairs } => {
                self.push_text(&question);
                let (answers, replies): (Vec<_>, Vec<_>) = pairs
                    .into_iter()
                    .map(|(answer, reply)| (ResponseOption::quick(&answer), reply))
                    .unzip();
                self.out.responses = Some(answers);
                self.out.quick_response_texts = Some(replies);
                self.out.interactive_at_end = true;
                self.out.quick_response = true;
                Flow::Next(i + 1)
            }
            Command::End | Command::Kill => Flow::Next(i + 1),
        };
        Ok(flow)
    }

    fn question(
        &mut self,
        i: usize,
        answer_ids: &[String],
        fallback: &str,
    ) -> Result<Flow, CompileError> {
        self.append_to_previous(PAGE_BREAK);

        let skippable = answer_ids.first().map(String::as_str) != Some(NEVER_SKIP);
        let already_answered =
            skippable && answer_ids.iter().any(|id| self.rt.host.has_answered(id));
        if !already_answered {
            self.answered_question = false;
            self.out.interactive_at_end = true;
            return Ok(Flow::Next(i + 1));
        }

        if fallback == NULL_FALLBACK {
            // The question text still plays, but its responses are dropped
            self.answered_question = true;
            return Ok(Flow::Next(i + 1));
        }
        let script = self
            .speaker
            .and_then(|speaker| speaker.dialogue(fallback))
            .ok_or_else(|| CompileError::MissingDialogueKey(fallback.to_string()))?
            .to_string();
        self.answered_question = false;
        self.stream.splice_from(i, &script);
        Ok(Flow::Spliced(i))
    }

    fn world_state(&mut self, predicate: &str, argument: Option<&str>) -> Result<bool, CompileError> {
        let ctx = self.rt.ctx;
        let confirmed = match predicate {
            "joja" | "market" => ctx.marketplace_accessible,
            "cc" | "communitycenter" => ctx.community_hub_complete,
            "bus" => self.rt.host.has_mail("ccVault"),
            "kent" => ctx.year >= 2,
            "mail" => {
                let id = argument.ok_or(CommandError::MissingArgument {
                    command: DEPENDING_ON_WORLD_STATE,
                    argument: "mail id",
                })?;
                self.rt.host.has_mail(id)
            }
            "year" => {
                let raw = argument.ok_or(CommandError::MissingArgument {
                    command: DEPENDING_ON_WORLD_STATE,
                    argument: "year",
                })?;
                let year = raw.parse::<u32>().map_err(|_| CommandError::InvalidNumber {
                    command: DEPENDING_ON_WORLD_STATE,
                    value: raw.to_string(),
                })?;
                ctx.year >= year
            }
            other => {
                let query = match argument {
                    Some(arg) => format!("{} {}", other, arg),
                    None => other.to_string(),
                };
                self.rt.host.check(&query, ctx)
            }
        };
        Ok(confirmed)
    }

    fn segment(&self, index: usize, command: &'static str) -> Result<String, CompileError> {
        self.stream
            .get(index)
            .map(str::to_string)
            .ok_or(CompileError::MissingSegment { command, index })
    }

    /// Compile a segment as an ordinary displayable line.
    fn push_text(&mut self, segment: &str) {
        let segment = apply_gender_switch_blocks(self.rt.ctx.player_gender, segment);
        let text = apply_gender_switch(self.rt.ctx.player_gender, &segment, false);
        let (text, hides_portrait) = match strip_no_portrait_prefix(&text) {
            Some(stripped) => (stripped.to_string(), true),
            None => (text, false),
        };
        if text.is_empty() {
            return;
        }
        if hides_portrait {
            self.out.no_portrait.insert(self.out.lines.len());
        }
        self.out.lines.push(CompiledLine::text(text));
    }

    fn append_to_previous(&mut self, marker: char) {
        if let Some(line) = self.out.lines.last_mut() {
            line.text.push(marker);
        }
    }
}

/// Portrait emotion codes and their portrait indices.
const EMOTIONS: &[(&str, usize)] = &[
    ("$neutral", 0),
    ("$h", 1),
    ("$s", 2),
    ("$u", 3),
    ("$l", 4),
    ("$a", 5),
];

/// Portrait index for an emotion code such as `$h` or `$7`.
pub fn portrait_index(code: &str) -> Option<usize> {
    if let Some(&(_, index)) = EMOTIONS.iter().find(|(emotion, _)| *emotion == code) {
        return Some(index);
    }
    let digits = code.strip_prefix('$')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Split an emotion code off the front (`"$h Hi!"`) or back (`"Hi!$h"`) of
/// a line. Returns the code and the remaining text.
pub fn split_emotion_code(text: &str) -> (Option<String>, String) {
    if text.starts_with('$') {
        let (code, rest) = text
            .split_once(char::is_whitespace)
            .unwrap_or((text, ""));
        if portrait_index(code).is_some() {
            return (Some(code.to_string()), rest.trim_start().to_string());
        }
    }
    if let Some(pos) = text.rfind('$') {
        let code = &text[pos..];
        if pos > 0 && portrait_index(code).is_some() {
            return (Some(code.to_string()), text[..pos].trim_end().to_string());
        }
    }
    (None, text.to_string())
}
