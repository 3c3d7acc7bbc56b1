//! Playback of a compiled dialogue.
//!
//! A `DialogueInstance` walks its lines one at a time. Lines with no text
//! are side effects and run invisibly on the way to the next visible line.
//! Substitutions that depend on the moment of display (percent tokens,
//! item grants, event directives, the cipher) happen when a line is
//! prepared, not when it is compiled.

use rustc_hash::FxHashSet;
use std::fmt;
use std::rc::Rc;

use crate::core::cipher::convert_to_dwarvish;
use crate::core::engine::Runtime;
use crate::core::host::{ActionRunner, EventPlayer, FlagStore, TopicRegistry};
use crate::core::substitution::{grant_bracket_items, replace_percent_tokens, replace_player_name};
use crate::core::tokenizer::{compile_script, portrait_index, split_emotion_code, CompiledScript};
use crate::schema::command::PLAY_EVENT;
use crate::schema::line::{CompiledLine, SideEffect, NO_TURN_MARKER, PAGE_BREAK};
use crate::schema::response::ResponseOption;
use crate::schema::speaker::Speaker;

/// Where playback of an instance stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing(usize),
    AwaitingResponse(usize),
    Finished,
}

/// A compiled dialogue plus its playback position.
///
/// Cloning deep-copies lines and responses; the speaker and callbacks are
/// shared.
#[derive(Clone)]
pub struct DialogueInstance {
    pub(crate) lines: Vec<CompiledLine>,
    pub(crate) no_portrait: FxHashSet<usize>,
    pub(crate) responses: Option<Vec<ResponseOption>>,
    pub(crate) quick_response_texts: Option<Vec<String>>,
    pub(crate) cursor: usize,
    pub(crate) current_emotion: Option<String>,
    pub(crate) interactive_at_end: bool,
    pub(crate) quick_response: bool,
    pub(crate) continued_on_next_page: bool,
    pub(crate) dont_face_speaker: bool,
    pub(crate) forked: bool,
    pub(crate) translation_key_hint: Option<String>,
    pub(crate) speaker: Option<Rc<Speaker>>,
    pub(crate) on_finish: Option<Rc<dyn Fn()>>,
    pub(crate) answer_callback: Option<Rc<dyn Fn(&ResponseOption)>>,
    /// Text of the current line once prepared for display.
    prepared: Option<String>,
    finish_notified: bool,
}

impl fmt::Debug for DialogueInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogueInstance")
            .field("lines", &self.lines)
            .field("responses", &self.responses)
            .field("cursor", &self.cursor)
            .field("current_emotion", &self.current_emotion)
            .field("interactive_at_end", &self.interactive_at_end)
            .field("continued_on_next_page", &self.continued_on_next_page)
            .field("translation_key_hint", &self.translation_key_hint)
            .field("speaker", &self.speaker.as_ref().map(|s| s.name.as_str()))
            .finish_non_exhaustive()
    }
}

/// What preparing the current line produced.
enum Prepared {
    Text(String),
    /// The line resolved to nothing; move on.
    Skip,
    /// An event took over the rest of the conversation.
    Terminate,
}

impl DialogueInstance {
    /// Compile `raw` for `speaker`. A script that fails to compile is logged
    /// and replaced by the configured fallback text.
    pub fn compile(
        rt: &mut Runtime<'_>,
        speaker: Option<Rc<Speaker>>,
        raw: &str,
        translation_key_hint: Option<&str>,
    ) -> Self {
        let script = match compile_script(rt, speaker.as_deref(), raw) {
            Ok(script) => script,
            Err(e) => {
                log::warn!(
                    "failed to compile dialogue for {} (key {}): {}",
                    speaker.as_ref().map_or("<none>", |s| s.name.as_str()),
                    translation_key_hint.unwrap_or("<none>"),
                    e
                );
                let fallback = rt.engine.config().fallback_text.clone();
                compile_script(rt, speaker.as_deref(), &fallback)
                    .unwrap_or_else(|_| CompiledScript::literal(&fallback))
            }
        };
        Self::from_script(script, speaker, translation_key_hint.map(str::to_string))
    }

    fn from_script(
        script: CompiledScript,
        speaker: Option<Rc<Speaker>>,
        translation_key_hint: Option<String>,
    ) -> Self {
        let mut instance = Self {
            lines: script.lines,
            no_portrait: script.no_portrait,
            responses: script.responses,
            quick_response_texts: script.quick_response_texts,
            cursor: 0,
            current_emotion: None,
            interactive_at_end: script.interactive_at_end,
            quick_response: script.quick_response,
            continued_on_next_page: false,
            dont_face_speaker: false,
            forked: false,
            translation_key_hint,
            speaker,
            on_finish: None,
            answer_callback: None,
            prepared: None,
            finish_notified: false,
        };
        instance.finalize();
        instance
    }

    /// Called once, when playback moves past the last visible line.
    pub fn with_on_finish(mut self, callback: impl Fn() + 'static) -> Self {
        self.on_finish = Some(Rc::new(callback));
        self
    }

    /// Hand response choices to the host instead of handling them here.
    pub fn with_answer_callback(mut self, callback: impl Fn(&ResponseOption) + 'static) -> Self {
        self.answer_callback = Some(Rc::new(callback));
        self
    }

    pub fn lines(&self) -> &[CompiledLine] {
        &self.lines
    }

    pub fn responses(&self) -> &[ResponseOption] {
        self.responses.as_deref().unwrap_or(&[])
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn speaker(&self) -> Option<&Speaker> {
        self.speaker.as_deref()
    }

    pub fn translation_key_hint(&self) -> Option<&str> {
        self.translation_key_hint.as_deref()
    }

    pub fn current_emotion(&self) -> Option<&str> {
        self.current_emotion.as_deref()
    }

    /// Portrait index for the current line. No emotion code means neutral.
    pub fn portrait_index(&self) -> usize {
        self.current_emotion
            .as_deref()
            .and_then(portrait_index)
            .unwrap_or(0)
    }

    /// The current line is shown without the speaker's portrait.
    pub fn hides_portrait(&self) -> bool {
        self.no_portrait.contains(&self.cursor)
    }

    pub fn is_continued_on_next_page(&self) -> bool {
        self.continued_on_next_page
    }

    pub fn dont_face_speaker(&self) -> bool {
        self.dont_face_speaker
    }

    /// `%fork` appeared in a line shown so far.
    pub fn forked(&self) -> bool {
        self.forked
    }

    pub fn is_quick_response(&self) -> bool {
        self.quick_response
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.lines.len()
    }

    pub fn state(&self) -> PlaybackState {
        if self.is_finished() {
            PlaybackState::Finished
        } else if self.is_current_dialogue_a_question() {
            PlaybackState::AwaitingResponse(self.cursor)
        } else {
            PlaybackState::Playing(self.cursor)
        }
    }

    /// True only on the last line of a dialogue that ends in a question.
    pub fn is_current_dialogue_a_question(&self) -> bool {
        self.interactive_at_end && !self.lines.is_empty() && self.cursor == self.lines.len() - 1
    }

    /// No line after the current one has visible text.
    pub fn is_on_final_dialogue(&self) -> bool {
        self.lines
            .iter()
            .skip(self.cursor + 1)
            .all(CompiledLine::is_side_effect_only)
    }

    /// Text of the current line, prepared for display.
    ///
    /// Side-effect lines at the cursor run and are skipped first. Preparation
    /// happens once per line; later calls return the same text.
    pub fn current_text(&mut self, rt: &mut Runtime<'_>) -> Option<String> {
        loop {
            if let Some(text) = &self.prepared {
                return Some(text.clone());
            }
            self.run_leading_side_effects(rt);
            if self.is_finished() {
                return None;
            }
            match self.prepare(rt) {
                Prepared::Text(text) => {
                    self.prepared = Some(text.clone());
                    return Some(text);
                }
                Prepared::Skip => self.step_forward(),
                Prepared::Terminate => {
                    self.terminate();
                    return None;
                }
            }
        }
    }

    /// Move past the current line.
    ///
    /// Returns the next line's text when the line just left was continued on
    /// the next page, so the box stays open. Returns `None` when the box
    /// should close.
    pub fn advance(&mut self, rt: &mut Runtime<'_>) -> Option<String> {
        if self.is_finished() {
            return None;
        }
        // The line being left may not have been shown yet
        self.run_leading_side_effects(rt);
        if self.is_finished() {
            self.notify_finish();
            return None;
        }
        if self.is_on_final_dialogue() {
            self.notify_finish();
        }
        let was_continued = self.continued_on_next_page;
        self.step_forward();
        if self.is_finished() {
            return None;
        }
        if self.lines[self.cursor..]
            .iter()
            .all(CompiledLine::is_side_effect_only)
        {
            // Trailing side effects run now; nothing is left to show
            self.current_text(rt);
            return None;
        }
        if was_continued {
            self.current_text(rt)
        } else {
            None
        }
    }

    /// Re-read the per-line flags and emotion for the line at the cursor.
    pub(crate) fn finalize(&mut self) {
        self.continued_on_next_page = false;
        self.dont_face_speaker = false;
        self.current_emotion = None;
        let Some(line) = self.lines.get_mut(self.cursor) else {
            return;
        };

        if line.text.contains(PAGE_BREAK) {
            line.text = line.text.replace(PAGE_BREAK, "");
            self.continued_on_next_page = true;
        }
        if line.text.contains(NO_TURN_MARKER) {
            line.text = line.text.replace(NO_TURN_MARKER, "").trim().to_string();
            self.dont_face_speaker = true;
        }
        let (emotion, text) = split_emotion_code(&line.text);
        if emotion.is_some() {
            line.text = text;
            self.current_emotion = emotion;
        }
    }

    fn step_forward(&mut self) {
        self.prepared = None;
        if self.cursor + 1 < self.lines.len() {
            self.cursor += 1;
            self.finalize();
        } else {
            self.cursor = self.lines.len();
        }
    }

    pub(crate) fn terminate(&mut self) {
        self.prepared = None;
        self.cursor = self.lines.len();
    }

    fn notify_finish(&mut self) {
        if self.finish_notified {
            return;
        }
        self.finish_notified = true;
        if let Some(callback) = &self.on_finish {
            callback();
        }
    }

    /// Run and step past side-effect lines until the cursor rests on a
    /// visible line or the end.
    fn run_leading_side_effects(&mut self, rt: &mut Runtime<'_>) {
        while !self.is_finished() && self.lines[self.cursor].is_side_effect_only() {
            self.run_side_effect(rt);
            self.step_forward();
        }
    }

    fn run_side_effect(&self, rt: &mut Runtime<'_>) {
        match &self.lines[self.cursor].side_effect {
            Some(SideEffect::Action(action)) => {
                if let Err(e) = rt.host.run(action) {
                    log::warn!("dialogue action '{}' failed: {}", action, e);
                }
            }
            Some(SideEffect::Topic { id, days }) => rt.host.add_topic(id, *days),
            None => {}
        }
    }

    fn prepare(&mut self, rt: &mut Runtime<'_>) -> Prepared {
        let text = self.lines[self.cursor].text.clone();

        if let Some(args) = event_directive(&text) {
            return self.play_event(rt, args);
        }
        if let Some(mail) = self.lines[self.cursor].record_mail.take() {
            rt.host.add_mail(&mail);
        }

        let text = grant_bracket_items(&text, &mut *rt.host, rt.engine.rng());
        let substituted = replace_percent_tokens(&text, rt.ctx, rt.engine);
        self.forked |= substituted.forked;
        let mut text = replace_player_name(&substituted.text, rt.ctx);

        let unintelligible = self
            .speaker
            .as_ref()
            .is_some_and(|speaker| speaker.speaks_unintelligible);
        if unintelligible && !rt.ctx.understands_unintelligible {
            text = convert_to_dwarvish(&text);
        }
        Prepared::Text(text)
    }

    /// `$v <eventId> [checkPrecondition] [checkSeen]`
    fn play_event(&mut self, rt: &mut Runtime<'_>, args: &str) -> Prepared {
        let mut words = args.split_whitespace();
        let Some(event_id) = words.next() else {
            log::warn!("event directive without an event id");
            return Prepared::Skip;
        };
        let check_precondition = words.next().map_or(true, |w| w != "false");
        let check_seen = words.next().map_or(true, |w| w != "false");
        if rt.host.play(event_id, check_precondition, check_seen) {
            Prepared::Terminate
        } else {
            Prepared::Skip
        }
    }
}

fn event_directive(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(PLAY_EVENT)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}
