/// Playback and response integration tests: full conversations against an
/// in-memory host.

use dialogue_engine::core::cipher::convert_to_dwarvish;
use dialogue_engine::core::engine::{DialogueEngine, Runtime};
use dialogue_engine::core::host::MemoryHost;
use dialogue_engine::core::playback::{DialogueInstance, PlaybackState};
use dialogue_engine::core::responses::ResponseOutcome;
use dialogue_engine::schema::context::{GameContext, Season};
use dialogue_engine::schema::response::ResponseOption;
use dialogue_engine::schema::speaker::{Gender, Speaker};
use std::path::Path;
use std::rc::Rc;

fn abigail() -> Rc<Speaker> {
    let mut speaker = Speaker::new("Abigail");
    speaker
        .load_sheet_from_ron(Path::new("tests/fixtures/abigail.ron"))
        .unwrap();
    Rc::new(speaker)
}

fn engine() -> DialogueEngine {
    DialogueEngine::builder()
        .seed(42)
        .config_path("tests/fixtures/dialogue_config.ron")
        .build()
        .unwrap()
}

fn start(rt: &mut Runtime<'_>, speaker: &Rc<Speaker>, key: &str) -> DialogueInstance {
    let raw = speaker.dialogue(key).unwrap().to_string();
    DialogueInstance::compile(rt, Some(Rc::clone(speaker)), &raw, Some(key))
}

#[test]
fn fish_question_full_conversation() {
    let speaker = abigail();
    let mut engine = engine();
    let mut host = MemoryHost::new();
    let ctx = GameContext::default();
    {
        let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
        let mut dialogue = start(&mut rt, &speaker, "Tue");

        assert_eq!(dialogue.current_text(&mut rt).as_deref(), Some("Do you like fish?"));
        assert_eq!(dialogue.state(), PlaybackState::AwaitingResponse(0));

        let yes = dialogue.responses()[0].clone();
        assert_eq!(yes.display_text, "Love it!");
        assert_eq!(dialogue.choose_response(&mut rt, &yes), ResponseOutcome::Continued);

        assert_eq!(dialogue.state(), PlaybackState::Playing(0));
        assert_eq!(dialogue.current_text(&mut rt).as_deref(), Some("Me too!"));
        assert_eq!(dialogue.portrait_index(), 1);
        assert_eq!(
            dialogue.advance(&mut rt).as_deref(),
            Some("We should go fishing at the pier sometime.")
        );
        assert_eq!(dialogue.advance(&mut rt), None);
        assert_eq!(dialogue.state(), PlaybackState::Finished);
    }
    assert_eq!(host.friendship_with("Abigail"), 10);
    assert!(host.answered.contains("101"));
    assert!(host.mail.contains("abbyLikesFish"));
}

#[test]
fn answered_question_is_never_interactive() {
    let speaker = abigail();
    let mut engine = engine();
    let mut host = MemoryHost::new().with_answer("101");
    let ctx = GameContext::default();
    let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
    let mut dialogue = start(&mut rt, &speaker, "Tue");
    while !dialogue.is_finished() {
        assert!(!dialogue.is_current_dialogue_a_question());
        dialogue.current_text(&mut rt);
        dialogue.advance(&mut rt);
    }
}

#[test]
fn question_gating_only_at_last_line() {
    let mut engine = engine();
    let mut host = MemoryHost::new();
    let ctx = GameContext::default();
    let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
    let mut dialogue = DialogueInstance::compile(
        &mut rt,
        None,
        "Hey there.#Got a second?#$q -1 null#Help me out?#$r help 5 900#Sure.#$r nope -5 901#No.",
        None,
    );
    let mut flags = Vec::new();
    while !dialogue.is_finished() && !dialogue.is_current_dialogue_a_question() {
        flags.push(dialogue.is_current_dialogue_a_question());
        dialogue.current_text(&mut rt);
        dialogue.advance(&mut rt);
    }
    assert_eq!(flags, vec![false, false]);
    assert!(dialogue.is_current_dialogue_a_question());
    assert_eq!(dialogue.current_text(&mut rt).as_deref(), Some("Help me out?"));
    assert_eq!(dialogue.responses().len(), 2);
}

#[test]
fn choosing_unknown_response_changes_nothing() {
    let speaker = abigail();
    let mut engine = engine();
    let mut host = MemoryHost::new();
    let ctx = GameContext::default();
    {
        let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
        let mut dialogue = start(&mut rt, &speaker, "Tue");
        let bogus = ResponseOption::keyed("fish_maybe", 50, "103", "Maybe");
        assert_eq!(dialogue.choose_response(&mut rt, &bogus), ResponseOutcome::Ignored);
        assert_eq!(dialogue.state(), PlaybackState::AwaitingResponse(0));
    }
    assert_eq!(host.friendship_with("Abigail"), 0);
}

#[test]
fn quick_response_plays_inline_reply() {
    let speaker = abigail();
    let mut engine = engine();
    let mut host = MemoryHost::new();
    let ctx = GameContext::default();
    let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
    let mut dialogue = start(&mut rt, &speaker, "Sat");
    assert_eq!(dialogue.current_text(&mut rt).as_deref(), Some("Want to play a game?"));
    assert!(dialogue.is_quick_response());

    let no = ResponseOption::quick("No thanks");
    assert_eq!(dialogue.choose_response(&mut rt, &no), ResponseOutcome::QuickReply);
    assert_eq!(dialogue.current_text(&mut rt).as_deref(), Some("Fine, be that way."));
    assert_eq!(dialogue.portrait_index(), 2);
    assert_eq!(dialogue.advance(&mut rt), None);
    assert!(dialogue.is_finished());
}

#[test]
fn bracket_item_is_granted_on_display() {
    let speaker = abigail();
    let mut engine = engine();
    let mut host = MemoryHost::new();
    let ctx = GameContext::default();
    {
        let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
        let mut dialogue = start(&mut rt, &speaker, "Fri");
        assert_eq!(
            dialogue.current_text(&mut rt).as_deref(),
            Some("I found this in the mines.")
        );
        // Preparing again must not grant a second item
        dialogue.current_text(&mut rt);
        assert_eq!(
            dialogue.advance(&mut rt).as_deref(),
            Some("Take it, I have plenty.")
        );
    }
    assert_eq!(host.inventory.len(), 1);
    assert!(["66", "68", "70"].contains(&host.inventory[0].as_str()));
}

#[test]
fn seasonal_line_runs_side_effects_and_flags() {
    let speaker = abigail();
    let mut engine = engine();
    let mut host = MemoryHost::new();
    let ctx = GameContext {
        season: Season::Summer,
        player_gender: Gender::Female,
        ..GameContext::default()
    };
    {
        let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
        let mut dialogue = start(&mut rt, &speaker, "summer_1");
        assert_eq!(
            dialogue.current_text(&mut rt).as_deref(),
            Some("It's summer already, ma'am.")
        );
        assert_eq!(dialogue.advance(&mut rt), None);
        assert_eq!(
            dialogue.current_text(&mut rt).as_deref(),
            Some("I'm watching the sky.")
        );
        assert!(dialogue.dont_face_speaker());
    }
    assert_eq!(host.actions, vec!["AddMoney 50".to_string()]);
    assert_eq!(host.topics, vec![("summer_start".to_string(), 3)]);
}

#[test]
fn introduction_records_mail_and_greets_player_by_name() {
    let speaker = abigail();
    let mut engine = engine();
    let mut host = MemoryHost::new();
    let ctx = GameContext {
        player_name: "Robin".to_string(),
        ..GameContext::default()
    };
    {
        let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
        let mut first = start(&mut rt, &speaker, "Introduction");
        assert_eq!(first.portrait_index(), 1);
        first.current_text(&mut rt);
        let mut second = start(&mut rt, &speaker, "Introduction");
        assert_eq!(
            second.current_text(&mut rt).as_deref(),
            Some("Hey, Robin. Back again?")
        );
    }
    assert!(host.mail.contains("metAbigail"));
}

#[test]
fn on_finish_runs_after_last_visible_line() {
    let mut engine = engine();
    let mut host = MemoryHost::new();
    let ctx = GameContext::default();
    let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
    let finished = Rc::new(std::cell::Cell::new(false));
    let flag = Rc::clone(&finished);
    let mut dialogue = DialogueInstance::compile(&mut rt, None, "One.#$b#Two.#$action Wave", None)
        .with_on_finish(move || flag.set(true));
    assert_eq!(dialogue.advance(&mut rt).as_deref(), Some("Two."));
    assert!(!finished.get());
    assert_eq!(dialogue.advance(&mut rt), None);
    assert!(finished.get());
    assert!(dialogue.is_finished());
}

#[test]
fn dwarvish_is_not_idempotent() {
    for sample in ["Hello, farmer.", "I see you.", "a"] {
        let once = convert_to_dwarvish(sample);
        assert_ne!(convert_to_dwarvish(&once), once);
    }
}

#[test]
fn fork_flag_is_raised_when_shown() {
    let mut engine = engine();
    let mut host = MemoryHost::new();
    let ctx = GameContext::default();
    let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
    let mut dialogue = DialogueInstance::compile(&mut rt, None, "Decide.%fork", None);
    assert!(!dialogue.forked());
    assert_eq!(dialogue.current_text(&mut rt).as_deref(), Some("Decide."));
    assert!(dialogue.forked());
}
