//! Applying the player's answer to a question.

use crate::core::engine::Runtime;
use crate::core::host::{FlagStore, FriendshipLedger, InventorySink};
use crate::core::playback::DialogueInstance;
use crate::schema::response::{ExtraInstruction, InstructionError, ResponseOption};

/// What choosing a response did to the dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// The option isn't one of this dialogue's responses. Nothing changed.
    Ignored,
    /// An answer callback took the choice and the dialogue ended.
    Delegated,
    /// The quick reply replaced the dialogue.
    QuickReply,
    /// The response's reaction script replaced the dialogue.
    Continued,
    /// The response had no reaction script; the dialogue ended.
    Ended,
}

impl DialogueInstance {
    pub fn choose_response(
        &mut self,
        rt: &mut Runtime<'_>,
        option: &ResponseOption,
    ) -> ResponseOutcome {
        let Some(index) = self.find_response(option) else {
            return ResponseOutcome::Ignored;
        };
        let chosen = self.responses()[index].clone();

        if let Some(callback) = self.answer_callback.clone() {
            callback(&chosen);
            self.terminate();
            return ResponseOutcome::Delegated;
        }

        if chosen.is_quick() {
            let reply = self
                .quick_response_texts
                .as_ref()
                .and_then(|texts| texts.get(index))
                .cloned()
                .unwrap_or_default();
            self.replace_with(rt, &reply);
            return ResponseOutcome::QuickReply;
        }

        if chosen.friendship_delta != 0 {
            if let Some(speaker) = &self.speaker {
                rt.host.change_friendship(&speaker.name, chosen.friendship_delta);
            }
        }
        if let Some(id) = &chosen.id {
            rt.host.record_answer(id);
        }
        if let Some(extra) = &chosen.extra_argument {
            if let Err(e) = run_extra_instruction(rt, extra) {
                log::debug!("discarding response instruction '{}': {}", extra, e);
            }
        }

        let script = chosen.response_key.as_deref().and_then(|key| {
            self.speaker
                .as_ref()
                .and_then(|speaker| speaker.dialogue(key))
                .map(str::to_string)
        });
        match script {
            Some(script) => {
                self.replace_with(rt, &script);
                ResponseOutcome::Continued
            }
            None => {
                self.terminate();
                ResponseOutcome::Ended
            }
        }
    }

    /// Keyed responses match on their key; quick responses by position,
    /// identified through their display text.
    fn find_response(&self, option: &ResponseOption) -> Option<usize> {
        self.responses.as_ref()?.iter().position(|candidate| {
            match (&option.response_key, &candidate.response_key) {
                (Some(wanted), Some(key)) => wanted == key,
                (None, None) => option.display_text == candidate.display_text,
                _ => false,
            }
        })
    }

    /// Recompile this instance in place from a new script. The speaker, the
    /// finish callback and flags raised so far carry over.
    fn replace_with(&mut self, rt: &mut Runtime<'_>, raw: &str) {
        let mut next = Self::compile(
            rt,
            self.speaker.clone(),
            raw,
            self.translation_key_hint.as_deref(),
        );
        next.on_finish = self.on_finish.take();
        next.forked |= self.forked;
        *self = next;
    }
}

/// Most copies of one item a single response instruction can grant.
pub const MAX_ITEM_GRANT: u32 = 999;

/// Run a response's `verb_target_amount` instruction.
pub fn run_extra_instruction(rt: &mut Runtime<'_>, raw: &str) -> Result<(), InstructionError> {
    match raw.parse::<ExtraInstruction>()? {
        ExtraInstruction::Friendship { npc, amount } => rt.host.change_friendship(&npc, amount),
        ExtraInstruction::Mail { id } => rt.host.add_mail(&id),
        ExtraInstruction::Item { id, amount } => {
            if amount > MAX_ITEM_GRANT {
                log::debug!("capping grant of item {} from {} to {}", id, amount, MAX_ITEM_GRANT);
            }
            for _ in 0..amount.min(MAX_ITEM_GRANT) {
                if !rt.host.try_add(&id) {
                    rt.host.queue_delivery(&id);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::DialogueEngine;
    use crate::core::host::MemoryHost;
    use crate::schema::context::GameContext;
    use crate::schema::speaker::Speaker;
    use std::cell::RefCell;
    use std::rc::Rc;

    const FISH: &str = "Do you like fish?#$r fish_yes 10 101 mail_likesFish#I love it!#$r fish_no -5 102#Not really.";

    fn abigail() -> Rc<Speaker> {
        Rc::new(
            Speaker::new("Abigail")
                .with_line("fish_yes", "$h Me too!#$b#Let's go fishing sometime.")
                .with_line("fish_no", "$s Oh..."),
        )
    }

    #[test]
    fn keyed_response_continues_with_reaction() {
        let mut engine = DialogueEngine::builder().build().unwrap();
        let mut host = MemoryHost::new();
        let ctx = GameContext::default();
        {
            let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
            let mut dialogue = DialogueInstance::compile(&mut rt, Some(abigail()), FISH, None);
            assert!(dialogue.is_current_dialogue_a_question());
            let yes = dialogue.responses()[0].clone();
            assert_eq!(dialogue.choose_response(&mut rt, &yes), ResponseOutcome::Continued);
            assert_eq!(dialogue.current_text(&mut rt).as_deref(), Some("Me too!"));
            assert_eq!(dialogue.portrait_index(), 1);
            assert!(!dialogue.is_current_dialogue_a_question());
        }
        assert_eq!(host.friendship_with("Abigail"), 10);
        assert!(host.has_answered("101"));
        assert!(host.has_mail("likesFish"));
    }

    #[test]
    fn unknown_response_is_ignored() {
        let mut engine = DialogueEngine::builder().build().unwrap();
        let mut host = MemoryHost::new();
        let ctx = GameContext::default();
        {
            let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
            let mut dialogue = DialogueInstance::compile(&mut rt, Some(abigail()), FISH, None);
            let stranger = ResponseOption::keyed("fish_maybe", 3, "103", "Maybe?");
            assert_eq!(dialogue.choose_response(&mut rt, &stranger), ResponseOutcome::Ignored);
            assert!(dialogue.is_current_dialogue_a_question());
        }
        assert!(host.answered.is_empty());
    }

    #[test]
    fn missing_reaction_ends_dialogue() {
        let mut engine = DialogueEngine::builder().build().unwrap();
        let mut host = MemoryHost::new();
        let ctx = GameContext::default();
        let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
        let speaker = Rc::new(Speaker::new("Abigail"));
        let mut dialogue = DialogueInstance::compile(&mut rt, Some(speaker), FISH, None);
        let no = dialogue.responses()[1].clone();
        assert_eq!(dialogue.choose_response(&mut rt, &no), ResponseOutcome::Ended);
        assert!(dialogue.is_finished());
    }

    #[test]
    fn answer_callback_takes_over() {
        let mut engine = DialogueEngine::builder().build().unwrap();
        let mut host = MemoryHost::new();
        let ctx = GameContext::default();
        let picked = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&picked);
        {
            let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
            let mut dialogue = DialogueInstance::compile(&mut rt, Some(abigail()), FISH, None)
                .with_answer_callback(move |option| {
                    *sink.borrow_mut() = option.id.clone();
                });
            let no = dialogue.responses()[1].clone();
            assert_eq!(dialogue.choose_response(&mut rt, &no), ResponseOutcome::Delegated);
            assert!(dialogue.is_finished());
        }
        assert_eq!(picked.borrow().as_deref(), Some("102"));
        assert_eq!(host.friendship_with("Abigail"), 0);
    }

    #[test]
    fn quick_reply_replaces_dialogue() {
        let mut engine = DialogueEngine::builder().build().unwrap();
        let mut host = MemoryHost::new();
        let ctx = GameContext::default();
        let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
        let mut dialogue =
            DialogueInstance::compile(&mut rt, None, "$y 'Tea?_Yes_Here you go.*Careful._No_Suit yourself.'", None);
        assert!(dialogue.is_quick_response());
        let yes = ResponseOption::quick("Yes");
        assert_eq!(dialogue.choose_response(&mut rt, &yes), ResponseOutcome::QuickReply);
        assert_eq!(dialogue.current_text(&mut rt).as_deref(), Some("Here you go."));
        assert_eq!(dialogue.advance(&mut rt).as_deref(), Some("Careful."));
    }

    #[test]
    fn extra_instructions() {
        let mut engine = DialogueEngine::builder().seed(2).build().unwrap();
        let mut host = MemoryHost::new();
        host.inventory_capacity = Some(1);
        let ctx = GameContext::default();
        {
            let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
            run_extra_instruction(&mut rt, "friendship_Sebastian_25").unwrap();
            run_extra_instruction(&mut rt, "item_388_3").unwrap();
            assert!(matches!(
                run_extra_instruction(&mut rt, "teleport_Mines_5"),
                Err(InstructionError::UnknownVerb(_))
            ));
        }
        assert_eq!(host.friendship_with("Sebastian"), 25);
        assert_eq!(host.inventory, vec!["388".to_string()]);
        assert_eq!(host.deliveries.len(), 2);
    }

    #[test]
    fn huge_item_grant_is_capped() {
        let mut engine = DialogueEngine::builder().build().unwrap();
        let mut host = MemoryHost::new();
        host.inventory_capacity = Some(10);
        let ctx = GameContext::default();
        {
            let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
            run_extra_instruction(&mut rt, "item_1_4000000000").unwrap();
        }
        assert_eq!(host.inventory.len(), 10);
        assert_eq!(
            host.inventory.len() + host.deliveries.len(),
            MAX_ITEM_GRANT as usize
        );
    }

    #[test]
    fn failed_extra_instruction_does_not_block_response() {
        let mut engine = DialogueEngine::builder().build().unwrap();
        let mut host = MemoryHost::new();
        let ctx = GameContext::default();
        {
            let mut rt = Runtime::new(&mut engine, &ctx, &mut host);
            let mut dialogue = DialogueInstance::compile(
                &mut rt,
                Some(abigail()),
                "Well?#$r fish_no 1 200 bogus_thing#Hmm.",
                None,
            );
            let only = dialogue.responses()[0].clone();
            assert_eq!(dialogue.choose_response(&mut rt, &only), ResponseOutcome::Continued);
        }
        assert!(host.has_answered("200"));
        assert_eq!(host.friendship_with("Abigail"), 1);
    }
}
