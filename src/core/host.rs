//! Collaborator contracts the engine calls out to.
//!
//! The engine never touches game state directly. Each concern sits behind
//! its own narrow trait; `DialogueHost` bundles them so compilation and
//! playback can take a single `&mut dyn DialogueHost`.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::schema::context::GameContext;

/// Expands embedded reference markup before a script is compiled.
pub trait TokenResolver {
    fn resolve(&self, raw: &str) -> String {
        raw.to_string()
    }
}

/// Answers `$query` conditions and world-state predicates the engine does
/// not know itself.
pub trait ConditionEvaluator {
    fn check(&self, query: &str, ctx: &GameContext) -> bool;
}

pub trait ActionRunner {
    fn run(&mut self, action: &str) -> Result<(), String>;
}

/// Mail flags and answered-question ids for the current player.
pub trait FlagStore {
    fn has_mail(&self, id: &str) -> bool;
    fn add_mail(&mut self, id: &str);
    fn has_answered(&self, id: &str) -> bool;
    fn record_answer(&mut self, id: &str);
}

pub trait EventPlayer {
    /// Try to start a scripted event. Returns true when it started and
    /// takes over the rest of the conversation.
    fn play(&mut self, event_id: &str, check_precondition: bool, check_seen: bool) -> bool;
}

pub trait InventorySink {
    fn try_add(&mut self, item: &str) -> bool;
    /// Fallback when the inventory is full.
    fn queue_delivery(&mut self, item: &str);
}

pub trait TopicRegistry {
    fn add_topic(&mut self, id: &str, days: u32);
}

pub trait FriendshipLedger {
    fn change_friendship(&mut self, npc: &str, delta: i32);
}

pub trait DialogueHost:
    TokenResolver
    + ConditionEvaluator
    + ActionRunner
    + FlagStore
    + EventPlayer
    + InventorySink
    + TopicRegistry
    + FriendshipLedger
{
}

impl<T> DialogueHost for T where
    T: TokenResolver
        + ConditionEvaluator
        + ActionRunner
        + FlagStore
        + EventPlayer
        + InventorySink
        + TopicRegistry
        + FriendshipLedger
{
}

/// In-memory host that records everything it is asked to do.
///
/// Backs the preview tool and the test suites.
#[derive(Debug, Default, Clone)]
pub struct MemoryHost {
    /// `<<name>>` markup resolved before compilation.
    pub tokens: FxHashMap<String, String>,
    /// Conditions that evaluate to true; everything else is false.
    pub true_conditions: FxHashSet<String>,
    pub mail: FxHashSet<String>,
    pub answered: FxHashSet<String>,
    pub actions: Vec<String>,
    pub failing_actions: FxHashSet<String>,
    /// Events that will start when asked to play.
    pub playable_events: FxHashSet<String>,
    pub played_events: Vec<String>,
    pub inventory: Vec<String>,
    pub inventory_capacity: Option<usize>,
    pub deliveries: Vec<String>,
    pub topics: Vec<(String, u32)>,
    pub friendship: FxHashMap<String, i32>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mail(mut self, id: &str) -> Self {
        self.mail.insert(id.to_string());
        self
    }

    pub fn with_answer(mut self, id: &str) -> Self {
        self.answered.insert(id.to_string());
        self
    }

    pub fn with_condition(mut self, query: &str) -> Self {
        self.true_conditions.insert(query.to_string());
        self
    }

    pub fn with_token(mut self, name: &str, value: &str) -> Self {
        self.tokens.insert(name.to_string(), value.to_string());
        self
    }

    pub fn friendship_with(&self, npc: &str) -> i32 {
        self.friendship.get(npc).copied().unwrap_or(0)
    }
}

impl TokenResolver for MemoryHost {
    fn resolve(&self, raw: &str) -> String {
        let mut text = raw.to_string();
        for (name, value) in &self.tokens {
            text = text.replace(&format!("<<{}>>", name), value);
        }
        text
    }
}

impl ConditionEvaluator for MemoryHost {
    fn check(&self, query: &str, _ctx: &GameContext) -> bool {
        self.true_conditions.contains(query.trim())
    }
}

impl ActionRunner for MemoryHost {
    fn run(&mut self, action: &str) -> Result<(), String> {
        if self.failing_actions.contains(action) {
            return Err(format!("action '{}' is not recognized", action));
        }
        self.actions.push(action.to_string());
        Ok(())
    }
}

impl FlagStore for MemoryHost {
    fn has_mail(&self, id: &str) -> bool {
        self.mail.contains(id)
    }

    fn add_mail(&mut self, id: &str) {
        self.mail.insert(id.to_string());
    }

    fn has_answered(&self, id: &str) -> bool {
        self.answered.contains(id)
    }

    fn record_answer(&mut self, id: &str) {
        self.answered.insert(id.to_string());
    }
}

impl EventPlayer for MemoryHost {
    fn play(&mut self, event_id: &str, _check_precondition: bool, _check_seen: bool) -> bool {
        if self.playable_events.contains(event_id) {
            self.played_events.push(event_id.to_string());
            true
        } else {
            false
        }
    }
}

impl InventorySink for MemoryHost {
    fn try_add(&mut self, item: &str) -> bool {
        if let Some(capacity) = self.inventory_capacity {
            if self.inventory.len() >= capacity {
                return false;
            }
        }
        self.inventory.push(item.to_string());
        true
    }

    fn queue_delivery(&mut self, item: &str) {
        self.deliveries.push(item.to_string());
    }
}

impl TopicRegistry for MemoryHost {
    fn add_topic(&mut self, id: &str, days: u32) {
        self.topics.push((id.to_string(), days));
    }
}

impl FriendshipLedger for MemoryHost {
    fn change_friendship(&mut self, npc: &str, delta: i32) {
        *self.friendship.entry(npc.to_string()).or_insert(0) += delta;
    }
}
