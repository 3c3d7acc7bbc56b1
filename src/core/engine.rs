//! The dialogue engine: configuration, name generation and the seeded RNG
//! shared by every compile and playback call.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

use crate::core::config::{ConfigError, DialogueConfig};
use crate::core::host::DialogueHost;
use crate::core::names::NameGenerator;
use crate::core::playback::DialogueInstance;
use crate::schema::context::GameContext;
use crate::schema::speaker::Speaker;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Word pools behind `%adj`, `%noun` and `%place`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordPool {
    Adjective,
    Noun,
    Place,
}

/// Owns everything random or configurable. Built via `DialogueEngine::builder()`.
pub struct DialogueEngine {
    config: DialogueConfig,
    names: NameGenerator,
    rng: StdRng,
    seed: u64,
}

/// Builder for constructing a `DialogueEngine`.
pub struct DialogueEngineBuilder {
    seed: u64,
    config_path: Option<PathBuf>,
    /// Directly provided config (for testing without files).
    config: Option<DialogueConfig>,
}

/// Everything a compile or playback step borrows for its duration.
pub struct Runtime<'a> {
    pub engine: &'a mut DialogueEngine,
    pub ctx: &'a GameContext,
    pub host: &'a mut dyn DialogueHost,
}

impl<'a> Runtime<'a> {
    pub fn new(
        engine: &'a mut DialogueEngine,
        ctx: &'a GameContext,
        host: &'a mut dyn DialogueHost,
    ) -> Self {
        Self { engine, ctx, host }
    }
}

impl DialogueEngine {
    pub fn builder() -> DialogueEngineBuilder {
        DialogueEngineBuilder {
            seed: 0,
            config_path: None,
            config: None,
        }
    }

    pub fn config(&self) -> &DialogueConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Generate a name for the given language.
    pub fn random_name(&mut self, language: &str) -> String {
        self.names.generate(language, &mut self.rng)
    }

    /// Pick a word from one of the configured pools. `None` when the pool is empty.
    pub fn pick_word(&mut self, pool: WordPool) -> Option<String> {
        let words = match pool {
            WordPool::Adjective => &self.config.adjectives,
            WordPool::Noun => &self.config.nouns,
            WordPool::Place => &self.config.places,
        };
        words.choose(&mut self.rng).cloned()
    }

    /// Compile a raw script for a speaker. Never fails: a malformed script
    /// compiles to the configured fallback text.
    pub fn compile(
        &mut self,
        ctx: &GameContext,
        host: &mut dyn DialogueHost,
        speaker: Option<Rc<Speaker>>,
        raw: &str,
        translation_key_hint: Option<&str>,
    ) -> DialogueInstance {
        let mut rt = Runtime::new(self, ctx, host);
        DialogueInstance::compile(&mut rt, speaker, raw, translation_key_hint)
    }
}

impl DialogueEngineBuilder {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Provide the config directly (for testing without files).
    pub fn config(mut self, config: DialogueConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<DialogueEngine, EngineError> {
        // A config file wins over a directly supplied config
        let config = match self.config_path {
            Some(ref path) => DialogueConfig::load_from_ron(path)?,
            None => self.config.unwrap_or_default(),
        };
        let names = config.name_generator();

        Ok(DialogueEngine {
            config,
            names,
            rng: StdRng::seed_from_u64(self.seed),
            seed: self.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::host::MemoryHost;

    #[test]
    fn builder_with_seed() {
        let engine = DialogueEngine::builder().seed(12345).build().unwrap();
        assert_eq!(engine.seed(), 12345);
        assert_eq!(engine.config().fallback_text, "...");
    }

    #[test]
    fn builder_with_config_path() {
        let engine = DialogueEngine::builder()
            .config_path("tests/fixtures/dialogue_config.ron")
            .build()
            .unwrap();
        assert_eq!(engine.config().adjectives, vec!["cheerful".to_string()]);
    }

    #[test]
    fn builder_missing_config_file_fails() {
        let result = DialogueEngine::builder()
            .config_path("tests/fixtures/nope.ron")
            .build();
        assert!(matches!(result, Err(EngineError::Config(ConfigError::Io(_)))));
    }

    #[test]
    fn same_seed_same_words() {
        let mut a = DialogueEngine::builder().seed(7).build().unwrap();
        let mut b = DialogueEngine::builder().seed(7).build().unwrap();
        for _ in 0..10 {
            assert_eq!(a.pick_word(WordPool::Noun), b.pick_word(WordPool::Noun));
            assert_eq!(a.random_name("en"), b.random_name("en"));
        }
    }

    #[test]
    fn empty_pool_yields_none() {
        let config = DialogueConfig {
            places: Vec::new(),
            ..DialogueConfig::default()
        };
        let mut engine = DialogueEngine::builder().config(config).build().unwrap();
        assert_eq!(engine.pick_word(WordPool::Place), None);
    }

    #[test]
    fn convenience_compile() {
        let mut engine = DialogueEngine::builder().seed(1).build().unwrap();
        let mut host = MemoryHost::new();
        let ctx = GameContext::default();
        let dialogue = engine.compile(&ctx, &mut host, None, "Hello there.", None);
        assert_eq!(dialogue.lines().len(), 1);
    }
}
