//! Engine configuration: word pools, name tables and fallback text.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::names::{NameGenerator, NameTables};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Compiled in place of a script that fails to compile.
    pub fallback_text: String,
    /// Lifetime of a `$t` topic registered without an explicit duration.
    pub topic_default_days: u32,
    pub adjectives: Vec<String>,
    pub nouns: Vec<String>,
    pub places: Vec<String>,
    /// Languages that draw `%name` from a fixed list.
    pub curated_names: FxHashMap<String, Vec<String>>,
    /// Phonotactic tables per language, layered over the built-in English set.
    pub name_tables: FxHashMap<String, NameTables>,
    pub name_denylist: Vec<String>,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            fallback_text: "...".to_string(),
            topic_default_days: 4,
            adjectives: strings(&["lovely", "shiny", "grumpy", "fluffy", "mysterious", "sturdy"]),
            nouns: strings(&["turnip", "lantern", "pebble", "teacup", "scarecrow", "accordion"]),
            places: strings(&["the mines", "the beach", "the old mill", "the saloon", "the forest"]),
            curated_names: FxHashMap::default(),
            name_tables: FxHashMap::default(),
            name_denylist: Vec::new(),
        }
    }
}

impl DialogueConfig {
    pub fn load_from_ron(path: &Path) -> Result<DialogueConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<DialogueConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    /// Build the name generator described by this configuration.
    pub fn name_generator(&self) -> NameGenerator {
        let mut generator = NameGenerator::new().with_denylist(self.name_denylist.iter().cloned());
        for (language, tables) in &self.name_tables {
            generator = generator.with_tables(language, tables.clone());
        }
        for (language, names) in &self.curated_names {
            generator = generator.with_curated(language, names.clone());
        }
        generator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_config_values() {
        let cfg = DialogueConfig::default();
        assert_eq!(cfg.fallback_text, "...");
        assert_eq!(cfg.topic_default_days, 4);
        assert!(!cfg.adjectives.is_empty());
        assert!(!cfg.nouns.is_empty());
        assert!(!cfg.places.is_empty());
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let cfg = DialogueConfig::parse_ron("(topic_default_days: 7)").unwrap();
        assert_eq!(cfg.topic_default_days, 7);
        assert_eq!(cfg.fallback_text, "...");
    }

    #[test]
    fn malformed_ron_is_an_error() {
        assert!(matches!(
            DialogueConfig::parse_ron("(topic_default_days: \"soon\")"),
            Err(ConfigError::Ron(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            DialogueConfig::load_from_ron(Path::new("tests/fixtures/does_not_exist.ron")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn load_fixture_config() {
        let cfg = DialogueConfig::load_from_ron(Path::new("tests/fixtures/dialogue_config.ron"))
            .unwrap();
        assert_eq!(cfg.fallback_text, "...");
        assert_eq!(cfg.adjectives, vec!["cheerful".to_string()]);
        assert!(cfg.curated_names.contains_key("ja"));
        assert!(cfg.name_tables.contains_key("de"));
    }

    #[test]
    fn name_generator_honors_curated_names() {
        let mut cfg = DialogueConfig::default();
        cfg.curated_names
            .insert("ja".to_string(), vec!["Haruto".to_string()]);
        let generator = cfg.name_generator();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(generator.generate("ja", &mut rng), "Haruto");
    }
}
