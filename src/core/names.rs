//! Procedural name generator for `%name` and other random names.
//!
//! Builds pronounceable names by alternating consonant clusters and vowels
//! from per-language phonotactic tables, or picks from a curated list for
//! languages whose names don't fit those tables.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Language code whose tables are used when no other tables match.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Names substituted when a generated name trips the denylist.
const SAFE_NAMES: [&str; 2] = ["Bobo", "Wumbus"];

const BUILTIN_DENYLIST: &[&str] = &[
    "sex", "rape", "cum", "taint", "tit", "dick", "cock", "puss", "porn", "fuk", "fuc", "shit",
    "damn", "kkk", "nazi", "poop", "piss",
];

/// Phonotactic tables for one language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameTables {
    pub starting_consonants: Vec<String>,
    pub consonants: Vec<String>,
    pub vowels: Vec<String>,
    /// Appended now and then when the name ends on a consonant.
    pub consonant_endings: Vec<String>,
    /// Suffixes keyed by the final letter of the name.
    #[serde(default)]
    pub suffixes: FxHashMap<String, Vec<String>>,
}

impl NameTables {
    pub fn english() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let suffixes = [
            ("a", &["nie", "bell", "bo", "boo", "bella", "s"][..]),
            ("e", &["ll", "llo", "o"][..]),
            ("i", &["ck", "e", "bo", "ba", "lo", "la", "to", "ta", "no", "na", "ni", "a", "o", "zor", "que", "ca", "co", "mi"][..]),
            ("o", &["nie", "ze", "dy", "da", "o", "ver", "la", "lo", "s", "ny", "mo", "ra"][..]),
            ("u", &["rt", "mo", "s"][..]),
        ]
        .into_iter()
        .map(|(letter, endings)| (letter.to_string(), strings(endings)))
        .collect();

        Self {
            starting_consonants: strings(&[
                "B", "Br", "J", "F", "S", "M", "C", "Ch", "L", "P", "K", "W", "G", "Z", "Tr", "T",
                "Gr", "Fr", "Pr", "N", "Sn", "R", "Sh", "St",
            ]),
            consonants: strings(&["ll", "tch", "l", "m", "n", "p", "r", "s", "t", "c", "rt", "ts"]),
            vowels: strings(&["a", "e", "i", "o", "u"]),
            consonant_endings: strings(&["ie", "o", "a", "ers", "ley"]),
            suffixes,
        }
    }
}

/// Generates names for the `%name` token.
#[derive(Debug, Clone)]
pub struct NameGenerator {
    tables: FxHashMap<String, NameTables>,
    curated: FxHashMap<String, Vec<String>>,
    denylist: Vec<String>,
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl NameGenerator {
    pub fn new() -> Self {
        let mut tables = FxHashMap::default();
        tables.insert(DEFAULT_LANGUAGE.to_string(), NameTables::english());
        Self {
            tables,
            curated: FxHashMap::default(),
            denylist: BUILTIN_DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Register (or replace) the phonotactic tables for a language.
    pub fn with_tables(mut self, language: &str, tables: NameTables) -> Self {
        self.tables.insert(language.to_string(), tables);
        self
    }

    /// Use a curated name list for a language instead of the generator.
    pub fn with_curated(mut self, language: &str, names: Vec<String>) -> Self {
        self.curated.insert(language.to_string(), names);
        self
    }

    pub fn with_denylist<I: IntoIterator<Item = String>>(mut self, extra: I) -> Self {
        self.denylist
            .extend(extra.into_iter().map(|word| word.to_lowercase()));
        self
    }

    pub fn generate(&self, language: &str, rng: &mut StdRng) -> String {
        if let Some(name) = self
            .curated
            .get(language)
            .and_then(|names| names.choose(rng))
        {
            return name.clone();
        }

        let tables = self
            .tables
            .get(language)
            .or_else(|| self.tables.get(DEFAULT_LANGUAGE));
        let name = match tables {
            Some(tables) => build_name(tables, rng),
            None => String::new(),
        };
        self.filter(name, rng)
    }

    /// Replace a name containing a denylisted substring with a safe one.
    fn filter(&self, name: String, rng: &mut StdRng) -> String {
        let lower = name.to_lowercase();
        if name.is_empty() || self.denylist.iter().any(|bad| lower.contains(bad.as_str())) {
            return SAFE_NAMES[rng.gen_range(0..SAFE_NAMES.len())].to_string();
        }
        name
    }
}

fn build_name(tables: &NameTables, rng: &mut StdRng) -> String {
    let target_len = rng.gen_range(3..6);
    let mut name = pick(&tables.starting_consonants, rng);
    let mut next_is_vowel = true;

    while name.chars().count() < target_len {
        let pool = if next_is_vowel {
            &tables.vowels
        } else {
            &tables.consonants
        };
        let part = pick(pool, rng);
        if part.is_empty() {
            break;
        }
        name.push_str(&part);
        next_is_vowel = !next_is_vowel;
    }

    match name.chars().last() {
        Some(last) if is_vowel(last) => {
            let key = last.to_lowercase().to_string();
            if let Some(endings) = tables.suffixes.get(&key) {
                if rng.gen_bool(0.5) {
                    name.push_str(&pick(endings, rng));
                }
            }
        }
        Some(_) => {
            if rng.gen_bool(0.3) {
                name.push_str(&pick(&tables.consonant_endings, rng));
            }
        }
        None => {}
    }

    harden(&name)
}

fn pick(pool: &[String], rng: &mut StdRng) -> String {
    pool.choose(rng).cloned().unwrap_or_default()
}

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Soft `c` and `g` between vowels get a hardening consonant so the name
/// reads the way it was built: "Lucie" becomes "Luckie", "Agie" "Aghie".
pub fn harden(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 2);
    for (i, &c) in chars.iter().enumerate() {
        out.push(c);
        if i == 0 || i + 1 >= chars.len() || !is_vowel(chars[i - 1]) {
            continue;
        }
        let next = chars[i + 1].to_ascii_lowercase();
        match c {
            'c' if matches!(next, 'e' | 'i' | 'y') => out.push('k'),
            'g' if matches!(next, 'e' | 'i') => out.push('h'),
            _ => {}
        }
    }
    out
}
