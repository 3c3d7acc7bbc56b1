/// Dialogue Linter: validates speaker dialogue sheets.
///
/// Usage: dialogue_linter <sheet_or_dir>

use dialogue_engine::core::substitution::apply_gender_switch_blocks;
use dialogue_engine::core::tokenizer::{portrait_index, SEGMENT_DELIMITER, VARIANT_DELIMITER};
use dialogue_engine::schema::command::{Command, NULL_FALLBACK, PLAY_EVENT};
use dialogue_engine::schema::speaker::{Gender, Speaker};
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: dialogue_linter <sheet_or_dir>");
        process::exit(0);
    }

    let sheet_path = Path::new(&args[1]);
    let mut sheets = Vec::new();

    if sheet_path.is_file() {
        match load_sheet(sheet_path) {
            Ok(speaker) => sheets.push(speaker),
            Err(e) => {
                eprintln!("ERROR: Failed to load dialogue sheet: {}", e);
                process::exit(1);
            }
        }
    } else if sheet_path.is_dir() {
        load_sheets_recursive(sheet_path, &mut sheets);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", args[1]);
        process::exit(1);
    }

    let line_count: usize = sheets.iter().map(|s| s.dialogue.len()).sum();
    println!("Loaded {} sheets with {} dialogue keys", sheets.len(), line_count);

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for speaker in &sheets {
        lint_sheet(speaker, &mut errors, &mut warnings);
    }

    println!("\n=== Dialogue Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

/// The sheet's file stem names the speaker.
fn load_sheet(path: &Path) -> Result<Speaker, String> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    let mut speaker = Speaker::new(name);
    speaker.load_sheet_from_ron(path).map_err(|e| e.to_string())?;
    Ok(speaker)
}

fn load_sheets_recursive(dir: &Path, sheets: &mut Vec<Speaker>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                load_sheets_recursive(&path, sheets);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                match load_sheet(&path) {
                    Ok(speaker) => {
                        println!("  Loaded: {}", path.display());
                        sheets.push(speaker);
                    }
                    Err(e) => {
                        eprintln!("  ERROR loading {}: {}", path.display(), e);
                    }
                }
            }
        }
    }
}

fn lint_sheet(speaker: &Speaker, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let mut keys: Vec<&String> = speaker.dialogue.keys().collect();
    keys.sort();

    for key in keys {
        let raw = &speaker.dialogue[key];
        let location = format!("{}:{}", speaker.name, key);

        for variant in raw.split(VARIANT_DELIMITER) {
            let segments: Vec<String> = variant
                .split(SEGMENT_DELIMITER)
                .map(|s| apply_gender_switch_blocks(Gender::Male, s))
                .collect();

            for (i, segment) in segments.iter().enumerate() {
                if !segment.starts_with('$') {
                    continue;
                }
                match Command::parse(segment) {
                    Err(e) => errors.push(format!("{} segment {}: {}", location, i, e)),
                    Ok(Some(Command::Question { fallback, .. })) => {
                        if fallback != NULL_FALLBACK && speaker.dialogue(&fallback).is_none() {
                            errors.push(format!(
                                "{} segment {}: question fallback '{}' is not a key of this sheet",
                                location, i, fallback
                            ));
                        }
                    }
                    Ok(Some(Command::Response { key: response_key, .. })) => {
                        if segments.get(i + 1).is_none() {
                            errors.push(format!(
                                "{} segment {}: response '{}' has no display text",
                                location, i, response_key
                            ));
                        }
                        if speaker.dialogue(&response_key).is_none() {
                            warnings.push(format!(
                                "{} segment {}: response '{}' has no reaction script, choosing it ends the conversation",
                                location, i, response_key
                            ));
                        }
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        let word = segment.split_whitespace().next().unwrap_or_default();
                        let code = word.trim_end_matches(|c: char| !c.is_alphanumeric());
                        if code != PLAY_EVENT && portrait_index(code).is_none() {
                            warnings.push(format!(
                                "{} segment {}: unknown command '{}' will be shown as text",
                                location, i, word
                            ));
                        }
                    }
                }
            }
        }
    }
}
