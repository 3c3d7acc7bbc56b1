//! The closed set of inline dialogue commands.
//!
//! A segment starting with `$` is a command when its first word is one of
//! the tokens below; anything else (including emotion codes like `$h` and
//! the `$v` event directive) is ordinary line text.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("command '{command}' is missing its {argument} argument")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("command '{command}' has an invalid number '{value}'")]
    InvalidNumber {
        command: &'static str,
        value: String,
    },
    #[error("quick response list must be a question followed by answer/reply pairs, got {0} entries")]
    MalformedQuickResponse(usize),
}

pub const BREAK: &str = "$b";
pub const SINGLE: &str = "$1";
pub const CHANCE: &str = "$c";
pub const ACTION: &str = "$action";
pub const TOPIC: &str = "$t";
pub const QUESTION: &str = "$q";
pub const RESPONSE: &str = "$r";
pub const QUERY: &str = "$query";
pub const PREREQUISITE: &str = "$p";
pub const DEPENDING_ON_WORLD_STATE: &str = "$d";
pub const QUICK_RESPONSE: &str = "$y";
pub const END: &str = "$e";
pub const KILL: &str = "$k";

/// Display-time directive that hands the conversation to a scripted event.
pub const PLAY_EVENT: &str = "$v";

/// Answer-id list that disables the already-answered check of a question.
pub const NEVER_SKIP: &str = "-1";

/// Fallback reference meaning "no fallback script".
pub const NULL_FALLBACK: &str = "null";

/// A parsed command with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Break,
    Single {
        mail_id: String,
    },
    Chance {
        probability: f64,
    },
    Action {
        action: String,
    },
    Topic {
        id: String,
        days: Option<u32>,
    },
    Question {
        answer_ids: Vec<String>,
        fallback: String,
    },
    Response {
        key: String,
        friendship_delta: i32,
        id: String,
        extra_argument: Option<String>,
    },
    Query {
        condition: String,
    },
    Prerequisite {
        answer_ids: Vec<String>,
    },
    DependingOnWorldState {
        predicate: String,
        argument: Option<String>,
    },
    QuickResponse {
        question: String,
        pairs: Vec<(String, String)>,
    },
    End,
    Kill,
}

impl Command {
    /// Parse a segment. `Ok(None)` means the segment is not a command and
    /// should be compiled as a displayable line.
    pub fn parse(segment: &str) -> Result<Option<Command>, CommandError> {
        if !segment.starts_with('$') {
            return Ok(None);
        }
        let (token, args) = match segment.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim()),
            None => (segment, ""),
        };
        let mut words = args.split_whitespace();

        let command = match token {
            BREAK => Command::Break,
            SINGLE => Command::Single {
                mail_id: required(words.next(), SINGLE, "mail id")?,
            },
            CHANCE => {
                let raw = required(words.next(), CHANCE, "probability")?;
                let probability = raw.parse::<f64>().map_err(|_| CommandError::InvalidNumber {
                    command: CHANCE,
                    value: raw.clone(),
                })?;
                Command::Chance { probability }
            }
            ACTION => {
                if args.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: ACTION,
                        argument: "action",
                    });
                }
                Command::Action {
                    action: args.to_string(),
                }
            }
            TOPIC => {
                let id = required(words.next(), TOPIC, "topic id")?;
                let days = match words.next() {
                    Some(raw) => Some(raw.parse::<u32>().map_err(|_| CommandError::InvalidNumber {
                        command: TOPIC,
                        value: raw.to_string(),
                    })?),
                    None => None,
                };
                Command::Topic { id, days }
            }
            QUESTION => {
                let ids = required(words.next(), QUESTION, "answer ids")?;
                let fallback = required(words.next(), QUESTION, "fallback")?;
                Command::Question {
                    answer_ids: ids.split('/').map(str::to_string).collect(),
                    fallback,
                }
            }
            RESPONSE => {
                let key = required(words.next(), RESPONSE, "response key")?;
                let raw_delta = required(words.next(), RESPONSE, "friendship delta")?;
                let friendship_delta =
                    raw_delta
                        .parse::<i32>()
                        .map_err(|_| CommandError::InvalidNumber {
                            command: RESPONSE,
                            value: raw_delta.clone(),
                        })?;
                let id = required(words.next(), RESPONSE, "response id")?;
                Command::Response {
                    key,
                    friendship_delta,
                    id,
                    extra_argument: words.next().map(str::to_string),
                }
            }
            QUERY => {
                if args.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: QUERY,
                        argument: "condition",
                    });
                }
                Command::Query {
                    condition: args.to_string(),
                }
            }
            PREREQUISITE => {
                let ids = required(words.next(), PREREQUISITE, "answer ids")?;
                Command::Prerequisite {
                    answer_ids: ids.split('|').map(str::to_string).collect(),
                }
            }
            DEPENDING_ON_WORLD_STATE => Command::DependingOnWorldState {
                predicate: required(words.next(), DEPENDING_ON_WORLD_STATE, "predicate")?
                    .to_lowercase(),
                argument: words.next().map(str::to_string),
            },
            QUICK_RESPONSE => parse_quick_response(args)?,
            END => Command::End,
            KILL => Command::Kill,
            _ => return Ok(None),
        };

        Ok(Some(command))
    }

    /// The literal token this command is written with.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Break => BREAK,
            Self::Single { .. } => SINGLE,
            Self::Chance { .. } => CHANCE,
            Self::Action { .. } => ACTION,
            Self::Topic { .. } => TOPIC,
            Self::Question { .. } => QUESTION,
            Self::Response { .. } => RESPONSE,
            Self::Query { .. } => QUERY,
            Self::Prerequisite { .. } => PREREQUISITE,
            Self::DependingOnWorldState { .. } => DEPENDING_ON_WORLD_STATE,
            Self::QuickResponse { .. } => QUICK_RESPONSE,
            Self::End => END,
            Self::Kill => KILL,
        }
    }
}

fn required(
    word: Option<&str>,
    command: &'static str,
    argument: &'static str,
) -> Result<String, CommandError> {
    word.map(str::to_string)
        .ok_or(CommandError::MissingArgument { command, argument })
}

/// `$y 'Question_Answer1_Reply1_Answer2_Reply2'`. A `*` inside a reply
/// becomes a page break.
fn parse_quick_response(args: &str) -> Result<Command, CommandError> {
    let body = args.trim().trim_matches('\'');
    let entries: Vec<&str> = body.split('_').collect();
    if entries.len() < 3 || entries.len() % 2 == 0 {
        return Err(CommandError::MalformedQuickResponse(entries.len()));
    }
    let pairs = entries[1..]
        .chunks(2)
        .map(|pair| (pair[0].to_string(), pair[1].replace('*', "#$b#")))
        .collect();
    Ok(Command::QuickResponse {
        question: entries[0].to_string(),
        pairs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(Command::parse("Hello there").unwrap(), None);
    }

    #[test]
    fn emotion_codes_and_event_directive_are_text() {
        assert_eq!(Command::parse("$h Great to see you!").unwrap(), None);
        assert_eq!(Command::parse("$v 611439 false true").unwrap(), None);
        assert_eq!(Command::parse("$neutral").unwrap(), None);
    }

    #[test]
    fn parse_break_and_terminators() {
        assert_eq!(Command::parse("$b").unwrap(), Some(Command::Break));
        assert_eq!(Command::parse("$e").unwrap(), Some(Command::End));
        assert_eq!(Command::parse("$k").unwrap(), Some(Command::Kill));
    }

    #[test]
    fn parse_chance() {
        assert_eq!(
            Command::parse("$c 0.25").unwrap(),
            Some(Command::Chance { probability: 0.25 })
        );
        assert!(matches!(
            Command::parse("$c often"),
            Err(CommandError::InvalidNumber { command: CHANCE, .. })
        ));
        assert!(matches!(
            Command::parse("$c"),
            Err(CommandError::MissingArgument { command: CHANCE, .. })
        ));
    }

    #[test]
    fn parse_question() {
        let parsed = Command::parse("$q 101/102 fish_fallback").unwrap().unwrap();
        assert_eq!(
            parsed,
            Command::Question {
                answer_ids: vec!["101".to_string(), "102".to_string()],
                fallback: "fish_fallback".to_string(),
            }
        );
        assert!(Command::parse("$q 101/102").is_err());
    }

    #[test]
    fn query_is_distinct_from_question() {
        let parsed = Command::parse("$query PLAYER_HAS_MAIL Current ccVault")
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed,
            Command::Query {
                condition: "PLAYER_HAS_MAIL Current ccVault".to_string()
            }
        );
    }

    #[test]
    fn parse_response_with_extra_argument() {
        let parsed = Command::parse("$r fish_yes 10 101 mail_likes_fish")
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed,
            Command::Response {
                key: "fish_yes".to_string(),
                friendship_delta: 10,
                id: "101".to_string(),
                extra_argument: Some("mail_likes_fish".to_string()),
            }
        );
        assert!(Command::parse("$r fish_yes ten 101").is_err());
        assert!(Command::parse("$r fish_yes 10").is_err());
    }

    #[test]
    fn parse_topic_with_optional_days() {
        assert_eq!(
            Command::parse("$t wedding").unwrap(),
            Some(Command::Topic {
                id: "wedding".to_string(),
                days: None
            })
        );
        assert_eq!(
            Command::parse("$t wedding 7").unwrap(),
            Some(Command::Topic {
                id: "wedding".to_string(),
                days: Some(7)
            })
        );
    }

    #[test]
    fn parse_world_state_lowercases_predicate() {
        assert_eq!(
            Command::parse("$d JOJA").unwrap(),
            Some(Command::DependingOnWorldState {
                predicate: "joja".to_string(),
                argument: None
            })
        );
        assert_eq!(
            Command::parse("$d year 3").unwrap(),
            Some(Command::DependingOnWorldState {
                predicate: "year".to_string(),
                argument: Some("3".to_string())
            })
        );
    }

    #[test]
    fn parse_quick_response_pairs() {
        let parsed = Command::parse("$y 'Want some tea?_Yes please_Here you go.*Careful, hot._No thanks_Suit yourself.'")
            .unwrap()
            .unwrap();
        match parsed {
            Command::QuickResponse { question, pairs } => {
                assert_eq!(question, "Want some tea?");
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[0].0, "Yes please");
                assert_eq!(pairs[0].1, "Here you go.#$b#Careful, hot.");
                assert_eq!(pairs[1].1, "Suit yourself.");
            }
            other => panic!("Expected QuickResponse, got {:?}", other),
        }
    }

    #[test]
    fn quick_response_needs_complete_pairs() {
        assert_eq!(
            Command::parse("$y 'Question_Answer'"),
            Err(CommandError::MalformedQuickResponse(2))
        );
    }

    #[test]
    fn token_round_trips_literal() {
        let cmd = Command::parse("$p 101|102").unwrap().unwrap();
        assert_eq!(cmd.token(), PREREQUISITE);
        assert_eq!(Command::Break.token(), "$b");
    }
}
