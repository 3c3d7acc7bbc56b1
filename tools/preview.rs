/// Preview: interactive shell for compiling and playing dialogue scripts.
///
/// Usage: preview [--sheet <path>] [--config <path>] [--seed <n>]
///
/// Commands:
///   say <script>     compile and play a raw script
///   key <name>       compile and play a key from the loaded sheet
///   keys             list sheet keys
///   days <n>         set days played
///   gender <g>       set player gender (male, female, undefined)
///   mail <id>        give the player a mail flag
///   answer <id>      mark a response id as answered
///   cond <query>     make a condition query true
///   seed <n>         rebuild the engine with a new seed
///   state            show what the host has recorded
///   help             list commands
///   quit             exit

use dialogue_engine::core::config::DialogueConfig;
use dialogue_engine::core::engine::{DialogueEngine, Runtime};
use dialogue_engine::core::host::MemoryHost;
use dialogue_engine::core::playback::DialogueInstance;
use dialogue_engine::schema::context::GameContext;
use dialogue_engine::schema::line::SideEffect;
use dialogue_engine::schema::speaker::{Gender, Speaker};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::rc::Rc;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let mut sheet_path = None;
    let mut config_path = None;
    let mut seed: u64 = 42;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sheet" if i + 1 < args.len() => {
                i += 1;
                sheet_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(ref path) => match DialogueConfig::load_from_ron(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => DialogueConfig::default(),
    };

    let mut speaker = Speaker::new("Preview");
    if let Some(ref path) = sheet_path {
        let path = Path::new(path);
        if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
            speaker.name = name.to_string();
        }
        if let Err(e) = speaker.load_sheet_from_ron(path) {
            eprintln!("ERROR: Failed to load sheet: {}", e);
            std::process::exit(1);
        }
    }
    let speaker = Rc::new(speaker);

    println!("Loaded {} dialogue keys for {}", speaker.dialogue.len(), speaker.name);
    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    let mut engine = build_engine(config.clone(), seed);
    let mut host = MemoryHost::new();
    let mut ctx = GameContext::default();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match cmd.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "say" => {
                if rest.is_empty() {
                    println!("Usage: say <script>");
                    continue;
                }
                play(&mut engine, &ctx, &mut host, &speaker, rest, None);
            }
            "key" => match speaker.dialogue(rest) {
                Some(raw) => {
                    let raw = raw.to_string();
                    play(&mut engine, &ctx, &mut host, &speaker, &raw, Some(rest));
                }
                None => println!("No dialogue key '{}'. Type 'keys' to list them.", rest),
            },
            "keys" => {
                let mut keys: Vec<&String> = speaker.dialogue.keys().collect();
                keys.sort();
                for key in keys {
                    println!("  {}", key);
                }
            }
            "days" => match rest.parse() {
                Ok(days) => {
                    ctx.days_played = days;
                    println!("Days played set to {}", days);
                }
                Err(_) => println!("Invalid day count: {}", rest),
            },
            "gender" => {
                ctx.player_gender = match rest.to_lowercase().as_str() {
                    "male" | "m" => Gender::Male,
                    "female" | "f" => Gender::Female,
                    _ => Gender::Undefined,
                };
                println!("Player gender set to {:?}", ctx.player_gender);
            }
            "mail" => {
                host.mail.insert(rest.to_string());
                println!("Mail '{}' received", rest);
            }
            "answer" => {
                host.answered.insert(rest.to_string());
                println!("Response '{}' marked as answered", rest);
            }
            "cond" => {
                host.true_conditions.insert(rest.to_string());
                println!("Condition '{}' is now true", rest);
            }
            "seed" => match rest.parse() {
                Ok(new_seed) => {
                    engine = build_engine(config.clone(), new_seed);
                    println!("Seed set to {}", new_seed);
                }
                Err(_) => println!("Current seed: {}", engine.seed()),
            },
            "state" => print_state(&host),
            other => {
                println!("Unknown command: '{}'. Type 'help' for available commands.", other);
            }
        }
    }
}

fn build_engine(config: DialogueConfig, seed: u64) -> DialogueEngine {
    match DialogueEngine::builder().config(config).seed(seed).build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: Failed to build engine: {}", e);
            std::process::exit(1);
        }
    }
}

fn play(
    engine: &mut DialogueEngine,
    ctx: &GameContext,
    host: &mut MemoryHost,
    speaker: &Rc<Speaker>,
    raw: &str,
    key: Option<&str>,
) {
    let mut rt = Runtime::new(engine, ctx, host);
    let mut dialogue = DialogueInstance::compile(&mut rt, Some(Rc::clone(speaker)), raw, key);
    print_compiled(&dialogue);

    println!("--- Playback ---");
    let stdin = io::stdin();
    while !dialogue.is_finished() {
        let Some(text) = dialogue.current_text(&mut rt) else {
            break;
        };
        println!("[portrait {}] {}", dialogue.portrait_index(), text);

        if dialogue.is_current_dialogue_a_question() {
            for (n, response) in dialogue.responses().iter().enumerate() {
                println!("  {}) {}", n + 1, response.display_text);
            }
            print!("choice> ");
            io::stdout().flush().ok();
            let mut answer = String::new();
            if stdin.lock().read_line(&mut answer).is_err() {
                break;
            }
            let chosen = answer
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|n| dialogue.responses().get(n).cloned());
            match chosen {
                Some(option) => {
                    let outcome = dialogue.choose_response(&mut rt, &option);
                    println!("  -> {:?}", outcome);
                }
                None => println!("  (no such response)"),
            }
            continue;
        }
        dialogue.advance(&mut rt);
    }
    if dialogue.forked() {
        println!("(fork flag raised)");
    }
    println!("--- End ---\n");
}

fn print_compiled(dialogue: &DialogueInstance) {
    println!("\n--- Compiled ---");
    for (i, line) in dialogue.lines().iter().enumerate() {
        match &line.side_effect {
            Some(SideEffect::Action(action)) => println!("  {:>2}: <action {}>", i, action),
            Some(SideEffect::Topic { id, days }) => {
                println!("  {:>2}: <topic {} for {} days>", i, id, days)
            }
            None => {
                let mut notes = Vec::new();
                if let Some(mail) = &line.record_mail {
                    notes.push(format!("records mail {}", mail));
                }
                if notes.is_empty() {
                    println!("  {:>2}: {}", i, line.text);
                } else {
                    println!("  {:>2}: {}  ({})", i, line.text, notes.join(", "));
                }
            }
        }
    }
    if !dialogue.responses().is_empty() {
        let kind = if dialogue.is_quick_response() { "quick" } else { "keyed" };
        println!("  responses ({}):", kind);
        for response in dialogue.responses() {
            println!(
                "    {:?} {:+} id={:?} -> {}",
                response.response_key, response.friendship_delta, response.id, response.display_text
            );
        }
    }
}

fn print_state(host: &MemoryHost) {
    println!("Mail: {:?}", host.mail);
    println!("Answered: {:?}", host.answered);
    println!("Actions: {:?}", host.actions);
    println!("Topics: {:?}", host.topics);
    println!("Friendship: {:?}", host.friendship);
    println!("Inventory: {:?}", host.inventory);
    println!("Deliveries: {:?}", host.deliveries);
}

fn print_usage() {
    println!("Preview: interactive shell for compiling and playing dialogue scripts.");
    println!();
    println!("Usage: preview [--sheet <path>] [--config <path>] [--seed <n>]");
    println!();
    println!("  --sheet <path>   RON dialogue sheet (key -> script)");
    println!("  --config <path>  RON engine config (optional)");
    println!("  --seed <n>       Initial RNG seed (default: 42)");
}

fn print_help() {
    println!("Commands:");
    println!("  say <script>   Compile and play a raw script");
    println!("  key <name>     Compile and play a key from the loaded sheet");
    println!("  keys           List sheet keys");
    println!("  days <n>       Set days played (weekly variants rotate every 7)");
    println!("  gender <g>     Set player gender: male, female, undefined");
    println!("  mail <id>      Give the player a mail flag");
    println!("  answer <id>    Mark a response id as answered");
    println!("  cond <query>   Make a condition query evaluate to true");
    println!("  seed <n>       Rebuild the engine with a new seed");
    println!("  state          Show what the host has recorded");
    println!("  help           Show this help");
    println!("  quit           Exit");
}
