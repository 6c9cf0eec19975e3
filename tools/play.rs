/// Play: interactive shell that steps a compiled program tick by tick.
///
/// Usage: play <program.ron> [--config <engine.ron>] [--seed <text>]
///
/// Commands:
///   tick [ms]             advance one tick (default 16 ms)
///   run [ms] [max]        tick until idle, new text appears, or max ticks
///   press                 click (reveal text / continue)
///   choose <n>            pick option n of the current choice
///   vars                  list variables
///   blocks                list executing and finished blocks
///   set <name> <value>    write a variable
///   enter <block>         restart a block
///   resume <block> <i>    restart a block, replaying up to command i
///   events                print and clear queued engine events
///   seed <text>           change the random seed
///   help                  list commands
///   quit                  exit
///
/// Set `RUST_LOG` (e.g. `RUST_LOG=sparkdown_engine=debug`) for engine tracing.

use sparkdown_engine::core::engine::Engine;
use sparkdown_engine::core::host::{DebugLog, DisplayRequest, Ui, World};
use sparkdown_engine::schema::command::LogSeverity;
use sparkdown_engine::schema::reference::Reference;
use sparkdown_engine::schema::value::Value;
use std::cell::Cell;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::rc::Rc;
use tracing_subscriber::{fmt, EnvFilter};

/// Prints everything the engine presents and counts displays so `run`
/// can stop when new text appears.
#[derive(Clone, Default)]
struct Console {
    displays: Rc<Cell<u32>>,
}

impl Ui for Console {
    fn display(&mut self, request: &DisplayRequest) {
        self.displays.set(self.displays.get() + 1);
        match (&request.character, &request.parenthetical) {
            (Some(character), Some(paren)) => {
                println!("\n    {}\n    ({})\n  {}", character.to_uppercase(), paren, request.content)
            }
            (Some(character), None) => {
                println!("\n    {}\n  {}", character.to_uppercase(), request.content)
            }
            _ => println!("\n  {}", request.content),
        }
    }

    fn show_choices(&mut self, _target: &str, choices: &[String]) {
        for (i, choice) in choices.iter().enumerate() {
            println!("  [{}] {}", i, choice);
        }
    }
}

impl World for Console {
    fn spawn_entity(&mut self, entity: &str) -> bool {
        println!("  + {}", entity);
        true
    }

    fn destroy_entity(&mut self, entity: &str) -> bool {
        println!("  - {}", entity);
        true
    }
}

impl DebugLog for Console {
    fn log(&mut self, severity: LogSeverity, message: &str, source: &Reference) {
        println!("  [{:?} {}] {}", severity, source.id, message);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    init_logging();

    let program_path = args[1].clone();
    let mut config_path = None;
    let mut seed = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let console = Console::default();
    let mut builder = Engine::builder()
        .program_path(&program_path)
        .world(console.clone())
        .ui(console.clone())
        .debug(console.clone());
    if let Some(ref path) = config_path {
        builder = builder.config_path(path);
    }
    if let Some(ref seed) = seed {
        builder = builder.seed(seed);
    }

    let mut engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Loaded {} ({} blocks)",
        Path::new(&program_path).display(),
        engine.graph().len()
    );
    println!("Seed: {}", engine.config().random_seed);
    println!("Type 'help' for commands.\n");

    engine.start();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("play> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "tick" | "t" => {
                let delta = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(16.0);
                report(engine.update(delta));
            }
            "run" | "r" => {
                let delta = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(16.0);
                let max: u32 = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(10_000);
                let before = console.displays.get();
                let mut ticks = 0;
                let mut result = Some(true);
                while ticks < max && result == Some(true) && console.displays.get() == before {
                    result = engine.update(delta);
                    ticks += 1;
                }
                println!("({} ticks)", ticks);
                report(result);
            }
            "press" | "p" => {
                engine.press();
                report(engine.update(0.0));
            }
            "choose" | "c" => match parts.get(1).and_then(|s| s.parse().ok()) {
                Some(option) => {
                    engine.choose(option);
                    report(engine.update(0.0));
                }
                None => println!("Usage: choose <n>"),
            },
            "vars" | "v" => {
                let vars = engine.snapshot_variables();
                if vars.is_empty() {
                    println!("  (no variables)");
                }
                for (name, value) in vars {
                    println!("  {} = {} ({})", name, value, value.type_name());
                }
            }
            "blocks" | "b" => {
                let graph = engine.graph();
                for id in graph.order() {
                    let Some(state) = engine.block_state(id.as_str()) else {
                        continue;
                    };
                    let status = if state.is_executing {
                        format!("executing at {}", state.executing_index)
                    } else if state.has_finished {
                        "finished".to_string()
                    } else {
                        "idle".to_string()
                    };
                    println!(
                        "  {} : {} (visits {})",
                        id, status, state.execution_count
                    );
                }
            }
            "set" => {
                if parts.len() < 3 {
                    println!("Usage: set <name> <value>");
                    continue;
                }
                let value = parse_value(&parts[2..].join(" "));
                println!("  {} = {}", parts[1], value);
                engine.set_variable(parts[1], value);
            }
            "enter" => match parts.get(1) {
                Some(block) => {
                    if let Err(e) = engine.enter_block(block) {
                        println!("ERROR: {}", e);
                    }
                }
                None => println!("Usage: enter <block>"),
            },
            "resume" => {
                let index = parts.get(2).and_then(|s| s.parse().ok());
                match (parts.get(1), index) {
                    (Some(block), Some(index)) => {
                        if let Err(e) = engine.resume_block(block, index) {
                            println!("ERROR: {}", e);
                        }
                    }
                    _ => println!("Usage: resume <block> <index>"),
                }
            }
            "events" | "e" => {
                for event in engine.drain_events() {
                    println!("  {:?}", event);
                }
            }
            "seed" => match parts.get(1) {
                Some(seed) => {
                    engine.set_seed(seed);
                    println!("Seed: {}", seed);
                }
                None => println!("Seed: {}", engine.config().random_seed),
            },
            _ => println!("Unknown command '{}'. Type 'help' for commands.", cmd),
        }
    }
}

fn report(result: Option<bool>) {
    match result {
        None => println!("(quit)"),
        Some(false) => println!("(idle)"),
        Some(true) => {}
    }
}

fn parse_value(text: &str) -> Value {
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = text.parse::<f64>() {
        return Value::Float(f);
    }
    Value::String(text.trim_matches('"').to_string())
}

fn print_usage() {
    println!("Usage: play <program.ron> [--config <engine.ron>] [--seed <text>]");
}

fn print_help() {
    println!("Commands:");
    println!("  tick [ms]            advance one tick (default 16 ms)");
    println!("  run [ms] [max]       tick until idle, new text appears, or max ticks");
    println!("  press                click (reveal text / continue)");
    println!("  choose <n>           pick option n of the current choice");
    println!("  vars                 list variables");
    println!("  blocks               list executing and finished blocks");
    println!("  set <name> <value>   write a variable");
    println!("  enter <block>        restart a block");
    println!("  resume <block> <i>   restart a block, replaying up to command i");
    println!("  events               print and clear queued engine events");
    println!("  seed <text>          change the random seed");
    println!("  help                 list commands");
    println!("  quit                 exit");
}
