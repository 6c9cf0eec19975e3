/// Haunted Manor example: a short branching scene built in code.
///
/// Exploring: the opening → a choice of room → a call into the ghost's
/// block → a trigger reacting to what the ghost said → the ending.
/// The scene is played twice, once per route, by a scripted reader that
/// clicks through text and picks choices.
///
/// Run with: cargo run --example haunted_manor

use sparkdown_engine::core::engine::Engine;
use sparkdown_engine::core::host::{DebugLog, DisplayRequest, Ui, World};
use sparkdown_engine::schema::command::{CommandParams, DisplayKind, DisplayParams, LogSeverity};
use sparkdown_engine::schema::program::Program;
use sparkdown_engine::schema::reference::Reference;
use std::cell::Cell;
use std::rc::Rc;

/// Prints the scene and flags when a choice is waiting.
#[derive(Clone, Default)]
struct Console {
    choosing: Rc<Cell<bool>>,
}

impl Ui for Console {
    fn display(&mut self, request: &DisplayRequest) {
        match &request.character {
            Some(character) => {
                println!("    {}", character.to_uppercase());
                if let Some(paren) = &request.parenthetical {
                    println!("    ({})", paren);
                }
                println!("  {}\n", request.content);
            }
            None => println!("  {}\n", request.content),
        }
    }

    fn show_choices(&mut self, _target: &str, choices: &[String]) {
        for (i, choice) in choices.iter().enumerate() {
            println!("    [{}] {}", i, choice);
        }
        println!();
        self.choosing.set(true);
    }
}

impl World for Console {
    fn spawn_entity(&mut self, entity: &str) -> bool {
        println!("  (a {} appears)\n", entity);
        true
    }

    fn destroy_entity(&mut self, entity: &str) -> bool {
        println!("  (the {} is gone)\n", entity);
        true
    }
}

impl DebugLog for Console {
    fn log(&mut self, _severity: LogSeverity, message: &str, _source: &Reference) {
        println!("  ~ {} ~\n", message);
    }
}

fn dialogue(character: &str, parenthetical: Option<&str>, content: &str) -> CommandParams {
    CommandParams::Display(DisplayParams {
        kind: DisplayKind::Dialogue,
        character: Some(character.to_string()),
        parenthetical: parenthetical.map(str::to_string),
        content: content.to_string(),
        ..DisplayParams::default()
    })
}

fn manor() -> Program {
    Program::builder()
        .block(
            "manor",
            None,
            vec![
                CommandParams::display("Rain hammers the windows of Blackwood Manor."),
                CommandParams::evaluate("courage = random(1, 6)"),
                CommandParams::spawn("candle"),
                dialogue("Butler", Some("gravely"), "The family is expecting you."),
                CommandParams::choice(
                    "Where do you go?",
                    &[("The library", "library"), ("The cellar", "cellar"), ("Leave", "!END")],
                ),
            ],
        )
        .block(
            "manor.library",
            Some("manor"),
            vec![
                CommandParams::display("Dusty shelves climb into the dark."),
                CommandParams::if_("courage > 3"),
                CommandParams::display("You pull a red book. A door swings open."),
                CommandParams::evaluate("secrets += 1"),
                CommandParams::else_(),
                CommandParams::display("A shelf creaks and you step back."),
                CommandParams::end(),
                CommandParams::call("manor.ghost"),
                CommandParams::jump("hall"),
            ],
        )
        .block(
            "manor.cellar",
            Some("manor"),
            vec![
                CommandParams::display("The cellar stairs are slick with damp."),
                CommandParams::wait(1.0),
                CommandParams::destroy("candle"),
                CommandParams::evaluate("secrets += 2"),
                CommandParams::call("manor.ghost"),
                CommandParams::jump("hall"),
            ],
        )
        .block(
            "manor.ghost",
            Some("manor"),
            vec![
                dialogue("Ghost", Some("whispering"), "You have found {secrets} of my secrets."),
                CommandParams::evaluate("heard_whisper = true"),
                CommandParams::ret(Some("secrets * 2")),
            ],
        )
        .block(
            "manor.omen",
            Some("manor"),
            vec![
                CommandParams::log("somewhere a clock stops"),
                CommandParams::evaluate("heard_whisper = false"),
            ],
        )
        .trigger("manor.omen", "heard_whisper")
        .block(
            "manor.hall",
            Some("manor"),
            vec![
                CommandParams::if_("secrets >= 2"),
                CommandParams::display("The portraits turn to watch you leave."),
                CommandParams::else_(),
                CommandParams::display("The front door is unlocked. You walk out."),
                CommandParams::end(),
                CommandParams::jump("!END"),
            ],
        )
        .variable("courage", 0)
        .variable("secrets", 0)
        .variable("heard_whisper", false)
        .build()
        .expect("Failed to build manor program")
}

fn play(route: usize, seed: &str) {
    println!("=== Route {} (seed \"{}\") ===\n", route, seed);

    let console = Console::default();
    let mut engine = Engine::builder()
        .program(manor())
        .seed(seed)
        .world(console.clone())
        .ui(console.clone())
        .debug(console.clone())
        .build()
        .expect("Failed to build engine");
    engine.start();

    for tick in 0..20_000 {
        if console.choosing.replace(false) {
            engine.choose(route);
        } else if tick % 40 == 39 {
            // A reader clicks a little over twice a second.
            engine.press();
        }
        match engine.update(16.0) {
            Some(true) => {}
            Some(false) | None => break,
        }
    }

    println!(
        "  courage {}, secrets {}, ghost returned {}\n",
        engine.variable("courage").cloned().unwrap_or_default(),
        engine.variable("secrets").cloned().unwrap_or_default(),
        engine.return_value("manor.ghost").cloned().unwrap_or_default()
    );
}

fn main() {
    play(0, "blackwood");
    play(1, "blackwood");
}
