// Engine integration tests: programs driven tick by tick through the
// public API, with a recording host standing in for the game.

use sparkdown_engine::core::config::EngineConfig;
use sparkdown_engine::core::engine::Engine;
use sparkdown_engine::core::events::EngineEvent;
use sparkdown_engine::core::host::{DebugLog, DisplayRequest, Sound, Ui, World};
use sparkdown_engine::schema::command::{CommandParams, DisplayParams, LogSeverity};
use sparkdown_engine::schema::program::Program;
use sparkdown_engine::schema::reference::Reference;
use sparkdown_engine::schema::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Host collaborator that records every call as a line of text.
#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<String>>>);

impl Recorder {
    fn push(&self, line: String) {
        self.0.borrow_mut().push(line);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

impl World for Recorder {
    fn spawn_entity(&mut self, entity: &str) -> bool {
        self.push(format!("spawn {entity}"));
        true
    }

    fn destroy_entity(&mut self, entity: &str) -> bool {
        self.push(format!("destroy {entity}"));
        true
    }
}

impl Ui for Recorder {
    fn display(&mut self, request: &DisplayRequest) {
        self.push(format!("display {}", request.content));
    }

    fn show_choices(&mut self, _target: &str, choices: &[String]) {
        self.push(format!("choices {}", choices.join("|")));
    }

    fn clear(&mut self, _target: &str) {
        self.push("clear".to_string());
    }
}

impl Sound for Recorder {
    fn load_all(&mut self, assets: &[String]) {
        self.push(format!("load {}", assets.join(",")));
    }

    fn start(&mut self, assets: &[String]) {
        self.push(format!("sound {}", assets.join(",")));
    }
}

impl DebugLog for Recorder {
    fn log(&mut self, _severity: LogSeverity, message: &str, _source: &Reference) {
        self.push(format!("log {message}"));
    }
}

fn engine_with(program: Program, config: EngineConfig) -> (Engine, Recorder) {
    let recorder = Recorder::default();
    let engine = Engine::builder()
        .program(program)
        .config(config)
        .world(recorder.clone())
        .ui(recorder.clone())
        .sound(recorder.clone())
        .debug(recorder.clone())
        .build()
        .unwrap();
    (engine, recorder)
}

fn engine(program: Program) -> (Engine, Recorder) {
    engine_with(program, EngineConfig::default())
}

fn executed_indices(events: &[EngineEvent], block: &str) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::ExecuteCommand { reference, index }
                if reference.parent_id.as_deref() == Some(block) =>
            {
                Some(*index)
            }
            _ => None,
        })
        .collect()
}

fn branching(x: i64) -> Program {
    Program::builder()
        .block(
            "main",
            None,
            vec![
                CommandParams::if_("x > 5"),
                CommandParams::log("big"),
                CommandParams::elseif("x > 0"),
                CommandParams::log("small"),
                CommandParams::else_(),
                CommandParams::log("none"),
                CommandParams::end(),
                CommandParams::log("after"),
            ],
        )
        .variable("x", x)
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

#[test]
fn failed_condition_jumps_to_next_branch() {
    let (mut engine, rec) = engine(branching(3));
    engine.start();
    assert_eq!(engine.update(16.0), Some(false));

    assert_eq!(rec.take(), vec!["log small", "log after"]);
    let events = engine.drain_events();
    assert_eq!(executed_indices(&events, "main"), vec![0, 2, 3, 6, 7]);
}

#[test]
fn taken_branch_skips_rest_of_group() {
    let (mut engine, rec) = engine(branching(10));
    engine.start();
    engine.update(16.0);

    assert_eq!(rec.take(), vec!["log big", "log after"]);
    let events = engine.drain_events();
    assert_eq!(executed_indices(&events, "main"), vec![0, 1, 6, 7]);
}

#[test]
fn all_conditions_false_runs_else_body() {
    let (mut engine, rec) = engine(branching(0));
    engine.start();
    engine.update(16.0);

    assert_eq!(rec.take(), vec!["log none", "log after"]);
    let events = engine.drain_events();
    assert_eq!(executed_indices(&events, "main"), vec![0, 2, 5, 6, 7]);
}

#[test]
fn nested_groups_resolve_independently() {
    let program = Program::builder()
        .block(
            "main",
            None,
            vec![
                CommandParams::if_("outer"),
                CommandParams::if_("inner"),
                CommandParams::log("both"),
                CommandParams::else_(),
                CommandParams::log("outer only"),
                CommandParams::end(),
                CommandParams::else_(),
                CommandParams::log("neither"),
                CommandParams::end(),
            ],
        )
        .variable("outer", true)
        .variable("inner", false)
        .build()
        .unwrap();
    let (mut engine, rec) = engine(program);
    engine.start();
    engine.update(16.0);
    assert_eq!(rec.take(), vec!["log outer only"]);
}

#[test]
fn block_visit_counts_are_visible_to_conditions() {
    let program = Program::builder()
        .block(
            "main",
            None,
            vec![
                CommandParams::call("room"),
                CommandParams::call("room"),
                CommandParams::if_("room == 2"),
                CommandParams::log("twice"),
                CommandParams::end(),
            ],
        )
        .block("main.room", Some("main"), vec![])
        .build()
        .unwrap();
    let (mut engine, rec) = engine(program);
    engine.start();
    engine.update(16.0);
    engine.update(16.0);
    assert_eq!(rec.take(), vec!["log twice"]);
    assert!(engine.has_finished("main"));
}

// ---------------------------------------------------------------------------
// Jumps and returns
// ---------------------------------------------------------------------------

#[test]
fn call_returns_to_caller_in_same_tick() {
    let program = Program::builder()
        .block(
            "main",
            None,
            vec![CommandParams::call("helper"), CommandParams::log("back")],
        )
        .block(
            "main.helper",
            Some("main"),
            vec![
                CommandParams::log("in helper"),
                CommandParams::ret(Some("gold * 2")),
                CommandParams::log("unreachable"),
            ],
        )
        .variable("gold", 21)
        .build()
        .unwrap();
    let (mut engine, rec) = engine(program);
    engine.start();

    assert_eq!(engine.update(16.0), Some(false));
    assert_eq!(rec.take(), vec!["log in helper", "log back"]);
    assert_eq!(engine.return_value("main.helper"), Some(&Value::Int(42)));
    assert!(engine.has_finished("main"));
    assert!(engine.has_finished("main.helper"));
}

#[test]
fn tail_jump_stops_current_block() {
    let program = Program::builder()
        .block(
            "main",
            None,
            vec![CommandParams::jump("next"), CommandParams::log("never")],
        )
        .block("main.next", Some("main"), vec![CommandParams::log("next")])
        .build()
        .unwrap();
    let (mut engine, rec) = engine(program);
    engine.start();
    engine.update(16.0);

    assert_eq!(rec.take(), vec!["log next"]);
    assert!(!engine.is_executing("main"));
    assert!(!engine.has_finished("main"));
    assert_eq!(engine.block_state("main.next").unwrap().executed_by, None);
}

#[test]
fn call_follows_tail_jumps_of_callee() {
    let program = Program::builder()
        .block(
            "main",
            None,
            vec![CommandParams::call("a"), CommandParams::log("done")],
        )
        .block("main.a", Some("main"), vec![CommandParams::jump("b")])
        .block("main.b", Some("main"), vec![CommandParams::log("b")])
        .build()
        .unwrap();
    let (mut engine, rec) = engine(program);
    engine.start();
    engine.update(16.0);

    assert_eq!(rec.take(), vec!["log b", "log done"]);
    assert_eq!(
        engine.block_state("main.b").unwrap().executed_by.as_ref().map(|b| b.as_str()),
        Some("main")
    );
}

#[test]
fn unresolved_jump_is_ignored() {
    let program = Program::builder()
        .block(
            "main",
            None,
            vec![CommandParams::jump("nowhere"), CommandParams::log("still here")],
        )
        .build()
        .unwrap();
    let (mut engine, rec) = engine(program);
    engine.start();
    engine.update(16.0);
    assert_eq!(rec.take(), vec!["log still here"]);
}

#[test]
fn relative_jump_to_next_sibling() {
    let program = Program::builder()
        .block("main", None, vec![CommandParams::call("first")])
        .block("main.first", Some("main"), vec![CommandParams::jump(">")])
        .block("main.second", Some("main"), vec![CommandParams::log("second")])
        .build()
        .unwrap();
    let (mut engine, rec) = engine(program);
    engine.start();
    engine.update(16.0);
    assert_eq!(rec.take(), vec!["log second"]);
    assert!(engine.has_finished("main"));
}

// ---------------------------------------------------------------------------
// Waits
// ---------------------------------------------------------------------------

fn waiting() -> Program {
    Program::builder()
        .block(
            "main",
            None,
            vec![CommandParams::wait(2.0), CommandParams::log("done")],
        )
        .build()
        .unwrap()
}

#[test]
fn wait_depends_only_on_accumulated_time() {
    let (mut coarse, coarse_rec) = engine(waiting());
    coarse.start();
    coarse.update(0.0);
    assert_eq!(coarse.update(2000.0), Some(false));
    assert_eq!(coarse_rec.take(), vec!["log done"]);

    let (mut fine, fine_rec) = engine(waiting());
    fine.start();
    fine.update(0.0);
    for _ in 0..1999 {
        assert_eq!(fine.update(1.0), Some(true));
    }
    assert!(fine_rec.take().is_empty());
    assert_eq!(fine.update(1.0), Some(false));
    assert_eq!(fine_rec.take(), vec!["log done"]);

    // 0.1 ms does not add up exactly in floating point.
    let (mut fractional, fractional_rec) = engine(waiting());
    fractional.start();
    fractional.update(0.0);
    for _ in 0..19_999 {
        assert_eq!(fractional.update(0.1), Some(true));
    }
    assert!(fractional_rec.take().is_empty());
    assert_eq!(fractional.update(0.1), Some(false));
    assert_eq!(fractional_rec.take(), vec!["log done"]);
}

#[test]
fn negative_wait_never_finishes() {
    let program = Program::builder()
        .block("main", None, vec![CommandParams::wait(-1.0)])
        .build()
        .unwrap();
    let (mut engine, _) = engine(program);
    engine.start();
    for _ in 0..10 {
        assert_eq!(engine.update(1.0e9), Some(true));
    }
}

#[test]
fn no_wait_command_does_not_block() {
    let program = Program::builder()
        .block(
            "main",
            None,
            vec![CommandParams::wait(5.0), CommandParams::log("immediately")],
        )
        .no_wait("main", 0)
        .build()
        .unwrap();
    let (mut engine, rec) = engine(program);
    engine.start();
    engine.update(0.0);
    assert_eq!(rec.take(), vec!["log immediately"]);
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

fn rolling() -> Program {
    Program::builder()
        .block(
            "main",
            None,
            vec![
                CommandParams::evaluate("first = random(1, 1000000)"),
                CommandParams::wait(0.1),
                CommandParams::evaluate("second = random()"),
            ],
        )
        .build()
        .unwrap()
}

fn run_to_end(engine: &mut Engine, delta_ms: f64) {
    engine.start();
    for _ in 0..1000 {
        if engine.update(delta_ms) != Some(true) {
            return;
        }
    }
    panic!("program did not finish");
}

#[test]
fn random_values_ignore_tick_timing() {
    let config = EngineConfig {
        random_seed: "alpha".to_string(),
        ..EngineConfig::default()
    };
    let (mut a, _) = engine_with(rolling(), config.clone());
    let (mut b, _) = engine_with(rolling(), config);
    run_to_end(&mut a, 16.0);
    run_to_end(&mut b, 100.0);

    assert_eq!(a.snapshot_variables(), b.snapshot_variables());
    assert!(matches!(a.variable("first"), Some(Value::Int(_))));
    assert!(matches!(a.variable("second"), Some(Value::Float(_))));
}

#[test]
fn seed_changes_random_values() {
    let (mut a, _) = engine_with(
        rolling(),
        EngineConfig {
            random_seed: "alpha".to_string(),
            ..EngineConfig::default()
        },
    );
    let (mut b, _) = engine_with(
        rolling(),
        EngineConfig {
            random_seed: "beta".to_string(),
            ..EngineConfig::default()
        },
    );
    run_to_end(&mut a, 16.0);
    run_to_end(&mut b, 16.0);
    assert_ne!(a.variable("second"), b.variable("second"));
}

#[test]
fn revisits_draw_new_values() {
    let (mut engine, _) = engine(rolling());
    run_to_end(&mut engine, 100.0);
    let first = engine.variable("second").cloned();
    run_to_end(&mut engine, 100.0);
    assert_ne!(engine.variable("second").cloned(), first);
}

// ---------------------------------------------------------------------------
// Quit
// ---------------------------------------------------------------------------

#[test]
fn quit_stops_block_and_callers() {
    let program = Program::builder()
        .block(
            "main",
            None,
            vec![CommandParams::call("ending"), CommandParams::log("never")],
        )
        .block(
            "main.ending",
            Some("main"),
            vec![
                CommandParams::log("bye"),
                CommandParams::jump("!END"),
                CommandParams::log("never either"),
            ],
        )
        .build()
        .unwrap();
    let (mut engine, rec) = engine(program);
    engine.start();

    assert_eq!(engine.update(16.0), None);
    assert!(engine.has_quit());
    assert_eq!(rec.take(), vec!["log bye"]);
    assert!(!engine.is_executing("main"));
    assert!(!engine.is_executing("main.ending"));
    assert!(!engine.has_finished("main"));
}

#[test]
fn quit_jump_without_wait_still_quits() {
    let program = Program::builder()
        .block(
            "main",
            None,
            vec![
                CommandParams::log("bye"),
                CommandParams::jump("!QUIT"),
                CommandParams::log("never"),
            ],
        )
        .no_wait("main", 1)
        .build()
        .unwrap();
    let (mut engine, rec) = engine(program);
    engine.start();

    assert_eq!(engine.update(16.0), None);
    assert!(engine.has_quit());
    assert_eq!(rec.take(), vec!["log bye"]);
    assert!(!engine.is_executing("main"));

    // Nothing left over from the quit: a restart runs to the same point.
    engine.start();
    assert_eq!(engine.update(16.0), None);
    assert_eq!(rec.take(), vec!["log bye"]);
}

#[test]
fn quit_choice_ends_game() {
    let program = Program::builder()
        .block(
            "main",
            None,
            vec![CommandParams::choice("Leave?", &[("Yes", "!QUIT"), ("No", "stay")])],
        )
        .block("main.stay", Some("main"), vec![CommandParams::log("stayed")])
        .build()
        .unwrap();
    let (mut engine, rec) = engine(program);
    engine.start();
    assert_eq!(engine.update(0.0), Some(true));
    engine.choose(0);
    assert_eq!(engine.update(0.0), None);
    assert!(!rec.take().contains(&"log stayed".to_string()));
}

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

#[test]
fn triggers_only_checked_while_idle() {
    let program = Program::builder()
        .block("main", None, vec![])
        .block(
            "main.alarm",
            Some("main"),
            vec![
                CommandParams::evaluate("alarm = false"),
                CommandParams::evaluate("rings += 1"),
                CommandParams::wait(1.0),
            ],
        )
        .trigger("main.alarm", "alarm")
        .variable("alarm", false)
        .variable("rings", 0)
        .build()
        .unwrap();
    let (mut engine, _) = engine(program);
    engine.start();

    engine.update(16.0);
    let state = engine.block_state("main.alarm").unwrap();
    assert!(!state.is_executing);
    assert_eq!(state.unsatisfied_triggers, vec!["alarm".to_string()]);

    engine.set_variable("alarm", true);
    engine.update(16.0);
    assert!(engine.is_executing("main.alarm"));
    assert_eq!(engine.variable("rings"), Some(&Value::Int(1)));
    assert!(engine.block_state("main.alarm").unwrap().satisfied_triggers.is_empty());

    // Raised while running: ignored until the block is idle again.
    engine.set_variable("alarm", true);
    engine.update(16.0);
    assert_eq!(engine.variable("rings"), Some(&Value::Int(1)));

    engine.update(1000.0);
    assert!(engine.has_finished("main.alarm"));
    assert_eq!(engine.variable("rings"), Some(&Value::Int(1)));

    engine.update(16.0);
    assert_eq!(engine.variable("rings"), Some(&Value::Int(2)));
    assert_eq!(
        engine.block_state("main.alarm").unwrap().executed_by,
        None
    );
}

// ---------------------------------------------------------------------------
// Display and input
// ---------------------------------------------------------------------------

fn display(params: DisplayParams) -> Program {
    Program::builder()
        .block("main", None, vec![CommandParams::Display(params)])
        .build()
        .unwrap()
}

#[test]
fn press_reveals_then_advances() {
    let (mut engine, rec) = engine(CommandParams::display("Hello").into_program());
    engine.start();

    assert_eq!(engine.update(0.0), Some(true));
    assert_eq!(rec.take(), vec!["display Hello"]);

    engine.press();
    assert_eq!(engine.update(0.0), Some(true));

    engine.press();
    assert_eq!(engine.update(0.0), Some(false));
    assert!(engine.has_finished("main"));
}

#[test]
fn held_pointer_counts_once() {
    let (mut engine, _) = engine(CommandParams::display("Hi").into_program());
    engine.start();
    engine.update(0.0);

    engine.set_pointer_down(true);
    engine.update(0.0); // reveal
    engine.update(0.0); // still held
    assert!(engine.is_executing("main"));

    engine.set_pointer_down(false);
    engine.update(0.0);
    engine.set_pointer_down(true);
    assert_eq!(engine.update(0.0), Some(false));
}

#[test]
fn auto_advance_finishes_after_type_out() {
    let (mut engine, _) = engine(display(DisplayParams {
        content: "Hello".to_string(),
        auto_advance: true,
        letter_delay: Some(0.01),
        ..DisplayParams::default()
    }));
    engine.start();
    assert_eq!(engine.update(0.0), Some(true));
    assert_eq!(engine.update(20.0), Some(true));
    assert_eq!(engine.update(40.0), Some(false));
}

#[test]
fn display_interpolates_and_starts_sound() {
    let (mut engine, rec) = engine_with(
        Program::builder()
            .block(
                "main",
                None,
                vec![CommandParams::Display(DisplayParams {
                    content: "You have {gold} gold".to_string(),
                    assets: vec!["coins".to_string()],
                    auto_advance: true,
                    ..DisplayParams::default()
                })],
            )
            .variable("gold", 7)
            .build()
            .unwrap(),
        EngineConfig {
            default_letter_delay: 0.0,
            ..EngineConfig::default()
        },
    );
    assert_eq!(rec.take(), vec!["load coins"]);
    engine.start();
    assert_eq!(engine.update(0.0), Some(false));
    assert_eq!(rec.take(), vec!["display You have 7 gold", "sound coins"]);
}

#[test]
fn choice_enters_chosen_section() {
    let program = Program::builder()
        .block(
            "main",
            None,
            vec![
                CommandParams::choice("Where?", &[("Left", "left"), ("Right", "right")]),
                CommandParams::log("never"),
            ],
        )
        .block("main.left", Some("main"), vec![CommandParams::log("went left")])
        .block("main.right", Some("main"), vec![CommandParams::log("went right")])
        .build()
        .unwrap();
    let (mut engine, rec) = engine(program);
    engine.start();

    engine.update(0.0);
    assert_eq!(rec.take(), vec!["display Where?", "choices Left|Right"]);

    // Presses do not pick an option.
    engine.press();
    engine.press();
    engine.update(500.0);
    assert!(engine.is_executing("main"));

    engine.choose(7);
    engine.update(0.0);
    assert!(engine.is_executing("main"));

    engine.choose(1);
    engine.update(0.0);
    assert_eq!(rec.take(), vec!["clear", "log went right"]);
    assert!(!engine.is_executing("main"));
    assert!(engine.has_finished("main.right"));
    assert!(!engine.has_finished("main.left"));
}

// ---------------------------------------------------------------------------
// Entities, logs and events
// ---------------------------------------------------------------------------

#[test]
fn spawn_and_destroy_format_entity_ids() {
    let program = Program::builder()
        .block(
            "main",
            None,
            vec![
                CommandParams::spawn("ghost_{n}"),
                CommandParams::destroy("ghost_{n - 1}"),
            ],
        )
        .variable("n", 2)
        .build()
        .unwrap();
    let (mut engine, rec) = engine(program);
    engine.start();
    engine.update(16.0);
    assert_eq!(rec.take(), vec!["spawn ghost_2", "destroy ghost_1"]);
}

#[test]
fn events_trace_execution() {
    let program = Program::builder()
        .block("main", None, vec![CommandParams::evaluate("gold = 5")])
        .build()
        .unwrap();
    let (mut engine, _) = engine(program);
    engine.start();
    engine.update(16.0);

    let events = engine.drain_events();
    assert!(matches!(
        events.first(),
        Some(EngineEvent::ExecuteBlock { executed_by: None, .. })
    ));
    assert!(events.contains(&EngineEvent::SetVariableValue {
        name: "gold".to_string(),
        value: Value::Int(5),
    }));
    assert!(matches!(
        events.last(),
        Some(EngineEvent::FinishBlock { block }) if block.as_str() == "main"
    ));
    assert!(engine.drain_events().is_empty());
}

#[test]
fn events_can_be_disabled() {
    let program = Program::builder()
        .block("main", None, vec![CommandParams::evaluate("gold = 5")])
        .build()
        .unwrap();
    let (mut engine, _) = engine_with(
        program,
        EngineConfig {
            emit_events: false,
            ..EngineConfig::default()
        },
    );
    engine.start();
    engine.update(16.0);
    assert!(engine.drain_events().is_empty());
    assert_eq!(engine.variable("gold"), Some(&Value::Int(5)));
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

fn three_assignments() -> Program {
    Program::builder()
        .block(
            "main",
            None,
            vec![
                CommandParams::evaluate("a = 1"),
                CommandParams::evaluate("b = 1"),
                CommandParams::evaluate("c = 1"),
            ],
        )
        .build()
        .unwrap()
}

#[test]
fn command_budget_suspends_block() {
    let (mut engine, _) = engine_with(
        three_assignments(),
        EngineConfig {
            max_commands_per_tick: 2,
            ..EngineConfig::default()
        },
    );
    engine.start();
    assert_eq!(engine.update(16.0), Some(true));
    assert_eq!(engine.variable("b"), Some(&Value::Int(1)));
    assert_eq!(engine.variable("c"), None);

    assert_eq!(engine.update(16.0), Some(false));
    assert_eq!(engine.variable("c"), Some(&Value::Int(1)));
}

#[test]
fn resume_replays_without_side_effects() {
    let (mut engine, _) = engine(three_assignments());
    engine.resume_block("main", 2).unwrap();
    engine.update(16.0);

    assert_eq!(engine.variable("a"), None);
    assert_eq!(engine.variable("b"), None);
    assert_eq!(engine.variable("c"), Some(&Value::Int(1)));
    assert!(engine.has_finished("main"));
}

#[test]
fn self_jump_restarts_on_next_tick() {
    let program = Program::builder()
        .block(
            "main",
            None,
            vec![CommandParams::evaluate("loops += 1"), CommandParams::jump("main")],
        )
        .build()
        .unwrap();
    let (mut engine, _) = engine(program);
    engine.start();
    for _ in 0..3 {
        assert_eq!(engine.update(16.0), Some(true));
    }
    assert_eq!(engine.variable("loops"), Some(&Value::Int(3)));
    assert_eq!(engine.block_state("main").unwrap().execution_count, 4);
}

trait IntoProgram {
    fn into_program(self) -> Program;
}

impl IntoProgram for CommandParams {
    fn into_program(self) -> Program {
        Program::builder()
            .block("main", None, vec![self])
            .build()
            .unwrap()
    }
}
