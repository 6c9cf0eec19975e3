// Program loading tests: RON fixtures through validation, the graph and a
// full engine run.

use sparkdown_engine::core::config::EngineConfig;
use sparkdown_engine::core::engine::{Engine, EngineError};
use sparkdown_engine::core::graph::{BlockGraph, JumpTarget};
use sparkdown_engine::core::host::World;
use sparkdown_engine::schema::program::{Program, ProgramError};
use sparkdown_engine::schema::reference::{BlockId, CommandId};
use sparkdown_engine::schema::value::Value;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

const TAVERN: &str = "tests/fixtures/tavern.ron";
const CONFIG: &str = "tests/fixtures/engine.ron";

#[derive(Clone, Default)]
struct Entities(Rc<RefCell<Vec<String>>>);

impl World for Entities {
    fn spawn_entity(&mut self, entity: &str) -> bool {
        self.0.borrow_mut().push(entity.to_string());
        true
    }

    fn destroy_entity(&mut self, entity: &str) -> bool {
        let mut live = self.0.borrow_mut();
        match live.iter().position(|e| e == entity) {
            Some(i) => {
                live.remove(i);
                true
            }
            None => false,
        }
    }
}

#[test]
fn fixture_loads_and_validates() {
    let program = Program::load_from_ron(Path::new(TAVERN)).unwrap();
    assert_eq!(program.root.as_str(), "tavern");
    assert_eq!(program.blocks.len(), 3);
    assert_eq!(program.block("tavern").unwrap().commands.len(), 7);
    assert_eq!(program.variables[0].value, Value::Int(0));
}

#[test]
fn fixture_jumps_resolve_at_build() {
    let program = Program::load_from_ron(Path::new(TAVERN)).unwrap();
    let graph = BlockGraph::new(&program);
    assert_eq!(
        graph.jump_target(&CommandId::from("tavern.2")),
        Some(&JumpTarget::Block(BlockId::from("tavern.bar")))
    );
    assert_eq!(
        graph.jump_target(&CommandId::from("tavern.6")),
        Some(&JumpTarget::Block(BlockId::from("tavern.door")))
    );
}

#[test]
fn pretty_ron_parses_back() {
    let program = Program::load_from_ron(Path::new(TAVERN)).unwrap();
    let text = program.to_ron().unwrap();
    assert_eq!(Program::parse_ron(&text).unwrap(), program);
}

#[test]
fn misnumbered_command_rejected() {
    let err = Program::load_from_ron(Path::new("tests/fixtures/broken_index.ron")).unwrap_err();
    assert!(matches!(
        err,
        ProgramError::CommandIndex {
            expected: 0,
            found: 1,
            ..
        }
    ));
}

#[test]
fn parent_cycle_rejected() {
    let err = Program::load_from_ron(Path::new("tests/fixtures/parent_cycle.ron")).unwrap_err();
    assert!(matches!(err, ProgramError::ParentCycle(_)));

    let err = Engine::builder()
        .program_path("tests/fixtures/parent_cycle.ron")
        .build()
        .unwrap_err();
    assert!(matches!(err, EngineError::Program(ProgramError::ParentCycle(_))));
}

#[test]
fn missing_file_is_io_error() {
    let err = Program::load_from_ron(Path::new("tests/fixtures/missing.ron")).unwrap_err();
    assert!(matches!(err, ProgramError::Io(_)));

    let err = Engine::builder()
        .program_path("tests/fixtures/missing.ron")
        .build()
        .unwrap_err();
    assert!(matches!(err, EngineError::Program(ProgramError::Io(_))));
}

#[test]
fn config_fixture_loads() {
    let config = EngineConfig::load_from_ron(Path::new(CONFIG)).unwrap();
    assert_eq!(config.random_seed, "tavern");
    assert_eq!(config.max_commands_per_tick, 64);
}

#[test]
fn tavern_plays_through() {
    let entities = Entities::default();
    let mut engine = Engine::builder()
        .program_path(TAVERN)
        .config_path(CONFIG)
        .world(entities.clone())
        .build()
        .unwrap();
    engine.start();

    // Display, assignment, the call into the bar, the branch and the tail
    // jump all happen in the first tick; the door then waits.
    assert_eq!(engine.update(0.0), Some(true));
    assert_eq!(engine.variable("coins"), Some(&Value::Int(2)));
    assert_eq!(engine.return_value("tavern.bar"), Some(&Value::Int(2)));
    assert_eq!(*entities.0.borrow(), vec!["ale_2".to_string()]);
    assert!(!engine.is_executing("tavern"));
    assert!(engine.is_executing("tavern.door"));

    assert_eq!(engine.update(500.0), Some(false));
    assert!(entities.0.borrow().is_empty());
    assert!(engine.has_finished("tavern.door"));
}
