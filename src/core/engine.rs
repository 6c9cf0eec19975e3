//! The top-level engine a host drives once per frame.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info, trace};

use super::commands::CommandRunners;
use super::config::{ConfigError, EngineConfig};
use super::events::EngineEvent;
use super::graph::BlockGraph;
use super::host::{DebugLog, Host, InputState, Sound, Ui, World};
use super::logic::Logic;
use super::runner::BlockRunner;
use super::state::BlockState;
use crate::schema::command::CommandParams;
use crate::schema::program::{Program, ProgramError};
use crate::schema::reference::BlockId;
use crate::schema::value::Value;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("program error: {0}")]
    Program(#[from] ProgramError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("no program given to the engine builder")]
    MissingProgram,
    #[error("unknown block: {0}")]
    UnknownBlock(BlockId),
}

/// Runs a compiled program. Built via `Engine::builder()`.
pub struct Engine {
    logic: Logic,
    runners: CommandRunners,
    host: Host,
    input: InputState,
    config: EngineConfig,
    has_quit: bool,
}

/// Builder for constructing an `Engine`.
#[derive(Default)]
pub struct EngineBuilder {
    program: Option<Program>,
    program_path: Option<PathBuf>,
    config: Option<EngineConfig>,
    config_path: Option<PathBuf>,
    seed: Option<String>,
    host: Host,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Start the root block.
    pub fn start(&mut self) {
        let root = self.logic.graph().root().clone();
        info!(root = %root, seed = %self.config.random_seed, "starting");
        self.has_quit = false;
        self.logic.enter_block(&root, None, 0);
    }

    /// Advance the game by `delta_ms` milliseconds.
    ///
    /// Returns `None` if a block quit this tick, otherwise whether any
    /// block is still executing.
    pub fn update(&mut self, delta_ms: f64) -> Option<bool> {
        trace!(delta_ms, "tick");
        self.runners.on_update(delta_ms);
        self.input.latch();

        let graph = self.logic.graph();
        let mut quit = false;
        {
            let mut runner = BlockRunner {
                logic: &mut self.logic,
                runners: &mut self.runners,
                host: &mut self.host,
                input: &mut self.input,
                config: &self.config,
            };
            for id in graph.order() {
                if runner.update(id).is_none() {
                    quit = true;
                    break;
                }
            }
        }
        self.input.end_tick();

        if quit {
            debug!("quit requested");
            self.has_quit = true;
            return None;
        }
        Some(graph.order().iter().any(|id| self.logic.is_executing(id.as_str())))
    }

    /// Whether any tick so far ended in a quit.
    pub fn has_quit(&self) -> bool {
        self.has_quit
    }

    /// A full click, handled on the next tick.
    pub fn press(&mut self) {
        self.input.press();
    }

    pub fn set_pointer_down(&mut self, down: bool) {
        self.input.set_pointer_down(down);
    }

    /// Pick option `option` of the waiting choice on the next tick.
    pub fn choose(&mut self, option: usize) {
        self.input.choose(option);
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.logic.drain_events()
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.logic.variable(name)
    }

    /// Write a variable from the host side. Idle blocks see the change
    /// in their trigger check on the next tick.
    pub fn set_variable(&mut self, name: &str, value: impl Into<Value>) {
        self.logic.set_variable_value(name, value.into());
    }

    /// All variables, sorted by name.
    pub fn snapshot_variables(&self) -> BTreeMap<String, Value> {
        self.logic
            .store()
            .variables()
            .map(|v| (v.name.clone(), v.value.clone()))
            .collect()
    }

    pub fn block_state(&self, id: &str) -> Option<&BlockState> {
        self.logic.block_state(id)
    }

    pub fn is_executing(&self, id: &str) -> bool {
        self.logic.is_executing(id)
    }

    pub fn has_finished(&self, id: &str) -> bool {
        self.logic.has_finished(id)
    }

    /// Value handed back by the last `return` of a block (following its
    /// tail jumps).
    pub fn return_value(&self, id: &str) -> Option<&Value> {
        self.logic.return_value(&BlockId::from(id))
    }

    fn known_block(&self, id: &str) -> Result<BlockId, EngineError> {
        let id = BlockId::from(id);
        if self.logic.graph().contains(id.as_str()) {
            Ok(id)
        } else {
            Err(EngineError::UnknownBlock(id))
        }
    }

    /// Restart a block from its first command.
    pub fn enter_block(&mut self, id: &str) -> Result<(), EngineError> {
        let id = self.known_block(id)?;
        self.logic.enter_block(&id, None, 0);
        Ok(())
    }

    /// Restart a block and replay it up to `index` without side effects,
    /// so live execution resumes at that command.
    pub fn resume_block(&mut self, id: &str, index: usize) -> Result<(), EngineError> {
        let id = self.known_block(id)?;
        self.logic.enter_block(&id, None, index);
        Ok(())
    }

    pub fn stop_block(&mut self, id: &str) -> Result<(), EngineError> {
        let id = self.known_block(id)?;
        self.logic.stop_block(&id);
        Ok(())
    }

    /// Stop every block and silence all sound, fading over `fade_seconds`
    /// when it is positive.
    pub fn stop(&mut self, fade_seconds: f64) {
        let graph = self.logic.graph();
        for id in graph.order() {
            self.logic.stop_block(id);
        }
        if fade_seconds > 0.0 {
            self.host.sound.fade_all(fade_seconds);
        } else {
            self.host.sound.stop_all();
        }
    }

    pub fn graph(&self) -> Rc<BlockGraph> {
        self.logic.graph()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Change the random seed. Only commands executed afterwards see it.
    pub fn set_seed(&mut self, seed: &str) {
        self.config.random_seed = seed.to_string();
        self.logic.set_random_seed(seed);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("logic", &self.logic)
            .field("config", &self.config)
            .field("has_quit", &self.has_quit)
            .finish_non_exhaustive()
    }
}

impl EngineBuilder {
    /// Provide the program directly.
    pub fn program(mut self, program: Program) -> Self {
        self.program = Some(program);
        self
    }

    /// Load the program from a RON file at build time.
    pub fn program_path(mut self, path: impl AsRef<Path>) -> Self {
        self.program_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Override the configured random seed.
    pub fn seed(mut self, seed: &str) -> Self {
        self.seed = Some(seed.to_string());
        self
    }

    pub fn world(mut self, world: impl World + 'static) -> Self {
        self.host.world = Box::new(world);
        self
    }

    pub fn ui(mut self, ui: impl Ui + 'static) -> Self {
        self.host.ui = Box::new(ui);
        self
    }

    pub fn sound(mut self, sound: impl Sound + 'static) -> Self {
        self.host.sound = Box::new(sound);
        self
    }

    pub fn debug(mut self, debug: impl DebugLog + 'static) -> Self {
        self.host.debug = Box::new(debug);
        self
    }

    pub fn build(self) -> Result<Engine, EngineError> {
        let program = match (self.program, self.program_path) {
            (Some(program), _) => {
                program.validate()?;
                program
            }
            (None, Some(path)) => Program::load_from_ron(&path)?,
            (None, None) => return Err(EngineError::MissingProgram),
        };

        let mut config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => EngineConfig::load_from_ron(&path)?,
            (None, None) => EngineConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.random_seed = seed;
        }
        config.validate()?;

        let mut host = self.host;
        let assets = display_assets(&program);
        if !assets.is_empty() {
            host.sound.load_all(&assets);
        }

        let graph = BlockGraph::new(&program);
        let mut logic = Logic::new(graph, &config.random_seed, config.emit_events);
        let declarations: Vec<(String, Value)> = program
            .variables
            .iter()
            .chain(program.blocks.iter().flat_map(|b| b.variables.iter()))
            .map(|v| (v.name.clone(), v.value.clone()))
            .collect();
        logic.declare_variables(&declarations);
        // Declarations are initial state, not changes the host should see.
        logic.drain_events();

        debug!(
            blocks = program.blocks.len(),
            variables = declarations.len(),
            "engine built"
        );

        Ok(Engine {
            logic,
            runners: CommandRunners::new(),
            host,
            input: InputState::default(),
            config,
            has_quit: false,
        })
    }
}

/// Every sound asset any display command may start, deduplicated in
/// first-use order.
fn display_assets(program: &Program) -> Vec<String> {
    let mut assets: Vec<String> = Vec::new();
    for block in &program.blocks {
        for command in &block.commands {
            if let CommandParams::Display(params) = &command.params {
                for asset in &params.assets {
                    if !assets.contains(asset) {
                        assets.push(asset.clone());
                    }
                }
            }
        }
    }
    assets
}
