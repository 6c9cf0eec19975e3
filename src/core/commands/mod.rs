//! One runner per command tag.
//!
//! The block runner drives a command through `on_execute`, then polls
//! `is_finished` (when the command waits), then calls `on_finished`.
//! `on_update` is called once per tick on every runner before any block
//! runs.

pub mod branch;
pub mod display;
pub mod entity;
pub mod evaluate;
pub mod jump;
pub mod log;
pub mod ret;
pub mod wait;

use rand::rngs::StdRng;

use super::config::EngineConfig;
use super::host::{Host, InputState};
use super::logic::Logic;
use crate::schema::command::{CommandData, CommandParams};
use crate::schema::reference::BlockId;

use branch::BranchRunner;
use display::DisplayRunner;
use entity::{DestroyRunner, SpawnRunner};
use evaluate::EvaluateRunner;
use jump::JumpRunner;
use self::log::LogRunner;
use ret::ReturnRunner;
use wait::WaitRunner;

/// Everything a runner may touch while handling one command.
pub struct CommandContext<'a> {
    /// Block the command belongs to.
    pub block: &'a BlockId,
    pub logic: &'a mut Logic,
    pub host: &'a mut Host,
    pub input: &'a mut InputState,
    pub config: &'a EngineConfig,
    /// Deterministic generator for this execution of the command.
    pub rng: StdRng,
}

pub trait CommandRunner {
    type Params;

    /// Start the command. Returned indices are pushed on the block's jump
    /// stack, last one on top.
    fn on_execute(
        &mut self,
        _params: &Self::Params,
        _data: &CommandData,
        _cx: &mut CommandContext<'_>,
    ) -> Vec<usize> {
        Vec::new()
    }

    /// `None` asks the engine to quit. `Some(false)` keeps the block on
    /// this command until a later tick.
    fn is_finished(
        &mut self,
        _params: &Self::Params,
        _data: &CommandData,
        _cx: &mut CommandContext<'_>,
    ) -> Option<bool> {
        Some(true)
    }

    fn on_finished(
        &mut self,
        _params: &Self::Params,
        _data: &CommandData,
        _cx: &mut CommandContext<'_>,
    ) {
    }

    fn on_update(&mut self, _delta_ms: f64) {}
}

/// The full set of runners, dispatched on the command tag.
#[derive(Debug, Default)]
pub struct CommandRunners {
    branch: BranchRunner,
    evaluate: EvaluateRunner,
    jump: JumpRunner,
    ret: ReturnRunner,
    wait: WaitRunner,
    display: DisplayRunner,
    spawn: SpawnRunner,
    destroy: DestroyRunner,
    log: LogRunner,
}

macro_rules! dispatch {
    ($runners:expr, $data:expr, $method:ident, $cx:expr) => {
        match &$data.params {
            CommandParams::Branch(p) => $runners.branch.$method(p, $data, $cx),
            CommandParams::Evaluate(p) => $runners.evaluate.$method(p, $data, $cx),
            CommandParams::Jump(p) => $runners.jump.$method(p, $data, $cx),
            CommandParams::Return(p) => $runners.ret.$method(p, $data, $cx),
            CommandParams::Wait(p) => $runners.wait.$method(p, $data, $cx),
            CommandParams::Display(p) => $runners.display.$method(p, $data, $cx),
            CommandParams::Spawn(p) => $runners.spawn.$method(p, $data, $cx),
            CommandParams::Destroy(p) => $runners.destroy.$method(p, $data, $cx),
            CommandParams::Log(p) => $runners.log.$method(p, $data, $cx),
        }
    };
}

impl CommandRunners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_execute(&mut self, data: &CommandData, cx: &mut CommandContext<'_>) -> Vec<usize> {
        dispatch!(self, data, on_execute, cx)
    }

    pub fn is_finished(&mut self, data: &CommandData, cx: &mut CommandContext<'_>) -> Option<bool> {
        dispatch!(self, data, is_finished, cx)
    }

    pub fn on_finished(&mut self, data: &CommandData, cx: &mut CommandContext<'_>) {
        dispatch!(self, data, on_finished, cx)
    }

    pub fn on_update(&mut self, delta_ms: f64) {
        self.branch.on_update(delta_ms);
        self.evaluate.on_update(delta_ms);
        self.jump.on_update(delta_ms);
        self.ret.on_update(delta_ms);
        self.wait.on_update(delta_ms);
        self.display.on_update(delta_ms);
        self.spawn.on_update(delta_ms);
        self.destroy.on_update(delta_ms);
        self.log.on_update(delta_ms);
    }
}
