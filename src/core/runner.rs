//! Block runner: decides each tick whether a block starts, which command
//! runs next and when the block finishes.

use tracing::{debug, instrument, warn};

use super::commands::{CommandContext, CommandRunners};
use super::config::EngineConfig;
use super::flow::fallthrough_index;
use super::graph::JumpTarget;
use super::host::{Host, InputState};
use super::logic::Logic;
use super::state::ReplayMode;
use crate::schema::reference::BlockId;

/// How one pass over a block's commands ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// A command is not finished yet, or the tick budget ran out.
    Suspended,
    /// Ran past the last command.
    Drained,
    /// A command stopped, finished or restarted the block itself.
    Interrupted,
    Quit,
}

/// Borrowed view of the engine for one tick.
pub struct BlockRunner<'a> {
    pub logic: &'a mut Logic,
    pub runners: &'a mut CommandRunners,
    pub host: &'a mut Host,
    pub input: &'a mut InputState,
    pub config: &'a EngineConfig,
}

impl BlockRunner<'_> {
    /// Advance one block.
    ///
    /// Returns `None` if the block asked to quit, `Some(true)` if it is
    /// still executing afterwards and `Some(false)` otherwise.
    #[instrument(skip_all, fields(block = %id))]
    pub fn update(&mut self, id: &BlockId) -> Option<bool> {
        if self.logic.block_state_mut(id).is_none() {
            return Some(false);
        }

        if !self.logic.is_executing(id.as_str()) {
            if !self.logic.check_triggers(id) {
                return Some(false);
            }
            debug!("triggered");
            self.logic.enter_block(id, None, 0);
        }

        match self.run_commands(id) {
            Outcome::Quit => {
                self.quit(id);
                None
            }
            Outcome::Suspended => Some(true),
            Outcome::Drained => {
                self.logic.finish_block(id);
                self.continue_caller(id)
            }
            Outcome::Interrupted => {
                if self.logic.has_finished(id.as_str()) {
                    self.continue_caller(id)
                } else {
                    Some(self.logic.is_executing(id.as_str()))
                }
            }
        }
    }

    /// Give the caller of a finished block a chance to move on in the
    /// same tick.
    fn continue_caller(&mut self, id: &BlockId) -> Option<bool> {
        let caller = self
            .logic
            .block_state(id.as_str())
            .and_then(|s| s.executed_by.clone());
        match caller {
            Some(caller) if self.logic.is_executing(caller.as_str()) => {
                self.update(&caller)?;
                Some(false)
            }
            _ => Some(false),
        }
    }

    /// Stop a quitting block and every block waiting on it.
    fn quit(&mut self, id: &BlockId) {
        debug!(block = %id, "quit");
        let mut current = Some(id.clone());
        let mut remaining = self.logic.graph().len();
        while let Some(block) = current {
            current = self
                .logic
                .block_state(block.as_str())
                .and_then(|s| s.executed_by.clone());
            self.logic.stop_block(&block);
            if remaining == 0 {
                break;
            }
            remaining -= 1;
        }
    }

    fn interrupted(&self, id: &BlockId, generation: u32) -> bool {
        self.logic
            .block_state(id.as_str())
            .map(|s| !s.is_executing || s.execution_count != generation)
            .unwrap_or(true)
    }

    fn run_commands(&mut self, id: &BlockId) -> Outcome {
        let graph = self.logic.graph();
        let commands = graph.commands(id.as_str());
        let mut executed = 0usize;

        loop {
            let Some(state) = self.logic.block_state(id.as_str()) else {
                return Outcome::Interrupted;
            };
            if !state.is_executing {
                return Outcome::Interrupted;
            }
            let index = state.executing_index;
            let Some(data) = commands.get(index) else {
                return Outcome::Drained;
            };
            if executed >= self.config.max_commands_per_tick {
                warn!(block = %id, index, "command budget reached, suspending");
                return Outcome::Suspended;
            }
            let generation = state.execution_count;
            let started = state.is_executing_command;
            let fast_forward = state.replay == ReplayMode::FastForward;

            if fast_forward && index >= state.start_index {
                self.logic.set_replay(id, ReplayMode::Live);
                continue;
            }

            if fast_forward {
                // Replay position only; stacked jumps are never created here.
                self.logic.go_to_command_index(id, index + 1);
                executed += 1;
                continue;
            }

            self.logic.sync_scope();

            if !started {
                let rng = self.logic.begin_command(id, data);
                let mut cx = CommandContext {
                    block: id,
                    logic: &mut *self.logic,
                    host: &mut *self.host,
                    input: &mut *self.input,
                    config: self.config,
                    rng,
                };
                let jumps = self.runners.on_execute(data, &mut cx);
                if self.interrupted(id, generation) {
                    return Outcome::Interrupted;
                }
                for jump in jumps {
                    self.logic.command_jump_stack_push(id, jump);
                }
            }

            let rng = self.logic.command_rng(id, data);
            let mut cx = CommandContext {
                block: id,
                logic: &mut *self.logic,
                host: &mut *self.host,
                input: &mut *self.input,
                config: self.config,
                rng,
            };
            // A quit jump is honoured even when it does not wait.
            let polls = data.wait_until_finished
                || graph.jump_target(&data.id) == Some(&JumpTarget::Quit);
            if polls {
                match self.runners.is_finished(data, &mut cx) {
                    None => return Outcome::Quit,
                    Some(false) => return Outcome::Suspended,
                    Some(true) => {}
                }
            }
            self.runners.on_finished(data, &mut cx);
            self.logic.end_command(id, data);
            if self.interrupted(id, generation) {
                return Outcome::Interrupted;
            }

            let has_stacked = self
                .logic
                .block_state(id.as_str())
                .map(|s| !s.command_jump_stack.is_empty())
                .unwrap_or(false);
            let next = if has_stacked {
                self.logic
                    .command_jump_stack_pop(id)
                    .unwrap_or(index + 1)
            } else {
                fallthrough_index(commands, index + 1)
            };
            self.logic.go_to_command_index(id, next);
            executed += 1;
        }
    }
}
