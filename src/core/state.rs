//! Execution state store: the mutable heap the scheduler works on.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::schema::reference::{BlockId, CommandId};
use crate::schema::value::Value;

/// Whether a block is replaying already-executed history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplayMode {
    #[default]
    Live,
    /// Advance position up to `start_index` without executing commands.
    FastForward,
}

/// Mutable state of one block for the whole session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockState {
    pub is_executing: bool,
    pub is_executing_command: bool,
    pub executing_index: usize,
    pub previous_index: Option<usize>,
    pub start_index: usize,
    /// Survives restarts so random streams differ between visits.
    pub command_execution_counts: FxHashMap<CommandId, u32>,
    pub command_jump_stack: Vec<usize>,
    pub satisfied_triggers: Vec<String>,
    pub unsatisfied_triggers: Vec<String>,
    pub executed_by: Option<BlockId>,
    pub has_finished: bool,
    /// Times the block has started. Also the generation used to detect a
    /// restart while a command was running.
    pub execution_count: u32,
    /// Set when the block handed control to another block with a tail jump.
    pub jumped_to: Option<BlockId>,
    pub return_value: Option<Value>,
    pub replay: ReplayMode,
}

impl BlockState {
    /// Reset everything that belongs to a single run.
    pub fn reset(&mut self) {
        self.is_executing = false;
        self.is_executing_command = false;
        self.executing_index = 0;
        self.previous_index = None;
        self.start_index = 0;
        self.command_jump_stack.clear();
        self.satisfied_triggers.clear();
        self.unsatisfied_triggers.clear();
        self.executed_by = None;
        self.has_finished = false;
        self.jumped_to = None;
        self.return_value = None;
        self.replay = ReplayMode::Live;
    }

    pub fn execution_count_of(&self, command: &CommandId) -> u32 {
        self.command_execution_counts.get(command).copied().unwrap_or(0)
    }
}

/// A variable and its current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableState {
    pub name: String,
    pub value: Value,
}

/// Per-block and per-variable state, with change tracking so evaluation
/// scopes can be refreshed incrementally.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    blocks: FxHashMap<BlockId, BlockState>,
    variables: FxHashMap<String, VariableState>,
    changed_variables: FxHashSet<String>,
    changed_blocks: FxHashSet<BlockId>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&self, id: &str) -> Option<&BlockState> {
        self.blocks.get(id)
    }

    /// State for `id`, created on first use.
    pub fn block_mut(&mut self, id: &BlockId) -> &mut BlockState {
        self.blocks.entry(id.clone()).or_default()
    }

    pub fn blocks(&self) -> impl Iterator<Item = (&BlockId, &BlockState)> {
        self.blocks.iter()
    }

    pub fn mark_block_changed(&mut self, id: &BlockId) {
        self.changed_blocks.insert(id.clone());
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name).map(|v| &v.value)
    }

    pub fn variables(&self) -> impl Iterator<Item = &VariableState> {
        self.variables.values()
    }

    pub fn set_variable(&mut self, name: &str, value: Value) {
        match self.variables.get_mut(name) {
            Some(var) => var.value = value,
            None => {
                self.variables.insert(
                    name.to_string(),
                    VariableState {
                        name: name.to_string(),
                        value,
                    },
                );
            }
        }
        self.changed_variables.insert(name.to_string());
    }

    pub fn delete_variable(&mut self, name: &str) -> Option<Value> {
        let removed = self.variables.remove(name).map(|v| v.value);
        if removed.is_some() {
            self.changed_variables.insert(name.to_string());
        }
        removed
    }

    pub fn has_changes(&self) -> bool {
        !self.changed_variables.is_empty() || !self.changed_blocks.is_empty()
    }

    /// Take the ids mutated since the last call.
    pub fn take_changes(&mut self) -> (Vec<String>, Vec<BlockId>) {
        let vars = self.changed_variables.drain().collect();
        let blocks = self.changed_blocks.drain().collect();
        (vars, blocks)
    }
}
