//! Shared runtime state and the operations commands use to change it.
//!
//! [`Logic`] owns the block graph, the state store, the evaluation scope
//! and the event queue. Command runners and the block runner go through
//! it for every read or write of shared state.

use rand::rngs::StdRng;
use std::rc::Rc;
use tracing::{debug, trace, warn};

use super::events::{EngineEvent, EventQueue};
use super::expr::{self, Effect, Scope};
use super::graph::{BlockGraph, JumpTarget};
use super::rng::command_rng;
use super::state::{BlockState, ReplayMode, StateStore};
use crate::schema::command::CommandData;
use crate::schema::reference::BlockId;
use crate::schema::value::Value;

pub struct Logic {
    graph: Rc<BlockGraph>,
    store: StateStore,
    scope: Scope,
    events: EventQueue,
    random_seed: String,
}

impl Logic {
    pub fn new(graph: BlockGraph, random_seed: &str, emit_events: bool) -> Self {
        Self {
            graph: Rc::new(graph),
            store: StateStore::new(),
            scope: Scope::default(),
            events: EventQueue::new(emit_events),
            random_seed: random_seed.to_string(),
        }
    }

    /// Shared handle to the graph, so command data can be borrowed while
    /// `self` is mutated.
    pub fn graph(&self) -> Rc<BlockGraph> {
        Rc::clone(&self.graph)
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn random_seed(&self) -> &str {
        &self.random_seed
    }

    pub fn set_random_seed(&mut self, seed: &str) {
        self.random_seed = seed.to_string();
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain()
    }

    /// Copy everything mutated since the last sync into the scope.
    /// Blocks are visible by id and by name as their execution count.
    pub fn sync_scope(&mut self) {
        if !self.store.has_changes() {
            return;
        }
        let (variables, blocks) = self.store.take_changes();
        for name in variables {
            match self.store.variable(&name) {
                Some(value) => {
                    self.scope.insert(name, value.clone());
                }
                None => {
                    self.scope.remove(&name);
                }
            }
        }
        for id in blocks {
            let count = self
                .store
                .block(id.as_str())
                .map(|s| s.execution_count)
                .unwrap_or(0);
            let value = Value::Int(i64::from(count));
            if let Some(block) = self.graph.get(id.as_str()) {
                self.scope.insert(block.name.clone(), value.clone());
            }
            self.scope.insert(id.0, value);
        }
    }

    // ---- expressions -----------------------------------------------------

    /// Evaluate an expression. Errors are logged and yield `Undefined`.
    pub fn evaluate(&self, expression: &str, rng: &mut StdRng) -> Value {
        match expr::evaluate(expression, &self.scope, rng) {
            Ok(value) => value,
            Err(e) => {
                warn!(expression, error = %e, "expression failed");
                Value::Undefined
            }
        }
    }

    pub fn format(&self, template: &str, rng: &mut StdRng) -> String {
        expr::format(template, &self.scope, rng)
    }

    /// Run a statement and apply its write. Errors leave state untouched.
    pub fn execute(&mut self, statement: &str, rng: &mut StdRng) {
        match expr::execute(statement, &self.scope, rng) {
            Ok(Effect::Assign { name, value }) => self.set_variable_value(&name, value),
            Ok(Effect::Delete(name)) => self.delete_variable(&name),
            Ok(Effect::Value(value)) => trace!(statement, %value, "statement had no effect"),
            Err(e) => warn!(statement, error = %e, "statement failed"),
        }
    }

    /// Resolve a section path from `from`. Jump and choice commands use
    /// the targets resolved when the graph was built instead.
    pub fn evaluate_block_id(&self, from: &BlockId, path: &str) -> Option<JumpTarget> {
        self.graph.evaluate_block_id(from, path)
    }

    // ---- variables -------------------------------------------------------

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.store.variable(name)
    }

    pub fn set_variable_value(&mut self, name: &str, value: Value) {
        debug!(variable = name, %value, "set variable");
        self.events.push(EngineEvent::SetVariableValue {
            name: name.to_string(),
            value: value.clone(),
        });
        self.store.set_variable(name, value);
    }

    pub fn delete_variable(&mut self, name: &str) {
        if self.store.delete_variable(name).is_some() {
            debug!(variable = name, "delete variable");
            self.events.push(EngineEvent::SetVariableValue {
                name: name.to_string(),
                value: Value::Undefined,
            });
        }
    }

    // ---- block state -----------------------------------------------------

    pub fn block_state(&self, id: &str) -> Option<&BlockState> {
        self.store.block(id)
    }

    /// State of a block in the graph, created on first use.
    pub fn block_state_mut(&mut self, id: &BlockId) -> Option<&mut BlockState> {
        if self.graph.contains(id.as_str()) {
            Some(self.store.block_mut(id))
        } else {
            None
        }
    }

    pub fn is_executing(&self, id: &str) -> bool {
        self.store.block(id).map(|s| s.is_executing).unwrap_or(false)
    }

    pub fn has_finished(&self, id: &str) -> bool {
        self.store.block(id).map(|s| s.has_finished).unwrap_or(false)
    }

    /// State of the block currently carrying a call, following tail jumps
    /// away from `callee`.
    fn call_state(&self, callee: &BlockId) -> Option<&BlockState> {
        let mut current = callee;
        for _ in 0..=self.graph.len() {
            let state = self.store.block(current.as_str())?;
            match &state.jumped_to {
                Some(next) if !state.is_executing => current = next,
                _ => return Some(state),
            }
        }
        None
    }

    /// Whether a called block's work is done.
    pub fn call_finished(&self, callee: &BlockId) -> bool {
        self.call_state(callee)
            .map(|s| s.has_finished)
            .unwrap_or(false)
    }

    /// Value returned to whoever called `callee`.
    pub fn return_value(&self, callee: &BlockId) -> Option<&Value> {
        self.call_state(callee)
            .and_then(|s| s.return_value.as_ref())
    }

    /// Mark a block as running. Position and jump stack are left as they
    /// are; see [`Logic::enter_block`] for a fresh start.
    pub fn execute_block(&mut self, id: &BlockId, executed_by: Option<BlockId>) {
        let Some(state) = self.block_state_mut(id) else {
            warn!(block = %id, "execute of unknown block");
            return;
        };
        state.is_executing = true;
        state.has_finished = false;
        state.executed_by = executed_by.clone();
        state.execution_count += 1;
        state.satisfied_triggers.clear();
        state.unsatisfied_triggers.clear();
        self.store.mark_block_changed(id);
        debug!(block = %id, executed_by = ?executed_by, "execute block");
        self.events.push(EngineEvent::ExecuteBlock {
            block: id.clone(),
            executed_by,
        });
    }

    /// Reset a block and start it from the top. With `start_index > 0`,
    /// commands before that index are replayed without side effects.
    pub fn enter_block(&mut self, id: &BlockId, executed_by: Option<BlockId>, start_index: usize) {
        let Some(state) = self.block_state_mut(id) else {
            warn!(block = %id, "enter of unknown block");
            return;
        };
        state.reset();
        state.start_index = start_index;
        if start_index > 0 {
            state.replay = ReplayMode::FastForward;
        }
        self.execute_block(id, executed_by);
    }

    /// Cancel a block without finishing it.
    pub fn stop_block(&mut self, id: &BlockId) {
        if let Some(state) = self.block_state_mut(id) {
            if state.is_executing {
                debug!(block = %id, "stop block");
            }
            state.is_executing = false;
            state.is_executing_command = false;
            state.command_jump_stack.clear();
        }
    }

    pub fn finish_block(&mut self, id: &BlockId) {
        let Some(state) = self.block_state_mut(id) else {
            return;
        };
        state.is_executing = false;
        state.is_executing_command = false;
        state.has_finished = true;
        state.command_jump_stack.clear();
        debug!(block = %id, "finish block");
        self.events.push(EngineEvent::FinishBlock { block: id.clone() });
    }

    /// Transfer control from `from` to `to`.
    ///
    /// A returning jump starts `to` as a callee of `from`, which keeps
    /// running. A tail jump stops `from` and hands its caller to `to`.
    pub fn jump_to_block(&mut self, from: &BlockId, to: &BlockId, return_when_finished: bool) {
        if return_when_finished {
            self.enter_block(to, Some(from.clone()), 0);
            return;
        }
        let caller = self.store.block(from.as_str()).and_then(|s| s.executed_by.clone());
        self.stop_block(from);
        self.enter_block(to, caller, 0);
        if from != to {
            if let Some(state) = self.block_state_mut(from) {
                state.jumped_to = Some(to.clone());
            }
        }
    }

    pub fn return_from_block(&mut self, id: &BlockId, value: Option<Value>) {
        if let Some(state) = self.block_state_mut(id) {
            state.return_value = value;
        }
        self.finish_block(id);
    }

    // ---- command position ------------------------------------------------

    pub fn command_jump_stack_push(&mut self, id: &BlockId, index: usize) {
        if let Some(state) = self.block_state_mut(id) {
            state.command_jump_stack.push(index);
        }
    }

    pub fn command_jump_stack_pop(&mut self, id: &BlockId) -> Option<usize> {
        let state = self.block_state_mut(id)?;
        debug_assert!(
            !state.command_jump_stack.is_empty(),
            "command jump stack underflow in {id}"
        );
        state.command_jump_stack.pop()
    }

    pub fn go_to_command_index(&mut self, id: &BlockId, index: usize) {
        if let Some(state) = self.block_state_mut(id) {
            state.previous_index = Some(state.executing_index);
            state.executing_index = index;
            state.is_executing_command = false;
        }
    }

    /// Record that `command` started in `block` and return its generator.
    pub fn begin_command(&mut self, block: &BlockId, command: &CommandData) -> StdRng {
        let Some(state) = self.block_state_mut(block) else {
            return command_rng(&self.random_seed, command.id.as_str(), 0);
        };
        state.is_executing_command = true;
        let count = state
            .command_execution_counts
            .entry(command.id.clone())
            .or_insert(0);
        *count += 1;
        let count = *count;
        trace!(block = %block, command = %command.id, count, "execute command");
        self.events.push(EngineEvent::ExecuteCommand {
            reference: command.reference(),
            index: command.index,
        });
        command_rng(&self.random_seed, command.id.as_str(), count)
    }

    /// The generator for a command that is already running.
    pub fn command_rng(&self, block: &BlockId, command: &CommandData) -> StdRng {
        let count = self
            .store
            .block(block.as_str())
            .map(|s| s.execution_count_of(&command.id))
            .unwrap_or(0);
        command_rng(&self.random_seed, command.id.as_str(), count)
    }

    pub fn end_command(&mut self, block: &BlockId, command: &CommandData) {
        if let Some(state) = self.block_state_mut(block) {
            state.is_executing_command = false;
        }
        self.events.push(EngineEvent::FinishCommand {
            reference: command.reference(),
            index: command.index,
        });
    }

    pub fn set_replay(&mut self, id: &BlockId, replay: ReplayMode) {
        if let Some(state) = self.block_state_mut(id) {
            state.replay = replay;
        }
    }

    // ---- triggers --------------------------------------------------------

    /// Recompute which trigger variables of an idle block are truthy.
    /// Returns true if any is.
    pub fn check_triggers(&mut self, id: &BlockId) -> bool {
        let Some(block) = self.graph.get(id.as_str()) else {
            return false;
        };
        if block.triggers.is_empty() {
            return false;
        }
        let (satisfied, unsatisfied): (Vec<String>, Vec<String>) = block
            .triggers
            .iter()
            .cloned()
            .partition(|t| self.store.variable(t).map(Value::is_truthy).unwrap_or(false));
        let any = !satisfied.is_empty();

        self.events.push(EngineEvent::CheckTriggers {
            block: id.clone(),
            satisfied: satisfied.clone(),
            unsatisfied: unsatisfied.clone(),
        });
        let state = self.store.block_mut(id);
        state.satisfied_triggers = satisfied;
        state.unsatisfied_triggers = unsatisfied;
        any
    }

    /// Seed the store with program and block declarations.
    pub fn declare_variables(&mut self, declarations: &[(String, Value)]) {
        for (name, value) in declarations {
            self.store.set_variable(name, value.clone());
        }
        self.sync_scope();
    }
}

impl std::fmt::Debug for Logic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logic")
            .field("blocks", &self.graph.len())
            .field("random_seed", &self.random_seed)
            .finish_non_exhaustive()
    }
}
