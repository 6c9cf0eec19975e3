use rustc_hash::FxHashMap;
use tracing::debug;

use super::{CommandContext, CommandRunner};
use crate::core::graph::JumpTarget;
use crate::schema::command::{CommandData, JumpParams};
use crate::schema::reference::{BlockId, CommandId};

#[derive(Debug)]
enum Pending {
    /// Waiting for a called block to finish.
    Call(BlockId),
    Quit,
}

/// Section jumps: tail transfers, calls that wait for the callee, and
/// `!END` / `!QUIT`.
#[derive(Debug, Default)]
pub struct JumpRunner {
    pending: FxHashMap<CommandId, Pending>,
}

impl CommandRunner for JumpRunner {
    type Params = JumpParams;

    fn on_execute(
        &mut self,
        params: &JumpParams,
        data: &CommandData,
        cx: &mut CommandContext<'_>,
    ) -> Vec<usize> {
        let graph = cx.logic.graph();
        match graph.jump_target(&data.id) {
            None => debug!(command = %data.id, path = %params.value, "unresolved jump ignored"),
            Some(JumpTarget::Quit) => {
                self.pending.insert(data.id.clone(), Pending::Quit);
            }
            Some(JumpTarget::Block(to)) => {
                cx.logic
                    .jump_to_block(cx.block, to, params.return_when_finished);
                if params.return_when_finished {
                    self.pending
                        .insert(data.id.clone(), Pending::Call(to.clone()));
                }
            }
        }
        Vec::new()
    }

    fn is_finished(
        &mut self,
        _params: &JumpParams,
        data: &CommandData,
        cx: &mut CommandContext<'_>,
    ) -> Option<bool> {
        match self.pending.get(&data.id) {
            Some(Pending::Quit) => {
                self.pending.remove(&data.id);
                None
            }
            Some(Pending::Call(callee)) => Some(cx.logic.call_finished(callee)),
            None => Some(true),
        }
    }

    fn on_finished(
        &mut self,
        _params: &JumpParams,
        data: &CommandData,
        _cx: &mut CommandContext<'_>,
    ) {
        self.pending.remove(&data.id);
    }
}
