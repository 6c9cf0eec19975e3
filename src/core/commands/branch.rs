use tracing::trace;

use super::{CommandContext, CommandRunner};
use crate::core::flow::{next_jump_index, FAILED_CONDITION, GROUP_END};
use crate::schema::command::{BranchCheck, BranchParams, CommandData};

/// `if` / `elseif` / `else` / `end`.
///
/// A taken branch falls into its body; the scheduler skips the rest of the
/// group when the body runs into the next `elseif`/`else`.
#[derive(Debug, Default)]
pub struct BranchRunner;

impl CommandRunner for BranchRunner {
    type Params = BranchParams;

    fn on_execute(
        &mut self,
        params: &BranchParams,
        data: &CommandData,
        cx: &mut CommandContext<'_>,
    ) -> Vec<usize> {
        let graph = cx.logic.graph();
        let commands = graph.commands(cx.block.as_str());

        let target = match params.check {
            BranchCheck::If | BranchCheck::ElseIf => {
                let value = cx.logic.evaluate(&params.condition, &mut cx.rng);
                trace!(command = %data.id, condition = %params.condition, %value, "branch");
                if value.is_truthy() {
                    return Vec::new();
                }
                next_jump_index(data.index, commands, &FAILED_CONDITION)
            }
            BranchCheck::Else => next_jump_index(data.index, commands, &GROUP_END),
            BranchCheck::End => None,
        };
        target.into_iter().collect()
    }
}
