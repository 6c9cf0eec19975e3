use super::{CommandContext, CommandRunner};
use crate::schema::command::{CommandData, ReturnParams};

/// Finishes the block early, handing an optional value to its caller.
#[derive(Debug, Default)]
pub struct ReturnRunner;

impl CommandRunner for ReturnRunner {
    type Params = ReturnParams;

    fn on_execute(
        &mut self,
        params: &ReturnParams,
        _data: &CommandData,
        cx: &mut CommandContext<'_>,
    ) -> Vec<usize> {
        let value = params
            .value
            .as_deref()
            .map(|expression| cx.logic.evaluate(expression, &mut cx.rng));
        cx.logic.return_from_block(cx.block, value);
        Vec::new()
    }
}
