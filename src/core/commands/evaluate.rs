use super::{CommandContext, CommandRunner};
use crate::schema::command::{CommandData, EvaluateParams};

#[derive(Debug, Default)]
pub struct EvaluateRunner;

impl CommandRunner for EvaluateRunner {
    type Params = EvaluateParams;

    fn on_execute(
        &mut self,
        params: &EvaluateParams,
        _data: &CommandData,
        cx: &mut CommandContext<'_>,
    ) -> Vec<usize> {
        cx.logic.execute(&params.expression, &mut cx.rng);
        Vec::new()
    }
}
