use tracing::{error, info, warn};

use super::{CommandContext, CommandRunner};
use crate::schema::command::{CommandData, LogParams, LogSeverity};

/// Author-facing log lines, sent to the debug sink and to `tracing`.
#[derive(Debug, Default)]
pub struct LogRunner;

impl CommandRunner for LogRunner {
    type Params = LogParams;

    fn on_execute(
        &mut self,
        params: &LogParams,
        data: &CommandData,
        cx: &mut CommandContext<'_>,
    ) -> Vec<usize> {
        let message = cx.logic.format(&params.message, &mut cx.rng);
        match params.severity {
            LogSeverity::Info => info!(command = %data.id, "{message}"),
            LogSeverity::Warning => warn!(command = %data.id, "{message}"),
            LogSeverity::Error => error!(command = %data.id, "{message}"),
        }
        cx.host
            .debug
            .log(params.severity, &message, &data.reference());
        Vec::new()
    }
}
