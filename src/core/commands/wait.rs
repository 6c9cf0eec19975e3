use rustc_hash::FxHashMap;

use super::{CommandContext, CommandRunner};
use crate::schema::command::{CommandData, WaitParams};
use crate::schema::reference::CommandId;

/// Tick time in whole microseconds, so many small deltas sum to exactly
/// what one large delta would.
fn micros(ms: f64) -> u64 {
    if ms.is_finite() && ms > 0.0 {
        (ms * 1000.0).round() as u64
    } else {
        0
    }
}

/// Holds its block for `seconds` of tick time.
#[derive(Debug, Default)]
pub struct WaitRunner {
    elapsed_us: FxHashMap<CommandId, u64>,
}

impl CommandRunner for WaitRunner {
    type Params = WaitParams;

    fn on_execute(
        &mut self,
        _params: &WaitParams,
        data: &CommandData,
        _cx: &mut CommandContext<'_>,
    ) -> Vec<usize> {
        self.elapsed_us.insert(data.id.clone(), 0);
        Vec::new()
    }

    fn is_finished(
        &mut self,
        params: &WaitParams,
        data: &CommandData,
        _cx: &mut CommandContext<'_>,
    ) -> Option<bool> {
        if params.seconds < 0.0 {
            return Some(false);
        }
        let elapsed = self.elapsed_us.get(&data.id).copied().unwrap_or(0);
        Some(elapsed >= micros(params.seconds * 1000.0))
    }

    fn on_finished(
        &mut self,
        _params: &WaitParams,
        data: &CommandData,
        _cx: &mut CommandContext<'_>,
    ) {
        self.elapsed_us.remove(&data.id);
    }

    fn on_update(&mut self, delta_ms: f64) {
        let delta = micros(delta_ms);
        for elapsed in self.elapsed_us.values_mut() {
            *elapsed = elapsed.saturating_add(delta);
        }
    }
}
