use tracing::{debug, warn};

use super::{CommandContext, CommandRunner};
use crate::schema::command::{CommandData, EntityParams};

#[derive(Debug, Default)]
pub struct SpawnRunner;

impl CommandRunner for SpawnRunner {
    type Params = EntityParams;

    fn on_execute(
        &mut self,
        params: &EntityParams,
        data: &CommandData,
        cx: &mut CommandContext<'_>,
    ) -> Vec<usize> {
        let entity = cx.logic.format(&params.entity, &mut cx.rng);
        debug!(command = %data.id, %entity, "spawn");
        if !cx.host.world.spawn_entity(&entity) {
            warn!(command = %data.id, %entity, "world refused spawn");
        }
        Vec::new()
    }
}

#[derive(Debug, Default)]
pub struct DestroyRunner;

impl CommandRunner for DestroyRunner {
    type Params = EntityParams;

    fn on_execute(
        &mut self,
        params: &EntityParams,
        data: &CommandData,
        cx: &mut CommandContext<'_>,
    ) -> Vec<usize> {
        let entity = cx.logic.format(&params.entity, &mut cx.rng);
        debug!(command = %data.id, %entity, "destroy");
        if !cx.host.world.destroy_entity(&entity) {
            warn!(command = %data.id, %entity, "world refused destroy");
        }
        Vec::new()
    }
}
