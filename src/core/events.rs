//! Outbound notifications for host observability (editors highlighting the
//! running command, debuggers). Queued by the engine and drained by the
//! host after each tick; they never feed back into control flow.

use serde::Serialize;

use crate::schema::reference::{BlockId, Reference};
use crate::schema::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    ExecuteBlock {
        block: BlockId,
        executed_by: Option<BlockId>,
    },
    FinishBlock {
        block: BlockId,
    },
    ExecuteCommand {
        reference: Reference,
        index: usize,
    },
    FinishCommand {
        reference: Reference,
        index: usize,
    },
    CheckTriggers {
        block: BlockId,
        satisfied: Vec<String>,
        unsatisfied: Vec<String>,
    },
    SetVariableValue {
        name: String,
        value: Value,
    },
}

#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    enabled: bool,
    events: Vec<EngineEvent>,
}

impl EventQueue {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, event: EngineEvent) {
        if self.enabled {
            self.events.push(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_queue_drops_events() {
        let mut queue = EventQueue::new(false);
        queue.push(EngineEvent::FinishBlock {
            block: BlockId::from("a"),
        });
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_empties_queue() {
        let mut queue = EventQueue::new(true);
        queue.push(EngineEvent::FinishBlock {
            block: BlockId::from("a"),
        });
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.is_empty());
    }
}
