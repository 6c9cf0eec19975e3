//! Text display with typewriter reveal, click-to-continue and choices.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use super::{CommandContext, CommandRunner};
use crate::core::graph::JumpTarget;
use crate::core::host::DisplayRequest;
use crate::schema::command::{CommandData, DisplayParams};
use crate::schema::reference::CommandId;

#[derive(Debug)]
struct Typing {
    elapsed_ms: f64,
    letter_delay_ms: f64,
    total_chars: usize,
    visible_chars: usize,
    revealed: bool,
    advanced: bool,
    chosen: Option<usize>,
}

impl Typing {
    /// Characters the clock has uncovered so far.
    fn clock_chars(&self) -> usize {
        if self.letter_delay_ms <= 0.0 {
            return self.total_chars;
        }
        let chars = (self.elapsed_ms / self.letter_delay_ms).floor();
        if chars >= self.total_chars as f64 {
            self.total_chars
        } else {
            chars as usize
        }
    }
}

#[derive(Debug, Default)]
pub struct DisplayRunner {
    active: FxHashMap<CommandId, Typing>,
}

impl CommandRunner for DisplayRunner {
    type Params = DisplayParams;

    fn on_execute(
        &mut self,
        params: &DisplayParams,
        data: &CommandData,
        cx: &mut CommandContext<'_>,
    ) -> Vec<usize> {
        let content = cx.logic.format(&params.content, &mut cx.rng);
        let character = params
            .character
            .as_deref()
            .map(|c| cx.logic.format(c, &mut cx.rng));
        let parenthetical = params
            .parenthetical
            .as_deref()
            .map(|p| cx.logic.format(p, &mut cx.rng));
        let choices: Vec<String> = params
            .choices
            .iter()
            .map(|c| cx.logic.format(&c.content, &mut cx.rng))
            .collect();

        let request = DisplayRequest {
            block: cx.block.clone(),
            command: data.id.clone(),
            kind: params.kind,
            target: params.target.clone(),
            character,
            parenthetical,
            content,
            choices,
        };
        debug!(command = %data.id, target = %request.target, "display");

        cx.host.ui.display(&request);
        if !request.choices.is_empty() {
            cx.host.ui.show_choices(&request.target, &request.choices);
        }
        if !params.assets.is_empty() {
            cx.host.sound.start(&params.assets);
        }

        let letter_delay = params
            .letter_delay
            .unwrap_or(cx.config.default_letter_delay)
            .max(0.0);
        let total_chars = request.content.chars().count();
        let mut typing = Typing {
            elapsed_ms: 0.0,
            letter_delay_ms: letter_delay * 1000.0,
            total_chars,
            visible_chars: 0,
            revealed: false,
            advanced: false,
            chosen: None,
        };
        if typing.clock_chars() >= total_chars {
            typing.revealed = true;
            typing.visible_chars = total_chars;
            cx.host.ui.reveal(&request.target, total_chars);
        }
        self.active.insert(data.id.clone(), typing);
        Vec::new()
    }

    fn is_finished(
        &mut self,
        params: &DisplayParams,
        data: &CommandData,
        cx: &mut CommandContext<'_>,
    ) -> Option<bool> {
        let Some(typing) = self.active.get_mut(&data.id) else {
            return Some(true);
        };

        if !typing.revealed {
            let visible = typing.clock_chars();
            if visible >= typing.total_chars {
                typing.revealed = true;
            } else if visible != typing.visible_chars {
                typing.visible_chars = visible;
                cx.host.ui.reveal(&params.target, visible);
            }
        }

        if cx.input.take_press() {
            if !typing.revealed {
                typing.revealed = true;
            } else if params.choices.is_empty() {
                typing.advanced = true;
            }
        }

        if params.choices.is_empty() {
            if typing.revealed && typing.visible_chars < typing.total_chars {
                typing.visible_chars = typing.total_chars;
                cx.host.ui.reveal(&params.target, typing.total_chars);
            }
            return Some(typing.revealed && (params.auto_advance || typing.advanced));
        }

        if let Some(option) = cx.input.take_choice() {
            if option < params.choices.len() {
                typing.chosen = Some(option);
                typing.revealed = true;
            } else {
                warn!(command = %data.id, option, "choice out of range");
            }
        }
        if typing.revealed && typing.visible_chars < typing.total_chars {
            typing.visible_chars = typing.total_chars;
            cx.host.ui.reveal(&params.target, typing.total_chars);
        }

        let Some(option) = typing.chosen else {
            return Some(false);
        };
        let graph = cx.logic.graph();
        if graph.choice_target(&data.id, option) == Some(&JumpTarget::Quit) {
            self.active.remove(&data.id);
            return None;
        }
        Some(true)
    }

    /// A made choice leaves the block: it is stopped and the chosen section
    /// entered in its place, keeping the block's caller.
    fn on_finished(
        &mut self,
        params: &DisplayParams,
        data: &CommandData,
        cx: &mut CommandContext<'_>,
    ) {
        let Some(typing) = self.active.remove(&data.id) else {
            return;
        };
        let Some(option) = typing.chosen else {
            return;
        };
        cx.host.ui.clear(&params.target);

        let graph = cx.logic.graph();
        match graph.choice_target(&data.id, option) {
            Some(JumpTarget::Block(to)) => {
                debug!(command = %data.id, option, to = %to, "choice");
                cx.logic.jump_to_block(cx.block, to, false);
            }
            Some(JumpTarget::Quit) => {}
            None => debug!(command = %data.id, option, "choice target unresolved"),
        }
    }

    fn on_update(&mut self, delta_ms: f64) {
        for typing in self.active.values_mut() {
            if !typing.revealed {
                typing.elapsed_ms += delta_ms;
            }
        }
    }
}
