//! Presentation-side collaborators.
//!
//! The engine never renders, plays audio or owns game entities itself; it
//! calls these traits. Every method has a no-op default so a host only
//! implements what it cares about.

use serde::Serialize;

use crate::schema::command::{DisplayKind, LogSeverity};
use crate::schema::reference::{BlockId, CommandId, Reference};

/// Text a display command wants shown, already interpolated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRequest {
    pub block: BlockId,
    pub command: CommandId,
    pub kind: DisplayKind,
    pub target: String,
    pub character: Option<String>,
    pub parenthetical: Option<String>,
    pub content: String,
    pub choices: Vec<String>,
}

pub trait World {
    /// Returns false if the world refused the entity.
    fn spawn_entity(&mut self, _entity: &str) -> bool {
        true
    }

    fn destroy_entity(&mut self, _entity: &str) -> bool {
        true
    }
}

pub trait Ui {
    fn display(&mut self, _request: &DisplayRequest) {}

    /// Typewriter progress: the first `visible_chars` characters of the
    /// current content of `target` are visible.
    fn reveal(&mut self, _target: &str, _visible_chars: usize) {}

    fn show_choices(&mut self, _target: &str, _choices: &[String]) {}

    fn clear(&mut self, _target: &str) {}
}

pub trait Sound {
    /// Called once at build with every asset any display may start.
    fn load_all(&mut self, _assets: &[String]) {}

    fn start(&mut self, _assets: &[String]) {}

    fn stop_all(&mut self) {}

    fn fade_all(&mut self, _seconds: f64) {}
}

pub trait DebugLog {
    fn log(&mut self, _severity: LogSeverity, _message: &str, _source: &Reference) {}
}

/// Does nothing. Stands in for any collaborator the host leaves out.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl World for NullHost {}
impl Ui for NullHost {}
impl Sound for NullHost {}
impl DebugLog for NullHost {}

/// The collaborators an engine talks to.
pub struct Host {
    pub world: Box<dyn World>,
    pub ui: Box<dyn Ui>,
    pub sound: Box<dyn Sound>,
    pub debug: Box<dyn DebugLog>,
}

impl Default for Host {
    fn default() -> Self {
        Self {
            world: Box::new(NullHost),
            ui: Box::new(NullHost),
            sound: Box::new(NullHost),
            debug: Box::new(NullHost),
        }
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}

/// Pointer input as seen by one tick.
///
/// The host reports pointer state at any time; [`InputState::latch`] turns
/// it into a press edge at the start of a tick and [`InputState::end_tick`]
/// discards whatever the tick did not consume.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    down: bool,
    was_down: bool,
    queued_press: bool,
    pressed: bool,
    choice: Option<usize>,
}

impl InputState {
    pub fn set_pointer_down(&mut self, down: bool) {
        self.down = down;
    }

    pub fn is_down(&self) -> bool {
        self.down
    }

    /// A complete click, independent of pointer state.
    pub fn press(&mut self) {
        self.queued_press = true;
    }

    pub fn choose(&mut self, option: usize) {
        self.choice = Some(option);
    }

    pub fn latch(&mut self) {
        self.pressed = self.queued_press || (self.down && !self.was_down);
        self.queued_press = false;
        self.was_down = self.down;
    }

    /// Consume this tick's press edge.
    pub fn take_press(&mut self) -> bool {
        std::mem::take(&mut self.pressed)
    }

    pub fn take_choice(&mut self) -> Option<usize> {
        self.choice.take()
    }

    pub fn end_tick(&mut self) {
        self.pressed = false;
        self.choice = None;
    }
}
