//! WASM bindings for sparkdown-engine: drives a program from a browser page.
//!
//! Everything the engine presents is buffered as JSON-friendly records and
//! handed to JavaScript by [`SparkdownPlayer::take_output`].

use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use sparkdown_engine::core::engine::Engine;
use sparkdown_engine::core::host::{DebugLog, DisplayRequest, Sound, Ui, World};
use sparkdown_engine::schema::command::LogSeverity;
use sparkdown_engine::schema::program::Program;
use sparkdown_engine::schema::reference::Reference;
use sparkdown_engine::schema::value::Value;

mod data {
    pub const TAVERN: &str = include_str!("../../tests/fixtures/tavern.ron");
}

// ---------------------------------------------------------------------------
// Output records crossing the WASM boundary
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Output {
    Display(DisplayRequest),
    Reveal { target: String, visible_chars: usize },
    Choices { target: String, choices: Vec<String> },
    Clear { target: String },
    Spawn { entity: String },
    Destroy { entity: String },
    Sound { assets: Vec<String> },
    StopSound { fade_seconds: f64 },
    Log { severity: LogSeverity, message: String, source: String },
}

/// Host collaborator that records into a buffer shared with the player.
#[derive(Clone, Default)]
struct Buffer(Rc<RefCell<Vec<Output>>>);

impl Buffer {
    fn push(&self, output: Output) {
        self.0.borrow_mut().push(output);
    }
}

impl Ui for Buffer {
    fn display(&mut self, request: &DisplayRequest) {
        self.push(Output::Display(request.clone()));
    }

    fn reveal(&mut self, target: &str, visible_chars: usize) {
        self.push(Output::Reveal {
            target: target.to_string(),
            visible_chars,
        });
    }

    fn show_choices(&mut self, target: &str, choices: &[String]) {
        self.push(Output::Choices {
            target: target.to_string(),
            choices: choices.to_vec(),
        });
    }

    fn clear(&mut self, target: &str) {
        self.push(Output::Clear {
            target: target.to_string(),
        });
    }
}

impl World for Buffer {
    fn spawn_entity(&mut self, entity: &str) -> bool {
        self.push(Output::Spawn {
            entity: entity.to_string(),
        });
        true
    }

    fn destroy_entity(&mut self, entity: &str) -> bool {
        self.push(Output::Destroy {
            entity: entity.to_string(),
        });
        true
    }
}

impl Sound for Buffer {
    fn start(&mut self, assets: &[String]) {
        self.push(Output::Sound {
            assets: assets.to_vec(),
        });
    }

    fn stop_all(&mut self) {
        self.push(Output::StopSound { fade_seconds: 0.0 });
    }

    fn fade_all(&mut self, seconds: f64) {
        self.push(Output::StopSound {
            fade_seconds: seconds,
        });
    }
}

impl DebugLog for Buffer {
    fn log(&mut self, severity: LogSeverity, message: &str, source: &Reference) {
        self.push(Output::Log {
            severity,
            message: message.to_string(),
            source: source.id.clone(),
        });
    }
}

fn build(program: Program, seed: &str, buffer: &Buffer) -> Result<Engine, JsError> {
    let mut engine = Engine::builder()
        .program(program)
        .seed(seed)
        .world(buffer.clone())
        .ui(buffer.clone())
        .sound(buffer.clone())
        .debug(buffer.clone())
        .build()
        .map_err(|e| JsError::new(&format!("Engine build error: {e}")))?;
    engine.start();
    Ok(engine)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

// ---------------------------------------------------------------------------
// SparkdownPlayer: the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct SparkdownPlayer {
    engine: Engine,
    program: Program,
    buffer: Buffer,
}

#[wasm_bindgen]
impl SparkdownPlayer {
    /// Load a program serialized as JSON and start it.
    #[wasm_bindgen(constructor)]
    pub fn new(program_json: &str, seed: &str) -> Result<SparkdownPlayer, JsError> {
        let program: Program = serde_json::from_str(program_json)
            .map_err(|e| JsError::new(&format!("Invalid program JSON: {e}")))?;
        Self::with_program(program, seed)
    }

    /// Load a program in RON form and start it.
    pub fn from_ron(program_ron: &str, seed: &str) -> Result<SparkdownPlayer, JsError> {
        let program = Program::parse_ron(program_ron)
            .map_err(|e| JsError::new(&format!("Program parse error: {e}")))?;
        Self::with_program(program, seed)
    }

    /// The bundled tavern scene.
    pub fn demo(seed: &str) -> Result<SparkdownPlayer, JsError> {
        Self::from_ron(data::TAVERN, seed)
    }

    /// Advance one tick. Returns "running", "idle" or "quit".
    pub fn update(&mut self, delta_ms: f64) -> String {
        match self.engine.update(delta_ms) {
            Some(true) => "running",
            Some(false) => "idle",
            None => "quit",
        }
        .to_string()
    }

    pub fn press(&mut self) {
        self.engine.press();
    }

    pub fn set_pointer_down(&mut self, down: bool) {
        self.engine.set_pointer_down(down);
    }

    pub fn choose(&mut self, option: usize) {
        self.engine.choose(option);
    }

    /// JSON array of everything presented since the last call.
    pub fn take_output(&mut self) -> Result<String, JsError> {
        let output = std::mem::take(&mut *self.buffer.0.borrow_mut());
        to_json(&output)
    }

    /// JSON array of queued engine events.
    pub fn drain_events(&mut self) -> Result<String, JsError> {
        to_json(&self.engine.drain_events())
    }

    /// JSON object of all variables.
    pub fn variables(&self) -> Result<String, JsError> {
        to_json(&self.engine.snapshot_variables())
    }

    /// Set a variable from a JSON value (number, bool or string).
    pub fn set_variable(&mut self, name: &str, value_json: &str) -> Result<(), JsError> {
        let value = match serde_json::from_str::<serde_json::Value>(value_json)
            .map_err(|e| JsError::new(&format!("Invalid value JSON: {e}")))?
        {
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Null => Value::Undefined,
            other => return Err(JsError::new(&format!("Unsupported value: {other}"))),
        };
        self.engine.set_variable(name, value);
        Ok(())
    }

    pub fn has_quit(&self) -> bool {
        self.engine.has_quit()
    }

    /// Restart from the root with a new seed.
    pub fn reset(&mut self, seed: &str) -> Result<(), JsError> {
        self.buffer.0.borrow_mut().clear();
        self.engine = build(self.program.clone(), seed, &self.buffer)?;
        Ok(())
    }
}

// Private helpers
impl SparkdownPlayer {
    fn with_program(program: Program, seed: &str) -> Result<SparkdownPlayer, JsError> {
        let buffer = Buffer::default();
        let engine = build(program.clone(), seed, &buffer)?;
        Ok(SparkdownPlayer {
            engine,
            program,
            buffer,
        })
    }
}
