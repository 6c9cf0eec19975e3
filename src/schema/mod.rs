//! Compiled program data: values, references, commands and blocks.

pub mod block;
pub mod command;
pub mod program;
pub mod reference;
pub mod value;
