pub mod commands;
pub mod config;
pub mod engine;
pub mod events;
pub mod expr;
pub mod flow;
pub mod graph;
pub mod host;
pub mod logic;
pub mod rng;
pub mod runner;
pub mod state;
