//! Core engine module
//!
//! Window, event loop and frame timing

mod engine;
mod time;

pub use engine::{Engine, EngineConfig, EngineContext, Game};
pub use time::Time;
