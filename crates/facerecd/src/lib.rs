//! facerecd — HTTP face identification daemon.

pub mod config;
pub mod engine;
pub mod error;
pub mod server;

pub use config::Config;
pub use engine::{spawn_engine, EngineError, EngineHandle};
pub use error::ApiError;
pub use server::{router, AppState};
