pub mod api;
pub use api::{ApiError, BoardApi};
pub mod error;
pub use error::EngineError;
pub mod state;
pub use state::BoardState;
pub mod engine;
pub use engine::SyncEngine;
