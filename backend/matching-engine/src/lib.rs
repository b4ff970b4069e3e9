pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use engine::{EngineStatus, MatchingEngine};
pub use error::{MatchingError, Result};
pub use models::{MatchScore, MatchType, UserProfile};
