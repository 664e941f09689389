//! HTTP API handlers for mse-scoring

pub mod error;
pub mod health;
pub mod heats;
pub mod models;
pub mod scores;

pub use error::ApiError;
pub use health::health_routes;
pub use heats::{create_final_heat, create_heat, list_heats};
pub use models::get_scoring_model;
pub use scores::{existing_scores, submit_score};
