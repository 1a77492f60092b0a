//! API Routes
//!
//! Route handlers organized by functionality.

pub mod analytics;
pub mod dashboard;
pub mod export;
pub mod health;
pub mod records;
pub mod session;
pub mod settings;
pub mod training;
pub mod workouts;
