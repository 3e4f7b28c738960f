// Re-export models
pub use crate::models::*;

pub mod catalog;
pub mod models;
pub mod navigation;
