pub mod chapter;
pub mod health;
pub mod manga;
