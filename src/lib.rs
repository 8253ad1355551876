pub mod bisector;
pub mod classify;
pub mod config;
pub mod errors;
pub mod process;
pub mod repo;
pub mod stage;
pub mod ui;
