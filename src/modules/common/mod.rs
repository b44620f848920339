pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod utils;
