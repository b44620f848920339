pub mod backup;
pub mod common;
pub mod diff;
pub mod remover;
pub mod rules;
pub mod scanner;
pub mod snapshot;
