// Library interface for redis-image-check
// Exposes the harness pieces to the binary and to integration tests

pub mod cases;
pub mod cli;
pub mod clock;
pub mod config;
pub mod containers;
pub mod docs;
pub mod errors;
pub mod interrupt;
pub mod logging;
pub mod probe;
pub mod redis_cli;
pub mod runtime;
pub mod suite;
