pub mod config;
pub mod errors;
pub mod retry;
pub mod tracing;

pub use config::*;
pub use errors::*;
pub use retry::*;
pub use self::tracing::{init_tracing, LogFormat};
