pub mod errors;
pub mod input;
pub mod query;
pub mod service;
pub mod stats;
pub mod store;
pub mod todo;

pub use errors::*;
pub use input::*;
pub use query::*;
pub use service::*;
pub use stats::*;
pub use store::*;
pub use todo::*;
