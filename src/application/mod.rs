pub mod error;
pub mod identity;
pub mod invalidation;
pub mod service;

pub use error::*;
pub use identity::*;
pub use invalidation::*;
pub use service::*;
