mod account;
mod money;
mod transaction;
mod user;

pub use account::*;
pub use money::*;
pub use transaction::*;
pub use user::*;
