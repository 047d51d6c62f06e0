pub mod amount;
pub mod common;
pub mod events;
pub mod listing;
pub mod order;

pub use amount::*;
pub use common::*;
pub use events::*;
pub use listing::*;
pub use order::*;
