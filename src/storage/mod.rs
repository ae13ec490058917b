mod janitor;
mod store;

pub use janitor::{Janitor, JanitorHandle};
pub use store::TempStore;
