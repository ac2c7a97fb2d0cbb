mod store;

pub use store::{CurrentStatus, LatestStatus, StatusSnapshot, StatusStore};
