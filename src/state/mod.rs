//! State management module - cached media state of the remote app
//!
//! Holds the one `MediaState` per running bridge. It is created at startup,
//! mutated by the event interpreter and never persisted.

mod store;
mod types;

pub use store::MediaStore;
pub use types::{MediaState, ReportedFlag, Track};
