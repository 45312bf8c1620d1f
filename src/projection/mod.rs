//! Projection layer - display values and conditions derived from MediaState
//!
//! Nothing in here mutates the state store:
//! - `variables`: formatted display values pushed to the host after each update
//! - `conditions`: boolean conditions evaluated on demand against live state
//! - `artwork`: album artwork fetched and encoded for button display

pub mod artwork;
pub mod conditions;
pub mod variables;

pub use artwork::{ArtworkFetcher, ArtworkImage};
pub use conditions::Condition;
pub use variables::{format_duration, DisplayValues};
