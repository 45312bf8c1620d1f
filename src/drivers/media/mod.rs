//! Remote media app driver
//!
//! Bridges a media playback app that exposes:
//! - An event stream at `ws://{host}:{port}/ws` (track, playback and connection events)
//! - Transport commands at `http://{host}:{port}/{play,pause,toggle,next,previous}`
//!
//! The driver keeps one live event-stream connection, reconnects after loss,
//! and pushes display values and condition checks to its subscribers.

mod actions;
mod connection;
mod driver;
mod error;
mod events;

pub use actions::{CommandDispatcher, CommandResponse, TransportCommand};
pub use driver::{ConnectionPhase, MediaDriver, RECONNECT_DELAY};
pub use error::MediaError;
pub use events::MediaEvent;

use super::{ConditionsCallback, Driver, ExecutionContext, VariablesCallback};
