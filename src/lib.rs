//! Media Bridge
//!
//! Connects a control surface host to a remote media playback app: keeps a
//! live event stream to the app, caches what is playing, projects it into
//! display values and button conditions, and forwards transport commands.

pub mod api;
pub mod config;
pub mod drivers;
pub mod projection;
pub mod state;
pub mod status;
pub mod surface;
