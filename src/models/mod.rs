//! Defines the data structures and models used throughout the application.
//!
//! `open_meteo` holds the wire shapes of the remote sources; `snapshot` holds the
//! domain types the pipeline produces and the presentation layer consumes.

mod open_meteo;
mod snapshot;

pub use open_meteo::*;
pub use snapshot::*;
