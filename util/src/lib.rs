//! Utility library for the drive simulator
//!
//! Everything here is independent of the simulation itself: sessions and logging, parameter
//! loading, CSV archives, maths helpers and the manoeuvre script reader.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod host;
pub mod logger;
pub mod maths;
pub mod params;
pub mod session;
pub mod script_interpreter;
pub mod time;
