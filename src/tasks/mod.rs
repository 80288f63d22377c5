//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Deleter: removes expired entries at the configured interval
//! - Dumper: writes a full snapshot at the configured interval

mod deleter;
mod dumper;
mod periodic;

pub use deleter::Deleter;
pub use dumper::Dumper;
