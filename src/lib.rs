//! gpxdisk: GPS track logger core
//!
//! Fixes are appended to a flat log in external flash. The log is exposed to
//! a USB host as `TRACK.GPX` on an emulated FAT16 disk whose sectors, and the
//! GPX text inside them, are generated on demand.

pub mod config;
pub mod error;
pub mod fat16;
pub mod gpx;
pub mod logger;
pub mod platform;
pub mod storage;

// Re-export main types
pub use config::LoggerConfig;
pub use error::{Error, Result};
pub use fat16::{BlockDevice, ContentSource, Volume, VolumeConfig};
pub use gpx::GpxDocument;
pub use logger::Logger;
pub use platform::{FileFlash, Flash, MemFlash};
pub use storage::{FixLog, FixRecord, GpsFix};
