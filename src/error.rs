//! Error types for the gpxdisk library

use std::fmt;
use std::io;

/// Result type for gpxdisk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for gpxdisk operations
#[derive(Debug)]
pub enum Error {
    /// I/O error from a file-backed flash dump or image
    Io(io::Error),

    /// Flash access outside the chip or rejected by the driver
    Flash { addr: u32, message: String },

    /// No space left in the fix log
    LogFull,

    /// Virtual file table has no free slot
    FileTableFull { capacity: usize },

    /// Virtual file does not fit into the remaining cluster space
    NoFreeClusters { needed: u32, available: u32 },

    /// Invalid 8.3 file name
    InvalidFileName { name: String, reason: String },

    /// Requested volume cannot be expressed as FAT16
    InvalidGeometry { message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {}", err),
            Self::Flash { addr, message } => {
                write!(f, "Flash error at 0x{:08x}: {}", addr, message)
            }
            Self::LogFull => write!(f, "Fix log is full"),
            Self::FileTableFull { capacity } => {
                write!(f, "File table is full ({} files)", capacity)
            }
            Self::NoFreeClusters { needed, available } => write!(
                f,
                "Not enough clusters: needed {}, available {}",
                needed, available
            ),
            Self::InvalidFileName { name, reason } => {
                write!(f, "Invalid file name '{}': {}", name, reason)
            }
            Self::InvalidGeometry { message } => write!(f, "Invalid FAT16 geometry: {}", message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

// Convenience constructors
impl Error {
    pub fn flash(addr: u32, message: impl Into<String>) -> Self {
        Self::Flash {
            addr,
            message: message.into(),
        }
    }

    pub fn invalid_file_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFileName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: message.into(),
        }
    }
}
