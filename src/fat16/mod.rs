//! Virtual FAT16 volume
//!
//! Nothing of the filesystem is stored. Each sector is computed on request
//! from the volume geometry and a small table of virtual files whose content
//! comes from pluggable sources.
//!
//! FAT16 layout references:
//! <https://en.wikipedia.org/wiki/Design_of_the_FAT_file_system>

pub mod boot_sector;
pub mod directory;
pub mod fat_table;
pub mod geometry;
pub mod source;
pub mod volume;

use std::borrow::Cow;
use std::io::Write;

use crate::error::Result;

pub use geometry::{Geometry, VolumeConfig};
pub use source::ImageSource;
pub use volume::{VirtualFile, Volume};

/// Bytes in a sector, the only size the transport uses
pub const SECTOR_SIZE: usize = 512;

/// Size of one directory entry
pub const DIR_ENTRY_SIZE: usize = 32;

/// First cluster of the data region
pub const FIRST_CLUSTER: u16 = 2;

/// FAT16 needs at least this many clusters or hosts treat it as FAT12
pub const FAT16_MIN_CLUSTERS: u32 = 4095;

/// Largest cluster count a FAT16 volume may have
pub const FAT16_MAX_CLUSTERS: u32 = 65524;

/// Clusters at and above this value are reserved markers
pub const FAT16_CLUSTER_LIMIT: u32 = 0xFFEF;

/// Media descriptor for fixed disks
pub const MEDIA_DESCRIPTOR: u8 = 0xF8;

/// Producer of a virtual file's bytes.
///
/// Called synchronously from [`Volume::read`]; the content is never cached.
pub trait ContentSource {
    /// Current length of the content in bytes
    fn size(&self) -> Result<u64>;

    /// Fill `buf` with the bytes starting at `offset`, returning how many
    /// were produced
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;
}

impl<T: ContentSource + ?Sized> ContentSource for std::rc::Rc<T> {
    fn size(&self) -> Result<u64> {
        (**self).size()
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        (**self).read(offset, buf)
    }
}

/// Where a virtual file gets its bytes from
pub enum FileContent {
    /// Computed on every read
    Generated(Box<dyn ContentSource>),
    /// Fixed bytes
    Text(Cow<'static, [u8]>),
}

impl FileContent {
    pub(crate) fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        match self {
            Self::Generated(source) => source.read(offset, buf),
            Self::Text(text) => {
                if offset >= text.len() as u64 {
                    return Ok(0);
                }
                let start = offset as usize;
                let n = buf.len().min(text.len() - start);
                buf[..n].copy_from_slice(&text[start..start + n]);
                Ok(n)
            }
        }
    }
}

impl std::fmt::Debug for FileContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generated(_) => f.write_str("Generated(..)"),
            Self::Text(text) => write!(f, "Text({} bytes)", text.len()),
        }
    }
}

/// Sector-addressed device as driven by a mass-storage transport
pub trait BlockDevice {
    /// Fill `buf` with sector `lba`. Never fails: unknown content reads as
    /// zeros.
    fn read_sector(&self, lba: u32, buf: &mut [u8; SECTOR_SIZE]);

    /// Accept sector `lba` from the host
    fn write_sector(&mut self, lba: u32, buf: &[u8; SECTOR_SIZE]) -> Result<()>;

    /// Device capacity in sectors
    fn sector_count(&self) -> u32;
}

/// Copy every sector of `device` to `out`, returning the bytes written
pub fn write_image<D, W>(device: &D, mut out: W) -> Result<u64>
where
    D: BlockDevice + ?Sized,
    W: Write,
{
    let mut sector = [0u8; SECTOR_SIZE];
    for lba in 0..device.sector_count() {
        device.read_sector(lba, &mut sector);
        out.write_all(&sector)?;
    }
    out.flush()?;
    Ok(device.sector_count() as u64 * SECTOR_SIZE as u64)
}
