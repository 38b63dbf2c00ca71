//! Flash memory backends the fix log is stored on

pub mod file;
pub mod mem;

use crate::error::Result;

pub use file::FileFlash;
pub use mem::MemFlash;

/// Value of every byte of freshly erased NOR flash
pub const ERASED_BYTE: u8 = 0xFF;

/// External non-volatile memory as seen by the fix log.
///
/// Addresses are byte offsets from the start of the chip. Implementations
/// report out-of-range access as [`crate::Error::Flash`]; the caller decides
/// whether that is fatal.
pub trait Flash {
    /// Size of the chip in bytes
    fn capacity(&self) -> u32;

    /// Read `buf.len()` bytes starting at `addr`
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Program `data` starting at `addr`
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()>;

    /// Erase the whole chip back to [`ERASED_BYTE`]
    fn erase_chip(&mut self) -> Result<()>;
}

impl<T: Flash + ?Sized> Flash for &mut T {
    fn capacity(&self) -> u32 {
        (**self).capacity()
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read(addr, buf)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        (**self).write(addr, data)
    }

    fn erase_chip(&mut self) -> Result<()> {
        (**self).erase_chip()
    }
}

pub(crate) fn check_range(capacity: u32, addr: u32, len: usize) -> Result<()> {
    let end = addr as u64 + len as u64;
    if end > capacity as u64 {
        return Err(crate::Error::flash(
            addr,
            format!("{} bytes exceed chip size {}", len, capacity),
        ));
    }
    Ok(())
}
