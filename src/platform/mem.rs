//! In-memory flash chip

use std::fs;
use std::path::Path;

use super::{check_range, Flash, ERASED_BYTE};
use crate::error::Result;

/// RAM-backed flash with NOR programming semantics.
///
/// Programming can only clear bits, so writing over already programmed
/// bytes stores `old & new` the same way the real chip does.
#[derive(Debug, Clone)]
pub struct MemFlash {
    data: Vec<u8>,
    writes: usize,
}

impl MemFlash {
    /// Create an erased chip of `capacity` bytes
    pub fn new(capacity: u32) -> Self {
        Self {
            data: vec![ERASED_BYTE; capacity as usize],
            writes: 0,
        }
    }

    /// Create a chip holding a previously captured dump
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, writes: 0 }
    }

    /// Copy a dump file into memory, padded with erased bytes up to
    /// `capacity`. The file itself is never written.
    pub fn load<P: AsRef<Path>>(path: P, capacity: u32) -> Result<Self> {
        let mut data = fs::read(path.as_ref())?;
        log::debug!(
            "Loaded flash dump {} ({} bytes)",
            path.as_ref().display(),
            data.len()
        );
        if data.len() < capacity as usize {
            data.resize(capacity as usize, ERASED_BYTE);
        }
        Ok(Self::from_bytes(data))
    }

    /// Raw chip contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of program operations since creation
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl Flash for MemFlash {
    fn capacity(&self) -> u32 {
        self.data.len() as u32
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        check_range(self.capacity(), addr, buf.len())?;
        let start = addr as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        check_range(self.capacity(), addr, data.len())?;
        let start = addr as usize;
        for (cell, byte) in self.data[start..start + data.len()].iter_mut().zip(data) {
            *cell &= *byte;
        }
        self.writes += 1;
        Ok(())
    }

    fn erase_chip(&mut self) -> Result<()> {
        self.data.fill(ERASED_BYTE);
        Ok(())
    }
}
