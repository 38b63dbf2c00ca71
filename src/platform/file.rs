//! Flash chip backed by a dump file on the host

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::{check_range, Flash, ERASED_BYTE};
use crate::error::Result;

/// Flash emulated on top of a seekable stream.
///
/// Dumps are often shorter than the chip: everything past the end of the
/// stream reads as erased. Writes are plain overwrites, the stream is
/// extended as needed.
#[derive(Debug)]
pub struct FileFlash<S = File> {
    stream: S,
    capacity: u32,
}

impl FileFlash<File> {
    /// Open a dump file read-write, creating it if missing
    pub fn open<P: AsRef<Path>>(path: P, capacity: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;
        log::debug!(
            "Opened flash dump {} ({} bytes chip)",
            path.as_ref().display(),
            capacity
        );
        Ok(Self::new(file, capacity))
    }
}

impl<S: Read + Write + Seek> FileFlash<S> {
    pub fn new(stream: S, capacity: u32) -> Self {
        Self { stream, capacity }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read + Write + Seek> Flash for FileFlash<S> {
    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        check_range(self.capacity, addr, buf.len())?;
        self.stream.seek(SeekFrom::Start(addr as u64))?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        buf[filled..].fill(ERASED_BYTE);
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        check_range(self.capacity, addr, data.len())?;
        let end = self.stream.seek(SeekFrom::End(0))?;
        if end < addr as u64 {
            // Keep the gap erased instead of zero-filled
            let gap = vec![ERASED_BYTE; (addr as u64 - end) as usize];
            self.stream.write_all(&gap)?;
        }
        self.stream.seek(SeekFrom::Start(addr as u64))?;
        self.stream.write_all(data)?;
        Ok(())
    }

    fn erase_chip(&mut self) -> Result<()> {
        self.stream.seek(SeekFrom::Start(0))?;
        let block = vec![ERASED_BYTE; 4096];
        let mut left = self.capacity as usize;
        while left > 0 {
            let n = left.min(block.len());
            self.stream.write_all(&block[..n])?;
            left -= n;
        }
        self.stream.flush()?;
        log::info!("Flash dump erased ({} bytes)", self.capacity);
        Ok(())
    }
}
