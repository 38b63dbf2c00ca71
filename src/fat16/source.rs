//! Content sources backed by seekable streams

use std::cell::RefCell;
use std::io::{self, Read, Seek, SeekFrom};

use super::ContentSource;
use crate::error::Result;

/// Exposes a binary image, such as the running firmware, as a virtual file
#[derive(Debug)]
pub struct ImageSource<R> {
    inner: RefCell<R>,
    size: u64,
}

impl<R: Read + Seek> ImageSource<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let size = reader.seek(SeekFrom::End(0))?;
        Ok(Self {
            inner: RefCell::new(reader),
            size,
        })
    }
}

impl<R: Read + Seek> ContentSource for ImageSource<R> {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= self.size {
            return Ok(0);
        }
        let mut reader = self.inner.borrow_mut();
        reader.seek(SeekFrom::Start(offset))?;
        let mut filled = 0;
        while filled < buf.len() {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}
