//! Append-only log of GPS fixes in external flash
//!
//! Records have a fixed width and are written back to back from offset 0.
//! The first record that reads as erased flash marks the end of the log, so
//! the write cursor is rebuilt at boot by scanning forward. An all-zero
//! record marks the boundary between two logging sessions.

use crate::error::{Error, Result};
use crate::platform::{Flash, ERASED_BYTE};

/// Width of one [`FixRecord`] on flash
pub const RECORD_SIZE: usize = 22;

/// One position sample as delivered by the GPS receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpsFix {
    /// Latitude as `lat / lat_scale` degrees
    pub lat: i32,
    pub lat_scale: i32,
    /// Longitude as `lon / lon_scale` degrees
    pub lon: i32,
    pub lon_scale: i32,
    /// Unix time, seconds
    pub timestamp: u32,
    /// Altitude above sea level in decimeters
    pub altitude_dm: i32,
}

/// Persisted fix, byte-exact on-flash layout (little endian, no padding):
///
/// | offset | field       |
/// |--------|-------------|
/// | 0      | `lat`       |
/// | 4      | `lat_scale` |
/// | 8      | `lon`       |
/// | 12     | `lon_scale` |
/// | 16     | `timestamp` |
/// | 20     | `elevation_m` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixRecord {
    pub lat: i32,
    pub lat_scale: i32,
    pub lon: i32,
    pub lon_scale: i32,
    pub timestamp: u32,
    pub elevation_m: i16,
}

impl FixRecord {
    /// Session boundary marker
    pub const EOL: FixRecord = FixRecord {
        lat: 0,
        lat_scale: 0,
        lon: 0,
        lon_scale: 0,
        timestamp: 0,
        elevation_m: 0,
    };

    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0..4].copy_from_slice(&self.lat.to_le_bytes());
        buf[4..8].copy_from_slice(&self.lat_scale.to_le_bytes());
        buf[8..12].copy_from_slice(&self.lon.to_le_bytes());
        buf[12..16].copy_from_slice(&self.lon_scale.to_le_bytes());
        buf[16..20].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[20..22].copy_from_slice(&self.elevation_m.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; RECORD_SIZE]) -> Self {
        let word = |at: usize| [buf[at], buf[at + 1], buf[at + 2], buf[at + 3]];
        Self {
            lat: i32::from_le_bytes(word(0)),
            lat_scale: i32::from_le_bytes(word(4)),
            lon: i32::from_le_bytes(word(8)),
            lon_scale: i32::from_le_bytes(word(12)),
            timestamp: u32::from_le_bytes(word(16)),
            elevation_m: i16::from_le_bytes([buf[20], buf[21]]),
        }
    }

    /// All bytes zero: end of a logging session
    pub fn is_eol(&self) -> bool {
        self.to_bytes().iter().all(|&b| b == 0x00)
    }

    /// All bytes erased: nothing was ever written here
    pub fn is_erased(&self) -> bool {
        self.to_bytes().iter().all(|&b| b == ERASED_BYTE)
    }
}

impl From<&GpsFix> for FixRecord {
    fn from(fix: &GpsFix) -> Self {
        let elevation = (fix.altitude_dm / 10).clamp(i16::MIN as i32, i16::MAX as i32);
        Self {
            lat: fix.lat,
            lat_scale: fix.lat_scale,
            lon: fix.lon,
            lon_scale: fix.lon_scale,
            timestamp: fix.timestamp,
            elevation_m: elevation as i16,
        }
    }
}

/// Fix log occupying `[0, capacity)` of a flash chip
#[derive(Debug)]
pub struct FixLog<F> {
    flash: F,
    capacity: u32,
    offset: u32,
}

impl<F: Flash> FixLog<F> {
    /// Scan the flash for the end of the log and close the previous session.
    ///
    /// `capacity` is clamped to the chip size and rounded down to whole
    /// records.
    pub fn init(mut flash: F, capacity: u32) -> Result<Self> {
        let capacity = capacity.min(flash.capacity());
        let capacity = capacity - capacity % RECORD_SIZE as u32;

        let mut buf = [0u8; RECORD_SIZE];
        let mut offset = 0u32;
        while offset < capacity {
            flash.read(offset, &mut buf)?;
            if buf.iter().all(|&b| b == ERASED_BYTE) {
                break;
            }
            offset += RECORD_SIZE as u32;
        }
        log::debug!(
            "Fix log scan stopped at offset {} ({} records)",
            offset,
            offset / RECORD_SIZE as u32
        );

        let mut log = Self {
            flash,
            capacity,
            offset,
        };

        if log.offset != 0 && log.offset < log.capacity {
            let last = log.read_at(log.offset - RECORD_SIZE as u32)?;
            if !last.is_eol() {
                log.write_record(&FixRecord::EOL)?;
                log::info!("Closed previous session at record {}", log.count() - 1);
            }
        }
        Ok(log)
    }

    /// Store one record at the end of the log
    pub fn append(&mut self, record: &FixRecord) -> Result<()> {
        if self.remaining() == 0 {
            return Err(Error::LogFull);
        }
        self.write_record(record)
    }

    /// Record at `index`, `None` past the end of the log
    pub fn get(&mut self, index: u32) -> Result<Option<FixRecord>> {
        let offset = index as u64 * RECORD_SIZE as u64;
        if offset >= self.offset as u64 {
            return Ok(None);
        }
        self.read_at(offset as u32).map(Some)
    }

    /// Last record of the log
    pub fn last(&mut self) -> Result<Option<FixRecord>> {
        match self.count() {
            0 => Ok(None),
            n => self.get(n - 1),
        }
    }

    /// Records stored
    pub fn count(&self) -> u32 {
        self.offset / RECORD_SIZE as u32
    }

    /// Records that still fit
    pub fn remaining(&self) -> u32 {
        (self.capacity - self.offset) / RECORD_SIZE as u32
    }

    /// Total records the log can hold
    pub fn capacity_records(&self) -> u32 {
        self.capacity / RECORD_SIZE as u32
    }

    /// Erase the chip and start over at offset 0
    pub fn erase(&mut self) -> Result<()> {
        self.flash.erase_chip()?;
        self.offset = 0;
        log::info!("Fix log erased");
        Ok(())
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn into_flash(self) -> F {
        self.flash
    }

    fn read_at(&mut self, offset: u32) -> Result<FixRecord> {
        let mut buf = [0u8; RECORD_SIZE];
        self.flash.read(offset, &mut buf)?;
        Ok(FixRecord::from_bytes(&buf))
    }

    fn write_record(&mut self, record: &FixRecord) -> Result<()> {
        self.flash.write(self.offset, &record.to_bytes())?;
        self.offset += RECORD_SIZE as u32;
        Ok(())
    }
}
