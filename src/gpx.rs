//! GPX document generated on the fly from the fix log
//!
//! The document is never held in memory. After a static header it is made of
//! fixed-width slots of [`ITEM_SIZE`] bytes, so the slot covering any byte
//! offset is found by a division. Slot 0 opens the first track, slot `i`
//! renders log record `i - 1`, and a constant footer closes the document.
//! Every slot is padded with spaces and ends with a single newline.

use std::cell::RefCell;
use std::fmt::Write;
use std::rc::Rc;

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::error::Result;
use crate::fat16::ContentSource;
use crate::platform::Flash;
use crate::storage::{FixLog, FixRecord};

/// Width of one slot including the trailing newline.
///
/// The longest track point (`lat="-90.000000" lon="-180.000000"`, elevation
/// `-32768`) renders to 131 bytes.
pub const ITEM_SIZE: usize = 136;

/// Decimal places of rendered coordinates
const LATLON_SCALE: i64 = 1_000_000;

pub const HEADER: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
    "<gpx version=\"1.1\" creator=\"gpxdisk\" ",
    "xmlns=\"http://www.topografix.com/GPX/1/1\" ",
    "xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" ",
    "xsi:schemaLocation=\"http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd\">\n",
    "  <metadata>\n",
    "    <name>GPS track log</name>\n",
    "  </metadata>\n",
);

pub const FOOTER: &str = "    </trkseg>\n  </trk>\n</gpx>";

const TRACK_CLOSE: &str = "    </trkseg>\n  </trk>\n";

/// Shared handle to the fix log
pub type SharedLog<F> = Rc<RefCell<FixLog<F>>>;

/// Read-only view of the whole log as a GPX file
pub struct GpxDocument<F> {
    log: SharedLog<F>,
}

impl<F> Clone for GpxDocument<F> {
    fn clone(&self) -> Self {
        Self {
            log: Rc::clone(&self.log),
        }
    }
}

impl<F: Flash> GpxDocument<F> {
    pub fn new(log: SharedLog<F>) -> Self {
        Self { log }
    }

    /// Document length in bytes for the current log contents
    pub fn size(&self) -> Result<u32> {
        let mut log = self.log.borrow_mut();
        let slots = record_slots(&mut log)? as u64 + 1;
        let size = (HEADER.len() + FOOTER.len()) as u64 + slots * ITEM_SIZE as u64;
        Ok(u32::try_from(size).unwrap_or(u32::MAX))
    }

    /// Copy the document bytes starting at `offset` into `buf`.
    ///
    /// Returns the number of bytes produced, short only when the end of the
    /// document is reached.
    pub fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut log = self.log.borrow_mut();

        let header_len = HEADER.len() as u64;
        let footer_start = header_len + (record_slots(&mut log)? as u64 + 1) * ITEM_SIZE as u64;
        let total = footer_start + FOOTER.len() as u64;

        let mut item = [0u8; ITEM_SIZE];
        let mut cached_slot = None;
        let mut pos = offset;
        let mut written = 0usize;

        while written < buf.len() && pos < total {
            let want = buf.len() - written;
            let n = if pos < header_len {
                let start = pos as usize;
                let n = want.min(HEADER.len() - start);
                buf[written..written + n].copy_from_slice(&HEADER.as_bytes()[start..start + n]);
                n
            } else if pos < footer_start {
                let rel = pos - header_len;
                let slot = (rel / ITEM_SIZE as u64) as u32;
                let within = (rel % ITEM_SIZE as u64) as usize;
                if cached_slot != Some(slot) {
                    render_slot_into(&mut log, slot, &mut item)?;
                    cached_slot = Some(slot);
                }
                let n = want.min(ITEM_SIZE - within);
                buf[written..written + n].copy_from_slice(&item[within..within + n]);
                n
            } else {
                let start = (pos - footer_start) as usize;
                let n = want.min(FOOTER.len() - start);
                buf[written..written + n].copy_from_slice(&FOOTER.as_bytes()[start..start + n]);
                n
            };
            pos += n as u64;
            written += n;
        }
        Ok(written)
    }

    /// Render a single slot, `None` past the last one
    pub fn render_slot(&self, index: u32) -> Result<Option<[u8; ITEM_SIZE]>> {
        let mut log = self.log.borrow_mut();
        if index > record_slots(&mut log)? {
            return Ok(None);
        }
        let mut item = [0u8; ITEM_SIZE];
        render_slot_into(&mut log, index, &mut item)?;
        Ok(Some(item))
    }
}

impl<F: Flash> ContentSource for GpxDocument<F> {
    fn size(&self) -> Result<u64> {
        GpxDocument::size(self).map(u64::from)
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        GpxDocument::read(self, offset, buf)
    }
}

/// Slots taken by log records. A trailing session marker renders nothing,
/// the footer closes that track.
fn record_slots<F: Flash>(log: &mut FixLog<F>) -> Result<u32> {
    let count = log.count();
    match log.last()? {
        Some(last) if last.is_eol() => Ok(count - 1),
        _ => Ok(count),
    }
}

fn render_slot_into<F: Flash>(
    log: &mut FixLog<F>,
    slot: u32,
    item: &mut [u8; ITEM_SIZE],
) -> Result<()> {
    let mut text = String::with_capacity(ITEM_SIZE);
    if slot == 0 {
        let first = log.get(0)?.map_or(0, |r| r.timestamp);
        track_header(&mut text, first);
    } else {
        match log.get(slot - 1)? {
            Some(record) if record.is_eol() => {
                let next = log.get(slot)?.map_or(0, |r| r.timestamp);
                text.push_str(TRACK_CLOSE);
                track_header(&mut text, next);
            }
            Some(record) => track_point(&mut text, &record),
            None => {}
        }
    }
    pad_item(text.as_bytes(), item);
    Ok(())
}

fn pad_item(text: &[u8], item: &mut [u8; ITEM_SIZE]) {
    let len = if text.len() > ITEM_SIZE - 1 {
        log::warn!("GPX item of {} bytes truncated", text.len());
        ITEM_SIZE - 1
    } else {
        text.len()
    };
    item[..len].copy_from_slice(&text[..len]);
    item[len..ITEM_SIZE - 1].fill(b' ');
    item[ITEM_SIZE - 1] = b'\n';
}

fn utc(timestamp: u32) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(timestamp as i64, 0).unwrap_or_default()
}

fn track_header(out: &mut String, timestamp: u32) {
    let t = utc(timestamp);
    let _ = write!(
        out,
        "  <trk>\n    <name>Track {:02}.{:02}.{:04} {:02}:{:02}</name>\n    <trkseg>",
        t.day(),
        t.month(),
        t.year(),
        t.hour(),
        t.minute()
    );
}

fn track_point(out: &mut String, record: &FixRecord) {
    let t = utc(record.timestamp);
    let _ = write!(
        out,
        "      <trkpt lat=\"{}\" lon=\"{}\">\n        <ele>{}</ele>\n        <time>{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z</time>\n      </trkpt>",
        Coordinate::new(record.lat, record.lat_scale),
        Coordinate::new(record.lon, record.lon_scale),
        record.elevation_m,
        t.year(),
        t.month(),
        t.day(),
        t.hour(),
        t.minute(),
        t.second()
    );
}

/// Fixed-point degrees rendered with six decimals, integer arithmetic only
struct Coordinate {
    negative: bool,
    degrees: i64,
    micro: i64,
}

impl Coordinate {
    fn new(value: i32, scale: i32) -> Self {
        let scale = (scale as i64).abs().max(1);
        let value = value as i64;
        let abs = value.abs();
        Self {
            negative: value < 0,
            degrees: abs / scale,
            micro: (abs % scale) * LATLON_SCALE / scale,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.negative { "-" } else { "" };
        write!(f, "{}{}.{:06}", sign, self.degrees, self.micro)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(value: i32, scale: i32) -> String {
        Coordinate::new(value, scale).to_string()
    }

    #[test]
    fn coordinate_rescaling() {
        assert_eq!(render(49123456, 1_000_000), "49.123456");
        assert_eq!(render(-123456789, 1_000_000), "-123.456789");
        assert_eq!(render(4912345, 100_000), "49.123450");
        assert_eq!(render(491234567, 10_000_000), "49.123456");
        assert_eq!(render(-5, 10), "-0.500000");
        assert_eq!(render(49012345, 1_000_000), "49.012345");
        // Fractions are truncated, not rounded
        assert_eq!(render(2, 3), "0.666666");
        assert_eq!(render(-22, 7), "-3.142857");
        assert_eq!(render(100, -3), "33.333333");
    }

    #[test]
    fn longest_track_point_fits() {
        let record = FixRecord {
            lat: -90_000_000,
            lat_scale: 1_000_000,
            lon: -180_000_000,
            lon_scale: 1_000_000,
            timestamp: u32::MAX,
            elevation_m: i16::MIN,
        };
        let mut text = String::new();
        track_point(&mut text, &record);
        assert!(text.len() < ITEM_SIZE, "{} bytes", text.len());
    }
}
