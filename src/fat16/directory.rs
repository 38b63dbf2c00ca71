//! Root directory entries, 8.3 names and FAT timestamps

use chrono::{DateTime, Datelike, Timelike, Utc};

use super::{DIR_ENTRY_SIZE, SECTOR_SIZE, VirtualFile};
use crate::error::{Error, Result};

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_VOLUME_ID: u8 = 0x08;

const ENTRIES_PER_SECTOR: u32 = (SECTOR_SIZE / DIR_ENTRY_SIZE) as u32;

/// Punctuation allowed in short names besides letters and digits
const SHORT_NAME_SPECIAL: &[u8] = b"!#$%&'()-@^_`{}~";

/// First second a FAT date can express, 1980-01-01 00:00:00 UTC
const FAT_EPOCH: i64 = 315_532_800;

/// Build the space padded, uppercased 11-byte `NAME    EXT` field
pub fn short_name(name: &str, ext: &str) -> Result<[u8; 11]> {
    let display = format!("{}.{}", name, ext);
    if name.is_empty() {
        return Err(Error::invalid_file_name(display, "empty name"));
    }
    if name.len() > 8 {
        return Err(Error::invalid_file_name(display, "name longer than 8 characters"));
    }
    if ext.len() > 3 {
        return Err(Error::invalid_file_name(display, "extension longer than 3 characters"));
    }
    if let Some(c) = name
        .bytes()
        .chain(ext.bytes())
        .find(|c| !c.is_ascii_alphanumeric() && !SHORT_NAME_SPECIAL.contains(c))
    {
        return Err(Error::invalid_file_name(
            display,
            format!("character {:?} not allowed", c as char),
        ));
    }

    let mut field = [b' '; 11];
    for (dst, src) in field[..8].iter_mut().zip(name.bytes()) {
        *dst = src.to_ascii_uppercase();
    }
    for (dst, src) in field[8..].iter_mut().zip(ext.bytes()) {
        *dst = src.to_ascii_uppercase();
    }
    Ok(field)
}

/// Volume label field: first 11 characters, uppercased, space padded
pub fn volume_label(label: &str) -> [u8; 11] {
    let mut field = [b' '; 11];
    for (dst, src) in field.iter_mut().zip(label.bytes()) {
        *dst = if src.is_ascii_graphic() || src == b' ' {
            src.to_ascii_uppercase()
        } else {
            b'_'
        };
    }
    field
}

/// Pack a unix timestamp into FAT `(time, date)`.
///
/// Time is `hour:5 | minute:6 | second/2:5`, date is
/// `year-1980:7 | month:4 | day:5`. Earlier instants clamp to the FAT epoch.
pub fn fat_datetime(timestamp: u32) -> (u16, u16) {
    let secs = (timestamp as i64).max(FAT_EPOCH);
    let t: DateTime<Utc> = DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default();

    let time = (t.second() / 2) | (t.minute() << 5) | (t.hour() << 11);
    let year = (t.year() - 1980).clamp(0, 127) as u32;
    let date = t.day() | (t.month() << 5) | (year << 9);
    (time as u16, date as u16)
}

/// Fill `buf` with sector `block` of the root directory.
///
/// Slot 0 of the directory holds the volume label, slot `k` the file
/// `k - 1`. Unused slots stay zero, which also ends the listing.
pub fn encode(block: u32, label: &[u8; 11], files: &[VirtualFile], buf: &mut [u8; SECTOR_SIZE]) {
    buf.fill(0);
    let first = block * ENTRIES_PER_SECTOR;
    for (i, entry) in buf.chunks_exact_mut(DIR_ENTRY_SIZE).enumerate() {
        let slot = first as usize + i;
        if slot == 0 {
            entry[0..11].copy_from_slice(label);
            entry[11] = ATTR_VOLUME_ID;
            continue;
        }
        match files.get(slot - 1) {
            Some(file) => encode_file(file, entry),
            None => break,
        }
    }
}

fn encode_file(file: &VirtualFile, entry: &mut [u8]) {
    entry[0..11].copy_from_slice(file.short_name());
    entry[11] = ATTR_READ_ONLY;
    let (time, date) = file.fat_datetime();
    entry[22..24].copy_from_slice(&time.to_le_bytes());
    entry[24..26].copy_from_slice(&date.to_le_bytes());
    entry[26..28].copy_from_slice(&file.first_cluster().to_le_bytes());
    entry[28..32].copy_from_slice(&file.size().to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_fat_datetime() {
        // 2019-07-11 12:32:11 UTC
        let (time, date) = fat_datetime(1_562_848_331);
        assert_eq!(time, 5 | (32 << 5) | (12 << 11));
        assert_eq!(date, 11 | (7 << 5) | (39 << 9));
    }

    #[test]
    fn clamps_before_fat_epoch() {
        assert_eq!(fat_datetime(0), (0, 1 | (1 << 5)));
    }

    #[test]
    fn short_names() {
        assert_eq!(&short_name("Foo", "br").unwrap(), b"FOO     BR ");
        assert_eq!(&short_name("track", "gpx").unwrap(), b"TRACK   GPX");
        assert_eq!(&short_name("README", "").unwrap(), b"README     ");
        assert!(short_name("", "txt").is_err());
        assert!(short_name("toolongname", "txt").is_err());
        assert!(short_name("a", "text").is_err());
        assert!(short_name("a b", "txt").is_err());
    }

    #[test]
    fn labels_are_padded() {
        assert_eq!(&volume_label("GLogger"), b"GLOGGER    ");
        assert_eq!(&volume_label("averyverylonglabel"), b"AVERYVERYLO");
    }
}
