//! Boot sector with the BIOS parameter block

use super::{Geometry, MEDIA_DESCRIPTOR, SECTOR_SIZE, VolumeConfig};

pub const BOOT_SIG_LEAD: u8 = 0x55;
pub const BOOT_SIG_TRAIL: u8 = 0xAA;

const FS_TYPE: &[u8; 8] = b"FAT16   ";

/// Fill `buf` with the boot sector of the volume
pub fn encode(geometry: &Geometry, config: &VolumeConfig, label: &[u8; 11], buf: &mut [u8; SECTOR_SIZE]) {
    buf.fill(0);

    // Jump over the BPB, then OEM name
    buf[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
    buf[0x03..0x0B].copy_from_slice(&config.oem_id);

    buf[0x0B..0x0D].copy_from_slice(&(SECTOR_SIZE as u16).to_le_bytes());
    buf[0x0D] = geometry.sectors_per_cluster();
    buf[0x0E..0x10].copy_from_slice(&1u16.to_le_bytes());
    buf[0x10] = 2;
    buf[0x11..0x13].copy_from_slice(&geometry.root_entries().to_le_bytes());
    buf[0x15] = MEDIA_DESCRIPTOR;
    buf[0x16..0x18].copy_from_slice(&geometry.fat_sectors().to_le_bytes());
    buf[0x18..0x1A].copy_from_slice(&63u16.to_le_bytes());
    buf[0x1A..0x1C].copy_from_slice(&255u16.to_le_bytes());
    // Hidden sectors stay 0

    match u16::try_from(geometry.sector_count()) {
        Ok(small) => buf[0x13..0x15].copy_from_slice(&small.to_le_bytes()),
        Err(_) => buf[0x20..0x24].copy_from_slice(&geometry.sector_count().to_le_bytes()),
    }

    // Extended BPB
    buf[0x24] = 0x00;
    buf[0x26] = 0x29;
    buf[0x27..0x2B].copy_from_slice(&config.serial.to_le_bytes());
    buf[0x2B..0x36].copy_from_slice(label);
    buf[0x36..0x3E].copy_from_slice(FS_TYPE);

    buf[SECTOR_SIZE - 2] = BOOT_SIG_LEAD;
    buf[SECTOR_SIZE - 1] = BOOT_SIG_TRAIL;
}
