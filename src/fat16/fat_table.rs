//! File allocation table generated from the file table

use super::{MEDIA_DESCRIPTOR, SECTOR_SIZE, VirtualFile};

/// FAT16 end-of-chain marker
pub const FAT16_EOC: u16 = 0xFFFF;

/// FAT16 free cluster marker
pub const FAT16_FREE_CLUSTER: u16 = 0x0000;

/// Entries in one FAT sector
pub const ENTRIES_PER_SECTOR: u32 = (SECTOR_SIZE / 2) as u32;

/// Value of the FAT entry for `cluster`.
///
/// Entry 0 carries the media descriptor, entry 1 the end-of-chain marker.
/// Files are contiguous, so each cluster points to the next one until the
/// last cluster of the file.
pub fn entry(cluster: u32, files: &[VirtualFile]) -> u16 {
    match cluster {
        0 => 0xFF00 | MEDIA_DESCRIPTOR as u16,
        1 => FAT16_EOC,
        _ => match super::volume::file_for_cluster(files, cluster) {
            Some(file) if cluster == file.last_cluster() => FAT16_EOC,
            Some(_) => (cluster + 1) as u16,
            None => FAT16_FREE_CLUSTER,
        },
    }
}

/// Fill `buf` with sector `block` of one FAT copy
pub fn encode(block: u32, files: &[VirtualFile], buf: &mut [u8; SECTOR_SIZE]) {
    let first = block * ENTRIES_PER_SECTOR;
    for (i, slot) in buf.chunks_exact_mut(2).enumerate() {
        let value = entry(first + i as u32, files);
        slot.copy_from_slice(&value.to_le_bytes());
    }
}
