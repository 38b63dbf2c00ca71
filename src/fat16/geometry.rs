//! Volume geometry derived from the requested size

use super::{DIR_ENTRY_SIZE, FAT16_MAX_CLUSTERS, FAT16_MIN_CLUSTERS, FIRST_CLUSTER, SECTOR_SIZE};
use crate::error::{Error, Result};

/// Tunables of the emulated volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeConfig {
    /// Power of two in `1..=128`
    pub sectors_per_cluster: u8,
    /// Root directory slots, a multiple of 16 (one sector)
    pub root_entries: u16,
    /// Virtual files the table can hold
    pub max_files: usize,
    /// OEM name in the boot sector
    pub oem_id: [u8; 8],
    /// Volume serial number
    pub serial: u32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            sectors_per_cluster: 8,
            root_entries: 512,
            max_files: 16,
            oem_id: *b"mkdosfs\0",
            serial: 0xDEAD_BEEF,
        }
    }
}

impl VolumeConfig {
    pub fn cluster_bytes(&self) -> u64 {
        self.sectors_per_cluster as u64 * SECTOR_SIZE as u64
    }

    fn validate(&self) -> Result<()> {
        let spc = self.sectors_per_cluster;
        if spc == 0 || !spc.is_power_of_two() || spc > 128 {
            return Err(Error::invalid_geometry(format!(
                "sectors per cluster must be a power of two up to 128, got {}",
                spc
            )));
        }
        let per_sector = (SECTOR_SIZE / DIR_ENTRY_SIZE) as u16;
        if self.root_entries == 0 || self.root_entries % per_sector != 0 {
            return Err(Error::invalid_geometry(format!(
                "root entries must be a non-zero multiple of {}, got {}",
                per_sector, self.root_entries
            )));
        }
        // One root slot is taken by the volume label
        if self.max_files >= self.root_entries as usize {
            return Err(Error::invalid_geometry(format!(
                "{} files do not fit {} root entries",
                self.max_files, self.root_entries
            )));
        }
        Ok(())
    }
}

/// Fixed layout of the volume: boot sector, FAT 1, FAT 2, root directory,
/// data region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    sector_count: u32,
    sectors_per_cluster: u8,
    fat_sectors: u16,
    root_entries: u16,
}

impl Geometry {
    /// Lay out a volume of at least `requested_bytes`.
    ///
    /// Sizes too small for FAT16 are raised to exactly
    /// [`FAT16_MIN_CLUSTERS`] clusters.
    pub fn new(requested_bytes: u64, config: &VolumeConfig) -> Result<Self> {
        config.validate()?;

        let min_bytes = FAT16_MIN_CLUSTERS as u64 * config.cluster_bytes();
        let bytes = requested_bytes.max(min_bytes);

        let sectors = bytes.div_ceil(SECTOR_SIZE as u64);
        let clusters = sectors.div_ceil(config.sectors_per_cluster as u64) + FIRST_CLUSTER as u64;
        if clusters - FIRST_CLUSTER as u64 > FAT16_MAX_CLUSTERS as u64 {
            return Err(Error::invalid_geometry(format!(
                "{} bytes need {} clusters, FAT16 allows {}",
                bytes,
                clusters - FIRST_CLUSTER as u64,
                FAT16_MAX_CLUSTERS
            )));
        }
        let fat_sectors = clusters.div_ceil((SECTOR_SIZE / 2) as u64);

        let geometry = Self {
            sector_count: sectors as u32,
            sectors_per_cluster: config.sectors_per_cluster,
            fat_sectors: fat_sectors as u16,
            root_entries: config.root_entries,
        };
        log::debug!(
            "FAT16 geometry: {} sectors, {} sectors/cluster, {} FAT sectors, data at {}",
            geometry.sector_count,
            geometry.sectors_per_cluster,
            geometry.fat_sectors,
            geometry.data_start()
        );
        Ok(geometry)
    }

    pub fn sector_count(&self) -> u32 {
        self.sector_count
    }

    pub fn sectors_per_cluster(&self) -> u8 {
        self.sectors_per_cluster
    }

    /// Sectors in one FAT copy
    pub fn fat_sectors(&self) -> u16 {
        self.fat_sectors
    }

    pub fn root_entries(&self) -> u16 {
        self.root_entries
    }

    pub fn cluster_bytes(&self) -> u32 {
        self.sectors_per_cluster as u32 * SECTOR_SIZE as u32
    }

    pub fn fat1_start(&self) -> u32 {
        1
    }

    pub fn fat2_start(&self) -> u32 {
        self.fat1_start() + self.fat_sectors as u32
    }

    pub fn root_start(&self) -> u32 {
        self.fat2_start() + self.fat_sectors as u32
    }

    pub fn root_sectors(&self) -> u32 {
        (self.root_entries as u32 * DIR_ENTRY_SIZE as u32).div_ceil(SECTOR_SIZE as u32)
    }

    pub fn data_start(&self) -> u32 {
        self.root_start() + self.root_sectors()
    }

    /// One past the last cluster that lies inside the volume
    pub fn cluster_end(&self) -> u32 {
        let data_sectors = self.sector_count.saturating_sub(self.data_start());
        FIRST_CLUSTER as u32 + data_sectors / self.sectors_per_cluster as u32
    }
}
