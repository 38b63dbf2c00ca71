//! Virtual file table and sector dispatch of the FAT16 volume

use std::borrow::Cow;

use super::directory::{self, short_name, volume_label};
use super::{
    boot_sector, fat_table, BlockDevice, ContentSource, FileContent, Geometry, VolumeConfig,
    FAT16_CLUSTER_LIMIT, FIRST_CLUSTER, SECTOR_SIZE,
};
use crate::error::{Error, Result};

/// Entry of the virtual file table
#[derive(Debug)]
pub struct VirtualFile {
    name: [u8; 11],
    timestamp: u32,
    size: u32,
    first_cluster: u16,
    cluster_count: u16,
    content: FileContent,
}

impl VirtualFile {
    /// `NAME    EXT` as stored in the directory entry
    pub fn short_name(&self) -> &[u8; 11] {
        &self.name
    }

    /// `NAME.EXT` for display
    pub fn display_name(&self) -> String {
        let name = String::from_utf8_lossy(&self.name[..8]).trim_end().to_string();
        let ext = String::from_utf8_lossy(&self.name[8..]).trim_end().to_string();
        if ext.is_empty() {
            name
        } else {
            format!("{}.{}", name, ext)
        }
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn fat_datetime(&self) -> (u16, u16) {
        directory::fat_datetime(self.timestamp)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn first_cluster(&self) -> u16 {
        self.first_cluster
    }

    pub fn cluster_count(&self) -> u16 {
        self.cluster_count
    }

    pub fn last_cluster(&self) -> u32 {
        self.first_cluster as u32 + self.cluster_count as u32 - 1
    }

    fn contains(&self, cluster: u32) -> bool {
        (self.first_cluster as u32..=self.last_cluster()).contains(&cluster)
    }
}

/// File owning `cluster`; files are sorted by first cluster
pub(crate) fn file_for_cluster(files: &[VirtualFile], cluster: u32) -> Option<&VirtualFile> {
    let idx = files.partition_point(|f| f.last_cluster() < cluster);
    files.get(idx).filter(|f| f.contains(cluster))
}

/// Read-only FAT16 block device synthesized on every access
#[derive(Debug)]
pub struct Volume {
    geometry: Geometry,
    config: VolumeConfig,
    label: [u8; 11],
    files: Vec<VirtualFile>,
}

impl Volume {
    /// Volume of at least `size` bytes with the default configuration
    pub fn new(size: u64, label: &str) -> Result<Self> {
        Self::with_config(size, label, VolumeConfig::default())
    }

    pub fn with_config(size: u64, label: &str, config: VolumeConfig) -> Result<Self> {
        let geometry = Geometry::new(size, &config)?;
        log::info!(
            "Virtual volume '{}': {} sectors ({} bytes requested)",
            label,
            geometry.sector_count(),
            size
        );
        Ok(Self {
            geometry,
            label: volume_label(label),
            files: Vec::with_capacity(config.max_files),
            config,
        })
    }

    /// Register a file whose bytes come from `source`.
    ///
    /// `size` is what the directory advertises; it is fixed from now on.
    pub fn add_file(
        &mut self,
        name: &str,
        ext: &str,
        timestamp: u32,
        size: u32,
        source: impl ContentSource + 'static,
    ) -> Result<()> {
        self.push_file(name, ext, timestamp, size, FileContent::Generated(Box::new(source)))
    }

    /// Register a file with fixed content
    pub fn add_text_file(
        &mut self,
        name: &str,
        ext: &str,
        timestamp: u32,
        text: impl Into<Cow<'static, str>>,
    ) -> Result<()> {
        let bytes = match text.into() {
            Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
            Cow::Owned(s) => Cow::Owned(s.into_bytes()),
        };
        // Oversized text fails the cluster check below
        let size = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
        self.push_file(name, ext, timestamp, size, FileContent::Text(bytes))
    }

    /// Forget all files, geometry stays
    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn files(&self) -> &[VirtualFile] {
        &self.files
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn label(&self) -> &[u8; 11] {
        &self.label
    }

    pub fn sector_count(&self) -> u32 {
        self.geometry.sector_count()
    }

    /// Produce sector `lba`. Anything not backed by a file reads as zeros.
    pub fn read(&self, lba: u32, buf: &mut [u8; SECTOR_SIZE]) {
        let g = &self.geometry;
        if lba == 0 {
            boot_sector::encode(g, &self.config, &self.label, buf);
        } else if lba < g.fat2_start() {
            fat_table::encode(lba - g.fat1_start(), &self.files, buf);
        } else if lba < g.root_start() {
            fat_table::encode(lba - g.fat2_start(), &self.files, buf);
        } else if lba < g.data_start() {
            directory::encode(lba - g.root_start(), &self.label, &self.files, buf);
        } else if lba < g.sector_count() {
            self.read_data(lba - g.data_start(), buf);
        } else {
            log::debug!("Read past end of volume: lba {}", lba);
            buf.fill(0);
        }
    }

    /// Writes are accepted and dropped
    pub fn write(&self, lba: u32, _buf: &[u8; SECTOR_SIZE]) -> Result<()> {
        log::trace!("Discarding write to lba {}", lba);
        Ok(())
    }

    fn push_file(
        &mut self,
        name: &str,
        ext: &str,
        timestamp: u32,
        size: u32,
        content: FileContent,
    ) -> Result<()> {
        if self.files.len() >= self.config.max_files {
            return Err(Error::FileTableFull {
                capacity: self.config.max_files,
            });
        }
        let short = short_name(name, ext)?;

        let cluster_bytes = self.geometry.cluster_bytes();
        let needed = size.div_ceil(cluster_bytes).max(1);
        let first = self
            .files
            .last()
            .map_or(FIRST_CLUSTER as u32, |f| f.last_cluster() + 1);
        let end = self.geometry.cluster_end().min(FAT16_CLUSTER_LIMIT);
        let available = end.saturating_sub(first);
        if needed > available {
            return Err(Error::NoFreeClusters { needed, available });
        }

        let file = VirtualFile {
            name: short,
            timestamp,
            size,
            first_cluster: first as u16,
            cluster_count: needed as u16,
            content,
        };
        log::debug!(
            "Added {} ({} bytes) at cluster {}, {} clusters",
            file.display_name(),
            size,
            first,
            needed
        );
        self.files.push(file);
        Ok(())
    }

    fn read_data(&self, sector: u32, buf: &mut [u8; SECTOR_SIZE]) {
        buf.fill(0);
        let spc = self.geometry.sectors_per_cluster() as u32;
        let cluster = sector / spc + FIRST_CLUSTER as u32;
        let Some(file) = file_for_cluster(&self.files, cluster) else {
            return;
        };

        let file_sector = sector - (file.first_cluster as u32 - FIRST_CLUSTER as u32) * spc;
        let offset = file_sector as u64 * SECTOR_SIZE as u64;
        if offset >= file.size as u64 {
            return;
        }
        let len = (file.size as u64 - offset).min(SECTOR_SIZE as u64) as usize;
        if let Err(e) = file.content.read(offset, &mut buf[..len]) {
            log::warn!(
                "Reading {} at offset {} failed: {}",
                file.display_name(),
                offset,
                e
            );
            buf.fill(0);
        }
    }
}

impl BlockDevice for Volume {
    fn read_sector(&self, lba: u32, buf: &mut [u8; SECTOR_SIZE]) {
        self.read(lba, buf);
    }

    fn write_sector(&mut self, lba: u32, buf: &[u8; SECTOR_SIZE]) -> Result<()> {
        self.write(lba, buf)
    }

    fn sector_count(&self) -> u32 {
        Volume::sector_count(self)
    }
}
