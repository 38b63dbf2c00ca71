use std::io::Cursor;

use gpxdisk::fat16::{
    BlockDevice, ContentSource, ImageSource, SECTOR_SIZE, Volume, VolumeConfig,
};
use gpxdisk::{Error, Result};

const SECTOR: usize = SECTOR_SIZE;

/// Content whose byte at offset `n` is `n % 251`
struct Pattern(u64);

impl ContentSource for Pattern {
    fn size(&self) -> Result<u64> {
        Ok(self.0)
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.0.saturating_sub(offset) as usize);
        for (i, b) in buf[..n].iter_mut().enumerate() {
            *b = ((offset + i as u64) % 251) as u8;
        }
        Ok(n)
    }
}

struct Failing;

impl ContentSource for Failing {
    fn size(&self) -> Result<u64> {
        Ok(100)
    }

    fn read(&self, offset: u64, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::flash(offset as u32, "bus error"))
    }
}

fn sector(volume: &Volume, lba: u32) -> [u8; SECTOR] {
    let mut buf = [0xAAu8; SECTOR];
    volume.read(lba, &mut buf);
    buf
}

fn u16_at(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn u32_at(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// README (1 cluster), DATA (4 clusters), EMPTY (1 cluster)
fn sample_volume() -> Result<Volume> {
    let mut volume = Volume::new(0, "GLOG")?;
    volume.add_text_file("README", "TXT", 1_562_848_331, "hello from the logger")?;
    volume.add_file("data", "bin", 0, 3 * 4096 + 1, Pattern(3 * 4096 + 1))?;
    volume.add_file("EMPTY", "", 0, 0, Pattern(0))?;
    Ok(volume)
}

#[test]
fn small_requests_are_raised_to_fat16_minimum() -> Result<()> {
    let volume = Volume::new(0, "GLOG")?;
    assert!(volume.sector_count() as u64 * 512 >= 4095 * 8 * 512);

    let g = volume.geometry();
    assert_eq!(g.sector_count(), 32760);
    assert_eq!(g.fat_sectors(), 17);
    assert_eq!(g.fat2_start(), 18);
    assert_eq!(g.root_start(), 35);
    assert_eq!(g.data_start(), 67);
    Ok(())
}

#[test]
fn boot_sector_describes_the_geometry() -> Result<()> {
    let volume = Volume::new(0, "GLOG")?;
    let boot = sector(&volume, 0);

    assert_eq!(&boot[0..3], &[0xEB, 0x3C, 0x90]);
    assert_eq!(&boot[3..11], b"mkdosfs\0");
    assert_eq!(u16_at(&boot, 0x0B), 512);
    assert_eq!(boot[0x0D], 8);
    assert_eq!(u16_at(&boot, 0x0E), 1);
    assert_eq!(boot[0x10], 2);
    assert_eq!(u16_at(&boot, 0x11), 512);
    assert_eq!(u16_at(&boot, 0x13), 32760);
    assert_eq!(boot[0x15], 0xF8);
    assert_eq!(u16_at(&boot, 0x16), 17);
    assert_eq!(u32_at(&boot, 0x20), 0);
    assert_eq!(boot[0x26], 0x29);
    assert_eq!(u32_at(&boot, 0x27), 0xDEAD_BEEF);
    assert_eq!(&boot[0x2B..0x36], b"GLOG       ");
    assert_eq!(&boot[0x36..0x3E], b"FAT16   ");
    assert_eq!(&boot[510..512], &[0x55, 0xAA]);
    Ok(())
}

#[test]
fn large_volumes_use_the_32bit_sector_count() -> Result<()> {
    let volume = Volume::new(64_000_000, "GLOGGER")?;
    let boot = sector(&volume, 0);

    assert_eq!(volume.sector_count(), 125_000);
    assert_eq!(u16_at(&boot, 0x13), 0);
    assert_eq!(u32_at(&boot, 0x20), 125_000);
    assert_eq!(u16_at(&boot, 0x16), 62);
    Ok(())
}

#[test]
fn oversized_or_odd_geometry_is_rejected() {
    assert!(matches!(
        Volume::new(5_000_000_000, "BIG"),
        Err(Error::InvalidGeometry { .. })
    ));

    let config = VolumeConfig {
        sectors_per_cluster: 3,
        ..VolumeConfig::default()
    };
    assert!(matches!(
        Volume::with_config(0, "ODD", config),
        Err(Error::InvalidGeometry { .. })
    ));

    let config = VolumeConfig {
        root_entries: 20,
        ..VolumeConfig::default()
    };
    assert!(matches!(
        Volume::with_config(0, "ODD", config),
        Err(Error::InvalidGeometry { .. })
    ));
}

#[test]
fn files_are_packed_contiguously() -> Result<()> {
    let volume = sample_volume()?;
    let files = volume.files();

    assert_eq!(files.len(), 3);
    assert_eq!(files[0].first_cluster(), 2);
    assert_eq!(files[0].cluster_count(), 1);
    assert_eq!(files[1].first_cluster(), 3);
    assert_eq!(files[1].cluster_count(), 4);
    assert_eq!(files[2].first_cluster(), 7);
    assert_eq!(files[2].cluster_count(), 1);
    for pair in files.windows(2) {
        assert_eq!(
            pair[1].first_cluster(),
            pair[0].first_cluster() + pair[0].cluster_count()
        );
    }
    assert_eq!(files[1].display_name(), "DATA.BIN");
    assert_eq!(files[2].display_name(), "EMPTY");
    Ok(())
}

#[test]
fn fat_copies_hold_the_chains() -> Result<()> {
    let volume = sample_volume()?;
    let g = *volume.geometry();

    let fat1 = sector(&volume, g.fat1_start());
    let fat2 = sector(&volume, g.fat2_start());
    assert_eq!(fat1, fat2);

    assert_eq!(&fat1[0..4], &[0xF8, 0xFF, 0xFF, 0xFF]);
    let entries: Vec<u16> = (0..10).map(|i| u16_at(&fat1, i * 2)).collect();
    assert_eq!(
        entries,
        [0xFFF8, 0xFFFF, 0xFFFF, 4, 5, 6, 0xFFFF, 0xFFFF, 0, 0]
    );

    // Later FAT sectors carry no files
    let tail = sector(&volume, g.fat1_start() + 1);
    assert!(tail.iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn root_directory_lists_label_and_files() -> Result<()> {
    let volume = sample_volume()?;
    let root = sector(&volume, volume.geometry().root_start());

    assert_eq!(&root[0..11], b"GLOG       ");
    assert_eq!(root[11], 0x08);

    let readme = &root[32..64];
    assert_eq!(&readme[0..11], b"README  TXT");
    assert_eq!(readme[11], 0x01);
    assert_eq!(u16_at(readme, 22), 5 | (32 << 5) | (12 << 11));
    assert_eq!(u16_at(readme, 24), 11 | (7 << 5) | (39 << 9));
    assert_eq!(u16_at(readme, 26), 2);
    assert_eq!(u32_at(readme, 28), 21);

    let data = &root[64..96];
    assert_eq!(&data[0..11], b"DATA    BIN");
    assert_eq!(u16_at(data, 26), 3);
    assert_eq!(u32_at(data, 28), 3 * 4096 + 1);

    let empty = &root[96..128];
    assert_eq!(&empty[0..11], b"EMPTY      ");
    assert_eq!(u32_at(empty, 28), 0);

    assert!(root[128..].iter().all(|&b| b == 0));
    let next = sector(&volume, volume.geometry().root_start() + 1);
    assert!(next.iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn data_sectors_come_from_the_sources() -> Result<()> {
    let volume = sample_volume()?;
    let data_start = volume.geometry().data_start();

    let readme = sector(&volume, data_start);
    assert_eq!(&readme[..21], b"hello from the logger");
    assert!(readme[21..].iter().all(|&b| b == 0));

    // Rest of the README cluster is beyond its size
    assert!(sector(&volume, data_start + 1).iter().all(|&b| b == 0));

    // Second sector of DATA.BIN
    let data = sector(&volume, data_start + 8 + 1);
    for (i, &b) in data.iter().enumerate() {
        assert_eq!(b, ((512 + i) % 251) as u8);
    }

    // Last byte of DATA.BIN sits alone in its final cluster
    let last = sector(&volume, data_start + 8 + 24);
    assert_eq!(last[0], ((3 * 4096) % 251) as u8);
    assert!(last[1..].iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn unmapped_and_out_of_range_sectors_read_as_zero() -> Result<()> {
    let volume = sample_volume()?;
    let g = *volume.geometry();

    assert!(sector(&volume, g.data_start() + 8 * 100).iter().all(|&b| b == 0));
    assert!(sector(&volume, g.sector_count()).iter().all(|&b| b == 0));
    assert!(sector(&volume, u32::MAX).iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn failing_source_reads_as_zero() -> Result<()> {
    let mut volume = Volume::new(0, "GLOG")?;
    volume.add_file("BROKEN", "BIN", 0, 100, Failing)?;
    let data = sector(&volume, volume.geometry().data_start());
    assert!(data.iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn image_source_serves_a_stream() -> Result<()> {
    let image: Vec<u8> = (0..1500u32).map(|i| (i % 256) as u8).collect();
    let source = ImageSource::new(Cursor::new(image.clone()))?;
    assert_eq!(source.size()?, 1500);

    let mut volume = Volume::new(0, "GLOG")?;
    volume.add_file("FW", "UF2", 0, 1500, source)?;

    let data_start = volume.geometry().data_start();
    let mut read_back = Vec::new();
    for lba in data_start..data_start + 3 {
        read_back.extend_from_slice(&sector(&volume, lba));
    }
    assert_eq!(&read_back[..1500], &image[..]);
    assert!(read_back[1500..].iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn file_table_has_fixed_capacity() -> Result<()> {
    let mut volume = Volume::new(0, "GLOG")?;
    for i in 0..16 {
        volume.add_text_file(&format!("F{}", i), "TXT", 0, "x")?;
    }
    assert!(matches!(
        volume.add_text_file("ONEMORE", "TXT", 0, "x"),
        Err(Error::FileTableFull { capacity: 16 })
    ));

    volume.clear();
    assert!(volume.files().is_empty());
    volume.add_text_file("AGAIN", "TXT", 0, "x")?;
    assert_eq!(volume.files()[0].first_cluster(), 2);
    Ok(())
}

#[test]
fn cluster_space_is_bounded() -> Result<()> {
    let mut volume = Volume::new(0, "GLOG")?;
    let cluster = volume.geometry().cluster_bytes();
    let clusters = volume.geometry().cluster_end() - 2;
    assert_eq!(clusters, 4086);

    assert!(matches!(
        volume.add_file("HUGE", "BIN", 0, (clusters + 1) * cluster, Pattern(0)),
        Err(Error::NoFreeClusters {
            needed: 4087,
            available: 4086
        })
    ));

    volume.add_file("FULL", "BIN", 0, clusters * cluster, Pattern(0))?;
    assert!(matches!(
        volume.add_text_file("TINY", "TXT", 0, "x"),
        Err(Error::NoFreeClusters {
            needed: 1,
            available: 0
        })
    ));
    Ok(())
}

#[test]
fn bad_names_are_rejected() -> Result<()> {
    let mut volume = Volume::new(0, "GLOG")?;
    assert!(matches!(
        volume.add_text_file("WAYTOOLONG", "TXT", 0, "x"),
        Err(Error::InvalidFileName { .. })
    ));
    assert!(matches!(
        volume.add_text_file("A.B", "TXT", 0, "x"),
        Err(Error::InvalidFileName { .. })
    ));
    assert!(volume.files().is_empty());
    Ok(())
}

#[test]
fn writes_are_discarded() -> Result<()> {
    let mut volume = sample_volume()?;
    let lba = volume.geometry().data_start();
    let before = sector(&volume, lba);

    volume.write(lba, &[0x42; SECTOR])?;
    volume.write_sector(0, &[0x42; SECTOR])?;

    assert_eq!(sector(&volume, lba), before);
    assert_eq!(&sector(&volume, 0)[510..], &[0x55, 0xAA]);
    Ok(())
}

#[test]
fn block_device_view_matches_read() -> Result<()> {
    let volume = sample_volume()?;
    let device: &dyn BlockDevice = &volume;
    assert_eq!(device.sector_count(), volume.sector_count());

    let mut buf = [0u8; SECTOR];
    device.read_sector(volume.geometry().root_start(), &mut buf);
    assert_eq!(buf, sector(&volume, volume.geometry().root_start()));
    Ok(())
}
