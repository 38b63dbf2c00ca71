mod cli;

use std::fs::File;
use std::io::{BufWriter, Write};

use clap::Parser;
use gpxdisk::fat16::{self, BlockDevice};
use gpxdisk::{Logger, LoggerConfig, MemFlash};

use self::cli::Cli;

fn main() -> gpxdisk::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    log::info!("flash={:?} size={} label={:?}", cli.flash, cli.size, cli.label);

    let config = LoggerConfig {
        log_capacity: cli.log_capacity,
        volume_size: cli.size,
        label: cli.label.clone(),
        ..LoggerConfig::default()
    };

    // Work on a copy so booting never touches the dump
    let flash = MemFlash::load(&cli.flash, cli.log_capacity).inspect_err(|e| {
        log::error!("Cannot read flash dump {}: {}", cli.flash.display(), e);
    })?;
    let mut logger = Logger::boot(flash, &config)?;
    if let Some(path) = &cli.firmware {
        logger.add_firmware(File::open(path)?)?;
    }

    if let Some(path) = &cli.gpx {
        let written = write_gpx(&logger, BufWriter::new(File::create(path)?))?;
        println!("GPX: {} bytes -> {}", written, path.display());
    }

    if let Some(path) = &cli.image {
        let written = fat16::write_image(&logger, BufWriter::new(File::create(path)?))?;
        println!("Image: {} bytes -> {}", written, path.display());
    }

    print_files(&logger);
    Ok(())
}

fn write_gpx<W: Write>(logger: &Logger<MemFlash>, mut out: W) -> gpxdisk::Result<u64> {
    let gpx = logger.gpx();
    let mut buf = [0u8; fat16::SECTOR_SIZE];
    let mut offset = 0u64;
    loop {
        let n = gpx.read(offset, &mut buf)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        offset += n as u64;
    }
    out.flush()?;
    Ok(offset)
}

fn print_files(logger: &Logger<MemFlash>) {
    let volume = logger.volume();
    println!(
        "Volume {:?}: {} sectors",
        String::from_utf8_lossy(volume.label()).trim_end(),
        logger.sector_count()
    );
    for file in volume.files() {
        println!(
            "{:12}  cluster={:5}  size={}",
            file.display_name(),
            file.first_cluster(),
            file.size()
        );
    }
}
