//! Logger application: ties the fix log to the virtual disk

use std::borrow::Cow;
use std::cell::RefCell;
use std::io::{Read, Seek};
use std::rc::Rc;

use crate::config::LoggerConfig;
use crate::error::Result;
use crate::fat16::{BlockDevice, ContentSource, ImageSource, SECTOR_SIZE, Volume};
use crate::gpx::{GpxDocument, SharedLog};
use crate::platform::Flash;
use crate::storage::{FixLog, FixRecord, GpsFix};

pub struct Logger<F> {
    log: SharedLog<F>,
    volume: Volume,
    readme: Cow<'static, str>,
    firmware: Option<Rc<dyn ContentSource>>,
}

impl<F: Flash + 'static> Logger<F> {
    /// Recover the log from `flash` and publish it as `TRACK.GPX`.
    ///
    /// The directory advertises the GPX size as of this call.
    pub fn boot(flash: F, config: &LoggerConfig) -> Result<Self> {
        let log = Rc::new(RefCell::new(FixLog::init(flash, config.log_capacity)?));
        let volume =
            Volume::with_config(config.volume_size, &config.label, config.volume.clone())?;

        let mut logger = Self {
            log,
            volume,
            readme: config.readme.clone(),
            firmware: None,
        };
        logger.publish()?;

        log::info!(
            "Logger up: {} records, room for {} more",
            logger.log.borrow().count(),
            logger.log.borrow().remaining()
        );
        Ok(logger)
    }

    /// Publish a firmware image as `FW.UF2`
    pub fn add_firmware<R: Read + Seek + 'static>(&mut self, image: R) -> Result<()> {
        self.firmware = Some(Rc::new(ImageSource::new(image)?));
        self.publish()
    }

    /// Erase the log and republish an empty `TRACK.GPX`
    pub fn erase(&mut self) -> Result<()> {
        log::info!("Erasing fix log");
        self.log.borrow_mut().erase()?;
        self.publish()
    }

    /// Rebuild the file table from the current log
    fn publish(&mut self) -> Result<()> {
        self.volume.clear();
        self.volume.add_text_file("README", "TXT", 0, self.readme.clone())?;

        let gpx = GpxDocument::new(Rc::clone(&self.log));
        let size = gpx.size()?;
        let started = self.log.borrow_mut().get(0)?.map_or(0, |r| r.timestamp);
        self.volume.add_file("TRACK", "GPX", started, size, gpx)?;
        log::debug!("TRACK.GPX published with {} bytes", size);

        if let Some(firmware) = &self.firmware {
            let size = u32::try_from(firmware.size()?).unwrap_or(u32::MAX);
            self.volume.add_file("FW", "UF2", 0, size, Rc::clone(firmware))?;
        }
        Ok(())
    }
}

impl<F: Flash> Logger<F> {
    /// Store a fix. Returns `false` when the fix was rejected.
    ///
    /// An all-zero fix would read back as a session boundary, so it is
    /// dropped.
    pub fn record(&mut self, fix: &GpsFix) -> Result<bool> {
        let record = FixRecord::from(fix);
        if record.is_eol() {
            log::warn!("Dropping fix that collides with the session marker");
            return Ok(false);
        }
        self.log.borrow_mut().append(&record)?;
        Ok(true)
    }

    pub fn log(&self) -> SharedLog<F> {
        Rc::clone(&self.log)
    }

    pub fn gpx(&self) -> GpxDocument<F> {
        GpxDocument::new(Rc::clone(&self.log))
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }
}

impl<F: Flash> BlockDevice for Logger<F> {
    fn read_sector(&self, lba: u32, buf: &mut [u8; SECTOR_SIZE]) {
        self.volume.read(lba, buf);
    }

    fn write_sector(&mut self, lba: u32, buf: &[u8; SECTOR_SIZE]) -> Result<()> {
        self.volume.write(lba, buf)
    }

    fn sector_count(&self) -> u32 {
        self.volume.sector_count()
    }
}
