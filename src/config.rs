use std::borrow::Cow;

use crate::fat16::VolumeConfig;

/// Text served as `README.TXT`
pub const DEFAULT_README: &str =
    "GLogger gps logger by deadbadger.cz, for more info check out deadbadger.cz/projects/glogger.";

/// Boot-time settings of the logger
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Bytes of flash given to the fix log
    pub log_capacity: u32,
    /// Requested size of the emulated disk in bytes
    pub volume_size: u64,
    pub label: String,
    pub readme: Cow<'static, str>,
    pub volume: VolumeConfig,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_capacity: 4_000_000,
            volume_size: 64_000_000,
            label: "GLOGGER".to_string(),
            readme: Cow::Borrowed(DEFAULT_README),
            volume: VolumeConfig::default(),
        }
    }
}
