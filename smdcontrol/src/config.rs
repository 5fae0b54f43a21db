use eyre::{Report, WrapErr};
use serde_derive::Deserialize;
use smd::{Timing, DEFAULT_BAUD_RATE};
use std::fs::read_to_string;
use std::time::Duration;

const CONFIG_FILENAME: &str = "smdcontrol.toml";

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Serial port the bus is connected to.
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub scan_timeout_ms: u64,
    pub module_scan_warmup_ms: u64,
    /// Whether to ask each driver which modules are plugged into it. This takes a couple of
    /// seconds per driver.
    pub scan_modules: bool,
}

impl Default for Config {
    fn default() -> Self {
        let timing = Timing::default();
        Self {
            port: "/dev/ttyUSB0".to_owned(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: millis(timing.read_timeout),
            scan_timeout_ms: millis(timing.scan_timeout),
            module_scan_warmup_ms: millis(timing.module_scan_warmup),
            scan_modules: false,
        }
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Config {
    pub fn from_file() -> Result<Config, Report> {
        Config::read(CONFIG_FILENAME)
    }

    fn read(filename: &str) -> Result<Config, Report> {
        let config_file =
            read_to_string(filename).wrap_err_with(|| format!("Reading {}", filename))?;
        toml::from_str(&config_file).wrap_err_with(|| format!("Parsing {}", filename))
    }

    pub fn timing(&self) -> Timing {
        Timing {
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            scan_timeout: Duration::from_millis(self.scan_timeout_ms),
            module_scan_warmup: Duration::from_millis(self.module_scan_warmup_ms),
        }
    }
}
