//! CPU temperature from thermal zones and hwmon sensors
//!
//! Sensors are probed in a fixed order and the first readable one wins;
//! there is no averaging across sensors.

use crate::config::KernelPaths;
use crate::error::ProbeError;
use std::path::PathBuf;

/// Candidate sensor files, relative to the sys root, in probe order.
const SENSORS: &[&str] = &[
    "class/thermal/thermal_zone0/temp",
    "class/thermal/thermal_zone1/temp",
    "class/hwmon/hwmon0/temp1_input",
    "class/hwmon/hwmon1/temp1_input",
    "class/hwmon/hwmon2/temp1_input",
    "devices/platform/coretemp.0/hwmon/hwmon0/temp1_input",
    "devices/platform/coretemp.0/hwmon/hwmon1/temp1_input",
];

pub fn sensor_paths(paths: &KernelPaths) -> Vec<PathBuf> {
    SENSORS.iter().map(|rel| paths.sys(rel)).collect()
}

/// First successfully parsed sensor, in degrees Celsius.
pub fn read_celsius(paths: &KernelPaths) -> Result<f64, ProbeError> {
    sensor_paths(paths)
        .into_iter()
        .find_map(|path| std::fs::read_to_string(path).ok().and_then(|raw| parse_millidegrees(&raw)))
        .ok_or(ProbeError::NoSensor)
}

/// Sensor files hold millidegrees, e.g. `45000\n`.
pub fn parse_millidegrees(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .map(|milli| milli as f64 / 1000.0)
}
