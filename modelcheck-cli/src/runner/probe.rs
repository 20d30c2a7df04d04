//! Device Probe
//!
//! Picks exactly one attached, authorized device before any model runs.

use super::bridge::Adb;
use modelcheck_core::RunnerError;
use regex::Regex;
use std::sync::LazyLock;

static DEVICE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<serial>\S+)\s+(?P<state>\S.*?)\s*$").expect("valid device line pattern")
});

/// One row of `adb devices`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub serial: String,
    pub state: String,
}

/// Parse `adb devices` output, skipping the header and daemon chatter
pub fn parse_device_list(output: &str) -> Vec<DeviceEntry> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| DEVICE_LINE.captures(line))
        .map(|caps| DeviceEntry {
            serial: caps["serial"].to_string(),
            state: caps["state"].to_string(),
        })
        .collect()
}

/// Choose the device to run on, honoring an optional serial override
pub fn select_device(
    devices: &[DeviceEntry],
    serial_override: Option<&str>,
) -> Result<String, RunnerError> {
    let device = match (devices, serial_override) {
        ([], _) => {
            return Err(RunnerError::Configuration(
                "no device found; make sure 'developer options' are enabled on the device, \
                 then try again"
                    .to_string(),
            ));
        }
        (_, Some(serial)) => devices.iter().find(|d| d.serial == serial).ok_or_else(|| {
            let attached: Vec<&str> = devices.iter().map(|d| d.serial.as_str()).collect();
            RunnerError::Configuration(format!(
                "requested device '{}' is not attached (attached: {})",
                serial,
                attached.join(", ")
            ))
        })?,
        ([only], None) => only,
        (_, None) => {
            return Err(RunnerError::Configuration(format!(
                "{} devices are connected; leave only one device connected or set a serial \
                 override, then try again",
                devices.len()
            )));
        }
    };

    match device.state.as_str() {
        "device" => Ok(device.serial.clone()),
        "unauthorized" => Err(RunnerError::Configuration(format!(
            "device '{}' is unauthorized; allow 'USB debugging' in 'developer options', \
             then try again",
            device.serial
        ))),
        other => Err(RunnerError::Configuration(format!(
            "device '{}' is not ready (state: {})",
            device.serial, other
        ))),
    }
}

/// List attached devices and select one
pub fn probe_device(adb: &Adb, serial_override: Option<&str>) -> Result<String, RunnerError> {
    let listing = adb.devices().map_err(|e| {
        RunnerError::Configuration(format!("check first that adb works on this host ({})", e))
    })?;
    let devices = parse_device_list(&listing);
    tracing::debug!("Attached devices: {:?}", devices);
    let serial = select_device(&devices, serial_override)?;
    tracing::info!("Using device {}", serial);
    Ok(serial)
}
