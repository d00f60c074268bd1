use crate::error::{Error, Result};
use crate::provider::PowerProvider;

/// Name recorded when the computer name cannot be read.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown Mac";

const UUID_LABEL: &str = "Hardware UUID";

/// Extract the hardware UUID from a `system_profiler SPHardwareDataType` report.
pub fn parse_hardware_uuid(report: &str) -> Option<String> {
    report
        .lines()
        .find(|line| line.contains(UUID_LABEL))
        .and_then(|line| line.split_once(':'))
        .map(|(_, value)| value.trim().to_string())
        .filter(|uuid| !uuid.is_empty())
}

/// Stable identifier for this machine.
pub fn resolve_device_id(provider: &impl PowerProvider) -> Result<String> {
    let report = provider.hardware_report()?;
    parse_hardware_uuid(&report).ok_or(Error::HardwareUuidNotFound)
}

/// Best-effort display name for this machine.
pub fn resolve_device_name(provider: &impl PowerProvider) -> String {
    provider
        .computer_name()
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_DEVICE_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HARDWARE_REPORT: &str = "\
Hardware:

    Hardware Overview:

      Model Name: MacBook Pro
      Model Identifier: Mac14,10
      Chip: Apple M2 Pro
      Total Number of Cores: 12 (8 performance and 4 efficiency)
      Memory: 16 GB
      System Firmware Version: 10151.81.1
      Serial Number (system): XXXXXXXXXX
      Hardware UUID: 7B3A9C1E-2D4F-5A6B-8C9D-0E1F2A3B4C5D
      Provisioning UDID: 00008112-000A1234
      Activation Lock Status: Disabled
";

    #[test]
    fn test_parse_hardware_uuid() {
        assert_eq!(
            parse_hardware_uuid(HARDWARE_REPORT).as_deref(),
            Some("7B3A9C1E-2D4F-5A6B-8C9D-0E1F2A3B4C5D")
        );
    }

    #[test]
    fn test_parse_hardware_uuid_missing() {
        assert_eq!(parse_hardware_uuid("Model Name: MacBook Pro\n"), None);
        assert_eq!(parse_hardware_uuid("Hardware UUID without colon"), None);
        assert_eq!(parse_hardware_uuid("Hardware UUID:   \n"), None);
    }
}
