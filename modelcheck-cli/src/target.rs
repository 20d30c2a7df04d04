//! Target Selection

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend whose outputs are compared against the host reference.
///
/// Chosen once per CLI invocation and passed explicitly into the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetSelector {
    /// Local benchmark tool with accelerator delegation enabled
    #[default]
    ReferenceAccelerator,
    /// Attached device reached over the debug bridge
    #[value(alias = "android")]
    MobileDevice,
    /// On-device harness for iOS (not yet supported)
    EmbeddedIos,
    /// On-device harness for single-board Linux (not yet supported)
    EmbeddedPi,
}

impl TargetSelector {
    /// Every selectable target
    pub const ALL: [TargetSelector; 4] = [
        TargetSelector::ReferenceAccelerator,
        TargetSelector::MobileDevice,
        TargetSelector::EmbeddedIos,
        TargetSelector::EmbeddedPi,
    ];

    /// Name as accepted by `--target`
    pub fn name(self) -> &'static str {
        match self {
            TargetSelector::ReferenceAccelerator => "reference-accelerator",
            TargetSelector::MobileDevice => "mobile-device",
            TargetSelector::EmbeddedIos => "embedded-ios",
            TargetSelector::EmbeddedPi => "embedded-pi",
        }
    }
}

impl fmt::Display for TargetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_target_parses_by_name() {
        for target in TargetSelector::ALL {
            assert_eq!(TargetSelector::from_str(target.name(), false), Ok(target));
        }
    }

    #[test]
    fn test_android_alias() {
        assert_eq!(
            TargetSelector::from_str("android", false),
            Ok(TargetSelector::MobileDevice)
        );
    }

    #[test]
    fn test_serde_names_match_cli_names() {
        for target in TargetSelector::ALL {
            let json = serde_json::to_string(&target).unwrap();
            assert_eq!(json, format!("\"{}\"", target.name()));
        }
    }
}
