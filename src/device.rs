//! Device-tiered Argon2id cost selection.
//!
//! Classifying the host (user agent, screen width, available memory) is the
//! caller's job. This module only maps the resulting class to a preset.

use std::str::FromStr;

use strum::{Display, EnumString};

use crate::config::{ARGON_PARALLELISM, DESKTOP_ITERATIONS, DESKTOP_MEMORY, MOBILE_ITERATIONS, MOBILE_MEMORY};
use crate::header::Argon2Params;

/// Host class used to pick Argon2id costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceClass {
    /// Phones and tablets. Capped at 24 MiB because mobile browsers may refuse larger single allocations.
    Mobile,
    /// Everything else.
    #[default]
    Desktop,
}

impl DeviceClass {
    /// All classes, for iteration.
    pub const ALL: &'static [Self] = &[Self::Mobile, Self::Desktop];

    /// Parses a class name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }
}

/// Returns the preset for `device`. Pure; the same class always yields the same parameters.
#[inline]
pub const fn select_params(device: DeviceClass) -> Argon2Params {
    match device {
        DeviceClass::Mobile => Argon2Params::new(MOBILE_MEMORY, MOBILE_ITERATIONS, ARGON_PARALLELISM),
        DeviceClass::Desktop => Argon2Params::new(DESKTOP_MEMORY, DESKTOP_ITERATIONS, ARGON_PARALLELISM),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mobile_preset() {
        let params = select_params(DeviceClass::Mobile);
        assert_eq!((params.memory, params.iterations, params.parallelism, params.hash_length), (24_576, 3, 1, 32));
    }

    #[test]
    fn test_desktop_preset() {
        let params = select_params(DeviceClass::Desktop);
        assert_eq!((params.memory, params.iterations, params.parallelism, params.hash_length), (98_304, 4, 1, 32));
    }

    #[test]
    fn test_presets_validate() {
        for device in DeviceClass::ALL {
            assert!(select_params(*device).validate().is_ok());
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(DeviceClass::parse("Mobile"), Some(DeviceClass::Mobile));
        assert_eq!(DeviceClass::parse("desktop"), Some(DeviceClass::Desktop));
        assert_eq!(DeviceClass::parse("tablet"), None);
        assert_eq!(DeviceClass::Mobile.to_string(), "mobile");
    }
}
