//! UIRB board support: the hardware configuration persisted in EEPROM, and
//! the bring-up that validates it before the board may be operated.

use anyhow::{anyhow, bail, Context, Result};
use bitflags::bitflags;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use uirb_core::board::Board;

/// Version string printed in the inclusion banner.
pub const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Newest board revision this library knows how to drive.
pub const SUPPORTED_HW_MAJOR: u8 = 1;

const EEPROM_MAGIC: &[u8; 4] = b"UIRB";
const HEADER_LEN: usize = 8;

// EEPROM header layout (offsets into the image):
//   0x00..0x04  magic "UIRB"
//   0x04        hardware revision, major
//   0x05        hardware revision, minor
//   0x06        status flags
//   0x07        reserved
const OFF_REV_MAJOR: usize = 0x04;
const OFF_REV_MINOR: usize = 0x05;
const OFF_FLAGS: usize = 0x06;

bitflags! {
    /// Persisted board status byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        const CHARGER_ATTACHED = 0b0000_0001;
        const WAKEUP_ENABLED   = 0b0000_0010;
        const LOW_BATTERY      = 0b0000_0100;
        const STATUS_LED       = 0b0000_1000;
    }
}

/// Hardware configuration decoded from the EEPROM header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareConfig {
    pub revision_major: u8,
    pub revision_minor: u8,
    pub flags: StatusFlags,
}

impl HardwareConfig {
    pub fn parse(image: &[u8]) -> Result<Self> {
        if image.len() < HEADER_LEN {
            bail!(
                "EEPROM image too short: {} bytes, header needs {}",
                image.len(),
                HEADER_LEN
            );
        }
        if &image[..EEPROM_MAGIC.len()] != EEPROM_MAGIC {
            bail!("EEPROM magic mismatch; not a UIRB board image");
        }

        Ok(Self {
            revision_major: image[OFF_REV_MAJOR],
            revision_minor: image[OFF_REV_MINOR],
            flags: StatusFlags::from_bits_truncate(image[OFF_FLAGS]),
        })
    }
}

/// The board instance. The vendor library kept this as a lazily constructed
/// process-wide singleton; here it is owned by whoever runs the boot
/// sequence, constructed explicitly from an EEPROM image.
#[derive(Debug)]
pub struct Uirb {
    image: Vec<u8>,
    config: Option<HardwareConfig>,
    powered: bool,
}

impl Uirb {
    /// Load the persisted configuration image from disk. When
    /// `expected_len` is given (the EEPROM part size), images of any other
    /// length are rejected up front.
    pub fn from_image_file(path: &Path, expected_len: Option<u64>) -> Result<Self> {
        let image =
            fs::read(path).with_context(|| format!("Failed to read EEPROM image: {:?}", path))?;

        if let Some(expected) = expected_len {
            if image.len() as u64 != expected {
                return Err(anyhow!(
                    "EEPROM image {:?} is {} bytes, expected {}",
                    path,
                    image.len(),
                    expected
                ));
            }
        }

        debug!(bytes = image.len(), "EEPROM image loaded");
        Ok(Self::from_image(image))
    }

    pub fn from_image(image: Vec<u8>) -> Self {
        Self {
            image,
            config: None,
            powered: false,
        }
    }

    /// Decoded configuration; `None` until `begin()` succeeds.
    pub fn config(&self) -> Option<&HardwareConfig> {
        self.config.as_ref()
    }

    fn bring_up(&mut self) -> Result<HardwareConfig> {
        let config = HardwareConfig::parse(&self.image)?;

        if config.revision_major != SUPPORTED_HW_MAJOR {
            bail!(
                "Unsupported hardware revision {}.{} (supported major: {})",
                config.revision_major,
                config.revision_minor,
                SUPPORTED_HW_MAJOR
            );
        }

        // Power management: surface a degraded battery, then mark the rails up.
        if config.flags.contains(StatusFlags::LOW_BATTERY) {
            warn!("Board reports low battery");
        }
        self.powered = true;

        Ok(config)
    }
}

impl Board for Uirb {
    fn version(&self) -> &str {
        VERSION
    }

    fn begin(&mut self) -> bool {
        match self.bring_up() {
            Ok(config) => {
                info!(
                    major = config.revision_major,
                    minor = config.revision_minor,
                    flags = ?config.flags,
                    "UIRB hardware verified"
                );
                self.config = Some(config);
                true
            }
            Err(e) => {
                warn!("UIRB bring-up failed: {:#}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(major: u8, minor: u8, flags: u8) -> Vec<u8> {
        let mut img = b"UIRB".to_vec();
        img.extend_from_slice(&[major, minor, flags, 0x00]);
        img
    }

    #[test]
    fn test_parse_valid_header() {
        let config = HardwareConfig::parse(&image(1, 4, 0b0000_1010)).unwrap();
        assert_eq!(config.revision_major, 1);
        assert_eq!(config.revision_minor, 4);
        assert_eq!(
            config.flags,
            StatusFlags::WAKEUP_ENABLED | StatusFlags::STATUS_LED
        );
    }

    #[test]
    fn test_parse_rejects_short_image() {
        let err = HardwareConfig::parse(b"UIRB").unwrap_err();
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let err = HardwareConfig::parse(&[0xFF; 8]).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_parse_ignores_unknown_flag_bits() {
        let config = HardwareConfig::parse(&image(1, 0, 0xF1)).unwrap();
        assert_eq!(config.flags, StatusFlags::CHARGER_ATTACHED);
    }

    #[test]
    fn test_begin_succeeds_on_supported_revision() {
        let mut board = Uirb::from_image(image(SUPPORTED_HW_MAJOR, 2, 0));
        assert!(board.begin());
        let config = board.config().unwrap();
        assert_eq!(config.revision_minor, 2);
    }

    #[test]
    fn test_begin_fails_on_unsupported_revision() {
        let mut board = Uirb::from_image(image(9, 0, 0));
        assert!(!board.begin());
        assert!(board.config().is_none());
    }

    #[test]
    fn test_begin_fails_on_garbage_image() {
        let mut board = Uirb::from_image(vec![0xA5; 32]);
        assert!(!board.begin());
    }

    #[test]
    fn test_low_battery_is_not_fatal() {
        let mut board = Uirb::from_image(image(1, 0, 0b0000_0100));
        assert!(board.begin());
        assert!(board
            .config()
            .unwrap()
            .flags
            .contains(StatusFlags::LOW_BATTERY));
    }

    #[test]
    fn test_version_banner_format() {
        assert!(VERSION.starts_with('v'));
        let board = Uirb::from_image(Vec::new());
        assert_eq!(board.version(), VERSION);
    }
}
