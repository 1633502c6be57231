use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default serial baud rate when no `monitor_speed` override is given.
pub const DEFAULT_MONITOR_SPEED: u32 = 1_000_000;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DebuggerSection {
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct BoardSection {
    /// Path to the EEPROM image holding the persisted hardware configuration.
    /// Relative paths are resolved against the manifest's directory.
    pub eeprom_image: String,
    /// Expected size of the EEPROM part, e.g. "1KB". When set, images of a
    /// different length are rejected before bring-up.
    #[serde(default)]
    pub eeprom_size: Option<String>,
}

/// Boot manifest (YAML). Stands in for the original build-time flags:
/// debugger presence, board-support presence, and the monitor speed.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct BootManifest {
    pub schema_version: String,
    #[serde(default)]
    pub monitor_speed: Option<u32>,
    #[serde(default)]
    pub debugger: Option<DebuggerSection>,
    #[serde(default)]
    pub board: Option<BoardSection>,
}

impl BootManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open boot manifest at {:?}", path.as_ref()))?;
        let manifest: Self =
            serde_yaml::from_reader(f).context("Failed to parse boot manifest YAML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.monitor_speed == Some(0) {
            anyhow::bail!("'monitor_speed' must be greater than zero");
        }

        if let Some(board) = &self.board {
            if board.eeprom_image.trim().is_empty() {
                anyhow::bail!("Board 'eeprom_image' path cannot be empty");
            }
            if let Some(size) = &board.eeprom_size {
                parse_size(size)
                    .with_context(|| format!("Invalid board 'eeprom_size' '{}'", size))?;
            }
        }

        Ok(())
    }
}

/// The communication channel the boot sequence owns. The debug stub and the
/// serial port are mutually exclusive; the stub wins when both are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleChannel {
    Serial { baud: u32 },
    Debugger,
}

#[derive(Debug, Clone)]
pub struct BoardOptions {
    pub eeprom_image: PathBuf,
    pub eeprom_size: Option<u64>,
}

/// Fully resolved boot configuration. All variant selection happens here,
/// once, before anything is initialized.
#[derive(Debug, Clone)]
pub struct BootOptions {
    pub channel: ConsoleChannel,
    pub board: Option<BoardOptions>,
}

impl Default for BootOptions {
    fn default() -> Self {
        Self {
            channel: ConsoleChannel::Serial {
                baud: DEFAULT_MONITOR_SPEED,
            },
            board: None,
        }
    }
}

impl BootOptions {
    /// Resolve a manifest into concrete options. `base_dir` is the directory
    /// the manifest was loaded from; the EEPROM image path is resolved
    /// against it.
    pub fn from_manifest(manifest: &BootManifest, base_dir: &Path) -> Result<Self> {
        manifest.validate()?;

        let debugger = manifest.debugger.as_ref().is_some_and(|d| d.enabled);
        let channel = if debugger {
            ConsoleChannel::Debugger
        } else {
            ConsoleChannel::Serial {
                baud: manifest.monitor_speed.unwrap_or(DEFAULT_MONITOR_SPEED),
            }
        };

        let board = manifest
            .board
            .as_ref()
            .map(|b| {
                let eeprom_size = b.eeprom_size.as_deref().map(parse_size).transpose()?;
                Ok::<_, anyhow::Error>(BoardOptions {
                    eeprom_image: base_dir.join(&b.eeprom_image),
                    eeprom_size,
                })
            })
            .transpose()?;

        Ok(Self { channel, board })
    }
}

/// Limits for a bounded run. The unbounded device loop has none; these exist
/// for CI runs that must terminate.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunLimits {
    pub max_beats: u64,
    #[serde(default)]
    pub wall_time_ms: Option<u64>,
}

impl RunLimits {
    pub fn validate(&self) -> Result<()> {
        if self.max_beats == 0 {
            anyhow::bail!("Limit 'max_beats' must be greater than zero");
        }
        Ok(())
    }
}

/// Why a bounded run stopped.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxBeats,
    WallTime,
    Halt,
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_manifest() {
        let yaml = r#"
schema_version: "1.0"
monitor_speed: 115200
board:
  eeprom_image: "uirb.eep"
  eeprom_size: "1KB"
"#;
        let manifest: BootManifest = serde_yaml::from_str(yaml).unwrap();
        assert!(manifest.validate().is_ok());
        assert_eq!(manifest.monitor_speed, Some(115200));

        let options = BootOptions::from_manifest(&manifest, Path::new("/boot")).unwrap();
        assert_eq!(options.channel, ConsoleChannel::Serial { baud: 115200 });
        let board = options.board.unwrap();
        assert_eq!(board.eeprom_image, PathBuf::from("/boot/uirb.eep"));
        assert_eq!(board.eeprom_size, Some(1000));
    }

    #[test]
    fn test_invalid_version() {
        let yaml = r#"
schema_version: "2.0"
"#;
        let manifest: BootManifest = serde_yaml::from_str(yaml).unwrap();
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("Unsupported schema_version"));
    }

    #[test]
    fn test_zero_monitor_speed() {
        let yaml = r#"
schema_version: "1.0"
monitor_speed: 0
"#;
        let manifest: BootManifest = serde_yaml::from_str(yaml).unwrap();
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("monitor_speed"));
    }

    #[test]
    fn test_empty_eeprom_path() {
        let yaml = r#"
schema_version: "1.0"
board:
  eeprom_image: ""
"#;
        let manifest: BootManifest = serde_yaml::from_str(yaml).unwrap();
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("eeprom_image"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
schema_version: "1.0"
monitor_sped: 9600
"#;
        assert!(serde_yaml::from_str::<BootManifest>(yaml).is_err());
    }

    #[test]
    fn test_debugger_wins_over_serial() {
        let yaml = r#"
schema_version: "1.0"
monitor_speed: 250000
debugger:
  enabled: true
"#;
        let manifest: BootManifest = serde_yaml::from_str(yaml).unwrap();
        let options = BootOptions::from_manifest(&manifest, Path::new(".")).unwrap();
        assert_eq!(options.channel, ConsoleChannel::Debugger);
    }

    #[test]
    fn test_disabled_debugger_keeps_serial() {
        let yaml = r#"
schema_version: "1.0"
debugger:
  enabled: false
"#;
        let manifest: BootManifest = serde_yaml::from_str(yaml).unwrap();
        let options = BootOptions::from_manifest(&manifest, Path::new(".")).unwrap();
        assert_eq!(
            options.channel,
            ConsoleChannel::Serial {
                baud: DEFAULT_MONITOR_SPEED
            }
        );
    }

    #[test]
    fn test_default_options() {
        let options = BootOptions::default();
        assert_eq!(options.channel, ConsoleChannel::Serial { baud: 1_000_000 });
        assert!(options.board.is_none());
    }

    #[test]
    fn test_zero_max_beats() {
        let limits = RunLimits {
            max_beats: 0,
            wall_time_ms: None,
        };
        let err = limits.validate().unwrap_err();
        assert!(err.to_string().contains("max_beats"));
    }

    #[test]
    fn test_stop_reason_serde_names() {
        assert_eq!(
            serde_yaml::to_string(&StopReason::MaxBeats).unwrap().trim(),
            "max_beats"
        );
        let parsed: StopReason = serde_yaml::from_str("halt").unwrap();
        assert_eq!(parsed, StopReason::Halt);
    }
}
