use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SmartSafeConfig {
    pub keypad: KeypadConfig,
    pub lcd: LcdConfig,
    pub lock: LockConfig,
    pub tilt: TiltConfig,
    pub auth: AuthConfig,
    pub recording: RecordingConfig,
    pub upload: UploadConfig,
    pub telemetry: TelemetryConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KeypadConfig {
    /// I2C address of the keypad port expander
    #[serde(default = "default_keypad_address")]
    pub i2c_address: u8,

    /// Keypad scan interval in milliseconds
    #[serde(default = "default_keypad_poll_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LcdConfig {
    /// I2C address of the LCD backpack
    #[serde(default = "default_lcd_address")]
    pub i2c_address: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LockConfig {
    /// GPIO pin driving the solenoid MOSFET gate
    #[serde(default = "default_lock_pin")]
    pub gpio_pin: u8,

    /// Duration the solenoid stays energized per unlock pulse, in seconds
    #[serde(default = "default_pulse_seconds")]
    pub pulse_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TiltConfig {
    /// GPIO pin of the tilt switch
    #[serde(default = "default_tilt_pin")]
    pub gpio_pin: u8,

    /// Debounce window in milliseconds
    #[serde(default = "default_tilt_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    /// Shared numeric passcode
    #[serde(default = "default_passcode")]
    pub passcode: String,

    /// Maximum number of buffered digits
    #[serde(default = "default_passcode_limit")]
    pub passcode_limit: usize,

    /// How long the "Access Granted" message is held, in seconds
    #[serde(default = "default_granted_seconds")]
    pub granted_display_seconds: u64,

    /// Number of "Access Denied" flashes
    #[serde(default = "default_denied_flashes")]
    pub denied_flashes: u32,

    /// On/off half-period of a denied flash, in milliseconds
    #[serde(default = "default_denied_flash_ms")]
    pub denied_flash_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecordingConfig {
    /// Fixed duration of one recording session, in seconds
    #[serde(default = "default_record_seconds")]
    pub duration_seconds: u64,

    /// Directory for in-flight artifacts before upload
    #[serde(default = "default_artifact_path")]
    pub artifact_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UploadConfig {
    /// Bucket (or stand-in directory) receiving artifacts and records
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Access key id for the upload sink; empty reads the environment
    #[serde(default)]
    pub access_key_id: String,

    /// Secret access key for the upload sink; empty reads the environment
    #[serde(default)]
    pub secret_access_key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelemetryConfig {
    /// Topic the status messages are published to
    #[serde(default = "default_telemetry_topic")]
    pub topic: String,

    /// Publish interval in seconds
    #[serde(default = "default_telemetry_interval")]
    pub interval_seconds: u64,

    /// Message broker endpoint
    #[serde(default)]
    pub endpoint: String,

    /// Client certificate path
    #[serde(default)]
    pub cert_path: String,

    /// Private key path
    #[serde(default)]
    pub key_path: String,

    /// CA certificate path
    #[serde(default)]
    pub ca_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Control cycle interval in milliseconds
    #[serde(default = "default_cycle_ms")]
    pub cycle_interval_ms: u64,

    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl SmartSafeConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("smartsafe.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("keypad.i2c_address", default_keypad_address() as i64)?
            .set_default("keypad.poll_interval_ms", default_keypad_poll_ms() as i64)?
            .set_default("lcd.i2c_address", default_lcd_address() as i64)?
            .set_default("lock.gpio_pin", default_lock_pin() as i64)?
            .set_default("lock.pulse_seconds", default_pulse_seconds() as i64)?
            .set_default("tilt.gpio_pin", default_tilt_pin() as i64)?
            .set_default("tilt.debounce_ms", default_tilt_debounce_ms() as i64)?
            .set_default("auth.passcode", default_passcode())?
            .set_default("auth.passcode_limit", default_passcode_limit() as i64)?
            .set_default("auth.granted_display_seconds", default_granted_seconds() as i64)?
            .set_default("auth.denied_flashes", default_denied_flashes() as i64)?
            .set_default("auth.denied_flash_ms", default_denied_flash_ms() as i64)?
            .set_default("recording.duration_seconds", default_record_seconds() as i64)?
            .set_default("recording.artifact_path", default_artifact_path())?
            .set_default("upload.bucket", default_bucket())?
            .set_default("upload.access_key_id", "")?
            .set_default("upload.secret_access_key", "")?
            .set_default("telemetry.topic", default_telemetry_topic())?
            .set_default("telemetry.interval_seconds", default_telemetry_interval() as i64)?
            .set_default("telemetry.endpoint", "")?
            .set_default("telemetry.cert_path", "")?
            .set_default("telemetry.key_path", "")?
            .set_default("telemetry.ca_path", "")?
            .set_default("system.cycle_interval_ms", default_cycle_ms() as i64)?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with SMARTSAFE_ prefix
            .add_source(Environment::with_prefix("SMARTSAFE").separator("_"))
            .build()?;

        let config: SmartSafeConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.passcode.is_empty() {
            return Err(ConfigError::Message(
                "Passcode must not be empty".to_string(),
            ));
        }

        if !self.auth.passcode.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::Message(
                "Passcode must contain only digits".to_string(),
            ));
        }

        if self.auth.passcode.len() > self.auth.passcode_limit {
            return Err(ConfigError::Message(
                "Passcode exceeds the passcode length limit".to_string(),
            ));
        }

        if self.auth.passcode_limit == 0 {
            return Err(ConfigError::Message(
                "Passcode length limit must be greater than 0".to_string(),
            ));
        }

        if self.recording.duration_seconds == 0 {
            return Err(ConfigError::Message(
                "Recording duration must be greater than 0".to_string(),
            ));
        }

        if self.telemetry.interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Telemetry interval must be greater than 0".to_string(),
            ));
        }

        if self.system.cycle_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Control cycle interval must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for SmartSafeConfig {
    fn default() -> Self {
        Self {
            keypad: KeypadConfig {
                i2c_address: default_keypad_address(),
                poll_interval_ms: default_keypad_poll_ms(),
            },
            lcd: LcdConfig {
                i2c_address: default_lcd_address(),
            },
            lock: LockConfig {
                gpio_pin: default_lock_pin(),
                pulse_seconds: default_pulse_seconds(),
            },
            tilt: TiltConfig {
                gpio_pin: default_tilt_pin(),
                debounce_ms: default_tilt_debounce_ms(),
            },
            auth: AuthConfig {
                passcode: default_passcode(),
                passcode_limit: default_passcode_limit(),
                granted_display_seconds: default_granted_seconds(),
                denied_flashes: default_denied_flashes(),
                denied_flash_ms: default_denied_flash_ms(),
            },
            recording: RecordingConfig {
                duration_seconds: default_record_seconds(),
                artifact_path: default_artifact_path(),
            },
            upload: UploadConfig {
                bucket: default_bucket(),
                access_key_id: String::new(),
                secret_access_key: String::new(),
            },
            telemetry: TelemetryConfig {
                topic: default_telemetry_topic(),
                interval_seconds: default_telemetry_interval(),
                endpoint: String::new(),
                cert_path: String::new(),
                key_path: String::new(),
                ca_path: String::new(),
            },
            system: SystemConfig {
                cycle_interval_ms: default_cycle_ms(),
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_keypad_address() -> u8 {
    0x27
}
fn default_keypad_poll_ms() -> u64 {
    100
}

fn default_lcd_address() -> u8 {
    0x26
}

fn default_lock_pin() -> u8 {
    17
}
fn default_pulse_seconds() -> u64 {
    5
}

fn default_tilt_pin() -> u8 {
    27
}
fn default_tilt_debounce_ms() -> u64 {
    100
}

fn default_passcode() -> String {
    "12345678".to_string()
}
fn default_passcode_limit() -> usize {
    16
}
fn default_granted_seconds() -> u64 {
    5
}
fn default_denied_flashes() -> u32 {
    5
}
fn default_denied_flash_ms() -> u64 {
    500
}

fn default_record_seconds() -> u64 {
    10
}
fn default_artifact_path() -> String {
    "./recordings".to_string()
}

fn default_bucket() -> String {
    "smartsafe-logs".to_string()
}

fn default_telemetry_topic() -> String {
    "devices/smartsafe/status".to_string()
}
fn default_telemetry_interval() -> u64 {
    1
}

fn default_cycle_ms() -> u64 {
    50
}
fn default_event_bus_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SmartSafeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.auth.passcode, "12345678");
        assert_eq!(config.auth.passcode_limit, 16);
        assert_eq!(config.recording.duration_seconds, 10);
        assert_eq!(config.telemetry.topic, "devices/smartsafe/status");
    }

    #[test]
    fn test_config_validation() {
        let mut config = SmartSafeConfig::default();

        config.auth.passcode = String::new();
        assert!(config.validate().is_err());

        config.auth.passcode = "12ab".to_string();
        assert!(config.validate().is_err());

        config.auth.passcode = "1234".to_string();
        assert!(config.validate().is_ok());

        config.auth.passcode = "1".repeat(17);
        assert!(config.validate().is_err());

        config.auth.passcode = "1234".to_string();
        config.system.cycle_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = SmartSafeConfig::load_from_file("does-not-exist.toml").unwrap();
        assert_eq!(config.lock.pulse_seconds, 5);
        assert_eq!(config.tilt.debounce_ms, 100);
    }
}
