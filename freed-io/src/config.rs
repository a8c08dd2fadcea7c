//! Configuration for FreedIO
//!
//! Loads configuration from a TOML file. Every section is optional and falls
//! back to the defaults below, so a deployment file only needs the values it
//! changes (usually `[protocol] profile` and `[network] port`).
//!
//! ```toml
//! [network]
//! bind_address = "0.0.0.0"
//! port = 19148
//!
//! [protocol]
//! profile = "b"        # a | b | c
//! # tilt_scale = 90.0  # override the profile's tilt full scale
//!
//! [calibration]
//! enabled = true
//! settle_secs = 3.0
//! collect_secs = 5.0
//! ```

use crate::error::{Error, Result};
use crate::protocol::{PacketLayout, Profile};
use crate::tracking::{CalibrationConfig, CameraConfig, FilterConfig, IdleConfig, LensConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub idle: IdleConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub lens: LensConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// UDP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Interface to bind (`0.0.0.0` = all interfaces)
    pub bind_address: String,
    /// FreeD port
    pub port: u16,
    /// Socket read timeout; bounds how long shutdown takes to be noticed
    pub recv_timeout_ms: u64,
    /// Receive buffer size per datagram
    pub max_datagram_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 19148,
            recv_timeout_ms: 100,
            max_datagram_size: 1024,
        }
    }
}

impl NetworkConfig {
    /// `host:port` string suitable for `UdpSocket::bind`
    pub fn endpoint(&self) -> String {
        if self.bind_address.contains(':') {
            format!("[{}]:{}", self.bind_address, self.port)
        } else {
            format!("{}:{}", self.bind_address, self.port)
        }
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}

/// Wire layout selection
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub profile: Profile,
    /// Override the profile's minimum frame length
    pub min_length: Option<usize>,
    /// Override pan full scale (degrees at raw 32768)
    pub pan_scale: Option<f64>,
    /// Override tilt full scale (degrees at raw 32768)
    pub tilt_scale: Option<f64>,
}

impl ProtocolConfig {
    /// Profile table with overrides applied
    pub fn layout(&self) -> PacketLayout {
        PacketLayout::for_profile(self.profile).with_overrides(
            self.min_length,
            self.pan_scale,
            self.tilt_scale,
        )
    }
}

/// Consumer frame rate bounds (Hz)
const MIN_FRAME_RATE_HZ: f64 = 0.1;
const MAX_FRAME_RATE_HZ: f64 = 1000.0;

/// Headless consumer loop run by the daemon
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Snapshot polling rate
    pub frame_rate_hz: f64,
    /// Seconds between status log lines
    pub status_interval_secs: f64,
    /// Idle sweep pan amplitude (degrees)
    pub sweep_pan_amplitude_deg: f64,
    /// Idle sweep pan angular rate (rad/s)
    pub sweep_pan_rate: f64,
    /// Idle sweep tilt amplitude (degrees)
    pub sweep_tilt_amplitude_deg: f64,
    /// Idle sweep tilt angular rate (rad/s)
    pub sweep_tilt_rate: f64,
}

impl ConsumerConfig {
    /// Sleep between frames, kept within the supported rate range
    pub fn frame_period(&self) -> Duration {
        let slowest = Duration::from_secs_f64(1.0 / MIN_FRAME_RATE_HZ);
        let fastest = Duration::from_secs_f64(1.0 / MAX_FRAME_RATE_HZ);
        Duration::try_from_secs_f64(1.0 / self.frame_rate_hz)
            .map_or(slowest, |period| period.clamp(fastest, slowest))
    }

    pub fn status_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.status_interval_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: 30.0,
            status_interval_secs: 1.0,
            sweep_pan_amplitude_deg: 20.0,
            sweep_pan_rate: 0.5,
            sweep_tilt_amplitude_deg: 5.0,
            sweep_tilt_rate: 0.3,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use freed_io::config::AppConfig;
    ///
    /// let config = AppConfig::load("freed-io.toml")?;
    /// # Ok::<(), freed_io::Error>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let layout = self.protocol.layout();
        layout.validate()?;

        if self.network.max_datagram_size < layout.min_length {
            return Err(invalid(format!(
                "network.max_datagram_size ({}) is smaller than profile {} frames ({})",
                self.network.max_datagram_size, self.protocol.profile, layout.min_length
            )));
        }
        if self.network.recv_timeout_ms == 0 {
            return Err(invalid("network.recv_timeout_ms must be positive".to_string()));
        }

        let f = &self.filter;
        for (name, gain) in [
            ("pan_gain", f.pan_gain),
            ("zoom_gain", f.zoom_gain),
            ("tilt_gain_wide", f.tilt_gain_wide),
            ("tilt_gain_min", f.tilt_gain_min),
        ] {
            if !(0.0..=1.0).contains(&gain) {
                return Err(invalid(format!("filter.{} must be within [0, 1], got {}", name, gain)));
            }
        }
        if !non_negative(f.tilt_gain_zoom_factor) {
            return Err(invalid(format!(
                "filter.tilt_gain_zoom_factor must be finite and >= 0, got {}",
                f.tilt_gain_zoom_factor
            )));
        }
        if !(f.pan_min < f.pan_max) || !(f.tilt_min < f.tilt_max) {
            return Err(invalid("filter limits must satisfy min < max".to_string()));
        }
        if !(f.pan_step >= 0.0) || !(f.tilt_step >= 0.0) {
            return Err(invalid("filter quantization steps must be >= 0".to_string()));
        }

        let c = &self.calibration;
        if !non_negative(c.settle_secs) || !non_negative(c.collect_secs) {
            return Err(invalid(
                "calibration settle/collect durations must be finite and >= 0".to_string(),
            ));
        }
        if !(self.idle.timeout_secs.is_finite() && self.idle.timeout_secs > 0.0) {
            return Err(invalid("idle.timeout_secs must be positive".to_string()));
        }
        if !(MIN_FRAME_RATE_HZ..=MAX_FRAME_RATE_HZ).contains(&self.consumer.frame_rate_hz) {
            return Err(invalid(format!(
                "consumer.frame_rate_hz must be within [{}, {}], got {}",
                MIN_FRAME_RATE_HZ, MAX_FRAME_RATE_HZ, self.consumer.frame_rate_hz
            )));
        }
        if !non_negative(self.consumer.status_interval_secs) {
            return Err(invalid(
                "consumer.status_interval_secs must be finite and >= 0".to_string(),
            ));
        }
        if !(self.lens.wide_fov_deg > 0.0 && self.lens.tele_fov_deg > 0.0) {
            return Err(invalid("lens field of view limits must be positive".to_string()));
        }

        Ok(())
    }
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn invalid(msg: String) -> Error {
    Error::InvalidConfig(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.network.bind_address, "0.0.0.0");
        assert_eq!(config.network.port, 19148);
        assert_eq!(config.network.max_datagram_size, 1024);
        assert_eq!(config.protocol.profile, Profile::B);
        assert_eq!(config.idle.timeout_secs, 2.0);
        assert_eq!(config.calibration.settle_secs, 3.0);
        assert_eq!(config.calibration.collect_secs, 5.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml_str(
            r#"
[network]
port = 40000

[protocol]
profile = "a"
tilt_scale = 120.0

[filter]
pan_gain = 0.3
"#,
        )
        .unwrap();

        assert_eq!(config.network.port, 40000);
        assert_eq!(config.network.bind_address, "0.0.0.0");
        assert_eq!(config.protocol.profile, Profile::A);
        assert_eq!(config.filter.pan_gain, 0.3);
        assert_eq!(config.filter.zoom_gain, 0.15);
        assert_eq!(config.protocol.layout().tilt_encoding.to_degrees(8192), 30.0);
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = AppConfig::from_toml_str(include_str!("../freed-io.toml")).unwrap();
        assert_eq!(config.network.port, 19148);
        assert_eq!(config.protocol.profile, Profile::B);
        assert_eq!(config.filter.zoom_full_scale, 0x40_0000);
        assert_eq!(config.lens.tele_fov_deg, 3.5);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.network.port, 19148);
        assert!(config.calibration.enabled);
    }

    #[test]
    fn test_invalid_gain_rejected() {
        let result = AppConfig::from_toml_str("[filter]\npan_gain = 1.5\n");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_layout_override_rejected() {
        let result = AppConfig::from_toml_str("[protocol]\nprofile = \"c\"\nmin_length = 12\n");
        assert!(matches!(result, Err(Error::InvalidLayout(_))));
    }

    #[test]
    fn test_unusable_tilt_scale_rejected() {
        for value in ["nan", "inf", "0.0"] {
            let toml = format!("[protocol]\nprofile = \"b\"\ntilt_scale = {}\n", value);
            let result = AppConfig::from_toml_str(&toml);
            assert!(
                matches!(result, Err(Error::InvalidLayout(_))),
                "tilt_scale = {} accepted",
                value
            );
        }
    }

    #[test]
    fn test_negative_zoom_factor_rejected() {
        let result = AppConfig::from_toml_str("[filter]\ntilt_gain_zoom_factor = -0.5\n");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_frame_rate_bounds() {
        let result = AppConfig::from_toml_str("[consumer]\nframe_rate_hz = 1e-30\n");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));

        let tiny = ConsumerConfig {
            frame_rate_hz: 1e-30,
            ..Default::default()
        };
        assert_eq!(tiny.frame_period(), Duration::from_secs(10));

        let zero = ConsumerConfig {
            frame_rate_hz: 0.0,
            ..Default::default()
        };
        assert_eq!(zero.frame_period(), Duration::from_secs(10));

        let normal = ConsumerConfig::default();
        assert_eq!(normal.frame_period(), Duration::from_secs_f64(1.0 / 30.0));
    }

    #[test]
    fn test_status_interval_saturates() {
        let consumer = ConsumerConfig {
            status_interval_secs: 1e300,
            ..Default::default()
        };
        assert_eq!(consumer.status_interval(), Duration::MAX);
    }

    #[test]
    fn test_parse_error() {
        let result = AppConfig::from_toml_str("[network\nport = 1");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[network]\nbind_address = \"127.0.0.1\"\nport = 5000").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.network.endpoint(), "127.0.0.1:5000");
    }

    #[test]
    fn test_load_missing_file() {
        let result = AppConfig::load("/nonexistent/freed-io.toml");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_ipv6_endpoint() {
        let network = NetworkConfig {
            bind_address: "::".to_string(),
            ..Default::default()
        };
        assert_eq!(network.endpoint(), "[::]:19148");
    }
}
