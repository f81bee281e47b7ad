use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const ENV_KEY: &str = "APP_ENV";
const HOST_KEY: &str = "APP_HOST";
const PORT_KEY: &str = "APP_PORT";
const LOG_LEVEL_KEY: &str = "APP_LOG_LEVEL";
const MIN_SAMPLES_KEY: &str = "CALIBRATION_OUTLIER_MIN_SAMPLES";
const MAX_GAP_KEY: &str = "CALIBRATION_OUTLIER_MAX_GAP";

/// Deployment stage; only changes log presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Everything the service reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub calibration: CalibrationConfig,
}

impl AppConfig {
    /// Reads `.env` (when present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            environment: AppEnvironment::parse(&var_or(ENV_KEY, "development")),
            server: ServerConfig::from_env()?,
            telemetry: TelemetryConfig {
                log_level: var_or(LOG_LEVEL_KEY, "info"),
            },
            calibration: CalibrationConfig::from_env()?,
        })
    }
}

fn var_or(key: &str, fallback: &str) -> String {
    env::var(key).unwrap_or_else(|_| fallback.to_string())
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let port = var_or(PORT_KEY, "3000")
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        Ok(Self {
            host: var_or(HOST_KEY, "127.0.0.1"),
            port,
        })
    }

    /// `localhost` maps to the IPv4 loopback; anything else must be a literal address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::from([127, 0, 0, 1])
        } else {
            self.host
                .parse()
                .map_err(|source| ConfigError::InvalidHost { source })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Review thresholds used when flagging calibration cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationConfig {
    pub outlier_min_samples: u32,
    pub outlier_max_gap: f64,
}

impl CalibrationConfig {
    pub const DEFAULT_MIN_SAMPLES: u32 = 3;
    pub const DEFAULT_MAX_GAP: f64 = 25.0;

    fn from_env() -> Result<Self, ConfigError> {
        let outlier_min_samples = match env::var(MIN_SAMPLES_KEY) {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidOutlierMinSamples)?,
            Err(_) => Self::DEFAULT_MIN_SAMPLES,
        };

        // Negative or non-finite gaps would flag every cell or none.
        let outlier_max_gap = match env::var(MAX_GAP_KEY) {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|gap| gap.is_finite() && *gap >= 0.0)
                .ok_or(ConfigError::InvalidOutlierMaxGap)?,
            Err(_) => Self::DEFAULT_MAX_GAP,
        };

        Ok(Self {
            outlier_min_samples,
            outlier_max_gap,
        })
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            outlier_min_samples: Self::DEFAULT_MIN_SAMPLES,
            outlier_max_gap: Self::DEFAULT_MAX_GAP,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidOutlierMinSamples,
    InvalidOutlierMaxGap,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "{PORT_KEY} must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "{HOST_KEY} must be 'localhost' or an IPv4/IPv6 address")
            }
            ConfigError::InvalidOutlierMinSamples => {
                write!(f, "{MIN_SAMPLES_KEY} must be a non-negative integer")
            }
            ConfigError::InvalidOutlierMaxGap => {
                write!(f, "{MAX_GAP_KEY} must be a finite, non-negative number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidOutlierMinSamples
            | ConfigError::InvalidOutlierMaxGap => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    fn clean_env() -> MutexGuard<'static, ()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        let guard = GUARD
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for key in [
            ENV_KEY,
            HOST_KEY,
            PORT_KEY,
            LOG_LEVEL_KEY,
            MIN_SAMPLES_KEY,
            MAX_GAP_KEY,
        ] {
            env::remove_var(key);
        }
        guard
    }

    #[test]
    fn falls_back_to_defaults() {
        let _env = clean_env();
        let config = AppConfig::load().expect("defaults load");

        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.calibration, CalibrationConfig::default());
    }

    #[test]
    fn localhost_resolves_to_loopback() {
        let _env = clean_env();
        env::set_var(HOST_KEY, "LocalHost");
        env::set_var(PORT_KEY, "8088");
        let config = AppConfig::load().expect("config loads");

        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 8088));
    }

    #[test]
    fn hostnames_other_than_localhost_are_rejected() {
        let _env = clean_env();
        env::set_var(HOST_KEY, "grc.internal");
        let config = AppConfig::load().expect("host is only checked on bind");
        assert!(matches!(
            config.server.socket_addr(),
            Err(ConfigError::InvalidHost { .. })
        ));
    }

    #[test]
    fn reads_calibration_thresholds_and_environment() {
        let _env = clean_env();
        env::set_var(ENV_KEY, "CI");
        env::set_var(MIN_SAMPLES_KEY, " 5 ");
        env::set_var(MAX_GAP_KEY, "18.5");
        let config = AppConfig::load().expect("config loads");

        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(config.calibration.outlier_min_samples, 5);
        assert!((config.calibration.outlier_max_gap - 18.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_invalid_thresholds() {
        let _env = clean_env();
        env::set_var(MAX_GAP_KEY, "-1");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidOutlierMaxGap)
        ));

        env::remove_var(MAX_GAP_KEY);
        env::set_var(MIN_SAMPLES_KEY, "three");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidOutlierMinSamples)
        ));
        env::remove_var(MIN_SAMPLES_KEY);
    }
}
