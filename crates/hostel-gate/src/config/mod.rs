use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_OUTPASS_CUTOFF_HOUR: u32 = 20;
const DEFAULT_LOOKUP_LIMIT: usize = 20;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub gate: GatePolicyConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let gate = GatePolicyConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            gate,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Campus rules that shape outpass windows and gate lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicyConfig {
    /// Offset of the campus wall clock; outpass days and cutoffs are computed in it.
    pub campus_offset: FixedOffset,
    /// Local hour at which a same-day outpass lapses.
    pub outpass_cutoff_hour: u32,
    /// Maximum number of fuzzy lookup candidates returned to the gate.
    pub lookup_limit: usize,
}

impl GatePolicyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let campus_offset = match env::var("GATE_UTC_OFFSET") {
            Ok(raw) => parse_utc_offset(&raw).ok_or(ConfigError::InvalidUtcOffset(raw))?,
            Err(_) => utc(),
        };

        let outpass_cutoff_hour = match env::var("GATE_OUTPASS_CUTOFF_HOUR") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|hour| (1..=23).contains(hour))
                .ok_or(ConfigError::InvalidCutoffHour)?,
            Err(_) => DEFAULT_OUTPASS_CUTOFF_HOUR,
        };

        let lookup_limit = match env::var("GATE_LOOKUP_LIMIT") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or(ConfigError::InvalidLookupLimit)?,
            Err(_) => DEFAULT_LOOKUP_LIMIT,
        };

        Ok(Self {
            campus_offset,
            outpass_cutoff_hour,
            lookup_limit,
        })
    }

    /// Local time of day at which an outpass lapses.
    pub fn outpass_cutoff_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.outpass_cutoff_hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN)
    }

    /// Campus calendar day containing `at`.
    pub fn campus_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.campus_offset).date_naive()
    }

    /// UTC instant of a campus wall-clock time on `day`.
    pub fn campus_instant(&self, day: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let offset = Duration::seconds(i64::from(self.campus_offset.local_minus_utc()));
        Utc.from_utc_datetime(&(day.and_time(time) - offset))
    }

    /// Instant at which outpasses filed on campus day `day` lapse.
    pub fn outpass_cutoff(&self, day: NaiveDate) -> DateTime<Utc> {
        self.campus_instant(day, self.outpass_cutoff_time())
    }
}

impl Default for GatePolicyConfig {
    fn default() -> Self {
        Self {
            campus_offset: utc(),
            outpass_cutoff_hour: DEFAULT_OUTPASS_CUTOFF_HOUR,
            lookup_limit: DEFAULT_LOOKUP_LIMIT,
        }
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Parses `+HH:MM` / `-HH:MM` (or `Z`) into a fixed offset.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Some(utc());
    }

    let (sign, rest) = match trimmed.chars().next()? {
        '+' => (1, &trimmed[1..]),
        '-' => (-1, &trimmed[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours = offset_field(hours)?;
    let minutes = offset_field(minutes)?;
    if hours > 14 || minutes > 59 {
        return None;
    }

    let seconds = i32::try_from(hours * 3600 + minutes * 60).ok()?;
    FixedOffset::east_opt(sign * seconds)
}

/// Unsigned run of ASCII digits; a second sign is not accepted.
fn offset_field(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidUtcOffset(String),
    InvalidCutoffHour,
    InvalidLookupLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidUtcOffset(raw) => {
                write!(f, "GATE_UTC_OFFSET '{raw}' must look like +05:30 or -04:00")
            }
            ConfigError::InvalidCutoffHour => {
                write!(f, "GATE_OUTPASS_CUTOFF_HOUR must be an hour between 1 and 23")
            }
            ConfigError::InvalidLookupLimit => {
                write!(f, "GATE_LOOKUP_LIMIT must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
