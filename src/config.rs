//! Loading and validation of `nicocc.toml`.
//!
//! The file is read as UTF-8 (a leading byte-order mark is ignored) and
//! deserialized into raw, all-optional sections first. [`Config::from_toml`]
//! then applies defaults and checks every value, so a loaded [`Config`] is
//! always internally consistent.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Asia::Tokyo;
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::http::DEFAULT_RETRY;
use crate::session::Credentials;

/// Name of the configuration file inside a working directory.
pub const CONFIG_FILE_NAME: &str = "nicocc.toml";

/// Format of `counter.start` and `counter.end` (Asia/Tokyo wall clock).
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DEFAULT_INTERVAL_MS: u64 = 1000;
const DEFAULT_SERVER_ERROR_INTERVAL_MS: u64 = 30_000;
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid UTF-8.
    #[error("config file {path} is not valid UTF-8")]
    NotUtf8 {
        /// Path of the config file.
        path: PathBuf,
    },

    /// The file is not valid TOML or a value has the wrong type.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required key is absent.
    #[error("missing required config value `{key}`")]
    Missing {
        /// Dotted key name.
        key: &'static str,
    },

    /// A date is not in `YYYY-MM-DD HH:MM:SS` form.
    #[error("invalid config value for `{key}`: {value:?}. Expected \"YYYY-MM-DD HH:MM:SS\"")]
    InvalidDate {
        /// Dotted key name.
        key: &'static str,
        /// The rejected value.
        value: String,
    },

    /// `counter.start` is later than `counter.end`.
    #[error("invalid collection period: start {start} is after end {end}")]
    InvalidPeriod {
        /// Formatted start.
        start: String,
        /// Formatted end.
        end: String,
    },

    /// `counter.encoding` names an unsupported encoding.
    #[error("unsupported encoding {0:?}. Expected \"cp932\", \"utf-8\" or \"utf-8-sig\"")]
    UnsupportedEncoding(String),
}

/// Text encoding of the CSV files nicocc reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Windows code page 932 (Shift_JIS with Microsoft extensions).
    ///
    /// Characters without a mapping are written as `&#NNNN;` references.
    #[default]
    Cp932,
    /// Plain UTF-8.
    Utf8,
    /// UTF-8 with a leading byte-order mark (spreadsheet friendly).
    Utf8Sig,
}

impl Encoding {
    /// Returns the configuration spelling of this encoding.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cp932 => "cp932",
            Self::Utf8 => "utf-8",
            Self::Utf8Sig => "utf-8-sig",
        }
    }

    /// Returns true when written files start with a byte-order mark.
    #[must_use]
    pub fn writes_bom(self) -> bool {
        matches!(self, Self::Utf8Sig)
    }
}

impl FromStr for Encoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "cp932" | "ms932" | "windows-31j" | "shift-jis" | "sjis" => Ok(Self::Cp932),
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "utf-8-sig" | "utf8-sig" => Ok(Self::Utf8Sig),
            _ => Err(ConfigError::UnsupportedEncoding(s.to_string())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collection settings (`[counter]`).
#[derive(Debug, Clone)]
pub struct CounterConfig {
    /// Inclusive start of the collection period.
    pub start: DateTime<Tz>,
    /// Inclusive end of the collection period.
    pub end: DateTime<Tz>,
    /// Mylists used to generate `videos.csv`.
    pub mylist: Vec<u64>,
    /// Regenerate `videos.csv` even if it exists.
    pub overwrite_videos: bool,
    /// Treat the first row of `videos.csv` as a header.
    pub skip_first_row: bool,
    /// Encoding of the CSV files.
    pub encoding: Encoding,
}

impl CounterConfig {
    /// Start of the period as unix seconds.
    #[must_use]
    pub fn start_timestamp(&self) -> i64 {
        self.start.timestamp()
    }

    /// End of the period as unix seconds.
    #[must_use]
    pub fn end_timestamp(&self) -> i64 {
        self.end.timestamp()
    }
}

/// HTTP settings (`[http]`).
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Minimum interval between requests.
    pub interval: Duration,
    /// Pause after a server error.
    pub server_error_interval: Duration,
    /// Retries after the first attempt.
    pub retry: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            server_error_interval: Duration::from_millis(DEFAULT_SERVER_ERROR_INTERVAL_MS),
            retry: DEFAULT_RETRY,
        }
    }
}

/// Default `logging.format`.
pub const DEFAULT_LOG_FORMAT: &str = "[%(levelname)s] %(asctime)s - %(name)s: %(message)s";

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%\((\w+)\)").expect("placeholder regex is valid") // Static pattern, safe to panic
});

/// Fields written on each line of the log file.
///
/// Built from the `%(field)s` placeholders of `logging.format`. Placement and
/// literal text are not reproduced; only which fields appear. The message is
/// always written.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct LogFormat {
    template: String,
    /// `%(levelname)s`, `%(levelno)s`.
    pub level: bool,
    /// `%(asctime)s`, `%(created)f`, `%(msecs)d`.
    pub time: bool,
    /// `%(name)s`, `%(module)s`, `%(funcName)s`.
    pub target: bool,
    /// `%(pathname)s`, `%(filename)s`, `%(lineno)d`.
    pub location: bool,
    /// `%(thread)d`, `%(threadName)s`.
    pub thread: bool,
}

impl LogFormat {
    /// Reads the placeholders of `template`. Unknown placeholders are ignored.
    #[must_use]
    pub fn from_template(template: &str) -> Self {
        let mut format = Self {
            template: template.to_string(),
            level: false,
            time: false,
            target: false,
            location: false,
            thread: false,
        };
        for captures in PLACEHOLDER.captures_iter(template) {
            match &captures[1] {
                "levelname" | "levelno" => format.level = true,
                "asctime" | "created" | "msecs" => format.time = true,
                "name" | "module" | "funcName" => format.target = true,
                "pathname" | "filename" | "lineno" => format.location = true,
                "thread" | "threadName" => format.thread = true,
                _ => {}
            }
        }
        format
    }

    /// The configured template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::from_template(DEFAULT_LOG_FORMAT)
    }
}

/// Logging settings (`[logging]`).
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level applied when `RUST_LOG` is unset.
    pub level: LevelFilter,
    /// Fields written to the log file.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::default(),
        }
    }
}

/// Validated contents of `nicocc.toml`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Login credentials (`[user]`).
    pub user: Credentials,
    /// Collection settings.
    pub counter: CounterConfig,
    /// HTTP settings.
    pub http: HttpConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    user: RawUser,
    counter: RawCounter,
    http: RawHttp,
    logging: RawLogging,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUser {
    mail: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawCounter {
    start: Option<String>,
    end: Option<String>,
    mylist: Vec<u64>,
    overwrite_videos: bool,
    skip_first_row: bool,
    encoding: String,
}

impl Default for RawCounter {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            mylist: Vec::new(),
            overwrite_videos: true,
            skip_first_row: true,
            encoding: Encoding::default().as_str().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawHttp {
    interval: u64,
    server_error_interval: u64,
    retry: u32,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL_MS,
            server_error_interval: DEFAULT_SERVER_ERROR_INTERVAL_MS,
            retry: DEFAULT_RETRY,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLogging {
    level: Option<String>,
    format: Option<String>,
}

impl Config {
    /// Loads and validates the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or any value is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes.as_slice());
        let text = std::str::from_utf8(bytes).map_err(|_| ConfigError::NotUtf8 {
            path: path.to_path_buf(),
        })?;
        Self::from_toml(text)
    }

    /// Parses and validates config text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for TOML errors and invalid values.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;

        let mail = raw.user.mail.ok_or(ConfigError::Missing { key: "user.mail" })?;
        let password = raw
            .user
            .password
            .ok_or(ConfigError::Missing { key: "user.password" })?;

        let start = parse_datetime("counter.start", raw.counter.start.as_deref())?;
        let end = parse_datetime("counter.end", raw.counter.end.as_deref())?;
        if start > end {
            return Err(ConfigError::InvalidPeriod {
                start: start.format(DATETIME_FORMAT).to_string(),
                end: end.format(DATETIME_FORMAT).to_string(),
            });
        }

        let encoding: Encoding = raw.counter.encoding.parse()?;

        Ok(Self {
            user: Credentials::new(mail, password),
            counter: CounterConfig {
                start,
                end,
                mylist: raw.counter.mylist,
                overwrite_videos: raw.counter.overwrite_videos,
                skip_first_row: raw.counter.skip_first_row,
                encoding,
            },
            http: HttpConfig {
                interval: Duration::from_millis(raw.http.interval),
                server_error_interval: Duration::from_millis(raw.http.server_error_interval),
                retry: raw.http.retry,
            },
            logging: LoggingConfig {
                level: raw
                    .logging
                    .level
                    .as_deref()
                    .map_or(LevelFilter::INFO, parse_level),
                format: raw
                    .logging
                    .format
                    .as_deref()
                    .map_or_else(LogFormat::default, LogFormat::from_template),
            },
        })
    }
}

fn parse_datetime(key: &'static str, value: Option<&str>) -> Result<DateTime<Tz>, ConfigError> {
    let value = value.ok_or(ConfigError::Missing { key })?;
    let invalid = || ConfigError::InvalidDate {
        key,
        value: value.to_string(),
    };
    // chrono accepts unpadded fields; the format is fixed width.
    if value.len() != "YYYY-MM-DD HH:MM:SS".len() {
        return Err(invalid());
    }
    let naive = NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).map_err(|_| invalid())?;
    Tokyo.from_local_datetime(&naive).single().ok_or_else(invalid)
}

/// Maps a level name to a filter. Unknown names fall back to `info`.
#[must_use]
pub fn parse_level(name: &str) -> LevelFilter {
    match name.trim().to_ascii_uppercase().as_str() {
        "CRITICAL" | "FATAL" | "ERROR" => LevelFilter::ERROR,
        "WARN" | "WARNING" => LevelFilter::WARN,
        "DEBUG" => LevelFilter::DEBUG,
        "TRACE" | "NOTSET" => LevelFilter::TRACE,
        "OFF" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mylist: Vec<String> = self.counter.mylist.iter().map(u64::to_string).collect();
        writeln!(f, "user.mail = {:?}", self.user.mail())?;
        writeln!(f, "user.password = {:?}", self.user.masked_password())?;
        writeln!(f, "counter.start = {}", self.counter.start.format(DATETIME_FORMAT))?;
        writeln!(f, "counter.end = {}", self.counter.end.format(DATETIME_FORMAT))?;
        writeln!(f, "counter.mylist = [{}]", mylist.join(", "))?;
        writeln!(f, "counter.overwrite_videos = {}", self.counter.overwrite_videos)?;
        writeln!(f, "counter.skip_first_row = {}", self.counter.skip_first_row)?;
        writeln!(f, "counter.encoding = {}", self.counter.encoding)?;
        writeln!(f, "http.interval = {}ms", self.http.interval.as_millis())?;
        writeln!(
            f,
            "http.server_error_interval = {}ms",
            self.http.server_error_interval.as_millis()
        )?;
        writeln!(f, "http.retry = {}", self.http.retry)?;
        writeln!(f, "logging.level = {}", self.logging.level)?;
        write!(f, "logging.format = {:?}", self.logging.format.template())
    }
}
