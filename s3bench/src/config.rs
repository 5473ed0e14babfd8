//! Configuration for a benchmark agent.
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Command line flags
//! 2. Environment variables (prefixed with `S3B__`)
//! 3. YAML configuration file (specified via `-c` or `--config` flag)
//! 4. Defaults
//!
//! See [`Config`] for a description of all configuration fields and their defaults.
//!
//! # Environment Variables
//!
//! Environment variables use `S3B__` as a prefix and double underscores (`__`) to denote nested
//! configuration structures. For example:
//!
//! - `S3B__STATSD=statsd.local:8125` sets the StatsD collector
//! - `S3B__MATRIX=small=1024,large=0x100000` sets the test matrix
//! - `S3B__STORAGE__BUCKET=bench` sets the bucket name
//!
//! # YAML Configuration File
//!
//! The above configuration in YAML format would look like this:
//!
//! ```yaml
//! statsd: statsd.local:8125
//! matrix: small=1024,large=0x100000
//!
//! storage:
//!   bucket: bench
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use secrecy::{CloneableSecret, SecretBox, SerializableSecret, zeroize::Zeroize};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::metrics::DEFAULT_PREFIX;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "S3B__";

/// Newtype around `String` that may protect against accidental
/// logging of secrets in our configuration struct. Use with
/// [`secrecy::SecretBox`].
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigSecret(String);

impl ConfigSecret {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ConfigSecret {
    fn from(str: &str) -> Self {
        ConfigSecret(str.to_string())
    }
}

impl fmt::Debug for ConfigSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "[redacted]")
    }
}

impl CloneableSecret for ConfigSecret {}
impl SerializableSecret for ConfigSecret {}
impl Zeroize for ConfigSecret {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Connection settings for the S3-compatible service under test.
///
/// Used in: [`Config::storage`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Storage {
    /// S3 endpoint URL.
    ///
    /// Examples: `https://s3.amazonaws.com`, `http://localhost:9000` (for MinIO). If `None`, the
    /// AWS endpoint for [`region`](Self::region) is used.
    ///
    /// # Environment Variable
    ///
    /// `S3B__STORAGE__ENDPOINT`
    pub endpoint: Option<String>,

    /// Region of the bucket.
    ///
    /// # Default
    ///
    /// `us-east-1`
    ///
    /// # Environment Variable
    ///
    /// `S3B__STORAGE__REGION`
    pub region: String,

    /// Bucket that test objects are written to.
    ///
    /// # Default
    ///
    /// `s3bench`
    ///
    /// # Environment Variable
    ///
    /// `S3B__STORAGE__BUCKET`
    pub bucket: String,

    /// Whether to address the bucket in the path instead of the host name.
    ///
    /// Most self-hosted S3-compatible services require this.
    ///
    /// # Default
    ///
    /// `true`
    pub path_style: bool,

    /// Access key ID. Redacted from logs.
    ///
    /// # Environment Variable
    ///
    /// `S3B__STORAGE__ACCESS_KEY`
    pub access_key: Option<SecretBox<ConfigSecret>>,

    /// Secret access key. Redacted from logs.
    ///
    /// # Environment Variable
    ///
    /// `S3B__STORAGE__SECRET_KEY`
    pub secret_key: Option<SecretBox<ConfigSecret>>,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".into(),
            bucket: "s3bench".into(),
            path_style: true,
            access_key: None,
            secret_key: None,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted. The format can be explicitly specified or
/// auto-detected based on whether output is to a TTY.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2020-12-04T12:10:32Z  INFO s3bench::matrix: built test matrix
    /// ```
    Simplified,

    /// Dump out JSON lines.
    Json,
}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Logs are always written to stderr.
///
/// Used in: [`Config::logging`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// The `RUST_LOG` environment variable overrides this if set. Enabling [`Config::debug`]
    /// raises this to at least `DEBUG`.
    ///
    /// # Default
    ///
    /// `INFO`
    ///
    /// # Environment Variable
    ///
    /// `S3B__LOGGING__LEVEL`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format. See [`LogFormat`] for available options.
    ///
    /// # Default
    ///
    /// `Auto` (pretty for TTY, simplified otherwise)
    ///
    /// # Environment Variable
    ///
    /// `S3B__LOGGING__FORMAT`
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Main configuration struct for a benchmark agent.
///
/// See the [module documentation](self) for how sources are merged.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Enables verbose logging of the test matrix.
    ///
    /// # Environment Variable
    ///
    /// `S3B__DEBUG`
    pub debug: bool,

    /// Address of the StatsD collector, as `host[:port]`.
    ///
    /// Required. Without a port, the StatsD default port `8125` is used.
    ///
    /// # Environment Variable
    ///
    /// `S3B__STATSD`
    pub statsd: Option<String>,

    /// Namespace for all metric keys.
    ///
    /// # Default
    ///
    /// `s3b` when unset or empty.
    ///
    /// # Environment Variable
    ///
    /// `S3B__PREFIX`
    pub prefix: Option<String>,

    /// The test matrix, as comma-separated `tag=size` pairs.
    ///
    /// Required. Sizes are unsigned integers in bytes; `0x`, `0o`, `0b` and leading-`0` (octal)
    /// prefixes are supported.
    ///
    /// # Environment Variable
    ///
    /// `S3B__MATRIX`
    pub matrix: Option<String>,

    /// Identifier of this agent, used in temporary file names.
    ///
    /// # Default
    ///
    /// `agent-` followed by a random UUID.
    ///
    /// # Environment Variable
    ///
    /// `S3B__AGENT_ID`
    pub agent_id: Option<String>,

    /// Directory to create element files in.
    ///
    /// # Default
    ///
    /// The platform temp directory.
    ///
    /// # Environment Variable
    ///
    /// `S3B__SCRATCH_DIR`
    pub scratch_dir: Option<PathBuf>,

    /// Keeps element files on disk when the process exits.
    ///
    /// # Environment Variable
    ///
    /// `S3B__KEEP_FILES`
    pub keep_files: bool,

    /// Connection settings for the service under test.
    pub storage: Storage,

    /// Logging configuration.
    pub logging: Logging,
}

/// Configuration values given on the command line.
///
/// Unset fields leave the value from lower-precedence sources untouched.
#[derive(Debug, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statsd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl Config {
    /// Loads configuration from the given file and command line overrides.
    ///
    /// Configuration is merged in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. YAML configuration file (if provided)
    /// 3. Environment variables (prefixed with `S3B__`)
    /// 4. Command line overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML file cannot be read or parsed, or if any source contains
    /// invalid values. Required matrix options are validated later, when the matrix is built.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
            .extract()?;

        Ok(config)
    }

    /// The configured agent identifier, or a freshly generated one.
    pub fn agent_id(&self) -> String {
        match self.agent_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_owned(),
            _ => format!("agent-{}", uuid::Uuid::new_v4().simple()),
        }
    }

    /// The metric key prefix, falling back to [`DEFAULT_PREFIX`].
    pub fn prefix(&self) -> &str {
        match self.prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => prefix,
            _ => DEFAULT_PREFIX,
        }
    }
}
