//! Ledger configuration defaults.
//!
//! Every parameter has a default. An explicitly supplied value wins; a value
//! that is non-finite or negative, or an override naming no parameter, fails
//! closed instead of falling back.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use quote_core::FieldLimits;

/// Tunable ledger parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigParam {
    /// Maximum number of records (active or not) the ledger accepts.
    LedgerCapacity,
    /// Non-zero: fsync the log after every committed mutation.
    FsyncOnCommit,
    MaxTextBytes,
    MaxAuthorBytes,
    MaxCategoryBytes,
}

/// A supplied parameter value or name was rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Name as supplied by the caller.
    pub param_name: String,
    pub reason: &'static str,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "config fail-closed: '{}' rejected ({})",
            self.param_name, self.reason
        )
    }
}

impl std::error::Error for ConfigError {}

/// Default value for a parameter.
pub fn default_value(param: ConfigParam) -> f64 {
    match param {
        ConfigParam::LedgerCapacity => 1_000_000.0,
        ConfigParam::FsyncOnCommit => 1.0,
        ConfigParam::MaxTextBytes => 4096.0,
        ConfigParam::MaxAuthorBytes => 256.0,
        ConfigParam::MaxCategoryBytes => 64.0,
    }
}

/// snake_case name used in override maps and logs.
pub fn param_name(param: ConfigParam) -> &'static str {
    match param {
        ConfigParam::LedgerCapacity => "ledger_capacity",
        ConfigParam::FsyncOnCommit => "fsync_on_commit",
        ConfigParam::MaxTextBytes => "max_text_bytes",
        ConfigParam::MaxAuthorBytes => "max_author_bytes",
        ConfigParam::MaxCategoryBytes => "max_category_bytes",
    }
}

/// Expected number of ConfigParam variants. Bump together with ALL_PARAMS.
pub const EXPECTED_PARAM_COUNT: usize = 5;

/// All known `ConfigParam` variants.
pub const ALL_PARAMS: &[ConfigParam] = &[
    ConfigParam::LedgerCapacity,
    ConfigParam::FsyncOnCommit,
    ConfigParam::MaxTextBytes,
    ConfigParam::MaxAuthorBytes,
    ConfigParam::MaxCategoryBytes,
];

/// Look up a parameter by its snake_case name.
pub fn param_from_name(name: &str) -> Option<ConfigParam> {
    ALL_PARAMS.iter().copied().find(|p| param_name(*p) == name)
}

/// Resolve a value: explicit value if usable, else the default.
pub fn resolve_config_value(param: ConfigParam, value: Option<f64>) -> Result<f64, ConfigError> {
    let Some(v) = value else {
        return Ok(default_value(param));
    };
    if !v.is_finite() {
        return Err(ConfigError {
            param_name: param_name(param).to_string(),
            reason: "value is non-finite (NaN or Infinity)",
        });
    }
    if v < 0.0 {
        return Err(ConfigError {
            param_name: param_name(param).to_string(),
            reason: "value is negative",
        });
    }
    Ok(v)
}

/// Resolved ledger configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub capacity: usize,
    pub fsync_on_commit: bool,
    pub limits: FieldLimits,
    /// JSONL log path. `None` keeps the ledger in memory only.
    pub storage_path: Option<PathBuf>,
}

impl LedgerConfig {
    /// Resolve from a `param_name -> value` map. Unknown names are rejected.
    pub fn from_overrides(overrides: &HashMap<&str, f64>) -> Result<Self, ConfigError> {
        if let Some(name) = overrides.keys().find(|name| param_from_name(name).is_none()) {
            return Err(ConfigError {
                param_name: name.to_string(),
                reason: "override names an unknown parameter",
            });
        }
        let get = |param: ConfigParam| {
            resolve_config_value(param, overrides.get(param_name(param)).copied())
        };

        Ok(Self {
            capacity: get(ConfigParam::LedgerCapacity)? as usize,
            fsync_on_commit: get(ConfigParam::FsyncOnCommit)? != 0.0,
            limits: FieldLimits {
                max_text_bytes: get(ConfigParam::MaxTextBytes)? as usize,
                max_author_bytes: get(ConfigParam::MaxAuthorBytes)? as usize,
                max_category_bytes: get(ConfigParam::MaxCategoryBytes)? as usize,
            },
            storage_path: None,
        })
    }

    /// Persist to the JSONL log at `path`.
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Override the record capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            capacity: 1_000_000,
            fsync_on_commit: true,
            limits: FieldLimits::default(),
            storage_path: None,
        }
    }
}
