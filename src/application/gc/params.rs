use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::ports::JobContext;

/// Raw parameters as marshalled by the job runner
pub type JobParameters = serde_json::Map<String, Value>;

pub const DEFAULT_TIME_WINDOW_HOURS: u32 = 2;
/// A hundred years; anything larger is a typo
const MAX_TIME_WINDOW_HOURS: u64 = 876_000;

const KEY_DELETE_UNTAGGED: &str = "delete_untagged";
const KEY_TIME_WINDOW_HOURS: &str = "time_window_hours";
const KEY_TIME_WINDOW_LEGACY: &str = "time_window";
const KEY_DRY_RUN: &str = "dry_run";
const KEY_CACHE_ENDPOINT: &str = "cache_endpoint";
const KEY_CACHE_ENDPOINT_LEGACY: &str = "redis_url_reg";

const KNOWN_KEYS: &[&str] = &[
    KEY_DELETE_UNTAGGED,
    KEY_TIME_WINDOW_HOURS,
    KEY_TIME_WINDOW_LEGACY,
    KEY_DRY_RUN,
    KEY_CACHE_ENDPOINT,
    KEY_CACHE_ENDPOINT_LEGACY,
];

const CACHE_SCHEMES: &[&str] = &["redis://", "rediss://", "unix://"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("Parameter '{key}' must be {expected}, got {found}")]
    TypeMismatch {
        key: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Parameter '{key}' is invalid: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("Parameter 'cache_endpoint' is required unless dry_run is set")]
    MissingCacheEndpoint,
}

/// Validated parameters of one collector run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GcParameters {
    /// Move untagged artifacts to the trash before marking
    pub delete_untagged: bool,
    /// Minimum age of a blob before it qualifies; 0 disables the window
    pub time_window_hours: u32,
    /// Compute and report only
    pub dry_run: bool,
    /// Registry metadata cache to invalidate after the sweep
    pub cache_endpoint: Option<String>,
}

impl Default for GcParameters {
    fn default() -> Self {
        Self {
            delete_untagged: true,
            time_window_hours: DEFAULT_TIME_WINDOW_HOURS,
            dry_run: false,
            cache_endpoint: None,
        }
    }
}

impl GcParameters {
    /// Bind and validate raw job parameters.
    ///
    /// Unknown keys are ignored with a warning. A missing `cache_endpoint`
    /// falls back to the ambient value from the job context.
    pub fn bind(params: &JobParameters, ctx: &dyn JobContext) -> Result<Self, ParamError> {
        for key in params.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                warn!("Ignoring unknown garbage collection parameter '{}'", key);
            }
        }

        let defaults = Self::default();

        let delete_untagged =
            bool_param(params, KEY_DELETE_UNTAGGED)?.unwrap_or(defaults.delete_untagged);
        let dry_run = bool_param(params, KEY_DRY_RUN)?.unwrap_or(defaults.dry_run);

        let time_window_hours = match hours_param(params, KEY_TIME_WINDOW_HOURS)? {
            Some(hours) => hours,
            None => hours_param(params, KEY_TIME_WINDOW_LEGACY)?
                .unwrap_or(defaults.time_window_hours),
        };

        let cache_endpoint = match string_param(params, KEY_CACHE_ENDPOINT)? {
            Some(endpoint) => Some(endpoint),
            None => match string_param(params, KEY_CACHE_ENDPOINT_LEGACY)? {
                Some(endpoint) => Some(endpoint),
                None => ctx
                    .get(KEY_CACHE_ENDPOINT)
                    .and_then(|value| value.as_str().map(str::to_string)),
            },
        };

        if let Some(endpoint) = &cache_endpoint {
            validate_cache_endpoint(endpoint)?;
        } else if !dry_run {
            return Err(ParamError::MissingCacheEndpoint);
        }

        let bound = Self {
            delete_untagged,
            time_window_hours,
            dry_run,
            cache_endpoint,
        };

        info!(
            "Garbage collection parameters: [delete_untagged: {}, dry_run: {}, time_window_hours: {}]",
            bound.delete_untagged, bound.dry_run, bound.time_window_hours
        );

        Ok(bound)
    }
}

fn lookup<'a>(params: &'a JobParameters, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|value| !value.is_null())
}

fn bool_param(params: &JobParameters, key: &'static str) -> Result<Option<bool>, ParamError> {
    match lookup(params, key) {
        None => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(other) => Err(ParamError::TypeMismatch {
            key,
            expected: "a boolean",
            found: json_type_name(other),
        }),
    }
}

fn hours_param(params: &JobParameters, key: &'static str) -> Result<Option<u32>, ParamError> {
    let Some(value) = lookup(params, key) else {
        return Ok(None);
    };

    let Value::Number(number) = value else {
        return Err(ParamError::TypeMismatch {
            key,
            expected: "an integer",
            found: json_type_name(value),
        });
    };

    let hours = if let Some(hours) = number.as_u64() {
        hours
    } else if number.as_i64().is_some() {
        return Err(ParamError::InvalidValue {
            key,
            message: "must not be negative".to_string(),
        });
    } else {
        // Runners that marshal through JSON floats send `2.0`
        match number.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= 0.0 => f as u64,
            Some(f) if f < 0.0 => {
                return Err(ParamError::InvalidValue {
                    key,
                    message: "must not be negative".to_string(),
                })
            }
            _ => {
                return Err(ParamError::TypeMismatch {
                    key,
                    expected: "an integer",
                    found: "a fractional number",
                })
            }
        }
    };

    if hours > MAX_TIME_WINDOW_HOURS {
        return Err(ParamError::InvalidValue {
            key,
            message: format!("must be at most {} hours", MAX_TIME_WINDOW_HOURS),
        });
    }

    Ok(Some(hours as u32))
}

fn string_param(params: &JobParameters, key: &'static str) -> Result<Option<String>, ParamError> {
    match lookup(params, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ParamError::TypeMismatch {
            key,
            expected: "a string",
            found: json_type_name(other),
        }),
    }
}

fn validate_cache_endpoint(endpoint: &str) -> Result<(), ParamError> {
    if endpoint.trim().is_empty() {
        return Err(ParamError::InvalidValue {
            key: KEY_CACHE_ENDPOINT,
            message: "must not be empty".to_string(),
        });
    }
    if !CACHE_SCHEMES
        .iter()
        .any(|scheme| endpoint.starts_with(scheme))
    {
        return Err(ParamError::InvalidValue {
            key: KEY_CACHE_ENDPOINT,
            message: format!("must start with one of {}", CACHE_SCHEMES.join(", ")),
        });
    }
    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
