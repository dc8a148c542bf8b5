//! Process configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `EXPCAT_BIND_ADDR` | `0.0.0.0:8080` |
//! | `BACKUP_BUCKET` | `./data/backup` |
//! | `MODELS_BUCKET` | `./data/models` |
//! | `EXPCAT_SPLIT_SEED` | `42` |
//! | `EXPCAT_TEST_RATIO` | `0.2` |
//! | `EXPCAT_MIN_EXAMPLES` | `2` |
//! | `EXPCAT_MAX_EXAMPLES` | `50000`; must be at least 1 |
//! | `EXPCAT_ARTIFACT_ALIASES` | empty; `tenant=alias,tenant=alias` |
//! | `EXPCAT_STORE_MAX_RETRIES` | `3` |
//!
//! Buckets are directory roots for the filesystem blob store.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use expcat_ai::TrainingParams;
use expcat_core::{ExpcatError, TenantId};

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct ExpcatConfig {
    pub bind_addr: SocketAddr,
    pub backup_bucket: PathBuf,
    pub models_bucket: PathBuf,
    pub training: TrainingParams,
    pub artifact_aliases: BTreeMap<TenantId, String>,
    pub store_retry: RetryPolicy,
}

impl Default for ExpcatConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            backup_bucket: PathBuf::from("./data/backup"),
            models_bucket: PathBuf::from("./data/models"),
            training: TrainingParams::default(),
            artifact_aliases: BTreeMap::new(),
            store_retry: RetryPolicy::default(),
        }
    }
}

impl ExpcatConfig {
    pub fn from_env() -> Result<Self, ExpcatError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; unset and empty are the same.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ExpcatError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let backup_bucket = match get("BACKUP_BUCKET") {
            Some(v) => PathBuf::from(v),
            None => {
                tracing::warn!(default = %defaults.backup_bucket.display(), "BACKUP_BUCKET not set; using local default");
                defaults.backup_bucket
            }
        };
        let models_bucket = match get("MODELS_BUCKET") {
            Some(v) => PathBuf::from(v),
            None => {
                tracing::warn!(default = %defaults.models_bucket.display(), "MODELS_BUCKET not set; using local default");
                defaults.models_bucket
            }
        };

        let training = TrainingParams {
            seed: parse_or("EXPCAT_SPLIT_SEED", get("EXPCAT_SPLIT_SEED"), defaults.training.seed)?,
            test_ratio: parse_or("EXPCAT_TEST_RATIO", get("EXPCAT_TEST_RATIO"), defaults.training.test_ratio)?,
            min_examples: parse_or("EXPCAT_MIN_EXAMPLES", get("EXPCAT_MIN_EXAMPLES"), defaults.training.min_examples)?,
            max_examples: parse_or("EXPCAT_MAX_EXAMPLES", get("EXPCAT_MAX_EXAMPLES"), defaults.training.max_examples)?,
        };
        if !(training.test_ratio > 0.0 && training.test_ratio < 1.0) {
            return Err(ExpcatError::invalid_input(format!(
                "EXPCAT_TEST_RATIO must be in (0, 1), got {}",
                training.test_ratio
            )));
        }
        if training.max_examples == 0 {
            return Err(ExpcatError::invalid_input(
                "EXPCAT_MAX_EXAMPLES must be at least 1".to_string(),
            ));
        }

        let artifact_aliases = match get("EXPCAT_ARTIFACT_ALIASES") {
            Some(v) => parse_aliases(&v)?,
            None => BTreeMap::new(),
        };

        let max_retries = parse_or(
            "EXPCAT_STORE_MAX_RETRIES",
            get("EXPCAT_STORE_MAX_RETRIES"),
            defaults.store_retry.max_retries,
        )?;

        Ok(Self {
            bind_addr: parse_or("EXPCAT_BIND_ADDR", get("EXPCAT_BIND_ADDR"), defaults.bind_addr)?,
            backup_bucket,
            models_bucket,
            training,
            artifact_aliases,
            store_retry: defaults.store_retry.with_max_retries(max_retries),
        })
    }
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> Result<T, ExpcatError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| ExpcatError::invalid_input(format!("{name}={v:?}: {e}"))),
    }
}

/// `tenant=alias` pairs separated by commas.
fn parse_aliases(raw: &str) -> Result<BTreeMap<TenantId, String>, ExpcatError> {
    let mut aliases = BTreeMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((tenant, alias)) = pair.split_once('=') else {
            return Err(ExpcatError::invalid_input(format!(
                "EXPCAT_ARTIFACT_ALIASES: expected tenant=alias, got {pair:?}"
            )));
        };
        let tenant = TenantId::new(tenant.trim())?;
        // Aliases become key segments, so they follow tenant id rules.
        let alias = TenantId::new(alias.trim())?;
        aliases.insert(tenant, alias.as_str().to_string());
    }
    Ok(aliases)
}
