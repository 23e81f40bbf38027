//! Service provider configuration.
//!
//! Loaded from environment variables, optionally seeded from a `.env` file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8090;

/// Startup configuration for the service provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpConfig {
    /// Directory holding one IDP `EntityDescriptor` per file.
    pub metadata_dir: PathBuf,

    /// The SP's own entityId, used as `Issuer` on outgoing requests.
    pub issuer: String,

    /// PKCS#8 RSA private key used to decrypt assertions (DER or PEM).
    pub private_key_path: Option<PathBuf>,

    /// `AssertionConsumerServiceURL` placed in AuthnRequests.
    pub acs_url: Option<String>,

    /// Accept RSA-SHA1 signatures and SHA-1 digests.
    pub allow_sha1: bool,

    /// Host the HTTP carrier binds to.
    pub host: String,

    /// Port the HTTP carrier binds to.
    pub port: u16,

    /// Log filter.
    pub log_level: String,
}

impl SpConfig {
    /// Creates a configuration with defaults for everything but the
    /// required values.
    pub fn new(metadata_dir: impl Into<PathBuf>, issuer: impl Into<String>) -> Self {
        Self {
            metadata_dir: metadata_dir.into(),
            issuer: issuer.into(),
            private_key_path: None,
            acs_url: None,
            allow_sha1: false,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
        }
    }

    /// Sets the decryption key path.
    #[must_use]
    pub fn with_private_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key_path = Some(path.into());
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`SpConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let metadata_dir = var("SAML_METADATA_DIR")
            .ok_or_else(|| Error::Config("SAML_METADATA_DIR is required".to_string()))?;
        let issuer = var("SAML_ISSUER")
            .ok_or_else(|| Error::Config("SAML_ISSUER is required".to_string()))?;

        let allow_sha1 = match var("SAML_ALLOW_SHA1") {
            None => false,
            Some(v) => parse_bool(&v).ok_or_else(|| {
                Error::Config(format!("SAML_ALLOW_SHA1 must be true or false, got {v}"))
            })?,
        };

        let port = match var("SAML_PORT") {
            None => DEFAULT_PORT,
            Some(v) => v
                .parse()
                .map_err(|_| Error::Config(format!("SAML_PORT is not a port number: {v}")))?,
        };

        Ok(Self {
            metadata_dir: PathBuf::from(metadata_dir),
            issuer,
            private_key_path: var("SAML_PRIVATE_KEY").map(PathBuf::from),
            acs_url: var("SAML_ACS_URL"),
            allow_sha1,
            host: var("SAML_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            log_level: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Reads the configured private key file, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a key path is configured but unreadable.
    pub fn read_private_key(&self) -> Result<Option<Vec<u8>>> {
        let Some(path) = &self.private_key_path else {
            return Ok(None);
        };
        read_file(path).map(Some)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
