//! The service provider's own identity.

use std::fmt;
use std::sync::Arc;

use sp_core::SpConfig;
use sp_crypto::DecryptionKey;

use crate::error::{SamlError, SamlResult};

/// Issuer and optional decryption key, loaded once at startup and shared
/// read-only by request generation and decryption.
#[derive(Clone)]
pub struct ServiceProviderIdentity {
    issuer: String,
    acs_url: Option<String>,
    decryption_key: Option<Arc<DecryptionKey>>,
}

impl ServiceProviderIdentity {
    /// Creates an identity without a decryption key.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the issuer is blank.
    pub fn new(issuer: impl Into<String>) -> SamlResult<Self> {
        let issuer = issuer.into();
        if issuer.trim().is_empty() {
            return Err(SamlError::Config("SP issuer must not be blank".to_string()));
        }
        Ok(Self {
            issuer,
            acs_url: None,
            decryption_key: None,
        })
    }

    /// Sets the assertion consumer service URL.
    #[must_use]
    pub fn with_acs_url(mut self, url: impl Into<String>) -> Self {
        self.acs_url = Some(url.into());
        self
    }

    /// Sets the decryption key.
    #[must_use]
    pub fn with_decryption_key(mut self, key: DecryptionKey) -> Self {
        self.decryption_key = Some(Arc::new(key));
        self
    }

    /// Builds the identity from startup configuration, reading and decoding
    /// the private key if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the issuer is blank or the key file is
    /// unreadable or not an RSA private key.
    pub fn from_config(config: &SpConfig) -> SamlResult<Self> {
        let mut identity = Self::new(config.issuer.as_str())?;
        if let Some(url) = &config.acs_url {
            identity = identity.with_acs_url(url.as_str());
        }

        let key_bytes = config
            .read_private_key()
            .map_err(|e| SamlError::Config(e.to_string()))?;
        if let Some(bytes) = key_bytes {
            let key = DecryptionKey::from_bytes(&bytes)
                .map_err(|e| SamlError::Config(format!("SP private key: {e}")))?;
            tracing::info!(bits = key.bits(), "loaded SP decryption key");
            identity = identity.with_decryption_key(key);
        }
        Ok(identity)
    }

    /// The SP entityId.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The assertion consumer service URL, if configured.
    #[must_use]
    pub fn acs_url(&self) -> Option<&str> {
        self.acs_url.as_deref()
    }

    /// The decryption key, if configured.
    #[must_use]
    pub fn decryption_key(&self) -> Option<&DecryptionKey> {
        self.decryption_key.as_deref()
    }
}

impl fmt::Debug for ServiceProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProviderIdentity")
            .field("issuer", &self.issuer)
            .field("acs_url", &self.acs_url)
            .field("has_decryption_key", &self.decryption_key.is_some())
            .finish()
    }
}
