//! Identity provider descriptors and their trust material.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sp_crypto::VerificationKey;

use crate::error::{SamlError, SamlResult};
use crate::types::{SamlBinding, MD_NS, SAMLP_NS, XMLDSIG_NS};
use crate::xml::{self, Element};

/// Intended use of a metadata key, from `KeyDescriptor/@use`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialUsage {
    /// `use="signing"`.
    Signing,
    /// `use="encryption"`.
    Encryption,
    /// No `use` attribute: valid for both.
    Unspecified,
}

impl CredentialUsage {
    fn parse(value: Option<&str>) -> SamlResult<Self> {
        match value {
            None => Ok(Self::Unspecified),
            Some("signing") => Ok(Self::Signing),
            Some("encryption") => Ok(Self::Encryption),
            Some(other) => Err(SamlError::Config(format!("unknown KeyDescriptor use {other}"))),
        }
    }

    /// Returns true if a key with this usage may verify signatures.
    #[must_use]
    pub const fn allows_signing(self) -> bool {
        matches!(self, Self::Signing | Self::Unspecified)
    }

    /// Returns true if a key with this usage may be used for encryption.
    #[must_use]
    pub const fn allows_encryption(self) -> bool {
        matches!(self, Self::Encryption | Self::Unspecified)
    }
}

/// A certificate key from metadata with its declared usage.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Declared usage.
    pub usage: CredentialUsage,
    /// Public key taken from the certificate.
    pub key: VerificationKey,
}

/// The keys a signature from one entity may be verified against.
///
/// Only keys from that entity's metadata are ever used. A `KeyInfo` carried
/// inside a signature is ignored.
#[derive(Debug, Clone)]
pub struct TrustAnchor {
    entity_id: String,
    credentials: Vec<Credential>,
}

impl TrustAnchor {
    /// Creates a trust anchor for `entity_id`.
    #[must_use]
    pub fn new(entity_id: impl Into<String>, credentials: Vec<Credential>) -> Self {
        Self {
            entity_id: entity_id.into(),
            credentials,
        }
    }

    /// The entity the keys belong to.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Keys usable for signature verification.
    pub fn signing_keys(&self) -> impl Iterator<Item = &VerificationKey> {
        self.credentials
            .iter()
            .filter(|c| c.usage.allows_signing())
            .map(|c| &c.key)
    }

    /// Keys usable for encryption towards this entity.
    pub fn encryption_keys(&self) -> impl Iterator<Item = &VerificationKey> {
        self.credentials
            .iter()
            .filter(|c| c.usage.allows_encryption())
            .map(|c| &c.key)
    }
}

/// One identity provider, as described by its metadata.
#[derive(Debug, Clone)]
pub struct IdentityProviderDescriptor {
    /// The IdP entityId.
    pub entity_id: String,
    /// Single sign-on endpoint for the HTTP-Redirect binding.
    pub sso_redirect_endpoint: Option<String>,
    /// Single logout endpoint for the HTTP-Redirect binding.
    pub slo_redirect_endpoint: Option<String>,
    /// Keys from the descriptor.
    pub trust: TrustAnchor,
}

impl IdentityProviderDescriptor {
    /// Parses an `md:EntityDescriptor` document holding an IDP role.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the document is not well-formed
    /// metadata, lacks a SAML 2.0 `IDPSSODescriptor`, or carries a
    /// certificate that cannot be parsed.
    pub fn from_xml(xml: &str) -> SamlResult<Self> {
        let root = xml::parse(xml).map_err(|e| SamlError::Config(e.to_string()))?;
        if !root.is(MD_NS, "EntityDescriptor") {
            return Err(SamlError::Config(format!(
                "expected md:EntityDescriptor, found {}",
                root.qname()
            )));
        }

        let entity_id = root
            .attr("entityID")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SamlError::Config("EntityDescriptor has no entityID".to_string()))?
            .to_string();

        let idp = root
            .children_named(MD_NS, "IDPSSODescriptor")
            .find(|d| supports_saml2(d))
            .ok_or_else(|| {
                SamlError::Config(format!("{entity_id}: no SAML 2.0 IDPSSODescriptor"))
            })?;

        let mut credentials = Vec::new();
        for key_descriptor in idp.children_named(MD_NS, "KeyDescriptor") {
            let usage = CredentialUsage::parse(key_descriptor.attr("use"))?;
            for cert in certificates(key_descriptor) {
                let der = STANDARD
                    .decode(strip_whitespace(&cert.text()))
                    .map_err(|e| SamlError::Config(format!("{entity_id}: certificate: {e}")))?;
                let key = VerificationKey::from_certificate_der(&der)
                    .map_err(|e| SamlError::Config(format!("{entity_id}: {e}")))?;
                credentials.push(Credential { usage, key });
            }
        }

        let descriptor = Self {
            sso_redirect_endpoint: redirect_location(idp, "SingleSignOnService"),
            slo_redirect_endpoint: redirect_location(idp, "SingleLogoutService"),
            trust: TrustAnchor::new(entity_id.clone(), credentials),
            entity_id,
        };

        if descriptor.trust.signing_keys().next().is_none() {
            tracing::warn!(
                entity_id = %descriptor.entity_id,
                "IdP metadata has no signing keys; its signatures will never verify"
            );
        }
        Ok(descriptor)
    }
}

fn supports_saml2(descriptor: &Element) -> bool {
    descriptor
        .attr("protocolSupportEnumeration")
        .is_some_and(|v| v.split_whitespace().any(|p| p == SAMLP_NS))
}

fn certificates(key_descriptor: &Element) -> impl Iterator<Item = &Element> {
    key_descriptor
        .children_named(XMLDSIG_NS, "KeyInfo")
        .flat_map(|ki| ki.children_named(XMLDSIG_NS, "X509Data"))
        .flat_map(|data| data.children_named(XMLDSIG_NS, "X509Certificate"))
}

// Last redirect-binding service listed wins.
fn redirect_location(idp: &Element, service: &str) -> Option<String> {
    idp.children_named(MD_NS, service)
        .filter(|s| s.attr("Binding") == Some(SamlBinding::HttpRedirect.uri()))
        .filter_map(|s| s.attr("Location"))
        .map(str::to_string)
        .last()
}

pub(crate) fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}
