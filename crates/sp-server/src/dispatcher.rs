//! Action dispatch.
//!
//! Each call carries one named action and its inputs. The dispatcher checks
//! that the inputs the action needs are present, runs it, and shapes the
//! outcome into a [`Reply`]. Errors never escape as anything but a reply.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sp_core::SpConfig;
use sp_protocol_saml::{
    MetadataStore, RequestBuilder, ResponseValidator, SamlError, SamlResult,
    ServiceProviderIdentity, SignaturePolicy,
};

/// The five supported actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Build an AuthnRequest redirect URL.
    GenerateAuthnRequest,
    /// Verify a response signature.
    ValidateSignature,
    /// Decrypt the encrypted assertion of a response.
    DecryptAssertion,
    /// Verify, then decrypt when valid.
    ValidateSignatureDecrypt,
    /// Build a LogoutRequest redirect URL.
    GenerateSloRequest,
}

impl Action {
    /// Parses the wire name of an action.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "generate-authn-request" => Some(Self::GenerateAuthnRequest),
            "validate-signature" => Some(Self::ValidateSignature),
            "decrypt-assertion" => Some(Self::DecryptAssertion),
            "validate-signature-decrypt" => Some(Self::ValidateSignatureDecrypt),
            "generate-slo-request" => Some(Self::GenerateSloRequest),
            _ => None,
        }
    }

    /// The wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GenerateAuthnRequest => "generate-authn-request",
            Self::ValidateSignature => "validate-signature",
            Self::DecryptAssertion => "decrypt-assertion",
            Self::ValidateSignatureDecrypt => "validate-signature-decrypt",
            Self::GenerateSloRequest => "generate-slo-request",
        }
    }

    const fn needs_response(self) -> bool {
        matches!(
            self,
            Self::ValidateSignature | Self::DecryptAssertion | Self::ValidateSignatureDecrypt
        )
    }
}

/// An incoming action message.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ActionRequest {
    /// Action name.
    #[serde(default)]
    pub action: Option<String>,

    /// SAML Response XML.
    #[serde(default)]
    pub response: Option<String>,

    /// Target IdP entityId.
    #[serde(default, rename = "IDP")]
    pub idp: Option<String>,

    /// Session index for logout.
    #[serde(default, rename = "SessionIndex")]
    pub session_index: Option<String>,

    /// Name ID for logout.
    #[serde(default, rename = "NameID")]
    pub name_id: Option<String>,
}

impl ActionRequest {
    /// Creates a message for `action` with no inputs.
    #[must_use]
    pub fn new(action: &str) -> Self {
        Self {
            action: Some(action.to_string()),
            ..Self::default()
        }
    }

    /// Sets the response XML.
    #[must_use]
    pub fn with_response(mut self, xml: impl Into<String>) -> Self {
        self.response = Some(xml.into());
        self
    }

    /// Sets the target IdP.
    #[must_use]
    pub fn with_idp(mut self, idp: impl Into<String>) -> Self {
        self.idp = Some(idp.into());
        self
    }

    /// Sets the logout subject.
    #[must_use]
    pub fn with_name_id(mut self, name_id: impl Into<String>) -> Self {
        self.name_id = Some(name_id.into());
        self
    }

    /// Sets the session index.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_index = Some(index.into());
        self
    }
}

/// Fields of a successful reply; only those the action produces are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutput {
    /// AuthnRequest redirect URL.
    #[serde(
        rename = "authn-request",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub authn_request: Option<String>,

    /// Signature verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,

    /// Decrypted assertion XML.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion: Option<String>,

    /// LogoutRequest redirect URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slo: Option<String>,
}

/// Reply to an action message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Reply {
    /// The action succeeded.
    Ok(ActionOutput),
    /// The action failed.
    Error {
        /// Machine-readable code.
        code: String,
        /// Human-readable message.
        message: String,
        /// HTTP status for carriers that use one.
        #[serde(skip)]
        http_status: u16,
    },
}

impl Reply {
    /// Builds an error reply from a protocol error.
    #[must_use]
    pub fn from_error(err: &SamlError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
            http_status: err.http_status(),
        }
    }

    /// Reply for a failure outside the protocol layer.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Error {
            code: "internal_error".to_string(),
            message: message.into(),
            http_status: 500,
        }
    }

    /// HTTP status for this reply.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Ok(_) => 200,
            Self::Error { http_status, .. } => *http_status,
        }
    }

    /// The error code, if this is an error reply.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Error { code, .. } => Some(code),
        }
    }
}

/// Routes action messages to the protocol components.
///
/// Immutable after construction; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    metadata: Arc<MetadataStore>,
    sp: ServiceProviderIdentity,
    validator: ResponseValidator,
}

impl Dispatcher {
    /// Creates a dispatcher over loaded metadata and SP identity.
    #[must_use]
    pub fn new(
        metadata: Arc<MetadataStore>,
        sp: ServiceProviderIdentity,
        policy: SignaturePolicy,
    ) -> Self {
        let validator = ResponseValidator::new(Arc::clone(&metadata), sp.clone(), policy);
        Self {
            metadata,
            sp,
            validator,
        }
    }

    /// Loads metadata and the SP key named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if any metadata file or the key is
    /// unusable. The dispatcher must not be started in that case.
    pub fn from_config(config: &SpConfig) -> SamlResult<Self> {
        let metadata = MetadataStore::load(&config.metadata_dir)?;
        let sp = ServiceProviderIdentity::from_config(config)?;
        let policy = SignaturePolicy {
            allow_sha1: config.allow_sha1,
        };
        tracing::info!(
            idps = metadata.len(),
            issuer = sp.issuer(),
            decryption = sp.decryption_key().is_some(),
            allow_sha1 = policy.allow_sha1,
            "dispatcher ready"
        );
        Ok(Self::new(Arc::new(metadata), sp, policy))
    }

    /// The loaded metadata.
    #[must_use]
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Runs one action and returns its reply.
    pub fn dispatch(&self, request: &ActionRequest) -> Reply {
        match self.run(request) {
            Ok(output) => Reply::Ok(output),
            Err(err) => {
                tracing::warn!(
                    action = request.action.as_deref().unwrap_or(""),
                    code = err.code(),
                    error = %err,
                    "action failed"
                );
                Reply::from_error(&err)
            }
        }
    }

    fn run(&self, request: &ActionRequest) -> SamlResult<ActionOutput> {
        let name = request
            .action
            .as_deref()
            .ok_or_else(|| SamlError::InvalidRequest("action is required".to_string()))?;
        let action =
            Action::parse(name).ok_or_else(|| SamlError::UnsupportedAction(name.to_string()))?;
        tracing::debug!(action = action.as_str(), "dispatching");

        let response = if action.needs_response() {
            Some(required(request.response.as_deref(), "response")?)
        } else {
            None
        };

        match (action, response) {
            (Action::GenerateAuthnRequest, _) => {
                let idp = required(request.idp.as_deref(), "IDP")?;
                let redirect = self.builder().generate_authn_request(idp)?;
                Ok(ActionOutput {
                    authn_request: Some(redirect.url),
                    ..ActionOutput::default()
                })
            }
            (Action::GenerateSloRequest, _) => {
                let idp = required(request.idp.as_deref(), "IDP")?;
                let name_id = required(request.name_id.as_deref(), "NameID")?;
                let redirect = self.builder().generate_logout_request(
                    name_id,
                    request.session_index.as_deref().filter(|s| !s.is_empty()),
                    idp,
                )?;
                Ok(ActionOutput {
                    slo: Some(redirect.url),
                    ..ActionOutput::default()
                })
            }
            (Action::ValidateSignature, Some(xml)) => {
                let verdict = self.validator.validate_signature(xml)?;
                Ok(ActionOutput {
                    valid: Some(verdict.is_valid()),
                    ..ActionOutput::default()
                })
            }
            (Action::DecryptAssertion, Some(xml)) => Ok(ActionOutput {
                assertion: Some(self.validator.decrypt(xml)?),
                ..ActionOutput::default()
            }),
            (Action::ValidateSignatureDecrypt, Some(xml)) => {
                let outcome = self.validator.validate_and_decrypt(xml)?;
                Ok(ActionOutput {
                    valid: Some(outcome.verdict.is_valid()),
                    assertion: outcome.assertion,
                    ..ActionOutput::default()
                })
            }
            (_, None) => Err(SamlError::InvalidRequest("response is required".to_string())),
        }
    }

    fn builder(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(&self.metadata, &self.sp)
    }
}

fn required<'r>(value: Option<&'r str>, field: &str) -> SamlResult<&'r str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SamlError::InvalidRequest(format!("{field} is required")))
}
