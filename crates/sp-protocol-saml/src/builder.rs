//! AuthnRequest and LogoutRequest generation for the redirect binding.

use sp_crypto::random_hex;
use uuid::Uuid;

use crate::bindings::HttpRedirectBinding;
use crate::error::{SamlError, SamlResult};
use crate::metadata::MetadataStore;
use crate::types::{
    AuthnContextClass, AuthnRequest, LogoutRequest, NameId, NameIdPolicy, RequestedAuthnContext,
    ServiceProviderIdentity,
};

/// Prefix of generated request IDs.
pub const REQUEST_ID_PREFIX: &str = "ENT_";

/// RelayState sent with logout requests.
///
/// Kept as a fixed literal for compatibility with existing IdP
/// configurations; authentication requests use a random value.
pub const LOGOUT_RELAY_STATE: &str = "NULL";

/// Returns a fresh request ID: the prefix and 32 hex characters from the
/// system CSPRNG.
#[must_use]
pub fn new_request_id() -> String {
    format!("{REQUEST_ID_PREFIX}{}", random_hex(16))
}

/// A request encoded into a redirect URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRequest {
    /// Full URL: endpoint, `SAMLRequest` and `RelayState`.
    pub url: String,
    /// ID of the embedded request.
    pub id: String,
    /// RelayState sent along.
    pub relay_state: String,
}

/// Builds outgoing requests for the IdPs in a [`MetadataStore`].
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    metadata: &'a MetadataStore,
    sp: &'a ServiceProviderIdentity,
}

impl<'a> RequestBuilder<'a> {
    /// Creates a builder.
    #[must_use]
    pub const fn new(metadata: &'a MetadataStore, sp: &'a ServiceProviderIdentity) -> Self {
        Self { metadata, sp }
    }

    /// Builds the AuthnRequest that would be sent to `idp`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::UnknownIdp`] if `idp` is not loaded or has no
    /// redirect SSO endpoint.
    pub fn authn_request(&self, idp: &str) -> SamlResult<AuthnRequest> {
        let endpoint = self.sso_endpoint(idp)?;
        let mut request = AuthnRequest::new(new_request_id(), self.sp.issuer())
            .with_destination(endpoint)
            .with_name_id_policy(NameIdPolicy::transient())
            .with_authn_context(RequestedAuthnContext::exact(
                AuthnContextClass::PasswordProtectedTransport,
            ));
        if let Some(acs) = self.sp.acs_url() {
            request = request.with_acs_url(acs);
        }
        Ok(request)
    }

    /// Generates an AuthnRequest for `idp` and encodes it onto the IdP's SSO
    /// redirect endpoint with a random RelayState.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::UnknownIdp`] if `idp` is not loaded or has no
    /// redirect SSO endpoint.
    pub fn generate_authn_request(&self, idp: &str) -> SamlResult<RedirectRequest> {
        let request = self.authn_request(idp)?;
        let xml = request.to_xml();
        tracing::debug!(idp, id = %request.id, xml = %xml, "generated AuthnRequest");

        let relay_state = Uuid::new_v4().to_string();
        let destination = self.sso_endpoint(idp)?;
        let url = HttpRedirectBinding::encode_request(&xml, destination, Some(&relay_state))?;
        Ok(RedirectRequest {
            url,
            id: request.id,
            relay_state,
        })
    }

    /// Builds the LogoutRequest that would be sent to `idp`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::UnknownIdp`] if `idp` is not loaded or has no
    /// redirect SLO endpoint.
    pub fn logout_request(
        &self,
        name_id: &str,
        session_index: Option<&str>,
        idp: &str,
    ) -> SamlResult<LogoutRequest> {
        let endpoint = self.slo_endpoint(idp)?;
        let mut request = LogoutRequest::new(
            new_request_id(),
            self.sp.issuer(),
            NameId::entity(name_id),
        )
        .with_destination(endpoint);
        if let Some(index) = session_index {
            request = request.with_session_index(index);
        }
        Ok(request)
    }

    /// Generates a LogoutRequest for `name_id` and encodes it onto the IdP's
    /// SLO redirect endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::UnknownIdp`] if `idp` is not loaded or has no
    /// redirect SLO endpoint.
    pub fn generate_logout_request(
        &self,
        name_id: &str,
        session_index: Option<&str>,
        idp: &str,
    ) -> SamlResult<RedirectRequest> {
        let request = self.logout_request(name_id, session_index, idp)?;
        let xml = request.to_xml();
        tracing::debug!(idp, id = %request.id, xml = %xml, "generated LogoutRequest");

        let destination = self.slo_endpoint(idp)?;
        let url = HttpRedirectBinding::encode_request(&xml, destination, Some(LOGOUT_RELAY_STATE))?;
        Ok(RedirectRequest {
            url,
            id: request.id,
            relay_state: LOGOUT_RELAY_STATE.to_string(),
        })
    }

    fn sso_endpoint(&self, idp: &str) -> SamlResult<&'a str> {
        self.metadata
            .lookup(idp)?
            .sso_redirect_endpoint
            .as_deref()
            .ok_or_else(|| SamlError::UnknownIdp(format!("{idp} has no SSO redirect endpoint")))
    }

    fn slo_endpoint(&self, idp: &str) -> SamlResult<&'a str> {
        self.metadata
            .lookup(idp)?
            .slo_redirect_endpoint
            .as_deref()
            .ok_or_else(|| SamlError::UnknownIdp(format!("{idp} has no SLO redirect endpoint")))
    }
}
