//! SAML bindings.
//!
//! Only the HTTP-Redirect binding is implemented: messages are deflated,
//! base64-encoded, and URL-encoded into a query parameter.

mod redirect;

pub use redirect::*;

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// Request message (AuthnRequest, LogoutRequest).
    Request,
    /// Response message.
    Response,
}

impl SamlMessageType {
    /// Returns the query parameter name for this message type.
    #[must_use]
    pub const fn query_param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}

/// Message recovered from a redirect URL.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// The inflated XML message.
    pub xml: String,
    /// Which parameter carried it.
    pub message_type: SamlMessageType,
    /// The RelayState if present.
    pub relay_state: Option<String>,
}
