//! SAML LogoutRequest.

use chrono::{DateTime, Utc};

use super::authn_request::parse_request_header;
use super::{format_instant, NameId, NameIdFormat, SAMLP_NS, SAML_NS, SAML_VERSION};
use crate::error::{SamlError, SamlResult};
use crate::xml::{self, Element};

/// SAML Logout Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the requester.
    pub issuer: String,

    /// The IdP's single logout endpoint.
    pub destination: Option<String>,

    /// The principal to log out.
    pub name_id: NameId,

    /// Session to terminate. Omitted from the message when absent.
    pub session_index: Option<String>,
}

impl LogoutRequest {
    /// Creates a logout request issued now.
    #[must_use]
    pub fn new(id: impl Into<String>, issuer: impl Into<String>, name_id: NameId) -> Self {
        Self {
            id: id.into(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            destination: None,
            name_id,
            session_index: None,
        }
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the session index.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_index = Some(index.into());
        self
    }

    /// Builds the `samlp:LogoutRequest` element.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut el = Element::new("samlp", "LogoutRequest", SAMLP_NS)
            .with_ns_decl("samlp", SAMLP_NS)
            .with_ns_decl("saml", SAML_NS)
            .with_attr("ID", self.id.as_str())
            .with_attr("Version", SAML_VERSION)
            .with_attr("IssueInstant", format_instant(self.issue_instant));
        if let Some(destination) = &self.destination {
            el.set_attr("Destination", destination.as_str());
        }

        el = el
            .with_child(Element::new("saml", "Issuer", SAML_NS).with_text(self.issuer.as_str()))
            .with_child(self.name_id.to_element());
        if let Some(index) = &self.session_index {
            el = el.with_child(
                Element::new("samlp", "SessionIndex", SAMLP_NS).with_text(index.as_str()),
            );
        }
        el
    }

    /// Serializes the request.
    #[must_use]
    pub fn to_xml(&self) -> String {
        self.to_element().to_xml()
    }

    /// Parses a serialized LogoutRequest.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlParse`] for malformed XML and
    /// [`SamlError::InvalidRequest`] if required parts are missing.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        let root = xml::parse(xml)?;
        if !root.is(SAMLP_NS, "LogoutRequest") {
            return Err(SamlError::InvalidRequest(format!(
                "expected samlp:LogoutRequest, found {}",
                root.qname()
            )));
        }
        let (id, issue_instant, issuer) = parse_request_header(&root)?;

        let name_id = root
            .child(SAML_NS, "NameID")
            .map(|n| NameId {
                value: n.text(),
                format: n.attr("Format").and_then(NameIdFormat::from_uri),
                name_qualifier: n.attr("NameQualifier").map(str::to_string),
                sp_name_qualifier: n.attr("SPNameQualifier").map(str::to_string),
            })
            .ok_or_else(|| SamlError::InvalidRequest("LogoutRequest has no NameID".to_string()))?;

        Ok(Self {
            id,
            issue_instant,
            issuer,
            destination: root.attr("Destination").map(str::to_string),
            name_id,
            session_index: root.child(SAMLP_NS, "SessionIndex").map(Element::text),
        })
    }
}
