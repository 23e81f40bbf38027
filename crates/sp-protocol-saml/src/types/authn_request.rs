//! SAML AuthnRequest.
//!
//! Authentication request sent by this service provider to an identity
//! provider over the redirect binding.

use chrono::{DateTime, Utc};

use super::{
    format_instant, AuthnContextClass, NameIdFormat, NameIdPolicy, SamlBinding, SAMLP_NS,
    SAML_NS, SAML_VERSION,
};
use crate::error::{SamlError, SamlResult};
use crate::xml::{self, Element};

/// SAML Authentication Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the service provider issuing the request.
    pub issuer: String,

    /// The IdP endpoint this request is sent to.
    pub destination: Option<String>,

    /// The URL where the response should be sent.
    pub assertion_consumer_service_url: Option<String>,

    /// Binding the IdP should use for the response.
    pub protocol_binding: SamlBinding,

    /// Name ID policy constraints.
    pub name_id_policy: Option<NameIdPolicy>,

    /// Requested authentication context.
    pub requested_authn_context: Option<RequestedAuthnContext>,

    /// Whether the IdP must authenticate the user directly.
    pub force_authn: bool,

    /// Whether the IdP must not interact with the user.
    pub is_passive: bool,
}

impl AuthnRequest {
    /// Creates a request with the given ID, issued now, asking for the
    /// response over HTTP-POST.
    #[must_use]
    pub fn new(id: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            destination: None,
            assertion_consumer_service_url: None,
            protocol_binding: SamlBinding::HttpPost,
            name_id_policy: None,
            requested_authn_context: None,
            force_authn: false,
            is_passive: false,
        }
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the assertion consumer service URL.
    #[must_use]
    pub fn with_acs_url(mut self, url: impl Into<String>) -> Self {
        self.assertion_consumer_service_url = Some(url.into());
        self
    }

    /// Sets the name ID policy.
    #[must_use]
    pub fn with_name_id_policy(mut self, policy: NameIdPolicy) -> Self {
        self.name_id_policy = Some(policy);
        self
    }

    /// Sets the requested authentication context.
    #[must_use]
    pub fn with_authn_context(mut self, context: RequestedAuthnContext) -> Self {
        self.requested_authn_context = Some(context);
        self
    }

    /// Builds the `samlp:AuthnRequest` element.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut el = Element::new("samlp", "AuthnRequest", SAMLP_NS)
            .with_ns_decl("samlp", SAMLP_NS)
            .with_ns_decl("saml", SAML_NS)
            .with_attr("ID", self.id.as_str())
            .with_attr("Version", SAML_VERSION)
            .with_attr("IssueInstant", format_instant(self.issue_instant));
        if let Some(destination) = &self.destination {
            el.set_attr("Destination", destination.as_str());
        }
        el.set_attr("ForceAuthn", self.force_authn.to_string());
        el.set_attr("IsPassive", self.is_passive.to_string());
        el.set_attr("ProtocolBinding", self.protocol_binding.uri());
        if let Some(acs) = &self.assertion_consumer_service_url {
            el.set_attr("AssertionConsumerServiceURL", acs.as_str());
        }

        el = el.with_child(
            Element::new("saml", "Issuer", SAML_NS).with_text(self.issuer.as_str()),
        );
        if let Some(policy) = &self.name_id_policy {
            el = el.with_child(policy.to_element());
        }
        if let Some(context) = &self.requested_authn_context {
            el = el.with_child(context.to_element());
        }
        el
    }

    /// Serializes the request.
    #[must_use]
    pub fn to_xml(&self) -> String {
        self.to_element().to_xml()
    }

    /// Parses a serialized AuthnRequest.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlParse`] for malformed XML and
    /// [`SamlError::InvalidRequest`] if required parts are missing.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        let root = xml::parse(xml)?;
        if !root.is(SAMLP_NS, "AuthnRequest") {
            return Err(SamlError::InvalidRequest(format!(
                "expected samlp:AuthnRequest, found {}",
                root.qname()
            )));
        }
        let (id, issue_instant, issuer) = parse_request_header(&root)?;

        let name_id_policy = root.child(SAMLP_NS, "NameIDPolicy").map(|p| NameIdPolicy {
            format: p
                .attr("Format")
                .and_then(NameIdFormat::from_uri)
                .unwrap_or_default(),
            allow_create: p.attr("AllowCreate") == Some("true"),
        });

        let requested_authn_context = root
            .child(SAMLP_NS, "RequestedAuthnContext")
            .map(|c| RequestedAuthnContext {
                comparison: c
                    .attr("Comparison")
                    .and_then(AuthnContextComparison::parse)
                    .unwrap_or_default(),
                class_refs: c
                    .children_named(SAML_NS, "AuthnContextClassRef")
                    .map(|r| r.text().trim().to_string())
                    .collect(),
            });

        Ok(Self {
            id,
            issue_instant,
            issuer,
            destination: root.attr("Destination").map(str::to_string),
            assertion_consumer_service_url: root
                .attr("AssertionConsumerServiceURL")
                .map(str::to_string),
            protocol_binding: root
                .attr("ProtocolBinding")
                .and_then(SamlBinding::from_uri)
                .unwrap_or(SamlBinding::HttpPost),
            name_id_policy,
            requested_authn_context,
            force_authn: root.attr("ForceAuthn") == Some("true"),
            is_passive: root.attr("IsPassive") == Some("true"),
        })
    }
}

/// Reads `ID`, `IssueInstant` and `Issuer` common to request messages.
pub(crate) fn parse_request_header(root: &Element) -> SamlResult<(String, DateTime<Utc>, String)> {
    let id = root
        .attr("ID")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SamlError::InvalidRequest("request has no ID".to_string()))?
        .to_string();
    if root.attr("Version") != Some(SAML_VERSION) {
        return Err(SamlError::InvalidRequest("request Version is not 2.0".to_string()));
    }
    let issue_instant = root
        .attr("IssueInstant")
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .ok_or_else(|| SamlError::InvalidRequest("request has no valid IssueInstant".to_string()))?
        .with_timezone(&Utc);
    let issuer = root
        .child(SAML_NS, "Issuer")
        .map(|i| i.text().trim().to_string())
        .filter(|i| !i.is_empty())
        .ok_or_else(|| SamlError::InvalidRequest("request has no Issuer".to_string()))?;
    Ok((id, issue_instant, issuer))
}

/// Requested authentication context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedAuthnContext {
    /// Comparison method for the authentication context.
    pub comparison: AuthnContextComparison,

    /// Acceptable authentication context class references.
    pub class_refs: Vec<String>,
}

impl RequestedAuthnContext {
    /// Creates a context requiring exact match of a class reference.
    #[must_use]
    pub fn exact(class: AuthnContextClass) -> Self {
        Self {
            comparison: AuthnContextComparison::Exact,
            class_refs: vec![class.uri().to_string()],
        }
    }

    /// Builds the `samlp:RequestedAuthnContext` element.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut el = Element::new("samlp", "RequestedAuthnContext", SAMLP_NS)
            .with_attr("Comparison", self.comparison.as_str());
        for class_ref in &self.class_refs {
            el = el.with_child(
                Element::new("saml", "AuthnContextClassRef", SAML_NS).with_text(class_ref.as_str()),
            );
        }
        el
    }
}

/// Authentication context comparison method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthnContextComparison {
    /// Exact match required.
    #[default]
    Exact,
    /// At least as strong as specified.
    Minimum,
    /// At most as strong as specified.
    Maximum,
    /// Stronger than specified.
    Better,
}

impl AuthnContextComparison {
    /// Returns the attribute value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Better => "better",
        }
    }

    /// Parses an attribute value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "exact" => Some(Self::Exact),
            "minimum" => Some(Self::Minimum),
            "maximum" => Some(Self::Maximum),
            "better" => Some(Self::Better),
            _ => None,
        }
    }
}
