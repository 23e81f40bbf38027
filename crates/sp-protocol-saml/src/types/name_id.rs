//! Name identifier types.

use super::{NameIdFormat, SAMLP_NS, SAML_NS};
use crate::xml::Element;

/// SAML Name ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameId {
    /// The identifier value.
    pub value: String,

    /// The format of the name identifier.
    pub format: Option<NameIdFormat>,

    /// The security or administrative domain that qualifies the name.
    pub name_qualifier: Option<String>,

    /// The service provider's entity ID that qualifies the name.
    pub sp_name_qualifier: Option<String>,
}

impl NameId {
    /// Creates a name ID with no format.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: None,
            name_qualifier: None,
            sp_name_qualifier: None,
        }
    }

    /// Creates an entity-format name ID.
    #[must_use]
    pub fn entity(value: impl Into<String>) -> Self {
        Self::new(value).with_format(NameIdFormat::Entity)
    }

    /// Sets the format.
    #[must_use]
    pub const fn with_format(mut self, format: NameIdFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Builds the `saml:NameID` element.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut el = Element::new("saml", "NameID", SAML_NS);
        if let Some(format) = self.format {
            el.set_attr("Format", format.uri());
        }
        if let Some(q) = &self.name_qualifier {
            el.set_attr("NameQualifier", q.as_str());
        }
        if let Some(q) = &self.sp_name_qualifier {
            el.set_attr("SPNameQualifier", q.as_str());
        }
        el.with_text(self.value.as_str())
    }
}

/// Name ID policy of an AuthnRequest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameIdPolicy {
    /// Requested name ID format.
    pub format: NameIdFormat,

    /// Whether the IdP may create a new identifier.
    pub allow_create: bool,
}

impl NameIdPolicy {
    /// Transient identifiers, creation allowed.
    #[must_use]
    pub const fn transient() -> Self {
        Self {
            format: NameIdFormat::Transient,
            allow_create: true,
        }
    }

    /// Builds the `samlp:NameIDPolicy` element.
    #[must_use]
    pub fn to_element(&self) -> Element {
        Element::new("samlp", "NameIDPolicy", SAMLP_NS)
            .with_attr("Format", self.format.uri())
            .with_attr("AllowCreate", self.allow_create.to_string())
    }
}
