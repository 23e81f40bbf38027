//! SAML 2.0 service provider core.
//!
//! - **Request generation** - AuthnRequest and LogoutRequest over the
//!   HTTP-Redirect binding
//! - **Response validation** - XML-DSig enveloped signatures checked against
//!   IdP metadata
//! - **Decryption** - XML-Enc encrypted assertions, identifiers and
//!   attributes under the SP private key
//!
//! # Architecture
//!
//! - [`metadata`] - IdP descriptors and signing trust anchors
//! - [`builder`] - Request generation
//! - [`response`] - Response signature validation
//! - [`encryption`] - Assertion decryption
//! - [`signature`] - Signature profile checks and verification
//! - [`xml`] - Namespace-aware DOM and exclusive canonicalization
//! - [`bindings`] - HTTP-Redirect encoding
//! - [`types`] - Protocol messages and constants
//! - [`error`] - Error taxonomy
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sp_protocol_saml::{MetadataStore, RequestBuilder, ResponseValidator, SignaturePolicy};
//!
//! let metadata = Arc::new(MetadataStore::load("/etc/saml/idps")?);
//! let sp = ServiceProviderIdentity::new("https://sp.example/saml")?;
//!
//! let redirect = RequestBuilder::new(&metadata, &sp).generate_authn_request("idp-a")?;
//! let validator = ResponseValidator::new(metadata, sp, SignaturePolicy::default());
//! let verdict = validator.validate_signature(&response_xml)?;
//! ```
//!
//! # Standards
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)
//! - [XML Encryption](https://www.w3.org/TR/xmlenc-core1/)
//! - [Exclusive XML Canonicalization](https://www.w3.org/TR/xml-exc-c14n/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod builder;
pub mod encryption;
pub mod error;
pub mod metadata;
pub mod response;
pub mod signature;
pub mod types;
pub mod xml;

#[cfg(test)]
mod test_support;

pub use builder::{RedirectRequest, RequestBuilder};
pub use encryption::AssertionDecryptor;
pub use error::{SamlError, SamlResult};
pub use metadata::{IdentityProviderDescriptor, MetadataStore, TrustAnchor};
pub use response::{ResponseValidator, SignatureVerdict, ValidatedResponse};
pub use signature::{SignaturePolicy, SignatureValidator, SignedObject};
pub use types::*;
