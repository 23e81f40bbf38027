//! SAML 2.0 message types.
//!
//! Outgoing requests are plain values. Each serializes through a pure
//! `to_xml` function built on the crate's XML tree.

mod authn_request;
mod constants;
mod logout;
mod name_id;
mod service_provider;

pub use authn_request::*;
pub use constants::*;
pub use logout::*;
pub use name_id::*;
pub use service_provider::*;

use chrono::{DateTime, SecondsFormat, Utc};

/// Formats an `IssueInstant`: UTC, millisecond precision, `Z` suffix.
#[must_use]
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
