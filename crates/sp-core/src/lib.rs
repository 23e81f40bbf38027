//! # sp-core
//!
//! Configuration and error handling shared by the SAML service provider
//! crates.
//!
//! Configuration is read once at startup. Any error here is fatal: the
//! service must not start half-initialised.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;

pub use config::SpConfig;
pub use error::{Error, Result};
