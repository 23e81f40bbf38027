//! Startup loading: metadata and key problems keep the service down.

use sp_protocol_saml::SamlError;
use sp_server::{Dispatcher, Server};

use crate::common::{fixture_path, idp_metadata, Fixture};

fn startup_error(fixture: &Fixture) -> SamlError {
    Dispatcher::from_config(&fixture.config).unwrap_err()
}

/// Both IdPs load; subdirectories in the metadata directory are ignored.
#[test]
fn test_loads_metadata_directory() {
    let fixture = Fixture::new();
    std::fs::create_dir(fixture.dir.path().join("archive")).unwrap();

    let dispatcher = fixture.dispatcher();
    let mut ids: Vec<&str> = dispatcher.metadata().entity_ids().collect();
    ids.sort_unstable();
    assert_eq!(ids, ["idp-a", "idp-b"]);
}

/// The key may be given as DER as well as PEM.
#[test]
fn test_der_private_key() {
    let mut fixture = Fixture::new();
    fixture.config.private_key_path = Some(fixture_path("sp-key.pk8"));
    assert!(Server::new(fixture.config.clone()).is_ok());
}

/// An unparsable metadata file fails the whole load.
#[test]
fn test_bad_metadata_file() {
    let fixture = Fixture::new();
    fixture.write("broken.xml", "<md:EntityDescriptor");
    assert!(matches!(startup_error(&fixture), SamlError::Config(_)));
    assert!(Server::new(fixture.config.clone()).is_err());
}

/// Metadata without an IdP role is refused.
#[test]
fn test_metadata_without_idp_role() {
    let fixture = Fixture::new();
    fixture.write(
        "sp.xml",
        r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="sp-only"><md:SPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol"/></md:EntityDescriptor>"#,
    );
    assert!(matches!(startup_error(&fixture), SamlError::Config(_)));
}

/// Two files describing the same entity are refused.
#[test]
fn test_duplicate_entity() {
    let fixture = Fixture::new();
    fixture.write(
        "idp-a-copy.xml",
        &idp_metadata("idp-a", "idp-b-cert.pem", "elsewhere.example"),
    );
    assert!(matches!(startup_error(&fixture), SamlError::Config(_)));
}

/// A configured key that is missing or not a key is fatal.
#[test]
fn test_bad_private_key() {
    let mut fixture = Fixture::new();
    fixture.config.private_key_path = Some(fixture.dir.path().join("missing.pem"));
    assert!(matches!(startup_error(&fixture), SamlError::Config(_)));

    fixture.config.private_key_path = Some(fixture_path("idp-a-cert.pem"));
    assert!(matches!(startup_error(&fixture), SamlError::Config(_)));
}

/// A missing metadata directory is fatal.
#[test]
fn test_missing_metadata_directory() {
    let mut fixture = Fixture::new();
    fixture.config.metadata_dir = fixture.dir.path().join("nowhere");
    assert!(matches!(startup_error(&fixture), SamlError::Config(_)));
}
