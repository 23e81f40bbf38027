//! Response signature validation.

use sp_protocol_saml::types::signature_algorithms;
use sp_server::ActionRequest;

use crate::common::{
    error_code, fixture_path, is_valid, response, Fixture, Signer, Wrapping, ASSERTION,
};

fn validate(xml: &str) -> ActionRequest {
    ActionRequest::new("validate-signature").with_response(xml)
}

/// A Response signed at the top level by its issuer verifies.
#[test]
fn test_response_signature_valid() {
    let dispatcher = Fixture::new().dispatcher();
    let signed = Signer::idp_a().sign(&response("idp-a", ASSERTION), "r1");
    assert!(is_valid(&dispatcher, &signed));
}

/// Without a Response signature, the first Assertion's signature is used,
/// and the issuer may come from the Response.
#[test]
fn test_assertion_signature_valid() {
    let dispatcher = Fixture::new().dispatcher();
    let xml = response("idp-a", &Signer::idp_a().sign(ASSERTION, "a1"));
    assert!(is_valid(&dispatcher, &xml));
}

/// Changing any character of signed text content gives `valid=false`, never
/// an error.
#[test]
fn test_tampering_is_negative_result() {
    let dispatcher = Fixture::new().dispatcher();
    let signed = Signer::idp_a().sign(&response("idp-a", ASSERTION), "r1");

    let targets = ["user@example.org", "user-42", "2024-01-01T00:00:00.000Z"];
    for target in targets {
        let start = signed.find(target).unwrap();
        for offset in 0..target.len() {
            let mut bytes = signed.clone().into_bytes();
            let at = start + offset;
            bytes[at] = if bytes[at] == b'x' { b'y' } else { b'x' };
            let tampered = String::from_utf8(bytes).unwrap();
            assert!(
                !is_valid(&dispatcher, &tampered),
                "tampering {target} at {offset} still verified"
            );
        }
    }
}

/// Tampering with the encrypted payload of a signed Response is detected
/// without decrypting anything.
#[test]
fn test_tampered_ciphertext_is_negative_result() {
    let dispatcher = Fixture::without_key().dispatcher();
    let inner = Wrapping::OaepAes128Cbc.encrypt_into("EncryptedAssertion", ASSERTION);
    let signed = Signer::idp_a().sign(&response("idp-a", &inner), "r1");
    assert!(is_valid(&dispatcher, &signed));

    let marker = "<xenc:CipherValue>";
    let at = signed.rfind(marker).unwrap() + marker.len() + 4;
    let mut bytes = signed.into_bytes();
    bytes[at] = if bytes[at] == b'A' { b'B' } else { b'A' };
    assert!(!is_valid(&dispatcher, &String::from_utf8(bytes).unwrap()));
}

/// A well-signed Response from an issuer without metadata is an error.
#[test]
fn test_unknown_issuer() {
    let dispatcher = Fixture::new().dispatcher();
    let signed = Signer::idp_a().sign(&response("idp-z", ASSERTION), "r1");
    assert_eq!(error_code(&dispatcher, &validate(&signed)), "unknown_idp");
}

/// A signature by another IdP's key does not verify for this issuer.
#[test]
fn test_wrong_key_is_negative_result() {
    let dispatcher = Fixture::new().dispatcher();
    let signed = Signer::idp_b().sign(&response("idp-a", ASSERTION), "r1");
    assert!(!is_valid(&dispatcher, &signed));

    let signed = Signer::idp_b().sign(&response("idp-b", ASSERTION), "r1");
    assert!(is_valid(&dispatcher, &signed));
}

/// Unsigned responses.
#[test]
fn test_missing_signature() {
    let dispatcher = Fixture::new().dispatcher();
    assert_eq!(
        error_code(&dispatcher, &validate(&response("idp-a", ASSERTION))),
        "missing_signature"
    );
}

/// Without a Response signature, a signed assertion vouches only for itself,
/// so any second assertion next to it is refused, whichever comes first.
#[test]
fn test_unsigned_response_with_several_assertions() {
    let dispatcher = Fixture::new().dispatcher();
    let signed = Signer::idp_a().sign(ASSERTION, "a1");
    let other = ASSERTION
        .replace("ID=\"a1\"", "ID=\"a2\"")
        .replace("user-42", "admin");

    for inner in [format!("{signed}{other}"), format!("{other}{signed}")] {
        assert_eq!(
            error_code(&dispatcher, &validate(&response("idp-a", &inner))),
            "invalid_request"
        );
    }
}

/// A Response signed by an independent XML-DSig implementation: namespaces
/// declared on the Response only, an `InclusiveNamespaces` prefix list, an
/// `xsi:type` QName value and indentation whitespace.
#[test]
fn test_externally_signed_response() {
    let dispatcher = Fixture::new().dispatcher();
    let xml = std::fs::read_to_string(fixture_path("idp-a-response-prefixlist.xml")).unwrap();
    assert!(is_valid(&dispatcher, &xml));

    let tampered = xml.replacen("user@example.org", "user@example.orh", 1);
    assert_ne!(tampered, xml);
    assert!(!is_valid(&dispatcher, &tampered));
}

/// Two elements sharing the signed ID are refused outright.
#[test]
fn test_duplicate_ids_rejected() {
    let dispatcher = Fixture::new().dispatcher();
    let signed = Signer::idp_a().sign(ASSERTION, "a1");
    let xml = response("idp-a", &format!("{signed}{ASSERTION}"));
    assert_eq!(error_code(&dispatcher, &validate(&xml)), "xml_parse_error");
}

/// Signature profile violations are format errors, reported before the
/// issuer is looked up.
#[test]
fn test_profile_violations() {
    let dispatcher = Fixture::new().dispatcher();
    let signed = Signer::idp_a().sign(&response("idp-z", ASSERTION), "r1");

    let wrong_reference = signed.replace("URI=\"#r1\"", "URI=\"#a1\"");
    assert_eq!(
        error_code(&dispatcher, &validate(&wrong_reference)),
        "invalid_signature_format"
    );

    let extra_transform = signed.replace(
        "</ds:Transforms>",
        r#"<ds:Transform Algorithm="http://www.w3.org/TR/1999/REC-xpath-19991116"/></ds:Transforms>"#,
    );
    assert_eq!(
        error_code(&dispatcher, &validate(&extra_transform)),
        "invalid_signature_format"
    );

    let sha1 = signed.replace(signature_algorithms::RSA_SHA256, signature_algorithms::RSA_SHA1);
    assert_eq!(
        error_code(&dispatcher, &validate(&sha1)),
        "invalid_signature_format"
    );
}

/// With SHA-1 allowed the legacy method passes the profile check; this
/// signature was made with SHA-256, so it then fails to verify.
#[test]
fn test_sha1_policy() {
    let mut fixture = Fixture::new();
    fixture.config.allow_sha1 = true;
    let dispatcher = fixture.dispatcher();
    let signed = Signer::idp_a().sign(&response("idp-a", ASSERTION), "r1");
    let sha1 = signed.replace(signature_algorithms::RSA_SHA256, signature_algorithms::RSA_SHA1);
    assert!(!is_valid(&dispatcher, &sha1));
}

/// Inputs that are not a SAML Response.
#[test]
fn test_not_a_response() {
    let dispatcher = Fixture::new().dispatcher();
    assert_eq!(
        error_code(&dispatcher, &validate("not xml at all <")),
        "xml_parse_error"
    );
    assert_eq!(
        error_code(&dispatcher, &validate(&Signer::idp_a().sign(ASSERTION, "a1"))),
        "invalid_request"
    );
    assert_eq!(
        error_code(
            &dispatcher,
            &validate(r#"<!DOCTYPE r [<!ENTITY x "y">]><r>&x;</r>"#)
        ),
        "xml_parse_error"
    );
}

/// An empty response is refused before anything else happens.
#[test]
fn test_empty_response_is_invalid_request() {
    let dispatcher = Fixture::new().dispatcher();
    assert_eq!(error_code(&dispatcher, &validate("")), "invalid_request");
}
