//! AuthnRequest and LogoutRequest generation.

use std::collections::HashSet;

use sp_protocol_saml::bindings::{HttpRedirectBinding, SamlMessageType};
use sp_protocol_saml::{AuthnRequest, LogoutRequest, NameIdFormat, SAMLP_NS};
use sp_server::ActionRequest;

use crate::common::{error_code, ok, Fixture, SP_ISSUER};

fn is_request_id(id: &str) -> bool {
    id.strip_prefix("ENT_").is_some_and(|hex| {
        hex.len() == 32 && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    })
}

/// Every generated AuthnRequest decodes to a request with a fresh,
/// well-formed ID and the configured issuer.
#[test]
fn test_authn_requests_decode() {
    let fixture = Fixture::new();
    let dispatcher = fixture.dispatcher();
    let mut ids = HashSet::new();
    let mut relay_states = HashSet::new();

    for _ in 0..25 {
        let url = ok(
            &dispatcher,
            &ActionRequest::new("generate-authn-request").with_idp("idp-a"),
        )
        .authn_request
        .unwrap();
        assert!(url.starts_with("https://idp.example/sso?SAMLRequest="));

        let decoded = HttpRedirectBinding::decode_url(&url).unwrap();
        assert_eq!(decoded.message_type, SamlMessageType::Request);
        let request = AuthnRequest::parse(&decoded.xml).unwrap();

        assert!(is_request_id(&request.id), "bad id {}", request.id);
        assert_eq!(request.issuer, SP_ISSUER);
        assert_eq!(request.destination.as_deref(), Some("https://idp.example/sso"));
        let policy = request.name_id_policy.unwrap();
        assert_eq!(policy.format, NameIdFormat::Transient);
        assert!(policy.allow_create);

        assert!(ids.insert(request.id));
        assert!(relay_states.insert(decoded.relay_state.unwrap()));
    }
}

/// The request goes to the IdP named in the action.
#[test]
fn test_authn_request_per_idp() {
    let dispatcher = Fixture::new().dispatcher();
    let url = ok(
        &dispatcher,
        &ActionRequest::new("generate-authn-request").with_idp("idp-b"),
    )
    .authn_request
    .unwrap();
    assert!(url.starts_with("https://idp-b.example/sso?SAMLRequest="));
}

/// The AssertionConsumerServiceURL is included when configured.
#[test]
fn test_authn_request_acs_url() {
    let mut fixture = Fixture::new();
    fixture.config.acs_url = Some("https://sp.example/acs".to_string());
    let url = ok(
        &fixture.dispatcher(),
        &ActionRequest::new("generate-authn-request").with_idp("idp-a"),
    )
    .authn_request
    .unwrap();
    let request = AuthnRequest::parse(&HttpRedirectBinding::decode_url(&url).unwrap().xml).unwrap();
    assert_eq!(
        request.assertion_consumer_service_url.as_deref(),
        Some("https://sp.example/acs")
    );
}

/// Encoding and decoding reproduce the original bytes exactly.
#[test]
fn test_redirect_encoding_round_trip() {
    let xml = format!(
        r#"<samlp:AuthnRequest xmlns:samlp="{SAMLP_NS}" ID="ENT_0123456789abcdef0123456789abcdef" Version="2.0" IssueInstant="2024-01-01T00:00:00.000Z">
  <saml:Issuer xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion">{SP_ISSUER}</saml:Issuer>
</samlp:AuthnRequest>"#
    );
    let encoded = HttpRedirectBinding::encode_message(xml.as_bytes()).unwrap();
    assert!(!encoded.contains('\n'));
    assert_eq!(
        HttpRedirectBinding::decode_message(&encoded).unwrap(),
        xml.as_bytes()
    );

    let url = HttpRedirectBinding::encode_request(&xml, "https://idp.example/sso", Some("state 1"))
        .unwrap();
    let decoded = HttpRedirectBinding::decode_url(&url).unwrap();
    assert_eq!(decoded.xml, xml);
    assert_eq!(decoded.relay_state.as_deref(), Some("state 1"));
}

/// The logout scenario: NameID, SessionIndex and the SLO endpoint of the
/// named IdP, with the literal RelayState.
#[test]
fn test_slo_request() {
    let dispatcher = Fixture::new().dispatcher();
    let url = ok(
        &dispatcher,
        &ActionRequest::new("generate-slo-request")
            .with_name_id("user-42")
            .with_session_index("sess-7")
            .with_idp("idp-a"),
    )
    .slo
    .unwrap();

    assert!(url.starts_with("https://idp.example/slo?SAMLRequest="));
    assert!(url.ends_with("&RelayState=NULL"));

    let decoded = HttpRedirectBinding::decode_url(&url).unwrap();
    let request = LogoutRequest::parse(&decoded.xml).unwrap();
    assert!(is_request_id(&request.id));
    assert_eq!(request.issuer, SP_ISSUER);
    assert_eq!(request.name_id.value, "user-42");
    assert_eq!(request.name_id.format, Some(NameIdFormat::Entity));
    assert_eq!(request.session_index.as_deref(), Some("sess-7"));
}

/// Without a session index the element is left out.
#[test]
fn test_slo_request_without_session_index() {
    let dispatcher = Fixture::new().dispatcher();
    let url = ok(
        &dispatcher,
        &ActionRequest::new("generate-slo-request")
            .with_name_id("user-42")
            .with_idp("idp-a"),
    )
    .slo
    .unwrap();
    let decoded = HttpRedirectBinding::decode_url(&url).unwrap();
    assert!(!decoded.xml.contains("SessionIndex"));
    assert_eq!(LogoutRequest::parse(&decoded.xml).unwrap().session_index, None);
}

/// Unknown IdPs and missing inputs are errors, not URLs.
#[test]
fn test_generation_errors() {
    let dispatcher = Fixture::new().dispatcher();
    assert_eq!(
        error_code(
            &dispatcher,
            &ActionRequest::new("generate-authn-request").with_idp("idp-z")
        ),
        "unknown_idp"
    );
    assert_eq!(
        error_code(
            &dispatcher,
            &ActionRequest::new("generate-slo-request")
                .with_name_id("user-42")
                .with_idp("idp-z")
        ),
        "unknown_idp"
    );
    assert_eq!(
        error_code(
            &dispatcher,
            &ActionRequest::new("generate-slo-request").with_idp("idp-a")
        ),
        "invalid_request"
    );
}
