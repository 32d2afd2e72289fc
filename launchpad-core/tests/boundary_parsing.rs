//! Parameterised tests for values parsed at the backend boundary:
//! domain normalisation and connection-config blobs.

use launchpad_core::types::normalize_domain;
use launchpad_core::{ConnectionConfig, ConnectionType, CoreError, DomainName, HostingId};
use rstest::rstest;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Domain normalisation
// ---------------------------------------------------------------------------

#[rstest]
#[case("example.com", "example.com")]
#[case("www.example.com", "example.com")]
#[case("WWW.Example.com", "Example.com")]
#[case("  www.example.com  ", "example.com")]
#[case("\twWw.shop.io\n", "shop.io")]
#[case("www.www.example.com", "www.example.com")]
#[case("wwwexample.com", "wwwexample.com")]
#[case("sub.www.example.com", "sub.www.example.com")]
#[case("www", "www")]
fn normalize_strips_leading_www_and_whitespace(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(normalize_domain(raw), expected);
    assert_eq!(DomainName::parse(raw).expect("valid").as_str(), expected);
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("www.")]
#[case(" WWW.  ")]
fn empty_domains_are_rejected(#[case] raw: &str) {
    assert!(matches!(DomainName::parse(raw), Err(CoreError::InvalidDomain(_))));
}

// ---------------------------------------------------------------------------
// Connection configs
// ---------------------------------------------------------------------------

fn hosting() -> HostingId {
    HostingId::from("h-42")
}

#[rstest]
#[case(ConnectionType::Ftp, 21)]
#[case(ConnectionType::Cpanel, 2083)]
#[case(ConnectionType::Ssh, 22)]
#[case(ConnectionType::Vps, 22)]
fn default_ports_per_type(#[case] kind: ConnectionType, #[case] port: u16) {
    let blob = json!({"host": "h.example.test", "username": "u"});
    let cfg = ConnectionConfig::parse(&hosting(), kind, &blob).expect("parse");
    assert_eq!(cfg.connection_type(), kind);
    assert_eq!(cfg.endpoint().expect("endpoint").port, port);
}

#[rstest]
#[case(json!({"host": "h", "username": "u", "port": 2222}), 2222)]
#[case(json!({"host": "h", "username": "u", "port": "2222"}), 2222)]
#[case(json!({"host": "h", "username": "u", "port": ""}), 22)]
#[case(json!(r#"{"host":"h","user":"u","port":2200}"#), 2200)]
fn port_accepts_number_or_string(#[case] blob: Value, #[case] port: u16) {
    let cfg = ConnectionConfig::parse(&hosting(), ConnectionType::Ssh, &blob).expect("parse");
    assert_eq!(cfg.endpoint().expect("endpoint").port, port);
}

#[rstest]
#[case(Value::Null, "missing")]
#[case(json!(""), "empty")]
#[case(json!("{not json"), "not JSON")]
#[case(json!([1, 2]), "JSON object")]
#[case(json!({"username": "u"}), "missing host")]
#[case(json!({"host": "h"}), "missing username")]
#[case(json!({"host": "h", "username": "u", "port": "ssh"}), "invalid digit")]
fn malformed_blobs_are_rejected(#[case] blob: Value, #[case] needle: &str) {
    let err = ConnectionConfig::parse(&hosting(), ConnectionType::Ftp, &blob).unwrap_err();
    assert!(matches!(err, CoreError::InvalidConnectionConfig { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("h-42"), "message should name the hosting: {msg}");
    assert!(msg.contains(needle), "expected '{needle}' in: {msg}");
}

#[test]
fn secure_flag_is_kept_for_ftp() {
    let blob = json!({"host": "h", "username": "u", "secure": true});
    let ConnectionConfig::Ftp(ftp) =
        ConnectionConfig::parse(&hosting(), ConnectionType::Ftp, &blob).expect("parse")
    else {
        panic!("expected ftp");
    };
    assert!(ftp.secure);
}

#[rstest]
#[case("ftp", ConnectionType::Ftp, true)]
#[case("SFTP", ConnectionType::Ftp, true)]
#[case("cpanel", ConnectionType::Cpanel, false)]
#[case("ssh", ConnectionType::Ssh, true)]
#[case("vps", ConnectionType::Vps, true)]
#[case("managed", ConnectionType::Managed, false)]
fn connection_type_from_str(#[case] raw: &str, #[case] kind: ConnectionType, #[case] fs: bool) {
    let parsed: ConnectionType = raw.parse().expect("known type");
    assert_eq!(parsed, kind);
    assert_eq!(parsed.exposes_filesystem(), fs);
}

#[test]
fn unknown_connection_type_is_an_error() {
    let err = "gopher".parse::<ConnectionType>().unwrap_err();
    assert!(err.contains("gopher"));
}
