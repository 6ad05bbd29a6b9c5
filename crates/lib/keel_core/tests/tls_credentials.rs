//! mTLS bundles built from generated PEM files, exercised with an in-memory
//! handshake.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use keel_core::config::{ConfigError, TlsSettings};
use keel_core::tls::{ClientCredentials, PeerPolicy, ServerCredentials};
use rcgen::{BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair};
use rustls::pki_types::ServerName;
use rustls::{ClientConnection, Connection, ProtocolVersion, ServerConnection};
use tempfile::TempDir;

struct Ca {
    cert: Certificate,
    key: KeyPair,
}

fn ca(name: &str) -> Ca {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.distinguished_name.push(DnType::CommonName, name);
    let cert = params.self_signed(&key).unwrap();
    Ca { cert, key }
}

/// Write a leaf signed by `ca` and return (cert path, key path).
fn leaf(dir: &Path, name: &str, ca: &Ca) -> (PathBuf, PathBuf) {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    params.distinguished_name.push(DnType::CommonName, name);
    let cert = params.signed_by(&key, &ca.cert, &ca.key).unwrap();

    let cert_path = dir.join(format!("{name}.crt"));
    let key_path = dir.join(format!("{name}.key"));
    std::fs::write(&cert_path, cert.pem()).unwrap();
    std::fs::write(&key_path, key.serialize_pem()).unwrap();
    (cert_path, key_path)
}

fn write_ca(dir: &Path, name: &str, ca: &Ca) -> PathBuf {
    let path = dir.join(format!("{name}.pem"));
    std::fs::write(&path, ca.cert.pem()).unwrap();
    path
}

struct Fixture {
    _dir: TempDir,
    server: ServerCredentials,
    client: ClientCredentials,
}

fn fixture(client_ca_matches: bool) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = ca("keel test ca");
    let rogue = ca("rogue ca");
    let ca_path = write_ca(dir.path(), "ca", &root);

    let (server_cert, server_key) = leaf(dir.path(), "server", &root);
    let client_signer = if client_ca_matches { &root } else { &rogue };
    let (client_cert, client_key) = leaf(dir.path(), "client", client_signer);

    let server = ServerCredentials::build(&server_cert, &server_key, &ca_path).unwrap();
    let client = ClientCredentials::build(&client_cert, &client_key, &ca_path).unwrap();
    Fixture {
        _dir: dir,
        server,
        client,
    }
}

fn pump(from: &mut Connection, to: &mut Connection) -> Result<(), rustls::Error> {
    let mut buf = Vec::new();
    while from.wants_write() {
        from.write_tls(&mut buf).unwrap();
    }
    let mut rd = &buf[..];
    while !rd.is_empty() {
        to.read_tls(&mut rd).unwrap();
        to.process_new_packets()?;
    }
    Ok(())
}

fn handshake(fixture: &Fixture) -> Result<(Connection, Connection), rustls::Error> {
    let name = ServerName::try_from("localhost").unwrap();
    let mut client: Connection = ClientConnection::new(fixture.client.config(), name)?.into();
    let mut server: Connection = ServerConnection::new(fixture.server.config())?.into();
    for _ in 0..10 {
        if !client.is_handshaking() && !server.is_handshaking() {
            break;
        }
        pump(&mut client, &mut server)?;
        pump(&mut server, &mut client)?;
    }
    Ok((client, server))
}

#[test]
fn bundles_report_policy_and_version() {
    let f = fixture(true);
    assert_eq!(f.server.policy(), PeerPolicy::RequireAndVerifyClientCert);
    assert_eq!(f.client.policy(), PeerPolicy::VerifyServerCert);
    assert_eq!(f.server.min_protocol_version(), ProtocolVersion::TLSv1_3);
    assert_eq!(f.client.min_protocol_version(), ProtocolVersion::TLSv1_3);
    assert_eq!(f.server.trust_anchors(), 1);
    assert_eq!(f.client.trust_anchors(), 1);
}

#[test]
fn mutual_handshake_negotiates_tls13() {
    let f = fixture(true);
    let (client, server) = handshake(&f).unwrap();
    assert!(!client.is_handshaking());
    assert!(!server.is_handshaking());
    assert_eq!(server.protocol_version(), Some(ProtocolVersion::TLSv1_3));
    let Connection::Server(server) = server else {
        panic!("expected server connection");
    };
    assert!(server.peer_certificates().is_some_and(|c| !c.is_empty()));
}

#[test]
fn client_from_foreign_ca_is_refused() {
    let f = fixture(false);
    assert!(handshake(&f).is_err());
}

#[test]
fn shared_config_is_the_same_allocation() {
    let f = fixture(true);
    let clone = f.server.clone();
    assert!(Arc::ptr_eq(&f.server.config(), &clone.config()));
}

// S6
#[test]
fn missing_ca_fails_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let root = ca("keel test ca");
    let (cert, key) = leaf(dir.path(), "server", &root);
    let err = ServerCredentials::build(&cert, &key, &dir.path().join("absent.pem")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn ca_file_without_certificates_fails() {
    let dir = tempfile::tempdir().unwrap();
    let root = ca("keel test ca");
    let (cert, key) = leaf(dir.path(), "client", &root);
    let empty = dir.path().join("empty.pem");
    std::fs::write(&empty, "# no certificates\n").unwrap();
    let err = ClientCredentials::build(&cert, &key, &empty).unwrap_err();
    assert!(matches!(err, ConfigError::Tls(_)));
}

#[test]
fn key_file_holding_a_certificate_fails() {
    let dir = tempfile::tempdir().unwrap();
    let root = ca("keel test ca");
    let ca_path = write_ca(dir.path(), "ca", &root);
    let (cert, _) = leaf(dir.path(), "server", &root);
    let err = ServerCredentials::build(&cert, &cert, &ca_path).unwrap_err();
    assert!(matches!(err, ConfigError::Tls(_)));
}

#[test]
fn builds_from_settings() {
    let dir = tempfile::tempdir().unwrap();
    let root = ca("keel test ca");
    let ca_path = write_ca(dir.path(), "ca", &root);
    let (cert, key) = leaf(dir.path(), "svc", &root);
    let settings = TlsSettings {
        cert_path: Some(cert),
        key_path: Some(key),
        ca_path: Some(ca_path),
    };
    assert!(ServerCredentials::from_settings(&settings).unwrap().is_some());
    assert!(ClientCredentials::from_settings(&settings).unwrap().is_some());
}
