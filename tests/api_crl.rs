//! HTTP tests for the health and CRL endpoints.

mod common;

use axum::http::{header, StatusCode};
use bytes::Bytes;

use common::{ScriptedProvider, TestApp};

#[tokio::test]
async fn healthcheck_returns_ok() {
    let app = TestApp::new(ScriptedProvider::never_issuing());
    let response = app.get("/healthcheck").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"ok");
}

#[tokio::test]
async fn unknown_ca_is_not_found() {
    let app = TestApp::new(ScriptedProvider::never_issuing());
    let response = app.get("/pigeon/crl").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], "not_found");
}

#[tokio::test]
async fn missing_crl_object_is_server_error() {
    let app = TestApp::new(ScriptedProvider::never_issuing());
    let response = app.get("/vpn/crl").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json();
    assert_eq!(body["message"], "CRL retrieval failed");
    assert!(!body.to_string().contains("vpn-revocations"));
}

#[tokio::test]
async fn crl_is_passed_through_untouched() {
    let app = TestApp::new(ScriptedProvider::never_issuing());
    let crl = Bytes::from_static(&[0x30, 0x82, 0x02, 0x0a, 0x30, 0x81, 0xf3, 0x00, 0xff, 0x0d]);
    app.store.put("vpn-revocations", "crl/1.crl", crl.clone());

    let response = app.get("/vpn/crl").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers.get(header::CONTENT_TYPE).unwrap(), "application/pkix-crl");
    assert_eq!(response.body, crl);
}

#[tokio::test]
async fn crl_is_read_from_the_requested_ca_only() {
    let app = TestApp::new(ScriptedProvider::never_issuing());
    app.store.put("vpn-revocations", "crl/1.crl", Bytes::from_static(b"vpn-crl"));

    let response = app.get("/tls/crl").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

    app.store.put("tls-revocations", "crl/2.crl", Bytes::from_static(b"tls-crl"));
    let response = app.get("/tls/crl").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"tls-crl");
}

#[tokio::test]
async fn crl_requires_no_credentials_and_no_provider() {
    let app = TestApp::new(ScriptedProvider::never_issuing());
    app.store.put("tls-revocations", "crl/2.crl", Bytes::from_static(b"tls-crl"));

    let response = app.get("/tls/crl").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(!app.provider.was_contacted());
}
