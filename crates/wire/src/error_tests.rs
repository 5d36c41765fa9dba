// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn error_body_serializes_to_error_key() {
    let body = ErrorBody::new("missing package");
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json, serde_json::json!({"error": "missing package"}));
}

#[test]
fn status_codes_match_spec_table() {
    assert_eq!(status_code(&ErrorKind::StoreBusy), 500);
    assert_eq!(status_code(&ErrorKind::InvalidRequest("x".into())), 400);
    assert_eq!(status_code(&ErrorKind::NotFound("x".into())), 404);
    assert_eq!(status_code(&ErrorKind::Conflict("x".into())), 409);
    assert_eq!(status_code(&ErrorKind::Protected("x".into())), 403);
    assert_eq!(status_code(&ErrorKind::SshUnreachable), 502);
    assert_eq!(status_code(&ErrorKind::SshTimeout), 502);
    assert_eq!(status_code(&ErrorKind::SshError("x".into())), 502);
    assert_eq!(status_code(&ErrorKind::Internal("x".into())), 500);
}
