use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use subtle::ConstantTimeEq;
use tracing::warn;

use super::ControlState;

pub const REALM: &str = "cert-manager";

#[derive(Debug, PartialEq, Eq)]
pub enum Credentials {
    Valid,
    Missing,
    Invalid,
}

/// Gate every control route on `web_enable` and HTTP Basic credentials.
///
/// Credentials are read from the live system document on each request.
pub async fn require_admin(
    State(state): State<ControlState>,
    req: Request,
    next: Next,
) -> Response {
    let system = state.store().system().await;
    if !system.web_enabled {
        return (StatusCode::FORBIDDEN, "administration disabled").into_response();
    }

    match check_basic(req.headers(), &system.web_user, &system.web_pass) {
        Credentials::Valid => next.run(req).await,
        Credentials::Missing => challenge("authentication required"),
        Credentials::Invalid => {
            warn!("Rejected control request to {} with bad credentials", req.uri().path());
            challenge("invalid credentials")
        }
    }
}

pub fn check_basic(headers: &HeaderMap, user: &str, pass: &str) -> Credentials {
    let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return Credentials::Missing;
    };
    let Some((given_user, given_pass)) = decode_basic(value) else {
        return Credentials::Invalid;
    };

    // Evaluate both comparisons so timing does not reveal which one failed.
    let user_ok = constant_time_eq(&given_user, user);
    let pass_ok = constant_time_eq(&given_pass, pass);
    if user_ok & pass_ok {
        Credentials::Valid
    } else {
        Credentials::Invalid
    }
}

pub fn decode_basic(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn challenge(message: &'static str) -> Response {
    let mut resp = (StatusCode::UNAUTHORIZED, message).into_response();
    let value = format!("Basic realm=\"{}\"", REALM);
    if let Ok(value) = HeaderValue::from_str(&value) {
        resp.headers_mut().insert(header::WWW_AUTHENTICATE, value);
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_decode_basic() {
        // admin:123456
        let decoded = decode_basic("Basic YWRtaW46MTIzNDU2").unwrap();
        assert_eq!(decoded, ("admin".to_string(), "123456".to_string()));
    }

    #[test]
    fn test_decode_basic_password_with_colon() {
        let value = format!("Basic {}", STANDARD.encode("admin:pa:ss"));
        let (_, pass) = decode_basic(&value).unwrap();
        assert_eq!(pass, "pa:ss");
    }

    #[test]
    fn test_decode_rejects_other_schemes() {
        assert!(decode_basic("Bearer abc").is_none());
        assert!(decode_basic("Basic not-base64!").is_none());
    }

    #[test]
    fn test_check_basic() {
        let good = headers_with("Basic YWRtaW46MTIzNDU2");
        assert_eq!(check_basic(&good, "admin", "123456"), Credentials::Valid);
        assert_eq!(check_basic(&good, "admin", "other"), Credentials::Invalid);
        assert_eq!(check_basic(&HeaderMap::new(), "admin", "123456"), Credentials::Missing);
    }
}
