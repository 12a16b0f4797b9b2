//! Handshake credential extraction

use percent_encoding::percent_decode_str;
use tokio_tungstenite::tungstenite::handshake::server::Request;

const TOKEN_PARAM: &str = "access_token";

/// Pull the bearer credential from the upgrade request.
///
/// The `access_token` query parameter wins over the `Authorization` header,
/// since browsers cannot set headers on WebSocket upgrades.
pub fn extract_credential(request: &Request) -> Option<String> {
    query_token(request).or_else(|| bearer_token(request))
}

fn query_token(request: &Request) -> Option<String> {
    let raw = request
        .uri()
        .query()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == TOKEN_PARAM)
        .map(|(_, value)| value)?;

    let token = percent_decode_str(raw).decode_utf8().ok()?;
    (!token.is_empty()).then(|| token.into_owned())
}

fn bearer_token(request: &Request) -> Option<String> {
    let header = request.headers().get("authorization")?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}
