use std::net::SocketAddr;

use axum::http::HeaderMap;
use regex::Regex;

/// Best-effort client attribution: first hop of the forwarded-for chain,
/// else the transport peer, else a sentinel. Never errors on missing data.
pub fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            let first = value.split(',').next().unwrap_or("").trim();

            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Models fence their JSON in a markdown code block more often than not.
/// Prefer the fenced body when one exists, otherwise assume the whole reply
/// is JSON.
pub fn extract_json(raw: &str) -> &str {
    let fenced = Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap();

    match fenced.captures(raw).and_then(|captures| captures.get(1)) {
        Some(body) => body.as_str(),
        None => raw.trim(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.9:4242".parse().unwrap())
    }

    #[test]
    fn forwarded_chain_takes_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1, 10.0.0.2"),
        );

        assert_eq!(client_id(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn empty_forwarded_header_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("   "));

        assert_eq!(client_id(&headers, peer()), "10.0.0.9");
    }

    #[test]
    fn no_attribution_yields_sentinel() {
        assert_eq!(client_id(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn fenced_json_is_extracted() {
        let raw = "Here you go:\n```json\n{\"tracks\": []}\n```\nEnjoy!";

        assert_eq!(extract_json(raw), "{\"tracks\": []}");
    }

    #[test]
    fn fence_without_language_tag_works() {
        let raw = "```\n{\"tracks\": []}\n```";

        assert_eq!(extract_json(raw), "{\"tracks\": []}");
    }

    #[test]
    fn bare_json_passes_through_trimmed() {
        assert_eq!(extract_json("  {\"tracks\": []}\n"), "{\"tracks\": []}");
    }
}
