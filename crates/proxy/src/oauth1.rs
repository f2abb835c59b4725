//! RFC 5849 (OAuth 1.0a) request signing, HMAC-SHA1 only — required for
//! X (Twitter). Deliberately does not use the workspace's general-purpose
//! `percent-encoding` crate: RFC 5849 requires percent-encoding every
//! byte outside the unreserved set `A-Za-z0-9-_.~`, and the crate's
//! stock encode sets don't line up with that bit-for-bit, so this module
//! hand-rolls the narrow RFC 3986 unreserved-set encoder the signature
//! base string depends on.

use base64::Engine;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha1 = Hmac<Sha1>;

pub struct OAuth1Credentials<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token_key: &'a str,
    pub token_secret: &'a str,
}

/// Percent-encode per RFC 3986's unreserved set.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn random_nonce() -> String {
    let mut rng = rand::rng();
    (0..32).map(|_| format!("{:x}", rng.random_range(0u8..16))).collect()
}

fn unix_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string()
}

/// Split `base_url?query` into its two parts, owned.
fn split_url(url: &str) -> (String, Vec<(String, String)>) {
    match url.split_once('?') {
        None => (url.to_string(), vec![]),
        Some((base, query)) => {
            let pairs = query
                .split('&')
                .filter(|p| !p.is_empty())
                .map(|pair| match pair.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (pair.to_string(), String::new()),
                })
                .collect();
            (base.to_string(), pairs)
        }
    }
}

/// Build a fully-signed `Authorization: OAuth ...` header for `method`+`url`.
pub fn build_authorization_header(method: &str, url: &str, creds: &OAuth1Credentials) -> String {
    let (base_url, query_params) = split_url(url);
    let nonce = random_nonce();
    let timestamp = unix_timestamp();

    let mut oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".to_string(), creds.consumer_key.to_string()),
        ("oauth_nonce".to_string(), nonce),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), timestamp),
        ("oauth_token".to_string(), creds.token_key.to_string()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];

    let mut signing_params = oauth_params.clone();
    signing_params.extend(query_params);

    let mut encoded_pairs: Vec<(String, String)> = signing_params
        .into_iter()
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .collect();
    encoded_pairs.sort();

    let joined_params = encoded_pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(&base_url),
        percent_encode(&joined_params)
    );

    let signing_key = format!("{}&{}", percent_encode(creds.consumer_secret), percent_encode(creds.token_secret));

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(base_string.as_bytes());
    let signature = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    oauth_params.push(("oauth_signature".to_string(), signature));
    oauth_params.sort_by(|a, b| a.0.cmp(&b.0));

    let header_params = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth {header_params}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_encode_matches_rfc3986_unreserved_set() {
        assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(percent_encode("an/apple"), "an%2Fapple");
        assert_eq!(percent_encode("unreserved-._~"), "unreserved-._~");
    }

    #[test]
    fn header_carries_all_six_oauth_params_plus_signature() {
        let creds = OAuth1Credentials {
            consumer_key: "ck",
            consumer_secret: "cs",
            token_key: "tk",
            token_secret: "ts",
        };
        let header = build_authorization_header("POST", "https://api.x.com/2/tweets", &creds);
        assert!(header.starts_with("OAuth "));
        for key in [
            "oauth_consumer_key",
            "oauth_nonce",
            "oauth_signature",
            "oauth_signature_method",
            "oauth_timestamp",
            "oauth_token",
            "oauth_version",
        ] {
            assert!(header.contains(key), "missing {key} in {header}");
        }
    }

    #[test]
    fn query_params_are_folded_into_the_signature_base_but_not_the_header() {
        let creds = OAuth1Credentials {
            consumer_key: "ck",
            consumer_secret: "cs",
            token_key: "tk",
            token_secret: "ts",
        };
        let header = build_authorization_header("GET", "https://api.x.com/2/tweets?query=rust", &creds);
        assert!(!header.contains("query=\"rust\""));
    }
}
