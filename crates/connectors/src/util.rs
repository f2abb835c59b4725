//! Small helpers shared by every connector's `execute()`.

use std::collections::HashMap;

pub fn json_headers() -> HashMap<String, String> {
    let mut h = HashMap::new();
    h.insert("Content-Type".to_string(), "application/json".to_string());
    h
}

pub fn accept_json_headers() -> HashMap<String, String> {
    let mut h = HashMap::new();
    h.insert("Accept".to_string(), "application/json".to_string());
    h
}

pub fn accept_and_content_json_headers() -> HashMap<String, String> {
    let mut h = HashMap::new();
    h.insert("Accept".to_string(), "application/json".to_string());
    h.insert("Content-Type".to_string(), "application/json".to_string());
    h
}

pub fn form_headers() -> HashMap<String, String> {
    let mut h = HashMap::new();
    h.insert(
        "Content-Type".to_string(),
        "application/x-www-form-urlencoded".to_string(),
    );
    h
}

/// Percent-encode a single path segment (e.g. an emoji name) the way
/// Discord's reaction endpoints require — everything outside the
/// unreserved set is escaped, including `/`.
pub fn encode_path_segment(segment: &str) -> String {
    percent_encoding::utf8_percent_encode(segment, percent_encoding::NON_ALPHANUMERIC).to_string()
}
