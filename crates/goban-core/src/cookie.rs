//! Cookie header parsing.

use std::collections::HashMap;

/// Split a `k=v; k2=v2` cookie header into a map. Malformed parts are ignored.
pub fn parse_cookies(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|part| {
            let (k, v) = part.trim().split_once('=')?;
            Some((k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

/// Look up a single non-empty cookie value.
pub fn cookie_value(raw: &str, key: &str) -> Option<String> {
    parse_cookies(raw).remove(key).filter(|v| !v.is_empty())
}
