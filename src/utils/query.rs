//! Query-string parsing for signature cipher blobs

use std::collections::HashMap;

/// Decoded value(s) of one query-string key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// Key appeared once
    Single(String),
    /// Key appeared more than once, in order of appearance
    Multi(Vec<String>),
}

impl QueryValue {
    /// First decoded value for the key
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::Single(value) => Some(value),
            QueryValue::Multi(values) => values.first().map(String::as_str),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = QueryValue::Multi(vec![first, value]);
            }
            QueryValue::Multi(values) => values.push(value),
        }
    }
}

/// Parse a `&`-separated `key=value` blob into a key to value(s) mapping.
///
/// A leading `?` is ignored. Pairs without `=` and values that do not
/// percent-decode to UTF-8 are skipped. `+` is kept literally.
pub fn parse_query_string(query: &str) -> HashMap<String, QueryValue> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut parsed: HashMap<String, QueryValue> = HashMap::new();

    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let Some((key, raw_value)) = pair.split_once('=') else {
            continue;
        };
        let Ok(value) = urlencoding::decode(raw_value) else {
            continue;
        };
        let value = value.into_owned();

        match parsed.get_mut(key) {
            Some(existing) => existing.push(value),
            None => {
                parsed.insert(key.to_string(), QueryValue::Single(value));
            }
        }
    }

    parsed
}

/// First decoded value of `key`, whichever shape it was stored in
pub fn first_value<'a>(parsed: &'a HashMap<String, QueryValue>, key: &str) -> Option<&'a str> {
    parsed.get(key).and_then(QueryValue::first)
}
