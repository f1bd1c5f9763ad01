use std::collections::HashMap;

/// Read access to the host's cookies.
pub trait CookieStore: Send + Sync {
    /// The current cookies, read once. Every lookup made for one request
    /// goes through the same jar.
    fn cookie_jar(&self) -> CookieJar;
}

/// Cookies parsed from a `name=value; name2=value2` string, the same
/// format the host exposes to scripts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    raw: String,
    values: HashMap<String, String>,
}

impl CookieJar {
    pub fn parse(raw: &str) -> Self {
        let mut values = HashMap::new();
        for part in raw.split(';') {
            let part = part.trim_start();
            let Some((name, value)) = part.split_once('=') else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            // First occurrence wins, matching the host's lookup order.
            values
                .entry(name.to_string())
                .or_insert_with(|| decode_cookie_value(value));
        }
        Self {
            raw: raw.trim().to_string(),
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Decoded value of the cookie named `name`, if present.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }

    /// Raw `Cookie` header to forward with credentialed requests, or `None`
    /// when there is nothing to send.
    pub fn cookie_header(&self) -> Option<String> {
        if self.raw.is_empty() {
            None
        } else {
            Some(self.raw.clone())
        }
    }
}

impl CookieStore for CookieJar {
    fn cookie_jar(&self) -> CookieJar {
        self.clone()
    }
}

fn decode_cookie_value(value: &str) -> String {
    match urlencoding::decode(value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value.to_string(),
    }
}
