use std::collections::HashSet;
use url::Url;

/// Serialized form of an opaque origin (sandboxed frames, `file:` pages).
pub const NULL_ORIGIN: &str = "null";

/// Decides which message origins may reach the correlator.
///
/// An origin is trusted when it is allow-listed, equals the host page's own
/// origin, or is the opaque `"null"` origin. Comparison is by scheme, host
/// and port; strings that do not parse as URLs only match exactly.
#[derive(Debug, Clone, Default)]
pub struct OriginValidator {
    allowed: HashSet<String>,
    host_origin: Option<String>,
}

impl OriginValidator {
    pub fn new(host_origin: Option<&str>) -> Self {
        Self {
            allowed: HashSet::new(),
            host_origin: host_origin.map(normalize),
        }
    }

    pub fn with_allowed<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for origin in origins {
            self.add_allowed_origin(origin.as_ref());
        }
        self
    }

    pub fn add_allowed_origin(&mut self, origin: &str) {
        self.allowed.insert(normalize(origin));
    }

    pub fn is_trusted(&self, origin: &str) -> bool {
        if origin == NULL_ORIGIN {
            return true;
        }
        let origin = normalize(origin);
        self.allowed.contains(&origin) || self.host_origin.as_deref() == Some(origin.as_str())
    }
}

fn normalize(origin: &str) -> String {
    match Url::parse(origin) {
        Ok(url) if url.origin().is_tuple() => url.origin().ascii_serialization(),
        _ => origin.to_string(),
    }
}
