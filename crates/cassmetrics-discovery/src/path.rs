//! Namespace path codec
//!
//! External namespaces look like
//! `/intel/cassandra/node/<host>/org_apache_cassandra_metrics/type/Cache/...`.
//! The JMX domain segment travels with `_` in place of the `.` the managed
//! server uses; every other segment is passed through untouched so values
//! such as the `system_auth` keyspace keep their underscores.

/// Segment separator
pub const SEPARATOR: char = '/';
/// First identity segment
pub const VENDOR: &str = "intel";
/// Second identity segment
pub const PLUGIN: &str = "cassandra";
/// Literal preceding the host segment
pub const NODE: &str = "node";
/// Number of segments before the tree part of a namespace
pub const PREFIX_LEN: usize = 4;
/// Position of the JMX domain in a full namespace
pub const DOMAIN_INDEX: usize = PREFIX_LEN;
/// Single-level wildcard
pub const WILDCARD: &str = "*";
/// Alternation separator
pub const ALTERNATION: char = '|';

/// One parsed pattern segment
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Matches a child with exactly this key
    Literal(String),
    /// Matches every child
    Wildcard,
    /// Matches children whose key is one of the listed literals
    Alternation(Vec<String>),
}

impl Segment {
    /// Parse a raw segment
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw == WILDCARD {
            return Self::Wildcard;
        }
        if !raw.contains(ALTERNATION) {
            return Self::Literal(raw.to_string());
        }

        let mut options: Vec<String> = Vec::new();
        for option in raw.split(ALTERNATION).filter(|o| !o.is_empty()) {
            if !options.iter().any(|o| o == option) {
                options.push(option.to_string());
            }
        }
        if options.len() == 1 {
            return Self::Literal(options.remove(0));
        }
        Self::Alternation(options)
    }

    /// Whether a child key satisfies this segment
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == key,
            Self::Wildcard => true,
            Self::Alternation(options) => options.iter().any(|o| o == key),
        }
    }
}

/// Parse every segment of a pattern
#[must_use]
pub fn parse_pattern<S: AsRef<str>>(segments: &[S]) -> Vec<Segment> {
    segments.iter().map(|s| Segment::parse(s.as_ref())).collect()
}

/// Split a namespace string on `/`, dropping one leading separator.
///
/// An empty or separator-only string yields no segments.
#[must_use]
pub fn split(namespace: &str) -> Vec<String> {
    let trimmed = namespace.strip_prefix(SEPARATOR).unwrap_or(namespace);
    if trimmed.chars().all(|c| c == SEPARATOR) {
        return Vec::new();
    }
    trimmed.split(SEPARATOR).map(ToString::to_string).collect()
}

/// Join segments with `/`
#[must_use]
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.push_str(segment.as_ref());
    }
    out
}

/// Convert a JMX domain to its namespace form
#[must_use]
pub fn to_external_name(name: &str) -> String {
    name.replace('.', "_")
}

/// Convert a namespace domain segment back to its JMX form
#[must_use]
pub fn to_internal_name(name: &str) -> String {
    name.replace('_', ".")
}

/// Encode a full namespace (identity prefix included) for callers
#[must_use]
pub fn encode<S: AsRef<str>>(segments: &[S]) -> String {
    let external: Vec<String> = segments
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if i == DOMAIN_INDEX {
                to_external_name(s.as_ref())
            } else {
                s.as_ref().to_string()
            }
        })
        .collect();
    join(&external)
}

/// Decode a caller namespace into internal segments
#[must_use]
pub fn decode(namespace: &str) -> Vec<String> {
    let mut segments = split(namespace);
    if let Some(domain) = segments.get_mut(DOMAIN_INDEX) {
        *domain = to_internal_name(domain);
    }
    segments
}

/// Identity prefix for a host
#[must_use]
pub fn prefix(host: &str) -> Vec<String> {
    vec![
        VENDOR.to_string(),
        PLUGIN.to_string(),
        NODE.to_string(),
        host.to_string(),
    ]
}
