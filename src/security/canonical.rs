/// Canonical form of a signed request
///
/// The signer builds the signed bytes through `canonical_request`; the
/// verifier only accepts queries already in that form. Any change to the
/// ordering or encoding here invalidates every link issued before the change.

use url::form_urlencoded;

/// Query parameter carrying the expiry (decimal Unix seconds)
pub const EXPIRY_PARAM: &str = "exp";

/// Query parameter carrying the hex MAC; never part of the signed bytes
pub const SIGNATURE_PARAM: &str = "sig";

const SIGNATURE_PAIR_PREFIX: &str = "sig=";

/// Ordered list of decoded query parameters
///
/// Keeps duplicates and the order they arrived in; canonical ordering is
/// applied only when the signing string is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an `application/x-www-form-urlencoded` query string
    pub fn parse(query: &str) -> Self {
        form_urlencoded::parse(query.as_bytes()).into_owned().collect()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Remove every value stored under `key`, returning them in order
    pub fn remove(&mut self, key: &str) -> Vec<String> {
        let mut removed = Vec::new();
        self.pairs.retain(|(k, v)| {
            if k == key {
                removed.push(v.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encode in stored order
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.pairs {
            serializer.append_pair(k, v);
        }
        serializer.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Canonical query string: every pair except `sig`, sorted by key then
/// value, form-urlencoded and joined with `&`.
pub fn canonical_query(params: &QueryParams) -> String {
    let mut pairs: Vec<(&str, &str)> = params
        .iter()
        .filter(|(k, _)| *k != SIGNATURE_PARAM)
        .collect();
    pairs.sort_unstable();

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        serializer.append_pair(k, v);
    }
    serializer.finish()
}

/// The exact string that is MAC'd: `"{path}?{canonical_query}"`
///
/// The path is taken byte-for-byte; no host or scheme is ever included.
pub fn canonical_request(path: &str, params: &QueryParams) -> String {
    format!("{}?{}", path, canonical_query(params))
}

/// True when `raw` is exactly what `canonical_query` produces for the
/// pairs it decodes to
///
/// Rejects anything the decoder normalizes away: escape case, `+` versus
/// `%20`, empty pairs, pair order and escapes that are not valid UTF-8.
pub fn is_canonical_query(raw: &str, params: &QueryParams) -> bool {
    !params.contains(SIGNATURE_PARAM) && canonical_query(params) == raw
}

/// Split a received query into the signed part and the trailing `sig` value
///
/// Only a final `sig=` pair counts; a query without one comes back whole.
pub fn split_signature(query: &str) -> (&str, Option<&str>) {
    let (signed, last) = match query.rsplit_once('&') {
        Some((signed, last)) => (signed, last),
        None => ("", query),
    };

    match last.strip_prefix(SIGNATURE_PAIR_PREFIX) {
        Some(sig) => (signed, Some(sig)),
        None => (query, None),
    }
}

/// Split `"/path?query"` at the first `?`
pub fn split_path_and_query(path_and_query: &str) -> (&str, Option<&str>) {
    match path_and_query.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path_and_query, None),
    }
}
