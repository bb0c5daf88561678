//! URL helpers.

use url::Url;

/// Resolve `href` against `base`. Absolute hrefs are returned normalized;
/// unparseable input is returned as given.
pub fn resolve_url(base: &str, href: &str) -> String {
    let href = href.trim();
    if let Ok(abs) = Url::parse(href) {
        return abs.to_string();
    }
    match Url::parse(base).and_then(|b| b.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Set (or replace) a query parameter on `url`.
pub fn with_query_param(url: &str, key: &str, value: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = parsed.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(key, value);
    }
    parsed.to_string()
}
