use anyhow::{Context, Result};
use regex::RegexSet;

/// A static set of route patterns.
///
/// `(.*)` and `*` match any run of characters, slashes included. Everything
/// else matches literally, so `/dashboard(.*)` covers `/dashboard` and every
/// path below it.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    patterns: Vec<String>,
    set: RegexSet,
}

impl RouteMatcher {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let regexes: Vec<String> = patterns.iter().map(|p| pattern_to_regex(p)).collect();
        let set = RegexSet::new(&regexes)
            .with_context(|| format!("invalid route patterns: {patterns:?}"))?;

        Ok(Self { patterns, set })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.set.is_match(normalize_path(path))
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

fn pattern_to_regex(pattern: &str) -> String {
    let pattern = normalize_path(pattern);
    let body = pattern
        .split("(.*)")
        .map(|segment| {
            segment
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*")
        })
        .collect::<Vec<_>>()
        .join(".*");

    format!("^{body}$")
}

/// Drops trailing slashes, keeping a bare `/`
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}
