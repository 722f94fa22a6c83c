use lru::LruCache;
use regex::{Regex, RegexBuilder};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::RemoteError;

const REGEX_CACHE_CAPACITY: usize = 200;

lazy_static::lazy_static! {
    /// Compiled patterns keyed by (pattern, case sensitivity).
    static ref REGEX_LRU_CACHE: Mutex<LruCache<(String, bool), Arc<Regex>>> = Mutex::new(LruCache::new(
        NonZeroUsize::new(REGEX_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN)
    ));
}

/// Translates a `%`/`_` wildcard pattern into an anchored regex.
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => regex.push_str(&regex::escape(&escaped.to_string())),
                None => regex.push_str(&regex::escape("\\")),
            },
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }

    regex.push('$');
    regex
}

/// Plain patterns skip regex compilation entirely.
fn fast_path_like(text: &str, pattern: &str, case_sensitive: bool) -> Option<bool> {
    if pattern.contains('\\') || pattern.contains('_') {
        return None;
    }

    let (text, pattern) = if case_sensitive {
        (text.to_string(), pattern.to_string())
    } else {
        (text.to_lowercase(), pattern.to_lowercase())
    };

    if !pattern.contains('%') {
        return Some(text == pattern);
    }

    let inner = pattern.trim_matches('%');
    if inner.contains('%') {
        return None;
    }

    match (pattern.starts_with('%'), pattern.ends_with('%')) {
        (true, true) => Some(text.contains(inner)),
        (false, true) => Some(text.starts_with(inner)),
        (true, false) => Some(text.ends_with(inner)),
        (false, false) => None,
    }
}

fn compile(pattern: &str, case_sensitive: bool) -> Result<Regex, RemoteError> {
    RegexBuilder::new(&like_to_regex(pattern))
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| RemoteError::InvalidQuery(format!("Invalid LIKE pattern '{}': {}", pattern, e)))
}

fn cached_regex(pattern: &str, case_sensitive: bool) -> Result<Arc<Regex>, RemoteError> {
    let key = (pattern.to_string(), case_sensitive);
    if let Some(regex) = REGEX_LRU_CACHE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(Arc::clone(regex));
    }

    let regex = Arc::new(compile(pattern, case_sensitive)?);
    REGEX_LRU_CACHE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .put(key, Arc::clone(&regex));
    Ok(regex)
}

pub fn eval_like(text: &str, pattern: &str, case_sensitive: bool) -> Result<bool, RemoteError> {
    if let Some(result) = fast_path_like(text, pattern, case_sensitive) {
        return Ok(result);
    }
    Ok(cached_regex(pattern, case_sensitive)?.is_match(text))
}
