//! Path pattern compilation and matching.
//!
//! # Responsibilities
//! - Compile express-style path templates into anchored regexes
//! - Cache compiled matchers process-wide by `(pattern, exact)`
//! - Match a path and return the consumed prefix with decoded parameters
//!
//! # Pattern Dialect
//! - Literal segments: `/users`
//! - Named parameters: `/:id`, with custom regex `/:id(\d+)`
//! - Modifiers: `?` optional, `*` zero or more, `+` one or more
//! - Unnamed groups `/(\d+)` and bare wildcards `/*`, keyed by index
//! - `\` escapes the next character
//!
//! # Design Decisions
//! - Matching is case-insensitive and tolerates one trailing `/`
//! - Prefix (non-exact) matches must stop at a `/` boundary or end of input
//! - The cache is append-only; a racing duplicate compile produces an equal matcher

use dashmap::DashMap;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

const DELIMITER: char = '/';
const MATCHED_GROUP: &str = "m";

static TOKENIZER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\\.)|([/.])?(?:(?::(\w+)(?:\(((?:\\.|[^\\()])+)\))?|\(((?:\\.|[^\\()])+)\))([+*?])?|(\*))",
    )
    .expect("tokenizer regex is valid")
});

static CACHE: Lazy<DashMap<(String, bool), Arc<Matcher>>> = Lazy::new(DashMap::new);

/// Errors raised while compiling a route pattern.
#[derive(Debug, Clone, Error)]
#[error("invalid route pattern {pattern:?}: {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Result of a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// The consumed prefix of the input, `/` when nothing was consumed.
    pub path: String,
    /// Parameter name to URL-decoded value. Unmatched optional params are absent.
    pub params: BTreeMap<String, String>,
}

/// A compiled path pattern.
#[derive(Debug)]
pub struct Matcher {
    pattern: String,
    exact: bool,
    regex: Regex,
    keys: Vec<String>,
}

impl Matcher {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// Parameter names in declaration order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Test `path` against this matcher.
    pub fn match_path(&self, path: &str) -> Option<PathMatch> {
        let caps = self.regex.captures(path)?;
        let matched = caps.name(MATCHED_GROUP).map(|m| m.as_str()).unwrap_or("");

        let mut params = BTreeMap::new();
        for (i, key) in self.keys.iter().enumerate() {
            if let Some(value) = caps.name(&group_name(i)) {
                params.insert(key.clone(), decode(value.as_str()));
            }
        }

        Some(PathMatch {
            path: if matched.is_empty() {
                "/".to_string()
            } else {
                matched.to_string()
            },
            params,
        })
    }
}

/// Compile `pattern`, reusing a cached matcher when one exists.
///
/// `exact = true` requires the whole path to be consumed; `exact = false`
/// accepts a prefix ending at a segment boundary.
pub fn compile(pattern: &str, exact: bool) -> Result<Arc<Matcher>, PatternError> {
    let key = (pattern.to_string(), exact);
    if let Some(found) = CACHE.get(&key) {
        return Ok(found.value().clone());
    }

    let matcher = Arc::new(build(pattern, exact)?);
    tracing::trace!(pattern, exact, regex = %matcher.regex, "Compiled route pattern");
    Ok(CACHE.entry(key).or_insert(matcher).value().clone())
}

/// Compile (through the cache) and match in one step.
pub fn match_path(pattern: &str, exact: bool, path: &str) -> Result<Option<PathMatch>, PatternError> {
    Ok(compile(pattern, exact)?.match_path(path))
}

#[derive(Debug)]
enum Token {
    Literal(String),
    Param(Param),
}

#[derive(Debug)]
struct Param {
    name: String,
    prefix: String,
    optional: bool,
    repeat: bool,
    partial: bool,
    pattern: String,
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut index = 0;
    let mut unnamed = 0usize;

    for caps in TOKENIZER.captures_iter(input) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(index..index);
        literal.push_str(&input[index..whole.start]);
        index = whole.end;

        if let Some(escaped) = caps.get(1) {
            literal.push_str(&escaped.as_str()[1..]);
            continue;
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }

        let prefix = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let next = input[index..].chars().next();
        let modifier = caps.get(6).map(|m| m.as_str());
        let asterisk = caps.get(7).is_some();
        let delimiter = if prefix.is_empty() { DELIMITER.to_string() } else { prefix.to_string() };

        let name = match caps.get(3) {
            Some(n) => n.as_str().to_string(),
            None => {
                let n = unnamed.to_string();
                unnamed += 1;
                n
            }
        };

        let pattern = match caps.get(4).or_else(|| caps.get(5)) {
            Some(custom) => escape_group(custom.as_str()),
            None if asterisk => ".*".to_string(),
            None => format!("[^{}]+?", regex::escape(&delimiter)),
        };

        tokens.push(Token::Param(Param {
            name,
            prefix: prefix.to_string(),
            optional: matches!(modifier, Some("?") | Some("*")),
            repeat: matches!(modifier, Some("+") | Some("*")),
            partial: !prefix.is_empty() && next.is_some_and(|c| c.to_string() != prefix),
            pattern,
        }));
    }

    literal.push_str(&input[index..]);
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

fn build(pattern: &str, exact: bool) -> Result<Matcher, PatternError> {
    let mut route = String::new();
    let mut keys = Vec::new();

    for token in tokenize(pattern) {
        match token {
            Token::Literal(text) => route.push_str(&regex::escape(&text)),
            Token::Param(param) => {
                let group = group_name(keys.len());
                let prefix = regex::escape(&param.prefix);
                let mut capture = format!("(?:{})", param.pattern);
                if param.repeat {
                    capture = format!("{capture}(?:{prefix}{capture})*");
                }
                let capture = if param.optional {
                    if param.partial {
                        format!("{prefix}(?P<{group}>{capture})?")
                    } else {
                        format!("(?:{prefix}(?P<{group}>{capture}))?")
                    }
                } else {
                    format!("{prefix}(?P<{group}>{capture})")
                };
                route.push_str(&capture);
                keys.push(param.name);
            }
        }
    }

    if route.ends_with(DELIMITER) {
        route.pop();
    }

    // The regex crate has no lookahead, so the trailing boundary check is
    // expressed by capturing the consumed prefix separately.
    let source = if exact {
        format!("(?i)^(?P<{MATCHED_GROUP}>{route}/?)$")
    } else {
        format!("(?i)^(?P<{MATCHED_GROUP}>{route}(?:/$)?)(?:/|$)")
    };

    let regex = Regex::new(&source).map_err(|source| PatternError {
        pattern: pattern.to_string(),
        source,
    })?;

    Ok(Matcher {
        pattern: pattern.to_string(),
        exact,
        regex,
        keys,
    })
}

fn escape_group(group: &str) -> String {
    let mut out = String::with_capacity(group.len());
    for c in group.chars() {
        if matches!(c, '=' | '!' | ':' | '$' | '/' | '(' | ')') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn group_name(index: usize) -> String {
    format!("p{index}")
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(m: &PathMatch) -> Vec<(&str, &str)> {
        m.params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    #[test]
    fn test_named_params() {
        let m = match_path("/users/:id", true, "/users/42").unwrap().unwrap();
        assert_eq!(m.path, "/users/42");
        assert_eq!(params(&m), vec![("id", "42")]);

        assert!(match_path("/users/:id", true, "/users").unwrap().is_none());
        assert!(match_path("/users/:id", true, "/users/42/posts").unwrap().is_none());
    }

    #[test]
    fn test_params_are_decoded() {
        let m = match_path("/files/:name", true, "/files/a%20b%2Fc").unwrap().unwrap();
        assert_eq!(m.params["name"], "a b/c");
    }

    #[test]
    fn test_prefix_match_stops_at_boundary() {
        let m = match_path("/users", false, "/users/42").unwrap().unwrap();
        assert_eq!(m.path, "/users");

        assert!(match_path("/users", false, "/usersx").unwrap().is_none());
        assert!(match_path("/users", true, "/users/42").unwrap().is_none());
    }

    #[test]
    fn test_root_pattern() {
        let m = match_path("/", false, "/users/42").unwrap().unwrap();
        assert_eq!(m.path, "/");
        assert!(m.params.is_empty());

        assert!(match_path("/", true, "/").unwrap().is_some());
        assert!(match_path("/", true, "/users").unwrap().is_none());
    }

    #[test]
    fn test_trailing_slash_and_case() {
        let m = match_path("/users", true, "/users/").unwrap().unwrap();
        assert_eq!(m.path, "/users/");
        assert!(match_path("/users", true, "/USERS").unwrap().is_some());
    }

    #[test]
    fn test_optional_and_repeat() {
        let m = match_path("/posts/:id?", true, "/posts").unwrap().unwrap();
        assert!(m.params.is_empty());
        let m = match_path("/posts/:id?", true, "/posts/7").unwrap().unwrap();
        assert_eq!(m.params["id"], "7");

        let m = match_path("/docs/:path+", true, "/docs/a/b/c").unwrap().unwrap();
        assert_eq!(m.params["path"], "a/b/c");
        assert!(match_path("/docs/:path+", true, "/docs").unwrap().is_none());

        let m = match_path("/docs/:path*", true, "/docs").unwrap().unwrap();
        assert!(m.params.is_empty());
    }

    #[test]
    fn test_custom_and_unnamed_groups() {
        let m = match_path("/users/:id(\\d+)", true, "/users/42").unwrap().unwrap();
        assert_eq!(m.params["id"], "42");
        assert!(match_path("/users/:id(\\d+)", true, "/users/bob").unwrap().is_none());

        let m = match_path("/archive/(\\d+)/:slug", true, "/archive/2017/hello").unwrap().unwrap();
        assert_eq!(params(&m), vec![("0", "2017"), ("slug", "hello")]);
    }

    #[test]
    fn test_wildcards() {
        let m = match_path("*", true, "/anything/at/all").unwrap().unwrap();
        assert_eq!(m.params["0"], "/anything/at/all");

        let m = match_path("/files/*", true, "/files/a/b").unwrap().unwrap();
        assert_eq!(m.params["0"], "a/b");
    }

    #[test]
    fn test_escaped_characters() {
        let m = match_path("/time\\:now", true, "/time:now").unwrap();
        assert!(m.is_some());
        let compiled = compile("/time\\:now", true).unwrap();
        assert!(compiled.keys().is_empty());
    }

    #[test]
    fn test_cache_returns_same_matcher() {
        let a = compile("/cache/:id", true).unwrap();
        let b = compile("/cache/:id", true).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.match_path("/cache/1"), b.match_path("/cache/1"));

        let prefix = compile("/cache/:id", false).unwrap();
        assert!(!Arc::ptr_eq(&a, &prefix));
        assert!(!prefix.is_exact());
    }

    #[test]
    fn test_concurrent_compile_of_new_key() {
        let handles: Vec<_> = (0..16)
            .map(|_| std::thread::spawn(|| compile("/fresh/:slot", true).unwrap()))
            .collect();
        let matchers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let expected = matchers[0].match_path("/fresh/1");
        assert_eq!(expected.as_ref().map(|m| m.params["slot"].as_str()), Some("1"));
        for m in &matchers {
            assert_eq!(m.match_path("/fresh/1"), expected);
        }
        let cached = compile("/fresh/:slot", true).unwrap();
        assert!(matchers.iter().any(|m| Arc::ptr_eq(m, &cached)));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = compile("/bad/:id([)", true).unwrap_err();
        assert_eq!(err.pattern, "/bad/:id([)");
    }
}
