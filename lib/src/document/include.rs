use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Fault, Result};

/// Finds the file references named by include directives in a text element.
pub trait IncludeExtractor: Send + Sync {
    /// The referenced paths, in order, or an empty list if `text` holds no
    /// directive.
    fn extract(&self, text: &str) -> Result<Vec<String>>;
}

/// The built-in [`IncludeExtractor`].
///
/// A text whose trimmed value starts with `include(` or `@include(`
/// (ignoring case) must consist only of whitespace-separated directives. A
/// directive's path may be wrapped in double quotes.
///
/// ```rust
/// use quire::document::{Directives, IncludeExtractor};
///
/// let paths = Directives.extract(r#"include("a.md") @INCLUDE(b/c.md)"#).unwrap();
/// assert_eq!(paths, ["a.md", "b/c.md"]);
///
/// assert!(Directives.extract("Just some text.").unwrap().is_empty());
/// assert!(Directives.extract("include(a.md) and more").is_err());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Directives;

static START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^@?include\(").unwrap());

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^@?include\(\s*(?:"([^"]+)"|([^\s()"]+))\s*\)"#).unwrap()
});

static ANYWHERE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\binclude\(").unwrap());

impl IncludeExtractor for Directives {
    fn extract(&self, text: &str) -> Result<Vec<String>> {
        let mut rest = text.trim();
        if !START.is_match(rest) {
            if ANYWHERE.is_match(rest) {
                tracing::debug!(%text, "ignoring include directive that doesn't start its text");
            }

            return Ok(vec![]);
        }

        let mut paths = vec![];
        while !rest.is_empty() {
            let Some(captures) = DIRECTIVE.captures(rest) else {
                return Err(Fault::IllFormedInclude(text.trim().to_string()).into());
            };

            let path = captures.get(1).or_else(|| captures.get(2)).map_or("", |m| m.as_str());
            paths.push(path.trim().to_string());
            rest = rest[captures.get(0).map_or(rest.len(), |m| m.end())..].trim_start();
        }

        Ok(paths)
    }
}
