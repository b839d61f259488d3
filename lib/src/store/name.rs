use std::fmt;
use std::sync::Arc;
use std::str::FromStr;

use crate::error::Error;

/// One segment of a [`Name`]: an opaque body and an optional index that
/// tells repeated siblings apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameToken {
    body: Arc<str>,
    index: Option<usize>,
}

/// A hierarchical key into a [`Tree`](crate::store::Tree).
///
/// The canonical string form joins tokens with `/` and writes an index as
/// `body[index]`. Characters that would be ambiguous in a body (`/`, `[`, `]`
/// and `\`) are escaped with a `\`.
///
/// ```rust
/// use quire::store::Name;
///
/// let name: Name = "docs/section[2]/intro.md".parse().unwrap();
/// assert_eq!(name.len(), 3);
/// assert_eq!(name.tokens()[1].index(), Some(2));
/// assert_eq!(name.to_string(), "docs/section[2]/intro.md");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Arc<[NameToken]>);

impl NameToken {
    pub fn new<B: Into<Arc<str>>>(body: B) -> Self {
        NameToken { body: body.into(), index: None }
    }

    pub fn indexed<B: Into<Arc<str>>>(body: B, index: usize) -> Self {
        NameToken { body: body.into(), index: Some(index) }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// A token with the same index and a new body.
    pub fn with_body<B: Into<Arc<str>>>(&self, body: B) -> Self {
        NameToken { body: body.into(), index: self.index }
    }
}

impl Name {
    pub fn empty() -> Self {
        Name::default()
    }

    pub fn tokens(&self) -> &[NameToken] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&NameToken> {
        self.0.last()
    }

    /// `self` followed by `other`.
    pub fn join(&self, other: &Name) -> Name {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => other.clone(),
            (_, true) => self.clone(),
            _ => self.0.iter().chain(other.0.iter()).cloned().collect(),
        }
    }

    /// `self` followed by `token`.
    pub fn child(&self, token: NameToken) -> Name {
        self.0.iter().cloned().chain(Some(token)).collect()
    }

    pub fn starts_with(&self, prefix: &Name) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// `self` without the leading `prefix`, if `self` starts with it.
    pub fn strip_prefix(&self, prefix: &Name) -> Option<Name> {
        self.0.strip_prefix(&*prefix.0).map(|rest| rest.iter().cloned().collect())
    }

    /// `self` with its final token replaced by `token`. An empty name stays
    /// empty.
    pub fn with_last(&self, token: NameToken) -> Name {
        match self.0.split_last() {
            Some((_, init)) => init.iter().cloned().chain(Some(token)).collect(),
            None => self.clone(),
        }
    }
}

impl Default for Name {
    fn default() -> Self {
        Name(Arc::from(Vec::new()))
    }
}

impl FromIterator<NameToken> for Name {
    fn from_iter<I: IntoIterator<Item = NameToken>>(iter: I) -> Self {
        Name(iter.into_iter().collect())
    }
}

impl From<NameToken> for Name {
    fn from(token: NameToken) -> Self {
        Name(Arc::from(vec![token]))
    }
}

impl From<&str> for NameToken {
    fn from(body: &str) -> Self {
        NameToken::new(body)
    }
}

impl From<String> for NameToken {
    fn from(body: String) -> Self {
        NameToken::new(body)
    }
}

impl fmt::Display for NameToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.body.chars() {
            if matches!(c, '\\' | '/' | '[' | ']') {
                f.write_str("\\")?;
            }

            write!(f, "{c}")?;
        }

        match self.index {
            Some(i) => write!(f, "[{i}]"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str("/")?;
            }

            token.fmt(f)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({self})")
    }
}

impl FromStr for NameToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut body = String::with_capacity(s.len());
        let mut chars = s.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => body.push(escaped),
                    None => return err!("dangling escape in name token", "token" => s),
                },
                '[' => {
                    let index = s[i + 1..].strip_suffix(']')
                        .and_then(|digits| digits.parse::<usize>().ok())
                        .ok_or_else(|| error!("invalid index in name token", "token" => s))?;

                    return Ok(NameToken::indexed(body, index));
                }
                ']' | '/' => return err!(format!("unescaped `{c}` in name token"), "token" => s),
                c => body.push(c),
            }
        }

        Ok(NameToken::new(body))
    }
}

impl FromStr for Name {
    type Err = Error;

    /// Parses the canonical form. Empty segments are ignored, so `""` is the
    /// empty name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = vec![];
        let mut start = 0;
        let mut escaped = false;
        for (i, c) in s.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '/' => {
                    segments.push(&s[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }

        segments.push(&s[start..]);
        segments.into_iter()
            .filter(|segment| !segment.is_empty())
            .map(NameToken::from_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn round_trips_through_canonical_form() {
        let tokens = vec![NameToken::new("a"), NameToken::indexed("b", 2), NameToken::new("c")];
        let original = tokens.into_iter().collect::<Name>();
        assert_eq!(original.to_string(), "a/b[2]/c");
        assert_eq!(name(&original.to_string()), original);
    }

    #[test]
    fn escapes_reserved_characters() {
        let original = Name::from(NameToken::indexed("x/y[1]\\z", 7));
        let string = original.to_string();
        assert_eq!(string, "x\\/y\\[1\\]\\\\z[7]");
        assert_eq!(name(&string), original);
    }

    #[test]
    fn dots_stay_in_bodies() {
        let parsed = name("chapter/main.md");
        assert_eq!(parsed.tokens(), &[NameToken::new("chapter"), NameToken::new("main.md")]);
    }

    #[test]
    fn prefixes() {
        let full = name("x/y/z");
        assert!(full.starts_with(&name("x/y")));
        assert!(full.starts_with(&Name::empty()));
        assert!(!full.starts_with(&name("x/z")));
        assert_eq!(full.strip_prefix(&name("x")), Some(name("y/z")));
        assert_eq!(full.strip_prefix(&name("y")), None);
        assert_eq!(name("x").join(&Name::empty()), name("x"));
        assert_eq!(Name::empty().join(&name("x")), name("x"));
        assert_eq!(full.with_last(NameToken::new("w")), name("x/y/w"));
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!("a/b[".parse::<Name>().is_err());
        assert!("a/b[x]".parse::<Name>().is_err());
        assert!("a/b[1]c".parse::<Name>().is_err());
        assert!("a/b]".parse::<Name>().is_err());
        assert!("a\\".parse::<Name>().is_err());
    }
}
