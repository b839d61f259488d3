use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Deserialize};

use crate::value::{Dict, Value};

pub trait MetaKey: 'static {
    const KEY: &'static str;

    type Value: TryFrom<Value> + Into<Value> + fmt::Debug;
}

#[macro_export]
macro_rules! define_meta_key {
    ($($(#[$attr:meta])* $v:vis $T:ident : $key:literal => $V:ty),+ $(,)?) => {
        $(
            $(#[$attr])*
            $v struct $T;

            impl $crate::store::MetaKey for $T {
                const KEY: &'static str = $key;
                type Value = $V;
            }
        )+
    }
}

define_meta_key! {
    /// The `/`-separated path of the file an item was read from.
    pub SourcePath : "path" => Arc<str>,
    /// The extension (or mime type) used to pick the item's parser.
    pub Extension : "extension" => Arc<str>,
    /// The text processor to run before parsing: a name, or a dict with a
    /// `name` field.
    pub Transformation : "transformation" => Value,
}

/// An item's metadata: an immutable dictionary.
///
/// Updates never happen in place. [`Meta::with()`] and [`Meta::merged()`]
/// return new metadata and leave every other holder's view unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meta(Arc<Dict>);

impl Meta {
    pub fn new() -> Self {
        Meta::default()
    }

    #[inline(always)]
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Looks up a `.`-separated path through nested dictionaries.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        let value = self.get_raw(head)?;
        match rest {
            Some(rest) => value.lookup(rest),
            None => Some(value),
        }
    }

    #[inline]
    pub fn get<K: MetaKey>(&self, _: K) -> Option<Result<K::Value, Value>> {
        let value = self.get_raw(K::KEY)?;
        Some(value.clone().try_into().map_err(|_| value.clone()))
    }

    #[inline(always)]
    pub fn contains<K: MetaKey>(&self, _: K) -> bool {
        self.contains_key(K::KEY)
    }

    #[inline(always)]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(|k| &**k)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_dict(&self) -> &Dict {
        &self.0
    }

    /// A copy of `self` with `key` set to `value`.
    pub fn with<K: MetaKey, V: Into<K::Value>>(&self, _: K, value: V) -> Meta {
        let value: K::Value = value.into();
        self.with_raw(K::KEY, Into::<Value>::into(value))
    }

    /// A copy of `self` with `key` set to `value`.
    pub fn with_raw<K, V>(&self, key: K, value: V) -> Meta
        where K: Into<Arc<str>>, V: Into<Value>
    {
        let mut dict = (*self.0).clone();
        dict.insert(key.into(), value.into());
        Meta(Arc::new(dict))
    }

    /// A copy of `self` where every top-level entry in `other` replaces the
    /// entry of the same key.
    pub fn merged(&self, other: &Meta) -> Meta {
        match (self.is_empty(), other.is_empty()) {
            (_, true) => self.clone(),
            (true, _) => other.clone(),
            _ => {
                let mut dict = (*self.0).clone();
                dict.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
                Meta(Arc::new(dict))
            }
        }
    }
}

impl From<Dict> for Meta {
    fn from(dict: Dict) -> Self {
        Meta(Arc::new(dict))
    }
}

impl From<Arc<Dict>> for Meta {
    fn from(dict: Arc<Dict>) -> Self {
        Meta(dict)
    }
}

impl From<Meta> for Value {
    fn from(meta: Meta) -> Self {
        Value::Dict(meta.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dict, meta};

    #[test]
    fn with_leaves_the_original_untouched() {
        let original = meta!["title" => "A"];
        let updated = original.with(SourcePath, "a/b.md");

        assert!(!original.contains(SourcePath));
        assert_eq!(updated.get(SourcePath).unwrap().unwrap().as_ref(), "a/b.md");
        assert_eq!(updated.get_raw("title"), original.get_raw("title"));
    }

    #[test]
    fn nested_lookup() {
        let meta = meta!["transformation" => dict!["name" => "vars", "depth" => 2u8]];
        assert_eq!(meta.lookup("transformation.name"), Some(&Value::from("vars")));
        assert_eq!(meta.lookup("transformation.missing"), None);
        assert_eq!(meta.lookup("missing.name"), None);
    }

    #[test]
    fn untyped_keys_read_any_value() {
        let empty = meta![];
        assert!(empty.get(Transformation).is_none());

        let meta = meta!["transformation" => dict!["name" => "vars"]];
        let value = meta.get(Transformation).unwrap().unwrap();
        assert_eq!(value.as_dict().and_then(|d| d.get("name")), Some(&Value::from("vars")));
        assert!(meta!["path" => 3u8].get(SourcePath).unwrap().is_err());
    }

    #[test]
    fn merge_prefers_the_argument() {
        let base = meta!["a" => 1u8, "b" => 2u8];
        let merged = base.merged(&meta!["b" => 3u8, "c" => 4u8]);
        assert_eq!(merged, meta!["a" => 1u8, "b" => 3u8, "c" => 4u8]);
    }

    #[test]
    fn typed_access_reports_mismatches() {
        let meta = meta!["path" => 5u8];
        assert_eq!(meta.get(SourcePath), Some(Err(Value::from(5u8))));
        assert_eq!(meta.get(Extension), None);
    }
}
