use std::borrow::Cow;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::error::{Fault, Result};
use crate::store::Meta;
use crate::util::has_substitution;
use crate::value::Value;

/// Rewrites an item's text before it is parsed.
///
/// Processors see one item at a time and must not depend on the order in
/// which items are processed.
pub trait TextProcessor: Send + Sync + 'static {
    fn process(&self, config: &Config, meta: &Meta, text: &str) -> Result<String>;
}

impl<F> TextProcessor for F
    where F: Fn(&Config, &Meta, &str) -> Result<String> + Send + Sync + 'static
{
    fn process(&self, config: &Config, meta: &Meta, text: &str) -> Result<String> {
        self(config, meta, text)
    }
}

/// Text processors keyed by name.
#[derive(Default, Clone)]
pub struct Processors {
    processors: FxHashMap<Arc<str>, Arc<dyn TextProcessor>>,
}

impl Processors {
    pub fn new() -> Self {
        Processors::default()
    }

    /// The built-in processors: `vars`.
    pub fn with_defaults() -> Self {
        let mut processors = Processors::new();
        processors.processors.insert("vars".into(), Arc::new(Vars));
        processors
    }

    /// Registers `processor` as `name`. Fails with
    /// [`Fault::DuplicateParserId`] if `name` is taken.
    pub fn register<N, P>(&mut self, name: N, processor: P) -> Result<()>
        where N: Into<Arc<str>>, P: TextProcessor
    {
        let name = name.into();
        if self.processors.contains_key(&name) {
            return Err(Fault::DuplicateParserId(name.to_string()).into());
        }

        self.processors.insert(name, Arc::new(processor));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TextProcessor>> {
        self.processors.get(name)
    }

    /// The processor named by a `transformation` metadata value: either a
    /// string or a dictionary with a string `name`.
    pub fn resolve(&self, transformation: &Value) -> Result<&Arc<dyn TextProcessor>> {
        let name = transformation.as_str()
            .or_else(|| transformation.as_dict()?.get("name")?.as_str())
            .ok_or_else(|| error! {
                "transformation name is not defined",
                "transformation" => format!("{transformation:?}"),
            })?;

        self.get(name).ok_or_else(|| Fault::NotFound { name: name.into() }.into())
    }
}

impl std::fmt::Debug for Processors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = self.processors.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_set().entries(names).finish()
    }
}

/// Replaces `${key}` with the value of `key` in [`Config::vars`]. Dotted keys
/// reach into nested dictionaries. Unknown keys are left as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vars;

impl TextProcessor for Vars {
    fn process(&self, config: &Config, _: &Meta, text: &str) -> Result<String> {
        static VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([\w.]+)\}").unwrap());

        if !has_substitution(text) {
            return Ok(text.to_string());
        }

        let replaced = VAR.replace_all(text, |captures: &Captures<'_>| {
            let key = &captures[1];
            let (head, rest) = key.split_once('.').map_or((key, None), |(h, r)| (h, Some(r)));
            let value = config.vars.get(head).and_then(|value| match rest {
                Some(rest) => value.lookup(rest),
                None => Some(value),
            });

            match value {
                Some(value) => display(value).into_owned(),
                None => captures[0].to_string(),
            }
        });

        Ok(replaced.into_owned())
    }
}

fn display(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::String(s) => Cow::Borrowed(s),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Num(n) => match n.integer() {
            Some(Ok(v)) => Cow::Owned(v.to_string()),
            Some(Err(v)) => Cow::Owned(v.to_string()),
            None => Cow::Owned(n.to_f64().to_string()),
        },
        Value::Array(_) | Value::Dict(_) => {
            Cow::Owned(serde_json::to_string(value).unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dict, meta};

    fn config() -> Config {
        Config {
            vars: dict!["title" => "Quire", "n" => 3u8, "site" => dict!["url" => "https://x.y"]],
            ..Config::default()
        }
    }

    #[test]
    fn vars_substitutes_known_keys() {
        let text = "${title} has ${n} parts at ${site.url}; ${missing} and $title stay.";
        let out = Vars.process(&config(), &meta![], text).unwrap();
        assert_eq!(out, "Quire has 3 parts at https://x.y; ${missing} and $title stay.");
    }

    #[test]
    fn resolves_by_string_or_dict() {
        let processors = Processors::with_defaults();
        assert!(processors.resolve(&Value::from("vars")).is_ok());
        assert!(processors.resolve(&Value::from(dict!["name" => "vars"])).is_ok());
        assert!(processors.resolve(&Value::from(5u8)).is_err());

        let error = processors.resolve(&Value::from("nope")).err().unwrap();
        assert!(error.is_not_found());
    }

    #[test]
    fn custom_processors() {
        let mut processors = Processors::with_defaults();
        let upper = |_: &Config, _: &Meta, text: &str| Ok::<_, crate::error::Error>(text.to_uppercase());
        processors.register("upper", upper).unwrap();

        let error = processors.register("vars", upper).unwrap_err();
        assert_eq!(error.fault(), Some(&Fault::DuplicateParserId("vars".into())));

        let upper = processors.resolve(&Value::from("upper")).unwrap();
        assert_eq!(upper.process(&config(), &meta![], "abc").unwrap(), "ABC");
    }
}
