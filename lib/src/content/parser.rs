use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::store::{Data, Meta, TypeTag};

/// The priority of every built-in parser.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Converts the raw bytes of an item into a typed value.
///
/// A parser declares the file extensions and mime types it handles and a
/// priority; a [`ParserRegistry`](crate::content::ParserRegistry) picks the
/// highest-priority parser for an item's extension. Parsing must depend only
/// on `config`, `meta` and `bytes`.
pub trait Parser: Send + Sync + 'static {
    /// The type of value [`Parser::parse()`] produces.
    fn tag(&self) -> TypeTag;

    fn extensions(&self) -> &[Arc<str>];

    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn parse(&self, config: &Config, meta: &Meta, bytes: &[u8]) -> Result<Data>;

    /// Whether `ext` is one of [`Parser::extensions()`], ignoring ASCII case.
    fn handles(&self, ext: &str) -> bool {
        self.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// A [`Parser`] built from a function. See [`parser()`].
pub struct FnParser<T, F> {
    extensions: Vec<Arc<str>>,
    priority: i32,
    function: F,
    _value: PhantomData<fn() -> T>,
}

/// A parser producing `T`s with `function` for any of `extensions`, at
/// [`DEFAULT_PRIORITY`].
///
/// ```rust
/// use quire::content::{parser, Parser, ParserRegistry};
///
/// let shout = parser(&["txt"], |_, _, bytes| Ok(String::from_utf8_lossy(bytes).to_uppercase()))
///     .with_priority(20);
///
/// let mut registry = ParserRegistry::with_defaults();
/// registry.register("shout", shout).unwrap();
/// assert_eq!(registry.resolve("txt").unwrap().0, "shout");
/// ```
pub fn parser<T, F>(extensions: &[&str], function: F) -> FnParser<T, F>
    where T: Any + Send + Sync,
          F: Fn(&Config, &Meta, &[u8]) -> Result<T> + Send + Sync + 'static
{
    FnParser {
        extensions: extensions.iter().map(|&e| Arc::from(e)).collect(),
        priority: DEFAULT_PRIORITY,
        function,
        _value: PhantomData,
    }
}

impl<T, F> FnParser<T, F> {
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl<T, F> Parser for FnParser<T, F>
    where T: Any + Send + Sync,
          F: Fn(&Config, &Meta, &[u8]) -> Result<T> + Send + Sync + 'static
{
    fn tag(&self) -> TypeTag {
        TypeTag::of::<T>()
    }

    fn extensions(&self) -> &[Arc<str>] {
        &self.extensions
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn parse(&self, config: &Config, meta: &Meta, bytes: &[u8]) -> Result<Data> {
        (self.function)(config, meta, bytes).map(Data::new)
    }
}

impl fmt::Debug for dyn Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("tag", &self.tag())
            .field("extensions", &self.extensions())
            .field("priority", &self.priority())
            .finish()
    }
}
