use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::content::Parser;
use crate::error::{Fault, Result};

/// Parsers keyed by a short, unique id.
///
/// Dispatch never depends on registration order: [`ParserRegistry::resolve()`]
/// picks the highest priority and, among equal priorities, the smallest id.
#[derive(Default, Clone)]
pub struct ParserRegistry {
    parsers: FxHashMap<Arc<str>, Arc<dyn Parser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        ParserRegistry::default()
    }

    /// A registry holding the built-in parsers. See
    /// [`parsers`](crate::content::parsers).
    pub fn with_defaults() -> Self {
        let parsers = crate::content::parsers::defaults()
            .into_iter()
            .map(|(id, parser)| (Arc::from(id), parser))
            .collect();

        ParserRegistry { parsers }
    }

    /// Registers `parser` under `id`. Fails with
    /// [`Fault::DuplicateParserId`] if `id` is taken.
    pub fn register<I, P>(&mut self, id: I, parser: P) -> Result<()>
        where I: Into<Arc<str>>, P: Parser
    {
        self.register_arc(id, Arc::new(parser))
    }

    pub fn register_arc<I>(&mut self, id: I, parser: Arc<dyn Parser>) -> Result<()>
        where I: Into<Arc<str>>
    {
        let id = id.into();
        if self.parsers.contains_key(&id) {
            return Err(Fault::DuplicateParserId(id.to_string()).into());
        }

        tracing::trace!(%id, priority = parser.priority(), "registered parser");
        self.parsers.insert(id, parser);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Parser>> {
        self.parsers.get(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids = self.parsers.keys().map(|id| &**id).collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// The id and parser of the highest-priority parser handling `ext`, a
    /// file extension or mime type.
    pub fn resolve(&self, ext: &str) -> Option<(&str, &Arc<dyn Parser>)> {
        self.parsers.iter()
            .filter(|(_, parser)| parser.handles(ext))
            .max_by(|(id_a, a), (id_b, b)| {
                a.priority().cmp(&b.priority()).then_with(|| id_b.cmp(id_a))
            })
            .map(|(id, parser)| (&**id, parser))
    }

    /// Like [`ParserRegistry::resolve()`] but fails with
    /// [`Fault::UnresolvedParser`].
    pub fn fetch(&self, ext: &str) -> Result<(&str, &Arc<dyn Parser>)> {
        self.resolve(ext).ok_or_else(|| Fault::UnresolvedParser(ext.to_string()).into())
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.ids().into_iter().filter_map(|id| Some((id, self.get(id)?))))
            .finish()
    }
}
