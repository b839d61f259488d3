use std::borrow::Cow;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::config::Config;
use crate::content::{parsers, Parser, ParserRegistry, Processors};
use crate::error::{Fault, Result};
use crate::store::{Binary, Data, Extension, Item, Meta, MetaKey, Name, SourcePath, Transformation, Tree};
use crate::util::split_extension;
use crate::value::Value;

/// Preprocesses, parses and renames every item of a tree.
///
/// Running a pipeline never touches the input tree or forces its values: it
/// returns a new tree whose items compute, on demand, the parsed value of
/// the corresponding input item.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Arc<Config>,
    parsers: Arc<ParserRegistry>,
    processors: Arc<Processors>,
    prefetch: bool,
}

impl Pipeline {
    pub fn new(config: Config, parsers: ParserRegistry, processors: Processors) -> Self {
        Pipeline {
            config: Arc::new(config),
            parsers: Arc::new(parsers),
            processors: Arc::new(processors),
            prefetch: true,
        }
    }

    /// A pipeline with the built-in parsers and processors.
    pub fn with_defaults(config: Config) -> Self {
        Pipeline::new(config, ParserRegistry::with_defaults(), Processors::with_defaults())
    }

    /// Whether [`Pipeline::run()`] starts computing values in the background.
    /// Enabled by default.
    pub fn prefetch(mut self, prefetch: bool) -> Self {
        self.prefetch = prefetch;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    /// Runs every leaf of `tree` through the pipeline.
    ///
    /// An item keeps its original name if its new name is, or leads to, a
    /// name in `tree`, or if an earlier item was already renamed to it.
    pub fn run(&self, tree: &Tree) -> Result<Tree> {
        let mut taken = FxHashSet::default();
        for (name, _) in tree.iter() {
            for len in 1..=name.len() {
                taken.insert(name.tokens()[..len].iter().cloned().collect::<Name>());
            }
        }

        let mut output = Tree::empty();
        for (name, item) in tree.iter() {
            let (renamed, item) = self.process(&name, item);
            if self.prefetch {
                item.value().force_in_background();
            }

            if renamed == name {
                output.insert(&name, item)?;
                continue;
            }

            if taken.contains(&renamed) {
                tracing::warn!(%name, %renamed, "renamed item collides with an existing name; keeping its name");
                output.insert(&name, item)?;
                continue;
            }

            match output.insert(&renamed, item.clone()) {
                Ok(()) => {}
                Err(e) if matches!(e.fault(), Some(Fault::DuplicatePath(_))) => {
                    tracing::warn!(%name, %renamed, "renamed item collides with another; keeping its name");
                    output.insert(&name, item)?;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(output)
    }

    /// The new name and item for the item `name`.
    pub fn process(&self, name: &Name, item: &Item) -> (Name, Item) {
        let meta = item.meta().clone();
        let ext = extension(name, &meta);
        let renamed = self.rename(name);

        let (id, parser) = match ext.as_deref().and_then(|ext| self.parsers.resolve(ext)) {
            Some((id, parser)) => (Arc::<str>::from(id), parser.clone()),
            None => {
                tracing::debug!(%name, ext = ?ext, "no parser is registered; passing bytes through");
                (Arc::from("binary"), parsers::raw_bytes())
            }
        };

        let stage = Stage {
            name: name.clone(),
            parser_id: id,
            parser,
            config: self.config.clone(),
            processors: self.processors.clone(),
            meta: meta.clone(),
        };

        let value = item.value().then(move |data| Ok(stage.apply(data)));
        (renamed, Item::new(meta, value))
    }

    /// `name` with a stripped extension if its final token ends in one of
    /// [`Config::strip_extensions`].
    pub fn rename(&self, name: &Name) -> Name {
        let Some(last) = name.last() else {
            return name.clone();
        };

        match split_extension(last.body()) {
            (stem, Some(ext)) if self.config.strips(ext) => name.with_last(last.with_body(stem)),
            _ => name.clone(),
        }
    }
}

/// The extension (or mime type) that selects the parser for an item: its
/// `extension` metadata, else the extension of its `path` metadata, else the
/// extension of its name's final token.
pub fn extension(name: &Name, meta: &Meta) -> Option<Arc<str>> {
    if let Some(Ok(ext)) = meta.get(Extension) {
        return Some(ext);
    }

    if let Some(Ok(path)) = meta.get(SourcePath) {
        let file_name = path.rsplit('/').next().unwrap_or_default();
        return split_extension(file_name).1.map(Arc::from);
    }

    split_extension(name.last()?.body()).1.map(Arc::from)
}

/// Everything needed to compute one item's parsed value.
struct Stage {
    name: Name,
    parser_id: Arc<str>,
    parser: Arc<dyn Parser>,
    config: Arc<Config>,
    processors: Arc<Processors>,
    meta: Meta,
}

impl Stage {
    fn apply(&self, data: &Data) -> Data {
        let Some(raw) = data.downcast_ref::<Binary>() else {
            return data.clone();
        };

        match self.try_apply(raw) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(name = %self.name, parser = %self.parser_id, "failed to parse item; keeping raw bytes:\n{e}");
                data.clone()
            }
        }
    }

    fn try_apply(&self, raw: &Binary) -> Result<Data> {
        let bytes = match self.meta.get_raw(Transformation::KEY) {
            Some(transformation) => Cow::Owned(self.preprocess(transformation, raw)?.into_bytes()),
            None => Cow::Borrowed(&raw[..]),
        };

        self.parser.parse(&self.config, &self.meta, &bytes)
    }

    fn preprocess(&self, transformation: &Value, raw: &Binary) -> Result<String> {
        let text = std::str::from_utf8(raw)?;
        let processor = self.processors.resolve(transformation)?;
        processor.process(&self.config, &self.meta, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{parser, Html};
    use crate::{dict, meta};

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn file(path: &str, contents: &str) -> Item {
        let ext = split_extension(path).1.unwrap_or_default();
        Item::ready(meta!["path" => path, "extension" => ext], Binary::from(contents.as_bytes()))
    }

    fn pipeline() -> Pipeline {
        Pipeline::with_defaults(Config::default()).prefetch(false)
    }

    fn html(tree: &Tree, at: &str) -> String {
        tree.item(&name(at)).unwrap().read::<Html>().unwrap().to_string()
    }

    #[test]
    fn parses_and_renames() {
        let mut input = Tree::empty();
        input.insert(&name("index.md"), file("index.md", "# Hi")).unwrap();
        input.insert(&name("data/site.yaml"), file("data/site.yaml", "title: x")).unwrap();
        input.insert(&name("style.css"), file("style.css", "a {}")).unwrap();

        let output = pipeline().run(&input).unwrap();
        let names = output.iter().map(|(name, _)| name.to_string()).collect::<Vec<_>>();
        assert_eq!(names, ["index", "data/site", "style.css"]);

        assert_eq!(html(&output, "index"), "<div><h1>Hi</h1>\n</div>");
        let site = output.item(&name("data/site")).unwrap().read::<Meta>().unwrap();
        assert_eq!(site.get_raw("title"), Some(&Value::from("x")));
        assert!(output.item(&name("style.css")).unwrap().is::<Binary>());
    }

    #[test]
    fn pipeline_is_lazy_and_leaves_input_alone() {
        let mut input = Tree::empty();
        input.insert(&name("a.md"), Item::lazy(meta![], || Ok(Binary::from(&b"*a*"[..])))).unwrap();

        let output = pipeline().run(&input).unwrap();
        let source = input.item(&name("a.md")).unwrap();
        let parsed = output.item(&name("a")).unwrap();
        assert!(!source.value().is_computed());
        assert!(!parsed.value().is_computed());

        assert_eq!(html(&output, "a"), "<div><p><em>a</em></p>\n</div>");
        assert!(source.is::<Binary>());
    }

    #[test]
    fn unknown_extensions_fall_back_to_raw_bytes() {
        let mut input = Tree::empty();
        input.insert(&name("blob.xyz123"), file("blob.xyz123", "raw")).unwrap();
        input.insert(&name("README"), Item::ready(meta![], Binary::from(&b"hi"[..]))).unwrap();

        let output = pipeline().run(&input).unwrap();
        let blob = output.item(&name("blob.xyz123")).unwrap();
        assert_eq!(&blob.read::<Binary>().unwrap()[..], b"raw");
        assert!(output.item(&name("README")).unwrap().is::<Binary>());
    }

    #[test]
    fn parse_failures_are_isolated() {
        let mut input = Tree::empty();
        input.insert(&name("bad.json"), file("bad.json", "{ nope")).unwrap();
        input.insert(&name("good.json"), file("good.json", r#"{"ok": true}"#)).unwrap();

        let output = pipeline().run(&input).unwrap();
        let bad = output.item(&name("bad")).unwrap();
        assert_eq!(&bad.read::<Binary>().unwrap()[..], b"{ nope");
        assert!(output.item(&name("good")).unwrap().is::<Meta>());
    }

    #[test]
    fn transformations_run_before_parsing() {
        let config = Config { vars: dict!["who" => "world"], ..Config::default() };
        let item = Item::ready(
            meta!["extension" => "md", "transformation" => "vars"],
            Binary::from(&b"Hello ${who}"[..]),
        );

        let unknown = Item::ready(
            meta!["extension" => "md", "transformation" => dict!["name" => "missing"]],
            Binary::from(&b"Hello ${who}"[..]),
        );

        let mut input = Tree::empty();
        input.insert(&name("greet.md"), item).unwrap();
        input.insert(&name("other.md"), unknown).unwrap();

        let output = Pipeline::with_defaults(config).run(&input).unwrap();
        assert_eq!(html(&output, "greet"), "<div><p>Hello world</p>\n</div>");

        let other = output.item(&name("other")).unwrap();
        assert_eq!(&other.read::<Binary>().unwrap()[..], b"Hello ${who}");
        assert_eq!(other.meta().get_raw("transformation"), Some(&Value::from(dict!["name" => "missing"])));
    }

    #[test]
    fn metadata_extension_wins_over_the_name() {
        let item = Item::ready(meta!["extension" => "html"], Binary::from(&b"<i>x</i>"[..]));
        let mut input = Tree::empty();
        input.insert(&name("page.txt"), item).unwrap();

        let output = pipeline().run(&input).unwrap();
        assert_eq!(html(&output, "page.txt"), "<div><i>x</i></div>");
    }

    #[test]
    fn colliding_renames_keep_their_names() {
        let mut input = Tree::empty();
        input.insert(&name("a.md"), file("a.md", "md")).unwrap();
        input.insert(&name("a.html"), file("a.html", "html")).unwrap();

        let output = pipeline().run(&input).unwrap();
        assert_eq!(html(&output, "a"), "<div><p>md</p>\n</div>");
        assert_eq!(html(&output, "a.html"), "<div>html</div>");
    }

    #[test]
    fn renames_never_displace_existing_names() {
        let mut input = Tree::empty();
        input.insert(&name("a.md"), file("a.md", "md")).unwrap();
        input.insert(&name("a"), Item::ready(meta![], Binary::from(&b"plain"[..]))).unwrap();
        input.insert(&name("b.md"), file("b.md", "b")).unwrap();
        input.insert(&name("b/x.md"), file("b/x.md", "x")).unwrap();
        input.insert(&name("other.md"), file("other.md", "other")).unwrap();

        let output = pipeline().run(&input).unwrap();
        let names = output.iter().map(|(name, _)| name.to_string()).collect::<Vec<_>>();
        assert_eq!(names, ["a.md", "a", "b.md", "b/x", "other"]);

        assert_eq!(html(&output, "a.md"), "<div><p>md</p>\n</div>");
        assert_eq!(&output.item(&name("a")).unwrap().read::<Binary>().unwrap()[..], b"plain");
        assert_eq!(html(&output, "b.md"), "<div><p>b</p>\n</div>");
        assert_eq!(html(&output, "other"), "<div><p>other</p>\n</div>");
    }

    #[test]
    fn registered_parsers_take_priority() {
        let mut parsers = ParserRegistry::with_defaults();
        let shout = parser(&["md"], |_, _, bytes| Ok(String::from_utf8_lossy(bytes).to_uppercase()));
        parsers.register("shout", shout.with_priority(20)).unwrap();

        let mut input = Tree::empty();
        input.insert(&name("x.md"), file("x.md", "quiet")).unwrap();

        let pipeline = Pipeline::new(Config::default(), parsers, Processors::new());
        let output = pipeline.run(&input).unwrap();
        assert_eq!(*output.item(&name("x")).unwrap().read::<String>().unwrap(), "QUIET");
    }

    #[test]
    fn already_typed_values_pass_through() {
        let mut input = Tree::empty();
        input.insert(&name("note.md"), Item::ready(meta![], String::from("typed"))).unwrap();

        let output = pipeline().run(&input).unwrap();
        assert_eq!(*output.item(&name("note")).unwrap().read::<String>().unwrap(), "typed");
    }
}
