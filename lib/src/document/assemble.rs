use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::document::{convert, CommonMark, DependencyGraph, Directives, Edge, Element, GraphBuilder};
use crate::document::{HtmlRenderer, IncludeExtractor, Kind, MarkdownParser, MarkdownRenderer, Renderer};
use crate::error::{Chainable, Result, Stage};
use crate::store::Tree;

/// What [`DocumentBuilder::build_document()`] produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// An HTML fragment, rendered in-process.
    Html,
    /// CommonMark text, rendered in-process.
    Markdown,
    /// Any format the external converter knows, such as `latex`.
    Converted(String),
}

impl Target {
    /// `html` and `md`/`markdown` are rendered in-process; anything else is
    /// handed to the converter.
    pub fn from_format(format: &str) -> Target {
        match format.to_ascii_lowercase().as_str() {
            "html" => Target::Html,
            "md" | "markdown" | "commonmark" => Target::Markdown,
            _ => Target::Converted(format.to_string()),
        }
    }
}

/// An assembled document: every include replaced by the document it names.
#[derive(Debug, Clone)]
pub struct Document {
    pub graph: DependencyGraph,
    pub root: Element,
}

/// Assembles documents from the raw markdown files in a store.
#[derive(Clone)]
pub struct DocumentBuilder {
    config: Config,
    markdown: Arc<dyn MarkdownParser>,
    extractor: Arc<dyn IncludeExtractor>,
}

impl DocumentBuilder {
    pub fn new(config: Config) -> Self {
        DocumentBuilder { config, markdown: Arc::new(CommonMark), extractor: Arc::new(Directives) }
    }

    pub fn with_markdown_parser(mut self, parser: Arc<dyn MarkdownParser>) -> Self {
        self.markdown = parser;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn IncludeExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self, tree: &Tree, path: &str) -> Result<DependencyGraph> {
        GraphBuilder::new(tree, &self.config)
            .with_markdown_parser(self.markdown.clone())
            .with_extractor(self.extractor.clone())
            .build(path)
    }

    /// Builds the graph rooted at `path` and merges every document into the
    /// root document.
    pub fn assemble(&self, tree: &Tree, path: &str) -> Result<Document> {
        let graph = self.graph(tree, path)?;
        let root = assemble(&graph).chain_with(|| error! {
            "failed to assemble document",
            "stage" => Stage::Graph,
            "path" => graph.root(),
        })?;

        Ok(Document { graph, root })
    }

    /// Assembles the document at `path` and serializes it as `target`.
    pub fn build_document(&self, tree: &Tree, path: &str, target: &Target) -> Result<String> {
        let document = self.assemble(tree, path)?;
        let output = match target {
            Target::Html => HtmlRenderer.render(&document.root),
            Target::Markdown => MarkdownRenderer.render(&document.root),
            Target::Converted(format) => MarkdownRenderer.render(&document.root)
                .and_then(|markdown| convert(&self.config.converter, &markdown, format)),
        };

        output.chain_with(|| error! {
            "failed to render document",
            "stage" => Stage::Render,
            "path" => document.graph.root(),
        })
    }
}

/// The root document of `graph` with every include replaced, recursively,
/// by the top-level elements of the documents it names.
pub fn assemble(graph: &DependencyGraph) -> Result<Element> {
    let mut assembly = Assembly { graph, done: FxHashMap::default() };
    let root = assembly.document(graph.root())?;
    Ok(Arc::unwrap_or_clone(root))
}

struct Assembly<'g> {
    graph: &'g DependencyGraph,
    done: FxHashMap<Arc<str>, Arc<Element>>,
}

impl Assembly<'_> {
    fn document(&mut self, path: &str) -> Result<Arc<Element>> {
        if let Some(done) = self.done.get(path) {
            return Ok(done.clone());
        }

        let node = self.graph.fetch(path)?.clone();
        let mut root = node.root.clone();

        // Later edges first: splicing never moves an element that precedes
        // it in pre-order.
        for edge in node.edges.iter().rev() {
            let mut replacement = vec![];
            for include in &edge.includes {
                let included = self.document(include)?;
                replacement.extend(included.children.iter().cloned());
            }

            splice(&mut root, edge, replacement).chain_with(|| error! {
                "include does not match its document",
                "path" => path,
                "address" => format!("{:?}", edge.parent),
            })?;
        }

        let root = Arc::new(root);
        self.done.insert(node.path.clone(), root.clone());
        Ok(root)
    }
}

/// Replaces the directive text of `edge` with `replacement`. A paragraph
/// holding nothing but the directive is replaced as a whole.
fn splice(root: &mut Element, edge: &Edge, replacement: Vec<Element>) -> Result<()> {
    let Some(parent) = root.get(&edge.parent) else {
        return err!("missing parent element");
    };

    if parent.children.get(edge.child).and_then(|c| c.text()).is_none() {
        return err!("missing directive text", "index" => edge.child);
    }

    let alone = parent.kind == Kind::Paragraph && parent.children.len() == 1;
    if let (true, Some((&index, above))) = (alone, edge.parent.split_last()) {
        if let Some(grandparent) = root.get_mut(above) {
            grandparent.children.splice(index..=index, replacement);
            return Ok(());
        }
    }

    let Some(parent) = root.get_mut(&edge.parent) else {
        return err!("missing parent element");
    };

    let replacement = match holds_inline(&parent.kind) {
        true => inline(replacement),
        false => replacement,
    };

    parent.children.splice(edge.child..=edge.child, replacement);
    Ok(())
}

fn holds_inline(kind: &Kind) -> bool {
    matches!(kind,
        Kind::Paragraph | Kind::Heading { .. } | Kind::Emphasis | Kind::Strong
        | Kind::Delete | Kind::Link { .. } | Kind::ListItem)
}

/// Unwraps paragraphs so their content fits in an inline context or a
/// tight list item.
fn inline(blocks: Vec<Element>) -> Vec<Element> {
    let mut inlines = vec![];
    for block in blocks {
        if !inlines.is_empty() {
            inlines.push(Element::new(Kind::Text { value: "\n".into() }));
        }

        match block.kind {
            Kind::Paragraph => inlines.extend(block.children),
            _ => inlines.push(block),
        }
    }

    inlines
}
