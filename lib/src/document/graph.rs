use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::Config;
use crate::document::{CommonMark, Directives, Element, IncludeExtractor, MarkdownParser};
use crate::error::{Chainable, Fault, Result, Stage};
use crate::store::{Binary, Name, NameToken, Tree};
use crate::util::{join_relative, parent_dir};

/// A text element holding include directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// The address, from the document root, of the element containing the
    /// directive text.
    pub parent: Vec<usize>,
    /// The index of the directive text within `parent`.
    pub child: usize,
    /// The references as written.
    pub references: Vec<String>,
    /// The document path each reference resolves to.
    pub includes: Vec<Arc<str>>,
}

/// One parsed document and the includes found in it.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub path: Arc<str>,
    pub root: Element,
    pub edges: Vec<Edge>,
}

impl GraphNode {
    /// Every document this one includes, deduplicated, in the order the
    /// includes appear.
    pub fn dependencies(&self) -> Vec<&Arc<str>> {
        let mut seen = FxHashSet::default();
        self.edges.iter()
            .flat_map(|edge| edge.includes.iter())
            .filter(|path| seen.insert(path.clone()))
            .collect()
    }
}

/// Every document reachable from a root document, keyed by path.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    root: Arc<str>,
    nodes: FxHashMap<Arc<str>, Arc<GraphNode>>,
}

impl DependencyGraph {
    /// The path of the root document.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn root_node(&self) -> Result<&Arc<GraphNode>> {
        self.fetch(&self.root)
    }

    pub fn get(&self, path: &str) -> Option<&Arc<GraphNode>> {
        self.nodes.get(path)
    }

    pub fn fetch(&self, path: &str) -> Result<&Arc<GraphNode>> {
        self.get(path).ok_or_else(|| Fault::NotFound { name: path.to_string() }.into())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    /// The path of every document, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths = self.nodes.keys().map(|path| &**path).collect::<Vec<_>>();
        paths.sort_unstable();
        paths
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Builds [`DependencyGraph`]s from the raw documents in a store.
pub struct GraphBuilder<'a> {
    tree: &'a Tree,
    config: &'a Config,
    markdown: Arc<dyn MarkdownParser>,
    extractor: Arc<dyn IncludeExtractor>,
}

impl<'a> GraphBuilder<'a> {
    /// A builder using [`CommonMark`] and [`Directives`].
    pub fn new(tree: &'a Tree, config: &'a Config) -> Self {
        GraphBuilder { tree, config, markdown: Arc::new(CommonMark), extractor: Arc::new(Directives) }
    }

    pub fn with_markdown_parser(mut self, parser: Arc<dyn MarkdownParser>) -> Self {
        self.markdown = parser;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn IncludeExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// The document path for `path`: the configured root document inside
    /// `path` if it names a directory in the store, else `path` itself.
    pub fn document_path(&self, path: &str) -> Arc<str> {
        let is_dir = matches!(self.tree.get(&name_of(path)), Some(Tree::Node(_)));
        match (is_dir, path.is_empty()) {
            (true, true) => self.config.root_document.clone(),
            (true, false) => format!("{path}/{}", self.config.root_document).into(),
            (false, _) => path.into(),
        }
    }

    /// Resolves `reference` against the directory holding the document at
    /// `from`.
    pub fn resolve(&self, from: &str, reference: &str) -> Result<Arc<str>> {
        match join_relative(parent_dir(from), reference) {
            Some(path) => Ok(self.document_path(&path)),
            None => Err(Fault::NotFound { name: reference.to_string() }.into()),
        }
    }

    /// Parses the document at `path` and finds its includes.
    pub fn build_node(&self, path: &str, bytes: &[u8]) -> Result<GraphNode> {
        let text = std::str::from_utf8(bytes)?;
        let root = self.markdown.parse(text)?;

        let mut edges = vec![];
        let mut failure = None;
        root.walk(|address, element| {
            if failure.is_some() || element.kind.is_literal() {
                return;
            }

            for (child, text) in element.children.iter().enumerate() {
                let Some(text) = text.text() else { continue };
                let references = match self.extractor.extract(text) {
                    Ok(references) if references.is_empty() => continue,
                    Ok(references) => references,
                    Err(e) => { failure = Some(e); return; }
                };

                let includes = references.iter()
                    .map(|reference| self.resolve(path, reference))
                    .collect::<Result<Vec<_>>>();

                match includes {
                    Ok(includes) => edges.push(Edge { parent: address.to_vec(), child, references, includes }),
                    Err(e) => { failure = Some(e); return; }
                }
            }
        });

        if let Some(e) = failure {
            return Err(e);
        }

        Ok(GraphNode { path: path.into(), root, edges })
    }

    /// Builds the graph of the document at `path`, a file or a directory
    /// holding a root document, and everything it transitively includes.
    ///
    /// Each document is parsed once, however many documents include it.
    /// Fails with [`Fault::CyclicDependency`] if a document includes itself,
    /// directly or not.
    pub fn build(&self, path: &str) -> Result<DependencyGraph> {
        let root = self.document_path(path);
        let mut nodes = FxHashMap::default();
        self.visit(&root, &mut nodes, &mut vec![])?;
        Ok(DependencyGraph { root, nodes })
    }

    fn visit(
        &self,
        path: &Arc<str>,
        nodes: &mut FxHashMap<Arc<str>, Arc<GraphNode>>,
        stack: &mut Vec<Arc<str>>,
    ) -> Result<()> {
        if stack.contains(path) {
            let stack = stack.iter().chain(Some(path)).map(|p| p.to_string()).collect();
            return Err(Fault::CyclicDependency { path: path.to_string(), stack }.into());
        }

        if nodes.contains_key(path) {
            return Ok(());
        }

        let node = self.read(path)
            .and_then(|bytes| self.build_node(path, &bytes))
            .chain_with(|| error! {
                "failed to parse document",
                "stage" => Stage::Parse,
                "path" => path,
            })?;

        tracing::debug!(%path, edges = node.edges.len(), "discovered document");
        let node = Arc::new(node);
        nodes.insert(path.clone(), node.clone());

        stack.push(path.clone());
        for dependency in node.dependencies() {
            self.visit(dependency, nodes, stack).chain_with(|| error! {
                "failed to resolve include",
                "stage" => Stage::Graph,
                "path" => path,
                "include" => dependency,
            })?;
        }

        stack.pop();
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Arc<Binary>> {
        self.tree.item(&name_of(path))?.read::<Binary>()
    }
}

/// The store name of a `/`-separated path.
pub fn name_of(path: &str) -> Name {
    path.split('/').filter(|s| !s.is_empty()).map(NameToken::new).collect()
}
