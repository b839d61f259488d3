use std::any::Any;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{Fault, Result};
use crate::store::{Item, Meta, Name, NameToken};

/// The hierarchical content store: a leaf holding one [`Item`] or a node
/// mapping [`NameToken`]s to subtrees, in insertion order.
///
/// Trees are cheap to clone. Subtrees are shared between clones and copied
/// only when a clone is modified.
#[derive(Debug, Clone)]
pub enum Tree {
    Leaf(Arc<Item>),
    Node(Arc<Node>),
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    children: Vec<(NameToken, Tree)>,
    index: FxHashMap<NameToken, usize>,
}

impl Node {
    pub fn get(&self, token: &NameToken) -> Option<&Tree> {
        self.index.get(token).map(|&i| &self.children[i].1)
    }

    pub fn children(&self) -> impl Iterator<Item = (&NameToken, &Tree)> {
        self.children.iter().map(|(token, tree)| (token, tree))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn push(&mut self, token: NameToken, tree: Tree) {
        self.index.insert(token.clone(), self.children.len());
        self.children.push((token, tree));
    }

    fn graft(&mut self, at: &Name, tokens: &[NameToken], subtree: Tree) -> Result<()> {
        let Some((first, rest)) = tokens.split_first() else {
            let Tree::Node(other) = subtree else {
                return Err(Fault::DuplicatePath(at.to_string()).into());
            };

            for (token, child) in &other.children {
                self.graft(at, std::slice::from_ref(token), child.clone())?;
            }

            return Ok(());
        };

        let here = at.child(first.clone());
        match self.index.get(first).copied() {
            None if rest.is_empty() => self.push(first.clone(), subtree),
            None => {
                let mut node = Node::default();
                node.graft(&here, rest, subtree)?;
                self.push(first.clone(), Tree::Node(Arc::new(node)));
            }
            Some(i) => match &mut self.children[i].1 {
                Tree::Node(node) => Arc::make_mut(node).graft(&here, rest, subtree)?,
                Tree::Leaf(_) => return Err(Fault::DuplicatePath(here.to_string()).into()),
            }
        }

        Ok(())
    }
}

impl Tree {
    /// A node with no children.
    pub fn empty() -> Self {
        Tree::Node(Arc::default())
    }

    pub fn leaf(item: Item) -> Self {
        Tree::Leaf(Arc::new(item))
    }

    pub fn as_item(&self) -> Option<&Arc<Item>> {
        match self {
            Tree::Leaf(item) => Some(item),
            Tree::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Tree::Leaf(_) => None,
            Tree::Node(node) => Some(node),
        }
    }

    /// Walks `name`'s tokens left to right.
    pub fn get(&self, name: &Name) -> Option<&Tree> {
        name.tokens().iter().try_fold(self, |tree, token| tree.as_node()?.get(token))
    }

    /// Like [`Tree::get()`] but fails with [`Fault::NotFound`].
    pub fn fetch(&self, name: &Name) -> Result<&Tree> {
        self.get(name).ok_or_else(|| Fault::NotFound { name: name.to_string() }.into())
    }

    /// The item at `name`. Fails with [`Fault::NotFound`] if there is no leaf
    /// there.
    pub fn item(&self, name: &Name) -> Result<&Arc<Item>> {
        self.get(name)
            .and_then(|tree| tree.as_item())
            .ok_or_else(|| Fault::NotFound { name: name.to_string() }.into())
    }

    /// The subtree below `prefix`, keyed relative to it. Empty if `prefix`
    /// doesn't name a node.
    pub fn branch(&self, prefix: &Name) -> Tree {
        match self.get(prefix) {
            Some(tree @ Tree::Node(_)) => tree.clone(),
            Some(Tree::Leaf(_)) | None => Tree::empty(),
        }
    }

    /// Grafts `subtree` at `name`, creating intermediate nodes. Nodes that
    /// already exist are merged child by child. Fails with
    /// [`Fault::DuplicatePath`] if a leaf is in the way or would be replaced.
    pub fn node(&mut self, name: &Name, subtree: Tree) -> Result<()> {
        match self {
            Tree::Node(node) => Arc::make_mut(node).graft(&Name::empty(), name.tokens(), subtree),
            Tree::Leaf(_) => Err(Fault::DuplicatePath(String::new()).into()),
        }
    }

    /// Grafts a single item at `name`.
    pub fn insert(&mut self, name: &Name, item: Item) -> Result<()> {
        self.node(name, Tree::leaf(item))
    }

    /// Every leaf, depth-first, children in insertion order.
    pub fn iter(&self) -> Leaves<'_> {
        match self {
            Tree::Leaf(item) => Leaves { pending: Some((Name::empty(), item)), stack: vec![] },
            Tree::Node(node) => Leaves {
                pending: None,
                stack: vec![(Name::empty(), node.children.iter())],
            },
        }
    }

    /// The leaves whose computed value is a `T` and whose name and metadata
    /// satisfy `predicate`. Each call walks the tree afresh.
    pub fn filter_by_type<'a, T, P>(&'a self, predicate: P) -> impl Iterator<Item = (Name, &'a Arc<Item>)> + 'a
        where T: Any, P: Fn(&Name, &Meta) -> bool + 'a
    {
        self.iter().filter(move |(name, item)| predicate(name, item.meta()) && item.is::<T>())
    }

    /// The number of leaves.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Prints the tree's shape to stdout.
    pub fn visualize(&self) {
        fn vis(prefix: &str, token: &NameToken, tree: &Tree, last: bool) {
            let (branch, indent) = match last {
                true => ("└── ", "    "),
                false => ("├── ", "│   "),
            };

            match tree {
                Tree::Leaf(item) => {
                    let kind = match item.value().is_computed() {
                        true => item.tag().map_or("error", |tag| tag.name()),
                        false => "pending",
                    };

                    println!("{prefix}{branch}{token} ({kind})");
                }
                Tree::Node(node) => {
                    println!("{prefix}{branch}{token}/");
                    let prefix = format!("{prefix}{indent}");
                    for (i, (token, child)) in node.children.iter().enumerate() {
                        vis(&prefix, token, child, i + 1 == node.children.len());
                    }
                }
            }
        }

        println!("🗂 ");
        if let Tree::Node(node) = self {
            for (i, (token, child)) in node.children.iter().enumerate() {
                vis("", token, child, i + 1 == node.children.len());
            }
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::empty()
    }
}

/// A depth-first walk over a tree's leaves. See [`Tree::iter()`].
pub struct Leaves<'a> {
    pending: Option<(Name, &'a Arc<Item>)>,
    stack: Vec<(Name, std::slice::Iter<'a, (NameToken, Tree)>)>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = (Name, &'a Arc<Item>);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(leaf) = self.pending.take() {
            return Some(leaf);
        }

        loop {
            let (prefix, children) = self.stack.last_mut()?;
            match children.next() {
                None => { self.stack.pop(); }
                Some((token, Tree::Leaf(item))) => return Some((prefix.child(token.clone()), item)),
                Some((token, Tree::Node(node))) => {
                    let name = prefix.child(token.clone());
                    self.stack.push((name, node.children.iter()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta;
    use crate::store::Binary;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn item(text: &str) -> Item {
        Item::ready(meta!["text" => text], Binary::from(text.as_bytes()))
    }

    fn names(tree: &Tree) -> Vec<String> {
        tree.iter().map(|(name, _)| name.to_string()).collect()
    }

    fn sample() -> Tree {
        let mut tree = Tree::empty();
        tree.insert(&name("x/y"), item("xy")).unwrap();
        tree.insert(&name("x/z"), item("xz")).unwrap();
        tree.insert(&name("w/y"), item("wy")).unwrap();
        tree
    }

    #[test]
    fn iterates_in_insertion_order() {
        let mut tree = sample();
        tree.insert(&name("a"), item("a")).unwrap();
        tree.insert(&name("x/b[1]"), item("xb1")).unwrap();
        assert_eq!(names(&tree), ["x/y", "x/z", "x/b[1]", "w/y", "a"]);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn branch_strips_the_prefix() {
        let tree = sample();
        let branch = tree.branch(&name("x"));
        assert_eq!(names(&branch), ["y", "z"]);
        assert!(tree.branch(&name("missing")).is_empty());
        assert!(tree.branch(&name("x/y")).is_empty());
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn lookups() {
        let tree = sample();
        let found = tree.item(&name("w/y")).unwrap();
        assert_eq!(found.meta().get_raw("text").and_then(|v| v.as_str()), Some("wy"));

        assert!(tree.get(&name("x")).unwrap().as_node().is_some());
        assert!(tree.fetch(&name("x/q")).unwrap_err().is_not_found());
        assert!(tree.item(&name("x")).unwrap_err().is_not_found());
        assert!(tree.get(&name("x/y/deeper")).is_none());
    }

    #[test]
    fn grafting_merges_nodes() {
        let mut tree = sample();
        tree.node(&name("x"), sample().branch(&name("w"))).unwrap_err();

        let mut extra = Tree::empty();
        extra.insert(&name("q"), item("q")).unwrap();
        tree.node(&name("x"), extra.clone()).unwrap();
        tree.node(&name("new/deep"), extra).unwrap();
        assert_eq!(names(&tree), ["x/y", "x/z", "x/q", "w/y", "new/deep/q"]);
    }

    #[test]
    fn leaves_block_grafts() {
        let mut tree = sample();
        let fault = |e: crate::error::Error| e.fault().cloned();

        let error = tree.insert(&name("x/y/below"), item("_")).unwrap_err();
        assert_eq!(fault(error), Some(Fault::DuplicatePath("x/y".into())));

        let error = tree.insert(&name("x/y"), item("_")).unwrap_err();
        assert_eq!(fault(error), Some(Fault::DuplicatePath("x/y".into())));

        let error = tree.insert(&name("x"), item("_")).unwrap_err();
        assert_eq!(fault(error), Some(Fault::DuplicatePath("x".into())));
    }

    #[test]
    fn clones_are_independent() {
        let original = sample();
        let mut copy = original.clone();
        copy.insert(&name("x/new"), item("new")).unwrap();
        assert_eq!(original.len(), 3);
        assert_eq!(copy.len(), 4);
    }

    #[test]
    fn filters_by_type_and_predicate() {
        let mut tree = sample();
        tree.insert(&name("x/text"), Item::ready(meta![], String::from("s"))).unwrap();
        tree.insert(&name("x/bad"), Item::lazy::<Binary, _>(meta![], || crate::err!("no"))).unwrap();

        let binaries = tree.filter_by_type::<Binary, _>(|_, _| true)
            .map(|(name, _)| name.to_string())
            .collect::<Vec<_>>();

        assert_eq!(binaries, ["x/y", "x/z", "w/y"]);

        let only_x = tree.filter_by_type::<Binary, _>(|name, _| name.starts_with(&"x".parse().unwrap()));
        assert_eq!(only_x.count(), 2);

        let strings = tree.filter_by_type::<String, _>(|_, meta| meta.is_empty());
        assert_eq!(strings.map(|(name, _)| name.to_string()).collect::<Vec<_>>(), ["x/text"]);

        // restartable: a second walk sees the same leaves
        assert_eq!(tree.filter_by_type::<Binary, _>(|_, _| true).count(), 3);
    }
}
