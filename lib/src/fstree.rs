use std::sync::Arc;
use std::path::Path;
use std::{fs, fmt};

use rustc_hash::FxHashMap;

use crate::error::Result;

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) usize);

/// A snapshot of a directory hierarchy, walked in parallel.
#[derive(Debug)]
pub struct FsTree {
    entries: Vec<Entry>,
    map: FxHashMap<Arc<Path>, EntryId>,
}

#[derive(Debug)]
pub struct Entry {
    pub id: EntryId,
    pub path: Arc<Path>,
    pub file_name: String,
    pub file_type: fs::FileType,
    pub parent: Option<EntryId>,
    pub children: Vec<EntryId>,
    pub depth: usize,
}

impl FsTree {
    fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            entries: vec![],
        }
    }

    /// Walks `root`, skipping entries for which `skip` returns `true` along
    /// with everything beneath them.
    pub fn build_with<P, F>(root: P, skip: F) -> Result<Self>
        where P: AsRef<Path>,
              F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        let root = root.as_ref();
        let walker = jwalk::WalkDir::new(root)
            .follow_links(true)
            .sort(true)
            .process_read_dir(move |depth, _, _, entries| {
                // `depth` is `None` only for the list holding the root itself.
                if depth.is_some() {
                    entries.retain(|e| match e {
                        Ok(e) => !skip(&e.file_name.to_string_lossy()),
                        Err(_) => true,
                    });
                }
            });

        let mut tree: FsTree = FsTree::new();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            tree.insert(entry);
        }

        if tree.len() == 0 {
            return err! {
                "file system tree discovery yielded zero entries",
                "search root" => root.display(),
            }
        }

        Ok(tree)
    }

    /// Walks `root`, skipping hidden (`.`-prefixed) entries.
    pub fn build<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::build_with(root, |name| name.starts_with('.'))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn root(&self) -> &Entry {
        &self[self.root_id()]
    }

    pub fn root_id(&self) -> EntryId {
        EntryId(0)
    }

    #[inline]
    pub fn get<R, P>(&self, root: R, path: P) -> Option<&Entry>
        where R: Into<Option<EntryId>>, P: AsRef<Path>
    {
        let root = root.into().unwrap_or(self.root_id());
        let full_path = self[root].path.join(path.as_ref());
        self.map.get(&*full_path).map(|&id| &self[id])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Visits entries depth-first, in sorted order, descending into an
    /// entry's children only when `progress` returns `true` for it.
    pub fn depth_first_search<F>(&self, root: EntryId, mut progress: F) -> Result<()>
        where F: FnMut(&Entry) -> Result<bool>
    {
        fn _dfs<F>(tree: &FsTree, root: EntryId, progress: &mut F) -> Result<()>
            where F: FnMut(&Entry) -> Result<bool>
        {
            let entry = &tree[root];
            if progress(entry)? {
                for &child in &entry.children {
                    _dfs(tree, child, progress)?;
                }
            }

            Ok(())
        }

        _dfs(self, root, &mut progress)
    }

    fn insert(&mut self, entry: jwalk::DirEntry<((), ())>) {
        let entry = Entry {
            id: EntryId(self.entries.len()),
            path: Arc::from(entry.path().into_boxed_path()),
            file_type: entry.file_type,
            file_name: entry.file_name.to_string_lossy().into_owned(),
            parent: self.map.get(&*entry.parent_path).cloned(),
            children: vec![],
            depth: entry.depth,
        };

        self.map.insert(entry.path.clone(), entry.id);
        if let Some(parent) = entry.parent {
            self.entries[parent.0].children.push(entry.id);
        }

        self.entries.push(entry);
    }
}

impl Entry {
    /// File name without the extension.
    pub fn file_stem(&self) -> &str {
        crate::util::split_extension(&self.file_name).0
    }

    /// The final extension, if any.
    pub fn file_ext(&self) -> Option<&str> {
        crate::util::split_extension(&self.file_name).1
    }

    /// Path components relative to the root of the tree containing `self`.
    pub fn relative_components(&self) -> Vec<String> {
        let components = self.path.components().collect::<Vec<_>>();
        components[components.len().saturating_sub(self.depth)..].iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect()
    }

    /// The `/`-separated path relative to the tree's root. Empty for the
    /// root itself.
    pub fn relative_path(&self) -> String {
        self.relative_components().join("/")
    }
}

impl std::ops::Index<EntryId> for FsTree {
    type Output = Entry;

    fn index(&self, index: EntryId) -> &Self::Output {
        &self.entries[index.0]
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
