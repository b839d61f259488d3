use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::config::CONFIG_FILE;
use crate::error::{Result, Chainable};
use crate::fstree::{Entry, EntryId, FsTree};
use crate::store::{Binary, Data, Extension, Item, Meta, Name, NameToken, SourcePath, Tree};
use crate::util::Deferred;
use crate::value::{Dict, Format, Json, Toml, Yaml};

/// The stem of files holding metadata for their directory and everything
/// below it.
pub const DIR_META_STEM: &str = "@meta";

/// Reads the directory at `root` into a [`Tree`] of [`Binary`] items.
///
/// Each file becomes an item named by its path components (the file's token
/// keeps its extension) with `path` and `extension` metadata. Hidden entries,
/// the root's [`CONFIG_FILE`] and directory metadata files are skipped.
/// Directory metadata cascades: a nearer `@meta` file's keys win.
///
/// File contents are read lazily.
pub fn read_dir<P: AsRef<Path>>(root: P) -> Result<Tree> {
    let root = root.as_ref();
    let fs_tree = FsTree::build(root)?;
    if !fs_tree.root().file_type.is_dir() {
        return err! {
            "content root must be a directory",
            "path" => root.display(),
        };
    }

    let mut tree = Tree::empty();
    let mut dir_meta: FxHashMap<EntryId, Meta> = FxHashMap::default();
    fs_tree.depth_first_search(fs_tree.root_id(), |entry| {
        let inherited = entry.parent
            .and_then(|parent| dir_meta.get(&parent))
            .cloned()
            .unwrap_or_default();

        if entry.file_type.is_dir() {
            let meta = match read_dir_meta(&fs_tree, entry)? {
                Some(own) => inherited.merged(&own),
                None => inherited,
            };

            dir_meta.insert(entry.id, meta);
            return Ok(true);
        }

        if is_dir_meta(entry) || (entry.depth == 1 && entry.file_name == CONFIG_FILE) {
            return Ok(false);
        }

        let name = entry.relative_components()
            .into_iter()
            .map(NameToken::from)
            .collect::<Name>();

        let mut meta = inherited.with(SourcePath, entry.relative_path());
        if let Some(ext) = entry.file_ext() {
            meta = meta.with(Extension, ext);
        }

        tracing::trace!(%name, "discovered content item");
        tree.insert(&name, Item::new(meta, read_lazily(entry)))?;
        Ok(false)
    })?;

    tracing::debug!(root = %root.display(), items = tree.len(), "read content directory");
    Ok(tree)
}

fn read_lazily(entry: &Entry) -> Deferred<Data> {
    let path = entry.path.clone();
    Deferred::new(move || {
        let bytes = fs::read(&path).chain_with(|| error! {
            "failed to read content file",
            "path" => path.display(),
        })?;

        Ok(Data::new(Binary::from(bytes)))
    })
}

fn is_dir_meta(entry: &Entry) -> bool {
    entry.file_type.is_file() && entry.file_stem() == DIR_META_STEM
}

fn read_dir_meta(tree: &FsTree, dir: &Entry) -> Result<Option<Meta>> {
    fn read_with<F: Format>(entry: &Entry) -> Result<Meta> {
        let dict: Dict = F::read(entry).chain_with(|| error! {
            "invalid directory metadata",
            "path" => entry.path.display(),
        })?;

        Ok(Meta::from(dict))
    }

    let file = |ext: &str| {
        let file_name = format!("{DIR_META_STEM}.{ext}");
        tree.get(dir.id, file_name).filter(|e| e.file_type.is_file())
    };

    for &ext in Toml::EXTENSIONS {
        if let Some(entry) = file(ext) {
            return read_with::<Toml>(entry).map(Some);
        }
    }

    for &ext in Yaml::EXTENSIONS {
        if let Some(entry) = file(ext) {
            return read_with::<Yaml>(entry).map(Some);
        }
    }

    for &ext in Json::EXTENSIONS {
        if let Some(entry) = file(ext) {
            return read_with::<Json>(entry).map(Some);
        }
    }

    Ok(None)
}
