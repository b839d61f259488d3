mod macros;
mod deferred;

pub use macros::*;
pub use deferred::*;

/// Returns `true` if `input` is likely to contain a `${...}` substitution.
pub fn has_substitution(input: &str) -> bool {
    let mut slice = input.as_bytes();
    while let Some(i) = memchr::memchr(b'$', slice) {
        match slice.get(i + 1) {
            Some(b'{') => return true,
            Some(_) => slice = &slice[(i + 1)..],
            None => return false,
        }
    }

    false
}

/// Splits `file_name` into its stem and its final extension, if any. A
/// leading dot does not start an extension.
///
/// ```rust
/// use quire::util::split_extension;
///
/// assert_eq!(split_extension("main.md"), ("main", Some("md")));
/// assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", Some("gz")));
/// assert_eq!(split_extension("README"), ("README", None));
/// assert_eq!(split_extension(".hidden"), (".hidden", None));
/// ```
pub fn split_extension(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    }
}

/// Joins `reference` onto the `/`-separated directory `dir`, resolving `.`
/// and `..` segments lexically. Returns `None` if the result would escape
/// above the root.
///
/// ```rust
/// use quire::util::join_relative;
///
/// assert_eq!(join_relative("", "sub.md").as_deref(), Some("sub.md"));
/// assert_eq!(join_relative("a/b", "c.md").as_deref(), Some("a/b/c.md"));
/// assert_eq!(join_relative("a/b", "../c.md").as_deref(), Some("a/c.md"));
/// assert_eq!(join_relative("a", "./x/./y.md").as_deref(), Some("a/x/y.md"));
/// assert_eq!(join_relative("a", "/top.md").as_deref(), Some("top.md"));
/// assert_eq!(join_relative("", "../x.md"), None);
/// ```
pub fn join_relative(dir: &str, reference: &str) -> Option<String> {
    let base = match reference.starts_with('/') {
        true => "",
        false => dir,
    };

    let mut segments: Vec<&str> = vec![];
    for segment in base.split('/').chain(reference.split('/')) {
        match segment {
            "" | "." => continue,
            ".." => { segments.pop()?; }
            segment => segments.push(segment),
        }
    }

    Some(segments.join("/"))
}

/// The `/`-separated directory portion of `path`, or `""` for a top-level
/// path.
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}
