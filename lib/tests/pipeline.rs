use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbaImage};

use quire::config::Config;
use quire::content::{Html, Image, ParserRegistry, Pipeline};
use quire::store::{read_dir, Binary, Meta, Name, Tree};
use quire::value::Value;

fn write(root: &Path, path: &str, contents: &[u8]) {
    let path = root.join(path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }

    fs::write(path, contents).unwrap();
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Cursor::new(vec![]);
    RgbaImage::new(width, height).write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn name(s: &str) -> Name {
    s.parse().unwrap()
}

fn site() -> (tempfile::TempDir, Config, Tree) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "quire.toml", b"[vars]\ntitle = \"Quire\"\n");
    write(root, "index.md", b"# Home\n");
    write(root, "style.css", b"body { margin: 0 }");
    write(root, "blob.xyz123", b"\x00\x01\x02");
    write(root, "data/site.yaml", b"author: someone\nyear: 2024\n");
    write(root, "data/broken.json", b"{ \"unterminated\": ");
    write(root, "img/dot.png", &png(3, 2));
    write(root, "pages/@meta.yaml", b"transformation: vars\n");
    write(root, "pages/about.md", b"# About ${title}\n");
    write(root, "pages/raw.html", b"<p>${title}</p>");
    write(root, ".hidden/secret.md", b"nope");

    let config = Config::discover(root).unwrap();
    let tree = read_dir(root).unwrap();
    (dir, config, tree)
}

#[test]
fn reads_every_visible_file() {
    let (_dir, _, tree) = site();
    let mut names = tree.iter().map(|(name, _)| name.to_string()).collect::<Vec<_>>();
    names.sort();

    assert_eq!(names, [
        "blob.xyz123", "data/broken.json", "data/site.yaml", "img/dot.png",
        "index.md", "pages/about.md", "pages/raw.html", "style.css",
    ]);

    let about = tree.item(&name("pages/about.md")).unwrap();
    assert_eq!(about.meta().get_raw("path"), Some(&Value::from("pages/about.md")));
    assert_eq!(about.meta().get_raw("transformation"), Some(&Value::from("vars")));
    assert!(tree.item(&name("index.md")).unwrap().meta().get_raw("transformation").is_none());
}

#[test]
fn pipeline_types_every_item() {
    let (_dir, config, tree) = site();
    let output = Pipeline::with_defaults(config).run(&tree).unwrap();

    let index = output.item(&name("index")).unwrap().read::<Html>().unwrap();
    assert_eq!(&***index, "<div><h1>Home</h1>\n</div>");

    let about = output.item(&name("pages/about")).unwrap().read::<Html>().unwrap();
    assert_eq!(&***about, "<div><h1>About Quire</h1>\n</div>");

    let raw = output.item(&name("pages/raw")).unwrap().read::<Html>().unwrap();
    assert_eq!(&***raw, "<div><p>Quire</p></div>");

    let site = output.item(&name("data/site")).unwrap().read::<Meta>().unwrap();
    assert_eq!(site.get_raw("year"), Some(&Value::from(2024u16)));

    let dot = output.item(&name("img/dot.png")).unwrap().read::<Image>().unwrap();
    assert_eq!((dot.format, dot.width, dot.height), (ImageFormat::Png, 3, 2));

    let css = output.item(&name("style.css")).unwrap().read::<Binary>().unwrap();
    assert_eq!(&css[..], b"body { margin: 0 }");

    let blob = output.item(&name("blob.xyz123")).unwrap().read::<Binary>().unwrap();
    assert_eq!(&blob[..], b"\x00\x01\x02");

    let broken = output.item(&name("data/broken")).unwrap().read::<Binary>().unwrap();
    assert_eq!(&broken[..], b"{ \"unterminated\": ");
}

#[test]
fn typed_views_and_branches() {
    let (_dir, config, tree) = site();
    let output = Pipeline::with_defaults(config).run(&tree).unwrap();

    let mut html = output.filter_by_type::<Html, _>(|_, _| true)
        .map(|(name, _)| name.to_string())
        .collect::<Vec<_>>();

    html.sort();
    assert_eq!(html, ["index", "pages/about", "pages/raw"]);

    let transformed = output.filter_by_type::<Html, _>(|_, meta| meta.contains_key("transformation")).count();
    assert_eq!(transformed, 2);

    let pages = output.branch(&name("pages"));
    assert_eq!(pages.len(), 2);
    assert!(pages.item(&name("about")).is_ok());
    assert!(output.branch(&name("index")).is_empty());
}

#[test]
fn resolution_ignores_registration_order() {
    let registry = ParserRegistry::with_defaults();
    for ext in ["md", "yml", "png", "css", "svg"] {
        let first = registry.resolve(ext).map(|(id, _)| id.to_string());
        assert_eq!(first, registry.resolve(ext).map(|(id, _)| id.to_string()));
    }

    assert!(registry.resolve("xyz123").is_none());
}
