//! The built-in parsers.
//!
//! | id         | extensions and mime types                               | value      |
//! |------------|---------------------------------------------------------|------------|
//! | `html`     | `html`, `htm`, `text/html`                              | [`Html`]   |
//! | `markdown` | `md`, `markdown`, `mdown`, `mkdn`, `mkd`, `text/markdown` | [`Html`] |
//! | `json`     | `json`, `application/json`                              | [`Meta`]   |
//! | `yaml`     | `yaml`, `yml`, `text/yaml`                              | [`Meta`]   |
//! | `toml`     | `toml`, `application/toml`                              | [`Meta`]   |
//! | `png`      | `png`, `image/png`                                      | [`Image`]  |
//! | `jpg`      | `jpg`, `jpeg`, `image/jpeg`                             | [`Image`]  |
//! | `gif`      | `gif`, `image/gif`                                      | [`Image`]  |
//! | `svg`      | `svg`, `image/svg+xml`                                  | [`Binary`] |
//! | `raw`      | `css`, `js`, `scss`, `woff`, `woff2`, `ttf`, `eot`      | [`Binary`] |
//!
//! Every built-in has [`DEFAULT_PRIORITY`](crate::content::DEFAULT_PRIORITY).

use std::io::Cursor;
use std::sync::Arc;

use derive_more::{Debug, Deref, From};
use image::{ImageFormat, ImageReader};

use crate::config::Config;
use crate::content::{parser, Parser};
use crate::error::{Result, Chainable};
use crate::store::{Binary, Meta};
use crate::value::{Dict, Format, Json, Toml, Yaml};

/// An HTML fragment.
#[derive(Clone, PartialEq, Eq, Debug, Deref, From)]
pub struct Html(pub Arc<str>);

/// A decoded image header along with the image's bytes.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Image {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    #[debug(ignore)]
    pub bytes: Binary,
}

impl From<String> for Html {
    fn from(html: String) -> Self {
        Html(html.into())
    }
}

/// Wraps `html` in a `<div>`.
fn fragment(html: &str) -> Html {
    let mut fragment = String::with_capacity(html.len() + 12);
    fragment.push_str("<div>");
    fragment.push_str(html);
    fragment.push_str("</div>");
    Html::from(fragment)
}

fn html(_: &Config, _: &Meta, bytes: &[u8]) -> Result<Html> {
    Ok(fragment(std::str::from_utf8(bytes)?))
}

fn markdown(_: &Config, _: &Meta, bytes: &[u8]) -> Result<Html> {
    use pulldown_cmark::{html::push_html, Options, Parser};

    let text = std::str::from_utf8(bytes)?;
    let mut html = String::with_capacity(text.len() * 3 / 2);
    push_html(&mut html, Parser::new_ext(text, Options::empty()));
    Ok(fragment(&html))
}

fn meta<F: Format>(_: &Config, _: &Meta, bytes: &[u8]) -> Result<Meta> {
    F::from_slice::<Dict>(bytes).map(Meta::from)
}

fn image_with(format: ImageFormat) -> impl Fn(&Config, &Meta, &[u8]) -> Result<Image> + Send + Sync + 'static {
    move |_, _, bytes| {
        let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .chain_with(|| error!("failed to decode image header", "format" => format!("{format:?}")))?;

        Ok(Image { format, width, height, bytes: Binary::from(bytes) })
    }
}

fn binary(_: &Config, _: &Meta, bytes: &[u8]) -> Result<Binary> {
    Ok(Binary::from(bytes))
}

/// The fallback parser: passes bytes through untouched. Not registered; the
/// [`Pipeline`](crate::content::Pipeline) substitutes it when no registered
/// parser matches.
pub fn raw_bytes() -> Arc<dyn Parser> {
    Arc::new(parser(&[], binary))
}

/// The built-in parsers, by id.
pub fn defaults() -> Vec<(&'static str, Arc<dyn Parser>)> {
    fn entry<P: Parser>(id: &'static str, parser: P) -> (&'static str, Arc<dyn Parser>) {
        (id, Arc::new(parser))
    }

    vec![
        entry("html", parser(&["html", "htm", "text/html"], html)),
        entry("markdown", parser(&["md", "markdown", "mdown", "mkdn", "mkd", "text/markdown"], markdown)),
        entry("json", parser(&["json", "application/json"], meta::<Json>)),
        entry("yaml", parser(&["yaml", "yml", "text/yaml"], meta::<Yaml>)),
        entry("toml", parser(&["toml", "application/toml"], meta::<Toml>)),
        entry("png", parser(&["png", "image/png"], image_with(ImageFormat::Png))),
        entry("jpg", parser(&["jpg", "jpeg", "image/jpeg"], image_with(ImageFormat::Jpeg))),
        entry("gif", parser(&["gif", "image/gif"], image_with(ImageFormat::Gif))),
        entry("svg", parser(&["svg", "image/svg+xml"], binary)),
        entry("raw", parser(&["css", "js", "scss", "woff", "woff2", "ttf", "eot"], binary)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta;
    use crate::value::Value;

    fn parse<T: std::any::Any + Send + Sync>(ext: &str, bytes: &[u8]) -> Result<Arc<T>> {
        let registry = crate::content::ParserRegistry::with_defaults();
        let (_, parser) = registry.fetch(ext)?;
        let data = parser.parse(&Config::default(), &meta![], bytes)?;
        data.downcast::<T>().ok_or_else(|| error!("wrong type"))
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Cursor::new(vec![]);
        image::RgbaImage::new(width, height).write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn markdown_renders_to_a_fragment() {
        let html = parse::<Html>("md", b"# Title\n\nSome *text*.").unwrap();
        assert_eq!(&***html, "<div><h1>Title</h1>\n<p>Some <em>text</em>.</p>\n</div>");
    }

    #[test]
    fn html_is_wrapped_verbatim() {
        let html = parse::<Html>("html", b"<b>hi</b>").unwrap();
        assert_eq!(&***html, "<div><b>hi</b></div>");
        assert!(parse::<Html>("html", &[0xff]).is_err());
    }

    #[test]
    fn data_formats_become_meta() {
        let json = parse::<Meta>("json", br#"{"a": {"b": 1}}"#).unwrap();
        let yaml = parse::<Meta>("yml", b"a:\n  b: 1\n").unwrap();
        let toml = parse::<Meta>("toml", b"[a]\nb = 1\n").unwrap();
        assert_eq!(json.lookup("a.b"), Some(&Value::from(1u8)));
        assert_eq!(json, yaml);
        assert_eq!(yaml, toml);
        assert!(parse::<Meta>("json", b"[1, 2]").is_err());
    }

    #[test]
    fn images_report_dimensions() {
        let png = png(1, 2);
        let image = parse::<Image>("png", &png).unwrap();
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!((image.width, image.height), (1, 2));
        assert_eq!(&image.bytes[..], &png[..]);
        assert!(parse::<Image>("jpg", &png).is_err());
    }

    #[test]
    fn assets_pass_through() {
        let css = parse::<Binary>("css", b"a { color: red }").unwrap();
        assert_eq!(&css[..], b"a { color: red }");
        let svg = parse::<Binary>("svg", b"<svg/>").unwrap();
        assert_eq!(&svg[..], b"<svg/>");
    }
}
