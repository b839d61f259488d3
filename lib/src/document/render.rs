use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, LinkType, Tag, TagEnd};

use crate::document::{Element, Kind};
use crate::error::Result;

/// Serializes a syntax tree.
pub trait Renderer: Send + Sync {
    fn render(&self, root: &Element) -> Result<String>;
}

/// Renders HTML by replaying the tree as CommonMark events.
///
/// ```rust
/// use quire::document::{CommonMark, HtmlRenderer, MarkdownParser, Renderer};
///
/// let root = CommonMark.parse("Hello *world*").unwrap();
/// assert_eq!(HtmlRenderer.render(&root).unwrap(), "<p>Hello <em>world</em></p>\n");
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRenderer;

/// Writes the tree back out as CommonMark text.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, root: &Element) -> Result<String> {
        let mut events = vec![];
        push_events(root, &mut events);

        let mut html = String::new();
        pulldown_cmark::html::push_html(&mut html, events.into_iter());
        Ok(html)
    }
}

fn heading_level(depth: u8) -> HeadingLevel {
    match depth {
        0 | 1 => HeadingLevel::H1,
        2 => HeadingLevel::H2,
        3 => HeadingLevel::H3,
        4 => HeadingLevel::H4,
        5 => HeadingLevel::H5,
        _ => HeadingLevel::H6,
    }
}

fn push_events<'a>(element: &'a Element, events: &mut Vec<Event<'a>>) {
    let wrap = |start: Tag<'a>, end: TagEnd, events: &mut Vec<Event<'a>>| {
        events.push(Event::Start(start));
        for child in &element.children {
            push_events(child, events);
        }

        events.push(Event::End(end));
    };

    match &element.kind {
        Kind::Root | Kind::Parent => element.children.iter().for_each(|child| push_events(child, events)),
        Kind::Paragraph => wrap(Tag::Paragraph, TagEnd::Paragraph, events),
        Kind::Heading { depth } => {
            let level = heading_level(*depth);
            let tag = Tag::Heading { level, id: None, classes: vec![], attrs: vec![] };
            wrap(tag, TagEnd::Heading(level), events)
        }
        Kind::Blockquote => wrap(Tag::BlockQuote, TagEnd::BlockQuote, events),
        Kind::List { ordered, start } => {
            let start = ordered.then(|| start.unwrap_or(1));
            wrap(Tag::List(start), TagEnd::List(*ordered), events)
        }
        Kind::ListItem => wrap(Tag::Item, TagEnd::Item, events),
        Kind::Emphasis => wrap(Tag::Emphasis, TagEnd::Emphasis, events),
        Kind::Strong => wrap(Tag::Strong, TagEnd::Strong, events),
        Kind::Delete => wrap(Tag::Strikethrough, TagEnd::Strikethrough, events),
        Kind::Link { url, title } => {
            let tag = Tag::Link {
                link_type: LinkType::Inline,
                dest_url: url.as_str().into(),
                title: title.as_deref().unwrap_or_default().into(),
                id: CowStr::Borrowed(""),
            };

            wrap(tag, TagEnd::Link, events)
        }
        Kind::Image { url, title, alt } => {
            events.push(Event::Start(Tag::Image {
                link_type: LinkType::Inline,
                dest_url: url.as_str().into(),
                title: title.as_deref().unwrap_or_default().into(),
                id: CowStr::Borrowed(""),
            }));

            if !alt.is_empty() {
                events.push(Event::Text(alt.as_str().into()));
            }

            events.push(Event::End(TagEnd::Image));
        }
        Kind::Text { value } => events.push(Event::Text(value.as_str().into())),
        Kind::InlineCode { value } => events.push(Event::Code(value.as_str().into())),
        Kind::Code { lang, meta, value } => {
            let info = lang.iter().chain(meta).map(|s| s.as_str()).collect::<Vec<_>>().join(" ");
            events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info.into()))));
            events.push(Event::Text(value.as_str().into()));
            events.push(Event::End(TagEnd::CodeBlock));
        }
        Kind::Html { value } => events.push(Event::Html(value.as_str().into())),
        Kind::ThematicBreak => events.push(Event::Rule),
        Kind::Break => events.push(Event::HardBreak),
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, root: &Element) -> Result<String> {
        let mut markdown = block(root);
        if !markdown.is_empty() {
            markdown.push('\n');
        }

        Ok(markdown)
    }
}

/// `children` as blocks, with runs of inline elements written as one block.
fn flow(children: &[Element], tight: bool) -> String {
    let mut blocks = vec![];
    let mut run: Option<String> = None;
    for child in children {
        if child.kind.is_inline() {
            inline(child, run.get_or_insert_with(String::new));
            continue;
        }

        blocks.extend(run.take());
        blocks.push(block(child));
    }

    blocks.extend(run);
    blocks.join(if tight { "\n" } else { "\n\n" })
}

fn block(element: &Element) -> String {
    match &element.kind {
        Kind::Root | Kind::Parent | Kind::ListItem => flow(&element.children, false),
        Kind::Paragraph => inlines(&element.children),
        Kind::Heading { depth } => {
            let hashes = "#".repeat((*depth).clamp(1, 6) as usize);
            format!("{hashes} {}", inlines(&element.children))
        }
        Kind::Blockquote => prefix(&flow(&element.children, false), "> ", "> "),
        Kind::List { ordered, start } => {
            let tight = element.children.iter()
                .all(|item| item.children.iter().all(|c| c.kind != Kind::Paragraph));

            let items = element.children.iter().enumerate().map(|(i, item)| {
                let marker = match ordered {
                    true => format!("{}. ", start.unwrap_or(1) + i as u64),
                    false => "- ".to_string(),
                };

                let indent = " ".repeat(marker.len());
                prefix(&flow(&item.children, tight), &marker, &indent)
            });

            items.collect::<Vec<_>>().join(if tight { "\n" } else { "\n\n" })
        }
        Kind::Code { lang, meta, value } => {
            let fence = "`".repeat(longest_run(value, '`').max(2) + 1);
            let info = lang.iter().chain(meta).map(|s| s.as_str()).collect::<Vec<_>>().join(" ");
            let newline = if value.ends_with('\n') || value.is_empty() { "" } else { "\n" };
            format!("{fence}{info}\n{value}{newline}{fence}")
        }
        Kind::Html { value } => value.trim_end().to_string(),
        Kind::ThematicBreak => "---".to_string(),
        _ => inlines(std::slice::from_ref(element)),
    }
}

fn inlines(elements: &[Element]) -> String {
    let mut out = String::new();
    for element in elements {
        inline(element, &mut out);
    }

    out
}

fn inline(element: &Element, out: &mut String) {
    let wrap = |delimiter: &str, out: &mut String| {
        out.push_str(delimiter);
        element.children.iter().for_each(|child| inline(child, out));
        out.push_str(delimiter);
    };

    match &element.kind {
        Kind::Text { value } => escape(value, out),
        Kind::Emphasis => wrap("*", out),
        Kind::Strong => wrap("**", out),
        Kind::Delete => wrap("~~", out),
        Kind::InlineCode { value } => {
            let fence = "`".repeat(longest_run(value, '`') + 1);
            let pad = if value.starts_with('`') || value.ends_with('`') { " " } else { "" };
            out.push_str(&format!("{fence}{pad}{value}{pad}{fence}"));
        }
        Kind::Link { url, title } => {
            out.push('[');
            element.children.iter().for_each(|child| inline(child, out));
            out.push_str(&format!("]({url}{})", title_suffix(title.as_deref())));
        }
        Kind::Image { url, title, alt } => {
            out.push_str("![");
            escape(alt, out);
            out.push_str(&format!("]({url}{})", title_suffix(title.as_deref())));
        }
        Kind::Break => out.push_str("\\\n"),
        Kind::Html { value } => out.push_str(value),
        _ => out.push_str(&block(element)),
    }
}

fn title_suffix(title: Option<&str>) -> String {
    match title {
        Some(title) => format!(" \"{}\"", title.replace('"', "\\\"")),
        None => String::new(),
    }
}

/// Writes `text` so it reads back as the same literal text: inline markup
/// and entities are escaped everywhere, block markers at the start of a line.
fn escape(text: &str, out: &mut String) {
    let mut line_start = out.is_empty() || out.ends_with('\n');
    let mut marker = None;
    for (i, c) in text.char_indices() {
        if line_start {
            marker = ordered_marker(&text[i..]).map(|len| i + len);
        }

        let escaped = matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '<' | '&' | '~')
            || (line_start && matches!(c, '#' | '>' | '-' | '+' | '='))
            || marker == Some(i);

        if escaped {
            out.push('\\');
        }

        out.push(c);
        line_start = c == '\n';
    }
}

/// The offset of the `.` or `)` in an ordered list marker starting `line`.
fn ordered_marker(line: &str) -> Option<usize> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    match line.as_bytes().get(digits) {
        Some(b'.' | b')') if (1..10).contains(&digits) => Some(digits),
        _ => None,
    }
}

fn longest_run(text: &str, c: char) -> usize {
    text.split(|x| x != c).map(str::len).max().unwrap_or(0)
}

/// Prefixes the first line of `text` with `first` and every other line with
/// `rest`. Blank lines get no trailing whitespace.
fn prefix(text: &str, first: &str, rest: &str) -> String {
    let mut out = String::with_capacity(text.len() + first.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }

        let prefix = if i == 0 { first } else { rest };
        match line.is_empty() {
            true => out.push_str(prefix.trim_end()),
            false => {
                out.push_str(prefix);
                out.push_str(line);
            }
        }
    }

    out
}
