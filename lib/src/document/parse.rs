use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

use crate::document::{Element, Kind, Point, Position};
use crate::error::Result;

/// Parses markdown text into a syntax tree rooted at a [`Kind::Root`].
pub trait MarkdownParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Element>;
}

/// The built-in [`MarkdownParser`]: CommonMark with strikethrough.
///
/// Adjacent text (including soft breaks, which become `\n`) is merged into a
/// single [`Kind::Text`], so an include directive is always one element.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonMark;

impl MarkdownParser for CommonMark {
    fn parse(&self, text: &str) -> Result<Element> {
        let mut builder = TreeBuilder::new(text);
        for (event, range) in Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH).into_offset_iter() {
            builder.event(event, range);
        }

        Ok(builder.finish())
    }
}

struct TreeBuilder {
    line_starts: Vec<usize>,
    stack: Vec<Element>,
}

impl TreeBuilder {
    fn new(text: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(memchr::memchr_iter(b'\n', text.as_bytes()).map(|i| i + 1))
            .collect();

        let mut builder = TreeBuilder { line_starts, stack: vec![] };
        let root = Element::new(Kind::Root).at(builder.position(0..text.len()));
        builder.stack.push(root);
        builder
    }

    fn point(&self, offset: usize) -> Point {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = self.line_starts.get(line.saturating_sub(1)).copied().unwrap_or(0);
        Point { line, column: offset - start + 1, offset }
    }

    fn position(&self, range: Range<usize>) -> Position {
        Position { start: self.point(range.start), end: self.point(range.end) }
    }

    fn top(&mut self) -> &mut Element {
        // The root is pushed on creation and popped only by `finish()`.
        let len = self.stack.len();
        &mut self.stack[len - 1]
    }

    fn open(&mut self, kind: Kind, range: Range<usize>) {
        let element = Element::new(kind).at(self.position(range));
        self.stack.push(element);
    }

    fn close(&mut self) {
        if self.stack.len() > 1 {
            if let Some(mut element) = self.stack.pop() {
                if let Kind::Image { alt, .. } = &mut element.kind {
                    *alt = element.children.drain(..).map(|c| c.plain_text()).collect();
                }

                self.top().children.push(element);
            }
        }
    }

    fn leaf(&mut self, kind: Kind, range: Range<usize>) {
        let element = Element::new(kind).at(self.position(range));
        self.top().children.push(element);
    }

    /// Appends text to the literal or text element being built.
    fn text(&mut self, text: &str, range: Range<usize>) {
        let end = self.point(range.end);
        let top = self.top();
        match &mut top.kind {
            Kind::Code { value, .. } | Kind::Html { value } => {
                value.push_str(text);
                return;
            }
            _ => {}
        }

        if let Some(Element { kind: Kind::Text { value }, position, .. }) = top.children.last_mut() {
            value.push_str(text);
            if let Some(position) = position {
                position.end = end;
            }

            return;
        }

        self.leaf(Kind::Text { value: text.to_string() }, range);
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(tag) => {
                let kind = match tag {
                    Tag::Paragraph => Kind::Paragraph,
                    Tag::Heading { level, .. } => Kind::Heading { depth: level as u8 },
                    Tag::BlockQuote => Kind::Blockquote,
                    Tag::List(start) => Kind::List { ordered: start.is_some(), start },
                    Tag::Item => Kind::ListItem,
                    Tag::Emphasis => Kind::Emphasis,
                    Tag::Strong => Kind::Strong,
                    Tag::Strikethrough => Kind::Delete,
                    Tag::Link { dest_url, title, .. } => Kind::Link {
                        url: dest_url.to_string(),
                        title: Some(title.to_string()).filter(|t| !t.is_empty()),
                    },
                    Tag::Image { dest_url, title, .. } => Kind::Image {
                        url: dest_url.to_string(),
                        title: Some(title.to_string()).filter(|t| !t.is_empty()),
                        alt: String::new(),
                    },
                    Tag::CodeBlock(CodeBlockKind::Fenced(info)) => {
                        let (lang, meta) = match info.trim().split_once(char::is_whitespace) {
                            Some((lang, meta)) => (lang.to_string(), Some(meta.trim().to_string())),
                            None => (info.trim().to_string(), None),
                        };

                        let lang = Some(lang).filter(|l| !l.is_empty());
                        Kind::Code { lang, meta, value: String::new() }
                    }
                    Tag::CodeBlock(CodeBlockKind::Indented) => {
                        Kind::Code { lang: None, meta: None, value: String::new() }
                    }
                    Tag::HtmlBlock => Kind::Html { value: String::new() },
                    _ => Kind::Parent,
                };

                self.open(kind, range);
            }
            Event::End(_) => self.close(),
            Event::Text(text) => self.text(&text, range),
            Event::SoftBreak => self.text("\n", range),
            Event::Code(code) => self.leaf(Kind::InlineCode { value: code.to_string() }, range),
            Event::Html(html) | Event::InlineHtml(html) => {
                if matches!(self.top().kind, Kind::Html { .. }) {
                    self.text(&html, range);
                } else {
                    self.leaf(Kind::Html { value: html.to_string() }, range);
                }
            }
            Event::HardBreak => self.leaf(Kind::Break, range),
            Event::Rule => self.leaf(Kind::ThematicBreak, range),
            _ => {}
        }
    }

    fn finish(mut self) -> Element {
        while self.stack.len() > 1 {
            self.close();
        }

        self.stack.pop().unwrap_or_else(|| Element::new(Kind::Root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Element {
        CommonMark.parse(text).unwrap()
    }

    #[test]
    fn builds_a_tree() {
        let root = parse("# Title\n\nSome *emphasis* and `code`.\n\n> quoted\n");
        assert_eq!(root.kind, Kind::Root);
        assert_eq!(root.children.len(), 3);

        let heading = &root.children[0];
        assert_eq!(heading.kind, Kind::Heading { depth: 1 });
        assert_eq!(heading.plain_text(), "Title");

        let paragraph = &root.children[1];
        let kinds = paragraph.children.iter().map(|c| &c.kind).collect::<Vec<_>>();
        assert_eq!(kinds, [
            &Kind::Text { value: "Some ".into() },
            &Kind::Emphasis,
            &Kind::Text { value: " and ".into() },
            &Kind::InlineCode { value: "code".into() },
            &Kind::Text { value: ".".into() },
        ]);

        assert_eq!(root.children[2].kind, Kind::Blockquote);
        assert_eq!(root.children[2].plain_text(), "quoted");
    }

    #[test]
    fn merges_text_across_soft_breaks() {
        let root = parse("include(\"a.md\")\ninclude(\"b.md\")\n");
        let paragraph = &root.children[0];
        assert_eq!(paragraph.children.len(), 1);
        assert_eq!(paragraph.children[0].text(), Some("include(\"a.md\")\ninclude(\"b.md\")"));
    }

    #[test]
    fn records_positions() {
        let root = parse("first\n\nsecond line\n");
        let text = &root.children[1].children[0];
        let position = text.position.unwrap();
        assert_eq!(position.start, Point { line: 3, column: 1, offset: 7 });
        assert_eq!(position.end, Point { line: 3, column: 12, offset: 18 });
    }

    #[test]
    fn code_blocks_split_their_info_string() {
        let root = parse("```rust ignore\nlet x = 1;\n```\n\n    indented\n");
        assert_eq!(root.children[0].kind, Kind::Code {
            lang: Some("rust".into()),
            meta: Some("ignore".into()),
            value: "let x = 1;\n".into(),
        });

        assert_eq!(root.children[1].kind, Kind::Code { lang: None, meta: None, value: "indented\n".into() });
    }

    #[test]
    fn lists_links_and_images() {
        let root = parse("3. [site](https://x.y \"T\")\n4. ![alt *text*](a.png)\n");
        let list = &root.children[0];
        assert_eq!(list.kind, Kind::List { ordered: true, start: Some(3) });
        assert_eq!(list.children.len(), 2);

        let link = &list.children[0].children[0];
        assert_eq!(link.kind, Kind::Link { url: "https://x.y".into(), title: Some("T".into()) });
        assert_eq!(link.plain_text(), "site");

        let image = &list.children[1].children[0];
        assert_eq!(image.kind, Kind::Image { url: "a.png".into(), title: None, alt: "alt text".into() });
    }
}
