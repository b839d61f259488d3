use serde::{Serialize, Deserialize};

/// A point in a source file. `line` and `column` are 1-based; `offset` is a
/// 0-based byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub start: Point,
    pub end: Point,
}

/// One element of a document's syntax tree.
///
/// Serializes as a flat object: the kind's `type` tag and fields, then
/// `children` (omitted when empty) and `position`.
///
/// ```rust
/// use quire::document::{Element, Kind};
///
/// let text = Element::new(Kind::Text { value: "hi".into() });
/// let root = Element::parent(Kind::Root, vec![Element::parent(Kind::Paragraph, vec![text])]);
/// let json = serde_json::to_string(&root).unwrap();
/// assert_eq!(json, r#"{"type":"root","children":[{"type":"paragraph","children":[{"type":"text","value":"hi"}]}]}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(flatten)]
    pub kind: Kind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Kind {
    Root,
    Paragraph,
    Heading { depth: u8 },
    Blockquote,
    List {
        ordered: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<u64>,
    },
    ListItem,
    Emphasis,
    Strong,
    Delete,
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        alt: String,
    },
    Text { value: String },
    InlineCode { value: String },
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<String>,
        value: String,
    },
    Html { value: String },
    ThematicBreak,
    Break,
    /// A container with no more specific kind.
    Parent,
}

impl Kind {
    /// Whether elements of this kind hold their content in a `value` rather
    /// than in children.
    pub fn is_literal(&self) -> bool {
        matches!(self, Kind::Text { .. } | Kind::InlineCode { .. } | Kind::Code { .. } | Kind::Html { .. })
    }

    /// Whether elements of this kind belong in a paragraph.
    pub fn is_inline(&self) -> bool {
        matches!(self,
            Kind::Emphasis | Kind::Strong | Kind::Delete | Kind::Link { .. }
            | Kind::Image { .. } | Kind::Text { .. } | Kind::InlineCode { .. } | Kind::Break)
    }
}

impl Element {
    pub fn new(kind: Kind) -> Self {
        Element { kind, children: vec![], position: None }
    }

    pub fn parent(kind: Kind, children: Vec<Element>) -> Self {
        Element { kind, children, position: None }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// The `value` of a [`Kind::Text`].
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            Kind::Text { value } => Some(value),
            _ => None,
        }
    }

    /// The element at `address`: a list of child indices starting at `self`.
    pub fn get(&self, address: &[usize]) -> Option<&Element> {
        address.iter().try_fold(self, |element, &i| element.children.get(i))
    }

    pub fn get_mut(&mut self, address: &[usize]) -> Option<&mut Element> {
        address.iter().try_fold(self, |element, &i| element.children.get_mut(i))
    }

    /// Calls `f` with the address of, and a reference to, every element in
    /// pre-order.
    pub fn walk<F: FnMut(&[usize], &Element)>(&self, mut f: F) {
        fn walk<F: FnMut(&[usize], &Element)>(element: &Element, address: &mut Vec<usize>, f: &mut F) {
            f(address, element);
            for (i, child) in element.children.iter().enumerate() {
                address.push(i);
                walk(child, address, f);
                address.pop();
            }
        }

        walk(self, &mut vec![], &mut f)
    }

    /// The concatenated text of every [`Kind::Text`] and
    /// [`Kind::InlineCode`] below `self`.
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        self.walk(|_, element| match &element.kind {
            Kind::Text { value } | Kind::InlineCode { value } => text.push_str(value),
            _ => {}
        });

        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Element {
        Element::new(Kind::Text { value: value.into() })
    }

    #[test]
    fn serializes_like_mdast() {
        let point = |line, column, offset| Point { line, column, offset };
        let code = Element::new(Kind::Code { lang: Some("rust".into()), meta: None, value: "fn f() {}".into() })
            .at(Position { start: point(1, 1, 0), end: point(3, 4, 20) });

        let json = serde_json::to_value(&code).unwrap();
        assert_eq!(json, serde_json::json!({
            "type": "code",
            "lang": "rust",
            "value": "fn f() {}",
            "position": {
                "start": { "line": 1, "column": 1, "offset": 0 },
                "end": { "line": 3, "column": 4, "offset": 20 },
            }
        }));

        let back: Element = serde_json::from_value(json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn deserializes_nested_parents() {
        let json = r#"{"type":"root","children":[
            {"type":"heading","depth":2,"children":[{"type":"text","value":"T"}]},
            {"type":"listItem","children":[{"type":"thematicBreak"}]}
        ]}"#;

        let root: Element = serde_json::from_str(json).unwrap();
        assert_eq!(root.kind, Kind::Root);
        assert_eq!(root.get(&[0]).unwrap().kind, Kind::Heading { depth: 2 });
        assert_eq!(root.get(&[0, 0]).unwrap().text(), Some("T"));
        assert_eq!(root.get(&[1, 0]).unwrap().kind, Kind::ThematicBreak);
        assert!(root.get(&[1, 1]).is_none());
    }

    #[test]
    fn walk_is_pre_order() {
        let root = Element::parent(Kind::Root, vec![
            Element::parent(Kind::Paragraph, vec![text("a"), Element::parent(Kind::Emphasis, vec![text("b")])]),
            Element::parent(Kind::Paragraph, vec![text("c")]),
        ]);

        let mut seen = vec![];
        root.walk(|address, element| {
            if let Some(value) = element.text() {
                seen.push((address.to_vec(), value.to_string()));
            }
        });

        assert_eq!(seen, [
            (vec![0, 0], "a".to_string()),
            (vec![0, 1, 0], "b".to_string()),
            (vec![1, 0], "c".to_string()),
        ]);

        assert_eq!(root.plain_text(), "abc");
    }
}
