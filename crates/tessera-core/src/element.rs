//! Segment chain: typed representation of rich message markup.
//!
//! Markup is XML-like text. Plain text uses `&lt;`, `&gt;`, `&amp;` and
//! `&quot;` escapes; tags are either self-closing (`<quote id="99"/>`) or
//! paired (`<b>bold</b>`). Attribute values may be quoted or bare
//! (`<quote id=99/>`).
//!
//! [`parse`] never fails: a `<` that does not open a well-formed tag is kept
//! as literal text, and a paired tag without its closing tag swallows the rest
//! of the input as children.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

/// Target of an `<at>` mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "id")]
pub enum Mention {
    /// A single user.
    User(String),
    /// Everyone holding a role.
    Role(String),
    /// Everyone in the channel.
    Everyone,
    /// Everyone currently online in the channel.
    Here,
}

/// One typed segment of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Element {
    /// Plain, unescaped text.
    Text {
        /// The text.
        content: String,
    },
    /// A mention.
    At {
        /// Who is mentioned.
        target: Mention,
    },
    /// A channel reference.
    Sharp {
        /// Channel ID.
        id: String,
    },
    /// Reply marker naming the quoted message.
    Quote {
        /// Quoted message ID.
        id: String,
    },
    /// An embeddable image.
    Image {
        /// Image URL.
        src: String,
    },
    /// Any other tag.
    Node {
        /// Tag name.
        tag: String,
        /// Attributes in source order.
        attrs: Vec<(String, String)>,
        /// Child segments.
        children: Vec<Element>,
    },
}

impl Element {
    /// Plain text segment.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Reply marker.
    #[must_use]
    pub fn quote(id: impl Into<String>) -> Self {
        Self::Quote { id: id.into() }
    }

    /// Image segment.
    #[must_use]
    pub fn image(src: impl Into<String>) -> Self {
        Self::Image { src: src.into() }
    }

    /// User mention.
    #[must_use]
    pub fn at(id: impl Into<String>) -> Self {
        Self::At {
            target: Mention::User(id.into()),
        }
    }

    /// Generic tag.
    #[must_use]
    pub fn node(tag: impl Into<String>, children: Vec<Element>) -> Self {
        Self::Node {
            tag: tag.into(),
            attrs: Vec::new(),
            children,
        }
    }

    /// Build a typed segment from a tag name, attributes and children.
    fn from_tag(tag: String, attrs: Vec<(String, String)>, children: Vec<Element>) -> Self {
        let attr = |name: &str| {
            attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };

        match tag.as_str() {
            "quote" => {
                if let Some(id) = attr("id") {
                    return Self::Quote { id };
                }
            },
            "img" | "image" => {
                if let Some(src) = attr("src").or_else(|| attr("url")) {
                    return Self::Image { src };
                }
            },
            "sharp" => {
                if let Some(id) = attr("id") {
                    return Self::Sharp { id };
                }
            },
            "at" => {
                let target = match (attr("id"), attr("role"), attr("type").as_deref()) {
                    (Some(id), _, _) => Some(Mention::User(id)),
                    (None, Some(role), _) => Some(Mention::Role(role)),
                    (None, None, Some("all")) => Some(Mention::Everyone),
                    (None, None, Some("here")) => Some(Mention::Here),
                    _ => None,
                };
                if let Some(target) = target {
                    return Self::At { target };
                }
            },
            _ => {},
        }

        Self::Node {
            tag,
            attrs,
            children,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { content } => f.write_str(&escape(content, false)),
            Self::At { target } => match target {
                Mention::User(id) => write!(f, "<at id=\"{}\"/>", escape(id, true)),
                Mention::Role(id) => write!(f, "<at role=\"{}\"/>", escape(id, true)),
                Mention::Everyone => f.write_str("<at type=\"all\"/>"),
                Mention::Here => f.write_str("<at type=\"here\"/>"),
            },
            Self::Sharp { id } => write!(f, "<sharp id=\"{}\"/>", escape(id, true)),
            Self::Quote { id } => write!(f, "<quote id=\"{}\"/>", escape(id, true)),
            Self::Image { src } => write!(f, "<img src=\"{}\"/>", escape(src, true)),
            Self::Node {
                tag,
                attrs,
                children,
            } => {
                write!(f, "<{tag}")?;
                for (key, value) in attrs {
                    write!(f, " {key}=\"{}\"", escape(value, true))?;
                }
                if children.is_empty() {
                    return f.write_str("/>");
                }
                f.write_char('>')?;
                for child in children {
                    write!(f, "{child}")?;
                }
                write!(f, "</{tag}>")
            },
        }
    }
}

/// Parse markup into a segment chain.
///
/// Paired tags nest at most [`MAX_DEPTH`] levels; deeper opening tags are
/// kept as literal text.
#[must_use]
pub fn parse(source: &str) -> Vec<Element> {
    let mut parser = Parser {
        src: source,
        pos: 0,
        depth: 0,
    };
    parser.parse_nodes(None)
}

/// Serialize a segment chain back to markup.
#[must_use]
pub fn serialize(chain: &[Element]) -> String {
    let mut out = String::new();
    for element in chain {
        let _ = write!(out, "{element}");
    }
    out
}

/// Remove a leading quote segment and return the quoted message ID.
///
/// The chain is left untouched when its first segment is not a quote.
pub fn take_leading_quote(chain: &mut Vec<Element>) -> Option<String> {
    match chain.first() {
        Some(Element::Quote { .. }) => match chain.remove(0) {
            Element::Quote { id } => Some(id),
            _ => None,
        },
        _ => None,
    }
}

/// Returns `true` if any segment (at any depth) is an image.
#[must_use]
pub fn contains_image(chain: &[Element]) -> bool {
    chain.iter().any(|element| match element {
        Element::Image { .. } => true,
        Element::Node { children, .. } => contains_image(children),
        _ => false,
    })
}

/// Escape text for inclusion in markup. Attribute values also escape `"`.
#[must_use]
pub fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse [`escape`]. Unknown entities are kept verbatim.
#[must_use]
pub fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

// ── Parser ───────────────────────────────────────────────────

/// Deepest nesting of paired tags [`parse`] builds.
pub const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    /// Paired tags currently open.
    depth: usize,
}

/// An opening tag recognised at the cursor.
struct OpenTag {
    name: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
    /// Byte length of the tag in the source.
    len: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn advance(&mut self, bytes: usize) {
        self.pos = self.pos.saturating_add(bytes).min(self.src.len());
    }

    /// Parse sibling nodes until `closing` (or end of input) is reached.
    fn parse_nodes(&mut self, closing: Option<&str>) -> Vec<Element> {
        let mut out = Vec::new();
        let mut text = String::new();

        while self.pos < self.src.len() {
            let rest = self.rest();

            if rest.starts_with("</") {
                if let Some(name) = closing
                    && let Some(len) = match_close_tag(rest, name)
                {
                    flush_text(&mut text, &mut out);
                    self.advance(len);
                    return out;
                }
                text.push('<');
                self.advance(1);
                continue;
            }

            if rest.starts_with('<') {
                if let Some(tag) = parse_open_tag(rest) {
                    if !tag.self_closing && self.depth >= MAX_DEPTH {
                        text.push_str(&rest[..tag.len]);
                        self.advance(tag.len);
                        continue;
                    }
                    flush_text(&mut text, &mut out);
                    self.advance(tag.len);
                    let children = if tag.self_closing {
                        Vec::new()
                    } else {
                        self.depth = self.depth.saturating_add(1);
                        let children = self.parse_nodes(Some(&tag.name));
                        self.depth = self.depth.saturating_sub(1);
                        children
                    };
                    out.push(Element::from_tag(tag.name, tag.attrs, children));
                } else {
                    text.push('<');
                    self.advance(1);
                }
                continue;
            }

            let next = rest.find('<').unwrap_or(rest.len());
            text.push_str(&unescape(&rest[..next]));
            self.advance(next);
        }

        flush_text(&mut text, &mut out);
        out
    }
}

fn flush_text(text: &mut String, out: &mut Vec<Element>) {
    if !text.is_empty() {
        out.push(Element::Text {
            content: std::mem::take(text),
        });
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.')
}

/// Match `</name>` (with optional whitespace before `>`) at the start of
/// `rest`, returning its byte length.
fn match_close_tag(rest: &str, name: &str) -> Option<usize> {
    let after = rest.strip_prefix("</")?.strip_prefix(name)?;
    let trimmed = after.trim_start();
    if !trimmed.starts_with('>') {
        return None;
    }
    let consumed = rest.len().saturating_sub(trimmed.len());
    Some(consumed.saturating_add(1))
}

/// Parse an opening tag at the start of `rest` (which begins with `<`).
fn parse_open_tag(rest: &str) -> Option<OpenTag> {
    let body = rest.strip_prefix('<')?;
    let name_len = body.find(|c: char| !is_name_char(c)).unwrap_or(body.len());
    if name_len == 0 || !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let name = body[..name_len].to_owned();
    let mut cursor = &body[name_len..];
    let mut attrs = Vec::new();

    loop {
        cursor = cursor.trim_start();
        if let Some(after) = cursor.strip_prefix("/>") {
            return Some(OpenTag {
                name,
                attrs,
                self_closing: true,
                len: rest.len().saturating_sub(after.len()),
            });
        }
        if let Some(after) = cursor.strip_prefix('>') {
            return Some(OpenTag {
                name,
                attrs,
                self_closing: false,
                len: rest.len().saturating_sub(after.len()),
            });
        }

        let key_len = cursor
            .find(|c: char| c.is_whitespace() || matches!(c, '=' | '/' | '>' | '<'))
            .unwrap_or(cursor.len());
        if key_len == 0 {
            return None;
        }
        let key = cursor[..key_len].to_owned();
        cursor = &cursor[key_len..];

        let Some(after_eq) = cursor.trim_start().strip_prefix('=') else {
            attrs.push((key, String::new()));
            continue;
        };
        let value_src = after_eq.trim_start();

        let (value, remainder) = if let Some(quote) = value_src
            .chars()
            .next()
            .filter(|c| matches!(c, '"' | '\''))
        {
            let inner = &value_src[1..];
            let end = inner.find(quote)?;
            (&inner[..end], &inner[end.saturating_add(1)..])
        } else {
            let end = bare_value_end(value_src);
            if end == 0 {
                return None;
            }
            (&value_src[..end], &value_src[end..])
        };

        attrs.push((key, unescape(value)));
        cursor = remainder;
    }
}

/// End of a bare attribute value: whitespace, `>`, or a `/>` terminator.
fn bare_value_end(src: &str) -> usize {
    for (idx, c) in src.char_indices() {
        if c.is_whitespace() || c == '>' || c == '<' {
            return idx;
        }
        if c == '/' && src[idx..].starts_with("/>") {
            return idx;
        }
    }
    src.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_text() {
        assert_eq!(parse("hello"), vec![Element::text("hello")]);
    }

    #[test]
    fn parse_empty_input() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn parse_unescapes_entities() {
        assert_eq!(
            parse("a &lt;b&gt; &amp; &quot;c&quot;"),
            vec![Element::text("a <b> & \"c\"")]
        );
    }

    #[test]
    fn parse_bare_attribute_quote() {
        let chain = parse("<quote id=99/>hi");
        assert_eq!(chain, vec![Element::quote("99"), Element::text("hi")]);
    }

    #[test]
    fn parse_quoted_attribute_quote() {
        let chain = parse("<quote id=\"99\"/>hi");
        assert_eq!(chain, vec![Element::quote("99"), Element::text("hi")]);
    }

    #[test]
    fn parse_single_quoted_attribute() {
        let chain = parse("<img src='https://x.test/a.png'/>");
        assert_eq!(chain, vec![Element::image("https://x.test/a.png")]);
    }

    #[test]
    fn parse_mentions() {
        let chain = parse("<at id=\"1\"/><at role=\"2\"/><at type=\"all\"/><at type=\"here\"/>");
        assert_eq!(
            chain,
            vec![
                Element::at("1"),
                Element::At {
                    target: Mention::Role("2".into())
                },
                Element::At {
                    target: Mention::Everyone
                },
                Element::At {
                    target: Mention::Here
                },
            ]
        );
    }

    #[test]
    fn parse_paired_tag_with_children() {
        let chain = parse("<b>bold <i>both</i></b> plain");
        assert_eq!(
            chain,
            vec![
                Element::node(
                    "b",
                    vec![
                        Element::text("bold "),
                        Element::node("i", vec![Element::text("both")]),
                    ]
                ),
                Element::text(" plain"),
            ]
        );
    }

    #[test]
    fn parse_lone_angle_bracket_is_text() {
        assert_eq!(parse("1 < 2"), vec![Element::text("1 < 2")]);
        assert_eq!(parse("a <"), vec![Element::text("a <")]);
        assert_eq!(parse("</b> x"), vec![Element::text("</b> x")]);
    }

    #[test]
    fn parse_unterminated_attribute_is_text() {
        assert_eq!(
            parse("<img src=\"oops"),
            vec![Element::text("<img src=\"oops")]
        );
    }

    #[test]
    fn parse_unclosed_pair_takes_rest() {
        let chain = parse("<b>never closed");
        assert_eq!(
            chain,
            vec![Element::node("b", vec![Element::text("never closed")])]
        );
    }

    #[test]
    fn parse_keeps_unicode_text() {
        let chain = parse("héllo <at id=7/> 世界");
        assert_eq!(
            chain,
            vec![
                Element::text("héllo "),
                Element::at("7"),
                Element::text(" 世界"),
            ]
        );
    }

    #[test]
    fn serialize_escapes_text_and_attrs() {
        let chain = vec![
            Element::text("a < b & c"),
            Element::image("https://x.test/?a=1&b=\"2\""),
        ];
        assert_eq!(
            serialize(&chain),
            "a &lt; b &amp; c<img src=\"https://x.test/?a=1&amp;b=&quot;2&quot;\"/>"
        );
    }

    #[test]
    fn serialize_then_parse_is_stable() {
        let source = "<quote id=\"5\"/>hi <at id=\"1\"/> <b>x &amp; y</b><img src=\"u\"/>";
        let chain = parse(source);
        assert_eq!(serialize(&chain), source);
        assert_eq!(parse(&serialize(&chain)), chain);
    }

    #[test]
    fn leading_quote_is_extracted_once() {
        let mut chain = parse("<quote id=99/>hi");
        assert_eq!(take_leading_quote(&mut chain).as_deref(), Some("99"));
        let rendered = serialize(&chain);
        assert_eq!(rendered, "hi");
        assert!(!rendered.contains("quote"));

        let mut reparsed = parse(&rendered);
        assert!(take_leading_quote(&mut reparsed).is_none());
        assert_eq!(reparsed, chain);
    }

    #[test]
    fn chain_without_quote_is_unchanged() {
        let original = parse("hi <quote id=1/>");
        let mut chain = original.clone();
        assert!(take_leading_quote(&mut chain).is_none());
        assert_eq!(chain, original);
    }

    #[test]
    fn contains_image_searches_nested_nodes() {
        assert!(contains_image(&parse("<b><img src=x/></b>")));
        assert!(contains_image(&parse("<image url=\"y\"/>")));
        assert!(!contains_image(&parse("<b>text</b>")));
    }

    #[test]
    fn deep_nesting_is_capped() {
        let source = "<b>".repeat(20_000) + "x";
        let chain = parse(&source);

        let mut depth = 0;
        let mut level = chain.as_slice();
        while let [Element::Node { children, .. }] = level {
            depth += 1;
            level = children;
        }
        assert_eq!(depth, MAX_DEPTH);
        match level {
            [Element::Text { content }] => {
                assert!(content.starts_with("<b><b>"));
                assert!(content.ends_with("<b>x"));
            },
            other => panic!("expected literal text at the cap, got {other:?}"),
        }
        assert!(serialize(&chain).ends_with("x</b>"));
    }

    #[test]
    fn self_closing_tags_are_kept_at_the_cap() {
        let source = "<b>".repeat(MAX_DEPTH) + "<img src=x/>";
        assert!(contains_image(&parse(&source)));
    }
}
