//! Segment chain → Discord message bodies.
//!
//! Text and inline tags render to Discord markdown. Images are lifted out of
//! the text flow into embeds. The rendered text is split at Discord's
//! 2000-character limit, and images ride on the last text piece (at most
//! [`MAX_EMBEDS`] per message) with any overflow in image-only pieces.

use std::fmt::Write as _;

use tessera_core::chunk::chunk_text;
use tessera_core::element::{Element, Mention};

use crate::types::{CreateMessage, DiscordEmbed, MessageReference};

/// Discord's maximum message content length, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Discord's maximum number of embeds on one message.
pub const MAX_EMBEDS: usize = 10;

/// Rendered chain: Discord content plus lifted-out image URLs.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Markdown content.
    pub content: String,
    /// Image URLs in chain order.
    pub images: Vec<String>,
}

/// Render a chain to Discord content, collecting images separately.
#[must_use]
pub fn render(chain: &[Element]) -> Rendered {
    let mut out = Rendered::default();
    render_into(chain, &mut out);
    out
}

/// Encode a chain into one create-message body per API call, in order.
///
/// `reply_to` becomes a `message_reference` on the first body only. An empty
/// chain (or one that renders to nothing but whitespace) yields no bodies.
#[must_use]
pub fn encode(chain: &[Element], reply_to: Option<&str>) -> Vec<CreateMessage> {
    let Rendered { mut content, images } = render(chain);
    if content.trim().is_empty() {
        content.clear();
    }

    let mut pieces: Vec<CreateMessage> = chunk_text(&content, MAX_CONTENT_CHARS)
        .into_iter()
        .map(|content| CreateMessage {
            content,
            ..CreateMessage::default()
        })
        .collect();

    let mut images = images.into_iter().map(DiscordEmbed::image).peekable();
    if let Some(last) = pieces.last_mut() {
        last.embeds.extend(images.by_ref().take(MAX_EMBEDS));
    }
    while images.peek().is_some() {
        pieces.push(CreateMessage {
            embeds: images.by_ref().take(MAX_EMBEDS).collect(),
            ..CreateMessage::default()
        });
    }

    if let (Some(first), Some(id)) = (pieces.first_mut(), reply_to) {
        first.message_reference = Some(MessageReference::reply(id));
    }
    pieces
}

fn render_into(chain: &[Element], out: &mut Rendered) {
    for element in chain {
        match element {
            Element::Text { content } => out.content.push_str(content),
            Element::At { target } => match target {
                Mention::User(id) => {
                    let _ = write!(out.content, "<@{id}>");
                },
                Mention::Role(id) => {
                    let _ = write!(out.content, "<@&{id}>");
                },
                Mention::Everyone => out.content.push_str("@everyone"),
                Mention::Here => out.content.push_str("@here"),
            },
            Element::Sharp { id } => {
                let _ = write!(out.content, "<#{id}>");
            },
            // Only a leading quote is meaningful; it is taken off before
            // encoding.
            Element::Quote { .. } => {},
            Element::Image { src } => out.images.push(src.clone()),
            Element::Node {
                tag,
                attrs,
                children,
            } => render_node(tag, attrs, children, out),
        }
    }
}

fn render_node(tag: &str, attrs: &[(String, String)], children: &[Element], out: &mut Rendered) {
    let attr = |name: &str| {
        attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };

    let wrap = |marker: &str, out: &mut Rendered| {
        out.content.push_str(marker);
        render_into(children, out);
        out.content.push_str(marker);
    };

    match tag {
        "b" | "strong" => wrap("**", out),
        "i" | "em" => wrap("*", out),
        "u" | "ins" => wrap("__", out),
        "s" | "del" => wrap("~~", out),
        "spl" | "spoiler" => wrap("||", out),
        "code" => wrap("`", out),
        "pre" => {
            out.content.push_str("```\n");
            render_into(children, out);
            out.content.push_str("\n```");
        },
        "br" => out.content.push('\n'),
        "p" => {
            if !out.content.is_empty() && !out.content.ends_with('\n') {
                out.content.push('\n');
            }
            render_into(children, out);
            out.content.push('\n');
        },
        "a" => match attr("href") {
            Some(href) if !children.is_empty() => {
                out.content.push('[');
                render_into(children, out);
                let _ = write!(out.content, "]({href})");
            },
            Some(href) => out.content.push_str(href),
            None => render_into(children, out),
        },
        "face" => match (attr("id"), attr("name")) {
            (Some(id), Some(name)) => {
                let prefix = if attr("animated") == Some("true") { "a" } else { "" };
                let _ = write!(out.content, "<{prefix}:{name}:{id}>");
            },
            _ => render_into(children, out),
        },
        _ => render_into(children, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::element;

    fn encode_str(markup: &str) -> Vec<CreateMessage> {
        let mut chain = element::parse(markup);
        let reply = element::take_leading_quote(&mut chain);
        encode(&chain, reply.as_deref())
    }

    #[test]
    fn plain_text_is_one_piece() {
        let pieces = encode_str("hello");
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].content, "hello");
        assert!(pieces[0].embeds.is_empty());
        assert!(pieces[0].message_reference.is_none());
    }

    #[test]
    fn empty_chain_has_no_pieces() {
        assert!(encode(&[], Some("1")).is_empty());
    }

    #[test]
    fn whitespace_only_content_has_no_pieces() {
        assert!(encode_str("<quote id=\"1\"/>  \n ").is_empty());
        assert!(encode_str("<br/><p> </p>").is_empty());

        let pieces = encode_str(" <img src=\"https://x/y.png\"/> ");
        assert_eq!(pieces.len(), 1);
        assert!(pieces[0].content.is_empty());
        assert_eq!(pieces[0].embeds.len(), 1);
    }

    #[test]
    fn escaped_text_is_unescaped() {
        let pieces = encode_str("a &lt;b&gt; &amp; c");
        assert_eq!(pieces[0].content, "a <b> & c");
    }

    #[test]
    fn mentions_and_channels() {
        let pieces =
            encode_str(r#"<at id="1"/> <at role="2"/> <at type="all"/> <at type="here"/> <sharp id="3"/>"#);
        assert_eq!(pieces[0].content, "<@1> <@&2> @everyone @here <#3>");
    }

    #[test]
    fn formatting_nodes_render_markdown() {
        let pieces = encode_str(
            r#"<b>bold</b> <i>it</i> <u>un</u> <s>st</s> <spl>sp</spl> <code>x</code> <a href="https://e.x">link</a>"#,
        );
        assert_eq!(
            pieces[0].content,
            "**bold** *it* __un__ ~~st~~ ||sp|| `x` [link](https://e.x)"
        );
    }

    #[test]
    fn face_renders_custom_emoji() {
        let pieces = encode_str(r#"<face id="9" name="wave"/><face id="8" name="spin" animated="true"/>"#);
        assert_eq!(pieces[0].content, "<:wave:9><a:spin:8>");
    }

    #[test]
    fn unknown_nodes_render_children() {
        let pieces = encode_str("<foo bar=1>inner</foo>");
        assert_eq!(pieces[0].content, "inner");
    }

    #[test]
    fn reply_goes_on_first_piece_only() {
        let long = "x".repeat(MAX_CONTENT_CHARS + 10);
        let pieces = encode_str(&format!(r#"<quote id="99"/>{long}"#));
        assert_eq!(pieces.len(), 2);
        assert_eq!(
            pieces[0]
                .message_reference
                .as_ref()
                .and_then(|r| r.message_id.as_deref()),
            Some("99")
        );
        assert!(pieces[1].message_reference.is_none());
        assert_eq!(pieces[0].content.chars().count(), MAX_CONTENT_CHARS);
        assert_eq!(pieces[1].content.chars().count(), 10);
    }

    #[test]
    fn images_attach_to_last_text_piece() {
        let pieces = encode_str(r#"look<img src="https://a/1.png"/>"#);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].content, "look");
        assert_eq!(pieces[0].embeds, vec![DiscordEmbed::image("https://a/1.png")]);
    }

    #[test]
    fn image_only_message() {
        let pieces = encode_str(r#"<quote id="5"/><img src="https://a/1.png"/>"#);
        assert_eq!(pieces.len(), 1);
        assert!(pieces[0].content.is_empty());
        assert_eq!(pieces[0].embeds.len(), 1);
        assert!(pieces[0].message_reference.is_some());
    }

    #[test]
    fn embed_overflow_gets_own_pieces() {
        let markup: String = (0..23)
            .map(|i| format!(r#"<img src="https://a/{i}.png"/>"#))
            .collect();
        let pieces = encode_str(&format!("text{markup}"));
        let counts: Vec<usize> = pieces.iter().map(|p| p.embeds.len()).collect();
        assert_eq!(counts, vec![10, 10, 3]);
        assert_eq!(pieces[0].content, "text");
        assert!(pieces[1].content.is_empty());
    }

    #[test]
    fn serialized_body_skips_empty_fields() {
        let pieces = encode_str("hi");
        let json = serde_json::to_value(&pieces[0]).unwrap();
        assert_eq!(json, serde_json::json!({"content": "hi"}));
    }
}
