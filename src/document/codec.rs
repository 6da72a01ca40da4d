//! Markup codec for profile documents
//!
//! Parses stored profile text into a [`Document`] and writes it back in
//! canonical form:
//!
//! - no pretty-printing, no trailing newline
//! - attributes in input order, values double-quoted
//! - `&`, `<`, `>` escaped in text; `"` additionally in attribute values
//! - leaves with empty text and childless elements written as `<tag/>`
//! - a fixed declaration chosen by [`DeclarationPolicy`], never copied
//!   from the input
//!
//! `parse(serialize(d)) == d` for every document `d`.

use super::errors::{ParseError, ParseResult};
use super::node::{Attribute, Document, Node};

/// Nesting limit for parsed documents
pub const MAX_DEPTH: usize = 256;

/// Declaration written in front of the root element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeclarationPolicy {
    /// `<?xml version="1.0" encoding="UTF-8" standalone="yes"?>`
    #[default]
    Standalone,
    /// No declaration
    Omit,
}

impl DeclarationPolicy {
    pub fn header(&self) -> &'static str {
        match self {
            DeclarationPolicy::Standalone => {
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#
            }
            DeclarationPolicy::Omit => "",
        }
    }
}

/// Stateless document codec
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentCodec {
    declaration: DeclarationPolicy,
}

impl DocumentCodec {
    pub fn new(declaration: DeclarationPolicy) -> Self {
        Self { declaration }
    }

    /// Parse raw profile text.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` on malformed input, including text mixed with
    /// child elements, which the tree model cannot hold.
    pub fn parse(&self, raw: &str) -> ParseResult<Document> {
        let mut parser = Parser::new(raw);
        parser.parse_document()
    }

    /// Serialize to canonical text
    pub fn serialize(&self, document: &Document) -> String {
        let mut out = String::with_capacity(256);
        out.push_str(self.declaration.header());
        write_node(&mut out, document.root());
        out
    }
}

fn write_node(out: &mut String, node: &Node) {
    out.push('<');
    out.push_str(node.tag());
    for attribute in node.attributes() {
        out.push(' ');
        out.push_str(&attribute.name);
        out.push_str("=\"");
        escape_into(out, &attribute.value, true);
        out.push('"');
    }
    match node {
        Node::Element { children, .. } if !children.is_empty() => {
            out.push('>');
            for child in children {
                write_node(out, child);
            }
        }
        Node::Leaf { text, .. } if !text.is_empty() => {
            out.push('>');
            escape_into(out, text, false);
        }
        _ => {
            out.push_str("/>");
            return;
        }
    }
    out.push_str("</");
    out.push_str(node.tag());
    out.push('>');
}

fn escape_into(out: &mut String, s: &str, attribute: bool) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

/// Recursive-descent scanner over the raw text
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let pos = if input.starts_with('\u{feff}') { 3 } else { 0 };
        Self { input, pos }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn error(&self, reason: impl Into<String>) -> ParseError {
        ParseError::new(self.pos, reason)
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start_matches(|c: char| c.is_ascii_whitespace());
        self.pos += rest.len() - trimmed.len();
    }

    fn expect(&mut self, token: &str) -> ParseResult<()> {
        if self.starts_with(token) {
            self.pos += token.len();
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", token)))
        }
    }

    /// Advance past `terminator`, returning the text before it
    fn take_until(&mut self, terminator: &str, what: &str) -> ParseResult<&'a str> {
        match self.rest().find(terminator) {
            Some(idx) => {
                let text = &self.rest()[..idx];
                self.pos += idx + terminator.len();
                Ok(text)
            }
            None => Err(self.error(format!("unterminated {}", what))),
        }
    }

    /// Skip comments, processing instructions and whitespace outside the root
    fn skip_misc(&mut self) -> ParseResult<()> {
        loop {
            self.skip_whitespace();
            if self.starts_with("<?") {
                self.take_until("?>", "processing instruction")?;
            } else if self.starts_with("<!--") {
                self.take_until("-->", "comment")?;
            } else if self.starts_with("<!DOCTYPE") {
                return Err(self.error("document type declarations are not supported"));
            } else {
                return Ok(());
            }
        }
    }

    fn parse_document(&mut self) -> ParseResult<Document> {
        self.skip_misc()?;
        if self.at_end() {
            return Err(self.error("missing root element"));
        }
        if !self.starts_with("<") {
            return Err(self.error("text outside of root element"));
        }
        let root = self.parse_element(1)?;
        self.skip_misc()?;
        if !self.at_end() {
            return Err(self.error("content after root element"));
        }
        Ok(Document::from_root(root))
    }

    fn parse_name(&mut self) -> ParseResult<&'a str> {
        let rest = self.rest();
        let mut end = 0;
        for (idx, c) in rest.char_indices() {
            let valid = if idx == 0 {
                c.is_alphabetic() || c == '_' || c == ':'
            } else {
                c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.')
            };
            if !valid {
                break;
            }
            end = idx + c.len_utf8();
        }
        if end == 0 {
            return Err(self.error("expected a name"));
        }
        self.pos += end;
        Ok(&rest[..end])
    }

    fn parse_attribute_value(&mut self) -> ParseResult<String> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected quoted attribute value")),
        };
        self.pos += 1;
        let start = self.pos;
        let raw = match self.rest().find(quote) {
            Some(idx) => &self.rest()[..idx],
            None => return Err(self.error("unterminated attribute value")),
        };
        if raw.contains('<') {
            return Err(self.error("'<' in attribute value"));
        }
        self.pos += raw.len() + 1;
        decode_entities(raw, start)
    }

    /// Parse one element; the scanner sits on its `<`
    fn parse_element(&mut self, depth: usize) -> ParseResult<Node> {
        if depth > MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {}", MAX_DEPTH)));
        }
        let start = self.pos;
        self.expect("<")?;
        let tag = self.parse_name()?;

        let mut attributes: Vec<Attribute> = Vec::new();
        loop {
            let before = self.pos;
            self.skip_whitespace();
            if self.starts_with("/>") {
                self.pos += 2;
                return Ok(Node::Leaf {
                    tag: tag.to_string(),
                    attributes,
                    text: String::new(),
                });
            }
            if self.starts_with(">") {
                self.pos += 1;
                break;
            }
            if self.pos == before {
                return Err(self.error("expected whitespace before attribute"));
            }
            let name = self.parse_name()?;
            self.skip_whitespace();
            self.expect("=")?;
            self.skip_whitespace();
            let value = self.parse_attribute_value()?;
            if attributes.iter().any(|a| a.name == name) {
                return Err(self.error(format!("duplicate attribute '{}'", name)));
            }
            attributes.push(Attribute::new(name, value));
        }

        let mut children = Vec::new();
        let mut text = String::new();
        let mut text_offset = None;
        loop {
            if self.at_end() {
                return Err(ParseError::new(start, format!("unclosed element '{}'", tag)));
            }
            if self.starts_with("</") {
                self.pos += 2;
                let closing = self.parse_name()?;
                if closing != tag {
                    return Err(self.error(format!(
                        "closing tag '{}' does not match '{}'",
                        closing, tag
                    )));
                }
                self.skip_whitespace();
                self.expect(">")?;
                break;
            } else if self.starts_with("<!--") {
                self.take_until("-->", "comment")?;
            } else if self.starts_with("<![CDATA[") {
                self.pos += "<![CDATA[".len();
                let offset = self.pos;
                let data = self.take_until("]]>", "CDATA section")?;
                if !data.trim().is_empty() {
                    text_offset.get_or_insert(offset);
                }
                text.push_str(data);
            } else if self.starts_with("<?") {
                self.take_until("?>", "processing instruction")?;
            } else if self.starts_with("<") {
                children.push(self.parse_element(depth + 1)?);
            } else {
                let offset = self.pos;
                let raw = match self.rest().find('<') {
                    Some(idx) => &self.rest()[..idx],
                    None => self.rest(),
                };
                self.pos += raw.len();
                let decoded = decode_entities(raw, offset)?;
                if !decoded.trim().is_empty() {
                    text_offset.get_or_insert(offset);
                }
                text.push_str(&decoded);
            }
        }

        let tag = tag.to_string();
        if children.is_empty() {
            return Ok(Node::Leaf {
                tag,
                attributes,
                text,
            });
        }
        if let Some(offset) = text_offset {
            return Err(ParseError::new(
                offset,
                format!("element '{}' mixes text with child elements", tag),
            ));
        }
        Ok(Node::Element {
            tag,
            attributes,
            children,
        })
    }
}

/// Resolve predefined entities and character references
fn decode_entities(raw: &str, offset: usize) -> ParseResult<String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let at = offset + (raw.len() - rest.len()) + amp;
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| ParseError::new(at, "unterminated entity reference"))?;
        let entity = &after[..semi];
        let decoded = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32).ok_or_else(|| {
                    ParseError::new(at, format!("unknown entity '&{};'", entity))
                })?
            }
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><profile><description>Description stored as a profile.</description><name>profileItem</name><property1>propvalue1</property1></profile>"#;

    #[test]
    fn test_parse_stored_profile() {
        let doc = DocumentCodec::default().parse(STORED).unwrap();
        let root = doc.root();
        assert_eq!(root.tag(), "profile");
        assert_eq!(root.children().len(), 3);
        assert_eq!(root.children()[1], Node::leaf("name", "profileItem"));
    }

    #[test]
    fn test_serialize_is_byte_identical_for_canonical_input() {
        let codec = DocumentCodec::default();
        let doc = codec.parse(STORED).unwrap();
        assert_eq!(codec.serialize(&doc), STORED);
    }

    #[test]
    fn test_omit_declaration() {
        let codec = DocumentCodec::new(DeclarationPolicy::Omit);
        let doc = codec.parse(STORED).unwrap();
        assert!(codec.serialize(&doc).starts_with("<profile>"));
    }

    #[test]
    fn test_declaration_independent_of_input() {
        let codec = DocumentCodec::default();
        let doc = codec
            .parse(r#"<?xml version="1.0" encoding="ISO-8859-1"?><profile><a>1</a></profile>"#)
            .unwrap();
        assert_eq!(
            codec.serialize(&doc),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><profile><a>1</a></profile>"#
        );
    }

    #[test]
    fn test_pretty_printed_input_is_canonicalized() {
        let codec = DocumentCodec::new(DeclarationPolicy::Omit);
        let raw = "<profile>\n  <genre>g1</genre>\n  <genre>g2</genre>\n  <!-- note -->\n</profile>\n";
        let doc = codec.parse(raw).unwrap();
        assert_eq!(
            codec.serialize(&doc),
            "<profile><genre>g1</genre><genre>g2</genre></profile>"
        );
    }

    #[test]
    fn test_entities_and_cdata() {
        let codec = DocumentCodec::new(DeclarationPolicy::Omit);
        let doc = codec
            .parse("<p><a>x &amp; y &lt;z&gt; &#65;&#x42;</a><b><![CDATA[1 < 2]]></b></p>")
            .unwrap();
        assert_eq!(doc.root().children()[0].text_content(), "x & y <z> AB");
        assert_eq!(doc.root().children()[1].text_content(), "1 < 2");
        assert_eq!(
            codec.serialize(&doc),
            "<p><a>x &amp; y &lt;z&gt; AB</a><b>1 &lt; 2</b></p>"
        );
    }

    #[test]
    fn test_attributes_preserved() {
        let codec = DocumentCodec::new(DeclarationPolicy::Omit);
        let raw = r#"<profile version="2"><name lang='en' note="a &quot;b&quot;">x</name><flag/></profile>"#;
        let doc = codec.parse(raw).unwrap();
        let name = &doc.root().children()[0];
        assert_eq!(name.attributes()[0], Attribute::new("lang", "en"));
        assert_eq!(name.attributes()[1].value, "a \"b\"");
        assert_eq!(
            codec.serialize(&doc),
            r#"<profile version="2"><name lang="en" note="a &quot;b&quot;">x</name><flag/></profile>"#
        );
    }

    #[test]
    fn test_empty_forms_parse_as_empty_leaf() {
        let codec = DocumentCodec::default();
        let a = codec.parse("<profile><x/></profile>").unwrap();
        let b = codec.parse("<profile><x></x></profile>").unwrap();
        assert_eq!(a, b);
        assert!(a.root().children()[0].is_leaf());
    }

    #[test]
    fn test_rejects_malformed_input() {
        let codec = DocumentCodec::default();
        let cases = [
            "",
            "   ",
            "no markup",
            "<profile>",
            "<profile><name>x</profile>",
            "<profile></profile><second/>",
            "<profile a=1></profile>",
            "<profile a='1' a='2'/>",
            "<profile>&bogus;</profile>",
            "<profile>&amp</profile>",
            "<profile><!-- open</profile>",
            "<!DOCTYPE profile><profile/>",
        ];
        for raw in cases {
            assert!(codec.parse(raw).is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn test_rejects_mixed_content() {
        let codec = DocumentCodec::default();
        let err = codec
            .parse("<profile>hello<name>x</name></profile>")
            .unwrap_err();
        assert!(err.reason().contains("mixes text"));
        assert_eq!(err.offset(), 9);
    }

    #[test]
    fn test_depth_limit() {
        let mut raw = String::new();
        for _ in 0..=MAX_DEPTH {
            raw.push_str("<a>");
        }
        for _ in 0..=MAX_DEPTH {
            raw.push_str("</a>");
        }
        let err = DocumentCodec::default().parse(&raw).unwrap_err();
        assert!(err.reason().contains("nesting"));
    }

    #[test]
    fn test_whitespace_leaf_kept() {
        let codec = DocumentCodec::new(DeclarationPolicy::Omit);
        let doc = codec.parse("<p><a>  </a></p>").unwrap();
        assert_eq!(doc.root().children()[0].text_content(), "  ");
        assert_eq!(codec.serialize(&doc), "<p><a>  </a></p>");
    }
}
