//! Generic tag tokenizer.
//!
//! Walks text once and yields every well-formed `<name ...>`, `<name ... />`
//! and `</name>` it finds. Anything else (prose, stray `<`, a tag cut off by
//! the end of the stream) is not a token. The tokenizer knows nothing about
//! which tag names are meaningful; that is the parser's job.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
    SelfClosing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    pub name: &'a str,
    pub kind: TagKind,
    attrs: Vec<(&'a str, String)>,
    /// Byte range of the whole tag, `<` through `>`.
    pub span: Range<usize>,
}

impl<'a> Tag<'a> {
    /// Decoded value of the first attribute called `name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Continue tokenizing from byte offset `pos` (must follow a token).
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.src.len());
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Tag<'a>> {
        while self.pos < self.src.len() {
            let start = match self.src[self.pos..].find('<') {
                Some(offset) => self.pos + offset,
                None => {
                    self.pos = self.src.len();
                    return None;
                }
            };

            match parse_tag(self.src, start) {
                Some(tag) => {
                    self.pos = tag.span.end;
                    return Some(tag);
                }
                None => self.pos = start + 1,
            }
        }
        None
    }
}

/// Locate the first `</name>` at or after `from`.
///
/// Returns the byte range of the closing tag.
pub fn find_close(src: &str, name: &str, from: usize) -> Option<Range<usize>> {
    let mut search = from;
    while search < src.len() {
        let start = search + src[search..].find("</")?;
        if let Some(tag) = parse_tag(src, start) {
            if tag.kind == TagKind::Close && tag.name == name {
                return Some(tag.span);
            }
        }
        search = start + 2;
    }
    None
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':' | b'.')
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn read_name(src: &str, i: usize) -> Option<(&str, usize)> {
    let bytes = src.as_bytes();
    if i >= bytes.len() || !is_name_start(bytes[i]) {
        return None;
    }
    let mut end = i + 1;
    while end < bytes.len() && is_name_char(bytes[end]) {
        end += 1;
    }
    Some((&src[i..end], end))
}

/// Parse the tag starting at `start` (which must point at `<`).
fn parse_tag(src: &str, start: usize) -> Option<Tag<'_>> {
    let bytes = src.as_bytes();
    let mut i = start + 1;

    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }

    let (name, after_name) = read_name(src, i)?;
    i = after_name;

    if closing {
        i = skip_whitespace(bytes, i);
        return (bytes.get(i) == Some(&b'>')).then(|| Tag {
            name,
            kind: TagKind::Close,
            attrs: Vec::new(),
            span: start..i + 1,
        });
    }

    let mut attrs = Vec::new();
    loop {
        let before_ws = i;
        i = skip_whitespace(bytes, i);
        match bytes.get(i)? {
            b'>' => {
                return Some(Tag {
                    name,
                    kind: TagKind::Open,
                    attrs,
                    span: start..i + 1,
                })
            }
            b'/' => {
                return (bytes.get(i + 1) == Some(&b'>')).then(|| Tag {
                    name,
                    kind: TagKind::SelfClosing,
                    attrs,
                    span: start..i + 2,
                });
            }
            _ => {}
        }

        // Attributes must be separated from the name and from each other.
        if i == before_ws {
            return None;
        }

        let (key, after_key) = read_name(src, i)?;
        i = skip_whitespace(bytes, after_key);

        if bytes.get(i) != Some(&b'=') {
            attrs.push((key, String::new()));
            continue;
        }
        i = skip_whitespace(bytes, i + 1);

        let (raw, after_value) = read_value(src, i)?;
        attrs.push((key, decode_entities(raw)));
        i = after_value;
    }
}

fn read_value(src: &str, i: usize) -> Option<(&str, usize)> {
    let bytes = src.as_bytes();
    match *bytes.get(i)? {
        quote @ (b'"' | b'\'') => {
            let close = src[i + 1..].find(quote as char)?;
            let end = i + 1 + close;
            Some((&src[i + 1..end], end + 1))
        }
        _ => {
            let mut end = i;
            while end < bytes.len()
                && !bytes[end].is_ascii_whitespace()
                && !matches!(bytes[end], b'>' | b'"' | b'\'' | b'<' | b'=')
            {
                end += 1;
            }
            if end == i {
                return None;
            }
            // `<a b=c/>` keeps `/` out of the value
            if end > i + 1 && bytes[end - 1] == b'/' && bytes.get(end) == Some(&b'>') {
                end -= 1;
            }
            Some((&src[i..end], end))
        }
    }
}

const ENTITIES: &[(&str, char)] = &[
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&apos;", '\''),
    ("&#39;", '\''),
];

/// Decode the XML entities models commonly emit inside attribute values.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(src: &str) -> Vec<(String, TagKind)> {
        Tokenizer::new(src)
            .map(|t| (t.name.to_string(), t.kind))
            .collect()
    }

    #[test]
    fn test_open_close_and_self_closing() {
        let src = r#"hi <a x="1">body</a> and <b y='2'/> done"#;
        assert_eq!(
            tags(src),
            vec![
                ("a".to_string(), TagKind::Open),
                ("a".to_string(), TagKind::Close),
                ("b".to_string(), TagKind::SelfClosing),
            ]
        );

        let first = Tokenizer::new(src).next().unwrap();
        assert_eq!(first.attr("x"), Some("1"));
        assert_eq!(&src[first.span.clone()], r#"<a x="1">"#);
    }

    #[test]
    fn test_prose_angle_brackets_are_not_tags() {
        assert!(tags("if a < b && c > d { 1 <= 2 }").is_empty());
        // `<u8>` is well-formed; the parser ignores names it does not know
        assert_eq!(tags("Vec<u8> is fine").len(), 1);
        assert!(tags("<unterminated attr=\"oops>").is_empty());
        assert!(tags("<a b=\"1\"c=\"2\">").is_empty());
    }

    #[test]
    fn test_unquoted_and_boolean_attributes() {
        let tag = Tokenizer::new("<t mode=parallel flag/>").next().unwrap();
        assert_eq!(tag.kind, TagKind::SelfClosing);
        assert_eq!(tag.attr("mode"), Some("parallel"));
        assert_eq!(tag.attr("flag"), Some(""));
        assert_eq!(tag.attr("missing"), None);
    }

    #[test]
    fn test_find_close_skips_other_tags() {
        let src = "<x>one</y></x >tail";
        let open = Tokenizer::new(src).next().unwrap();
        let close = find_close(src, "x", open.span.end).unwrap();
        assert_eq!(&src[open.span.end..close.start], "one</y>");
        assert_eq!(&src[close.end..], "tail");
        assert!(find_close(src, "z", 0).is_none());
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp;&amp; b"), "a && b");
        assert_eq!(decode_entities("&lt;div&gt; &quot;x&quot; &#39;y&apos;"), "<div> \"x\" 'y'");
        assert_eq!(decode_entities("AT&T &unknown;"), "AT&T &unknown;");
    }

    #[test]
    fn test_multibyte_text_is_safe() {
        let src = "héllo <a note=\"naïve ✓\">ü</a> ✓ <";
        let all: Vec<_> = Tokenizer::new(src).collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].attr("note"), Some("naïve ✓"));
    }
}
