//! Minimal XML element reader for central-service responses.
//!
//! Only what the protocol bodies need: nested elements, attributes, text,
//! CDATA and the predefined/numeric entities. Namespace prefixes are stripped
//! so `<cas:user>` is looked up as `user`. No DTD processing, no external
//! entities.

use thiserror::Error;

/// Deepest element nesting accepted. Protocol bodies stay below 6.
pub const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("unexpected end of document")]
    UnexpectedEof,
    #[error("malformed markup at byte {0}")]
    Malformed(usize),
    #[error("mismatched closing tag: expected </{expected}>, found </{found}>")]
    Mismatched { expected: String, found: String },
    #[error("more than one root element")]
    MultipleRoots,
    #[error("document has no root element")]
    NoRoot,
    #[error("elements nested deeper than {MAX_DEPTH} levels")]
    TooDeep,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    fn open(name: &str) -> Self {
        Self {
            name: local_name(name).to_string(),
            ..Self::default()
        }
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Depth-first search including `self`.
    pub fn find(&self, name: &str) -> Option<&Element> {
        let mut pending = vec![self];
        while let Some(element) = pending.pop() {
            if element.name == name {
                return Some(element);
            }
            // reversed so document order is kept
            pending.extend(element.children.iter().rev());
        }
        None
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

pub fn parse(input: &str) -> Result<Element, XmlError> {
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut rest = input;

    while !rest.is_empty() {
        let at = input.len() - rest.len();

        if let Some(after) = rest.strip_prefix("<?") {
            let end = after.find("?>").ok_or(XmlError::UnexpectedEof)?;
            rest = &after[end + 2..];
        } else if let Some(after) = rest.strip_prefix("<!--") {
            let end = after.find("-->").ok_or(XmlError::UnexpectedEof)?;
            rest = &after[end + 3..];
        } else if let Some(after) = rest.strip_prefix("<![CDATA[") {
            let end = after.find("]]>").ok_or(XmlError::UnexpectedEof)?;
            let top = stack.last_mut().ok_or(XmlError::Malformed(at))?;
            top.text.push_str(&after[..end]);
            rest = &after[end + 3..];
        } else if let Some(after) = rest.strip_prefix("<!") {
            // DOCTYPE and friends are skipped, never interpreted
            let end = after.find('>').ok_or(XmlError::UnexpectedEof)?;
            rest = &after[end + 1..];
        } else if let Some(after) = rest.strip_prefix("</") {
            let end = after.find('>').ok_or(XmlError::UnexpectedEof)?;
            let found = local_name(after[..end].trim());
            let element = stack.pop().ok_or(XmlError::Malformed(at))?;
            if element.name != found {
                return Err(XmlError::Mismatched {
                    expected: element.name,
                    found: found.to_string(),
                });
            }
            attach(&mut stack, &mut root, element)?;
            rest = &after[end + 1..];
        } else if let Some(after) = rest.strip_prefix('<') {
            let end = tag_end(after).ok_or(XmlError::UnexpectedEof)?;
            let raw = &after[..end];
            let (raw, self_closing) = match raw.strip_suffix('/') {
                Some(r) => (r, true),
                None => (raw, false),
            };
            let element = open_tag(raw, at)?;
            if self_closing {
                attach(&mut stack, &mut root, element)?;
            } else {
                if stack.len() >= MAX_DEPTH {
                    return Err(XmlError::TooDeep);
                }
                stack.push(element);
            }
            rest = &after[end + 1..];
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            let text = &rest[..end];
            match stack.last_mut() {
                Some(top) => top.text.push_str(&unescape(text)),
                None if text.trim().is_empty() => {}
                None => return Err(XmlError::Malformed(at)),
            }
            rest = &rest[end..];
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::UnexpectedEof);
    }
    root.ok_or(XmlError::NoRoot)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(XmlError::MultipleRoots),
    }
}

/// Index of the `>` closing a start tag, ignoring `>` inside quoted values.
fn tag_end(after: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, ch) in after.char_indices() {
        match (quote, ch) {
            (None, '"' | '\'') => quote = Some(ch),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

fn open_tag(raw: &str, at: usize) -> Result<Element, XmlError> {
    let raw = raw.trim();
    let (name, mut attrs) = match raw.find(char::is_whitespace) {
        Some(i) => (&raw[..i], &raw[i..]),
        None => (raw, ""),
    };
    if name.is_empty() {
        return Err(XmlError::Malformed(at));
    }

    let mut element = Element::open(name);
    loop {
        attrs = attrs.trim_start();
        if attrs.is_empty() {
            break;
        }
        let eq = attrs.find('=').ok_or(XmlError::Malformed(at))?;
        let key = attrs[..eq].trim();
        let value_part = attrs[eq + 1..].trim_start();
        let quote = value_part
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or(XmlError::Malformed(at))?;
        let close = value_part[1..].find(quote).ok_or(XmlError::Malformed(at))?;
        let value = &value_part[1..1 + close];

        if key != "xmlns" && !key.starts_with("xmlns:") {
            element
                .attributes
                .push((local_name(key).to_string(), unescape(value)));
        }
        attrs = &value_part[close + 2..];
    }

    Ok(element)
}

fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|ch| (ch, semi)));
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefixes_and_reads_nested_text() {
        let doc = parse(
            r#"<?xml version="1.0"?>
            <cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
              <cas:authenticationSuccess>
                <cas:user>alice</cas:user>
              </cas:authenticationSuccess>
            </cas:serviceResponse>"#,
        )
        .unwrap();

        assert_eq!(doc.name, "serviceResponse");
        assert!(doc.attributes.is_empty());
        let user = doc.find("user").unwrap();
        assert_eq!(user.trimmed_text(), "alice");
    }

    #[test]
    fn reads_attributes_and_entities() {
        let doc = parse(
            r#"<r><f code='INVALID_TICKET' note="a &gt; b">Ticket &amp; &#x41;&#66; bad</f></r>"#,
        )
        .unwrap();
        let f = doc.child("f").unwrap();
        assert_eq!(f.attribute("code"), Some("INVALID_TICKET"));
        assert_eq!(f.attribute("note"), Some("a > b"));
        assert_eq!(f.text, "Ticket & AB bad");
    }

    #[test]
    fn keeps_unknown_entities_literally() {
        let doc = parse("<r>a &nbsp; b &</r>").unwrap();
        assert_eq!(doc.text, "a &nbsp; b &");
    }

    #[test]
    fn cdata_and_comments() {
        let doc = parse("<r><!-- skip --><![CDATA[<not a tag>]]></r>").unwrap();
        assert_eq!(doc.text, "<not a tag>");
    }

    #[test]
    fn self_closing_root() {
        let doc = parse(r#"<casClient:proxySuccess xmlns:casClient="x"/>"#).unwrap();
        assert_eq!(doc.name, "proxySuccess");
        assert!(doc.children.is_empty());
    }

    #[test]
    fn gt_inside_quoted_attribute() {
        let doc = parse(r#"<r a="1>2"><c/></r>"#).unwrap();
        assert_eq!(doc.attribute("a"), Some("1>2"));
        assert_eq!(doc.children.len(), 1);
    }

    #[test]
    fn rejects_mismatched_and_truncated() {
        assert!(matches!(
            parse("<a><b></a>"),
            Err(XmlError::Mismatched { .. })
        ));
        assert_eq!(parse("<a><b></b>"), Err(XmlError::UnexpectedEof));
        assert_eq!(parse("   "), Err(XmlError::NoRoot));
        assert_eq!(parse("<a/><b/>"), Err(XmlError::MultipleRoots));
        assert!(matches!(parse("yes\nalice\n"), Err(XmlError::Malformed(0))));
    }

    #[test]
    fn find_keeps_document_order() {
        let doc = parse("<r><a><x>1</x></a><x>2</x></r>").unwrap();
        assert_eq!(doc.find("x").unwrap().text, "1");
        assert!(doc.find("missing").is_none());
    }

    #[test]
    fn nesting_limit() {
        let nested = |depth: usize| format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth));

        assert!(parse(&nested(MAX_DEPTH)).is_ok());
        assert_eq!(parse(&nested(MAX_DEPTH + 1)), Err(XmlError::TooDeep));
    }

    #[test]
    fn very_deep_document_is_rejected_on_a_small_stack() {
        let body = format!("{}{}", "<a>".repeat(60_000), "</a>".repeat(60_000));
        let result = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || parse(&body))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(result, Err(XmlError::TooDeep));
    }
}
