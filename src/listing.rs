// listing.rs - Bucket Listing Parser
// Purpose: Extract object descriptors from an S3 ListBucketResult document,
//          falling back to the anchors of an HTML directory index

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";
pub const UNKNOWN: &str = "Unknown";

/// One object named by a listing response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub key: String,
    pub size: String,
    pub last_modified: String,
}

impl ObjectDescriptor {
    fn from_link(href: &str) -> Self {
        Self {
            key: href.to_string(),
            size: UNKNOWN.to_string(),
            last_modified: UNKNOWN.to_string(),
        }
    }
}

/// Result of the XML strategy. An empty `Parsed` is a valid empty bucket,
/// distinct from a document that is not XML at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredListing {
    Parsed(Vec<ObjectDescriptor>),
    ParseFailed(String),
}

/// Parse a listing body. Never fails: an unparseable body without anchors
/// is an empty listing.
pub fn parse_listing(body: &str) -> Vec<ObjectDescriptor> {
    match parse_structured(body) {
        StructuredListing::Parsed(objects) => objects,
        StructuredListing::ParseFailed(_) => parse_anchor_links(body),
    }
}

/// HTML directory index fallback: every `<a href>` becomes a key, in
/// document order.
pub fn parse_anchor_links(body: &str) -> Vec<ObjectDescriptor> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(body);

    document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| !href.is_empty())
        .map(ObjectDescriptor::from_link)
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// STRUCTURED (XML) STRATEGY
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Key,
    Size,
    LastModified,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"Key" => Some(Field::Key),
            b"Size" => Some(Field::Size),
            b"LastModified" => Some(Field::LastModified),
            _ => None,
        }
    }
}

/// A `Contents` element being assembled
#[derive(Default)]
struct PendingEntry {
    /// Depth of the `Contents` element itself
    depth: usize,
    key: Option<String>,
    size: Option<String>,
    last_modified: Option<String>,
    /// Child field currently open and the text collected so far
    open: Option<(Field, String)>,
}

impl PendingEntry {
    fn store(&mut self, field: Field, text: String) {
        let slot = match field {
            Field::Key => &mut self.key,
            Field::Size => &mut self.size,
            Field::LastModified => &mut self.last_modified,
        };
        // First matching child wins
        if slot.is_none() {
            *slot = Some(match field {
                Field::Size => text.trim().to_string(),
                Field::Key | Field::LastModified => text,
            });
        }
    }

    fn finish(self) -> Option<ObjectDescriptor> {
        Some(ObjectDescriptor {
            key: self.key?,
            size: self.size.unwrap_or_else(|| UNKNOWN.to_string()),
            last_modified: self.last_modified.unwrap_or_else(|| UNKNOWN.to_string()),
        })
    }
}

fn is_s3_element(ns: &ResolveResult, local: &[u8], wanted: &[u8]) -> bool {
    local == wanted && in_s3_namespace(ns)
}

/// Unqualified, or qualified with the S3 document namespace
fn in_s3_namespace(ns: &ResolveResult) -> bool {
    match ns {
        ResolveResult::Unbound => true,
        ResolveResult::Bound(Namespace(uri)) => *uri == S3_NAMESPACE.as_bytes(),
        ResolveResult::Unknown(_) => false,
    }
}

/// Strict XML pass: every `Contents` element below the root yields a
/// descriptor when it has a `Key` child. Anything that is not a single
/// well-formed document is reported as `ParseFailed`.
pub fn parse_structured(body: &str) -> StructuredListing {
    let mut reader = NsReader::from_str(body);
    let mut objects = Vec::new();
    let mut depth: usize = 0;
    let mut roots: usize = 0;
    let mut entry: Option<PendingEntry> = None;

    loop {
        let (ns, event) = match reader.read_resolved_event() {
            Ok(resolved) => resolved,
            Err(e) => return StructuredListing::ParseFailed(format!("XML error: {}", e)),
        };

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let self_closing = matches!(event, Event::Empty(_));
                if let ResolveResult::Unknown(prefix) = &ns {
                    return StructuredListing::ParseFailed(format!(
                        "unbound prefix '{}'",
                        String::from_utf8_lossy(prefix)
                    ));
                }
                if depth == 0 {
                    roots += 1;
                    if roots > 1 {
                        return StructuredListing::ParseFailed(
                            "junk after document element".to_string(),
                        );
                    }
                }

                let local = e.local_name();
                match entry.as_mut() {
                    None if depth >= 1 && is_s3_element(&ns, local.as_ref(), b"Contents") => {
                        if !self_closing {
                            entry = Some(PendingEntry {
                                depth,
                                ..PendingEntry::default()
                            });
                        }
                    }
                    Some(pending) if depth == pending.depth + 1 && pending.open.is_none() => {
                        let field = Field::from_local_name(local.as_ref())
                            .filter(|_| in_s3_namespace(&ns));
                        if let Some(field) = field {
                            if self_closing {
                                pending.store(field, String::new());
                            } else {
                                pending.open = Some((field, String::new()));
                            }
                        }
                    }
                    _ => {}
                }

                if !self_closing {
                    depth += 1;
                }
            }
            Event::End(_) => {
                depth = match depth.checked_sub(1) {
                    Some(d) => d,
                    None => {
                        return StructuredListing::ParseFailed(
                            "closing tag without opening tag".to_string(),
                        )
                    }
                };

                if let Some(pending) = entry.as_mut() {
                    if depth == pending.depth + 1 {
                        if let Some((field, text)) = pending.open.take() {
                            pending.store(field, text);
                        }
                    } else if depth == pending.depth {
                        if let Some(object) = entry.take().and_then(PendingEntry::finish) {
                            objects.push(object);
                        }
                    }
                }
            }
            Event::Text(ref t) => {
                let text = match t.unescape() {
                    Ok(text) => text,
                    Err(e) => return StructuredListing::ParseFailed(e.to_string()),
                };
                if depth == 0 && !text.trim().is_empty() {
                    return StructuredListing::ParseFailed(
                        "text outside the document element".to_string(),
                    );
                }
                append_text(entry.as_mut(), depth, &text);
            }
            Event::CData(ref c) => {
                let raw = c.clone().into_inner();
                append_text(entry.as_mut(), depth, &String::from_utf8_lossy(&raw));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return StructuredListing::ParseFailed("unclosed element at end of document".to_string());
    }
    if roots == 0 {
        return StructuredListing::ParseFailed("no element found".to_string());
    }

    StructuredListing::Parsed(objects)
}

fn append_text(entry: Option<&mut PendingEntry>, depth: usize, text: &str) {
    if let Some(pending) = entry {
        // Text directly inside the open field element
        if depth == pending.depth + 2 {
            if let Some((_, buf)) = pending.open.as_mut() {
                buf.push_str(text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>assets</Name>
  <KeyCount>3</KeyCount>
  <Contents>
    <Key>index.html</Key>
    <LastModified>2024-01-01T00:00:00.000Z</LastModified>
    <Size>1024</Size>
  </Contents>
  <Contents>
    <Key>js/app.js</Key>
    <Size>2048</Size>
  </Contents>
  <Contents>
    <Key>.env</Key>
  </Contents>
</ListBucketResult>"#;

    #[test]
    fn test_parse_s3_listing() {
        let objects = parse_listing(LISTING);
        assert_eq!(objects.len(), 3);

        assert_eq!(objects[0].key, "index.html");
        assert_eq!(objects[0].size, "1024");
        assert_eq!(objects[0].last_modified, "2024-01-01T00:00:00.000Z");

        assert_eq!(objects[1].key, "js/app.js");
        assert_eq!(objects[1].last_modified, UNKNOWN);

        assert_eq!(objects[2].key, ".env");
        assert_eq!(objects[2].size, UNKNOWN);
        assert_eq!(objects[2].last_modified, UNKNOWN);
    }

    #[test]
    fn test_unqualified_and_prefixed_elements() {
        let plain = "<ListBucketResult><Contents><Key>a</Key></Contents></ListBucketResult>";
        assert_eq!(parse_listing(plain).len(), 1);

        let prefixed = r#"<s3:ListBucketResult xmlns:s3="http://s3.amazonaws.com/doc/2006-03-01/">
            <s3:Contents><s3:Key>b</s3:Key><s3:Size>5</s3:Size></s3:Contents>
        </s3:ListBucketResult>"#;
        let objects = parse_listing(prefixed);
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "b");
        assert_eq!(objects[0].size, "5");
    }

    #[test]
    fn test_foreign_namespace_is_ignored() {
        let body = r#"<Result xmlns="urn:other"><Contents><Key>x</Key></Contents></Result>"#;
        assert_eq!(parse_structured(body), StructuredListing::Parsed(Vec::new()));
    }

    #[test]
    fn test_contents_without_key_is_skipped() {
        let body = "<R><Contents><Size>1</Size></Contents><Contents><Key>k</Key></Contents></R>";
        let objects = parse_listing(body);
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "k");
    }

    #[test]
    fn test_escaped_key_is_decoded() {
        let body = "<R><Contents><Key>a&amp;b.txt</Key></Contents></R>";
        assert_eq!(parse_listing(body)[0].key, "a&b.txt");
    }

    #[test]
    fn test_key_whitespace_is_preserved() {
        let body = "<R><Contents><Key> report .pdf </Key><Size>\n  42\n</Size></Contents></R>";
        let objects = parse_listing(body);
        assert_eq!(objects[0].key, " report .pdf ");
        assert_eq!(objects[0].size, "42");

        // Text split by CDATA and comments is joined as-is
        let split = "<R><Contents><Key>a <![CDATA[b]]> <!-- x -->c</Key></Contents></R>";
        assert_eq!(parse_listing(split)[0].key, "a b c");
    }

    #[test]
    fn test_empty_listing_is_not_a_failure() {
        let body = r#"<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>empty</Name></ListBucketResult>"#;
        assert_eq!(parse_structured(body), StructuredListing::Parsed(Vec::new()));
    }

    #[test]
    fn test_html_index_falls_back_to_anchors() {
        let body = r#"<html><head><title>Index of /</title></head><body>
            <h1>Index of /</h1><br>
            <a href="a.txt">a.txt</a>
            <a href="b.txt">b.txt</a>
        </body></html>"#;

        assert!(matches!(parse_structured(body), StructuredListing::ParseFailed(_)));

        let objects = parse_listing(body);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].key, "a.txt");
        assert_eq!(objects[1].key, "b.txt");
        assert!(objects.iter().all(|o| o.size == UNKNOWN && o.last_modified == UNKNOWN));
    }

    #[test]
    fn test_garbage_yields_empty() {
        assert!(matches!(parse_structured("not xml at all"), StructuredListing::ParseFailed(_)));
        assert!(parse_listing("not xml at all").is_empty());
        assert!(parse_listing("").is_empty());
    }

    #[test]
    fn test_unclosed_document_fails_structured() {
        assert!(matches!(
            parse_structured("<ListBucketResult><Contents><Key>a</Key>"),
            StructuredListing::ParseFailed(_)
        ));
    }
}
