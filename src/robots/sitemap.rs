//! Sitemap XML parsing
//!
//! Handles both `<urlset>` documents (page lists) and `<sitemapindex>`
//! documents (lists of further sitemaps). Malformed XML is not an error:
//! whatever `<loc>` values were read before the failure are returned.

use quick_xml::events::Event;
use quick_xml::Reader;

/// The `<loc>` entries of one sitemap document
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SitemapDocument {
    /// Page URLs from a `<urlset>`
    pub pages: Vec<String>,

    /// Child sitemap URLs from a `<sitemapindex>`
    pub sitemaps: Vec<String>,
}

/// Parses a sitemap document into page and child-sitemap URLs
///
/// # Example
///
/// ```
/// use siteable::robots::parse_sitemap;
///
/// let xml = r#"<urlset><url><loc>https://example.com/a</loc></url></urlset>"#;
/// let doc = parse_sitemap(xml);
/// assert_eq!(doc.pages, vec!["https://example.com/a".to_string()]);
/// assert!(doc.sitemaps.is_empty());
/// ```
pub fn parse_sitemap(xml: &str) -> SitemapDocument {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut in_loc = false;
    let mut saw_index = false;
    let mut saw_urlset = false;
    let mut locs: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let name = name.as_ref();
                if name.ends_with(b"sitemapindex") {
                    saw_index = true;
                } else if name.ends_with(b"urlset") {
                    saw_urlset = true;
                } else if name.ends_with(b"loc") {
                    in_loc = true;
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref().ends_with(b"loc") {
                    in_loc = false;
                }
            }
            Ok(Event::Text(t)) if in_loc => {
                if let Ok(text) = t.unescape() {
                    push_loc(&mut locs, &text);
                }
            }
            Ok(Event::CData(c)) if in_loc => {
                push_loc(&mut locs, &String::from_utf8_lossy(&c));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("Stopping sitemap parse at malformed XML: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    if saw_index && !saw_urlset {
        SitemapDocument {
            pages: Vec::new(),
            sitemaps: locs,
        }
    } else {
        SitemapDocument {
            pages: locs,
            sitemaps: Vec::new(),
        }
    }
}

fn push_loc(locs: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        locs.push(text.to_string());
    }
}
