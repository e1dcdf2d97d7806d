use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use thiserror::Error;

/// Maximum allowed nesting depth for OPML outline elements.
const MAX_OPML_DEPTH: usize = 50;

/// Errors that can occur while extracting feed URLs from OPML.
#[derive(Debug, Error)]
pub enum OpmlError {
    /// Outline nesting exceeds the safety limit.
    #[error("OPML nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),

    /// The document is not well-formed XML.
    #[error("Failed to parse OPML file. Please ensure it is a valid XML file. ({0})")]
    XmlParse(String),

    /// The document parsed but declared no feed URLs.
    #[error("No RSS feed URLs found in the OPML file.")]
    NoFeedUrls,

    #[error("Failed to read OPML file: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads an OPML document from disk without parsing it.
pub async fn read_opml(path: &Path) -> Result<String, OpmlError> {
    Ok(tokio::fs::read_to_string(path).await?)
}

/// Extracts every `xmlUrl` attribute from `<outline>` elements, in document order.
///
/// Folder outlines without `xmlUrl` are traversed at any depth. Blank values are
/// skipped and repeated URLs keep their first position.
///
/// # Errors
///
/// - [`OpmlError::XmlParse`] when the content is not well-formed XML
/// - [`OpmlError::MaxDepthExceeded`] when outlines nest deeper than 50 levels
/// - [`OpmlError::NoFeedUrls`] when no outline carries a usable `xmlUrl`
///
/// # Security
///
/// `quick-xml` 0.37 never parses `<!ENTITY>` declarations. Custom entity
/// references surface as unescape errors instead of expanding.
pub fn extract_feed_urls(content: &str) -> Result<Vec<String>, OpmlError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = true;

    let mut urls: Vec<String> = Vec::new();
    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                saw_root = true;
                if e.name().as_ref() == b"outline" {
                    depth += 1;
                    if depth > MAX_OPML_DEPTH {
                        return Err(OpmlError::MaxDepthExceeded(MAX_OPML_DEPTH));
                    }
                    push_xml_url(&e, &reader, &mut urls)?;
                }
            }
            Ok(Event::Empty(e)) => {
                saw_root = true;
                if e.name().as_ref() == b"outline" {
                    push_xml_url(&e, &reader, &mut urls)?;
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"outline" => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpmlError::XmlParse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(OpmlError::XmlParse("document has no root element".into()));
    }

    if urls.is_empty() {
        return Err(OpmlError::NoFeedUrls);
    }

    tracing::debug!(count = urls.len(), "Extracted feed URLs from OPML");
    Ok(urls)
}

fn push_xml_url(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
    urls: &mut Vec<String>,
) -> Result<(), OpmlError> {
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed OPML attribute");
                continue;
            }
        };
        if attr.key.as_ref() != b"xmlUrl" {
            continue;
        }
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(|e| OpmlError::XmlParse(e.to_string()))?;
        let url = value.trim();
        if url.is_empty() {
            tracing::debug!("Skipping outline with empty xmlUrl");
        } else if !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extracts_only_outlines_with_xml_url() {
        let content = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="2.0">
  <head><title>Subscriptions</title></head>
  <body>
    <outline text="News">
      <outline type="rss" text="A" xmlUrl="https://a.example/rss"/>
    </outline>
    <outline type="rss" text="B" xmlUrl="https://b.example/feed"/>
  </body>
</opml>"#;

        let urls = extract_feed_urls(content).unwrap();
        assert_eq!(urls, vec!["https://a.example/rss", "https://b.example/feed"]);
    }

    #[test]
    fn test_non_self_closing_outline_with_url() {
        let content = r#"<opml><body>
            <outline text="Parent" xmlUrl="https://parent.example/rss">
                <outline xmlUrl="https://child.example/rss"/>
            </outline>
        </body></opml>"#;

        let urls = extract_feed_urls(content).unwrap();
        assert_eq!(
            urls,
            vec!["https://parent.example/rss", "https://child.example/rss"]
        );
    }

    #[test]
    fn test_escaped_ampersand_in_url() {
        let content = r#"<opml><body>
            <outline xmlUrl="https://example.com/feed?a=1&amp;b=2"/>
        </body></opml>"#;

        let urls = extract_feed_urls(content).unwrap();
        assert_eq!(urls, vec!["https://example.com/feed?a=1&b=2"]);
    }

    #[test]
    fn test_duplicates_and_blank_values_skipped() {
        let content = r#"<opml><body>
            <outline xmlUrl="https://a.example/rss"/>
            <outline xmlUrl="   "/>
            <outline xmlUrl="https://a.example/rss"/>
            <outline xmlUrl="https://b.example/rss"/>
        </body></opml>"#;

        let urls = extract_feed_urls(content).unwrap();
        assert_eq!(urls, vec!["https://a.example/rss", "https://b.example/rss"]);
    }

    #[test]
    fn test_no_feed_urls() {
        let content = r#"<opml><body><outline text="Empty folder"/></body></opml>"#;
        let err = extract_feed_urls(content).unwrap_err();
        assert!(matches!(err, OpmlError::NoFeedUrls));
        assert_eq!(err.to_string(), "No RSS feed URLs found in the OPML file.");
    }

    #[test]
    fn test_malformed_xml() {
        let err = extract_feed_urls("<opml><body></opml>").unwrap_err();
        assert!(matches!(err, OpmlError::XmlParse(_)), "{err:?}");
    }

    #[test]
    fn test_plain_text_is_not_xml() {
        let err = extract_feed_urls("just some words").unwrap_err();
        assert!(matches!(err, OpmlError::XmlParse(_)), "{err:?}");
    }

    #[test]
    fn test_custom_entity_not_expanded() {
        let content = r#"<?xml version="1.0"?>
<!DOCTYPE opml [<!ENTITY exfil "https://evil.example/steal">]>
<opml version="2.0"><body>
    <outline text="Legit" xmlUrl="&exfil;"/>
</body></opml>"#;

        match extract_feed_urls(content) {
            Ok(urls) => assert!(urls.iter().all(|u| !u.contains("evil.example"))),
            Err(e) => assert!(matches!(e, OpmlError::XmlParse(_)), "{e:?}"),
        }
    }

    #[test]
    fn test_deeply_nested_rejected() {
        let mut opml = String::from("<opml><body>");
        for _ in 0..60 {
            opml.push_str(r#"<outline text="level">"#);
        }
        for _ in 0..60 {
            opml.push_str("</outline>");
        }
        opml.push_str("</body></opml>");

        let err = extract_feed_urls(&opml).unwrap_err();
        assert!(matches!(err, OpmlError::MaxDepthExceeded(50)));
    }

    #[test]
    fn test_nesting_at_limit_allowed() {
        let mut opml = String::from("<opml><body>");
        for _ in 0..50 {
            opml.push_str(r#"<outline text="level">"#);
        }
        opml.push_str(r#"<outline xmlUrl="https://deep.example/feed"/>"#);
        for _ in 0..50 {
            opml.push_str("</outline>");
        }
        opml.push_str("</body></opml>");

        let urls = extract_feed_urls(&opml).unwrap();
        assert_eq!(urls, vec!["https://deep.example/feed"]);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let err = read_opml(Path::new("/nonexistent/subscriptions.opml"))
            .await
            .unwrap_err();
        assert!(matches!(err, OpmlError::Io(_)));
    }
}
