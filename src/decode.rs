use crate::models::{Page, Revision};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Why a page block could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed page block: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("page block ends with <{0}> still open")]
    Unclosed(String),
    #[error("page block has no title")]
    MissingTitle,
    #[error("page block has an empty title")]
    EmptyTitle,
}

/// Element whose character data is being collected.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Text,
}

fn field_at(path: &[Vec<u8>]) -> Option<Field> {
    match path {
        [page, title] if page == b"page" && title == b"title" => Some(Field::Title),
        [page, revision, text] if page == b"page" && revision == b"revision" && text == b"text" => {
            Some(Field::Text)
        }
        _ => None,
    }
}

/// Decodes one `<page>…</page>` block into a [`Page`] with title and revision text.
///
/// Character data is kept exactly as written; in wikitext leading whitespace is
/// significant. Unknown elements (`ns`, `id`, `timestamp`, ...) are ignored. A
/// missing revision or text element yields empty text.
pub fn decode_block(block: &[u8]) -> Result<Page, DecodeError> {
    let mut reader = Reader::from_reader(block);
    reader.trim_text(false);
    reader.check_end_names(true);

    let mut buf = Vec::new();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut title: Option<String> = None;
    let mut text: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                path.push(e.name().as_ref().to_vec());
                match field_at(&path) {
                    Some(Field::Title) => title = Some(String::new()),
                    Some(Field::Text) => text = Some(String::new()),
                    None => {}
                }
            }
            Event::Empty(e) => {
                path.push(e.name().as_ref().to_vec());
                match field_at(&path) {
                    Some(Field::Title) => title = Some(String::new()),
                    Some(Field::Text) => text = Some(String::new()),
                    None => {}
                }
                path.pop();
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Text(e) => {
                let target = match field_at(&path) {
                    Some(Field::Title) => title.as_mut(),
                    Some(Field::Text) => text.as_mut(),
                    None => None,
                };
                if let Some(target) = target {
                    target.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                let target = match field_at(&path) {
                    Some(Field::Title) => title.as_mut(),
                    Some(Field::Text) => text.as_mut(),
                    None => None,
                };
                if let Some(target) = target {
                    target.push_str(&reader.decoder().decode(&e)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = path.last() {
        return Err(DecodeError::Unclosed(
            String::from_utf8_lossy(open).into_owned(),
        ));
    }

    let title = title.ok_or(DecodeError::MissingTitle)?;
    if title.trim().is_empty() {
        return Err(DecodeError::EmptyTitle);
    }

    Ok(Page {
        title,
        revision: Revision {
            text: text.unwrap_or_default(),
        },
        links: Vec::new(),
        categories: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_title_and_text() {
        let block = b"<page><title>Rust</title>\n<ns>0</ns>\n<id>1</id>\n<revision>\n<id>100</id>\n<text xml:space=\"preserve\" bytes=\"20\">Rust is [[fast]].</text>\n</revision>\n</page>";
        let page = decode_block(block).unwrap();
        assert_eq!(page.title, "Rust");
        assert_eq!(page.text(), "Rust is [[fast]].");
        assert!(page.links.is_empty());
        assert!(page.categories.is_empty());
    }

    #[test]
    fn unescapes_entities() {
        let block = b"<page><title>AT&amp;T</title><revision><text>a &lt; b</text></revision></page>";
        let page = decode_block(block).unwrap();
        assert_eq!(page.title, "AT&T");
        assert_eq!(page.text(), "a < b");
    }

    #[test]
    fn multiline_text_keeps_line_breaks() {
        let block = b"<page><title>T</title>\n<revision>\n<text>line one\nline two</text>\n</revision>\n</page>";
        let page = decode_block(block).unwrap();
        assert_eq!(page.text(), "line one\nline two");
    }

    #[test]
    fn missing_revision_yields_empty_text() {
        let page = decode_block(b"<page><title>Stub</title></page>").unwrap();
        assert_eq!(page.title, "Stub");
        assert_eq!(page.text(), "");
    }

    #[test]
    fn empty_text_element_yields_empty_text() {
        let page =
            decode_block(b"<page><title>Stub</title><revision><text /></revision></page>").unwrap();
        assert_eq!(page.text(), "");
    }

    #[test]
    fn missing_title_is_an_error() {
        let result = decode_block(b"<page><revision><text>x</text></revision></page>");
        assert!(matches!(result, Err(DecodeError::MissingTitle)));
    }

    #[test]
    fn blank_title_is_an_error() {
        let result = decode_block(b"<page><title>  </title></page>");
        assert!(matches!(result, Err(DecodeError::EmptyTitle)));
    }

    #[test]
    fn unbalanced_tags_are_an_error() {
        let result = decode_block(b"<page><title>Broken</title><revision><text>x</page>");
        assert!(result.is_err());
    }

    #[test]
    fn text_whitespace_is_preserved() {
        let block = b"<page><title>Pre</title><revision><text xml:space=\"preserve\">  indented start\nend  \n</text></revision></page>";
        let page = decode_block(block).unwrap();
        assert_eq!(page.text(), "  indented start\nend  \n");
    }

    #[test]
    fn cdata_text_is_kept() {
        let block = b"<page><title>C</title><revision><text><![CDATA[a <b> [[c]]]]></text></revision></page>";
        let page = decode_block(block).unwrap();
        assert_eq!(page.text(), "a <b> [[c]]");
    }

    #[test]
    fn nested_title_elements_are_ignored() {
        let block = b"<page><title>Real</title><revision><contributor><title>Other</title></contributor><text>x</text></revision></page>";
        let page = decode_block(block).unwrap();
        assert_eq!(page.title, "Real");
        assert_eq!(page.text(), "x");
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let err = decode_block(b"<page><title>Open</title><revision>").unwrap_err();
        assert!(matches!(&err, DecodeError::Unclosed(tag) if tag == "revision"));
        assert_eq!(err.to_string(), "page block ends with <revision> still open");
    }
}
