//! XML utilities shared by the spreadsheet reader and the document scanner.
//! Provides an XML reader wrapper, helper traits for attribute and text processing,
//! and text escaping for the WordprocessingML we write back.

use crate::error::BrdError;
use quick_xml::escape::escape;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),
}

/// XML reader wrapper configured for OOXML part parsing
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// Creates a new XML reader. Empty elements are expanded into start/end pairs
    /// and whitespace is kept, so byte positions stay contiguous across events.
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event from the reader
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, BrdError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(BrdError::XmlError(error)),
        }
    }

    /// Byte offset just past the last consumed event
    pub(crate) fn position(&self) -> usize {
        self.reader.buffer_position() as usize
    }
}

/// Helper trait for XML attributes providing convenient value extraction
pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value as a string
    fn get_value(&self) -> Result<Cow<'a, str>, BrdError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, BrdError> {
        Ok(self.unescape_value()?)
    }
}

/// Helper trait for XML nodes providing attribute access methods
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, BrdError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, BrdError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }
}

/// Helper trait for building text content from XML events
pub(crate) trait XmlTextContextHelper {
    /// Appends text content from BytesText event
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), BrdError>;

    /// Appends text content from BytesRef event (handles entities and character references)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), BrdError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), BrdError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), BrdError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

/// Escapes text for element content, dropping characters XML 1.0 cannot carry.
pub(crate) fn escape_text(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        escape(text)
    } else {
        let filtered: String = text.chars().filter(|c| is_xml_char(*c)).collect();
        Cow::Owned(escape(filtered.as_str()).into_owned())
    }
}

/// Returns true for characters permitted by the XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_text_handles_markup() {
        assert_eq!(escape_text("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape_text("plain"), "plain");
    }

    #[test]
    fn escape_text_drops_control_characters() {
        assert_eq!(escape_text("line\u{0B}feed\u{01}"), "linefeed");
        assert_eq!(escape_text("tab\tkept"), "tab\tkept");
    }

    #[test]
    fn reader_positions_cover_whole_elements() {
        let xml = b"<a><b/>text</a>";
        let mut reader = XmlReader::new(&xml[..]);
        let mut spans = Vec::new();
        loop {
            let start = reader.position();
            let name = match reader.next().unwrap() {
                Some(Event::Start(event)) => format!("<{}", String::from_utf8_lossy(event.name().as_ref())),
                Some(Event::End(event)) => format!("</{}", String::from_utf8_lossy(event.name().as_ref())),
                Some(_) => "text".to_string(),
                None => break,
            };
            spans.push((name, start, reader.position()));
        }
        assert_eq!(spans[0], ("<a".to_string(), 0, 3));
        assert_eq!(spans[1], ("<b".to_string(), 3, 7));
        assert_eq!(spans[2], ("</b".to_string(), 7, 7));
        assert_eq!(spans[3], ("text".to_string(), 7, 11));
        assert_eq!(spans[4], ("</a".to_string(), 11, 15));
    }
}
