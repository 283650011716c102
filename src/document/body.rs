//! Scanner for the top level of a WordprocessingML body.
//!
//! The main document part is tokenized once with byte spans, then walked by a small
//! recursive-descent pass that records the direct `w:p` and `w:tbl` children of
//! `w:body`. Everything is kept as spans into the original bytes so the rebuilder can
//! splice new markup without re-serializing content it never touched.

use crate::document::DocumentError;
use crate::error::BrdError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::ops::Range;

// WordprocessingML tag names
pub(crate) const TAG_BODY: QName = QName(b"w:body");                  // Document body
pub(crate) const TAG_PARAGRAPH: QName = QName(b"w:p");                // Paragraph
pub(crate) const TAG_RUN: QName = QName(b"w:r");                      // Run of text with common formatting
pub(crate) const TAG_TEXT: QName = QName(b"w:t");                     // Text inside a run
pub(crate) const TAG_TAB: QName = QName(b"w:tab");                    // Tab character inside a run
pub(crate) const TAG_BREAK: QName = QName(b"w:br");                   // Line break inside a run
pub(crate) const TAG_CARRIAGE_RETURN: QName = QName(b"w:cr");         // Carriage return inside a run
pub(crate) const TAG_TABLE: QName = QName(b"w:tbl");                  // Table
pub(crate) const TAG_TABLE_GRID: QName = QName(b"w:tblGrid");         // Table grid column definitions
pub(crate) const TAG_GRID_COLUMN: QName = QName(b"w:gridCol");        // One grid column
pub(crate) const TAG_TABLE_ROW: QName = QName(b"w:tr");               // Table row
pub(crate) const TAG_TABLE_CELL: QName = QName(b"w:tc");              // Table cell
pub(crate) const TAG_CELL_PROPERTIES: QName = QName(b"w:tcPr");       // Table cell properties
pub(crate) const TAG_GRID_SPAN: QName = QName(b"w:gridSpan");         // Number of grid columns a cell spans
const TAG_CONTENT_CONTROL: QName = QName(b"w:sdt");                   // Content control, may wrap rows
const TAG_CONTENT_CONTROL_BODY: QName = QName(b"w:sdtContent");       // Content of a content control
const TAG_CUSTOM_XML: QName = QName(b"w:customXml");                  // Custom XML element, may wrap rows
const ATTR_VALUE: &str = "w:val";

/// One event of the main document part with its byte span.
#[derive(Debug)]
enum Token {
    Open { name: Vec<u8>, value: Option<String>, span: Range<usize> },
    Close { span: Range<usize> },
    Text(String),
}

impl Token {
    fn is_open(&self, tag: QName) -> bool {
        matches!(self, Token::Open { name, .. } if QName(name) == tag)
    }
}

/// A paragraph and its plain text: `w:t` content, `w:tab` as tab, `w:br` and `w:cr`
/// as newline.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ParagraphNode {
    pub span: Range<usize>,
    pub text: String,
}

/// A `w:tcPr` element and the spans of its direct children.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CellPropertiesNode {
    pub span: Range<usize>,
    pub children: Vec<(Vec<u8>, Range<usize>)>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CellNode {
    pub span: Range<usize>,
    /// Offset just past the `<w:tc>` start tag
    pub content_start: usize,
    /// Offset of the `</w:tc>` end tag
    pub content_end: usize,
    pub properties: Option<CellPropertiesNode>,
    /// Grid columns covered by the cell, at least one
    pub grid_span: usize,
    pub paragraphs: Vec<ParagraphNode>,
}

impl CellNode {
    /// Text of the direct paragraphs joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|paragraph| paragraph.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RowNode {
    pub span: Range<usize>,
    /// Span of the `w:tbl` child holding the row: the row itself, or the outermost
    /// `w:sdt`/`w:customXml` wrapping it
    pub container: Range<usize>,
    pub cells: Vec<CellNode>,
}

impl RowNode {
    /// Cell texts with spanned cells repeated once per covered grid column.
    pub fn grid_texts(&self) -> Vec<String> {
        self.cells
            .iter()
            .flat_map(|cell| std::iter::repeat(cell.text()).take(cell.grid_span))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TableNode {
    pub span: Range<usize>,
    /// Offset of the `</w:tbl>` end tag
    pub content_end: usize,
    /// Number of `w:gridCol` entries in the table grid
    pub grid_columns: usize,
    pub rows: Vec<RowNode>,
}

impl TableNode {
    /// Column count from the table grid, or the header row when the grid is absent.
    pub fn columns(&self) -> usize {
        match self.grid_columns {
            0 => self.rows.first().map(|row| row.grid_texts().len()).unwrap_or_default(),
            columns => columns,
        }
    }

    /// Texts of the first row, one per grid column.
    pub fn header_texts(&self) -> Vec<String> {
        self.rows.first().map(RowNode::grid_texts).unwrap_or_default()
    }
}

/// Direct paragraph and table children of `w:body`, each in document order.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Body {
    pub paragraphs: Vec<ParagraphNode>,
    pub tables: Vec<TableNode>,
}

impl Body {
    /// Scans the bytes of `word/document.xml`.
    pub fn scan(xml: &[u8]) -> Result<Body, BrdError> {
        let tokens = tokenize(xml)?;
        let mut body = Body::default();

        let open = tokens
            .iter()
            .position(|token| token.is_open(TAG_BODY))
            .ok_or(DocumentError::MissingBody)?;
        let mut index = open + 1;
        while index < tokens.len() {
            index = match &tokens[index] {
                Token::Close { .. } => break,
                token if token.is_open(TAG_PARAGRAPH) => {
                    let (paragraph, next) = parse_paragraph(&tokens, index);
                    body.paragraphs.push(paragraph);
                    next
                }
                token if token.is_open(TAG_TABLE) => {
                    let (table, next) = parse_table(&tokens, index);
                    body.tables.push(table);
                    next
                }
                Token::Open { .. } => skip_element(&tokens, index),
                Token::Text(_) => index + 1,
            };
        }
        Ok(body)
    }
}

/// Flattens the part into owned tokens. Empty elements arrive expanded, so every
/// `Open` has a matching `Close`.
fn tokenize(xml: &[u8]) -> Result<Vec<Token>, BrdError> {
    let mut reader = XmlReader::new(xml);
    let mut tokens = Vec::new();
    let mut start = reader.position();

    while let Some(event) = reader.next()? {
        let token = match event {
            Event::Start(event) => Some(Token::Open {
                name: event.name().as_ref().to_vec(),
                value: event.get_attribute_value(ATTR_VALUE)?.map(Cow::into_owned),
                span: start..start,
            }),
            Event::End(_) => Some(Token::Close { span: start..start }),
            Event::Text(text) => {
                let mut content = String::new();
                content.push_bytes_text(&text)?;
                Some(Token::Text(content))
            }
            Event::GeneralRef(reference) => {
                let mut content = String::new();
                content.push_bytes_ref(&reference)?;
                Some(Token::Text(content))
            }
            Event::CData(data) => Some(Token::Text(String::from_utf8(data.into_inner().into_owned())?)),
            _ => None,
        };
        let end = reader.position();
        if let Some(mut token) = token {
            if let Token::Open { span, .. } | Token::Close { span } = &mut token {
                span.end = end;
            }
            tokens.push(token);
        }
        start = end;
    }
    Ok(tokens)
}

/// Index of the `Close` token matching the `Open` token at `open`.
fn matching_close(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::Open { .. } => depth += 1,
            Token::Close { .. } => {
                depth -= 1;
                if depth == 0 {
                    return index;
                }
            }
            Token::Text(_) => (),
        }
    }
    tokens.len().saturating_sub(1)
}

fn skip_element(tokens: &[Token], open: usize) -> usize {
    matching_close(tokens, open) + 1
}

fn open_span(tokens: &[Token], index: usize) -> Range<usize> {
    match &tokens[index] {
        Token::Open { span, .. } | Token::Close { span } => span.clone(),
        Token::Text(_) => 0..0,
    }
}

/// Span of the element opened at `open` and closed at `close`.
fn element_span(tokens: &[Token], open: usize, close: usize) -> Range<usize> {
    open_span(tokens, open).start..open_span(tokens, close).end
}

/// Visits the direct children of the element opened at `open`, returning the index
/// after its end tag. `visit` receives each child start index and returns the index
/// to continue from, or `None` to skip the child.
fn for_each_child(
    tokens: &[Token],
    open: usize,
    mut visit: impl FnMut(usize) -> Option<usize>,
) -> usize {
    let close = matching_close(tokens, open);
    let mut index = open + 1;
    while index < close {
        index = match &tokens[index] {
            Token::Open { .. } => visit(index).unwrap_or_else(|| skip_element(tokens, index)),
            _ => index + 1,
        };
    }
    close
}

fn parse_paragraph(tokens: &[Token], open: usize) -> (ParagraphNode, usize) {
    let close = matching_close(tokens, open);
    let mut text = String::new();
    let mut runs = 0usize;
    let mut texts = 0usize;
    let mut stack: Vec<&[u8]> = Vec::new();

    for token in &tokens[open + 1..close] {
        match token {
            Token::Open { name, .. } => {
                let tag = QName(name);
                if tag == TAG_RUN {
                    runs += 1;
                } else if runs > 0 && tag == TAG_TEXT {
                    texts += 1;
                } else if runs > 0 && tag == TAG_TAB {
                    text.push('\t');
                } else if runs > 0 && (tag == TAG_BREAK || tag == TAG_CARRIAGE_RETURN) {
                    text.push('\n');
                }
                stack.push(name.as_slice());
            }
            Token::Close { .. } => {
                let tag = stack.pop().map(QName);
                if tag == Some(TAG_RUN) {
                    runs = runs.saturating_sub(1);
                } else if tag == Some(TAG_TEXT) {
                    texts = texts.saturating_sub(1);
                }
            }
            Token::Text(content) if texts > 0 => text.push_str(content),
            Token::Text(_) => (),
        }
    }

    let span = element_span(tokens, open, close);
    (ParagraphNode { span, text }, close + 1)
}

fn parse_table(tokens: &[Token], open: usize) -> (TableNode, usize) {
    let mut grid_columns = 0;
    let mut rows = Vec::new();
    let close = for_each_child(tokens, open, |child| {
        if tokens[child].is_open(TAG_TABLE_GRID) {
            let mut columns = 0;
            let next = for_each_child(tokens, child, |column| {
                if tokens[column].is_open(TAG_GRID_COLUMN) {
                    columns += 1;
                }
                None
            });
            grid_columns = columns;
            Some(next + 1)
        } else if tokens[child].is_open(TAG_TABLE_ROW) {
            let (row, next) = parse_row(tokens, child, None);
            rows.push(row);
            Some(next)
        } else if is_row_wrapper(&tokens[child]) {
            let container = element_span(tokens, child, matching_close(tokens, child));
            Some(parse_wrapped_rows(tokens, child, &container, &mut rows) + 1)
        } else {
            None
        }
    });

    let table = TableNode {
        span: element_span(tokens, open, close),
        content_end: open_span(tokens, close).start,
        grid_columns,
        rows,
    };
    (table, close + 1)
}

fn is_row_wrapper(token: &Token) -> bool {
    token.is_open(TAG_CONTENT_CONTROL) || token.is_open(TAG_CUSTOM_XML)
}

/// Collects the rows nested in a row-level `w:sdt` or `w:customXml`, returning the
/// index of its end tag.
fn parse_wrapped_rows(tokens: &[Token], open: usize, container: &Range<usize>, rows: &mut Vec<RowNode>) -> usize {
    for_each_child(tokens, open, |child| {
        if tokens[child].is_open(TAG_TABLE_ROW) {
            let (row, next) = parse_row(tokens, child, Some(container.clone()));
            rows.push(row);
            Some(next)
        } else if tokens[child].is_open(TAG_CONTENT_CONTROL_BODY) || is_row_wrapper(&tokens[child]) {
            Some(parse_wrapped_rows(tokens, child, container, &mut *rows) + 1)
        } else {
            None
        }
    })
}

fn parse_row(tokens: &[Token], open: usize, container: Option<Range<usize>>) -> (RowNode, usize) {
    let mut cells = Vec::new();
    let close = for_each_child(tokens, open, |child| {
        if tokens[child].is_open(TAG_TABLE_CELL) {
            let (cell, next) = parse_cell(tokens, child);
            cells.push(cell);
            Some(next)
        } else {
            None
        }
    });
    let span = element_span(tokens, open, close);
    let container = container.unwrap_or_else(|| span.clone());
    (RowNode { span, container, cells }, close + 1)
}

fn parse_cell(tokens: &[Token], open: usize) -> (CellNode, usize) {
    let mut properties = None;
    let mut grid_span = 1;
    let mut paragraphs = Vec::new();
    let close = for_each_child(tokens, open, |child| {
        if tokens[child].is_open(TAG_CELL_PROPERTIES) {
            let mut children = Vec::new();
            let end = for_each_child(tokens, child, |property| {
                if let Token::Open { name, value, .. } = &tokens[property] {
                    if QName(name) == TAG_GRID_SPAN {
                        grid_span = value
                            .as_deref()
                            .and_then(|value| value.parse::<usize>().ok())
                            .unwrap_or(1)
                            .max(1);
                    }
                    let next = skip_element(tokens, property);
                    children.push((name.clone(), element_span(tokens, property, next - 1)));
                    return Some(next);
                }
                None
            });
            properties = Some(CellPropertiesNode { span: element_span(tokens, child, end), children });
            Some(end + 1)
        } else if tokens[child].is_open(TAG_PARAGRAPH) {
            let (paragraph, next) = parse_paragraph(tokens, child);
            paragraphs.push(paragraph);
            Some(next)
        } else {
            None
        }
    });

    let cell = CellNode {
        span: element_span(tokens, open, close),
        content_start: open_span(tokens, open).end,
        content_end: open_span(tokens, close).start,
        properties,
        grid_span,
        paragraphs,
    };
    (cell, close + 1)
}
