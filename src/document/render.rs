//! Builds the WordprocessingML of the requirements table and splices it into the
//! main document part.
//!
//! Nothing here mutates a document: every function returns markup or a list of
//! [`Edit`]s, and [`apply_edits`] produces new bytes in a single pass.

use crate::config::half_points;
use crate::config::Rgb;
use crate::config::TableStyle;
use crate::document::body::CellNode;
use crate::document::body::CellPropertiesNode;
use crate::document::body::ParagraphNode;
use crate::document::body::TableNode;
use crate::document::locator::REQUIREMENT_HEADERS;
use crate::helpers::xml::escape_text;
use crate::requirements::FormGroup;
use crate::requirements::Requirement;
use quick_xml::name::QName;
use std::ops::Range;

const TAG_SHADING: QName = QName(b"w:shd");

/// Children of `w:tcPr` that follow `w:shd` in schema order.
const SHADING_SUCCESSORS: [&[u8]; 11] = [
    b"w:noWrap",
    b"w:tcMar",
    b"w:textDirection",
    b"w:tcFitText",
    b"w:vAlign",
    b"w:hideMark",
    b"w:headers",
    b"w:cellIns",
    b"w:cellDel",
    b"w:cellMerge",
    b"w:tcPrChange",
];

/// Width in twentieths of a point of each column of a newly created table.
const NEW_TABLE_COLUMN_WIDTH: u32 = 2394;

/// Replaces `range` of the original bytes with `content`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Edit {
    pub range: Range<usize>,
    pub content: Vec<u8>,
}

impl Edit {
    fn replace(range: Range<usize>, content: impl Into<Vec<u8>>) -> Edit {
        Edit { range, content: content.into() }
    }

    fn insert(at: usize, content: impl Into<Vec<u8>>) -> Edit {
        Edit::replace(at..at, content)
    }

    fn delete(range: Range<usize>) -> Edit {
        Edit::replace(range, Vec::new())
    }
}

/// Applies non-overlapping edits in one pass. Edits at the same offset keep the
/// order they were given in.
pub(crate) fn apply_edits(source: &[u8], mut edits: Vec<Edit>) -> Vec<u8> {
    edits.sort_by_key(|edit| edit.range.start);
    let inserted: usize = edits.iter().map(|edit| edit.content.len()).sum();
    let mut output = Vec::with_capacity(source.len() + inserted);
    let mut cursor = 0;
    for edit in edits {
        debug_assert!(edit.range.start >= cursor, "overlapping edits");
        output.extend_from_slice(&source[cursor..edit.range.start]);
        output.extend_from_slice(&edit.content);
        cursor = edit.range.end;
    }
    output.extend_from_slice(&source[cursor..]);
    output
}

/// Number of rows [`requirement_rows`] produces for `groups`: one merged header per
/// rendered form plus one row per requirement in it.
pub(crate) fn expected_row_count(groups: &[FormGroup]) -> usize {
    groups
        .iter()
        .filter(|group| group.is_rendered())
        .map(|group| 1 + group.requirements.len())
        .sum()
}

/// Markup of every data row, in order. Groups without a form label or without
/// requirements produce nothing.
pub(crate) fn requirement_rows(groups: &[FormGroup], columns: usize, style: &TableStyle) -> Vec<String> {
    let mut rows = Vec::with_capacity(expected_row_count(groups));
    for group in groups.iter().filter(|group| group.is_rendered()) {
        rows.push(form_row(&group.form, columns, style));
        rows.extend(group.requirements.iter().map(|requirement| requirement_row(requirement, style)));
    }
    rows
}

/// Edits that restyle the header row of `table`, remove its data rows and append `rows`.
///
/// Data rows inside a content control or custom XML element go together with their
/// wrapper, unless the wrapper also holds the header row.
pub(crate) fn rebuild_table(source: &[u8], table: &TableNode, rows: &[String], style: &TableStyle) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut header_container = None;
    if let Some(header) = table.rows.first() {
        header_container = Some(&header.container);
        for cell in &header.cells {
            edits.extend(restyle_header_cell(source, cell, style));
        }
    }

    let mut removed: Vec<Range<usize>> = Vec::new();
    for row in table.rows.iter().skip(1) {
        let range = if header_container == Some(&row.container) { &row.span } else { &row.container };
        if removed.last() != Some(range) {
            removed.push(range.clone());
        }
    }
    edits.extend(removed.into_iter().map(Edit::delete));
    edits.push(Edit::insert(table.content_end, rows.concat()));
    edits
}

/// Edit that inserts a new requirements table holding `rows` right after `anchor`.
pub(crate) fn create_table(anchor: &ParagraphNode, rows: &[String], style: &TableStyle) -> Edit {
    let borders: String = ["top", "left", "bottom", "right", "insideH", "insideV"]
        .iter()
        .map(|side| format!(r#"<w:{side} w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#))
        .collect();
    let grid: String = REQUIREMENT_HEADERS
        .iter()
        .map(|_| format!(r#"<w:gridCol w:w="{NEW_TABLE_COLUMN_WIDTH}"/>"#))
        .collect();
    let header: String = REQUIREMENT_HEADERS
        .iter()
        .map(|label| {
            format!(
                r#"<w:tc><w:tcPr><w:tcW w:w="{NEW_TABLE_COLUMN_WIDTH}" w:type="dxa"/>{}</w:tcPr>{}</w:tc>"#,
                shading(&style.header_fill),
                header_paragraph(label, style),
            )
        })
        .collect();

    let table = format!(
        r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/><w:tblBorders>{borders}</w:tblBorders><w:tblLook w:val="04A0"/></w:tblPr><w:tblGrid>{grid}</w:tblGrid><w:tr>{header}</w:tr>{}</w:tbl>"#,
        rows.concat(),
    );
    Edit::insert(anchor.span.end, table)
}

/// Gives a header cell the header fill and regenerates its paragraphs centered and bold.
fn restyle_header_cell(source: &[u8], cell: &CellNode, style: &TableStyle) -> Vec<Edit> {
    let mut edits = Vec::new();
    match &cell.properties {
        Some(properties) => edits.push(Edit::replace(
            properties.span.clone(),
            header_cell_properties(source, properties, &style.header_fill),
        )),
        None => edits.push(Edit::insert(
            cell.content_start,
            format!("<w:tcPr>{}</w:tcPr>", shading(&style.header_fill)),
        )),
    }
    if cell.paragraphs.is_empty() {
        edits.push(Edit::insert(cell.content_end, header_paragraph("", style)));
    }
    for paragraph in &cell.paragraphs {
        edits.push(Edit::replace(paragraph.span.clone(), header_paragraph(&paragraph.text, style)));
    }
    edits
}

/// Copies the cell properties with any existing shading replaced by `fill`, placed
/// where the schema expects `w:shd`.
fn header_cell_properties(source: &[u8], properties: &CellPropertiesNode, fill: &Rgb) -> Vec<u8> {
    let shading = shading(fill);
    let mut content = b"<w:tcPr>".to_vec();
    let mut shaded = false;
    for (name, span) in &properties.children {
        if QName(name) == TAG_SHADING {
            continue;
        }
        if !shaded && SHADING_SUCCESSORS.contains(&name.as_slice()) {
            content.extend_from_slice(shading.as_bytes());
            shaded = true;
        }
        content.extend_from_slice(&source[span.clone()]);
    }
    if !shaded {
        content.extend_from_slice(shading.as_bytes());
    }
    content.extend_from_slice(b"</w:tcPr>");
    content
}

fn shading(fill: &Rgb) -> String {
    format!(r#"<w:shd w:val="clear" w:color="auto" w:fill="{fill}"/>"#)
}

fn header_paragraph(text: &str, style: &TableStyle) -> String {
    let properties = run_properties(true, Some(&style.header_text), style.header_font_size);
    paragraph("center", &properties, text)
}

/// One cell spanning every column, carrying the form label.
fn form_row(form: &str, columns: usize, style: &TableStyle) -> String {
    let span = match columns {
        0 | 1 => String::new(),
        columns => format!(r#"<w:gridSpan w:val="{columns}"/>"#),
    };
    let properties = run_properties(true, Some(&style.form_text), style.form_font_size);
    format!(
        "<w:tr><w:tc><w:tcPr>{span}{}</w:tcPr>{}</w:tc></w:tr>",
        shading(&style.form_fill),
        paragraph("center", &properties, form),
    )
}

/// Id, section, description and status, left-aligned without shading.
fn requirement_row(requirement: &Requirement, style: &TableStyle) -> String {
    let properties = run_properties(false, None, style.body_font_size);
    let cells: String = [
        &requirement.id,
        &requirement.section,
        &requirement.description,
        &requirement.status,
    ]
    .iter()
    .map(|text| format!("<w:tc>{}</w:tc>", paragraph("left", &properties, text)))
    .collect();
    format!("<w:tr>{cells}</w:tr>")
}

fn run_properties(bold: bool, color: Option<&Rgb>, size: f32) -> String {
    let mut properties = String::from("<w:rPr>");
    if bold {
        properties.push_str("<w:b/>");
    }
    if let Some(color) = color {
        properties.push_str(&format!(r#"<w:color w:val="{color}"/>"#));
    }
    properties.push_str(&format!(r#"<w:sz w:val="{}"/></w:rPr>"#, half_points(size)));
    properties
}

fn paragraph(justification: &str, run_properties: &str, text: &str) -> String {
    let run = match text {
        "" => String::new(),
        text => format!("<w:r>{run_properties}{}</w:r>", run_content(text)),
    };
    format!(r#"<w:p><w:pPr><w:jc w:val="{justification}"/></w:pPr>{run}</w:p>"#)
}

/// Run content for `text`: line breaks become `w:br`, tabs `w:tab`.
fn run_content(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut content = String::new();
    let mut pending = String::new();
    let flush = |content: &mut String, pending: &mut String| {
        if !pending.is_empty() {
            content.push_str(&format!(r#"<w:t xml:space="preserve">{}</w:t>"#, escape_text(pending)));
            pending.clear();
        }
    };
    for c in normalized.chars() {
        match c {
            '\n' => {
                flush(&mut content, &mut pending);
                content.push_str("<w:br/>");
            }
            '\t' => {
                flush(&mut content, &mut pending);
                content.push_str("<w:tab/>");
            }
            c => pending.push(c),
        }
    }
    flush(&mut content, &mut pending);
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::body::Body;
    use crate::fixtures;

    fn group(form: &str, ids: &[&str]) -> FormGroup {
        FormGroup {
            form: form.to_owned(),
            requirements: ids
                .iter()
                .map(|id| Requirement {
                    id: id.to_string(),
                    section: "Auth".to_owned(),
                    description: format!("Description of {id}"),
                    status: "Final".to_owned(),
                    form: form.to_owned(),
                })
                .collect(),
        }
    }

    fn texts(table: &TableNode) -> Vec<Vec<String>> {
        table.rows.iter().map(|row| row.cells.iter().map(CellNode::text).collect()).collect()
    }

    #[test]
    fn apply_edits_splices_in_offset_order() {
        let edits = vec![
            Edit::insert(10, "!"),
            Edit::replace(0..5, "HELLO"),
            Edit::delete(5..6),
            Edit::insert(10, "?"),
        ];
        assert_eq!(apply_edits(b"hello world", edits), b"HELLOworl!?d".to_vec());
        assert_eq!(apply_edits(b"unchanged", vec![]), b"unchanged".to_vec());
    }

    #[test]
    fn run_content_maps_breaks_tabs_and_escapes() {
        assert_eq!(
            run_content("a<b>\r\nc\td\u{1}"),
            r#"<w:t xml:space="preserve">a&lt;b&gt;</w:t><w:br/><w:t xml:space="preserve">c</w:t><w:tab/><w:t xml:space="preserve">d</w:t>"#
        );
        assert_eq!(run_content("\n"), "<w:br/>");
    }

    #[test]
    fn rows_skip_unrendered_groups() {
        let groups = vec![group("Login", &["R1", "R2"]), group("", &["R3"]), group("Checkout", &["R4"])];
        let rows = requirement_rows(&groups, 4, &TableStyle::default());
        assert_eq!(rows.len(), 5);
        assert_eq!(expected_row_count(&groups), 5);
        assert!(rows[0].contains(r#"<w:gridSpan w:val="4"/>"#));
        assert!(rows[0].contains(r#"<w:shd w:val="clear" w:color="auto" w:fill="00B0F0"/>"#));
        assert!(rows[0].contains(r#"<w:b/><w:color w:val="000000"/><w:sz w:val="22"/>"#));
        assert!(rows[1].contains(r#"<w:jc w:val="left"/>"#));
        assert!(rows[1].contains(r#"<w:rPr><w:sz w:val="20"/></w:rPr>"#));
        assert!(!rows[1].contains("w:shd"));
        assert!(rows[3].contains(">Checkout<"));
    }

    #[test]
    fn rebuild_keeps_header_and_replaces_data_rows() {
        let body_xml = fixtures::table(&[
            ["Requirement ID", "Section", "Description", "Status"],
            ["OLD-1", "s", "d", "Draft"],
            ["OLD-2", "s", "d", "Draft"],
        ]);
        let xml = fixtures::document_xml(&body_xml);
        let body = Body::scan(xml.as_bytes()).unwrap();
        let style = TableStyle::default();
        let groups = vec![group("Login", &["R1", "R2"])];
        let rows = requirement_rows(&groups, 4, &style);

        let output = apply_edits(xml.as_bytes(), rebuild_table(xml.as_bytes(), &body.tables[0], &rows, &style));
        let rebuilt = Body::scan(&output).unwrap();
        let table = &rebuilt.tables[0];
        assert_eq!(
            texts(table),
            vec![
                vec!["Requirement ID", "Section", "Description", "Status"],
                vec!["Login"],
                vec!["R1", "Auth", "Description of R1", "Final"],
                vec!["R2", "Auth", "Description of R2", "Final"],
            ]
        );
        assert_eq!(table.rows[1].cells[0].grid_span, 4);

        let text = String::from_utf8(output).unwrap();
        assert!(!text.contains("OLD-1"));
        assert_eq!(text.matches(r#"w:fill="00B0F0""#).count(), 5);
        assert_eq!(text.matches(r#"<w:color w:val="FFFFFF"/>"#).count(), 4);
    }

    #[test]
    fn rebuild_clears_rows_wrapped_in_content_controls() {
        let header = fixtures::table(&[["Requirement ID", "Section", "Description", "Status"]]);
        let stale = |id: &str| {
            let cells: String = [id, "s", "d", "Draft"]
                .iter()
                .map(|text| format!("<w:tc>{}</w:tc>", fixtures::paragraph(text)))
                .collect();
            format!("<w:tr>{cells}</w:tr>")
        };
        let wrapped = format!(
            r#"<w:sdt><w:sdtPr><w:alias w:val="Requirements"/></w:sdtPr><w:sdtContent>{}{}</w:sdtContent></w:sdt><w:customXml w:element="extra">{}</w:customXml>"#,
            stale("STALE-1"),
            stale("STALE-2"),
            stale("STALE-3"),
        );
        let body_xml = header.replace("</w:tbl>", &format!("{wrapped}</w:tbl>"));
        let xml = fixtures::document_xml(&body_xml);
        let body = Body::scan(xml.as_bytes()).unwrap();
        assert_eq!(body.tables[0].rows.len(), 4);

        let style = TableStyle::default();
        let rows = requirement_rows(&[group("Login", &["R1"])], 4, &style);
        let output = apply_edits(xml.as_bytes(), rebuild_table(xml.as_bytes(), &body.tables[0], &rows, &style));
        let text = String::from_utf8(output).unwrap();
        assert!(!text.contains("STALE"));
        assert!(!text.contains("w:sdt"));
        assert!(!text.contains("w:customXml"));

        let rebuilt = Body::scan(text.as_bytes()).unwrap();
        assert_eq!(texts(&rebuilt.tables[0]).len(), 3);
        assert_eq!(texts(&rebuilt.tables[0])[2], vec!["R1", "Auth", "Description of R1", "Final"]);
    }

    #[test]
    fn rebuild_keeps_wrapper_that_holds_the_header() {
        let body_xml = format!(
            r#"<w:tbl><w:sdt><w:sdtContent><w:tr><w:tc>{}</w:tc></w:tr><w:tr><w:tc>{}</w:tc></w:tr></w:sdtContent></w:sdt></w:tbl>"#,
            fixtures::paragraph("Requirement ID"),
            fixtures::paragraph("STALE-1"),
        );
        let xml = fixtures::document_xml(&body_xml);
        let body = Body::scan(xml.as_bytes()).unwrap();
        let style = TableStyle::default();
        let output = apply_edits(xml.as_bytes(), rebuild_table(xml.as_bytes(), &body.tables[0], &[], &style));
        let text = String::from_utf8(output).unwrap();
        assert!(!text.contains("STALE-1"));
        assert!(text.contains("<w:sdt><w:sdtContent><w:tr>"));
        assert_eq!(Body::scan(text.as_bytes()).unwrap().tables[0].header_texts(), vec!["Requirement ID"]);
    }

    #[test]
    fn header_shading_lands_in_schema_position() {
        let body_xml = concat!(
            r#"<w:tbl><w:tr>"#,
            r#"<w:tc><w:tcPr><w:tcW w:w="100" w:type="dxa"/><w:shd w:val="clear" w:fill="FF0000"/><w:vAlign w:val="center"/></w:tcPr><w:p><w:r><w:t>Requirement ID</w:t></w:r></w:p></w:tc>"#,
            r#"<w:tc><w:tcPr><w:tcW w:w="100" w:type="dxa"/></w:tcPr><w:p><w:r><w:t>Section</w:t></w:r></w:p></w:tc>"#,
            r#"<w:tc><w:tcPr/><w:p/></w:tc>"#,
            r#"<w:tc></w:tc>"#,
            r#"</w:tr></w:tbl>"#,
        );
        let xml = fixtures::document_xml(body_xml);
        let body = Body::scan(xml.as_bytes()).unwrap();
        let style = TableStyle::default();
        let output = apply_edits(xml.as_bytes(), rebuild_table(xml.as_bytes(), &body.tables[0], &[], &style));
        let text = String::from_utf8(output).unwrap();

        let shd = r#"<w:shd w:val="clear" w:color="auto" w:fill="00B0F0"/>"#;
        assert!(text.contains(&format!(r#"<w:tcPr><w:tcW w:w="100" w:type="dxa"/>{shd}<w:vAlign w:val="center"/></w:tcPr>"#)));
        assert!(text.contains(&format!(r#"<w:tcPr><w:tcW w:w="100" w:type="dxa"/>{shd}</w:tcPr>"#)));
        assert!(text.contains(&format!(r#"<w:tc><w:tcPr>{shd}</w:tcPr><w:p><w:pPr><w:jc w:val="center"/></w:pPr></w:p></w:tc>"#)));
        assert!(!text.contains("FF0000"));
        assert_eq!(text.matches(shd).count(), 4);

        let rebuilt = Body::scan(text.as_bytes()).unwrap();
        assert_eq!(rebuilt.tables[0].header_texts(), vec!["Requirement ID", "Section", "", ""]);
        assert_eq!(rebuilt.tables[0].rows.len(), 1);
    }

    #[test]
    fn create_table_inserts_after_anchor() {
        let xml = fixtures::document_xml(&format!(
            "{}{}",
            fixtures::paragraph("3. Functional Requirements"),
            fixtures::paragraph("4. Non-functional Requirements"),
        ));
        let body = Body::scan(xml.as_bytes()).unwrap();
        let style = TableStyle::default();
        let rows = requirement_rows(&[group("Login", &["R1"])], 4, &style);
        let output = apply_edits(xml.as_bytes(), vec![create_table(&body.paragraphs[0], &rows, &style)]);

        let rebuilt = Body::scan(&output).unwrap();
        assert_eq!(rebuilt.paragraphs.len(), 2);
        let table = &rebuilt.tables[0];
        assert!(table.span.start >= rebuilt.paragraphs[0].span.end);
        assert!(table.span.end <= rebuilt.paragraphs[1].span.start);
        assert_eq!(table.columns(), 4);
        assert_eq!(table.header_texts(), vec!["Requirement ID", "Section", "Description", "Status"]);
        assert_eq!(table.rows.len(), 3);
        assert!(String::from_utf8(output).unwrap().contains(r#"<w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#));
    }
}
