//! In-memory XLSX and DOCX packages for unit tests.

use quick_xml::escape::escape;
use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::DateTime;
use zip::ZipWriter;

pub(crate) const WORD_NAMESPACE: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Zips `entries` with a fixed timestamp so identical input gives identical bytes.
pub(crate) fn package<S: AsRef<str>>(entries: &[(S, String)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());
        writer.start_file(name.as_ref(), options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Workbook whose sheets hold `rows` of text. The first row of each sheet uses
/// shared strings, later rows inline strings; empty values leave the cell out.
pub(crate) fn xlsx(sheets: &[(&str, Vec<Vec<&str>>)]) -> Vec<u8> {
    let mut shared_strings = Vec::<String>::new();
    let mut sheet_parts = Vec::new();
    for (sheet_index, (_, rows)) in sheets.iter().enumerate() {
        let mut sheet_data = String::new();
        for (row_index, row) in rows.iter().enumerate() {
            sheet_data.push_str(&format!(r#"<row r="{}">"#, row_index + 1));
            for (col_index, value) in row.iter().enumerate().filter(|(_, value)| !value.is_empty()) {
                let reference = format!("{}{}", (b'A' + col_index as u8) as char, row_index + 1);
                if row_index == 0 {
                    shared_strings.push(value.to_string());
                    sheet_data.push_str(&format!(r#"<c r="{reference}" t="s"><v>{}</v></c>"#, shared_strings.len() - 1));
                } else {
                    sheet_data.push_str(&format!(r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#, escape(*value)));
                }
            }
            sheet_data.push_str("</row>");
        }
        let part = format!("xl/worksheets/sheet{}.xml", sheet_index + 1);
        sheet_parts.push((part, worksheet(&sheet_data)));
    }

    let names: Vec<&str> = sheets.iter().map(|(name, _)| *name).collect();
    let mut entries = workbook_entries(&names);
    let items: String = shared_strings.iter().map(|text| format!("<si><t>{}</t></si>", escape(text.as_str()))).collect();
    entries.push((
        "xl/sharedStrings.xml".to_owned(),
        format!(r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">{items}</sst>"#, shared_strings.len()),
    ));
    entries.extend(sheet_parts);
    package(&entries)
}

/// Single-sheet workbook with the given worksheet XML.
pub(crate) fn xlsx_with_sheet_xml(name: &str, sheet_xml: &str) -> Vec<u8> {
    let mut entries = workbook_entries(&[name]);
    entries.push(("xl/worksheets/sheet1.xml".to_owned(), sheet_xml.to_owned()));
    package(&entries)
}

/// Single-sheet workbook with the given worksheet and styles XML.
pub(crate) fn xlsx_with_styles(name: &str, sheet_xml: &str, styles_xml: &str) -> Vec<u8> {
    let mut entries = workbook_entries(&[name]);
    entries.push(("xl/styles.xml".to_owned(), styles_xml.to_owned()));
    entries.push(("xl/worksheets/sheet1.xml".to_owned(), sheet_xml.to_owned()));
    package(&entries)
}

fn worksheet(sheet_data: &str) -> String {
    format!(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_data}</sheetData></worksheet>"#)
}

fn workbook_entries(names: &[&str]) -> Vec<(String, String)> {
    let sheets: String = names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            format!(r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#, escape(*name), index + 1, index + 1)
        })
        .collect();
    let relationships: String = (1..=names.len())
        .map(|index| {
            format!(r#"<Relationship Id="rId{index}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{index}.xml"/>"#)
        })
        .collect();
    vec![
        (
            "xl/workbook.xml".to_owned(),
            format!(r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheets}</sheets></workbook>"#),
        ),
        (
            "xl/_rels/workbook.xml.rels".to_owned(),
            format!(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#),
        ),
    ]
}

/// Main document part wrapping `body` in `w:document`/`w:body`.
pub(crate) fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{WORD_NAMESPACE}"><w:body>{body}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#
    )
}

/// DOCX package with the given body content and a few untouched side parts.
pub(crate) fn docx(body: &str) -> Vec<u8> {
    package(&[
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#.to_owned(),
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#.to_owned(),
        ),
        ("word/document.xml", document_xml(body)),
        ("word/styles.xml", format!(r#"<w:styles xmlns:w="{WORD_NAMESPACE}"/>"#)),
    ])
}

pub(crate) fn paragraph(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#, escape(text))
}

/// Plain table with one grid column per cell of the first row.
pub(crate) fn table<'a, R: AsRef<[&'a str]>>(rows: &[R]) -> String {
    let columns = rows.first().map(|row| row.as_ref().len()).unwrap_or_default();
    let grid: String = (0..columns).map(|_| r#"<w:gridCol w:w="2000"/>"#).collect();
    let body: String = rows
        .iter()
        .map(|row| {
            let cells: String = row
                .as_ref()
                .iter()
                .map(|text| format!("<w:tc>{}</w:tc>", paragraph(text)))
                .collect();
            format!("<w:tr>{cells}</w:tr>")
        })
        .collect();
    format!(r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid>{grid}</w:tblGrid>{body}</w:tbl>"#)
}
