//! ZIP archive helper utilities for OOXML packages (.xlsx and .docx)
//! Provides convenient methods for accessing parts within a package and for
//! writing a package back with selected parts replaced.

use crate::error::BrdError;
use crate::helpers::xml::XmlReader;
use std::collections::HashMap;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;

/// Helper trait for ZIP archive operations with specialized reader creation
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets a file from the ZIP archive by name (case-insensitive, path separator agnostic)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, BrdError>;

    /// Creates an XML reader for a file within the ZIP archive
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, BrdError>;

    /// Reads a whole file from the ZIP archive into memory
    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, BrdError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    /// Gets a file from the ZIP archive by name with case-insensitive matching
    /// and path separator normalization (backslash to forward slash)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, BrdError> {
        let pattern = name.replace('\\', "/");
        let path = self.file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(file_name.trim_start_matches('/')))
            .map(|file_name| file_name.to_owned());
        match path.map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(Some(file)) => Ok(Some(file)),
            Ok(None) | Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, BrdError> {
        let reader = self
            .file(name)?
            .map(|file| XmlReader::new(BufReader::new(file)));
        Ok(reader)
    }

    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, BrdError> {
        match self.file(name)? {
            Some(mut file) => {
                let mut bytes = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut bytes)?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }
}

/// Writes a copy of `archive` in which the parts named in `replacements` carry new
/// content. Replaced parts are deflated and keep their original timestamp; every
/// other entry is raw-copied so its compressed bytes are preserved exactly.
pub(crate) fn rewrite_package<RS: Read + Seek>(
    archive: &mut ZipArchive<RS>,
    replacements: &HashMap<String, Vec<u8>>,
) -> Result<Vec<u8>, BrdError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for index in 0..archive.len() {
        let (name, modified) = {
            let file = archive.by_index_raw(index)?;
            (file.name().to_owned(), file.last_modified().unwrap_or_default())
        };
        let replacement = replacements
            .iter()
            .find(|(part, _)| part.eq_ignore_ascii_case(name.trim_start_matches('/')))
            .map(|(_, bytes)| bytes);
        match replacement {
            Some(bytes) => {
                let options = SimpleFileOptions::default()
                    .compression_method(CompressionMethod::Deflated)
                    .last_modified_time(modified);
                writer.start_file(name, options)?;
                writer.write_all(bytes)?;
            }
            None => writer.raw_copy_file(archive.by_index_raw(index)?)?,
        }
    }
    Ok(writer.finish()?.into_inner())
}
