//! Top-level pipeline: spreadsheet bytes in, rebuilt Word document out.
use crate::config::GeneratorConfig;
use crate::document::Document;
use crate::document::TableSignature;
use crate::error::BrdError;
use crate::error::ResultMessage;
use crate::requirements::extract_requirements;
use crate::requirements::filter_by_status;
use crate::requirements::group_by_form;
use crate::requirements::FilterMode;
use crate::requirements::FormGroup;
use crate::requirements::Records;
use crate::requirements::EXPECTED_COLUMNS;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::Criteria;
use serde::Serialize;

/// Inputs of one generation run. Unset fields fall back to the configuration.
#[derive(Clone, Debug, Default)]
pub struct GenerateRequest {
    pub spreadsheet: Vec<u8>,
    /// Template bytes; the configured template file when absent
    pub template: Option<Vec<u8>>,
    pub sheet: Option<String>,
    pub filter: Option<FilterMode>,
}

/// Outcome of a generation run that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Generated {
    /// The rebuilt .docx package
    Document(Vec<u8>),
    /// The filter left no requirement, so no document was produced
    NoMatchingRequirements { filter: FilterMode },
}

/// Form groups as parsed without filtering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub total_groups: usize,
    pub groups: Vec<FormGroup>,
}

/// Runs the pipeline with one configuration.
#[derive(Clone, Debug, Default)]
pub struct Generator {
    config: GeneratorConfig,
    signature: TableSignature,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Generator {
        Generator { config, signature: TableSignature::default() }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Reads, validates, filters and groups the requirements of a workbook.
    pub fn parse(&self, spreadsheet: Vec<u8>, sheet: Option<&str>, filter: FilterMode) -> Result<Vec<FormGroup>, BrdError> {
        let mut source = open_spreadsheet(spreadsheet)?;
        let table = source.read_table(&Criteria::sheet(sheet.or(self.config.sheet.as_deref())))?;
        let records = Records::from_table(&table);
        let requirements = filter_by_status(extract_requirements(&records, &EXPECTED_COLUMNS)?, filter);
        let count = requirements.len();
        let groups = group_by_form(requirements);
        log::info!("Parsed {} requirements in {} form groups from sheet '{}'", count, groups.len(), table.sheet);
        for (index, group) in groups.iter().enumerate() {
            log::debug!("  Group {}: Form='{}', Requirements={}", index + 1, group.label(), group.requirements.len());
        }
        Ok(groups)
    }

    /// Parses every requirement of a workbook without filtering.
    pub fn preview(&self, spreadsheet: Vec<u8>, sheet: Option<&str>) -> Result<Preview, BrdError> {
        let groups = self.parse(spreadsheet, sheet, FilterMode::None)?;
        Ok(Preview { total_groups: groups.len(), groups })
    }

    /// Rebuilds the requirements table of the template from the workbook.
    ///
    /// An empty result after filtering is reported as
    /// [`Generated::NoMatchingRequirements`] before any template is read.
    pub fn generate(&self, request: GenerateRequest) -> Result<Generated, BrdError> {
        let filter = request.filter.unwrap_or(self.config.filter);
        let groups = self.parse(request.spreadsheet, request.sheet.as_deref(), filter)?;
        if groups.is_empty() {
            log::warn!("No requirements matched filter '{}'", filter);
            return Ok(Generated::NoMatchingRequirements { filter });
        }

        let template = match request.template {
            Some(bytes) => bytes,
            None => self.load_template()?,
        };
        let mut document = Document::open(template)?;
        log::info!(
            "Loaded template with {} tables and {} paragraphs",
            document.table_count(),
            document.paragraph_count()
        );
        let target = document.locate(&self.signature, &self.config.section_marker)?;
        document.rebuild(target, &groups, &self.config.style)?;
        Ok(Generated::Document(document.save()?))
    }

    fn load_template(&self) -> Result<Vec<u8>, BrdError> {
        let path = &self.config.template;
        log::debug!("Reading template {}", path.display());
        std::fs::read(path)
            .map_err(BrdError::from)
            .with_prefix(&format!("Template {}", path.display()))
    }
}
