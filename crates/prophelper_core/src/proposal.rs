use serde::Serialize;
use tracing::{debug, warn};

use crate::commands::{CommandScript, CreationOutcome, creation_script, examples_script};
use crate::error::ProposalError;
use crate::fields::{FieldMap, parse_fields};
use crate::markup::{Section, split_sections, strip_comments};
use crate::reinterpret::reinterpret_templates;
use crate::template::{
    TemplateTable, TemplateValue, extract_templates, first_placeholder, reinsert_templates,
};

/// One parsed proposal: its label map, its fields, and the templates the
/// fields refer to through placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Proposal {
    pub labels: FieldMap,
    pub fields: FieldMap,
    pub templates: TemplateTable,
}

impl Proposal {
    /// Parse a section. `heading_language` names the label taken from a
    /// heading that holds no template.
    pub fn parse(section: &Section, heading_language: &str) -> Result<Self, ProposalError> {
        let labels = parse_labels(&section.label, heading_language)?;
        let extraction = extract_templates(strip_outer_braces(&section.body))?;
        let fields = parse_fields(&extraction.text);
        let mut templates = extraction.table;
        reinterpret_templates(&mut templates);
        debug!(
            fields = fields.len(),
            templates = templates.len(),
            "parsed proposal section"
        );
        Ok(Self {
            labels,
            fields,
            templates,
        })
    }

    /// Field value as parsed, placeholders included.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name)
    }

    /// Field value with every placeholder substituted.
    pub fn resolved_field(&self, name: &str) -> Option<String> {
        self.field(name).map(|value| self.resolve(value))
    }

    pub fn resolve(&self, text: &str) -> String {
        reinsert_templates(&self.templates, text)
    }
}

fn strip_outer_braces(body: &str) -> &str {
    let body = body.strip_prefix("{{").unwrap_or(body);
    body.strip_suffix("}}").unwrap_or(body)
}

/// Labels come from the heading's outermost leading template, usually
/// `{{TranslateThis|anchor=...|en=...}}`; a plain heading becomes a single
/// label in `heading_language`.
fn parse_labels(heading: &str, heading_language: &str) -> Result<FieldMap, ProposalError> {
    let extraction = extract_templates(heading)?;
    let mut table = extraction.table;
    let first_template = first_placeholder(&extraction.text)
        .and_then(|index| table.get(index).cloned());

    let mut labels = FieldMap::new();
    match first_template {
        Some(TemplateValue::Raw(body)) => {
            reinterpret_templates(&mut table);
            for (language, label) in parse_fields(&body).iter() {
                labels.insert(language, reinsert_templates(&table, label));
            }
        }
        _ => {
            let text = heading.trim();
            if !text.is_empty() {
                labels.insert(heading_language, text);
            }
        }
    }
    Ok(labels)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptMode {
    Create { source_url: Option<String> },
    Examples { property_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionOutcome {
    Script { commands: CommandScript },
    Rejected { message: String },
    Failed { error: String },
}

impl SectionOutcome {
    /// Text shown in place of the section's script.
    pub fn render(&self) -> String {
        match self {
            Self::Script { commands } => commands.render(),
            Self::Rejected { message } => message.clone(),
            Self::Failed { error } => format!("PROPOSAL COULD NOT BE PARSED: {error}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionReport {
    pub index: usize,
    pub heading: String,
    #[serde(flatten)]
    pub outcome: SectionOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedSection {
    pub index: usize,
    pub heading: String,
    pub proposal: Option<Proposal>,
    pub error: Option<String>,
}

/// Strip comments and split a raw proposal page into its proposal sections.
pub fn proposal_sections(document: &str) -> Result<Vec<Section>, ProposalError> {
    let sections = split_sections(&strip_comments(document));
    if sections.is_empty() {
        return Err(ProposalError::NoProposalSections);
    }
    Ok(sections)
}

/// Run the whole pipeline over a raw proposal page, one report per section.
///
/// A section that fails to parse is reported in place; the remaining
/// sections are still processed.
pub fn process_document(
    document: &str,
    mode: &ScriptMode,
    description_language: &str,
) -> Result<Vec<SectionReport>, ProposalError> {
    let sections = proposal_sections(document)?;
    let reports = sections
        .iter()
        .enumerate()
        .map(|(index, section)| SectionReport {
            index,
            heading: section.label.trim().to_string(),
            outcome: process_section(section, mode, description_language),
        })
        .collect();
    Ok(reports)
}

fn process_section(section: &Section, mode: &ScriptMode, language: &str) -> SectionOutcome {
    let proposal = match Proposal::parse(section, language) {
        Ok(proposal) => proposal,
        Err(error) => {
            warn!(heading = section.label.trim(), %error, "skipping malformed proposal section");
            return SectionOutcome::Failed {
                error: error.to_string(),
            };
        }
    };
    match mode {
        ScriptMode::Create { source_url } => {
            match creation_script(&proposal, source_url.as_deref(), language) {
                CreationOutcome::Script(commands) => SectionOutcome::Script { commands },
                CreationOutcome::Rejected(rejection) => SectionOutcome::Rejected {
                    message: rejection.to_string(),
                },
            }
        }
        ScriptMode::Examples { property_id } => SectionOutcome::Script {
            commands: examples_script(&proposal, property_id),
        },
    }
}

/// Parse every proposal section without generating scripts.
pub fn inspect_document(
    document: &str,
    heading_language: &str,
) -> Result<Vec<ParsedSection>, ProposalError> {
    let sections = proposal_sections(document)?;
    Ok(sections
        .iter()
        .enumerate()
        .map(|(index, section)| {
            let heading = section.label.trim().to_string();
            match Proposal::parse(section, heading_language) {
                Ok(proposal) => ParsedSection {
                    index,
                    heading,
                    proposal: Some(proposal),
                    error: None,
                },
                Err(error) => ParsedSection {
                    index,
                    heading,
                    proposal: None,
                    error: Some(error.to_string()),
                },
            }
        })
        .collect())
}
