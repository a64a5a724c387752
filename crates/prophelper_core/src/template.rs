use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use tracing::{debug, warn};

use crate::error::ProposalError;
use crate::fields::FieldMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const PLACEHOLDER_MARK: &str = "%%";
const EXCERPT_CHARS: usize = 40;

/// Value held by one template table slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TemplateValue {
    /// Body exactly as extracted, before reinterpretation.
    Raw(String),
    Text(String),
    LanguageMap(FieldMap),
}

impl TemplateValue {
    /// Text substituted for this slot's placeholder.
    ///
    /// `Raw` restores the template markup, so reinsertion into an
    /// uninterpreted table reproduces the source. A language map renders as
    /// `lang:text` pairs joined by `; ` in field order.
    pub fn to_text(&self) -> String {
        match self {
            Self::Raw(body) => format!("{OPEN}{body}{CLOSE}"),
            Self::Text(text) => text.clone(),
            Self::LanguageMap(languages) => languages
                .iter()
                .map(|(language, text)| format!("{language}:{text}"))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }

    pub fn as_language_map(&self) -> Option<&FieldMap> {
        match self {
            Self::LanguageMap(languages) => Some(languages),
            _ => None,
        }
    }
}

/// Templates in discovery order, addressed by 1-based index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateTable {
    entries: Vec<TemplateValue>,
}

impl TemplateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw body and return its index.
    pub fn push_raw(&mut self, body: impl Into<String>) -> usize {
        self.entries.push(TemplateValue::Raw(body.into()));
        self.entries.len()
    }

    pub fn get(&self, index: usize) -> Option<&TemplateValue> {
        index
            .checked_sub(1)
            .and_then(|position| self.entries.get(position))
    }

    pub fn set(&mut self, index: usize, value: TemplateValue) {
        if let Some(slot) = index
            .checked_sub(1)
            .and_then(|position| self.entries.get_mut(position))
        {
            *slot = value;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &TemplateValue)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(position, value)| (position + 1, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for TemplateTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (index, value) in self.iter() {
            map.serialize_entry(&index.to_string(), value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub table: TemplateTable,
}

pub fn placeholder(index: usize) -> String {
    format!("{PLACEHOLDER_MARK}{index}{PLACEHOLDER_MARK}")
}

/// Replace every `{{...}}` span in `content` with a placeholder, innermost
/// first, recording each body in a fresh table slot.
///
/// Each pass takes the first `}}` after the first remaining `{{` and pairs it
/// with the nearest `{{` before it, so the body never holds an unresolved
/// template. One pass dissolves exactly one template. A body holding a stray
/// `}` has no valid pairing and fails the whole extraction.
pub fn extract_templates(content: &str) -> Result<Extraction, ProposalError> {
    let mut text = content.to_string();
    let mut table = TemplateTable::new();

    while let Some(first_open) = text.find(OPEN) {
        let Some(close_offset) = text[first_open + OPEN.len()..].find(CLOSE) else {
            return Err(ProposalError::UnterminatedTemplate {
                excerpt: excerpt(&text[first_open..]),
            });
        };
        let close = first_open + OPEN.len() + close_offset;
        let open = text[..close].rfind(OPEN).unwrap_or(first_open);

        let body = text[open + OPEN.len()..close].to_string();
        if body.contains('}') {
            return Err(ProposalError::UnterminatedTemplate {
                excerpt: excerpt(&text[open..]),
            });
        }
        let index = table.push_raw(body.as_str());
        debug!(index, body = %body, "extracted template");
        text.replace_range(open..close + CLOSE.len(), &placeholder(index));
    }

    Ok(Extraction { text, table })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlaceholderSpan {
    start: usize,
    end: usize,
    index: usize,
}

fn next_placeholder(text: &str, from: usize) -> Option<PlaceholderSpan> {
    let bytes = text.as_bytes();
    let mut cursor = from;
    while let Some(offset) = text[cursor..].find(PLACEHOLDER_MARK) {
        let start = cursor + offset;
        let digits_start = start + PLACEHOLDER_MARK.len();
        let digits = bytes[digits_start..]
            .iter()
            .take_while(|byte| byte.is_ascii_digit())
            .count();
        let digits_end = digits_start + digits;
        if digits > 0
            && text[digits_end..].starts_with(PLACEHOLDER_MARK)
            && let Ok(index) = text[digits_start..digits_end].parse::<usize>()
        {
            return Some(PlaceholderSpan {
                start,
                end: digits_end + PLACEHOLDER_MARK.len(),
                index,
            });
        }
        cursor = start + 1;
    }
    None
}

/// Index of the first placeholder in `text`.
pub fn first_placeholder(text: &str) -> Option<usize> {
    next_placeholder(text, 0).map(|span| span.index)
}

/// Index of the placeholder when `text` is nothing but one placeholder.
pub fn sole_placeholder(text: &str) -> Option<usize> {
    let trimmed = text.trim();
    let span = next_placeholder(trimmed, 0)?;
    (span.start == 0 && span.end == trimmed.len()).then_some(span.index)
}

/// Substitute every placeholder in `content` with the text of its table slot.
///
/// Substituted text is resolved again, so a slot whose value still mentions
/// earlier slots expands fully. A placeholder naming a missing slot is
/// dropped.
pub fn reinsert_templates(table: &TemplateTable, content: &str) -> String {
    resolve_placeholders(table, content, usize::MAX)
}

fn resolve_placeholders(table: &TemplateTable, content: &str, below: usize) -> String {
    let mut output = String::with_capacity(content.len());
    let mut cursor = 0usize;
    while let Some(span) = next_placeholder(content, cursor) {
        output.push_str(&content[cursor..span.start]);
        // Slots only ever reference slots discovered before them.
        match table.get(span.index).filter(|_| span.index < below) {
            Some(value) => {
                output.push_str(&resolve_placeholders(table, &value.to_text(), span.index));
            }
            None => {
                warn!(index = span.index, "dropping placeholder with no extracted template");
            }
        }
        cursor = span.end;
    }
    output.push_str(&content[cursor..]);
    output
}

fn excerpt(text: &str) -> String {
    let mut output = text.chars().take(EXCERPT_CHARS).collect::<String>();
    if text.chars().count() > EXCERPT_CHARS {
        output.push_str("...");
    }
    output
}
