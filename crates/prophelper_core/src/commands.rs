use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::datatype::{format_object, import_datatype, quote};
use crate::proposal::Proposal;
use crate::template::{TemplateValue, sole_placeholder};

pub const DEFAULT_LANGUAGE: &str = "en";

const LAST: &str = "LAST";
const ANCHOR_KEY: &str = "anchor";

const PROVENANCE_PROPERTY: &str = "P3254";
const INSTANCE_OF: &str = "P31";
const IDENTIFIER_PROPERTY_CLASS: &str = "Q19847637";
const CONSTRAINT: &str = "P2302";
const ALLOWED_ENTITY_TYPES: &str = "Q52004125\tP2305\tQ29934200";
const ALLOWED_SCOPES: &str = "Q53869507\tP5314\tQ54828448\tP5314\tQ54828450";
const SINGLE_VALUE: &str = "Q19474404";
const DISTINCT_VALUES: &str = "Q21502410";
const FORMAT_CONSTRAINT: &str = "Q21502404";
const FORMAT_PATTERN: &str = "P1793";
const SUBJECT_TYPE: &str = "Q21503250";
const SUBJECT_CLASS: &str = "P2308";
const SUBJECT_RELATION: &str = "P2309";
const INSTANCE_OR_SUBCLASS: &str = "Q21503252";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldShape {
    Quoted,
    Single,
    List,
}

/// Optional proposal fields copied onto the new property, in output order.
const OPTIONAL_FIELDS: [(&str, &str, FieldShape); 7] = [
    ("formatter URL", "P1630", FieldShape::Quoted),
    ("source", "P1896", FieldShape::Quoted),
    ("subject item", "P1629", FieldShape::List),
    ("expected completeness", "P2429", FieldShape::Single),
    ("applicable stated in value", "P9073", FieldShape::Single),
    ("see also", "P1659", FieldShape::List),
    ("Wikidata project", "P6104", FieldShape::List),
];

/// Ordered, tab-delimited import command lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandScript {
    lines: Vec<String>,
}

impl CommandScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `subject` followed by `parts`, tab separated.
    pub fn push(&mut self, subject: &str, parts: &[&str]) {
        let mut line = subject.to_string();
        for part in parts {
            line.push('\t');
            line.push_str(part);
        }
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// Why a proposal cannot be turned into a creation script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    StatusNotReady,
    DatatypeMissing,
}

impl Rejection {
    pub fn message(self) -> &'static str {
        match self {
            Self::StatusNotReady => "PROPOSAL CANNOT BE CREATED: 'status' is not 'ready'",
            Self::DatatypeMissing => "PROPOSAL CANNOT BE CREATED: 'datatype' not set",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationOutcome {
    Script(CommandScript),
    Rejected(Rejection),
}

impl CreationOutcome {
    pub fn render(&self) -> String {
        match self {
            Self::Script(script) => script.render(),
            Self::Rejected(rejection) => rejection.to_string(),
        }
    }
}

/// Build the script that creates the proposed property.
pub fn creation_script(
    proposal: &Proposal,
    source_url: Option<&str>,
    description_language: &str,
) -> CreationOutcome {
    if proposal.field("status") != Some("ready") {
        return CreationOutcome::Rejected(Rejection::StatusNotReady);
    }
    let datatype = import_datatype(proposal.field("datatype").unwrap_or(""));
    if datatype.is_empty() {
        return CreationOutcome::Rejected(Rejection::DatatypeMissing);
    }

    let mut script = CommandScript::new();
    script.push("CREATE_PROPERTY", &[datatype]);

    for (language, label) in proposal.labels.iter() {
        if language == ANCHOR_KEY {
            continue;
        }
        script.push(LAST, &[&format!("L{language}"), &quote(label)]);
    }

    push_descriptions(&mut script, proposal, description_language);

    if let Some(url) = source_url {
        script.push(LAST, &[PROVENANCE_PROPERTY, &quote(url)]);
    }

    for (name, property, shape) in OPTIONAL_FIELDS {
        let Some(value) = proposal.resolved_field(name) else {
            continue;
        };
        match shape {
            FieldShape::Quoted => script.push(LAST, &[property, &quote(&value)]),
            FieldShape::Single => script.push(LAST, &[property, &value]),
            FieldShape::List => {
                for element in list_elements(&value) {
                    script.push(LAST, &[property, element]);
                }
            }
        }
    }

    push_constraints(&mut script, proposal, datatype);

    debug!(lines = script.len(), datatype, "generated creation script");
    CreationOutcome::Script(script)
}

fn push_descriptions(script: &mut CommandScript, proposal: &Proposal, default_language: &str) {
    let Some(description) = proposal.field("description") else {
        return;
    };
    let translations = sole_placeholder(description)
        .and_then(|index| proposal.templates.get(index))
        .and_then(TemplateValue::as_language_map);
    match translations {
        Some(languages) => {
            for (language, text) in languages.iter() {
                if language == ANCHOR_KEY {
                    continue;
                }
                let text = proposal.resolve(text);
                script.push(LAST, &[&format!("D{language}"), &quote(&text)]);
            }
        }
        None => {
            let text = proposal.resolve(description);
            script.push(LAST, &[&format!("D{default_language}"), &quote(&text)]);
        }
    }
}

fn push_constraints(script: &mut CommandScript, proposal: &Proposal, datatype: &str) {
    if datatype == "external-id" {
        let instance_of = proposal
            .resolved_field("implied notability")
            .map(|value| value.trim().to_string())
            .filter(|value| value.starts_with('Q'))
            .unwrap_or_else(|| IDENTIFIER_PROPERTY_CLASS.to_string());
        script.push(LAST, &[INSTANCE_OF, &instance_of]);
        script.push(LAST, &[CONSTRAINT, ALLOWED_ENTITY_TYPES]);
        script.push(LAST, &[CONSTRAINT, ALLOWED_SCOPES]);
    }

    if proposal.field("single value constraint") == Some("yes") {
        script.push(LAST, &[CONSTRAINT, SINGLE_VALUE]);
    }
    if proposal.field("distinct values constraint") == Some("yes") {
        script.push(LAST, &[CONSTRAINT, DISTINCT_VALUES]);
    }
    if let Some(allowed) = proposal.field("allowed values") {
        script.push(
            LAST,
            &[CONSTRAINT, FORMAT_CONSTRAINT, FORMAT_PATTERN, &quote(allowed)],
        );
    }
    if let Some(domain) = proposal.resolved_field("domain")
        && domain.trim_start().starts_with('Q')
    {
        let mut parts = vec![CONSTRAINT, SUBJECT_TYPE];
        for class in list_elements(&domain).filter(|class| class.starts_with('Q')) {
            parts.push(SUBJECT_CLASS);
            parts.push(class);
        }
        parts.push(SUBJECT_RELATION);
        parts.push(INSTANCE_OR_SUBCLASS);
        script.push(LAST, &parts);
    }
}

fn list_elements(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|ch: char| ch.is_whitespace() || ch == ',')
        .filter(|element| !element.is_empty())
}

/// How an example subject is linked to the property it illustrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExampleLink {
    Item,
    Property,
    Lexeme,
    MediaFile,
}

impl ExampleLink {
    fn for_subject(subject: &str) -> Option<Self> {
        if subject.starts_with("commons:") || subject.starts_with("File:") {
            return Some(Self::MediaFile);
        }
        if subject.starts_with('Q') {
            return Some(Self::Item);
        }
        if subject.starts_with('P') {
            return Some(Self::Property);
        }
        if subject.starts_with('L') {
            return Some(Self::Lexeme);
        }
        None
    }

    fn property(self) -> &'static str {
        match self {
            Self::Item => "P1855",
            Self::Property => "P2271",
            Self::Lexeme => "P5192",
            Self::MediaFile => "P6685",
        }
    }

    fn subject_value(self, subject: &str) -> String {
        match self {
            Self::MediaFile => {
                let file = subject
                    .strip_prefix("commons:")
                    .or_else(|| subject.strip_prefix("File:"))
                    .unwrap_or(subject);
                quote(file)
            }
            _ => subject.to_string(),
        }
    }
}

/// Build the script that attaches the proposal's examples to `property_id`.
pub fn examples_script(proposal: &Proposal, property_id: &str) -> CommandScript {
    let datatype = import_datatype(proposal.field("datatype").unwrap_or(""));
    let mut script = CommandScript::new();

    for (name, raw) in proposal.fields.iter() {
        if !name.starts_with("example") {
            continue;
        }
        let value = proposal.resolve(raw);
        let tokens = value.split_whitespace().collect::<Vec<_>>();
        let (Some(subject), Some(object)) = (tokens.first(), tokens.last()) else {
            continue;
        };
        let Some(link) = ExampleLink::for_subject(subject) else {
            warn!(field = name, subject, "skipping example with unrecognized subject");
            continue;
        };
        let object = strip_link_syntax(object);
        if object.is_empty() {
            warn!(field = name, "skipping example without an object");
            continue;
        }

        script.push(
            property_id,
            &[
                link.property(),
                &link.subject_value(subject),
                property_id,
                &format_object(datatype, object),
            ],
        );
    }

    debug!(lines = script.len(), property_id, "generated examples script");
    script
}

/// Drop wiki link brackets around an example object: leading `[` and
/// everything from the first `]`.
fn strip_link_syntax(token: &str) -> &str {
    let head = token.split(']').next().unwrap_or(token);
    head.trim_start_matches('[')
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{
        CommandScript, CreationOutcome, DEFAULT_LANGUAGE, Rejection, creation_script,
        examples_script, strip_link_syntax,
    };
    use crate::markup::Section;
    use crate::proposal::Proposal;

    fn proposal(label: &str, body: &str) -> Proposal {
        Proposal::parse(
            &Section {
                label: label.to_string(),
                body: format!("{{{{Property proposal\n{body}\n}}}}"),
            },
            DEFAULT_LANGUAGE,
        )
        .expect("parse proposal")
    }

    fn create(proposal: &Proposal) -> CommandScript {
        match creation_script(proposal, Some("https://wiki.example/P"), DEFAULT_LANGUAGE) {
            CreationOutcome::Script(script) => script,
            CreationOutcome::Rejected(rejection) => panic!("unexpected rejection: {rejection}"),
        }
    }

    #[test]
    fn status_other_than_ready_is_rejected() {
        let draft = proposal("", "|status=draft\n|datatype=string");
        let outcome = creation_script(&draft, None, DEFAULT_LANGUAGE);
        assert_eq!(outcome, CreationOutcome::Rejected(Rejection::StatusNotReady));
        assert_eq!(
            outcome.render(),
            "PROPOSAL CANNOT BE CREATED: 'status' is not 'ready'"
        );

        let missing = proposal("", "|datatype=string");
        assert_eq!(
            creation_script(&missing, None, DEFAULT_LANGUAGE),
            CreationOutcome::Rejected(Rejection::StatusNotReady)
        );
    }

    #[test]
    fn missing_datatype_is_rejected() {
        let ready = proposal("", "|status=ready\n|datatype=");
        assert_eq!(
            creation_script(&ready, None, DEFAULT_LANGUAGE).render(),
            "PROPOSAL CANNOT BE CREATED: 'datatype' not set"
        );
    }

    #[test]
    fn creation_script_emits_core_lines_in_order() {
        let ready = proposal(
            " {{TranslateThis|anchor=Foo ID|en=Foo ID|fr=identifiant Foo}} ",
            "|status=ready\n|datatype=string\n|description=a test\n|example1=Q1 P31 [[Q2]]",
        );
        let script = create(&ready);
        assert_eq!(
            script.render(),
            [
                "CREATE_PROPERTY\tstring",
                "LAST\tLen\t\"Foo ID\"",
                "LAST\tLfr\t\"identifiant Foo\"",
                "LAST\tDen\t\"a test\"",
                "LAST\tP3254\t\"https://wiki.example/P\"",
            ]
            .join("\n")
        );
    }

    #[test]
    fn translated_description_emits_one_line_per_language() {
        let ready = proposal(
            "",
            "|status=ready\n|datatype=Item\n|description={{TranslateThis|anchor=x|en=a {{Q|5}} thing|de=ein Ding}}",
        );
        let script = create(&ready);
        assert_eq!(script.lines()[0], "CREATE_PROPERTY\twikibase-item");
        assert!(script.lines().contains(&"LAST\tDen\t\"a Q5 thing\"".to_string()));
        assert!(script.lines().contains(&"LAST\tDde\t\"ein Ding\"".to_string()));
        assert!(!script.lines().iter().any(|line| line.contains("Danchor")));
    }

    #[test]
    fn optional_fields_resolve_templates_and_split_lists() {
        let ready = proposal(
            "",
            "|status=ready\n|datatype=string\n|formatter URL=https://foo.org/$1\n|source=https://foo.org\n|subject item={{Q|5}}\n|expected completeness={{Q|21873974}}\n|see also={{P|31}}, {{P|279}}\n|Wikidata project={{Q|4115189}} {{Q|5}}",
        );
        let lines = create(&ready).lines().to_vec();
        let expected = [
            "LAST\tP1630\t\"https://foo.org/$1\"",
            "LAST\tP1896\t\"https://foo.org\"",
            "LAST\tP1629\tQ5",
            "LAST\tP2429\tQ21873974",
            "LAST\tP1659\tP31",
            "LAST\tP1659\tP279",
            "LAST\tP6104\tQ4115189",
            "LAST\tP6104\tQ5",
        ];
        let start = lines
            .iter()
            .position(|line| line.starts_with("LAST\tP1630"))
            .expect("formatter line");
        assert_eq!(&lines[start..start + expected.len()], &expected);
    }

    #[test]
    fn external_identifiers_get_boilerplate_constraints() {
        let ready = proposal("", "|status=ready\n|datatype=External identifier");
        let lines = create(&ready).lines().to_vec();
        assert_eq!(lines[0], "CREATE_PROPERTY\texternal-id");
        let tail = &lines[lines.len() - 3..];
        assert_eq!(
            tail,
            &[
                "LAST\tP31\tQ19847637",
                "LAST\tP2302\tQ52004125\tP2305\tQ29934200",
                "LAST\tP2302\tQ53869507\tP5314\tQ54828448\tP5314\tQ54828450",
            ]
        );
    }

    #[test]
    fn implied_notability_overrides_identifier_class() {
        let ready = proposal(
            "",
            "|status=ready\n|datatype=External identifier\n|implied notability={{Q|62589316}}",
        );
        assert!(create(&ready).lines().contains(&"LAST\tP31\tQ62589316".to_string()));

        let ignored = proposal(
            "",
            "|status=ready\n|datatype=External identifier\n|implied notability=none",
        );
        assert!(create(&ignored).lines().contains(&"LAST\tP31\tQ19847637".to_string()));
    }

    #[test]
    fn constraint_fields_add_constraint_lines() {
        let ready = proposal(
            "",
            "|status=ready\n|datatype=string\n|single value constraint=yes\n|distinct values constraint=no\n|allowed values=[0-9]+\n|domain={{Q|5}}",
        );
        let lines = create(&ready).lines().to_vec();
        assert!(lines.contains(&"LAST\tP2302\tQ19474404".to_string()));
        assert!(!lines.contains(&"LAST\tP2302\tQ21502410".to_string()));
        assert!(lines.contains(&"LAST\tP2302\tQ21502404\tP1793\t\"[0-9]+\"".to_string()));
        assert!(lines.contains(&"LAST\tP2302\tQ21503250\tP2308\tQ5\tP2309\tQ21503252".to_string()));
    }

    #[test]
    fn domain_lists_become_multiple_class_qualifiers() {
        let ready = proposal(
            "",
            "|status=ready\n|datatype=string\n|domain={{Q|5}} {{Q|43229}}",
        );
        assert!(create(&ready).lines().contains(
            &"LAST\tP2302\tQ21503250\tP2308\tQ5\tP2308\tQ43229\tP2309\tQ21503252".to_string()
        ));

        let free_text = proposal("", "|status=ready\n|datatype=string\n|domain=people");
        assert!(
            !create(&free_text)
                .lines()
                .iter()
                .any(|line| line.contains("Q21503250"))
        );
    }

    #[test]
    fn creation_script_has_no_example_lines() {
        let ready = proposal(
            "",
            "|status=ready\n|datatype=string\n|example1=Q1 → \"x\"",
        );
        assert!(
            !create(&ready)
                .lines()
                .iter()
                .any(|line| line.contains("P1855"))
        );
    }

    #[test]
    fn examples_link_by_subject_prefix() {
        let parsed = proposal(
            "",
            "|datatype=string\n|example1=Q1 P31 [[Q2]]\n|example 2={{Q|42}} → abc\n|example3=P31 → def\n|example4=L7-S1 → ghi\n|example5=File:Cat.jpg → jkl\n|example6=commons:Dog.png → mno",
        );
        let script = examples_script(&parsed, "P9999");
        assert_eq!(
            script.lines(),
            &[
                "P9999\tP1855\tQ1\tP9999\t\"Q2\"",
                "P9999\tP1855\tQ42\tP9999\t\"abc\"",
                "P9999\tP2271\tP31\tP9999\t\"def\"",
                "P9999\tP5192\tL7-S1\tP9999\t\"ghi\"",
                "P9999\tP6685\t\"Cat.jpg\"\tP9999\t\"jkl\"",
                "P9999\tP6685\t\"Dog.png\"\tP9999\t\"mno\"",
            ]
        );
    }

    #[test]
    fn examples_with_unrecognized_subjects_are_skipped() {
        let parsed = proposal(
            "",
            "|datatype=time\n|example1=Douglas Adams → 1952-03-11T00:00:00Z/11\n|example2=Q42 → 1952-03-11T00:00:00Z/11",
        );
        let script = examples_script(&parsed, "P123");
        assert_eq!(
            script.lines(),
            &["P123\tP1855\tQ42\tP123\t+1952-03-11T00:00:00Z/11"]
        );
    }

    #[test]
    fn example_objects_follow_mapped_datatype() {
        let parsed = proposal(
            "",
            "|datatype=External identifier\n|example1=Q42 → 0001\n|datatype2=ignored",
        );
        assert_eq!(
            examples_script(&parsed, "P1").lines(),
            &["P1\tP1855\tQ42\tP1\t\"0001\""]
        );

        let coordinates = proposal("", "|datatype=globe-coordinate\n|example1=Q90 → 48.85/2.35");
        assert_eq!(
            examples_script(&coordinates, "P2").lines(),
            &["P2\tP1855\tQ90\tP2\t@48.85/2.35"]
        );
    }

    #[test]
    fn link_syntax_is_stripped_from_objects() {
        assert_eq!(strip_link_syntax("[[Q2]]"), "Q2");
        assert_eq!(strip_link_syntax("Q2]]"), "Q2");
        assert_eq!(strip_link_syntax("abc"), "abc");
        assert_eq!(strip_link_syntax("https://x.org/a]"), "https://x.org/a");
    }

    #[test]
    fn generation_is_deterministic() {
        let ready = proposal(
            "Foo",
            "|status=ready\n|datatype=External identifier\n|description=d\n|single value constraint=yes\n|example1=Q1 → a",
        );
        assert_eq!(create(&ready), create(&ready));
        assert_eq!(examples_script(&ready, "P5"), examples_script(&ready, "P5"));
    }
}
