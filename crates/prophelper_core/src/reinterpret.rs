use tracing::debug;

use crate::fields::{FieldMap, add_field};
use crate::template::{TemplateTable, TemplateValue};

/// Rewrite every raw slot of `table` according to its leading tag.
///
/// Already reinterpreted slots are left untouched.
pub fn reinterpret_templates(table: &mut TemplateTable) {
    let rewritten = table
        .iter()
        .filter_map(|(index, value)| match value {
            TemplateValue::Raw(body) => Some((index, reinterpret(body))),
            _ => None,
        })
        .collect::<Vec<_>>();
    for (index, value) in rewritten {
        debug!(index, ?value, "reinterpreted template");
        table.set(index, value);
    }
}

/// Normalized value of one template body.
pub fn reinterpret(body: &str) -> TemplateValue {
    let parts = body.split('|').collect::<Vec<_>>();
    let tag = parts.first().map(|part| part.trim()).unwrap_or("");
    let normalized = match tag {
        "P" | "Pfr" => entity_reference('P', &parts),
        "Q" | "Q'" | "Qfr" => entity_reference('Q', &parts),
        "Statement" | "statement" | "claim" => statement_summary(&parts),
        "TranslateThis" => Some(TemplateValue::LanguageMap(language_map(&parts))),
        _ => None,
    };
    normalized.unwrap_or_else(|| TemplateValue::Text(body.to_string()))
}

fn entity_reference(prefix: char, parts: &[&str]) -> Option<TemplateValue> {
    let id = parts.get(1)?.trim().replace(prefix, "");
    Some(TemplateValue::Text(format!("{prefix}{id}")))
}

fn statement_summary(parts: &[&str]) -> Option<TemplateValue> {
    let subject = parts.get(1)?.trim();
    let object = parts.get(3)?.trim();
    Some(TemplateValue::Text(format!("{subject} - {object}")))
}

fn language_map(parts: &[&str]) -> FieldMap {
    let mut languages = FieldMap::new();
    for part in parts {
        add_field(part, &mut languages);
    }
    languages
}

#[cfg(test)]
mod tests {
    use super::{reinterpret, reinterpret_templates};
    use crate::template::{TemplateTable, TemplateValue};

    fn text(value: &str) -> TemplateValue {
        TemplateValue::Text(value.to_string())
    }

    #[test]
    fn property_and_item_tags_normalize_ids() {
        assert_eq!(reinterpret("P|31"), text("P31"));
        assert_eq!(reinterpret("Pfr|P279"), text("P279"));
        assert_eq!(reinterpret("Q|5"), text("Q5"));
        assert_eq!(reinterpret("Q'|Q42"), text("Q42"));
        assert_eq!(reinterpret(" Qfr | 146 |fr"), text("Q146"));
    }

    #[test]
    fn statement_tags_summarize_subject_and_object() {
        assert_eq!(reinterpret("Statement|Q1|P31|Q2"), text("Q1 - Q2"));
        assert_eq!(reinterpret("claim| Q1 |P31| Q2 "), text("Q1 - Q2"));
        assert_eq!(reinterpret("statement|Q1|P31"), text("statement|Q1|P31"));
    }

    #[test]
    fn translate_this_builds_language_map() {
        let value = reinterpret("TranslateThis\n| anchor = Foo\n| en = foo id\n| de = Foo-ID\n");
        let languages = value.as_language_map().expect("language map");
        assert_eq!(languages.get("anchor"), Some("Foo"));
        assert_eq!(languages.get("en"), Some("foo id"));
        assert_eq!(languages.get("de"), Some("Foo-ID"));
        assert_eq!(languages.len(), 3);
    }

    #[test]
    fn unknown_tags_pass_through() {
        assert_eq!(reinterpret("Support"), text("Support"));
        assert_eq!(reinterpret("p|31"), text("p|31"));
        assert_eq!(reinterpret("P"), text("P"));
    }

    #[test]
    fn table_rewrite_is_idempotent() {
        let mut table = TemplateTable::new();
        table.push_raw("Q|5");
        table.push_raw("Statement|%%1%%|P31|Q2");
        reinterpret_templates(&mut table);
        let once = table.clone();
        reinterpret_templates(&mut table);
        assert_eq!(table, once);
        assert_eq!(table.get(1), Some(&text("Q5")));
        assert_eq!(table.get(2), Some(&text("%%1%% - Q2")));
    }
}
