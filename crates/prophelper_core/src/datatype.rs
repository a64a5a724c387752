/// Map a proposal's `datatype` field onto the import datatype name.
/// Unlisted values pass through unchanged.
pub fn import_datatype(proposal_datatype: &str) -> &str {
    match proposal_datatype {
        "External identifier" => "external-id",
        "Item" | "item" => "wikibase-item",
        "URL" => "url",
        "media" => "commonsMedia",
        "monolingual text" => "monolingualtext",
        "property" => "wikibase-property",
        "tabular" => "tabular-data",
        "mathematical expression" => "math",
        "lexeme" => "wikibase-lexeme",
        "sense" => "wikibase-sense",
        "form" => "wikibase-form",
        other => other,
    }
}

/// Render an example object as an import value for an import datatype.
pub fn format_object(import_datatype: &str, value: &str) -> String {
    match import_datatype {
        "external-id" | "string" | "commonsMedia" | "url" | "math" | "musical-notation" => {
            quote(value)
        }
        "time" => format!("+{value}"),
        "globe-coordinate" => format!("@{value}"),
        _ => value.to_string(),
    }
}

pub fn quote(value: &str) -> String {
    format!("\"{value}\"")
}
