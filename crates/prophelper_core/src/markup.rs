use serde::Serialize;

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";
const PROPOSAL_MARKER: &str = "property proposal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Heading text preceding the proposal body.
    pub label: String,
    pub body: String,
}

/// Remove `<!-- ... -->` comments. An unclosed comment is kept verbatim.
pub fn strip_comments(content: &str) -> String {
    let mut output = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find(COMMENT_OPEN) {
        let after_open = &rest[start + COMMENT_OPEN.len()..];
        let Some(end) = after_open.find(COMMENT_CLOSE) else {
            break;
        };
        output.push_str(&rest[..start]);
        rest = &after_open[end + COMMENT_CLOSE.len()..];
    }
    output.push_str(rest);
    output
}

/// Split `content` on runs of two or more `=` and keep the parts that hold a
/// property proposal template, each paired with the part before it.
pub fn split_sections(content: &str) -> Vec<Section> {
    let parts = split_on_heading_runs(content);
    parts
        .iter()
        .enumerate()
        .filter(|(_, part)| is_proposal(part))
        .map(|(index, part)| Section {
            label: index
                .checked_sub(1)
                .and_then(|previous| parts.get(previous))
                .map(|label| label.to_string())
                .unwrap_or_default(),
            body: part.trim().to_string(),
        })
        .collect()
}

fn split_on_heading_runs(content: &str) -> Vec<&str> {
    let bytes = content.as_bytes();
    let mut parts = Vec::new();
    let mut part_start = 0usize;
    let mut cursor = 0usize;
    while cursor < bytes.len() {
        if bytes[cursor] != b'=' {
            cursor += 1;
            continue;
        }
        let run = bytes[cursor..].iter().take_while(|byte| **byte == b'=').count();
        if run >= 2 {
            parts.push(&content[part_start..cursor]);
            part_start = cursor + run;
        }
        cursor += run;
    }
    parts.push(&content[part_start..]);
    parts
}

fn is_proposal(part: &str) -> bool {
    let mut rest = part;
    while let Some(open) = rest.find("{{") {
        let after = rest[open + 2..].trim_start();
        if after
            .get(..PROPOSAL_MARKER.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(PROPOSAL_MARKER))
        {
            return true;
        }
        rest = &rest[open + 2..];
    }
    false
}
