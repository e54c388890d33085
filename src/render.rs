//! Terminal rendering of query snapshots.
//!
//! Answer text is untrusted markup. It is never passed through as markup:
//! tags are stripped, block-level tags become line breaks, `<script>` and
//! `<style>` bodies are dropped, and character entities are decoded.

use crate::coordinator::{QueryState, QueryStatus};

const DROPPED_ELEMENTS: [&str; 2] = ["script", "style"];
const BLOCK_ELEMENTS: [&str; 13] = [
    "p", "br", "div", "ul", "ol", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote",
];

/// Convert answer markup to plain text safe to print
pub fn markup_to_text(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;

    while let Some(start) = rest.find('<') {
        out.push_str(&decode_entities(&rest[..start]));
        let after = &rest[start + 1..];

        let Some(end) = after.find('>') else {
            // Unterminated `<` is literal text.
            out.push_str(&decode_entities(&rest[start..]));
            rest = "";
            break;
        };

        let tag = &after[..end];
        rest = &after[end + 1..];

        let name = tag_name(tag);
        let closing = tag.starts_with('/');

        if !closing && DROPPED_ELEMENTS.contains(&name.as_str()) {
            let close = format!("</{name}");
            rest = match find_ascii_case_insensitive(rest, &close) {
                Some(pos) => match rest[pos..].find('>') {
                    Some(gt) => &rest[pos + gt + 1..],
                    None => "",
                },
                None => "",
            };
            continue;
        }

        if name == "li" {
            if !closing {
                out.push_str("\n- ");
            }
        } else if BLOCK_ELEMENTS.contains(&name.as_str()) {
            out.push('\n');
        }
    }
    out.push_str(&decode_entities(rest));

    tidy_lines(&strip_controls(&out))
}

/// Drop terminal control characters, decoded entities included; keeps `\n` and `\t`
pub fn strip_controls(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect()
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        match candidate.find(';').filter(|&semi| semi <= 10) {
            Some(semi) => match decode_entity(&candidate[1..semi]) {
                Some(ch) => {
                    out.push(ch);
                    rest = &candidate[semi + 1..];
                }
                None => {
                    out.push('&');
                    rest = &candidate[1..];
                }
            },
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let numeric = entity.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Trim each line and collapse runs of blank lines to one
fn tidy_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Render a snapshot for the terminal
pub fn render_state(state: &QueryState) -> String {
    let query = strip_controls(state.query().unwrap_or_default());
    match state.status() {
        QueryStatus::Idle => "Ask anything.".to_string(),
        QueryStatus::Pending => format!("Query: {query}\nWaiting for the answer..."),
        QueryStatus::Failed => format!(
            "Query: {query}\nError: {}",
            strip_controls(state.error_detail().unwrap_or("unknown error"))
        ),
        QueryStatus::Succeeded => {
            let Some(answer) = state.result() else {
                return format!("Query: {query}");
            };
            let mut out = format!(
                "Query: {query}\n\n{}\n\n{}\n\n{}",
                markup_to_text(&answer.title),
                markup_to_text(&answer.short_response),
                markup_to_text(&answer.long_response)
            );
            if answer.internet_search {
                out.push_str("\n\n(answer used a web search)");
            }
            out
        }
    }
}
