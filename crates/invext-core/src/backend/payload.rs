//! Recovering a JSON value from model output.

use serde_json::Value;

use crate::error::BackendError;

/// Parse JSON from a model reply.
///
/// Tries, in order: the whole reply, the body of a fenced code block, and the
/// span from the first `[`/`{` to the last matching closer.
pub fn parse_json_payload(content: &str) -> Result<Value, BackendError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(BackendError::MalformedResponse("empty reply".to_string()));
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let candidates = [fenced_block(trimmed), bracketed_span(trimmed)];
    if let Some(value) = candidates
        .into_iter()
        .flatten()
        .find_map(|candidate| serde_json::from_str(candidate).ok())
    {
        return Ok(value);
    }

    Err(BackendError::MalformedResponse(format!(
        "reply is not JSON: {}",
        preview(trimmed)
    )))
}

/// Contents of the first ``` fence, minus an optional language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    let body_start = rest.find('\n').map(|i| i + 1).unwrap_or(0);
    let rest = &rest[body_start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// From the first opening bracket to the last closing bracket of the same kind.
fn bracketed_span(text: &str) -> Option<&str> {
    let open = text.find(['[', '{'])?;
    let close_char = if text[open..].starts_with('[') { ']' } else { '}' };
    let close = text.rfind(close_char)?;
    (close > open).then(|| &text[open..=close])
}

fn preview(text: &str) -> String {
    const MAX: usize = 80;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(MAX).collect::<String>())
    }
}
