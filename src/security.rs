use crate::errors::InvalidParamsError;
use anyhow::Result;

/// Escape a value for a Drive query string literal.
///
/// - Rejects control characters (including newlines), which Drive cannot match
///   in a name and which would make the query ambiguous.
/// - Escapes `\` and `'` with a backslash, per the Drive query grammar.
/// - Returns the fully-quoted literal (including surrounding `'`).
pub fn drive_string_literal(tool: &'static str, field: &'static str, value: &str) -> Result<String> {
    if value.chars().any(|c| c.is_control()) {
        return Err(InvalidParamsError::new(
            tool,
            format!("{field} must not contain control characters"),
        )
        .with_path(field)
        .into());
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\\' || ch == '\'' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('\'');
    Ok(out)
}

/// Require a non-blank string argument, returning it trimmed.
pub fn require_non_empty<'a>(
    tool: &'static str,
    field: &'static str,
    value: &'a str,
) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InvalidParamsError::new(tool, format!("{field} must not be empty"))
            .with_path(field)
            .into());
    }
    Ok(trimmed)
}

/// Require a non-empty search term. Whitespace is part of the term and is
/// kept as given.
pub fn require_term<'a>(
    tool: &'static str,
    field: &'static str,
    value: &'a str,
) -> Result<&'a str> {
    if value.is_empty() {
        return Err(InvalidParamsError::new(tool, format!("{field} must not be empty"))
            .with_path(field)
            .into());
    }
    Ok(value)
}
