// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Tokenizer for Gateway parameter strings: `;`-separated fields where a
//! literal `;` lives inside `"..."` with standard backslash escapes.

/// Split a parameter string on `;`, honoring quoting. Quotes are stripped
/// and `\"`, `\\`, `\n`, `\t` unescaped.
#[must_use]
pub fn split_fields(params: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = params.chars();
    let mut in_quotes = false;
    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => match chars.next() {
                Some('n') => current.push('\n'),
                Some('t') => current.push('\t'),
                Some(other) => current.push(other),
                None => {}
            },
            ';' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    if !current.is_empty() || !fields.is_empty() || !params.is_empty() {
        fields.push(current);
    }
    fields
}

/// Parse one `KEY=VALUE` field; keys compare case-insensitively upstream.
#[must_use]
pub fn split_key_value(field: &str) -> Option<(&str, &str)> {
    field.split_once('=').map(|(k, v)| (k.trim(), v.trim()))
}

/// Parse a coordinate that may be absolute (`12`) or cursor-relative
/// (`+3` / `-2`), clamped at zero.
#[must_use]
pub fn parse_coord(text: &str, current: usize) -> Option<usize> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix('+') {
        let delta: usize = rest.parse().ok()?;
        return Some(current + delta);
    }
    if let Some(rest) = text.strip_prefix('-') {
        let delta: usize = rest.parse().ok()?;
        return Some(current.saturating_sub(delta));
    }
    text.parse().ok()
}

/// Parse a possibly-negative span; negative mirrors around the origin the
/// way `x=20,w=-5` selects columns 15..=19.
#[must_use]
pub fn parse_span(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_fields() {
        assert_eq!(split_fields("a;b;c"), vec!["a", "b", "c"]);
        assert_eq!(split_fields(""), Vec::<String>::new());
        assert_eq!(split_fields("a;;c"), vec!["a", "", "c"]);
    }

    #[test]
    fn quoted_semicolons_stay_literal() {
        assert_eq!(split_fields(r#"TEXT="a;b";next"#), vec!["TEXT=a;b", "next"]);
    }

    #[test]
    fn backslash_escapes() {
        assert_eq!(split_fields(r#""say \"hi\"""#), vec![r#"say "hi""#]);
        assert_eq!(split_fields(r#""line\nbreak""#), vec!["line\nbreak"]);
    }

    #[test]
    fn coords_absolute_and_relative() {
        assert_eq!(parse_coord("12", 5), Some(12));
        assert_eq!(parse_coord("+5", 10), Some(15));
        assert_eq!(parse_coord("-2", 10), Some(8));
        assert_eq!(parse_coord("-20", 10), Some(0));
        assert_eq!(parse_coord("x", 0), None);
    }
}
