//! Small string helpers shared by the endpoint and property parsers.

/// Split `input` into tokens separated by characters matching `is_separator`.
///
/// Single or double quotes group characters (separators included) into one
/// token; the quotes themselves are dropped. A backslash escapes the next
/// character inside double quotes. Empty tokens are skipped unless they were
/// quoted.
pub(crate) fn split_quoted(
    input: &str,
    is_separator: impl Fn(char) -> bool,
) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted_token = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some('"') if c == '\\' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err("dangling escape character".to_string()),
            },
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                quoted_token = true;
            }
            None if is_separator(c) => {
                if !current.is_empty() || quoted_token {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted_token = false;
            }
            None => current.push(c),
        }
    }

    if let Some(q) = quote {
        return Err(format!("unmatched {} quote", q));
    }
    if !current.is_empty() || quoted_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Quote `value` with double quotes when it would not survive
/// [`split_quoted`] on whitespace as a single token.
pub(crate) fn quote_if_needed(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\'' || c == '\\')
        || value.starts_with('-');
    if !needs_quotes {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
