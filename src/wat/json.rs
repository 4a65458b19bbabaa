//! Lenient JSON handling for WAT metadata

use serde_json::Value;
use std::borrow::Cow;

/// Remove commas that directly precede a closing `}` or `]`.
///
/// Commas inside string literals are left alone.
pub fn strip_trailing_commas(input: &str) -> Cow<'_, str> {
    if !input.contains(',') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut changed = false;

    for (idx, c) in input.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = input[idx + 1..].chars().find(|c| !c.is_whitespace());
                if matches!(next, Some('}') | Some(']')) {
                    changed = true;
                } else {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(input)
    }
}

/// Parse a JSON document, tolerating trailing commas
pub fn parse_lenient(text: &str) -> Option<Value> {
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(_) => serde_json::from_str(&strip_trailing_commas(text)).ok(),
    }
}

/// Move the array found at `pointer` out of `root`.
///
/// A missing hop or a non-array value gives an empty list.
pub fn take_array(root: &mut Value, pointer: &str) -> Vec<Value> {
    match root.pointer_mut(pointer).map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}
