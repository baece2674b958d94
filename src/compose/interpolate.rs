// Variable substitution for compose files
// Supports $VAR, ${VAR}, ${VAR:-default}, ${VAR-default}, ${VAR:?message}, ${VAR?message} and $$

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"\$(?:(?P<escaped>\$)|\{(?P<braced>[A-Za-z_][A-Za-z0-9_]*)(?:(?P<op>:?[-?])(?P<arg>[^}]*))?\}|(?P<named>[A-Za-z_][A-Za-z0-9_]*))",
            )
            .ok()
        })
        .as_ref()
}

/// Variable names referenced by `input`, in order of appearance. `$$` escapes are skipped.
pub fn referenced_names(input: &str) -> Vec<String> {
    let Some(pattern) = pattern() else {
        return Vec::new();
    };
    if !input.contains('$') {
        return Vec::new();
    }

    pattern
        .captures_iter(input)
        .filter_map(|caps| caps.name("braced").or_else(|| caps.name("named")))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Substitute variables in `input` using `vars`.
/// Returns the message of the first failing `?` expression as the error.
pub fn interpolate(input: &str, vars: &HashMap<String, String>) -> Result<String, String> {
    if !input.contains('$') {
        return Ok(input.to_string());
    }

    let pattern = pattern().ok_or_else(|| "interpolation pattern failed to compile".to_string())?;
    let mut output = String::with_capacity(input.len());
    let mut last = 0;

    for caps in pattern.captures_iter(input) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        output.push_str(&input[last..whole.start()]);
        last = whole.end();

        if caps.name("escaped").is_some() {
            output.push('$');
            continue;
        }

        if let Some(name) = caps.name("named") {
            output.push_str(vars.get(name.as_str()).map(String::as_str).unwrap_or(""));
            continue;
        }

        let Some(name) = caps.name("braced").map(|m| m.as_str()) else {
            continue;
        };
        let value = vars.get(name);
        let op = caps.name("op").map(|m| m.as_str());
        let arg = caps.name("arg").map(|m| m.as_str()).unwrap_or("");

        // The ":" forms also treat an empty value as unset
        let missing = |colon: bool| match value {
            None => true,
            Some(v) => colon && v.is_empty(),
        };

        match op {
            None => output.push_str(value.map(String::as_str).unwrap_or("")),
            Some(op) if op.ends_with('-') => {
                if missing(op.starts_with(':')) {
                    output.push_str(arg);
                } else {
                    output.push_str(value.map(String::as_str).unwrap_or(""));
                }
            }
            Some(op) => {
                if missing(op.starts_with(':')) {
                    let message = if arg.is_empty() {
                        format!("required variable {} is missing a value", name)
                    } else {
                        format!("required variable {} is missing a value: {}", name, arg)
                    };
                    return Err(message);
                }
                output.push_str(value.map(String::as_str).unwrap_or(""));
            }
        }
    }

    output.push_str(&input[last..]);
    Ok(output)
}
