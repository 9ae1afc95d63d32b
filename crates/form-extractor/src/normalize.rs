//! PDF field name cleanup.
//!
//! A raw name tail looks like `12 Owner Name_2`: a leading ordinal token,
//! the semantic name, and an optional `_<digits>` disambiguator. The ordinal
//! is dropped, the suffix is kept verbatim in the name and rendered as
//! ` (2)` in the label.

/// Split a raw PDF name tail into a stable name and a human-readable label.
///
/// Inputs with fewer than two whitespace-separated tokens are returned
/// unchanged as both name and label, since there is no ordinal to strip.
pub fn normalize(raw: &str) -> (String, String) {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    if parts.len() < 2 {
        return (raw.to_string(), raw.to_string());
    }

    let joined = parts[1..].join(" ");
    let mut base = joined.trim();

    let mut suffix: Option<&str> = None;
    if let Some(idx) = base.rfind('_') {
        if is_ascii_number(&base[idx + 1..]) {
            suffix = Some(&base[idx..]);
            base = base[..idx].trim_end();
        }
    }

    let base = base.trim().trim_matches('"').trim_end_matches('}');

    match suffix {
        Some(suffix) => {
            let name = format!("{base}{suffix}");
            let label = format!("{base} ({})", &suffix[1..]);
            (name, label)
        }
        None => (base.to_string(), base.to_string()),
    }
}

fn is_ascii_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
