//! DNS presentation-name transforms: label counting, reversal, and chomp.
//!
//! All functions honor `\.` as a literal dot inside a label rather than a
//! label separator.

/// Per-name label statistics computed in one pass (§4.5 `countoff`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountOff {
    pub labels: usize,
    pub total_chars: usize,
    pub alnum_chars: usize,
    pub label_lens: Vec<usize>,
}

/// Splits `name` into labels on unescaped dots, reporting whether the name
/// ended with an unescaped trailing dot. The root name `.` yields zero
/// labels with `trailing_dot = true`.
fn split_labels(name: &str) -> (Vec<String>, bool) {
    let (body, trailing_dot) = strip_trailing_unescaped_dot(name);
    if body.is_empty() {
        return (Vec::new(), trailing_dot);
    }

    let mut labels = Vec::new();
    let mut cur = String::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            cur.push(c);
            if let Some(&next) = chars.peek() {
                cur.push(next);
                chars.next();
            }
        } else if c == '.' {
            labels.push(std::mem::take(&mut cur));
        } else {
            cur.push(c);
        }
    }
    labels.push(cur);
    (labels, trailing_dot)
}

fn strip_trailing_unescaped_dot(name: &str) -> (&str, bool) {
    let Some(body) = name.strip_suffix('.') else {
        return (name, false);
    };
    // Count backslashes immediately preceding the dot we just stripped; an
    // odd count means the dot was escaped (literal), so it is not a separator.
    let backslashes = body.chars().rev().take_while(|&c| c == '\\').count();
    if backslashes % 2 == 1 {
        (name, false)
    } else {
        (body, true)
    }
}

/// Computes label count, total/alphanumeric character counts, and per-label
/// lengths over the raw presentation form (escape sequences counted as
/// written, dots not counted).
#[must_use]
pub fn countoff(name: &str) -> CountOff {
    let (labels, _trailing_dot) = split_labels(name);
    let label_lens: Vec<usize> = labels.iter().map(|l| l.chars().count()).collect();
    let total_chars: usize = label_lens.iter().sum();
    let alnum_chars = labels
        .iter()
        .flat_map(|l| l.chars())
        .filter(|c| c.is_ascii_alphanumeric())
        .count();
    CountOff {
        labels: labels.len(),
        total_chars,
        alnum_chars,
        label_lens,
    }
}

/// Reorders labels TLD-first, re-delimited by dots. A trailing dot in the
/// input becomes a leading dot in the output, marking that it was present.
#[must_use]
pub fn reverse_name(name: &str) -> String {
    let (mut labels, trailing_dot) = split_labels(name);
    labels.reverse();
    let joined = labels.join(".");
    if trailing_dot {
        format!(".{joined}")
    } else {
        joined
    }
}

/// Removes a single unescaped trailing dot (forward mode) or the leading dot
/// artifact inserted by [`reverse_name`] (`reverse_mode = true`).
///
/// The root name `.` chomps to a zero-length string in both modes — this is
/// a deliberate, preserved edge case (see `SPEC_FULL.md` Open Questions).
#[must_use]
pub fn chomp(name: &str, reverse_mode: bool) -> String {
    if reverse_mode {
        name.strip_prefix('.').unwrap_or(name).to_string()
    } else {
        let (body, trailing_dot) = strip_trailing_unescaped_dot(name);
        if trailing_dot {
            body.to_string()
        } else {
            name.to_string()
        }
    }
}
