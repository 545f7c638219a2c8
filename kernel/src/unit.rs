//! Phonetic units and context-dependent transition validity.
//!
//! A unit (phone) carries the left and right context it was compiled
//! with. When successor filtering is enabled the decoder only lets a path
//! move from one unit into the next if the two contexts chain: the
//! previous unit's right context must start with the next unit, and the
//! next unit's left context must start with the previous unit.

/// A context-dependent phonetic unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitV1 {
    /// Base phone name (e.g. `"AX"`).
    pub name: String,
    /// Left context, nearest phone first.
    pub left_context: Vec<String>,
    /// Right context, nearest phone first. `None` means the right context
    /// is open and right-context checks are skipped.
    pub right_context: Option<Vec<String>>,
}

impl UnitV1 {
    /// A context-independent unit with an empty left and open right context.
    #[must_use]
    pub fn context_independent(name: &str) -> Self {
        Self {
            name: name.to_string(),
            left_context: Vec::new(),
            right_context: None,
        }
    }

    /// A unit with explicit left and right contexts.
    #[must_use]
    pub fn with_context(name: &str, left: &[&str], right: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            left_context: to_owned_context(left),
            right_context: Some(to_owned_context(right)),
        }
    }

    /// A unit with an explicit left context and an open right context.
    #[must_use]
    pub fn with_open_right(name: &str, left: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            left_context: to_owned_context(left),
            right_context: None,
        }
    }
}

fn to_owned_context(context: &[&str]) -> Vec<String> {
    context.iter().map(|s| (*s).to_string()).collect()
}

/// Check whether a path whose most recent unit is `prev` may enter `next`.
///
/// `prev` is `None` when no unit has been seen on the path yet; in that
/// case only a unit with an empty left context is reachable.
#[must_use]
pub fn is_valid_transition(prev: Option<&UnitV1>, next: &UnitV1) -> bool {
    let this_lc = &next.left_context;
    let this_rc = next.right_context.as_deref();

    let Some(prev) = prev else {
        return this_lc.is_empty();
    };
    let prev_lc = &prev.left_context;
    let prev_rc = prev.right_context.as_deref();

    if let Some(prev_rc) = prev_rc {
        if prev_rc.is_empty() || this_lc.is_empty() {
            return false;
        }
        if let Some(this_rc) = this_rc {
            if prev_rc.len() > this_rc.len() + 1 {
                return false;
            }
        }
    }

    if this_lc.len() > prev_lc.len() + 1 {
        return false;
    }

    if let Some(prev_rc) = prev_rc {
        if prev_rc[0] != next.name {
            return false;
        }
        if let Some(this_rc) = this_rc {
            if prev_rc[1..].iter().zip(this_rc).any(|(a, b)| a != b) {
                return false;
            }
        }
    }

    match this_lc.first() {
        Some(head) if *head == prev.name => {}
        _ => return false,
    }
    this_lc[1..]
        .iter()
        .zip(prev_lc.iter())
        .all(|(a, b)| a == b)
}
