//! Consistency checking of one field between a reference and a target file.

use std::fmt;

use crate::provider::{Role, TagValue};
use crate::value::{truncate, Location, Value};

/// Outcome of checking one field of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    /// The target carries this many values, all correctly tagged.
    Present(usize),
    OptionalAbsent,
    ExpectedAbsent,
    /// A preferred tag lacks the value, or a deprecated tag still carries it.
    IncorrectlyTagged,
    /// Some tag disagrees with the reference value.
    ConflictingValues,
}

impl CheckResult {
    pub fn is_error(self) -> bool {
        matches!(self, CheckResult::IncorrectlyTagged | CheckResult::ConflictingValues)
    }

    /// Two-character grid cell. Counts are shown only for multi-valued
    /// fields.
    pub fn label(self, multi: bool) -> String {
        match self {
            CheckResult::Present(n) if multi => format!("{n:>2}"),
            CheckResult::Present(_) => "ok".to_string(),
            CheckResult::OptionalAbsent => "  ".to_string(),
            CheckResult::ExpectedAbsent => "--".to_string(),
            CheckResult::IncorrectlyTagged => "??".to_string(),
            CheckResult::ConflictingValues => "!=".to_string(),
        }
    }

    /// The worse of two results; a conflict outranks a tagging error.
    pub fn worst(self, other: CheckResult) -> CheckResult {
        use CheckResult::*;
        match (self, other) {
            (ConflictingValues, _) | (_, ConflictingValues) => ConflictingValues,
            (IncorrectlyTagged, _) | (_, IncorrectlyTagged) => IncorrectlyTagged,
            (a, _) => a,
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label(true))
    }
}

/// Per-tag view of a target's rows: the role and the non-empty values.
struct TagGroup<'a> {
    role: Role,
    values: Vec<&'a TagValue>,
}

/// Group rows by tag label, keeping first-seen order. Language variants
/// (`tag[lang]`) and informational rows are not checked.
fn group(rows: &[TagValue]) -> Vec<(&str, TagGroup<'_>)> {
    let mut groups: Vec<(&str, TagGroup)> = Vec::new();
    for row in rows {
        if row.role == Role::Info || row.label.ends_with(']') {
            continue;
        }
        let idx = match groups.iter().position(|(l, _)| *l == row.label) {
            Some(i) => i,
            None => {
                groups.push((&row.label, TagGroup { role: row.role, values: Vec::new() }));
                groups.len() - 1
            }
        };
        if !row.value.is_empty() {
            groups[idx].1.values.push(row);
        }
    }
    groups
}

/// Check the tag rows of a target against the reference values.
///
/// `reference` holds the reconciled values and `flat` their flattened
/// forms, which is what `Role::Flat` rows are compared with. `equal` sees
/// the reference value, the tag value and the tag's byte cap.
pub fn check_rows(
    reference: &[Value],
    flat: &[Value],
    rows: &[TagValue],
    equal: impl Fn(&Value, &Value, usize) -> bool,
) -> Option<CheckResult> {
    let mut result: Option<CheckResult> = None;
    let mut note = |r: CheckResult| result = Some(result.map_or(r, |prev| prev.worst(r)));
    for (label, g) in group(rows) {
        let expect = if g.role == Role::Flat { flat } else { reference };
        match g.role {
            Role::Preferred | Role::Flat => {
                if g.values.is_empty() {
                    if !expect.is_empty() {
                        log::debug!("{label}: missing value");
                        note(CheckResult::IncorrectlyTagged);
                    }
                    continue;
                }
                if !g.values.iter().all(|t| expect.iter().any(|r| equal(r, &t.value, t.cap))) {
                    log::debug!("{label}: value differs from reference");
                    note(CheckResult::ConflictingValues);
                } else if !expect.iter().all(|r| g.values.iter().any(|t| equal(r, &t.value, t.cap))) {
                    log::debug!("{label}: some values missing");
                    note(CheckResult::IncorrectlyTagged);
                }
            }
            Role::Deprecated => {
                if g.values.is_empty() {
                    continue;
                }
                if g.values.iter().all(|t| expect.iter().any(|r| equal(r, &t.value, t.cap))) {
                    log::debug!("{label}: deprecated tag still set");
                    note(CheckResult::IncorrectlyTagged);
                } else {
                    note(CheckResult::ConflictingValues);
                }
            }
            Role::Info => {}
        }
    }
    result
}

/// Text equality allowing the tag to hold a cap-length truncation.
pub fn text_equal(r: &Value, t: &Value, cap: usize) -> bool {
    match (r, t) {
        (Value::Text(r), Value::Text(t)) => r == t || (cap != 0 && truncate(r, cap) == t),
        _ => false,
    }
}

/// Location equality allowing each component to be an IPTC-length
/// truncation of the reference.
pub fn location_equal(r: &Location, t: &Location) -> bool {
    let part = |r: &str, t: &str, cap: usize| r == t || truncate(r, cap) == t;
    part(&r.country_code, &t.country_code, 3)
        && part(&r.country_name, &t.country_name, 64)
        && part(&r.state, &t.state, 32)
        && part(&r.city, &t.city, 32)
        && part(&r.sublocation, &t.sublocation, 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(label: &str, v: &str, role: Role) -> TagValue {
        TagValue::new(label, Value::Text(v.to_string()), role)
    }

    fn reference(v: &str) -> Vec<Value> {
        vec![Value::Text(v.to_string())]
    }

    #[test]
    fn labels() {
        assert_eq!(CheckResult::Present(1).label(false), "ok");
        assert_eq!(CheckResult::Present(3).label(true), " 3");
        assert_eq!(CheckResult::ExpectedAbsent.label(false), "--");
        assert_eq!(CheckResult::IncorrectlyTagged.label(false), "??");
        assert_eq!(CheckResult::ConflictingValues.label(false), "!=");
        assert_eq!(CheckResult::OptionalAbsent.label(false), "  ");
    }

    #[test]
    fn missing_preferred_is_incorrect() {
        let rows = vec![text("A", "x", Role::Preferred), text("B", "", Role::Preferred)];
        let r = check_rows(&reference("x"), &[], &rows, text_equal);
        assert_eq!(r, Some(CheckResult::IncorrectlyTagged));
    }

    #[test]
    fn conflict_beats_incorrect() {
        let rows = vec![
            text("A", "", Role::Preferred),
            text("B", "y", Role::Preferred),
        ];
        let r = check_rows(&reference("x"), &[], &rows, text_equal);
        assert_eq!(r, Some(CheckResult::ConflictingValues));
    }

    #[test]
    fn deprecated_tags() {
        let same = vec![text("A", "x", Role::Preferred), text("D", "x", Role::Deprecated)];
        assert_eq!(check_rows(&reference("x"), &[], &same, text_equal), Some(CheckResult::IncorrectlyTagged));
        let other = vec![text("A", "x", Role::Preferred), text("D", "z", Role::Deprecated)];
        assert_eq!(check_rows(&reference("x"), &[], &other, text_equal), Some(CheckResult::ConflictingValues));
    }

    #[test]
    fn truncated_tags_match() {
        let rows = vec![text("IPTC ObjectName", "Stephen", Role::Preferred).capped(7)];
        assert_eq!(check_rows(&reference("Stephen Hawking"), &[], &rows, text_equal), None);
    }

    #[test]
    fn language_variants_and_info_are_ignored() {
        let rows = vec![
            text("XMP  dc:title", "x", Role::Preferred),
            text("XMP  dc:title[fr]", "le x", Role::Preferred),
            text("Video", "zzz", Role::Info),
        ];
        assert_eq!(check_rows(&reference("x"), &[], &rows, text_equal), None);
    }
}
