/// Truncate `s` to at most `max` bytes without splitting a UTF-8 character.
/// A `max` of zero means unlimited.
pub fn truncate(s: &str, max: usize) -> &str {
    if max == 0 || s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// A string with an optional byte cap, as used by IPTC DataSets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundedString {
    value: String,
    max: usize,
}

impl BoundedString {
    pub fn new(value: &str, max: usize) -> Self {
        Self {
            value: truncate(value, max).to_string(),
            max,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Equal, or one is a cap-length truncation of the other.
    pub fn equivalent(&self, other: &str) -> bool {
        self.value == other || (self.max != 0 && truncate(other, self.max) == self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("héllo", 3), "hé");
        assert_eq!(truncate("abc", 0), "abc");
        let b = BoundedString::new("Stephen Hawking", 7);
        assert_eq!(b.as_str(), "Stephen");
        assert!(b.equivalent("Stephen Hawking"));
        assert!(!b.equivalent("Steve"));
    }
}
