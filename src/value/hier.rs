use anyhow::{bail, Result};
use std::fmt;

/// An ordered list of non-empty components, written `a / b / c`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HierValue(pub Vec<String>);

impl HierValue {
    /// Parse slash-separated components. Blank input yields an empty value.
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut components = Vec::new();
        for word in s.split('/') {
            if word.contains('|') {
                bail!("hierarchical values cannot contain | characters");
            }
            let word = word.trim();
            if word.is_empty() {
                bail!("hierarchical values cannot have empty components");
            }
            components.push(word.to_string());
        }
        Ok(Self(components))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for HierValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" / "))
    }
}

/// One component of a [`Keyword`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeywordComponent {
    pub word: String,
    /// Set on a category prefix (`People`, `Places`, ...) supplied by the
    /// field rather than by the user.
    pub omit_when_flattened: bool,
}

/// A hierarchical keyword. Equality and ordering compare the words only.
#[derive(Debug, Clone, Default)]
pub struct Keyword(pub Vec<KeywordComponent>);

impl Keyword {
    /// Parse slash-separated components, prepending `prefix` (flagged
    /// omit-when-flattened) when given.
    pub fn parse(s: &str, prefix: Option<&str>) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut kw = Vec::new();
        if let Some(prefix) = prefix {
            kw.push(KeywordComponent {
                word: prefix.to_string(),
                omit_when_flattened: true,
            });
        }
        for word in s.split('/') {
            if word.contains('|') {
                bail!("keywords cannot contain | characters");
            }
            let word = word.trim();
            if word.is_empty() {
                bail!("keywords cannot have empty components");
            }
            kw.push(KeywordComponent {
                word: word.to_string(),
                omit_when_flattened: false,
            });
        }
        Ok(Self(kw))
    }

    /// Build from stored components, as read from a hierarchical tag.
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
        Self(
            words
                .iter()
                .map(|w| KeywordComponent {
                    word: w.as_ref().to_string(),
                    omit_when_flattened: false,
                })
                .collect(),
        )
    }

    pub fn words(&self) -> Vec<&str> {
        self.0.iter().map(|c| c.word.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(|c| c.word.as_str())
    }

    /// The flat form written to dc:subject and IPTC Keywords: the leaf.
    pub fn flattened(&self) -> &str {
        self.0
            .iter()
            .rev()
            .find(|c| !c.omit_when_flattened)
            .or_else(|| self.0.last())
            .map(|c| c.word.as_str())
            .unwrap_or("")
    }

    /// Components joined by `sep` with no surrounding spaces.
    pub fn join(&self, sep: &str) -> String {
        self.words().join(sep)
    }

    /// Display form with the leading category component removed.
    pub fn display_without_prefix(&self) -> String {
        let words = self.words();
        words.get(1..).unwrap_or_default().join(" / ")
    }
}

impl PartialEq for Keyword {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a.word == b.word)
    }
}

impl Eq for Keyword {}

impl std::hash::Hash for Keyword {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for c in &self.0 {
            c.word.hash(state);
        }
    }
}

impl PartialOrd for Keyword {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Keyword {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.words().cmp(&other.words())
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join(" / "))
    }
}

/// A person's name, with a flag recording whether a face region names them.
#[derive(Debug, Clone, Default)]
pub struct Person {
    pub name: String,
    pub face: bool,
}

impl Person {
    /// Parse a name, stripping the ` [F]` display suffix.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_suffix("[F]").map(str::trim_end).unwrap_or(s);
        if s.is_empty() {
            bail!("invalid person name (must not be empty)");
        }
        if s.contains('/') || s.contains('|') {
            bail!("invalid person name (cannot contain / or |)");
        }
        Ok(Self {
            name: s.to_string(),
            face: false,
        })
    }
}

impl PartialEq for Person {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Person {}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.face {
            write!(f, "{} [F]", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hier_value_forms() {
        let hv = HierValue::parse("a / b / c").unwrap();
        assert_eq!(hv.to_string(), "a / b / c");
        assert_eq!(HierValue::parse("a/b/c").unwrap(), hv);
        assert!(HierValue::parse("a||b").is_err());
        assert!(HierValue::parse("a//b").is_err());
        assert!(HierValue::parse("  ").unwrap().is_empty());
    }

    #[test]
    fn keyword_flattening_skips_prefix() {
        let kw = Keyword::parse("Family/Alice", Some("People")).unwrap();
        assert_eq!(kw.words(), ["People", "Family", "Alice"]);
        assert_eq!(kw.flattened(), "Alice");
        assert_eq!(kw.join("|"), "People|Family|Alice");
        assert_eq!(kw.display_without_prefix(), "Family / Alice");
        assert_eq!(kw, Keyword::from_words(&["People", "Family", "Alice"]));

        let only_prefix = Keyword(vec![KeywordComponent {
            word: "Places".into(),
            omit_when_flattened: true,
        }]);
        assert_eq!(only_prefix.flattened(), "Places");
    }

    #[test]
    fn keyword_errors() {
        let err = Keyword::parse("a|b", None).unwrap_err();
        assert_eq!(err.to_string(), "keywords cannot contain | characters");
        let err = Keyword::parse("a/ /b", None).unwrap_err();
        assert_eq!(err.to_string(), "keywords cannot have empty components");
    }

    #[test]
    fn person_names() {
        let p = Person::parse("Alice Smith [F]").unwrap();
        assert_eq!(p.name, "Alice Smith");
        assert!(Person::parse(" ").is_err());
        assert!(Person::parse("A/B").is_err());
        let shown = Person { name: "Bob".into(), face: true };
        assert_eq!(shown.to_string(), "Bob [F]");
        assert_eq!(shown, Person::parse("Bob").unwrap());
    }
}
