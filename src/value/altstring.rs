/// A string with language alternatives. The first entry is the default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AltString(pub Vec<AltItem>);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AltItem {
    pub value: String,
    /// Empty for an untagged item; `x-default` is kept as written.
    pub lang: String,
}

impl AltString {
    /// A single `x-default` alternative, or nothing for an empty string.
    pub fn new(value: &str) -> Self {
        if value.is_empty() {
            return Self::default();
        }
        Self(vec![AltItem {
            value: value.to_string(),
            lang: "x-default".to_string(),
        }])
    }

    /// The `x-default` value if present, else the first.
    pub fn default_value(&self) -> &str {
        self.0
            .iter()
            .find(|i| i.lang == "x-default")
            .or_else(|| self.0.first())
            .map(|i| i.value.as_str())
            .unwrap_or("")
    }

    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0.iter().find(|i| i.lang == lang).map(|i| i.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|i| i.value.is_empty())
    }

    /// Tag-listing labels: `label` for the default, `label[lang]` for others.
    pub fn labelled(&self, label: &str) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|i| {
                let tag = if i.lang.is_empty() || i.lang == "x-default" {
                    label.to_string()
                } else {
                    format!("{label}[{}]", i.lang)
                };
                (tag, i.value.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prefers_x_default() {
        let a = AltString(vec![
            AltItem { value: "Bonjour".into(), lang: "fr".into() },
            AltItem { value: "Hello".into(), lang: "x-default".into() },
        ]);
        assert_eq!(a.default_value(), "Hello");
        assert_eq!(a.get("fr"), Some("Bonjour"));
        assert_eq!(
            a.labelled("XMP  dc:title"),
            vec![
                ("XMP  dc:title[fr]".to_string(), "Bonjour".to_string()),
                ("XMP  dc:title".to_string(), "Hello".to_string()),
            ]
        );
        assert!(AltString::new("").is_empty());
    }
}
