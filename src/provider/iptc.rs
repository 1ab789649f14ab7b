use anyhow::Result;
use std::collections::BTreeSet;

use super::{Kind, Provider, Role, TagValue};
use crate::tags::iptc::*;
use crate::value::{truncate, DateTime, Keyword, Location, Value};

/// Fields carried by an IPTC IIM block.
#[derive(Debug, Clone)]
pub struct IptcProvider {
    tags: IptcTags,
}

impl IptcProvider {
    pub fn new(tags: IptcTags, problems: &mut Vec<String>) -> Self {
        for which in [IptcDate::Created, IptcDate::DigitalCreation] {
            if let Err(e) = tags.date(which) {
                problems.push(format!("{e:#}"));
            }
        }
        IptcProvider { tags }
    }

    pub fn tags_mut(&mut self) -> &mut IptcTags {
        &mut self.tags
    }

    pub fn read_only(&self) -> Option<&str> {
        self.tags.read_only()
    }

    fn present(&self) -> bool {
        !self.tags.is_empty()
    }

    fn rows(&self, ds: DataSetId, role: Role) -> Vec<TagValue> {
        let values = self.tags.strings(ds);
        if values.is_empty() {
            if role == Role::Preferred && self.present() {
                return vec![TagValue::new(ds.label, Value::Text(String::new()), role).capped(ds.max)];
            }
            return Vec::new();
        }
        values
            .into_iter()
            .map(|v| TagValue::new(ds.label, Value::Text(v), role).capped(ds.max))
            .collect()
    }
}

impl Provider for IptcProvider {
    fn kind(&self) -> Kind {
        Kind::Iptc
    }

    fn is_dirty(&self) -> bool {
        self.tags.is_dirty()
    }

    fn artist(&self) -> String {
        self.tags.string(BYLINE)
    }

    fn artist_tags(&self) -> Vec<TagValue> {
        self.rows(BYLINE, Role::Preferred)
    }

    fn set_artist(&mut self, value: &str) -> Result<()> {
        self.tags.set_string(BYLINE, value)?;
        Ok(())
    }

    fn caption(&self) -> String {
        self.tags.string(CAPTION_ABSTRACT)
    }

    fn caption_tags(&self) -> Vec<TagValue> {
        self.rows(CAPTION_ABSTRACT, Role::Preferred)
    }

    fn set_caption(&mut self, value: &str) -> Result<()> {
        self.tags.set_string(CAPTION_ABSTRACT, value)?;
        Ok(())
    }

    fn datetime(&self) -> DateTime {
        [IptcDate::Created, IptcDate::DigitalCreation]
            .into_iter()
            .map(|w| self.tags.date(w).unwrap_or_default())
            .find(|d| !d.is_empty())
            .unwrap_or_default()
    }

    fn datetime_tags(&self) -> Vec<TagValue> {
        let mut rows = Vec::new();
        let created = self.tags.date(IptcDate::Created).unwrap_or_default();
        if !created.is_empty() || self.present() {
            rows.push(TagValue::new(IptcDate::Created.label(), Value::DateTime(created), Role::Preferred));
        }
        let digital = self.tags.date(IptcDate::DigitalCreation).unwrap_or_default();
        if !digital.is_empty() {
            rows.push(TagValue::new(
                IptcDate::DigitalCreation.label(),
                Value::DateTime(digital),
                Role::Deprecated,
            ));
        }
        rows
    }

    fn set_datetime(&mut self, value: &DateTime) -> Result<()> {
        self.tags.set_date(IptcDate::Created, value)?;
        self.tags.set_date(IptcDate::DigitalCreation, &DateTime::default())?;
        Ok(())
    }

    fn location(&self) -> Location {
        self.tags.location()
    }

    fn location_tags(&self) -> Vec<TagValue> {
        let loc = self.tags.location();
        if loc.is_empty() && !self.present() {
            return Vec::new();
        }
        vec![TagValue::new("IPTC Location", Value::Location(loc), Role::Preferred)]
    }

    fn set_location(&mut self, value: &Location) -> Result<()> {
        self.tags.set_location(value)?;
        Ok(())
    }

    fn title(&self) -> String {
        let name = self.tags.string(OBJECT_NAME);
        if !name.is_empty() {
            return name;
        }
        self.tags.string(HEADLINE)
    }

    fn title_tags(&self) -> Vec<TagValue> {
        let mut rows = self.rows(OBJECT_NAME, Role::Preferred);
        rows.extend(self.rows(HEADLINE, Role::Deprecated));
        rows
    }

    fn set_title(&mut self, value: &str) -> Result<()> {
        self.tags.set_string(OBJECT_NAME, value)?;
        self.tags.set_string(HEADLINE, "")?;
        Ok(())
    }

    fn keywords(&self) -> Vec<Keyword> {
        self.tags
            .strings(KEYWORDS)
            .iter()
            .map(|k| Keyword::from_words(&[k]))
            .collect()
    }

    fn keyword_tags(&self) -> Vec<TagValue> {
        let words = self.tags.strings(KEYWORDS);
        if words.is_empty() && self.present() {
            return vec![TagValue::new(KEYWORDS.label, Value::Keyword(Keyword::default()), Role::Flat).capped(KEYWORDS.max)];
        }
        words
            .iter()
            .map(|k| TagValue::new(KEYWORDS.label, Value::Keyword(Keyword::from_words(&[k])), Role::Flat).capped(KEYWORDS.max))
            .collect()
    }

    /// Writes the sorted, unique leaves of `value`.
    fn set_keywords(&mut self, value: &[Keyword]) -> Result<()> {
        let leaves: BTreeSet<&str> = value
            .iter()
            .map(|k| truncate(k.flattened(), KEYWORDS.max))
            .filter(|k| !k.is_empty())
            .collect();
        let leaves: Vec<String> = leaves.into_iter().map(str::to_string).collect();
        self.tags.set_strings(KEYWORDS, &leaves)?;
        Ok(())
    }
}
