use anyhow::Result;

use super::{Kind, Provider, Role, TagValue};
use crate::tags::exif::{DateTag, ExifTags};
use crate::value::{DateTime, GpsCoords, Value};

/// Fields carried by an EXIF block.
#[derive(Debug, Clone)]
pub struct ExifProvider {
    tags: ExifTags,
}

impl ExifProvider {
    /// Wrap `tags`, recording any value that fails to parse in `problems`.
    pub fn new(tags: ExifTags, problems: &mut Vec<String>) -> Self {
        for which in DateTag::ALL {
            if let Err(e) = tags.date_time(which) {
                problems.push(format!("{e:#}"));
            }
        }
        if let Err(e) = tags.gps() {
            problems.push(format!("{e:#}"));
        }
        ExifProvider { tags }
    }

    pub fn tags_mut(&mut self) -> &mut ExifTags {
        &mut self.tags
    }

    /// Preferred tags are listed even when empty, but only if the block
    /// exists.
    fn present(&self) -> bool {
        !self.tags.is_empty()
    }

    fn date(&self, which: DateTag) -> DateTime {
        self.tags.date_time(which).unwrap_or_default()
    }
}

fn text_row(label: &str, value: String, role: Role) -> TagValue {
    TagValue::new(label, Value::Text(value), role)
}

impl Provider for ExifProvider {
    fn kind(&self) -> Kind {
        Kind::Exif
    }

    fn is_dirty(&self) -> bool {
        self.tags.is_dirty()
    }

    // ── artist ──

    fn artist(&self) -> String {
        self.tags.artist().into_iter().next().unwrap_or_default()
    }

    fn artist_tags(&self) -> Vec<TagValue> {
        let names = self.tags.artist();
        if names.is_empty() && self.present() {
            return vec![text_row("EXIF Artist", String::new(), Role::Preferred)];
        }
        names
            .into_iter()
            .map(|n| text_row("EXIF Artist", n, Role::Preferred))
            .collect()
    }

    fn set_artist(&mut self, value: &str) -> Result<()> {
        let names: Vec<String> = if value.is_empty() { Vec::new() } else { vec![value.to_string()] };
        self.tags.set_artist(&names);
        Ok(())
    }

    // ── caption ──

    fn caption(&self) -> String {
        let comment = self.tags.user_comment();
        if !comment.is_empty() {
            return comment;
        }
        self.tags.image_description()
    }

    fn caption_tags(&self) -> Vec<TagValue> {
        let mut rows = Vec::new();
        let desc = self.tags.image_description();
        if !desc.is_empty() || self.present() {
            rows.push(text_row("EXIF ImageDescription", desc, Role::Preferred));
        }
        let comment = self.tags.user_comment();
        if !comment.is_empty() {
            rows.push(text_row("EXIF UserComment", comment, Role::Deprecated));
        }
        rows
    }

    fn set_caption(&mut self, value: &str) -> Result<()> {
        self.tags.set_image_description(value);
        self.tags.set_user_comment("");
        Ok(())
    }

    // ── datetime ──

    fn datetime(&self) -> DateTime {
        DateTag::ALL
            .into_iter()
            .map(|w| self.date(w))
            .find(|d| !d.is_empty())
            .unwrap_or_default()
    }

    fn datetime_tags(&self) -> Vec<TagValue> {
        let mut rows = Vec::new();
        for which in DateTag::ALL {
            let value = self.date(which);
            let role = if which == DateTag::Original { Role::Preferred } else { Role::Deprecated };
            if !value.is_empty() || (role == Role::Preferred && self.present()) {
                rows.push(TagValue::new(which.label(), Value::DateTime(value), role));
            }
        }
        rows
    }

    fn set_datetime(&mut self, value: &DateTime) -> Result<()> {
        self.tags.set_date_time(DateTag::Original, value);
        self.tags.set_date_time(DateTag::Digitized, &DateTime::default());
        self.tags.set_date_time(DateTag::Modified, &DateTime::default());
        Ok(())
    }

    // ── gps ──

    fn gps(&self) -> GpsCoords {
        self.tags.gps().unwrap_or_default()
    }

    fn gps_tags(&self) -> Vec<TagValue> {
        let value = self.gps();
        if value.is_empty() && !self.present() {
            return Vec::new();
        }
        vec![TagValue::new("EXIF GPS", Value::Gps(value), Role::Preferred)]
    }

    fn set_gps(&mut self, value: &GpsCoords) -> Result<()> {
        self.tags.set_gps(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::exif::empty_block;

    fn provider() -> ExifProvider {
        let mut problems = Vec::new();
        let p = ExifProvider::new(empty_block(), &mut problems);
        assert!(problems.is_empty());
        p
    }

    #[test]
    fn datetime_write_keeps_only_original() {
        let mut p = provider();
        let dt = DateTime::parse("2021-06-21T03:55:00.5-07:00").unwrap();
        p.tags_mut().set_date_time(DateTag::Modified, &dt);
        p.set_datetime(&dt).unwrap();
        let rows = p.datetime_tags();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, "EXIF DateTimeOriginal");
        assert_eq!(rows[0].value, Value::DateTime(dt.clone()));
        assert_eq!(p.datetime(), dt);
        assert!(p.is_dirty());
    }

    #[test]
    fn caption_prefers_user_comment_and_write_clears_it() {
        let mut p = provider();
        p.tags_mut().set_user_comment("from camera");
        p.tags_mut().set_image_description("described");
        assert_eq!(p.caption(), "from camera");
        p.set_caption("new").unwrap();
        assert_eq!(p.caption(), "new");
        assert!(p.caption_tags().iter().all(|r| r.role == Role::Preferred));
    }

    #[test]
    fn empty_block_lists_no_rows() {
        let p = provider();
        assert!(p.artist_tags().is_empty());
        assert!(p.gps_tags().is_empty());
        assert!(p.title_tags().is_empty());
    }
}
