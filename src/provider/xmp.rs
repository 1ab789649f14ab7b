use anyhow::Result;
use std::collections::BTreeSet;

use super::{Kind, Provider, Role, TagValue};
use crate::error::{not_supported, MetadataError};
use crate::tags::xmp::*;
use crate::value::{AltString, DateTime, GpsCoords, Keyword, Location, Value};

/// Fields carried by an XMP packet, embedded or sidecar.
#[derive(Debug, Clone)]
pub struct XmpProvider {
    tags: XmpTags,
    kind: Kind,
}

impl XmpProvider {
    /// A writable provider over the main packet.
    pub fn new(tags: XmpTags, problems: &mut Vec<String>) -> Self {
        Self::with_kind(tags, Kind::Xmp, problems)
    }

    /// A read-only provider over a reassembled extension packet.
    pub fn extension(tags: XmpTags, problems: &mut Vec<String>) -> Self {
        Self::with_kind(tags, Kind::XmpExt, problems)
    }

    fn with_kind(tags: XmpTags, kind: Kind, problems: &mut Vec<String>) -> Self {
        let mut report = |r: Result<()>| {
            if let Err(e) = r {
                problems.push(format!("XMP {e:#}"));
            }
        };
        for p in DATE_PROPS {
            report(tags.date(p).map(drop));
        }
        for p in [DC_CREATOR, DC_SUBJECT, DIGIKAM_TAGS_LIST, LR_HIERARCHICAL_SUBJECT] {
            report(tags.list(p).map(drop));
        }
        for p in [DC_TITLE, DC_DESCRIPTION, EXIF_USER_COMMENT, TIFF_IMAGE_DESCRIPTION] {
            report(tags.alt(p).map(drop));
        }
        report(tags.text(TIFF_ARTIST).map(drop));
        report(tags.gps().map(drop));
        report(tags.location_created().map(drop));
        report(tags.locations_shown().map(drop));
        XmpProvider { tags, kind }
    }

    pub fn tags(&self) -> &XmpTags {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut XmpTags {
        &mut self.tags
    }

    fn present(&self) -> bool {
        !self.tags.is_empty()
    }

    fn writable(&self) -> Result<()> {
        match self.kind {
            Kind::XmpExt => not_supported(),
            _ => Ok(()),
        }
    }

    fn alt_rows(&self, p: Prop, role: Role) -> Vec<TagValue> {
        let alt = self.tags.alt(p).unwrap_or_default();
        if alt.is_empty() {
            if role == Role::Preferred && self.present() {
                return vec![TagValue::new(p.label, Value::Text(String::new()), role)];
            }
            return Vec::new();
        }
        alt.labelled(p.label)
            .into_iter()
            .map(|(label, v)| TagValue::new(label, Value::Text(v), role))
            .collect()
    }

    fn hierarchical(&self, p: Prop, sep: char) -> Vec<Keyword> {
        self.tags
            .list(p)
            .unwrap_or_default()
            .iter()
            .map(|s| {
                let words: Vec<&str> = s.split(sep).map(str::trim).filter(|w| !w.is_empty()).collect();
                Keyword::from_words(&words)
            })
            .filter(|k| !k.is_empty())
            .collect()
    }

    fn subjects(&self) -> Vec<String> {
        self.tags.list(DC_SUBJECT).unwrap_or_default()
    }
}

fn is_written_date(p: Prop) -> bool {
    p.label == EXIF_DATE_TIME_ORIGINAL.label || p.label == XMP_CREATE_DATE.label
}

impl Provider for XmpProvider {
    fn kind(&self) -> Kind {
        self.kind
    }

    fn is_dirty(&self) -> bool {
        self.tags.is_dirty()
    }

    // ── artist ──

    fn artist(&self) -> String {
        let creators = self.tags.list(DC_CREATOR).unwrap_or_default();
        match creators.into_iter().find(|c| !c.is_empty()) {
            Some(c) => c,
            None => self.tags.text(TIFF_ARTIST).unwrap_or_default(),
        }
    }

    fn artist_tags(&self) -> Vec<TagValue> {
        let mut rows: Vec<TagValue> = self
            .tags
            .list(DC_CREATOR)
            .unwrap_or_default()
            .into_iter()
            .map(|c| TagValue::new(DC_CREATOR.label, Value::Text(c), Role::Preferred))
            .collect();
        if rows.is_empty() && self.present() {
            rows.push(TagValue::new(DC_CREATOR.label, Value::Text(String::new()), Role::Preferred));
        }
        let artist = self.tags.text(TIFF_ARTIST).unwrap_or_default();
        if !artist.is_empty() {
            rows.push(TagValue::new(TIFF_ARTIST.label, Value::Text(artist), Role::Deprecated));
        }
        rows
    }

    fn set_artist(&mut self, value: &str) -> Result<()> {
        self.writable()?;
        let list: Vec<String> = if value.is_empty() { Vec::new() } else { vec![value.to_string()] };
        self.tags.set_seq(DC_CREATOR, &list);
        self.tags.remove(TIFF_ARTIST);
        Ok(())
    }

    // ── caption ──

    fn caption(&self) -> String {
        [DC_DESCRIPTION, EXIF_USER_COMMENT, TIFF_IMAGE_DESCRIPTION]
            .into_iter()
            .map(|p| self.tags.alt(p).unwrap_or_default().default_value().to_string())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }

    fn caption_tags(&self) -> Vec<TagValue> {
        let mut rows = self.alt_rows(DC_DESCRIPTION, Role::Preferred);
        rows.extend(self.alt_rows(EXIF_USER_COMMENT, Role::Deprecated));
        rows.extend(self.alt_rows(TIFF_IMAGE_DESCRIPTION, Role::Deprecated));
        rows
    }

    fn set_caption(&mut self, value: &str) -> Result<()> {
        self.writable()?;
        self.tags.set_alt(DC_DESCRIPTION, &AltString::new(value));
        self.tags.remove(EXIF_USER_COMMENT);
        self.tags.remove(TIFF_IMAGE_DESCRIPTION);
        Ok(())
    }

    // ── datetime ──

    fn datetime(&self) -> DateTime {
        DATE_PROPS
            .into_iter()
            .map(|p| self.tags.date(p).unwrap_or_default())
            .find(|d| !d.is_empty())
            .unwrap_or_default()
    }

    fn datetime_tags(&self) -> Vec<TagValue> {
        let mut rows = Vec::new();
        for p in DATE_PROPS {
            let value = self.tags.date(p).unwrap_or_default();
            let preferred = is_written_date(p);
            let role = if preferred { Role::Preferred } else { Role::Deprecated };
            if !value.is_empty() || (preferred && self.present()) {
                rows.push(TagValue::new(p.label, Value::DateTime(value), role));
            }
        }
        rows
    }

    fn set_datetime(&mut self, value: &DateTime) -> Result<()> {
        self.writable()?;
        for p in DATE_PROPS {
            if is_written_date(p) && !value.is_empty() {
                self.tags.set_date(p, value);
            } else {
                self.tags.remove(p);
            }
        }
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
        vec![TagValue::new(EXIF_GPS.label, Value::Gps(value), Role::Preferred)]
    }

    fn set_gps(&mut self, value: &GpsCoords) -> Result<()> {
        self.writable()?;
        self.tags.set_gps(value);
        Ok(())
    }

    // ── location ──

    fn location(&self) -> Location {
        self.tags.location_created().unwrap_or_default().to_location()
    }

    fn location_shown(&self) -> Location {
        self.tags
            .locations_shown()
            .unwrap_or_default()
            .first()
            .map(XmpLocation::to_location)
            .unwrap_or_default()
    }

    fn location_tags(&self) -> Vec<TagValue> {
        let mut rows = Vec::new();
        let created = self.tags.location_created().unwrap_or_default();
        if !created.is_empty() || self.present() {
            for (label, loc) in created.labelled(IPTC_LOCATION_CREATED.label) {
                rows.push(TagValue::new(label, Value::Location(loc), Role::Preferred));
            }
        }
        for shown in self.tags.locations_shown().unwrap_or_default() {
            for (label, loc) in shown.labelled(IPTC_LOCATION_SHOWN.label) {
                rows.push(TagValue::new(label, Value::Location(loc), Role::Deprecated));
            }
        }
        rows
    }

    fn set_location(&mut self, value: &Location) -> Result<()> {
        self.writable()?;
        self.tags.set_location(value);
        Ok(())
    }

    // ── title ──

    fn title(&self) -> String {
        self.tags.alt(DC_TITLE).unwrap_or_default().default_value().to_string()
    }

    fn title_tags(&self) -> Vec<TagValue> {
        self.alt_rows(DC_TITLE, Role::Preferred)
    }

    fn set_title(&mut self, value: &str) -> Result<()> {
        self.writable()?;
        self.tags.set_alt(DC_TITLE, &AltString::new(value));
        Ok(())
    }

    // ── keywords ──

    /// digiKam:TagsList, else lr:hierarchicalSubject, plus any dc:subject
    /// entry that is not the leaf of a hierarchical keyword.
    fn keywords(&self) -> Vec<Keyword> {
        let mut list = self.hierarchical(DIGIKAM_TAGS_LIST, '/');
        if list.is_empty() {
            list = self.hierarchical(LR_HIERARCHICAL_SUBJECT, '|');
        }
        let leaves: BTreeSet<String> = list.iter().map(|k| k.flattened().to_string()).collect();
        for s in self.subjects() {
            if !s.is_empty() && !leaves.contains(&s) {
                list.push(Keyword::from_words(&[s]));
            }
        }
        list
    }

    fn keyword_tags(&self) -> Vec<TagValue> {
        let mut rows = Vec::new();
        let mut hier = |p: Prop, sep: char, role: Role| {
            let values = self.hierarchical(p, sep);
            if values.is_empty() && self.present() {
                rows.push(TagValue::new(p.label, Value::Keyword(Keyword::default()), role));
            }
            for k in values {
                rows.push(TagValue::new(p.label, Value::Keyword(k), role));
            }
        };
        hier(DIGIKAM_TAGS_LIST, '/', Role::Preferred);
        hier(LR_HIERARCHICAL_SUBJECT, '|', Role::Preferred);
        let subjects = self.subjects();
        if subjects.is_empty() && self.present() {
            rows.push(TagValue::new(DC_SUBJECT.label, Value::Keyword(Keyword::default()), Role::Flat));
        }
        for s in subjects {
            rows.push(TagValue::new(DC_SUBJECT.label, Value::Keyword(Keyword::from_words(&[s])), Role::Flat));
        }
        rows
    }

    fn set_keywords(&mut self, value: &[Keyword]) -> Result<()> {
        self.writable()?;
        let mut sorted: Vec<&Keyword> = value.iter().filter(|k| !k.is_empty()).collect();
        sorted.sort();
        sorted.dedup();
        let slashed: Vec<String> = sorted.iter().map(|k| k.join("/")).collect();
        let piped: Vec<String> = sorted.iter().map(|k| k.join("|")).collect();
        let leaves: BTreeSet<&str> = sorted.iter().map(|k| k.flattened()).collect();
        let leaves: Vec<String> = leaves.into_iter().map(str::to_string).collect();
        self.tags.set_seq(DIGIKAM_TAGS_LIST, &slashed);
        self.tags.set_bag(LR_HIERARCHICAL_SUBJECT, &piped);
        self.tags.set_bag(DC_SUBJECT, &leaves);
        Ok(())
    }

    // ── faces ──

    fn faces(&self) -> Vec<String> {
        let all: BTreeSet<String> = self.tags.mp_faces().into_iter().chain(self.tags.mwg_faces()).collect();
        all.into_iter().collect()
    }

    fn face_tags(&self) -> Vec<TagValue> {
        let mp = self.tags.mp_faces().into_iter().map(|n| (MP_REGION_INFO.label, n));
        let mwg = self.tags.mwg_faces().into_iter().map(|n| (MWG_RS_REGIONS.label, n));
        mp.chain(mwg)
            .map(|(label, n)| TagValue::new(label, Value::Text(n), Role::Info))
            .collect()
    }

    fn set_faces(&mut self, value: &[String]) -> Result<()> {
        self.writable()?;
        let current = self.faces();
        if let Some(name) = value.iter().find(|v| !current.contains(v)) {
            return Err(MetadataError::CannotAddFace(name.clone()).into());
        }
        self.tags.retain_faces(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_not_supported;

    fn provider() -> XmpProvider {
        let mut problems = Vec::new();
        let p = XmpProvider::new(XmpTags::new(), &mut problems);
        assert!(problems.is_empty());
        p
    }

    fn kw(s: &str) -> Keyword {
        Keyword::parse(s, None).unwrap()
    }

    // ── keywords ──

    #[test]
    fn keywords_write_all_three_forms() {
        let mut p = provider();
        p.set_keywords(&[kw("People/Alice"), kw("Sunset"), kw("Places/USA/California")]).unwrap();
        let t = p.tags();
        assert_eq!(
            t.list(DIGIKAM_TAGS_LIST).unwrap(),
            vec!["People/Alice", "Places/USA/California", "Sunset"]
        );
        assert_eq!(
            t.list(LR_HIERARCHICAL_SUBJECT).unwrap(),
            vec!["People|Alice", "Places|USA|California", "Sunset"]
        );
        assert_eq!(t.list(DC_SUBJECT).unwrap(), vec!["Alice", "California", "Sunset"]);
        assert_eq!(p.keywords(), vec![kw("People/Alice"), kw("Places/USA/California"), kw("Sunset")]);
    }

    #[test]
    fn flat_subjects_not_implied_by_a_leaf_are_keywords() {
        let mut p = provider();
        p.tags_mut().set_bag(LR_HIERARCHICAL_SUBJECT, &["Pets|Cat".to_string()]);
        p.tags_mut().set_bag(DC_SUBJECT, &["Cat".to_string(), "Dog".to_string()]);
        assert_eq!(p.keywords(), vec![kw("Pets/Cat"), kw("Dog")]);
    }

    // ── dates ──

    #[test]
    fn datetime_write_clears_deprecated_dates() {
        let mut p = provider();
        let old = DateTime::parse("2020-01-01T00:00:00").unwrap();
        p.tags_mut().set_date(XMP_MODIFY_DATE, &old);
        assert_eq!(p.datetime(), old);
        let dt = DateTime::parse("2021-06-21T03:55:00-07:00").unwrap();
        p.set_datetime(&dt).unwrap();
        let labels: Vec<String> = p.datetime_tags().into_iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["XMP  exif:DateTimeOriginal", "XMP  xmp:CreateDate"]);
    }

    // ── faces and extension ──

    #[test]
    fn faces_cannot_be_added() {
        let mut p = provider();
        let err = p.set_faces(&["Alice".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "cannot add face region for \"Alice\"");
    }

    #[test]
    fn extension_packets_are_read_only() {
        let mut p = XmpProvider::extension(XmpTags::new(), &mut Vec::new());
        assert!(is_not_supported(&p.set_title("x").unwrap_err()));
        assert_eq!(p.kind(), Kind::XmpExt);
    }

    #[test]
    fn location_shown_is_only_a_fallback() {
        let mut p = provider();
        let loc = Location::parse("GBR / England / London").unwrap();
        p.set_location(&loc).unwrap();
        assert_eq!(p.location(), loc);
        assert!(p.location_shown().is_empty());
        let rows = p.location_tags();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, "XMP  iptc:LocationCreated");
    }
}
