use anyhow::Result;
use std::collections::BTreeSet;

use super::{Kind, Provider, TagValue};
use crate::error::{is_not_supported, not_supported};
use crate::value::{DateTime, GpsCoords, Keyword, Location, Value};

// Read priority of the containers, per field.
const ARTIST: &[Kind] = &[Kind::Xmp, Kind::XmpExt, Kind::Exif, Kind::Iptc];
const CAPTION: &[Kind] = &[Kind::Xmp, Kind::XmpExt, Kind::Exif, Kind::Iptc];
const DATETIME: &[Kind] = &[Kind::Exif, Kind::Xmp, Kind::XmpExt, Kind::Iptc, Kind::Video];
const GPS: &[Kind] = &[Kind::Xmp, Kind::XmpExt, Kind::Exif, Kind::Video];
const LOCATION: &[Kind] = &[Kind::Xmp, Kind::XmpExt, Kind::Iptc];
const TITLE: &[Kind] = &[Kind::Xmp, Kind::XmpExt, Kind::Iptc];
const KEYWORDS: &[Kind] = &[Kind::Xmp, Kind::XmpExt, Kind::Iptc];
const FACES: &[Kind] = &[Kind::Xmp, Kind::XmpExt];

/// All the providers of one file. Reads take the first non-empty value in
/// field priority order; writes go to every provider.
pub struct Providers<'a> {
    list: Vec<&'a mut dyn Provider>,
}

impl<'a> Providers<'a> {
    pub fn new(list: Vec<&'a mut dyn Provider>) -> Self {
        Providers { list }
    }

    pub fn is_dirty(&self) -> bool {
        self.list.iter().any(|p| p.is_dirty())
    }

    /// The providers of the given kinds, in the order of `kinds`.
    fn ordered(&self, kinds: &[Kind]) -> Vec<&dyn Provider> {
        kinds
            .iter()
            .flat_map(|k| self.list.iter().filter(move |p| p.kind() == *k))
            .map(|p| &**p)
            .collect()
    }

    fn first<T>(&self, kinds: &[Kind], get: impl Fn(&dyn Provider) -> T, empty: impl Fn(&T) -> bool) -> Option<T> {
        self.ordered(kinds).into_iter().map(get).find(|v| !empty(v))
    }

    fn rows(&self, kinds: &[Kind], get: impl Fn(&dyn Provider) -> Vec<TagValue>) -> Vec<TagValue> {
        self.ordered(kinds).into_iter().flat_map(get).collect()
    }

    /// Apply `set` to every provider. `NotSupported` from some providers is
    /// fine as long as one accepted the value.
    fn set_each(&mut self, mut set: impl FnMut(&mut dyn Provider) -> Result<()>) -> Result<()> {
        let mut accepted = false;
        for p in self.list.iter_mut() {
            match set(&mut **p) {
                Ok(()) => accepted = true,
                Err(e) if is_not_supported(&e) => {}
                Err(e) => return Err(e),
            }
        }
        if accepted { Ok(()) } else { not_supported() }
    }

    // ── artist ──

    pub fn artist(&self) -> String {
        self.first(ARTIST, |p| p.artist(), String::is_empty).unwrap_or_default()
    }

    pub fn artist_tags(&self) -> Vec<TagValue> {
        self.rows(ARTIST, |p| p.artist_tags())
    }

    pub fn set_artist(&mut self, value: &str) -> Result<()> {
        self.set_each(|p| p.set_artist(value))
    }

    // ── caption ──

    pub fn caption(&self) -> String {
        self.first(CAPTION, |p| p.caption(), String::is_empty).unwrap_or_default()
    }

    pub fn caption_tags(&self) -> Vec<TagValue> {
        self.rows(CAPTION, |p| p.caption_tags())
    }

    pub fn set_caption(&mut self, value: &str) -> Result<()> {
        self.set_each(|p| p.set_caption(value))
    }

    // ── datetime ──

    /// The first date found, upgraded to any equivalent tag value with more
    /// precision.
    pub fn datetime(&self) -> DateTime {
        let Some(mut value) = self.first(DATETIME, |p| p.datetime(), DateTime::is_empty) else {
            return DateTime::default();
        };
        for row in self.datetime_tags() {
            if let Value::DateTime(other) = &row.value {
                if let Some(better) = value.equivalent(other).filter(|_| !other.is_empty()) {
                    value = better;
                }
            }
        }
        value
    }

    pub fn datetime_tags(&self) -> Vec<TagValue> {
        self.rows(DATETIME, |p| p.datetime_tags())
    }

    pub fn set_datetime(&mut self, value: &DateTime) -> Result<()> {
        self.set_each(|p| p.set_datetime(value))
    }

    // ── gps ──

    pub fn gps(&self) -> GpsCoords {
        self.first(GPS, |p| p.gps(), GpsCoords::is_empty).unwrap_or_default()
    }

    pub fn gps_tags(&self) -> Vec<TagValue> {
        self.rows(GPS, |p| p.gps_tags())
    }

    pub fn set_gps(&mut self, value: &GpsCoords) -> Result<()> {
        self.set_each(|p| p.set_gps(value))
    }

    // ── location ──

    pub fn location(&self) -> Location {
        self.first(LOCATION, |p| p.location(), Location::is_empty)
            .or_else(|| self.first(LOCATION, |p| p.location_shown(), Location::is_empty))
            .unwrap_or_default()
    }

    pub fn location_tags(&self) -> Vec<TagValue> {
        self.rows(LOCATION, |p| p.location_tags())
    }

    pub fn set_location(&mut self, value: &Location) -> Result<()> {
        self.set_each(|p| p.set_location(value))
    }

    // ── title ──

    pub fn title(&self) -> String {
        self.first(TITLE, |p| p.title(), String::is_empty).unwrap_or_default()
    }

    pub fn title_tags(&self) -> Vec<TagValue> {
        self.rows(TITLE, |p| p.title_tags())
    }

    pub fn set_title(&mut self, value: &str) -> Result<()> {
        self.set_each(|p| p.set_title(value))
    }

    // ── keywords ──

    pub fn keywords(&self) -> Vec<Keyword> {
        self.first(KEYWORDS, |p| p.keywords(), Vec::is_empty).unwrap_or_default()
    }

    pub fn keyword_tags(&self) -> Vec<TagValue> {
        self.rows(KEYWORDS, |p| p.keyword_tags())
    }

    pub fn set_keywords(&mut self, value: &[Keyword]) -> Result<()> {
        self.set_each(|p| p.set_keywords(value))
    }

    // ── faces ──

    /// Every name with a face region, sorted.
    pub fn faces(&self) -> Vec<String> {
        let names: BTreeSet<String> = self.ordered(FACES).into_iter().flat_map(|p| p.faces()).collect();
        names.into_iter().collect()
    }

    pub fn face_tags(&self) -> Vec<TagValue> {
        self.rows(FACES, |p| p.face_tags())
    }

    pub fn set_faces(&mut self, value: &[String]) -> Result<()> {
        self.set_each(|p| p.set_faces(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ExifProvider, IptcProvider, XmpProvider};
    use crate::tags::exif::{empty_block, DateTag};
    use crate::tags::iptc::{IptcTags, BYLINE, OBJECT_NAME};
    use crate::tags::xmp::XmpTags;

    struct Set {
        exif: ExifProvider,
        xmp: XmpProvider,
        iptc: IptcProvider,
    }

    impl Set {
        fn new() -> Self {
            let mut problems = Vec::new();
            Set {
                exif: ExifProvider::new(empty_block(), &mut problems),
                xmp: XmpProvider::new(XmpTags::new(), &mut problems),
                iptc: IptcProvider::new(IptcTags::new(), &mut problems),
            }
        }

        fn providers(&mut self) -> Providers<'_> {
            Providers::new(vec![&mut self.exif as &mut dyn Provider, &mut self.xmp, &mut self.iptc])
        }
    }

    #[test]
    fn title_reads_xmp_before_iptc() {
        let mut s = Set::new();
        s.iptc.tags_mut().set_string(OBJECT_NAME, "From IPTC").unwrap();
        assert_eq!(s.providers().title(), "From IPTC");
        s.providers().set_title("Both").unwrap();
        assert_eq!(s.providers().title(), "Both");
        assert_eq!(s.iptc.title(), "Both");
        assert!(s.providers().is_dirty());
    }

    #[test]
    fn artist_reads_exif_before_iptc() {
        let mut s = Set::new();
        s.iptc.tags_mut().set_string(BYLINE, "Stephen").unwrap();
        assert_eq!(s.providers().artist(), "Stephen");
        s.exif.tags_mut().set_artist(&["Steve".to_string()]);
        assert_eq!(s.providers().artist(), "Steve");
        s.xmp.set_artist("Steven").unwrap();
        assert_eq!(s.providers().artist(), "Steven");
    }

    #[test]
    fn new_containers_start_clean() {
        let mut s = Set::new();
        assert!(!s.providers().is_dirty());
        s.providers().set_title("").unwrap();
        assert!(!s.providers().is_dirty());
    }

    #[test]
    fn datetime_prefers_exif_and_upgrades_precision() {
        let mut s = Set::new();
        let coarse = DateTime::parse("2021-06-21T03:55:00-07:00").unwrap();
        let fine = DateTime::parse("2021-06-21T03:55:00.25-07:00").unwrap();
        s.exif.tags_mut().set_date_time(DateTag::Original, &coarse);
        s.xmp.set_datetime(&fine).unwrap();
        assert_eq!(s.providers().datetime(), fine);
    }

    #[test]
    fn unsupported_everywhere_is_an_error() {
        let mut s = Set::new();
        let err = s.providers().set_faces(&[]);
        // XMP accepts an empty face list.
        assert!(err.is_ok());
        let mut only_exif = Set::new();
        let mut p = Providers::new(vec![&mut only_exif.exif as &mut dyn Provider]);
        assert!(is_not_supported(&p.set_title("x").unwrap_err()));
    }
}
