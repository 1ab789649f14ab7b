//! Typed access to the EXIF tags the engine reads and writes.

use anyhow::{Context, Result};

use crate::container::tiff::{
    ByteOrder, IfdId, Tiff, TAG_EXIF_IFD, TAG_GPS_IFD, TYPE_BYTE, TYPE_UNDEFINED,
};
use crate::value::{DateTime, ExifGps, GpsCoords};

// ============================================================================
// Tag numbers
// ============================================================================

const TAG_IMAGE_DESCRIPTION: u16 = 0x010E;
const TAG_DATE_TIME: u16 = 0x0132;
const TAG_ARTIST: u16 = 0x013B;

const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
const TAG_DATE_TIME_DIGITIZED: u16 = 0x9004;
const TAG_OFFSET_TIME: u16 = 0x9010;
const TAG_OFFSET_TIME_ORIGINAL: u16 = 0x9011;
const TAG_OFFSET_TIME_DIGITIZED: u16 = 0x9012;
const TAG_USER_COMMENT: u16 = 0x9286;
const TAG_SUBSEC_TIME: u16 = 0x9290;
const TAG_SUBSEC_TIME_ORIGINAL: u16 = 0x9291;
const TAG_SUBSEC_TIME_DIGITIZED: u16 = 0x9292;

const TAG_GPS_VERSION: u16 = 0x0000;
const TAG_GPS_LAT_REF: u16 = 0x0001;
const TAG_GPS_LAT: u16 = 0x0002;
const TAG_GPS_LON_REF: u16 = 0x0003;
const TAG_GPS_LON: u16 = 0x0004;
const TAG_GPS_ALT_REF: u16 = 0x0005;
const TAG_GPS_ALT: u16 = 0x0006;

const CHARSET_ASCII: &[u8; 8] = b"ASCII\0\0\0";
const CHARSET_UNICODE: &[u8; 8] = b"UNICODE\0";
const CHARSET_JIS: &[u8; 8] = b"JIS\0\0\0\0\0";
const CHARSET_UNDEFINED: &[u8; 8] = &[0; 8];

/// The three EXIF date/time triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTag {
    /// IFD0 DateTime (modification time).
    Modified,
    Original,
    Digitized,
}

impl DateTag {
    pub const ALL: [DateTag; 3] = [DateTag::Original, DateTag::Digitized, DateTag::Modified];

    fn ids(self) -> (u16, u16, u16) {
        match self {
            DateTag::Modified => (TAG_DATE_TIME, TAG_SUBSEC_TIME, TAG_OFFSET_TIME),
            DateTag::Original => (TAG_DATE_TIME_ORIGINAL, TAG_SUBSEC_TIME_ORIGINAL, TAG_OFFSET_TIME_ORIGINAL),
            DateTag::Digitized => (
                TAG_DATE_TIME_DIGITIZED,
                TAG_SUBSEC_TIME_DIGITIZED,
                TAG_OFFSET_TIME_DIGITIZED,
            ),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DateTag::Modified => "EXIF DateTime",
            DateTag::Original => "EXIF DateTimeOriginal",
            DateTag::Digitized => "EXIF DateTimeDigitized",
        }
    }
}

// ============================================================================
// Artist list encoding
// ============================================================================

/// Split an Artist value into names. Names are separated by `;` and may be
/// quoted, with embedded quotes doubled. A missing close quote is tolerated.
fn split_artists(s: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();
    let mut quoted = false;
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => quoted = !quoted,
            ';' if !quoted => {
                let name = current.trim();
                if !name.is_empty() {
                    names.push(name.to_string());
                }
                current.clear();
            }
            c => current.push(c),
        }
    }
    let name = current.trim();
    if !name.is_empty() {
        names.push(name.to_string());
    }
    names
}

fn join_artists(names: &[String]) -> String {
    names
        .iter()
        .map(|n| {
            if n.contains(';') || n.contains('"') {
                format!("\"{}\"", n.replace('"', "\"\""))
            } else {
                n.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// ExifTags
// ============================================================================

/// An EXIF block (or a whole TIFF file) with typed tag accessors.
#[derive(Debug, Clone)]
pub struct ExifTags {
    tiff: Tiff,
}

impl ExifTags {
    pub fn new(tiff: Tiff) -> Self {
        ExifTags { tiff }
    }

    pub fn parse(data: Vec<u8>) -> Result<Self> {
        Ok(ExifTags::new(Tiff::parse(data).context("EXIF")?))
    }

    pub fn is_dirty(&self) -> bool {
        self.tiff.is_dirty()
    }

    pub fn is_empty(&self) -> bool {
        self.tiff.is_empty()
    }

    pub fn render(&mut self) -> Vec<u8> {
        self.tiff.render()
    }

    /// Raw IFD0 tag bytes. TIFF files carry their IPTC and XMP blocks here.
    pub fn ifd0_bytes(&self, id: u16) -> Option<&[u8]> {
        self.tiff.raw(self.ifd0(), id)
    }

    pub fn set_ifd0_bytes(&mut self, id: u16, typ: u16, value: &[u8]) -> bool {
        let ifd0 = self.ifd0();
        self.tiff.set_bytes(ifd0, id, typ, value)
    }

    fn ifd0(&self) -> IfdId {
        self.tiff.ifd0()
    }

    fn exif_ifd(&self) -> Option<IfdId> {
        self.tiff.sub_ifd(self.ifd0(), TAG_EXIF_IFD)
    }

    fn gps_ifd(&self) -> Option<IfdId> {
        self.tiff.sub_ifd(self.ifd0(), TAG_GPS_IFD)
    }

    /// The IFD a tag lives in, optionally creating the EXIF sub-IFD.
    fn ifd_for(&mut self, id: u16, create: bool) -> Option<IfdId> {
        if matches!(id, TAG_IMAGE_DESCRIPTION | TAG_DATE_TIME | TAG_ARTIST) {
            return Some(self.ifd0());
        }
        match self.exif_ifd() {
            Some(ifd) => Some(ifd),
            None if create => {
                let ifd0 = self.ifd0();
                Some(self.tiff.ensure_sub_ifd(ifd0, TAG_EXIF_IFD))
            }
            None => None,
        }
    }

    fn ascii(&self, ifd: Option<IfdId>, id: u16) -> String {
        ifd.and_then(|i| self.tiff.ascii(i, id)).unwrap_or_default()
    }

    /// Set an ASCII tag; an empty value removes it without creating IFDs.
    fn set_ascii(&mut self, id: u16, value: &str) -> bool {
        match self.ifd_for(id, !value.is_empty()) {
            Some(ifd) => self.tiff.set_ascii(ifd, id, value),
            None => false,
        }
    }

    // ── Artist ──

    pub fn artist(&self) -> Vec<String> {
        split_artists(&self.ascii(Some(self.ifd0()), TAG_ARTIST))
    }

    pub fn set_artist(&mut self, names: &[String]) -> bool {
        if self.artist() == names {
            return false;
        }
        self.set_ascii(TAG_ARTIST, &join_artists(names))
    }

    // ── ImageDescription ──

    pub fn image_description(&self) -> String {
        self.ascii(Some(self.ifd0()), TAG_IMAGE_DESCRIPTION)
    }

    pub fn set_image_description(&mut self, value: &str) -> bool {
        self.set_ascii(TAG_IMAGE_DESCRIPTION, value)
    }

    // ── UserComment ──

    /// The UserComment text. Comments in an unknown character set are
    /// ignored with a warning.
    pub fn user_comment(&self) -> String {
        let Some(data) = self.exif_ifd().and_then(|i| self.tiff.raw(i, TAG_USER_COMMENT)) else {
            return String::new();
        };
        if data.len() < 8 {
            log::warn!("EXIF UserComment is ill-formed, ignoring");
            return String::new();
        }
        let (prefix, text) = data.split_at(8);
        let trimmed = |s: String| s.trim_end_matches('\0').to_string();
        match prefix {
            p if p == CHARSET_ASCII => trimmed(String::from_utf8_lossy(text).into_owned()),
            p if p == CHARSET_UNICODE => {
                let units: Vec<u16> = text.chunks_exact(2).map(|c| self.tiff.order().u16(c)).collect();
                match String::from_utf16(&units) {
                    Ok(s) => trimmed(s),
                    Err(_) => {
                        log::warn!("EXIF UserComment is invalid UTF-16, ignoring");
                        String::new()
                    }
                }
            }
            p if p == CHARSET_JIS => trimmed(String::from_utf8_lossy(text).into_owned()),
            p if p == CHARSET_UNDEFINED => match std::str::from_utf8(text) {
                Ok(s) => trimmed(s.to_string()),
                Err(_) => {
                    log::warn!("EXIF UserComment is in an unknown character set, ignoring");
                    String::new()
                }
            },
            _ => {
                log::warn!("EXIF UserComment is in an unknown character set, ignoring");
                String::new()
            }
        }
    }

    pub fn set_user_comment(&mut self, value: &str) -> bool {
        if self.user_comment() == value && (value.is_empty() || self.exif_ifd().is_some()) {
            return false;
        }
        let Some(ifd) = self.ifd_for(TAG_USER_COMMENT, !value.is_empty()) else {
            return false;
        };
        if value.is_empty() {
            return self.tiff.remove(ifd, TAG_USER_COMMENT);
        }
        let mut data = Vec::with_capacity(value.len() + 8);
        if value.is_ascii() {
            data.extend_from_slice(CHARSET_ASCII);
            data.extend_from_slice(value.as_bytes());
        } else {
            data.extend_from_slice(CHARSET_UNICODE);
            let order = self.tiff.order();
            for unit in value.encode_utf16() {
                data.extend_from_slice(&order.put_u16(unit));
            }
        }
        self.tiff.set_bytes(ifd, TAG_USER_COMMENT, TYPE_UNDEFINED, &data)
    }

    // ── Date/time triples ──

    pub fn date_time(&self, which: DateTag) -> Result<DateTime> {
        let (dt, subsec, offset) = which.ids();
        let dt_ifd = if which == DateTag::Modified { Some(self.ifd0()) } else { self.exif_ifd() };
        let exif = self.exif_ifd();
        DateTime::parse_exif(
            &self.ascii(dt_ifd, dt),
            &self.ascii(exif, subsec),
            &self.ascii(exif, offset),
        )
        .with_context(|| which.label())
    }

    pub fn set_date_time(&mut self, which: DateTag, value: &DateTime) -> bool {
        let (dt, subsec, offset) = which.ids();
        let (dt_text, subsec_text, offset_text) = value.to_exif();
        let mut changed = self.set_ascii(dt, &dt_text);
        changed |= self.set_ascii(subsec, &subsec_text);
        changed |= self.set_ascii(offset, &offset_text);
        changed
    }

    // ── GPS ──

    pub fn gps(&self) -> Result<GpsCoords> {
        let Some(ifd) = self.gps_ifd() else {
            return Ok(GpsCoords::default());
        };
        let t = &self.tiff;
        let e = ExifGps {
            lat_ref: t.ascii(ifd, TAG_GPS_LAT_REF).unwrap_or_default(),
            lat: t.rationals(ifd, TAG_GPS_LAT).unwrap_or_default(),
            lon_ref: t.ascii(ifd, TAG_GPS_LON_REF).unwrap_or_default(),
            lon: t.rationals(ifd, TAG_GPS_LON).unwrap_or_default(),
            alt_ref: t.byte(ifd, TAG_GPS_ALT_REF),
            alt: t.rationals(ifd, TAG_GPS_ALT).and_then(|r| r.first().copied()),
        };
        GpsCoords::from_exif(&e).context("EXIF GPS")
    }

    pub fn set_gps(&mut self, value: &GpsCoords) -> bool {
        if self.gps().is_ok_and(|g| g == *value) {
            return false;
        }
        let e = value.to_exif();
        let ifd = match self.gps_ifd() {
            Some(ifd) => ifd,
            None if value.is_empty() => return false,
            None => {
                let ifd0 = self.ifd0();
                self.tiff.ensure_sub_ifd(ifd0, TAG_GPS_IFD)
            }
        };
        let t = &mut self.tiff;
        let mut changed = false;
        if value.is_empty() {
            for id in TAG_GPS_VERSION..=TAG_GPS_ALT {
                changed |= t.remove(ifd, id);
            }
            return changed;
        }
        changed |= t.set_bytes(ifd, TAG_GPS_VERSION, TYPE_BYTE, &[2, 3, 0, 0]);
        changed |= t.set_ascii(ifd, TAG_GPS_LAT_REF, &e.lat_ref);
        changed |= t.set_rationals(ifd, TAG_GPS_LAT, &e.lat);
        changed |= t.set_ascii(ifd, TAG_GPS_LON_REF, &e.lon_ref);
        changed |= t.set_rationals(ifd, TAG_GPS_LON, &e.lon);
        match (e.alt_ref, e.alt) {
            (Some(r), Some(a)) => {
                changed |= t.set_bytes(ifd, TAG_GPS_ALT_REF, TYPE_BYTE, &[r]);
                changed |= t.set_rationals(ifd, TAG_GPS_ALT, &[a]);
            }
            _ => {
                changed |= t.remove(ifd, TAG_GPS_ALT_REF);
                changed |= t.remove(ifd, TAG_GPS_ALT);
            }
        }
        changed
    }
}

/// A new, empty EXIF block in big-endian order.
pub fn empty_block() -> ExifTags {
    ExifTags::new(Tiff::new(ByteOrder::Big))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> ExifTags {
        let mut tags = empty_block();
        let bytes = tags.render();
        ExifTags::parse(bytes).unwrap()
    }

    // ── artist ──

    #[test]
    fn artist_lists_honour_quotes() {
        assert_eq!(split_artists("Ann; Bob"), vec!["Ann", "Bob"]);
        assert_eq!(split_artists(r#""Smith; Jones"; "Say ""hi""""#), vec!["Smith; Jones", r#"Say "hi""#]);
        assert_eq!(split_artists(r#""unterminated"#), vec!["unterminated"]);
        let names = vec!["A;B".to_string(), "C".to_string()];
        assert_eq!(split_artists(&join_artists(&names)), names);
    }

    #[test]
    fn artist_round_trips_through_the_block() {
        let mut tags = fresh();
        assert!(tags.set_artist(&["Steve".to_string()]));
        assert!(!tags.set_artist(&["Steve".to_string()]));
        let again = ExifTags::parse(tags.render()).unwrap();
        assert_eq!(again.artist(), vec!["Steve"]);
    }

    // ── dates ──

    #[test]
    fn date_triples_use_the_exif_sub_ifd() {
        let mut tags = fresh();
        let dt = DateTime::parse("2021-06-21T03:55:00.12-07:00").unwrap();
        assert!(tags.set_date_time(DateTag::Original, &dt));
        assert!(!tags.set_date_time(DateTag::Original, &dt));
        let mut again = ExifTags::parse(tags.render()).unwrap();
        assert_eq!(again.date_time(DateTag::Original).unwrap(), dt);
        assert!(again.date_time(DateTag::Modified).unwrap().is_empty());
        assert!(again.set_date_time(DateTag::Original, &DateTime::default()));
        let cleared = ExifTags::parse(again.render()).unwrap();
        assert!(cleared.date_time(DateTag::Original).unwrap().is_empty());
    }

    // ── comments and GPS ──

    #[test]
    fn user_comment_charsets() {
        let mut tags = fresh();
        assert!(tags.set_user_comment("plain"));
        assert_eq!(tags.user_comment(), "plain");
        assert!(tags.set_user_comment("café"));
        let again = ExifTags::parse(tags.render()).unwrap();
        assert_eq!(again.user_comment(), "café");
    }

    #[test]
    fn gps_is_written_and_cleared() {
        let mut tags = fresh();
        let gc = GpsCoords::parse("37.33544, -122.0199, 200ft").unwrap();
        assert!(tags.set_gps(&gc));
        let mut again = ExifTags::parse(tags.render()).unwrap();
        assert!(again.gps().unwrap().equivalent(&gc).is_some());
        assert!(again.set_gps(&GpsCoords::default()));
        let cleared = ExifTags::parse(again.render()).unwrap();
        assert!(cleared.gps().unwrap().is_empty());
    }
}
