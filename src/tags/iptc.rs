//! Typed access to IPTC IIM DataSets.

use anyhow::{Context, Result};

use crate::container::iim::{Iim, UTF8_DESIGNATION};
use crate::container::psir::{Psir, RESOURCE_IPTC, RESOURCE_IPTC_DIGEST};
use crate::error::MetadataError;
use crate::value::{truncate, DateTime, Location};

/// An IIM DataSet: record, number, label and byte cap (0 for none).
#[derive(Debug, Clone, Copy)]
pub struct DataSetId {
    record: u8,
    id: u8,
    pub label: &'static str,
    pub max: usize,
}

const fn ds(record: u8, id: u8, label: &'static str, max: usize) -> DataSetId {
    DataSetId { record, id, label, max }
}

pub const CODED_CHARACTER_SET: DataSetId = ds(1, 90, "IPTC CodedCharacterSet", 0);
pub const OBJECT_NAME: DataSetId = ds(2, 5, "IPTC ObjectName", 64);
pub const KEYWORDS: DataSetId = ds(2, 25, "IPTC Keywords", 64);
pub const DATE_CREATED: DataSetId = ds(2, 55, "IPTC DateCreated", 0);
pub const TIME_CREATED: DataSetId = ds(2, 60, "IPTC TimeCreated", 0);
pub const DIGITAL_CREATION_DATE: DataSetId = ds(2, 62, "IPTC DigitalCreationDate", 0);
pub const DIGITAL_CREATION_TIME: DataSetId = ds(2, 63, "IPTC DigitalCreationTime", 0);
pub const BYLINE: DataSetId = ds(2, 80, "IPTC Byline", 32);
pub const CITY: DataSetId = ds(2, 90, "IPTC City", 32);
pub const SUBLOCATION: DataSetId = ds(2, 92, "IPTC Sublocation", 32);
pub const PROVINCE_STATE: DataSetId = ds(2, 95, "IPTC ProvinceState", 32);
pub const COUNTRY_CODE: DataSetId = ds(2, 100, "IPTC CountryCode", 3);
pub const COUNTRY_NAME: DataSetId = ds(2, 101, "IPTC CountryName", 64);
pub const HEADLINE: DataSetId = ds(2, 105, "IPTC Headline", 256);
pub const CAPTION_ABSTRACT: DataSetId = ds(2, 120, "IPTC Caption-Abstract", 2000);

/// Which IPTC date pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IptcDate {
    Created,
    DigitalCreation,
}

impl IptcDate {
    fn ids(self) -> (DataSetId, DataSetId) {
        match self {
            IptcDate::Created => (DATE_CREATED, TIME_CREATED),
            IptcDate::DigitalCreation => (DIGITAL_CREATION_DATE, DIGITAL_CREATION_TIME),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IptcDate::Created => "IPTC DateCreated",
            IptcDate::DigitalCreation => "IPTC DigitalCreation",
        }
    }
}

/// The IPTC block of a file, with its enclosing Photoshop resources when the
/// file carries them.
#[derive(Debug, Clone, Default)]
pub struct IptcTags {
    psir: Psir,
    iim: Iim,
    /// Why the block cannot be written, if it cannot.
    read_only: Option<String>,
}

impl IptcTags {
    /// A new block, created on first write.
    pub fn new() -> Self {
        IptcTags {
            psir: Psir::default(),
            iim: Iim::new(),
            read_only: None,
        }
    }

    /// From a JPEG's Photoshop resource block, if it has one.
    pub fn from_psir(data: Option<&[u8]>) -> Result<Self> {
        let Some(data) = data else {
            return Ok(Self::new());
        };
        let psir = Psir::parse(data).context("Photoshop resources")?;
        let iim = match psir.get(RESOURCE_IPTC) {
            Some(iim) => Iim::parse(iim).context("IPTC")?,
            None => Iim::new(),
        };
        Ok(Self::with(psir, iim))
    }

    /// From a bare IIM stream, as carried by TIFF tag 0x83BB.
    pub fn from_iim(data: Option<&[u8]>) -> Result<Self> {
        match data {
            Some(data) => Ok(Self::with(Psir::default(), Iim::parse(data).context("IPTC")?)),
            None => Ok(Self::new()),
        }
    }

    fn with(psir: Psir, iim: Iim) -> Self {
        let read_only = match iim.first(CODED_CHARACTER_SET.record, CODED_CHARACTER_SET.id) {
            Some(cs) if cs != UTF8_DESIGNATION => {
                log::warn!("IPTC: unsupported character set {cs:?}, block is read-only");
                Some("IPTC block uses an unsupported character set".to_string())
            }
            _ => None,
        };
        IptcTags { psir, iim, read_only }
    }

    pub fn read_only(&self) -> Option<&str> {
        self.read_only.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.iim.is_dirty()
    }

    /// True when the stream holds nothing beyond the character set and
    /// RecordVersion.
    pub fn is_empty(&self) -> bool {
        !self.iim.has_other_than(&[(1, 90), (2, 0)])
    }

    /// The resource block with the IPTC stream replaced and the stale digest
    /// dropped. `None` when the block holds nothing.
    pub fn render_psir(&mut self) -> Option<Vec<u8>> {
        if self.is_dirty() {
            let stream = self.render_iim();
            self.psir.set(RESOURCE_IPTC, stream);
            self.psir.set(RESOURCE_IPTC_DIGEST, None);
        }
        (!self.psir.is_empty()).then(|| self.psir.render())
    }

    /// The IIM stream, or `None` when it holds nothing beyond the character
    /// set and RecordVersion.
    pub fn render_iim(&self) -> Option<Vec<u8>> {
        (!self.is_empty()).then(|| self.iim.render())
    }

    fn check_writable(&self) -> Result<()> {
        match &self.read_only {
            Some(reason) => Err(MetadataError::Unsupported(reason.clone()).into()),
            None => Ok(()),
        }
    }

    // ── Strings ──

    fn decode(ds: DataSetId, bytes: &[u8]) -> String {
        match std::str::from_utf8(bytes) {
            Ok(s) => s.trim_end_matches('\0').to_string(),
            Err(_) => {
                log::warn!("{}: invalid UTF-8, shown lossily", ds.label);
                String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()
            }
        }
    }

    pub fn strings(&self, ds: DataSetId) -> Vec<String> {
        self.iim.get(ds.record, ds.id).into_iter().map(|b| Self::decode(ds, b)).collect()
    }

    pub fn string(&self, ds: DataSetId) -> String {
        self.strings(ds).into_iter().next().unwrap_or_default()
    }

    /// Replace every value of `ds`, truncating to its cap. Empty values are
    /// dropped. Returns whether the stream changed.
    pub fn set_strings(&mut self, ds: DataSetId, values: &[String]) -> Result<bool> {
        let encoded: Vec<Vec<u8>> = values
            .iter()
            .map(|v| truncate(v, ds.max))
            .filter(|v| !v.is_empty())
            .map(|v| v.as_bytes().to_vec())
            .collect();
        let current = self.iim.get(ds.record, ds.id);
        if current.len() == encoded.len() && current.iter().zip(&encoded).all(|(a, b)| *a == b.as_slice()) {
            return Ok(false);
        }
        self.check_writable()?;
        if values.iter().any(|v| !v.is_ascii()) {
            let cs = CODED_CHARACTER_SET;
            self.iim.set(cs.record, cs.id, &[UTF8_DESIGNATION.to_vec()]);
        }
        Ok(self.iim.set(ds.record, ds.id, &encoded))
    }

    pub fn set_string(&mut self, ds: DataSetId, value: &str) -> Result<bool> {
        if value.is_empty() {
            self.set_strings(ds, &[])
        } else {
            self.set_strings(ds, &[value.to_string()])
        }
    }

    // ── Dates ──

    pub fn date(&self, which: IptcDate) -> Result<DateTime> {
        let (date, time) = which.ids();
        DateTime::parse_iptc(&self.string(date), &self.string(time)).with_context(|| which.label())
    }

    pub fn set_date(&mut self, which: IptcDate, value: &DateTime) -> Result<bool> {
        let (date, time) = which.ids();
        let (d, t) = value.to_iptc();
        let mut changed = self.set_string(date, &d)?;
        changed |= self.set_string(time, &t)?;
        Ok(changed)
    }

    // ── Location ──

    pub fn location(&self) -> Location {
        Location {
            country_code: self.string(COUNTRY_CODE),
            country_name: self.string(COUNTRY_NAME),
            state: self.string(PROVINCE_STATE),
            city: self.string(CITY),
            sublocation: self.string(SUBLOCATION),
        }
    }

    pub fn set_location(&mut self, loc: &Location) -> Result<bool> {
        let mut changed = self.set_string(COUNTRY_CODE, &loc.country_code)?;
        changed |= self.set_string(COUNTRY_NAME, &loc.country_name)?;
        changed |= self.set_string(PROVINCE_STATE, &loc.state)?;
        changed |= self.set_string(CITY, &loc.city)?;
        changed |= self.set_string(SUBLOCATION, &loc.sublocation)?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_not_supported;

    #[test]
    fn strings_are_capped_and_idempotent() {
        let mut tags = IptcTags::new();
        let long = "x".repeat(80);
        assert!(tags.set_string(OBJECT_NAME, &long).unwrap());
        assert_eq!(tags.string(OBJECT_NAME).len(), 64);
        assert!(!tags.set_string(OBJECT_NAME, &long).unwrap());
    }

    #[test]
    fn non_ascii_marks_the_stream_utf8() {
        let mut tags = IptcTags::new();
        tags.set_strings(BYLINE, &["Zoë".to_string()]).unwrap();
        let stream = tags.render_iim().unwrap();
        let again = IptcTags::from_iim(Some(&stream)).unwrap();
        assert!(again.read_only().is_none());
        assert_eq!(again.strings(BYLINE), vec!["Zoë"]);
    }

    #[test]
    fn foreign_charset_is_read_only() {
        let stream = b"\x1c\x01\x5a\x00\x03\x1b\x2d\x41\x1c\x02\x05\x00\x02Hi".to_vec();
        let mut tags = IptcTags::from_iim(Some(&stream)).unwrap();
        assert_eq!(tags.string(OBJECT_NAME), "Hi");
        let err = tags.set_string(OBJECT_NAME, "Ho").unwrap_err();
        assert!(!is_not_supported(&err));
        assert!(err.downcast_ref::<MetadataError>().is_some());
    }

    #[test]
    fn rewrite_drops_the_digest() {
        let mut psir = Psir::default();
        psir.set(RESOURCE_IPTC, Some(b"\x1c\x02\x00\x00\x02\x00\x04".to_vec()));
        psir.set(RESOURCE_IPTC_DIGEST, Some(vec![0; 16]));
        let mut tags = IptcTags::from_psir(Some(&psir.render())).unwrap();
        let dt = DateTime::parse("2021-06-21T03:55:00-07:00").unwrap();
        assert!(tags.set_date(IptcDate::Created, &dt).unwrap());
        let out = Psir::parse(&tags.render_psir().unwrap()).unwrap();
        assert!(out.get(RESOURCE_IPTC_DIGEST).is_none());
        let again = IptcTags::from_psir(Some(&out.render())).unwrap();
        assert_eq!(again.date(IptcDate::Created).unwrap(), dt);
        assert_eq!(again.string(TIME_CREATED), "035500-0700");
    }
}
