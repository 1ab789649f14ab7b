//! The provider façade: every metadata container in a file answers the same
//! set of logical-field accessors.

mod exif;
mod iptc;
mod multi;
mod video;
mod xmp;

pub use exif::ExifProvider;
pub use iptc::IptcProvider;
pub use multi::Providers;
pub use video::VideoProvider;
pub use xmp::XmpProvider;

use anyhow::Result;

use crate::error::not_supported;
use crate::value::{DateTime, GpsCoords, Keyword, Location, Value};

/// Which container a provider reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Exif,
    Iptc,
    Xmp,
    /// Extended XMP from a JPEG. Read-only.
    XmpExt,
    Video,
}

/// How a tag relates to the field it carries, for consistency checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Written by the engine; must carry the value.
    Preferred,
    /// Cleared by the engine; must not carry the value.
    Deprecated,
    /// A flattened keyword list; carries leaves only.
    Flat,
    /// Read for display but never checked.
    Info,
}

/// One value held by one tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TagValue {
    pub label: String,
    pub value: Value,
    pub role: Role,
    /// Byte cap of the tag, zero for none.
    pub cap: usize,
}

impl TagValue {
    pub fn new(label: impl Into<String>, value: Value, role: Role) -> Self {
        TagValue {
            label: label.into(),
            value,
            role,
            cap: 0,
        }
    }

    pub fn capped(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }
}

/// A source and sink for the logical fields.
///
/// Getters return the provider's own best value, or empty. Setters return
/// `MetadataError::NotSupported` unless the provider carries the field.
/// Setting the current value must not dirty the provider.
pub trait Provider {
    fn kind(&self) -> Kind;

    /// True if a setter changed a backing tag since the file was read.
    fn is_dirty(&self) -> bool {
        false
    }

    fn artist(&self) -> String {
        String::new()
    }

    fn artist_tags(&self) -> Vec<TagValue> {
        Vec::new()
    }

    fn set_artist(&mut self, _value: &str) -> Result<()> {
        not_supported()
    }

    fn caption(&self) -> String {
        String::new()
    }

    fn caption_tags(&self) -> Vec<TagValue> {
        Vec::new()
    }

    fn set_caption(&mut self, _value: &str) -> Result<()> {
        not_supported()
    }

    fn datetime(&self) -> DateTime {
        DateTime::default()
    }

    fn datetime_tags(&self) -> Vec<TagValue> {
        Vec::new()
    }

    fn set_datetime(&mut self, _value: &DateTime) -> Result<()> {
        not_supported()
    }

    fn gps(&self) -> GpsCoords {
        GpsCoords::default()
    }

    fn gps_tags(&self) -> Vec<TagValue> {
        Vec::new()
    }

    fn set_gps(&mut self, _value: &GpsCoords) -> Result<()> {
        not_supported()
    }

    fn location(&self) -> Location {
        Location::default()
    }

    /// A location the image shows rather than where it was taken, used only
    /// when no provider has a capture location.
    fn location_shown(&self) -> Location {
        Location::default()
    }

    fn location_tags(&self) -> Vec<TagValue> {
        Vec::new()
    }

    fn set_location(&mut self, _value: &Location) -> Result<()> {
        not_supported()
    }

    fn title(&self) -> String {
        String::new()
    }

    fn title_tags(&self) -> Vec<TagValue> {
        Vec::new()
    }

    fn set_title(&mut self, _value: &str) -> Result<()> {
        not_supported()
    }

    /// The full hierarchical keyword set, category prefixes included.
    fn keywords(&self) -> Vec<Keyword> {
        Vec::new()
    }

    fn keyword_tags(&self) -> Vec<TagValue> {
        Vec::new()
    }

    /// Replace the full keyword set.
    fn set_keywords(&mut self, _value: &[Keyword]) -> Result<()> {
        not_supported()
    }

    /// Names of people with face regions.
    fn faces(&self) -> Vec<String> {
        Vec::new()
    }

    fn face_tags(&self) -> Vec<TagValue> {
        Vec::new()
    }

    /// Keep only the face regions naming `value`. Regions cannot be created.
    fn set_faces(&mut self, _value: &[String]) -> Result<()> {
        not_supported()
    }
}
