//! Typed accessors over the raw containers.

pub mod exif;
pub mod iptc;
pub mod xmp;
