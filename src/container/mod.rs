//! Byte-level codecs for the metadata containers.

pub mod iim;
pub mod jpeg;
pub mod psir;
pub mod rdf;
pub mod tiff;
pub mod xmpext;
