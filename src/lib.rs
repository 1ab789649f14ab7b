//! # photo-md
//!
//! One view of a photo's descriptive metadata, however many containers
//! carry it. A JPEG may say when it was taken in EXIF, XMP and IPTC at
//! once, with different precision and sometimes different answers;
//! `photo-md` reads them all, reconciles them into twelve logical fields,
//! reports where they disagree and writes changes back to every container
//! in the form each one expects.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use photo_md::field;
//! use photo_md::filefmt::MediaFile;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut file = MediaFile::open(Path::new("IMG_0001.jpg"))?;
//!
//!     // Reconciled values.
//!     let title = field::TITLE.get(&file.providers());
//!     println!("title: {title:?}");
//!
//!     // Every tag behind a field, per container.
//!     for row in field::DATETIME.tags(&file.providers()) {
//!         println!("{}  {}", row.label, row.value);
//!     }
//!
//!     // Write to all containers at once, then save atomically.
//!     let value = field::TITLE.parse("Sunset over the bay")?;
//!     field::TITLE.set(&mut file.providers(), &[value])?;
//!     file.save(2048)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Layers
//!
//! - [`container`]: byte-level codecs (JPEG segments, TIFF IFDs, IPTC IIM,
//!   Photoshop resources, XMP RDF).
//! - [`tags`]: typed access to the tags inside one decoded container.
//! - [`provider`]: each container's answer for each field, and
//!   [`provider::Providers`] which reconciles them.
//! - [`field`]: the twelve logical fields, their parsing and checking.
//! - [`filefmt`]: opening and saving JPEG, TIFF, XMP sidecars and
//!   read-only media.
//! - [`operation`] and [`driver`]: the `md` command.

pub mod config;
pub mod container;
pub mod driver;
pub mod error;
pub mod field;
pub mod filefmt;
pub mod fileset;
pub mod operation;
pub mod provider;
pub mod tags;
pub mod value;
