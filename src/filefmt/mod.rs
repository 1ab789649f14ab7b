//! Media file handlers.
//!
//! [`MediaFile::open`] inspects a file's leading bytes (and the `.xmp`
//! extension for sidecars), picks a handler and parses every metadata
//! container the format carries. Parse failures do not stop the open: they
//! are recorded as problems, and a file with problems is never saved.
//!
//! | Format            | Containers                     | Writable |
//! |-------------------|--------------------------------|----------|
//! | JPEG              | EXIF, XMP, extended XMP, IPTC  | yes      |
//! | TIFF / DNG        | EXIF, XMP (700), IPTC (0x83BB) | yes      |
//! | XMP sidecar       | XMP                            | yes      |
//! | MP4 / MOV / MKV   | track creation date and GPS    | no       |
//! | GIF / PNG / WAV   | none                           | no       |

mod jpeg;
mod probe;
mod tiff;
mod xmp;

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::MetadataError;
use crate::provider::Providers;

/// The container format of a media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Jpeg,
    Tiff,
    Xmp,
    Video,
    Gif,
    Png,
    Wav,
}

/// File extensions the directory walker picks up.
const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "tif", "tiff", "dng", "orf", "rw2", "xmp", "mp4", "mov", "m4v", "mkv", "gif", "png", "wav",
];

impl Format {
    /// Identify a format from the first bytes of a file. `.xmp` files are
    /// sidecars whatever they contain.
    ///
    /// ```rust
    /// use photo_md::filefmt::Format;
    /// use std::path::Path;
    ///
    /// assert_eq!(Format::detect(Path::new("a.jpg"), b"\xFF\xD8\xFF\xE1"), Some(Format::Jpeg));
    /// assert_eq!(Format::detect(Path::new("a.xmp"), b""), Some(Format::Xmp));
    /// assert_eq!(Format::detect(Path::new("a.txt"), b"hello"), None);
    /// ```
    pub fn detect(path: &Path, head: &[u8]) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        if ext.as_deref() == Some("xmp") {
            return Some(Self::Xmp);
        }
        let at = |off: usize, magic: &[u8]| head.get(off..off + magic.len()) == Some(magic);
        if at(0, b"\xFF\xD8\xFF") {
            Some(Self::Jpeg)
        } else if at(0, b"II*\0") || at(0, b"MM\0*") || at(0, b"IIU\0") || at(0, b"IIRO") || at(0, b"MMOR") {
            Some(Self::Tiff)
        } else if at(0, b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if at(0, b"GIF87a") || at(0, b"GIF89a") {
            Some(Self::Gif)
        } else if at(0, b"RIFF") && at(8, b"WAVE") {
            Some(Self::Wav)
        } else if at(0, b"\x1A\x45\xDF\xA3") || [&b"ftyp"[..], b"moov", b"mdat", b"wide", b"free"].iter().any(|m| at(4, m)) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// True if `path` has an extension the engine handles.
pub fn is_media(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MEDIA_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// One format's view of an opened file.
trait Handler {
    fn providers(&mut self) -> Providers<'_>;

    /// Serialise the file with the current metadata.
    fn render(&mut self, padding: usize) -> Result<Vec<u8>>;
}

/// An opened media file and its metadata providers.
pub struct MediaFile {
    path: PathBuf,
    format: Format,
    handler: Box<dyn Handler>,
    problems: Vec<String>,
    read_only: Option<String>,
}

impl std::fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaFile")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("problems", &self.problems)
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl MediaFile {
    /// Read and parse `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let format = Format::detect(path, &data)
            .ok_or_else(|| anyhow::anyhow!("{}: unsupported file format", path.display()))?;
        log::debug!("{}: {format:?}", path.display());
        let mut problems = Vec::new();
        let mut read_only = None;
        let handler: Box<dyn Handler> = match format {
            Format::Jpeg => {
                let h = jpeg::JpegFile::open(&data, &mut problems)?;
                read_only = h.read_only();
                Box::new(h)
            }
            Format::Tiff => Box::new(tiff::TiffFile::open(data, &mut problems)?),
            Format::Xmp => Box::new(xmp::XmpFile::open(&data, &mut problems)),
            Format::Video => {
                read_only = Some("video files are read-only".to_string());
                Box::new(probe::VideoFile::open(path, &mut problems)?)
            }
            Format::Gif | Format::Png | Format::Wav => {
                read_only = Some(format!("{format:?} files are read-only"));
                Box::new(probe::Bare)
            }
        };
        for p in &problems {
            log::warn!("{}: {p}", path.display());
        }
        Ok(MediaFile {
            path: path.to_path_buf(),
            format,
            handler,
            problems,
            read_only,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Problems found while parsing. A file with problems cannot be saved.
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    /// Why the file cannot be written, if it cannot.
    pub fn read_only(&self) -> Option<&str> {
        self.read_only.as_deref()
    }

    pub fn providers(&mut self) -> Providers<'_> {
        self.handler.providers()
    }

    /// True if any provider was changed since the file was read.
    pub fn is_dirty(&mut self) -> bool {
        self.handler.providers().is_dirty()
    }

    /// Write the file back if it changed. Returns whether it was written.
    pub fn save(&mut self, padding: usize) -> Result<bool> {
        if !self.is_dirty() {
            return Ok(false);
        }
        if let Some(reason) = &self.read_only {
            return Err(MetadataError::Unsupported(reason.clone()).into());
        }
        if !self.problems.is_empty() {
            return Err(MetadataError::Problems(self.problems.join("; ")).into());
        }
        let bytes = self.handler.render(padding)?;
        write_atomic(&self.path, &bytes)?;
        log::info!("{}: saved", self.path.display());
        Ok(true)
    }
}

/// Replace `path` with `bytes` through a synced temp file in the same
/// directory. The original's permissions are kept.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(bytes).context("failed to write temp file")?;
    tmp.as_file().sync_all().context("failed to sync temp file")?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions()).ok();
    }
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
