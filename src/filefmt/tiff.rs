use anyhow::{Context, Result};

use super::Handler;
use crate::container::tiff::{TYPE_BYTE, TYPE_UNDEFINED};
use crate::provider::{ExifProvider, IptcProvider, Provider, Providers, XmpProvider};
use crate::tags::exif::ExifTags;
use crate::tags::iptc::IptcTags;
use crate::tags::xmp::XmpTags;

/// IFD0 tag holding a bare IPTC IIM stream.
const TAG_IPTC: u16 = 0x83BB;
/// IFD0 tag holding the XMP packet.
const TAG_XMP: u16 = 700;

/// A TIFF (or DNG, or TIFF-like raw) file. The whole file is the EXIF
/// block; IPTC and XMP ride in IFD0 tags.
pub(super) struct TiffFile {
    exif: ExifProvider,
    xmp: XmpProvider,
    iptc: IptcProvider,
}

impl TiffFile {
    pub fn open(data: Vec<u8>, problems: &mut Vec<String>) -> Result<Self> {
        let tags = ExifTags::parse(data).context("TIFF")?;

        let iptc = match IptcTags::from_iim(tags.ifd0_bytes(TAG_IPTC)) {
            Ok(t) => t,
            Err(e) => {
                problems.push(format!("{e:#}"));
                IptcTags::new()
            }
        };
        let xmp = match tags.ifd0_bytes(TAG_XMP).map(XmpTags::parse).transpose() {
            Ok(t) => t.unwrap_or_default(),
            Err(e) => {
                problems.push(format!("XMP: {e:#}"));
                XmpTags::new()
            }
        };
        Ok(TiffFile {
            iptc: IptcProvider::new(iptc, problems),
            xmp: XmpProvider::new(xmp, problems),
            exif: ExifProvider::new(tags, problems),
        })
    }
}

impl Handler for TiffFile {
    fn providers(&mut self) -> Providers<'_> {
        Providers::new(vec![&mut self.exif as &mut dyn Provider, &mut self.xmp, &mut self.iptc])
    }

    fn render(&mut self, padding: usize) -> Result<Vec<u8>> {
        let iptc = self.iptc.tags_mut();
        if iptc.is_dirty() {
            let stream = iptc.render_iim().unwrap_or_default();
            self.exif.tags_mut().set_ifd0_bytes(TAG_IPTC, TYPE_UNDEFINED, &stream);
        }
        let xmp = self.xmp.tags();
        if xmp.is_dirty() {
            let packet = if xmp.is_empty() { Vec::new() } else { xmp.render(padding) };
            self.exif.tags_mut().set_ifd0_bytes(TAG_XMP, TYPE_BYTE, &packet);
        }
        Ok(self.exif.tags_mut().render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::exif::empty_block;

    fn tiff_bytes() -> Vec<u8> {
        let mut tags = empty_block();
        tags.set_artist(&["Someone".to_string()]);
        tags.render()
    }

    #[test]
    fn iptc_and_xmp_live_in_ifd0() {
        let mut problems = Vec::new();
        let mut f = TiffFile::open(tiff_bytes(), &mut problems).unwrap();
        assert!(problems.is_empty());
        f.providers().set_title("In IFD0").unwrap();
        let bytes = f.render(0).unwrap();

        let mut problems = Vec::new();
        let mut again = TiffFile::open(bytes, &mut problems).unwrap();
        assert!(problems.is_empty());
        assert_eq!(again.providers().title(), "In IFD0");
        assert_eq!(again.providers().artist(), "Someone");
        assert_eq!(again.iptc.title(), "In IFD0");
    }
}
