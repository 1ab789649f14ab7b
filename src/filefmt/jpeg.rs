use anyhow::Result;

use super::Handler;
use crate::container::jpeg::{Block, Jpeg};
use crate::container::rdf::namespace::*;
use crate::container::xmpext;
use crate::provider::{ExifProvider, IptcProvider, Provider, Providers, XmpProvider};
use crate::tags::exif::{empty_block, ExifTags};
use crate::tags::iptc::IptcTags;
use crate::tags::xmp::XmpTags;

/// Namespaces the engine manages. Extended XMP holding any of these makes
/// the file read-only, since it cannot be kept in step.
const MANAGED: &[&str] = &[NS_DC, NS_DIGIKAM, NS_EXIF, NS_IPTC_EXT, NS_LR, NS_PHOTOSHOP, NS_TIFF, NS_XMP];

pub(super) struct JpegFile {
    jpeg: Jpeg,
    exif: ExifProvider,
    xmp: XmpProvider,
    ext: Vec<XmpProvider>,
    iptc: IptcProvider,
}

impl JpegFile {
    pub fn open(data: &[u8], problems: &mut Vec<String>) -> Result<Self> {
        let jpeg = Jpeg::parse(data)?;
        problems.extend(jpeg.problems().iter().cloned());

        let exif = match jpeg.exif().map(ExifTags::parse) {
            Some(Ok(tags)) => tags,
            Some(Err(e)) => {
                problems.push(format!("{e:#}"));
                empty_block()
            }
            None => empty_block(),
        };
        let exif = ExifProvider::new(exif, problems);

        let xmp = match jpeg.xmp().and_then(|x| x.map(XmpTags::parse).transpose()) {
            Ok(tags) => tags.unwrap_or_default(),
            Err(e) => {
                problems.push(format!("XMP: {e:#}"));
                XmpTags::new()
            }
        };
        let xmp = XmpProvider::new(xmp, problems);

        let mut ext = Vec::new();
        match xmpext::reassemble(&jpeg.xmp_extension()) {
            Ok(packets) => {
                for (guid, packet) in packets {
                    match XmpTags::parse(&packet) {
                        Ok(tags) => ext.push(XmpProvider::extension(tags, problems)),
                        Err(e) => problems.push(format!("extended XMP {guid}: {e:#}")),
                    }
                }
            }
            Err(e) => problems.push(format!("{e:#}")),
        }

        let iptc = match IptcTags::from_psir(jpeg.psir().as_deref()) {
            Ok(tags) => tags,
            Err(e) => {
                problems.push(format!("{e:#}"));
                IptcTags::new()
            }
        };
        let iptc = IptcProvider::new(iptc, problems);

        Ok(JpegFile {
            jpeg,
            exif,
            xmp,
            ext,
            iptc,
        })
    }

    pub fn read_only(&self) -> Option<String> {
        self.ext
            .iter()
            .any(|x| x.tags().has_property_in(MANAGED))
            .then(|| "extended XMP carries managed properties".to_string())
    }
}

impl Handler for JpegFile {
    fn providers(&mut self) -> Providers<'_> {
        let mut list: Vec<&mut dyn Provider> = vec![&mut self.exif as &mut dyn Provider, &mut self.xmp];
        for x in self.ext.iter_mut() {
            list.push(x);
        }
        list.push(&mut self.iptc);
        Providers::new(list)
    }

    fn render(&mut self, padding: usize) -> Result<Vec<u8>> {
        let exif = self.exif.tags_mut();
        let exif_bytes = match (exif.is_dirty(), exif.is_empty()) {
            (false, _) => None,
            (true, true) => Some(None),
            (true, false) => Some(Some(exif.render())),
        };
        let xmp = self.xmp.tags();
        let xmp_bytes = match (xmp.is_dirty(), xmp.is_empty()) {
            (false, _) => None,
            (true, true) => Some(None),
            (true, false) => Some(Some(xmp.render(padding))),
        };
        let iptc = self.iptc.tags_mut();
        let psir_bytes = iptc.is_dirty().then(|| iptc.render_psir());
        self.jpeg.render(block(&exif_bytes), block(&xmp_bytes), block(&psir_bytes))
    }
}

/// `None` keeps the block, `Some(None)` removes it.
fn block(bytes: &Option<Option<Vec<u8>>>) -> Block<'_> {
    match bytes {
        None => Block::Keep,
        Some(None) => Block::Remove,
        Some(Some(b)) => Block::Replace(b),
    }
}
