//! JPEG marker segment streams.

use anyhow::{bail, Result};

pub const EXIF_HEADER: &[u8] = b"Exif\0\0";
pub const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
pub const XMP_EXT_HEADER: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";
pub const IPTC_HEADER: &[u8] = b"Photoshop 3.0\0";

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const APP13: u8 = 0xED;

/// Largest payload one marker segment can hold.
const MAX_PAYLOAD: usize = 0xFFFF - 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Jfif,
    Exif,
    Xmp,
    XmpExt,
    Iptc,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub marker: u8,
    pub payload: Vec<u8>,
}

impl Segment {
    fn kind(&self) -> Kind {
        let p = self.payload.as_slice();
        match self.marker {
            APP0 if p.starts_with(b"JFIF\0") || p.starts_with(b"JFXX\0") => Kind::Jfif,
            APP1 if p.starts_with(EXIF_HEADER) => Kind::Exif,
            APP1 if p.starts_with(XMP_HEADER) => Kind::Xmp,
            APP1 if p.starts_with(XMP_EXT_HEADER) => Kind::XmpExt,
            APP13 if p.starts_with(IPTC_HEADER) => Kind::Iptc,
            _ => Kind::Other,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[0xFF, self.marker]);
        out.extend_from_slice(&((self.payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&self.payload);
    }
}

/// What to do with one metadata block when rendering.
#[derive(Debug, Clone, Copy)]
pub enum Block<'a> {
    Keep,
    Replace(&'a [u8]),
    Remove,
}

/// A JPEG split into its header segments and the scan data that follows.
#[derive(Debug, Clone)]
pub struct Jpeg {
    segments: Vec<Segment>,
    /// Everything from the SOS marker to the end of the file.
    scan: Vec<u8>,
    problems: Vec<String>,
}

impl Jpeg {
    /// Split `data` into segments. Structural damage after the SOI marker is
    /// recorded as a problem rather than failing.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 4 || data[0] != 0xFF || data[1] != SOI {
            bail!("not a JPEG file");
        }
        let mut jpeg = Jpeg {
            segments: Vec::new(),
            scan: Vec::new(),
            problems: Vec::new(),
        };
        let mut pos = 2;
        loop {
            if pos >= data.len() || data[pos] != 0xFF {
                jpeg.problems.push("JPEG: missing marker".to_string());
                return Ok(jpeg);
            }
            while pos < data.len() && data[pos] == 0xFF {
                pos += 1;
            }
            let Some(&marker) = data.get(pos) else {
                jpeg.problems.push("JPEG: premature end of file".to_string());
                return Ok(jpeg);
            };
            pos += 1;
            match marker {
                SOS => {
                    jpeg.scan = data[pos - 2..].to_vec();
                    if !jpeg.scan.ends_with(&[0xFF, EOI]) {
                        jpeg.problems.push("JPEG: premature end of file (no EOI marker)".to_string());
                    }
                    return Ok(jpeg);
                }
                EOI => {
                    jpeg.problems.push("JPEG: no image data".to_string());
                    return Ok(jpeg);
                }
                0x01 | 0xD0..=0xD7 => {
                    jpeg.problems.push(format!("JPEG: unexpected marker {marker:#04x}"));
                    return Ok(jpeg);
                }
                _ => {}
            }
            if pos + 2 > data.len() {
                jpeg.problems.push("JPEG: premature end of file".to_string());
                return Ok(jpeg);
            }
            let len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
            if len < 2 || pos + len > data.len() {
                jpeg.problems.push(format!("JPEG: truncated segment {marker:#04x}"));
                return Ok(jpeg);
            }
            jpeg.segments.push(Segment {
                marker,
                payload: data[pos + 2..pos + len].to_vec(),
            });
            pos += len;
        }
    }

    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    fn payloads(&self, kind: Kind, header: &[u8]) -> Vec<&[u8]> {
        self.segments
            .iter()
            .filter(|s| s.kind() == kind)
            .map(|s| &s.payload[header.len()..])
            .collect()
    }

    /// The TIFF block from the EXIF segment(s), concatenated.
    pub fn exif(&self) -> Option<Vec<u8>> {
        let parts = self.payloads(Kind::Exif, EXIF_HEADER);
        (!parts.is_empty()).then(|| parts.concat())
    }

    /// The main XMP packet, with trailing NULs trimmed.
    pub fn xmp(&self) -> Result<Option<&[u8]>> {
        let parts = self.payloads(Kind::Xmp, XMP_HEADER);
        match parts.as_slice() {
            [] => Ok(None),
            [one] => {
                let end = one.iter().rposition(|b| *b != 0).map_or(0, |p| p + 1);
                Ok(Some(&one[..end]))
            }
            _ => bail!("JPEG: multiple XMP segments"),
        }
    }

    /// Extended XMP chunk payloads, in file order.
    pub fn xmp_extension(&self) -> Vec<&[u8]> {
        self.payloads(Kind::XmpExt, XMP_EXT_HEADER)
    }

    /// The Photoshop resource block from APP13, concatenated.
    pub fn psir(&self) -> Option<Vec<u8>> {
        let parts = self.payloads(Kind::Iptc, IPTC_HEADER);
        (!parts.is_empty()).then(|| parts.concat())
    }

    /// Emit the file with the metadata segments in canonical order.
    pub fn render(&self, exif: Block, xmp: Block, psir: Block) -> Result<Vec<u8>> {
        if let Some(p) = self.problems.first() {
            bail!("{p}");
        }
        let mut out = vec![0xFF, SOI];
        for s in self.segments.iter().filter(|s| s.kind() == Kind::Jfif) {
            s.write(&mut out);
        }
        self.emit(&mut out, Kind::Exif, APP1, EXIF_HEADER, exif)?;
        self.emit(&mut out, Kind::Xmp, APP1, XMP_HEADER, xmp)?;
        for s in self.segments.iter().filter(|s| s.kind() == Kind::XmpExt) {
            s.write(&mut out);
        }
        self.emit(&mut out, Kind::Iptc, APP13, IPTC_HEADER, psir)?;
        for s in self.segments.iter().filter(|s| s.kind() == Kind::Other) {
            s.write(&mut out);
        }
        out.extend_from_slice(&self.scan);
        Ok(out)
    }

    fn emit(&self, out: &mut Vec<u8>, kind: Kind, marker: u8, header: &[u8], block: Block) -> Result<()> {
        match block {
            Block::Remove => {}
            Block::Keep => {
                for s in self.segments.iter().filter(|s| s.kind() == kind) {
                    s.write(out);
                }
            }
            Block::Replace(data) => {
                let chunk = MAX_PAYLOAD - header.len();
                if kind == Kind::Xmp && data.len() > chunk {
                    bail!("XMP packet too large for one JPEG segment");
                }
                for piece in data.chunks(chunk) {
                    let mut payload = header.to_vec();
                    payload.extend_from_slice(piece);
                    Segment { marker, payload }.write(out);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        Segment {
            marker,
            payload: payload.to_vec(),
        }
        .write(&mut out);
        out
    }

    fn sample() -> Vec<u8> {
        let mut f = vec![0xFF, SOI];
        f.extend(segment(APP0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0"));
        f.extend(segment(APP1, b"Exif\0\0MM\0*\0\0\0\x08\0\0\0\0\0\0"));
        f.extend(segment(0xFE, b"a comment"));
        f.extend([0xFF, SOS, 0, 2, 1, 2, 3, 0xFF, EOI]);
        f
    }

    #[test]
    fn unmodified_file_round_trips() {
        let data = sample();
        let jpeg = Jpeg::parse(&data).unwrap();
        assert!(jpeg.problems().is_empty());
        assert_eq!(jpeg.render(Block::Keep, Block::Keep, Block::Keep).unwrap(), data);
        assert_eq!(&jpeg.exif().unwrap()[..2], b"MM");
    }

    #[test]
    fn new_blocks_land_in_canonical_order() {
        let jpeg = Jpeg::parse(&sample()).unwrap();
        let out = jpeg
            .render(Block::Remove, Block::Replace(b"<x/>"), Block::Replace(b"8BIM"))
            .unwrap();
        let again = Jpeg::parse(&out).unwrap();
        let markers: Vec<u8> = again.segments.iter().map(|s| s.marker).collect();
        assert_eq!(markers, [APP0, APP1, APP13, 0xFE]);
        assert_eq!(again.xmp().unwrap(), Some(&b"<x/>"[..]));
        assert!(again.exif().is_none());
    }

    #[test]
    fn large_exif_is_split_across_segments() {
        let jpeg = Jpeg::parse(&sample()).unwrap();
        let big = vec![7u8; 100_000];
        let out = jpeg.render(Block::Replace(&big), Block::Keep, Block::Keep).unwrap();
        let again = Jpeg::parse(&out).unwrap();
        assert_eq!(again.exif().unwrap(), big);
    }

    #[test]
    fn truncation_is_a_problem() {
        let mut data = sample();
        data.truncate(data.len() - 2);
        let jpeg = Jpeg::parse(&data).unwrap();
        assert_eq!(jpeg.problems().len(), 1);
        assert!(jpeg.render(Block::Keep, Block::Keep, Block::Keep).is_err());
        assert!(Jpeg::parse(b"GIF89a").is_err());
    }

    #[test]
    fn xmp_trailing_nuls_are_trimmed() {
        let mut data = vec![0xFF, SOI];
        let mut payload = XMP_HEADER.to_vec();
        payload.extend_from_slice(b"<x/>\0\0\0");
        data.extend(segment(APP1, &payload));
        data.extend([0xFF, SOS, 0, 2, 0xFF, EOI]);
        let jpeg = Jpeg::parse(&data).unwrap();
        assert_eq!(jpeg.xmp().unwrap(), Some(&b"<x/>"[..]));
    }
}
