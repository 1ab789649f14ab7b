//! Photoshop Image Resource blocks, as carried in JPEG APP13.

use anyhow::{bail, Result};

pub const IPTC_8BIM: &[u8] = b"8BIM";

/// Resource holding the IPTC IIM stream.
pub const RESOURCE_IPTC: u16 = 0x0404;
/// MD5 digest of the IPTC stream; stale once the stream is rewritten.
pub const RESOURCE_IPTC_DIGEST: u16 = 0x0425;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: u16,
    pub name: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Psir {
    resources: Vec<Resource>,
}

impl Psir {
    /// Parse the resource list that follows the `Photoshop 3.0\0` identifier.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut resources = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            // Trailing padding after the last resource.
            if data[pos..].iter().all(|b| *b == 0) {
                break;
            }
            if pos + 7 > data.len() || &data[pos..pos + 4] != IPTC_8BIM {
                bail!("invalid Photoshop resource at offset {pos}");
            }
            let id = u16::from_be_bytes([data[pos + 4], data[pos + 5]]);
            // Pascal string, padded so that length byte plus text is even.
            let pascal_len = data[pos + 6] as usize;
            let pascal_padded = if (pascal_len + 1) % 2 == 0 { pascal_len + 1 } else { pascal_len + 2 };
            let data_start = pos + 6 + pascal_padded;
            if data_start + 4 > data.len() {
                bail!("truncated Photoshop resource {id:#06x}");
            }
            let name = data[pos + 7..pos + 7 + pascal_len].to_vec();
            let data_len = u32::from_be_bytes([
                data[data_start],
                data[data_start + 1],
                data[data_start + 2],
                data[data_start + 3],
            ]) as usize;
            let body = data_start + 4;
            if body + data_len > data.len() {
                bail!("truncated Photoshop resource {id:#06x}");
            }
            resources.push(Resource {
                id,
                name,
                data: data[body..body + data_len].to_vec(),
            });
            pos = body + data_len + (data_len & 1);
        }
        Ok(Psir { resources })
    }

    pub fn get(&self, id: u16) -> Option<&[u8]> {
        self.resources.iter().find(|r| r.id == id).map(|r| r.data.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Replace the first resource with `id` (or append one); `None` removes
    /// every resource with that id.
    pub fn set(&mut self, id: u16, data: Option<Vec<u8>>) {
        match data {
            None => self.resources.retain(|r| r.id != id),
            Some(data) => match self.resources.iter_mut().find(|r| r.id == id) {
                Some(r) => r.data = data,
                None => self.resources.push(Resource {
                    id,
                    name: Vec::new(),
                    data,
                }),
            },
        }
    }

    pub fn render(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for r in &self.resources {
            out.extend_from_slice(IPTC_8BIM);
            out.extend_from_slice(&r.id.to_be_bytes());
            out.push(r.name.len() as u8);
            out.extend_from_slice(&r.name);
            if r.name.len() % 2 == 0 {
                out.push(0);
            }
            out.extend_from_slice(&(r.data.len() as u32).to_be_bytes());
            out.extend_from_slice(&r.data);
            if r.data.len() % 2 == 1 {
                out.push(0);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(b"8BIM\x04\x04\0\0\0\0\0\x03\x1c\x02\x00\0");
        b.extend_from_slice(b"8BIM\x04\x25\x03abc\0\0\0\x02XY");
        b
    }

    #[test]
    fn parses_and_round_trips() {
        let p = Psir::parse(&block()).unwrap();
        assert_eq!(p.get(RESOURCE_IPTC), Some(&b"\x1c\x02\x00"[..]));
        assert_eq!(p.get(RESOURCE_IPTC_DIGEST), Some(&b"XY"[..]));
        assert_eq!(p.render(), block());
    }

    #[test]
    fn replaces_and_removes() {
        let mut p = Psir::parse(&block()).unwrap();
        p.set(RESOURCE_IPTC_DIGEST, None);
        p.set(RESOURCE_IPTC, Some(b"\x1c\x02\x05\0\x01T".to_vec()));
        let p = Psir::parse(&p.render()).unwrap();
        assert_eq!(p.get(RESOURCE_IPTC_DIGEST), None);
        assert_eq!(p.get(RESOURCE_IPTC), Some(&b"\x1c\x02\x05\0\x01T"[..]));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Psir::parse(b"XXXX\x04\x04\0\0").is_err());
    }
}
