//! Extended XMP: packets too large for one APP1 segment, split into chunks
//! keyed by the MD5 GUID of the full packet.

use anyhow::{bail, Result};
use std::collections::BTreeMap;

struct Partial {
    total: usize,
    chunks: Vec<(usize, Vec<u8>)>,
}

/// Reassemble extension chunks (each `GUID[32] total:u32 offset:u32 data`)
/// into whole packets, keyed by GUID.
pub fn reassemble(chunks: &[&[u8]]) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut partials: BTreeMap<String, Partial> = BTreeMap::new();
    for chunk in chunks {
        if chunk.len() < 40 {
            bail!("extended XMP chunk too short");
        }
        let guid = String::from_utf8_lossy(&chunk[..32]).into_owned();
        let total = u32::from_be_bytes([chunk[32], chunk[33], chunk[34], chunk[35]]) as usize;
        let offset = u32::from_be_bytes([chunk[36], chunk[37], chunk[38], chunk[39]]) as usize;
        let p = partials.entry(guid.clone()).or_insert(Partial {
            total,
            chunks: Vec::new(),
        });
        if p.total != total {
            bail!("extended XMP {guid}: inconsistent total length");
        }
        p.chunks.push((offset, chunk[40..].to_vec()));
    }
    let mut packets = BTreeMap::new();
    for (guid, mut p) in partials {
        p.chunks.sort_by_key(|(offset, _)| *offset);
        let mut packet = Vec::with_capacity(p.total);
        for (offset, data) in p.chunks {
            if offset != packet.len() {
                bail!("extended XMP {guid}: missing or overlapping chunk at {offset}");
            }
            packet.extend_from_slice(&data);
        }
        if packet.len() != p.total {
            bail!("extended XMP {guid}: incomplete packet");
        }
        packets.insert(guid, packet);
    }
    Ok(packets)
}
