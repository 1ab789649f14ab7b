//! TIFF-like IFD trees: EXIF blocks and whole TIFF/DNG files.
//!
//! Parsing reads IFD0, its next-IFD chain and the EXIF, GPS and Interop
//! sub-IFDs eagerly, recording every byte range it consumes. Rendering keeps
//! the source bytes and rewrites only what changed: IFDs whose layout is
//! unchanged are patched in place, IFDs that grew or lost tags are
//! re-serialised into freed or appended space and their parents repointed.
//! Image data referenced by offset tags (strips, tiles, thumbnails) never
//! moves.

use anyhow::{anyhow, bail, Context, Result};

pub const TYPE_BYTE: u16 = 1;
pub const TYPE_ASCII: u16 = 2;
pub const TYPE_SHORT: u16 = 3;
pub const TYPE_LONG: u16 = 4;
pub const TYPE_RATIONAL: u16 = 5;
pub const TYPE_UNDEFINED: u16 = 7;

pub const TAG_EXIF_IFD: u16 = 0x8769;
pub const TAG_GPS_IFD: u16 = 0x8825;
pub const TAG_INTEROP_IFD: u16 = 0xA005;

const SUB_IFD_TAGS: [u16; 3] = [TAG_EXIF_IFD, TAG_GPS_IFD, TAG_INTEROP_IFD];

fn type_size(typ: u16) -> Option<usize> {
    match typ {
        1 | 2 | 6 | 7 => Some(1),
        3 | 8 => Some(2),
        4 | 9 | 11 | 13 | 18 => Some(4),
        5 | 10 | 12 => Some(8),
        _ => None,
    }
}

fn even(n: usize) -> usize {
    n + (n & 1)
}

/// Bytes of out-of-line storage a value of `len` bytes needs.
fn storage(len: usize) -> usize {
    if len <= 4 { 0 } else { even(len) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub fn u16(self, b: &[u8]) -> u16 {
        let b = [b[0], b[1]];
        match self {
            ByteOrder::Little => u16::from_le_bytes(b),
            ByteOrder::Big => u16::from_be_bytes(b),
        }
    }

    pub fn u32(self, b: &[u8]) -> u32 {
        let b = [b[0], b[1], b[2], b[3]];
        match self {
            ByteOrder::Little => u32::from_le_bytes(b),
            ByteOrder::Big => u32::from_be_bytes(b),
        }
    }

    pub fn put_u16(self, v: u16) -> [u8; 2] {
        match self {
            ByteOrder::Little => v.to_le_bytes(),
            ByteOrder::Big => v.to_be_bytes(),
        }
    }

    pub fn put_u32(self, v: u32) -> [u8; 4] {
        match self {
            ByteOrder::Little => v.to_le_bytes(),
            ByteOrder::Big => v.to_be_bytes(),
        }
    }
}

/// Index of an IFD within a [`Tiff`].
pub type IfdId = usize;

#[derive(Debug, Clone)]
pub struct Tag {
    pub id: u16,
    pub typ: u16,
    pub count: u32,
    /// The value bytes in the block's byte order, without inline padding.
    pub data: Vec<u8>,
    /// Where out-of-line data lived in the source.
    src_offset: Option<u32>,
    /// The IFD this pointer tag leads to.
    sub: Option<IfdId>,
}

#[derive(Debug, Clone, Default)]
struct Ifd {
    /// Source offset of the table; zero for an IFD created since parsing.
    offset: u32,
    tags: Vec<Tag>,
    next: Option<IfdId>,
    /// Layout unchanged but some bytes differ.
    dirty: bool,
    /// Must be re-serialised elsewhere.
    resize: bool,
    /// The table is followed by a next-IFD pointer.
    next_slot: bool,
    /// Source byte ranges owned by the table and its data.
    owned: Vec<(u32, u32)>,
}

impl Ifd {
    fn encoded_len(&self) -> usize {
        2 + 12 * self.tags.len() + 4 + self.tags.iter().map(|t| storage(t.data.len())).sum::<usize>()
    }
}

/// A parsed TIFF-like block.
#[derive(Debug, Clone)]
pub struct Tiff {
    order: ByteOrder,
    src: Vec<u8>,
    ifds: Vec<Ifd>,
    root: IfdId,
    /// A tag was set or removed since parsing.
    edited: bool,
}

/// Consumed byte ranges, kept sorted, for overlap detection.
struct Claims(Vec<(u32, u32)>);

impl Claims {
    fn claim(&mut self, start: u32, len: u32, total: usize) -> Result<()> {
        let end = start.checked_add(len).ok_or_else(|| anyhow!("IFD offset out of range"))?;
        if end as usize > total {
            bail!("IFD offset out of range");
        }
        if len == 0 {
            return Ok(());
        }
        let pos = self.0.partition_point(|r| r.0 < start);
        if pos > 0 && self.0[pos - 1].1 > start {
            bail!("overlapping IFD data");
        }
        if pos < self.0.len() && self.0[pos].0 < end {
            bail!("overlapping IFD data");
        }
        self.0.insert(pos, (start, end));
        Ok(())
    }
}

impl Tiff {
    /// An empty block with an empty IFD0, for files that had no EXIF. It is
    /// not dirty until a tag is set.
    pub fn new(order: ByteOrder) -> Self {
        let mut src = match order {
            ByteOrder::Little => b"II*\0".to_vec(),
            ByteOrder::Big => b"MM\0*".to_vec(),
        };
        src.extend_from_slice(&[0; 4]);
        Tiff {
            order,
            src,
            ifds: vec![Ifd {
                resize: true,
                next_slot: true,
                ..Ifd::default()
            }],
            root: 0,
            edited: false,
        }
    }

    pub fn parse(src: Vec<u8>) -> Result<Self> {
        if src.len() < 8 {
            bail!("TIFF header truncated");
        }
        let order = match &src[..2] {
            b"II" => ByteOrder::Little,
            b"MM" => ByteOrder::Big,
            _ => bail!("invalid TIFF byte order"),
        };
        let magic = order.u16(&src[2..]);
        if !matches!(magic, 42 | 0x55 | 0x4F52) {
            bail!("invalid TIFF magic number {magic:#x}");
        }
        let ifd0 = order.u32(&src[4..]);
        let mut tiff = Tiff {
            order,
            src,
            ifds: Vec::new(),
            root: 0,
            edited: false,
        };
        let mut claims = Claims(Vec::new());
        claims.claim(0, 8, tiff.src.len())?;
        tiff.root = tiff.read_ifd(ifd0, true, &mut claims, 0).context("IFD0")?;
        Ok(tiff)
    }

    fn read_ifd(&mut self, offset: u32, chain: bool, claims: &mut Claims, depth: usize) -> Result<IfdId> {
        let order = self.order;
        let total = self.src.len();
        let start = offset as usize;
        if start + 2 > total {
            bail!("IFD offset out of range");
        }
        let count = order.u16(&self.src[start..]) as usize;
        let table_end = start + 2 + 12 * count;
        if table_end > total {
            bail!("IFD table truncated");
        }
        let mut tags = Vec::with_capacity(count);
        let mut owned = Vec::new();
        let mut data_at_table_end = false;
        for i in 0..count {
            let e = &self.src[start + 2 + 12 * i..start + 14 + 12 * i];
            let id = order.u16(e);
            let typ = order.u16(&e[2..]);
            let n = order.u32(&e[4..]);
            let size = type_size(typ).ok_or_else(|| anyhow!("unknown IFD tag type {typ} for tag {id:#06x}"))?;
            let len = size
                .checked_mul(n as usize)
                .filter(|l| *l <= total)
                .ok_or_else(|| anyhow!("IFD tag {id:#06x} count out of range"))?;
            let (data, src_offset) = if len <= 4 {
                (e[8..8 + len].to_vec(), None)
            } else {
                let at = order.u32(&e[8..]);
                claims.claim(at, len as u32, total).with_context(|| format!("tag {id:#06x}"))?;
                owned.push((at, at + len as u32));
                if at as usize == table_end {
                    data_at_table_end = true;
                }
                (self.src[at as usize..at as usize + len].to_vec(), Some(at))
            };
            tags.push(Tag {
                id,
                typ,
                count: n,
                data,
                src_offset,
                sub: None,
            });
        }
        let has_next = !data_at_table_end && table_end + 4 <= total;
        let table_len = (table_end - start + if has_next { 4 } else { 0 }) as u32;
        claims.claim(offset, table_len, total)?;
        owned.push((offset, offset + table_len));
        tags.sort_by_key(|t| t.id);

        let id = self.ifds.len();
        self.ifds.push(Ifd {
            offset,
            owned,
            next_slot: has_next,
            ..Ifd::default()
        });
        if depth < 4 {
            for tag in &mut tags {
                if SUB_IFD_TAGS.contains(&tag.id) && tag.count == 1 && tag.data.len() == 4 {
                    let child = order.u32(&tag.data);
                    if child != 0 {
                        let sub = self
                            .read_ifd(child, false, claims, depth + 1)
                            .with_context(|| format!("sub-IFD {:#06x}", tag.id))?;
                        tag.sub = Some(sub);
                    }
                }
            }
        }
        self.ifds[id].tags = tags;
        if chain && has_next {
            let next = order.u32(&self.src[table_end..]);
            if next != 0 {
                let n = self.read_ifd(next, true, claims, depth).context("next IFD")?;
                self.ifds[id].next = Some(n);
            }
        }
        log::debug!("IFD at {offset:#x}: {count} tags");
        Ok(id)
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn ifd0(&self) -> IfdId {
        self.root
    }

    /// True when IFD0 carries no tags, so the block can be dropped.
    pub fn is_empty(&self) -> bool {
        self.ifds[self.root].tags.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.edited && self.ifds.iter().any(|i| i.dirty || i.resize)
    }

    pub fn sub_ifd(&self, ifd: IfdId, tag: u16) -> Option<IfdId> {
        self.tag(ifd, tag).and_then(|t| t.sub)
    }

    /// The sub-IFD behind `tag`, created (with its pointer) if missing.
    pub fn ensure_sub_ifd(&mut self, parent: IfdId, tag: u16) -> IfdId {
        if let Some(sub) = self.sub_ifd(parent, tag) {
            return sub;
        }
        let id = self.ifds.len();
        self.ifds.push(Ifd {
            resize: true,
            next_slot: true,
            ..Ifd::default()
        });
        let data = self.order.put_u32(0).to_vec();
        self.put(parent, tag, TYPE_LONG, 1, data);
        if let Some(t) = self.ifds[parent].tags.iter_mut().find(|t| t.id == tag) {
            t.sub = Some(id);
        }
        id
    }

    pub fn tag(&self, ifd: IfdId, id: u16) -> Option<&Tag> {
        self.ifds[ifd].tags.iter().find(|t| t.id == id)
    }

    pub fn tags(&self, ifd: IfdId) -> &[Tag] {
        &self.ifds[ifd].tags
    }

    /// An ASCII value with trailing NULs removed. Non-UTF-8 bytes are read
    /// as Latin-1.
    pub fn ascii(&self, ifd: IfdId, id: u16) -> Option<String> {
        let t = self.tag(ifd, id).filter(|t| t.typ == TYPE_ASCII || t.typ == TYPE_UNDEFINED)?;
        let end = t.data.iter().rposition(|b| *b != 0).map_or(0, |p| p + 1);
        let bytes = &t.data[..end];
        Some(match std::str::from_utf8(bytes) {
            Ok(s) => s.trim().to_string(),
            Err(_) => bytes.iter().map(|b| char::from(*b)).collect::<String>().trim().to_string(),
        })
    }

    pub fn rationals(&self, ifd: IfdId, id: u16) -> Option<Vec<(u32, u32)>> {
        let t = self.tag(ifd, id).filter(|t| t.typ == TYPE_RATIONAL)?;
        Some(
            t.data
                .chunks_exact(8)
                .map(|c| (self.order.u32(c), self.order.u32(&c[4..])))
                .collect(),
        )
    }

    pub fn byte(&self, ifd: IfdId, id: u16) -> Option<u8> {
        let t = self.tag(ifd, id).filter(|t| t.typ == TYPE_BYTE || t.typ == TYPE_UNDEFINED)?;
        t.data.first().copied()
    }

    pub fn raw(&self, ifd: IfdId, id: u16) -> Option<&[u8]> {
        self.tag(ifd, id).map(|t| t.data.as_slice())
    }

    /// Set a tag's raw value. Returns whether anything changed.
    pub fn put(&mut self, ifd: IfdId, id: u16, typ: u16, count: u32, data: Vec<u8>) -> bool {
        let changed = self.replace(ifd, id, typ, count, data);
        self.edited |= changed;
        changed
    }

    fn replace(&mut self, ifd: IfdId, id: u16, typ: u16, count: u32, data: Vec<u8>) -> bool {
        let node = &mut self.ifds[ifd];
        match node.tags.iter_mut().find(|t| t.id == id) {
            Some(t) if t.typ == typ && t.count == count && t.data == data => false,
            Some(t) => {
                if storage(t.data.len()) != storage(data.len()) || (t.src_offset.is_none() && data.len() > 4) {
                    node.resize = true;
                } else {
                    node.dirty = true;
                }
                t.typ = typ;
                t.count = count;
                t.data = data;
                true
            }
            None => {
                let pos = node.tags.partition_point(|t| t.id < id);
                node.tags.insert(
                    pos,
                    Tag {
                        id,
                        typ,
                        count,
                        data,
                        src_offset: None,
                        sub: None,
                    },
                );
                node.resize = true;
                true
            }
        }
    }

    pub fn remove(&mut self, ifd: IfdId, id: u16) -> bool {
        let changed = self.unlink(ifd, id);
        self.edited |= changed;
        changed
    }

    fn unlink(&mut self, ifd: IfdId, id: u16) -> bool {
        let node = &mut self.ifds[ifd];
        match node.tags.iter().position(|t| t.id == id) {
            Some(pos) => {
                node.tags.remove(pos);
                node.resize = true;
                true
            }
            None => false,
        }
    }

    /// Set a NUL-terminated ASCII value; empty removes the tag.
    pub fn set_ascii(&mut self, ifd: IfdId, id: u16, value: &str) -> bool {
        if value.is_empty() {
            return self.remove(ifd, id);
        }
        if self.ascii(ifd, id).as_deref() == Some(value) && self.tag(ifd, id).is_some_and(|t| t.typ == TYPE_ASCII) {
            return false;
        }
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        let count = data.len() as u32;
        self.put(ifd, id, TYPE_ASCII, count, data)
    }

    pub fn set_rationals(&mut self, ifd: IfdId, id: u16, values: &[(u32, u32)]) -> bool {
        if values.is_empty() {
            return self.remove(ifd, id);
        }
        let mut data = Vec::with_capacity(values.len() * 8);
        for (n, d) in values {
            data.extend_from_slice(&self.order.put_u32(*n));
            data.extend_from_slice(&self.order.put_u32(*d));
        }
        self.put(ifd, id, TYPE_RATIONAL, values.len() as u32, data)
    }

    pub fn set_bytes(&mut self, ifd: IfdId, id: u16, typ: u16, value: &[u8]) -> bool {
        if value.is_empty() {
            return self.remove(ifd, id);
        }
        self.put(ifd, id, typ, value.len() as u32, value.to_vec())
    }

    /// Drop pointer tags whose sub-IFD has become empty, bottom-up.
    fn prune(&mut self) {
        loop {
            let mut pruned = false;
            for i in 0..self.ifds.len() {
                let empty: Vec<u16> = self.ifds[i]
                    .tags
                    .iter()
                    .filter(|t| t.sub.is_some_and(|s| self.ifds[s].tags.is_empty()))
                    .map(|t| t.id)
                    .collect();
                for id in empty {
                    self.unlink(i, id);
                    pruned = true;
                }
            }
            if !pruned {
                return;
            }
        }
    }

    fn reachable(&self) -> Vec<IfdId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(i) = stack.pop() {
            out.push(i);
            if let Some(n) = self.ifds[i].next {
                stack.push(n);
            }
            stack.extend(self.ifds[i].tags.iter().rev().filter_map(|t| t.sub));
        }
        out
    }

    /// Serialise the block. Returns the source bytes unchanged when nothing
    /// was modified.
    pub fn render(&mut self) -> Vec<u8> {
        self.prune();
        if !self.is_dirty() {
            return self.src.clone();
        }
        let order = self.order;
        let live = self.reachable();
        let mut out = self.src.clone();

        // Release the space of IFDs that move.
        let mut free: Vec<(usize, usize)> = Vec::new();
        for &i in &live {
            if self.ifds[i].resize && self.ifds[i].offset != 0 {
                for &(s, e) in &self.ifds[i].owned {
                    out[s as usize..e as usize].fill(0);
                    free.push((s as usize, e as usize));
                }
            }
        }
        free.sort_unstable();
        let mut merged: Vec<(usize, usize)> = Vec::new();
        for (s, e) in free {
            match merged.last_mut() {
                Some(last) if last.1 >= s => last.1 = last.1.max(e),
                _ => merged.push((s, e)),
            }
        }
        if merged.last().is_some_and(|r| r.1 == out.len()) {
            if let Some((s, _)) = merged.pop() {
                out.truncate(s.max(8));
            }
        }

        // Place moved IFDs, largest first.
        let mut offsets: Vec<u32> = self.ifds.iter().map(|i| i.offset).collect();
        let mut moving: Vec<IfdId> = live.iter().copied().filter(|&i| self.ifds[i].resize).collect();
        moving.sort_by_key(|&i| std::cmp::Reverse(self.ifds[i].encoded_len()));
        for &i in &moving {
            let len = self.ifds[i].encoded_len();
            let slot = merged.iter().position(|&(s, e)| even(s) + len <= e);
            let at = match slot {
                Some(p) => {
                    let at = even(merged[p].0);
                    merged[p].0 = at + len;
                    at
                }
                None => {
                    if out.len() % 2 == 1 {
                        out.push(0);
                    }
                    let at = out.len();
                    out.resize(at + len, 0);
                    at
                }
            };
            offsets[i] = at as u32;
        }

        // Repoint parents at moved children.
        for &i in &live {
            let mut changed = self.ifds[i].next.is_some_and(|n| offsets[n] != self.ifds[n].offset);
            for t in &mut self.ifds[i].tags {
                if let Some(s) = t.sub {
                    let data = order.put_u32(offsets[s]).to_vec();
                    if t.data != data {
                        t.data = data;
                        changed = true;
                    }
                }
            }
            if changed && !self.ifds[i].resize {
                self.ifds[i].dirty = true;
            }
        }
        if offsets[self.root] != self.ifds[self.root].offset || self.ifds[self.root].offset == 0 {
            out[4..8].copy_from_slice(&order.put_u32(offsets[self.root]));
        }

        for &i in &live {
            let ifd = &self.ifds[i];
            if !ifd.resize && !ifd.dirty {
                continue;
            }
            let at = offsets[i] as usize;
            let next = ifd.next.map_or(0, |n| offsets[n]);
            let table_len = 2 + 12 * ifd.tags.len();
            out[at..at + 2].copy_from_slice(&order.put_u16(ifd.tags.len() as u16));
            let mut data_at = at + table_len + 4;
            for (k, t) in ifd.tags.iter().enumerate() {
                let e = at + 2 + 12 * k;
                out[e..e + 2].copy_from_slice(&order.put_u16(t.id));
                out[e + 2..e + 4].copy_from_slice(&order.put_u16(t.typ));
                out[e + 4..e + 8].copy_from_slice(&order.put_u32(t.count));
                if t.data.len() <= 4 {
                    let mut inline = [0u8; 4];
                    inline[..t.data.len()].copy_from_slice(&t.data);
                    out[e + 8..e + 12].copy_from_slice(&inline);
                    continue;
                }
                let where_ = if ifd.resize {
                    let w = data_at;
                    data_at += even(t.data.len());
                    w
                } else {
                    t.src_offset.map_or(data_at, |o| o as usize)
                };
                out[e + 8..e + 12].copy_from_slice(&order.put_u32(where_ as u32));
                out[where_..where_ + t.data.len()].copy_from_slice(&t.data);
            }
            // An in-place table without a next slot keeps its layout.
            if ifd.resize || ifd.next_slot {
                out[at + table_len..at + table_len + 4].copy_from_slice(&order.put_u32(next));
            }
        }
        log::debug!("TIFF block rendered: {} -> {} bytes", self.src.len(), out.len());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut t = Tiff::new(ByteOrder::Big);
        let ifd0 = t.ifd0();
        t.set_ascii(ifd0, 0x010E, "A long image description");
        t.set_ascii(ifd0, 0x013B, "Ann");
        let exif = t.ensure_sub_ifd(ifd0, TAG_EXIF_IFD);
        t.set_ascii(exif, 0x9003, "2021:06:21 03:55:00");
        t.render()
    }

    #[test]
    fn builds_and_reparses() {
        let bytes = sample();
        assert_eq!(&bytes[..4], b"MM\0*");
        let t = Tiff::parse(bytes).unwrap();
        let ifd0 = t.ifd0();
        assert_eq!(t.ascii(ifd0, 0x010E).as_deref(), Some("A long image description"));
        assert_eq!(t.ascii(ifd0, 0x013B).as_deref(), Some("Ann"));
        let exif = t.sub_ifd(ifd0, TAG_EXIF_IFD).unwrap();
        assert_eq!(t.ascii(exif, 0x9003).as_deref(), Some("2021:06:21 03:55:00"));
    }

    #[test]
    fn new_block_is_clean_until_set() {
        let mut t = Tiff::new(ByteOrder::Little);
        assert!(!t.is_dirty());
        let ifd0 = t.ifd0();
        assert!(!t.set_ascii(ifd0, 0x013B, ""));
        assert!(!t.is_dirty());
        assert!(t.set_ascii(ifd0, 0x013B, "Ann"));
        assert!(t.is_dirty());
    }

    #[test]
    fn unmodified_block_is_returned_verbatim() {
        let bytes = sample();
        let mut t = Tiff::parse(bytes.clone()).unwrap();
        assert!(!t.set_ascii(t.ifd0(), 0x013B, "Ann"));
        assert_eq!(t.render(), bytes);
    }

    #[test]
    fn same_size_change_is_patched_in_place() {
        let bytes = sample();
        let mut t = Tiff::parse(bytes.clone()).unwrap();
        let ifd0 = t.ifd0();
        assert!(t.set_ascii(ifd0, 0x010E, "A long image descriptioN"));
        let out = t.render();
        assert_eq!(out.len(), bytes.len());
        let diff: Vec<usize> = (0..out.len()).filter(|&i| out[i] != bytes[i]).collect();
        assert_eq!(diff.len(), 1);
        assert_eq!(
            Tiff::parse(out).unwrap().ascii(0, 0x010E).as_deref(),
            Some("A long image descriptioN")
        );
    }

    #[test]
    fn growth_relocates_and_keeps_other_tags() {
        let mut t = Tiff::parse(sample()).unwrap();
        let ifd0 = t.ifd0();
        let exif = t.sub_ifd(ifd0, TAG_EXIF_IFD).unwrap();
        t.set_ascii(exif, 0x9010, "-07:00");
        t.set_ascii(ifd0, 0x013B, "Someone with a much longer name");
        let t = Tiff::parse(t.render()).unwrap();
        let ifd0 = t.ifd0();
        let exif = t.sub_ifd(ifd0, TAG_EXIF_IFD).unwrap();
        assert_eq!(t.ascii(ifd0, 0x013B).as_deref(), Some("Someone with a much longer name"));
        assert_eq!(t.ascii(ifd0, 0x010E).as_deref(), Some("A long image description"));
        assert_eq!(t.ascii(exif, 0x9003).as_deref(), Some("2021:06:21 03:55:00"));
        assert_eq!(t.ascii(exif, 0x9010).as_deref(), Some("-07:00"));
    }

    #[test]
    fn empty_sub_ifd_is_pruned() {
        let mut t = Tiff::parse(sample()).unwrap();
        let ifd0 = t.ifd0();
        let exif = t.sub_ifd(ifd0, TAG_EXIF_IFD).unwrap();
        t.set_ascii(exif, 0x9003, "");
        let t = Tiff::parse(t.render()).unwrap();
        assert!(t.tag(t.ifd0(), TAG_EXIF_IFD).is_none());
    }

    #[test]
    fn rejects_unknown_types_and_overlaps() {
        let mut bytes = sample();
        // First entry's type field.
        bytes[8 + 2 + 2..8 + 2 + 4].copy_from_slice(&[0, 99]);
        let err = Tiff::parse(bytes).unwrap_err();
        assert!(format!("{err:#}").contains("unknown IFD tag type"));

        let mut bytes = sample();
        let t = Tiff::parse(bytes.clone()).unwrap();
        let desc = t.tag(0, 0x010E).and_then(|t| t.src_offset).unwrap();
        // Point the second entry's data at the first entry's data.
        let entry = 8 + 2 + 12;
        bytes[entry + 4..entry + 8].copy_from_slice(&ByteOrder::Big.put_u32(25));
        bytes[entry + 8..entry + 12].copy_from_slice(&ByteOrder::Big.put_u32(desc));
        let err = Tiff::parse(bytes).unwrap_err();
        assert!(format!("{err:#}").contains("overlapping IFD data"));
    }
}
