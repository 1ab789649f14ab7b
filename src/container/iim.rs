//! IPTC Information Interchange Model DataSet streams.

use anyhow::{bail, Result};

const TAG_MARKER: u8 = 0x1C;

/// `ESC % G`: the UTF-8 designation for 1:90 CodedCharacterSet.
pub const UTF8_DESIGNATION: &[u8] = b"\x1b%G";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSet {
    pub record: u8,
    pub id: u8,
    pub data: Vec<u8>,
}

/// The DataSets of one IIM stream, in source order. Removed DataSets leave
/// an empty slot until the stream is rendered.
#[derive(Debug, Clone, Default)]
pub struct Iim {
    sets: Vec<Option<DataSet>>,
    raw: Vec<u8>,
    dirty: bool,
}

impl Iim {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut sets = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            if data[pos] != TAG_MARKER {
                // Writers pad the resource with NULs.
                if data[pos..].iter().all(|b| *b == 0) {
                    break;
                }
                bail!("invalid IPTC tag marker at offset {pos}");
            }
            if pos + 5 > data.len() {
                bail!("truncated IPTC DataSet header");
            }
            let (record, id) = (data[pos + 1], data[pos + 2]);
            let mut len = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as usize;
            pos += 5;
            if len & 0x8000 != 0 {
                let n = len & 0x7FFF;
                if n == 0 || n > 4 || pos + n > data.len() {
                    bail!("invalid IPTC extended length for {record}:{id}");
                }
                len = data[pos..pos + n].iter().fold(0usize, |acc, b| acc << 8 | usize::from(*b));
                pos += n;
            }
            if pos + len > data.len() {
                bail!("truncated IPTC DataSet {record}:{id}");
            }
            sets.push(Some(DataSet {
                record,
                id,
                data: data[pos..pos + len].to_vec(),
            }));
            pos += len;
        }
        Ok(Iim {
            sets,
            raw: data.to_vec(),
            dirty: false,
        })
    }

    /// A fresh stream carrying only 2:0 RecordVersion. It stays clean until
    /// a DataSet is set.
    pub fn new() -> Self {
        Iim {
            sets: vec![Some(DataSet {
                record: 2,
                id: 0,
                data: vec![0, 4],
            })],
            raw: Vec::new(),
            dirty: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// All values of `record:id`, in order.
    pub fn get(&self, record: u8, id: u8) -> Vec<&[u8]> {
        self.sets
            .iter()
            .flatten()
            .filter(|ds| ds.record == record && ds.id == id)
            .map(|ds| ds.data.as_slice())
            .collect()
    }

    /// True if any DataSet other than those listed is present.
    pub fn has_other_than(&self, ids: &[(u8, u8)]) -> bool {
        self.sets.iter().flatten().any(|ds| !ids.contains(&(ds.record, ds.id)))
    }

    pub fn first(&self, record: u8, id: u8) -> Option<&[u8]> {
        self.get(record, id).into_iter().next()
    }

    /// Replace every value of `record:id`. Existing slots are reused in
    /// order, surplus slots are emptied and extra values are inserted at the
    /// end of their record.
    /// Returns whether anything changed.
    pub fn set(&mut self, record: u8, id: u8, values: &[Vec<u8>]) -> bool {
        let current: Vec<&[u8]> = self.get(record, id);
        if current.len() == values.len() && current.iter().zip(values).all(|(a, b)| *a == b.as_slice()) {
            return false;
        }
        let mut values = values.iter();
        for slot in &mut self.sets {
            if slot.as_ref().is_some_and(|ds| ds.record == record && ds.id == id) {
                *slot = values.next().map(|v| DataSet {
                    record,
                    id,
                    data: v.clone(),
                });
            }
        }
        // Records must stay in ascending order, so new DataSets go after the
        // last one of the same or an earlier record.
        let mut at = self
            .sets
            .iter()
            .rposition(|s| s.as_ref().is_some_and(|ds| ds.record <= record))
            .map_or(0, |p| p + 1);
        for v in values {
            self.sets.insert(
                at,
                Some(DataSet {
                    record,
                    id,
                    data: v.clone(),
                }),
            );
            at += 1;
        }
        self.dirty = true;
        true
    }

    pub fn render(&self) -> Vec<u8> {
        if !self.dirty {
            return self.raw.clone();
        }
        let mut out = Vec::new();
        for ds in self.sets.iter().flatten() {
            out.extend_from_slice(&[TAG_MARKER, ds.record, ds.id]);
            if ds.data.len() < 0x8000 {
                out.extend_from_slice(&(ds.data.len() as u16).to_be_bytes());
            } else {
                out.extend_from_slice(&0x8004u16.to_be_bytes());
                out.extend_from_slice(&(ds.data.len() as u32).to_be_bytes());
            }
            out.extend_from_slice(&ds.data);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> Vec<u8> {
        let mut b = b"\x1c\x02\x00\x00\x02\x00\x04".to_vec();
        b.extend_from_slice(b"\x1c\x02\x19\x00\x03one");
        b.extend_from_slice(b"\x1c\x02\x05\x00\x05Title");
        b.extend_from_slice(b"\x1c\x02\x19\x00\x03two");
        b
    }

    #[test]
    fn reads_repeated_datasets_in_order() {
        let iim = Iim::parse(&stream()).unwrap();
        assert_eq!(iim.get(2, 25), vec![&b"one"[..], &b"two"[..]]);
        assert_eq!(iim.first(2, 5), Some(&b"Title"[..]));
        assert_eq!(iim.render(), stream());
    }

    #[test]
    fn set_reuses_slots_and_is_idempotent() {
        let mut iim = Iim::parse(&stream()).unwrap();
        assert!(!iim.set(2, 25, &[b"one".to_vec(), b"two".to_vec()]));
        assert!(iim.set(2, 25, &[b"uno".to_vec()]));
        let out = iim.render();
        let again = Iim::parse(&out).unwrap();
        assert_eq!(again.get(2, 25), vec![&b"uno"[..]]);
        // The reused slot keeps its position ahead of ObjectName.
        assert_eq!(&out[7..10], b"\x1c\x02\x19");
    }

    #[test]
    fn new_record_one_datasets_precede_record_two() {
        let mut iim = Iim::parse(&stream()).unwrap();
        assert!(iim.set(1, 90, &[UTF8_DESIGNATION.to_vec()]));
        let out = iim.render();
        assert_eq!(&out[..6], b"\x1c\x01\x5a\x00\x03\x1b");
    }

    #[test]
    fn new_stream_is_clean_until_set() {
        let mut iim = Iim::new();
        assert!(!iim.is_dirty());
        assert!(!iim.set(2, 5, &[]));
        assert!(!iim.is_dirty());
        assert!(iim.set(2, 5, &[b"Title".to_vec()]));
        assert!(iim.is_dirty());
    }

    #[test]
    fn extended_length() {
        let big = vec![b'x'; 0x9000];
        let mut iim = Iim::new();
        iim.set(2, 120, &[big.clone()]);
        let again = Iim::parse(&iim.render()).unwrap();
        assert_eq!(again.first(2, 120), Some(big.as_slice()));
    }

    #[test]
    fn tolerates_trailing_padding_only() {
        let mut b = stream();
        b.extend_from_slice(&[0, 0]);
        assert!(Iim::parse(&b).is_ok());
        b.push(7);
        assert!(Iim::parse(&b).is_err());
    }
}
