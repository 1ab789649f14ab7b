use anyhow::Result;

use super::Handler;
use crate::provider::{Provider, Providers, XmpProvider};
use crate::tags::xmp::XmpTags;

/// A standalone `.xmp` sidecar.
pub(super) struct XmpFile {
    xmp: XmpProvider,
}

impl XmpFile {
    /// An empty or unparseable sidecar yields an empty packet; the latter is
    /// recorded as a problem.
    pub fn open(data: &[u8], problems: &mut Vec<String>) -> Self {
        let tags = if data.iter().all(u8::is_ascii_whitespace) {
            XmpTags::new()
        } else {
            XmpTags::parse(data).unwrap_or_else(|e| {
                problems.push(format!("XMP: {e:#}"));
                XmpTags::new()
            })
        };
        XmpFile {
            xmp: XmpProvider::new(tags, problems),
        }
    }
}

impl Handler for XmpFile {
    fn providers(&mut self) -> Providers<'_> {
        Providers::new(vec![&mut self.xmp as &mut dyn Provider])
    }

    /// Sidecars carry no padding.
    fn render(&mut self, _padding: usize) -> Result<Vec<u8>> {
        Ok(self.xmp.tags().render(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sidecar_accepts_writes() {
        let mut problems = Vec::new();
        let mut f = XmpFile::open(b"\n", &mut problems);
        assert!(problems.is_empty());
        f.providers().set_caption("hello").unwrap();
        let bytes = f.render(2048).unwrap();
        let mut again = XmpFile::open(&bytes, &mut problems);
        assert!(problems.is_empty());
        assert_eq!(again.providers().caption(), "hello");
    }

    #[test]
    fn garbage_is_a_problem() {
        let mut problems = Vec::new();
        XmpFile::open(b"<not-xmp", &mut problems);
        assert_eq!(problems.len(), 1);
    }
}
