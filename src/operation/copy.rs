use anyhow::{Context, Result};

use super::{display, parse_field_list, ArgError, Console, Operation};
use crate::error::is_not_supported;
use crate::field::{self, Field};
use crate::filefmt::MediaFile;
use crate::value::Value;

/// `copy [field…]`: copy fields from the first file of each batch onto the
/// others. With no fields named, every field is copied and fields a
/// target cannot hold are skipped.
#[derive(Default)]
pub struct CopyFields {
    fields: Vec<&'static Field>,
}

impl Operation for CopyFields {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn parse_args<'a>(&mut self, args: &'a [String]) -> Result<&'a [String], ArgError> {
        let (fields, rest) = parse_field_list(args);
        self.fields = fields;
        Ok(rest)
    }

    fn check(&self, batches: &[Vec<MediaFile>]) -> Result<(), ArgError> {
        if batches.iter().any(|b| b.len() < 2) {
            return Err(ArgError::new("copy: must list at least two files in each batch"));
        }
        Ok(())
    }

    fn run(&mut self, batch: &mut [MediaFile], _console: &mut Console) -> Result<()> {
        let all = self.fields.is_empty();
        let fields: &[&'static Field] = if all { &field::ALL[..] } else { &self.fields[..] };
        let Some((source, targets)) = batch.split_first_mut() else {
            return Ok(());
        };
        let values: Vec<Vec<Value>> = {
            let p = source.providers();
            fields.iter().map(|f| f.get(&p)).collect()
        };
        for file in targets.iter_mut() {
            let name = display(file);
            let mut p = file.providers();
            for (field, values) in fields.iter().zip(&values) {
                match field.set(&mut p, values) {
                    Err(e) if all && is_not_supported(&e) => {
                        log::debug!("{name}: copy {}: skipped, not supported", field.plural);
                    }
                    r => r.with_context(|| format!("{name}: copy {}", field.plural))?,
                }
            }
        }
        Ok(())
    }
}

/// `reset [field…]`: write each field's reconciled value back, which moves
/// it into the preferred tags and clears deprecated ones.
#[derive(Default)]
pub struct Reset {
    fields: Vec<&'static Field>,
}

impl Operation for Reset {
    fn name(&self) -> &'static str {
        "reset"
    }

    fn parse_args<'a>(&mut self, args: &'a [String]) -> Result<&'a [String], ArgError> {
        let (fields, rest) = parse_field_list(args);
        self.fields = fields;
        Ok(rest)
    }

    fn run(&mut self, batch: &mut [MediaFile], _console: &mut Console) -> Result<()> {
        let fields: &[&'static Field] = if self.fields.is_empty() { &field::ALL[..] } else { &self.fields[..] };
        for file in batch.iter_mut() {
            let name = display(file);
            let mut p = file.providers();
            for field in fields {
                let values = field.get(&p);
                match field.set(&mut p, &values) {
                    Err(e) if is_not_supported(&e) => continue,
                    r => r.with_context(|| format!("{name}: reset {}", field.plural))?,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use super::super::Operation;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copy_needs_two_files_per_batch() {
        let dir = TempDir::new().unwrap();
        let batch = sidecars(&dir, &["a.xmp"]);
        let copy = op(&["copy", "title"]);
        let err = copy.check(&[batch]).unwrap_err();
        assert_eq!(err.to_string(), "copy: must list at least two files in each batch");
    }

    #[test]
    fn copies_from_first_file() {
        let dir = TempDir::new().unwrap();
        let mut batch = sidecars(&dir, &["a.xmp", "b.xmp", "c.xmp"]);
        run(op(&["set", "title", "T1"]).as_mut(), &mut batch[..1], "").unwrap();
        run(op(&["set", "caption", "C1"]).as_mut(), &mut batch[..1], "").unwrap();
        run(op(&["copy", "title"]).as_mut(), &mut batch, "").unwrap();
        for f in batch.iter_mut() {
            assert_eq!(f.providers().title(), "T1");
        }
        assert!(batch[1].providers().caption().is_empty());
    }

    #[test]
    fn copy_all_fields() {
        let dir = TempDir::new().unwrap();
        let mut batch = sidecars(&dir, &["a.xmp", "b.xmp"]);
        run(op(&["set", "artist", "Steve"]).as_mut(), &mut batch[..1], "").unwrap();
        run(op(&["add", "topic", "Food"]).as_mut(), &mut batch[..1], "").unwrap();
        run(op(&["set", "title", "Old"]).as_mut(), &mut batch[1..], "").unwrap();
        run(op(&["copy"]).as_mut(), &mut batch, "").unwrap();
        let p = batch[1].providers();
        assert_eq!(p.artist(), "Steve");
        assert!(p.title().is_empty());
        assert_eq!(field::TOPICS.get(&p).len(), 1);
    }

    #[test]
    fn reset_keeps_values() {
        let dir = TempDir::new().unwrap();
        let mut batch = sidecars(&dir, &["a.xmp"]);
        run(op(&["set", "title", "Kept"]).as_mut(), &mut batch, "").unwrap();
        let mut reset = Reset::default();
        assert!(reset.parse_args(&[]).unwrap().is_empty());
        run(&mut reset, &mut batch, "").unwrap();
        assert_eq!(batch[0].providers().title(), "Kept");
    }
}
