use anyhow::Result;

use super::{display, parse_field_list, ArgError, Console, Operation, Table};
use crate::field::Field;
use crate::filefmt::MediaFile;

/// `check [field…]`: a grid of how each file tags each field, measured
/// against the batch's first file.
pub struct Check {
    fields: Vec<&'static Field>,
    has_run: bool,
}

impl Check {
    pub fn new(defaults: &[&'static Field]) -> Self {
        Check {
            fields: defaults.to_vec(),
            has_run: false,
        }
    }
}

impl Operation for Check {
    fn name(&self) -> &'static str {
        "check"
    }

    fn parse_args<'a>(&mut self, args: &'a [String]) -> Result<&'a [String], ArgError> {
        let (fields, rest) = parse_field_list(args);
        if !fields.is_empty() {
            self.fields = fields;
        }
        Ok(rest)
    }

    fn run(&mut self, batch: &mut [MediaFile], console: &mut Console) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        if std::mem::replace(&mut self.has_run, true) {
            writeln!(console.output)?;
        }
        let mut header: Vec<&str> = self.fields.iter().map(|f| f.short).collect();
        header.push("FILE");
        let mut table = Table::new(&header);

        let (first, rest) = batch.split_at_mut(1);
        let reference_name = display(&first[0]);
        let reference = first[0].providers();
        let mut row: Vec<String> = self
            .fields
            .iter()
            .map(|f| f.check(&reference, &reference).label(f.multi))
            .collect();
        row.push(reference_name);
        table.push(row);

        for file in rest.iter_mut() {
            let name = display(file);
            let target = file.providers();
            let mut row: Vec<String> = self
                .fields
                .iter()
                .map(|f| f.check(&reference, &target).label(f.multi))
                .collect();
            row.push(name);
            table.push(row);
        }
        table.print(console.output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use tempfile::TempDir;

    #[test]
    fn differing_artist_is_a_conflict() {
        let dir = TempDir::new().unwrap();
        let mut batch = sidecars(&dir, &["a.xmp", "b.xmp"]);
        run(op(&["set", "artist", "Steve"]).as_mut(), &mut batch[..1], "").unwrap();
        run(op(&["set", "artist", "Stephen"]).as_mut(), &mut batch[1..], "").unwrap();
        let out = run(op(&["check", "artist"]).as_mut(), &mut batch, "").unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(" A  FILE"));
        assert!(lines[1].starts_with("ok  ") && lines[1].ends_with("a.xmp"));
        assert!(lines[2].starts_with("!=  ") && lines[2].ends_with("b.xmp"));
    }

    #[test]
    fn counts_multi_valued_fields() {
        let dir = TempDir::new().unwrap();
        let mut batch = sidecars(&dir, &["a.xmp"]);
        run(op(&["add", "topic", "Food; Drink"]).as_mut(), &mut batch, "").unwrap();
        let out = run(op(&["check", "topic", "title"]).as_mut(), &mut batch, "").unwrap();
        let row = out.lines().nth(1).unwrap();
        assert!(row.starts_with(" 2      "), "{row:?}");
    }
}
