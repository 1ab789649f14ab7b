use anyhow::Result;

use super::{display, escape, parse_field_list, ArgError, Console, Operation, Table};
use crate::field::Field;
use crate::filefmt::MediaFile;

/// `show [field…]`: the reconciled value of each field. A field whose tags
/// disagree within the file is marked with its check label.
pub struct Show {
    fields: Vec<&'static Field>,
    has_run: bool,
}

impl Show {
    pub fn new(defaults: &[&'static Field]) -> Self {
        Show {
            fields: defaults.to_vec(),
            has_run: false,
        }
    }
}

impl Operation for Show {
    fn name(&self) -> &'static str {
        "show"
    }

    fn parse_args<'a>(&mut self, args: &'a [String]) -> Result<&'a [String], ArgError> {
        let (fields, rest) = parse_field_list(args);
        if !fields.is_empty() {
            self.fields = fields;
        }
        Ok(rest)
    }

    fn run(&mut self, batch: &mut [MediaFile], console: &mut Console) -> Result<()> {
        if std::mem::replace(&mut self.has_run, true) {
            writeln!(console.output)?;
        }
        let mut table = Table::new(&["FILE", "  FIELD", "VALUE"]);
        for file in batch.iter_mut() {
            let name = display(file);
            let p = file.providers();
            for field in &self.fields {
                let check = field.check(&p, &p);
                let mark = if check.is_error() { check.label(false) } else { "  ".to_string() };
                let values = field.get(&p);
                if values.is_empty() {
                    table.push(vec![name.clone(), format!("{mark}{}", field.label), String::new()]);
                }
                for v in &values {
                    table.push(vec![name.clone(), format!("{mark}{}", field.label), escape(&field.render(v))]);
                }
            }
        }
        table.print(console.output)?;
        Ok(())
    }
}

/// `tags [field…]`: every tag backing each field, per container.
pub struct Tags {
    fields: Vec<&'static Field>,
    has_run: bool,
}

impl Tags {
    pub fn new(defaults: &[&'static Field]) -> Self {
        Tags {
            fields: defaults.to_vec(),
            has_run: false,
        }
    }
}

impl Operation for Tags {
    fn name(&self) -> &'static str {
        "tags"
    }

    fn parse_args<'a>(&mut self, args: &'a [String]) -> Result<&'a [String], ArgError> {
        let (fields, rest) = parse_field_list(args);
        if !fields.is_empty() {
            self.fields = fields;
        }
        Ok(rest)
    }

    fn run(&mut self, batch: &mut [MediaFile], console: &mut Console) -> Result<()> {
        if std::mem::replace(&mut self.has_run, true) {
            writeln!(console.output)?;
        }
        let mut table = Table::new(&["FILE", "TAG", "VALUE"]);
        for file in batch.iter_mut() {
            let name = display(file);
            let p = file.providers();
            for field in &self.fields {
                for row in field.tags(&p) {
                    table.push(vec![name.clone(), row.label, escape(&field.render(&row.value))]);
                }
            }
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
    fn show_prints_values_and_empty_cells() {
        let dir = TempDir::new().unwrap();
        let mut batch = sidecars(&dir, &["a.xmp"]);
        run(op(&["set", "title", "Hello"]).as_mut(), &mut batch, "").unwrap();
        let out = run(op(&["show", "title", "caption"]).as_mut(), &mut batch, "").unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("  FIELD") && lines[0].ends_with("VALUE"));
        assert!(lines[1].ends_with("  Title    Hello"));
        assert!(lines[2].ends_with("  Caption"));
    }

    #[test]
    fn show_escapes_multiline_values() {
        let dir = TempDir::new().unwrap();
        let mut batch = sidecars(&dir, &["a.xmp"]);
        run(op(&["set", "caption", "one\ntwo"]).as_mut(), &mut batch, "").unwrap();
        let out = run(op(&["show", "caption"]).as_mut(), &mut batch, "").unwrap();
        assert!(out.contains("one\\ntwo"));
    }

    #[test]
    fn repeated_runs_are_separated() {
        let dir = TempDir::new().unwrap();
        let mut batch = sidecars(&dir, &["a.xmp"]);
        let mut show = op(&["show", "title"]);
        run(show.as_mut(), &mut batch, "").unwrap();
        let second = run(show.as_mut(), &mut batch, "").unwrap();
        assert!(second.starts_with('\n'));
    }

    #[test]
    fn tags_lists_container_tags() {
        let dir = TempDir::new().unwrap();
        let mut batch = sidecars(&dir, &["a.xmp"]);
        run(op(&["set", "title", "Hello"]).as_mut(), &mut batch, "").unwrap();
        let out = run(op(&["tags", "title"]).as_mut(), &mut batch, "").unwrap();
        assert!(out.starts_with("FILE"));
        assert!(out.lines().skip(1).any(|l| l.contains("dc:title") && l.ends_with("Hello")));
    }
}
