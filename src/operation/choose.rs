use anyhow::{Context, Result};
use std::collections::HashSet;

use super::{display, escape, parse_one_field, ArgError, Console, Operation, Table};
use crate::field::Field;
use crate::fileset::parse_number_list;
use crate::filefmt::MediaFile;
use crate::value::Value;

/// `choose field`: list every tagged value of a single-valued field across
/// the batch, then apply the one the user picks or types.
#[derive(Default)]
pub struct Choose {
    field: Option<&'static Field>,
}

/// What the user asked for.
enum Answer {
    Skip,
    Set(Vec<Value>),
}

impl Choose {
    fn ask(&self, field: &Field, choices: &[Value], console: &mut Console) -> Result<Answer> {
        loop {
            if choices.is_empty() {
                write!(
                    console.output,
                    "Enter a new value for {}, 0 to clear, or nothing to skip.\n? ",
                    field.label
                )?;
            } else {
                write!(
                    console.output,
                    "Enter a new value for {}, or 0 to clear, 1-{} to copy, or nothing to skip.\n? ",
                    field.label,
                    choices.len()
                )?;
            }
            console.output.flush()?;
            let mut line = String::new();
            if console.input.read_line(&mut line).context("failed to read answer")? == 0 {
                return Ok(Answer::Skip);
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                return Ok(Answer::Skip);
            }
            if let Some(nums) = parse_number_list(line) {
                if nums == [0] {
                    return Ok(Answer::Set(Vec::new()));
                }
                match pick(&nums, choices) {
                    Ok(values) => return Ok(Answer::Set(values)),
                    Err(msg) => {
                        writeln!(console.output, "ERROR: {msg}")?;
                        continue;
                    }
                }
            }
            match field.parse(line) {
                Ok(v) => return Ok(Answer::Set(vec![v])),
                Err(e) => writeln!(console.output, "ERROR: {e:#}")?,
            }
        }
    }
}

fn pick(nums: &[usize], choices: &[Value]) -> std::result::Result<Vec<Value>, String> {
    let mut seen = HashSet::new();
    let mut values = Vec::with_capacity(nums.len());
    for &n in nums {
        if n == 0 || n > choices.len() {
            return Err(format!("no such line number {n}"));
        }
        if !seen.insert(n) {
            return Err(format!("line number {n} repeated"));
        }
        values.push(choices[n - 1].clone());
    }
    Ok(values)
}

impl Operation for Choose {
    fn name(&self) -> &'static str {
        "choose"
    }

    fn parse_args<'a>(&mut self, args: &'a [String]) -> Result<&'a [String], ArgError> {
        let (field, rest) = parse_one_field("choose", args)?;
        if field.multi {
            return Err(ArgError::new(format!("choose: not supported for {:?}", field.name)));
        }
        self.field = Some(field);
        Ok(rest)
    }

    fn run(&mut self, batch: &mut [MediaFile], console: &mut Console) -> Result<()> {
        let Some(field) = self.field else {
            return Ok(());
        };
        let mut choices = Vec::new();
        let mut table = Table::new(&["#", "FILE", "TAG", "VALUE"]);
        for file in batch.iter_mut() {
            let name = display(file);
            let rows: Vec<_> = field
                .tags(&file.providers())
                .into_iter()
                .filter(|r| !r.value.is_empty())
                .collect();
            if rows.is_empty() {
                table.push(vec![String::new(), name.clone(), "(none)".to_string(), String::new()]);
            }
            for row in rows {
                table.push(vec![
                    (choices.len() + 1).to_string(),
                    name.clone(),
                    row.label,
                    escape(&field.render(&row.value)),
                ]);
                choices.push(row.value);
            }
        }
        table.print(console.output)?;

        let Answer::Set(values) = self.ask(field, &choices, console)? else {
            return Ok(());
        };
        for file in batch.iter_mut() {
            let name = display(file);
            field
                .set(&mut file.providers(), &values)
                .with_context(|| format!("{name}: choose {}", field.name))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use super::super::parse_operation;
    use crate::field;
    use tempfile::TempDir;

    fn two_titles(dir: &TempDir) -> Vec<crate::filefmt::MediaFile> {
        let mut batch = sidecars(dir, &["a.xmp", "b.xmp", "c.xmp"]);
        run(op(&["set", "title", "First"]).as_mut(), &mut batch[..1], "").unwrap();
        run(op(&["set", "title", "Second"]).as_mut(), &mut batch[1..2], "").unwrap();
        batch
    }

    #[test]
    fn refuses_multi_valued_fields() {
        let err = parse_operation(&args(&["choose", "kw"]), &field::ALL).err().unwrap();
        assert_eq!(err.to_string(), r#"choose: not supported for "keyword""#);
    }

    #[test]
    fn copies_a_listed_value() {
        let dir = TempDir::new().unwrap();
        let mut batch = two_titles(&dir);
        let out = run(op(&["choose", "title"]).as_mut(), &mut batch, "2\n").unwrap();
        assert!(out.starts_with("#  FILE"));
        assert!(out.contains("(none)"));
        assert!(out.ends_with("Enter a new value for Title, or 0 to clear, 1-2 to copy, or nothing to skip.\n? "));
        for f in batch.iter_mut() {
            assert_eq!(f.providers().title(), "Second");
        }
    }

    #[test]
    fn retries_then_accepts_typed_value() {
        let dir = TempDir::new().unwrap();
        let mut batch = two_titles(&dir);
        let out = run(op(&["choose", "title"]).as_mut(), &mut batch, "7\nBrand new\n").unwrap();
        assert!(out.contains("ERROR: no such line number 7\n"));
        for f in batch.iter_mut() {
            assert_eq!(f.providers().title(), "Brand new");
        }
    }

    #[test]
    fn zero_clears_and_empty_skips() {
        let dir = TempDir::new().unwrap();
        let mut batch = two_titles(&dir);
        run(op(&["choose", "title"]).as_mut(), &mut batch, "\n").unwrap();
        assert_eq!(batch[0].providers().title(), "First");
        run(op(&["choose", "title"]).as_mut(), &mut batch, "0\n").unwrap();
        assert!(batch.iter_mut().all(|f| f.providers().title().is_empty()));
    }
}
