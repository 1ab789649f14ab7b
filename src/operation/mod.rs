//! Operations on batches of media files.
//!
//! An operation is parsed from the command line by [`parse_operation`],
//! validated against the whole set of batches with [`Operation::check`],
//! and then run once per batch. Operations that print tables separate
//! successive batches with a blank line.
//!
//! ```rust
//! use photo_md::operation::parse_operation;
//! use photo_md::field;
//!
//! let args: Vec<String> = ["show", "title", "caption", "a.jpg"].iter().map(|s| s.to_string()).collect();
//! let (op, rest) = parse_operation(&args, &field::ALL).unwrap().unwrap();
//! assert_eq!(op.name(), "show");
//! assert_eq!(rest, ["a.jpg"]);
//! ```

mod caption;
mod change;
mod check;
mod choose;
mod copy;
mod show;

use anyhow::Result;
use std::io::{BufRead, Write};
use thiserror::Error;

use crate::field::{self, Field};
use crate::filefmt::MediaFile;
use crate::value::Value;

pub use caption::{ReadCaption, WriteCaption};
pub use change::{Add, Clear, Remove, Set};
pub use check::Check;
pub use choose::Choose;
pub use copy::{CopyFields, Reset};
pub use show::{Show, Tags};

/// A command-line mistake. These abort before any file is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ArgError(pub String);

impl ArgError {
    pub fn new(msg: impl Into<String>) -> Self {
        ArgError(msg.into())
    }
}

/// Where operations print and read answers from.
pub struct Console<'a> {
    pub input: &'a mut dyn BufRead,
    pub output: &'a mut dyn Write,
}

/// One command-line operation.
pub trait Operation {
    fn name(&self) -> &'static str;

    /// Consume this operation's arguments and return the rest.
    fn parse_args<'a>(&mut self, args: &'a [String]) -> Result<&'a [String], ArgError>;

    /// Validate the operation against every batch before anything runs.
    fn check(&self, _batches: &[Vec<MediaFile>]) -> Result<(), ArgError> {
        Ok(())
    }

    /// Apply the operation to one batch.
    fn run(&mut self, batch: &mut [MediaFile], console: &mut Console) -> Result<()>;

    /// Called once after the last batch.
    fn finish(&mut self, _console: &mut Console) -> Result<()> {
        Ok(())
    }
}

/// Parse the operation named by `args[0]`, if it names one. `defaults` is
/// the field list used by `show` and `check` when none is given.
pub fn parse_operation<'a>(
    args: &'a [String],
    defaults: &[&'static Field],
) -> Result<Option<(Box<dyn Operation>, &'a [String])>, ArgError> {
    let Some(first) = args.first() else {
        return Ok(None);
    };
    let mut op: Box<dyn Operation> = match first.as_str() {
        "add" => Box::new(Add::default()),
        "check" => Box::new(Check::new(defaults)),
        "choose" => Box::new(Choose::default()),
        "clear" => Box::new(Clear::default()),
        "copy" => Box::new(CopyFields::default()),
        "read" => Box::new(ReadCaption::default()),
        "remove" => Box::new(Remove::default()),
        "reset" => Box::new(Reset::default()),
        "set" => Box::new(Set::default()),
        "show" => Box::new(Show::new(defaults)),
        "tags" => Box::new(Tags::new(defaults)),
        "write" => Box::new(WriteCaption::default()),
        _ => return Ok(None),
    };
    let rest = op.parse_args(&args[1..])?;
    Ok(Some((op, rest)))
}

// ============================================================================
// Argument helpers
// ============================================================================

/// Leading field names (and `all`), deduplicated. Parsing stops at the
/// first argument that is not a field name.
fn parse_field_list(args: &[String]) -> (Vec<&'static Field>, &[String]) {
    let mut fields: Vec<&'static Field> = Vec::new();
    let mut used = 0;
    for arg in args {
        let found: Vec<&'static Field> = if arg == "all" {
            field::ALL.to_vec()
        } else if let Some(f) = field::parse_field(arg) {
            vec![f]
        } else {
            break;
        };
        for f in found {
            if !fields.contains(&f) {
                fields.push(f);
            }
        }
        used += 1;
    }
    (fields, &args[used..])
}

/// A single field name.
fn parse_one_field<'a>(op: &str, args: &'a [String]) -> Result<(&'static Field, &'a [String]), ArgError> {
    let Some(name) = args.first() else {
        return Err(ArgError::new(format!("{op}: missing field name")));
    };
    let field = field::parse_field(name)
        .ok_or_else(|| ArgError::new(format!("{op}: {name:?} is not a recognized field name")))?;
    Ok((field, &args[1..]))
}

/// A field name followed by a value. Multi-valued fields accept several
/// values separated by `;`.
fn parse_field_value<'a>(
    op: &str,
    args: &'a [String],
) -> Result<(&'static Field, Vec<Value>, &'a [String]), ArgError> {
    let (field, rest) = parse_one_field(op, args)?;
    let Some(raw) = rest.first() else {
        return Err(ArgError::new(format!("{op}: missing value")));
    };
    let parts: Vec<String> = if field.multi {
        raw.split(';').map(|s| s.trim().to_string()).collect()
    } else {
        vec![raw.clone()]
    };
    let values = parts
        .iter()
        .map(|p| field.parse(p))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| ArgError::new(format!("{op} {}: {e:#}", args[0])))?;
    Ok((field, values, &rest[1..]))
}

// ============================================================================
// Output
// ============================================================================

/// Escape a value for single-line display.
pub fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Rows of cells printed with every column but the last padded to its
/// widest cell plus a two-space gap.
#[derive(Debug, Default)]
struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(header: &[&str]) -> Self {
        Table {
            rows: vec![header.iter().map(|s| s.to_string()).collect()],
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn print(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let cols = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0; cols];
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
        for row in &self.rows {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                line.push_str(cell);
                if i + 1 < row.len() {
                    let pad = widths[i] - cell.chars().count() + 2;
                    line.extend(std::iter::repeat_n(' ', pad));
                }
            }
            writeln!(out, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

/// Label for a file in output tables.
fn display(file: &MediaFile) -> String {
    file.path().display().to_string()
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use std::io::Cursor;
    use std::path::Path;
    use tempfile::TempDir;

    /// Empty XMP sidecars, which accept every field.
    pub fn sidecars(dir: &TempDir, names: &[&str]) -> Vec<MediaFile> {
        names
            .iter()
            .map(|n| {
                let path = dir.path().join(n);
                std::fs::write(&path, b"").unwrap();
                MediaFile::open(&path).unwrap()
            })
            .collect()
    }

    pub fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    /// Run `op` over one batch, feeding `input`, and return the output.
    pub fn run(op: &mut dyn Operation, batch: &mut [MediaFile], input: &str) -> Result<String> {
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut out = Vec::new();
        let mut console = Console {
            input: &mut input,
            output: &mut out,
        };
        op.run(batch, &mut console)?;
        op.finish(&mut console)?;
        Ok(String::from_utf8(out).unwrap())
    }

    /// Parse a full operation from words.
    pub fn op(words: &[&str]) -> Box<dyn Operation> {
        let a = args(words);
        let (op, rest) = parse_operation(&a, &field::ALL).unwrap().unwrap();
        assert!(rest.is_empty());
        op
    }

    pub fn name_of(f: &MediaFile) -> &str {
        f.path().file_name().and_then(|n| n.to_str()).unwrap_or("")
    }

    pub fn reopen(path: &Path) -> MediaFile {
        MediaFile::open(path).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;

    #[test]
    fn field_lists_stop_at_file_names() {
        let a = args(&["title", "kw", "t", "IMG_1.jpg", "caption"]);
        let (fields, rest) = parse_field_list(&a);
        let names: Vec<&str> = fields.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["title", "keyword"]);
        assert_eq!(rest, &a[3..]);
    }

    #[test]
    fn unknown_words_are_not_operations() {
        let a = args(&["IMG_1.jpg"]);
        assert!(parse_operation(&a, &field::ALL).unwrap().is_none());
    }

    #[test]
    fn field_value_errors() {
        let err = |words: &[&str]| parse_operation(&args(words), &field::ALL).err().unwrap().to_string();
        assert_eq!(err(&["set"]), "set: missing field name");
        assert_eq!(err(&["set", "title"]), "set: missing value");
        assert_eq!(err(&["add", "colour", "x"]), "add: \"colour\" is not a recognized field name");
        assert!(err(&["set", "datetime", "yesterday"]).starts_with("set datetime: "));
    }

    #[test]
    fn multi_values_split_on_semicolons() {
        let a = args(&["topic", "Food; Drink"]);
        let (field, values, rest) = parse_field_value("add", &a).unwrap();
        assert_eq!(field.name, "topic");
        assert_eq!(values.len(), 2);
        assert!(rest.is_empty());
    }

    #[test]
    fn escapes_backslash_and_newline() {
        assert_eq!(escape("a\\b\nc"), "a\\\\b\\nc");
    }

    #[test]
    fn table_pads_all_but_last_column() {
        let mut t = Table::new(&["FILE", "FIELD", "VALUE"]);
        t.push(vec!["a.jpg".into(), "Title".into(), "Hello".into()]);
        t.push(vec!["long.jpg".into(), "Caption".into(), String::new()]);
        let mut out = Vec::new();
        t.print(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "FILE      FIELD    VALUE\na.jpg     Title    Hello\nlong.jpg  Caption\n"
        );
    }
}
