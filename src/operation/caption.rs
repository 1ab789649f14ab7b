use anyhow::{Context, Result};

use super::{display, parse_one_field, ArgError, Console, Operation};
use crate::field::{self, Field};
use crate::filefmt::MediaFile;
use crate::value::Value;

/// Only the caption can be read or written whole.
fn caption_only(op: &str, args: &[String]) -> Result<(), ArgError> {
    let (field, _) = parse_one_field(op, args)?;
    if *field != field::CAPTION {
        return Err(ArgError::new(format!("{op}: not supported for {:?}", field.name)));
    }
    Ok(())
}

/// `read caption`: print the caption of a single file, undecorated.
#[derive(Default)]
pub struct ReadCaption;

impl Operation for ReadCaption {
    fn name(&self) -> &'static str {
        "read"
    }

    fn parse_args<'a>(&mut self, args: &'a [String]) -> Result<&'a [String], ArgError> {
        caption_only("read", args)?;
        Ok(&args[1..])
    }

    fn check(&self, batches: &[Vec<MediaFile>]) -> Result<(), ArgError> {
        if batches.iter().map(Vec::len).sum::<usize>() != 1 {
            return Err(ArgError::new("read caption: only one file allowed"));
        }
        Ok(())
    }

    fn run(&mut self, batch: &mut [MediaFile], console: &mut Console) -> Result<()> {
        for file in batch.iter_mut() {
            let caption = file.providers().caption();
            console.output.write_all(caption.as_bytes())?;
            if !caption.is_empty() && !caption.ends_with('\n') {
                writeln!(console.output)?;
            }
        }
        Ok(())
    }
}

/// `write caption`: set the caption from standard input.
#[derive(Default)]
pub struct WriteCaption {
    text: Option<String>,
}

impl WriteCaption {
    fn text(&mut self, console: &mut Console) -> Result<&str> {
        if self.text.is_none() {
            let mut buf = String::new();
            console
                .input
                .read_to_string(&mut buf)
                .context("write: standard input")?;
            if buf.ends_with('\n') {
                buf.pop();
                if buf.ends_with('\r') {
                    buf.pop();
                }
            }
            self.text = Some(buf);
        }
        Ok(self.text.as_deref().unwrap_or_default())
    }
}

impl Operation for WriteCaption {
    fn name(&self) -> &'static str {
        "write"
    }

    fn parse_args<'a>(&mut self, args: &'a [String]) -> Result<&'a [String], ArgError> {
        caption_only("write", args)?;
        Ok(&args[1..])
    }

    fn run(&mut self, batch: &mut [MediaFile], console: &mut Console) -> Result<()> {
        let value = vec![Value::Text(self.text(console)?.to_string())];
        let caption: &Field = &field::CAPTION;
        for file in batch.iter_mut() {
            let name = display(file);
            caption
                .set(&mut file.providers(), &value)
                .with_context(|| format!("{name}: write caption"))?;
        }
        Ok(())
    }
}
