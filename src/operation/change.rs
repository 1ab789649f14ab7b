use anyhow::{Context, Result};

use super::{display, parse_field_value, parse_one_field, ArgError, Console, Operation};
use crate::field::{self, Field};
use crate::filefmt::MediaFile;
use crate::value::Value;

/// `set field value`: replace a field's values.
#[derive(Default)]
pub struct Set {
    target: Option<(&'static Field, Vec<Value>)>,
}

impl Operation for Set {
    fn name(&self) -> &'static str {
        "set"
    }

    fn parse_args<'a>(&mut self, args: &'a [String]) -> Result<&'a [String], ArgError> {
        let (field, values, rest) = parse_field_value("set", args)?;
        if *field == field::KEYWORDS {
            return Err(ArgError::new(
                r#"set: not supported for "keyword" (you probably want "add" instead)"#,
            ));
        }
        self.target = Some((field, values));
        Ok(rest)
    }

    fn run(&mut self, batch: &mut [MediaFile], _console: &mut Console) -> Result<()> {
        let Some((field, values)) = &self.target else {
            return Ok(());
        };
        for file in batch.iter_mut() {
            let name = display(file);
            field
                .set(&mut file.providers(), values)
                .with_context(|| format!("{name}: set {}", field.name))?;
        }
        Ok(())
    }
}

/// `add field value`: add values a multi-valued field lacks.
#[derive(Default)]
pub struct Add {
    target: Option<(&'static Field, Vec<Value>)>,
}

impl Operation for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn parse_args<'a>(&mut self, args: &'a [String]) -> Result<&'a [String], ArgError> {
        let (field, values, rest) = parse_field_value("add", args)?;
        if !field.multi {
            return Err(ArgError::new(format!("add: not supported for {:?}", field.name)));
        }
        self.target = Some((field, values));
        Ok(rest)
    }

    fn run(&mut self, batch: &mut [MediaFile], _console: &mut Console) -> Result<()> {
        let Some((field, toadd)) = &self.target else {
            return Ok(());
        };
        for file in batch.iter_mut() {
            let name = display(file);
            let mut p = file.providers();
            let mut values = field.get(&p);
            let before = values.len();
            for v in toadd {
                if !values.iter().any(|have| field.equal(have, v)) {
                    values.push(v.clone());
                }
            }
            if values.len() != before {
                field
                    .set(&mut p, &values)
                    .with_context(|| format!("{name}: add {}", field.name))?;
            }
        }
        Ok(())
    }
}

/// `remove field value`: drop matching values of a multi-valued field.
#[derive(Default)]
pub struct Remove {
    target: Option<(&'static Field, Vec<Value>)>,
}

impl Operation for Remove {
    fn name(&self) -> &'static str {
        "remove"
    }

    fn parse_args<'a>(&mut self, args: &'a [String]) -> Result<&'a [String], ArgError> {
        let (field, values, rest) = parse_field_value("remove", args)?;
        if !field.multi {
            return Err(ArgError::new(format!("remove: not supported for {:?}", field.name)));
        }
        self.target = Some((field, values));
        Ok(rest)
    }

    fn run(&mut self, batch: &mut [MediaFile], _console: &mut Console) -> Result<()> {
        let Some((field, toremove)) = &self.target else {
            return Ok(());
        };
        for file in batch.iter_mut() {
            let name = display(file);
            let mut p = file.providers();
            let mut values = field.get(&p);
            let before = values.len();
            values.retain(|v| !toremove.iter().any(|r| field.equal(v, r)));
            if values.len() != before {
                field
                    .set(&mut p, &values)
                    .with_context(|| format!("{name}: remove {}", field.name))?;
            }
        }
        Ok(())
    }
}

/// `clear field`: remove every value of a field.
#[derive(Default)]
pub struct Clear {
    field: Option<&'static Field>,
}

impl Operation for Clear {
    fn name(&self) -> &'static str {
        "clear"
    }

    fn parse_args<'a>(&mut self, args: &'a [String]) -> Result<&'a [String], ArgError> {
        let (field, rest) = parse_one_field("clear", args)?;
        self.field = Some(field);
        Ok(rest)
    }

    fn run(&mut self, batch: &mut [MediaFile], _console: &mut Console) -> Result<()> {
        let Some(field) = self.field else {
            return Ok(());
        };
        for file in batch.iter_mut() {
            let name = display(file);
            field
                .set(&mut file.providers(), &[])
                .with_context(|| format!("{name}: clear {}", field.plural))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use super::super::parse_operation;
    use crate::field::{self, TOPICS};
    use tempfile::TempDir;

    fn topics(f: &mut crate::filefmt::MediaFile) -> Vec<String> {
        let p = f.providers();
        TOPICS.get(&p).iter().map(|v| TOPICS.render(v)).collect()
    }

    #[test]
    fn set_refuses_keywords() {
        let err = parse_operation(&args(&["set", "kw", "Cats"]), &field::ALL).err().unwrap();
        assert_eq!(err.to_string(), r#"set: not supported for "keyword" (you probably want "add" instead)"#);
    }

    #[test]
    fn add_and_remove_need_multi_valued_fields() {
        let err = parse_operation(&args(&["add", "title", "x"]), &field::ALL).err().unwrap();
        assert_eq!(err.to_string(), r#"add: not supported for "title""#);
        let err = parse_operation(&args(&["remove", "caption", "x"]), &field::ALL).err().unwrap();
        assert_eq!(err.to_string(), r#"remove: not supported for "caption""#);
    }

    #[test]
    fn add_skips_present_values() {
        let dir = TempDir::new().unwrap();
        let mut batch = sidecars(&dir, &["a.xmp"]);
        run(op(&["add", "topic", "Food"]).as_mut(), &mut batch, "").unwrap();
        run(op(&["add", "topic", "Food; Drink"]).as_mut(), &mut batch, "").unwrap();
        assert_eq!(topics(&mut batch[0]), vec!["Drink", "Food"]);
    }

    #[test]
    fn remove_then_clear() {
        let dir = TempDir::new().unwrap();
        let mut batch = sidecars(&dir, &["a.xmp"]);
        run(op(&["add", "topic", "Food; Drink; Travel"]).as_mut(), &mut batch, "").unwrap();
        run(op(&["remove", "topic", "Drink"]).as_mut(), &mut batch, "").unwrap();
        assert_eq!(topics(&mut batch[0]), vec!["Food", "Travel"]);
        run(op(&["clear", "topics"]).as_mut(), &mut batch, "").unwrap();
        assert!(topics(&mut batch[0]).is_empty());
    }

    #[test]
    fn set_saves_and_reads_back() {
        let dir = TempDir::new().unwrap();
        let mut batch = sidecars(&dir, &["a.xmp"]);
        run(op(&["set", "title", "Hello"]).as_mut(), &mut batch, "").unwrap();
        assert!(batch[0].save(0).unwrap());
        let mut back = reopen(batch[0].path());
        assert_eq!(back.providers().title(), "Hello");
        assert_eq!(name_of(&back), "a.xmp");
    }
}
