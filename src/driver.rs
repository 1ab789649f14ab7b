//! The `md` command: parse the argument grammar, pick the target files,
//! run each operation over each batch and save what changed.
//!
//! ```text
//! md [batch] [next|prev|first|all|select] [operation …] [file …]
//! ```
//!
//! Naming files starts a new working set. Without files, the working set
//! remembered from the last invocation in this directory is used, moved by
//! the navigation keyword if one is given.

use anyhow::anyhow;
use std::path::Path;
use thiserror::Error;

use crate::config::Config;
use crate::field::Field;
use crate::filefmt::MediaFile;
use crate::fileset::{self, WorkingSet};
use crate::operation::{parse_operation, ArgError, Console, Operation, Show};

/// How the working set selection moves before the operations run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Previous,
    First,
    All,
    Select,
}

impl Navigation {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "next" | "n" => Some(Self::Next),
            "prev" | "previous" | "p" => Some(Self::Previous),
            "first" => Some(Self::First),
            "all" => Some(Self::All),
            "select" => Some(Self::Select),
            _ => None,
        }
    }
}

/// A parsed command line.
pub struct Invocation {
    /// Run each batch separately instead of all files as one batch.
    pub batch: bool,
    pub navigation: Option<Navigation>,
    pub operations: Vec<Box<dyn Operation>>,
    pub files: Vec<String>,
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ops: Vec<&str> = self.operations.iter().map(|o| o.name()).collect();
        f.debug_struct("Invocation")
            .field("batch", &self.batch)
            .field("navigation", &self.navigation)
            .field("operations", &ops)
            .field("files", &self.files)
            .finish()
    }
}

/// Why an invocation stopped early.
#[derive(Debug, Error)]
pub enum Failure {
    #[error(transparent)]
    Usage(#[from] ArgError),
    #[error("{0:#}")]
    WorkingSet(anyhow::Error),
    #[error("{0:#}")]
    Run(anyhow::Error),
}

impl Failure {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Failure::Usage(_) | Failure::WorkingSet(_) => 2,
            Failure::Run(_) => 1,
        }
    }
}

/// What happened to the target files.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Files rewritten.
    pub saved: usize,
    /// Files that could not be opened or saved.
    pub failed: Vec<String>,
}

impl Summary {
    pub fn exit_code(&self) -> i32 {
        if self.failed.is_empty() { 0 } else { 1 }
    }
}

/// Parse the command line (without the program name).
pub fn parse_command_line(args: &[String], defaults: &[&'static Field]) -> Result<Invocation, ArgError> {
    let mut inv = Invocation {
        batch: false,
        navigation: None,
        operations: Vec::new(),
        files: Vec::new(),
    };
    let mut args = args;
    while let Some(word) = args.first() {
        if word == "batch" {
            if inv.batch {
                return Err(ArgError::new("\"batch\" specified repeatedly"));
            }
            inv.batch = true;
        } else if let Some(nav) = Navigation::parse(word) {
            if inv.navigation.is_some() {
                return Err(ArgError::new(format!("{word:?}: only one of next, prev, first, all and select may be given")));
            }
            inv.navigation = Some(nav);
        } else {
            break;
        }
        args = &args[1..];
    }
    while !args.is_empty() {
        if let Some((op, rest)) = parse_operation(args, defaults)? {
            inv.operations.push(op);
            args = rest;
        } else {
            inv.files.push(args[0].clone());
            args = &args[1..];
        }
    }
    if inv.navigation.is_some() && !inv.files.is_empty() {
        return Err(ArgError::new("file names cannot be combined with next, prev, first, all or select"));
    }
    if inv.operations.is_empty() {
        inv.operations.push(Box::new(Show::new(defaults)));
    }
    Ok(inv)
}

/// Choose the target paths, updating the working set on disk.
pub fn target_files(
    named: &[String],
    navigation: Option<Navigation>,
    config: &Config,
    cwd: &str,
    console: &mut Console,
) -> anyhow::Result<Vec<String>> {
    let set_path = config.working_set_path()?;
    if !named.is_empty() {
        let files = fileset::expand(named);
        let set = WorkingSet::create(&set_path, cwd, files.clone());
        set.save()?;
        return Ok(files);
    }
    let mut set = WorkingSet::load(&set_path, cwd)?;
    let files = match navigation {
        None => {
            if set.is_empty() {
                anyhow::bail!("no remembered file set");
            }
            return Ok(set.targeted());
        }
        Some(Navigation::Next) => set.next_batch()?,
        Some(Navigation::Previous) => set.previous_batch()?,
        Some(Navigation::First) => set.first_batch()?,
        Some(Navigation::All) => set.restore_full_set()?,
        Some(Navigation::Select) => set.select_subset(&mut console.input, &mut console.output)?,
    };
    set.save()?;
    Ok(files)
}

/// Open each path. Files that cannot be opened are logged and reported in
/// the summary.
fn open_all(paths: &[String], summary: &mut Summary) -> Vec<MediaFile> {
    let mut files = Vec::with_capacity(paths.len());
    for p in paths {
        match MediaFile::open(Path::new(p)) {
            Ok(f) => files.push(f),
            Err(e) => {
                log::error!("{e:#}");
                summary.failed.push(p.clone());
            }
        }
    }
    files
}

/// Sort the opened files and split them into batches by stem, or keep them
/// as one sorted batch.
fn into_batches(files: Vec<MediaFile>, batch: bool) -> Vec<Vec<MediaFile>> {
    let paths: Vec<String> = files.iter().map(|f| f.path().display().to_string()).collect();
    let mut slots: Vec<Option<MediaFile>> = files.into_iter().map(Some).collect();
    let mut batches: Vec<Vec<MediaFile>> = Vec::new();
    for group in fileset::split_into_batches(&paths) {
        let mut out = Vec::with_capacity(group.len());
        for path in group {
            let found = paths
                .iter()
                .enumerate()
                .position(|(i, p)| *p == path && slots[i].is_some());
            if let Some(f) = found.and_then(|i| slots[i].take()) {
                out.push(f);
            }
        }
        batches.push(out);
    }
    if !batch {
        batches = vec![batches.into_iter().flatten().collect()];
    }
    batches
}

/// Run a parsed invocation to completion.
pub fn execute(inv: Invocation, config: &Config, cwd: &str, console: &mut Console) -> Result<Summary, Failure> {
    let paths = target_files(&inv.files, inv.navigation, config, cwd, console).map_err(Failure::WorkingSet)?;
    let mut operations = inv.operations;
    log::debug!("targets: {paths:?}");

    let mut summary = Summary::default();
    let files = open_all(&paths, &mut summary);
    if files.is_empty() {
        return Err(Failure::Run(anyhow!("no files to operate on")));
    }
    let mut batches = into_batches(files, inv.batch);
    for op in &operations {
        op.check(&batches)?;
    }

    for files in batches.iter_mut() {
        for op in operations.iter_mut() {
            op.run(files, console).map_err(Failure::Run)?;
        }
        for file in files.iter_mut() {
            match file.save(config.xmp_padding) {
                Ok(true) => summary.saved += 1,
                Ok(false) => {}
                Err(e) => {
                    log::error!("{}: {e:#}", file.path().display());
                    summary.failed.push(file.path().display().to_string());
                }
            }
        }
    }
    for op in operations.iter_mut() {
        op.finish(console).map_err(Failure::Run)?;
    }
    if summary.saved > 0 {
        log::info!("{} file(s) saved", summary.saved);
    }
    Ok(summary)
}
