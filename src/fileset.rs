//! The remembered working set and its batches.
//!
//! The working set lives in a small text file (`$HOME/.md` unless the
//! config says otherwise):
//!
//! ```text
//! /home/me/photos/2021        <- directory the set was created in
//! IMG_0001.jpg
//! #IMG_0002.jpg               <- '#' marks a file outside the current selection
//! #IMG_0002.jpg.xmp
//! ```
//!
//! Running `md` from any other directory discards the remembered set.
//! A batch is a run of files sharing a stem (the file name up to its
//! first dot), so `a.jpg`, `a.jpg.xmp` and `a.edited.jpg` travel together.

use anyhow::{bail, Context, Result};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::filefmt::{is_media, write_atomic};

/// One line of the working set file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    path: String,
    selected: bool,
}

/// The remembered file list and which of its files are targeted.
#[derive(Debug)]
pub struct WorkingSet {
    file: PathBuf,
    cwd: String,
    entries: Vec<Entry>,
}

impl WorkingSet {
    /// Default location of the working set file.
    pub fn default_path() -> Result<PathBuf> {
        let home = std::env::var_os("HOME").context("HOME is not set")?;
        Ok(PathBuf::from(home).join(".md"))
    }

    /// Read the working set stored at `file` for the directory `cwd`. A
    /// missing file, or one written from another directory, yields an
    /// empty set; the stale file is removed.
    pub fn load(file: &Path, cwd: &str) -> Result<Self> {
        let mut set = WorkingSet {
            file: file.to_path_buf(),
            cwd: cwd.to_string(),
            entries: Vec::new(),
        };
        let text = match fs::read_to_string(file) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(set),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", file.display())),
        };
        let mut lines = text.lines();
        if lines.next() != Some(cwd) {
            log::debug!("{}: remembered for another directory, discarding", file.display());
            fs::remove_file(file).ok();
            return Ok(set);
        }
        set.entries = lines
            .filter(|l| !l.is_empty())
            .map(|l| match l.strip_prefix('#') {
                Some(p) => Entry {
                    path: p.to_string(),
                    selected: false,
                },
                None => Entry {
                    path: l.to_string(),
                    selected: true,
                },
            })
            .collect();
        Ok(set)
    }

    /// Start a new working set from `paths` with its first batch selected.
    pub fn create(file: &Path, cwd: &str, paths: Vec<String>) -> Self {
        let mut set = WorkingSet {
            file: file.to_path_buf(),
            cwd: cwd.to_string(),
            entries: paths
                .into_iter()
                .map(|path| Entry { path, selected: true })
                .collect(),
        };
        if let Some(first) = split_into_batches(&set.paths()).into_iter().next() {
            set.select(&first);
        }
        set
    }

    /// Rewrite the working set file.
    pub fn save(&self) -> Result<()> {
        let mut out = String::with_capacity(self.cwd.len() + 1 + self.entries.len() * 32);
        out.push_str(&self.cwd);
        out.push('\n');
        for e in &self.entries {
            if !e.selected {
                out.push('#');
            }
            out.push_str(&e.path);
            out.push('\n');
        }
        write_atomic(&self.file, out.as_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every remembered path, in the order given when the set was made.
    pub fn paths(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.path.clone()).collect()
    }

    /// The selected paths.
    pub fn targeted(&self) -> Vec<String> {
        self.entries.iter().filter(|e| e.selected).map(|e| e.path.clone()).collect()
    }

    fn ensure_remembered(&self) -> Result<()> {
        if self.entries.is_empty() {
            bail!("no remembered file set");
        }
        Ok(())
    }

    /// Select every remembered file.
    pub fn restore_full_set(&mut self) -> Result<Vec<String>> {
        self.ensure_remembered()?;
        for e in &mut self.entries {
            e.selected = true;
        }
        Ok(self.paths())
    }

    pub fn first_batch(&mut self) -> Result<Vec<String>> {
        self.ensure_remembered()?;
        let batches = split_into_batches(&self.paths());
        let first = batches[0].clone();
        self.select(&first);
        Ok(first)
    }

    pub fn next_batch(&mut self) -> Result<Vec<String>> {
        self.step(|current, count| {
            if current + 1 == count {
                bail!("already on last batch");
            }
            Ok(current + 1)
        })
    }

    pub fn previous_batch(&mut self) -> Result<Vec<String>> {
        self.step(|current, _| {
            if current == 0 {
                bail!("already on first batch");
            }
            Ok(current - 1)
        })
    }

    fn step(&mut self, to: impl Fn(usize, usize) -> Result<usize>) -> Result<Vec<String>> {
        self.ensure_remembered()?;
        let batches = split_into_batches(&self.paths());
        let Some(current) = self.current_batch(&batches) else {
            bail!("not in batch mode");
        };
        let batch = batches[to(current, batches.len())?].clone();
        self.select(&batch);
        Ok(batch)
    }

    /// Index of the batch whose files are exactly the selected ones.
    fn current_batch(&self, batches: &[Vec<String>]) -> Option<usize> {
        let selected: HashSet<&str> = self
            .entries
            .iter()
            .filter(|e| e.selected)
            .map(|e| e.path.as_str())
            .collect();
        if selected.is_empty() {
            return None;
        }
        batches.iter().position(|b| {
            b.len() == selected.len() && b.iter().all(|p| selected.contains(p.as_str()))
        })
    }

    fn select(&mut self, paths: &[String]) {
        let wanted: HashSet<&str> = paths.iter().map(String::as_str).collect();
        for e in &mut self.entries {
            e.selected = wanted.contains(e.path.as_str());
        }
    }

    /// List the remembered files numbered from 1 and read a selection of
    /// numbers and `a-b` ranges from `input`. Bad selections are reported
    /// and asked for again. An empty answer keeps the current selection.
    pub fn select_subset(&mut self, input: &mut impl BufRead, out: &mut impl Write) -> Result<Vec<String>> {
        self.ensure_remembered()?;
        for (i, e) in self.entries.iter().enumerate() {
            writeln!(out, "{:3} {}", i + 1, e.path)?;
        }
        loop {
            write!(out, "Select? ")?;
            out.flush()?;
            let mut line = String::new();
            if input.read_line(&mut line).context("failed to read selection")? == 0 {
                return Ok(self.targeted());
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                return Ok(self.targeted());
            }
            let Some(nums) = parse_number_list(line) else {
                continue;
            };
            match self.pick(&nums) {
                Ok(paths) => {
                    self.select(&paths);
                    return Ok(paths);
                }
                Err(msg) => writeln!(out, "ERROR: {msg}")?,
            }
        }
    }

    fn pick(&self, nums: &[usize]) -> std::result::Result<Vec<String>, String> {
        let mut seen = HashSet::new();
        let mut paths = Vec::with_capacity(nums.len());
        for &n in nums {
            if n < 1 || n > self.entries.len() {
                return Err(format!("no such file number {n}"));
            }
            if !seen.insert(n) {
                return Err(format!("file number {n} listed twice"));
            }
            paths.push(self.entries[n - 1].path.clone());
        }
        Ok(paths)
    }
}

/// Parse a whitespace-separated list of numbers and `a-b` ranges. Returns
/// `None` if the text is not such a list.
///
/// ```rust
/// use photo_md::fileset::parse_number_list;
///
/// assert_eq!(parse_number_list("1 3-5"), Some(vec![1, 3, 4, 5]));
/// assert_eq!(parse_number_list("Alice"), None);
/// ```
pub fn parse_number_list(s: &str) -> Option<Vec<usize>> {
    let mut list = Vec::new();
    for part in s.split_whitespace() {
        match part.split_once('-') {
            None => list.push(part.parse().ok()?),
            Some((a, b)) => {
                let (a, b): (usize, usize) = (a.parse().ok()?, b.parse().ok()?);
                if b < a {
                    return None;
                }
                list.extend(a..=b);
            }
        }
    }
    (!list.is_empty()).then_some(list)
}

// ============================================================================
// Batching
// ============================================================================

/// The file name up to its first dot.
pub fn stem(path: &str) -> &str {
    let name = Path::new(path).file_name().and_then(|n| n.to_str()).unwrap_or(path);
    name.split('.').next().unwrap_or(name)
}

/// Sort key: stem, variant, directory, extension. A sidecar sorts as its
/// media file's extension followed by `.xmp`, so `a.jpg` precedes
/// `a.jpg.xmp` and `a.jpg` precedes `a.edited.jpg`.
fn sort_key(path: &str) -> (String, String, String, String) {
    let p = Path::new(path);
    let dir = p.parent().map(|d| d.to_string_lossy().into_owned()).unwrap_or_default();
    let mut name = p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let mut ext = String::new();
    if let Some(base) = name.strip_suffix(".xmp") {
        ext = ".xmp".to_string();
        name = base.to_string();
    }
    if let Some(dot) = name.rfind('.') {
        ext.insert_str(0, &name[dot..]);
        name.truncate(dot);
    }
    let (base, variant) = match name.find('.') {
        Some(dot) => (name[..dot].to_string(), name[dot..].to_string()),
        None => (name, String::new()),
    };
    (base, variant, dir, ext)
}

fn compare(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

/// Sort `paths` and group them into batches by stem.
pub fn split_into_batches(paths: &[String]) -> Vec<Vec<String>> {
    let mut sorted = paths.to_vec();
    sorted.sort_by(|a, b| compare(a, b));
    let mut batches: Vec<Vec<String>> = Vec::new();
    for p in sorted {
        match batches.last_mut() {
            Some(last) if stem(&last[0]) == stem(&p) => last.push(p),
            _ => batches.push(vec![p]),
        }
    }
    batches
}

/// Expand directory arguments into the media files beneath them. Plain
/// file arguments are kept as given.
pub fn expand(args: &[String]) -> Vec<String> {
    let mut files = Vec::new();
    for arg in args {
        let path = Path::new(arg);
        if !path.is_dir() {
            files.push(arg.clone());
            continue;
        }
        let mut found: Vec<String> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| match e {
                Ok(e) => Some(e),
                Err(err) => {
                    log::warn!("skipping: {err}");
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && is_media(e.path()))
            .map(|e| e.path().to_string_lossy().into_owned())
            .collect();
        found.sort();
        log::debug!("{arg}: {} media files", found.len());
        files.extend(found);
    }
    files
}
