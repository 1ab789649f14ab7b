use anyhow::{bail, Result};
use std::path::Path;

use super::Handler;
use crate::provider::{Provider, Providers, VideoProvider};

/// A video container, probed for track metadata.
pub(super) struct VideoFile {
    video: VideoProvider,
}

impl VideoFile {
    pub fn open(path: &Path, problems: &mut Vec<String>) -> Result<Self> {
        Ok(VideoFile {
            video: VideoProvider::open(path, problems)?,
        })
    }
}

impl Handler for VideoFile {
    fn providers(&mut self) -> Providers<'_> {
        Providers::new(vec![&mut self.video as &mut dyn Provider])
    }

    fn render(&mut self, _padding: usize) -> Result<Vec<u8>> {
        bail!("video files cannot be written")
    }
}

/// A format the engine recognises but reads no metadata from.
pub(super) struct Bare;

impl Handler for Bare {
    fn providers(&mut self) -> Providers<'_> {
        Providers::new(Vec::new())
    }

    fn render(&mut self, _padding: usize) -> Result<Vec<u8>> {
        bail!("file format cannot be written")
    }
}
