use anyhow::{anyhow, bail, Context, Result};
use nom_exif::{MediaParser, MediaSource, TrackInfo, TrackInfoTag};
use std::path::Path;

use super::{Kind, Provider, Role, TagValue};
use crate::value::{DateTime, FixedDecimal, GpsCoords, Value};

/// Creation time and position from a video container's track metadata.
/// Video files are never written.
#[derive(Debug, Clone, Default)]
pub struct VideoProvider {
    created: DateTime,
    gps: GpsCoords,
}

impl VideoProvider {
    /// Probe `path`. A file without track metadata yields an empty provider.
    pub fn open(path: &Path, problems: &mut Vec<String>) -> Result<Self> {
        let mut parser = MediaParser::new();
        let ms = MediaSource::file_path(path).with_context(|| format!("failed to open {}", path.display()))?;
        if !ms.has_track() {
            log::debug!("{}: no track metadata", path.display());
            return Ok(Self::default());
        }
        let info: TrackInfo = match parser.parse(ms) {
            Ok(info) => info,
            Err(e) => {
                problems.push(format!("video metadata: {e}"));
                return Ok(Self::default());
            }
        };
        let mut provider = Self::default();
        if let Some(v) = info.get(TrackInfoTag::CreateDate) {
            // Either RFC 3339 or `YYYY-MM-DD HH:MM:SS +HH:MM`.
            let text = v.to_string().replacen(' ', "T", 1).replace(' ', "");
            match DateTime::parse(&text) {
                Ok(dt) => provider.created = dt,
                Err(e) => problems.push(format!("video CreateDate: {e:#}")),
            }
        }
        if let Some(v) = info.get(TrackInfoTag::GpsIso6709) {
            match parse_iso6709(&v.to_string()) {
                Ok(gc) => provider.gps = gc,
                Err(e) => problems.push(format!("video GPS: {e:#}")),
            }
        }
        Ok(provider)
    }
}

/// One ISO 6709 angle: `±DD[D].d`, `±DD[D]MM.m` or `±DD[D]MMSS.s`.
fn iso6709_angle(s: &str, degree_digits: usize) -> Result<FixedDecimal> {
    let (negative, body) = match s.as_bytes().first() {
        Some(b'+') => (false, &s[1..]),
        Some(b'-') => (true, &s[1..]),
        _ => bail!("missing sign"),
    };
    let whole = body.find('.').unwrap_or(body.len());
    if whole < degree_digits || !body.is_char_boundary(degree_digits) {
        bail!("malformed angle {s:?}");
    }
    let sixty = FixedDecimal::from_int(60);
    let value = match whole - degree_digits {
        0 => FixedDecimal::parse(body)?,
        2 => {
            let deg = FixedDecimal::parse(&body[..degree_digits])?;
            deg + FixedDecimal::parse(&body[degree_digits..])?.div(sixty)
        }
        4 => {
            let deg = FixedDecimal::parse(&body[..degree_digits])?;
            let min = FixedDecimal::parse(&body[degree_digits..degree_digits + 2])?;
            let sec = FixedDecimal::parse(&body[degree_digits + 2..])?;
            deg + min.div(sixty) + sec.div(sixty).div(sixty)
        }
        _ => bail!("malformed angle {s:?}"),
    };
    Ok(if negative { -value } else { value })
}

/// Parse an ISO 6709 point such as `+27.1281+100.2508+000.000/`.
fn parse_iso6709(s: &str) -> Result<GpsCoords> {
    let s = s.trim().trim_end_matches('/');
    let s = s.split("CRS").next().unwrap_or_default();
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, c) in s.char_indices().skip(1) {
        if c == '+' || c == '-' {
            parts.push(&s[start..i]);
            start = i;
        }
    }
    parts.push(&s[start..]);
    if parts.len() < 2 || parts.len() > 3 {
        return Err(anyhow!("invalid ISO 6709 location {s:?}"));
    }
    let latitude = iso6709_angle(parts[0], 2)?;
    let longitude = iso6709_angle(parts[1], 3)?;
    if latitude.abs() > FixedDecimal::from_int(90) || longitude.abs() > FixedDecimal::from_int(180) {
        bail!("ISO 6709 location out of range");
    }
    let altitude = match parts.get(2) {
        Some(a) => FixedDecimal::parse(a)?,
        None => FixedDecimal::ZERO,
    };
    Ok(GpsCoords {
        latitude,
        longitude,
        altitude,
    })
}

impl Provider for VideoProvider {
    fn kind(&self) -> Kind {
        Kind::Video
    }

    fn datetime(&self) -> DateTime {
        self.created.clone()
    }

    fn datetime_tags(&self) -> Vec<TagValue> {
        if self.created.is_empty() {
            return Vec::new();
        }
        vec![TagValue::new("Video CreateDate", Value::DateTime(self.created.clone()), Role::Info)]
    }

    fn gps(&self) -> GpsCoords {
        self.gps
    }

    fn gps_tags(&self) -> Vec<TagValue> {
        if self.gps.is_empty() {
            return Vec::new();
        }
        vec![TagValue::new("Video GPS", Value::Gps(self.gps), Role::Info)]
    }
}
