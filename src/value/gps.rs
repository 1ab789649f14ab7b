use anyhow::{anyhow, bail, Result};
use std::fmt;

use super::fixed::FixedDecimal;

/// One foot, by definition.
const FEET_TO_METERS: FixedDecimal = FixedDecimal(304_800);

/// A position on the globe.
///
/// Latitude and longitude are in degrees (north and east positive). Altitude
/// is in metres above sea level; zero means "not specified". Coordinates with
/// a zero latitude or longitude are treated as empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpsCoords {
    pub latitude: FixedDecimal,
    pub longitude: FixedDecimal,
    pub altitude: FixedDecimal,
}

/// The EXIF GPS IFD representation of a position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifGps {
    pub lat_ref: String,
    pub lat: Vec<(u32, u32)>,
    pub lon_ref: String,
    pub lon: Vec<(u32, u32)>,
    pub alt_ref: Option<u8>,
    pub alt: Option<(u32, u32)>,
}

/// The XMP `exif:GPS*` representation of a position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmpGps {
    pub lat: String,
    pub lon: String,
    pub alt_ref: String,
    pub alt: String,
}

impl GpsCoords {
    /// Parse `lat, lon` or `lat, lon, N{ft|m|'}`.
    pub fn parse(s: &str) -> Result<Self> {
        let err = || anyhow!("invalid GPS coordinates {s:?}");
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(err());
        }
        let latitude = FixedDecimal::parse(parts[0]).map_err(|_| err())?;
        let longitude = FixedDecimal::parse(parts[1]).map_err(|_| err())?;
        if latitude.abs() > FixedDecimal::from_int(90) {
            bail!("latitude out of range (-90 to 90)");
        }
        if longitude.abs() > FixedDecimal::from_int(180) {
            bail!("longitude out of range (-180 to 180)");
        }
        let mut gc = Self {
            latitude,
            longitude,
            altitude: FixedDecimal::ZERO,
        };
        if let Some(alt) = parts.get(2) {
            let (number, feet) = if let Some(n) = alt.strip_suffix("ft") {
                (n, true)
            } else if let Some(n) = alt.strip_suffix('\'') {
                (n, true)
            } else if let Some(n) = alt.strip_suffix('m') {
                (n, false)
            } else {
                return Err(err());
            };
            let value = FixedDecimal::parse(number).map_err(|_| err())?;
            gc.altitude = if feet { value.mul(FEET_TO_METERS) } else { value };
        }
        Ok(gc)
    }

    pub fn is_empty(&self) -> bool {
        self.latitude == FixedDecimal::ZERO || self.longitude == FixedDecimal::ZERO
    }

    pub fn has_altitude(&self) -> bool {
        !self.is_empty() && self.altitude != FixedDecimal::ZERO
    }

    /// Decode the EXIF representation: N/S and E/W references, three rationals
    /// each, and an optional altitude reference byte plus rational.
    pub fn from_exif(e: &ExifGps) -> Result<Self> {
        if e.lat_ref.is_empty() && e.lat.is_empty() && e.lon_ref.is_empty() && e.lon.is_empty() {
            return Ok(Self::default());
        }
        if !matches!(e.lat_ref.as_str(), "N" | "S") || !matches!(e.lon_ref.as_str(), "E" | "W") {
            bail!("invalid GPS reference");
        }
        let mut latitude = exif_degrees(&e.lat)?;
        if e.lat_ref == "S" {
            latitude = -latitude;
        }
        let mut longitude = exif_degrees(&e.lon)?;
        if e.lon_ref == "W" {
            longitude = -longitude;
        }
        let mut gc = Self {
            latitude,
            longitude,
            altitude: FixedDecimal::ZERO,
        };
        match (e.alt_ref, e.alt) {
            (None | Some(0), None) => {}
            (r, Some((num, den))) if den > 0 && matches!(r, None | Some(0) | Some(1)) => {
                gc.altitude = FixedDecimal::from_fraction(i64::from(num), i64::from(den));
                if r == Some(1) {
                    gc.altitude = -gc.altitude;
                }
            }
            _ => bail!("invalid GPS altitude"),
        }
        Ok(gc)
    }

    pub fn to_exif(&self) -> ExifGps {
        if self.is_empty() {
            return ExifGps::default();
        }
        let mut e = ExifGps {
            lat_ref: if self.latitude.is_negative() { "S" } else { "N" }.to_string(),
            lat: to_exif_degrees(self.latitude.abs()),
            lon_ref: if self.longitude.is_negative() { "W" } else { "E" }.to_string(),
            lon: to_exif_degrees(self.longitude.abs()),
            ..ExifGps::default()
        };
        if self.has_altitude() {
            e.alt_ref = Some(u8::from(self.altitude.is_negative()));
            e.alt = Some(to_exif_rational(self.altitude.abs()));
        }
        e
    }

    /// Decode the XMP representation. Angles may be `DDD,MM.mmX`,
    /// `DDD,MM,SSX`, `DDD.ddX` or a signed decimal.
    pub fn from_xmp(x: &XmpGps) -> Result<Self> {
        let mut gc = Self {
            latitude: xmp_angle(&x.lat, 90)?,
            longitude: xmp_angle(&x.lon, 180)?,
            altitude: FixedDecimal::ZERO,
        };
        if !x.alt.is_empty() {
            gc.altitude = xmp_altitude(&x.alt_ref, &x.alt)?;
        }
        Ok(gc)
    }

    /// Always renders angles as `D,MM.mmX` and altitude as a reduced fraction.
    pub fn to_xmp(&self) -> XmpGps {
        if self.is_empty() {
            return XmpGps::default();
        }
        let mut x = XmpGps {
            lat: to_xmp_angle(self.latitude, 'N', 'S'),
            lon: to_xmp_angle(self.longitude, 'E', 'W'),
            ..XmpGps::default()
        };
        if self.has_altitude() {
            x.alt_ref = if self.altitude.is_negative() { "1" } else { "0" }.to_string();
            let (num, den) = self.altitude.abs().to_fraction();
            x.alt = format!("{num}/{den}");
        }
        x
    }

    /// Within 0.000003 degrees (about a hundredth of an arc-second) and 0.01 m
    /// of altitude. A missing altitude matches any altitude. Returns the more
    /// precise of the two.
    pub fn equivalent(&self, other: &GpsCoords) -> Option<GpsCoords> {
        if self.is_empty() || other.is_empty() {
            return (self.is_empty() && other.is_empty()).then(Self::default);
        }
        if (self.latitude - other.latitude).abs() > FixedDecimal(3)
            || (self.longitude - other.longitude).abs() > FixedDecimal(3)
        {
            return None;
        }
        if !other.has_altitude() {
            return Some(*self);
        }
        if !self.has_altitude() {
            return Some(*other);
        }
        if (self.altitude - other.altitude).abs() > FixedDecimal(10_000) {
            return None;
        }
        Some(*self)
    }
}

impl fmt::Display for GpsCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(f, "{}, {}", self.latitude, self.longitude)?;
        if self.has_altitude() {
            write!(f, ", {}ft", self.altitude.div(FEET_TO_METERS))?;
        }
        Ok(())
    }
}

fn exif_degrees(r: &[(u32, u32)]) -> Result<FixedDecimal> {
    if r.len() != 3 {
        bail!("invalid GPS angle");
    }
    let (d, m, mut s) = (r[0], r[1], r[2]);
    if d.1 == 0 || m.1 == 0 {
        bail!("invalid GPS angle");
    }
    // A zero denominator on zero seconds is seen in the wild.
    if s.1 == 0 {
        if s.0 != 0 {
            bail!("invalid GPS angle");
        }
        s.1 = 1;
    }
    Ok(FixedDecimal::from_fraction(i64::from(d.0), i64::from(d.1))
        + FixedDecimal::from_fraction(i64::from(m.0), i64::from(m.1) * 60)
        + FixedDecimal::from_fraction(i64::from(s.0), i64::from(s.1) * 3600))
}

fn to_exif_degrees(f: FixedDecimal) -> Vec<(u32, u32)> {
    vec![to_exif_rational(f), (0, 1), (0, 1)]
}

fn to_exif_rational(f: FixedDecimal) -> (u32, u32) {
    let (mut num, mut den) = f.to_fraction();
    while num > i64::from(u32::MAX) && den > 1 {
        num /= 10;
        den /= 10;
    }
    (num.clamp(0, i64::from(u32::MAX)) as u32, den as u32)
}

fn xmp_angle(s: &str, max: i64) -> Result<FixedDecimal> {
    let err = || anyhow!("invalid XMP GPS angle {s:?}");
    let mut s = s.trim();
    if s.is_empty() {
        return Ok(FixedDecimal::ZERO);
    }
    let mut neg = false;
    if let Some(dir) = s.chars().last().filter(|c| "NSEW".contains(*c)) {
        neg = dir == 'S' || dir == 'W';
        s = &s[..s.len() - 1];
    } else if let Some(rest) = s.strip_prefix('-') {
        neg = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    let parts: Vec<&str> = s.split(',').collect();
    let value = match parts.as_slice() {
        [deg] => FixedDecimal::parse(deg).map_err(|_| err())?,
        [deg, min] => {
            let degrees: i64 = deg.trim().parse().map_err(|_| err())?;
            if !(0..=max).contains(&degrees) {
                return Err(err());
            }
            let minutes = FixedDecimal::parse(min).map_err(|_| err())?;
            if minutes.is_negative() || minutes >= FixedDecimal::from_int(60) {
                return Err(err());
            }
            FixedDecimal::from_int(degrees) + FixedDecimal(minutes.0 / 60)
        }
        [deg, min, sec] => {
            let degrees: i64 = deg.trim().parse().map_err(|_| err())?;
            if !(0..=max).contains(&degrees) {
                return Err(err());
            }
            let minutes: i64 = min.trim().parse().map_err(|_| err())?;
            let seconds: i64 = sec.trim().parse().map_err(|_| err())?;
            if !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
                return Err(err());
            }
            FixedDecimal::from_int(degrees)
                + FixedDecimal::from_fraction(minutes, 60)
                + FixedDecimal::from_fraction(seconds, 3600)
        }
        _ => return Err(err()),
    };
    if value > FixedDecimal::from_int(max) {
        return Err(err());
    }
    Ok(if neg { -value } else { value })
}

fn xmp_altitude(alt_ref: &str, alt: &str) -> Result<FixedDecimal> {
    let err = || anyhow!("invalid XMP GPS altitude {alt:?}");
    let mut parts: Vec<&str> = alt.split('/').collect();
    if parts.len() == 1 {
        parts = alt.split(' ').collect();
    }
    let value = match parts.as_slice() {
        [v] => {
            let f = FixedDecimal::parse(v).map_err(|_| err())?;
            if alt_ref == "1" && f.is_negative() {
                return Err(err());
            }
            f
        }
        [num, den] => {
            let num: i64 = num.trim().parse().map_err(|_| err())?;
            let den: i64 = den.trim().parse().map_err(|_| err())?;
            if den < 1 {
                return Err(err());
            }
            FixedDecimal::from_fraction(num, den)
        }
        _ => return Err(err()),
    };
    match alt_ref {
        "" | "0" => Ok(value),
        "1" => Ok(-value),
        _ => Err(err()),
    }
}

fn to_xmp_angle(f: FixedDecimal, pos: char, neg: char) -> String {
    let suffix = if f.is_negative() { neg } else { pos };
    let f = f.abs();
    let minutes = FixedDecimal((f - FixedDecimal::from_int(f.int())).0 * 60);
    format!("{},{}{}", f.int(), minutes, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_render_and_cross_container_round_trip() {
        let gc = GpsCoords::parse("37.33544, -122.01990, 200ft").unwrap();
        assert_eq!(gc.to_string(), "37.33544, -122.0199, 200ft");

        let via_exif = GpsCoords::from_exif(&gc.to_exif()).unwrap();
        let via_xmp = GpsCoords::from_xmp(&via_exif.to_xmp()).unwrap();
        assert!(gc.equivalent(&via_xmp).is_some());
        assert_eq!(via_xmp.to_string(), "37.33544, -122.0199, 200ft");
    }

    #[test]
    fn meters_and_bounds() {
        let gc = GpsCoords::parse("10, 20, 30.48m").unwrap();
        assert_eq!(gc.to_string(), "10, 20, 100ft");
        assert!(GpsCoords::parse("91, 0").is_err());
        assert!(GpsCoords::parse("0, 181").is_err());
        assert!(GpsCoords::parse("1, 2, 3").is_err());
        assert!(GpsCoords::parse("1").is_err());
    }

    #[test]
    fn xmp_angle_forms() {
        let x = XmpGps {
            lat: "37,20.1264N".into(),
            lon: "122,1,11W".into(),
            ..XmpGps::default()
        };
        let gc = GpsCoords::from_xmp(&x).unwrap();
        assert_eq!(gc.latitude, FixedDecimal(37_335_440));
        assert_eq!(gc.longitude, FixedDecimal(-122_019_723));
        assert_eq!(gc.to_xmp().lat, "37,20.1264N");
    }

    #[test]
    fn xmp_angle_degrees_are_bounded() {
        let huge = XmpGps {
            lat: "9223372036854775807,0N".into(),
            lon: "0,0E".into(),
            ..XmpGps::default()
        };
        assert!(GpsCoords::from_xmp(&huge).is_err());
        let over = XmpGps {
            lat: "0,0N".into(),
            lon: "181,0,0E".into(),
            ..XmpGps::default()
        };
        assert!(GpsCoords::from_xmp(&over).is_err());
    }

    #[test]
    fn exif_zero_seconds_denominator_is_tolerated() {
        let e = ExifGps {
            lat_ref: "N".into(),
            lat: vec![(37, 1), (30, 1), (0, 0)],
            lon_ref: "E".into(),
            lon: vec![(10, 1), (0, 1), (0, 1)],
            ..ExifGps::default()
        };
        let gc = GpsCoords::from_exif(&e).unwrap();
        assert_eq!(gc.latitude, FixedDecimal(37_500_000));
    }
}
