use anyhow::{bail, Result};
use std::fmt;

/// A calendar date and time with optional sub-second digits and zone.
///
/// The components are kept as the strings they were parsed from so that each
/// container's rendering (EXIF, IPTC, XMP) is lossless. An empty date means
/// the whole value is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DateTime {
    date: String,   // YYYY-MM-DD
    time: String,   // HH:MM:SS
    subsec: String, // zero or more digits
    zone: String,   // "", "Z", +HH:MM or -HH:MM
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn num(s: &str) -> u32 {
    s.parse().unwrap_or(u32::MAX)
}

fn valid_date(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() != 10 || b[4] != b'-' || b[7] != b'-' {
        return false;
    }
    if !all_digits(&s[0..4]) || !all_digits(&s[5..7]) || !all_digits(&s[8..10]) {
        return false;
    }
    let (month, day) = (num(&s[5..7]), num(&s[8..10]));
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

fn valid_time(s: &str, with_seconds: bool) -> bool {
    let b = s.as_bytes();
    let want = if with_seconds { 8 } else { 5 };
    if b.len() != want || b[2] != b':' {
        return false;
    }
    if !all_digits(&s[0..2]) || !all_digits(&s[3..5]) || num(&s[0..2]) > 23 || num(&s[3..5]) > 59 {
        return false;
    }
    !with_seconds || (b[5] == b':' && all_digits(&s[6..8]) && num(&s[6..8]) <= 60)
}

fn valid_offset(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 6
        && (b[0] == b'+' || b[0] == b'-')
        && b[3] == b':'
        && all_digits(&s[1..3])
        && all_digits(&s[4..6])
        && num(&s[1..3]) <= 23
        && num(&s[4..6]) <= 59
}

fn normalize_zone(zone: &str) -> String {
    if zone == "+00:00" || zone == "-00:00" {
        "Z".to_string()
    } else {
        zone.to_string()
    }
}

impl DateTime {
    /// Parse an ISO 8601 date, date-time or date-time with fraction, optionally
    /// followed by `Z` or `±HH:MM`. A bare date may not carry a zone. Times
    /// without seconds (`THH:MM`) are accepted because XMP allows them.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        if !s.is_ascii() {
            bail!("invalid date/time value");
        }
        if s.len() == 10 {
            if !valid_date(s) {
                bail!("invalid date/time value");
            }
            return Ok(Self {
                date: s.to_string(),
                time: "00:00:00".to_string(),
                ..Self::default()
            });
        }
        if s.len() < 16 || !valid_date(&s[..10]) || s.as_bytes()[10] != b'T' {
            bail!("invalid date/time value");
        }
        let mut rest = &s[11..];
        let mut zone = String::new();
        if let Some(r) = rest.strip_suffix('Z') {
            zone = "Z".to_string();
            rest = r;
        } else if rest.len() >= 6 {
            let tail = &rest[rest.len() - 6..];
            if valid_offset(tail) {
                zone = normalize_zone(tail);
                rest = &rest[..rest.len() - 6];
            }
        }
        let (time, subsec) = if valid_time(rest, false) {
            (format!("{rest}:00"), String::new())
        } else if rest.len() >= 8 && valid_time(&rest[..8], true) {
            let frac = &rest[8..];
            if frac.is_empty() {
                (rest[..8].to_string(), String::new())
            } else if let Some(digits) = frac.strip_prefix('.').filter(|d| all_digits(d)) {
                (rest[..8].to_string(), digits.to_string())
            } else {
                bail!("invalid date/time value");
            }
        } else {
            bail!("invalid date/time value");
        };
        Ok(Self {
            date: s[..10].to_string(),
            time,
            subsec,
            zone,
        })
    }

    /// Parse the EXIF triple: `YYYY:MM:DD HH:MM:SS`, SubSecTime and OffsetTime.
    pub fn parse_exif(datetime: &str, subsec: &str, offset: &str) -> Result<Self> {
        let datetime = datetime.trim();
        if datetime.is_empty()
            || datetime == "0000:00:00 00:00:00"
            || datetime.trim_matches(|c: char| c == ':' || c == ' ').is_empty()
        {
            if !subsec.trim().is_empty() || !offset.trim().is_empty() {
                bail!("invalid EXIF date/time value");
            }
            return Ok(Self::default());
        }
        let b = datetime.as_bytes();
        if !datetime.is_ascii() || b.len() != 19 || b[4] != b':' || b[7] != b':' || b[10] != b' ' {
            bail!("invalid EXIF date/time value");
        }
        let date = format!("{}-{}-{}", &datetime[0..4], &datetime[5..7], &datetime[8..10]);
        let time = &datetime[11..19];
        if !valid_date(&date) || !valid_time(time, true) {
            bail!("invalid EXIF date/time value");
        }
        let subsec = subsec.trim();
        if !subsec.is_empty() && !all_digits(subsec) {
            bail!("invalid EXIF subsecond value");
        }
        let offset = offset.trim();
        if !offset.is_empty() && !valid_offset(offset) {
            bail!("invalid EXIF offset value");
        }
        Ok(Self {
            date,
            time: time.to_string(),
            subsec: subsec.to_string(),
            zone: normalize_zone(offset),
        })
    }

    /// EXIF rendering: (DateTime, SubSecTime, OffsetTime). `Z` becomes `+00:00`.
    pub fn to_exif(&self) -> (String, String, String) {
        if self.is_empty() {
            return (String::new(), String::new(), String::new());
        }
        let datetime = format!("{} {}", self.date.replace('-', ":"), self.time);
        let offset = if self.zone == "Z" {
            "+00:00".to_string()
        } else {
            self.zone.clone()
        };
        (datetime, self.subsec.clone(), offset)
    }

    /// Parse the IPTC pair: `YYYYMMDD` and `HHMMSS` or `HHMMSS±HHMM`.
    pub fn parse_iptc(date: &str, time: &str) -> Result<Self> {
        let (date, time) = (date.trim(), time.trim());
        if date.is_empty() || date == "00000000" {
            return Ok(Self::default());
        }
        if date.len() != 8 || !all_digits(date) || !time.is_ascii() {
            bail!("invalid IPTC date value");
        }
        let iso = format!("{}-{}-{}", &date[0..4], &date[4..6], &date[6..8]);
        if !valid_date(&iso) {
            bail!("invalid IPTC date value");
        }
        let mut dt = Self {
            date: iso,
            time: "00:00:00".to_string(),
            ..Self::default()
        };
        if time.is_empty() {
            return Ok(dt);
        }
        if time.len() < 6 || !all_digits(&time[..6]) {
            bail!("invalid IPTC time value");
        }
        let hms = format!("{}:{}:{}", &time[0..2], &time[2..4], &time[4..6]);
        if !valid_time(&hms, true) {
            bail!("invalid IPTC time value");
        }
        dt.time = hms;
        match time.len() {
            6 => {}
            11 => {
                let offset = format!("{}:{}", &time[6..9], &time[9..11]);
                if !valid_offset(&offset) {
                    bail!("invalid IPTC time zone");
                }
                dt.zone = normalize_zone(&offset);
            }
            _ => bail!("invalid IPTC time value"),
        }
        Ok(dt)
    }

    /// IPTC rendering: (DateCreated, TimeCreated). `Z` becomes `+0000`.
    pub fn to_iptc(&self) -> (String, String) {
        if self.is_empty() {
            return (String::new(), String::new());
        }
        let date = self.date.replace('-', "");
        let time = self.time.replace(':', "");
        let zone = match self.zone.as_str() {
            "" => String::new(),
            "Z" => "+0000".to_string(),
            z => z.replace(':', ""),
        };
        (date, time + &zone)
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_empty()
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    pub fn subsec(&self) -> &str {
        &self.subsec
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Equal to the precision of the less precise value: date, time and zone
    /// must match and the sub-second digits must match unless one side has
    /// none. Returns the more precise of the two.
    pub fn equivalent(&self, other: &DateTime) -> Option<DateTime> {
        if self.is_empty() || other.is_empty() {
            return (self.is_empty() && other.is_empty()).then(Self::default);
        }
        if self.date != other.date || self.time != other.time || self.zone != other.zone {
            return None;
        }
        if self.subsec == other.subsec || other.subsec.is_empty() {
            Some(self.clone())
        } else if self.subsec.is_empty() {
            Some(other.clone())
        } else {
            None
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(f, "{}T{}", self.date, self.time)?;
        if !self.subsec.is_empty() {
            write!(f, ".{}", self.subsec)?;
        }
        f.write_str(&self.zone)
    }
}
