//! Canonical value types for the logical fields.

mod altstring;
mod bounded;
pub mod countries;
mod datetime;
mod fixed;
mod gps;
mod hier;
mod location;

pub use altstring::{AltItem, AltString};
pub use bounded::{truncate, BoundedString};
pub use datetime::DateTime;
pub use fixed::FixedDecimal;
pub use gps::{ExifGps, GpsCoords, XmpGps};
pub use hier::{HierValue, Keyword, KeywordComponent, Person};
pub use location::Location;

use std::fmt;

/// One value of a logical field. Operations pass these through opaquely;
/// the field that produced a value knows which variant it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    DateTime(DateTime),
    Gps(GpsCoords),
    Location(Location),
    Keyword(Keyword),
    Person(Person),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Text(s) => s.is_empty(),
            Value::DateTime(dt) => dt.is_empty(),
            Value::Gps(gc) => gc.is_empty(),
            Value::Location(loc) => loc.is_empty(),
            Value::Keyword(kw) => kw.is_empty(),
            Value::Person(p) => p.name.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::DateTime(dt) => dt.fmt(f),
            Value::Gps(gc) => gc.fmt(f),
            Value::Location(loc) => loc.fmt(f),
            Value::Keyword(kw) => kw.fmt(f),
            Value::Person(p) => p.fmt(f),
        }
    }
}
