//! The logical fields the `md` operations work on.
//!
//! Each [`Field`] is a compile-time constant describing how one logical value
//! (title, date, keywords and so on) is parsed from the command line,
//! rendered, read from and written to a file's [`Providers`], and checked
//! for consistency against a reference file.
//!
//! The keyword family (groups, people, places, topics, keywords) are views
//! over the single hierarchical keyword set: a subset is selected by its
//! leading category component, and writing a subset replaces only that
//! subset.

pub mod check;

pub use check::CheckResult;

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;

use crate::error::is_not_supported;
use crate::provider::{Providers, Role, TagValue};
use crate::value::{truncate, DateTime, GpsCoords, Keyword, Location, Person, Value};
use check::{check_rows, location_equal, text_equal};

/// Identifies a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    Artist,
    Caption,
    DateTime,
    Faces,
    Gps,
    Groups,
    Keywords,
    Location,
    People,
    Places,
    Title,
    Topics,
}

/// A logical metadata field.
#[derive(Debug)]
pub struct Field {
    pub id: FieldId,
    pub name: &'static str,
    /// Same as `name` for single-valued fields.
    pub plural: &'static str,
    pub label: &'static str,
    /// Two-character column heading for the check grid.
    pub short: &'static str,
    pub multi: bool,
    aliases: &'static [&'static str],
    /// Absence is reported as `ExpectedAbsent` rather than `OptionalAbsent`.
    expected: bool,
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Field {}

// ============================================================================
// Registry
// ============================================================================

pub static TITLE: Field = Field {
    id: FieldId::Title,
    name: "title",
    plural: "title",
    label: "Title",
    short: " T",
    multi: false,
    aliases: &["title", "t"],
    expected: false,
};

pub static DATETIME: Field = Field {
    id: FieldId::DateTime,
    name: "datetime",
    plural: "datetime",
    label: "Date/Time",
    short: "DT",
    multi: false,
    aliases: &["datetime", "date", "time", "d"],
    expected: true,
};

pub static ARTIST: Field = Field {
    id: FieldId::Artist,
    name: "artist",
    plural: "artist",
    label: "Artist",
    short: " A",
    multi: false,
    aliases: &["artist", "a"],
    expected: true,
};

pub static GPS: Field = Field {
    id: FieldId::Gps,
    name: "gps",
    plural: "gps",
    label: "GPS Coords",
    short: " G",
    multi: false,
    aliases: &["gps", "g"],
    expected: true,
};

pub static LOCATION: Field = Field {
    id: FieldId::Location,
    name: "location",
    plural: "location",
    label: "Location",
    short: " L",
    multi: false,
    aliases: &["location", "loc", "l"],
    expected: false,
};

pub static PLACES: Field = Field {
    id: FieldId::Places,
    name: "place",
    plural: "places",
    label: "Place",
    short: "PL",
    multi: true,
    aliases: &["place", "places"],
    expected: true,
};

pub static PEOPLE: Field = Field {
    id: FieldId::People,
    name: "person",
    plural: "people",
    label: "Person",
    short: "PE",
    multi: true,
    aliases: &["person", "people", "p"],
    expected: false,
};

pub static FACES: Field = Field {
    id: FieldId::Faces,
    name: "face",
    plural: "faces",
    label: "Face",
    short: " F",
    multi: true,
    aliases: &["face", "faces", "f"],
    expected: false,
};

pub static GROUPS: Field = Field {
    id: FieldId::Groups,
    name: "group",
    plural: "groups",
    label: "Group",
    short: "GR",
    multi: true,
    aliases: &["group", "groups"],
    expected: false,
};

pub static TOPICS: Field = Field {
    id: FieldId::Topics,
    name: "topic",
    plural: "topics",
    label: "Topic",
    short: "TP",
    multi: true,
    aliases: &["topic", "topics"],
    expected: false,
};

pub static KEYWORDS: Field = Field {
    id: FieldId::Keywords,
    name: "keyword",
    plural: "keywords",
    label: "Keyword",
    short: "KW",
    multi: true,
    aliases: &["keyword", "keywords", "kw", "k"],
    expected: false,
};

pub static CAPTION: Field = Field {
    id: FieldId::Caption,
    name: "caption",
    plural: "caption",
    label: "Caption",
    short: " C",
    multi: false,
    aliases: &["caption", "c"],
    expected: false,
};

/// Every field, in the default show order.
pub static ALL: [&Field; 12] = [
    &TITLE, &DATETIME, &ARTIST, &GPS, &LOCATION, &PLACES, &PEOPLE, &FACES, &GROUPS, &TOPICS, &KEYWORDS, &CAPTION,
];

/// Look up a field by alias, or by an unambiguous prefix of its name or
/// plural name.
pub fn parse_field(arg: &str) -> Option<&'static Field> {
    let arg = arg.to_ascii_lowercase();
    if let Some(f) = ALL.iter().find(|f| f.aliases.contains(&arg.as_str())) {
        return Some(*f);
    }
    let mut matches = ALL
        .iter()
        .filter(|f| !arg.is_empty() && (f.name.starts_with(&arg) || f.plural.starts_with(&arg)));
    match (matches.next(), matches.next()) {
        (Some(f), None) => Some(*f),
        _ => None,
    }
}

/// Parse a field list, expanding `all`. An empty list means every field.
pub fn parse_fields(args: &[String]) -> Result<Vec<&'static Field>> {
    if args.is_empty() {
        return Ok(ALL.to_vec());
    }
    let mut fields: Vec<&'static Field> = Vec::new();
    for arg in args {
        if arg == "all" {
            for f in ALL {
                if !fields.contains(&f) {
                    fields.push(f);
                }
            }
            continue;
        }
        match parse_field(arg) {
            Some(f) if !fields.contains(&f) => fields.push(f),
            Some(_) => {}
            None => bail!("no such field {arg:?}"),
        }
    }
    Ok(fields)
}

// ============================================================================
// Keyword subsets
// ============================================================================

/// Which keyword field a keyword belongs to.
fn keyword_subset(kw: &Keyword) -> FieldId {
    match (kw.first(), kw.len()) {
        (Some("Groups"), n) if n >= 2 => FieldId::Groups,
        (Some("Places"), n) if n >= 2 => FieldId::Places,
        (Some("Topics"), n) if n >= 2 => FieldId::Topics,
        (Some("People"), 2) => FieldId::People,
        _ => FieldId::Keywords,
    }
}

fn prefix_of(id: FieldId) -> Option<&'static str> {
    match id {
        FieldId::Groups => Some("Groups"),
        FieldId::People => Some("People"),
        FieldId::Places => Some("Places"),
        FieldId::Topics => Some("Topics"),
        _ => None,
    }
}

/// True if the location's names appear, in order, among the place's
/// components. The country matches by name or code.
fn congruent(loc: &Location, place: &Keyword) -> bool {
    let words = place.words();
    let mut rest = words.iter().skip(1);
    let country_ok = loc.country_code.is_empty()
        || rest
            .by_ref()
            .any(|w| *w == loc.country_name || w.eq_ignore_ascii_case(&loc.country_code));
    country_ok
        && [&loc.state, &loc.city, &loc.sublocation]
            .into_iter()
            .filter(|n| !n.is_empty())
            .all(|n| rest.by_ref().any(|w| w == n))
}

fn keyword_equal(r: &Value, t: &Value, cap: usize) -> bool {
    match (r, t) {
        (Value::Keyword(r), Value::Keyword(t)) => {
            r == t || (cap != 0 && r.len() == 1 && t.len() == 1 && truncate(r.flattened(), cap) == t.flattened())
        }
        _ => false,
    }
}

/// Ignore `NotSupported` for a secondary write.
fn tolerate(r: Result<()>) -> Result<()> {
    match r {
        Err(e) if is_not_supported(&e) => Ok(()),
        other => other,
    }
}

fn single(v: Value) -> Vec<Value> {
    if v.is_empty() { Vec::new() } else { vec![v] }
}

fn first_text(values: &[Value]) -> &str {
    values.iter().find_map(Value::as_text).unwrap_or("")
}

// ============================================================================
// Field behaviour
// ============================================================================

impl Field {
    fn is_keyword_family(&self) -> bool {
        matches!(
            self.id,
            FieldId::Groups | FieldId::Keywords | FieldId::People | FieldId::Places | FieldId::Topics
        )
    }

    fn member(&self, kw: &Keyword) -> bool {
        keyword_subset(kw) == self.id
    }

    /// Parse a command-line value.
    pub fn parse(&self, s: &str) -> Result<Value> {
        let value = match self.id {
            FieldId::Artist | FieldId::Title => Value::Text(s.trim().to_string()),
            FieldId::Caption => Value::Text(s.to_string()),
            FieldId::DateTime => Value::DateTime(DateTime::parse(s.trim())?),
            FieldId::Gps => Value::Gps(GpsCoords::parse(s)?),
            FieldId::Location => Value::Location(Location::parse(s)?),
            FieldId::People => Value::Person(Person::parse(s)?),
            FieldId::Faces => Value::Text(Person::parse(s)?.name),
            FieldId::Groups | FieldId::Places | FieldId::Topics | FieldId::Keywords => {
                let kw = Keyword::parse(s, prefix_of(self.id))?;
                if kw.is_empty() || (kw.len() == 1 && prefix_of(self.id).is_some()) {
                    bail!("{} must not be empty", self.name);
                }
                Value::Keyword(kw)
            }
        };
        Ok(value)
    }

    /// Parse each value, reporting which field rejected it.
    pub fn parse_all(&self, args: &[String]) -> Result<Vec<Value>> {
        args.iter()
            .map(|a| self.parse(a).with_context(|| format!("invalid {} {a:?}", self.name)))
            .collect()
    }

    /// Display form of a value of this field.
    pub fn render(&self, v: &Value) -> String {
        match (self.id, v) {
            (FieldId::Groups | FieldId::Places | FieldId::Topics, Value::Keyword(kw)) => kw.display_without_prefix(),
            _ => v.to_string(),
        }
    }

    pub fn equal(&self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::DateTime(a), Value::DateTime(b)) => a.equivalent(b).is_some(),
            (Value::Gps(a), Value::Gps(b)) => a.equivalent(b).is_some(),
            _ => a == b,
        }
    }

    /// The reconciled values of this field. Empty values are omitted.
    pub fn get(&self, p: &Providers) -> Vec<Value> {
        match self.id {
            FieldId::Artist => single(Value::Text(p.artist())),
            FieldId::Caption => single(Value::Text(p.caption())),
            FieldId::DateTime => single(Value::DateTime(p.datetime())),
            FieldId::Gps => single(Value::Gps(p.gps())),
            FieldId::Location => single(Value::Location(p.location())),
            FieldId::Title => single(Value::Text(p.title())),
            FieldId::Faces => p.faces().into_iter().map(Value::Text).collect(),
            FieldId::People => {
                let faces = p.faces();
                let mut people: Vec<Person> = p
                    .keywords()
                    .iter()
                    .filter(|k| self.member(k))
                    .map(|k| {
                        let name = k.words()[1].to_string();
                        Person { face: faces.contains(&name), name }
                    })
                    .collect();
                for f in faces {
                    if !people.iter().any(|p| p.name == f) {
                        people.push(Person { name: f, face: true });
                    }
                }
                people.into_iter().map(Value::Person).collect()
            }
            FieldId::Groups | FieldId::Keywords | FieldId::Places | FieldId::Topics => p
                .keywords()
                .into_iter()
                .filter(|k| self.member(k))
                .map(Value::Keyword)
                .collect(),
        }
    }

    /// The raw tags backing this field, with their values.
    pub fn tags(&self, p: &Providers) -> Vec<TagValue> {
        match self.id {
            FieldId::Artist => p.artist_tags(),
            FieldId::Caption => p.caption_tags(),
            FieldId::DateTime => p.datetime_tags(),
            FieldId::Gps => p.gps_tags(),
            FieldId::Location => p.location_tags(),
            FieldId::Title => p.title_tags(),
            FieldId::Faces => p.face_tags(),
            FieldId::People => {
                let mut rows = self.keyword_rows(p);
                rows.extend(p.face_tags());
                rows
            }
            FieldId::Groups | FieldId::Keywords | FieldId::Places | FieldId::Topics => self.keyword_rows(p),
        }
    }

    /// Keyword tag rows that belong to this subset. A tag holding no value
    /// of the subset is kept as one empty row.
    fn keyword_rows(&self, p: &Providers) -> Vec<TagValue> {
        let all = p.keywords();
        let leaves: BTreeSet<&str> = all.iter().filter(|k| self.member(k)).map(Keyword::flattened).collect();
        let others: BTreeSet<&str> = all.iter().filter(|k| !self.member(k)).map(Keyword::flattened).collect();
        let keep = |row: &TagValue| match (&row.value, row.role) {
            (Value::Keyword(kw), _) if kw.is_empty() => false,
            (Value::Keyword(kw), Role::Flat) => {
                if self.id == FieldId::Keywords {
                    !others.contains(kw.flattened()) || leaves.contains(kw.flattened())
                } else {
                    leaves.contains(kw.flattened())
                }
            }
            (Value::Keyword(kw), _) => self.member(kw),
            _ => false,
        };
        let rows = p.keyword_tags();
        let mut out: Vec<TagValue> = rows.iter().filter(|r| keep(r)).cloned().collect();
        for row in &rows {
            if !out.iter().any(|r| r.label == row.label) {
                out.push(TagValue {
                    value: Value::Keyword(Keyword::default()),
                    ..row.clone()
                });
            }
        }
        out
    }

    /// Replace the values of this field.
    pub fn set(&self, p: &mut Providers, values: &[Value]) -> Result<()> {
        match self.id {
            FieldId::Artist => p.set_artist(first_text(values)),
            FieldId::Caption => p.set_caption(first_text(values)),
            FieldId::Title => p.set_title(first_text(values)),
            FieldId::DateTime => {
                let dt = values.iter().find_map(|v| match v {
                    Value::DateTime(dt) => Some(dt.clone()),
                    _ => None,
                });
                p.set_datetime(&dt.unwrap_or_default())
            }
            FieldId::Gps => {
                let gc = values.iter().find_map(|v| match v {
                    Value::Gps(gc) => Some(*gc),
                    _ => None,
                });
                p.set_gps(&gc.unwrap_or_default())
            }
            FieldId::Location => {
                let loc = values.iter().find_map(|v| match v {
                    Value::Location(loc) => Some(loc.clone()),
                    _ => None,
                });
                p.set_location(&loc.unwrap_or_default())
            }
            FieldId::Faces => {
                let names: Vec<String> = values.iter().filter_map(Value::as_text).map(str::to_string).collect();
                p.set_faces(&names)
            }
            FieldId::People => {
                let names: Vec<&str> = values
                    .iter()
                    .filter_map(|v| match v {
                        Value::Person(person) => Some(person.name.as_str()),
                        _ => None,
                    })
                    .collect();
                let faces: Vec<String> = p.faces().into_iter().filter(|f| names.contains(&f.as_str())).collect();
                tolerate(p.set_faces(&faces))?;
                let kws: Vec<Keyword> = names
                    .iter()
                    .map(|n| Keyword::from_words(&["People", *n]))
                    .collect();
                self.set_subset(p, kws)
            }
            FieldId::Places => {
                let kws = keywords_of(values);
                self.set_subset(p, kws.clone())?;
                let loc = p.location();
                if !loc.is_empty() && !kws.iter().any(|k| congruent(&loc, k)) {
                    log::debug!("clearing location {loc} not named by any place");
                    tolerate(p.set_location(&Location::default()))?;
                }
                Ok(())
            }
            FieldId::Groups | FieldId::Keywords | FieldId::Topics => self.set_subset(p, keywords_of(values)),
        }
    }

    fn set_subset(&self, p: &mut Providers, values: Vec<Keyword>) -> Result<()> {
        let mut all: Vec<Keyword> = p.keywords().into_iter().filter(|k| !self.member(k)).collect();
        for kw in values {
            if !all.contains(&kw) {
                all.push(kw);
            }
        }
        p.set_keywords(&all)
    }

    /// Check the target's tagging of this field against the reference
    /// file's reconciled value.
    pub fn check(&self, reference: &Providers, target: &Providers) -> CheckResult {
        if self.id == FieldId::Faces {
            let n = target.faces().len();
            return if n > 0 { CheckResult::Present(n) } else { CheckResult::OptionalAbsent };
        }
        let rows = self.tags(target);
        let problem = if self.is_keyword_family() {
            let expect: Vec<Value> = reference
                .keywords()
                .into_iter()
                .filter(|k| self.member(k))
                .map(Value::Keyword)
                .collect();
            let flat: Vec<Value> = expect
                .iter()
                .filter_map(|v| match v {
                    Value::Keyword(k) => Some(Value::Keyword(Keyword::from_words(&[k.flattened()]))),
                    _ => None,
                })
                .collect();
            let mut problem = check_rows(&expect, &flat, &rows, keyword_equal);
            if self.id == FieldId::People {
                let names: Vec<String> = self
                    .get(reference)
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::Person(p) => Some(p.name),
                        _ => None,
                    })
                    .collect();
                if target.faces().iter().any(|f| !names.contains(f)) {
                    problem = Some(CheckResult::ConflictingValues);
                }
            }
            problem
        } else {
            let expect = self.get(reference);
            match self.id {
                FieldId::DateTime | FieldId::Gps => check_rows(&expect, &[], &rows, |r, t, _| self.equal(r, t)),
                FieldId::Location => check_rows(&expect, &[], &rows, |r, t, _| match (r, t) {
                    (Value::Location(r), Value::Location(t)) => location_equal(r, t),
                    _ => false,
                }),
                _ => check_rows(&expect, &[], &rows, text_equal),
            }
        };
        if let Some(problem) = problem {
            return problem;
        }
        match self.get(target).len() {
            0 if self.expected => CheckResult::ExpectedAbsent,
            0 => CheckResult::OptionalAbsent,
            n => CheckResult::Present(n),
        }
    }
}

fn keywords_of(values: &[Value]) -> Vec<Keyword> {
    values
        .iter()
        .filter_map(|v| match v {
            Value::Keyword(k) => Some(k.clone()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ExifProvider, IptcProvider, Provider, XmpProvider};
    use crate::tags::exif::empty_block;
    use crate::tags::iptc::IptcTags;
    use crate::tags::xmp::XmpTags;

    struct File {
        exif: ExifProvider,
        xmp: XmpProvider,
        iptc: IptcProvider,
    }

    impl File {
        fn new() -> Self {
            let mut problems = Vec::new();
            File {
                exif: ExifProvider::new(empty_block(), &mut problems),
                xmp: XmpProvider::new(XmpTags::new(), &mut problems),
                iptc: IptcProvider::new(IptcTags::new(), &mut problems),
            }
        }

        fn p(&mut self) -> Providers<'_> {
            Providers::new(vec![&mut self.exif as &mut dyn Provider, &mut self.xmp, &mut self.iptc])
        }
    }

    fn set(f: &mut File, field: &Field, values: &[&str]) {
        let values: Vec<Value> = values.iter().map(|v| field.parse(v).unwrap()).collect();
        field.set(&mut f.p(), &values).unwrap();
    }

    fn shown(f: &mut File, field: &Field) -> Vec<String> {
        field.get(&f.p()).iter().map(|v| field.render(v)).collect()
    }

    // ── registry ──

    #[test]
    fn field_names_and_prefixes() {
        assert_eq!(parse_field("d"), Some(&DATETIME));
        assert_eq!(parse_field("kw"), Some(&KEYWORDS));
        assert_eq!(parse_field("people"), Some(&PEOPLE));
        assert_eq!(parse_field("capt"), Some(&CAPTION));
        assert_eq!(parse_field("ti"), Some(&TITLE));
        assert_eq!(parse_field("top"), Some(&TOPICS));
        assert_eq!(parse_field("g"), Some(&GPS));
        assert_eq!(parse_field("gr"), Some(&GROUPS));
        assert_eq!(parse_field("x"), None);
        assert_eq!(parse_field("p"), Some(&PEOPLE));
        assert_eq!(parse_field("pl"), Some(&PLACES));
    }

    #[test]
    fn all_expands_in_show_order() {
        let fields = parse_fields(&["all".to_string()]).unwrap();
        let names: Vec<&str> = fields.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            [
                "title", "datetime", "artist", "gps", "location", "place", "person", "face", "group", "topic",
                "keyword", "caption"
            ]
        );
        assert!(parse_fields(&["bogus".to_string()]).is_err());
    }

    // ── keyword family ──

    #[test]
    fn subsets_are_views_of_one_keyword_set() {
        let mut f = File::new();
        set(&mut f, &KEYWORDS, &["Cats", "Pets/Dogs"]);
        set(&mut f, &PLACES, &["USA/California/Cupertino"]);
        set(&mut f, &PEOPLE, &["Alice"]);
        assert_eq!(shown(&mut f, &PLACES), ["USA / California / Cupertino"]);
        assert_eq!(shown(&mut f, &PEOPLE), ["Alice"]);
        assert_eq!(shown(&mut f, &KEYWORDS), ["Cats", "Pets / Dogs"]);
        // Replacing places leaves the others alone.
        set(&mut f, &PLACES, &["FRA/Paris"]);
        assert_eq!(shown(&mut f, &PLACES), ["FRA / Paris"]);
        assert_eq!(shown(&mut f, &PEOPLE), ["Alice"]);
        assert_eq!(f.iptc.keywords().len(), 4);
    }

    #[test]
    fn places_clear_incongruent_location() {
        let mut f = File::new();
        set(&mut f, &LOCATION, &["USA / CA / Cupertino"]);
        set(&mut f, &PLACES, &["United States/California/Cupertino/Apple Park"]);
        assert!(!LOCATION.get(&f.p()).is_empty());
        set(&mut f, &PLACES, &["FRA/Paris"]);
        assert!(LOCATION.get(&f.p()).is_empty());
    }

    #[test]
    fn keyword_parse_rules() {
        assert!(PLACES.parse("").is_err());
        assert!(KEYWORDS.parse("a|b").is_err());
        assert!(PEOPLE.parse("A/B").is_err());
        assert_eq!(PEOPLE.parse("Bob [F]").unwrap(), Value::Person(Person::parse("Bob").unwrap()));
    }

    // ── check ──

    #[test]
    fn check_detects_missing_and_conflicting_tags() {
        let mut reference = File::new();
        set(&mut reference, &TITLE, &["Sunset"]);
        let mut target = File::new();
        set(&mut target, &TITLE, &["Sunset"]);
        assert_eq!(TITLE.check(&reference.p(), &target.p()), CheckResult::Present(1));

        target.iptc.set_title("Dawn").unwrap();
        assert_eq!(TITLE.check(&reference.p(), &target.p()), CheckResult::ConflictingValues);

        let mut partial = File::new();
        partial.xmp.set_title("Sunset").unwrap();
        partial.iptc.tags_mut().set_string(crate::tags::iptc::BYLINE, "someone").unwrap();
        assert_eq!(TITLE.check(&reference.p(), &partial.p()), CheckResult::IncorrectlyTagged);
    }

    #[test]
    fn check_absence() {
        let mut a = File::new();
        let mut b = File::new();
        assert_eq!(DATETIME.check(&a.p(), &b.p()), CheckResult::ExpectedAbsent);
        assert_eq!(CAPTION.check(&a.p(), &b.p()), CheckResult::OptionalAbsent);
    }

    #[test]
    fn check_keywords_counts_values() {
        let tagged = || {
            let mut f = File::new();
            set(&mut f, &KEYWORDS, &["Cats", "Dogs"]);
            set(&mut f, &PLACES, &["FRA/Paris"]);
            f
        };
        let (mut a, mut b) = (tagged(), tagged());
        assert_eq!(KEYWORDS.check(&a.p(), &b.p()), CheckResult::Present(2));
        assert_eq!(PLACES.check(&a.p(), &b.p()), CheckResult::Present(1));
        assert_eq!(GROUPS.check(&a.p(), &b.p()), CheckResult::OptionalAbsent);

        b.iptc.set_keywords(&[Keyword::from_words(&["Cats"])]).unwrap();
        assert_eq!(KEYWORDS.check(&a.p(), &b.p()), CheckResult::IncorrectlyTagged);
    }
}
