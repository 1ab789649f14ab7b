//! Typed access to the XMP properties the engine reads and writes.

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;

use crate::container::rdf::namespace::*;
use crate::container::rdf::{Name, Packet, Value};
use crate::value::{AltItem, AltString, DateTime, GpsCoords, Location, XmpGps};

/// A top-level XMP property with its display label.
#[derive(Debug, Clone, Copy)]
pub struct Prop {
    ns: &'static str,
    local: &'static str,
    pub label: &'static str,
}

const fn prop(ns: &'static str, local: &'static str, label: &'static str) -> Prop {
    Prop { ns, local, label }
}

impl Prop {
    pub fn name(&self) -> Name {
        Name::new(self.ns, self.local)
    }
}

pub const DC_CREATOR: Prop = prop(NS_DC, "creator", "XMP  dc:creator");
pub const DC_DESCRIPTION: Prop = prop(NS_DC, "description", "XMP  dc:description");
pub const DC_SUBJECT: Prop = prop(NS_DC, "subject", "XMP  dc:subject");
pub const DC_TITLE: Prop = prop(NS_DC, "title", "XMP  dc:title");
pub const DIGIKAM_TAGS_LIST: Prop = prop(NS_DIGIKAM, "TagsList", "XMP  digiKam:TagsList");
pub const EXIF_DATE_TIME_DIGITIZED: Prop = prop(NS_EXIF, "DateTimeDigitized", "XMP  exif:DateTimeDigitized");
pub const EXIF_DATE_TIME_ORIGINAL: Prop = prop(NS_EXIF, "DateTimeOriginal", "XMP  exif:DateTimeOriginal");
pub const EXIF_GPS: Prop = prop(NS_EXIF, "GPSLatitude", "XMP  exif:GPSCoords");
pub const EXIF_USER_COMMENT: Prop = prop(NS_EXIF, "UserComment", "XMP  exif:UserComment");
pub const IPTC_LOCATION_CREATED: Prop = prop(NS_IPTC_EXT, "LocationCreated", "XMP  iptc:LocationCreated");
pub const IPTC_LOCATION_SHOWN: Prop = prop(NS_IPTC_EXT, "LocationShown", "XMP  iptc:LocationShown");
pub const LR_HIERARCHICAL_SUBJECT: Prop = prop(NS_LR, "hierarchicalSubject", "XMP  lr:hierarchicalSubject");
pub const MP_REGION_INFO: Prop = prop(NS_MP, "RegionInfo", "XMP  MP:RegionInfo");
pub const MWG_RS_REGIONS: Prop = prop(NS_MWG_RS, "Regions", "XMP  mwg-rs:Regions");
pub const PS_DATE_CREATED: Prop = prop(NS_PHOTOSHOP, "DateCreated", "XMP  photoshop:DateCreated");
pub const TIFF_ARTIST: Prop = prop(NS_TIFF, "Artist", "XMP  tiff:Artist");
pub const TIFF_DATE_TIME: Prop = prop(NS_TIFF, "DateTime", "XMP  tiff:DateTime");
pub const TIFF_IMAGE_DESCRIPTION: Prop = prop(NS_TIFF, "ImageDescription", "XMP  tiff:ImageDescription");
pub const XMP_CREATE_DATE: Prop = prop(NS_XMP, "CreateDate", "XMP  xmp:CreateDate");
pub const XMP_METADATA_DATE: Prop = prop(NS_XMP, "MetadataDate", "XMP  xmp:MetadataDate");
pub const XMP_MODIFY_DATE: Prop = prop(NS_XMP, "ModifyDate", "XMP  xmp:ModifyDate");

/// Date properties in read-priority order.
pub const DATE_PROPS: [Prop; 7] = [
    EXIF_DATE_TIME_ORIGINAL,
    XMP_CREATE_DATE,
    EXIF_DATE_TIME_DIGITIZED,
    PS_DATE_CREATED,
    TIFF_DATE_TIME,
    XMP_MODIFY_DATE,
    XMP_METADATA_DATE,
];

/// An `Iptc4xmpExt` location structure. Names may carry language variants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmpLocation {
    pub country_code: String,
    pub country_name: AltString,
    pub state: AltString,
    pub city: AltString,
    pub sublocation: AltString,
}

impl XmpLocation {
    pub fn is_empty(&self) -> bool {
        self.country_code.is_empty()
            && self.country_name.is_empty()
            && self.state.is_empty()
            && self.city.is_empty()
            && self.sublocation.is_empty()
    }

    pub fn to_location(&self) -> Location {
        Location {
            country_code: self.country_code.clone(),
            country_name: self.country_name.default_value().to_string(),
            state: self.state.default_value().to_string(),
            city: self.city.default_value().to_string(),
            sublocation: self.sublocation.default_value().to_string(),
        }
    }

    /// One location per language used, labelled `label` or `label[lang]`.
    /// Components missing in a language fall back to their default.
    pub fn labelled(&self, label: &str) -> Vec<(String, Location)> {
        let mut langs: Vec<&str> = Vec::new();
        for alt in [&self.country_name, &self.state, &self.city, &self.sublocation] {
            for item in &alt.0 {
                if !langs.contains(&item.lang.as_str()) {
                    langs.push(&item.lang);
                }
            }
        }
        if langs.is_empty() {
            langs.push("");
        }
        let pick = |alt: &AltString, lang: &str| alt.get(lang).unwrap_or(alt.default_value()).to_string();
        langs
            .into_iter()
            .map(|lang| {
                let tag = if lang.is_empty() || lang == "x-default" {
                    label.to_string()
                } else {
                    format!("{label}[{lang}]")
                };
                let loc = Location {
                    country_code: self.country_code.clone(),
                    country_name: pick(&self.country_name, lang),
                    state: pick(&self.state, lang),
                    city: pick(&self.city, lang),
                    sublocation: pick(&self.sublocation, lang),
                };
                (tag, loc)
            })
            .collect()
    }
}

fn ext(local: &str) -> Name {
    Name::new(NS_IPTC_EXT, local)
}

/// An XMP packet with typed property accessors.
#[derive(Debug, Clone, Default)]
pub struct XmpTags {
    packet: Packet,
}

impl XmpTags {
    pub fn new() -> Self {
        XmpTags::default()
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        Ok(XmpTags {
            packet: Packet::parse(data)?,
        })
    }

    pub fn is_dirty(&self) -> bool {
        self.packet.is_dirty()
    }

    pub fn is_empty(&self) -> bool {
        self.packet.is_empty()
    }

    pub fn has_property_in(&self, uris: &[&str]) -> bool {
        self.packet.has_property_in(uris)
    }

    pub fn render(&self, padding: usize) -> Vec<u8> {
        self.packet.render(padding)
    }

    // ── Generic shapes ──

    /// A simple text property. A language alternative yields its default.
    pub fn text(&self, p: Prop) -> Result<String> {
        match self.packet.get(&p.name()) {
            None => Ok(String::new()),
            Some(Value::Text(s) | Value::Uri(s)) => Ok(s.clone()),
            Some(Value::Alt(_)) => Ok(self.alt(p)?.default_value().to_string()),
            Some(_) => bail!("{}: wrong data type", p.label.trim_start_matches("XMP  ")),
        }
    }

    pub fn set_text(&mut self, p: Prop, value: &str) -> bool {
        self.packet.set(p.name(), Value::Text(value.to_string()))
    }

    /// A language alternative. A simple text value reads as `x-default`.
    pub fn alt(&self, p: Prop) -> Result<AltString> {
        match self.packet.get(&p.name()) {
            None => Ok(AltString::default()),
            Some(v) => alt_of(v).with_context(|| p.label.trim_start_matches("XMP  ").to_string()),
        }
    }

    pub fn set_alt(&mut self, p: Prop, value: &AltString) -> bool {
        self.packet.set(p.name(), alt_value(value))
    }

    /// The items of a Seq or Bag.
    pub fn list(&self, p: Prop) -> Result<Vec<String>> {
        match self.packet.get(&p.name()) {
            None => Ok(Vec::new()),
            Some(v @ (Value::Seq(_) | Value::Bag(_) | Value::Text(_))) => v
                .items()
                .into_iter()
                .map(|i| {
                    i.as_text()
                        .map(str::to_string)
                        .with_context(|| format!("{}: wrong data type", p.label.trim_start_matches("XMP  ")))
                })
                .collect(),
            Some(_) => bail!("{}: wrong data type", p.label.trim_start_matches("XMP  ")),
        }
    }

    pub fn set_seq(&mut self, p: Prop, values: &[String]) -> bool {
        self.packet.set(p.name(), Value::Seq(texts(values)))
    }

    pub fn set_bag(&mut self, p: Prop, values: &[String]) -> bool {
        self.packet.set(p.name(), Value::Bag(texts(values)))
    }

    pub fn remove(&mut self, p: Prop) -> bool {
        self.packet.remove(&p.name())
    }

    pub fn date(&self, p: Prop) -> Result<DateTime> {
        DateTime::parse(&self.text(p)?).with_context(|| p.label.trim_start_matches("XMP  ").to_string())
    }

    pub fn set_date(&mut self, p: Prop, value: &DateTime) -> bool {
        self.set_text(p, &value.to_string())
    }

    // ── GPS ──

    pub fn gps(&self) -> Result<GpsCoords> {
        let field = |local: &str| {
            self.packet
                .get(&Name::new(NS_EXIF, local))
                .and_then(Value::as_text)
                .unwrap_or_default()
                .to_string()
        };
        let x = XmpGps {
            lat: field("GPSLatitude"),
            lon: field("GPSLongitude"),
            alt_ref: field("GPSAltitudeRef"),
            alt: field("GPSAltitude"),
        };
        if x.lat.is_empty() && x.lon.is_empty() {
            return Ok(GpsCoords::default());
        }
        GpsCoords::from_xmp(&x).context("exif:GPS")
    }

    pub fn set_gps(&mut self, value: &GpsCoords) -> bool {
        let x = value.to_xmp();
        let mut changed = false;
        for (local, v) in [
            ("GPSLatitude", x.lat),
            ("GPSLongitude", x.lon),
            ("GPSAltitudeRef", x.alt_ref),
            ("GPSAltitude", x.alt),
        ] {
            changed |= self.packet.set(Name::new(NS_EXIF, local), Value::Text(v));
        }
        changed
    }

    // ── Locations ──

    pub fn location_created(&self) -> Result<XmpLocation> {
        match self.packet.get(&IPTC_LOCATION_CREATED.name()) {
            None => Ok(XmpLocation::default()),
            Some(v @ Value::Struct(_)) => location_of(v).context("Iptc4xmpExt:LocationCreated"),
            // Some writers use a one-element array here.
            Some(Value::Bag(items) | Value::Seq(items)) => match items.first() {
                Some(v) => location_of(v).context("Iptc4xmpExt:LocationCreated"),
                None => Ok(XmpLocation::default()),
            },
            Some(_) => bail!("Iptc4xmpExt:LocationCreated: wrong data type"),
        }
    }

    pub fn locations_shown(&self) -> Result<Vec<XmpLocation>> {
        match self.packet.get(&IPTC_LOCATION_SHOWN.name()) {
            None => Ok(Vec::new()),
            Some(Value::Bag(items) | Value::Seq(items)) => items
                .iter()
                .enumerate()
                .map(|(i, v)| location_of(v).with_context(|| format!("Iptc4xmpExt:LocationShown[{i}]")))
                .collect(),
            Some(v @ Value::Struct(_)) => Ok(vec![location_of(v).context("Iptc4xmpExt:LocationShown")?]),
            Some(_) => bail!("Iptc4xmpExt:LocationShown: wrong data type"),
        }
    }

    /// Set LocationCreated, keeping language variants when the value is
    /// unchanged, and drop LocationShown.
    pub fn set_location(&mut self, value: &Location) -> bool {
        let mut changed = self.remove(IPTC_LOCATION_SHOWN);
        if value.is_empty() {
            return changed | self.remove(IPTC_LOCATION_CREATED);
        }
        if self.location_created().is_ok_and(|cur| simple_match(&cur, value)) {
            return changed;
        }
        let mut fields = BTreeMap::new();
        let mut put = |local: &str, v: Value| {
            if !v.is_empty() {
                fields.insert(ext(local), v);
            }
        };
        put("CountryCode", Value::Text(value.country_code.clone()));
        put("CountryName", alt_value(&AltString::new(&value.country_name)));
        put("ProvinceState", alt_value(&AltString::new(&value.state)));
        put("City", alt_value(&AltString::new(&value.city)));
        put("Sublocation", alt_value(&AltString::new(&value.sublocation)));
        changed |= self.packet.set(IPTC_LOCATION_CREATED.name(), Value::Struct(fields));
        changed
    }

    // ── Face regions ──

    /// Person names from Microsoft Photo regions that carry a rectangle.
    pub fn mp_faces(&self) -> Vec<String> {
        self.mp_regions()
            .iter()
            .filter(|r| r.field(&Name::new(NS_MPREG, "Rectangle")).is_some())
            .filter_map(|r| r.field(&Name::new(NS_MPREG, "PersonDisplayName")).and_then(Value::as_text))
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Names of MWG face regions.
    pub fn mwg_faces(&self) -> Vec<String> {
        self.mwg_regions()
            .iter()
            .filter(|r| r.field(&Name::new(NS_MWG_RS, "Type")).and_then(Value::as_text) == Some("Face"))
            .filter_map(|r| r.field(&Name::new(NS_MWG_RS, "Name")).and_then(Value::as_text))
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn mp_regions(&self) -> Vec<&Value> {
        self.packet
            .get(&MP_REGION_INFO.name())
            .and_then(|v| v.field(&Name::new(NS_MPRI, "Regions")))
            .map(Value::items)
            .unwrap_or_default()
    }

    fn mwg_regions(&self) -> Vec<&Value> {
        self.packet
            .get(&MWG_RS_REGIONS.name())
            .and_then(|v| v.field(&Name::new(NS_MWG_RS, "RegionList")))
            .map(Value::items)
            .unwrap_or_default()
    }

    /// Drop face regions naming anyone not in `keep`. Regions without a
    /// name are left alone.
    pub fn retain_faces(&mut self, keep: &[String]) -> bool {
        let drop_mp = |r: &Value| {
            r.field(&Name::new(NS_MPREG, "PersonDisplayName"))
                .and_then(Value::as_text)
                .is_some_and(|n| !n.is_empty() && !keep.iter().any(|k| k == n))
        };
        let drop_mwg = |r: &Value| {
            r.field(&Name::new(NS_MWG_RS, "Type")).and_then(Value::as_text) == Some("Face")
                && r.field(&Name::new(NS_MWG_RS, "Name"))
                    .and_then(Value::as_text)
                    .is_some_and(|n| !n.is_empty() && !keep.iter().any(|k| k == n))
        };
        let mut changed = self.filter_regions(MP_REGION_INFO, Name::new(NS_MPRI, "Regions"), drop_mp);
        changed |= self.filter_regions(MWG_RS_REGIONS, Name::new(NS_MWG_RS, "RegionList"), drop_mwg);
        changed
    }

    fn filter_regions(&mut self, p: Prop, list: Name, drop: impl Fn(&Value) -> bool) -> bool {
        let Some(Value::Struct(outer)) = self.packet.get(&p.name()) else {
            return false;
        };
        let mut outer = outer.clone();
        let kept = match outer.get(&list) {
            Some(Value::Bag(items)) => Value::Bag(items.iter().filter(|r| !drop(r)).cloned().collect()),
            Some(Value::Seq(items)) => Value::Seq(items.iter().filter(|r| !drop(r)).cloned().collect()),
            _ => return false,
        };
        if kept.is_empty() {
            outer.remove(&list);
        } else {
            outer.insert(list, kept);
        }
        let has_regions = outer.keys().any(|n| n.local == "Regions" || n.local == "RegionList");
        if !has_regions {
            return self.packet.remove(&p.name());
        }
        self.packet.set(p.name(), Value::Struct(outer))
    }
}

fn texts(values: &[String]) -> Vec<Value> {
    values.iter().map(|v| Value::Text(v.clone())).collect()
}

fn alt_of(v: &Value) -> Result<AltString> {
    match v {
        Value::Text(s) => Ok(AltString::new(s)),
        Value::Alt(items) => items
            .iter()
            .map(|(lang, v)| match v.as_text() {
                Some(s) => Ok(AltItem {
                    value: s.to_string(),
                    lang: lang.clone(),
                }),
                None => bail!("wrong data type"),
            })
            .collect::<Result<Vec<_>>>()
            .map(AltString),
        _ => bail!("wrong data type"),
    }
}

fn alt_value(a: &AltString) -> Value {
    Value::Alt(
        a.0.iter()
            .filter(|i| !i.value.is_empty())
            .map(|i| (i.lang.clone(), Value::Text(i.value.clone())))
            .collect(),
    )
}

fn location_of(v: &Value) -> Result<XmpLocation> {
    let Value::Struct(fields) = v else {
        bail!("wrong data type");
    };
    let alt = |local: &str| -> Result<AltString> {
        match fields.get(&ext(local)) {
            None => Ok(AltString::default()),
            Some(v) => alt_of(v).with_context(|| local.to_string()),
        }
    };
    Ok(XmpLocation {
        country_code: fields
            .get(&ext("CountryCode"))
            .and_then(Value::as_text)
            .unwrap_or_default()
            .to_string(),
        country_name: alt("CountryName")?,
        state: alt("ProvinceState")?,
        city: alt("City")?,
        sublocation: alt("Sublocation")?,
    })
}

/// True if `cur` holds exactly `value` with no language variants.
fn simple_match(cur: &XmpLocation, value: &Location) -> bool {
    let same = |alt: &AltString, s: &str| match alt.0.as_slice() {
        [] => s.is_empty(),
        [one] => one.value == s,
        _ => false,
    };
    cur.country_code == value.country_code
        && same(&cur.country_name, &value.country_name)
        && same(&cur.state, &value.state)
        && same(&cur.city, &value.city)
        && same(&cur.sublocation, &value.sublocation)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGIONS: &str = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about=""
    xmlns:MP="http://ns.microsoft.com/photo/1.2/"
    xmlns:MPRI="http://ns.microsoft.com/photo/1.2/t/RegionInfo#"
    xmlns:MPReg="http://ns.microsoft.com/photo/1.2/t/Region#"
    xmlns:mwg-rs="http://www.metadataworkinggroup.com/schemas/regions/">
   <MP:RegionInfo rdf:parseType="Resource">
    <MPRI:Regions><rdf:Bag>
     <rdf:li MPReg:PersonDisplayName="Alice" MPReg:Rectangle="0.1, 0.1, 0.2, 0.2"/>
     <rdf:li MPReg:PersonDisplayName="Nobody"/>
    </rdf:Bag></MPRI:Regions>
   </MP:RegionInfo>
   <mwg-rs:Regions rdf:parseType="Resource">
    <mwg-rs:RegionList><rdf:Bag>
     <rdf:li mwg-rs:Name="Bob" mwg-rs:Type="Face"/>
     <rdf:li mwg-rs:Name="Pet" mwg-rs:Type="Pet"/>
    </rdf:Bag></mwg-rs:RegionList>
   </mwg-rs:Regions>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>"#;

    #[test]
    fn faces_need_rectangles_or_face_type() {
        let x = XmpTags::parse(REGIONS.as_bytes()).unwrap();
        assert_eq!(x.mp_faces(), vec!["Alice"]);
        assert_eq!(x.mwg_faces(), vec!["Bob"]);
    }

    #[test]
    fn retain_faces_prunes_named_regions() {
        let mut x = XmpTags::parse(REGIONS.as_bytes()).unwrap();
        assert!(x.retain_faces(&["Bob".to_string()]));
        assert!(x.mp_faces().is_empty());
        assert_eq!(x.mwg_faces(), vec!["Bob"]);
        assert!(!x.retain_faces(&["Bob".to_string()]));
        assert!(x.retain_faces(&[]));
        // The pet region survives, so the structure does too.
        assert!(x.mwg_faces().is_empty());
    }

    #[test]
    fn location_round_trips_through_the_struct() {
        let mut x = XmpTags::new();
        let loc = Location::parse("USA / CA / Cupertino / Apple Park").unwrap();
        assert!(x.set_location(&loc));
        assert!(!x.set_location(&loc));
        let again = XmpTags::parse(&x.render(0)).unwrap();
        assert_eq!(again.location_created().unwrap().to_location(), loc);
        assert!(again.locations_shown().unwrap().is_empty());
    }

    #[test]
    fn alt_and_lists() {
        let mut x = XmpTags::new();
        assert!(x.set_alt(DC_TITLE, &AltString::new("Hello")));
        assert_eq!(x.text(DC_TITLE).unwrap(), "Hello");
        assert!(x.set_seq(DC_CREATOR, &["Ann".to_string()]));
        assert_eq!(x.list(DC_CREATOR).unwrap(), vec!["Ann"]);
        assert!(x.set_seq(DC_CREATOR, &[]));
        assert!(x.list(DC_CREATOR).unwrap().is_empty());
        let dt = DateTime::parse("2021-06-21T03:55:00-07:00").unwrap();
        assert!(x.set_date(XMP_CREATE_DATE, &dt));
        assert_eq!(x.date(XMP_CREATE_DATE).unwrap(), dt);
    }
}
