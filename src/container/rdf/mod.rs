//! XMP packets: RDF/XML decoded into a property map and re-encoded in a
//! canonical layout.

mod decode;
mod encode;
pub mod namespace;

use anyhow::Result;
use std::collections::BTreeMap;

/// A namespace-qualified property or field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name {
    pub ns: String,
    pub local: String,
}

impl Name {
    pub fn new(ns: &str, local: &str) -> Self {
        Name {
            ns: ns.to_string(),
            local: local.to_string(),
        }
    }
}

/// An RDF property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Uri(String),
    Seq(Vec<Value>),
    Bag(Vec<Value>),
    /// (language, value) pairs; the language may be empty.
    Alt(Vec<(String, Value)>),
    Struct(BTreeMap<Name, Value>),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Text(s) | Value::Uri(s) => s.is_empty(),
            Value::Seq(v) | Value::Bag(v) => v.is_empty(),
            Value::Alt(v) => v.is_empty(),
            Value::Struct(m) => m.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Uri(s) => Some(s),
            _ => None,
        }
    }

    /// Items of a Seq or Bag. A lone Text counts as one item, since writers
    /// often use a simple value where an array belongs.
    pub fn items(&self) -> Vec<&Value> {
        match self {
            Value::Seq(v) | Value::Bag(v) => v.iter().collect(),
            Value::Text(_) => vec![self],
            _ => Vec::new(),
        }
    }

    pub fn field(&self, name: &Name) -> Option<&Value> {
        match self {
            Value::Struct(m) => m.get(name),
            _ => None,
        }
    }
}

/// One XMP packet.
#[derive(Debug, Clone, Default)]
pub struct Packet {
    properties: BTreeMap<Name, Value>,
    /// Prefixes the source used, by namespace URI.
    prefixes: BTreeMap<String, String>,
    raw: Option<Vec<u8>>,
    dirty: bool,
}

impl Packet {
    pub fn new() -> Self {
        Packet::default()
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let (properties, prefixes) = decode::decode(data)?;
        Ok(Packet {
            properties,
            prefixes,
            raw: Some(data.to_vec()),
            dirty: false,
        })
    }

    pub fn get(&self, name: &Name) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&Name, &Value)> {
        self.properties.iter()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Set a property; an empty value removes it. Returns whether the
    /// packet changed.
    pub fn set(&mut self, name: Name, value: Value) -> bool {
        if value.is_empty() {
            return self.remove(&name);
        }
        if self.properties.get(&name) == Some(&value) {
            return false;
        }
        self.properties.insert(name, value);
        self.dirty = true;
        true
    }

    pub fn remove(&mut self, name: &Name) -> bool {
        let removed = self.properties.remove(name).is_some();
        self.dirty |= removed;
        removed
    }

    /// True if any property lives in one of the namespaces `uris`.
    pub fn has_property_in(&self, uris: &[&str]) -> bool {
        self.properties.keys().any(|n| uris.contains(&n.ns.as_str()))
    }

    /// The packet bytes: the original bytes if nothing changed, otherwise a
    /// canonical encoding followed by `padding` bytes of whitespace.
    pub fn render(&self, padding: usize) -> Vec<u8> {
        match &self.raw {
            Some(raw) if !self.dirty => raw.clone(),
            _ => encode::encode(&self.properties, &self.prefixes, padding).into_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::namespace::*;
    use super::*;

    const SAMPLE: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="" xmlns:xmp="http://ns.adobe.com/xap/1.0/"
    xmp:CreateDate="2021-06-21T03:55:00-07:00"/>
  <rdf:Description rdf:about="" xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:foo="http://example.com/foo/">
   <dc:title><rdf:Alt><rdf:li xml:lang="x-default">Hello &amp; welcome</rdf:li>
     <rdf:li xml:lang="fr">Bonjour</rdf:li></rdf:Alt></dc:title>
   <dc:subject><rdf:Bag><rdf:li>one</rdf:li><rdf:li>two</rdf:li></rdf:Bag></dc:subject>
   <foo:link rdf:resource="http://example.com/"/>
   <foo:box rdf:parseType="Resource"><foo:w>3</foo:w></foo:box>
   <foo:nested><rdf:Description foo:h="4"/></foo:nested>
   <foo:short foo:a="1" foo:b="2"/>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

    fn foo(local: &str) -> Name {
        Name::new("http://example.com/foo/", local)
    }

    #[test]
    fn decodes_every_value_form() {
        let p = Packet::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(
            p.get(&Name::new(NS_XMP, "CreateDate")),
            Some(&Value::Text("2021-06-21T03:55:00-07:00".into()))
        );
        assert_eq!(
            p.get(&Name::new(NS_DC, "title")),
            Some(&Value::Alt(vec![
                ("x-default".into(), Value::Text("Hello & welcome".into())),
                ("fr".into(), Value::Text("Bonjour".into())),
            ]))
        );
        assert_eq!(
            p.get(&Name::new(NS_DC, "subject")),
            Some(&Value::Bag(vec![Value::Text("one".into()), Value::Text("two".into())]))
        );
        assert_eq!(p.get(&foo("link")), Some(&Value::Uri("http://example.com/".into())));
        let field = |prop: &str, f: &str| p.get(&foo(prop)).and_then(|v| v.field(&foo(f))).cloned();
        assert_eq!(field("box", "w"), Some(Value::Text("3".into())));
        assert_eq!(field("nested", "h"), Some(Value::Text("4".into())));
        assert_eq!(field("short", "b"), Some(Value::Text("2".into())));
    }

    #[test]
    fn unmodified_packet_keeps_its_bytes() {
        let mut p = Packet::parse(SAMPLE.as_bytes()).unwrap();
        assert!(!p.set(Name::new(NS_DC, "subject"), Value::Bag(vec![
            Value::Text("one".into()),
            Value::Text("two".into()),
        ])));
        assert_eq!(p.render(2048), SAMPLE.as_bytes());
    }

    #[test]
    fn canonical_encoding_round_trips() {
        let mut p = Packet::parse(SAMPLE.as_bytes()).unwrap();
        assert!(p.set(Name::new(NS_DC, "creator"), Value::Seq(vec![Value::Text("Ann <A>".into())])));
        let bytes = p.render(0);
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>"));
        assert!(text.ends_with("<?xpacket end=\"w\"?>"));
        assert!(text.contains("xmlns:foo=\"http://example.com/foo/\""));
        let again = Packet::parse(&bytes).unwrap();
        assert_eq!(again.properties, p.properties);
    }

    #[test]
    fn setting_empty_removes() {
        let mut p = Packet::parse(SAMPLE.as_bytes()).unwrap();
        assert!(p.set(Name::new(NS_DC, "title"), Value::Alt(Vec::new())));
        assert!(p.get(&Name::new(NS_DC, "title")).is_none());
        assert!(p.is_dirty());
        assert!(p.has_property_in(&[NS_XMP]));
        assert!(!p.has_property_in(&[NS_LR]));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(Packet::parse(b"<x:xmpmeta><rdf:RDF></x:xmpmeta>").is_err());
    }
}
