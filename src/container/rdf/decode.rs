use anyhow::{anyhow, bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;

use super::namespace::{NS_RDF, NS_XML};
use super::{Name, Value};

/// A parsed XML element with namespaces resolved.
#[derive(Debug, Default)]
struct Element {
    name: Name,
    attrs: Vec<(Name, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn attr(&self, ns: &str, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n.ns == ns && n.local == local)
            .map(|(_, v)| v.as_str())
    }

    fn is(&self, ns: &str, local: &str) -> bool {
        self.name.ns == ns && self.name.local == local
    }
}

type Scope = Vec<(String, String)>;

fn resolve(scopes: &[Scope], qname: &str, attribute: bool) -> Result<Name> {
    let (prefix, local) = match qname.split_once(':') {
        Some((p, l)) => (p, l),
        None if attribute => return Ok(Name::new("", qname)),
        None => ("", qname),
    };
    if prefix == "xml" {
        return Ok(Name::new(NS_XML, local));
    }
    scopes
        .iter()
        .rev()
        .flat_map(|s| s.iter().rev())
        .find(|(p, _)| p == prefix)
        .map(|(_, uri)| Name::new(uri, local))
        .ok_or_else(|| anyhow!("unbound namespace prefix {prefix:?}"))
}

fn open(
    e: &BytesStart,
    scopes: &mut Vec<Scope>,
    prefixes: &mut BTreeMap<String, String>,
) -> Result<Element> {
    let mut scope = Scope::new();
    let mut raw_attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.context("XMP: bad attribute")?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().context("XMP: bad attribute value")?.into_owned();
        if key == "xmlns" {
            scope.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            prefixes.entry(value.clone()).or_insert_with(|| prefix.to_string());
            scope.push((prefix.to_string(), value));
        } else {
            raw_attrs.push((key, value));
        }
    }
    scopes.push(scope);
    let qname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let name = resolve(scopes, &qname, false)?;
    let mut attrs = Vec::with_capacity(raw_attrs.len());
    for (key, value) in raw_attrs {
        let mut n = resolve(scopes, &key, true)?;
        // Old packets write unqualified rdf attributes.
        if n.ns.is_empty() && matches!(key.as_str(), "about" | "resource" | "parseType") {
            n.ns = NS_RDF.to_string();
        }
        attrs.push((n, value));
    }
    Ok(Element {
        name,
        attrs,
        ..Element::default()
    })
}

fn parse_tree(data: &[u8]) -> Result<(Element, BTreeMap<String, String>)> {
    let mut reader = Reader::from_reader(data);
    let mut buf = Vec::new();
    let mut scopes: Vec<Scope> = Vec::new();
    let mut stack: Vec<Element> = vec![Element::default()];
    let mut prefixes = BTreeMap::new();
    loop {
        match reader.read_event_into(&mut buf).context("XMP: malformed XML")? {
            Event::Start(e) => {
                let el = open(&e, &mut scopes, &mut prefixes)?;
                stack.push(el);
            }
            Event::Empty(e) => {
                let el = open(&e, &mut scopes, &mut prefixes)?;
                scopes.pop();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(el);
                }
            }
            Event::End(_) => {
                scopes.pop();
                let el = stack.pop().ok_or_else(|| anyhow!("XMP: unbalanced XML"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(el),
                    None => bail!("XMP: unbalanced XML"),
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape().context("XMP: bad text")?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if stack.len() != 1 {
        bail!("XMP: unclosed element");
    }
    let root = stack.pop().unwrap_or_default();
    Ok((root, prefixes))
}

fn find_rdf(el: &Element) -> Option<&Element> {
    if el.is(NS_RDF, "RDF") {
        return Some(el);
    }
    el.children.iter().find_map(find_rdf)
}

/// Attributes that carry property values (not syntax).
fn value_attrs(el: &Element) -> impl Iterator<Item = &(Name, String)> {
    el.attrs
        .iter()
        .filter(|(n, _)| n.ns != NS_RDF && n.ns != NS_XML && !n.ns.is_empty())
}

fn struct_of(el: &Element) -> Result<BTreeMap<Name, Value>> {
    let mut fields = BTreeMap::new();
    for (n, v) in value_attrs(el) {
        fields.insert(n.clone(), Value::Text(v.clone()));
    }
    for child in &el.children {
        fields.insert(child.name.clone(), property(child)?);
    }
    Ok(fields)
}

fn collapse(fields: BTreeMap<Name, Value>) -> Value {
    let value = Name::new(NS_RDF, "value");
    match fields.get(&value) {
        Some(v) => v.clone(),
        None => Value::Struct(fields),
    }
}

/// Decode a property element (or an `rdf:li`).
fn property(el: &Element) -> Result<Value> {
    if let Some(uri) = el.attr(NS_RDF, "resource") {
        return Ok(Value::Uri(uri.to_string()));
    }
    if el.attr(NS_RDF, "parseType") == Some("Resource") {
        return Ok(collapse(struct_of(el)?));
    }
    if let [only] = el.children.as_slice() {
        let items = || -> Result<Vec<&Element>> {
            only.children
                .iter()
                .map(|li| {
                    if li.is(NS_RDF, "li") {
                        Ok(li)
                    } else {
                        Err(anyhow!("XMP: unexpected {} in array", li.name.local))
                    }
                })
                .collect()
        };
        if only.is(NS_RDF, "Seq") {
            return Ok(Value::Seq(items()?.into_iter().map(property).collect::<Result<_>>()?));
        }
        if only.is(NS_RDF, "Bag") {
            return Ok(Value::Bag(items()?.into_iter().map(property).collect::<Result<_>>()?));
        }
        if only.is(NS_RDF, "Alt") {
            let mut alt = Vec::new();
            for li in items()? {
                let lang = li.attr(NS_XML, "lang").unwrap_or_default().to_string();
                alt.push((lang, property(li)?));
            }
            return Ok(Value::Alt(alt));
        }
        if only.is(NS_RDF, "Description") {
            return Ok(collapse(struct_of(only)?));
        }
    }
    if !el.children.is_empty() || value_attrs(el).next().is_some() {
        return Ok(collapse(struct_of(el)?));
    }
    Ok(Value::Text(el.text.clone()))
}

/// Decode a packet into its merged top-level properties and the prefixes
/// it declared.
pub(super) fn decode(data: &[u8]) -> Result<(BTreeMap<Name, Value>, BTreeMap<String, String>)> {
    let (root, prefixes) = parse_tree(data)?;
    let rdf = find_rdf(&root).ok_or_else(|| anyhow!("XMP: no rdf:RDF element"))?;
    let mut properties = BTreeMap::new();
    for desc in &rdf.children {
        if !desc.is(NS_RDF, "Description") {
            log::debug!("XMP: ignoring top-level {}", desc.name.local);
            continue;
        }
        properties.extend(struct_of(desc)?);
    }
    Ok((properties, prefixes))
}
