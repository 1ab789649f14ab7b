use quick_xml::escape::escape;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use super::namespace::{is_known_prefix, known_prefix, NS_RDF, NS_X, NS_XML};
use super::{Name, Value};

const PACKET_ID: &str = "W5M0MpCehiHzreSzNTczkc9d";

/// Prefix assignment for the namespaces a packet uses.
struct Prefixes(BTreeMap<String, String>);

impl Prefixes {
    fn assign(used: &BTreeSet<String>, source: &BTreeMap<String, String>) -> Self {
        let mut map = BTreeMap::new();
        let mut taken: BTreeSet<String> = BTreeSet::new();
        let mut pending = Vec::new();
        for uri in used {
            match known_prefix(uri) {
                Some(p) => {
                    taken.insert(p.to_string());
                    map.insert(uri.clone(), p.to_string());
                }
                None => pending.push(uri),
            }
        }
        let mut counter = 0;
        for uri in pending {
            let prefix = match source.get(uri.as_str()) {
                Some(p) if !p.is_empty() && !is_known_prefix(p) && !taken.contains(p) => p.clone(),
                _ => loop {
                    counter += 1;
                    let p = format!("ns{counter}");
                    if !taken.contains(&p) {
                        break p;
                    }
                },
            };
            taken.insert(prefix.clone());
            map.insert(uri.clone(), prefix);
        }
        Prefixes(map)
    }

    fn qname(&self, name: &Name) -> String {
        let prefix = self.0.get(&name.ns).map(String::as_str).unwrap_or("ns0");
        format!("{prefix}:{}", name.local)
    }
}

fn collect(name: &Name, value: &Value, used: &mut BTreeSet<String>) {
    used.insert(name.ns.clone());
    match value {
        Value::Seq(items) | Value::Bag(items) => {
            for v in items {
                collect_value(v, used);
            }
        }
        Value::Alt(items) => {
            for (_, v) in items {
                collect_value(v, used);
            }
        }
        other => collect_value(other, used),
    }
}

fn collect_value(value: &Value, used: &mut BTreeSet<String>) {
    match value {
        Value::Struct(fields) => {
            for (n, v) in fields {
                collect(n, v, used);
            }
        }
        Value::Seq(_) | Value::Bag(_) | Value::Alt(_) => {
            let dummy = Name::new(NS_RDF, "li");
            collect(&dummy, value, used);
        }
        Value::Text(_) | Value::Uri(_) => {}
    }
}

fn indent(out: &mut String, depth: usize) {
    out.extend(std::iter::repeat_n(' ', depth));
}

/// Write one element named `tag` holding `value`.
fn element(out: &mut String, p: &Prefixes, tag: &str, lang: Option<&str>, value: &Value, depth: usize) {
    indent(out, depth);
    let _ = write!(out, "<{tag}");
    if let Some(lang) = lang.filter(|l| !l.is_empty()) {
        let _ = write!(out, " xml:lang=\"{}\"", escape(lang));
    }
    match value {
        Value::Text(s) => {
            let _ = writeln!(out, ">{}</{tag}>", escape(s.as_str()));
        }
        Value::Uri(u) => {
            let _ = writeln!(out, " rdf:resource=\"{}\"/>", escape(u.as_str()));
        }
        Value::Struct(fields) if fields.is_empty() => {
            out.push_str(" rdf:parseType=\"Resource\"/>\n");
        }
        Value::Struct(fields) => {
            out.push_str(" rdf:parseType=\"Resource\">\n");
            for (n, v) in fields {
                element(out, p, &p.qname(n), None, v, depth + 1);
            }
            indent(out, depth);
            let _ = writeln!(out, "</{tag}>");
        }
        Value::Seq(items) | Value::Bag(items) => {
            let kind = if matches!(value, Value::Seq(_)) { "Seq" } else { "Bag" };
            out.push_str(">\n");
            indent(out, depth + 1);
            let _ = writeln!(out, "<rdf:{kind}>");
            for v in items {
                element(out, p, "rdf:li", None, v, depth + 2);
            }
            indent(out, depth + 1);
            let _ = writeln!(out, "</rdf:{kind}>");
            indent(out, depth);
            let _ = writeln!(out, "</{tag}>");
        }
        Value::Alt(items) => {
            out.push_str(">\n");
            indent(out, depth + 1);
            out.push_str("<rdf:Alt>\n");
            for (lang, v) in items {
                element(out, p, "rdf:li", Some(lang), v, depth + 2);
            }
            indent(out, depth + 1);
            out.push_str("</rdf:Alt>\n");
            indent(out, depth);
            let _ = writeln!(out, "</{tag}>");
        }
    }
}

/// Encode `properties` as a complete packet followed by `padding` bytes of
/// whitespace for in-place editing.
pub(super) fn encode(
    properties: &BTreeMap<Name, Value>,
    source_prefixes: &BTreeMap<String, String>,
    padding: usize,
) -> String {
    let mut used = BTreeSet::new();
    for (n, v) in properties {
        collect(n, v, &mut used);
    }
    used.remove(NS_RDF);
    used.remove(NS_XML);
    let prefixes = Prefixes::assign(&used, source_prefixes);

    let mut out = String::new();
    let _ = writeln!(out, "<?xpacket begin=\"\u{feff}\" id=\"{PACKET_ID}\"?>");
    let _ = writeln!(out, "<x:xmpmeta xmlns:x=\"{NS_X}\">");
    let _ = writeln!(out, " <rdf:RDF xmlns:rdf=\"{NS_RDF}\">");
    out.push_str("  <rdf:Description rdf:about=\"\"");
    let mut decls: Vec<(&String, &String)> = prefixes.0.iter().map(|(u, p)| (p, u)).collect();
    decls.sort();
    for (prefix, uri) in decls {
        let _ = write!(out, "\n    xmlns:{prefix}=\"{}\"", escape(uri.as_str()));
    }
    out.push_str(">\n");

    let mut ordered: Vec<(String, &Name, &Value)> = properties
        .iter()
        .map(|(n, v)| (prefixes.qname(n), n, v))
        .collect();
    ordered.sort_by(|a, b| a.0.cmp(&b.0));
    for (qname, _, value) in ordered {
        element(&mut out, &prefixes, &qname, None, value, 3);
    }

    out.push_str("  </rdf:Description>\n");
    out.push_str(" </rdf:RDF>\n");
    out.push_str("</x:xmpmeta>\n");
    let mut left = padding;
    while left > 0 {
        let line = left.min(100);
        out.extend(std::iter::repeat_n(' ', line - 1));
        out.push('\n');
        left -= line;
    }
    out.push_str("<?xpacket end=\"w\"?>");
    out
}

#[cfg(test)]
mod tests {
    use super::super::namespace::NS_DC;
    use super::*;

    #[test]
    fn unknown_namespaces_get_generated_prefixes() {
        let mut props = BTreeMap::new();
        props.insert(Name::new("urn:a", "x"), Value::Text("1".into()));
        props.insert(Name::new("urn:b", "y"), Value::Text("2".into()));
        props.insert(Name::new(NS_DC, "z"), Value::Text("3".into()));
        let mut source = BTreeMap::new();
        source.insert("urn:a".to_string(), "dc".to_string());
        source.insert("urn:b".to_string(), "bee".to_string());
        let text = encode(&props, &source, 0);
        assert!(text.contains("xmlns:ns1=\"urn:a\""));
        assert!(text.contains("xmlns:bee=\"urn:b\""));
        assert!(text.contains("<dc:z>3</dc:z>"));
    }

    #[test]
    fn padding_is_whitespace() {
        let text = encode(&BTreeMap::new(), &BTreeMap::new(), 250);
        let tail = text.rsplit_once("</x:xmpmeta>\n").map(|(_, t)| t).unwrap_or_default();
        assert_eq!(tail.len(), 250 + "<?xpacket end=\"w\"?>".len());
        assert!(tail.trim_end_matches("<?xpacket end=\"w\"?>").trim().is_empty());
    }
}
