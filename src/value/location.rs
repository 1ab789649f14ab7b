use anyhow::{bail, Result};
use std::fmt;

use super::countries::{country_name, us_state_name};

/// A textual place description: ISO 3166-1 alpha-3 country code, country
/// name, state or province, city and sub-location. Any trailing part may be
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub country_code: String,
    pub country_name: String,
    pub state: String,
    pub city: String,
    pub sublocation: String,
}

impl Location {
    /// Parse `CC [country name] / state / city / sublocation`.
    ///
    /// The country name defaults to the table name for the code, and for
    /// `USA` a two-letter state code expands to the state name.
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        let parts: Vec<&str> = s.split('/').map(str::trim).collect();
        if parts.len() > 4 {
            bail!("too many components in location");
        }
        if let Some(pos) = parts.iter().position(|p| p.is_empty()) {
            if parts[pos..].iter().any(|p| !p.is_empty()) {
                bail!("missing component in location");
            }
        }
        let (code, name) = match parts[0].split_once(char::is_whitespace) {
            Some((code, name)) => (code.to_ascii_uppercase(), name.trim().to_string()),
            None => (parts[0].to_ascii_uppercase(), String::new()),
        };
        let Some(table_name) = country_name(&code) else {
            bail!("unknown country code {code:?} in location");
        };
        let mut loc = Location {
            country_name: if name.is_empty() { table_name.to_string() } else { name },
            country_code: code,
            ..Location::default()
        };
        let part = |i: usize| parts.get(i).map(|p| p.to_string()).unwrap_or_default();
        loc.state = part(1);
        loc.city = part(2);
        loc.sublocation = part(3);
        if loc.country_code == "USA" && loc.state.len() == 2 {
            if let Some(state) = us_state_name(&loc.state.to_ascii_uppercase()) {
                loc.state = state.to_string();
            }
        }
        Ok(loc)
    }

    pub fn is_empty(&self) -> bool {
        self.country_code.is_empty()
            && self.country_name.is_empty()
            && self.state.is_empty()
            && self.city.is_empty()
            && self.sublocation.is_empty()
    }

    /// The non-empty name components, broadest first.
    pub fn names(&self) -> Vec<&str> {
        [&self.country_name, &self.state, &self.city, &self.sublocation]
            .into_iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = self.country_code.clone();
        if !self.country_name.is_empty() && country_name(&self.country_code) != Some(self.country_name.as_str()) {
            if !first.is_empty() {
                first.push(' ');
            }
            first.push_str(&self.country_name);
        }
        let mut parts = vec![first, self.state.clone(), self.city.clone(), self.sublocation.clone()];
        while parts.last().is_some_and(|p| p.is_empty()) {
            parts.pop();
        }
        f.write_str(&parts.join(" / "))
    }
}
