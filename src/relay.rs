//! Relay hierarchy.
//!
//! `mullvad relay list` prints an indented, tab-delimited tree:
//!
//! ```text
//! Sweden (se)
//! 	Gothenburg (got) @ 57.70000°N, 11.96667°W
//! 		se-got-wg-001 (185.213.154.66) - WireGuard, hosted by 31173 (Mullvad-owned)
//! 		se-got-wg-002 (185.213.154.67) - WireGuard, hosted by 31173 (Mullvad-owned)
//! ```
//!
//! [`RelayList::parse`] turns that into countries that own their cities,
//! which own their servers.  A country is looked up by the `(code)` that
//! appears in its header line, a city by the `(code)` in its label.

use serde::{Deserialize, Serialize};

/// Errors from parsing a relay dump.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A city line appeared before any country line.
    #[error("line {line}: city before any country")]
    CityBeforeCountry { line: usize },
    /// A server line appeared before any city line of the current country.
    #[error("line {line}: server before any city")]
    ServerBeforeCity { line: usize },
    /// A country or city line without a parenthesized code.
    #[error("line {line}: no (code) in {text:?}")]
    MissingCode { line: usize, text: String },
}

/// A failed lookup by code.  Recoverable; rendered as a "no match" item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no {kind} matches ({code})")]
pub struct LookupError {
    pub kind: &'static str,
    pub code: String,
}

impl LookupError {
    fn country(code: &str) -> Self {
        Self {
            kind: "country",
            code: code.to_string(),
        }
    }

    fn city(code: &str) -> Self {
        Self {
            kind: "city",
            code: code.to_string(),
        }
    }
}

/// One relay server line, split into whitespace tokens.
///
/// The first token is the hostname; the rest is free text whose shape
/// depends on the client version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub tokens: Vec<String>,
}

/// A city and its servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    /// Label as printed before the `@`, e.g. `Gothenburg (got)`.
    pub label: String,
    pub name: String,
    pub code: String,
    pub servers: Vec<Server>,
}

/// A country and its cities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// Header line as printed, e.g. `Sweden (se)`.
    pub header: String,
    pub name: String,
    pub code: String,
    pub cities: Vec<City>,
}

impl Country {
    /// First city whose label contains `(code)`.
    pub fn city(&self, code: &str) -> Result<&City, LookupError> {
        let needle = format!("({})", code);
        self.cities
            .iter()
            .find(|c| c.label.contains(&needle))
            .ok_or_else(|| LookupError::city(code))
    }
}

/// Display names of a resolved location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub country: String,
    pub city: String,
}

/// All relays, in the order the client printed them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayList {
    pub countries: Vec<Country>,
}

impl RelayList {
    /// Parse the raw output of `mullvad relay list`.
    ///
    /// Blank lines are skipped.  A city before any country, or a server
    /// before any city, is a hard error.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut countries: Vec<Country> = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let lineno = idx + 1;
            if line.trim().is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix("\t\t") {
                let city = countries
                    .last_mut()
                    .and_then(|c| c.cities.last_mut())
                    .ok_or(ParseError::ServerBeforeCity { line: lineno })?;
                city.servers.push(Server {
                    tokens: rest.split_whitespace().map(str::to_string).collect(),
                });
            } else if let Some(rest) = line.strip_prefix('\t') {
                let country = countries
                    .last_mut()
                    .ok_or(ParseError::CityBeforeCountry { line: lineno })?;
                let label = rest.split('@').next().unwrap_or_default().trim().to_string();
                let (name, code) = split_code(&label).ok_or_else(|| ParseError::MissingCode {
                    line: lineno,
                    text: label.clone(),
                })?;
                country.cities.push(City {
                    name,
                    code,
                    label,
                    servers: Vec::new(),
                });
            } else {
                let header = line.trim_end().to_string();
                let (name, code) = split_code(&header).ok_or_else(|| ParseError::MissingCode {
                    line: lineno,
                    text: header.clone(),
                })?;
                countries.push(Country {
                    header,
                    name,
                    code,
                    cities: Vec::new(),
                });
            }
        }

        Ok(Self { countries })
    }

    /// First country whose header contains `(code)`.
    pub fn country(&self, code: &str) -> Result<&Country, LookupError> {
        let needle = format!("({})", code);
        self.countries
            .iter()
            .find(|c| c.header.contains(&needle))
            .ok_or_else(|| LookupError::country(code))
    }

    /// Resolve a country and city code pair to display names.
    pub fn locate(&self, country_code: &str, city_code: &str) -> Result<Location, LookupError> {
        let country = self.country(country_code)?;
        let city = country.city(city_code)?;
        Ok(Location {
            country: country.name.clone(),
            city: city.name.clone(),
        })
    }
}

/// Split `Name (code)` into `("Name", "code")` using the last parenthesis
/// pair.
fn split_code(label: &str) -> Option<(String, String)> {
    let open = label.rfind('(')?;
    let close = open + label[open..].find(')')?;
    let code = label[open + 1..close].trim();
    if code.is_empty() {
        return None;
    }
    Some((label[..open].trim().to_string(), code.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "\
Albania (al)
\tTirana (tia) @ 41.32795°N, 19.81902°W
\t\tal-tia-wg-001 (31.171.153.66) - WireGuard, hosted by iRegister (rented)
\t\tal-tia-wg-002 (31.171.154.50) - WireGuard, hosted by iRegister (rented)
\tDurres (dur) @ 41.32350°N, 19.44140°W
\t\tal-dur-ovpn-001 (31.171.155.3) - OpenVPN, hosted by iRegister (rented)
\t\tal-dur-ovpn-002 (31.171.155.4) - OpenVPN, hosted by iRegister (rented)

Sweden (se)
\tGothenburg (got) @ 57.70887°N, 11.97456°W
\t\tse-got-wg-001 (185.213.154.66) - WireGuard, hosted by 31173 (Mullvad-owned)
\t\tse-got-wg-002 (185.213.154.67) - WireGuard, hosted by 31173 (Mullvad-owned)
\tStockholm (sto) @ 59.32938°N, 18.06871°W
\t\tse-sto-wg-001 (193.138.218.220) - WireGuard, hosted by 31173 (Mullvad-owned)
\t\tse-sto-wg-002 (193.138.218.80) - WireGuard, hosted by 31173 (Mullvad-owned)
";

    #[test]
    fn parses_three_level_hierarchy() {
        let list = RelayList::parse(DUMP).unwrap();
        assert_eq!(list.countries.len(), 2);
        for country in &list.countries {
            assert_eq!(country.cities.len(), 2, "{}", country.header);
            for city in &country.cities {
                assert_eq!(city.servers.len(), 2, "{}", city.label);
            }
        }
    }

    #[test]
    fn extracts_names_codes_and_tokens() {
        let list = RelayList::parse(DUMP).unwrap();
        let se = &list.countries[1];
        assert_eq!(se.header, "Sweden (se)");
        assert_eq!(se.name, "Sweden");
        assert_eq!(se.code, "se");
        let got = &se.cities[0];
        assert_eq!(got.label, "Gothenburg (got)");
        assert_eq!(got.name, "Gothenburg");
        assert_eq!(got.code, "got");
        assert_eq!(got.servers[0].tokens[0], "se-got-wg-001");
        assert_eq!(got.servers[0].tokens[1], "(185.213.154.66)");
    }

    #[test]
    fn multi_word_names_are_kept_whole() {
        let list = RelayList::parse("United Kingdom (gb)\n\tLondon (lon) @ 51.5°N, 0.1°W\n").unwrap();
        assert_eq!(list.countries[0].name, "United Kingdom");
        assert_eq!(list.countries[0].cities[0].name, "London");
    }

    #[test]
    fn empty_input_is_an_empty_list() {
        assert_eq!(RelayList::parse("").unwrap(), RelayList::default());
        assert_eq!(RelayList::parse("\n\n").unwrap(), RelayList::default());
    }

    #[test]
    fn server_before_city_is_an_error() {
        let err = RelayList::parse("Sweden (se)\n\t\tse-got-wg-001 (1.2.3.4)\n").unwrap_err();
        assert_eq!(err, ParseError::ServerBeforeCity { line: 2 });
    }

    #[test]
    fn city_before_country_is_an_error() {
        let err = RelayList::parse("\tGothenburg (got) @ 57°N\n").unwrap_err();
        assert_eq!(err, ParseError::CityBeforeCountry { line: 1 });
    }

    #[test]
    fn header_without_code_is_an_error() {
        let err = RelayList::parse("Sweden\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingCode { line: 1, .. }));
    }

    #[test]
    fn country_lookup_hits_every_listed_code() {
        let list = RelayList::parse(DUMP).unwrap();
        for country in &list.countries {
            assert_eq!(list.country(&country.code).unwrap().header, country.header);
        }
    }

    #[test]
    fn country_lookup_miss_is_recoverable() {
        let list = RelayList::parse(DUMP).unwrap();
        let err = list.country("zz").unwrap_err();
        assert_eq!(err.kind, "country");
        assert_eq!(err.to_string(), "no country matches (zz)");
    }

    #[test]
    fn locate_resolves_display_names() {
        let list = RelayList::parse(DUMP).unwrap();
        let loc = list.locate("se", "sto").unwrap();
        assert_eq!(loc.country, "Sweden");
        assert_eq!(loc.city, "Stockholm");
    }

    #[test]
    fn locate_reports_city_miss() {
        let list = RelayList::parse(DUMP).unwrap();
        let err = list.locate("se", "mlm").unwrap_err();
        assert_eq!(err.kind, "city");
    }

    #[test]
    fn survives_a_serde_round_trip() {
        let list = RelayList::parse(DUMP).unwrap();
        let json = serde_json::to_string(&list).unwrap();
        let back: RelayList = serde_json::from_str(&json).unwrap();
        assert_eq!(back, list);
    }
}
