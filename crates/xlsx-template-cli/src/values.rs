use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use xlsx_template::{Placeholder, SubstitutionMap};

use crate::profile::Locale;

/// Placeholder values read from a JSON file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ValuesFile {
    pub locale: Option<Locale>,
    pub values: SubstitutionMap,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WithLocale {
    #[serde(default)]
    locale: Option<Locale>,
    values: SubstitutionMap,
}

/// Either `{ "Key": "Value", ... }` or `{ "locale": "de", "values": { ... } }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValues {
    WithLocale(WithLocale),
    Flat(SubstitutionMap),
}

pub fn parse_values(json: &str) -> Result<ValuesFile> {
    let raw: RawValues = serde_json::from_str(json).context(
        "expected a JSON object of placeholder values, or {\"locale\": ..., \"values\": {...}}",
    )?;
    Ok(match raw {
        RawValues::WithLocale(WithLocale { locale, values }) => ValuesFile { locale, values },
        RawValues::Flat(values) => ValuesFile {
            locale: None,
            values,
        },
    })
}

pub fn load_values(path: &Path) -> Result<ValuesFile> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read values file {}", path.display()))?;
    parse_values(&json).with_context(|| format!("parse values file {}", path.display()))
}

/// Parse a `--set` argument: `KEY=VALUE`, where `KEY` may also be written as `##KEY##`.
pub fn parse_assignment(arg: &str) -> Result<(Placeholder, String), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {arg:?}"))?;
    let key: Placeholder = key.trim().parse().map_err(|err| format!("{err}"))?;
    Ok((key, value.to_string()))
}
