use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::placeholder::{replace_tokens, InvalidPlaceholder, Placeholder};

/// Placeholder name -> replacement text.
///
/// Keys are validated placeholder names. Names missing from the map are not an error: their
/// tokens stay in the text verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct SubstitutionMap {
    entries: BTreeMap<String, String>,
}

impl SubstitutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from `(name, value)` string pairs, validating each name.
    pub fn try_from_pairs<K, V>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, InvalidPlaceholder>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (name, value) in pairs {
            map.try_insert(name, value)?;
        }
        Ok(map)
    }

    pub fn insert(&mut self, placeholder: Placeholder, value: impl Into<String>) -> Option<String> {
        self.entries.insert(placeholder.into_name(), value.into())
    }

    pub fn try_insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>, InvalidPlaceholder> {
        let placeholder = Placeholder::new(name)?;
        Ok(self.insert(placeholder, value))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries of `other` replace entries of `self` with the same name.
    pub fn extend(&mut self, other: SubstitutionMap) {
        self.entries.extend(other.entries);
    }

    /// Layer `defaults` underneath this map: explicit entries win, defaults only fill names
    /// that are missing.
    pub fn with_defaults(&self, defaults: &SubstitutionMap) -> SubstitutionMap {
        let mut entries = defaults.entries.clone();
        entries.extend(self.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        SubstitutionMap { entries }
    }

    /// Replace every `##Name##` token whose name is in the map.
    ///
    /// One left-to-right pass; replacement text is never scanned for further tokens, so the
    /// result does not depend on the order keys were inserted.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        replace_tokens(text, |name, out| self.resolve(name, out))
    }

    /// Like [`SubstitutionMap::apply`], additionally recording names of tokens that stayed
    /// unresolved.
    pub fn apply_recording_unresolved<'a>(
        &self,
        text: &'a str,
        unresolved: &mut BTreeSet<String>,
    ) -> Cow<'a, str> {
        replace_tokens(text, |name, out| {
            let hit = self.resolve(name, out);
            if !hit && !unresolved.contains(name) {
                unresolved.insert(name.to_string());
            }
            hit
        })
    }

    fn resolve(&self, name: &str, out: &mut String) -> bool {
        match self.entries.get(name) {
            Some(value) => {
                out.push_str(value);
                true
            }
            None => false,
        }
    }
}

impl TryFrom<BTreeMap<String, String>> for SubstitutionMap {
    type Error = InvalidPlaceholder;

    fn try_from(entries: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::try_from_pairs(entries)
    }
}

impl From<SubstitutionMap> for BTreeMap<String, String> {
    fn from(map: SubstitutionMap) -> Self {
        map.entries
    }
}

impl FromIterator<(Placeholder, String)> for SubstitutionMap {
    fn from_iter<I: IntoIterator<Item = (Placeholder, String)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (placeholder, value) in iter {
            map.insert(placeholder, value);
        }
        map
    }
}
