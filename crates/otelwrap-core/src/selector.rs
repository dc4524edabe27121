//! Field selection: include/alias, exclude, and output flags.

use indexmap::{IndexMap, IndexSet};

/// Which fields survive, and under which output key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldSet {
    /// Every field, under its own name.
    #[default]
    All,
    /// Only these fields: source name → output key, in output order.
    Only(IndexMap<String, String>),
}

/// Filtering and aliasing rules applied to every mapping the encoder meets,
/// plus the flags the JSON writer honours.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelector {
    pub fields: FieldSet,
    pub exclude: IndexSet<String>,
    /// Drop entries whose value is null.
    pub exclude_none: bool,
    /// Escape every non-ASCII character in the serialized output.
    pub ascii_only: bool,
    /// Sort object keys in the serialized output.
    pub sort_keys: bool,
}

impl FieldSelector {
    pub fn all() -> Self {
        Self::default()
    }

    /// Keep only `keys`, each under its own name.
    pub fn only<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let map = keys
            .into_iter()
            .map(|k| {
                let k = k.into();
                (k.clone(), k)
            })
            .collect();
        Self {
            fields: FieldSet::Only(map),
            ..Self::default()
        }
    }

    /// Keep only the given source fields, renamed to their output keys.
    pub fn aliased<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            fields: FieldSet::Only(map),
            ..Self::default()
        }
    }

    pub fn excluding<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_exclude_none(mut self, yes: bool) -> Self {
        self.exclude_none = yes;
        self
    }

    pub fn with_ascii_only(mut self, yes: bool) -> Self {
        self.ascii_only = yes;
        self
    }

    pub fn with_sort_keys(mut self, yes: bool) -> Self {
        self.sort_keys = yes;
        self
    }

    /// Resolve the output key for a source key, or `None` if the entry is
    /// filtered out.
    ///
    /// An excluded key survives only when the include set names it
    /// explicitly; with an include set present, unlisted keys are dropped.
    pub fn output_key<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        let included = match &self.fields {
            FieldSet::All => None,
            FieldSet::Only(map) => Some(map.get(key)),
        };
        if self.exclude.contains(key) && !matches!(included, Some(Some(_))) {
            return None;
        }
        match included {
            None => Some(key),
            Some(Some(alias)) => Some(alias.as_str()),
            Some(None) => None,
        }
    }

    /// Source field names in output order, or `None` for "all fields".
    pub fn explicit_fields(&self) -> Option<&IndexMap<String, String>> {
        match &self.fields {
            FieldSet::All => None,
            FieldSet::Only(map) => Some(map),
        }
    }
}
