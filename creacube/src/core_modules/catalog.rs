// THEORY:
// The `catalog` module is the Configuration Matcher. A configuration is a named
// assembly of the cubes, described by the set of joins it is built from. Matching a
// frame is a lookup: which catalog entry contains every join seen in the frame?
//
// Key architectural principles:
// 1.  **Only Complete Frames Match**: a frame must carry exactly `MAX_CONNECTIONS`
//     joins. Two joins can belong to many assemblies, so partial frames are never
//     matched.
// 2.  **Superset Lookup**: an entry matches when its own join set contains all of the
//     frame's joins. Entries may list more joins than a frame can carry.
// 3.  **Ordered Catalog**: several entries can contain the same three joins. The
//     catalog is an ordered list, never a hash map, and the first matching entry in
//     declaration order wins. Loading code must preserve the order of the source.

use crate::core_modules::adjacency::{Connection, ConnectionSet, MAX_CONNECTIONS};
use crate::error::Result;
use std::collections::BTreeSet;

/// A named assembly of cubes and the joins that define it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    label: String,
    connections: BTreeSet<Connection>,
}

impl Configuration {
    pub fn new(label: impl Into<String>, connections: impl IntoIterator<Item = Connection>) -> Self {
        Self {
            label: label.into(),
            connections: connections.into_iter().collect(),
        }
    }

    /// Builds a configuration from textual codes such as `"WxI"`.
    pub fn from_codes(label: impl Into<String>, codes: &[&str]) -> Result<Self> {
        let connections = codes
            .iter()
            .map(|code| code.parse::<Connection>())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(label, connections))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// True if every join in `set` is part of this configuration.
    pub fn contains_all(&self, set: &ConnectionSet) -> bool {
        set.iter().all(|connection| self.connections.contains(connection))
    }
}

/// The ordered list of known configurations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    configurations: Vec<Configuration>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a configuration; it loses ties against everything already present.
    pub fn push(&mut self, configuration: Configuration) {
        self.configurations.push(configuration);
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Configuration> {
        self.configurations.iter()
    }

    pub fn get(&self, label: &str) -> Option<&Configuration> {
        self.configurations.iter().find(|c| c.label == label)
    }

    /// Returns the first configuration, in catalog order, that contains every join of
    /// a full frame. Frames with fewer than `MAX_CONNECTIONS` joins never match.
    pub fn match_configuration(&self, set: &ConnectionSet) -> Option<&Configuration> {
        if set.len() != MAX_CONNECTIONS {
            return None;
        }
        self.configurations.iter().find(|c| c.contains_all(set))
    }
}

impl FromIterator<Configuration> for Catalog {
    fn from_iter<T: IntoIterator<Item = Configuration>>(iter: T) -> Self {
        Self {
            configurations: iter.into_iter().collect(),
        }
    }
}
