// THEORY:
// The catalog store loads the configuration catalog from its JSON form:
//
//     { "F001": { "WxI": 1, "IyB": 1, "BzS": 1 }, "F002": { ... } }
//
// Labels map to objects whose keys are connection codes; the values carry no meaning.
// Declaration order of the labels is the catalog order used to break ties between
// configurations, so the document is read into an `IndexMap` and never into a sorted
// or hashed map.

use crate::core_modules::adjacency::Connection;
use crate::core_modules::catalog::{Catalog, Configuration};
use crate::error::{CreaCubeError, Result};
use indexmap::IndexMap;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let text = std::fs::read_to_string(path).map_err(|e| CreaCubeError::io(path, e))?;
    let catalog = parse_catalog(&text)?;
    info!(path = %path.display(), configurations = catalog.len(), "catalog loaded");
    Ok(catalog)
}

pub fn parse_catalog(text: &str) -> Result<Catalog> {
    let entries: IndexMap<String, Value> = serde_json::from_str(text)?;
    let mut catalog = Catalog::new();

    for (label, value) in entries {
        let Value::Object(codes) = value else {
            return Err(CreaCubeError::InvalidCatalog(format!(
                "entry {label:?} is not an object of connection codes"
            )));
        };

        let mut connections = Vec::with_capacity(codes.len());
        for code in codes.keys() {
            match code.parse::<Connection>() {
                Ok(connection) => connections.push(connection),
                Err(_) => warn!(label = %label, code = %code, "skipping malformed connection code"),
            }
        }
        catalog.push(Configuration::new(label, connections));
    }

    Ok(catalog)
}
