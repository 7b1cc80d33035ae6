//! # Schema Configuration
//!
//! Model schemas declared in TOML.
//!
//! ```toml
//! [[models]]
//! name = "book"
//!
//! [[models]]
//! name = "author"
//! id_attribute = "slug"
//! map_name = "authors"
//! arr_name = "authorOrder"
//! ```
//!
//! Omitted fields fall back to `Schema::new` naming. File I/O is limited to
//! reading the declaration; nothing is written back.

use crate::model::Schema;
use crate::TesseraError;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

/// One `[[models]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    /// Model name; also the prefix of the default map/array keys.
    pub name: String,
    /// Primary-key attribute, `"id"` when omitted.
    #[serde(default)]
    pub id_attribute: Option<String>,
    /// Entity-map key, `"<name>ById"` when omitted.
    #[serde(default)]
    pub map_name: Option<String>,
    /// Id-array key, `"<name>Ids"` when omitted.
    #[serde(default)]
    pub arr_name: Option<String>,
}

impl SchemaConfig {
    /// Validate and resolve defaults.
    pub fn into_schema(self) -> Result<Schema, TesseraError> {
        if self.name.trim().is_empty() {
            return Err(TesseraError::InvalidSchema(
                "model name must not be empty".to_string(),
            ));
        }

        let mut schema = Schema::new(self.name.as_str());
        if let Some(attr) = self.id_attribute {
            schema = schema.with_id_attribute(non_empty(attr, "id_attribute", &self.name)?);
        }
        if let Some(map_name) = self.map_name {
            schema = schema.with_map_name(non_empty(map_name, "map_name", &self.name)?);
        }
        if let Some(arr_name) = self.arr_name {
            schema = schema.with_arr_name(non_empty(arr_name, "arr_name", &self.name)?);
        }

        if schema.map_name() == schema.arr_name() {
            return Err(TesseraError::InvalidSchema(format!(
                "{}: map_name and arr_name must differ",
                schema.name()
            )));
        }
        Ok(schema)
    }
}

fn non_empty(value: String, field: &str, model: &str) -> Result<String, TesseraError> {
    if value.trim().is_empty() {
        Err(TesseraError::InvalidSchema(format!(
            "{model}: {field} must not be empty"
        )))
    } else {
        Ok(value)
    }
}

/// Root of a schema declaration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TesseraConfig {
    /// Declared models.
    #[serde(default)]
    pub models: Vec<SchemaConfig>,
}

impl TesseraConfig {
    /// Parse a TOML declaration.
    pub fn from_toml_str(input: &str) -> Result<Self, TesseraError> {
        toml::from_str(input).map_err(|e| TesseraError::InvalidSchema(e.to_string()))
    }

    /// Resolve every model. Names and storage keys must be unique.
    pub fn into_schemas(self) -> Result<Vec<Schema>, TesseraError> {
        let mut names = BTreeSet::new();
        let mut keys = BTreeSet::new();
        let mut schemas = Vec::with_capacity(self.models.len());

        for model in self.models {
            let schema = model.into_schema()?;
            if !names.insert(schema.name().to_string()) {
                return Err(TesseraError::InvalidSchema(format!(
                    "duplicate model name: {}",
                    schema.name()
                )));
            }
            for key in [schema.map_name(), schema.arr_name()] {
                if !keys.insert(key.to_string()) {
                    return Err(TesseraError::InvalidSchema(format!(
                        "{}: storage key {key} already used by another model",
                        schema.name()
                    )));
                }
            }
            schemas.push(schema);
        }
        Ok(schemas)
    }
}

/// Parse and resolve a TOML schema declaration.
pub fn load_schemas(input: &str) -> Result<Vec<Schema>, TesseraError> {
    let schemas = TesseraConfig::from_toml_str(input)?.into_schemas()?;
    tracing::info!(count = schemas.len(), "model schemas loaded");
    Ok(schemas)
}

/// Read, parse and resolve a TOML schema file.
pub fn load_schemas_from_path(path: impl AsRef<Path>) -> Result<Vec<Schema>, TesseraError> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path)
        .map_err(|e| TesseraError::Io(format!("{}: {e}", path.display())))?;
    load_schemas(&input)
}

// =============================================================================
// TESTS
// =============================================================================
