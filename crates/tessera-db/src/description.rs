//! Schema descriptions.
//!
//! A schema version is content-addressed: its id is the CID of the
//! canonical JSON encoding of the description. The first version of a
//! schema doubles as its root; later versions keep the root and link back
//! to their predecessor through `/schema-history/<root>/<previous>`.
//!
//! These records are opaque to the replication core; the replicator only
//! resolves names to roots through them.

use serde::{Deserialize, Serialize};

use tessera_merkle::cid::{sha256_cid_v1, RAW};
use tessera_store::{MultiStore, StoreError};

use crate::error::{DbError, Result};

const HISTORY_PREFIX: &str = "/schema-history/";

/// One field of a schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescription {
    /// Field name.
    #[serde(rename = "Name")]
    pub name: String,

    /// Positional id, assigned on creation.
    #[serde(rename = "ID")]
    pub id: u32,
}

/// One version of a schema.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    /// Schema name; several versions may share it.
    #[serde(rename = "Name")]
    pub name: String,

    /// Root id: the version id of the schema's first version.
    #[serde(rename = "Root")]
    pub root: String,

    /// Content-addressed id of this version.
    #[serde(rename = "VersionID")]
    pub version_id: String,

    /// Fields in declaration order.
    #[serde(rename = "Fields")]
    pub fields: Vec<FieldDescription>,
}

/// Create and persist a new schema version.
///
/// Field ids are (re)assigned positionally. The version id is derived from
/// the canonical encoding with ids in place; for a brand-new schema the
/// root is set to the new version id, otherwise a history link from the
/// previous version is written.
pub fn create_schema_version(
    ms: &MultiStore<'_>,
    mut desc: SchemaDescription,
) -> Result<SchemaDescription> {
    for (i, field) in desc.fields.iter_mut().enumerate() {
        field.id = i as u32;
    }

    let previous = desc.version_id.clone();
    let is_new = desc.root.is_empty();

    // Two passes: the id is derived over the encoding that carries it.
    desc.version_id = String::new();
    let buf = serde_json::to_vec(&desc)?;
    let version_id = sha256_cid_v1(RAW, &buf).to_string();

    desc.version_id = version_id.clone();
    if is_new {
        desc.root = version_id.clone();
    }

    let buf = serde_json::to_vec(&desc)?;
    let system = ms.systemstore();
    system.set(format!("/{version_id}").as_bytes(), &buf)?;

    if !is_new {
        let history_key = format!("{HISTORY_PREFIX}{}/{previous}", desc.root);
        system.set(history_key.as_bytes(), version_id.as_bytes())?;
    }

    Ok(desc)
}

/// Fetch one schema version by id. `NotFound` when absent.
pub fn get_schema_version(ms: &MultiStore<'_>, version_id: &str) -> Result<SchemaDescription> {
    let buf = ms.systemstore().get(format!("/{version_id}").as_bytes())?;
    Ok(serde_json::from_slice(&buf)?)
}

/// Every schema version in the system.
pub fn get_all_schemas(ms: &MultiStore<'_>) -> Result<Vec<SchemaDescription>> {
    let system = ms.systemstore();
    let mut schemas = Vec::new();
    for (key, value) in system.iter_prefix(b"/")? {
        // Version entries sit directly under the namespace; replicator and
        // history records carry a second path segment.
        if key[1..].contains(&b'/') {
            continue;
        }
        schemas.push(serde_json::from_slice(&value)?);
    }
    Ok(schemas)
}

/// All versions carrying the given name.
pub fn get_schemas_by_name(ms: &MultiStore<'_>, name: &str) -> Result<Vec<SchemaDescription>> {
    let schemas = get_all_schemas(ms)?;
    let named: Vec<_> = schemas.into_iter().filter(|s| s.name == name).collect();
    if named.is_empty() {
        return Err(DbError::UnknownSchema(name.to_string()));
    }
    Ok(named)
}

/// The version id that superseded `version_id` under `root`, if any.
pub fn next_version(ms: &MultiStore<'_>, root: &str, version_id: &str) -> Result<Option<String>> {
    let key = format!("{HISTORY_PREFIX}{root}/{version_id}");
    match ms.systemstore().get(key.as_bytes()) {
        Ok(buf) => Ok(Some(
            String::from_utf8(buf).map_err(|e| DbError::Codec(e.to_string()))?,
        )),
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
