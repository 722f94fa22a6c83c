use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::FieldValue;

/// System field holding the time the store first saved a record.
pub const CREATION_DATE_KEY: &str = "creationDate";
/// System field holding the time of the most recent save.
pub const MODIFICATION_DATE_KEY: &str = "modificationDate";

/// Opaque, store-assigned record identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Metadata the store maintains on every saved record.
///
/// Read-only from the client's point of view; codecs never write it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemFields {
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub change_tag: String,
}

/// Untyped field bag as exchanged with the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    record_type: String,
    id: Option<RecordId>,
    fields: BTreeMap<String, FieldValue>,
    system: Option<SystemFields>,
}

impl RawRecord {
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            id: None,
            fields: BTreeMap::new(),
            system: None,
        }
    }

    pub fn with_id(mut self, id: Option<RecordId>) -> Self {
        self.id = id;
        self
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    pub(crate) fn assign_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    pub fn system(&self) -> Option<&SystemFields> {
        self.system.as_ref()
    }

    pub(crate) fn set_system(&mut self, system: SystemFields) {
        self.system = Some(system);
    }

    /// Returns the stored value, treating an explicit `Null` as absent.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key).filter(|value| !value.is_null())
    }

    /// Looks up a user field first, then the store's system fields.
    pub fn lookup(&self, key: &str) -> Option<FieldValue> {
        if let Some(value) = self.get(key) {
            return Some(value.clone());
        }
        let system = self.system.as_ref()?;
        match key {
            CREATION_DATE_KEY => Some(FieldValue::Timestamp(system.created_at)),
            MODIFICATION_DATE_KEY => Some(FieldValue::Timestamp(system.modified_at)),
            _ => None,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}
