//! Conversion between typed entities and the store's field-bag records.
//!
//! Encoding is total: every field the entity owns is always written.
//! Decoding is total on read: a missing or mistyped required field yields
//! `None`, never a partially populated entity. Optional fields fall back to
//! a fixed default.

use chrono::{DateTime, Utc};

use crate::core::{AssetRef, FieldValue, RawRecord, RecordId};

/// A strongly-typed entity stored as one remote record type.
pub trait RecordCodec: Sized + Send + Sync + 'static {
    /// Remote record type this entity is stored under.
    const RECORD_TYPE: &'static str;

    /// Store-assigned identity, absent until the first successful save.
    fn record_id(&self) -> Option<&RecordId>;

    /// Returns a copy of the entity carrying the given identity.
    fn with_record_id(self, id: RecordId) -> Self;

    fn encode(&self) -> RawRecord;

    fn decode(record: &RawRecord) -> Option<Self>;

    /// Empty record of this type, carrying the entity's identity if it has one.
    fn blank_record(&self) -> RawRecord {
        RawRecord::new(Self::RECORD_TYPE).with_id(self.record_id().cloned())
    }
}

/// Typed read access over a [`RawRecord`] during decoding.
///
/// Required accessors return `None` when the field is missing or holds a
/// different type, so decoders can chain them with `?`.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    record: &'a RawRecord,
}

impl<'a> FieldReader<'a> {
    /// Returns a reader only if the record is of the expected type.
    pub fn for_type(record: &'a RawRecord, record_type: &str) -> Option<Self> {
        (record.record_type() == record_type).then_some(Self { record })
    }

    pub fn id(&self) -> Option<RecordId> {
        self.record.id().cloned()
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.record.get(key)?.as_str().map(str::to_string)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.record.get(key)?.as_i64()
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.record.get(key)?.as_f64()
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        self.record.get(key)?.as_bool()
    }

    pub fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.record.get(key)?.as_timestamp()
    }

    pub fn asset(&self, key: &str) -> Option<AssetRef> {
        self.record.get(key)?.as_asset().cloned()
    }

    /// Optional field: absent yields `Ok(None)`, present-but-mistyped yields `Err(())`.
    fn optional<T>(&self, key: &str, read: impl Fn(&FieldValue) -> Option<T>) -> Result<Option<T>, ()> {
        match self.record.get(key) {
            None => Ok(None),
            Some(value) => read(value).map(Some).ok_or(()),
        }
    }

    /// Optional text. A present value of another type fails the decode.
    pub fn optional_text(&self, key: &str) -> Option<Option<String>> {
        self.optional(key, |v| v.as_str().map(str::to_string)).ok()
    }

    /// Optional integer defaulting to `default` when absent.
    pub fn integer_or(&self, key: &str, default: i64) -> Option<i64> {
        self.optional(key, FieldValue::as_i64)
            .ok()
            .map(|value| value.unwrap_or(default))
    }

    /// Optional float defaulting to `default` when absent.
    pub fn float_or(&self, key: &str, default: f64) -> Option<f64> {
        self.optional(key, FieldValue::as_f64)
            .ok()
            .map(|value| value.unwrap_or(default))
    }

    pub fn optional_asset(&self, key: &str) -> Option<Option<AssetRef>> {
        self.optional(key, |v| v.as_asset().cloned()).ok()
    }
}
