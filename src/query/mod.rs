//! Query description: record type, predicate, ordering and result cap.
//!
//! The client only builds [`Query`] values; evaluation happens on the store
//! side. [`Query::execute`] is the reference evaluation used by stores that
//! hold records locally.

pub mod filter;
pub mod pattern;
pub mod sort;

pub use filter::{CompareOp, Filter};
pub use sort::{SortDescriptor, compare_records, sort_records};

use crate::core::{RawRecord, RemoteError};

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub record_type: String,
    pub filter: Filter,
    pub sort: Vec<SortDescriptor>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(record_type: impl Into<String>, filter: Filter) -> Self {
        Self {
            record_type: record_type.into(),
            filter,
            sort: Vec::new(),
            limit: None,
        }
    }

    pub fn sort_by(mut self, descriptor: SortDescriptor) -> Self {
        self.sort.push(descriptor);
        self
    }

    pub fn sorted(mut self, sort: Vec<SortDescriptor>) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Rejects queries a store would refuse before touching any record.
    pub fn validate(&self) -> Result<(), RemoteError> {
        if self.record_type.is_empty() {
            return Err(RemoteError::InvalidQuery("record type must not be empty".into()));
        }
        if self.sort.iter().any(|d| d.key.is_empty()) {
            return Err(RemoteError::InvalidQuery("sort key must not be empty".into()));
        }
        self.filter.validate()
    }

    /// Selects, orders and caps `records` (given in store order).
    pub fn execute<'a, I>(&self, records: I) -> Result<Vec<RawRecord>, RemoteError>
    where
        I: IntoIterator<Item = &'a RawRecord>,
    {
        self.validate()?;

        let mut matched = Vec::new();
        for record in records {
            if record.record_type() == self.record_type && self.filter.matches(record)? {
                matched.push(record.clone());
            }
        }

        sort_records(&mut matched, &self.sort);

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FieldValue;

    fn store() -> Vec<RawRecord> {
        let mut records = Vec::new();
        for (i, name) in ["A", "B", "C", "D"].iter().enumerate() {
            let mut record = RawRecord::new("Fruits");
            record.set("name", *name);
            record.set("count", i as i64);
            records.push(record);
        }
        let mut run = RawRecord::new("Runs");
        run.set("name", "B");
        records.push(run);
        records
    }

    #[test]
    fn test_scoped_to_record_type() {
        let records = store();
        let result = Query::new("Fruits", Filter::eq("name", "B"))
            .execute(&records)
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].get("count"), Some(&FieldValue::Integer(1)));
    }

    #[test]
    fn test_limit_applies_after_sort() {
        let records = store();
        let result = Query::new("Fruits", Filter::all())
            .sort_by(SortDescriptor::descending("count"))
            .limit(Some(2))
            .execute(&records)
            .unwrap();

        let counts: Vec<_> = result.iter().filter_map(|r| r.get("count")?.as_i64()).collect();
        assert_eq!(counts, vec![3, 2]);
    }

    #[test]
    fn test_invalid_query_is_rejected() {
        let records = store();
        let err = Query::new("Fruits", Filter::eq("name", FieldValue::Null))
            .execute(&records)
            .unwrap_err();
        assert!(matches!(err, RemoteError::InvalidQuery(_)));

        let err = Query::new("", Filter::all()).execute(&records).unwrap_err();
        assert!(matches!(err, RemoteError::InvalidQuery(_)));
    }
}
