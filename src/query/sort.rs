use std::cmp::Ordering;

use crate::core::{FieldValue, RawRecord};

/// One ordering key of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDescriptor {
    pub key: String,
    pub ascending: bool,
}

impl SortDescriptor {
    pub fn ascending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ascending: true,
        }
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ascending: false,
        }
    }
}

/// Compares two field values for sorting.
///
/// Missing values go last regardless of direction; incompatible types fall
/// back to ordering by type name so the comparison stays total.
fn compare_values(a: Option<&FieldValue>, b: Option<&FieldValue>, ascending: bool) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = a
                .compare(b)
                .unwrap_or_else(|| a.type_name().cmp(b.type_name()));
            if ascending { ordering } else { ordering.reverse() }
        }
    }
}

/// Compares two records by the given keys, in priority order.
pub fn compare_records(a: &RawRecord, b: &RawRecord, sort: &[SortDescriptor]) -> Ordering {
    for descriptor in sort {
        let left = a.lookup(&descriptor.key);
        let right = b.lookup(&descriptor.key);
        match compare_values(left.as_ref(), right.as_ref(), descriptor.ascending) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Stable sort: records equal on every key keep their store order.
pub fn sort_records(records: &mut [RawRecord], sort: &[SortDescriptor]) {
    if sort.is_empty() {
        return;
    }
    records.sort_by(|a, b| compare_records(a, b, sort));
}
