use std::cmp::Ordering;
use std::fmt;

use super::pattern::eval_like;
use crate::core::{FieldValue, RawRecord, RemoteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::NotEq => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::LtEq => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::GtEq => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        };
        f.write_str(op)
    }
}

/// Logical predicate over record fields.
///
/// Keys resolve against user fields first and then the store's system
/// fields, so `creationDate` can be filtered on. A comparison against a
/// missing field or a value of an incompatible type never matches.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    Compare {
        key: String,
        op: CompareOp,
        value: FieldValue,
    },
    BeginsWith {
        key: String,
        prefix: String,
    },
    Like {
        key: String,
        pattern: String,
        case_sensitive: bool,
    },
    In {
        key: String,
        values: Vec<FieldValue>,
    },
    IsNull(String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Matches every record.
    pub fn all() -> Self {
        Self::True
    }

    fn compare(key: impl Into<String>, op: CompareOp, value: impl Into<FieldValue>) -> Self {
        Self::Compare {
            key: key.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(key, CompareOp::Eq, value)
    }

    pub fn not_eq(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(key, CompareOp::NotEq, value)
    }

    pub fn lt(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(key, CompareOp::Lt, value)
    }

    pub fn lt_eq(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(key, CompareOp::LtEq, value)
    }

    pub fn gt(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(key, CompareOp::Gt, value)
    }

    pub fn gt_eq(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(key, CompareOp::GtEq, value)
    }

    pub fn begins_with(key: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::BeginsWith {
            key: key.into(),
            prefix: prefix.into(),
        }
    }

    pub fn like(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like {
            key: key.into(),
            pattern: pattern.into(),
            case_sensitive: true,
        }
    }

    pub fn ilike(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like {
            key: key.into(),
            pattern: pattern.into(),
            case_sensitive: false,
        }
    }

    /// Case-insensitive substring match; wildcard characters in `needle`
    /// are taken literally.
    pub fn contains(key: impl Into<String>, needle: &str) -> Self {
        let mut pattern = String::with_capacity(needle.len() + 2);
        pattern.push('%');
        for c in needle.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        Self::ilike(key, pattern)
    }

    pub fn is_in<V: Into<FieldValue>>(key: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::In {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(key: impl Into<String>) -> Self {
        Self::IsNull(key.into())
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            this => Self::And(vec![this, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Self::Or(mut parts) => {
                parts.push(other);
                Self::Or(parts)
            }
            this => Self::Or(vec![this, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Checks the predicate is well formed: non-empty keys, no comparison
    /// against `Null` (use [`Filter::is_null`]).
    pub fn validate(&self) -> Result<(), RemoteError> {
        let key = match self {
            Self::True => return Ok(()),
            Self::Compare { key, value, .. } => {
                if value.is_null() {
                    return Err(RemoteError::InvalidQuery(format!(
                        "cannot compare '{}' against NULL; use IS NULL",
                        key
                    )));
                }
                key
            }
            Self::BeginsWith { key, .. }
            | Self::Like { key, .. }
            | Self::In { key, .. }
            | Self::IsNull(key) => key,
            Self::And(parts) | Self::Or(parts) => {
                return parts.iter().try_for_each(Filter::validate);
            }
            Self::Not(inner) => return inner.validate(),
        };

        if key.is_empty() {
            return Err(RemoteError::InvalidQuery("field key must not be empty".into()));
        }
        Ok(())
    }

    /// Evaluates the predicate against one record.
    ///
    /// Only a malformed `Like` pattern can fail.
    pub fn matches(&self, record: &RawRecord) -> Result<bool, RemoteError> {
        match self {
            Self::True => Ok(true),
            Self::Compare { key, op, value } => Ok(record
                .lookup(key)
                .and_then(|field| field.compare(value))
                .is_some_and(|ordering| op.holds(ordering))),
            Self::BeginsWith { key, prefix } => Ok(record
                .get(key)
                .and_then(FieldValue::as_str)
                .is_some_and(|text| text.starts_with(prefix.as_str()))),
            Self::Like {
                key,
                pattern,
                case_sensitive,
            } => match record.get(key).and_then(FieldValue::as_str) {
                Some(text) => eval_like(text, pattern, *case_sensitive),
                None => Ok(false),
            },
            Self::In { key, values } => Ok(record
                .lookup(key)
                .is_some_and(|field| values.iter().any(|candidate| *candidate == field))),
            Self::IsNull(key) => Ok(record.lookup(key).is_none()),
            Self::And(parts) => {
                for part in parts {
                    if !part.matches(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Or(parts) => {
                for part in parts {
                    if part.matches(record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not(inner) => Ok(!inner.matches(record)?),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::True
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "TRUEPREDICATE"),
            Self::Compare { key, op, value } => write!(f, "{} {} {}", key, op, value),
            Self::BeginsWith { key, prefix } => write!(f, "{} BEGINSWITH '{}'", key, prefix),
            Self::Like {
                key,
                pattern,
                case_sensitive,
            } => {
                let op = if *case_sensitive { "LIKE" } else { "ILIKE" };
                write!(f, "{} {} '{}'", key, op, pattern)
            }
            Self::In { key, values } => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} IN ({})", key, values.join(", "))
            }
            Self::IsNull(key) => write!(f, "{} IS NULL", key),
            Self::And(parts) => write_joined(f, parts, " AND "),
            Self::Or(parts) => write_joined(f, parts, " OR "),
            Self::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Filter], sep: &str) -> fmt::Result {
    let rendered: Vec<String> = parts.iter().map(|p| format!("({})", p)).collect();
    f.write_str(&rendered.join(sep))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fruit(name: &str, count: i64) -> RawRecord {
        let mut record = RawRecord::new("Fruits");
        record.set("name", name);
        record.set("count", count);
        record
    }

    #[test]
    fn test_true_matches_everything() {
        assert!(Filter::all().matches(&fruit("Apple", 1)).unwrap());
        assert!(Filter::all().matches(&RawRecord::new("Empty")).unwrap());
    }

    #[test]
    fn test_comparisons() {
        let apple = fruit("Apple", 3);

        assert!(Filter::eq("name", "Apple").matches(&apple).unwrap());
        assert!(!Filter::eq("name", "Banana").matches(&apple).unwrap());
        assert!(Filter::gt("count", 2i64).matches(&apple).unwrap());
        assert!(Filter::lt_eq("count", 3.0).matches(&apple).unwrap());
        assert!(!Filter::lt("count", 3i64).matches(&apple).unwrap());
        assert!(Filter::not_eq("name", "Pear").matches(&apple).unwrap());
    }

    #[test]
    fn test_missing_or_mistyped_never_matches() {
        let apple = fruit("Apple", 3);

        assert!(!Filter::eq("color", "red").matches(&apple).unwrap());
        assert!(!Filter::not_eq("color", "red").matches(&apple).unwrap());
        assert!(!Filter::gt("name", 1i64).matches(&apple).unwrap());
    }

    #[test]
    fn test_string_predicates() {
        let banana = fruit("Banana", 0);

        assert!(Filter::begins_with("name", "Ban").matches(&banana).unwrap());
        assert!(!Filter::begins_with("name", "ban").matches(&banana).unwrap());
        assert!(Filter::ilike("name", "%NAN%").matches(&banana).unwrap());
        assert!(!Filter::like("count", "%").matches(&banana).unwrap());
        assert!(Filter::contains("name", "NAN").matches(&banana).unwrap());
        assert!(!Filter::contains("name", "n%n").matches(&banana).unwrap());
    }

    #[test]
    fn test_in_and_is_null() {
        let banana = fruit("Banana", 0);

        assert!(Filter::is_in("name", ["Apple", "Banana"]).matches(&banana).unwrap());
        assert!(!Filter::is_in("name", ["Apple"]).matches(&banana).unwrap());
        assert!(Filter::is_null("image").matches(&banana).unwrap());
        assert!(!Filter::is_null("name").matches(&banana).unwrap());
    }

    #[test]
    fn test_logical_combinators() {
        let banana = fruit("Banana", 5);
        let filter = Filter::eq("name", "Banana").and(Filter::gt("count", 10i64));
        assert!(!filter.matches(&banana).unwrap());

        let filter = filter.or(Filter::eq("count", 5i64));
        assert!(filter.matches(&banana).unwrap());

        assert!(Filter::eq("name", "Apple").not().matches(&banana).unwrap());
    }

    #[test]
    fn test_and_flattens() {
        let filter = Filter::all().and(Filter::is_null("a")).and(Filter::is_null("b"));
        match filter {
            Filter::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected AND, got {:?}", other),
        }
    }

    #[test]
    fn test_validate() {
        assert!(Filter::eq("name", "Banana").validate().is_ok());
        assert!(Filter::eq("", "Banana").validate().is_err());
        assert!(Filter::all().and(Filter::eq("image", FieldValue::Null)).validate().is_err());
        assert!(Filter::is_null("").not().validate().is_err());
    }

    #[test]
    fn test_display() {
        let filter = Filter::eq("name", "Banana").and(Filter::gt("count", 1i64));
        assert_eq!(filter.to_string(), "(name = Banana) AND (count > 1)");
    }
}
