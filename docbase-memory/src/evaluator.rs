//! Query expression evaluation and update application for in-memory documents.
//!
//! This module provides the evaluation engine for filter expressions, the ordering
//! used for sorts, and the field-level mutations behind partial updates.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document as BsonDocument, datetime::DateTime};

use docbase_core::{
    query::{QueryVisitor, Expr, FieldOp, Sort, SortDirection},
    update::{Update, UpdateOp},
    error::{DriverError, DriverResult},
};


/// Type-erased, comparable representation of BSON values.
///
/// Integers of either width compare exactly as i64; they meet floats as f64.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    /// Binary payloads, UUIDs included.
    Binary(&'a [u8]),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(*value as i64),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Binary(binary) => Comparable::Binary(&binary.bytes),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Int(a), Comparable::Number(b)) => (*a as f64) == *b,
            (Comparable::Number(a), Comparable::Int(b)) => *a == (*b as f64),
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Binary(a), Comparable::Binary(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Number(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Number(a), Comparable::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::Binary(a), Comparable::Binary(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Value equality as unique indexes see it: `1`, `1i64` and `1.0` are the same key.
pub(crate) fn same_value(left: &Bson, right: &Bson) -> bool {
    Comparable::from(left) == Comparable::from(right)
}

/// Orders two documents by a list of sort keys, earlier keys first.
///
/// Missing fields sort as null; incomparable values are treated as equal.
pub(crate) fn compare_documents(left: &BsonDocument, right: &BsonDocument, sort: &[Sort]) -> Ordering {
    for key in sort {
        let a = left.get(&key.field).map(Comparable::from).unwrap_or(Comparable::Null);
        let b = right.get(&key.field).map(Comparable::from).unwrap_or(Comparable::Null);

        let ordering = match key.direction {
            SortDirection::Asc => a.partial_cmp(&b),
            SortDirection::Desc => b.partial_cmp(&a),
        }
        .unwrap_or(Ordering::Equal);

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a BsonDocument,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a BsonDocument) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DriverResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns `true` if the document matches the filter. A `None` filter matches everything.
    pub fn matches(document: &'a BsonDocument, filter: Option<&Expr>) -> DriverResult<bool> {
        match filter {
            Some(expr) => DocumentEvaluator::new(document).evaluate(expr),
            None => Ok(true),
        }
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DriverError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(self.document.contains_key(field) == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let field_value = match self.document.get(field) {
            Some(field_value) => field_value,
            // A missing field only satisfies the negative operators.
            None => return Ok(matches!(op, FieldOp::Ne | FieldOp::NotContains | FieldOp::NoneOf)),
        };

        match op {
            FieldOp::Eq => Ok(Comparable::from(field_value) == Comparable::from(value)),
            FieldOp::Ne => Ok(Comparable::from(field_value) != Comparable::from(value)),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                match Comparable::from(field_value).partial_cmp(&Comparable::from(value)) {
                    Some(ordering) => Ok(match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    }),
                    None => Ok(false),
                }
            },
            FieldOp::Contains => Ok(contains(field_value, value)),
            FieldOp::NotContains => Ok(!contains(field_value, value)),
            FieldOp::StartsWith => match (field_value, value) {
                (Bson::String(left), Bson::String(right)) => Ok(left.starts_with(right.as_str())),
                _ => Ok(false),
            },
            FieldOp::EndsWith => match (field_value, value) {
                (Bson::String(left), Bson::String(right)) => Ok(left.ends_with(right.as_str())),
                _ => Ok(false),
            },
            FieldOp::AnyOf => Ok(any_of(field_value, value)),
            FieldOp::NoneOf => Ok(!any_of(field_value, value)),
        }
    }
}

fn contains(field_value: &Bson, value: &Bson) -> bool {
    match (Comparable::from(field_value), Comparable::from(value)) {
        (Comparable::Array(array), needle) => array.iter().any(|item| item == &needle),
        (Comparable::String(left), Comparable::String(right)) => left.contains(right),
        _ => false,
    }
}

fn any_of(field_value: &Bson, value: &Bson) -> bool {
    match (Comparable::from(field_value), Comparable::from(value)) {
        (Comparable::Array(array), Comparable::Array(values)) => values
            .iter()
            .any(|val| array.iter().any(|item| item == val)),
        (Comparable::Array(array), single_value) => array.iter().any(|item| item == &single_value),
        (single_value, Comparable::Array(values)) => values.iter().any(|val| val == &single_value),
        (left, right) => left == right,
    }
}

/// Applies an update to a document in place.
pub(crate) fn apply_update(document: &mut BsonDocument, update: &Update) -> DriverResult<()> {
    for op in update.ops() {
        match op {
            UpdateOp::Set(field, value) => {
                document.insert(field.clone(), value.clone());
            },
            UpdateOp::Unset(field) => {
                document.remove(field);
            },
            UpdateOp::Inc(field, amount) => {
                let current = document.get(field).cloned().unwrap_or(Bson::Int32(0));
                document.insert(field.clone(), increment(field, &current, amount)?);
            },
        }
    }

    Ok(())
}

fn increment(field: &str, current: &Bson, amount: &Bson) -> DriverResult<Bson> {
    Ok(match (current, amount) {
        // Int32 results that no longer fit are widened, as MongoDB does.
        (Bson::Int32(a), Bson::Int32(b)) => a
            .checked_add(*b)
            .map(Bson::Int32)
            .unwrap_or(Bson::Int64(*a as i64 + *b as i64)),
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            let (Comparable::Int(a), Comparable::Int(b)) = (Comparable::from(current), Comparable::from(amount)) else {
                return Err(non_numeric(field));
            };

            Bson::Int64(a.checked_add(b).ok_or_else(|| overflow(field))?)
        },
        (Bson::Double(a), b) | (b, Bson::Double(a)) => match Comparable::from(b) {
            Comparable::Int(b) => Bson::Double(a + b as f64),
            Comparable::Number(b) => Bson::Double(a + b),
            _ => return Err(non_numeric(field)),
        },
        _ => return Err(non_numeric(field)),
    })
}

fn overflow(field: &str) -> DriverError {
    DriverError::Server {
        code: 2,
        message: format!("Failed to apply $inc operations to current value of field '{field}': integer overflow"),
    }
}

fn non_numeric(field: &str) -> DriverError {
    DriverError::Server {
        code: 14,
        message: format!("Cannot apply $inc to a value of non-numeric type in field '{field}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{Uuid, doc};
    use docbase_core::query::Filter;

    fn eval(document: &BsonDocument, expr: Expr) -> bool {
        DocumentEvaluator::new(document).evaluate(&expr).unwrap()
    }

    #[test]
    fn comparisons_normalize_numbers() {
        let document = doc! { "age": 30_i64, "score": 4.5 };

        assert!(eval(&document, Filter::eq("age", 30)));
        assert!(eval(&document, Filter::gte("age", 30)));
        assert!(!eval(&document, Filter::gt("age", 30)));
        assert!(eval(&document, Filter::lt("score", 5)));
    }

    #[test]
    fn uuids_compare_by_bytes() {
        let id = Uuid::new();
        let document = doc! { "id": id };

        assert!(eval(&document, Filter::eq("id", id)));
        assert!(!eval(&document, Filter::eq("id", Uuid::new())));
    }

    #[test]
    fn missing_fields_only_match_negative_operators() {
        let document = doc! { "name": "Alice" };

        assert!(!eval(&document, Filter::eq("age", 1)));
        assert!(eval(&document, Filter::ne("age", 1)));
        assert!(eval(&document, Filter::not_exists("age")));
    }

    #[test]
    fn string_and_array_operators() {
        let document = doc! { "name": "Alice", "tags": ["a", "b"] };

        assert!(eval(&document, Filter::starts_with("name", "Al")));
        assert!(eval(&document, Filter::ends_with("name", "ce")));
        assert!(eval(&document, Filter::contains("name", "lic")));
        assert!(eval(&document, Filter::contains("tags", "b")));
        assert!(eval(&document, Filter::any_of("tags", vec!["c", "a"])));
        assert!(eval(&document, Filter::none_of("name", vec!["Bob"])));
        assert!(eval(&document, Filter::or([Filter::eq("name", "Bob"), Filter::exists("tags")])));
    }

    #[test]
    fn sort_uses_later_keys_as_tie_breakers() {
        let a = doc! { "last": "Doe", "first": "Jane" };
        let b = doc! { "last": "Doe", "first": "John" };
        let sort = vec![
            Sort { field: "last".into(), direction: SortDirection::Asc },
            Sort { field: "first".into(), direction: SortDirection::Desc },
        ];

        assert_eq!(compare_documents(&a, &b, &sort), Ordering::Greater);
    }

    #[test]
    fn updates_set_unset_and_increment() {
        let mut document = doc! { "name": "Alice", "nickname": "Al", "logins": 1 };
        let update = Update::new()
            .set("name", "Alicia")
            .unset("nickname")
            .inc("logins", 2)
            .inc("visits", 1);

        apply_update(&mut document, &update).unwrap();

        assert_eq!(document, doc! { "name": "Alicia", "logins": 3, "visits": 1 });
    }

    #[test]
    fn wide_integers_compare_exactly() {
        let document = doc! { "n": 9_007_199_254_740_992_i64 };

        assert!(!eval(&document, Filter::eq("n", 9_007_199_254_740_993_i64)));
        assert!(eval(&document, Filter::lt("n", 9_007_199_254_740_993_i64)));
        assert!(eval(&document, Filter::eq("n", 9_007_199_254_740_992_i64)));
    }

    #[test]
    fn same_value_ignores_numeric_width() {
        assert!(same_value(&Bson::Int32(1), &Bson::Int64(1)));
        assert!(same_value(&Bson::Int64(2), &Bson::Double(2.0)));
        assert!(!same_value(&Bson::Int32(1), &Bson::String("1".into())));
    }

    #[test]
    fn increment_widens_int32_and_rejects_int64_overflow() {
        let mut document = doc! { "small": i32::MAX, "big": i64::MAX, "mixed": 1_i32 };

        apply_update(&mut document, &Update::new().inc("small", 1).inc("mixed", 2_i64)).unwrap();
        assert_eq!(document.get("small"), Some(&Bson::Int64(i32::MAX as i64 + 1)));
        assert_eq!(document.get("mixed"), Some(&Bson::Int64(3)));

        let err = apply_update(&mut document, &Update::new().inc("big", 1_i64)).unwrap_err();
        assert_eq!(err.code(), Some(2));
        assert_eq!(document.get("big"), Some(&Bson::Int64(i64::MAX)));
    }

    #[test]
    fn incrementing_a_string_is_rejected() {
        let mut document = doc! { "name": "Alice" };

        assert!(apply_update(&mut document, &Update::new().inc("name", 1)).is_err());
    }
}
