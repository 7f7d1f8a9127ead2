//! Translation from docbase filters, options and updates to MongoDB syntax.
//!
//! The document identity is exposed as `id` above the backend and stored as `_id`
//! in MongoDB, so every field reference to `id` is rewritten.

use bson::{Document, Bson, doc};
use mongodb::options::FindOptions;

use docbase_core::{
    document::ID_FIELD,
    query::{QueryVisitor, Expr, FieldOp, QueryOptions, SortDirection},
    update::{Update, UpdateOp},
    error::DriverError,
};


/// Maps a field name to its stored name.
pub(crate) fn stored_field(field: &str) -> &str {
    if field == ID_FIELD { "_id" } else { field }
}

/// Translates docbase query expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates an optional filter. `None` matches every document.
    pub(crate) fn translate(filter: Option<&Expr>) -> Result<Document, DriverError> {
        match filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DriverError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        // `$not` only applies to operator expressions; `$nor` negates a whole filter.
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        let field = stored_field(field);

        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let field = stored_field(field);

        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::Contains => match value {
                    Bson::String(s) => doc! { "$regex": escape_regex(s) },
                    Bson::Array(arr) => doc! { "$all": arr },
                    _ => doc! { "$elemMatch": { "$eq": value } },
                },
                FieldOp::NotContains => match value {
                    Bson::String(s) => doc! { "$not": { "$regex": escape_regex(s) } },
                    Bson::Array(arr) => doc! { "$nin": arr },
                    _ => doc! { "$ne": value },
                },
                FieldOp::StartsWith => match value {
                    Bson::String(s) => doc! { "$regex": format!("^{}", escape_regex(s)) },
                    _ => return Err(DriverError::InvalidDocument("StartsWith operator requires a string value".to_string())),
                },
                FieldOp::EndsWith => match value {
                    Bson::String(s) => doc! { "$regex": format!("{}$", escape_regex(s)) },
                    _ => return Err(DriverError::InvalidDocument("EndsWith operator requires a string value".to_string())),
                },
                FieldOp::AnyOf => doc! { "$in": as_array(value) },
                FieldOp::NoneOf => doc! { "$nin": as_array(value) },
            }
        })
    }
}

fn as_array(value: &Bson) -> Bson {
    match value {
        Bson::Array(_) => value.clone(),
        _ => Bson::Array(vec![value.clone()]),
    }
}

fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());

    for c in input.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

/// Translates sort, pagination and projection options.
///
/// Returns `None` when the limit is zero, which selects nothing. The server
/// would read a zero limit as unlimited.
pub(crate) fn find_options(options: &QueryOptions) -> Option<FindOptions> {
    let mut find = FindOptions::default();

    match options.limit {
        Some(0) => return None,
        Some(limit) => find.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX)),
        None => {},
    }
    if let Some(offset) = options.offset {
        // The server stores skip as a signed 64-bit integer.
        find.skip = Some(u64::try_from(offset).unwrap_or(u64::MAX).min(i64::MAX as u64));
    }
    if !options.sort.is_empty() {
        find.sort = Some(
            options.sort
                .iter()
                .map(|sort| (
                    stored_field(&sort.field).to_string(),
                    Bson::Int32(match sort.direction {
                        SortDirection::Asc => 1,
                        SortDirection::Desc => -1,
                    }),
                ))
                .collect()
        );
    }
    if let Some(fields) = &options.projection {
        find.projection = Some(
            fields
                .iter()
                .map(|field| (stored_field(field).to_string(), Bson::Int32(1)))
                .collect()
        );
    }

    Some(find)
}

/// Translates an update into a MongoDB update document.
pub(crate) fn update_document(update: &Update) -> Document {
    let mut set = Document::new();
    let mut unset = Document::new();
    let mut inc = Document::new();

    for op in update.ops() {
        match op {
            UpdateOp::Set(field, value) => {
                set.insert(stored_field(field), value.clone());
            },
            UpdateOp::Unset(field) => {
                unset.insert(stored_field(field), "");
            },
            UpdateOp::Inc(field, amount) => {
                inc.insert(stored_field(field), amount.clone());
            },
        }
    }

    let mut modifications = Document::new();
    for (operator, fields) in [("$set", set), ("$unset", unset), ("$inc", inc)] {
        if !fields.is_empty() {
            modifications.insert(operator, fields);
        }
    }

    modifications
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Uuid;
    use docbase_core::query::Filter;

    #[test]
    fn identity_filters_target_the_primary_key() {
        let id = Uuid::new();

        let filter = MongoQueryTranslator::translate(Some(&Filter::eq("id", id))).unwrap();

        assert_eq!(filter, doc! { "_id": { "$eq": id } });
    }

    #[test]
    fn missing_filter_matches_everything() {
        assert_eq!(MongoQueryTranslator::translate(None).unwrap(), doc! {});
    }

    #[test]
    fn logical_operators_nest() {
        let expr = Filter::eq("a", 1).and(Filter::eq("b", 2).not());

        assert_eq!(
            MongoQueryTranslator::translate(Some(&expr)).unwrap(),
            doc! { "$and": [ { "a": { "$eq": 1 } }, { "$nor": [ { "b": { "$eq": 2 } } ] } ] }
        );
    }

    #[test]
    fn string_operators_escape_regex_metacharacters() {
        let filter = MongoQueryTranslator::translate(Some(&Filter::starts_with("name", "a.b"))).unwrap();

        assert_eq!(filter, doc! { "name": { "$regex": "^a\\.b" } });
        assert!(MongoQueryTranslator::translate(Some(&Filter::ends_with("age", 3))).is_err());
    }

    #[test]
    fn options_translate_to_find_options() {
        let options = QueryOptions::builder()
            .sort("id", SortDirection::Asc)
            .sort("name", SortDirection::Desc)
            .offset(5)
            .limit(10)
            .projection(["name"])
            .build();

        let find = find_options(&options).unwrap();

        assert_eq!(find.sort, Some(doc! { "_id": 1, "name": -1 }));
        assert_eq!(find.skip, Some(5));
        assert_eq!(find.limit, Some(10));
        assert_eq!(find.projection, Some(doc! { "name": 1 }));
    }

    #[test]
    fn zero_limits_select_nothing_and_huge_offsets_are_clamped() {
        assert!(find_options(&QueryOptions::builder().limit(0).build()).is_none());

        let find = find_options(&QueryOptions::builder().offset(usize::MAX).build()).unwrap();
        assert_eq!(find.skip, Some(i64::MAX as u64));
        assert_eq!(find.limit, None);
    }

    #[test]
    fn updates_group_by_operator() {
        let update = Update::new().set("name", "b").unset("nick").inc("n", 1).set("x", true);

        assert_eq!(
            update_document(&update),
            doc! { "$set": { "name": "b", "x": true }, "$unset": { "nick": "" }, "$inc": { "n": 1 } }
        );
        assert!(update_document(&Update::new()).is_empty());
    }
}
