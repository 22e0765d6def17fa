//! Predicate expressions and the index-backed query planner.
//!
//! A predicate is a conjunction of equality and range leaves. The planner
//! resolves indexed leaves through the index maintainer — smallest
//! candidate set first, by cardinality probe — and defers leaves on
//! unindexed fields to a post-filter over the hydrated records. A
//! predicate with no indexed leaf at all is rejected rather than
//! silently scanning every record.

use crate::error::{CoreError, CoreResult};
use crate::index::IndexMaintainer;
use crate::schema::Schema;
use omkv_codec::{FieldValue, Record};
use omkv_store::Context;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// A read-only predicate over an entity type's fields.
///
/// Only conjunction is supported; leaves are equality and inclusive
/// range tests.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field == value`.
    Eq {
        /// The tested field.
        field: String,
        /// The value to match.
        value: FieldValue,
    },
    /// `low <= field <= high` under the field kind's ordering.
    Range {
        /// The tested field.
        field: String,
        /// Inclusive lower bound.
        low: FieldValue,
        /// Inclusive upper bound.
        high: FieldValue,
    },
    /// All sub-predicates hold.
    And(Vec<Predicate>),
}

impl Predicate {
    /// Builds an equality leaf.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Builds an inclusive range leaf.
    #[must_use]
    pub fn between(
        field: impl Into<String>,
        low: impl Into<FieldValue>,
        high: impl Into<FieldValue>,
    ) -> Self {
        Predicate::Range {
            field: field.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    /// Conjoins this predicate with another, flattening nested `And`s.
    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        let mut parts = match self {
            Predicate::And(parts) => parts,
            leaf => vec![leaf],
        };
        match other {
            Predicate::And(others) => parts.extend(others),
            leaf => parts.push(leaf),
        }
        Predicate::And(parts)
    }

    /// Conjoins a collection of predicates.
    #[must_use]
    pub fn all(parts: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(parts.into_iter().collect())
    }

    fn collect_leaves<'p>(&'p self, out: &mut Vec<&'p Predicate>) {
        match self {
            Predicate::And(parts) => {
                for part in parts {
                    part.collect_leaves(out);
                }
            }
            leaf => out.push(leaf),
        }
    }

    /// Evaluates a leaf against a decoded record.
    ///
    /// Kind mismatches have been rejected at planning time; a missing
    /// field or unordered comparison simply does not match.
    pub(crate) fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::Eq { field, value } => record
                .get(field)
                .and_then(|v| v.compare(value))
                .is_some_and(|ord| ord == Ordering::Equal),
            Predicate::Range { field, low, high } => {
                let Some(v) = record.get(field) else {
                    return false;
                };
                let above = v
                    .compare(low)
                    .is_some_and(|ord| ord != Ordering::Less);
                let below = v
                    .compare(high)
                    .is_some_and(|ord| ord != Ordering::Greater);
                above && below
            }
            Predicate::And(parts) => parts.iter().all(|p| p.matches(record)),
        }
    }
}

/// Compiles and executes the indexed part of a predicate, returning the
/// candidate primary keys surviving the index intersection.
///
/// Candidates are an over-approximation: the repository re-checks the
/// whole predicate against each hydrated record, which filters both the
/// leaves on unindexed fields and any index entry that has drifted from
/// the stored value.
pub(crate) fn plan(
    ctx: &Context,
    indexes: &IndexMaintainer,
    schema: &Schema,
    predicate: &Predicate,
) -> CoreResult<HashSet<Vec<u8>>> {
    let mut leaves = Vec::new();
    predicate.collect_leaves(&mut leaves);

    let mut indexed = Vec::new();
    let mut deferred = Vec::new();
    for leaf in leaves {
        if validate_leaf(schema, leaf)? {
            indexed.push(leaf);
        } else {
            deferred.push(leaf);
        }
    }

    if indexed.is_empty() {
        return Err(CoreError::UnboundedQuery);
    }

    // Cheap cardinality probe per leaf; evaluate the most selective first
    // so later intersections shrink fast.
    let mut probed = Vec::with_capacity(indexed.len());
    for leaf in indexed {
        let estimate = match leaf {
            Predicate::Eq { field, value } => indexes.cardinality(ctx, schema, field, value)?,
            Predicate::Range { field, low, high } => {
                indexes.range_cardinality(ctx, schema, field, low, high)?
            }
            Predicate::And(_) => unreachable!("leaves are flat"),
        };
        probed.push((estimate, leaf));
    }
    probed.sort_by_key(|(estimate, _)| *estimate);

    debug!(
        entity = schema.type_name(),
        indexed = probed.len(),
        deferred = deferred.len(),
        "planned query"
    );

    let mut candidates: Option<HashSet<Vec<u8>>> = None;
    for (_, leaf) in probed {
        if candidates.as_ref().is_some_and(HashSet::is_empty) {
            break;
        }
        let keys = match leaf {
            Predicate::Eq { field, value } => indexes.lookup(ctx, schema, field, value)?,
            Predicate::Range { field, low, high } => {
                indexes.range_lookup(ctx, schema, field, low, high)?
            }
            Predicate::And(_) => unreachable!("leaves are flat"),
        };
        candidates = Some(match candidates {
            None => keys,
            Some(mut current) => {
                current.retain(|k| keys.contains(k));
                current
            }
        });
    }

    Ok(candidates.unwrap_or_default())
}

/// Checks a leaf against the schema. Returns whether the leaf can be
/// answered by an index.
fn validate_leaf(schema: &Schema, leaf: &Predicate) -> CoreResult<bool> {
    let (field_name, value_kinds): (&str, Vec<omkv_codec::FieldKind>) = match leaf {
        Predicate::Eq { field, value } => (field, vec![value.kind()]),
        Predicate::Range { field, low, high } => (field, vec![low.kind(), high.kind()]),
        Predicate::And(_) => unreachable!("leaves are flat"),
    };

    let field = schema
        .field(field_name)
        .ok_or_else(|| CoreError::UnknownField {
            field: field_name.to_string(),
        })?;
    if !field.kind.is_orderable() {
        return Err(CoreError::UnorderedField {
            field: field_name.to_string(),
        });
    }
    for kind in value_kinds {
        if kind != field.kind {
            return Err(CoreError::TypeMismatch {
                field: field_name.to_string(),
                expected: field.kind,
                actual: kind,
            });
        }
    }
    Ok(field.indexed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use omkv_codec::FieldKind;
    use crate::schema::TypeDescriptor;

    #[test]
    fn and_flattens() {
        let p = Predicate::eq("a", 1i64)
            .and(Predicate::eq("b", 2i64))
            .and(Predicate::between("c", 0i64, 9i64));
        let Predicate::And(parts) = &p else {
            panic!("expected And");
        };
        assert_eq!(parts.len(), 3);

        let mut leaves = Vec::new();
        p.collect_leaves(&mut leaves);
        assert_eq!(leaves.len(), 3);
    }

    #[test]
    fn nested_and_collects_all_leaves() {
        let p = Predicate::all([
            Predicate::And(vec![Predicate::eq("a", 1i64), Predicate::eq("b", 2i64)]),
            Predicate::eq("c", 3i64),
        ]);
        let mut leaves = Vec::new();
        p.collect_leaves(&mut leaves);
        assert_eq!(leaves.len(), 3);
    }

    #[test]
    fn eq_matches_record() {
        let record = Record::new().with("age", 30i64);
        assert!(Predicate::eq("age", 30i64).matches(&record));
        assert!(!Predicate::eq("age", 31i64).matches(&record));
        assert!(!Predicate::eq("missing", 30i64).matches(&record));
    }

    #[test]
    fn range_matches_inclusively() {
        let record = Record::new().with("age", 30i64);
        assert!(Predicate::between("age", 30i64, 40i64).matches(&record));
        assert!(Predicate::between("age", 20i64, 30i64).matches(&record));
        assert!(!Predicate::between("age", 31i64, 40i64).matches(&record));
    }

    #[test]
    fn kind_mismatch_never_matches() {
        let record = Record::new().with("age", 30i64);
        assert!(!Predicate::eq("age", "30").matches(&record));
    }

    #[test]
    fn validate_rejects_unknown_field() {
        let schema = Schema::from_descriptor(
            TypeDescriptor::new("t").primary_key("id", FieldKind::Str),
        )
        .unwrap();
        let err = validate_leaf(&schema, &Predicate::eq("nope", 1i64)).unwrap_err();
        assert!(matches!(err, CoreError::UnknownField { .. }));
    }

    #[test]
    fn validate_rejects_json_leaf() {
        let schema = Schema::from_descriptor(
            TypeDescriptor::new("t")
                .primary_key("id", FieldKind::Str)
                .field("payload", FieldKind::Json),
        )
        .unwrap();
        let err = validate_leaf(
            &schema,
            &Predicate::eq("payload", FieldValue::Json("{}".into())),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::UnorderedField { .. }));
    }

    #[test]
    fn validate_partitions_by_indexed_flag() {
        let schema = Schema::from_descriptor(
            TypeDescriptor::new("t")
                .primary_key("id", FieldKind::Str)
                .indexed_field("a", FieldKind::Int)
                .field("b", FieldKind::Int),
        )
        .unwrap();
        assert!(validate_leaf(&schema, &Predicate::eq("a", 1i64)).unwrap());
        assert!(!validate_leaf(&schema, &Predicate::eq("b", 1i64)).unwrap());
    }
}
