//! Inline topic merge.
//!
//! Inline topics are edited by rebuilding them from a submitted copy and
//! the stored copy. Nested inline fields merge recursively by topic id.

use crate::{
    error::{ErrorClass, ErrorDetail, ErrorOrigin, InternalError},
    graph::InlineTopicBuilder,
    model::Schema,
    value::{Topic, Value, ValueKey},
};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error as ThisError;
use tracing::warn;

///
/// MergeError
///
/// Structured merge failures; nested failures carry the field path.
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum MergeError {
    #[error("inline merge failed at {path}: {source}")]
    Context {
        path: String,
        #[source]
        source: Box<Self>,
    },

    #[error("cannot merge topic '{new}' into '{existing}'")]
    IdMismatch { new: String, existing: String },

    #[error("topic type '{0}' is not in the schema")]
    UnknownType(String),
}

impl MergeError {
    /// Prepend a field segment to the error path.
    #[must_use]
    pub fn with_field(self, field: &str) -> Self {
        match self {
            Self::Context { path, source } => Self::Context {
                path: format!("{field}.{path}"),
                source,
            },
            source => Self::Context {
                path: field.to_string(),
                source: Box::new(source),
            },
        }
    }

    #[must_use]
    pub const fn path(&self) -> Option<&str> {
        match self {
            Self::Context { path, .. } => Some(path.as_str()),
            _ => None,
        }
    }

    /// Innermost, non-context variant.
    #[must_use]
    pub fn leaf(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.leaf(),
            _ => self,
        }
    }

    pub(crate) fn class(&self) -> ErrorClass {
        match self.leaf() {
            Self::UnknownType(_) => ErrorClass::NotFound,
            _ => ErrorClass::Usage,
        }
    }
}

impl From<MergeError> for InternalError {
    fn from(err: MergeError) -> Self {
        Self {
            class: err.class(),
            origin: ErrorOrigin::Merge,
            message: err.to_string(),
            detail: Some(ErrorDetail::Merge(err)),
        }
    }
}

/// Merge a submitted inline topic into its stored counterpart.
///
/// Ids must match, except that a new-topic id on the submitted side takes
/// over the stored id. For each declared field present on both sides,
/// inline fields merge by topic id and all other fields take the submitted
/// values; a field present on one side only keeps that side.
pub fn merge_inline_topic(
    schema: &Schema,
    new: &Topic,
    existing: &Topic,
) -> Result<Topic, InternalError> {
    merge_topic(schema, new, existing).map_err(Into::into)
}

/// Merge two inline value lists by topic id.
///
/// With `include_existing` the stored order is kept, overlaps are merged
/// and submitted-only topics are appended. Without it the submitted order
/// is kept, overlaps are merged and stored-only topics are dropped.
pub fn merge_inline_topics(
    schema: &Schema,
    new: &[Value],
    existing: &[Value],
    include_existing: bool,
) -> Result<Vec<Value>, InternalError> {
    merge_values(schema, new, existing, include_existing).map_err(Into::into)
}

fn merge_topic(schema: &Schema, new: &Topic, existing: &Topic) -> Result<Topic, MergeError> {
    let id = if new.id() == existing.id() || new.id().is_new() {
        existing.id().clone()
    } else {
        return Err(MergeError::IdMismatch {
            new: new.id().to_string(),
            existing: existing.id().to_string(),
        });
    };
    let ty = schema
        .type_by_id(new.type_id())
        .ok_or_else(|| MergeError::UnknownType(new.type_id().to_string()))?;
    if !ty.inline {
        warn!(type_id = %ty.id, topic = %id, "merging topics of a non-inline type");
    }

    let mut builder = InlineTopicBuilder::new(ty, Some(id));
    for field in &ty.fields {
        let key = field.actual_id();
        let values = match (new.has_value(key), existing.has_value(key)) {
            (true, true) if field.is_inline() => {
                merge_values(schema, new.values(key), existing.values(key), false)
                    .map_err(|err| err.with_field(&field.id))?
            }
            (true, _) => new.values(key).to_vec(),
            (false, true) => existing.values(key).to_vec(),
            (false, false) => continue,
        };
        builder.set_values(field, values);
    }

    Ok(builder.build())
}

// One entry per topic id, at the id's first position, holding its last
// value.
fn by_id(values: &[Value]) -> (Vec<ValueKey>, HashMap<ValueKey, &Value>) {
    let mut order = Vec::with_capacity(values.len());
    let mut map = HashMap::with_capacity(values.len());
    for value in values {
        let key = value.key();
        if map.insert(key.clone(), value).is_none() {
            order.push(key);
        }
    }

    (order, map)
}

fn merge_values(
    schema: &Schema,
    new: &[Value],
    existing: &[Value],
    include_existing: bool,
) -> Result<Vec<Value>, MergeError> {
    let (new_order, new_map) = by_id(new);
    let (existing_order, existing_map) = by_id(existing);

    if include_existing {
        let mut merged = Vec::with_capacity(existing_order.len() + new_order.len());
        for key in &existing_order {
            let stored = existing_map[key];
            merged.push(match new_map.get(key) {
                Some(submitted) => merge_value(schema, submitted, stored)?,
                None => stored.clone(),
            });
        }
        merged.extend(
            new_order
                .iter()
                .filter(|key| !existing_map.contains_key(*key))
                .map(|key| new_map[key].clone()),
        );

        Ok(merged)
    } else {
        new_order
            .iter()
            .map(|key| {
                let submitted = new_map[key];
                match existing_map.get(key) {
                    Some(stored) => merge_value(schema, submitted, stored),
                    None => Ok(submitted.clone()),
                }
            })
            .collect()
    }
}

fn merge_value(schema: &Schema, new: &Value, existing: &Value) -> Result<Value, MergeError> {
    match (new, existing) {
        (Value::Topic(n), Value::Topic(e)) => {
            Ok(Value::Topic(Arc::new(merge_topic(schema, n, e)?)))
        }
        _ => Ok(new.clone()),
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_support::{address, fixture_schema},
        value::TopicId,
    };
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn geo(id: &str, lat: i64, lng: i64) -> Topic {
        Topic::new_inline(id.into(), "geo")
            .with_values("lat", vec![Value::Int(lat)])
            .with_values("lng", vec![Value::Int(lng)])
    }

    fn ids(values: &[Value]) -> Vec<String> {
        values
            .iter()
            .filter_map(Value::as_topic)
            .map(|t| t.id().to_string())
            .collect()
    }

    #[test]
    fn new_side_wins_for_plain_fields() {
        let schema = fixture_schema();
        let stored = address("a1", "Old Street", "London");
        let submitted = Topic::new_inline("a1".into(), "address")
            .with_values("street", vec![Value::from("New Street")]);

        let merged = merge_inline_topic(&schema, &submitted, &stored).expect("merge should succeed");

        assert_eq!(merged.values("street"), [Value::from("New Street")]);
        assert_eq!(merged.values("city"), [Value::from("London")], "one-sided field kept");
        assert!(merged.is_inline());
    }

    #[test]
    fn new_marker_takes_the_stored_id() {
        let schema = fixture_schema();
        let stored = address("a1", "Street", "City");
        let submitted = address(TopicId::new_marker("address").as_str(), "Street", "Town");

        let merged = merge_inline_topic(&schema, &submitted, &stored).expect("merge should succeed");
        assert_eq!(merged.id().as_str(), "a1");
    }

    #[test]
    fn mismatched_ids_are_rejected() {
        let schema = fixture_schema();
        let err = merge_inline_topic(&schema, &address("a2", "", ""), &address("a1", "", ""))
            .expect_err("ids differ");

        assert_eq!(err.class, ErrorClass::Usage);
        assert!(matches!(err.merge(), Some(MergeError::IdMismatch { .. })));
    }

    #[test]
    fn nested_inline_fields_merge_by_id() {
        let schema = fixture_schema();
        let stored = address("a1", "Street", "City").with_values(
            "geo",
            vec![Value::from(geo("g1", 1, 2)), Value::from(geo("g2", 3, 4))],
        );
        let submitted = Topic::new_inline("a1".into(), "address").with_values(
            "geo",
            vec![
                Value::from(Topic::new_inline("g1".into(), "geo").with_values("lat", vec![Value::Int(9)])),
                Value::from(geo("g3", 5, 6)),
            ],
        );

        let merged = merge_inline_topic(&schema, &submitted, &stored).expect("merge should succeed");
        let geos = merged.values("geo");

        assert_eq!(ids(geos), ["g1", "g3"], "nested merge drops stored-only ids");
        let g1 = geos[0].as_topic().expect("topic");
        assert_eq!(g1.values("lat"), [Value::Int(9)]);
        assert_eq!(g1.values("lng"), [Value::Int(2)]);
    }

    #[test]
    fn wrapped_errors_report_the_field_path() {
        let wrapped = MergeError::IdMismatch {
            new: "x".into(),
            existing: "y".into(),
        }
        .with_field("geo")
        .with_field("address");

        assert_eq!(wrapped.path(), Some("address.geo"));
        assert!(matches!(wrapped.leaf(), MergeError::IdMismatch { .. }));
        assert_eq!(wrapped.class(), ErrorClass::Usage);
    }

    #[test]
    fn include_existing_keeps_stored_order_and_appends() {
        let schema = fixture_schema();
        let existing = vec![Value::from(geo("a", 1, 1)), Value::from(geo("b", 2, 2))];
        let new = vec![Value::from(geo("c", 3, 3)), Value::from(geo("a", 9, 9))];

        let merged = merge_inline_topics(&schema, &new, &existing, true).expect("merge");

        assert_eq!(ids(&merged), ["a", "b", "c"]);
        assert_eq!(
            merged[0].as_topic().expect("topic").values("lat"),
            [Value::Int(9)]
        );
    }

    #[test]
    fn exclude_existing_keeps_submitted_order_and_drops() {
        let schema = fixture_schema();
        let existing = vec![Value::from(geo("a", 1, 1)), Value::from(geo("b", 2, 2))];
        let new = vec![Value::from(geo("c", 3, 3)), Value::from(geo("a", 9, 9))];

        let merged = merge_inline_topics(&schema, &new, &existing, false).expect("merge");

        assert_eq!(ids(&merged), ["c", "a"]);
    }

    #[test]
    fn repeated_ids_collapse_to_one_entry() {
        let schema = fixture_schema();
        let new = vec![Value::from(geo("c", 3, 3)), Value::from(geo("c", 4, 4))];

        let dropped = merge_inline_topics(&schema, &new, &[], false).expect("merge");
        assert_eq!(ids(&dropped), ["c"]);
        assert_eq!(
            dropped[0].as_topic().expect("topic").values("lat"),
            [Value::Int(4)],
            "the later copy wins"
        );

        let existing = vec![Value::from(geo("a", 1, 1)), Value::from(geo("a", 2, 2))];
        let kept = merge_inline_topics(&schema, &new, &existing, true).expect("merge");
        assert_eq!(ids(&kept), ["a", "c"]);
    }

    fn arb_text() -> impl Strategy<Value = Option<Vec<Value>>> {
        prop::option::of(prop::collection::vec("[a-z]{0,6}".prop_map(Value::Text), 0..3))
    }

    fn arb_geo() -> impl Strategy<Value = Topic> {
        ("g[0-3]", any::<i64>(), prop::option::of(any::<i64>())).prop_map(|(id, lat, lng)| {
            let topic =
                Topic::new_inline(id.as_str().into(), "geo").with_values("lat", vec![Value::Int(lat)]);
            match lng {
                Some(lng) => topic.with_values("lng", vec![Value::Int(lng)]),
                None => topic,
            }
        })
    }

    fn arb_address() -> impl Strategy<Value = Topic> {
        (
            arb_text(),
            arb_text(),
            prop::option::of(prop::collection::vec(arb_geo(), 0..3)),
        )
            .prop_map(|(street, city, geos)| {
                let mut topic = Topic::new_inline("a1".into(), "address");
                if let Some(street) = street {
                    topic.set_values("street", street);
                }
                if let Some(city) = city {
                    topic.set_values("city", city);
                }
                if let Some(geos) = geos {
                    let mut seen = HashSet::new();
                    let geos = geos
                        .into_iter()
                        .filter(|g| seen.insert(g.id().clone()))
                        .map(Value::from)
                        .collect();
                    topic.set_values("geo", geos);
                }
                topic
            })
    }

    proptest! {
        #[test]
        fn self_merge_is_identity(topic in arb_address()) {
            let schema = fixture_schema();
            let merged = merge_inline_topic(&schema, &topic, &topic).expect("self merge");

            prop_assert_eq!(merged, topic);
        }

        #[test]
        fn one_sided_fields_survive(new in arb_address(), existing in arb_address()) {
            let schema = fixture_schema();
            let merged = merge_inline_topic(&schema, &new, &existing).expect("merge");

            for key in ["street", "city", "geo"] {
                match (new.has_value(key), existing.has_value(key)) {
                    (true, false) => prop_assert_eq!(merged.values(key), new.values(key)),
                    (false, true) => prop_assert_eq!(merged.values(key), existing.values(key)),
                    (false, false) => prop_assert!(!merged.has_value(key)),
                    (true, true) => prop_assert_eq!(merged.values(key).len(), new.values(key).len()),
                }
            }
        }
    }
}
