use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::TypeModel,
    value::Topic,
};
use serde::Deserialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};
use thiserror::Error as ThisError;

///
/// SchemaError
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum SchemaError {
    #[error("type '{type_id}' has no default view '{view_id}'")]
    DefaultViewNotFound { type_id: String, view_id: String },

    #[error("type '{type_id}' declares field '{field_id}' more than once")]
    DuplicateField { type_id: String, field_id: String },

    #[error("type '{0}' defined more than once")]
    DuplicateType(String),

    #[error("schema document could not be parsed: {0}")]
    Parse(String),

    #[error("type '{0}' not found")]
    TypeNotFound(String),

    #[error("field '{type_id}.{field_id}' references unknown value type '{value_type}'")]
    UnknownValueType {
        type_id: String,
        field_id: String,
        value_type: String,
    },

    #[error("view '{type_id}.{view_id}' lists unknown field '{field_id}'")]
    ViewFieldNotFound {
        type_id: String,
        view_id: String,
        field_id: String,
    },
}

impl SchemaError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::TypeNotFound(_) => ErrorClass::NotFound,
            Self::Parse(_) => ErrorClass::Unsupported,
            _ => ErrorClass::InvariantViolation,
        }
    }
}

impl From<SchemaError> for InternalError {
    fn from(err: SchemaError) -> Self {
        Self::new(err.class(), ErrorOrigin::Schema, err.to_string())
    }
}

///
/// SchemaDocument
///

#[derive(Deserialize)]
struct SchemaDocument {
    types: Vec<TypeModel>,
}

///
/// Schema
///
/// Validated, immutable set of types keyed by id.
///

#[derive(Clone, Debug, Default)]
pub struct Schema {
    types: BTreeMap<String, Arc<TypeModel>>,
}

impl Schema {
    /// Build a schema, validating cross-references between types.
    pub fn from_types(types: impl IntoIterator<Item = TypeModel>) -> Result<Self, InternalError> {
        let mut map = BTreeMap::new();
        for ty in types {
            if map.contains_key(&ty.id) {
                return Err(SchemaError::DuplicateType(ty.id).into());
            }
            map.insert(ty.id.clone(), Arc::new(ty));
        }

        let schema = Self { types: map };
        schema.validate()?;

        Ok(schema)
    }

    /// Parse and validate a `{ "types": [...] }` JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, InternalError> {
        let doc: SchemaDocument =
            serde_json::from_str(json).map_err(|err| SchemaError::Parse(err.to_string()))?;

        Self::from_types(doc.types)
    }

    #[must_use]
    pub fn type_by_id(&self, type_id: &str) -> Option<&Arc<TypeModel>> {
        self.types.get(type_id)
    }

    pub fn try_type(&self, type_id: &str) -> Result<&Arc<TypeModel>, InternalError> {
        self.type_by_id(type_id)
            .ok_or_else(|| SchemaError::TypeNotFound(type_id.to_string()).into())
    }

    /// Type of a topic.
    pub fn topic_type(&self, topic: &Topic) -> Result<&Arc<TypeModel>, InternalError> {
        self.try_type(topic.type_id())
    }

    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeModel>> {
        self.types.values()
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for ty in self.types.values() {
            if ty.default_view().is_none() {
                return Err(SchemaError::DefaultViewNotFound {
                    type_id: ty.id.clone(),
                    view_id: ty.default_view.clone(),
                });
            }

            let mut seen = BTreeSet::new();
            for field in &ty.fields {
                if !seen.insert(field.id.as_str()) {
                    return Err(SchemaError::DuplicateField {
                        type_id: ty.id.clone(),
                        field_id: field.id.clone(),
                    });
                }
                if let Some(value_type) = field
                    .value_types()
                    .iter()
                    .find(|vt| !self.types.contains_key(*vt))
                {
                    return Err(SchemaError::UnknownValueType {
                        type_id: ty.id.clone(),
                        field_id: field.id.clone(),
                        value_type: value_type.clone(),
                    });
                }
            }

            for view in &ty.views {
                if let Some(field_id) = view.fields.iter().find(|f| !seen.contains(f.as_str())) {
                    return Err(SchemaError::ViewFieldNotFound {
                        type_id: ty.id.clone(),
                        view_id: view.id.clone(),
                        field_id: field_id.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldModel, ViewModel};

    #[test]
    fn loads_json_document() {
        let schema = Schema::from_json_str(
            r#"{
                "types": [
                    {
                        "id": "person",
                        "defaultView": "info",
                        "fields": [
                            { "id": "name" },
                            { "id": "address", "inline": true,
                              "kind": { "dataType": "reference", "valueTypes": ["address"] } }
                        ],
                        "views": [ { "id": "info", "fields": ["name", "address"] } ]
                    },
                    {
                        "id": "address",
                        "inline": true,
                        "defaultView": "main",
                        "fields": [ { "id": "street" } ],
                        "views": [ { "id": "main", "fields": ["street"] } ]
                    }
                ]
            }"#,
        )
        .expect("schema document should load");

        let person = schema.try_type("person").expect("person type should exist");
        let address = person
            .field_by_id("address")
            .expect("address field should exist");

        assert!(address.is_inline());
        assert!(person.creatable, "creatable defaults to true");
        assert!(schema.try_type("address").expect("address type").inline);
    }

    #[test]
    fn rejects_duplicate_types() {
        let err = Schema::from_types([TypeModel::new("a", "v"), TypeModel::new("a", "v")])
            .expect_err("duplicate type ids should be rejected");

        assert_eq!(err.origin, ErrorOrigin::Schema);
        assert_eq!(err.class, ErrorClass::InvariantViolation);
        assert!(err.message.contains("'a' defined more than once"));
    }

    #[test]
    fn rejects_unknown_value_types() {
        let ty = TypeModel::new("a", "v").with_field(FieldModel::reference("r", &["ghost"]));
        let err = Schema::from_types([ty]).expect_err("unknown value type should be rejected");

        assert!(err.message.contains("unknown value type 'ghost'"));
    }

    #[test]
    fn rejects_views_listing_unknown_fields() {
        let ty = TypeModel::new("a", "v").with_view(ViewModel::new("other", &["missing"]));
        let err = Schema::from_types([ty]).expect_err("unknown view field should be rejected");

        assert!(err.message.contains("unknown field 'missing'"));
    }

    #[test]
    fn missing_type_lookup_is_not_found() {
        let err = Schema::default()
            .try_type("nope")
            .expect_err("empty schema has no types");

        assert!(err.is_not_found());
    }
}
