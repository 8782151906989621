use serde::Deserialize;
use serde_json::Value as JsonValue;

///
/// FieldModel
///
/// A named, typed slot on a type. `actual_id` lets the logical id used by
/// views and configuration diverge from the key values are stored under.
///

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldModel {
    pub id: String,

    #[serde(default)]
    pub actual_id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub kind: FieldKind,

    #[serde(default)]
    pub min_cardinality: usize,

    /// Upper bound on the number of values; `None` is unbounded.
    #[serde(default)]
    pub max_cardinality: Option<usize>,

    #[serde(flatten)]
    pub flags: FieldFlags,

    /// Free-form configuration read by rule handlers and resolvers.
    #[serde(default)]
    pub extra: Option<JsonValue>,
}

impl FieldModel {
    /// Create a primitive field with default flags.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            actual_id: None,
            name: None,
            kind: FieldKind::Primitive,
            min_cardinality: 0,
            max_cardinality: None,
            flags: FieldFlags::default(),
            extra: None,
        }
    }

    /// Create a reference field accepting the given value types.
    pub fn reference(id: impl Into<String>, value_types: &[&str]) -> Self {
        Self {
            kind: FieldKind::Reference {
                value_types: value_types.iter().map(ToString::to_string).collect(),
                value_view: None,
            },
            ..Self::new(id)
        }
    }

    #[must_use]
    pub fn with_actual_id(mut self, actual_id: impl Into<String>) -> Self {
        self.actual_id = Some(actual_id.into());
        self
    }

    #[must_use]
    pub fn with_value_view(mut self, view_id: impl Into<String>) -> Self {
        if let FieldKind::Reference { value_view, .. } = &mut self.kind {
            *value_view = Some(view_id.into());
        }
        self
    }

    #[must_use]
    pub const fn with_cardinality(mut self, min: usize, max: Option<usize>) -> Self {
        self.min_cardinality = min;
        self.max_cardinality = max;
        self
    }

    #[must_use]
    pub const fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_extra(mut self, extra: JsonValue) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Key the field's values are stored under on a topic.
    #[must_use]
    pub fn actual_id(&self) -> &str {
        self.actual_id.as_deref().unwrap_or(&self.id)
    }

    #[must_use]
    pub const fn is_reference(&self) -> bool {
        matches!(self.kind, FieldKind::Reference { .. })
    }

    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        matches!(self.kind, FieldKind::Primitive)
    }

    /// Type ids a reference field accepts; empty for primitives.
    #[must_use]
    pub fn value_types(&self) -> &[String] {
        match &self.kind {
            FieldKind::Reference { value_types, .. } => value_types,
            FieldKind::Primitive => &[],
        }
    }

    #[must_use]
    pub fn value_view_id(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Reference { value_view, .. } => value_view.as_deref(),
            FieldKind::Primitive => None,
        }
    }

    #[must_use]
    pub const fn is_inline(&self) -> bool {
        self.flags.inline
    }

    #[must_use]
    pub const fn is_embedded(&self) -> bool {
        self.flags.embedded
    }

    /// Look up a key in the extra configuration block.
    #[must_use]
    pub fn extra_node(&self, key: &str) -> Option<&JsonValue> {
        self.extra.as_ref().and_then(|extra| extra.get(key))
    }

    /// Look up a textual key in the extra configuration block.
    #[must_use]
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra_node(key).and_then(JsonValue::as_str)
    }

    /// True when holding `count` values would exceed the upper bound.
    #[must_use]
    pub fn exceeds_max_cardinality(&self, count: usize) -> bool {
        self.max_cardinality.is_some_and(|max| count > max)
    }
}

///
/// FieldKind
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase", tag = "dataType")]
pub enum FieldKind {
    #[default]
    Primitive,

    #[serde(rename_all = "camelCase")]
    Reference {
        value_types: Vec<String>,

        #[serde(default)]
        value_view: Option<String>,
    },
}

///
/// FieldFlags
///
/// Static behavior flags. Rule handlers may override any of them per
/// context; these are the fallback answers.
///

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldFlags {
    pub hidden: bool,
    pub read_only: bool,
    pub traversable: bool,
    pub sorted: bool,
    pub sorted_ascending: bool,
    pub pageable: bool,
    pub addable: bool,
    pub removable: bool,
    pub movable: bool,
    pub creatable: bool,
    pub editable: bool,
    pub embedded: bool,
    pub inline: bool,
}

impl Default for FieldFlags {
    fn default() -> Self {
        Self {
            hidden: false,
            read_only: false,
            traversable: true,
            sorted: false,
            sorted_ascending: true,
            pageable: false,
            addable: true,
            removable: true,
            movable: true,
            creatable: true,
            editable: true,
            embedded: false,
            inline: false,
        }
    }
}

///
/// TESTS
///
