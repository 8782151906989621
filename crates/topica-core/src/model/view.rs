use serde::Deserialize;
use serde_json::Value as JsonValue;

///
/// ViewModel
///
/// A named, ordered subset of a type's fields.
///

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub kind: ViewKind,

    #[serde(default)]
    pub fields: Vec<String>,

    #[serde(default)]
    pub layout: Option<JsonValue>,
}

impl ViewModel {
    pub fn new(id: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind: ViewKind::Normal,
            fields: fields.iter().map(ToString::to_string).collect(),
            layout: None,
        }
    }

    #[must_use]
    pub const fn external(mut self) -> Self {
        self.kind = ViewKind::External;
        self
    }

    #[must_use]
    pub fn contains_field(&self, field_id: &str) -> bool {
        self.fields.iter().any(|f| f == field_id)
    }
}

///
/// ViewKind
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ViewKind {
    #[default]
    Normal,
    External,
}
