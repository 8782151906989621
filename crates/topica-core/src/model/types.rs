use crate::model::{FieldModel, ViewModel, default_true};
use serde::Deserialize;
use serde_json::Value as JsonValue;

///
/// TypeModel
///
/// Schema descriptor for a topic type: fields, views and the creatable /
/// removable defaults the rule engine falls back to.
///

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypeModel {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Inline topics live only inside an owner's field value.
    #[serde(default)]
    pub inline: bool,

    #[serde(default = "default_true")]
    pub creatable: bool,

    #[serde(default = "default_true")]
    pub removable: bool,

    #[serde(default)]
    pub fields: Vec<FieldModel>,

    #[serde(default)]
    pub views: Vec<ViewModel>,

    pub default_view: String,

    #[serde(default)]
    pub extra: Option<JsonValue>,
}

impl TypeModel {
    /// Create a type with a single default view and no fields.
    pub fn new(id: impl Into<String>, default_view: impl Into<String>) -> Self {
        let default_view = default_view.into();

        Self {
            id: id.into(),
            name: None,
            inline: false,
            creatable: true,
            removable: true,
            fields: Vec::new(),
            views: vec![ViewModel::new(default_view.clone(), &[])],
            default_view,
            extra: None,
        }
    }

    #[must_use]
    pub const fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    /// Add a field and list it in the default view.
    #[must_use]
    pub fn with_field(mut self, field: FieldModel) -> Self {
        let default_view = self.default_view.clone();
        if let Some(view) = self.views.iter_mut().find(|v| v.id == default_view) {
            view.fields.push(field.id.clone());
        }
        self.fields.push(field);
        self
    }

    /// Add a view, replacing any view with the same id.
    #[must_use]
    pub fn with_view(mut self, view: ViewModel) -> Self {
        self.views.retain(|v| v.id != view.id);
        self.views.push(view);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, extra: JsonValue) -> Self {
        self.extra = Some(extra);
        self
    }

    #[must_use]
    pub fn field_by_id(&self, field_id: &str) -> Option<&FieldModel> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    #[must_use]
    pub fn view_by_id(&self, view_id: &str) -> Option<&ViewModel> {
        self.views.iter().find(|v| v.id == view_id)
    }

    #[must_use]
    pub(crate) fn view_index(&self, view_id: &str) -> Option<usize> {
        self.views.iter().position(|v| v.id == view_id)
    }

    #[must_use]
    pub fn default_view(&self) -> Option<&ViewModel> {
        self.view_by_id(&self.default_view)
    }

    /// View used when `field` reaches a topic of this type.
    ///
    /// The field's value view wins when this type declares it; otherwise
    /// the type's default view.
    #[must_use]
    pub fn value_view(&self, field: &FieldModel) -> Option<&ViewModel> {
        field
            .value_view_id()
            .and_then(|id| self.view_by_id(id))
            .or_else(|| self.default_view())
    }

    /// Fields listed by a view, in view order.
    pub fn view_fields<'a>(&'a self, view: &'a ViewModel) -> impl Iterator<Item = &'a FieldModel> {
        view.fields.iter().filter_map(|id| self.field_by_id(id))
    }

    #[must_use]
    pub fn extra_node(&self, key: &str) -> Option<&JsonValue> {
        self.extra.as_ref().and_then(|extra| extra.get(key))
    }
}
