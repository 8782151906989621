use crate::{
    context::Context,
    engine::Engine,
    error::InternalError,
    model::{FieldModel, TypeModel, ViewModel},
    rules::{
        ContextFlags, FieldFlag, FieldFlagSet, FieldValueFlag, FlagQuery, HandlerChain, TypeFlag,
        ViewFlag,
    },
    value::{PagedValues, Paging, Value},
};
use std::sync::Arc;

const ASSIGN_DEFAULT_VALUES: &str = "assignDefaultValues";

///
/// RuleEngine
///
/// Answers flag questions for one context. The handler chain bound to the
/// context's type is consulted first, then the schema's static flag, then
/// a hard default.
///

#[derive(Clone, Debug)]
pub struct RuleEngine {
    context: Context,
    ty: Arc<TypeModel>,
    chain: HandlerChain,
    read_only_type: bool,
}

impl RuleEngine {
    /// Wrap a context; fails for contexts whose topic is missing.
    pub fn new(context: Context) -> Result<Self, InternalError> {
        let ty = Arc::clone(context.try_ty()?);
        let chain = context.engine().handler_chain(&ty.id);

        let mut rules = Self {
            context,
            ty,
            chain,
            read_only_type: false,
        };
        // handlers may consult other flags, so read-only is settled once
        rules.read_only_type = rules.engine().options().read_only
            || rules.flag(&FlagQuery::Type(TypeFlag::ReadOnly), false);

        Ok(rules)
    }

    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    #[must_use]
    pub fn ty(&self) -> &Arc<TypeModel> {
        &self.ty
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        self.context.engine()
    }

    fn flag(&self, query: &FlagQuery<'_>, fallback: bool) -> bool {
        self.chain.evaluate(query, self).unwrap_or(fallback)
    }

    // type

    #[must_use]
    pub const fn is_read_only_type(&self) -> bool {
        self.read_only_type
    }

    #[must_use]
    pub fn is_updatable_type(&self) -> bool {
        self.flag(&FlagQuery::Type(TypeFlag::Updatable), true)
    }

    #[must_use]
    pub fn is_creatable_type(&self) -> bool {
        self.flag(&FlagQuery::Type(TypeFlag::Creatable), self.ty.creatable)
    }

    #[must_use]
    pub fn is_removable_type(&self) -> bool {
        self.flag(&FlagQuery::Type(TypeFlag::Removable), self.ty.removable)
    }

    #[must_use]
    pub fn is_deletable_type(&self) -> bool {
        self.flag(&FlagQuery::Type(TypeFlag::Deletable), self.ty.removable)
    }

    // view

    #[must_use]
    pub fn is_hidden_view(&self, view: &ViewModel) -> bool {
        self.flag(&FlagQuery::View(ViewFlag::Hidden, view), false)
    }

    // field

    #[must_use]
    pub fn is_hidden_field(&self, field: &FieldModel) -> bool {
        self.field_flag(FieldFlag::Hidden, field, field.flags.hidden)
    }

    #[must_use]
    pub fn is_traversable_field(&self, field: &FieldModel) -> bool {
        self.field_flag(FieldFlag::Traversable, field, field.flags.traversable)
    }

    #[must_use]
    pub fn is_sorted_field(&self, field: &FieldModel) -> bool {
        self.field_flag(FieldFlag::Sorted, field, field.flags.sorted)
    }

    #[must_use]
    pub fn is_sorted_ascending_field(&self, field: &FieldModel) -> bool {
        self.field_flag(FieldFlag::SortedAscending, field, field.flags.sorted_ascending)
    }

    #[must_use]
    pub fn is_pageable_field(&self, field: &FieldModel) -> bool {
        self.field_flag(FieldFlag::Pageable, field, field.flags.pageable)
    }

    /// Type-level read-only cannot be lifted per field.
    #[must_use]
    pub fn is_read_only_field(&self, field: &FieldModel) -> bool {
        self.read_only_type || self.field_flag(FieldFlag::ReadOnly, field, field.flags.read_only)
    }

    #[must_use]
    pub fn is_editable_field(&self, field: &FieldModel) -> bool {
        self.field_flag(FieldFlag::Editable, field, field.flags.editable)
    }

    #[must_use]
    pub fn is_creatable_field(&self, field: &FieldModel) -> bool {
        self.field_flag(FieldFlag::Creatable, field, field.flags.creatable)
    }

    #[must_use]
    pub fn is_addable_field(&self, field: &FieldModel) -> bool {
        self.field_flag(FieldFlag::Addable, field, field.flags.addable)
    }

    #[must_use]
    pub fn is_removable_field(&self, field: &FieldModel) -> bool {
        self.field_flag(FieldFlag::Removable, field, field.flags.removable)
    }

    #[must_use]
    pub fn is_movable_field(&self, field: &FieldModel) -> bool {
        self.field_flag(FieldFlag::Movable, field, field.flags.movable)
    }

    fn field_flag(&self, flag: FieldFlag, field: &FieldModel, fallback: bool) -> bool {
        self.flag(&FlagQuery::Field(flag, field), fallback)
    }

    // field value

    #[must_use]
    pub fn is_addable_field_value(&self, field: &FieldModel, value: &Value) -> bool {
        self.value_flag(FieldValueFlag::Addable, field, value, field.flags.addable)
    }

    #[must_use]
    pub fn is_removable_field_value(&self, field: &FieldModel, value: &Value) -> bool {
        self.value_flag(FieldValueFlag::Removable, field, value, field.flags.removable)
    }

    #[must_use]
    pub fn is_movable_field_value(&self, field: &FieldModel, value: &Value) -> bool {
        self.value_flag(FieldValueFlag::Movable, field, value, field.flags.movable)
    }

    #[must_use]
    pub fn is_editable_field_value(&self, field: &FieldModel, value: &Value) -> bool {
        self.value_flag(FieldValueFlag::Editable, field, value, field.flags.editable)
    }

    #[must_use]
    pub fn is_storable_field_value(&self, field: &FieldModel, value: &Value) -> bool {
        self.value_flag(FieldValueFlag::Storable, field, value, true)
    }

    fn value_flag(
        &self,
        flag: FieldValueFlag,
        field: &FieldModel,
        value: &Value,
        fallback: bool,
    ) -> bool {
        self.flag(&FlagQuery::FieldValue(flag, field, value), fallback)
    }

    // values

    /// Current values of `field` with the default window.
    pub fn field_values(&self, field: &FieldModel) -> Result<PagedValues, InternalError> {
        self.field_values_paged(field, 0, 0)
    }

    /// Current values of `field`.
    ///
    /// New topics start from the attribute named by the field's
    /// `assignDefaultValues`. Pageable unsorted fields are windowed, with a
    /// negative offset clamped to zero and a non-positive limit replaced by
    /// the engine's default.
    pub fn field_values_paged(
        &self,
        field: &FieldModel,
        offset: i64,
        limit: i64,
    ) -> Result<PagedValues, InternalError> {
        let Some(topic) = self.context.topic() else {
            return Ok(self.default_values(field));
        };
        let graph = self.engine().graph();

        if self.is_pageable_field(field) && !self.is_sorted_field(field) {
            let paging = Paging::clamped(offset, limit, self.engine().options().default_page_limit);

            return graph.paged_values(topic, field, paging);
        }

        graph.values(topic, field).map(PagedValues::unpaged)
    }

    fn default_values(&self, field: &FieldModel) -> PagedValues {
        if !self.context.is_new_topic() {
            return PagedValues::empty();
        }

        field
            .extra_str(ASSIGN_DEFAULT_VALUES)
            .and_then(|key| self.engine().attributes().get(key))
            .map_or_else(PagedValues::empty, |values| {
                PagedValues::unpaged(values.to_vec())
            })
    }

    // summary

    /// Evaluate every type flag, the view flag and the flags of each field
    /// in the context's view.
    #[must_use]
    pub fn evaluate(&self) -> ContextFlags {
        let hidden_view = self
            .context
            .view()
            .is_some_and(|view| self.is_hidden_view(view));
        let fields: Vec<FieldFlagSet> = self
            .context
            .view()
            .map(|view| {
                self.ty
                    .view_fields(view)
                    .map(|field| self.field_flag_set(field))
                    .collect()
            })
            .unwrap_or_default();

        ContextFlags {
            read_only_type: self.is_read_only_type(),
            updatable_type: self.is_updatable_type(),
            creatable_type: self.is_creatable_type(),
            removable_type: self.is_removable_type(),
            deletable_type: self.is_deletable_type(),
            hidden_view,
            fields,
        }
    }

    fn field_flag_set(&self, field: &FieldModel) -> FieldFlagSet {
        FieldFlagSet {
            field_id: field.id.clone(),
            hidden: self.is_hidden_field(field),
            traversable: self.is_traversable_field(field),
            sorted: self.is_sorted_field(field),
            sorted_ascending: self.is_sorted_ascending_field(field),
            pageable: self.is_pageable_field(field),
            read_only: self.is_read_only_field(field),
            editable: self.is_editable_field(field),
            creatable: self.is_creatable_field(field),
            addable: self.is_addable_field(field),
            removable: self.is_removable_field(field),
            movable: self.is_movable_field(field),
        }
    }
}
