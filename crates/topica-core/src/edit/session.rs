use crate::{
    context::{Context, ContextError},
    edit::{EditError, ExtractOptions, FieldSubmission, SubmittedValue, TopicSubmission},
    engine::Engine,
    error::{ConstraintError, InternalError},
    graph::{ChangeSet, InlineTopicBuilder, UpdateId, add_missing, remove_matching},
    merge::merge_inline_topics,
    model::{FieldModel, TypeModel},
    obs::EngineEvent,
    resolve::{
        ContextVariableResolver, ResolveConfig, ResolveRequest, Resolver, SubmittedVariableResolver,
    },
    rules::RuleEngine,
    value::{Paging, Topic, TopicId, Value},
};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, warn};

///
/// FieldWrite
///

enum FieldWrite {
    Set(Vec<Value>),
    Add(Vec<Value>, Option<usize>),
    Remove(Vec<Value>),
}

impl FieldWrite {
    // inline topics are rewritten in place and stored through their owner
    fn apply(self, topic: &mut Topic, field: &FieldModel) {
        let current = topic.values(field.actual_id());
        let values = match self {
            Self::Set(values) => values,
            Self::Add(values, index) => {
                let mut current = current.to_vec();
                add_missing(&mut current, &values, index);
                current
            }
            Self::Remove(values) => {
                let mut current = current.to_vec();
                remove_matching(&mut current, &values);
                current
            }
        };
        topic.set_values(field.actual_id(), values);
    }

    fn queue(
        self,
        changes: &mut ChangeSet,
        update: UpdateId,
        field: &FieldModel,
    ) -> Result<(), InternalError> {
        match self {
            Self::Set(values) => changes.set_values(update, field, values),
            Self::Add(values, index) => changes.add_values(update, field, values, index),
            Self::Remove(values) => changes.remove_values(update, field, values),
        }
    }
}

// Submitted reference, either already resolved or awaiting a lookup.
enum Slot {
    Ready(Value),
    Lookup(TopicId),
}

///
/// EditSession
///
/// Write operations over one engine. Every operation that stores data
/// returns the context rebuilt around the stored topic, with its parent
/// chain refreshed.
///

#[derive(Clone, Debug)]
pub struct EditSession {
    engine: Arc<Engine>,
}

impl EditSession {
    #[must_use]
    pub const fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    #[must_use]
    pub const fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Rules for a topic id, ready for the write operations below.
    pub fn rules(&self, topic_id: &TopicId, view_id: Option<&str>) -> Result<RuleEngine, InternalError> {
        RuleEngine::new(Context::from_id(&self.engine, topic_id, view_id)?)
    }

    // field values

    /// Add submitted values to `field`. Values already present are skipped.
    pub fn add_field_values(
        &self,
        rules: &RuleEngine,
        field: &FieldModel,
        submitted: &[SubmittedValue],
        index: Option<usize>,
    ) -> Result<Context, InternalError> {
        let mut changes = self.engine.change_set();
        let values =
            self.extract_values(rules, field, submitted, ExtractOptions::UPDATE, &mut changes)?;
        self.check_addable(rules, field, &values)?;

        self.write_field(rules.context(), field, FieldWrite::Add(values, index), &mut changes)
    }

    pub fn add_values(
        &self,
        rules: &RuleEngine,
        field: &FieldModel,
        values: Vec<Value>,
        index: Option<usize>,
    ) -> Result<Context, InternalError> {
        self.check_addable(rules, field, &values)?;
        let mut changes = self.engine.change_set();

        self.write_field(rules.context(), field, FieldWrite::Add(values, index), &mut changes)
    }

    /// Remove submitted values from `field`; every value must be removable.
    pub fn remove_field_values(
        &self,
        rules: &RuleEngine,
        field: &FieldModel,
        submitted: &[SubmittedValue],
    ) -> Result<Context, InternalError> {
        let mut changes = self.engine.change_set();
        let values =
            self.extract_values(rules, field, submitted, ExtractOptions::REMOVE, &mut changes)?;

        self.remove_values(rules, field, values)
    }

    pub fn remove_values(
        &self,
        rules: &RuleEngine,
        field: &FieldModel,
        values: Vec<Value>,
    ) -> Result<Context, InternalError> {
        if let Some(value) = values
            .iter()
            .find(|v| !rules.is_removable_field_value(field, v))
        {
            return Err(self.reject(
                field,
                ConstraintError::NotRemovable {
                    field: field.id.clone(),
                    value: value.to_string(),
                },
            ));
        }

        let mut changes = self.engine.change_set();

        self.write_field(rules.context(), field, FieldWrite::Remove(values), &mut changes)
    }

    /// Replace the values of one field of a top-level topic, creating the
    /// topic when the context is new. Read-only and pageable fields are
    /// left as they are.
    pub fn update_field_values(
        &self,
        rules: &RuleEngine,
        submission: &FieldSubmission,
    ) -> Result<Context, InternalError> {
        let context = rules.context();
        let ty = rules.ty();
        if ty.inline {
            return Err(EditError::InlineUpdate(ty.id.clone()).into());
        }
        let field = context.try_field(&submission.id)?;

        let mut changes = self.engine.change_set();
        let update = Self::open_update(&mut changes, context, ty)?;
        if Self::is_writable(rules, field) {
            let values = self.extract_values(
                rules,
                field,
                &submission.values,
                ExtractOptions::UPDATE,
                &mut changes,
            )?;
            changes.set_values(update, field, values)?;
        }
        self.save(&mut changes)?;

        let updated = changes.topic_after_save(update)?;
        self.update_parent_context(context, updated, &mut changes)
    }

    // topics

    /// Store a submitted topic and return it.
    ///
    /// A top-level topic is queued on `changes` together with the embedded
    /// topics it references, and `changes` is saved. Inline topics are only
    /// rebuilt; their embedded topics stay queued until
    /// [`update_parent_context`](Self::update_parent_context) saves the
    /// owner. [`update_topic_view`](Self::update_topic_view) does both.
    pub fn update_topic(
        &self,
        rules: &RuleEngine,
        submission: &TopicSubmission,
        changes: &mut ChangeSet,
    ) -> Result<Arc<Topic>, InternalError> {
        let context = rules.context();
        let ty = rules.ty();

        if ty.inline {
            let (Some(parent), Some(field)) = (context.parent_context(), context.parent_field())
            else {
                return Err(EditError::InlineWithoutOwner(ty.id.clone()).into());
            };

            return self
                .build_inline_topic(parent, field, submission, ExtractOptions::UPDATE, changes)
                .map(Arc::new);
        }

        let update = self.queue_topic(rules, submission, changes)?;
        self.save(changes)?;

        changes.topic_after_save(update)
    }

    /// [`update_topic`](Self::update_topic), then store the result through
    /// its owners.
    pub fn update_topic_view(
        &self,
        rules: &RuleEngine,
        submission: &TopicSubmission,
    ) -> Result<Context, InternalError> {
        let mut changes = self.engine.change_set();
        let updated = self.update_topic(rules, submission, &mut changes)?;

        self.update_parent_context(rules.context(), updated, &mut changes)
    }

    /// Fold an updated topic back into its parent chain.
    ///
    /// Inline topics are merged into the owning field of their parent,
    /// inline parents are rebuilt in turn, and the first top-level owner is
    /// saved along with anything else queued on `changes`. The returned
    /// context mirrors `context` (same field path, type and view) around the
    /// updated topics.
    pub fn update_parent_context(
        &self,
        context: &Context,
        updated: Arc<Topic>,
        changes: &mut ChangeSet,
    ) -> Result<Context, InternalError> {
        let (Some(parent), Some(field)) = (context.parent_context(), context.parent_field()) else {
            return Ok(context.rebind_topic(updated));
        };

        let (parent, updated) = if updated.is_inline() {
            let updated_parent = self.update_owner_field(parent, field, &updated, changes)?;
            // the owner holds the merged copy
            let merged =
                Self::find_inline_topic_by_id(&updated_parent, field, updated.id().as_str())
                    .unwrap_or(updated);
            (self.update_parent_context(parent, updated_parent, changes)?, merged)
        } else {
            (parent.clone(), updated)
        };
        let ty = Arc::clone(context.try_ty()?);
        let view_id = context.view().map(|v| v.id.clone());

        parent.sub_context_with_topic(field, Some(updated), ty, view_id.as_deref())
    }

    /// Delete the context's topic.
    pub fn delete_topic(&self, rules: &RuleEngine) -> Result<(), InternalError> {
        let topic = Self::stored_topic(rules.context())?;
        warn!(topic = %topic.id(), type_id = %rules.ty().id, "deleting topic");

        let mut changes = self.engine.change_set();
        changes.delete_topic(topic, rules.ty())?;

        self.save(&mut changes)
    }

    // values

    /// Turn submitted values for `field` into values ready to store.
    ///
    /// Inline fields build their topics from the submission and merge them
    /// with the stored ones. Other reference fields look topics up by id,
    /// or queue embedded topics on `changes` when `resolve_embedded` is set.
    pub fn extract_values(
        &self,
        rules: &RuleEngine,
        field: &FieldModel,
        submitted: &[SubmittedValue],
        options: ExtractOptions,
        changes: &mut ChangeSet,
    ) -> Result<Vec<Value>, InternalError> {
        if submitted.is_empty() {
            return Ok(Vec::new());
        }
        let context = rules.context();

        let mut values = if field.is_inline() {
            self.extract_inline(context, field, submitted, options, changes)?
        } else if field.is_reference() {
            self.extract_references(field, submitted, options, changes)?
        } else {
            Self::extract_primitives(field, submitted)
        };

        if field.is_reference() && options.validate_value_types {
            self.validate_value_types(field, &values)?;
        }
        if options.filter_non_storable {
            values.retain(|v| rules.is_storable_field_value(field, v));
        }

        Ok(values)
    }

    fn extract_inline(
        &self,
        context: &Context,
        field: &FieldModel,
        submitted: &[SubmittedValue],
        options: ExtractOptions,
        changes: &mut ChangeSet,
    ) -> Result<Vec<Value>, InternalError> {
        let mut built = Vec::with_capacity(submitted.len());
        for value in submitted {
            let topic = match value {
                SubmittedValue::Embedded(embedded) => {
                    let options = ExtractOptions {
                        filter_non_storable: true,
                        ..options
                    };
                    self.build_inline_topic(context, field, embedded, options, changes)?
                }
                SubmittedValue::Reference { id, type_id } => {
                    let ty = self.inline_reference_type(field, type_id.as_deref(), id)?;
                    InlineTopicBuilder::new(ty, Some(TopicId::from(id.as_str()))).build()
                }
                SubmittedValue::Primitive(id) => {
                    let ty = self.inline_reference_type(field, None, id)?;
                    InlineTopicBuilder::new(ty, Some(TopicId::from(id.as_str()))).build()
                }
            };
            built.push(Value::from(topic));
        }

        match context.topic() {
            Some(topic) if !context.is_new_topic() => merge_inline_topics(
                self.engine.schema(),
                &built,
                topic.values(field.actual_id()),
                options.include_existing,
            ),
            _ => Ok(built),
        }
    }

    fn inline_reference_type(
        &self,
        field: &FieldModel,
        type_id: Option<&str>,
        value: &str,
    ) -> Result<&TypeModel, InternalError> {
        let type_id = match (type_id, field.value_types()) {
            (Some(type_id), _) => Some(type_id),
            (None, [only]) => Some(only.as_str()),
            (None, _) => None,
        };

        type_id
            .and_then(|id| self.engine.schema().type_by_id(id))
            .map(Arc::as_ref)
            .ok_or_else(|| {
                self.reject(
                    field,
                    ConstraintError::InvalidValueType {
                        field: field.id.clone(),
                        value: value.to_string(),
                        value_type: type_id.unwrap_or_default().to_string(),
                    },
                )
            })
    }

    fn extract_references(
        &self,
        field: &FieldModel,
        submitted: &[SubmittedValue],
        options: ExtractOptions,
        changes: &mut ChangeSet,
    ) -> Result<Vec<Value>, InternalError> {
        let mut slots = Vec::with_capacity(submitted.len());
        for value in submitted {
            match value {
                SubmittedValue::Embedded(embedded) if options.resolve_embedded => {
                    let topic = self.queue_embedded_topic(field, embedded, changes)?;
                    slots.push(Slot::Ready(Value::Topic(topic)));
                }
                SubmittedValue::Embedded(embedded) => {
                    if let Some(id) = &embedded.topic_id {
                        slots.push(Slot::Lookup(TopicId::from(id.as_str())));
                    }
                }
                SubmittedValue::Primitive(id) | SubmittedValue::Reference { id, .. } => {
                    slots.push(Slot::Lookup(TopicId::from(id.as_str())));
                }
            }
        }

        let ids: Vec<TopicId> = slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Lookup(id) => Some(id.clone()),
                Slot::Ready(_) => None,
            })
            .collect();
        let found: HashMap<TopicId, Arc<Topic>> = self
            .engine
            .graph()
            .topics_by_ids(&ids)?
            .into_iter()
            .map(|topic| (topic.id().clone(), topic))
            .collect();

        Ok(slots
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Ready(value) => Some(value),
                Slot::Lookup(id) => {
                    let topic = found.get(&id).cloned();
                    if topic.is_none() {
                        debug!(field = %field.id, topic = %id, "submitted reference not found");
                    }
                    topic.map(Value::Topic)
                }
            })
            .collect())
    }

    fn extract_primitives(field: &FieldModel, submitted: &[SubmittedValue]) -> Vec<Value> {
        submitted
            .iter()
            .filter_map(|value| match value {
                SubmittedValue::Primitive(raw) => Some(Value::Text(raw.clone())),
                SubmittedValue::Reference { id, .. } => Some(Value::Text(id.clone())),
                SubmittedValue::Embedded(_) => {
                    warn!(field = %field.id, "embedded topic submitted for a primitive field");
                    None
                }
            })
            .collect()
    }

    fn validate_value_types(&self, field: &FieldModel, values: &[Value]) -> Result<(), InternalError> {
        for value in values {
            let value_type = value.as_topic().map(|t| t.type_id());
            let accepted = value_type.is_some_and(|vt| field.value_types().iter().any(|t| t == vt));
            if !accepted {
                return Err(self.reject(
                    field,
                    ConstraintError::InvalidValueType {
                        field: field.id.clone(),
                        value: value.to_string(),
                        value_type: value_type.unwrap_or("primitive").to_string(),
                    },
                ));
            }
        }

        Ok(())
    }

    // inline topics

    /// Build an inline topic for `parent_field` of `parent` from a
    /// submission. Fields the submission leaves out are not set; merging
    /// with the stored topic fills them in. Embedded topics are queued on
    /// `changes`.
    pub fn build_inline_topic(
        &self,
        parent: &Context,
        parent_field: &FieldModel,
        submission: &TopicSubmission,
        options: ExtractOptions,
        changes: &mut ChangeSet,
    ) -> Result<Topic, InternalError> {
        let ty = Arc::clone(self.engine.schema().try_type(&submission.type_id)?);
        if !ty.inline {
            return Err(self.reject(
                parent_field,
                ConstraintError::NotInlineType {
                    type_id: ty.id.clone(),
                },
            ));
        }

        let stored = match (&submission.topic_id, parent.topic()) {
            (Some(id), Some(owner)) if !parent.is_new_topic() => {
                Some(Self::find_inline_topic_by_id(owner, parent_field, id)?)
            }
            _ => None,
        };
        let context = parent.sub_context_with_topic(
            parent_field,
            stored,
            Arc::clone(&ty),
            submission.view_id.as_deref(),
        )?;
        let rules = RuleEngine::new(context)?;
        let nested = ExtractOptions {
            resolve_embedded: true,
            include_existing: false,
            ..options
        };

        let id = submission.topic_id.as_deref().map(TopicId::from);
        let mut builder = InlineTopicBuilder::new(&ty, id);
        for submitted in &submission.fields {
            let field = rules.context().try_field(&submitted.id)?;
            let values =
                self.extract_values(&rules, field, &submitted.values, nested, changes)?;
            builder.set_values(field, values);
        }

        Ok(builder.build())
    }

    /// The inline topic with `topic_id` among `owner`'s `field` values.
    pub fn find_inline_topic_by_id(
        owner: &Topic,
        field: &FieldModel,
        topic_id: &str,
    ) -> Result<Arc<Topic>, InternalError> {
        owner
            .values(field.actual_id())
            .iter()
            .filter_map(Value::as_topic)
            .find(|t| t.id().as_str() == topic_id)
            .cloned()
            .ok_or_else(|| {
                EditError::InlineTopicNotFound {
                    field: field.id.clone(),
                    topic_id: topic_id.to_string(),
                }
                .into()
            })
    }

    // uniqueness

    /// True unless the field's `unique.resolve` block finds an existing
    /// match. The block sees the field's submitted values as `:value` and
    /// every field of `submission` as `:submitted.<fieldId>`. Fields without
    /// the block are always unique.
    pub fn validate_unique(
        &self,
        context: &Context,
        field: &FieldModel,
        submission: &TopicSubmission,
    ) -> Result<bool, InternalError> {
        let Some(node) = field.extra_node("unique").and_then(|u| u.get("resolve")) else {
            return Ok(true);
        };
        let config = ResolveConfig::from_json(node);

        let value = submission
            .field(&field.id)
            .map(FieldSubmission::raw_values)
            .unwrap_or_default();
        let submitted = submission.raw_values();
        let objects = context.objects();
        let inner = ContextVariableResolver::new(context);
        let variables =
            SubmittedVariableResolver::new(&inner, context.is_new_topic(), &value, &submitted);
        let request = ResolveRequest {
            objects: &objects,
            field: Some(field),
            is_reference: field.is_reference(),
            paging: Some(Paging::new(0, 1)),
            variables: &variables,
        };

        Ok(config.resolve(&self.engine, &request)?.is_empty())
    }

    // helpers

    // Queue every writable submitted field on one create or update.
    fn queue_topic(
        &self,
        rules: &RuleEngine,
        submission: &TopicSubmission,
        changes: &mut ChangeSet,
    ) -> Result<UpdateId, InternalError> {
        let context = rules.context();
        let update = Self::open_update(changes, context, rules.ty())?;
        for submitted in &submission.fields {
            let field = context.try_field(&submitted.id)?;
            if !Self::is_writable(rules, field) {
                continue;
            }
            let values = self.extract_values(
                rules,
                field,
                &submitted.values,
                ExtractOptions::UPDATE,
                changes,
            )?;
            changes.set_values(update, field, values)?;
        }

        Ok(update)
    }

    // The referencing value is the topic as it will be committed with its
    // owner.
    fn queue_embedded_topic(
        &self,
        field: &FieldModel,
        submission: &TopicSubmission,
        changes: &mut ChangeSet,
    ) -> Result<Arc<Topic>, InternalError> {
        let schema = self.engine.schema();
        let (topic, ty) = match &submission.topic_id {
            Some(id) => {
                let topic = self
                    .engine
                    .graph()
                    .topic_by_id(&TopicId::from(id.as_str()))?
                    .ok_or_else(|| ContextError::MissingTopic(id.clone()))?;
                let ty = Arc::clone(schema.topic_type(&topic)?);
                (Some(topic), ty)
            }
            None => (None, Arc::clone(schema.try_type(&submission.type_id)?)),
        };
        let view_id = ty.value_view(field).map(|v| v.id.clone());
        let context = Context::with_topic(&self.engine, topic, ty, view_id.as_deref())?;
        let update = self.queue_topic(&RuleEngine::new(context)?, submission, changes)?;

        changes.pending_topic(update)
    }

    fn update_owner_field(
        &self,
        owner: &Context,
        field: &FieldModel,
        updated: &Arc<Topic>,
        changes: &mut ChangeSet,
    ) -> Result<Arc<Topic>, InternalError> {
        let rules = RuleEngine::new(owner.clone())?;
        let topic = Self::stored_topic(owner)?;

        let mut values = merge_inline_topics(
            self.engine.schema(),
            &[Value::Topic(Arc::clone(updated))],
            topic.values(field.actual_id()),
            true,
        )?;
        values.retain(|v| rules.is_storable_field_value(field, v));

        self.store(owner, topic, field, FieldWrite::Set(values), changes)
    }

    fn write_field(
        &self,
        context: &Context,
        field: &FieldModel,
        write: FieldWrite,
        changes: &mut ChangeSet,
    ) -> Result<Context, InternalError> {
        let topic = Self::stored_topic(context)?;
        let updated = self.store(context, topic, field, write, changes)?;

        self.update_parent_context(context, updated, changes)
    }

    // Apply one field write: in place for inline topics, through `changes`
    // otherwise.
    fn store(
        &self,
        context: &Context,
        topic: &Arc<Topic>,
        field: &FieldModel,
        write: FieldWrite,
        changes: &mut ChangeSet,
    ) -> Result<Arc<Topic>, InternalError> {
        if topic.is_inline() {
            let mut local = Topic::clone(topic);
            write.apply(&mut local, field);

            return Ok(Arc::new(local));
        }

        let update = changes.update_topic(topic, context.try_ty()?)?;
        write.queue(changes, update, field)?;
        self.save(changes)?;

        changes.topic_after_save(update)
    }

    fn open_update(
        changes: &mut ChangeSet,
        context: &Context,
        ty: &TypeModel,
    ) -> Result<UpdateId, InternalError> {
        match context.topic() {
            Some(topic) => changes.update_topic(topic, ty),
            None => changes.create_topic(ty, None),
        }
    }

    fn stored_topic(context: &Context) -> Result<&Arc<Topic>, InternalError> {
        context
            .topic()
            .ok_or_else(|| EditError::NotStored(context.topic_id().to_string()).into())
    }

    fn is_writable(rules: &RuleEngine, field: &FieldModel) -> bool {
        !rules.is_read_only_field(field) && !rules.is_pageable_field(field)
    }

    fn save(&self, changes: &mut ChangeSet) -> Result<(), InternalError> {
        let count = changes.len();
        changes.save()?;
        self.engine
            .record(EngineEvent::ChangeSetSaved { changes: count });

        Ok(())
    }

    fn check_addable(
        &self,
        rules: &RuleEngine,
        field: &FieldModel,
        values: &[Value],
    ) -> Result<(), InternalError> {
        match values.iter().find(|v| !rules.is_addable_field_value(field, v)) {
            Some(value) => Err(self.reject(
                field,
                ConstraintError::NotAddable {
                    field: field.id.clone(),
                    value: value.to_string(),
                },
            )),
            None => Ok(()),
        }
    }

    fn reject(&self, field: &FieldModel, err: ConstraintError) -> InternalError {
        warn!(field = %field.id, error = %err, "write rejected");
        self.engine.record(EngineEvent::ConstraintRejected {
            field: field.id.clone(),
        });

        err.into()
    }
}
