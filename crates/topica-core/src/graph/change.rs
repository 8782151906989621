use crate::{
    error::InternalError,
    graph::{GraphAccessor, GraphError},
    model::{FieldModel, TypeModel},
    value::{Topic, TopicId, Value, ValueKey},
};
use std::{collections::HashSet, sync::Arc};
use tracing::debug;

///
/// ChangeKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

///
/// Change
///
/// One resolved entry of a committed batch: the topic as it should be
/// stored (or removed).
///

#[derive(Clone, Debug)]
pub struct Change {
    pub kind: ChangeKind,
    pub topic: Topic,
}

///
/// UpdateId
///
/// Handle to one pending create/update/delete within a [`ChangeSet`].
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UpdateId(usize);

///
/// UpdateOp
///

#[derive(Clone, Debug)]
enum UpdateOp {
    Set {
        field_id: String,
        values: Vec<Value>,
    },
    Add {
        field_id: String,
        values: Vec<Value>,
        index: Option<usize>,
    },
    Remove {
        field_id: String,
        values: Vec<Value>,
    },
}

impl UpdateOp {
    fn apply(&self, topic: &mut Topic) {
        match self {
            Self::Set { field_id, values } => topic.set_values(field_id.clone(), values.clone()),
            Self::Add {
                field_id,
                values,
                index,
            } => {
                let mut current = topic.values(field_id).to_vec();
                add_missing(&mut current, values, *index);
                topic.set_values(field_id.clone(), current);
            }
            Self::Remove { field_id, values } => {
                let mut current = topic.values(field_id).to_vec();
                remove_matching(&mut current, values);
                topic.set_values(field_id.clone(), current);
            }
        }
    }
}

/// Insert values not already present, at `index` (clamped) or at the end.
pub(crate) fn add_missing(current: &mut Vec<Value>, values: &[Value], index: Option<usize>) {
    let mut present: HashSet<ValueKey> = current.iter().map(Value::key).collect();
    let mut at = index.map(|i| i.min(current.len()));

    for value in values {
        if !present.insert(value.key()) {
            continue;
        }
        match at.as_mut() {
            Some(i) => {
                current.insert(*i, value.clone());
                *i += 1;
            }
            None => current.push(value.clone()),
        }
    }
}

/// Drop every value matching one of `values`.
pub(crate) fn remove_matching(current: &mut Vec<Value>, values: &[Value]) {
    let removed: HashSet<ValueKey> = values.iter().map(Value::key).collect();
    current.retain(|v| !removed.contains(&v.key()));
}

///
/// PendingUpdate
///

#[derive(Debug)]
struct PendingUpdate {
    kind: ChangeKind,
    topic: Topic,
    ops: Vec<UpdateOp>,
}

impl PendingUpdate {
    fn resolved(&self) -> Topic {
        let mut topic = self.topic.clone();
        for op in &self.ops {
            op.apply(&mut topic);
        }

        topic
    }
}

///
/// ChangeSet
///
/// Records creates, updates and deletes and hands them to the graph as a
/// single batch on [`save`](Self::save). Nothing is visible before then,
/// and nothing is visible if the commit fails.
///

pub struct ChangeSet {
    graph: Arc<dyn GraphAccessor>,
    pending: Vec<PendingUpdate>,
    saved: Option<Vec<Arc<Topic>>>,
}

impl ChangeSet {
    #[must_use]
    pub fn new(graph: Arc<dyn GraphAccessor>) -> Self {
        Self {
            graph,
            pending: Vec::new(),
            saved: None,
        }
    }

    /// Queue creation of a topic of `ty`; a fresh id is minted when none is
    /// given.
    pub fn create_topic(
        &mut self,
        ty: &TypeModel,
        id: Option<TopicId>,
    ) -> Result<UpdateId, InternalError> {
        let id = id.unwrap_or_else(TopicId::generate);
        if ty.inline {
            return Err(GraphError::InlineTopic(id.to_string()).into());
        }

        self.push(ChangeKind::Create, Topic::new(id, ty.id.clone()))
    }

    pub fn update_topic(&mut self, topic: &Topic, ty: &TypeModel) -> Result<UpdateId, InternalError> {
        Self::ensure_top_level(topic, ty)?;

        self.push(ChangeKind::Update, topic.clone())
    }

    pub fn delete_topic(&mut self, topic: &Topic, ty: &TypeModel) -> Result<UpdateId, InternalError> {
        Self::ensure_top_level(topic, ty)?;

        self.push(ChangeKind::Delete, topic.clone())
    }

    /// Replace a field's values.
    pub fn set_values(
        &mut self,
        update: UpdateId,
        field: &FieldModel,
        values: Vec<Value>,
    ) -> Result<(), InternalError> {
        self.op(
            update,
            UpdateOp::Set {
                field_id: field.actual_id().to_string(),
                values,
            },
        )
    }

    /// Add values not already present, optionally at a position.
    pub fn add_values(
        &mut self,
        update: UpdateId,
        field: &FieldModel,
        values: Vec<Value>,
        index: Option<usize>,
    ) -> Result<(), InternalError> {
        self.op(
            update,
            UpdateOp::Add {
                field_id: field.actual_id().to_string(),
                values,
                index,
            },
        )
    }

    pub fn remove_values(
        &mut self,
        update: UpdateId,
        field: &FieldModel,
        values: Vec<Value>,
    ) -> Result<(), InternalError> {
        self.op(
            update,
            UpdateOp::Remove {
                field_id: field.actual_id().to_string(),
                values,
            },
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Commit every queued change as one batch.
    pub fn save(&mut self) -> Result<(), InternalError> {
        if self.saved.is_some() {
            return Err(GraphError::AlreadySaved.into());
        }

        let changes: Vec<Change> = self
            .pending
            .iter()
            .map(|pending| Change {
                kind: pending.kind,
                topic: pending.resolved(),
            })
            .collect();

        debug!(changes = changes.len(), "committing change set");
        let stored = self.graph.commit(changes)?;
        self.saved = Some(stored);

        Ok(())
    }

    /// A queued topic with its operations applied, as it will be
    /// committed.
    pub fn pending_topic(&self, update: UpdateId) -> Result<Arc<Topic>, InternalError> {
        let pending = self
            .pending
            .get(update.0)
            .ok_or(GraphError::UnknownUpdate(update.0))?;

        Ok(Arc::new(pending.resolved()))
    }

    /// Stored state of a topic after [`save`](Self::save).
    pub fn topic_after_save(&self, update: UpdateId) -> Result<Arc<Topic>, InternalError> {
        let saved = self.saved.as_ref().ok_or(GraphError::NotSaved)?;

        saved
            .get(update.0)
            .cloned()
            .ok_or_else(|| GraphError::UnknownUpdate(update.0).into())
    }

    fn ensure_top_level(topic: &Topic, ty: &TypeModel) -> Result<(), InternalError> {
        if ty.inline || topic.is_inline() {
            return Err(GraphError::InlineTopic(topic.id().to_string()).into());
        }

        Ok(())
    }

    fn push(&mut self, kind: ChangeKind, topic: Topic) -> Result<UpdateId, InternalError> {
        if self.saved.is_some() {
            return Err(GraphError::AlreadySaved.into());
        }
        self.pending.push(PendingUpdate {
            kind,
            topic,
            ops: Vec::new(),
        });

        Ok(UpdateId(self.pending.len() - 1))
    }

    fn op(&mut self, update: UpdateId, op: UpdateOp) -> Result<(), InternalError> {
        if self.saved.is_some() {
            return Err(GraphError::AlreadySaved.into());
        }
        let pending = self
            .pending
            .get_mut(update.0)
            .ok_or(GraphError::UnknownUpdate(update.0))?;
        if pending.kind == ChangeKind::Delete {
            return Err(GraphError::DeletedUpdate(update.0).into());
        }
        pending.ops.push(op);

        Ok(())
    }
}

///
/// TESTS
///
