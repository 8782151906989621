//! Contexts: immutable positions in the topic graph.
//!
//! A context pairs a topic (persisted, new or missing) with a type and a
//! view, and links to the parent context and field it was reached through.
//! Chains are built parent-first and never mutated, so they cannot cycle.

use crate::{
    engine::Engine,
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::{FieldModel, TypeModel, ViewModel},
    resolve::{ContextVariableResolver, ResolveConfig, ResolveRequest, Resolver},
    value::{PagedValues, Paging, Topic, TopicId, Value},
};
use std::{fmt, sync::Arc};
use thiserror::Error as ThisError;

///
/// ContextError
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum ContextError {
    #[error("topic id cannot be empty")]
    EmptyTopicId,

    #[error("type '{type_id}' has no field '{field_id}'")]
    FieldNotFound { type_id: String, field_id: String },

    #[error("topic '{0}' does not exist")]
    MissingTopic(String),

    #[error("new-topic id '{0}' names an unknown type")]
    UnknownNewTopicType(String),

    #[error("type '{type_id}' has no view '{view_id}'")]
    ViewNotFound { type_id: String, view_id: String },
}

impl ContextError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::MissingTopic(_) => ErrorClass::NotFound,
            _ => ErrorClass::Usage,
        }
    }
}

impl From<ContextError> for InternalError {
    fn from(err: ContextError) -> Self {
        Self::new(err.class(), ErrorOrigin::Context, err.to_string())
    }
}

///
/// Subject
///
/// Exactly one of these holds for every context.
///

#[derive(Clone, Debug)]
enum Subject {
    Persisted(Arc<Topic>),
    New,
    Missing,
}

#[derive(Clone, Debug)]
struct Binding {
    ty: Arc<TypeModel>,
    view: usize,
}

#[derive(Clone, Debug)]
struct ParentLink {
    context: Context,
    field: FieldModel,
}

struct ContextNode {
    engine: Arc<Engine>,
    topic_id: TopicId,
    subject: Subject,
    binding: Option<Binding>,
    parent: Option<ParentLink>,
}

///
/// Context
///
/// Cheap to clone; clones share the same node.
///

#[derive(Clone)]
pub struct Context {
    node: Arc<ContextNode>,
}

impl Context {
    /// Build a context from a topic id.
    ///
    /// New-topic markers derive the type from the marker and fetch nothing.
    /// Ids that resolve to no topic yield a missing context.
    pub fn from_id(
        engine: &Arc<Engine>,
        topic_id: &TopicId,
        view_id: Option<&str>,
    ) -> Result<Self, InternalError> {
        Self::build_from_id(engine, topic_id, view_id, None)
    }

    /// Build a context for a persisted topic in its type's default view.
    pub fn from_topic(engine: &Arc<Engine>, topic: Arc<Topic>) -> Result<Self, InternalError> {
        let ty = Arc::clone(engine.schema().topic_type(&topic)?);

        Self::build(engine, Some(topic), ty, None, None)
    }

    /// Build a context for a not-yet-created topic of `ty`.
    pub fn for_new(
        engine: &Arc<Engine>,
        ty: Arc<TypeModel>,
        view_id: Option<&str>,
    ) -> Result<Self, InternalError> {
        Self::build(engine, None, ty, view_id, None)
    }

    /// Build a context from explicit parts; `None` topic means new.
    pub fn with_topic(
        engine: &Arc<Engine>,
        topic: Option<Arc<Topic>>,
        ty: Arc<TypeModel>,
        view_id: Option<&str>,
    ) -> Result<Self, InternalError> {
        Self::build(engine, topic, ty, view_id, None)
    }

    // sub-contexts

    /// Enter `field`'s value `topic` using the value type's default view.
    pub fn sub_context_for_topic(
        &self,
        field: &FieldModel,
        topic: Arc<Topic>,
    ) -> Result<Self, InternalError> {
        let ty = Arc::clone(self.engine().schema().topic_type(&topic)?);

        Self::build(self.engine(), Some(topic), ty, None, self.link(field))
    }

    /// Enter `field`'s value `topic` using the field's value view.
    ///
    /// Differs from [`sub_context_for_topic`](Self::sub_context_for_topic)
    /// only when the field names a value view the topic's type declares.
    pub fn sub_context_for_value_view(
        &self,
        field: &FieldModel,
        topic: Arc<Topic>,
    ) -> Result<Self, InternalError> {
        let ty = Arc::clone(self.engine().schema().topic_type(&topic)?);
        let view_id = ty.value_view(field).map(|v| v.id.clone());

        Self::build(
            self.engine(),
            Some(topic),
            ty,
            view_id.as_deref(),
            self.link(field),
        )
    }

    /// Enter `field` for a new value of type `ty`.
    pub fn sub_context_for_new(
        &self,
        field: &FieldModel,
        ty: Arc<TypeModel>,
        view_id: Option<&str>,
    ) -> Result<Self, InternalError> {
        Self::build(self.engine(), None, ty, view_id, self.link(field))
    }

    /// Enter `field` with explicit parts; `None` topic means new.
    pub fn sub_context_with_topic(
        &self,
        field: &FieldModel,
        topic: Option<Arc<Topic>>,
        ty: Arc<TypeModel>,
        view_id: Option<&str>,
    ) -> Result<Self, InternalError> {
        Self::build(self.engine(), topic, ty, view_id, self.link(field))
    }

    /// Enter `field` by topic id, with the same rules as [`from_id`](Self::from_id).
    pub fn sub_context_from_id(
        &self,
        field: &FieldModel,
        topic_id: &TopicId,
        view_id: Option<&str>,
    ) -> Result<Self, InternalError> {
        Self::build_from_id(self.engine(), topic_id, view_id, self.link(field))
    }

    // rebinding

    /// Same type, view and parent linkage, bound to a refreshed topic.
    #[must_use]
    pub fn rebind_topic(&self, topic: Arc<Topic>) -> Self {
        let node = &self.node;

        Self {
            node: Arc::new(ContextNode {
                engine: Arc::clone(&node.engine),
                topic_id: topic.id().clone(),
                subject: Subject::Persisted(topic),
                binding: node.binding.clone(),
                parent: node.parent.clone(),
            }),
        }
    }

    /// Same topic and parent linkage, shown through another view.
    pub fn rebind_view(&self, view_id: &str) -> Result<Self, InternalError> {
        let parent = self.node.parent.clone();

        match (&self.node.subject, &self.node.binding) {
            (Subject::Persisted(topic), Some(binding)) => Self::build(
                self.engine(),
                Some(Arc::clone(topic)),
                Arc::clone(&binding.ty),
                Some(view_id),
                parent,
            ),
            _ => Self::build_from_id(self.engine(), self.topic_id(), Some(view_id), parent),
        }
    }

    // readers

    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.node.engine
    }

    #[must_use]
    pub fn topic_id(&self) -> &TopicId {
        &self.node.topic_id
    }

    #[must_use]
    pub fn topic(&self) -> Option<&Arc<Topic>> {
        match &self.node.subject {
            Subject::Persisted(topic) => Some(topic),
            Subject::New | Subject::Missing => None,
        }
    }

    #[must_use]
    pub fn is_new_topic(&self) -> bool {
        matches!(self.node.subject, Subject::New)
    }

    /// True when the id resolved to nothing; type and view are absent.
    #[must_use]
    pub fn is_missing_topic(&self) -> bool {
        matches!(self.node.subject, Subject::Missing)
    }

    #[must_use]
    pub fn ty(&self) -> Option<&Arc<TypeModel>> {
        self.node.binding.as_ref().map(|b| &b.ty)
    }

    /// Type of the context; fails for missing topics.
    pub fn try_ty(&self) -> Result<&Arc<TypeModel>, InternalError> {
        self.ty()
            .ok_or_else(|| ContextError::MissingTopic(self.topic_id().to_string()).into())
    }

    #[must_use]
    pub fn view(&self) -> Option<&ViewModel> {
        self.node
            .binding
            .as_ref()
            .and_then(|b| b.ty.views.get(b.view))
    }

    #[must_use]
    pub fn parent_context(&self) -> Option<&Self> {
        self.node.parent.as_ref().map(|p| &p.context)
    }

    #[must_use]
    pub fn parent_field(&self) -> Option<&FieldModel> {
        self.node.parent.as_ref().map(|p| &p.field)
    }

    #[must_use]
    pub fn field_by_id(&self, field_id: &str) -> Option<&FieldModel> {
        self.ty().and_then(|ty| ty.field_by_id(field_id))
    }

    pub fn try_field(&self, field_id: &str) -> Result<&FieldModel, InternalError> {
        let ty = self.try_ty()?;

        ty.field_by_id(field_id).ok_or_else(|| {
            ContextError::FieldNotFound {
                type_id: ty.id.clone(),
                field_id: field_id.to_string(),
            }
            .into()
        })
    }

    /// The context topic as a resolver object set; empty unless persisted.
    #[must_use]
    pub fn objects(&self) -> Vec<Value> {
        self.topic()
            .map(|topic| vec![Value::Topic(Arc::clone(topic))])
            .unwrap_or_default()
    }

    /// Effective values of `field` for this context.
    ///
    /// Fields with a `resolve` block run through the resolver framework;
    /// other fields read stored values from the graph.
    pub fn resolve_values(
        &self,
        field: &FieldModel,
        paging: Option<Paging>,
    ) -> Result<PagedValues, InternalError> {
        if let Some(node) = field.extra_node("resolve") {
            let config = ResolveConfig::from_json(node);
            let objects = self.objects();
            let variables = ContextVariableResolver::new(self);
            let request = ResolveRequest {
                objects: &objects,
                field: Some(field),
                is_reference: field.is_reference(),
                paging,
                variables: &variables,
            };

            return config.resolve(self.engine(), &request);
        }

        let Some(topic) = self.topic() else {
            return Ok(PagedValues::empty());
        };
        let graph = self.engine().graph();

        match paging {
            Some(paging) => graph.paged_values(topic, field, paging),
            None => graph.values(topic, field).map(PagedValues::unpaged),
        }
    }

    fn link(&self, field: &FieldModel) -> Option<ParentLink> {
        Some(ParentLink {
            context: self.clone(),
            field: field.clone(),
        })
    }

    fn build_from_id(
        engine: &Arc<Engine>,
        topic_id: &TopicId,
        view_id: Option<&str>,
        parent: Option<ParentLink>,
    ) -> Result<Self, InternalError> {
        if topic_id.is_empty() {
            return Err(ContextError::EmptyTopicId.into());
        }

        if let Some(type_id) = topic_id.new_type_id() {
            let ty = engine
                .schema()
                .type_by_id(type_id)
                .cloned()
                .ok_or_else(|| ContextError::UnknownNewTopicType(topic_id.to_string()))?;

            return Self::build(engine, None, ty, view_id, parent);
        }

        match engine.graph().topic_by_id(topic_id)? {
            Some(topic) => {
                let ty = Arc::clone(engine.schema().topic_type(&topic)?);
                Self::build(engine, Some(topic), ty, view_id, parent)
            }
            None => Ok(Self {
                node: Arc::new(ContextNode {
                    engine: Arc::clone(engine),
                    topic_id: topic_id.clone(),
                    subject: Subject::Missing,
                    binding: None,
                    parent,
                }),
            }),
        }
    }

    fn build(
        engine: &Arc<Engine>,
        topic: Option<Arc<Topic>>,
        ty: Arc<TypeModel>,
        view_id: Option<&str>,
        parent: Option<ParentLink>,
    ) -> Result<Self, InternalError> {
        let view_id = view_id.unwrap_or(&ty.default_view);
        let view = ty
            .view_index(view_id)
            .ok_or_else(|| ContextError::ViewNotFound {
                type_id: ty.id.clone(),
                view_id: view_id.to_string(),
            })?;

        let (topic_id, subject) = match topic {
            Some(topic) => (topic.id().clone(), Subject::Persisted(topic)),
            None => (TopicId::new_marker(&ty.id), Subject::New),
        };

        Ok(Self {
            node: Arc::new(ContextNode {
                engine: Arc::clone(engine),
                topic_id,
                subject,
                binding: Some(Binding { ty, view }),
                parent,
            }),
        })
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("topic_id", self.topic_id())
            .field("view", &self.view().map(|v| v.id.as_str()))
            .field("parent_field", &self.parent_field().map(|p| p.id.as_str()))
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.node.parent {
            write!(f, "{} $({}) ", parent.context, parent.field.id)?;
        }
        write!(f, "{}", self.topic_id())?;
        if let Some(view) = self.view() {
            write!(f, "/{}", view.id)?;
        }

        Ok(())
    }
}

///
/// TESTS
///
