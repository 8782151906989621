use crate::{config::EngineConfig, error::Error};
use std::sync::Arc;
use topica_core::{
    context::Context,
    edit::{EditSession, FieldSubmission, SubmittedValue, TopicSubmission},
    engine::{Engine, EngineBuilder},
    graph::GraphAccessor,
    model::Schema,
    rules::{ContextFlags, RuleEngine},
    value::{PagedValues, Topic, TopicId},
};
use tracing::debug;

///
/// Session
/// Public facade over the edit session and rule engine.
/// Converts core errors into `topica::Error`.
///

#[derive(Clone, Debug)]
pub struct Session {
    inner: EditSession,
}

impl Session {
    #[must_use]
    pub const fn new(engine: Arc<Engine>) -> Self {
        Self {
            inner: EditSession::new(engine),
        }
    }

    /// Validate `config`, apply it to `builder` and build the engine.
    pub fn open(builder: EngineBuilder, config: &EngineConfig) -> Result<Self, Error> {
        config.validate()?;
        let engine = builder.options(config.options()).build()?;
        debug!(read_only = config.read_only, "session opened");

        Ok(Self::new(engine))
    }

    /// Build an engine with the default handlers and open a session on it.
    pub fn with_graph(
        schema: Arc<Schema>,
        graph: Arc<dyn GraphAccessor>,
        config: &EngineConfig,
    ) -> Result<Self, Error> {
        Self::open(Engine::builder(schema, graph), config)
    }

    #[must_use]
    pub const fn engine(&self) -> &Arc<Engine> {
        self.inner.engine()
    }

    //
    // Read
    //

    pub fn context(&self, topic_id: &str, view_id: Option<&str>) -> Result<Context, Error> {
        Ok(Context::from_id(
            self.engine(),
            &TopicId::from(topic_id),
            view_id,
        )?)
    }

    pub fn rules(&self, topic_id: &str, view_id: Option<&str>) -> Result<RuleEngine, Error> {
        Ok(self.inner.rules(&TopicId::from(topic_id), view_id)?)
    }

    /// Every rule answer for one topic and view.
    pub fn flags(&self, topic_id: &str, view_id: Option<&str>) -> Result<ContextFlags, Error> {
        Ok(self.rules(topic_id, view_id)?.evaluate())
    }

    /// One page of a field's effective values; see
    /// [`RuleEngine::field_values_paged`].
    pub fn field_values(
        &self,
        topic_id: &str,
        field_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<PagedValues, Error> {
        let rules = self.rules(topic_id, None)?;
        let field = rules.context().try_field(field_id)?;

        Ok(rules.field_values_paged(field, offset, limit)?)
    }

    //
    // Write
    //

    /// Store a submitted topic. A submission without an id creates a topic
    /// of its type.
    pub fn submit(&self, submission: &TopicSubmission) -> Result<Arc<Topic>, Error> {
        let topic_id = submission
            .topic_id
            .as_deref()
            .map_or_else(|| TopicId::new_marker(&submission.type_id), TopicId::from);
        let rules = self
            .inner
            .rules(&topic_id, submission.view_id.as_deref())?;

        let mut changes = self.engine().change_set();

        Ok(self.inner.update_topic(&rules, submission, &mut changes)?)
    }

    pub fn add_field_values(
        &self,
        topic_id: &str,
        field_id: &str,
        values: &[SubmittedValue],
        index: Option<usize>,
    ) -> Result<Context, Error> {
        let rules = self.rules(topic_id, None)?;
        let field = rules.context().try_field(field_id)?;

        Ok(self.inner.add_field_values(&rules, field, values, index)?)
    }

    pub fn remove_field_values(
        &self,
        topic_id: &str,
        field_id: &str,
        values: &[SubmittedValue],
    ) -> Result<Context, Error> {
        let rules = self.rules(topic_id, None)?;
        let field = rules.context().try_field(field_id)?;

        Ok(self.inner.remove_field_values(&rules, field, values)?)
    }

    pub fn update_field_values(
        &self,
        topic_id: &str,
        submission: &FieldSubmission,
    ) -> Result<Context, Error> {
        let rules = self.rules(topic_id, None)?;

        Ok(self.inner.update_field_values(&rules, submission)?)
    }

    pub fn delete_topic(&self, topic_id: &str) -> Result<(), Error> {
        let rules = self.rules(topic_id, None)?;

        Ok(self.inner.delete_topic(&rules)?)
    }

    /// False when the uniqueness check of `field_id` finds another topic
    /// already holding the submitted values.
    pub fn validate_unique(
        &self,
        topic_id: &str,
        field_id: &str,
        submission: &TopicSubmission,
    ) -> Result<bool, Error> {
        let context = self.context(topic_id, None)?;
        let field = context.try_field(field_id)?;

        Ok(self.inner.validate_unique(&context, field, submission)?)
    }
}
