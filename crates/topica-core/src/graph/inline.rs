use crate::{
    model::{FieldModel, TypeModel},
    value::{Topic, TopicId, Value},
};

///
/// InlineTopicBuilder
///
/// Assembles an inline topic. There is no persistence call; the result is
/// stored by setting it as a value on its owner.
///

#[derive(Debug)]
pub struct InlineTopicBuilder {
    topic: Topic,
}

impl InlineTopicBuilder {
    /// Start an inline topic of `ty`; a fresh id is minted when none is given.
    #[must_use]
    pub fn new(ty: &TypeModel, id: Option<TopicId>) -> Self {
        let id = id.unwrap_or_else(TopicId::generate);

        Self {
            topic: Topic::new_inline(id, ty.id.clone()),
        }
    }

    pub fn set_values(&mut self, field: &FieldModel, values: Vec<Value>) -> &mut Self {
        self.topic.set_values(field.actual_id(), values);
        self
    }

    #[must_use]
    pub fn build(self) -> Topic {
        self.topic
    }
}
