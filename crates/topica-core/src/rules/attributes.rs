use crate::value::Value;
use std::collections::BTreeMap;

///
/// Attributes
///
/// Named value lists a field can take its initial values from, via the
/// `assignDefaultValues` key of its extra block.
///

#[derive(Clone, Debug, Default)]
pub struct Attributes {
    values: BTreeMap<String, Vec<Value>>,
}

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, values: Vec<Value>) {
        self.values.insert(key.into(), values);
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, values: Vec<Value>) -> Self {
        self.insert(key, values);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[Value]> {
        self.values.get(key).map(Vec::as_slice)
    }
}
