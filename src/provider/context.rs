//! Operation contexts handed to the client resolver.
//!
//! The host framework calls handlers either with a live resource object
//! (plan/apply) or with a persisted instance state (import, refresh of
//! legacy state). Both can name a namespace; [`OperationContext`] makes the
//! two shapes explicit so the resolver never has to guess.

use crate::provider::ProviderError;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Attribute holding the namespace an object lives in.
pub const FIELD_NAMESPACE: &str = "namespace";

/// Live resource object for the duration of one framework callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    id: String,
    attributes: Map<String, Value>,
}

impl ResourceData {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self {
            id: String::new(),
            attributes,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sets the object id. An empty id removes the object from state.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }

    /// String attribute, treating empty strings as unset.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }
}

/// Persisted instance state: a flat map of attribute strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceState {
    pub id: String,
    pub attributes: HashMap<String, String>,
}

/// The context a client is being resolved for.
#[derive(Debug, Clone, Copy)]
pub enum OperationContext<'a> {
    Resource(&'a ResourceData),
    State(&'a InstanceState),
}

impl OperationContext<'_> {
    /// Namespace named by the context, if any. Empty strings count as unset.
    pub fn namespace(&self) -> Option<&str> {
        let ns = match self {
            OperationContext::Resource(d) => d.get_str(FIELD_NAMESPACE),
            OperationContext::State(s) => s.attributes.get(FIELD_NAMESPACE).map(String::as_str),
        };
        ns.filter(|ns| !ns.is_empty())
    }
}

impl<'a> From<&'a ResourceData> for OperationContext<'a> {
    fn from(d: &'a ResourceData) -> Self {
        OperationContext::Resource(d)
    }
}

impl<'a> From<&'a InstanceState> for OperationContext<'a> {
    fn from(s: &'a InstanceState) -> Self {
        OperationContext::State(s)
    }
}

/// An owned context decoded from a framework payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedContext {
    Resource(ResourceData),
    State(InstanceState),
}

impl DecodedContext {
    pub fn as_context(&self) -> OperationContext<'_> {
        match self {
            DecodedContext::Resource(d) => OperationContext::Resource(d),
            DecodedContext::State(s) => OperationContext::State(s),
        }
    }
}

impl TryFrom<&Value> for DecodedContext {
    type Error = ProviderError;

    /// Decodes `{"id": .., "config": {..}}` as a live object and
    /// `{"id": .., "attributes": {..}}` as persisted state.
    fn try_from(payload: &Value) -> Result<Self, Self::Error> {
        let obj = payload.as_object().ok_or_else(|| {
            ProviderError::UnsupportedContext(format!("expected an object, got {}", payload))
        })?;
        let id = obj
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        if let Some(config) = obj.get("config").and_then(|v| v.as_object()) {
            let mut data = ResourceData::new(config.clone());
            data.set_id(id);
            return Ok(DecodedContext::Resource(data));
        }

        if let Some(attrs) = obj.get("attributes").and_then(|v| v.as_object()) {
            let attributes = attrs
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect();
            return Ok(DecodedContext::State(InstanceState { id, attributes }));
        }

        Err(ProviderError::UnsupportedContext(format!(
            "object with neither config nor attributes (keys: {:?})",
            obj.keys().collect::<Vec<_>>()
        )))
    }
}
