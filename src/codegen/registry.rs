//! Custom Backend Registry
//!
//! `custom` targets name a factory; embedders register factories here before
//! running. Factories are looked up by name when a target's handler is created.

use std::collections::{BTreeMap, HashMap};

use super::{HandlerContext, SchemaHandler};
use crate::error::{Result, SchemaError};

/// Creates handlers for one custom backend
pub trait SchemaHandlerFactory: Send + Sync {
    fn create<'a>(
        &self,
        options: &BTreeMap<String, String>,
        ctx: HandlerContext<'a>,
    ) -> Result<Box<dyn SchemaHandler + 'a>>;
}

/// Name → custom handler factory
#[derive(Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, Box<dyn SchemaHandlerFactory>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, factory: impl SchemaHandlerFactory + 'static) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn get(&self, name: &str) -> Option<&dyn SchemaHandlerFactory> {
        self.factories.get(name).map(|factory| factory.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn create<'a>(
        &self,
        name: &str,
        options: &BTreeMap<String, String>,
        ctx: HandlerContext<'a>,
    ) -> Result<Box<dyn SchemaHandler + 'a>> {
        let factory = self
            .get(name)
            .ok_or_else(|| SchemaError::UnregisteredBackend(name.to_string()))?;
        factory.create(options, ctx)
    }
}
