//! Type handler registry
//!
//! Maps each frame type tag to the handler that turns a completed envelope
//! into a `ChannelFrame`. Populated once while the engine is built.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use contracts::{ChannelFrame, ContractError, FrameCategory, FrameEnvelope, TypeTag};

use crate::classifier::SyncWordClassifier;

/// Turns completed envelopes of one type into frames
pub trait FrameHandler: Send + Sync {
    /// Handler name (diagnostics)
    fn name(&self) -> &str;

    /// Category of every frame this handler produces
    fn category(&self) -> FrameCategory;

    /// Parse a completed envelope
    ///
    /// The envelope borrows the parser's buffer; copy what must outlive the call.
    fn parse(&self, envelope: &FrameEnvelope<'_>) -> Result<ChannelFrame, ContractError>;
}

/// Handler for sync-word envelopes: extracts the id code and body
#[derive(Debug, Clone)]
pub struct EnvelopeHandler {
    name: String,
    category: FrameCategory,
}

impl EnvelopeHandler {
    pub fn new(name: impl Into<String>, category: FrameCategory) -> Self {
        Self {
            name: name.into(),
            category,
        }
    }

    /// Handlers for the standard synchrophasor frame types
    ///
    /// 0 = data, 1 = header, 2/3/5 = configuration (v1, v2, v3), 4 = command.
    pub fn standard_set() -> Vec<(TypeTag, Arc<dyn FrameHandler>)> {
        let handler = |name: &str, category| -> Arc<dyn FrameHandler> {
            Arc::new(EnvelopeHandler::new(name, category))
        };
        vec![
            (TypeTag(0), handler("data", FrameCategory::Data)),
            (TypeTag(1), handler("header", FrameCategory::Header)),
            (TypeTag(2), handler("config1", FrameCategory::Configuration)),
            (TypeTag(3), handler("config2", FrameCategory::Configuration)),
            (TypeTag(4), handler("command", FrameCategory::Command)),
            (TypeTag(5), handler("config3", FrameCategory::Configuration)),
        ]
    }
}

impl FrameHandler for EnvelopeHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> FrameCategory {
        self.category
    }

    fn parse(&self, envelope: &FrameEnvelope<'_>) -> Result<ChannelFrame, ContractError> {
        let image = envelope.image();
        Ok(ChannelFrame {
            category: self.category,
            type_tag: envelope.type_tag,
            source: envelope.source.clone(),
            id_code: SyncWordClassifier::id_code(image),
            payload: Bytes::copy_from_slice(SyncWordClassifier::body(image)),
        })
    }
}

/// `TypeTag -> FrameHandler`, first registration wins
#[derive(Default)]
pub struct TypeHandlerRegistry {
    handlers: HashMap<TypeTag, Arc<dyn FrameHandler>>,
}

impl TypeHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler
    ///
    /// # Errors
    /// `DuplicateTypeRegistration` when the tag is taken; the existing
    /// handler is kept.
    pub fn register(
        &mut self,
        type_tag: TypeTag,
        handler: Arc<dyn FrameHandler>,
    ) -> Result<(), ContractError> {
        if self.handlers.contains_key(&type_tag) {
            return Err(ContractError::DuplicateTypeRegistration {
                type_tag: type_tag.to_string(),
                handler: handler.name().to_string(),
            });
        }
        self.handlers.insert(type_tag, handler);
        Ok(())
    }

    pub fn get(&self, type_tag: TypeTag) -> Option<&Arc<dyn FrameHandler>> {
        self.handlers.get(&type_tag)
    }

    /// Category of a tag, `Undetermined` when unregistered
    pub fn category(&self, type_tag: TypeTag) -> FrameCategory {
        self.get(type_tag)
            .map_or(FrameCategory::Undetermined, |h| h.category())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered tags in ascending order
    pub fn tags(&self) -> Vec<TypeTag> {
        let mut tags: Vec<_> = self.handlers.keys().copied().collect();
        tags.sort();
        tags
    }
}

impl fmt::Debug for TypeHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandlerRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}
