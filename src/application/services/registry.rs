//! Ordered registry of mappers, fetchers and decoders.

use std::sync::Arc;

use tracing::trace;

use crate::domain::entities::{RequestData, Size};
use crate::domain::ports::{Decoder, Fetcher, Mapper, MeasuredMapper};

/// Pluggable strategies, consulted in registration order.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    measured_mappers: Vec<Arc<dyn MeasuredMapper>>,
    mappers: Vec<Arc<dyn Mapper>>,
    fetchers: Vec<Arc<dyn Fetcher>>,
    decoders: Vec<Arc<dyn Decoder>>,
}

impl ComponentRegistry {
    /// Starts an empty registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Runs `data` through the mapper chain.
    ///
    /// Size-aware mappers run first, then size-agnostic ones. Each mapper is
    /// tested against the output of the previous one, so mappings chain.
    #[must_use]
    pub fn map(&self, data: RequestData, size: Size) -> RequestData {
        let mut mapped = data;
        for mapper in &self.measured_mappers {
            if mapper.handles(&mapped) {
                mapped = mapper.map(&mapped, size);
                trace!(kind = mapped.kind(), "Applied measured mapper");
            }
        }
        for mapper in &self.mappers {
            if mapper.handles(&mapped) {
                mapped = mapper.map(&mapped);
                trace!(kind = mapped.kind(), "Applied mapper");
            }
        }
        mapped
    }

    /// Returns the first fetcher that handles `data`.
    #[must_use]
    pub fn fetcher_for(&self, data: &RequestData) -> Option<Arc<dyn Fetcher>> {
        self.fetchers.iter().find(|f| f.handles(data)).cloned()
    }

    /// Returns the first decoder that handles the content type.
    #[must_use]
    pub fn decoder_for(&self, mime_type: Option<&str>) -> Option<Arc<dyn Decoder>> {
        self.decoders.iter().find(|d| d.handles(mime_type)).cloned()
    }

    /// Returns a builder seeded with this registry's components.
    #[must_use]
    pub fn new_builder(&self) -> RegistryBuilder {
        RegistryBuilder {
            registry: self.clone(),
        }
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("measured_mappers", &self.measured_mappers.len())
            .field("mappers", &self.mappers.len())
            .field("fetchers", &self.fetchers.len())
            .field("decoders", &self.decoders.len())
            .finish()
    }
}

/// Builder for [`ComponentRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    registry: ComponentRegistry,
}

impl RegistryBuilder {
    /// Appends a size-agnostic mapper.
    #[must_use]
    pub fn mapper(mut self, mapper: Arc<dyn Mapper>) -> Self {
        self.registry.mappers.push(mapper);
        self
    }

    /// Appends a size-aware mapper.
    #[must_use]
    pub fn measured_mapper(mut self, mapper: Arc<dyn MeasuredMapper>) -> Self {
        self.registry.measured_mappers.push(mapper);
        self
    }

    /// Appends a fetcher.
    #[must_use]
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.registry.fetchers.push(fetcher);
        self
    }

    /// Appends a decoder.
    #[must_use]
    pub fn decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.registry.decoders.push(decoder);
        self
    }

    /// Finishes the registry.
    #[must_use]
    pub fn build(self) -> ComponentRegistry {
        self.registry
    }
}
