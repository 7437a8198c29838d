//! Builds swappers from a configuration and an allocator.

use std::sync::Arc;

use super::PoolSwapper;
use crate::buffer::{BufferProperties, GraphicBufferAllocator};
use crate::config::SwapperConfig;
use crate::error::{BufferError, BufferResult};

/// Allocates a pool and wraps it in a [`PoolSwapper`].
pub struct SwapperFactory {
    allocator: Arc<dyn GraphicBufferAllocator>,
}

impl SwapperFactory {
    /// Creates a factory over `allocator`.
    #[must_use]
    pub fn new(allocator: Arc<dyn GraphicBufferAllocator>) -> Self {
        Self { allocator }
    }

    /// Allocates `config.buffer_count` buffers with `properties` and builds a
    /// swapper over them. `properties.usage` is overridden by the config.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::InvalidConfig`] for a bad config, a back end
    /// mismatch or a format the allocator cannot produce, and propagates
    /// allocator failures.
    pub fn create_swapper(
        &self,
        config: &SwapperConfig,
        properties: BufferProperties,
    ) -> BufferResult<PoolSwapper> {
        config.validate()?;
        if self.allocator.backend() != config.backend {
            return Err(BufferError::InvalidConfig(format!(
                "configured for {:?} buffers but the allocator is {:?}",
                config.backend,
                self.allocator.backend()
            )));
        }
        if !self
            .allocator
            .supported_pixel_formats()
            .contains(&properties.format)
        {
            return Err(BufferError::InvalidConfig(format!(
                "allocator cannot produce {:?} buffers",
                properties.format
            )));
        }

        let properties = BufferProperties {
            usage: config.usage,
            ..properties
        };
        let buffers = (0..config.buffer_count)
            .map(|_| self.allocator.alloc_buffer(&properties))
            .collect::<BufferResult<Vec<_>>>()?;

        tracing::debug!(
            count = buffers.len(),
            size = %properties.size,
            format = ?properties.format,
            "swapper pool allocated"
        );
        PoolSwapper::new(config, buffers)
    }
}
