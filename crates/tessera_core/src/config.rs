//! # Swapper Configuration
//!
//! Buffering depth and allocator choice, injected once by the bootstrap
//! layer and frozen for the lifetime of the swapper.
//!
//! ```toml
//! buffer_count = 3
//! backend = "software"
//! usage = "software"
//! ```

use serde::{Deserialize, Serialize};
use tessera_shared::{DEFAULT_BUFFER_COUNT, MAX_BUFFER_COUNT, MIN_BUFFER_COUNT};

use crate::buffer::BufferUsage;
use crate::error::{BufferError, BufferResult};

/// Which native allocator back end produces the pool's buffers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocatorBackend {
    /// Hardware graphics HAL (gralloc-style handles, lock/unlock, fences).
    #[default]
    Hardware,
    /// Plain CPU memory.
    Software,
}

/// Frozen swapper configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SwapperConfig {
    /// Pool depth: 1 (single), 2 (double) or 3 (triple).
    pub buffer_count: usize,
    /// Allocator back end.
    pub backend: AllocatorBackend,
    /// Usage requested for every buffer in the pool.
    pub usage: BufferUsage,
}

impl Default for SwapperConfig {
    fn default() -> Self {
        Self {
            buffer_count: DEFAULT_BUFFER_COUNT,
            backend: AllocatorBackend::Hardware,
            usage: BufferUsage::HardwareComposited,
        }
    }
}

impl SwapperConfig {
    /// Double buffering on the hardware back end.
    #[must_use]
    pub fn double_buffered() -> Self {
        Self::default()
    }

    /// Triple buffering on the hardware back end.
    #[must_use]
    pub fn triple_buffered() -> Self {
        Self {
            buffer_count: MAX_BUFFER_COUNT,
            ..Self::default()
        }
    }

    /// Sets the back end (and the matching usage for software).
    #[must_use]
    pub fn with_backend(mut self, backend: AllocatorBackend) -> Self {
        self.backend = backend;
        if backend == AllocatorBackend::Software {
            self.usage = BufferUsage::Software;
        }
        self
    }

    /// Sets the pool depth.
    #[must_use]
    pub fn with_buffer_count(mut self, buffer_count: usize) -> Self {
        self.buffer_count = buffer_count;
        self
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::InvalidConfig`] on malformed TOML, unknown keys or
    /// an out-of-range pool depth.
    pub fn from_toml_str(source: &str) -> BufferResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| BufferError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the pool depth.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::InvalidConfig`] if `buffer_count` is outside 1..=3.
    pub fn validate(&self) -> BufferResult<()> {
        if !(MIN_BUFFER_COUNT..=MAX_BUFFER_COUNT).contains(&self.buffer_count) {
            return Err(BufferError::InvalidConfig(format!(
                "buffer_count must be between {MIN_BUFFER_COUNT} and {MAX_BUFFER_COUNT}, got {}",
                self.buffer_count
            )));
        }
        Ok(())
    }

    /// How many buffers the producer may hold at once.
    ///
    /// One for single and double buffering; triple buffering lets the
    /// producer run one frame ahead (N - 1).
    #[must_use]
    pub const fn max_producer_buffers(&self) -> usize {
        if self.buffer_count >= MAX_BUFFER_COUNT {
            self.buffer_count - 1
        } else {
            1
        }
    }
}
