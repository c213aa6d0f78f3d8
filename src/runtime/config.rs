//! Machine construction parameters
//!
//! Besides the initial memory size and the call depth limit, two switches
//! select between the WebAssembly semantics and the behaviour of the older
//! reference interpreter that first ran these programs.

use super::memory::PAGE_SIZE;
use serde::Deserialize;

/// What `memory.grow` pushes on success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowResult {
    /// Page count after growth, as the reference interpreter does
    #[default]
    NewSize,
    /// Page count before growth, as WebAssembly specifies
    PreviousSize,
}

/// Rounding of signed integer division and the matching remainder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignedDivision {
    /// Round toward zero; the remainder takes the dividend's sign
    #[default]
    Truncate,
    /// Round toward negative infinity; the remainder takes the divisor's sign
    Floor,
}

pub const DEFAULT_MEMORY_BYTES: usize = PAGE_SIZE;
pub const DEFAULT_MAX_CALL_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Initial linear memory size in bytes
    pub memory_bytes: usize,
    pub grow_result: GrowResult,
    pub signed_division: SignedDivision,
    /// Deepest allowed nesting of calls, the top-level call included
    ///
    /// Every active block, loop and if takes a level from the same budget,
    /// since each one is a native stack frame too.
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            memory_bytes: DEFAULT_MEMORY_BYTES,
            grow_result: GrowResult::default(),
            signed_division: SignedDivision::default(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for [`Config`]
///
/// ```
/// use minwasm::runtime::config::{Config, GrowResult};
///
/// let config = Config::builder()
///     .memory_pages(2)
///     .grow_result(GrowResult::PreviousSize)
///     .build();
/// assert_eq!(config.memory_bytes, 131072);
/// ```
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn memory_bytes(mut self, bytes: usize) -> Self {
        self.config.memory_bytes = bytes;
        self
    }

    pub fn memory_pages(mut self, pages: usize) -> Self {
        self.config.memory_bytes = pages * PAGE_SIZE;
        self
    }

    pub fn grow_result(mut self, grow_result: GrowResult) -> Self {
        self.config.grow_result = grow_result;
        self
    }

    pub fn signed_division(mut self, signed_division: SignedDivision) -> Self {
        self.config.signed_division = signed_division;
        self
    }

    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.config.max_call_depth = depth;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.memory_bytes, 65536);
        assert_eq!(config.grow_result, GrowResult::NewSize);
        assert_eq!(config.signed_division, SignedDivision::Truncate);
        assert_eq!(config.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
    }

    #[test]
    fn builder_overrides() {
        let config = Config::builder()
            .memory_bytes(100)
            .signed_division(SignedDivision::Floor)
            .max_call_depth(8)
            .build();
        assert_eq!(config.memory_bytes, 100);
        assert_eq!(config.signed_division, SignedDivision::Floor);
        assert_eq!(config.max_call_depth, 8);
        assert_eq!(config.grow_result, GrowResult::NewSize);
    }

    #[test]
    fn deserialize_partial() {
        let config: Config = serde_json::from_str(r#"{"max_call_depth": 3}"#).unwrap();
        assert_eq!(config.max_call_depth, 3);
        assert_eq!(config.memory_bytes, DEFAULT_MEMORY_BYTES);

        assert!(serde_json::from_str::<Config>(r#"{"memroy_bytes": 3}"#).is_err());
    }
}
