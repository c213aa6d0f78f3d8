//! Test utilities for runtime testing
//!
//! Shared by the unit tests of every runtime module without going through
//! the loader.
