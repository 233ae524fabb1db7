//! Integration test crate for Prism.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every prism crate to verify they work together.

#[cfg(test)]
mod color;

#[cfg(test)]
mod gpu;

#[cfg(test)]
mod player;
