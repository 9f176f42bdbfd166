//! Nullable infrastructure for deterministic testing.
//!
//! Everything time-dependent in the DAO reads a [`hopestream_types::Clock`].
//! The implementations here are controlled programmatically so scenario
//! replays and tests never depend on the wall clock.

pub mod clock;

pub use clock::NullClock;
