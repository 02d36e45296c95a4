//! Kani proof harnesses over `model_safety::crisis`.
//!
//! Run with `cargo kani -p proofs-kani`. Each module proves one group of
//! invariants documented on `model_safety::crisis`: solvency, monotone
//! scales, bounded burns, and idempotent/conserving materialization.
//! Harnesses are compiled only under `cfg(kani)`; an ordinary `cargo
//! build` sees an empty crate.

#[cfg(kani)]
mod crisis_haircut;

#[cfg(kani)]
mod crisis_materialize;
