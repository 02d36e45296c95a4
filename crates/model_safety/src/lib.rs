//! O(1) crisis loss-socialization reference model
//!
//! Standalone satellite crate modeling the risk engine's global-scale
//! haircut and lazy per-user reconciliation algorithm in isolation from
//! the on-chain slab layout, so its safety invariants can be proven with
//! Kani without pulling in Solana account plumbing. See [`crisis`] for
//! the model itself.

#![cfg_attr(not(test), no_std)]

pub mod crisis;
