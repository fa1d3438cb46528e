//! # fairbatch-types
//!
//! Shared types, errors, and configuration for the **FairBatch** auction engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`ParticipantId`], [`BatchId`], [`CommitmentId`], [`DomainId`], [`MarketPair`]
//! - **Batch model**: [`Batch`], [`BatchPhase`], [`ExecutionOrder`], [`SettlementReport`]
//! - **Commitment model**: [`Commitment`], [`CommitmentStatus`]
//! - **Order model**: [`OrderFields`], [`RevealedOrder`], [`commitment_hash`]
//! - **Market model**: [`Reserves`], [`PricedOrder`], [`ClearingResult`], [`FillResult`]
//! - **Configuration**: [`AuctionConfig`]
//! - **Errors**: [`FairbatchError`] with `FB_ERR_` prefix codes
//! - **Fixed point**: [`Amount`], [`Price`] and the helpers in [`fixed`]

pub mod batch;
pub mod commitment;
pub mod config;
pub mod constants;
pub mod error;
pub mod fixed;
pub mod ids;
pub mod market;
pub mod order;

pub use batch::*;
pub use commitment::*;
pub use config::*;
pub use error::*;
pub use fixed::{Amount, Price};
pub use ids::*;
pub use market::*;
pub use order::*;

// Constants and fixed-point helpers are accessed via their modules
// (`fairbatch_types::constants::WAD`, `fairbatch_types::fixed::mul_div`).
