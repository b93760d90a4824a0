//! The auto-responder core.
//!
//! This module provides the trigger-matching and delivery pipeline:
//! - Loading and normalizing per-guild trigger configuration
//! - Matching content against triggers and evaluating filters
//! - Resolving and invoking pluggable responders
//! - Delivering responses across channel/reply/DM targets

pub mod config_loader;
pub mod delivery;
pub mod engine;
pub mod matching;
pub mod registry;
