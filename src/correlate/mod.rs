// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Leg correlation.

pub mod cache;
pub mod correlator;

pub use cache::TtlCache;
pub use correlator::LegCorrelator;
