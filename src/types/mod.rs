// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Wire types decoded from the switch's CDR stream.

pub mod leg;

pub use leg::{LegRecord, LegRole, MatchedPair};
