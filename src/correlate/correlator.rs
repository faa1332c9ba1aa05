// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Pairs the two legs of a bridged call.
//!
//! The switch logs each leg separately and in no fixed order, so whichever
//! leg arrives first waits in its role's cache until the peer shows up or the
//! TTL runs out.
//!
//! # Invariants
//! - Lookup in the opposite cache and the insert/remove that follows happen
//!   under one lock, so two arrivals for the same key cannot interleave.
//! - A pair is produced at most once: the waiting entry is removed on match.
//! - Re-delivery of an unmatched leg replaces the waiting entry (last write wins).

use crate::clock::Clock;
use crate::correlate::cache::TtlCache;
use crate::types::{LegRecord, LegRole, MatchedPair};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

struct Pending {
    a_legs: TtlCache<String, LegRecord>,
    b_legs: TtlCache<String, LegRecord>,
}

pub struct LegCorrelator {
    pending: Mutex<Pending>,
}

impl LegCorrelator {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            pending: Mutex::new(Pending {
                a_legs: TtlCache::new(ttl, clock.clone()),
                b_legs: TtlCache::new(ttl, clock),
            }),
        }
    }

    /// Feed one leg. Returns the (A, B) pair when this leg completes a call.
    pub fn observe(&self, leg: LegRecord) -> Option<MatchedPair> {
        let key = leg.correlation_key().to_string();
        let mut pending = self.lock();

        match leg.role() {
            LegRole::A => match pending.b_legs.take(&key) {
                Some(b_leg) => Some(MatchedPair { a_leg: leg, b_leg }),
                None => {
                    pending.a_legs.insert(key, leg);
                    None
                }
            },
            LegRole::B => match pending.a_legs.take(&key) {
                Some(a_leg) => Some(MatchedPair { a_leg, b_leg: leg }),
                None => {
                    pending.b_legs.insert(key, leg);
                    None
                }
            },
        }
    }

    /// Evict expired legs from both caches.
    pub fn sweep(&self) -> usize {
        let mut pending = self.lock();
        pending.a_legs.sweep() + pending.b_legs.sweep()
    }

    /// (A-legs, B-legs) currently held.
    pub fn pending(&self) -> (usize, usize) {
        let pending = self.lock();
        (pending.a_legs.len(), pending.b_legs.len())
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
