//! Orders liquidation candidates by how far underwater they are —
//! worst health first, so a capacity-limited batch (spec.md
//! `max_liquidations_per_batch`) always covers the accounts that need
//! it most.

use crate::health::UserHealth;
use priority_queue::PriorityQueue;
use solana_sdk::pubkey::Pubkey;
use std::cmp::Reverse;
use std::collections::HashMap;

pub struct HealthQueue {
    heap: PriorityQueue<Pubkey, Reverse<i128>>,
    details: HashMap<Pubkey, UserHealth>,
}

impl HealthQueue {
    pub fn new() -> Self {
        HealthQueue {
            heap: PriorityQueue::new(),
            details: HashMap::new(),
        }
    }

    pub fn push(&mut self, health: UserHealth) {
        self.heap.push(health.user, Reverse(health.health));
        self.details.insert(health.user, health);
    }

    pub fn remove(&mut self, user: &Pubkey) {
        self.heap.remove(user);
        self.details.remove(user);
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn peek(&self) -> Option<&UserHealth> {
        let (user, _) = self.heap.peek()?;
        self.details.get(user)
    }

    /// All entries at or below `threshold`, worst-first.
    pub fn get_liquidatable(&self, threshold: i128) -> Vec<UserHealth> {
        let mut out: Vec<UserHealth> = self
            .details
            .values()
            .filter(|h| h.health <= threshold)
            .cloned()
            .collect();
        out.sort_by_key(|h| h.health);
        out
    }
}

impl Default for HealthQueue {
    fn default() -> Self {
        Self::new()
    }
}
