//! Token frequency table that remembers first-seen order.

use crate::models::TopToken;
use ahash::AHashMap;

#[derive(Debug, Default)]
pub struct TokenCounts {
    slot_of: AHashMap<String, usize>,
    // (token, count) in the order tokens were first seen
    entries: Vec<(String, u64)>,
    total: u64,
}

impl TokenCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, token: &str) {
        self.total += 1;
        if let Some(&slot) = self.slot_of.get(token) {
            if let Some(entry) = self.entries.get_mut(slot) {
                entry.1 += 1;
            }
            return;
        }
        self.slot_of.insert(token.to_string(), self.entries.len());
        self.entries.push((token.to_string(), 1));
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn unique(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn get(&self, token: &str) -> u64 {
        self.slot_of.get(token).and_then(|&i| self.entries.get(i)).map_or(0, |e| e.1)
    }

    /// The `n` most frequent tokens, count descending; ties keep first-seen order.
    pub fn top_n(&self, n: usize) -> Vec<TopToken> {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        // stable sort on -count keeps the first-seen order for equal counts
        order.sort_by(|&a, &b| self.entries[b].1.cmp(&self.entries[a].1));
        order
            .into_iter()
            .take(n)
            .map(|i| TopToken::new(self.entries[i].0.clone(), self.entries[i].1))
            .collect()
    }
}
