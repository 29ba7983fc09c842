// src/core/pool.rs — Candidate pool with value-keyed dedup

use std::collections::HashMap;

use super::types::Candidate;

/// Ordered collection of candidates for one item-run.
///
/// After `dedup` no two retained candidates share a `dedup_key`.
#[derive(Debug, Clone, Default)]
pub struct Pool {
    entries: Vec<Candidate>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: Candidate) {
        self.entries.push(candidate);
    }

    /// Keep only the highest-scoring candidate per key. Equal scores keep the
    /// earlier one; survivors keep first-occurrence order of their key.
    pub fn dedup(&mut self) {
        let mut slot_of: HashMap<String, usize> = HashMap::new();
        let mut kept: Vec<Candidate> = Vec::with_capacity(self.entries.len());

        for cand in self.entries.drain(..) {
            let key = cand.dedup_key();
            match slot_of.get(&key) {
                Some(&i) => {
                    if cand.score() > kept[i].score() {
                        kept[i] = cand;
                    }
                }
                None => {
                    slot_of.insert(key, kept.len());
                    kept.push(cand);
                }
            }
        }

        self.entries = kept;
    }

    /// Stable descending sort by score.
    pub fn sort_by_score(&mut self) {
        self.entries.sort_by(|a, b| b.score().total_cmp(&a.score()));
    }

    /// First `n` entries in current order (call `sort_by_score` first).
    pub fn top(&self, n: usize) -> &[Candidate] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.entries.first()
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.entries.iter()
    }
}
