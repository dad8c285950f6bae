//! src/history.rs
//!
//! @description
//! Commitment views over the test validator. The validator only knows its
//! latest state, so every account a transaction writes keeps a short
//! slot-stamped history here. Confirmed reads see the version `lag` slots
//! back and finalized reads the one `2 * lag` back.

use std::collections::HashMap;

use aces_orchestrator::{Account, Commitment};
use anchor_lang::prelude::Pubkey;

pub(crate) struct History {
    lag: u64,
    versions: HashMap<Pubkey, Vec<(u64, Option<Account>)>>,
}

impl History {
    pub fn new(lag: u64) -> Self {
        Self {
            lag,
            versions: HashMap::new(),
        }
    }

    pub fn slot_at(&self, head: u64, commitment: Commitment) -> u64 {
        match commitment {
            Commitment::Processed => head,
            Commitment::Confirmed => head.saturating_sub(self.lag),
            Commitment::Finalized => head.saturating_sub(2 * self.lag),
        }
    }

    pub fn is_tracked(&self, key: &Pubkey) -> bool {
        self.versions.contains_key(key)
    }

    /// Remembers what `key` held before its first tracked write.
    pub fn track(&mut self, key: Pubkey, before: Option<Account>) {
        self.versions.entry(key).or_insert_with(|| vec![(0, before)]);
    }

    /// Records the state of `key` after a write landed in `slot`.
    pub fn record(&mut self, key: Pubkey, slot: u64, after: Option<Account>) {
        let finalized = self.slot_at(slot, Commitment::Finalized);
        let versions = self.versions.entry(key).or_default();
        match versions.last_mut() {
            Some((last, value)) if *last == slot => *value = after,
            _ => versions.push((slot, after)),
        }
        let settled = versions
            .iter()
            .rposition(|(at, _)| *at <= finalized)
            .unwrap_or(0);
        versions.drain(..settled);
    }

    /// `key` as of the end of `slot`; `None` when it was never tracked.
    pub fn view(&self, key: &Pubkey, slot: u64) -> Option<Option<&Account>> {
        let versions = self.versions.get(key)?;
        Some(
            versions
                .iter()
                .rev()
                .find(|(at, _)| *at <= slot)
                .and_then(|(_, value)| value.as_ref()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(byte: u8) -> Option<Account> {
        Some(Account {
            owner: Pubkey::default(),
            data: vec![byte],
        })
    }

    #[test]
    fn test_writes_reach_each_commitment_in_order() {
        let mut history = History::new(1);
        let key = Pubkey::new_unique();
        history.track(key, None);
        history.record(key, 1, account(1));

        let head = 1;
        let at = |history: &History, commitment| {
            history
                .view(&key, history.slot_at(head, commitment))
                .unwrap()
                .cloned()
        };
        assert_eq!(at(&history, Commitment::Processed), account(1));
        assert_eq!(at(&history, Commitment::Confirmed), None);

        let head = 2;
        assert_eq!(history.view(&key, history.slot_at(head, Commitment::Confirmed)).unwrap().cloned(), account(1));
        assert_eq!(history.view(&key, history.slot_at(head, Commitment::Finalized)).unwrap(), None);
        let head = 3;
        assert_eq!(history.view(&key, history.slot_at(head, Commitment::Finalized)).unwrap().cloned(), account(1));
    }

    #[test]
    fn test_zero_lag_reads_the_latest_version() {
        let mut history = History::new(0);
        let key = Pubkey::new_unique();
        history.track(key, account(0));
        history.record(key, 4, account(1));
        let finalized = history.slot_at(4, Commitment::Finalized);
        assert_eq!(history.view(&key, finalized).unwrap().cloned(), account(1));
    }

    #[test]
    fn test_settled_versions_are_dropped() {
        let mut history = History::new(1);
        let key = Pubkey::new_unique();
        history.track(key, None);
        for slot in 1..=20 {
            history.record(key, slot, account(slot as u8));
        }
        assert_eq!(history.versions[&key].len(), 3);
        assert_eq!(history.view(&key, 18).unwrap().cloned(), account(18));
        assert!(history.view(&Pubkey::new_unique(), 18).is_none());
    }

    #[test]
    fn test_same_slot_writes_keep_the_last() {
        let mut history = History::new(1);
        let key = Pubkey::new_unique();
        history.record(key, 3, account(1));
        history.record(key, 3, account(2));
        assert_eq!(history.view(&key, 3).unwrap().cloned(), account(2));
    }
}
