//! The UTXO store: an in-memory map from `(tx_id, output_index)` to an
//! unspent output record. It carries no persistence contract of its own —
//! it is rebuildable by replaying the chain from genesis — and is owned
//! exclusively by the [`crate::blockchain::Blockchain`] instance.

use serde::{Deserialize, Serialize};
use shared::{Address, Amount, OutPoint, OutputIndex, TxId};
use std::collections::HashMap;

/// A single unspent (or formerly-unspent, retained for referential
/// lookups) transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub tx_id: TxId,
    pub output_index: OutputIndex,
    pub amount: Amount,
    pub owner: Address,
    pub is_spent: bool,
}

impl Utxo {
    #[must_use]
    pub const fn new(tx_id: TxId, output_index: OutputIndex, amount: Amount, owner: Address) -> Self {
        Self {
            tx_id,
            output_index,
            amount,
            owner,
            is_spent: false,
        }
    }

    #[must_use]
    pub const fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.tx_id, self.output_index)
    }
}

/// `(tx_id, output_index) -> Utxo`. Spent entries are retained, marked
/// `is_spent`, rather than removed, so other transactions can still refer
/// to the outpoint when checking "already spent" instead of "never
/// existed".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UtxoSet {
    entries: HashMap<OutPoint, Utxo>,
}

impl UtxoSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, utxo: Utxo) {
        self.entries.insert(utxo.outpoint(), utxo);
    }

    #[must_use]
    pub fn get(&self, tx_id: &TxId, output_index: OutputIndex) -> Option<&Utxo> {
        self.entries.get(&OutPoint::new(*tx_id, output_index))
    }

    /// Marks the referenced entry spent. Returns `false` if the entry
    /// doesn't exist or was already spent — a caller relying on a second
    /// spend being a silent no-op has a bug, per the store's contract.
    pub fn spend(&mut self, tx_id: &TxId, output_index: OutputIndex) -> bool {
        match self.entries.get_mut(&OutPoint::new(*tx_id, output_index)) {
            Some(utxo) if !utxo.is_spent => {
                utxo.is_spent = true;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_unspent(&self, tx_id: &TxId, output_index: OutputIndex) -> bool {
        self.get(tx_id, output_index)
            .is_some_and(|utxo| !utxo.is_spent)
    }

    /// All unspent outputs owned by `address`.
    #[must_use]
    pub fn utxos_for(&self, address: &str) -> Vec<&Utxo> {
        self.entries
            .values()
            .filter(|utxo| !utxo.is_spent && utxo.owner == address)
            .collect()
    }

    /// Sum of unspent output amounts owned by `address`.
    #[must_use]
    pub fn balance(&self, address: &str) -> u64 {
        self.utxos_for(address).iter().map(|utxo| utxo.amount).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, spent and unspent alike, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Utxo> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Hash256;

    fn tx_id(seed: &str) -> TxId {
        Hash256::sha256(seed.as_bytes())
    }

    #[test]
    fn add_then_get_round_trips() {
        let mut set = UtxoSet::new();
        let utxo = Utxo::new(tx_id("tx1"), 0, 100, "alice".to_string());
        set.add(utxo.clone());

        assert_eq!(set.get(&tx_id("tx1"), 0), Some(&utxo));
    }

    #[test]
    fn spend_marks_spent_and_rejects_a_second_spend() {
        let mut set = UtxoSet::new();
        set.add(Utxo::new(tx_id("tx1"), 0, 100, "alice".to_string()));

        assert!(set.spend(&tx_id("tx1"), 0));
        assert!(!set.is_unspent(&tx_id("tx1"), 0));
        assert!(!set.spend(&tx_id("tx1"), 0));
    }

    #[test]
    fn spend_on_missing_entry_returns_false() {
        let mut set = UtxoSet::new();
        assert!(!set.spend(&tx_id("ghost"), 0));
    }

    #[test]
    fn balance_sums_only_unspent_outputs_for_the_address() {
        let mut set = UtxoSet::new();
        set.add(Utxo::new(tx_id("tx1"), 0, 100, "alice".to_string()));
        set.add(Utxo::new(tx_id("tx2"), 0, 50, "alice".to_string()));
        set.add(Utxo::new(tx_id("tx3"), 0, 900, "bob".to_string()));

        assert_eq!(set.balance("alice"), 150);

        set.spend(&tx_id("tx1"), 0);
        assert_eq!(set.balance("alice"), 50);
    }

    #[test]
    fn utxos_for_excludes_spent_entries() {
        let mut set = UtxoSet::new();
        set.add(Utxo::new(tx_id("tx1"), 0, 100, "alice".to_string()));
        set.spend(&tx_id("tx1"), 0);

        assert!(set.utxos_for("alice").is_empty());
    }
}
