//! The transaction model: a tagged `{regular, coinbase, contract}` variant
//! over a common input/output shape, with per-input signatures that bind
//! the output vector and the specific input index they authorize.

use crate::contract::{ContractCall, ContractCode};
use crate::error::{CoreError, Result};
use crate::keystore::Keystore;
use crate::utxo::UtxoSet;
use serde::{Deserialize, Serialize};
use shared::{canonical_bytes, canonical_hash, Address, Amount, KeyPair, Signature, Timestamp, TxId};

/// The sentinel address a mining fee is paid to before the block producer
/// sweeps it up in the coinbase, matching the reference's `MINERS`
/// constant.
pub const MINERS_ADDRESS: &str = "MINERS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Regular,
    Coinbase,
    Contract,
}

/// A deploy or execute call bundled into a contract transaction's body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractData {
    Deploy {
        code: ContractCode,
        init_params: Vec<String>,
    },
    Execute(ContractCall),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub tx_id: TxId,
    pub output_index: u32,
    pub signature: Option<Signature>,
}

impl TxInput {
    #[must_use]
    pub const fn unsigned(tx_id: TxId, output_index: u32) -> Self {
        Self {
            tx_id,
            output_index,
            signature: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub amount: Amount,
    pub recipient: Address,
}

impl TxOutput {
    #[must_use]
    pub const fn new(amount: Amount, recipient: Address) -> Self {
        Self { amount, recipient }
    }
}

/// The fields that participate in a transaction's hash. Per-input
/// signatures are deliberately excluded: the signing payload for each
/// input names the transaction's id, so the id must be stable before any
/// signature is attached.
#[derive(Serialize)]
struct HashableInput {
    tx_id: TxId,
    output_index: u32,
}

#[derive(Serialize)]
struct HashableBody<'a> {
    inputs: Vec<HashableInput>,
    outputs: &'a [TxOutput],
    timestamp: Timestamp,
    tx_type: &'a TransactionType,
    contract_data: &'a Option<ContractData>,
}

/// The canonical, per-input signing payload: binds the transaction id,
/// which input is being authorized, the owner of the UTXO it spends, and
/// the full output vector — so a signature can't be replayed onto a
/// different input and can't be reused after the outputs are redirected.
#[derive(Serialize)]
struct SigningPayload<'a> {
    tx_id: TxId,
    input_index: usize,
    utxo_owner: &'a Address,
    outputs: &'a [TxOutput],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub timestamp: Timestamp,
    pub tx_type: TransactionType,
    pub contract_data: Option<ContractData>,
}

impl Transaction {
    fn compute_id(
        inputs: &[TxInput],
        outputs: &[TxOutput],
        timestamp: Timestamp,
        tx_type: &TransactionType,
        contract_data: &Option<ContractData>,
    ) -> Result<TxId> {
        let hashable = HashableBody {
            inputs: inputs
                .iter()
                .map(|input| HashableInput {
                    tx_id: input.tx_id,
                    output_index: input.output_index,
                })
                .collect(),
            outputs,
            timestamp,
            tx_type,
            contract_data,
        };
        Ok(canonical_hash(&hashable).map_err(|e| {
            shared::BlockchainError::SerializationError(e.to_string())
        })?)
    }

    /// A no-input, single-output transaction minting `amount` to `miner`.
    /// Always valid: [`is_valid`](Self::is_valid) returns `true`
    /// unconditionally for coinbase transactions.
    #[must_use]
    pub fn coinbase(amount: Amount, miner: Address, timestamp: Timestamp) -> Self {
        let outputs = vec![TxOutput::new(amount, miner)];
        let id = Self::compute_id(&[], &outputs, timestamp, &TransactionType::Coinbase, &None)
            .expect("coinbase transactions always serialize");
        Self {
            id,
            inputs: vec![],
            outputs,
            timestamp,
            tx_type: TransactionType::Coinbase,
            contract_data: None,
        }
    }

    /// Builds a contract transaction for `sender`: a fee output to
    /// [`MINERS_ADDRESS`] is added first, then enough of `sender`'s UTXOs
    /// are selected to cover `fee`, then a change output for any
    /// remainder — in that order, matching the reference's
    /// `create_contract_transaction`. The returned transaction's inputs
    /// are unsigned; the caller signs each one afterward.
    ///
    /// # Errors
    /// Returns an error if `sender` doesn't have enough unspent value to
    /// cover `fee`.
    pub fn contract_transaction(
        contract_data: ContractData,
        sender: &Address,
        utxo_set: &UtxoSet,
        fee: Amount,
        timestamp: Timestamp,
    ) -> Result<Self> {
        let mut outputs = vec![TxOutput::new(fee, MINERS_ADDRESS.to_string())];

        let mut selected = Vec::new();
        let mut total: u64 = 0;
        for utxo in utxo_set.utxos_for(sender) {
            selected.push(utxo);
            total = total.saturating_add(utxo.amount);
            if total >= fee {
                break;
            }
        }
        if total < fee {
            return Err(CoreError::InsufficientFunds {
                needed: fee,
                available: total,
            });
        }
        if total > fee {
            outputs.push(TxOutput::new(total - fee, sender.clone()));
        }

        let inputs: Vec<TxInput> = selected
            .iter()
            .map(|utxo| TxInput::unsigned(utxo.tx_id, utxo.output_index))
            .collect();

        let id = Self::compute_id(
            &inputs,
            &outputs,
            timestamp,
            &TransactionType::Contract,
            &Some(contract_data.clone()),
        )?;

        Ok(Self {
            id,
            inputs,
            outputs,
            timestamp,
            tx_type: TransactionType::Contract,
            contract_data: Some(contract_data),
        })
    }

    /// Signs input `input_index` with `keypair`, over the canonical
    /// `{tx_id, input_index, utxo_owner, outputs}` payload.
    ///
    /// # Errors
    /// Returns an error if `input_index` is out of range or signing fails.
    pub fn sign_input(
        &mut self,
        input_index: usize,
        utxo_owner: &Address,
        keypair: &KeyPair,
    ) -> Result<()> {
        if input_index >= self.inputs.len() {
            return Err(CoreError::UtxoMissing {
                tx_id: self.id.to_string(),
                output_index: input_index as u32,
            });
        }
        let payload = SigningPayload {
            tx_id: self.id,
            input_index,
            utxo_owner,
            outputs: &self.outputs,
        };
        let bytes = canonical_bytes(&payload)
            .map_err(|e| shared::BlockchainError::SerializationError(e.to_string()))?;
        let signature = keypair
            .sign(&bytes)
            .map_err(CoreError::Shared)?;
        self.inputs[input_index].signature = Some(signature);
        Ok(())
    }

    #[must_use]
    pub fn is_coinbase(&self) -> bool {
        matches!(self.tx_type, TransactionType::Coinbase)
    }

    #[must_use]
    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount).sum()
    }

    /// Structural and cryptographic validity against `utxo_set` and
    /// `keystore`. Coinbase transactions are always valid. Otherwise:
    /// at least one input and output; every input references an existing,
    /// unspent UTXO; every input's signature verifies against its owner's
    /// registered public key; and the sum of inputs is at least the sum
    /// of outputs (the difference is the implicit fee).
    #[must_use]
    pub fn is_valid(&self, utxo_set: &UtxoSet, keystore: &dyn Keystore) -> bool {
        if self.is_coinbase() {
            return true;
        }
        if self.inputs.is_empty() || self.outputs.is_empty() {
            return false;
        }

        let mut total_input = 0u64;
        for (index, input) in self.inputs.iter().enumerate() {
            let Some(utxo) = utxo_set.get(&input.tx_id, input.output_index) else {
                return false;
            };
            if utxo.is_spent {
                return false;
            }
            let Some(public_key) = keystore.public_key_of(&utxo.owner) else {
                return false;
            };
            let Some(signature) = &input.signature else {
                return false;
            };
            let payload = SigningPayload {
                tx_id: self.id,
                input_index: index,
                utxo_owner: &utxo.owner,
                outputs: &self.outputs,
            };
            let Ok(bytes) = canonical_bytes(&payload) else {
                return false;
            };
            if signature.public_key() != &public_key {
                return false;
            }
            match signature.verify(&bytes) {
                Ok(true) => {}
                _ => return false,
            }
            total_input = total_input.saturating_add(utxo.amount);
        }

        total_input >= self.total_output_value()
    }

    /// The fee implicitly granted to the block producer: the surplus of
    /// inputs over outputs. Zero for coinbase transactions.
    #[must_use]
    pub fn fee(&self, utxo_set: &UtxoSet) -> u64 {
        if self.is_coinbase() {
            return 0;
        }
        let total_input: u64 = self
            .inputs
            .iter()
            .filter_map(|input| utxo_set.get(&input.tx_id, input.output_index))
            .map(|utxo| utxo.amount)
            .sum();
        total_input.saturating_sub(self.total_output_value())
    }
}

/// Builder for regular transactions: accumulate inputs and outputs, then
/// [`build`](Self::build) to compute the id. Inputs are unsigned; call
/// [`Transaction::sign_input`] on the built transaction for each one.
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
    contract_data: Option<ContractData>,
    timestamp: Option<Timestamp>,
}

impl TransactionBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add_input(mut self, tx_id: TxId, output_index: u32) -> Self {
        self.inputs.push(TxInput::unsigned(tx_id, output_index));
        self
    }

    #[must_use]
    pub fn add_output(mut self, amount: Amount, recipient: Address) -> Self {
        self.outputs.push(TxOutput::new(amount, recipient));
        self
    }

    #[must_use]
    pub fn contract_data(mut self, data: ContractData) -> Self {
        self.contract_data = Some(data);
        self
    }

    #[must_use]
    pub const fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Finalizes the transaction, computing its id from the accumulated
    /// fields.
    ///
    /// # Errors
    /// Returns an error if the body fails to serialize.
    pub fn build(self) -> Result<Transaction> {
        let timestamp = self.timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp());
        let tx_type = if self.contract_data.is_some() {
            TransactionType::Contract
        } else {
            TransactionType::Regular
        };
        let id = Transaction::compute_id(
            &self.inputs,
            &self.outputs,
            timestamp,
            &tx_type,
            &self.contract_data,
        )?;
        Ok(Transaction {
            id,
            inputs: self.inputs,
            outputs: self.outputs,
            timestamp,
            tx_type,
            contract_data: self.contract_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::InMemoryKeystore;
    use crate::utxo::Utxo;
    use shared::Hash256;

    fn tx_id(seed: &str) -> TxId {
        Hash256::sha256(seed.as_bytes())
    }

    #[test]
    fn coinbase_is_always_valid_and_has_no_inputs() {
        let coinbase = Transaction::coinbase(100, "miner".to_string(), 0);
        assert!(coinbase.inputs.is_empty());
        assert!(coinbase.is_valid(&UtxoSet::new(), &InMemoryKeystore::new()));
    }

    #[test]
    fn hash_is_deterministic_and_excludes_signatures() {
        let coinbase = Transaction::coinbase(100, "miner".to_string(), 42);
        let same = Transaction::coinbase(100, "miner".to_string(), 42);
        assert_eq!(coinbase.id, same.id);
    }

    #[test]
    fn a_signed_transaction_validates_against_the_utxo_set() {
        let keypair = KeyPair::generate().unwrap();
        let mut keystore = InMemoryKeystore::new();
        keystore.register("alice".to_string(), keypair.public_key.clone());

        let mut utxo_set = UtxoSet::new();
        let funding_tx = tx_id("funding");
        utxo_set.add(Utxo::new(funding_tx, 0, 1000, "alice".to_string()));

        let mut tx = TransactionBuilder::new()
            .add_input(funding_tx, 0)
            .add_output(900, "bob".to_string())
            .timestamp(1)
            .build()
            .unwrap();
        tx.sign_input(0, &"alice".to_string(), &keypair).unwrap();

        assert!(tx.is_valid(&utxo_set, &keystore));
    }

    #[test]
    fn a_signed_transaction_round_trips_through_json_with_identical_hash_and_verify_result() {
        let keypair = KeyPair::generate().unwrap();
        let mut keystore = InMemoryKeystore::new();
        keystore.register("alice".to_string(), keypair.public_key.clone());

        let mut utxo_set = UtxoSet::new();
        let funding_tx = tx_id("funding");
        utxo_set.add(Utxo::new(funding_tx, 0, 1000, "alice".to_string()));

        let mut tx = TransactionBuilder::new()
            .add_input(funding_tx, 0)
            .add_output(900, "bob".to_string())
            .timestamp(1)
            .build()
            .unwrap();
        tx.sign_input(0, &"alice".to_string(), &keypair).unwrap();

        let encoded = serde_json::to_string(&tx).unwrap();
        let decoded: Transaction = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.id, tx.id);
        assert_eq!(
            decoded.is_valid(&utxo_set, &keystore),
            tx.is_valid(&utxo_set, &keystore)
        );
        assert!(decoded.is_valid(&utxo_set, &keystore));
    }

    #[test]
    fn tampering_with_the_outputs_after_signing_invalidates_the_transaction() {
        let keypair = KeyPair::generate().unwrap();
        let mut keystore = InMemoryKeystore::new();
        keystore.register("alice".to_string(), keypair.public_key.clone());

        let mut utxo_set = UtxoSet::new();
        let funding_tx = tx_id("funding");
        utxo_set.add(Utxo::new(funding_tx, 0, 1000, "alice".to_string()));

        let mut tx = TransactionBuilder::new()
            .add_input(funding_tx, 0)
            .add_output(900, "bob".to_string())
            .timestamp(1)
            .build()
            .unwrap();
        tx.sign_input(0, &"alice".to_string(), &keypair).unwrap();

        tx.outputs[0].recipient = "charlie".to_string();
        assert!(!tx.is_valid(&utxo_set, &keystore));
    }

    #[test]
    fn spending_an_already_spent_utxo_is_rejected() {
        let keypair = KeyPair::generate().unwrap();
        let mut keystore = InMemoryKeystore::new();
        keystore.register("alice".to_string(), keypair.public_key.clone());

        let mut utxo_set = UtxoSet::new();
        let funding_tx = tx_id("funding");
        utxo_set.add(Utxo::new(funding_tx, 0, 1000, "alice".to_string()));
        utxo_set.spend(&funding_tx, 0);

        let mut tx = TransactionBuilder::new()
            .add_input(funding_tx, 0)
            .add_output(900, "bob".to_string())
            .timestamp(1)
            .build()
            .unwrap();
        tx.sign_input(0, &"alice".to_string(), &keypair).unwrap();

        assert!(!tx.is_valid(&utxo_set, &keystore));
    }

    #[test]
    fn outputs_exceeding_inputs_are_rejected() {
        let keypair = KeyPair::generate().unwrap();
        let mut keystore = InMemoryKeystore::new();
        keystore.register("alice".to_string(), keypair.public_key.clone());

        let mut utxo_set = UtxoSet::new();
        let funding_tx = tx_id("funding");
        utxo_set.add(Utxo::new(funding_tx, 0, 100, "alice".to_string()));

        let mut tx = TransactionBuilder::new()
            .add_input(funding_tx, 0)
            .add_output(900, "bob".to_string())
            .timestamp(1)
            .build()
            .unwrap();
        tx.sign_input(0, &"alice".to_string(), &keypair).unwrap();

        assert!(!tx.is_valid(&utxo_set, &keystore));
    }

    #[test]
    fn contract_transaction_adds_fee_then_change() {
        let mut utxo_set = UtxoSet::new();
        let funding_tx = tx_id("funding");
        utxo_set.add(Utxo::new(funding_tx, 0, 1000, "alice".to_string()));

        let call = ContractData::Execute(ContractCall {
            contract_id: "contract-1".to_string(),
            method: "transfer".to_string(),
            params: vec!["bob".to_string(), "10".to_string()],
        });
        let tx = Transaction::contract_transaction(call, &"alice".to_string(), &utxo_set, 50, 1)
            .unwrap();

        assert_eq!(tx.outputs[0].amount, 50);
        assert_eq!(tx.outputs[0].recipient, MINERS_ADDRESS);
        assert_eq!(tx.outputs[1].amount, 950);
        assert_eq!(tx.outputs[1].recipient, "alice");
    }

    #[test]
    fn contract_transaction_fails_when_sender_lacks_funds() {
        let utxo_set = UtxoSet::new();
        let call = ContractData::Execute(ContractCall {
            contract_id: "contract-1".to_string(),
            method: "transfer".to_string(),
            params: vec![],
        });
        assert!(Transaction::contract_transaction(call, &"alice".to_string(), &utxo_set, 50, 1)
            .is_err());
    }
}
