//! The contract engine's narrow external-collaborator interface: `deploy`
//! and `execute` against a registry of native, compiled-in contract
//! implementations. Per the redesign note this replaces, a reflective
//! runtime that compiles and loads arbitrary source at deploy time is
//! explicitly out of scope — contracts are Rust types behind
//! [`ContractCode`], not user-uploaded code.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use shared::Address;
use std::collections::HashMap;

pub type ContractId = String;

/// Which compiled-in contract implementation a `deploy` call instantiates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractCode {
    /// A simple token ledger: `init(total_supply)`, `transfer(to, amount)`,
    /// `balance_of(address)`, grounded in the reference's `TokenContract`.
    Token,
}

/// A method invocation against a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub contract_id: ContractId,
    pub method: String,
    pub params: Vec<String>,
}

/// The result of executing a contract method: either a value or a
/// descriptive failure, never a propagated engine error — a failing
/// contract call is a validation outcome, not a fatal one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractResult {
    Ok(String),
    Err(String),
}

#[derive(Debug, Clone, Default)]
struct TokenContract {
    balances: HashMap<Address, u64>,
}

impl TokenContract {
    fn init(owner: Address, total_supply: u64) -> Self {
        let mut balances = HashMap::new();
        balances.insert(owner, total_supply);
        Self { balances }
    }

    fn execute(&mut self, method: &str, params: &[String], sender: &Address) -> ContractResult {
        match method {
            "transfer" => {
                let (Some(to), Some(amount_str)) = (params.first(), params.get(1)) else {
                    return ContractResult::Err("transfer requires (to, amount)".to_string());
                };
                let Ok(amount) = amount_str.parse::<u64>() else {
                    return ContractResult::Err("amount is not a valid integer".to_string());
                };
                let sender_balance = self.balances.get(sender).copied().unwrap_or(0);
                if sender_balance < amount {
                    return ContractResult::Err("insufficient contract balance".to_string());
                }
                *self.balances.get_mut(sender).unwrap() -= amount;
                *self.balances.entry(to.clone()).or_insert(0) += amount;
                ContractResult::Ok(format!("transferred {amount} to {to}"))
            }
            "balance_of" => {
                let Some(address) = params.first() else {
                    return ContractResult::Err("balance_of requires (address)".to_string());
                };
                let balance = self.balances.get(address).copied().unwrap_or(0);
                ContractResult::Ok(balance.to_string())
            }
            other => ContractResult::Err(format!("unknown method {other}")),
        }
    }
}

/// A deployed contract's state. An enum rather than a trait object so the
/// whole engine stays [`Clone`] — the blockchain mines onto a scratch copy
/// and only commits it once an entire block has applied cleanly.
#[derive(Debug, Clone)]
enum DeployedContract {
    Token(TokenContract),
}

impl DeployedContract {
    fn execute(&mut self, method: &str, params: &[String], sender: &Address) -> ContractResult {
        match self {
            Self::Token(token) => token.execute(method, params, sender),
        }
    }
}

/// Deployed contract state, keyed by [`ContractId`]. The engine observes a
/// snapshot at invocation and writes back atomically at completion — under
/// the single-writer discipline in the system's concurrency model, that is
/// simply "mutate in place".
#[derive(Debug, Clone, Default)]
pub struct ContractEngine {
    contracts: HashMap<ContractId, DeployedContract>,
    next_id: u64,
}

impl ContractEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates `code` owned by `owner`, returning its fresh
    /// [`ContractId`]. `init_params` is code-specific: [`ContractCode::Token`]
    /// expects a single element, the total supply, parsed as `u64`.
    ///
    /// # Errors
    /// Returns an error if `init_params` doesn't match what `code` expects.
    pub fn deploy(
        &mut self,
        code: &ContractCode,
        owner: Address,
        init_params: &[String],
    ) -> Result<ContractId> {
        let contract = match code {
            ContractCode::Token => {
                let total_supply = init_params
                    .first()
                    .and_then(|p| p.parse::<u64>().ok())
                    .ok_or_else(|| {
                        CoreError::Contract("token deploy requires a total supply".to_string())
                    })?;
                DeployedContract::Token(TokenContract::init(owner, total_supply))
            }
        };

        self.next_id += 1;
        let id = format!("contract-{}", self.next_id);
        self.contracts.insert(id.clone(), contract);
        Ok(id)
    }

    /// Invokes `method` on the deployed contract `contract_id`, on behalf
    /// of `sender`. A method failure within the contract (insufficient
    /// balance, bad arguments) is reported as [`ContractResult::Err`], not
    /// as a propagated `CoreError` — only a missing contract is.
    ///
    /// # Errors
    /// Returns an error if `contract_id` is not deployed.
    pub fn execute(
        &mut self,
        contract_id: &str,
        method: &str,
        params: &[String],
        sender: &Address,
    ) -> Result<ContractResult> {
        let contract = self
            .contracts
            .get_mut(contract_id)
            .ok_or_else(|| CoreError::Contract(format!("no contract deployed as {contract_id}")))?;
        Ok(contract.execute(method, params, sender))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_and_query_initial_balance() {
        let mut engine = ContractEngine::new();
        let id = engine
            .deploy(&ContractCode::Token, "alice".to_string(), &["1000".to_string()])
            .unwrap();

        let result = engine
            .execute(&id, "balance_of", &["alice".to_string()], &"alice".to_string())
            .unwrap();
        assert_eq!(result, ContractResult::Ok("1000".to_string()));
    }

    #[test]
    fn transfer_moves_balance_between_addresses() {
        let mut engine = ContractEngine::new();
        let id = engine
            .deploy(&ContractCode::Token, "alice".to_string(), &["1000".to_string()])
            .unwrap();

        engine
            .execute(
                &id,
                "transfer",
                &["bob".to_string(), "300".to_string()],
                &"alice".to_string(),
            )
            .unwrap();

        let alice_balance = engine
            .execute(&id, "balance_of", &["alice".to_string()], &"alice".to_string())
            .unwrap();
        let bob_balance = engine
            .execute(&id, "balance_of", &["bob".to_string()], &"bob".to_string())
            .unwrap();

        assert_eq!(alice_balance, ContractResult::Ok("700".to_string()));
        assert_eq!(bob_balance, ContractResult::Ok("300".to_string()));
    }

    #[test]
    fn transfer_rejects_insufficient_balance() {
        let mut engine = ContractEngine::new();
        let id = engine
            .deploy(&ContractCode::Token, "alice".to_string(), &["10".to_string()])
            .unwrap();

        let result = engine
            .execute(
                &id,
                "transfer",
                &["bob".to_string(), "9999".to_string()],
                &"alice".to_string(),
            )
            .unwrap();

        assert!(matches!(result, ContractResult::Err(_)));
    }

    #[test]
    fn execute_on_unknown_contract_is_an_error() {
        let mut engine = ContractEngine::new();
        assert!(engine
            .execute("no-such-contract", "balance_of", &[], &"alice".to_string())
            .is_err());
    }
}
