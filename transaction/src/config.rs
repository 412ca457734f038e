use {
  serde::{Deserialize, Serialize},
  zkapp_primitives::{UInt32, UInt64},
};

/// Options of a transaction under construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransactionConfig {
  /// When disabled, lazy proofs are resolved with a dummy proof
  /// instead of invoking the prover.
  pub proofs_enabled: bool,

  /// Amount charged for every account created by a transaction.
  pub account_creation_fee: UInt64,

  pub fee: UInt64,
  pub memo: String,
  pub valid_until: Option<UInt32>,
}

impl Default for TransactionConfig {
  fn default() -> Self {
    Self {
      proofs_enabled: true,
      account_creation_fee: UInt64(1_000_000_000),
      fee: UInt64::zero(),
      memo: String::new(),
      valid_until: None,
    }
  }
}
