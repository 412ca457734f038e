use {
  crate::{Error, Permissions, TokenId},
  serde::{Deserialize, Serialize},
  std::collections::HashMap,
  zkapp_primitives::{Field, PublicKey, UInt32, UInt64},
};

/// The account fields that preconditions are built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
  pub public_key: PublicKey,
  pub token_id: TokenId,
  pub nonce: UInt32,
  pub balance: UInt64,
  pub app_state: Vec<Field>,
  pub permissions: Permissions,
  pub receipt_chain_hash: Field,
  pub delegate: Option<PublicKey>,
}

impl AccountInfo {
  pub fn new(public_key: PublicKey, token_id: TokenId) -> Self {
    Self {
      public_key,
      token_id,
      nonce: UInt32::zero(),
      balance: UInt64::zero(),
      app_state: vec![Field::zero(); crate::ZKAPP_STATE_LENGTH],
      permissions: Permissions::initial(),
      receipt_chain_hash: Field::zero(),
      delegate: None,
    }
  }
}

/// Read only access to the current ledger state.
///
/// Implementations fetch accounts from wherever the ledger lives and
/// report transport failures as [`Error::Ledger`]. An account that
/// does not exist yet is `None`.
pub trait LedgerRead {
  fn account(
    &self,
    public_key: &PublicKey,
    token_id: &TokenId,
  ) -> Result<Option<AccountInfo>, Error>;

  /// Nonce of an account, zero for accounts that don't exist.
  fn nonce(
    &self,
    public_key: &PublicKey,
    token_id: &TokenId,
  ) -> Result<UInt32, Error> {
    Ok(
      self
        .account(public_key, token_id)?
        .map(|account| account.nonce)
        .unwrap_or_default(),
    )
  }
}

#[derive(Debug, Default)]
pub struct InMemoryLedger {
  data: HashMap<(PublicKey, TokenId), AccountInfo>,
}

impl InMemoryLedger {
  /// Inserts or replaces an account, returning the previous value.
  pub fn set(&mut self, account: AccountInfo) -> Option<AccountInfo> {
    self
      .data
      .insert((account.public_key, account.token_id), account)
  }

  pub fn iter(&self) -> impl Iterator<Item = &AccountInfo> {
    self.data.values()
  }
}

impl LedgerRead for InMemoryLedger {
  fn account(
    &self,
    public_key: &PublicKey,
    token_id: &TokenId,
  ) -> Result<Option<AccountInfo>, Error> {
    Ok(self.data.get(&(*public_key, *token_id)).cloned())
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{AccountInfo, InMemoryLedger, LedgerRead},
    crate::TokenId,
    zkapp_primitives::{Field, PrivateKey, UInt32},
  };

  #[test]
  fn missing_accounts_have_nonce_zero() -> anyhow::Result<()> {
    let mut ledger = InMemoryLedger::default();
    let key = PrivateKey::random().to_public_key();
    assert_eq!(ledger.nonce(&key, &TokenId::default())?, UInt32(0));

    let mut account = AccountInfo::new(key, TokenId::default());
    account.nonce = UInt32(7);
    assert!(ledger.set(account).is_none());

    assert_eq!(ledger.nonce(&key, &TokenId::default())?, UInt32(7));
    assert_eq!(ledger.nonce(&key, &TokenId(Field::from(2u64)))?, UInt32(0));
    assert_eq!(ledger.iter().count(), 1);
    Ok(())
  }
}
