use {
  crate::{
    CallForest,
    Error,
    FeePayerUnsigned,
    LedgerRead,
    Mode,
    TokenId,
    TransactionConfig,
    UpdateId,
    ZkappCommand,
  },
  tracing::debug,
  zkapp_primitives::{Memo, PrivateKey, PublicKey, UInt32},
};

/// A transaction under construction.
///
/// Account updates are collected in `forest`. Once everything is in
/// place, [`Transaction::to_command`] produces the wire ready command
/// that signatures and proofs are then added to.
#[derive(Debug, Clone)]
pub struct Transaction {
  sender: Option<PrivateKey>,
  pub forest: CallForest,
  pub config: TransactionConfig,
}

impl Transaction {
  /// Starts a transaction whose fee is paid by `sender`. Without a
  /// sender the command gets a dummy fee payer.
  pub fn new(sender: Option<PrivateKey>, config: TransactionConfig) -> Self {
    Self {
      sender,
      forest: CallForest::new(),
      config,
    }
  }

  pub fn sender(&self) -> Option<PublicKey> {
    self.sender.as_ref().map(PrivateKey::to_public_key)
  }

  /// The nonce an update has to assert so that it is valid once all
  /// earlier updates of this transaction have been applied.
  ///
  /// The fee payer increments the nonce of the sender's default token
  /// account before any update runs, and so does every earlier update
  /// of the same account that increments its nonce.
  pub fn get_nonce(
    &self,
    id: UpdateId,
    ledger: &impl LedgerRead,
  ) -> Result<UInt32, Error> {
    let update = self.forest.get(id)?;
    let public_key = update.public_key();
    let token_id = update.token_id();

    let mut nonce = ledger.nonce(&public_key, &token_id)?;
    if token_id.is_default() && self.sender() == Some(public_key) {
      nonce = nonce.add(1u32)?;
    }
    let mut earlier = 0usize;
    self.forest.for_each_predecessor(id, |other| {
      if other.public_key() == public_key
        && other.token_id() == token_id
        && other.body.increment_nonce
      {
        earlier += 1;
      }
    });
    let earlier =
      u32::try_from(earlier).map_err(|_| zkapp_primitives::Error::Overflow)?;
    Ok(nonce.add(earlier)?)
  }

  /// Asserts the expected nonce, increments it and requests a
  /// signature for the update.
  pub fn require_signature(
    &mut self,
    id: UpdateId,
    ledger: &impl LedgerRead,
  ) -> Result<(), Error> {
    self.sign_with(id, None, ledger)
  }

  fn sign_with(
    &mut self,
    id: UpdateId,
    key: Option<PrivateKey>,
    ledger: &impl LedgerRead,
  ) -> Result<(), Error> {
    let nonce = self.get_nonce(id, ledger)?;
    let update = self.forest.get_mut(id)?;
    update.account().nonce.assert_equals(nonce);
    update.body.increment_nonce = true;
    update.set_lazy_signature(key);
    debug!("update {id} requires a signature with nonce {nonce}");
    Ok(())
  }

  /// Appends a signed update of the account of `key`.
  pub fn create_signed(
    &mut self,
    key: &PrivateKey,
    ledger: &impl LedgerRead,
  ) -> Result<UpdateId, Error> {
    let id = self.forest.create(key.to_public_key(), None);
    self.sign_with(id, Some(key.clone()), ledger)?;
    Ok(id)
  }

  /// Pays the account creation fee of `count` new accounts from the
  /// account of `key`.
  pub fn fund_new_account(
    &mut self,
    key: &PrivateKey,
    count: u64,
    ledger: &impl LedgerRead,
  ) -> Result<UpdateId, Error> {
    let fee = self.config.account_creation_fee.value();
    let amount = fee.checked_mul(count).ok_or(zkapp_primitives::Error::Overflow)?;
    let id = self.create_signed(key, ledger)?;
    self.forest.get_mut(id)?.balance().sub_in_place(amount)?;
    Ok(id)
  }

  /// Fixes caller token ids and flattens the forest into a command.
  pub fn to_command(
    &mut self,
    ledger: &impl LedgerRead,
  ) -> Result<ZkappCommand, Error> {
    let memo = Memo::from_string(&self.config.memo)?;
    let fee_payer = match &self.sender {
      None => FeePayerUnsigned::dummy(),
      Some(key) => {
        let address = key.to_public_key();
        let nonce = ledger.nonce(&address, &TokenId::default())?;
        let mut fee_payer =
          FeePayerUnsigned::default_fee_payer(address, key.clone(), nonce);
        fee_payer.body.fee = self.config.fee;
        fee_payer.body.valid_until = self.config.valid_until;
        fee_payer
      }
    };

    self.forest.add_callers(Mode::Plain)?;
    let account_updates = self.forest.to_flat_list();
    debug!(
      "assembled command with {} account updates",
      account_updates.len()
    );
    Ok(ZkappCommand {
      fee_payer,
      account_updates,
      memo,
    })
  }
}
