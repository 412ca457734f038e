use {
  crate::{AccountUpdate, CallForest, Error, FeePayerUnsigned, Mode},
  serde::{Deserialize, Serialize},
  serde_json::{json, Value},
  zkapp_primitives::{hash_with_prefix, prefixes, Field, Memo},
};

/// A complete zkApp transaction in wire order.
///
/// `account_updates` is the flattened call forest, the tree structure
/// is encoded in the call depth of each update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkappCommand {
  pub fee_payer: FeePayerUnsigned,
  pub account_updates: Vec<AccountUpdate>,
  #[serde(with = "memo_base58")]
  pub memo: Memo,
}

impl ZkappCommand {
  /// The canonical wire form, with the memo in its base58 encoding.
  pub fn to_json(&self) -> Result<Value, Error> {
    Ok(serde_json::to_value(self)?)
  }

  pub fn to_json_string(&self) -> Result<String, Error> {
    Ok(serde_json::to_string(self)?)
  }

  /// Decodes and validates a command in wire form.
  pub fn from_json(json: &Value) -> Result<Self, Error> {
    Self::validated(Self::deserialize(json)?)
  }

  pub fn from_json_str(json: &str) -> Result<Self, Error> {
    Self::validated(serde_json::from_str(json)?)
  }

  fn validated(command: Self) -> Result<Self, Error> {
    for update in &command.account_updates {
      update.body.check()?;
    }
    // rejects call depths that don't describe a forest
    CallForest::from_flat_list(command.account_updates.iter().cloned())?;
    Ok(command)
  }

  /// The tree structure of the account updates.
  pub fn forest(&self) -> Result<CallForest, Error> {
    CallForest::from_flat_list(self.account_updates.iter().cloned())
  }

  /// Returns the commitment over the account updates and the full
  /// commitment that additionally covers the memo and the fee payer.
  pub fn commitments(&self) -> Result<(Field, Field), Error> {
    let commitment = self.forest()?.hash_roots(Mode::Plain)?;
    let full_commitment = hash_with_prefix(prefixes::ACCOUNT_UPDATE_CONS, &[
      self.memo.hash(),
      self.fee_payer.hash(),
      commitment,
    ]);
    Ok((commitment, full_commitment))
  }

  pub fn to_pretty(&self) -> Result<Value, Error> {
    let mut fee_payer = json!({
      "publicKey": self.fee_payer.body.public_key.to_string(),
      "fee": self.fee_payer.body.fee.to_string(),
      "nonce": self.fee_payer.body.nonce.to_string(),
    });
    if let Some(valid_until) = self.fee_payer.body.valid_until {
      fee_payer["validUntil"] = valid_until.to_string().into();
    }
    if self.fee_payer.lazy_authorization.is_some() {
      fee_payer["authorization"] = "lazy-signature".into();
    }

    let account_updates = self
      .account_updates
      .iter()
      .map(AccountUpdate::to_pretty)
      .collect::<Result<Vec<_>, _>>()?;

    let mut pretty = json!({
      "feePayer": fee_payer,
      "accountUpdates": account_updates,
    });
    let memo = self.memo.text();
    if !memo.is_empty() {
      pretty["memo"] = memo.into();
    }
    Ok(pretty)
  }
}

/// Computes `(commitment, full_commitment)` of a command.
pub fn transaction_commitments(
  command: &ZkappCommand,
) -> Result<(Field, Field), Error> {
  command.commitments()
}

mod memo_base58 {
  use {
    serde::{Deserialize, Deserializer, Serializer},
    zkapp_primitives::Memo,
  };

  pub fn serialize<S: Serializer>(
    memo: &Memo,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&memo.to_base58())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<Memo, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    Memo::from_base58(&encoded).map_err(serde::de::Error::custom)
  }
}
