//! Hashing straight from the wire form.
//!
//! This is the plain evaluation path: it walks the JSON of a body in
//! the canonical field order and decodes every leaf from its string
//! form. It shares no encoding code with the typed `ToInput` impls, so
//! comparing the two paths catches mistakes in either of them.

use {
  crate::{token::TOKEN_ID_VERSION, Error},
  serde_json::{json, Value},
  zkapp_primitives::{
    decode_check,
    empty_hash_with_prefix,
    hash_with_prefix,
    pack_to_fields,
    prefixes,
    Field,
    HashInput,
    PublicKey,
  },
};

const APP_STATE_LENGTH: usize = 8;
const SYMBOL_BYTES: usize = 6;

const PERMISSION_SLOTS: [&str; 11] = [
  "editState",
  "send",
  "receive",
  "setDelegate",
  "setPermissions",
  "setVerificationKey",
  "setZkappUri",
  "editActionState",
  "setTokenSymbol",
  "incrementNonce",
  "setVotingFor",
];

fn malformed(what: &str) -> Error {
  Error::InvalidBody(format!("malformed wire value at {what}"))
}

fn get<'v>(object: &'v Value, key: &str) -> Result<&'v Value, Error> {
  object.get(key).ok_or_else(|| malformed(key))
}

fn text<'v>(value: &'v Value, what: &str) -> Result<&'v str, Error> {
  value.as_str().ok_or_else(|| malformed(what))
}

fn list<'v>(value: &'v Value, what: &str) -> Result<&'v [Value], Error> {
  value
    .as_array()
    .map(Vec::as_slice)
    .ok_or_else(|| malformed(what))
}

fn field(value: &Value, what: &str) -> Result<Field, Error> {
  Ok(text(value, what)?.parse::<Field>()?)
}

fn token_id(encoded: &str) -> Result<Field, Error> {
  let bytes: [u8; 32] = decode_check(TOKEN_ID_VERSION, encoded)?
    .try_into()
    .map_err(|_| malformed("tokenId"))?;
  Ok(Field::from_bytes(&bytes)?)
}

fn event_list(value: &Value, empty: &str, cons: &str) -> Result<Field, Error> {
  let mut acc = empty_hash_with_prefix(empty);
  for event in list(value, "events")?.iter().rev() {
    let fields = list(event, "event")?
      .iter()
      .map(|f| field(f, "event"))
      .collect::<Result<Vec<_>, _>>()?;
    acc = hash_with_prefix(cons, &[acc, hash_with_prefix(prefixes::EVENT, &fields)]);
  }
  Ok(acc)
}

/// Collects full field elements and bit chunks in wire order.
#[derive(Default)]
struct Input {
  fields: Vec<Field>,
  chunks: Vec<(Field, u32)>,
}

impl Input {
  fn field(&mut self, value: Field) {
    self.fields.push(value);
  }

  fn bits(&mut self, value: u64, width: u32) {
    self.chunks.push((Field::from(value), width));
  }

  fn flag(&mut self, value: &Value, what: &str) -> Result<(), Error> {
    let flag = value.as_bool().ok_or_else(|| malformed(what))?;
    self.bits(flag as u64, 1);
    Ok(())
  }

  fn uint(&mut self, value: &Value, width: u32, what: &str) -> Result<(), Error> {
    let number = text(value, what)?
      .parse::<u64>()
      .map_err(|_| malformed(what))?;
    if width < 64 && number >> width != 0 {
      return Err(malformed(what));
    }
    self.bits(number, width);
    Ok(())
  }

  fn field_at(&mut self, value: &Value, what: &str) -> Result<(), Error> {
    self.field(field(value, what)?);
    Ok(())
  }

  /// High 31 bytes as one field element, the last byte as a chunk.
  fn public_key(&mut self, value: &Value, what: &str) -> Result<(), Error> {
    let key = text(value, what)?.parse::<PublicKey>()?;
    let bytes = key.as_bytes();
    let mut high = [0u8; 32];
    high[1..].copy_from_slice(&bytes[..31]);
    self.field(Field::from_bytes(&high)?);
    self.bits(bytes[31] as u64, 8);
    Ok(())
  }

  fn interval(&mut self, value: &Value, width: u32, what: &str) -> Result<(), Error> {
    self.uint(get(value, "lower")?, width, what)?;
    self.uint(get(value, "upper")?, width, what)
  }

  /// A presence flag followed by the value, or by `absent` if the wire
  /// value is null.
  fn optional(
    &mut self,
    value: &Value,
    absent: Value,
    present: impl FnOnce(&mut Self, &Value) -> Result<(), Error>,
  ) -> Result<(), Error> {
    match value {
      Value::Null => {
        self.bits(0, 1);
        present(self, &absent)
      }
      value => {
        self.bits(1, 1);
        present(self, value)
      }
    }
  }

  fn permission(&mut self, value: &Value, what: &str) -> Result<(), Error> {
    // constant, signature necessary, signature sufficient
    let flags = match text(value, what)? {
      "None" => [1, 0, 1],
      "Either" => [0, 0, 1],
      "Proof" => [0, 0, 0],
      "Signature" => [0, 1, 1],
      "Impossible" => [1, 1, 0],
      other => return Err(Error::InvalidPermission(other.to_owned())),
    };
    for flag in flags {
      self.bits(flag, 1);
    }
    Ok(())
  }

  fn update(&mut self, update: &Value) -> Result<(), Error> {
    let app_state = list(get(update, "appState")?, "appState")?;
    if app_state.len() != APP_STATE_LENGTH {
      return Err(malformed("appState"));
    }
    for slot in app_state {
      self.optional(slot, json!("0"), |i, v| i.field_at(v, "appState"))?;
    }
    self.optional(
      get(update, "delegate")?,
      json!(PublicKey::empty().to_string()),
      |i, v| i.public_key(v, "delegate"),
    )?;
    self.optional(
      get(update, "verificationKey")?,
      json!({ "data": "", "hash": "0" }),
      |i, v| i.field_at(get(v, "hash")?, "verificationKey"),
    )?;
    let none: serde_json::Map<_, _> = PERMISSION_SLOTS
      .iter()
      .map(|slot| (slot.to_string(), json!("None")))
      .collect();
    self.optional(
      get(update, "permissions")?,
      Value::Object(none),
      |i, v| {
        for slot in PERMISSION_SLOTS {
          i.permission(get(v, slot)?, slot)?;
        }
        Ok(())
      },
    )?;
    self.optional(get(update, "zkappUri")?, json!(""), |i, v| {
      let uri = Input {
        fields: vec![],
        chunks: text(v, "zkappUri")?
          .bytes()
          .map(|b| (Field::from(b as u64), 8))
          .collect(),
      };
      let packed = pack_to_fields(uri.finish());
      i.field(hash_with_prefix(prefixes::ZKAPP_URI, &packed));
      Ok(())
    })?;
    self.optional(get(update, "tokenSymbol")?, json!(""), |i, v| {
      let symbol = text(v, "tokenSymbol")?.as_bytes();
      if symbol.len() > SYMBOL_BYTES {
        return Err(malformed("tokenSymbol"));
      }
      let value = symbol
        .iter()
        .enumerate()
        .fold(0u64, |acc, (n, b)| acc | (*b as u64) << (8 * n));
      i.bits(value, (SYMBOL_BYTES * 8) as u32);
      Ok(())
    })?;
    self.optional(
      get(update, "timing")?,
      json!({
        "initialMinimumBalance": "0",
        "cliffTime": "0",
        "cliffAmount": "0",
        "vestingPeriod": "0",
        "vestingIncrement": "0"
      }),
      |i, v| {
        i.uint(get(v, "initialMinimumBalance")?, 64, "timing")?;
        i.uint(get(v, "cliffTime")?, 32, "timing")?;
        i.uint(get(v, "cliffAmount")?, 64, "timing")?;
        i.uint(get(v, "vestingPeriod")?, 32, "timing")?;
        i.uint(get(v, "vestingIncrement")?, 64, "timing")
      },
    )?;
    self.optional(get(update, "votingFor")?, json!("0"), |i, v| {
      i.field_at(v, "votingFor")
    })
  }

  fn checked_interval(&mut self, value: &Value, width: u32, what: &str) -> Result<(), Error> {
    let max = match width {
      32 => u32::MAX as u64,
      _ => u64::MAX,
    };
    self.optional(
      value,
      json!({ "lower": "0", "upper": max.to_string() }),
      |i, v| i.interval(v, width, what),
    )
  }

  fn checked_field(&mut self, value: &Value, what: &str) -> Result<(), Error> {
    self.optional(value, json!("0"), |i, v| i.field_at(v, what))
  }

  fn epoch_data(&mut self, epoch: &Value) -> Result<(), Error> {
    let ledger = get(epoch, "ledger")?;
    self.checked_field(get(ledger, "hash")?, "ledger.hash")?;
    self.checked_interval(get(ledger, "totalCurrency")?, 64, "totalCurrency")?;
    self.checked_field(get(epoch, "seed")?, "seed")?;
    self.checked_field(get(epoch, "startCheckpoint")?, "startCheckpoint")?;
    self.checked_field(get(epoch, "lockCheckpoint")?, "lockCheckpoint")?;
    self.checked_interval(get(epoch, "epochLength")?, 32, "epochLength")
  }

  fn network(&mut self, network: &Value) -> Result<(), Error> {
    self.checked_field(get(network, "snarkedLedgerHash")?, "snarkedLedgerHash")?;
    self.checked_interval(get(network, "timestamp")?, 64, "timestamp")?;
    self.checked_interval(get(network, "blockchainLength")?, 32, "blockchainLength")?;
    self.checked_interval(get(network, "minWindowDensity")?, 32, "minWindowDensity")?;
    self.checked_interval(get(network, "totalCurrency")?, 64, "totalCurrency")?;
    self.checked_interval(
      get(network, "globalSlotSinceHardFork")?,
      32,
      "globalSlotSinceHardFork",
    )?;
    self.checked_interval(
      get(network, "globalSlotSinceGenesis")?,
      32,
      "globalSlotSinceGenesis",
    )?;
    self.epoch_data(get(network, "stakingEpochData")?)?;
    self.epoch_data(get(network, "nextEpochData")?)
  }

  fn account(&mut self, account: &Value) -> Result<(), Error> {
    self.checked_interval(get(account, "balance")?, 64, "balance")?;
    self.checked_interval(get(account, "nonce")?, 32, "nonce")?;
    self.checked_field(get(account, "receiptChainHash")?, "receiptChainHash")?;
    self.optional(
      get(account, "delegate")?,
      json!(PublicKey::empty().to_string()),
      |i, v| i.public_key(v, "delegate"),
    )?;
    let state = list(get(account, "state")?, "state")?;
    if state.len() != APP_STATE_LENGTH {
      return Err(malformed("state"));
    }
    for slot in state {
      self.checked_field(slot, "state")?;
    }
    // an ignored action state commits to the empty action state
    match get(account, "actionState")? {
      Value::Null => {
        self.bits(0, 1);
        self.field(empty_hash_with_prefix(prefixes::ACTION_STATE_EMPTY));
      }
      value => {
        self.bits(1, 1);
        self.field_at(value, "actionState")?;
      }
    }
    self.optional(get(account, "provedState")?, json!(false), |i, v| {
      i.flag(v, "provedState")
    })?;
    self.optional(get(account, "isNew")?, json!(false), |i, v| {
      i.flag(v, "isNew")
    })
  }

  fn body(&mut self, body: &Value) -> Result<(), Error> {
    self.public_key(get(body, "publicKey")?, "publicKey")?;
    self.field(token_id(text(get(body, "tokenId")?, "tokenId")?)?);
    self.update(get(body, "update")?)?;

    let balance = get(body, "balanceChange")?;
    self.uint(get(balance, "magnitude")?, 64, "balanceChange")?;
    match text(get(balance, "sgn")?, "sgn")? {
      "Positive" => self.bits(1, 1),
      "Negative" => self.bits(0, 1),
      _ => return Err(malformed("sgn")),
    }

    self.flag(get(body, "incrementNonce")?, "incrementNonce")?;
    self.field(event_list(
      get(body, "events")?,
      prefixes::EVENTS_EMPTY,
      prefixes::EVENTS,
    )?);
    self.field(event_list(
      get(body, "actions")?,
      prefixes::ACTIONS_EMPTY,
      prefixes::ACTIONS,
    )?);
    self.field_at(get(body, "callData")?, "callData")?;

    let preconditions = get(body, "preconditions")?;
    self.network(get(preconditions, "network")?)?;
    self.account(get(preconditions, "account")?)?;

    self.flag(get(body, "useFullCommitment")?, "useFullCommitment")?;
    self.field(token_id(text(get(body, "caller")?, "caller")?)?);

    let kind = get(body, "authorizationKind")?;
    self.flag(get(kind, "isSigned")?, "isSigned")?;
    self.flag(get(kind, "isProved")?, "isProved")?;
    self.field_at(get(kind, "verificationKeyHash")?, "verificationKeyHash")
  }

  fn finish(self) -> HashInput {
    HashInput {
      fields: self.fields,
      packed: self.chunks,
    }
  }
}

/// Hash of an account update body given in its wire form.
///
/// `callDepth` is ignored, unknown keys are ignored as well.
pub fn hash_body_json(body: &Value) -> Result<Field, Error> {
  let mut input = Input::default();
  input.body(body)?;
  Ok(hash_with_prefix(
    prefixes::BODY,
    &pack_to_fields(input.finish()),
  ))
}

/// Custom token id from the wire encodings of its owner and parent.
pub(crate) fn derive_token_id(owner: &str, parent: &str) -> Result<Field, Error> {
  let mut input = Input::default();
  input.public_key(&Value::from(owner), "owner")?;
  input.field(token_id(parent)?);
  Ok(hash_with_prefix(
    prefixes::DERIVE_TOKEN_ID,
    &pack_to_fields(input.finish()),
  ))
}

#[cfg(test)]
mod tests {
  use {
    super::{derive_token_id, hash_body_json},
    crate::{Body, Error, Mode, Permissions, Token, TokenId},
    serde_json::json,
    zkapp_primitives::{
      hash_with_prefix,
      pack_to_fields,
      prefixes,
      Field,
      PrivateKey,
      ToInput,
      UInt32,
      UInt64,
    },
  };

  fn typed_hash(body: &Body) -> Field {
    hash_with_prefix(prefixes::BODY, &pack_to_fields(body.to_input()))
  }

  #[test]
  fn hand_written_body_matches_typed_encoding() -> anyhow::Result<()> {
    let key = PrivateKey::random().to_public_key();
    let mut json = serde_json::to_value(Body::keep_all(key))?;
    json["callData"] = json!("5");
    json["callDepth"] = json!(2);
    json["incrementNonce"] = json!(true);
    json["balanceChange"] = json!({ "magnitude": "10", "sgn": "Negative" });
    json["events"] = json!([["1", "2"], ["3"]]);
    json["update"]["appState"][3] = json!("77");
    json["update"]["tokenSymbol"] = json!("MINA");
    json["update"]["zkappUri"] = json!("https://example.com");
    json["update"]["permissions"] = serde_json::to_value(Permissions::default())?;
    json["preconditions"]["account"]["nonce"] =
      json!({ "lower": "3", "upper": "3" });
    json["preconditions"]["account"]["actionState"] = json!("9");
    json["preconditions"]["account"]["isNew"] = json!(false);
    json["preconditions"]["network"]["timestamp"] =
      json!({ "lower": "0", "upper": "1000" });

    let body: Body = serde_json::from_value(json.clone())?;
    assert_eq!(body.call_depth, 2);
    assert!(body.preconditions.account.nonce.contains(UInt32(3)));
    assert!(!body
      .preconditions
      .network
      .timestamp
      .contains(UInt64(1001)));

    assert_eq!(hash_body_json(&json)?, typed_hash(&body));

    // the wire path ignores call depth too
    json["callDepth"] = json!(0);
    assert_eq!(hash_body_json(&json)?, typed_hash(&body));

    // and really reads every leaf
    json["callData"] = json!("6");
    assert_ne!(hash_body_json(&json)?, typed_hash(&body));
    Ok(())
  }

  #[test]
  fn plain_update_hash_uses_the_wire_form() -> anyhow::Result<()> {
    let key = PrivateKey::random().to_public_key();
    let mut update = crate::AccountUpdate::default_account_update(key, None);
    update.body.update.voting_for.set_value(1u64.into());
    update.account().balance.assert_between(UInt64(5), UInt64(50));
    let plain = update.hash(Mode::Plain)?;
    assert_eq!(plain, hash_body_json(&serde_json::to_value(&update.body)?)?);
    assert_eq!(plain, update.hash(Mode::Constrained)?);
    Ok(())
  }

  #[test]
  fn malformed_wire_values_are_rejected() -> anyhow::Result<()> {
    let key = PrivateKey::random().to_public_key();
    let mut json = serde_json::to_value(Body::keep_all(key))?;
    json["preconditions"]["account"]["nonce"] =
      json!({ "lower": "0", "upper": "4294967296" });
    assert!(matches!(hash_body_json(&json), Err(Error::InvalidBody(_))));

    let mut json = serde_json::to_value(Body::keep_all(key))?;
    json["update"]["permissions"] = serde_json::to_value(Permissions::initial())?;
    json["update"]["permissions"]["send"] = json!("Sometimes");
    assert!(matches!(
      hash_body_json(&json),
      Err(Error::InvalidPermission(p)) if p == "Sometimes"
    ));

    let mut json = serde_json::to_value(Body::keep_all(key))?;
    if let Some(body) = json.as_object_mut() {
      body.remove("caller");
    }
    assert!(hash_body_json(&json).is_err());
    Ok(())
  }

  #[test]
  fn token_id_from_wire_strings() -> anyhow::Result<()> {
    let owner = PrivateKey::random().to_public_key();
    let parent = Token::get_id(&owner, &TokenId::default(), Mode::Constrained)?;

    let typed = Token::get_id(&owner, &parent, Mode::Constrained)?;
    let wire = derive_token_id(&owner.to_string(), &parent.to_string())?;
    assert_eq!(TokenId(wire), typed);

    // the owner comes first, swapping in another key changes the id
    let other = PrivateKey::random().to_public_key();
    assert_ne!(
      derive_token_id(&other.to_string(), &parent.to_string())?,
      wire
    );
    assert!(derive_token_id(&owner.to_string(), "not a token").is_err());
    Ok(())
  }
}
