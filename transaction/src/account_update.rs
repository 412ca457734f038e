use {
  crate::{
    authorization::{Control, LazyAuthorization, LazySignature},
    body::{Body, Update},
    preconditions::{AccountPrecondition, Dummy, NetworkPrecondition},
    token::TokenId,
    wire,
    Error,
    Mode,
  },
  serde::{Deserialize, Deserializer, Serialize, Serializer},
  serde_json::{Map, Value},
  std::{
    fmt::Display,
    sync::atomic::{AtomicU64, Ordering},
  },
  zkapp_primitives::{
    hash_with_prefix,
    pack_to_fields,
    prefixes,
    Field,
    HashInput,
    Int64,
    PrivateKey,
    PublicKey,
    Signature,
    ToInput,
    UInt32,
    UInt64,
  },
};

static NEXT_UPDATE_ID: AtomicU64 = AtomicU64::new(1);

/// Process wide unique identity of an account update. It is stable
/// across clones, so a cloned update can be matched with its original.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UpdateId(u64);

impl UpdateId {
  fn next() -> Self {
    Self(NEXT_UPDATE_ID.fetch_add(1, Ordering::Relaxed))
  }
}

impl Display for UpdateId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// How the `calls` hash over the children of an update is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallsHash {
  /// Computed from the actual children.
  #[default]
  Computed,
  /// Opaque value whose correctness is checked later by the verifier.
  Witnessed,
  /// Must equal this value inside constrained computations.
  Equals(Field),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Children {
  pub calls: CallsHash,
  pub updates: Vec<UpdateId>,
}

/// Expected shape of the children of a witnessed account update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildrenLayout {
  NoChildren,
  /// Any number of children, only their combined hash is witnessed.
  AnyChildren,
  /// Like `AnyChildren`, but the parent must not be a delegate call.
  NoDelegation,
  /// A fixed list of children, each with its own layout.
  StaticChildren(Vec<ChildrenLayout>),
}

/// A single change to one account, together with its authorization.
///
/// Updates live inside a [`crate::CallForest`] which owns the tree
/// structure. The `children` and `parent` links are only changed by the
/// forest, so that every update is referenced from exactly one place.
#[derive(Debug, Clone)]
pub struct AccountUpdate {
  id: UpdateId,
  pub label: String,
  pub body: Body,
  pub authorization: Control,
  pub lazy_authorization: Option<LazyAuthorization>,
  pub is_delegate_call: bool,
  pub(crate) children: Children,
  pub(crate) parent: Option<UpdateId>,
}

impl AccountUpdate {
  pub fn new(body: Body, authorization: Control) -> Self {
    Self {
      id: UpdateId::next(),
      label: String::new(),
      body,
      authorization,
      lazy_authorization: None,
      is_delegate_call: false,
      children: Children::default(),
      parent: None,
    }
  }

  /// An update that changes nothing. A custom token id also becomes
  /// the caller of the update.
  pub fn default_account_update(
    address: PublicKey,
    token_id: Option<TokenId>,
  ) -> Self {
    let mut body = Body::keep_all(address);
    if let Some(token_id) = token_id {
      body.token_id = token_id;
      body.caller = token_id;
    }
    Self::new(body, Control::default())
  }

  /// The empty address sentinel, skipped when hashing and flattening.
  pub fn dummy() -> Self {
    Self::default_account_update(PublicKey::empty(), None)
  }

  pub fn is_dummy(&self) -> bool {
    self.body.public_key.is_empty()
  }

  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.label = label.into();
    self
  }

  pub fn id(&self) -> UpdateId {
    self.id
  }

  pub fn public_key(&self) -> PublicKey {
    self.body.public_key
  }

  pub fn token_id(&self) -> TokenId {
    self.body.token_id
  }

  pub fn children(&self) -> &Children {
    &self.children
  }

  pub fn parent(&self) -> Option<UpdateId> {
    self.parent
  }

  pub fn account(&mut self) -> &mut AccountPrecondition {
    &mut self.body.preconditions.account
  }

  pub fn network(&mut self) -> &mut NetworkPrecondition {
    &mut self.body.preconditions.network
  }

  pub fn update(&mut self) -> &mut Update {
    &mut self.body.update
  }

  pub fn balance(&mut self) -> Balance<'_> {
    Balance(&mut self.body.balance_change)
  }

  /// Hash of the update body.
  ///
  /// The constrained path packs the typed body into field elements. The
  /// plain path hashes the wire encoding of the body, see
  /// [`crate::hash_body_json`].
  pub fn hash(&self, mode: Mode) -> Result<Field, Error> {
    match mode {
      Mode::Constrained => Ok(hash_with_prefix(
        prefixes::BODY,
        &pack_to_fields(self.body.to_input()),
      )),
      Mode::Plain => wire::hash_body_json(&serde_json::to_value(&self.body)?),
    }
  }

  /// Computes both hashing paths and fails if they disagree.
  pub fn hash_checked(&self) -> Result<Field, Error> {
    let plain = self.hash(Mode::Plain)?;
    let arithmetized = self.hash(Mode::Constrained)?;
    if plain != arithmetized {
      return Err(Error::HashMismatch {
        plain,
        arithmetized,
      });
    }
    Ok(plain)
  }

  pub fn to_json(&self) -> Result<Value, Error> {
    Ok(serde_json::to_value(self)?)
  }

  /// Decodes an update from its wire form. The result is a fresh
  /// update without children.
  pub fn from_json(json: &Value) -> Result<Self, Error> {
    let update = Self::deserialize(json)?;
    update.body.check()?;
    Ok(update)
  }

  /// Compact projection for debugging, omitting everything that still
  /// has its default value.
  pub fn to_pretty(&self) -> Result<Value, Error> {
    let mut body = serde_json::to_value(&self.body)?;
    let defaults = serde_json::to_value(Body::keep_all(self.body.public_key))?;
    prune(&mut body, &defaults);

    let mut pretty = Map::new();
    if !self.label.is_empty() {
      pretty.insert("label".into(), self.label.clone().into());
    }
    pretty.insert("publicKey".into(), self.body.public_key.to_string().into());
    if let Value::Object(fields) = body {
      pretty.extend(fields);
    }

    let authorization = match (&self.lazy_authorization, &self.authorization) {
      (Some(LazyAuthorization::Signature(_)), _) => Some("lazy-signature"),
      (Some(LazyAuthorization::Proof(_)), _) => Some("lazy-proof"),
      (Some(LazyAuthorization::None), _) => Some("lazy-none"),
      (None, Control { proof: Some(_), .. }) => Some("proof"),
      (None, Control {
        signature: Some(_), ..
      }) => Some("signature"),
      (None, _) => None,
    };
    if let Some(authorization) = authorization {
      pretty.insert("authorization".into(), authorization.into());
    }
    Ok(Value::Object(pretty))
  }
}

/// Removes from `value` all entries that are null or equal to their
/// counterpart in `defaults`, recursively.
fn prune(value: &mut Value, defaults: &Value) {
  let (Value::Object(fields), Value::Object(defaults)) = (value, defaults)
  else {
    return;
  };
  fields.retain(|key, field| {
    let default = defaults.get(key).unwrap_or(&Value::Null);
    if field.is_null() || field == default {
      return false;
    }
    prune(field, default);
    !matches!(field, Value::Object(o) if o.is_empty())
  });
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRef<'a> {
  body: &'a Body,
  authorization: &'a Control,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Wire {
  body: Body,
  authorization: Control,
}

impl Serialize for AccountUpdate {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    WireRef {
      body: &self.body,
      authorization: &self.authorization,
    }
    .serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for AccountUpdate {
  fn deserialize<D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<Self, D::Error> {
    let Wire {
      body,
      authorization,
    } = Wire::deserialize(deserializer)?;
    Ok(Self::new(body, authorization))
  }
}

/// In place access to the balance change of an update.
pub struct Balance<'a>(&'a mut Int64);

impl<'a> Balance<'a> {
  pub fn add_in_place(&mut self, amount: impl Into<UInt64>) -> Result<(), Error> {
    *self.0 = self.0.add(amount)?;
    Ok(())
  }

  pub fn sub_in_place(&mut self, amount: impl Into<UInt64>) -> Result<(), Error> {
    *self.0 = self.0.sub(amount)?;
    Ok(())
  }

  pub fn value(&self) -> Int64 {
    *self.0
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeePayerBody {
  pub public_key: PublicKey,
  pub fee: UInt64,
  pub valid_until: Option<UInt32>,
  pub nonce: UInt32,
}

impl FeePayerBody {
  pub fn keep_all(public_key: PublicKey, nonce: UInt32) -> Self {
    Self {
      public_key,
      fee: UInt64::zero(),
      valid_until: None,
      nonce,
    }
  }
}

impl ToInput for FeePayerBody {
  fn to_input(&self) -> HashInput {
    HashInput::default()
      .append(&self.public_key)
      .append(&self.fee)
      .append(&self.valid_until.is_some())
      .append(&self.valid_until.unwrap_or_else(UInt32::dummy))
      .append(&self.nonce)
  }
}

/// The fee payer of a transaction, before its signature is added.
///
/// The fee payer always signs the full commitment of the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePayerUnsigned {
  pub body: FeePayerBody,
  pub authorization: Signature,
  #[serde(skip)]
  pub lazy_authorization: Option<LazySignature>,
}

impl FeePayerUnsigned {
  pub fn default_fee_payer(
    address: PublicKey,
    key: PrivateKey,
    nonce: UInt32,
  ) -> Self {
    Self {
      body: FeePayerBody::keep_all(address, nonce),
      authorization: Signature::dummy(),
      lazy_authorization: Some(LazySignature {
        private_key: Some(key),
      }),
    }
  }

  pub fn dummy() -> Self {
    Self {
      body: FeePayerBody::keep_all(PublicKey::empty(), UInt32::zero()),
      authorization: Signature::dummy(),
      lazy_authorization: None,
    }
  }

  pub fn hash(&self) -> Field {
    hash_with_prefix(prefixes::FEE_PAYER, &pack_to_fields(self.body.to_input()))
  }
}

/// The public input of a zkApp proof: the hash of the proving update
/// and the hash of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkappPublicInput {
  pub account_update: Field,
  pub calls: Field,
}

impl ZkappPublicInput {
  pub fn to_fields(&self) -> Vec<Field> {
    vec![self.account_update, self.calls]
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{AccountUpdate, FeePayerUnsigned},
    crate::{Mode, Permissions, TokenId},
    zkapp_primitives::{Field, PrivateKey, PublicKey, UInt32, UInt64},
  };

  fn interesting_update() -> anyhow::Result<AccountUpdate> {
    let key = PrivateKey::random();
    let mut update = AccountUpdate::default_account_update(
      key.to_public_key(),
      Some(TokenId(Field::from(77u64))),
    );
    update.balance().sub_in_place(1_000u64)?;
    update.account().nonce.assert_equals(UInt32(3));
    update.account().state[0].assert_equals(Field::from(5u64));
    update.network().blockchain_length.assert_between(UInt32(1), UInt32(9));
    update.update().app_state[7].set_value(Field::from(11u64));
    update.update().permissions.set_value(Permissions::default());
    update.update().token_symbol.set_value("ZK".parse()?);
    update.body.events.push(vec![Field::from(1u64), Field::from(2u64)]);
    update.body.actions.push(vec![Field::from(3u64)]);
    update.body.increment_nonce = true;
    update.set_lazy_signature(Some(key));
    Ok(update)
  }

  #[test]
  fn hashing_paths_agree() -> anyhow::Result<()> {
    for update in [AccountUpdate::dummy(), interesting_update()?] {
      let plain = update.hash(Mode::Plain)?;
      assert_eq!(plain, update.hash(Mode::Constrained)?);
      assert_eq!(plain, update.hash_checked()?);
    }
    Ok(())
  }

  #[test]
  fn json_roundtrip_is_identical() -> anyhow::Result<()> {
    let update = interesting_update()?;
    let json = update.to_json()?;
    let decoded = AccountUpdate::from_json(&json)?;
    assert_eq!(decoded.to_json()?, json);
    assert_eq!(serde_json::to_string(&decoded)?, serde_json::to_string(&update)?);
    assert_ne!(decoded.id(), update.id());
    assert_eq!(json["body"]["balanceChange"]["sgn"], "Negative");
    assert_eq!(json["authorization"]["proof"], serde_json::Value::Null);
    Ok(())
  }

  #[test]
  fn custom_token_sets_caller() {
    let token = TokenId(Field::from(5u64));
    let update = AccountUpdate::default_account_update(PublicKey::empty(), Some(token));
    assert_eq!(update.body.caller, token);
    assert!(update.is_dummy());
    assert!(!AccountUpdate::default_account_update(
      PrivateKey::random().to_public_key(),
      None
    )
    .is_dummy());
  }

  #[test]
  fn pretty_omits_defaults() -> anyhow::Result<()> {
    let update = AccountUpdate::dummy().with_label("noop");
    let pretty = update.to_pretty()?;
    let keys: Vec<_> = pretty.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["label".to_string(), "publicKey".to_string()]);

    let pretty = interesting_update()?.to_pretty()?;
    assert_eq!(pretty["authorization"], "lazy-signature");
    assert_eq!(pretty["balanceChange"]["magnitude"], "1000");
    assert_eq!(pretty["preconditions"]["account"]["nonce"]["lower"], "3");
    assert!(pretty["preconditions"]["account"].get("balance").is_none());
    assert!(pretty.get("callData").is_none());
    Ok(())
  }

  #[test]
  fn fee_payer_factories() {
    let key = PrivateKey::random();
    let fee_payer =
      FeePayerUnsigned::default_fee_payer(key.to_public_key(), key, UInt32(2));
    assert_eq!(fee_payer.body.nonce, UInt32(2));
    assert_eq!(fee_payer.body.fee, UInt64::zero());
    assert!(fee_payer.lazy_authorization.is_some());

    let dummy = FeePayerUnsigned::dummy();
    assert!(dummy.body.public_key.is_empty());
    assert!(dummy.lazy_authorization.is_none());
    assert_ne!(dummy.hash(), fee_payer.hash());
  }
}
