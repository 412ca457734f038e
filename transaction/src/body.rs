use {
  crate::{
    permissions::Permissions,
    preconditions::{serde_via_option, Dummy, Preconditions},
    token::TokenId,
    Error,
  },
  once_cell::sync::Lazy,
  serde::{Deserialize, Serialize},
  std::{fmt::Display, str::FromStr},
  zkapp_primitives::{
    empty_hash_with_prefix,
    hash_with_prefix,
    pack_to_fields,
    prefixes,
    serde_via_str,
    Field,
    HashInput,
    Int64,
    PublicKey,
    Sign,
    ToInput,
    UInt32,
    UInt64,
  },
};

/// Number of app state field elements of a zkApp account.
pub const ZKAPP_STATE_LENGTH: usize = 8;

const TOKEN_SYMBOL_MAX_LENGTH: usize = 6;

/// Hash of the verification key placeholder used by updates that are
/// not authorized by a proof.
pub static DUMMY_VERIFICATION_KEY_HASH: Lazy<Field> =
  Lazy::new(|| empty_hash_with_prefix(prefixes::VERIFICATION_KEY));

/// Either set a value or keep the one currently in the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOrKeep<T> {
  Keep,
  Set(T),
}

impl<T> Default for SetOrKeep<T> {
  fn default() -> Self {
    Self::Keep
  }
}

serde_via_option!(SetOrKeep, Keep, Set);

impl<T> SetOrKeep<T> {
  pub fn set_value(&mut self, value: T) {
    *self = Self::Set(value);
  }

  pub fn is_set(&self) -> bool {
    matches!(self, Self::Set(_))
  }

  pub fn value(&self) -> Option<&T> {
    match self {
      Self::Keep => None,
      Self::Set(value) => Some(value),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
  pub data: String,
  pub hash: Field,
}

impl Dummy for VerificationKey {
  fn dummy() -> Self {
    Self::default()
  }
}

/// Only the hash of a verification key is committed to.
impl ToInput for VerificationKey {
  fn to_input(&self) -> HashInput {
    HashInput::default().field(self.hash)
  }
}

fn bytes_input(bytes: &[u8]) -> HashInput {
  bytes.iter().fold(HashInput::default(), |input, b| {
    input.packed(Field::from(*b as u64), 8)
  })
}

#[derive(
  Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ZkappUri(pub String);

impl Dummy for ZkappUri {
  fn dummy() -> Self {
    Self::default()
  }
}

impl ToInput for ZkappUri {
  fn to_input(&self) -> HashInput {
    let packed = pack_to_fields(bytes_input(self.0.as_bytes()));
    HashInput::default().field(hash_with_prefix(prefixes::ZKAPP_URI, &packed))
  }
}

/// Ticker symbol of a custom token, at most 6 bytes long.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TokenSymbol(String);

impl TokenSymbol {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl FromStr for TokenSymbol {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.len() > TOKEN_SYMBOL_MAX_LENGTH {
      return Err(Error::InvalidBody(format!(
        "token symbol {s} is longer than {TOKEN_SYMBOL_MAX_LENGTH} bytes"
      )));
    }
    Ok(Self(s.to_owned()))
  }
}

impl Display for TokenSymbol {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

serde_via_str!(TokenSymbol);

impl Dummy for TokenSymbol {
  fn dummy() -> Self {
    Self::empty()
  }
}

/// Packed as a single 48 bit value, shorter symbols are zero padded.
impl ToInput for TokenSymbol {
  fn to_input(&self) -> HashInput {
    let value = self
      .0
      .bytes()
      .rev()
      .fold(0u64, |acc, b| (acc << 8) | b as u64);
    HashInput::default()
      .packed(Field::from(value), (TOKEN_SYMBOL_MAX_LENGTH * 8) as u32)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
  pub initial_minimum_balance: UInt64,
  pub cliff_time: UInt32,
  pub cliff_amount: UInt64,
  pub vesting_period: UInt32,
  pub vesting_increment: UInt64,
}

impl Dummy for Timing {
  fn dummy() -> Self {
    Self::default()
  }
}

impl ToInput for Timing {
  fn to_input(&self) -> HashInput {
    HashInput::default()
      .append(&self.initial_minimum_balance)
      .append(&self.cliff_time)
      .append(&self.cliff_amount)
      .append(&self.vesting_period)
      .append(&self.vesting_increment)
  }
}

/// Changes to the account record. Every field is kept unless set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
  pub app_state: [SetOrKeep<Field>; ZKAPP_STATE_LENGTH],
  pub delegate: SetOrKeep<PublicKey>,
  pub verification_key: SetOrKeep<VerificationKey>,
  pub permissions: SetOrKeep<Permissions>,
  pub zkapp_uri: SetOrKeep<ZkappUri>,
  pub token_symbol: SetOrKeep<TokenSymbol>,
  pub timing: SetOrKeep<Timing>,
  pub voting_for: SetOrKeep<Field>,
}

impl Update {
  pub fn no_update() -> Self {
    Self::default()
  }
}

impl ToInput for Update {
  fn to_input(&self) -> HashInput {
    HashInput::default()
      .append(&self.app_state)
      .append(&self.delegate)
      .append(&self.verification_key)
      .append(&self.permissions)
      .append(&self.zkapp_uri)
      .append(&self.token_symbol)
      .append(&self.timing)
      .append(&self.voting_for)
  }
}

macro_rules! event_list {
  ($(#[$meta:meta])* $name:ident, $empty:expr, $cons:expr) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct $name(pub Vec<Vec<Field>>);

    impl $name {
      pub fn empty() -> Self {
        Self::default()
      }

      pub fn is_empty(&self) -> bool {
        self.0.is_empty()
      }

      /// Prepends an event, the most recent event comes first.
      pub fn push(&mut self, event: Vec<Field>) {
        self.0.insert(0, event);
      }

      /// Commitment to all events, consing from the oldest one.
      pub fn hash(&self) -> Field {
        self.0.iter().rev().fold(empty_hash_with_prefix($empty), |acc, event| {
          let event_hash = hash_with_prefix(prefixes::EVENT, event);
          hash_with_prefix($cons, &[acc, event_hash])
        })
      }
    }

    impl ToInput for $name {
      fn to_input(&self) -> HashInput {
        HashInput::default().field(self.hash())
      }
    }
  };
}

event_list!(
  /// Events emitted by an account update, readable by off-chain
  /// observers but not by other zkApps.
  Events,
  prefixes::EVENTS_EMPTY,
  prefixes::EVENTS
);

event_list!(
  /// Actions dispatched by an account update. They are folded into
  /// the account's action state when the transaction is applied.
  Actions,
  prefixes::ACTIONS_EMPTY,
  prefixes::ACTIONS
);

/// Declares which kind of authorization an update carries, so that the
/// proof for an update and its actual authorization cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationKind {
  pub is_signed: bool,
  pub is_proved: bool,
  pub verification_key_hash: Field,
}

impl AuthorizationKind {
  pub fn none() -> Self {
    Self {
      is_signed: false,
      is_proved: false,
      verification_key_hash: *DUMMY_VERIFICATION_KEY_HASH,
    }
  }

  pub fn signature() -> Self {
    Self {
      is_signed: true,
      ..Self::none()
    }
  }

  pub fn proof(verification_key_hash: Field) -> Self {
    Self {
      is_signed: false,
      is_proved: true,
      verification_key_hash,
    }
  }
}

impl Default for AuthorizationKind {
  fn default() -> Self {
    Self::none()
  }
}

impl ToInput for AuthorizationKind {
  fn to_input(&self) -> HashInput {
    HashInput::default()
      .append(&self.is_signed)
      .append(&self.is_proved)
      .append(&self.verification_key_hash)
  }
}

/// The part of an account update that is hashed and authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
  pub public_key: PublicKey,
  pub token_id: TokenId,
  pub update: Update,
  pub balance_change: Int64,
  pub increment_nonce: bool,
  pub events: Events,
  pub actions: Actions,
  pub call_data: Field,
  pub call_depth: u32,
  pub preconditions: Preconditions,
  pub use_full_commitment: bool,
  pub caller: TokenId,
  pub authorization_kind: AuthorizationKind,
}

impl Body {
  /// A body that does not change anything about the account.
  ///
  /// Signed updates usually don't include the fee payer, so
  /// `use_full_commitment` starts out as false.
  pub fn keep_all(public_key: PublicKey) -> Self {
    Self {
      public_key,
      token_id: TokenId::default(),
      update: Update::no_update(),
      balance_change: Int64::zero(),
      increment_nonce: false,
      events: Events::empty(),
      actions: Actions::empty(),
      call_data: Field::zero(),
      call_depth: 0,
      preconditions: Preconditions::ignore_all(),
      use_full_commitment: false,
      caller: TokenId::default(),
      authorization_kind: AuthorizationKind::none(),
    }
  }

  pub fn dummy() -> Self {
    Self::keep_all(PublicKey::empty())
  }

  /// Validates the properties the type system does not enforce.
  pub fn check(&self) -> Result<(), Error> {
    let balance = &self.balance_change;
    if balance.magnitude.value() == 0 && balance.sgn == Sign::Negative {
      return Err(Error::InvalidBody(
        "balance change of zero must be positive".into(),
      ));
    }

    let kind = &self.authorization_kind;
    if kind.is_signed && kind.is_proved {
      return Err(Error::InvalidBody(
        "an update cannot be both signed and proved".into(),
      ));
    }
    if !kind.is_proved
      && kind.verification_key_hash != *DUMMY_VERIFICATION_KEY_HASH
    {
      return Err(Error::InvalidBody(
        "verification key hash is only allowed on proved updates".into(),
      ));
    }

    if let Some(symbol) = self.update.token_symbol.value() {
      symbol.as_str().parse::<TokenSymbol>()?;
    }
    Ok(())
  }
}

/// The call depth is structural and derived from the position of an
/// update in the forest, so it is not committed to.
impl ToInput for Body {
  fn to_input(&self) -> HashInput {
    HashInput::default()
      .append(&self.public_key)
      .append(&self.token_id)
      .append(&self.update)
      .append(&self.balance_change)
      .append(&self.increment_nonce)
      .append(&self.events)
      .append(&self.actions)
      .append(&self.call_data)
      .append(&self.preconditions)
      .append(&self.use_full_commitment)
      .append(&self.caller)
      .append(&self.authorization_kind)
  }
}
