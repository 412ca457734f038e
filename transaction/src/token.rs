use {
  crate::{wire, AccountUpdate, CallForest, Error, Mode, UpdateId},
  std::{fmt::Display, str::FromStr},
  tracing::debug,
  zkapp_primitives::{
    decode_check,
    encode_check,
    hash_with_prefix,
    pack_to_fields,
    prefixes,
    serde_via_str,
    Field,
    HashInput,
    PublicKey,
    ToInput,
    UInt64,
  },
};

pub(crate) const TOKEN_ID_VERSION: u8 = 0x1c;

/// Identifies the token an account holds.
///
/// The native token has id 1, custom tokens have ids derived from their
/// owner account and the token of that owner account.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub Field);

impl TokenId {
  pub fn is_default(&self) -> bool {
    self.0 == Field::one()
  }
}

impl Default for TokenId {
  fn default() -> Self {
    Self(Field::one())
  }
}

impl From<Field> for TokenId {
  fn from(field: Field) -> Self {
    Self(field)
  }
}

impl Display for TokenId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&encode_check(TOKEN_ID_VERSION, &self.0.to_bytes()))
  }
}

impl FromStr for TokenId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let bytes: [u8; 32] = decode_check(TOKEN_ID_VERSION, s)?
      .try_into()
      .map_err(|_| Error::TokenId(format!("{s} is not a 32 byte token id")))?;
    Ok(Self(Field::from_bytes(&bytes)?))
  }
}

serde_via_str!(TokenId);

impl ToInput for TokenId {
  fn to_input(&self) -> HashInput {
    self.0.to_input()
  }
}

/// A custom token, owned by the account `owner` which holds tokens
/// of type `parent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub id: TokenId,
  pub parent: TokenId,
  pub owner: PublicKey,
}

impl Token {
  pub fn new(owner: PublicKey, parent: TokenId) -> Result<Self, Error> {
    let id = Self::get_id(&owner, &parent, Mode::Plain)?;
    Ok(Self { id, parent, owner })
  }

  /// Derives the id of the token owned by `owner`.
  ///
  /// The plain path hashes the wire encodings of both inputs, the
  /// constrained path packs the typed values. They produce the same id.
  pub fn get_id(
    owner: &PublicKey,
    parent: &TokenId,
    mode: Mode,
  ) -> Result<TokenId, Error> {
    match mode {
      Mode::Constrained => {
        let input = HashInput::default().append(owner).append(parent);
        Ok(TokenId(hash_with_prefix(
          prefixes::DERIVE_TOKEN_ID,
          &pack_to_fields(input),
        )))
      }
      Mode::Plain => {
        wire::derive_token_id(&owner.to_string(), &parent.to_string())
          .map(TokenId)
          .map_err(|e| Error::TokenId(e.to_string()))
      }
    }
  }
}

/// Mint, burn and send operations on the custom token owned by one
/// account update. Every operation creates a child of that update.
pub struct TokenHandle<'f> {
  forest: &'f mut CallForest,
  owner: UpdateId,
  token: Token,
}

impl<'f> TokenHandle<'f> {
  pub fn id(&self) -> TokenId {
    self.token.id
  }

  pub fn token(&self) -> &Token {
    &self.token
  }

  pub fn mint(
    &mut self,
    address: PublicKey,
    amount: impl Into<UInt64>,
  ) -> Result<UpdateId, Error> {
    let receiver =
      self
        .forest
        .create_child(self.owner, address, Some(self.token.id))?;
    self.forest.get_mut(receiver)?.balance().add_in_place(amount)?;
    debug!("minting {} to {address}", self.token.id);
    Ok(receiver)
  }

  pub fn burn(
    &mut self,
    address: PublicKey,
    amount: impl Into<UInt64>,
  ) -> Result<UpdateId, Error> {
    let sender =
      self
        .forest
        .create_child(self.owner, address, Some(self.token.id))?;
    let update = self.forest.get_mut(sender)?;
    update.body.use_full_commitment = true;
    update.balance().sub_in_place(amount)?;
    update.set_lazy_signature(None);
    debug!("burning {} from {address}", self.token.id);
    Ok(sender)
  }

  /// Moves tokens between two accounts, the sender leg has to be signed
  /// by the owner of `from`. Returns the receiver update.
  pub fn send(
    &mut self,
    from: PublicKey,
    to: PublicKey,
    amount: impl Into<UInt64>,
  ) -> Result<UpdateId, Error> {
    let amount = amount.into();
    let sender =
      self
        .forest
        .create_child(self.owner, from, Some(self.token.id))?;
    let update = self.forest.get_mut(sender)?;
    update.body.use_full_commitment = true;
    update.balance().sub_in_place(amount)?;
    update.set_lazy_signature(None);

    let receiver =
      self
        .forest
        .create_child(self.owner, to, Some(self.token.id))?;
    self.forest.get_mut(receiver)?.balance().add_in_place(amount)?;
    debug!("sending {amount} of {} from {from} to {to}", self.token.id);
    Ok(receiver)
  }
}

/// Destination of a transfer: either an address that gets a fresh
/// update, or an update that already exists in the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
  Address(PublicKey),
  Update(UpdateId),
}

impl From<PublicKey> for Receiver {
  fn from(address: PublicKey) -> Self {
    Self::Address(address)
  }
}

impl From<UpdateId> for Receiver {
  fn from(id: UpdateId) -> Self {
    Self::Update(id)
  }
}

impl CallForest {
  /// Capability over the custom token owned by the account of `owner`.
  pub fn token(&mut self, owner: UpdateId) -> Result<TokenHandle<'_>, Error> {
    let body = &self.get(owner)?.body;
    let token = Token::new(body.public_key, body.token_id)?;
    Ok(TokenHandle {
      forest: self,
      owner,
      token,
    })
  }

  /// Sends `amount` of the token held by `from` to a receiver, which
  /// becomes a child of `from`. Returns the receiver update.
  pub fn send(
    &mut self,
    from: UpdateId,
    to: impl Into<Receiver>,
    amount: impl Into<UInt64>,
  ) -> Result<UpdateId, Error> {
    let amount = amount.into();
    let token_id = self.get(from)?.body.token_id;
    let receiver = match to.into() {
      Receiver::Update(id) => {
        let existing = self.get(id)?.body.token_id;
        if existing != token_id {
          return Err(Error::InvalidBody(format!(
            "receiver {id} holds token {existing}, expected {token_id}"
          )));
        }
        id
      }
      Receiver::Address(address) => self.insert_detached(
        AccountUpdate::default_account_update(address, Some(token_id)),
      )?,
    };
    self.make_child(from, receiver)?;
    self.get_mut(from)?.balance().sub_in_place(amount)?;
    self.get_mut(receiver)?.balance().add_in_place(amount)?;
    Ok(receiver)
  }
}
