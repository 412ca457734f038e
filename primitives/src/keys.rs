use {
  crate::{
    b58::{decode_check, encode_check, ToBase58String},
    serde_via_str,
    Error,
    Field,
    HashInput,
    ToInput,
  },
  ed25519_dalek::{Keypair, SecretKey, Signer, Verifier},
  std::{
    fmt::{Debug, Display},
    str::FromStr,
  },
};

const PRIVATE_KEY_VERSION: u8 = 0x5a;

/// Represents the address of an account.
///
/// Addresses of user accounts are ed25519 public keys. The all-zero key
/// is reserved as the "empty" address, it has no private key and marks
/// dummy account updates that never make it into a transaction.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
  pub const fn empty() -> Self {
    Self([0u8; 32])
  }

  pub fn is_empty(&self) -> bool {
    self.0 == [0u8; 32]
  }

  pub fn as_bytes(&self) -> &[u8; 32] {
    &self.0
  }

  pub fn from_bytes(bytes: [u8; 32]) -> Self {
    Self(bytes)
  }
}

impl AsRef<[u8]> for PublicKey {
  fn as_ref(&self) -> &[u8] {
    &self.0
  }
}

impl Display for PublicKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0.to_b58())
  }
}

impl Debug for PublicKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "pubkey({})", self.0.to_b58())
  }
}

impl FromStr for PublicKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut bytes = [0u8; 32];
    let len = bs58::decode(s).into(&mut bytes)?;
    if len != 32 {
      return Err(Error::InvalidKey(format!("{s} is not a 32 byte key")));
    }
    Ok(Self(bytes))
  }
}

impl From<ed25519_dalek::PublicKey> for PublicKey {
  fn from(p: ed25519_dalek::PublicKey) -> Self {
    Self(*p.as_bytes())
  }
}

/// The first 31 bytes form a full field element, the last byte is
/// packed with the other small values.
impl ToInput for PublicKey {
  fn to_input(&self) -> HashInput {
    let mut high = [0u8; 32];
    high[1..].copy_from_slice(&self.0[..31]);
    HashInput::default()
      .field(Field::from_digest(&high))
      .packed(Field::from(self.0[31] as u64), 8)
  }
}

serde_via_str!(PublicKey);

/// A private key that controls an account.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
  secret: [u8; 32],
  public: PublicKey,
}

impl PrivateKey {
  pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
    let secret = SecretKey::from_bytes(bytes)?;
    let public = ed25519_dalek::PublicKey::from(&secret);
    Ok(Self {
      secret: secret.to_bytes(),
      public: public.into(),
    })
  }

  pub fn random() -> Self {
    let secret = SecretKey::generate(&mut rand::thread_rng());
    let public = ed25519_dalek::PublicKey::from(&secret);
    Self {
      secret: secret.to_bytes(),
      public: public.into(),
    }
  }

  pub fn to_public_key(&self) -> PublicKey {
    self.public
  }

  pub fn to_base58(&self) -> String {
    encode_check(PRIVATE_KEY_VERSION, &self.secret)
  }

  /// Signs the canonical 32-byte encoding of a field element,
  /// typically a transaction commitment.
  pub fn sign_field_element(&self, message: &Field) -> Result<Signature, Error> {
    let secret = SecretKey::from_bytes(&self.secret)?;
    let public = ed25519_dalek::PublicKey::from(&secret);
    let keypair = Keypair { secret, public };
    Ok(Signature(keypair.sign(&message.to_bytes()).to_bytes()))
  }
}

impl From<&Keypair> for PrivateKey {
  fn from(keypair: &Keypair) -> Self {
    Self {
      secret: keypair.secret.to_bytes(),
      public: keypair.public.into(),
    }
  }
}

impl FromStr for PrivateKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::from_bytes(&decode_check(PRIVATE_KEY_VERSION, s)?)
  }
}

impl Debug for PrivateKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PrivateKey")
      .field("public", &self.public)
      .finish_non_exhaustive()
  }
}

/// An ed25519 signature over a field element.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
  /// Placeholder used before the real signature is known.
  pub const fn dummy() -> Self {
    Self([0u8; 64])
  }

  pub fn to_bytes(&self) -> [u8; 64] {
    self.0
  }
}

impl Display for Signature {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0.to_b58())
  }
}

impl Debug for Signature {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "signature({self})")
  }
}

impl FromStr for Signature {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut bytes = [0u8; 64];
    let len = bs58::decode(s).into(&mut bytes)?;
    if len != 64 {
      return Err(Error::InvalidSignature(s.to_owned()));
    }
    Ok(Self(bytes))
  }
}

serde_via_str!(Signature);

/// Checks an ed25519 signature over the encoding of a field element.
pub fn verify_field_element(
  public_key: &PublicKey,
  message: &Field,
  signature: &Signature,
) -> bool {
  let Ok(public_key) = ed25519_dalek::PublicKey::from_bytes(&public_key.0)
  else {
    return false;
  };
  let Ok(signature) = ed25519_dalek::Signature::try_from(&signature.0[..])
  else {
    return false;
  };
  public_key.verify(&message.to_bytes(), &signature).is_ok()
}
