use {
  crate::{serde_via_str, Error},
  primitive_types::U256,
  std::{
    fmt::{Debug, Display},
    str::FromStr,
  },
};

/// Order of the base field of the Pallas curve.
///
/// Every [`Field`] value is kept strictly below this modulus.
const MODULUS: U256 = U256([
  0x992d30ed00000001,
  0x224698fc094cf91b,
  0x0000000000000000,
  0x4000000000000000,
]);

/// Number of bits that can be packed into a single field element
/// without wrapping around the modulus.
pub(crate) const PACKED_BITS: u32 = 254;

/// An element of the prime field used for hashing, token ids,
/// zkApp state and every other value that ends up in a proof's
/// public input.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Field(U256);

impl Field {
  pub const fn zero() -> Self {
    Self(U256([0, 0, 0, 0]))
  }

  pub const fn one() -> Self {
    Self(U256([1, 0, 0, 0]))
  }

  pub fn is_zero(&self) -> bool {
    self.0.is_zero()
  }

  /// Interprets 32 big-endian bytes as a field element, rejecting
  /// values that are not canonical (greater or equal to the modulus).
  pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, Error> {
    let value = U256::from_big_endian(bytes);
    if value >= MODULUS {
      return Err(Error::FieldOutOfRange(value.to_string()));
    }
    Ok(Self(value))
  }

  /// Reduces an arbitrary hash digest (at most 32 bytes) into the field.
  pub fn from_digest(digest: &[u8]) -> Self {
    let digest = &digest[..digest.len().min(32)];
    Self(U256::from_big_endian(digest) % MODULUS)
  }

  pub fn to_bytes(&self) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    self.0.to_big_endian(&mut bytes);
    bytes
  }

  /// Packed chunks never exceed [`PACKED_BITS`], so the reduction
  /// is a no-op for them.
  pub(crate) fn from_u256(value: U256) -> Self {
    Self(value % MODULUS)
  }

  pub(crate) fn as_u256(&self) -> U256 {
    self.0
  }
}

impl From<u64> for Field {
  fn from(value: u64) -> Self {
    Self(U256::from(value))
  }
}

impl From<u32> for Field {
  fn from(value: u32) -> Self {
    Self(U256::from(value))
  }
}

impl From<bool> for Field {
  fn from(value: bool) -> Self {
    if value {
      Self::one()
    } else {
      Self::zero()
    }
  }
}

impl Display for Field {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl Debug for Field {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "field({})", self.0)
  }
}

impl FromStr for Field {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let value = U256::from_dec_str(s)
      .map_err(|_| Error::InvalidNumber(s.to_owned()))?;
    if value >= MODULUS {
      return Err(Error::FieldOutOfRange(s.to_owned()));
    }
    Ok(Self(value))
  }
}

serde_via_str!(Field);
