use {
  crate::{serde_via_str, Error, Field, HashInput, ToInput},
  serde::{Deserialize, Serialize},
  std::{fmt::Display, str::FromStr},
};

macro_rules! unsigned {
  ($name:ident, $inner:ty, $bits:expr) => {
    #[derive(
      Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord,
    )]
    pub struct $name(pub $inner);

    impl $name {
      pub const MAX: Self = Self(<$inner>::MAX);

      pub const fn zero() -> Self {
        Self(0)
      }

      pub fn value(&self) -> $inner {
        self.0
      }

      pub fn add(self, other: impl Into<Self>) -> Result<Self, Error> {
        self
          .0
          .checked_add(other.into().0)
          .map(Self)
          .ok_or(Error::Overflow)
      }

      pub fn sub(self, other: impl Into<Self>) -> Result<Self, Error> {
        self
          .0
          .checked_sub(other.into().0)
          .map(Self)
          .ok_or(Error::Underflow)
      }
    }

    impl From<$inner> for $name {
      fn from(value: $inner) -> Self {
        Self(value)
      }
    }

    impl Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
      }
    }

    impl FromStr for $name {
      type Err = Error;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<$inner>()
          .map(Self)
          .map_err(|_| Error::InvalidNumber(s.to_owned()))
      }
    }

    impl ToInput for $name {
      fn to_input(&self) -> HashInput {
        HashInput::default().packed(Field::from(self.0), $bits)
      }
    }

    serde_via_str!($name);
  };
}

unsigned!(UInt32, u32, 32);
unsigned!(UInt64, u64, 64);

impl From<UInt32> for UInt64 {
  fn from(value: UInt32) -> Self {
    Self(value.0 as u64)
  }
}

#[derive(
  Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum Sign {
  #[default]
  Positive,
  Negative,
}

impl ToInput for Sign {
  fn to_input(&self) -> HashInput {
    HashInput::default().packed(Field::from(*self == Sign::Positive), 1)
  }
}

/// A signed 64-bit magnitude, as used for balance changes.
///
/// Zero is always represented with a positive sign.
#[derive(
  Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct Int64 {
  pub magnitude: UInt64,
  pub sgn: Sign,
}

impl Int64 {
  pub const fn zero() -> Self {
    Self {
      magnitude: UInt64(0),
      sgn: Sign::Positive,
    }
  }

  fn to_i128(self) -> i128 {
    match self.sgn {
      Sign::Positive => self.magnitude.0 as i128,
      Sign::Negative => -(self.magnitude.0 as i128),
    }
  }

  fn from_i128(value: i128) -> Result<Self, Error> {
    let magnitude = u64::try_from(value.unsigned_abs()).map_err(|_| {
      if value < 0 {
        Error::Underflow
      } else {
        Error::Overflow
      }
    })?;
    Ok(Self {
      magnitude: UInt64(magnitude),
      sgn: if value < 0 {
        Sign::Negative
      } else {
        Sign::Positive
      },
    })
  }

  pub fn add(self, amount: impl Into<UInt64>) -> Result<Self, Error> {
    Self::from_i128(self.to_i128() + amount.into().0 as i128)
  }

  pub fn sub(self, amount: impl Into<UInt64>) -> Result<Self, Error> {
    Self::from_i128(self.to_i128() - amount.into().0 as i128)
  }

  pub fn is_negative(&self) -> bool {
    self.sgn == Sign::Negative && self.magnitude.0 != 0
  }
}

impl ToInput for Int64 {
  fn to_input(&self) -> HashInput {
    HashInput::default().append(&self.magnitude).append(&self.sgn)
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{Int64, Sign, UInt32, UInt64},
    crate::Error,
  };

  #[test]
  fn balance_arithmetic() -> Result<(), Error> {
    let change = Int64::zero().sub(10u64)?;
    assert_eq!(change.sgn, Sign::Negative);
    assert_eq!(change.magnitude, UInt64(10));

    let change = change.add(25u64)?;
    assert_eq!(change.sgn, Sign::Positive);
    assert_eq!(change.magnitude, UInt64(15));

    let zero = change.sub(15u64)?;
    assert_eq!(zero, Int64::zero());
    Ok(())
  }

  #[test]
  fn overflow_is_reported() {
    let max = Int64 {
      magnitude: UInt64::MAX,
      sgn: Sign::Positive,
    };
    assert_eq!(max.add(1u64), Err(Error::Overflow));
    assert_eq!(UInt32::MAX.add(1u32), Err(Error::Overflow));
    assert_eq!(UInt64::zero().sub(1u64), Err(Error::Underflow));
  }

  #[test]
  fn json_uses_strings() {
    let json = serde_json::to_string(&Int64::zero().sub(7u64).unwrap())
      .unwrap();
    assert_eq!(json, r#"{"magnitude":"7","sgn":"Negative"}"#);
  }
}
