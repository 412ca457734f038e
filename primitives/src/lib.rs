mod b58;
mod error;
mod field;
mod hash;
mod ints;
mod keys;
mod memo;

pub use {
  b58::{decode_check, encode_check, ToBase58String},
  error::Error,
  field::Field,
  hash::{
    empty_hash_with_prefix,
    hash_with_prefix,
    pack_to_fields,
    prefixes,
    HashInput,
    ToInput,
  },
  ints::{Int64, Sign, UInt32, UInt64},
  keys::{verify_field_element, PrivateKey, PublicKey, Signature},
  memo::Memo,
};

/// Implements string based serde for types that have a canonical
/// textual representation through `Display` and `FromStr`.
#[macro_export]
macro_rules! serde_via_str {
  ($ty:ty) => {
    impl serde::Serialize for $ty {
      fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
      ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
      }
    }

    impl<'de> serde::Deserialize<'de> for $ty {
      fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
      ) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
      }
    }
  };
}
