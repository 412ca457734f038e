use {
  crate::{
    b58::{decode_check, encode_check},
    hash_with_prefix,
    pack_to_fields,
    prefixes,
    Error,
    Field,
    HashInput,
  },
  std::fmt::{Debug, Display},
};

const MEMO_VERSION: u8 = 0x14;
const MEMO_TAG: u8 = 0x01;
const MEMO_LEN: usize = 34;
const MAX_MEMO_TEXT: usize = MEMO_LEN - 2;

/// A user supplied note attached to a transaction.
///
/// On the wire the memo is a fixed 34 byte value: a tag byte, a length
/// byte and up to 32 bytes of text padded with zeros. Its textual form
/// in JSON is the base58check encoding of those bytes.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Memo([u8; MEMO_LEN]);

impl Memo {
  pub fn from_string(text: &str) -> Result<Self, Error> {
    let bytes = text.as_bytes();
    if bytes.len() > MAX_MEMO_TEXT {
      return Err(Error::MemoTooLong(bytes.len()));
    }
    let mut memo = [0u8; MEMO_LEN];
    memo[0] = MEMO_TAG;
    memo[1] = bytes.len() as u8;
    memo[2..2 + bytes.len()].copy_from_slice(bytes);
    Ok(Self(memo))
  }

  pub fn empty() -> Self {
    let mut memo = [0u8; MEMO_LEN];
    memo[0] = MEMO_TAG;
    Self(memo)
  }

  pub fn to_base58(&self) -> String {
    encode_check(MEMO_VERSION, &self.0)
  }

  pub fn from_base58(encoded: &str) -> Result<Self, Error> {
    let bytes: [u8; MEMO_LEN] = decode_check(MEMO_VERSION, encoded)?
      .try_into()
      .map_err(|_| Error::InvalidMemo)?;
    if bytes[0] != MEMO_TAG || bytes[1] as usize > MAX_MEMO_TEXT {
      return Err(Error::InvalidMemo);
    }
    Ok(Self(bytes))
  }

  pub fn text(&self) -> String {
    let len = self.0[1] as usize;
    String::from_utf8_lossy(&self.0[2..2 + len]).into_owned()
  }

  /// Commitment to the memo bytes, part of the full transaction commitment.
  pub fn hash(&self) -> Field {
    let input = self.0.iter().fold(HashInput::default(), |input, byte| {
      input.packed(Field::from(*byte as u64), 8)
    });
    hash_with_prefix(prefixes::ZKAPP_MEMO, &pack_to_fields(input))
  }
}

impl Default for Memo {
  fn default() -> Self {
    Self::empty()
  }
}

impl Display for Memo {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.text())
  }
}

impl Debug for Memo {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "memo({:?})", self.text())
  }
}
