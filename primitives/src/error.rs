use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
  #[error("Invalid base58 encoding: {0}")]
  Base58(String),

  #[error("Invalid base58 version byte, expected {expected}")]
  Base58Version { expected: u8 },

  #[error("Value {0} is not a valid field element")]
  FieldOutOfRange(String),

  #[error("Invalid number {0:?}")]
  InvalidNumber(String),

  #[error("Integer overflow")]
  Overflow,

  #[error("Integer underflow")]
  Underflow,

  #[error("Memo is too long: {0} bytes, at most 32 are allowed")]
  MemoTooLong(usize),

  #[error("Invalid memo encoding")]
  InvalidMemo,

  #[error("Invalid key: {0}")]
  InvalidKey(String),

  #[error("Invalid signature: {0}")]
  InvalidSignature(String),
}

impl From<bs58::decode::Error> for Error {
  fn from(e: bs58::decode::Error) -> Self {
    Error::Base58(e.to_string())
  }
}

impl From<ed25519_dalek::SignatureError> for Error {
  fn from(e: ed25519_dalek::SignatureError) -> Self {
    Error::InvalidKey(e.to_string())
  }
}
