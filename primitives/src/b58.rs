use crate::Error;

/// Plain base58 form of raw key and signature bytes.
pub trait ToBase58String {
  fn to_b58(&self) -> String;
}

impl<const N: usize> ToBase58String for [u8; N] {
  fn to_b58(&self) -> String {
    bs58::encode(self).into_string()
  }
}

/// Base58check encoding with a leading version byte.
pub fn encode_check(version: u8, payload: &[u8]) -> String {
  bs58::encode(payload)
    .with_check_version(version)
    .into_string()
}

/// Decodes a base58check string produced by [`encode_check`] and
/// returns the payload without the version byte.
pub fn decode_check(version: u8, encoded: &str) -> Result<Vec<u8>, Error> {
  let mut bytes = bs58::decode(encoded)
    .with_check(Some(version))
    .into_vec()?;
  if bytes.first() != Some(&version) {
    return Err(Error::Base58Version { expected: version });
  }
  bytes.remove(0);
  Ok(bytes)
}
