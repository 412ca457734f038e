use {
  crate::{field::PACKED_BITS, Field},
  multihash::{Hasher, Sha3_256},
  primitive_types::U256,
};

/// Domain separation prefixes. Every hash computed in the protocol
/// uses exactly one of those, so digests of different kinds of objects
/// can never collide.
pub mod prefixes {
  pub const BODY: &str = "MinaZkappBody";
  pub const ACCOUNT_UPDATE_NODE: &str = "MinaAcctUpdateNode";
  pub const ACCOUNT_UPDATE_CONS: &str = "MinaAcctUpdateCons";
  pub const FEE_PAYER: &str = "MinaZkappFeePayer";
  pub const EVENT: &str = "MinaZkappEvent";
  pub const EVENTS: &str = "MinaZkappEvents";
  pub const EVENTS_EMPTY: &str = "MinaZkappEventsEmpty";
  pub const ACTIONS: &str = "MinaZkappSeqEvents";
  pub const ACTIONS_EMPTY: &str = "MinaZkappActionsEmpty";
  pub const ACTION_STATE_EMPTY: &str = "MinaZkappActionStateEmptyElt";
  pub const DERIVE_TOKEN_ID: &str = "MinaDeriveTokenId";
  pub const ZKAPP_URI: &str = "MinaZkappUri";
  pub const ZKAPP_MEMO: &str = "MinaZkappMemo";
  pub const VERIFICATION_KEY: &str = "MinaZkappVk";
}

const PREFIX_LEN: usize = 20;

fn prefix_bytes(prefix: &str) -> [u8; PREFIX_LEN] {
  let mut bytes = [b'*'; PREFIX_LEN];
  let len = prefix.len().min(PREFIX_LEN);
  bytes[..len].copy_from_slice(&prefix.as_bytes()[..len]);
  bytes
}

/// Hashes a list of field elements under a domain prefix.
pub fn hash_with_prefix(prefix: &str, input: &[Field]) -> Field {
  let mut hasher = Sha3_256::default();
  hasher.update(&prefix_bytes(prefix));
  for field in input {
    hasher.update(&field.to_bytes());
  }
  Field::from_digest(hasher.finalize())
}

pub fn empty_hash_with_prefix(prefix: &str) -> Field {
  hash_with_prefix(prefix, &[])
}

/// An intermediate representation of a value about to be hashed.
///
/// Full field elements go to `fields`, small values (booleans, integers,
/// short strings) go to `packed` together with their bit width, so that
/// several of them can share one field element after packing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashInput {
  pub fields: Vec<Field>,
  pub packed: Vec<(Field, u32)>,
}

impl HashInput {
  pub fn field(mut self, field: Field) -> Self {
    self.fields.push(field);
    self
  }

  pub fn packed(mut self, value: Field, bits: u32) -> Self {
    debug_assert!(bits <= PACKED_BITS);
    self.packed.push((value, bits));
    self
  }

  pub fn append<T: ToInput + ?Sized>(mut self, value: &T) -> Self {
    let other = value.to_input();
    self.fields.extend(other.fields);
    self.packed.extend(other.packed);
    self
  }
}

/// Types that have a canonical arithmetized encoding.
pub trait ToInput {
  fn to_input(&self) -> HashInput;
}

impl ToInput for Field {
  fn to_input(&self) -> HashInput {
    HashInput::default().field(*self)
  }
}

impl ToInput for bool {
  fn to_input(&self) -> HashInput {
    HashInput::default().packed(Field::from(*self), 1)
  }
}

impl<T: ToInput> ToInput for [T] {
  fn to_input(&self) -> HashInput {
    self
      .iter()
      .fold(HashInput::default(), |input, item| input.append(item))
  }
}

impl<T: ToInput, const N: usize> ToInput for [T; N] {
  fn to_input(&self) -> HashInput {
    self.as_slice().to_input()
  }
}

impl<T: ToInput> ToInput for Vec<T> {
  fn to_input(&self) -> HashInput {
    self.as_slice().to_input()
  }
}

impl ToInput for HashInput {
  fn to_input(&self) -> HashInput {
    self.clone()
  }
}

impl<T: ToInput + ?Sized> ToInput for &T {
  fn to_input(&self) -> HashInput {
    (**self).to_input()
  }
}

/// Packs all small values of a hash input into as few field elements
/// as possible and appends them after the full field elements.
pub fn pack_to_fields(input: HashInput) -> Vec<Field> {
  let HashInput { mut fields, packed } = input;
  if packed.is_empty() {
    return fields;
  }

  let mut current = U256::zero();
  let mut size = 0u32;
  for (value, bits) in packed {
    if size + bits > PACKED_BITS {
      fields.push(Field::from_u256(current));
      current = U256::zero();
      size = 0;
    }
    current = (current << bits as usize) + value.as_u256();
    size += bits;
  }
  fields.push(Field::from_u256(current));
  fields
}
