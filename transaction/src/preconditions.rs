use {
  serde::{Deserialize, Serialize},
  zkapp_primitives::{
    empty_hash_with_prefix,
    prefixes,
    Field,
    HashInput,
    PublicKey,
    ToInput,
    UInt32,
    UInt64,
  },
};

/// Value that stands in for an absent optional value when it is encoded
/// for hashing. Hash inputs have a fixed shape, so an ignored or kept
/// field still contributes a value of the right type.
pub trait Dummy {
  fn dummy() -> Self;
}

impl Dummy for Field {
  fn dummy() -> Self {
    Field::zero()
  }
}

impl Dummy for PublicKey {
  fn dummy() -> Self {
    PublicKey::empty()
  }
}

impl Dummy for bool {
  fn dummy() -> Self {
    false
  }
}

impl Dummy for UInt32 {
  fn dummy() -> Self {
    UInt32::zero()
  }
}

impl Dummy for UInt64 {
  fn dummy() -> Self {
    UInt64::zero()
  }
}

/// Implements serde for a two state optional wrapper so that the absent
/// state is `null` on the wire and the present state is the bare value.
macro_rules! serde_via_option {
  ($ty:ident, $absent:ident, $present:ident) => {
    impl<T: serde::Serialize> serde::Serialize for $ty<T> {
      fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
      ) -> Result<S::Ok, S::Error> {
        match self {
          $ty::$absent => serializer.serialize_none(),
          $ty::$present(value) => serializer.serialize_some(value),
        }
      }
    }

    impl<'de, T: serde::Deserialize<'de>> serde::Deserialize<'de> for $ty<T> {
      fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
      ) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
          None => $ty::$absent,
          Some(value) => $ty::$present(value),
        })
      }
    }

    impl<T: ToInput + Dummy> ToInput for $ty<T> {
      fn to_input(&self) -> HashInput {
        match self {
          $ty::$absent => HashInput::default()
            .append(&false)
            .append(&T::dummy()),
          $ty::$present(value) => {
            HashInput::default().append(&true).append(value)
          }
        }
      }
    }
  };
}

pub(crate) use serde_via_option;

/// Either check a value or ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrIgnore<T> {
  Ignore,
  Check(T),
}

impl<T> Default for OrIgnore<T> {
  fn default() -> Self {
    Self::Ignore
  }
}

serde_via_option!(OrIgnore, Ignore, Check);

impl<T> OrIgnore<T> {
  pub fn is_some(&self) -> bool {
    matches!(self, Self::Check(_))
  }

  pub fn value(&self) -> Option<&T> {
    match self {
      Self::Ignore => None,
      Self::Check(value) => Some(value),
    }
  }
}

/// All the values between `lower` and `upper`, inclusive of both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedInterval<T> {
  pub lower: T,
  pub upper: T,
}

/// Integer types that can be bounded by a closed interval.
pub trait Bounded: Copy + PartialOrd {
  const MIN: Self;
  const MAX: Self;
}

impl Bounded for UInt32 {
  const MAX: Self = UInt32::MAX;
  const MIN: Self = UInt32::zero();
}

impl Bounded for UInt64 {
  const MAX: Self = UInt64::MAX;
  const MIN: Self = UInt64::zero();
}

/// An ignored interval covers the whole range of its type.
impl<T: Bounded> Dummy for ClosedInterval<T> {
  fn dummy() -> Self {
    Self {
      lower: T::MIN,
      upper: T::MAX,
    }
  }
}

impl<T: ToInput> ToInput for ClosedInterval<T> {
  fn to_input(&self) -> HashInput {
    HashInput::default().append(&self.lower).append(&self.upper)
  }
}

impl<T: Bounded> OrIgnore<ClosedInterval<T>> {
  pub fn assert_equals(&mut self, value: T) {
    *self = Self::Check(ClosedInterval {
      lower: value,
      upper: value,
    });
  }

  pub fn assert_between(&mut self, lower: T, upper: T) {
    *self = Self::Check(ClosedInterval { lower, upper });
  }

  pub fn contains(&self, value: T) -> bool {
    match self {
      Self::Ignore => true,
      Self::Check(range) => range.lower <= value && value <= range.upper,
    }
  }
}

macro_rules! assert_equals {
  ($($ty:ty),*) => {
    $(
      impl OrIgnore<$ty> {
        pub fn assert_equals(&mut self, value: $ty) {
          *self = Self::Check(value);
        }
      }
    )*
  };
}

assert_equals!(Field, PublicKey, bool);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochLedger {
  pub hash: OrIgnore<Field>,
  pub total_currency: OrIgnore<ClosedInterval<UInt64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochData {
  pub ledger: EpochLedger,
  pub seed: OrIgnore<Field>,
  pub start_checkpoint: OrIgnore<Field>,
  pub lock_checkpoint: OrIgnore<Field>,
  pub epoch_length: OrIgnore<ClosedInterval<UInt32>>,
}

impl ToInput for EpochData {
  fn to_input(&self) -> HashInput {
    HashInput::default()
      .append(&self.ledger.hash)
      .append(&self.ledger.total_currency)
      .append(&self.seed)
      .append(&self.start_checkpoint)
      .append(&self.lock_checkpoint)
      .append(&self.epoch_length)
  }
}

/// Assertions about the state of the chain at the time the transaction
/// is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPrecondition {
  pub snarked_ledger_hash: OrIgnore<Field>,
  pub timestamp: OrIgnore<ClosedInterval<UInt64>>,
  pub blockchain_length: OrIgnore<ClosedInterval<UInt32>>,
  pub min_window_density: OrIgnore<ClosedInterval<UInt32>>,
  pub total_currency: OrIgnore<ClosedInterval<UInt64>>,
  pub global_slot_since_hard_fork: OrIgnore<ClosedInterval<UInt32>>,
  pub global_slot_since_genesis: OrIgnore<ClosedInterval<UInt32>>,
  pub staking_epoch_data: EpochData,
  pub next_epoch_data: EpochData,
}

impl NetworkPrecondition {
  pub fn ignore_all() -> Self {
    Self::default()
  }
}

impl ToInput for NetworkPrecondition {
  fn to_input(&self) -> HashInput {
    HashInput::default()
      .append(&self.snarked_ledger_hash)
      .append(&self.timestamp)
      .append(&self.blockchain_length)
      .append(&self.min_window_density)
      .append(&self.total_currency)
      .append(&self.global_slot_since_hard_fork)
      .append(&self.global_slot_since_genesis)
      .append(&self.staking_epoch_data)
      .append(&self.next_epoch_data)
  }
}

/// Assertions about the account an update is applied to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPrecondition {
  pub balance: OrIgnore<ClosedInterval<UInt64>>,
  pub nonce: OrIgnore<ClosedInterval<UInt32>>,
  pub receipt_chain_hash: OrIgnore<Field>,
  pub delegate: OrIgnore<PublicKey>,
  pub state: [OrIgnore<Field>; crate::body::ZKAPP_STATE_LENGTH],
  pub action_state: OrIgnore<Field>,
  pub proved_state: OrIgnore<bool>,
  pub is_new: OrIgnore<bool>,
}

impl AccountPrecondition {
  pub fn ignore_all() -> Self {
    Self::default()
  }

  /// Asserts nothing but the nonce of the account.
  pub fn nonce(nonce: UInt32) -> Self {
    let mut precondition = Self::ignore_all();
    precondition.nonce.assert_equals(nonce);
    precondition
  }
}

impl ToInput for AccountPrecondition {
  fn to_input(&self) -> HashInput {
    // an ignored action state stands for the empty action state
    let action_state = match &self.action_state {
      OrIgnore::Ignore => HashInput::default()
        .append(&false)
        .append(&empty_hash_with_prefix(prefixes::ACTION_STATE_EMPTY)),
      checked => checked.to_input(),
    };

    HashInput::default()
      .append(&self.balance)
      .append(&self.nonce)
      .append(&self.receipt_chain_hash)
      .append(&self.delegate)
      .append(&self.state)
      .append(&action_state)
      .append(&self.proved_state)
      .append(&self.is_new)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preconditions {
  pub network: NetworkPrecondition,
  pub account: AccountPrecondition,
}

impl Preconditions {
  pub fn ignore_all() -> Self {
    Self::default()
  }
}

impl ToInput for Preconditions {
  fn to_input(&self) -> HashInput {
    HashInput::default()
      .append(&self.network)
      .append(&self.account)
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{AccountPrecondition, OrIgnore, Preconditions},
    zkapp_primitives::{pack_to_fields, Field, ToInput, UInt32, UInt64},
  };

  #[test]
  fn default_asserts_nothing() {
    let preconditions = Preconditions::ignore_all();
    assert!(!preconditions.account.nonce.is_some());
    assert!(!preconditions.network.blockchain_length.is_some());
    assert!(preconditions.account.balance.contains(UInt64(12345)));
  }

  #[test]
  fn assertions_flip_flag_and_pin_values() {
    let mut account = AccountPrecondition::ignore_all();
    account.balance.assert_between(UInt64(10), UInt64(20));
    account.state[3].assert_equals(Field::from(7u64));
    account.is_new.assert_equals(true);

    assert!(account.balance.contains(UInt64(10)));
    assert!(!account.balance.contains(UInt64(21)));
    assert_eq!(account.state[3], OrIgnore::Check(Field::from(7u64)));
    assert_eq!(account.is_new, OrIgnore::Check(true));

    let nonce = AccountPrecondition::nonce(UInt32(4));
    assert!(nonce.nonce.contains(UInt32(4)));
    assert!(!nonce.nonce.contains(UInt32(5)));
  }

  #[test]
  fn ignored_and_checked_differ_in_hash_input() {
    let ignored = AccountPrecondition::ignore_all();
    let mut checked = AccountPrecondition::ignore_all();
    checked.receipt_chain_hash.assert_equals(Field::zero());

    // the flag alone distinguishes an asserted zero from an ignored slot
    assert_ne!(
      pack_to_fields(ignored.to_input()),
      pack_to_fields(checked.to_input())
    );
  }

  #[test]
  fn json_uses_null_for_ignored() -> anyhow::Result<()> {
    let mut account = AccountPrecondition::ignore_all();
    account.nonce.assert_equals(UInt32(3));
    let json = serde_json::to_value(&account)?;
    assert_eq!(json["balance"], serde_json::Value::Null);
    assert_eq!(json["nonce"]["lower"], "3");
    assert_eq!(json["nonce"]["upper"], "3");
    assert_eq!(json["state"].as_array().map(Vec::len), Some(8));

    let back: AccountPrecondition = serde_json::from_value(json)?;
    assert_eq!(back, account);
    Ok(())
  }
}
