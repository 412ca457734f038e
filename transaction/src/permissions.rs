use {
  crate::{preconditions::Dummy, Error},
  serde::{Deserialize, Serialize},
  serde_json::{Map, Value},
  std::{fmt::Display, str::FromStr},
  zkapp_primitives::{serde_via_str, HashInput, ToInput},
};

/// One specific permission value.
///
/// A permission tells how an account behaves when presented with a
/// requested modification of one of its aspects. Only the five canonical
/// combinations of the three flags can be constructed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Permission {
  constant: bool,
  signature_necessary: bool,
  signature_sufficient: bool,
}

impl Permission {
  /// Modification is impossible.
  pub const fn impossible() -> Self {
    Self {
      constant: true,
      signature_necessary: true,
      signature_sufficient: false,
    }
  }

  /// Modification is always permitted.
  pub const fn none() -> Self {
    Self {
      constant: true,
      signature_necessary: false,
      signature_sufficient: true,
    }
  }

  /// Modification is permitted by zkApp proofs only.
  pub const fn proof() -> Self {
    Self {
      constant: false,
      signature_necessary: false,
      signature_sufficient: false,
    }
  }

  /// Modification is permitted by signatures only, using the private key
  /// of the account.
  pub const fn signature() -> Self {
    Self {
      constant: false,
      signature_necessary: true,
      signature_sufficient: true,
    }
  }

  /// Modification is permitted by zkApp proofs or signatures.
  pub const fn proof_or_signature() -> Self {
    Self {
      constant: false,
      signature_necessary: false,
      signature_sufficient: true,
    }
  }

  pub fn from_string(permission: &str) -> Result<Self, Error> {
    match permission {
      "None" => Ok(Self::none()),
      "Either" => Ok(Self::proof_or_signature()),
      "Proof" => Ok(Self::proof()),
      "Signature" => Ok(Self::signature()),
      "Impossible" => Ok(Self::impossible()),
      other => Err(Error::InvalidPermission(other.to_owned())),
    }
  }

  pub fn constant(&self) -> bool {
    self.constant
  }

  pub fn signature_necessary(&self) -> bool {
    self.signature_necessary
  }

  pub fn signature_sufficient(&self) -> bool {
    self.signature_sufficient
  }

  fn as_str(&self) -> &'static str {
    match (
      self.constant,
      self.signature_necessary,
      self.signature_sufficient,
    ) {
      (true, true, false) => "Impossible",
      (true, false, true) => "None",
      (false, false, false) => "Proof",
      (false, true, true) => "Signature",
      (false, false, true) => "Either",
      _ => unreachable!("only canonical permissions can be constructed"),
    }
  }
}

impl Display for Permission {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Permission {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::from_string(s)
  }
}

serde_via_str!(Permission);

impl ToInput for Permission {
  fn to_input(&self) -> HashInput {
    HashInput::default()
      .append(&self.constant)
      .append(&self.signature_necessary)
      .append(&self.signature_sufficient)
  }
}

/// Permissions specify how specific aspects of an account are allowed
/// to be modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
  /// The 8 app state fields of the account.
  pub edit_state: Permission,
  /// Sending funds from this account.
  pub send: Permission,
  /// Receiving funds to this account.
  pub receive: Permission,
  pub set_delegate: Permission,
  pub set_permissions: Permission,
  /// Effectively the upgradability of the smart contract.
  pub set_verification_key: Permission,
  /// Usually changed together with the verification key.
  pub set_zkapp_uri: Permission,
  pub edit_action_state: Permission,
  pub set_token_symbol: Permission,
  pub increment_nonce: Permission,
  pub set_voting_for: Permission,
}

const SLOTS: [&str; 11] = [
  "editState",
  "send",
  "receive",
  "setDelegate",
  "setPermissions",
  "setVerificationKey",
  "setZkappUri",
  "editActionState",
  "setTokenSymbol",
  "incrementNonce",
  "setVotingFor",
];

impl Permissions {
  fn uniform(base: Permission) -> Self {
    Self {
      edit_state: base,
      send: base,
      receive: base,
      set_delegate: base,
      set_permissions: base,
      set_verification_key: base,
      set_zkapp_uri: base,
      edit_action_state: base,
      set_token_symbol: base,
      increment_nonce: base,
      set_voting_for: base,
    }
  }

  /// Permissions of a freshly deployed zkApp: state and actions are
  /// editable by proofs, everything else requires a signature.
  pub fn default() -> Self {
    Self {
      edit_state: Permission::proof(),
      send: Permission::proof(),
      receive: Permission::none(),
      edit_action_state: Permission::proof(),
      ..Self::uniform(Permission::signature())
    }
  }

  /// Permissions of a newly created account.
  pub fn initial() -> Self {
    Self {
      receive: Permission::none(),
      ..Self::uniform(Permission::signature())
    }
  }

  pub fn dummy() -> Self {
    Self::uniform(Permission::none())
  }

  pub fn all_impossible() -> Self {
    Self::uniform(Permission::impossible())
  }

  /// Reconstructs permissions from their JSON form. Every slot is
  /// either a permission string or an object with an `auth` string.
  pub fn from_json(json: &Value) -> Result<Self, Error> {
    let object = json
      .as_object()
      .ok_or_else(|| Error::InvalidPermission(json.to_string()))?;

    let mut normalized = Map::new();
    for slot in SLOTS {
      let value = object
        .get(slot)
        .ok_or_else(|| Error::MissingPermission(slot.to_owned()))?;
      let auth = match value {
        Value::String(s) => s.as_str(),
        Value::Object(o) => o
          .get("auth")
          .and_then(Value::as_str)
          .ok_or_else(|| Error::InvalidPermission(value.to_string()))?,
        other => return Err(Error::InvalidPermission(other.to_string())),
      };
      let permission = Permission::from_string(auth)?;
      normalized.insert(slot.to_owned(), permission.to_string().into());
    }

    Ok(serde_json::from_value(Value::Object(normalized))?)
  }
}

impl Dummy for Permissions {
  fn dummy() -> Self {
    Permissions::dummy()
  }
}

impl ToInput for Permissions {
  fn to_input(&self) -> HashInput {
    HashInput::default()
      .append(&self.edit_state)
      .append(&self.send)
      .append(&self.receive)
      .append(&self.set_delegate)
      .append(&self.set_permissions)
      .append(&self.set_verification_key)
      .append(&self.set_zkapp_uri)
      .append(&self.edit_action_state)
      .append(&self.set_token_symbol)
      .append(&self.increment_nonce)
      .append(&self.set_voting_for)
  }
}
