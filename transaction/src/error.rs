use {
  crate::UpdateId,
  thiserror::Error,
  zkapp_primitives::{Field, PublicKey},
};

/// Failure reported by an external proof backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ProverError(pub String);

#[derive(Debug, Error)]
pub enum Error {
  #[error("Cannot add signature for {address}, private key is missing")]
  MissingSigningKey { address: PublicKey },

  #[error(
    "Cannot add signature for fee payer ({address}), private key is missing"
  )]
  MissingFeePayerKey { address: PublicKey },

  #[error(
    "Cannot prove execution of {method}(), no prover found. Try calling \
     `{contract}.compile()` first, this will cache provers."
  )]
  ProverNotFound { contract: String, method: String },

  #[error("Method {method} not found on contract {contract}")]
  MethodNotFound { contract: String, method: String },

  #[error("Cannot parse invalid permission. {0} does not exist.")]
  InvalidPermission(String),

  #[error("Permission {0} is missing")]
  MissingPermission(String),

  #[error("Could not create a custom token id: {0}")]
  TokenId(String),

  #[error(
    "Account update hashing is inconsistent: plain evaluation gives \
     {plain:?}, arithmetized evaluation gives {arithmetized:?}"
  )]
  HashMismatch { plain: Field, arithmetized: Field },

  #[error("Children hash {actual:?} of {update} does not equal {expected:?}")]
  ChildrenHashMismatch {
    update: UpdateId,
    expected: Field,
    actual: Field,
  },

  #[error("Account update {0} is not part of this call forest")]
  UnknownAccountUpdate(UpdateId),

  #[error("Account update {0} is already part of this call forest")]
  DuplicateAccountUpdate(UpdateId),

  #[error("Making {child} a child of {parent} would create a cycle")]
  CycleDetected { parent: UpdateId, child: UpdateId },

  #[error("Account update {0} is not allowed to be a delegate call")]
  NoDelegation(UpdateId),

  #[error("Children layout expects at most {expected} children, found {found}")]
  LayoutMismatch { expected: usize, found: usize },

  #[error("Invalid call depth {depth} for account update at index {index}")]
  InvalidCallDepth { index: usize, depth: u32 },

  #[error("Account update {update} already has a committed {kind}")]
  AlreadyAuthorized {
    update: UpdateId,
    kind: &'static str,
  },

  #[error("Invalid account update: {0}")]
  InvalidBody(String),

  #[error("Ledger error: {0}")]
  Ledger(String),

  #[error("Proof generation failed: {0}")]
  Prover(#[from] ProverError),

  #[error("Proof encoding error: {0}")]
  ProofEncoding(String),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Primitives(#[from] zkapp_primitives::Error),
}
