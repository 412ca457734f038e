mod account_update;
mod assembly;
mod authorization;
mod backend;
mod body;
mod call_forest;
mod command;
mod config;
mod error;
mod ledger;
mod permissions;
mod preconditions;
mod token;
mod transaction;
mod wire;

pub use {
  account_update::{
    AccountUpdate,
    Balance,
    CallsHash,
    Children,
    ChildrenLayout,
    FeePayerBody,
    FeePayerUnsigned,
    UpdateId,
    ZkappPublicInput,
  },
  assembly::{add_missing_proofs, add_missing_signatures, sign_json_transaction},
  authorization::{
    AuthorizationState,
    Control,
    LazyAuthorization,
    LazyProof,
    LazySignature,
  },
  backend::{
    Compiled,
    Contract,
    MethodInterface,
    PreviousProof,
    Proof,
    ProofBackend,
    Prover,
    ProverContext,
  },
  body::{
    Actions,
    AuthorizationKind,
    Body,
    Events,
    SetOrKeep,
    Timing,
    TokenSymbol,
    Update,
    VerificationKey,
    ZkappUri,
    DUMMY_VERIFICATION_KEY_HASH,
    ZKAPP_STATE_LENGTH,
  },
  call_forest::{AccountUpdateTree, CallForest, CallerContext},
  command::{transaction_commitments, ZkappCommand},
  config::TransactionConfig,
  error::{Error, ProverError},
  ledger::{AccountInfo, InMemoryLedger, LedgerRead},
  permissions::{Permission, Permissions},
  preconditions::{
    AccountPrecondition,
    Bounded,
    ClosedInterval,
    Dummy,
    EpochData,
    EpochLedger,
    NetworkPrecondition,
    OrIgnore,
    Preconditions,
  },
  token::{Receiver, Token, TokenHandle, TokenId},
  transaction::Transaction,
  wire::hash_body_json,
};

/// Selects which of the two equivalent hashing paths is taken.
///
/// Inside a constrained (circuit) computation values are packed into
/// field elements and hashed directly. Outside of it they go through
/// their canonical wire encoding first. Both must always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Plain,
  Constrained,
}
