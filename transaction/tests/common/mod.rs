#![allow(dead_code)]

use {
  async_trait::async_trait,
  ed25519_dalek::Keypair,
  std::sync::{Arc, Mutex},
  zkapp_primitives::{Field, PrivateKey, UInt32},
  zkapp_transaction::{
    AccountInfo,
    Compiled,
    Contract,
    InMemoryLedger,
    LazyProof,
    MethodInterface,
    PreviousProof,
    Proof,
    ProofBackend,
    Prover,
    ProverContext,
    ProverError,
    TokenId,
  },
};

/// A fresh account key, generated the same way wallets do.
pub fn keypair() -> PrivateKey {
  PrivateKey::from(&Keypair::generate(&mut rand::thread_rng()))
}

/// A ledger where each of the given keys holds a default token
/// account with the given nonce.
pub fn ledger_with(accounts: &[(&PrivateKey, u32)]) -> InMemoryLedger {
  let mut ledger = InMemoryLedger::default();
  for (key, nonce) in accounts {
    let mut account = AccountInfo::new(key.to_public_key(), TokenId::default());
    account.nonce = UInt32(*nonce);
    ledger.set(account);
  }
  ledger
}

/// Everything the mock provers were asked to do, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProveCall {
  pub method: String,
  pub public_input: Vec<Field>,
  pub context: ProverContext,
  pub previous_proofs: usize,
}

pub type CallLog = Arc<Mutex<Vec<ProveCall>>>;

struct MockProver {
  method: String,
  log: CallLog,
}

#[async_trait]
impl Prover for MockProver {
  async fn prove(
    &self,
    public_input: Vec<Field>,
    previous_proofs: Vec<PreviousProof>,
    context: ProverContext,
  ) -> Result<Proof, ProverError> {
    // yield so that overlapping provers would interleave
    tokio::task::yield_now().await;
    self.log.lock().unwrap().push(ProveCall {
      method: self.method.clone(),
      public_input: public_input.clone(),
      context,
      previous_proofs: previous_proofs.len(),
    });
    tokio::task::yield_now().await;
    Ok(Proof {
      max_proofs_verified: 0,
      public_input,
      data: self.method.as_bytes().to_vec(),
    })
  }
}

/// A proof backend whose proofs simply carry their public input.
#[derive(Default)]
pub struct MockBackend {
  pub log: CallLog,
}

#[async_trait]
impl ProofBackend for MockBackend {
  async fn compile(
    &self,
    methods: &[MethodInterface],
  ) -> Result<Compiled, ProverError> {
    Ok(Compiled {
      provers: methods
        .iter()
        .map(|m| {
          Arc::new(MockProver {
            method: m.name.clone(),
            log: self.log.clone(),
          }) as Arc<dyn Prover>
        })
        .collect(),
      verification_key_hash: Field::from(1234u64),
      max_proofs_verified: 0,
    })
  }

  fn verify(
    &self,
    public_input: &[Field],
    proof: &Proof,
    verification_key_hash: &Field,
  ) -> bool {
    *verification_key_hash == Field::from(1234u64)
      && proof.public_input == public_input
  }
}

pub fn counter_contract() -> Arc<Contract> {
  Arc::new(Contract::new("Counter", vec![
    MethodInterface {
      name: "increment".into(),
      args: 1,
      proofs_verified: 0,
    },
    MethodInterface {
      name: "reset".into(),
      args: 0,
      proofs_verified: 0,
    },
  ]))
}

pub fn lazy_proof(
  contract: &Arc<Contract>,
  method: &str,
  args: Vec<Field>,
) -> LazyProof {
  LazyProof {
    method_name: method.into(),
    args,
    previous_proofs: vec![],
    contract: Arc::clone(contract),
    memoized: vec![],
    blinding_value: Field::from(7u64),
  }
}
