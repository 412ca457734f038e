use {
  crate::{Error, ProverError, TokenId},
  async_trait::async_trait,
  base64::{engine::general_purpose::STANDARD, Engine},
  once_cell::sync::OnceCell,
  serde::{Deserialize, Serialize},
  std::{fmt::Debug, sync::Arc},
  zkapp_primitives::{Field, PublicKey},
};

/// A proof produced by the proof backend.
///
/// The backend decides what `data` contains, this crate only moves it
/// around and embeds it into transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
  pub max_proofs_verified: u8,
  pub public_input: Vec<Field>,
  pub data: Vec<u8>,
}

impl Proof {
  /// Placeholder used when proving is disabled.
  pub fn dummy(max_proofs_verified: u8, public_input: Vec<Field>) -> Self {
    Self {
      max_proofs_verified,
      public_input,
      data: vec![],
    }
  }

  /// Encoding used in the `authorization.proof` slot of an update.
  pub fn to_base64(&self) -> Result<String, Error> {
    let bytes = rmp_serde::to_vec(self)
      .map_err(|e| Error::ProofEncoding(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
  }

  pub fn from_base64(encoded: &str) -> Result<Self, Error> {
    let bytes = STANDARD
      .decode(encoded)
      .map_err(|e| Error::ProofEncoding(e.to_string()))?;
    rmp_serde::from_slice(&bytes).map_err(|e| Error::ProofEncoding(e.to_string()))
  }
}

/// A proof that the proof of a method call verifies recursively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousProof {
  pub public_input: Vec<Field>,
  pub proof: Proof,
}

/// Describes one provable method of a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInterface {
  pub name: String,
  pub args: usize,
  pub proofs_verified: u8,
}

/// Witness values handed to a prover for one method call.
///
/// Provers run strictly one after another, each with its own context,
/// so there is no shared state between two proofs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProverContext {
  pub public_key: PublicKey,
  pub token_id: TokenId,
  pub args: Vec<Field>,
  pub memoized: Vec<Vec<Field>>,
  pub blinding_value: Field,
}

#[async_trait]
pub trait Prover: Send + Sync {
  async fn prove(
    &self,
    public_input: Vec<Field>,
    previous_proofs: Vec<PreviousProof>,
    context: ProverContext,
  ) -> Result<Proof, ProverError>;
}

/// Output of compiling the methods of a contract. Provers are in the
/// order of the compiled methods.
#[derive(Clone)]
pub struct Compiled {
  pub provers: Vec<Arc<dyn Prover>>,
  pub verification_key_hash: Field,
  pub max_proofs_verified: u8,
}

impl Debug for Compiled {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Compiled")
      .field("provers", &self.provers.len())
      .field("verification_key_hash", &self.verification_key_hash)
      .field("max_proofs_verified", &self.max_proofs_verified)
      .finish()
  }
}

#[async_trait]
pub trait ProofBackend: Send + Sync {
  async fn compile(
    &self,
    methods: &[MethodInterface],
  ) -> Result<Compiled, ProverError>;

  fn verify(
    &self,
    public_input: &[Field],
    proof: &Proof,
    verification_key_hash: &Field,
  ) -> bool;
}

/// A smart contract as far as proving is concerned: its methods and,
/// once compiled, one prover per method.
pub struct Contract {
  name: String,
  methods: Vec<MethodInterface>,
  compiled: OnceCell<Compiled>,
}

impl Contract {
  pub fn new(name: impl Into<String>, methods: Vec<MethodInterface>) -> Self {
    Self {
      name: name.into(),
      methods,
      compiled: OnceCell::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn methods(&self) -> &[MethodInterface] {
    &self.methods
  }

  pub fn is_compiled(&self) -> bool {
    self.compiled.get().is_some()
  }

  /// Compiles the contract once, later calls return the cached result.
  pub async fn compile(
    &self,
    backend: &dyn ProofBackend,
  ) -> Result<&Compiled, Error> {
    if let Some(compiled) = self.compiled.get() {
      return Ok(compiled);
    }
    let compiled = backend.compile(&self.methods).await?;
    Ok(self.compiled.get_or_init(|| compiled))
  }

  pub fn verification_key_hash(&self) -> Option<Field> {
    self.compiled.get().map(|c| c.verification_key_hash)
  }

  pub fn max_proofs_verified(&self) -> u8 {
    self.compiled.get().map(|c| c.max_proofs_verified).unwrap_or(0)
  }

  pub fn prover(&self, method: &str) -> Result<Arc<dyn Prover>, Error> {
    let not_compiled = || Error::ProverNotFound {
      contract: self.name.clone(),
      method: method.to_owned(),
    };
    let compiled = self.compiled.get().ok_or_else(not_compiled)?;
    let index = self
      .methods
      .iter()
      .position(|m| m.name == method)
      .ok_or_else(|| Error::MethodNotFound {
        contract: self.name.clone(),
        method: method.to_owned(),
      })?;
    compiled.provers.get(index).cloned().ok_or_else(not_compiled)
  }
}

impl Debug for Contract {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Contract")
      .field("name", &self.name)
      .field("methods", &self.methods)
      .field("compiled", &self.is_compiled())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{
      Compiled,
      Contract,
      MethodInterface,
      PreviousProof,
      Proof,
      ProofBackend,
      Prover,
      ProverContext,
    },
    crate::{Error, ProverError},
    async_trait::async_trait,
    std::sync::Arc,
    zkapp_primitives::Field,
  };

  struct Echo;

  #[async_trait]
  impl Prover for Echo {
    async fn prove(
      &self,
      public_input: Vec<Field>,
      _: Vec<PreviousProof>,
      _: ProverContext,
    ) -> Result<Proof, ProverError> {
      Ok(Proof {
        max_proofs_verified: 0,
        public_input,
        data: b"echo".to_vec(),
      })
    }
  }

  struct Backend;

  #[async_trait]
  impl ProofBackend for Backend {
    async fn compile(
      &self,
      methods: &[MethodInterface],
    ) -> Result<Compiled, ProverError> {
      Ok(Compiled {
        provers: methods
          .iter()
          .map(|_| Arc::new(Echo) as Arc<dyn Prover>)
          .collect(),
        verification_key_hash: Field::from(42u64),
        max_proofs_verified: 0,
      })
    }

    fn verify(&self, public_input: &[Field], proof: &Proof, _: &Field) -> bool {
      proof.public_input == public_input
    }
  }

  fn contract() -> Contract {
    Contract::new("Counter", vec![MethodInterface {
      name: "increment".into(),
      args: 1,
      proofs_verified: 0,
    }])
  }

  #[test]
  fn proof_base64_roundtrip() -> anyhow::Result<()> {
    let proof = Proof {
      max_proofs_verified: 2,
      public_input: vec![Field::one(), Field::from(9u64)],
      data: vec![1, 2, 3],
    };
    assert_eq!(Proof::from_base64(&proof.to_base64()?)?, proof);
    assert!(matches!(
      Proof::from_base64("not base64!"),
      Err(Error::ProofEncoding(_))
    ));
    Ok(())
  }

  #[tokio::test]
  async fn provers_need_compilation() -> anyhow::Result<()> {
    let contract = contract();
    assert!(matches!(
      contract.prover("increment"),
      Err(Error::ProverNotFound { .. })
    ));
    assert_eq!(contract.verification_key_hash(), None);

    contract.compile(&Backend).await?;
    assert!(contract.is_compiled());
    assert_eq!(contract.verification_key_hash(), Some(Field::from(42u64)));
    assert!(contract.prover("increment").is_ok());
    assert!(matches!(
      contract.prover("decrement"),
      Err(Error::MethodNotFound { .. })
    ));
    Ok(())
  }
}
