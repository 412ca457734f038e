use {
  crate::{
    backend::{Contract, PreviousProof},
    AccountUpdate,
    AuthorizationKind,
    Error,
    DUMMY_VERIFICATION_KEY_HASH,
  },
  serde::{Deserialize, Serialize},
  std::sync::Arc,
  zkapp_primitives::{Field, PrivateKey, Signature},
};

/// Committed authorization of an account update as it appears on the
/// wire. At most one of the two is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
  pub proof: Option<String>,
  pub signature: Option<Signature>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LazySignature {
  /// When absent the key is looked up among the keys passed to
  /// signature assembly, by public key.
  pub private_key: Option<PrivateKey>,
}

/// Everything needed to produce the proof for a method call after the
/// transaction has been fully assembled.
#[derive(Debug, Clone)]
pub struct LazyProof {
  pub method_name: String,
  pub args: Vec<Field>,
  pub previous_proofs: Vec<PreviousProof>,
  pub contract: Arc<Contract>,
  pub memoized: Vec<Vec<Field>>,
  pub blinding_value: Field,
}

/// Authorization that is requested but not resolved yet.
#[derive(Debug, Clone)]
pub enum LazyAuthorization {
  Signature(LazySignature),
  Proof(LazyProof),
  None,
}

/// The authorization lifecycle of a single account update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationState {
  NoneCommitted,
  LazySignature,
  LazyProof,
  LazyNone,
  CommittedSignature,
  CommittedProof,
}

impl AccountUpdate {
  pub fn authorization_state(&self) -> AuthorizationState {
    match (&self.lazy_authorization, &self.authorization) {
      (Some(LazyAuthorization::Signature(_)), _) => {
        AuthorizationState::LazySignature
      }
      (Some(LazyAuthorization::Proof(_)), _) => AuthorizationState::LazyProof,
      (Some(LazyAuthorization::None), _) => AuthorizationState::LazyNone,
      (None, Control { proof: Some(_), .. }) => {
        AuthorizationState::CommittedProof
      }
      (None, Control {
        signature: Some(_), ..
      }) => AuthorizationState::CommittedSignature,
      (None, _) => AuthorizationState::NoneCommitted,
    }
  }

  pub fn set_lazy_signature(&mut self, private_key: Option<PrivateKey>) {
    self.body.authorization_kind = AuthorizationKind::signature();
    self.authorization = Control::default();
    self.lazy_authorization =
      Some(LazyAuthorization::Signature(LazySignature { private_key }));
  }

  pub fn set_lazy_proof(&mut self, proof: LazyProof) {
    let vk_hash = proof
      .contract
      .verification_key_hash()
      .unwrap_or(*DUMMY_VERIFICATION_KEY_HASH);
    self.body.authorization_kind = AuthorizationKind::proof(vk_hash);
    self.authorization = Control::default();
    self.lazy_authorization = Some(LazyAuthorization::Proof(proof));
  }

  pub fn set_lazy_none(&mut self) {
    self.body.authorization_kind = AuthorizationKind::none();
    self.authorization = Control::default();
    self.lazy_authorization = Some(LazyAuthorization::None);
  }

  /// Resolves the update to a committed signature.
  ///
  /// Fails if a proof has already been committed.
  pub fn set_signature(&mut self, signature: Signature) -> Result<(), Error> {
    if self.authorization.proof.is_some() {
      return Err(Error::AlreadyAuthorized {
        update: self.id(),
        kind: "proof",
      });
    }
    self.authorization = Control {
      proof: None,
      signature: Some(signature),
    };
    self.lazy_authorization = None;
    Ok(())
  }

  /// Resolves the update to a committed proof.
  ///
  /// Fails if a signature has already been committed.
  pub fn set_proof(&mut self, proof: String) -> Result<(), Error> {
    if self.authorization.signature.is_some() {
      return Err(Error::AlreadyAuthorized {
        update: self.id(),
        kind: "signature",
      });
    }
    self.authorization = Control {
      proof: Some(proof),
      signature: None,
    };
    self.lazy_authorization = None;
    Ok(())
  }

  pub fn has_any(&self) -> bool {
    self.lazy_authorization.is_some()
      || self.authorization.proof.is_some()
      || self.authorization.signature.is_some()
  }

  pub fn has_lazy_proof(&self) -> bool {
    matches!(self.lazy_authorization, Some(LazyAuthorization::Proof(_)))
  }
}

#[cfg(test)]
mod tests {
  use {
    super::AuthorizationState,
    crate::{AccountUpdate, Error},
    zkapp_primitives::{PrivateKey, Signature},
  };

  #[test]
  fn lazy_signature_then_commit() -> anyhow::Result<()> {
    let key = PrivateKey::random();
    let mut update = AccountUpdate::default_account_update(key.to_public_key(), None);
    assert_eq!(update.authorization_state(), AuthorizationState::NoneCommitted);
    assert!(!update.has_any());

    update.set_lazy_signature(Some(key));
    assert_eq!(update.authorization_state(), AuthorizationState::LazySignature);
    assert!(update.body.authorization_kind.is_signed);
    assert!(!update.body.authorization_kind.is_proved);
    assert!(update.has_any());
    assert!(!update.has_lazy_proof());

    update.set_signature(Signature::dummy())?;
    assert_eq!(
      update.authorization_state(),
      AuthorizationState::CommittedSignature
    );
    assert!(update.lazy_authorization.is_none());
    Ok(())
  }

  #[test]
  fn never_overwrites_a_committed_kind() -> anyhow::Result<()> {
    let mut update = AccountUpdate::dummy();
    update.set_proof("proof".into())?;
    assert!(matches!(
      update.set_signature(Signature::dummy()),
      Err(Error::AlreadyAuthorized { kind: "proof", .. })
    ));
    assert_eq!(update.authorization_state(), AuthorizationState::CommittedProof);

    let mut update = AccountUpdate::dummy();
    update.set_signature(Signature::dummy())?;
    assert!(update.set_proof("proof".into()).is_err());
    assert_eq!(update.authorization.proof, None);
    Ok(())
  }

  #[test]
  fn lazy_none_clears_authorization_kind() {
    let mut update = AccountUpdate::dummy();
    update.set_lazy_signature(None);
    update.set_lazy_none();
    assert_eq!(update.authorization_state(), AuthorizationState::LazyNone);
    assert!(!update.body.authorization_kind.is_signed);
    assert!(update.has_any());
  }
}
