use {
  zkapp_primitives::Field,
  zkapp_transaction::{
    add_missing_proofs,
    AuthorizationState,
    Error,
    Mode,
    Proof,
    ProofBackend,
    Transaction,
    TransactionConfig,
    ZkappCommand,
  },
};

mod common;

/// Two proved updates, the second one nested below a signed update.
async fn proved_command(
  backend: Option<&common::MockBackend>,
) -> anyhow::Result<ZkappCommand> {
  let contract = common::counter_contract();
  if let Some(backend) = backend {
    contract.compile(backend).await?;
  }

  let zkapp = common::keypair();
  let user = common::keypair();
  let ledger = common::ledger_with(&[(&zkapp, 0), (&user, 2)]);

  let mut tx = Transaction::new(Some(user.clone()), TransactionConfig::default());
  let first = tx.forest.create(zkapp.to_public_key(), None);
  tx.forest.get_mut(first)?.set_lazy_proof(common::lazy_proof(
    &contract,
    "increment",
    vec![Field::from(5u64)],
  ));

  let signed = tx.create_signed(&user, &ledger)?;
  let second = tx.forest.create_child(signed, zkapp.to_public_key(), None)?;
  tx.forest
    .get_mut(second)?
    .set_lazy_proof(common::lazy_proof(&contract, "reset", vec![]));

  Ok(tx.to_command(&ledger)?)
}

#[tokio::test]
async fn proves_in_order_with_bound_public_input() -> anyhow::Result<()> {
  let backend = common::MockBackend::default();
  let command = proved_command(Some(&backend)).await?;
  let forest = command.forest()?;

  let (proved, proofs) =
    add_missing_proofs(&command, &TransactionConfig::default()).await?;

  let calls = backend.log.lock().unwrap().clone();
  assert_eq!(
    calls.iter().map(|c| c.method.as_str()).collect::<Vec<_>>(),
    vec!["increment", "reset"]
  );
  assert_eq!(calls[0].context.args, vec![Field::from(5u64)]);
  assert_eq!(calls[0].context.blinding_value, Field::from(7u64));

  assert_eq!(proofs.len(), 3);
  assert!(proofs[1].is_none());

  for (index, update) in command.account_updates.iter().enumerate() {
    let Some(proof) = &proofs[index] else {
      continue;
    };
    let public_input = forest
      .to_public_input(update.id(), Mode::Plain)?
      .to_fields();
    assert_eq!(proof.public_input, public_input);
    assert!(backend.verify(
      &public_input,
      proof,
      &update.body.authorization_kind.verification_key_hash
    ));

    let embedded = proved.account_updates[index]
      .authorization
      .proof
      .as_deref()
      .map(Proof::from_base64)
      .transpose()?;
    assert_eq!(embedded.as_ref(), Some(proof));
    assert_eq!(
      proved.account_updates[index].authorization_state(),
      AuthorizationState::CommittedProof
    );
  }

  // proving never touches what is committed to
  assert_eq!(proved.commitments()?, command.commitments()?);
  Ok(())
}

#[tokio::test]
async fn disabled_proofs_embed_dummies() -> anyhow::Result<()> {
  let command = proved_command(None).await?;
  let config = TransactionConfig {
    proofs_enabled: false,
    ..Default::default()
  };

  let (proved, proofs) = add_missing_proofs(&command, &config).await?;
  assert!(proofs.iter().all(Option::is_none));

  let forest = command.forest()?;
  for index in [0, 2] {
    let update = &proved.account_updates[index];
    let proof = Proof::from_base64(
      update.authorization.proof.as_deref().unwrap_or_default(),
    )?;
    assert!(proof.data.is_empty());
    assert_eq!(
      proof.public_input,
      forest
        .to_public_input(command.account_updates[index].id(), Mode::Plain)?
        .to_fields()
    );
  }
  assert!(proved.account_updates[1].authorization.proof.is_none());
  Ok(())
}

#[tokio::test]
async fn uncompiled_contracts_cannot_prove() -> anyhow::Result<()> {
  let command = proved_command(None).await?;
  assert!(matches!(
    add_missing_proofs(&command, &TransactionConfig::default()).await,
    Err(Error::ProverNotFound { method, .. }) if method == "increment"
  ));
  Ok(())
}
