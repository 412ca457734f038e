use {
  zkapp_primitives::{verify_field_element, Field, Sign, UInt64},
  zkapp_transaction::{
    add_missing_signatures,
    sign_json_transaction,
    AccountUpdate,
    AuthorizationState,
    Error,
    LazyAuthorization,
    Transaction,
    TransactionConfig,
    ZkappCommand,
  },
};

mod common;

#[test]
fn child_signs_the_full_commitment() -> anyhow::Result<()> {
  let fee_payer = common::keypair();
  let alice = common::keypair();
  let bob = common::keypair();
  let ledger = common::ledger_with(&[(&fee_payer, 3), (&alice, 0), (&bob, 0)]);

  let mut tx = Transaction::new(Some(fee_payer.clone()), TransactionConfig {
    memo: "transfer".into(),
    ..Default::default()
  });
  let r = tx.forest.create(alice.to_public_key(), None);
  tx.forest.get_mut(r)?.balance().sub_in_place(10u64)?;
  let c = tx.forest.create_child(r, bob.to_public_key(), None)?;
  {
    let child = tx.forest.get_mut(c)?;
    child.balance().add_in_place(10u64)?;
    child.body.use_full_commitment = true;
    child.set_lazy_signature(None);
  }

  let command = tx.to_command(&ledger)?;
  assert_eq!(command.account_updates.len(), 2);
  assert_eq!(command.fee_payer.body.nonce.value(), 3);

  let signed = add_missing_signatures(&command, &[bob.clone()])?;
  let (commitment, full_commitment) = signed.commitments()?;
  assert_eq!((commitment, full_commitment), command.commitments()?);

  let root = &signed.account_updates[0];
  assert_eq!(root.body.balance_change.sgn, Sign::Negative);
  assert_eq!(root.body.balance_change.magnitude, UInt64(10));
  assert_eq!(root.authorization_state(), AuthorizationState::NoneCommitted);
  assert!(root.authorization.signature.is_none());

  let child = &signed.account_updates[1];
  assert_eq!(child.body.call_depth, 1);
  let signature = child
    .authorization
    .signature
    .expect("child update must be signed");
  assert!(verify_field_element(
    &bob.to_public_key(),
    &full_commitment,
    &signature
  ));
  assert!(!verify_field_element(
    &bob.to_public_key(),
    &commitment,
    &signature
  ));

  // the fee payer key was kept on its placeholder
  assert!(verify_field_element(
    &fee_payer.to_public_key(),
    &full_commitment,
    &signed.fee_payer.authorization
  ));

  // the input command is left as it was
  assert!(matches!(
    command.account_updates[1].lazy_authorization,
    Some(LazyAuthorization::Signature(_))
  ));
  Ok(())
}

#[test]
fn missing_key_fails_without_partial_output() -> anyhow::Result<()> {
  let alice = common::keypair();
  let ledger = common::ledger_with(&[(&alice, 0)]);

  let mut tx = Transaction::new(None, TransactionConfig::default());
  let id = tx.forest.create(alice.to_public_key(), None);
  tx.require_signature(id, &ledger)?;
  let command = tx.to_command(&ledger)?;

  let stranger = common::keypair();
  assert!(matches!(
    add_missing_signatures(&command, &[stranger]),
    Err(Error::MissingSigningKey { address }) if address == alice.to_public_key()
  ));
  Ok(())
}

#[test]
fn json_signing_matches_structured_signing() -> anyhow::Result<()> {
  let alice = common::keypair();
  let bob = common::keypair();
  let ledger = common::ledger_with(&[(&alice, 5), (&bob, 1)]);

  let mut tx = Transaction::new(Some(alice.clone()), TransactionConfig {
    fee: UInt64(1_000),
    ..Default::default()
  });
  let first = tx.forest.create(alice.to_public_key(), None);
  tx.require_signature(first, &ledger)?;
  tx.forest.get_mut(first)?.balance().sub_in_place(250u64)?;
  let payout = tx.forest.create(bob.to_public_key(), None);
  tx.forest.get_mut(payout)?.balance().add_in_place(250u64)?;
  let full = tx.forest.create(alice.to_public_key(), None);
  tx.require_signature(full, &ledger)?;
  tx.forest.get_mut(full)?.body.use_full_commitment = true;

  let command = tx.to_command(&ledger)?;
  let structured = add_missing_signatures(&command, &[alice.clone()])?;
  let from_json = sign_json_transaction(&command.to_json_string()?, &alice)?;

  assert_eq!(
    structured.to_json()?,
    serde_json::from_str::<serde_json::Value>(&from_json)?
  );

  // the decoded command keeps the tree and the commitments
  let decoded = ZkappCommand::from_json_str(&from_json)?;
  assert_eq!(decoded.commitments()?, structured.commitments()?);
  assert!(decoded.account_updates[1].authorization.signature.is_none());
  Ok(())
}

#[test]
fn authorization_kinds_are_exclusive() -> anyhow::Result<()> {
  let key = common::keypair();
  let contract = common::counter_contract();
  let mut update = AccountUpdate::default_account_update(key.to_public_key(), None);

  update.set_lazy_signature(Some(key.clone()));
  assert_eq!(update.authorization_state(), AuthorizationState::LazySignature);
  assert!(update.body.authorization_kind.is_signed);

  update.set_lazy_proof(common::lazy_proof(&contract, "reset", vec![]));
  assert_eq!(update.authorization_state(), AuthorizationState::LazyProof);
  assert!(update.body.authorization_kind.is_proved);
  assert!(!update.body.authorization_kind.is_signed);
  update.body.check()?;

  update.set_proof("proof".into())?;
  assert_eq!(update.authorization_state(), AuthorizationState::CommittedProof);
  assert!(update.lazy_authorization.is_none());

  let signature = key.sign_field_element(&Field::one())?;
  assert!(matches!(
    update.set_signature(signature),
    Err(Error::AlreadyAuthorized { .. })
  ));
  assert_eq!(update.authorization.signature, None);
  Ok(())
}
