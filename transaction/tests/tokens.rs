use {
  zkapp_primitives::{verify_field_element, Sign, UInt32, UInt64},
  zkapp_transaction::{
    add_missing_signatures,
    Mode,
    Token,
    TokenId,
    Transaction,
    TransactionConfig,
  },
};

mod common;

#[test]
fn token_transfers_carry_the_owner_as_caller() -> anyhow::Result<()> {
  let owner = common::keypair();
  let alice = common::keypair();
  let bob = common::keypair();
  let ledger = common::ledger_with(&[(&owner, 1), (&alice, 0)]);

  let mut tx = Transaction::new(Some(alice.clone()), TransactionConfig::default());
  let root = tx.forest.create(owner.to_public_key(), None);
  tx.require_signature(root, &ledger)?;

  let (token_id, receiver) = {
    let mut token = tx.forest.token(root)?;
    assert_eq!(token.token().owner, owner.to_public_key());
    assert_eq!(token.token().parent, TokenId::default());
    let received = token.send(alice.to_public_key(), bob.to_public_key(), 40u64)?;
    (token.id(), received)
  };
  assert_eq!(
    token_id,
    Token::get_id(&owner.to_public_key(), &TokenId::default(), Mode::Constrained)?
  );

  let command = tx.to_command(&ledger)?;
  assert_eq!(command.account_updates.len(), 3);

  let [owner_update, sender_update, receiver_update] = &command.account_updates[..]
  else {
    unreachable!("three updates");
  };
  assert_eq!(owner_update.body.caller, TokenId::default());
  assert_eq!(sender_update.body.caller, token_id);
  assert_eq!(receiver_update.body.caller, token_id);
  assert_eq!(receiver_update.id(), receiver);
  assert_eq!(sender_update.body.token_id, token_id);
  assert_eq!(sender_update.body.balance_change.sgn, Sign::Negative);
  assert_eq!(receiver_update.body.balance_change.magnitude, UInt64(40));

  // the owner nonce is unaffected by the fee payer, who is alice
  assert!(owner_update
    .body
    .preconditions
    .account
    .nonce
    .contains(UInt32(1)));

  let signed = add_missing_signatures(&command, &[owner.clone(), alice.clone()])?;
  let (commitment, full_commitment) = signed.commitments()?;
  let owner_sig = signed.account_updates[0]
    .authorization
    .signature
    .expect("owner signs");
  assert!(verify_field_element(
    &owner.to_public_key(),
    &commitment,
    &owner_sig
  ));
  let sender_sig = signed.account_updates[1]
    .authorization
    .signature
    .expect("sender signs");
  assert!(verify_field_element(
    &alice.to_public_key(),
    &full_commitment,
    &sender_sig
  ));
  assert!(signed.account_updates[2].authorization.signature.is_none());
  Ok(())
}

#[test]
fn nonces_follow_pre_order() -> anyhow::Result<()> {
  let sender = common::keypair();
  let ledger = common::ledger_with(&[(&sender, 10)]);
  let mut tx = Transaction::new(Some(sender.clone()), TransactionConfig::default());

  let parent = tx.create_signed(&sender, &ledger)?;
  let nested =
    tx.forest
      .create_child(parent, sender.to_public_key(), None)?;
  tx.require_signature(nested, &ledger)?;
  let after = tx.create_signed(&sender, &ledger)?;

  // fee payer, then parent, then the nested update
  assert_eq!(tx.get_nonce(parent, &ledger)?, UInt32(11));
  assert_eq!(tx.get_nonce(nested, &ledger)?, UInt32(12));
  assert_eq!(tx.get_nonce(after, &ledger)?, UInt32(13));

  let command = tx.to_command(&ledger)?;
  assert_eq!(command.fee_payer.body.nonce, UInt32(10));
  for (update, expected) in command.account_updates.iter().zip(11u32..) {
    assert!(update.body.increment_nonce);
    assert!(update
      .body
      .preconditions
      .account
      .nonce
      .contains(UInt32(expected)));
  }
  Ok(())
}
