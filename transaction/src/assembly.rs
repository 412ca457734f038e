use {
  crate::{
    AccountUpdate,
    Error,
    FeePayerUnsigned,
    LazyAuthorization,
    Mode,
    Proof,
    ProverContext,
    TransactionConfig,
    ZkappCommand,
  },
  tracing::{debug, info},
  zkapp_primitives::{Field, PrivateKey, PublicKey},
};

/// Finds the key for a signature: the key stored on the placeholder if
/// there is one, otherwise the first of `keys` matching `address`.
fn resolve_key<'k>(
  explicit: Option<&'k PrivateKey>,
  address: &PublicKey,
  keys: &'k [PrivateKey],
) -> Option<&'k PrivateKey> {
  explicit.or_else(|| keys.iter().find(|k| k.to_public_key() == *address))
}

fn sign_fee_payer(
  fee_payer: &FeePayerUnsigned,
  full_commitment: &Field,
  keys: &[PrivateKey],
) -> Result<FeePayerUnsigned, Error> {
  let mut fee_payer = fee_payer.clone();
  let Some(lazy) = fee_payer.lazy_authorization.take() else {
    return Ok(fee_payer);
  };
  let address = fee_payer.body.public_key;
  let key = resolve_key(lazy.private_key.as_ref(), &address, keys)
    .ok_or(Error::MissingFeePayerKey { address })?;
  fee_payer.authorization = key.sign_field_element(full_commitment)?;
  debug!("signed fee payer {address}");
  Ok(fee_payer)
}

fn sign_update(
  update: &AccountUpdate,
  commitment: &Field,
  full_commitment: &Field,
  keys: &[PrivateKey],
) -> Result<AccountUpdate, Error> {
  let mut update = update.clone();
  let Some(LazyAuthorization::Signature(lazy)) = &update.lazy_authorization
  else {
    return Ok(update);
  };
  let address = update.public_key();
  let key = resolve_key(lazy.private_key.as_ref(), &address, keys)
    .ok_or(Error::MissingSigningKey { address })?;
  let message = match update.body.use_full_commitment {
    true => full_commitment,
    false => commitment,
  };
  let signature = key.sign_field_element(message)?;
  update.set_signature(signature)?;
  debug!(
    "signed account update {} {} ({address})",
    update.id(),
    update.label
  );
  Ok(update)
}

/// Resolves all pending signatures of a command.
///
/// Both commitments are computed once up front. The fee payer signs the
/// full commitment, account updates sign the commitment they ask for.
/// Returns a new command, the input is left untouched even on failure.
pub fn add_missing_signatures(
  command: &ZkappCommand,
  keys: &[PrivateKey],
) -> Result<ZkappCommand, Error> {
  let (commitment, full_commitment) = command.commitments()?;
  debug!("transaction commitment: {commitment}, full: {full_commitment}");

  let fee_payer = sign_fee_payer(&command.fee_payer, &full_commitment, keys)?;
  let account_updates = command
    .account_updates
    .iter()
    .map(|update| sign_update(update, &commitment, &full_commitment, keys))
    .collect::<Result<Vec<_>, _>>()?;

  Ok(ZkappCommand {
    fee_payer,
    account_updates,
    memo: command.memo,
  })
}

/// Resolves all pending proofs of a command, strictly one at a time.
///
/// Returns the proved command together with the generated proof of each
/// account update, `None` for updates that were not proved by the
/// backend. With proofs disabled, dummy proofs are embedded instead.
pub async fn add_missing_proofs(
  command: &ZkappCommand,
  config: &TransactionConfig,
) -> Result<(ZkappCommand, Vec<Option<Proof>>), Error> {
  let forest = command.forest()?;
  let mut account_updates = Vec::with_capacity(command.account_updates.len());
  let mut proofs = Vec::with_capacity(command.account_updates.len());

  for update in &command.account_updates {
    let mut proved = update.clone();
    let Some(LazyAuthorization::Proof(lazy)) = update.lazy_authorization.clone()
    else {
      account_updates.push(proved);
      proofs.push(None);
      continue;
    };

    let public_input = forest.to_public_input(update.id(), Mode::Plain)?;
    let max_proofs_verified = lazy.contract.max_proofs_verified();

    if !config.proofs_enabled {
      info!(
        "proofs disabled, using a dummy proof for {}.{}",
        lazy.contract.name(),
        lazy.method_name
      );
      let dummy = Proof::dummy(max_proofs_verified, public_input.to_fields());
      proved.set_proof(dummy.to_base64()?)?;
      account_updates.push(proved);
      proofs.push(None);
      continue;
    }

    let prover = lazy.contract.prover(&lazy.method_name)?;
    let context = ProverContext {
      public_key: update.public_key(),
      token_id: update.token_id(),
      args: lazy.args,
      memoized: lazy.memoized,
      blinding_value: lazy.blinding_value,
    };
    info!(
      "proving {}.{} for {}",
      lazy.contract.name(),
      lazy.method_name,
      update.public_key()
    );
    let proof = prover
      .prove(public_input.to_fields(), lazy.previous_proofs, context)
      .await?;
    proved.set_proof(proof.to_base64()?)?;
    account_updates.push(proved);
    proofs.push(Some(proof));
  }

  Ok((
    ZkappCommand {
      fee_payer: command.fee_payer.clone(),
      account_updates,
      memo: command.memo,
    },
    proofs,
  ))
}

/// Signs, in the wire form of a command, the fee payer and every
/// account update that belong to `key` and don't carry a proof.
pub fn sign_json_transaction(
  json: &str,
  key: &PrivateKey,
) -> Result<String, Error> {
  let mut command = ZkappCommand::from_json_str(json)?;
  let (commitment, full_commitment) = command.commitments()?;
  let address = key.to_public_key();

  if command.fee_payer.body.public_key == address {
    command.fee_payer.authorization = key.sign_field_element(&full_commitment)?;
  }
  for update in &mut command.account_updates {
    if update.public_key() != address || update.authorization.proof.is_some() {
      continue;
    }
    let message = match update.body.use_full_commitment {
      true => &full_commitment,
      false => &commitment,
    };
    update.set_signature(key.sign_field_element(message)?)?;
  }
  command.to_json_string()
}
