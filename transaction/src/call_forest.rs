use {
  crate::{
    AccountUpdate,
    CallsHash,
    ChildrenLayout,
    Error,
    Mode,
    Token,
    TokenId,
    UpdateId,
    ZkappPublicInput,
  },
  std::collections::{HashMap, HashSet},
  zkapp_primitives::{hash_with_prefix, prefixes, Field, PublicKey},
};

/// An owned copy of an account update together with all its descendants.
#[derive(Debug, Clone)]
pub struct AccountUpdateTree {
  pub update: AccountUpdate,
  pub children: Vec<AccountUpdateTree>,
}

impl AccountUpdateTree {
  fn ids(&self, acc: &mut Vec<UpdateId>) {
    acc.push(self.update.id());
    for child in &self.children {
      child.ids(acc);
    }
  }
}

/// The token context an update is called in.
///
/// `self_id` is the token id of the closest ancestor that is not a
/// delegate call, `caller` is the one before that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
  pub caller: TokenId,
  pub self_id: TokenId,
}

impl Default for CallerContext {
  fn default() -> Self {
    Self {
      caller: TokenId::default(),
      self_id: TokenId::default(),
    }
  }
}

impl CallerContext {
  /// The caller recorded in the body of an update called in this context.
  pub fn caller_for(&self, is_delegate_call: bool) -> TokenId {
    if is_delegate_call {
      self.caller
    } else {
      self.self_id
    }
  }
}

/// Arena of account updates and the ordered list of top level updates
/// of a transaction under construction.
///
/// Every update is either a root, a child of exactly one other update
/// in this forest, or detached (not yet placed anywhere). Structural
/// changes go through the methods of this type only.
#[derive(Debug, Clone, Default)]
pub struct CallForest {
  updates: HashMap<UpdateId, AccountUpdate>,
  roots: Vec<UpdateId>,
}

impl CallForest {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.updates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.updates.is_empty()
  }

  pub fn contains(&self, id: UpdateId) -> bool {
    self.updates.contains_key(&id)
  }

  pub fn get(&self, id: UpdateId) -> Result<&AccountUpdate, Error> {
    self.updates.get(&id).ok_or(Error::UnknownAccountUpdate(id))
  }

  /// Mutable access to the contents of an update. Its place in the tree
  /// can only be changed through the forest.
  pub fn get_mut(&mut self, id: UpdateId) -> Result<&mut AccountUpdate, Error> {
    self.updates.get_mut(&id).ok_or(Error::UnknownAccountUpdate(id))
  }

  pub fn roots(&self) -> &[UpdateId] {
    &self.roots
  }

  pub fn children(&self, id: UpdateId) -> Result<&[UpdateId], Error> {
    Ok(&self.get(id)?.children.updates)
  }

  pub fn parent(&self, id: UpdateId) -> Result<Option<UpdateId>, Error> {
    Ok(self.get(id)?.parent)
  }

  /// Adds an update to the arena without placing it in the tree.
  /// Child links of the inserted value are discarded.
  pub fn insert_detached(
    &mut self,
    mut update: AccountUpdate,
  ) -> Result<UpdateId, Error> {
    let id = update.id();
    if self.contains(id) {
      return Err(Error::DuplicateAccountUpdate(id));
    }
    update.parent = None;
    update.children.updates.clear();
    self.updates.insert(id, update);
    Ok(id)
  }

  /// Moves an update to the end of the top level list.
  pub fn push_root(&mut self, id: UpdateId) -> Result<(), Error> {
    self.detach(id)?;
    self.roots.push(id);
    self.stamp_depth(id, 0)
  }

  /// Creates a default update and appends it to the top level list.
  pub fn create(
    &mut self,
    public_key: PublicKey,
    token_id: Option<TokenId>,
  ) -> UpdateId {
    let update = AccountUpdate::default_account_update(public_key, token_id);
    let id = update.id();
    self.updates.insert(id, update);
    self.roots.push(id);
    id
  }

  /// Makes `child` the last child of `parent`, removing it from its
  /// previous location first. If it already is a child of `parent` it
  /// keeps its position.
  pub fn make_child(
    &mut self,
    parent: UpdateId,
    child: UpdateId,
  ) -> Result<(), Error> {
    let depth = self.get(parent)?.body.call_depth + 1;
    self.get(child)?;

    let mut ancestor = Some(parent);
    while let Some(current) = ancestor {
      if current == child {
        return Err(Error::CycleDetected { parent, child });
      }
      ancestor = self.get(current)?.parent;
    }

    if self.get(child)?.parent != Some(parent) {
      self.detach(child)?;
      self.get_mut(parent)?.children.updates.push(child);
      self.get_mut(child)?.parent = Some(parent);
    }
    self.stamp_depth(child, depth)
  }

  /// Creates a default update as the last child of `parent`.
  pub fn create_child(
    &mut self,
    parent: UpdateId,
    public_key: PublicKey,
    token_id: Option<TokenId>,
  ) -> Result<UpdateId, Error> {
    self.get(parent)?;
    let child = self.insert_detached(AccountUpdate::default_account_update(
      public_key, token_id,
    ))?;
    self.make_child(parent, child)?;
    Ok(child)
  }

  /// Makes `child` a regular (non delegate) call of `parent` and fixes
  /// the shape of its children.
  pub fn approve(
    &mut self,
    parent: UpdateId,
    child: UpdateId,
    layout: ChildrenLayout,
  ) -> Result<(), Error> {
    self.get(parent)?;
    // the delegate call flag is cleared below, so the root of the
    // approved subtree always satisfies `NoDelegation`
    let expected = match &layout {
      ChildrenLayout::NoDelegation => ChildrenLayout::AnyChildren,
      other => other.clone(),
    };
    self.check_layout(child, &expected, false)?;
    self.make_child(parent, child)?;
    self.get_mut(child)?.is_delegate_call = false;
    self.witness_children(child, layout, true)
  }

  /// Removes an update from its parent or from the top level list. The
  /// update and its descendants stay in the arena, detached.
  pub fn unlink(&mut self, id: UpdateId) -> Result<(), Error> {
    self.detach(id)
  }

  fn detach(&mut self, id: UpdateId) -> Result<(), Error> {
    match self.get(id)?.parent {
      Some(parent) => {
        self.get_mut(parent)?.children.updates.retain(|c| *c != id);
        self.get_mut(id)?.parent = None;
      }
      None => self.roots.retain(|r| *r != id),
    }
    Ok(())
  }

  fn stamp_depth(&mut self, id: UpdateId, depth: u32) -> Result<(), Error> {
    let update = self.get_mut(id)?;
    update.body.call_depth = depth;
    let children = update.children.updates.clone();
    for child in children {
      self.stamp_depth(child, depth + 1)?;
    }
    Ok(())
  }

  /// Deep copy of an update and its descendants. Ids, labels and lazy
  /// authorizations are preserved.
  pub fn clone_subtree(&self, id: UpdateId) -> Result<AccountUpdateTree, Error> {
    let update = self.get(id)?;
    let children = update
      .children
      .updates
      .iter()
      .map(|child| self.clone_subtree(*child))
      .collect::<Result<_, _>>()?;
    Ok(AccountUpdateTree {
      update: update.clone(),
      children,
    })
  }

  /// Inserts a cloned subtree as a detached tree. Fails without any
  /// change if one of its ids is already present.
  pub fn insert_tree(
    &mut self,
    tree: AccountUpdateTree,
  ) -> Result<UpdateId, Error> {
    let mut ids = vec![];
    tree.ids(&mut ids);
    let mut seen = HashSet::new();
    for id in ids {
      if self.contains(id) || !seen.insert(id) {
        return Err(Error::DuplicateAccountUpdate(id));
      }
    }
    let root = tree.update.id();
    self.insert_subtree(tree, None);
    Ok(root)
  }

  fn insert_subtree(&mut self, tree: AccountUpdateTree, parent: Option<UpdateId>) {
    let AccountUpdateTree {
      mut update,
      children,
    } = tree;
    let id = update.id();
    update.parent = parent;
    update.children.updates = children.iter().map(|c| c.update.id()).collect();
    self.updates.insert(id, update);
    for child in children {
      self.insert_subtree(child, Some(id));
    }
  }

  /// Builds a forest whose roots are the given trees, in order.
  pub fn from_trees(trees: Vec<AccountUpdateTree>) -> Result<Self, Error> {
    let mut forest = Self::default();
    for tree in trees {
      let root = forest.insert_tree(tree)?;
      forest.push_root(root)?;
    }
    Ok(forest)
  }

  /// Rebuilds the tree structure of a flat, call depth stamped list of
  /// updates, such as the updates of a zkApp command.
  pub fn from_flat_list(
    updates: impl IntoIterator<Item = AccountUpdate>,
  ) -> Result<Self, Error> {
    let mut forest = Self::default();
    let mut stack: Vec<UpdateId> = vec![];
    for (index, update) in updates.into_iter().enumerate() {
      let depth = update.body.call_depth;
      if depth as usize > stack.len() {
        return Err(Error::InvalidCallDepth { index, depth });
      }
      stack.truncate(depth as usize);
      let id = forest.insert_detached(update)?;
      match stack.last() {
        Some(parent) => {
          forest.get_mut(*parent)?.children.updates.push(id);
          forest.get_mut(id)?.parent = Some(*parent);
        }
        None => forest.roots.push(id),
      }
      stack.push(id);
    }
    Ok(forest)
  }

  /// Marks the end of a list of siblings in the cons hash construction.
  pub fn empty_hash() -> Field {
    Field::zero()
  }

  /// The `calls` hash over the children of an update.
  pub fn hash_children(&self, id: UpdateId, mode: Mode) -> Result<Field, Error> {
    let calls = self.get(id)?.children.calls;
    let actual = self.hash_children_base(id, mode)?;
    match calls {
      CallsHash::Equals(expected)
        if mode == Mode::Constrained && expected != actual =>
      {
        Err(Error::ChildrenHashMismatch {
          update: id,
          expected,
          actual,
        })
      }
      _ => Ok(actual),
    }
  }

  /// Right to left cons hash over the children of an update.
  pub fn hash_children_base(
    &self,
    id: UpdateId,
    mode: Mode,
  ) -> Result<Field, Error> {
    self.hash_list(self.children(id)?, mode)
  }

  /// Commitment to the whole forest, over the top level updates.
  pub fn hash_roots(&self, mode: Mode) -> Result<Field, Error> {
    self.hash_list(&self.roots, mode)
  }

  fn hash_list(&self, ids: &[UpdateId], mode: Mode) -> Result<Field, Error> {
    let mut stack_hash = Self::empty_hash();
    for id in ids.iter().rev() {
      let update = self.get(*id)?;
      // dummies never contribute, outside of constrained computations
      // they are not even hashed
      if mode == Mode::Plain && update.is_dummy() {
        continue;
      }
      let calls = self.hash_children(*id, mode)?;
      let node_hash = hash_with_prefix(prefixes::ACCOUNT_UPDATE_NODE, &[
        update.hash(mode)?,
        calls,
      ]);
      let new_hash =
        hash_with_prefix(prefixes::ACCOUNT_UPDATE_CONS, &[node_hash, stack_hash]);
      stack_hash = select(update.is_dummy(), stack_hash, new_hash);
    }
    Ok(stack_hash)
  }

  pub fn to_public_input(
    &self,
    id: UpdateId,
    mode: Mode,
  ) -> Result<ZkappPublicInput, Error> {
    Ok(ZkappPublicInput {
      account_update: self.get(id)?.hash(mode)?,
      calls: self.hash_children(id, mode)?,
    })
  }

  /// Ids of all updates reachable from the roots, in pre-order.
  pub fn pre_order(&self) -> Vec<UpdateId> {
    let mut order = Vec::with_capacity(self.updates.len());
    let mut pending: Vec<UpdateId> = self.roots.iter().rev().copied().collect();
    while let Some(id) = pending.pop() {
      order.push(id);
      if let Some(update) = self.updates.get(&id) {
        pending.extend(update.children.updates.iter().rev());
      }
    }
    order
  }

  pub fn for_each(&self, mut callback: impl FnMut(&AccountUpdate)) {
    for id in self.pre_order() {
      if let Some(update) = self.updates.get(&id) {
        callback(update);
      }
    }
  }

  /// Visits all updates that come strictly before `target` in pre-order.
  pub fn for_each_predecessor(
    &self,
    target: UpdateId,
    mut callback: impl FnMut(&AccountUpdate),
  ) {
    for id in self.pre_order() {
      if id == target {
        break;
      }
      if let Some(update) = self.updates.get(&id) {
        callback(update);
      }
    }
  }

  /// Flattens the forest into its wire order, stamping call depths on
  /// the way. Dummy updates are dropped together with their descendants.
  pub fn to_flat_list(&mut self) -> Vec<AccountUpdate> {
    let mut flat = vec![];
    let mut pending: Vec<(UpdateId, u32)> =
      self.roots.iter().rev().map(|id| (*id, 0)).collect();
    while let Some((id, depth)) = pending.pop() {
      let Some(update) = self.updates.get_mut(&id) else {
        continue;
      };
      if update.is_dummy() {
        continue;
      }
      update.body.call_depth = depth;
      flat.push(update.clone());
      pending.extend(
        update.children.updates.iter().rev().map(|c| (*c, depth + 1)),
      );
    }
    flat
  }

  /// Propagates caller token ids from the roots down to all updates.
  pub fn add_callers(&mut self, mode: Mode) -> Result<(), Error> {
    let roots = self.roots.clone();
    for root in roots {
      self.add_callers_to(root, CallerContext::default(), mode)?;
    }
    Ok(())
  }

  fn add_callers_to(
    &mut self,
    id: UpdateId,
    context: CallerContext,
    mode: Mode,
  ) -> Result<(), Error> {
    let update = self.get_mut(id)?;
    let caller = context.caller_for(update.is_delegate_call);
    update.body.caller = caller;
    let self_id = match update.is_delegate_call {
      true => context.self_id,
      false => {
        Token::get_id(&update.body.public_key, &update.body.token_id, mode)?
      }
    };
    let children = update.children.updates.clone();
    let context = CallerContext { caller, self_id };
    for child in children {
      self.add_callers_to(child, context, mode)?;
    }
    Ok(())
  }

  /// Reconstructs the caller context of an update from its ancestors,
  /// giving the same result as [`Self::add_callers`].
  pub fn compute_caller_context(
    &self,
    id: UpdateId,
    mode: Mode,
  ) -> Result<CallerContext, Error> {
    let mut ancestors = vec![];
    let mut current = self.get(id)?.parent;
    while let Some(parent) = current {
      ancestors.push(parent);
      current = self.get(parent)?.parent;
    }

    let mut context = CallerContext::default();
    for ancestor in ancestors.into_iter().rev() {
      let update = self.get(ancestor)?;
      if update.is_delegate_call {
        continue;
      }
      context.caller = context.self_id;
      context.self_id =
        Token::get_id(&update.body.public_key, &update.body.token_id, mode)?;
    }
    Ok(context)
  }

  pub fn compute_call_depth(&self, id: UpdateId) -> Result<u32, Error> {
    let mut depth = 0;
    let mut current = self.get(id)?.parent;
    while let Some(parent) = current {
      depth += 1;
      current = self.get(parent)?.parent;
    }
    Ok(depth)
  }

  /// Runs `compute` to produce an update whose correctness is checked
  /// later. Unless `skip_check` is set, the body is validated.
  pub fn witness<F>(&mut self, compute: F, skip_check: bool) -> Result<UpdateId, Error>
  where
    F: FnOnce(&mut CallForest) -> Result<UpdateId, Error>,
  {
    let id = compute(self)?;
    if !skip_check {
      self.get(id)?.body.check()?;
    }
    Ok(id)
  }

  /// Like [`Self::witness`], and also witnesses the children of the
  /// update according to `layout`.
  pub fn witness_tree<F>(
    &mut self,
    compute: F,
    layout: ChildrenLayout,
    skip_check: bool,
  ) -> Result<UpdateId, Error>
  where
    F: FnOnce(&mut CallForest) -> Result<UpdateId, Error>,
  {
    let id = self.witness(compute, skip_check)?;
    self.witness_children(id, layout, skip_check)?;
    Ok(id)
  }

  /// Fixes how the children hash of an update is obtained. Static
  /// layouts are padded with dummy children.
  pub fn witness_children(
    &mut self,
    id: UpdateId,
    layout: ChildrenLayout,
    skip_check: bool,
  ) -> Result<(), Error> {
    self.check_layout(id, &layout, !skip_check)?;
    self.apply_layout(id, layout)
  }

  fn check_layout(
    &self,
    id: UpdateId,
    layout: &ChildrenLayout,
    check_bodies: bool,
  ) -> Result<(), Error> {
    let update = self.get(id)?;
    if check_bodies {
      update.body.check()?;
    }
    match layout {
      ChildrenLayout::AnyChildren => Ok(()),
      ChildrenLayout::NoDelegation if update.is_delegate_call => {
        Err(Error::NoDelegation(id))
      }
      ChildrenLayout::NoDelegation => Ok(()),
      ChildrenLayout::NoChildren => {
        self.check_layout(id, &ChildrenLayout::StaticChildren(vec![]), false)
      }
      ChildrenLayout::StaticChildren(layouts) => {
        let children = &update.children.updates;
        if children.len() > layouts.len() {
          return Err(Error::LayoutMismatch {
            expected: layouts.len(),
            found: children.len(),
          });
        }
        children
          .iter()
          .zip(layouts)
          .try_for_each(|(child, layout)| {
            self.check_layout(*child, layout, check_bodies)
          })
      }
    }
  }

  fn apply_layout(
    &mut self,
    id: UpdateId,
    layout: ChildrenLayout,
  ) -> Result<(), Error> {
    let layouts = match layout {
      ChildrenLayout::AnyChildren | ChildrenLayout::NoDelegation => {
        self.get_mut(id)?.children.calls = CallsHash::Witnessed;
        return Ok(());
      }
      ChildrenLayout::NoChildren => vec![],
      ChildrenLayout::StaticChildren(layouts) => layouts,
    };

    let count = layouts.len();
    for (index, layout) in layouts.into_iter().enumerate() {
      let child = match self.children(id)?.get(index) {
        Some(child) => *child,
        None => {
          let dummy = self.insert_detached(AccountUpdate::dummy())?;
          self.make_child(id, dummy)?;
          dummy
        }
      };
      self.apply_layout(child, layout)?;
    }

    self.get_mut(id)?.children.calls = match count {
      0 => CallsHash::Equals(Self::empty_hash()),
      _ => CallsHash::Computed,
    };
    Ok(())
  }
}

/// Picks `if_true` or `if_false` after both have been computed, so the
/// work done does not depend on the condition.
fn select(condition: bool, if_true: Field, if_false: Field) -> Field {
  match condition {
    true => if_true,
    false => if_false,
  }
}
