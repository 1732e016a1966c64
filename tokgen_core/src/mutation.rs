//! Tree-level structural rewriting through the internal child view.
//!
//! Rewriting passes (reduction, optionality flattening) address nodes by
//! [`TokenId`]. Every helper here walks the internal view only and refreshes each
//! ancestor on the way back up, so derived children such as the copies of a
//! repetition template always reflect the rewritten tree.

use crate::list::{InternalList, LogicalRemoval};
use crate::token::{BoxedToken, Token, TokenError, TokenId};

/// Finds the internal descendant `id` of `root`, or `root` itself.
pub fn find(root: &dyn Token, id: TokenId) -> Option<&dyn Token> {
    if root.id() == id {
        return Some(root);
    }
    let list = root.as_internal_list()?;
    (0..list.internal_len())
        .filter_map(|i| list.internal_get(i).ok())
        .find_map(|child| find(child, id))
}

/// Internal child indices leading from `root` to its descendant `id`.
///
/// Returns an empty path for `root` itself and `None` if `id` is not reachable.
pub fn internal_path(root: &dyn Token, id: TokenId) -> Option<Vec<usize>> {
    if root.id() == id {
        return Some(Vec::new());
    }
    let list = root.as_internal_list()?;
    for i in 0..list.internal_len() {
        let Ok(child) = list.internal_get(i) else {
            continue;
        };
        if let Some(mut path) = internal_path(child, id) {
            path.insert(0, i);
            return Some(path);
        }
    }
    None
}

fn internal_children(token: &mut dyn Token) -> Result<&mut dyn InternalList, TokenError> {
    let parent = token.id();
    token
        .as_internal_list_mut()
        .ok_or_else(|| TokenError::Internal(format!("token {parent} lost its internal children")))
}

fn lookup_path(root: &dyn Token, id: TokenId) -> Result<Vec<usize>, TokenError> {
    match internal_path(root, id) {
        Some(path) if !path.is_empty() => Ok(path),
        _ => Err(TokenError::UnknownToken(id)),
    }
}

/// Replaces the internal descendant `old` of `root` with `new` and returns the
/// displaced subtree.
///
/// The root itself has no parent to be replaced in and is reported as unknown.
pub fn replace(
    root: &mut dyn Token,
    old: TokenId,
    new: BoxedToken,
) -> Result<BoxedToken, TokenError> {
    let path = lookup_path(root, old)?;
    tracing::debug!(
        root = %root.id(),
        old = %old,
        new = %new.id(),
        depth = path.len(),
        "replacing token"
    );
    replace_along(root, &path, old, new)
}

fn replace_along(
    token: &mut dyn Token,
    path: &[usize],
    old: TokenId,
    new: BoxedToken,
) -> Result<BoxedToken, TokenError> {
    let list = internal_children(token)?;

    match path {
        [] => Err(TokenError::UnknownToken(old)),
        [_] => list.internal_replace(old, new).ok_or(TokenError::UnknownToken(old)),
        [first, rest @ ..] => {
            let child = list.internal_get_mut(*first)?;
            let displaced = replace_along(child, rest, old, new)?;
            list.internal_refresh();
            Ok(displaced)
        }
    }
}

/// Logically removes the internal descendant `id` of `root`.
///
/// A parent that cannot exist without the removed child is removed from its own
/// parent in turn. [`LogicalRemoval::Remove`] means the removal reached `root`,
/// which the caller must then drop.
pub fn logical_remove(root: &mut dyn Token, id: TokenId) -> Result<LogicalRemoval, TokenError> {
    let path = lookup_path(root, id)?;
    tracing::debug!(
        root = %root.id(),
        target = %id,
        depth = path.len(),
        "logically removing token"
    );
    remove_along(root, &path, id)
}

fn remove_along(
    token: &mut dyn Token,
    path: &[usize],
    id: TokenId,
) -> Result<LogicalRemoval, TokenError> {
    let list = internal_children(token)?;

    match path {
        [] => Err(TokenError::UnknownToken(id)),
        [_] => Ok(list.internal_logical_remove(id)),
        [first, rest @ ..] => {
            let child = list.internal_get_mut(*first)?;
            let child_id = child.id();
            match remove_along(child, rest, id)? {
                LogicalRemoval::Remove => Ok(list.internal_logical_remove(child_id)),
                LogicalRemoval::Keep => {
                    list.internal_refresh();
                    Ok(LogicalRemoval::Keep)
                }
            }
        }
    }
}

/// Ids of every token reachable through the internal view, `root` included, that
/// is currently optional.
pub fn optionals(root: &dyn Token) -> Vec<TokenId> {
    let mut found = Vec::new();
    collect_optionals(root, &mut found);
    found
}

fn collect_optionals(token: &dyn Token, found: &mut Vec<TokenId>) {
    if token.as_optional().is_some_and(|optional| optional.is_optional()) {
        found.push(token.id());
    }
    if let Some(list) = token.as_internal_list() {
        for i in 0..list.internal_len() {
            if let Ok(child) = list.internal_get(i) {
                collect_optionals(child, found);
            }
        }
    }
}

/// Activates or deactivates the optional token `id` inside `root`.
pub fn set_optional(root: &mut dyn Token, id: TokenId, active: bool) -> Result<(), TokenError> {
    let path = internal_path(root, id).ok_or(TokenError::UnknownToken(id))?;
    toggle_along(root, &path, id, active)
}

fn toggle_along(
    token: &mut dyn Token,
    path: &[usize],
    id: TokenId,
    active: bool,
) -> Result<(), TokenError> {
    let Some((first, rest)) = path.split_first() else {
        let optional = token
            .as_optional_mut()
            .filter(|optional| optional.is_optional())
            .ok_or_else(|| TokenError::InvalidDefinition(format!("token {id} is not optional")))?;
        if active {
            optional.activate();
        } else {
            optional.deactivate();
        }
        return Ok(());
    };

    let list = internal_children(token)?;
    let child = list.internal_get_mut(*first)?;
    toggle_along(child, rest, id, active)?;
    list.internal_refresh();
    Ok(())
}
