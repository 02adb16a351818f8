//! Relationship manager.
//!
//! Every relationship has two ends, declared as a [`SlotDecl`] on each side.
//! All mutation goes through the entity-level `put`/`take` primitives on the
//! bundle arena, so both ends are updated by the same call and a to-one end
//! never points at two partners:
//!
//! - linking writes the owner's end, then the target's end; whichever write
//!   displaces a previous partner from a to-one slot also removes the
//!   displaced partner's back-reference;
//! - unlinking removes each end from the other;
//! - bulk replacement tears the old members down from a snapshot before
//!   linking the new ones.
//!
//! Checks run before the first write, so a rejected call changes nothing.

use tracing::trace;

use crate::bundle::Bundle;
use crate::entity::EntityRef;
use crate::error::ModelError;
use crate::schema::{Cardinality, SlotDecl};
use crate::shapes;

/// Resolves `slot` on `owner` and its inverse on the target type.
fn resolve(bundle: &Bundle, owner: EntityRef, slot: &str) -> Result<(&'static SlotDecl, &'static SlotDecl), ModelError> {
    let shape = bundle.entity(owner)?.shape();
    let decl = shape.slot(slot).ok_or_else(|| ModelError::UnknownSlot {
        type_tag: shape.type_tag.to_string(),
        slot: slot.to_string(),
    })?;
    let inverse = shapes::shape_for(decl.target)?
        .slot(decl.inverse)
        .ok_or_else(|| ModelError::UnknownSlot {
            type_tag: decl.target.to_string(),
            slot: decl.inverse.to_string(),
        })?;
    Ok((decl, inverse))
}

fn check_target(bundle: &Bundle, owner: EntityRef, decl: &SlotDecl, target: EntityRef) -> Result<(), ModelError> {
    if target.type_tag() != decl.target {
        return Err(ModelError::WrongEntityType {
            type_tag: owner.type_tag().to_string(),
            slot: decl.name.to_string(),
            expected: decl.target.to_string(),
            found: target.type_tag().to_string(),
        });
    }
    bundle.entity(target).map(|_| ())
}

/// Writes one end of an edge and detaches whatever partner that write
/// displaced.
fn connect(bundle: &mut Bundle, a: EntityRef, a_slot: &SlotDecl, b: EntityRef) {
    let displaced = bundle.get_mut(a).and_then(|e| e.put(a_slot.name, b));
    if let Some(prev) = displaced {
        if let Some(prev_entity) = bundle.get_mut(prev) {
            prev_entity.take(a_slot.inverse, a);
        }
        trace!(%a, slot = a_slot.name, %prev, "detached previous partner");
    }
}

/// Severs one edge on both ends.
fn disconnect(bundle: &mut Bundle, a: EntityRef, a_slot: &SlotDecl, b: EntityRef) -> bool {
    let forward = bundle.get_mut(a).is_some_and(|e| e.take(a_slot.name, b));
    let backward = bundle.get_mut(b).is_some_and(|e| e.take(a_slot.inverse, a));
    forward || backward
}

/// Links `owner.slot` to `target` and the inverse slot back to `owner`.
///
/// On a to-one end this replaces the current partner; on a to-many end it
/// appends, and linking an existing member again is a no-op.
pub fn link(bundle: &mut Bundle, owner: EntityRef, slot: &str, target: EntityRef) -> Result<(), ModelError> {
    let (decl, inverse) = resolve(bundle, owner, slot)?;
    check_target(bundle, owner, decl, target)?;
    connect(bundle, owner, decl, target);
    connect(bundle, target, inverse, owner);
    trace!(%owner, slot = decl.name, %target, "linked");
    Ok(())
}

/// Removes the edge between `owner.slot` and `target`. Returns whether an
/// edge existed.
pub fn unlink(bundle: &mut Bundle, owner: EntityRef, slot: &str, target: EntityRef) -> Result<bool, ModelError> {
    let (decl, _) = resolve(bundle, owner, slot)?;
    check_target(bundle, owner, decl, target)?;
    let removed = disconnect(bundle, owner, decl, target);
    trace!(%owner, slot = decl.name, %target, removed, "unlinked");
    Ok(removed)
}

/// Detaches every member of `owner.slot`.
pub fn unset(bundle: &mut Bundle, owner: EntityRef, slot: &str) -> Result<(), ModelError> {
    let (decl, _) = resolve(bundle, owner, slot)?;
    let members = bundle.entity(owner)?.many(decl.name).to_vec();
    for member in members {
        disconnect(bundle, owner, decl, member);
    }
    Ok(())
}

/// Replaces the members of a to-many slot with `targets`, in order.
/// Duplicate targets are linked once.
pub fn replace_many(bundle: &mut Bundle, owner: EntityRef, slot: &str, targets: &[EntityRef]) -> Result<(), ModelError> {
    let (decl, inverse) = resolve(bundle, owner, slot)?;
    if decl.cardinality != Cardinality::Many {
        return Err(ModelError::TypeMismatch {
            type_tag: owner.type_tag().to_string(),
            field: decl.name.to_string(),
            expected: "a to-many slot".to_string(),
            found: "a to-one slot".to_string(),
        });
    }
    for target in targets {
        check_target(bundle, owner, decl, *target)?;
    }
    unset(bundle, owner, decl.name)?;
    for target in targets {
        connect(bundle, owner, decl, *target);
        connect(bundle, *target, inverse, owner);
    }
    trace!(%owner, slot = decl.name, count = targets.len(), "replaced members");
    Ok(())
}

/// Severs every edge of `r`, leaving its partners without a back-reference.
pub(crate) fn detach_all(bundle: &mut Bundle, r: EntityRef) {
    let Some(entity) = bundle.get(r) else {
        return;
    };
    let shape = entity.shape();
    let edges: Vec<(&'static SlotDecl, Vec<EntityRef>)> = entity
        .slots()
        .filter_map(|(name, slot)| Some((shape.slot(name)?, slot.refs().to_vec())))
        .collect();
    for (decl, members) in edges {
        for member in members {
            disconnect(bundle, r, decl, member);
        }
    }
}
