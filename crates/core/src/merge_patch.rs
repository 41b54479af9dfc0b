//! JSON merge patch (RFC 7396).
//!
//! A merge patch is a JSON document describing the changes between two
//! documents:
//!
//! - object members present in the patch are set (recursively for objects)
//! - object members mapped to `null` are removed
//! - members absent from the patch are left alone
//! - any non-object patch replaces the target wholesale
//!
//! Arrays are never diffed element-wise; a changed array is replaced whole.
//!
//! Object comparison is structural and member order never matters, which
//! keeps `apply` deterministic for every replica that replays the same patch.
//!
//! RFC 7396 cannot express "set this member to `null`". A `null` member in
//! `current` therefore diffs to a removal.

use serde_json::{Map, Value};

use crate::error::{PatchError, PatchResult};

/// Compute the merge patch transforming `previous` into `current`.
///
/// When both sides are objects the result holds exactly the members that
/// differ. Otherwise the result is `current` itself.
pub fn diff(previous: &Value, current: &Value) -> Value {
    match (previous, current) {
        (Value::Object(prev), Value::Object(curr)) => Value::Object(diff_objects(prev, curr)),
        _ => current.clone(),
    }
}

fn diff_objects(prev: &Map<String, Value>, curr: &Map<String, Value>) -> Map<String, Value> {
    let mut patch = Map::new();

    for key in prev.keys() {
        if !curr.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }

    for (key, curr_value) in curr {
        match prev.get(key) {
            Some(prev_value) if prev_value == curr_value => {}
            Some(Value::Object(prev_obj)) => match curr_value {
                Value::Object(curr_obj) => {
                    patch.insert(key.clone(), Value::Object(diff_objects(prev_obj, curr_obj)));
                }
                _ => {
                    patch.insert(key.clone(), curr_value.clone());
                }
            },
            _ => {
                patch.insert(key.clone(), curr_value.clone());
            }
        }
    }

    patch
}

/// Apply a merge patch to `base`, returning the merged document.
pub fn apply(base: &Value, patch: &Value) -> Value {
    let mut target = base.clone();
    apply_in_place(&mut target, patch);
    target
}

/// Apply a merge patch to `target` in place.
pub fn apply_in_place(target: &mut Value, patch: &Value) {
    json_patch::merge(target, patch);
}

/// Byte-level [`diff`]: parse both documents, diff, and serialize the patch.
pub fn create_merge_patch(previous: &[u8], current: &[u8]) -> PatchResult<Vec<u8>> {
    let previous: Value = serde_json::from_slice(previous).map_err(PatchError::InvalidDocument)?;
    let current: Value = serde_json::from_slice(current).map_err(PatchError::InvalidDocument)?;
    serde_json::to_vec(&diff(&previous, &current)).map_err(PatchError::Serialize)
}

/// Byte-level [`apply`]: parse the stored document and the patch, merge, and
/// serialize the result with canonical (sorted) member order.
pub fn merge_patch(document: &[u8], patch: &[u8]) -> PatchResult<Vec<u8>> {
    let mut document: Value =
        serde_json::from_slice(document).map_err(PatchError::InvalidDocument)?;
    let patch: Value = serde_json::from_slice(patch).map_err(PatchError::InvalidPatch)?;
    apply_in_place(&mut document, &patch);
    serde_json::to_vec(&document).map_err(PatchError::Serialize)
}
