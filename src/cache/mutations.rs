//! Mutation Module
//!
//! Pure functions computing the next collection for optimistic writes.
//! None of them perform I/O or fail; all are O(n) and keep existing
//! entries in order, with appended items going to the end.

use serde_json::Value;

use crate::cache::Entity;

/// Returns the value of `field` on `entity`, if it is an object carrying it.
pub fn field_value<'a>(entity: &'a Entity, field: &str) -> Option<&'a Value> {
    entity.get(field)
}

// == Add ==
/// Appends `item` to the end of `data`.
///
/// No deduplication: an existing entry with the same identifying value is
/// left in place and the collection then holds both.
pub fn add_item(data: &[Entity], item: Entity) -> Vec<Entity> {
    let mut next = Vec::with_capacity(data.len() + 1);
    next.extend_from_slice(data);
    next.push(item);
    next
}

// == Update ==
/// Replaces the first entry whose `match_field` equals `item[match_field]`.
///
/// Appends `item` when nothing matches, which covers callers updating a
/// record that was never loaded into this collection.
pub fn update_item(data: &[Entity], item: Entity, match_field: &str) -> Vec<Entity> {
    let position = field_value(&item, match_field).and_then(|target| {
        data.iter()
            .position(|existing| field_value(existing, match_field) == Some(target))
    });

    let mut next = data.to_vec();
    match position {
        Some(index) => next[index] = item,
        None => next.push(item),
    }
    next
}

// == Remove ==
/// Drops every entry whose `match_field` equals `identifier`.
///
/// Absent identifiers leave the collection unchanged.
pub fn remove_item(data: &[Entity], identifier: &Value, match_field: &str) -> Vec<Entity> {
    data.iter()
        .filter(|existing| field_value(existing, match_field) != Some(identifier))
        .cloned()
        .collect()
}
