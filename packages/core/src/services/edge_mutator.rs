//! Edge Mutator primitives
//!
//! Pure, in-memory operations on one relationship array (`Vec<Collection>`).
//! `RelationshipService` applies them to both endpoints of an edge inside one
//! working set; validation of names and membership happens before they run.

use crate::models::{
    ensure_main, find_collection, Collection, NodeRef, SortDetails, MAIN_COLLECTION,
};

/// Append `ids` to the collection named `collection_name`, creating it if absent
///
/// Ids already in that collection are skipped. Returns the ids actually added,
/// in request order.
pub fn append_unique(
    collections: &mut Vec<Collection>,
    collection_name: &str,
    ids: &[String],
) -> Vec<String> {
    ensure_main(collections);
    let index = match find_collection(collections, collection_name) {
        Some(index) => index,
        None => {
            collections.push(Collection::new(collection_name));
            collections.len() - 1
        }
    };

    let collection = &mut collections[index];
    let mut added = Vec::new();
    for id in ids {
        if !collection.contains(id) {
            collection.nodes.push(NodeRef::new(id.as_str()));
            added.push(id.clone());
        }
    }
    added
}

/// Add the mirrored half of an edge to the `main` collection
///
/// Returns false if `main` already references `id`.
pub fn mirror_into_main(collections: &mut Vec<Collection>, id: &str) -> bool {
    append_unique(collections, MAIN_COLLECTION, &[id.to_string()]).len() == 1
}

/// Remove `id` from every collection, keeping collections that become empty
///
/// Returns true if anything was removed.
pub fn remove_everywhere(collections: &mut [Collection], id: &str) -> bool {
    let mut removed = false;
    for collection in collections.iter_mut() {
        let before = collection.nodes.len();
        collection.nodes.retain(|n| n.id != id);
        removed |= collection.nodes.len() != before;
    }
    removed
}

/// Replace `old_id` with `new_id` in the `main` collection
///
/// `new_id` takes the position `old_id` held in `main`. If `main` already
/// references `new_id`, or `old_id` was not in `main`, `old_id` is simply
/// dropped and `new_id` is appended to `main` when missing. Every other
/// collection loses `old_id`.
pub fn retarget(collections: &mut Vec<Collection>, old_id: &str, new_id: &str) {
    ensure_main(collections);
    if let Some(main) = collections.iter_mut().find(|c| c.is_main()) {
        if !main.contains(new_id) {
            if let Some(position) = main.position(old_id) {
                main.nodes[position] = NodeRef::new(new_id);
            }
        }
    }
    remove_everywhere(collections, old_id);
    mirror_into_main(collections, new_id);
}

/// Move `ids` from `source` to `target` within one relationship array
///
/// Ids already present in `target` are only removed from `source`. Both
/// collections must exist; returns false otherwise.
pub fn move_between(
    collections: &mut [Collection],
    ids: &[String],
    source: &str,
    target: &str,
) -> bool {
    let (Some(source_index), Some(target_index)) = (
        find_collection(collections, source),
        find_collection(collections, target),
    ) else {
        return false;
    };

    collections[source_index]
        .nodes
        .retain(|n| !ids.iter().any(|id| *id == n.id));

    let target_collection = &mut collections[target_index];
    for id in ids {
        if !target_collection.contains(id) {
            target_collection.nodes.push(NodeRef::new(id.as_str()));
        }
    }
    true
}

/// Reposition members of one collection
///
/// The listed members are taken out, then reinserted one by one in ascending
/// order of requested index (request order breaks ties). An index past the end
/// of the collection at insertion time places the member at the end.
///
/// Returns move metadata for the first listed member whose position changed,
/// or `None` if the order did not change.
pub fn reorder(
    collection: &mut Collection,
    collection_index: usize,
    moves: &[(String, usize)],
) -> Option<SortDetails> {
    let original: Vec<String> = collection.nodes.iter().map(|n| n.id.clone()).collect();

    let mut taken: Vec<(usize, NodeRef)> = Vec::with_capacity(moves.len());
    for (id, new_index) in moves {
        if let Some(position) = collection.position(id) {
            taken.push((*new_index, collection.nodes.remove(position)));
        }
    }

    // Stable sort keeps request order for equal indices
    taken.sort_by_key(|(index, _)| *index);
    for (index, node) in taken {
        let index = index.min(collection.nodes.len());
        collection.nodes.insert(index, node);
    }

    moves.iter().find_map(|(id, _)| {
        let from = original.iter().position(|o| o == id)?;
        let to = collection.position(id)?;
        (from != to).then(|| SortDetails::new(id.as_str(), collection_index, from, to))
    })
}
