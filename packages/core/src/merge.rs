//! Merging the local view with a fresh read of the shared registry.

use crate::model::{Registry, WindowDescriptor};

/// Combine the local view with the registry just read from the medium.
///
/// The remote registry is taken as a snapshot: its entries and order win for
/// every peer, and peers it no longer lists are dropped. `own` always wins
/// for its id. If the remote lost `own` (a racing writer clobbered it), it is
/// put back right after the entry it followed in `local`, so its index does
/// not jump to the end. Duplicate ids in `remote` keep the first occurrence.
///
/// Peers without a heartbeat stamp get one inferred: the stamp already known
/// locally if their shape is unchanged, otherwise `now`.
pub fn merge(local: &Registry, remote: &Registry, own: &WindowDescriptor, now: u64) -> Registry {
    let mut merged = Registry::new();

    for descriptor in remote {
        if merged.contains(&descriptor.id) {
            continue;
        }

        if descriptor.id == own.id {
            merged.upsert(own.clone());
            continue;
        }

        let mut peer = descriptor.clone();
        if peer.last_seen.is_none() {
            let known = local
                .get(&peer.id)
                .filter(|prev| prev.shape == peer.shape)
                .and_then(|prev| prev.last_seen);
            peer.last_seen = Some(known.unwrap_or(now));
        }
        merged.upsert(peer);
    }

    if !merged.contains(&own.id) {
        let index = match local.position(&own.id) {
            Some(own_index) => local.as_slice()[..own_index]
                .iter()
                .rev()
                .find_map(|d| merged.position(&d.id))
                .map(|p| p + 1)
                .unwrap_or(0),
            None => merged.len(),
        };
        merged.insert(index, own.clone());
    }

    merged
}
