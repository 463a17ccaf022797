//! Cluster Identity Map (§3, §4.3, §9).
//!
//! The source implementation shares one mutable dict instance across every
//! member id in a cluster. Rust has no natural equivalent, so this follows
//! §9's suggested representation: `object_id -> cluster_id` plus
//! `cluster_id -> {id_set, update_ts}`, with merges implemented as a union
//! over the smaller representation rather than over shared references.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

/// The record shared by every object-id that has ever been co-clustered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEntry {
    pub cluster_id: u64,
    pub id_set: BTreeSet<String>,
    pub update_ts: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ClusterIdentityMap {
    object_to_cluster: HashMap<String, u64>,
    clusters: HashMap<u64, ClusterEntry>,
    next_cluster_id: u64,
}

impl ClusterIdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_for(&self, object_id: &str) -> Option<&ClusterEntry> {
        self.object_to_cluster
            .get(object_id)
            .and_then(|cid| self.clusters.get(cid))
    }

    /// Invariant 2 (§8): ids sharing an `id_set` resolve to the same record.
    pub fn share_cluster(&self, a: &str, b: &str) -> bool {
        match (self.object_to_cluster.get(a), self.object_to_cluster.get(b)) {
            (Some(ca), Some(cb)) => ca == cb,
            _ => false,
        }
    }

    /// Identity-maintenance protocol for one multi-camera cluster (§4.3).
    /// Returns the surviving `cluster_id`.
    pub fn maintain(&mut self, member_ids: &[String], batch_ts: DateTime<Utc>) -> u64 {
        let touched: BTreeSet<u64> = member_ids
            .iter()
            .filter_map(|id| self.object_to_cluster.get(id).copied())
            .collect();

        let surviving = match touched.iter().next() {
            Some(&first) => first,
            None => {
                let id = self.next_cluster_id;
                self.next_cluster_id += 1;
                self.clusters.insert(
                    id,
                    ClusterEntry {
                        cluster_id: id,
                        id_set: BTreeSet::new(),
                        update_ts: batch_ts,
                    },
                );
                id
            }
        };

        // `touched` is already sorted; the smallest is `surviving`. Union
        // every other touched cluster's id_set/update_ts into it and
        // repoint its members.
        for &cid in touched.iter().skip(1) {
            if let Some(removed) = self.clusters.remove(&cid) {
                for id in &removed.id_set {
                    self.object_to_cluster.insert(id.clone(), surviving);
                }
                let survivor = self
                    .clusters
                    .get_mut(&surviving)
                    .expect("surviving entry exists");
                survivor.id_set.extend(removed.id_set);
                if removed.update_ts > survivor.update_ts {
                    survivor.update_ts = removed.update_ts;
                }
            }
        }

        let survivor = self
            .clusters
            .get_mut(&surviving)
            .expect("surviving entry exists");
        for id in member_ids {
            survivor.id_set.insert(id.clone());
        }
        if batch_ts > survivor.update_ts {
            survivor.update_ts = batch_ts;
        }
        for id in member_ids {
            self.object_to_cluster.insert(id.clone(), surviving);
        }

        surviving
    }

    /// Remove entries whose `update_ts` is older than `prunetime_sec`
    /// relative to `now` (§4.3 "Pruning").
    pub fn prune(&mut self, now: DateTime<Utc>, prunetime_sec: f64) {
        let stale: Vec<u64> = self
            .clusters
            .iter()
            .filter(|(_, e)| (now - e.update_ts).as_seconds_f64() > prunetime_sec)
            .map(|(&cid, _)| cid)
            .collect();
        for cid in stale {
            if let Some(entry) = self.clusters.remove(&cid) {
                for id in entry.id_set {
                    self.object_to_cluster.remove(&id);
                }
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }
}
