//! The immutable cluster topology snapshot: partitions, the executors
//! that serve them, and the flattened slot→address lookup table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ClusterConfig;
use crate::executor::SingleNodeExecutor;
use crate::resp::output::ClusterPartition;

use super::slot::SLOT_COUNT;

/// A point-in-time view of the cluster. Replaced wholesale on refresh —
/// callers never mutate one in place, they swap the `Arc` behind an
/// `arc_swap::ArcSwap` for a new snapshot built from a fresh `CLUSTER
/// SLOTS` reply.
pub struct ClusterConnection {
    pub partitions: Vec<ClusterPartition>,
    pub executors: HashMap<(String, u16), Arc<SingleNodeExecutor>>,
    slot_to_address: Vec<Option<(String, u16)>>,
}

impl ClusterConnection {
    /// Builds a snapshot from a decoded `CLUSTER SLOTS` reply: one
    /// executor per unique master address, plus the flattened
    /// slot→address table used for routing.
    pub fn build(partitions: Vec<ClusterPartition>, config: &ClusterConfig) -> Self {
        let mut executors: HashMap<(String, u16), Arc<SingleNodeExecutor>> = HashMap::new();
        let mut slot_to_address = vec![None; SLOT_COUNT as usize];

        for partition in &partitions {
            let address = (partition.master.host.clone(), partition.master.port);
            executors.entry(address.clone()).or_insert_with(|| {
                Arc::new(SingleNodeExecutor::connect(
                    crate::config::SingleNodeConfig::new(address.0.clone(), address.1)
                        .with_queue_capacity(config.queue_capacity)
                        .with_connect_timeout(config.connect_timeout),
                ))
            });
            for slot in partition.slot_start..=partition.slot_end {
                slot_to_address[slot as usize] = Some(address.clone());
            }
        }

        ClusterConnection {
            partitions,
            executors,
            slot_to_address,
        }
    }

    pub fn address_for_slot(&self, slot: u16) -> Option<(String, u16)> {
        self.slot_to_address.get(slot as usize)?.clone()
    }

    pub fn executor_for_slot(&self, slot: u16) -> Option<Arc<SingleNodeExecutor>> {
        let address = self.address_for_slot(slot)?;
        self.executors.get(&address).cloned()
    }

    pub fn executor_for_address(&self, address: &(String, u16)) -> Option<Arc<SingleNodeExecutor>> {
        self.executors.get(address).cloned()
    }

    /// Any connected executor, used for keyless commands that don't
    /// route by slot.
    pub fn any_executor(&self) -> Option<Arc<SingleNodeExecutor>> {
        self.executors.values().next().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resp::output::ClusterNode;

    fn partition(start: u16, end: u16, host: &str, port: u16) -> ClusterPartition {
        ClusterPartition {
            slot_start: start,
            slot_end: end,
            master: ClusterNode {
                host: host.to_string(),
                port,
                node_id: None,
            },
            replicas: Vec::new(),
        }
    }

    #[test]
    fn builds_slot_table_and_dedupes_executors_per_master() {
        let config = ClusterConfig::new(vec![("127.0.0.1".to_string(), 7000)]);
        let partitions = vec![
            partition(0, 5460, "127.0.0.1", 7000),
            partition(5461, 10922, "127.0.0.1", 7001),
        ];
        let snapshot = ClusterConnection::build(partitions, &config);

        assert_eq!(snapshot.executors.len(), 2);
        assert_eq!(
            snapshot.address_for_slot(0),
            Some(("127.0.0.1".to_string(), 7000))
        );
        assert_eq!(
            snapshot.address_for_slot(10922),
            Some(("127.0.0.1".to_string(), 7001))
        );
        assert_eq!(snapshot.address_for_slot(10923), None);
    }
}
