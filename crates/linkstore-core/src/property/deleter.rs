//! Whole-chain deletion that tolerates damaged chains

use super::encoding::{free_dynamic_chain, read_block_value};
use super::{PropertyChainManager, PropertyOwner};
use crate::access::RecordAccessSet;
use crate::record::{NULL_REFERENCE, Record, is_null};
use crate::Result;
use std::collections::HashSet;
use std::fmt;

/// Damage found while walking a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainAnomaly {
    /// A `next` reference pointed back at an already visited record
    Cycle {
        /// The revisited record
        record: u64,
    },
    /// A `next` reference pointed at a record that is not in use
    UnusedRecord {
        /// The freed record
        record: u64,
    },
}

impl ChainAnomaly {
    /// Record the traversal stopped at
    pub fn record(&self) -> u64 {
        match *self {
            ChainAnomaly::Cycle { record } | ChainAnomaly::UnusedRecord { record } => record,
        }
    }
}

impl fmt::Display for ChainAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainAnomaly::Cycle { .. } => f.write_str("cycle"),
            ChainAnomaly::UnusedRecord { .. } => f.write_str("unused record"),
        }
    }
}

impl PropertyChainManager {
    /// Free every property record reachable from `owner` and detach the chain
    ///
    /// A revisited or already freed record ends the walk; everything reached
    /// before it is still freed. The first anomaly is returned and, unless
    /// disabled in the configuration, reported to the diagnostic log together
    /// with every value that could still be decoded.
    pub fn delete_property_chain(
        &self,
        owner: PropertyOwner,
        access: &mut RecordAccessSet<'_>,
    ) -> Result<Option<ChainAnomaly>> {
        let first = owner.first_property(access)?;
        let logging = self.config.log_inconsistent_property_chains;

        let mut anomaly = None;
        let mut recovered = Vec::new();
        let mut visited = HashSet::new();
        let mut current = first;

        while !is_null(current) {
            if !visited.insert(current) {
                anomaly = Some(ChainAnomaly::Cycle { record: current });
                break;
            }
            let proxy = access.properties.get_or_load(current)?;
            if !proxy.for_reading().in_use() {
                anomaly = Some(ChainAnomaly::UnusedRecord { record: current });
                break;
            }

            let record = proxy.for_changing();
            record.set_in_use(false);
            let next = record.next;
            let blocks = std::mem::take(&mut record.blocks);
            record.prev = NULL_REFERENCE;
            record.next = NULL_REFERENCE;

            for block in &blocks {
                if logging {
                    // A value whose own dynamic chain is broken is skipped
                    if let Ok(value) = read_block_value(block, &mut access.dynamics) {
                        recovered.push(format!(
                            "{}={}",
                            self.tokens.property_key_display(block.key),
                            value
                        ));
                    }
                }
                if let Some(head) = block.dynamic_head() {
                    let dynamic_anomaly = free_dynamic_chain(head, &mut access.dynamics)?;
                    anomaly = anomaly.or(dynamic_anomaly);
                }
            }
            current = next;
        }

        owner.set_first_property(access, NULL_REFERENCE)?;

        if let Some(anomaly) = anomaly {
            if logging {
                self.log.warn(
                    &format!(
                        "Deleted inconsistent property chain with {anomaly} for {owner}. \
                         Recovered properties: {}",
                        recovered.join(",")
                    ),
                    &[
                        ("owner", owner.to_string()),
                        ("anomaly", anomaly.to_string()),
                        ("record", anomaly.record().to_string()),
                    ],
                );
            }
        }
        Ok(anomaly)
    }
}
