//! Split table decoder
//!
//! The exporter writes every split it evaluated into one flat table, grouped
//! per node in frame order: the split actually used (present only when the
//! node splits), then the competing splits, then the surrogate splits. The
//! table itself does not say where one node's records end and the next
//! node's begin; that has to be recovered from the per-node counts carried
//! by the node frame.
use crate::errors::CartError;
use log::debug;
use serde::{Deserialize, Serialize};

/// One record of the flat split table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawSplit {
    /// Split variable name.
    pub var: String,
    /// Number of observations the split was evaluated on.
    pub n: u64,
    /// Category count: -1 or 1 for continuous splits, the sign picking
    /// which side low values take; signed level count for categorical
    /// splits.
    pub ncat: i32,
    /// Improvement in the partitioning criterion.
    pub improve: f64,
    /// Split reference: threshold for continuous splits, 1-based category
    /// split row otherwise.
    pub index: f64,
    /// Adjusted agreement, nonzero only for surrogate splits.
    pub adj: f64,
}

/// Role of a split record within its node's slice of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SplitKind {
    /// The split used to partition the node.
    Main,
    /// A competing split recorded for reference, not used.
    Primary,
    /// A fallback split consulted when the main variable is missing.
    Surrogate,
}

/// Per-node record counts, aligned 1:1 with the node frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct NodeSplitCounts {
    /// Number of competing splits recorded for the node.
    pub competing: usize,
    /// Number of surrogate splits recorded for the node.
    pub surrogate: usize,
    /// Whether the node is terminal. Terminal nodes own no main split.
    pub is_leaf: bool,
}

impl NodeSplitCounts {
    pub fn new(competing: usize, surrogate: usize, is_leaf: bool) -> Self {
        NodeSplitCounts {
            competing,
            surrogate,
            is_leaf,
        }
    }

    /// Number of split table records the node owns, or `None` when the
    /// declared counts overflow.
    fn records(&self) -> Option<usize> {
        self.competing
            .checked_add(self.surrogate)?
            .checked_add(usize::from(!self.is_leaf))
    }
}

/// Classify every record of the flat split table as main, primary
/// (competing) or surrogate.
///
/// Walks the node counts in frame order, carving the table into per-node
/// slices by prefix sum. The returned tags align 1:1 with `splits`. Fails
/// when a node's slice would run past the end of the table, or when records
/// are left over once every node is accounted for.
pub fn classify_splits(splits: &[RawSplit], nodes: &[NodeSplitCounts]) -> Result<Vec<SplitKind>, CartError> {
    let mut kinds = Vec::with_capacity(splits.len());
    let mut offset = 0;
    for (row, counts) in nodes.iter().enumerate() {
        let take = counts.records().ok_or_else(|| {
            CartError::MalformedInput(format!("node row {row} declares split record counts that overflow"))
        })?;
        if take > splits.len() - offset {
            return Err(CartError::MalformedInput(format!(
                "node row {row} claims {take} split records at offset {offset}, but the split table holds {}",
                splits.len()
            )));
        }
        if !counts.is_leaf {
            kinds.push(SplitKind::Main);
        }
        for _ in 0..counts.competing {
            kinds.push(SplitKind::Primary);
        }
        for _ in 0..counts.surrogate {
            kinds.push(SplitKind::Surrogate);
        }
        offset += take;
    }
    if offset != splits.len() {
        return Err(CartError::MalformedInput(format!(
            "split table holds {} records, but the node counts only account for {offset}",
            splits.len()
        )));
    }
    debug!(
        "classified {} split records: {} main, {} competing, {} surrogate",
        kinds.len(),
        kinds.iter().filter(|k| **k == SplitKind::Main).count(),
        kinds.iter().filter(|k| **k == SplitKind::Primary).count(),
        kinds.iter().filter(|k| **k == SplitKind::Surrogate).count(),
    );
    Ok(kinds)
}

/// Select the main split records, in frame order.
///
/// * `kinds` - Tags for `splits`, as returned by [`classify_splits`].
pub fn main_splits<'a>(splits: &'a [RawSplit], kinds: &[SplitKind]) -> Vec<&'a RawSplit> {
    splits
        .iter()
        .zip(kinds)
        .filter(|(_, kind)| **kind == SplitKind::Main)
        .map(|(split, _)| split)
        .collect()
}
