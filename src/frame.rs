//! Node frame normalizer
//!
//! The node frame describes the tree's structure, one row per node in frame
//! order, but the split geometry lives in the split table. The normalizer
//! merges the main split of every non-terminal row back into the frame,
//! producing one self-contained record per node.
use crate::errors::CartError;
use crate::model::{LEAF_SENTINEL, NodeRecord};
use crate::splits::{main_splits, NodeSplitCounts, RawSplit, SplitKind};
use serde::{Deserialize, Serialize};

/// One row of the raw node frame.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FrameRow {
    /// Binary index of the node (root is 1).
    pub node: u64,
    /// Split variable, or `"<leaf>"` for terminal nodes.
    pub var: String,
    /// Number of observations reaching the node.
    pub n: u64,
    /// Fitted value at the node.
    pub yval: f64,
    /// Opaque fit statistics.
    #[serde(default)]
    pub yval2: Vec<f64>,
    /// Number of competing splits recorded for the node.
    pub ncompete: usize,
    /// Number of surrogate splits recorded for the node.
    pub nsurrogate: usize,
}

impl FrameRow {
    /// Whether the row describes a terminal node.
    pub fn is_leaf(&self) -> bool {
        self.var == LEAF_SENTINEL
    }

    /// The row's split table footprint.
    pub fn split_counts(&self) -> NodeSplitCounts {
        NodeSplitCounts::new(self.ncompete, self.nsurrogate, self.is_leaf())
    }
}

/// Produce one canonical record per frame row by copying the category count
/// and split reference of each row's main split back into it.
///
/// Main splits pair up with the frame's non-terminal rows in order, and each
/// pair must agree on the split variable. Terminal rows get a zero category
/// count and split reference.
///
/// * `kinds` - Tags for `splits`, as returned by
///   [`classify_splits`](crate::splits::classify_splits).
pub fn normalize_frame(
    frame: &[FrameRow],
    splits: &[RawSplit],
    kinds: &[SplitKind],
) -> Result<Vec<NodeRecord>, CartError> {
    let mains = main_splits(splits, kinds);
    let mut records = Vec::with_capacity(frame.len());
    let mut used = 0;
    for row in frame {
        let (ncat, index) = if row.is_leaf() {
            (0, 0.0)
        } else {
            let main = mains.get(used).ok_or_else(|| {
                CartError::MalformedInput(format!(
                    "node {} splits on '{}', but the split table has no main split left for it",
                    row.node, row.var
                ))
            })?;
            used += 1;
            if main.var != row.var {
                return Err(CartError::MalformedInput(format!(
                    "node {} splits on '{}', but its main split is on '{}'",
                    row.node, row.var, main.var
                )));
            }
            (canonical_ncat(main.ncat), main.index)
        };
        records.push(NodeRecord {
            node: row.node,
            var: row.var.clone(),
            n: row.n,
            yval: row.yval,
            yval2: row.yval2.clone(),
            ncat,
            index,
        });
    }
    if used != mains.len() {
        return Err(CartError::MalformedInput(format!(
            "split table holds {} main splits, but the frame has only {used} split rows",
            mains.len()
        )));
    }
    Ok(records)
}

/// Continuous splits arrive with a signed unit category count. The negative
/// unit means low values go left and resolves to the canonical zero form;
/// the positive unit sends high values left instead, so its sign must
/// survive normalization for the builder to flip the comparison.
fn canonical_ncat(ncat: i32) -> i32 {
    if ncat == -1 {
        0
    } else {
        ncat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splits::classify_splits;

    fn split_row(node: u64, var: &str) -> FrameRow {
        FrameRow {
            node,
            var: var.to_string(),
            n: 100,
            yval: 1.0,
            yval2: Vec::new(),
            ncompete: 0,
            nsurrogate: 0,
        }
    }

    fn leaf_row(node: u64) -> FrameRow {
        split_row(node, LEAF_SENTINEL)
    }

    fn raw(var: &str, ncat: i32, index: f64) -> RawSplit {
        RawSplit {
            var: var.to_string(),
            n: 100,
            ncat,
            improve: 0.5,
            index,
            adj: 0.0,
        }
    }

    fn normalize(frame: &[FrameRow], splits: &[RawSplit]) -> Result<Vec<NodeRecord>, CartError> {
        let counts: Vec<NodeSplitCounts> = frame.iter().map(FrameRow::split_counts).collect();
        let kinds = classify_splits(splits, &counts)?;
        normalize_frame(frame, splits, &kinds)
    }

    #[test]
    fn test_normalize_continuous_split() {
        let frame = vec![split_row(1, "age"), leaf_row(2), leaf_row(3)];
        let splits = vec![raw("age", -1, 32.5)];
        let records = normalize(&frame, &splits).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].ncat, 0);
        assert_eq!(records[0].index, 32.5);
        assert_eq!(records[1].ncat, 0);
        assert_eq!(records[1].index, 0.0);
    }

    #[test]
    fn test_normalize_positive_unit_sign() {
        let frame = vec![split_row(1, "age"), leaf_row(2), leaf_row(3)];
        let splits = vec![raw("age", 1, 32.5)];
        let records = normalize(&frame, &splits).unwrap();
        assert_eq!(records[0].ncat, 1);
        assert_eq!(records[0].index, 32.5);
    }

    #[test]
    fn test_normalize_categorical_split() {
        let frame = vec![split_row(1, "region"), leaf_row(2), leaf_row(3)];
        let splits = vec![raw("region", -4, 2.0)];
        let records = normalize(&frame, &splits).unwrap();
        assert_eq!(records[0].ncat, -4);
        assert_eq!(records[0].index, 2.0);
    }

    #[test]
    fn test_normalize_skips_competing_and_surrogates() {
        let mut frame = vec![split_row(1, "age"), leaf_row(2), leaf_row(3)];
        frame[0].ncompete = 1;
        frame[0].nsurrogate = 1;
        let splits = vec![raw("age", -1, 32.5), raw("income", -1, 10.0), raw("region", 3, 1.0)];
        let records = normalize(&frame, &splits).unwrap();
        assert_eq!(records[0].index, 32.5);
        assert_eq!(records[0].ncat, 0);
    }

    #[test]
    fn test_normalize_variable_mismatch() {
        let frame = vec![split_row(1, "age"), leaf_row(2), leaf_row(3)];
        let splits = vec![raw("income", -1, 32.5)];
        let err = normalize(&frame, &splits).unwrap_err();
        assert!(matches!(err, CartError::MalformedInput(_)));
    }

    #[test]
    fn test_normalize_leftover_main_split() {
        let frame = vec![leaf_row(1)];
        let splits = vec![raw("age", -1, 32.5)];
        let err = normalize_frame(&frame, &splits, &[SplitKind::Main]).unwrap_err();
        assert!(matches!(err, CartError::MalformedInput(_)));
    }
}
