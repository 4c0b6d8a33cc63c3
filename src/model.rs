//! Model exchange format
//!
//! A [`CartModel`] is the normalized form of a CART export: one record per
//! node plus the lookup tables needed to decode categorical splits and
//! class predictions. It is what gets written to disk and shipped between
//! tools; building the linked tree from it is a separate step, see
//! [`build_tree`](crate::tree::build_tree).
use crate::csplit::CategorySplits;
use crate::errors::CartError;
use crate::frame::{normalize_frame, FrameRow};
use crate::splits::{classify_splits, NodeSplitCounts, RawSplit};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fs;

/// Sentinel the exporter stores as the split variable of terminal nodes.
pub const LEAF_SENTINEL: &str = "<leaf>";

/// One normalized record per node of the exported tree.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NodeRecord {
    /// Binary index: the root is 1, the children of node `i` are `2i` and
    /// `2i + 1`.
    pub node: u64,
    /// Split variable, or `"<leaf>"` for terminal nodes.
    pub var: String,
    /// Number of observations reaching the node.
    pub n: u64,
    /// Fitted value: a 1-based class index into `ylevels` for
    /// classification models, the plain prediction for regression models.
    pub yval: f64,
    /// Fit statistics; for a k-class model the exporter writes
    /// `[class, count_1..k, prob_1..k, node_probability]`.
    #[serde(default)]
    pub yval2: Vec<f64>,
    /// Category count: 0 or -1 for continuous splits sending low values
    /// left, 1 for continuous splits sending high values left, the signed
    /// level count for categorical splits.
    pub ncat: i32,
    /// Split reference: the threshold for continuous splits, the 1-based
    /// category split row for categorical splits, 0 for leaves.
    pub index: f64,
}

impl NodeRecord {
    /// Whether the record describes a terminal node.
    pub fn is_leaf(&self) -> bool {
        self.var == LEAF_SENTINEL
    }
}

/// A CART model in exchange form.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CartModel {
    /// Node records in frame order, root first.
    pub nodes: Vec<NodeRecord>,
    /// Output class labels; empty for regression models.
    #[serde(default)]
    pub ylevels: Vec<String>,
    /// Ordered category labels per categorical split variable.
    #[serde(default)]
    pub xlevels: HashMap<String, Vec<String>>,
    /// Category split lookup table.
    #[serde(default)]
    pub csplit: CategorySplits,
}

impl CartModel {
    /// Assemble a model from the fitting tool's raw tables, running the
    /// split table decoder and the node frame normalizer.
    ///
    /// * `frame` - Node frame rows, in frame order.
    /// * `splits` - Flat split table, grouped per node in frame order.
    pub fn from_raw_tables(
        frame: &[FrameRow],
        splits: &[RawSplit],
        ylevels: Vec<String>,
        xlevels: HashMap<String, Vec<String>>,
        csplit: CategorySplits,
    ) -> Result<Self, CartError> {
        let counts: Vec<NodeSplitCounts> = frame.iter().map(FrameRow::split_counts).collect();
        let kinds = classify_splits(splits, &counts)?;
        let nodes = normalize_frame(frame, splits, &kinds)?;
        Ok(CartModel {
            nodes,
            ylevels,
            xlevels,
            csplit,
        })
    }

    /// Load a model from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, CartError> {
        let model = serde_json::from_str::<CartModel>(json_str);
        match model {
            Ok(m) => Ok(m),
            Err(e) => Err(CartError::UnableToRead(e.to_string())),
        }
    }

    /// Dump the model as a JSON string.
    pub fn json_dump(&self) -> Result<String, CartError> {
        match serde_json::to_string(self) {
            Ok(s) => Ok(s),
            Err(e) => Err(CartError::UnableToWrite(e.to_string())),
        }
    }

    /// Load a model from a JSON file.
    ///
    /// * `path` - Path to load the model from.
    pub fn load(path: &str) -> Result<Self, CartError> {
        let json_str = match fs::read_to_string(path) {
            Ok(s) => Ok(s),
            Err(e) => Err(CartError::UnableToRead(e.to_string())),
        }?;
        Self::from_json(&json_str)
    }

    /// Save the model as a JSON file.
    ///
    /// * `path` - Path to save the model to.
    pub fn save(&self, path: &str) -> Result<(), CartError> {
        let model = self.json_dump()?;
        match fs::write(path, model) {
            Err(e) => Err(CartError::UnableToWrite(e.to_string())),
            Ok(_) => Ok(()),
        }
    }
}
