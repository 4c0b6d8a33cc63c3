//! Tree assembly
//!
//! Turns the flat node records of a [`CartModel`] into a linked
//! [`DecisionNode`] graph, and composes independently built trees under a
//! synthetic root. Assembly is all or nothing: any defect in the input
//! tables fails the whole build and no partial tree escapes.
use crate::errors::CartError;
use crate::model::{CartModel, NodeRecord};
use crate::node::{clean_name, generate_uid, ClassStats, Comparison, DecisionNode, NodeData, Prediction, SplitRule};
use hashbrown::{HashMap, HashSet};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Binary index of the root node.
pub const ROOT_INDEX: u64 = 1;

/// How the sign of a categorical split's level count maps onto the stored
/// level routing.
///
/// The exporter is not consistent about this sign across versions, so the
/// mapping is a build parameter; validate the choice against a model whose
/// routing is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignConvention {
    /// A negative level count exchanges the stored left and right routing.
    #[default]
    SwapOnNegative,
    /// The sign carries no routing information.
    IgnoreSign,
}

/// Options controlling tree assembly.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Direction convention for negative categorical level counts.
    pub sign_convention: SignConvention,
    /// Seed for the unique id suffixes; `None` draws from OS entropy. Two
    /// builds sharing a seed produce the same suffix sequence, so merge
    /// only trees built from different seeds, or unseeded ones.
    pub seed: Option<u64>,
}

struct TreeAssembler<'a> {
    model: &'a CartModel,
    convention: SignConvention,
    rows: HashMap<u64, &'a NodeRecord>,
    uids: HashSet<String>,
    rng: StdRng,
    nodes_built: usize,
    leaves_built: usize,
    depth: usize,
}

/// Build a linked decision tree from a decoded model.
///
/// Fails with [`CartError::InvalidIndex`] when the binary indices do not
/// describe a rooted binary tree (duplicates, missing root, rows
/// unreachable from the root) and with [`CartError::MissingChild`] when a
/// split node lacks one of its child positions.
///
/// * `model` - Decoded model to assemble.
/// * `options` - Sign convention and id seeding.
pub fn build_tree(model: &CartModel, options: &BuildOptions) -> Result<DecisionNode, CartError> {
    let rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut assembler = TreeAssembler {
        model,
        convention: options.sign_convention,
        rows: HashMap::with_capacity(model.nodes.len()),
        uids: HashSet::with_capacity(model.nodes.len()),
        rng,
        nodes_built: 0,
        leaves_built: 0,
        depth: 0,
    };
    for record in &model.nodes {
        if record.node == 0 {
            return Err(CartError::InvalidIndex(
                "binary index 0 is not addressable, the root is index 1".to_string(),
            ));
        }
        if assembler.rows.insert(record.node, record).is_some() {
            return Err(CartError::InvalidIndex(format!(
                "binary index {} appears more than once",
                record.node
            )));
        }
    }
    if !assembler.rows.contains_key(&ROOT_INDEX) {
        return Err(CartError::InvalidIndex(
            "the node table has no root, index 1".to_string(),
        ));
    }
    let root = assembler.link(ROOT_INDEX, 0)?;
    if !assembler.rows.is_empty() {
        let mut orphans: Vec<u64> = assembler.rows.keys().copied().collect();
        orphans.sort_unstable();
        return Err(CartError::InvalidIndex(format!(
            "node rows unreachable from the root: {orphans:?}"
        )));
    }
    info!(
        "built decision tree: {} nodes, {} leaves, depth {}",
        assembler.nodes_built, assembler.leaves_built, assembler.depth
    );
    Ok(root)
}

impl<'a> TreeAssembler<'a> {
    /// Claim the record at `index` and link its subtree depth first.
    fn link(&mut self, index: u64, depth: usize) -> Result<DecisionNode, CartError> {
        let record = self.rows.remove(&index).ok_or(CartError::MissingChild {
            parent: index / 2,
            child: index,
        })?;
        self.depth = self.depth.max(depth);
        self.nodes_built += 1;

        if record.is_leaf() {
            self.leaves_built += 1;
            return self.make_node(record, None);
        }

        let rule = self.resolve_rule(record)?;
        let left_index = index.checked_mul(2).ok_or_else(|| {
            CartError::InvalidIndex(format!("binary index {index} overflows the addressing scheme"))
        })?;
        let node = self.make_node(record, Some(rule))?;
        let left = self.link(left_index, depth + 1)?;
        let right = self.link(left_index + 1, depth + 1)?;
        node.attach_children(left, right);
        Ok(node)
    }

    fn make_node(&mut self, record: &NodeRecord, rule: Option<SplitRule>) -> Result<DecisionNode, CartError> {
        let name = match &rule {
            Some(rule) => clean_name(rule.var()),
            None => "segment".to_string(),
        };
        let uid = generate_uid(&name, &mut self.uids, &mut self.rng);
        let mut data = NodeData::new(name, uid, record.node, record.n);
        data.rule = rule;
        data.prediction = Some(self.decode_prediction(record)?);
        data.stats = self.decode_stats(record)?;
        Ok(DecisionNode::from_data(data))
    }

    /// Resolve a non-terminal record's split geometry into a rule.
    fn resolve_rule(&self, record: &NodeRecord) -> Result<SplitRule, CartError> {
        // Normalized records carry 0 for continuous splits that send low
        // values left; the raw positive unit sends high values left and
        // flips the comparison.
        if record.ncat.unsigned_abs() <= 1 {
            let comparison = if record.ncat == 1 {
                Comparison::GreaterThan
            } else {
                Comparison::LessThan
            };
            return Ok(SplitRule::Continuous {
                var: record.var.clone(),
                threshold: record.index,
                comparison,
            });
        }
        let levels = self.model.xlevels.get(&record.var).ok_or_else(|| {
            CartError::MalformedInput(format!(
                "node {} splits on categorical '{}', but no levels are defined for it",
                record.node, record.var
            ))
        })?;
        let declared = record.ncat.unsigned_abs() as usize;
        if declared != levels.len() {
            warn!(
                "split on '{}' reports {} categories, but {} levels are defined",
                record.var,
                declared,
                levels.len()
            );
        }
        let reference = csplit_reference(record)?;
        let swap = record.ncat < 0 && self.convention == SignConvention::SwapOnNegative;
        let sets = self.model.csplit.route(reference, levels, swap)?;
        Ok(SplitRule::Categorical {
            var: record.var.clone(),
            left: sets.left,
            right: sets.right,
            absent: sets.absent,
        })
    }

    fn decode_prediction(&self, record: &NodeRecord) -> Result<Prediction, CartError> {
        let ylevels = &self.model.ylevels;
        if ylevels.is_empty() {
            return Ok(Prediction::Value(record.yval));
        }
        let class = record.yval;
        if class.fract() != 0.0 || class < 1.0 || class > ylevels.len() as f64 {
            return Err(CartError::MalformedInput(format!(
                "node {}: class index {class} is not within 1..={}",
                record.node,
                ylevels.len()
            )));
        }
        Ok(Prediction::Class(ylevels[class as usize - 1].clone()))
    }

    fn decode_stats(&self, record: &NodeRecord) -> Result<Option<ClassStats>, CartError> {
        let ylevels = &self.model.ylevels;
        if ylevels.is_empty() || record.yval2.is_empty() {
            return Ok(None);
        }
        let k = ylevels.len();
        let expected = 2 * k + 2;
        if record.yval2.len() != expected {
            return Err(CartError::MalformedInput(format!(
                "node {}: fit statistics hold {} values, expected {expected} for {k} classes",
                record.node,
                record.yval2.len()
            )));
        }
        let mut stats = ClassStats {
            node_probability: record.yval2[expected - 1],
            ..ClassStats::default()
        };
        for (position, label) in ylevels.iter().enumerate() {
            stats.counts.insert(label.clone(), record.yval2[1 + position]);
            stats.probabilities.insert(label.clone(), record.yval2[1 + k + position]);
        }
        Ok(Some(stats))
    }
}

/// Validate a categorical record's 1-based category split row reference.
fn csplit_reference(record: &NodeRecord) -> Result<usize, CartError> {
    let raw = record.index;
    if raw.fract() != 0.0 || raw < 1.0 || raw > usize::MAX as f64 {
        return Err(CartError::MalformedInput(format!(
            "node {}: category split reference {raw} is not a positive row number",
            record.node
        )));
    }
    Ok(raw as usize)
}

/// Compose two independently built trees under a new synthetic root.
///
/// Both inputs must currently be root nodes; they are moved, not copied,
/// under the new node in the given order and lose their root status. Every
/// handle into either tree stays valid. Runs in constant time.
///
/// * `left` - Tree to hang on the left branch.
/// * `right` - Tree to hang on the right branch.
/// * `var` - Variable name for the synthetic root.
/// * `rule` - Optional rule describing how the branches partition `var`.
pub fn merge_under(
    left: &DecisionNode,
    right: &DecisionNode,
    var: &str,
    rule: Option<SplitRule>,
) -> Result<DecisionNode, CartError> {
    if left == right {
        return Err(CartError::Precondition(
            "cannot merge a tree with itself".to_string(),
        ));
    }
    if !left.is_root() {
        return Err(CartError::Precondition(format!(
            "left input '{}' is not a root node",
            left.uid()
        )));
    }
    if !right.is_root() {
        return Err(CartError::Precondition(format!(
            "right input '{}' is not a root node",
            right.uid()
        )));
    }
    let name = clean_name(var);
    let mut uids = HashSet::new();
    let mut rng = StdRng::from_entropy();
    let uid = generate_uid(&name, &mut uids, &mut rng);
    let mut data = NodeData::new(name, uid, 0, left.n() + right.n());
    data.rule = rule;
    let root = DecisionNode::from_data(data);
    root.attach_children(left.clone(), right.clone());
    info!(
        "merged trees under '{var}': {} + {} observations",
        left.n(),
        right.n()
    );
    Ok(root)
}

/// Merge the trees of two location strata under a `location` root, with the
/// rural stratum on the left branch and the urban stratum on the right.
pub fn merge_trees(rural: &DecisionNode, urban: &DecisionNode) -> Result<DecisionNode, CartError> {
    let rule = SplitRule::Categorical {
        var: "location".to_string(),
        left: vec!["rural".to_string()],
        right: vec!["urban".to_string()],
        absent: Vec::new(),
    };
    merge_under(rural, urban, "location", Some(rule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csplit::CategorySplits;
    use crate::model::LEAF_SENTINEL;
    use crate::node::Branch;
    use rand::Rng;

    fn split(node: u64, var: &str, ncat: i32, index: f64, n: u64, yval: f64) -> NodeRecord {
        NodeRecord {
            node,
            var: var.to_string(),
            n,
            yval,
            yval2: Vec::new(),
            ncat,
            index,
        }
    }

    fn leaf(node: u64, n: u64, yval: f64) -> NodeRecord {
        split(node, LEAF_SENTINEL, 0, 0.0, n, yval)
    }

    fn continuous_model() -> CartModel {
        CartModel {
            nodes: vec![
                split(1, "age", 0, 32.5, 100, 1.0),
                leaf(2, 60, 1.0),
                leaf(3, 40, 2.0),
            ],
            ylevels: vec!["low".to_string(), "high".to_string()],
            xlevels: HashMap::new(),
            csplit: CategorySplits::default(),
        }
    }

    fn categorical_model(ncat: i32) -> CartModel {
        let mut xlevels = HashMap::new();
        xlevels.insert(
            "region".to_string(),
            vec!["north".to_string(), "south".to_string(), "east".to_string()],
        );
        CartModel {
            nodes: vec![
                split(1, "region", ncat, 1.0, 100, 1.0),
                leaf(2, 70, 1.0),
                leaf(3, 30, 2.0),
            ],
            ylevels: vec!["low".to_string(), "high".to_string()],
            xlevels,
            csplit: CategorySplits::try_from(vec![vec![1., 3., 1.]]).unwrap(),
        }
    }

    fn seeded() -> BuildOptions {
        BuildOptions {
            seed: Some(42),
            ..BuildOptions::default()
        }
    }

    #[test]
    fn test_build_continuous_tree() {
        let root = build_tree(&continuous_model(), &seeded()).unwrap();
        assert!(root.is_root());
        assert_eq!(root.binary_index(), 1);
        assert_eq!(root.n(), 100);
        assert_eq!(
            root.rule(),
            Some(SplitRule::Continuous {
                var: "age".to_string(),
                threshold: 32.5,
                comparison: Comparison::LessThan,
            })
        );

        let left = root.child(0).unwrap();
        let right = root.child(1).unwrap();
        assert_eq!(left.binary_index(), 2);
        assert_eq!(right.binary_index(), 3);
        assert_eq!(left.branch(), Some(Branch::Left));
        assert_eq!(right.branch(), Some(Branch::Right));
        assert!(left.is_leaf() && right.is_leaf());
        assert_eq!(left.prediction(), Some(Prediction::Class("low".to_string())));
        assert_eq!(right.prediction(), Some(Prediction::Class("high".to_string())));
        assert_eq!(left.parent().unwrap(), root);

        let order: Vec<u64> = root.preorder().map(|node| node.binary_index()).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_build_names_and_uids() {
        let root = build_tree(&continuous_model(), &seeded()).unwrap();
        assert_eq!(root.name(), "age");
        assert!(root.uid().starts_with("age_"));
        let left = root.child(0).unwrap();
        assert_eq!(left.name(), "segment");
        assert!(left.uid().starts_with("segment_"));

        let uids: HashSet<String> = root.preorder().map(|node| node.uid()).collect();
        assert_eq!(uids.len(), 3);
    }

    #[test]
    fn test_build_seed_reproducible() {
        let model = continuous_model();
        let first: Vec<String> = build_tree(&model, &seeded()).unwrap().preorder().map(|n| n.uid()).collect();
        let second: Vec<String> = build_tree(&model, &seeded()).unwrap().preorder().map(|n| n.uid()).collect();
        assert_eq!(first, second);

        let other = BuildOptions {
            seed: Some(43),
            ..BuildOptions::default()
        };
        let third: Vec<String> = build_tree(&model, &other).unwrap().preorder().map(|n| n.uid()).collect();
        assert_ne!(first, third);
    }

    #[test]
    fn test_build_cleans_variable_names() {
        let mut model = continuous_model();
        model.nodes[0].var = "Water.Source".to_string();
        let root = build_tree(&model, &seeded()).unwrap();
        assert_eq!(root.name(), "water_source");
        // The rule keeps the original spelling.
        assert_eq!(root.rule().unwrap().var(), "Water.Source");
    }

    #[test]
    fn test_build_missing_child() {
        let model = CartModel {
            nodes: vec![split(1, "age", 0, 32.5, 100, 1.0), leaf(2, 60, 1.0)],
            ylevels: Vec::new(),
            xlevels: HashMap::new(),
            csplit: CategorySplits::default(),
        };
        let err = build_tree(&model, &seeded()).unwrap_err();
        match err {
            CartError::MissingChild { parent, child } => {
                assert_eq!(parent, 1);
                assert_eq!(child, 3);
            }
            other => panic!("expected MissingChild, got {other:?}"),
        }
    }

    #[test]
    fn test_build_duplicate_index() {
        let mut model = continuous_model();
        model.nodes.push(leaf(2, 1, 1.0));
        let err = build_tree(&model, &seeded()).unwrap_err();
        assert!(matches!(err, CartError::InvalidIndex(_)));
    }

    #[test]
    fn test_build_missing_root() {
        let model = CartModel {
            nodes: vec![leaf(2, 60, 1.0), leaf(3, 40, 1.0)],
            ylevels: Vec::new(),
            xlevels: HashMap::new(),
            csplit: CategorySplits::default(),
        };
        let err = build_tree(&model, &seeded()).unwrap_err();
        assert!(matches!(err, CartError::InvalidIndex(_)));
    }

    #[test]
    fn test_build_zero_index() {
        let mut model = continuous_model();
        model.nodes.push(leaf(0, 1, 1.0));
        let err = build_tree(&model, &seeded()).unwrap_err();
        assert!(matches!(err, CartError::InvalidIndex(_)));
    }

    #[test]
    fn test_build_unreachable_rows() {
        let mut model = continuous_model();
        model.nodes.push(leaf(5, 1, 1.0));
        let err = build_tree(&model, &seeded()).unwrap_err();
        assert!(matches!(err, CartError::InvalidIndex(_)));
    }

    #[test]
    fn test_build_categorical_rule() {
        let root = build_tree(&categorical_model(3), &seeded()).unwrap();
        assert_eq!(
            root.rule(),
            Some(SplitRule::Categorical {
                var: "region".to_string(),
                left: vec!["north".to_string(), "east".to_string()],
                right: vec!["south".to_string()],
                absent: Vec::new(),
            })
        );
    }

    #[test]
    fn test_build_negative_ncat_swaps_by_default() {
        let root = build_tree(&categorical_model(-3), &seeded()).unwrap();
        match root.rule().unwrap() {
            SplitRule::Categorical { left, right, .. } => {
                assert_eq!(left, vec!["south".to_string()]);
                assert_eq!(right, vec!["north".to_string(), "east".to_string()]);
            }
            other => panic!("expected a categorical rule, got {other:?}"),
        }
    }

    #[test]
    fn test_build_negative_ncat_ignored_on_request() {
        let options = BuildOptions {
            sign_convention: SignConvention::IgnoreSign,
            seed: Some(42),
        };
        let root = build_tree(&categorical_model(-3), &options).unwrap();
        match root.rule().unwrap() {
            SplitRule::Categorical { left, .. } => {
                assert_eq!(left, vec!["north".to_string(), "east".to_string()]);
            }
            other => panic!("expected a categorical rule, got {other:?}"),
        }
    }

    #[test]
    fn test_build_accepts_raw_continuous_sign() {
        // The raw negative unit means low values go left, same as the
        // normalized zero form.
        let mut model = continuous_model();
        model.nodes[0].ncat = -1;
        let root = build_tree(&model, &seeded()).unwrap();
        assert_eq!(
            root.rule(),
            Some(SplitRule::Continuous {
                var: "age".to_string(),
                threshold: 32.5,
                comparison: Comparison::LessThan,
            })
        );
    }

    #[test]
    fn test_build_positive_unit_sends_high_values_left() {
        let mut model = continuous_model();
        model.nodes[0].ncat = 1;
        let root = build_tree(&model, &seeded()).unwrap();
        let rule = root.rule().unwrap();
        assert_eq!(
            rule,
            SplitRule::Continuous {
                var: "age".to_string(),
                threshold: 32.5,
                comparison: Comparison::GreaterThan,
            }
        );
        assert_eq!(rule.operator(), ">");
        assert_eq!(rule.condition(Branch::Left), "> 32.5");
        assert_eq!(rule.condition(Branch::Right), "<= 32.5");
    }

    #[test]
    fn test_build_missing_xlevels() {
        let mut model = categorical_model(3);
        model.xlevels.clear();
        let err = build_tree(&model, &seeded()).unwrap_err();
        assert!(matches!(err, CartError::MalformedInput(_)));
    }

    #[test]
    fn test_build_fractional_csplit_reference() {
        let mut model = categorical_model(3);
        model.nodes[0].index = 1.5;
        let err = build_tree(&model, &seeded()).unwrap_err();
        assert!(matches!(err, CartError::MalformedInput(_)));
    }

    #[test]
    fn test_build_class_stats() {
        let mut model = continuous_model();
        model.nodes[1].yval2 = vec![1.0, 45.0, 15.0, 0.75, 0.25, 0.6];
        let root = build_tree(&model, &seeded()).unwrap();
        let stats = root.child(0).unwrap().stats().unwrap();
        assert_eq!(stats.counts["low"], 45.0);
        assert_eq!(stats.counts["high"], 15.0);
        assert_eq!(stats.probabilities["low"], 0.75);
        assert_eq!(stats.probabilities["high"], 0.25);
        assert_eq!(stats.node_probability, 0.6);
        // Rows without the payload decode to no stats.
        assert!(root.stats().is_none());
    }

    #[test]
    fn test_build_bad_stats_length() {
        let mut model = continuous_model();
        model.nodes[1].yval2 = vec![1.0, 45.0, 15.0];
        let err = build_tree(&model, &seeded()).unwrap_err();
        assert!(matches!(err, CartError::MalformedInput(_)));
    }

    #[test]
    fn test_build_class_index_out_of_range() {
        let mut model = continuous_model();
        model.nodes[2].yval = 3.0;
        let err = build_tree(&model, &seeded()).unwrap_err();
        assert!(matches!(err, CartError::MalformedInput(_)));
    }

    #[test]
    fn test_build_regression_prediction() {
        let mut model = continuous_model();
        model.ylevels.clear();
        model.nodes[2].yval = 7.25;
        let root = build_tree(&model, &seeded()).unwrap();
        let right = root.child(1).unwrap();
        assert_eq!(right.prediction(), Some(Prediction::Value(7.25)));
        assert!(right.stats().is_none());
    }

    #[test]
    fn test_merge_trees() {
        let rural = build_tree(&continuous_model(), &seeded()).unwrap();
        let urban = build_tree(&continuous_model(), &BuildOptions::default()).unwrap();
        let merged = merge_trees(&rural, &urban).unwrap();

        assert!(merged.is_root());
        assert_eq!(merged.name(), "location");
        assert_eq!(merged.binary_index(), 0);
        assert_eq!(merged.n(), 200);
        match merged.rule().unwrap() {
            SplitRule::Categorical { left, right, .. } => {
                assert_eq!(left, vec!["rural".to_string()]);
                assert_eq!(right, vec!["urban".to_string()]);
            }
            other => panic!("expected a categorical rule, got {other:?}"),
        }

        // The original handles still address the same nodes.
        assert_eq!(merged.child(0).unwrap(), rural);
        assert_eq!(merged.child(1).unwrap(), urban);
        assert!(!rural.is_root());
        assert_eq!(rural.branch(), Some(Branch::Left));
        assert_eq!(rural.parent().unwrap(), merged);
        assert_eq!(merged.preorder().count(), 7);
    }

    #[test]
    fn test_merge_rejects_non_root() {
        let rural = build_tree(&continuous_model(), &seeded()).unwrap();
        let urban = build_tree(&continuous_model(), &BuildOptions::default()).unwrap();
        let inner = rural.child(0).unwrap();
        let err = merge_trees(&inner, &urban).unwrap_err();
        assert!(matches!(err, CartError::Precondition(_)));

        // Once merged, the inputs are no longer mergeable.
        let merged = merge_trees(&rural, &urban).unwrap();
        let fresh = build_tree(&continuous_model(), &BuildOptions::default()).unwrap();
        assert!(merge_trees(&rural, &fresh).is_err());
        assert!(merge_trees(&merged, &fresh).is_ok());
    }

    #[test]
    fn test_merge_rejects_same_node() {
        let root = build_tree(&continuous_model(), &seeded()).unwrap();
        let err = merge_trees(&root, &root).unwrap_err();
        assert!(matches!(err, CartError::Precondition(_)));
    }

    #[test]
    fn test_merge_under_without_rule() {
        let left = build_tree(&continuous_model(), &seeded()).unwrap();
        let right = build_tree(&continuous_model(), &BuildOptions::default()).unwrap();
        let merged = merge_under(&left, &right, "Stratum.Kind", None).unwrap();
        assert_eq!(merged.name(), "stratum_kind");
        assert!(merged.rule().is_none());
        assert!(!merged.is_leaf());
    }

    fn random_model(rng: &mut StdRng) -> CartModel {
        let mut nodes = Vec::new();
        let mut pending = vec![(1u64, 0u32)];
        while let Some((index, depth)) = pending.pop() {
            if depth < 6 && rng.gen_bool(0.6) {
                nodes.push(split(index, "x", 0, rng.gen_range(0.0..10.0), 10, 1.0));
                pending.push((index * 2, depth + 1));
                pending.push((index * 2 + 1, depth + 1));
            } else {
                nodes.push(leaf(index, 5, if rng.gen_bool(0.5) { 1.0 } else { 2.0 }));
            }
        }
        CartModel {
            nodes,
            ylevels: vec!["a".to_string(), "b".to_string()],
            xlevels: HashMap::new(),
            csplit: CategorySplits::default(),
        }
    }

    #[test]
    fn test_build_random_models() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let model = random_model(&mut rng);
            let root = build_tree(&model, &BuildOptions::default()).unwrap();

            let visited: Vec<DecisionNode> = root.preorder().collect();
            assert_eq!(visited.len(), model.nodes.len());
            assert_eq!(root.postorder().count(), model.nodes.len());

            let expected: HashSet<u64> = model.nodes.iter().map(|record| record.node).collect();
            let seen: HashSet<u64> = visited.iter().map(|node| node.binary_index()).collect();
            assert_eq!(seen, expected);

            let uids: HashSet<String> = visited.iter().map(|node| node.uid()).collect();
            assert_eq!(uids.len(), visited.len());

            for node in &visited {
                let children = node.children();
                assert!(children.len() == 2 || children.is_empty());
                assert_eq!(children.is_empty(), node.rule().is_none());
                for child in children {
                    assert_eq!(child.parent().unwrap(), *node);
                }
            }
        }
    }
}
