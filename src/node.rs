//! Decision tree nodes
//!
//! Nodes of a built tree form a linked graph: every node owns its children
//! and holds a weak reference back to its parent. The [`DecisionNode`]
//! handle is a cheap clone over shared node state; equality between handles
//! is node identity, so two decoded copies of the same export never compare
//! equal. Handles are not sendable across threads.
use hashbrown::{HashMap, HashSet};
use rand::rngs::StdRng;
use rand::Rng;
use std::cell::RefCell;
use std::fmt::{self, Debug, Display};
use std::rc::{Rc, Weak};

const UID_SUFFIX_LENGTH: usize = 6;
const UID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Which side of its parent a node hangs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Left,
    Right,
}

/// Comparison a continuous split applies on its left branch.
///
/// The exporter encodes the direction in the sign of the category count:
/// a negative unit sends low values left, a positive unit sends high
/// values left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Observations below the threshold go left.
    LessThan,
    /// Observations above the threshold go left.
    GreaterThan,
}

impl Comparison {
    /// Operator symbol for the left branch.
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::LessThan => "<",
            Comparison::GreaterThan => ">",
        }
    }
}

/// Split rule attached to a non-terminal node, phrased for its left branch.
/// The right branch takes the complement.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitRule {
    /// Observations whose `var` satisfies the comparison against the
    /// threshold go left.
    Continuous {
        var: String,
        threshold: f64,
        comparison: Comparison,
    },
    /// Observations whose level of `var` is in `left` go left, those in
    /// `right` go right. Levels in `absent` were not seen at the node.
    Categorical {
        var: String,
        left: Vec<String>,
        right: Vec<String>,
        absent: Vec<String>,
    },
}

impl SplitRule {
    /// Split variable, in its original spelling.
    pub fn var(&self) -> &str {
        match self {
            SplitRule::Continuous { var, .. } => var,
            SplitRule::Categorical { var, .. } => var,
        }
    }

    /// Comparison operator of the left branch, as the exporter phrases it.
    pub fn operator(&self) -> &'static str {
        match self {
            SplitRule::Continuous { comparison, .. } => comparison.symbol(),
            SplitRule::Categorical { .. } => "in",
        }
    }

    /// Condition an observation must satisfy to take the given branch,
    /// e.g. `< 32.5` or `rural, peri-urban`.
    pub fn condition(&self, branch: Branch) -> String {
        match self {
            SplitRule::Continuous {
                threshold,
                comparison,
                ..
            } => match (comparison, branch) {
                (Comparison::LessThan, Branch::Left) => format!("< {threshold}"),
                (Comparison::LessThan, Branch::Right) => format!(">= {threshold}"),
                (Comparison::GreaterThan, Branch::Left) => format!("> {threshold}"),
                (Comparison::GreaterThan, Branch::Right) => format!("<= {threshold}"),
            },
            SplitRule::Categorical { left, right, .. } => match branch {
                Branch::Left => left.join(", "),
                Branch::Right => right.join(", "),
            },
        }
    }
}

/// Predicted outcome recorded at a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// Predicted class label, for classification models.
    Class(String),
    /// Predicted numeric value, for regression models.
    Value(f64),
}

impl Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Prediction::Class(label) => write!(f, "{label}"),
            Prediction::Value(value) => write!(f, "{value}"),
        }
    }
}

/// Per-class statistics decoded from a classification node's fit payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassStats {
    /// Observation count per class label.
    pub counts: HashMap<String, f64>,
    /// Class probability per class label.
    pub probabilities: HashMap<String, f64>,
    /// Proportion of all observations that reach the node.
    pub node_probability: f64,
}

pub(crate) struct NodeData {
    pub(crate) name: String,
    pub(crate) uid: String,
    pub(crate) binary_index: u64,
    pub(crate) branch: Option<Branch>,
    pub(crate) rule: Option<SplitRule>,
    pub(crate) n: u64,
    pub(crate) prediction: Option<Prediction>,
    pub(crate) stats: Option<ClassStats>,
    pub(crate) parent: Weak<RefCell<NodeData>>,
    pub(crate) children: Vec<DecisionNode>,
}

impl NodeData {
    pub(crate) fn new(name: String, uid: String, binary_index: u64, n: u64) -> Self {
        NodeData {
            name,
            uid,
            binary_index,
            branch: None,
            rule: None,
            n,
            prediction: None,
            stats: None,
            parent: Weak::new(),
            children: Vec::new(),
        }
    }
}

/// Handle to one node of a built decision tree.
///
/// Cloning a handle clones a reference to the same node. A node owns its
/// children, while the link back to the parent is weak; dropping the last
/// handle to a subtree's root frees the whole subtree.
#[derive(Clone)]
pub struct DecisionNode(Rc<RefCell<NodeData>>);

impl DecisionNode {
    pub(crate) fn from_data(data: NodeData) -> Self {
        DecisionNode(Rc::new(RefCell::new(data)))
    }

    /// Hang `left` and `right` under this node, rewiring their parent
    /// references and branch sides.
    pub(crate) fn attach_children(&self, left: DecisionNode, right: DecisionNode) {
        {
            let mut data = left.0.borrow_mut();
            data.parent = Rc::downgrade(&self.0);
            data.branch = Some(Branch::Left);
        }
        {
            let mut data = right.0.borrow_mut();
            data.parent = Rc::downgrade(&self.0);
            data.branch = Some(Branch::Right);
        }
        self.0.borrow_mut().children = vec![left, right];
    }

    /// Node name: the cleaned split variable, or `"segment"` for leaves.
    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    /// Identifier unique among the nodes built in the same call.
    pub fn uid(&self) -> String {
        self.0.borrow().uid.clone()
    }

    /// Binary index the node was decoded from; 0 for synthetic merge roots.
    pub fn binary_index(&self) -> u64 {
        self.0.borrow().binary_index
    }

    /// Side of the parent this node hangs on; `None` for roots.
    pub fn branch(&self) -> Option<Branch> {
        self.0.borrow().branch
    }

    /// Split rule; `None` for leaves.
    pub fn rule(&self) -> Option<SplitRule> {
        self.0.borrow().rule.clone()
    }

    /// Number of observations reaching the node.
    pub fn n(&self) -> u64 {
        self.0.borrow().n
    }

    /// Predicted outcome at the node.
    pub fn prediction(&self) -> Option<Prediction> {
        self.0.borrow().prediction.clone()
    }

    /// Per-class statistics, present on classification nodes.
    pub fn stats(&self) -> Option<ClassStats> {
        self.0.borrow().stats.clone()
    }

    /// Whether the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.0.borrow().children.is_empty()
    }

    /// Whether the node has no parent.
    pub fn is_root(&self) -> bool {
        self.0.borrow().parent.upgrade().is_none()
    }

    /// Parent node, if any.
    pub fn parent(&self) -> Option<DecisionNode> {
        self.0.borrow().parent.upgrade().map(DecisionNode)
    }

    /// Handles to the children, `[left, right]` for split nodes.
    pub fn children(&self) -> Vec<DecisionNode> {
        self.0.borrow().children.clone()
    }

    /// Child at `position`, if present.
    pub fn child(&self, position: usize) -> Option<DecisionNode> {
        self.0.borrow().children.get(position).cloned()
    }

    /// Visit the subtree below this node in pre-order: the node itself,
    /// then the left subtree, then the right subtree. Lazy; each call
    /// starts a fresh traversal.
    pub fn preorder(&self) -> Preorder {
        Preorder {
            stack: vec![self.clone()],
        }
    }

    /// Visit the subtree below this node in post-order: the left subtree,
    /// then the right subtree, then the node itself. Lazy; each call starts
    /// a fresh traversal.
    pub fn postorder(&self) -> Postorder {
        Postorder {
            stack: vec![(self.clone(), 0)],
        }
    }

    /// Walk the ancestors upward, nearest parent first.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors { next: self.parent() }
    }

    fn summary(&self) -> String {
        let data = self.0.borrow();
        if let Some(rule) = &data.rule {
            format!(
                "{}:[{} {}] n={}",
                data.uid,
                rule.var(),
                rule.condition(Branch::Left),
                data.n
            )
        } else if !data.children.is_empty() {
            format!("{}:[{}] n={}", data.uid, data.name, data.n)
        } else if let Some(prediction) = &data.prediction {
            format!("{}:leaf={} n={}", data.uid, prediction, data.n)
        } else {
            format!("{}:leaf n={}", data.uid, data.n)
        }
    }
}

impl PartialEq for DecisionNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for DecisionNode {}

impl Debug for DecisionNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("DecisionNode")
            .field("name", &data.name)
            .field("uid", &data.uid)
            .field("binary_index", &data.binary_index)
            .finish()
    }
}

impl Display for DecisionNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut print_buffer: Vec<(DecisionNode, usize)> = vec![(self.clone(), 0)];
        while let Some((node, depth)) = print_buffer.pop() {
            writeln!(f, "{}{}", "  ".repeat(depth), node.summary())?;
            for child in node.children().into_iter().rev() {
                print_buffer.push((child, depth + 1));
            }
        }
        Ok(())
    }
}

/// Lazy pre-order traversal, see [`DecisionNode::preorder`].
pub struct Preorder {
    stack: Vec<DecisionNode>,
}

impl Iterator for Preorder {
    type Item = DecisionNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let children = node.children();
        self.stack.extend(children.into_iter().rev());
        Some(node)
    }
}

/// Lazy post-order traversal, see [`DecisionNode::postorder`].
pub struct Postorder {
    stack: Vec<(DecisionNode, usize)>,
}

impl Iterator for Postorder {
    type Item = DecisionNode;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, cursor) = self.stack.last_mut()?;
            match node.child(*cursor) {
                Some(child) => {
                    *cursor += 1;
                    self.stack.push((child, 0));
                }
                None => {
                    let (done, _) = self.stack.pop()?;
                    return Some(done);
                }
            }
        }
    }
}

/// Iterator over a node's ancestors, see [`DecisionNode::ancestors`].
pub struct Ancestors {
    next: Option<DecisionNode>,
}

impl Iterator for Ancestors {
    type Item = DecisionNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next.take()?;
        self.next = node.parent();
        Some(node)
    }
}

/// Clean a split variable name for use as a node identifier.
pub(crate) fn clean_name(var: &str) -> String {
    var.replace('.', "_").to_lowercase()
}

/// Generate `<name>_<suffix>` with a random alphanumeric suffix, unique
/// against `taken`. The result is registered in `taken` before returning;
/// colliding suffixes are redrawn.
pub(crate) fn generate_uid(name: &str, taken: &mut HashSet<String>, rng: &mut StdRng) -> String {
    loop {
        let suffix: String = (0..UID_SUFFIX_LENGTH)
            .map(|_| UID_CHARSET[rng.gen_range(0..UID_CHARSET.len())] as char)
            .collect();
        let uid = format!("{name}_{suffix}");
        if taken.insert(uid.clone()) {
            return uid;
        }
    }
}
