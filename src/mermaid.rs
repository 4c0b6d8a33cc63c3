//! Mermaid rendering
//!
//! Renders a built tree as a mermaid flowchart. Only a small subset of the
//! flowchart language is emitted, so the output stays importable by
//! diagramming tools that implement mermaid loosely.
use crate::node::{ClassStats, DecisionNode};

/// Shape vocabulary for flowchart nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Rectangle,
    Stadium,
    Circle,
    Hexagon,
    Parallelogram,
    ParallelogramAlt,
    Trapezoid,
    TrapezoidAlt,
    Rhombus,
}

impl Shape {
    fn delimiters(&self) -> (&'static str, &'static str) {
        match self {
            Shape::Rectangle => ("[", "]"),
            Shape::Stadium => ("([", "])"),
            Shape::Circle => ("((", "))"),
            Shape::Hexagon => ("{{", "}}"),
            Shape::Parallelogram => ("[/", "/]"),
            Shape::ParallelogramAlt => ("[\\", "\\]"),
            Shape::Trapezoid => ("[/", "\\]"),
            Shape::TrapezoidAlt => ("[\\", "/]"),
            Shape::Rhombus => ("{", "}"),
        }
    }
}

/// Strip characters that break diagram import.
fn clean_label(label: &str) -> String {
    let mut cleaned = label.to_string();
    for pattern in ["(", ")", "[", "]"] {
        cleaned = cleaned.replace(pattern, " ");
    }
    cleaned.replace('\n', "\\n")
}

/// Draw one flowchart shape.
///
/// * `shape_id` - Identifier of the shape, unique within the diagram.
/// * `label` - Text shown inside the shape.
pub fn draw_shape(shape_id: &str, label: &str, shape: Shape) -> String {
    let (begin, end) = shape.delimiters();
    format!("{shape_id}{begin}{}{end}", clean_label(label))
}

/// Draw a link between two shapes, with an optional label on the arrow.
pub fn draw_link(from: &str, to: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{from} -->|{}| {to}", clean_label(label)),
        None => format!("{from} --> {to}"),
    }
}

/// Stacked shapes for a leaf's class probabilities, most probable first.
///
/// The top shape reuses the leaf's id, so the link from the parent points
/// at the whole stack; the remaining shapes chain below it with unlabeled
/// links. `None` when no class has positive probability.
fn probability_stack(node: &DecisionNode, stats: &ClassStats) -> Option<(Vec<String>, Vec<String>)> {
    let mut items: Vec<(String, f64)> = stats
        .probabilities
        .iter()
        .filter(|(_, probability)| **probability > 0.0)
        .map(|(label, probability)| (label.clone(), *probability))
        .collect();
    if items.is_empty() {
        return None;
    }
    items.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut shapes = Vec::new();
    let mut links = Vec::new();
    let mut previous = node.uid();
    for (position, (label, probability)) in items.iter().enumerate() {
        let text = format!("{label} ({:.0}%)", probability * 100.0);
        if position == 0 {
            shapes.push(draw_shape(&previous, &text, Shape::Stadium));
            continue;
        }
        let id = format!("{}_prob_{}", node.uid(), position + 1);
        shapes.push(draw_shape(&id, &text, Shape::Stadium));
        links.push(draw_link(&previous, &id, None));
        previous = id;
    }
    Some((shapes, links))
}

/// Render the tree below `root` as a top-down flowchart.
///
/// Split nodes become rectangles labeled with the split variable. A leaf
/// with decoded class probabilities becomes a stack of stadiums, one per
/// class with positive probability; other leaves become a single stadium
/// labeled with the prediction. Every link out of a split node carries the
/// branch condition of the child it reaches.
pub fn tree_diagram(root: &DecisionNode) -> String {
    let mut shapes = Vec::new();
    let mut links = Vec::new();

    for node in root.preorder() {
        let uid = node.uid();
        let stack = match node.stats() {
            Some(stats) if node.is_leaf() => probability_stack(&node, &stats),
            _ => None,
        };
        if let Some((stack_shapes, stack_links)) = stack {
            shapes.extend(stack_shapes);
            links.extend(stack_links);
        } else if node.is_leaf() {
            match node.prediction() {
                Some(prediction) => shapes.push(draw_shape(&uid, &prediction.to_string(), Shape::Stadium)),
                None => shapes.push(draw_shape(&uid, &node.name(), Shape::Stadium)),
            }
        } else if let Some(rule) = node.rule() {
            shapes.push(draw_shape(&uid, rule.var(), Shape::Rectangle));
        } else {
            shapes.push(draw_shape(&uid, &node.name(), Shape::Rectangle));
        }

        if node.is_root() {
            continue;
        }
        if let (Some(parent), Some(branch)) = (node.parent(), node.branch()) {
            let label = parent.rule().map(|rule| rule.condition(branch));
            links.push(draw_link(&parent.uid(), &uid, label.as_deref()));
        }
    }

    let mut lines = vec!["flowchart TD".to_string()];
    lines.extend(shapes);
    lines.extend(links);
    lines.join("\n\t")
}
