//! Graphviz dump of a compiled instruction graph.
//!
//! Feature-gated behind `dot`: this crate carries no other use for the
//! `dot-writer` dependency, so it stays out of the default build.

use std::collections::VecDeque;

use dot_writer::{Attributes, Color, DotWriter, Shape, Style};
use fnv::FnvHashMap;

use crate::instr::{Instruction, Kind};

/// Renders `entry`'s reachable instruction graph as a Graphviz `digraph`
/// in DOT syntax. Nodes are numbered in breadth-first, first-visit
/// order starting from `entry` (node `0`); the entry node and every
/// `Accept` node are visually highlighted.
pub fn to_dot<'a, V, K>(entry: &'a Instruction<'a, V, K>) -> String {
    let mut ids: FnvHashMap<u32, usize> = FnvHashMap::default();
    let mut order: Vec<&'a Instruction<'a, V, K>> = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(entry);
    ids.insert(entry.id, 0);

    while let Some(node) = queue.pop_front() {
        order.push(node);
        for succ in successors(node) {
            if !ids.contains_key(&succ.id) {
                ids.insert(succ.id, ids.len());
                queue.push_back(succ);
            }
        }
    }

    let mut bytes = Vec::new();
    {
        let mut writer = DotWriter::from(&mut bytes);
        writer.set_pretty_print(true);
        let mut graph = writer.digraph();

        for node in &order {
            let id = ids[&node.id];
            let mut dot_node = graph.node_named(node_name(id));
            dot_node.set_label(&label(node));
            dot_node.set_shape(Shape::Rectangle);
            if id == 0 {
                dot_node.set_style(Style::Filled).set_color(Color::LightGrey);
            }
            if matches!(node.kind, Kind::Accept) {
                dot_node.set_style(Style::Filled).set_color(Color::PaleGreen);
            }
        }

        for node in &order {
            let from = node_name(ids[&node.id]);
            for (succ, tag) in labeled_successors(node) {
                let to = node_name(ids[&succ.id]);
                let mut edge = graph.edge(from.clone(), to);
                if let Some(tag) = tag {
                    edge.attributes().set_label(tag);
                }
            }
        }
    }

    String::from_utf8(bytes).expect("dot-writer emits valid UTF-8")
}

fn node_name(id: usize) -> String {
    format!("n{id}")
}

fn label<'a, V, K>(node: &Instruction<'a, V, K>) -> String {
    match &node.kind {
        Kind::Atom { .. } => format!("#{} Atom", node.id),
        Kind::Split { .. } => format!("#{} Split", node.id),
        Kind::Save { position, key, .. } => {
            format!("#{} Save({:?}, key={})", node.id, position, key.is_some())
        }
        Kind::Mark { position, .. } => format!("#{} Mark({:?})", node.id, position),
        Kind::Call { .. } => format!("#{} Call", node.id),
        Kind::Accept => format!("#{} Accept", node.id),
    }
}

fn successors<'a, V, K>(node: &Instruction<'a, V, K>) -> Vec<&'a Instruction<'a, V, K>> {
    match &node.kind {
        Kind::Atom { next, .. } => vec![next.get()],
        Kind::Split { next, alt } => vec![next.get(), alt.get()],
        Kind::Save { next, .. } => vec![next.get()],
        Kind::Mark { next, .. } => vec![next.get()],
        Kind::Call { next, .. } => vec![next.get()],
        Kind::Accept => vec![],
    }
}

fn labeled_successors<'a, V, K>(
    node: &Instruction<'a, V, K>,
) -> Vec<(&'a Instruction<'a, V, K>, Option<&'static str>)> {
    match &node.kind {
        Kind::Split { next, alt } => vec![(next.get(), Some("next")), (alt.get(), Some("alt"))],
        _ => successors(node).into_iter().map(|s| (s, None)).collect(),
    }
}
