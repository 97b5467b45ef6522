use std::collections::{BTreeMap, HashMap};

use tat_common::ConfigError;
use tat_parse::Expr;

use crate::model::StageCatalog;

/// Extracts the predecessor stage-ids that are *syntactically visible*
/// in a `preceding_stage` expression — a bare list literal, not one
/// guarded behind a conditional call. Anything else
/// (a `Name`, a `Call` like `iff(...)`, …) is data-dependent and is
/// checked only at runtime by the resolver.
pub fn static_predecessors(expr: &Expr) -> Option<Vec<String>> {
    match expr {
        Expr::List(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Expr::Literal(scalar) => scalar.to_stage_id(),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

/// Detects a cycle in the static predecessor graph via white/grey/black
/// DFS coloring, failing on a back-edge.
pub fn detect_static_cycle(catalog: &StageCatalog) -> Result<(), ConfigError> {
    let mut graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (stage_id, stage) in catalog.iter() {
        let edges = stage
            .preceding_stage
            .as_deref()
            .and_then(|src| tat_parse::parse(src).ok())
            .and_then(|expr| static_predecessors(&expr))
            .unwrap_or_default()
            .into_iter()
            .filter(|pred| catalog.contains(pred))
            .collect();
        graph.insert(stage_id.to_string(), edges);
    }

    let mut color: HashMap<String, Color> = graph.keys().map(|k| (k.clone(), Color::White)).collect();
    let mut path: Vec<String> = Vec::new();

    let stage_ids: Vec<String> = graph.keys().cloned().collect();
    for start in stage_ids {
        if color[&start] == Color::White {
            if let Some(cycle) = dfs(&start, &graph, &mut color, &mut path) {
                return Err(ConfigError::Cycle { cycle });
            }
        }
    }
    Ok(())
}

fn dfs(
    node: &str,
    graph: &BTreeMap<String, Vec<String>>,
    color: &mut HashMap<String, Color>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    color.insert(node.to_string(), Color::Grey);
    path.push(node.to_string());

    if let Some(edges) = graph.get(node) {
        for next in edges {
            match color.get(next).copied().unwrap_or(Color::Black) {
                Color::Grey => {
                    let start = path.iter().position(|n| n == next).unwrap();
                    return Some(path[start..].to_vec());
                }
                Color::White => {
                    if let Some(cycle) = dfs(next, graph, color, path) {
                        return Some(cycle);
                    }
                }
                Color::Black => {}
            }
        }
    }

    path.pop();
    color.insert(node.to_string(), Color::Black);
    None
}
