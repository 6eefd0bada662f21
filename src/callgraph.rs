use crate::cancel::CancellationToken;
use crate::codemodel::CodeModel;
use crate::config::Config;
use crate::error::{Result, ToolError};
use crate::model::{SourceLocation, SymbolCompact};
use crate::symbols::{self, SymbolIndex};
use crate::util;
use crate::workspace::{SessionHost, Snapshot, WorkspaceVersion};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
    Both,
}

impl Direction {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "incoming" => Ok(Direction::Incoming),
            "outgoing" => Ok(Direction::Outgoing),
            "both" => Ok(Direction::Both),
            other => Err(ToolError::invalid_input(format!(
                "direction must be incoming, outgoing or both (got {other:?})"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
            Direction::Both => "both",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_direction() -> String {
    Direction::Both.as_str().to_string()
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CallGraphRequest {
    pub symbol_id: String,
    #[serde(default = "default_direction")]
    pub direction: String,
    /// Clamped to `1..=max`, where max defaults to 4.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct CallGraphOptions {
    pub depth_limit: usize,
}

impl Default for CallGraphOptions {
    fn default() -> Self {
        Self {
            depth_limit: Config::get().call_graph_max_depth,
        }
    }
}

impl CallGraphOptions {
    pub fn clamp(&self, requested: Option<usize>) -> usize {
        let limit = self.depth_limit.max(1);
        requested.unwrap_or(limit).clamp(1, limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CallEdge {
    pub from: String,
    pub to: String,
    pub location: SourceLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallGraph {
    pub workspace_version: WorkspaceVersion,
    pub root: SymbolCompact,
    pub direction: Direction,
    pub depth: usize,
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes: Vec<SymbolCompact>,
    pub edges: Vec<CallEdge>,
}

type EdgeKey = (String, String, SourceLocation);

/// Whitespace-collapsed text of the line holding `location`.
fn line_snippet(snapshot: &Snapshot, location: &SourceLocation) -> Option<String> {
    let text = snapshot.text(&location.path)?;
    let at = location.span.start.min(text.len());
    let start = text[..at].rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let end = text[at..].find('\n').map(|idx| at + idx).unwrap_or(text.len());
    util::evidence_snippet(text, start, end)
}

/// One-direction BFS from `root`, expanding nodes closer than `depth`.
#[allow(clippy::too_many_arguments)]
fn traverse(
    model: &dyn CodeModel,
    snapshot: &Snapshot,
    index: &SymbolIndex,
    root: &str,
    incoming: bool,
    depth: usize,
    cancel: &CancellationToken,
    edges: &mut BTreeSet<EdgeKey>,
) -> Result<()> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    visited.insert(root.to_string());
    queue.push_back((root.to_string(), 0));

    while let Some((id, dist)) = queue.pop_front() {
        cancel.check()?;
        if dist >= depth {
            continue;
        }
        let Some(symbol) = index.resolve(&id) else {
            continue;
        };
        let neighbors: Vec<(String, SourceLocation)> = if incoming {
            model
                .find_callers(snapshot, symbol)?
                .into_iter()
                .map(|caller| (caller.caller, caller.location))
                .collect()
        } else {
            model
                .call_sites(snapshot, symbol)?
                .into_iter()
                .map(|site| (site.callee, site.location))
                .collect()
        };
        for (other, location) in neighbors {
            let key = if incoming {
                (other.clone(), id.clone(), location)
            } else {
                (id.clone(), other.clone(), location)
            };
            edges.insert(key);
            if visited.insert(other.clone()) {
                queue.push_back((other, dist + 1));
            }
        }
    }
    Ok(())
}

/// Bounded call graph around one symbol.
///
/// `both` runs the incoming and outgoing walks independently and unions
/// their edges. Edges are unique by `(from, to, location)` and sorted on the
/// same key.
pub fn call_graph(
    host: &dyn SessionHost,
    model: &dyn CodeModel,
    request: &CallGraphRequest,
    options: &CallGraphOptions,
    cancel: &CancellationToken,
) -> Result<CallGraph> {
    let direction = Direction::parse(&request.direction)?;
    let root_id = request.symbol_id.trim();
    if !symbols::is_well_formed(root_id) {
        return Err(ToolError::invalid_input(format!(
            "malformed symbol id: {root_id:?}"
        )));
    }
    let depth = options.clamp(request.max_depth);

    let (snapshot, version) = host.current();
    let index = model.symbols(&snapshot)?;
    let root = index
        .resolve(root_id)
        .ok_or_else(|| ToolError::invalid_input(format!("symbol not found: {root_id}")))?;

    let mut keys: BTreeSet<EdgeKey> = BTreeSet::new();
    if matches!(direction, Direction::Incoming | Direction::Both) {
        traverse(model, &snapshot, &index, root_id, true, depth, cancel, &mut keys)?;
    }
    if matches!(direction, Direction::Outgoing | Direction::Both) {
        traverse(model, &snapshot, &index, root_id, false, depth, cancel, &mut keys)?;
    }

    let mut node_ids: BTreeSet<&str> = BTreeSet::new();
    node_ids.insert(root_id);
    for (from, to, _) in &keys {
        node_ids.insert(from);
        node_ids.insert(to);
    }
    let nodes: Vec<SymbolCompact> = node_ids
        .iter()
        .filter_map(|id| index.resolve(id))
        .map(SymbolCompact::from)
        .collect();
    let node_count = node_ids.len();

    let edges: Vec<CallEdge> = keys
        .iter()
        .map(|(from, to, location)| CallEdge {
            from: from.clone(),
            to: to.clone(),
            snippet: line_snippet(&snapshot, location),
            location: location.clone(),
        })
        .collect();
    log::debug!(
        "call graph {direction} from {} depth {depth}: {node_count} nodes, {} edges",
        root.qualname,
        edges.len()
    );
    Ok(CallGraph {
        workspace_version: version,
        root: SymbolCompact::from(root),
        direction,
        depth,
        node_count,
        edge_count: edges.len(),
        nodes,
        edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_parse_is_strict() {
        assert_eq!(Direction::parse("Incoming").unwrap(), Direction::Incoming);
        assert_eq!(Direction::parse(" both ").unwrap(), Direction::Both);
        assert_eq!(
            Direction::parse("sideways").unwrap_err().code(),
            "invalid_input"
        );
    }

    #[test]
    fn depth_is_clamped_to_limit() {
        let options = CallGraphOptions { depth_limit: 4 };
        assert_eq!(options.clamp(Some(0)), 1);
        assert_eq!(options.clamp(Some(3)), 3);
        assert_eq!(options.clamp(Some(99)), 4);
        assert_eq!(options.clamp(None), 4);
    }
}
