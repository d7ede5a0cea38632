use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::*;

/// A node as written in a document. Older files have no color or size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub size: NodeSize,
    pub x: f32,
    pub y: f32,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            text: node.text.clone(),
            kind: node.kind,
            color: Some(node.color.clone()),
            size: node.size,
            x: node.x,
            y: node.y,
        }
    }
}

/// The portable on-disk form of a diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramDocument {
    pub nodes: Vec<NodeRecord>,
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id_counter: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id_counter: Option<ConnectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl DiagramDocument {
    pub fn from_state(state: &GraphState, theme: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            nodes: state.nodes.iter().map(NodeRecord::from).collect(),
            connections: state.connections.clone(),
            node_id_counter: Some(state.node_id_counter),
            connection_id_counter: Some(state.connection_id_counter),
            theme: Some(theme.to_string()),
            timestamp: Some(timestamp),
        }
    }

    pub fn from_json(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|err| EditorError::invalid_document(err.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|err| EditorError::invalid_document(err.to_string()))?;
        json.push('\n');
        Ok(json)
    }

    /// Checks the document and turns it into a consistent graph state.
    ///
    /// Anything that would break store invariants is rejected rather than
    /// repaired, including connections whose endpoints are missing.
    pub fn to_state(&self) -> Result<GraphState> {
        let mut node_ids = HashSet::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for record in &self.nodes {
            if !node_ids.insert(record.id) {
                return Err(EditorError::invalid_document(format!(
                    "node id {} appears more than once",
                    record.id
                )));
            }
            let text = normalize_node_text(&record.text).map_err(|err| {
                EditorError::invalid_document(format!("node {}: {}", record.id, reason(&err)))
            })?;
            let color = match record.color.as_deref() {
                Some(raw) => normalize_color(raw).map_err(|err| {
                    EditorError::invalid_document(format!("node {}: {}", record.id, reason(&err)))
                })?,
                None => record.kind.default_fill_color().to_string(),
            };
            if !record.x.is_finite() || !record.y.is_finite() {
                return Err(EditorError::invalid_document(format!(
                    "node {} has a non-finite position",
                    record.id
                )));
            }
            nodes.push(Node {
                id: record.id,
                text,
                kind: record.kind,
                color,
                size: record.size,
                x: record.x,
                y: record.y,
            });
        }

        let mut connection_ids = HashSet::new();
        let mut connections: Vec<Connection> = Vec::with_capacity(self.connections.len());
        for conn in &self.connections {
            if !connection_ids.insert(conn.id) {
                return Err(EditorError::invalid_document(format!(
                    "connection id {} appears more than once",
                    conn.id
                )));
            }
            for endpoint in [conn.from, conn.to] {
                if !node_ids.contains(&endpoint) {
                    return Err(EditorError::invalid_document(format!(
                        "connection {} references missing node {endpoint}",
                        conn.id
                    )));
                }
            }
            if conn.from == conn.to {
                return Err(EditorError::invalid_document(format!(
                    "connection {} connects node {} to itself",
                    conn.id, conn.from
                )));
            }
            if connections.iter().any(|existing| existing.joins(conn.from, conn.to)) {
                return Err(EditorError::invalid_document(format!(
                    "connection {} repeats an existing link between {} and {}",
                    conn.id, conn.from, conn.to
                )));
            }
            connections.push(*conn);
        }

        let node_id_counter = resolve_counter(
            "nodeIdCounter",
            self.node_id_counter,
            nodes.len(),
            nodes.iter().map(|node| node.id).max(),
        )?;
        let connection_id_counter = resolve_counter(
            "connectionIdCounter",
            self.connection_id_counter,
            connections.len(),
            connections.iter().map(|conn| conn.id).max(),
        )?;

        Ok(GraphState {
            nodes,
            connections,
            node_id_counter,
            connection_id_counter,
        })
    }
}

fn reason(err: &EditorError) -> String {
    match err {
        EditorError::Validation { message } => message.clone(),
        other => other.to_string(),
    }
}

/// Missing counters fall back to the collection length. Either way the
/// result is raised past the highest id in use so new ids cannot collide.
fn resolve_counter(
    name: &str,
    stored: Option<u64>,
    len: usize,
    max_id: Option<u64>,
) -> Result<u64> {
    let floor = match max_id {
        Some(id) => id.checked_add(1).ok_or_else(|| {
            EditorError::invalid_document(format!("{name}: id space exhausted"))
        })?,
        None => 0,
    };
    let counter = match stored {
        Some(value) => value,
        None => {
            tracing::warn!(counter = name, fallback = len, "document has no counter, using its length");
            len as u64
        }
    };
    if counter < floor {
        tracing::warn!(counter = name, value = counter, raised_to = floor, "counter would reuse an id");
        Ok(floor)
    } else {
        Ok(counter)
    }
}
