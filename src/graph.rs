use serde::{Deserialize, Serialize};

use crate::*;

/// Everything needed to rebuild a store exactly, counters included.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphState {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub node_id_counter: NodeId,
    pub connection_id_counter: ConnectionId,
}

/// Fields for a node that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    pub text: String,
    pub kind: NodeKind,
    pub color: Option<String>,
    pub size: NodeSize,
    pub position: Option<Point>,
}

impl NewNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: NodeKind::default(),
            color: None,
            size: NodeSize::default(),
            position: None,
        }
    }

    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn size(mut self, size: NodeSize) -> Self {
        self.size = size;
        self
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePatch {
    pub text: Option<String>,
    pub kind: Option<NodeKind>,
    pub color: Option<String>,
    pub size: Option<NodeSize>,
    pub position: Option<Point>,
}

impl NodePatch {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.kind.is_none()
            && self.color.is_none()
            && self.size.is_none()
            && self.position.is_none()
    }
}

/// Owner of the diagram's nodes and connections.
///
/// Every connection endpoint names a node in `nodes`; removing a node removes
/// its connections in the same call.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    next_node_id: NodeId,
    next_connection_id: ConnectionId,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Node at `index` in insertion order.
    pub fn node_at_index(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|conn| conn.id == id)
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Node(id) => self.node(id).is_some(),
            EntityRef::Connection(id) => self.connection(id).is_some(),
        }
    }

    pub fn connections_touching(&self, node: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |conn| conn.touches(node))
    }

    pub fn find_connection_between(&self, a: NodeId, b: NodeId) -> Option<&Connection> {
        self.connections.iter().find(|conn| conn.joins(a, b))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn next_node_id(&self) -> NodeId {
        self.next_node_id
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_connection_id
    }

    /// Adds a node, chaining it to the previous tail node when `auto_connect`
    /// is set.
    pub fn create_node(&mut self, fields: NewNode, auto_connect: bool) -> Result<Node> {
        let text = normalize_node_text(&fields.text)?;
        let color = match fields.color.as_deref() {
            Some(raw) => normalize_color(raw)?,
            None => fields.kind.default_fill_color().to_string(),
        };
        let position = match fields.position {
            Some(position) => finite_position(position)?,
            None => default_position(self.nodes.len()),
        };

        let previous = self.nodes.last().map(|node| node.id).filter(|_| auto_connect);
        let next_node_id = advance(self.next_node_id, "node")?;
        if previous.is_some() {
            advance(self.next_connection_id, "connection")?;
        }

        let node = Node {
            id: self.next_node_id,
            text,
            kind: fields.kind,
            color,
            size: fields.size,
            x: position.x,
            y: position.y,
        };
        self.next_node_id = next_node_id;
        self.nodes.push(node.clone());
        tracing::debug!(id = node.id, text = %node.text, "created node");

        if let Some(previous) = previous {
            self.push_connection(previous, node.id)?;
        }

        Ok(node)
    }

    /// Removes a node and every connection touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let index = self.nodes.iter().position(|node| node.id == id)?;
        let removed = self.nodes.remove(index);
        let before = self.connections.len();
        self.connections.retain(|conn| !conn.touches(id));
        tracing::debug!(
            id,
            cascaded = before - self.connections.len(),
            "removed node"
        );
        Some(removed)
    }

    pub fn update_node(&mut self, id: NodeId, patch: NodePatch) -> Result<Node> {
        let text = patch.text.as_deref().map(normalize_node_text).transpose()?;
        let color = patch.color.as_deref().map(normalize_color).transpose()?;
        let position = patch.position.map(finite_position).transpose()?;

        let node = self
            .nodes
            .iter_mut()
            .find(|node| node.id == id)
            .ok_or(EditorError::NodeNotFound(id))?;

        if let Some(text) = text {
            node.text = text;
        }
        if let Some(kind) = patch.kind {
            node.kind = kind;
        }
        if let Some(color) = color {
            node.color = color;
        }
        if let Some(size) = patch.size {
            node.size = size;
        }
        if let Some(position) = position {
            node.set_position(position);
        }
        tracing::debug!(id, "updated node");
        Ok(node.clone())
    }

    pub fn move_node(&mut self, id: NodeId, to: Point) -> Result<()> {
        let to = finite_position(to)?;
        let node = self
            .nodes
            .iter_mut()
            .find(|node| node.id == id)
            .ok_or(EditorError::NodeNotFound(id))?;
        node.set_position(to);
        Ok(())
    }

    /// Copies a node under a fresh id, shifted so it does not sit on top of the
    /// original. Connections are not copied.
    pub fn duplicate_node(&mut self, id: NodeId) -> Result<Node> {
        let source = self.node(id).ok_or(EditorError::NodeNotFound(id))?;
        let mut copy = source.clone();
        let next_node_id = advance(self.next_node_id, "node")?;
        copy.id = self.next_node_id;
        copy.set_position(finite_position(Point::new(
            copy.x + DUPLICATE_OFFSET_X,
            copy.y + DUPLICATE_OFFSET_Y,
        ))?);

        self.next_node_id = next_node_id;
        self.nodes.push(copy.clone());
        tracing::debug!(source = id, id = copy.id, "duplicated node");
        Ok(copy)
    }

    pub fn create_connection(&mut self, from: NodeId, to: NodeId) -> Result<Connection> {
        if self.node(from).is_none() {
            return Err(EditorError::NodeNotFound(from));
        }
        if self.node(to).is_none() {
            return Err(EditorError::NodeNotFound(to));
        }
        if from == to {
            return Err(EditorError::validation(format!(
                "node {from} cannot connect to itself"
            )));
        }
        if self.find_connection_between(from, to).is_some() {
            return Err(EditorError::Duplicate { from, to });
        }
        self.push_connection(from, to)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        let index = self.connections.iter().position(|conn| conn.id == id)?;
        let removed = self.connections.remove(index);
        tracing::debug!(id, "removed connection");
        Some(removed)
    }

    /// Moves every node onto the row-major grid.
    pub fn apply_auto_layout(&mut self, container_width: f32) {
        self.nodes = auto_layout(&self.nodes, container_width);
    }

    /// Empties the store and restarts both id sequences at zero.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
        self.next_node_id = 0;
        self.next_connection_id = 0;
        tracing::debug!("cleared graph");
    }

    pub fn snapshot(&self) -> GraphState {
        GraphState {
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
            node_id_counter: self.next_node_id,
            connection_id_counter: self.next_connection_id,
        }
    }

    /// Replaces the whole store. The caller vouches that `state` is consistent.
    pub fn restore(&mut self, state: GraphState) {
        self.nodes = state.nodes;
        self.connections = state.connections;
        self.next_node_id = state.node_id_counter;
        self.next_connection_id = state.connection_id_counter;
        debug_assert!(self.dangling_connections().next().is_none());
    }

    /// Connections whose endpoints are missing. Empty for every reachable state.
    pub fn dangling_connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(move |conn| self.node(conn.from).is_none() || self.node(conn.to).is_none())
    }

    fn push_connection(&mut self, from: NodeId, to: NodeId) -> Result<Connection> {
        let next_connection_id = advance(self.next_connection_id, "connection")?;
        let connection = Connection {
            id: self.next_connection_id,
            from,
            to,
        };
        self.next_connection_id = next_connection_id;
        self.connections.push(connection);
        tracing::debug!(id = connection.id, from, to, "created connection");
        Ok(connection)
    }
}

/// The counter value after handing out `current`. The last id of the range
/// is never assigned so the counter can always point past every id in use.
fn advance(current: u64, what: &str) -> Result<u64> {
    current
        .checked_add(1)
        .ok_or_else(|| EditorError::validation(format!("{what} id space exhausted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_consistent(store: &GraphStore) {
        assert_eq!(store.dangling_connections().count(), 0);
    }

    #[test]
    fn create_node_assigns_ids_and_chains() {
        let mut store = GraphStore::new();
        let start = store
            .create_node(NewNode::new("Start").kind(NodeKind::Start), true)
            .unwrap();
        let process = store.create_node(NewNode::new("Process"), true).unwrap();

        assert_eq!(start.id, 0);
        assert_eq!(process.id, 1);
        assert_eq!(start.color, NodeKind::Start.default_fill_color());
        assert_eq!(start.position(), Point::new(100.0, 100.0));
        assert_eq!(process.position(), Point::new(250.0, 200.0));
        assert_eq!(store.node_at_index(1), Some(&process));
        assert_eq!(store.node_at_index(2), None);
        assert_eq!(
            store.connections(),
            &[Connection {
                id: 0,
                from: 0,
                to: 1
            }]
        );
    }

    #[test]
    fn auto_connect_can_be_suppressed() {
        let mut store = GraphStore::new();
        store.create_node(NewNode::new("a"), false).unwrap();
        store.create_node(NewNode::new("b"), false).unwrap();
        assert!(store.connections().is_empty());
    }

    #[test]
    fn invalid_input_leaves_store_untouched() {
        let mut store = GraphStore::new();
        let err = store.create_node(NewNode::new("   "), true).unwrap_err();
        assert!(matches!(err, EditorError::Validation { .. }));
        let err = store
            .create_node(NewNode::new("ok").color("blue"), true)
            .unwrap_err();
        assert!(matches!(err, EditorError::Validation { .. }));
        assert!(store.is_empty());
        assert_eq!(store.next_node_id(), 0);
    }

    #[test]
    fn remove_node_cascades() {
        let mut store = GraphStore::new();
        for label in ["a", "b", "c"] {
            store.create_node(NewNode::new(label), true).unwrap();
        }
        store.create_connection(0, 2).unwrap();
        assert_eq!(store.connections().len(), 3);

        let removed = store.remove_node(2).unwrap();
        assert_eq!(removed.text, "c");
        assert_eq!(store.connections().len(), 1);
        assert!(store.connections_touching(2).next().is_none());
        assert_consistent(&store);

        assert!(store.remove_node(2).is_none());
    }

    #[test]
    fn ids_are_never_reused_until_clear() {
        let mut store = GraphStore::new();
        store.create_node(NewNode::new("a"), true).unwrap();
        store.create_node(NewNode::new("b"), true).unwrap();
        store.remove_node(1);
        let c = store.create_node(NewNode::new("c"), true).unwrap();
        assert_eq!(c.id, 2);
        assert_eq!(store.connections().last().unwrap().id, 1);

        store.clear();
        assert_eq!(store.next_node_id(), 0);
        assert_eq!(store.next_connection_id(), 0);
        let fresh = store.create_node(NewNode::new("fresh"), true).unwrap();
        assert_eq!(fresh.id, 0);
    }

    #[test]
    fn connections_are_deduplicated_in_both_directions() {
        let mut store = GraphStore::new();
        store.create_node(NewNode::new("a"), false).unwrap();
        store.create_node(NewNode::new("b"), false).unwrap();

        store.create_connection(0, 1).unwrap();
        assert_eq!(
            store.create_connection(1, 0),
            Err(EditorError::Duplicate { from: 1, to: 0 })
        );
        assert_eq!(store.connections().len(), 1);
    }

    #[test]
    fn connections_need_two_existing_distinct_nodes() {
        let mut store = GraphStore::new();
        store.create_node(NewNode::new("a"), false).unwrap();

        assert_eq!(
            store.create_connection(0, 9),
            Err(EditorError::NodeNotFound(9))
        );
        assert!(matches!(
            store.create_connection(0, 0),
            Err(EditorError::Validation { .. })
        ));
        assert!(store.connections().is_empty());
        assert_eq!(store.next_connection_id(), 0);
    }

    #[test]
    fn update_validates_before_writing() {
        let mut store = GraphStore::new();
        store.create_node(NewNode::new("a"), false).unwrap();

        let patch = NodePatch {
            text: Some("renamed".into()),
            color: Some("nope".into()),
            ..NodePatch::default()
        };
        assert!(store.update_node(0, patch).is_err());
        assert_eq!(store.node(0).unwrap().text, "a");

        let patch = NodePatch {
            text: Some("renamed".into()),
            kind: Some(NodeKind::Decision),
            size: Some(NodeSize::Large),
            position: Some(Point::new(5.0, 6.0)),
            ..NodePatch::default()
        };
        let updated = store.update_node(0, patch).unwrap();
        assert_eq!(updated.text, "renamed");
        assert_eq!(updated.kind, NodeKind::Decision);
        assert_eq!(updated.size, NodeSize::Large);
        assert_eq!(updated.position(), Point::new(5.0, 6.0));

        assert_eq!(
            store.update_node(42, NodePatch::default()),
            Err(EditorError::NodeNotFound(42))
        );
    }

    #[test]
    fn duplicate_offsets_and_skips_connections() {
        let mut store = GraphStore::new();
        store
            .create_node(
                NewNode::new("a").size(NodeSize::Small).at(Point::new(10.0, 20.0)),
                true,
            )
            .unwrap();
        store.create_node(NewNode::new("b"), true).unwrap();

        let copy = store.duplicate_node(0).unwrap();
        assert_eq!(copy.id, 2);
        assert_eq!(copy.text, "a");
        assert_eq!(copy.size, NodeSize::Small);
        assert_eq!(copy.position(), Point::new(160.0, 70.0));
        assert_eq!(store.connections().len(), 1);
        assert!(store.connections_touching(2).next().is_none());

        assert_eq!(store.duplicate_node(7), Err(EditorError::NodeNotFound(7)));
    }

    #[test]
    fn snapshot_and_restore_round_trip_counters() {
        let mut store = GraphStore::new();
        store.create_node(NewNode::new("a"), true).unwrap();
        store.create_node(NewNode::new("b"), true).unwrap();
        let state = store.snapshot();

        store.clear();
        store.restore(state.clone());
        assert_eq!(store.snapshot(), state);
        assert_eq!(store.next_node_id(), 2);
        assert_eq!(store.next_connection_id(), 1);
    }

    #[test]
    fn non_finite_positions_are_refused() {
        let mut store = GraphStore::new();
        store
            .create_node(NewNode::new("a").at(Point::new(10.0, 10.0)), true)
            .unwrap();
        let before = store.snapshot();

        let err = store
            .create_node(NewNode::new("b").at(Point::new(f32::NAN, 10.0)), true)
            .unwrap_err();
        assert!(matches!(err, EditorError::Validation { .. }));
        assert!(store.move_node(0, Point::new(0.0, f32::INFINITY)).is_err());
        assert!(
            store
                .update_node(
                    0,
                    NodePatch {
                        text: Some("renamed".into()),
                        position: Some(Point::new(f32::NEG_INFINITY, 0.0)),
                        ..NodePatch::default()
                    },
                )
                .is_err()
        );

        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn exhausted_counters_refuse_new_ids() {
        let mut store = GraphStore::new();
        store.restore(GraphState {
            nodes: vec![Node {
                id: 3,
                text: "last".into(),
                kind: NodeKind::Process,
                color: NodeKind::Process.default_fill_color().into(),
                size: NodeSize::Medium,
                x: 0.0,
                y: 0.0,
            }],
            connections: vec![],
            node_id_counter: u64::MAX,
            connection_id_counter: 0,
        });
        let before = store.snapshot();

        let err = store.create_node(NewNode::new("next"), true).unwrap_err();
        assert!(matches!(err, EditorError::Validation { .. }));
        assert!(store.duplicate_node(3).is_err());
        assert_eq!(store.snapshot(), before);

        store.restore(GraphState {
            node_id_counter: 4,
            connection_id_counter: u64::MAX,
            ..before.clone()
        });
        // The chained connection cannot get an id, so the node is not added either.
        assert!(store.create_node(NewNode::new("next"), true).is_err());
        assert_eq!(store.nodes().len(), 1);
        let unchained = store.create_node(NewNode::new("next"), false).unwrap();
        assert_eq!(unchained.id, 4);
        assert!(store.create_connection(3, 4).is_err());
        assert!(store.connections().is_empty());
    }
}
