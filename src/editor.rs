use chrono::Utc;
use serde::Serialize;

use crate::*;

/// One editing session: the graph, its undo history, and the interaction
/// state, owned together. Every committed mutation records exactly one
/// history snapshot after it completes.
#[derive(Debug, Clone)]
pub struct Editor {
    config: EditorConfig,
    store: GraphStore,
    history: History,
    controller: Controller,
    zoom: f32,
    theme: String,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoutedEdge {
    pub connection: ConnectionId,
    #[serde(flatten)]
    pub route: EdgeRoute,
}

/// Read-only state handed to a renderer after each mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorView<'a> {
    pub nodes: &'a [Node],
    pub connections: &'a [Connection],
    pub routes: Vec<RoutedEdge>,
    pub selection: Selection,
    pub pending_source: Option<NodeId>,
    pub connect_mode: bool,
    pub zoom: f32,
    pub grid: GridSettings,
    pub canvas: CanvasBounds,
    pub theme: &'a str,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let mut history = History::with_capacity(config.history_limit);
        let store = GraphStore::new();
        history.snapshot(store.snapshot());

        Self {
            zoom: config.zoom,
            theme: config.theme.clone(),
            config,
            store,
            history,
            controller: Controller::new(),
        }
    }

    /// Opens a document as the session's starting point; the loaded state is
    /// the first history entry, so it cannot be undone away.
    pub fn open(config: EditorConfig, document: &DiagramDocument) -> Result<Self> {
        let state = document.to_state()?;
        let mut editor = Self::new(config);
        editor.store.restore(state);
        if let Some(theme) = document.theme.as_deref().filter(|theme| !theme.trim().is_empty()) {
            editor.theme = theme.to_string();
        }
        editor.history = History::with_capacity(editor.config.history_limit);
        editor.history.snapshot(editor.store.snapshot());
        Ok(editor)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn nodes(&self) -> &[Node] {
        self.store.nodes()
    }

    pub fn connections(&self) -> &[Connection] {
        self.store.connections()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.store.node(id)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> Selection {
        self.controller.selection()
    }

    pub fn interaction(&self) -> &InteractionState {
        self.controller.state()
    }

    pub fn is_connect_mode(&self) -> bool {
        self.controller.is_connect_mode()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn snapshot(&self) -> GraphState {
        self.store.snapshot()
    }

    fn commit(&mut self, action: &str) {
        self.controller.reconcile(&self.store);
        self.history.snapshot(self.store.snapshot());
        tracing::debug!(
            action,
            nodes = self.store.nodes().len(),
            connections = self.store.connections().len(),
            history = self.history.len(),
            "committed"
        );
    }

    /// Adds a node. Outside connection-authoring mode it is chained to the
    /// most recently created node.
    pub fn add_node(&mut self, fields: NewNode) -> Result<Node> {
        let auto_connect = !self.controller.is_connect_mode();
        let node = self.store.create_node(fields, auto_connect)?;
        self.commit("add node");
        Ok(node)
    }

    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let removed = self.store.remove_node(id)?;
        self.commit("remove node");
        Some(removed)
    }

    pub fn update_node(&mut self, id: NodeId, patch: NodePatch) -> Result<Node> {
        if patch.is_empty() {
            return self
                .store
                .node(id)
                .cloned()
                .ok_or(EditorError::NodeNotFound(id));
        }
        let node = self.store.update_node(id, patch)?;
        self.commit("update node");
        Ok(node)
    }

    pub fn move_node(&mut self, id: NodeId, to: Point) -> Result<Node> {
        self.update_node(
            id,
            NodePatch {
                position: Some(to),
                ..NodePatch::default()
            },
        )
    }

    pub fn duplicate_node(&mut self, id: NodeId) -> Result<Node> {
        let copy = self.store.duplicate_node(id)?;
        self.commit("duplicate node");
        Ok(copy)
    }

    /// Connects two nodes. A pair that is already linked (either direction)
    /// or a self-loop is ignored and yields `Ok(None)`.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<Option<Connection>> {
        if from == to {
            tracing::debug!(node = from, "ignored self-loop");
            return Ok(None);
        }
        match self.store.create_connection(from, to) {
            Ok(connection) => {
                self.commit("connect");
                Ok(Some(connection))
            }
            Err(EditorError::Duplicate { from, to }) => {
                tracing::debug!(from, to, "ignored duplicate connection");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        let removed = self.store.remove_connection(id)?;
        self.commit("remove connection");
        Some(removed)
    }

    pub fn remove(&mut self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Node(id) => self.remove_node(id).is_some(),
            EntityRef::Connection(id) => self.remove_connection(id).is_some(),
        }
    }

    pub fn auto_layout(&mut self) {
        self.auto_layout_within(self.config.canvas.width);
    }

    pub fn auto_layout_within(&mut self, container_width: f32) {
        self.store.apply_auto_layout(container_width);
        self.commit("auto layout");
    }

    pub fn clear(&mut self) {
        if let Some(effect) = self.controller.cancel() {
            tracing::trace!(?effect, "dropped drag on clear");
        }
        self.store.clear();
        self.commit("clear");
    }

    pub fn undo(&mut self) -> bool {
        let Some(state) = self.history.undo().cloned() else {
            return false;
        };
        self.store.restore(state);
        self.controller.clear_selection();
        tracing::debug!(position = self.history.position(), "undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(state) = self.history.redo().cloned() else {
            return false;
        };
        self.store.restore(state);
        self.controller.clear_selection();
        tracing::debug!(position = self.history.position(), "redo");
        true
    }

    /// Replaces the diagram with a document. On error nothing changes.
    pub fn load_document(&mut self, document: &DiagramDocument) -> Result<()> {
        let state = document.to_state()?;
        if let Some(effect) = self.controller.cancel() {
            tracing::trace!(?effect, "dropped drag on load");
        }
        self.store.restore(state);
        if let Some(theme) = document.theme.as_deref().filter(|theme| !theme.trim().is_empty()) {
            self.theme = theme.to_string();
        }
        self.commit("load");
        Ok(())
    }

    pub fn load_json(&mut self, source: &str) -> Result<()> {
        let document = DiagramDocument::from_json(source)?;
        self.load_document(&document)
    }

    pub fn to_document(&self) -> DiagramDocument {
        DiagramDocument::from_state(&self.store.snapshot(), &self.theme, Utc::now())
    }

    pub fn to_json(&self) -> Result<String> {
        self.to_document().to_json()
    }

    pub fn set_connect_mode(&mut self, enabled: bool) {
        if enabled == self.controller.is_connect_mode() {
            return;
        }
        self.cancel();
        if enabled {
            self.controller.enter_connect_mode();
        }
    }

    pub fn toggle_connect_mode(&mut self) -> bool {
        let enabled = !self.controller.is_connect_mode();
        self.set_connect_mode(enabled);
        enabled
    }

    /// Abandons whatever gesture or mode is active without touching the graph.
    pub fn cancel(&mut self) {
        if let Some(Effect::MoveNode { node, to }) = self.controller.cancel() {
            // Drags only move live positions, so putting the node back
            // restores the last committed state.
            if let Err(err) = self.store.move_node(node, to) {
                tracing::warn!(%err, node, "drag origin vanished");
            }
        }
    }

    pub fn select(&mut self, entity: Option<EntityRef>) -> Result<()> {
        if let Some(entity) = entity {
            if !self.store.contains(entity) {
                return Err(match entity {
                    EntityRef::Node(id) => EditorError::NodeNotFound(id),
                    EntityRef::Connection(id) => EditorError::ConnectionNotFound(id),
                });
            }
        }
        self.controller.select(entity);
        Ok(())
    }

    pub fn set_snap_to_grid(&mut self, enabled: bool) {
        self.config.grid.snap_to_grid = enabled;
    }

    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
        self.zoom
    }

    pub fn set_theme(&mut self, theme: &str) -> Result<()> {
        let theme = theme.trim();
        if theme.is_empty() {
            return Err(EditorError::validation("theme name must not be empty"));
        }
        self.theme = theme.to_string();
        Ok(())
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            zoom: self.zoom,
            canvas: self.config.canvas,
            grid: self.config.grid,
        }
    }

    /// Feeds one input event through the controller and applies its effect.
    pub fn handle_event(&mut self, event: &InputEvent) -> Result<Option<Effect>> {
        let viewport = self.viewport();
        let effect = self.controller.handle(event, &self.store, &viewport);
        if let Some(effect) = effect {
            self.apply_effect(effect)?;
        }
        Ok(effect)
    }

    fn apply_effect(&mut self, effect: Effect) -> Result<()> {
        match effect {
            Effect::MoveNode { node, to } => self.store.move_node(node, to),
            Effect::CommitMove { .. } => {
                self.commit("drag");
                Ok(())
            }
            Effect::Connect { from, to } => self.connect(from, to).map(|_| ()),
            Effect::Remove(entity) => {
                self.remove(entity);
                Ok(())
            }
            Effect::Duplicate(id) => self.duplicate_node(id).map(|_| ()),
            Effect::Undo => {
                self.undo();
                Ok(())
            }
            Effect::Redo => {
                self.redo();
                Ok(())
            }
        }
    }

    pub fn routes(&self) -> Vec<RoutedEdge> {
        self.store
            .connections()
            .iter()
            .filter_map(|conn| {
                let from = self.store.node(conn.from)?;
                let to = self.store.node(conn.to)?;
                Some(RoutedEdge {
                    connection: conn.id,
                    route: compute_edge_anchors(from, to),
                })
            })
            .collect()
    }

    pub fn view(&self) -> EditorView<'_> {
        EditorView {
            nodes: self.store.nodes(),
            connections: self.store.connections(),
            routes: self.routes(),
            selection: self.controller.selection(),
            pending_source: self.controller.pending_source(),
            connect_mode: self.controller.is_connect_mode(),
            zoom: self.zoom,
            grid: self.config.grid,
            canvas: self.config.canvas,
            theme: &self.theme,
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        }
    }
}
