use serde::Serialize;

use crate::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub node: NodeId,
    pub grab_offset: Point,
    pub origin: Point,
    pub current: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    NodeSelected(NodeId),
    ConnectionSelected(ConnectionId),
    Dragging(DragState),
    ConnectAuthoring {
        pending_source: Option<NodeId>,
    },
    BoxSelecting {
        origin: Point,
        current: Point,
    },
}

/// What is selected. The enum makes a node and a connection selection
/// mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Selection {
    #[default]
    None,
    Node(NodeId),
    Connection(ConnectionId),
}

impl Selection {
    pub fn entity(&self) -> Option<EntityRef> {
        match *self {
            Selection::None => None,
            Selection::Node(id) => Some(EntityRef::Node(id)),
            Selection::Connection(id) => Some(EntityRef::Connection(id)),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    Enter,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        shift: false,
        alt: false,
    };
}

/// Normalized input from the host, in viewport-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown {
        at: Point,
        target: Option<EntityRef>,
    },
    PointerMove {
        at: Point,
    },
    PointerUp {
        at: Point,
    },
    KeyPress {
        key: Key,
        modifiers: Modifiers,
    },
}

/// A store change requested by the controller. The editor applies it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Live drag movement; not recorded in history.
    MoveNode { node: NodeId, to: Point },
    /// End of a drag that moved its node.
    CommitMove { node: NodeId },
    Connect { from: NodeId, to: NodeId },
    Remove(EntityRef),
    Duplicate(NodeId),
    Undo,
    Redo,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f32,
    pub canvas: CanvasBounds,
    pub grid: GridSettings,
}

impl Viewport {
    pub fn to_canvas(&self, point: Point) -> Point {
        if self.zoom > 0.0 {
            Point::new(point.x / self.zoom, point.y / self.zoom)
        } else {
            point
        }
    }
}

/// Topmost node under `at`, otherwise the closest connection within
/// `EDGE_HIT_TOLERANCE` of its routed segment.
pub fn hit_test(store: &GraphStore, at: Point) -> Option<EntityRef> {
    if let Some(node) = store
        .nodes()
        .iter()
        .rev()
        .find(|node| node.bounds().contains(at))
    {
        return Some(EntityRef::Node(node.id));
    }

    let mut best: Option<(ConnectionId, f32)> = None;
    for conn in store.connections() {
        let (Some(from), Some(to)) = (store.node(conn.from), store.node(conn.to)) else {
            continue;
        };
        let route = compute_edge_anchors(from, to);
        let distance = distance_to_segment(at, route.from, route.to);
        if distance <= EDGE_HIT_TOLERANCE && best.is_none_or(|(_, d)| distance < d) {
            best = Some((conn.id, distance));
        }
    }
    best.map(|(id, _)| EntityRef::Connection(id))
}

/// Ids of the nodes whose whole bounding box lies inside `rect`.
pub fn nodes_within(store: &GraphStore, rect: &Rect) -> Vec<NodeId> {
    store
        .nodes()
        .iter()
        .filter(|node| rect.contains_rect(&node.bounds()))
        .map(|node| node.id)
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Controller {
    state: InteractionState,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn selection(&self) -> Selection {
        match self.state {
            InteractionState::NodeSelected(id) => Selection::Node(id),
            InteractionState::Dragging(drag) => Selection::Node(drag.node),
            InteractionState::ConnectionSelected(id) => Selection::Connection(id),
            _ => Selection::None,
        }
    }

    pub fn is_connect_mode(&self) -> bool {
        matches!(self.state, InteractionState::ConnectAuthoring { .. })
    }

    pub fn pending_source(&self) -> Option<NodeId> {
        match self.state {
            InteractionState::ConnectAuthoring { pending_source } => pending_source,
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, InteractionState::Dragging(_))
    }

    /// Switches to connection authoring. Callers cancel any drag first.
    pub fn enter_connect_mode(&mut self) {
        self.state = InteractionState::ConnectAuthoring {
            pending_source: None,
        };
    }

    /// Returns to `Idle`. A drag in progress is abandoned and the returned
    /// effect puts its node back where the drag began.
    pub fn cancel(&mut self) -> Option<Effect> {
        let previous = std::mem::take(&mut self.state);
        match previous {
            InteractionState::Dragging(drag) if drag.current != drag.origin => {
                Some(Effect::MoveNode {
                    node: drag.node,
                    to: drag.origin,
                })
            }
            _ => None,
        }
    }

    /// Programmatic selection, as after creating a node.
    ///
    /// While authoring connections a node becomes the pending source and a
    /// connection is ignored; only `cancel` leaves the mode.
    pub fn select(&mut self, entity: Option<EntityRef>) {
        if self.is_dragging() {
            return;
        }
        if self.is_connect_mode() {
            let pending_source = match entity {
                Some(EntityRef::Node(id)) => Some(id),
                Some(EntityRef::Connection(_)) => return,
                None => None,
            };
            self.state = InteractionState::ConnectAuthoring { pending_source };
            return;
        }
        self.state = match entity {
            Some(EntityRef::Node(id)) => InteractionState::NodeSelected(id),
            Some(EntityRef::Connection(id)) => InteractionState::ConnectionSelected(id),
            None => InteractionState::Idle,
        };
    }

    /// Drops the selection but keeps connection-authoring mode.
    pub fn clear_selection(&mut self) {
        self.state = if self.is_connect_mode() {
            InteractionState::ConnectAuthoring {
                pending_source: None,
            }
        } else {
            InteractionState::Idle
        };
    }

    /// Forgets any entity that no longer exists in `store`.
    pub fn reconcile(&mut self, store: &GraphStore) {
        let stale = match self.state {
            InteractionState::NodeSelected(id) => store.node(id).is_none(),
            InteractionState::Dragging(drag) => store.node(drag.node).is_none(),
            InteractionState::ConnectionSelected(id) => store.connection(id).is_none(),
            InteractionState::ConnectAuthoring {
                pending_source: Some(id),
            } => store.node(id).is_none(),
            _ => false,
        };
        if stale {
            self.clear_selection();
        }
    }

    pub fn handle(
        &mut self,
        event: &InputEvent,
        store: &GraphStore,
        viewport: &Viewport,
    ) -> Option<Effect> {
        match *event {
            InputEvent::PointerDown { at, target } => {
                let at = viewport.to_canvas(at);
                let hit = target
                    .filter(|entity| store.contains(*entity))
                    .or_else(|| hit_test(store, at));
                self.pointer_down(at, hit, store)
            }
            InputEvent::PointerMove { at } => {
                self.pointer_move(viewport.to_canvas(at), store, viewport)
            }
            InputEvent::PointerUp { at } => self.pointer_up(viewport.to_canvas(at), store),
            InputEvent::KeyPress { key, modifiers } => self.key_press(key, modifiers),
        }
    }

    fn pointer_down(
        &mut self,
        at: Point,
        hit: Option<EntityRef>,
        store: &GraphStore,
    ) -> Option<Effect> {
        match self.state {
            InteractionState::Dragging(_) => None,
            InteractionState::ConnectAuthoring { pending_source } => match hit {
                Some(EntityRef::Node(id)) => match pending_source {
                    None => {
                        self.state = InteractionState::ConnectAuthoring {
                            pending_source: Some(id),
                        };
                        None
                    }
                    Some(source) if source != id => {
                        self.state = InteractionState::ConnectAuthoring {
                            pending_source: None,
                        };
                        Some(Effect::Connect {
                            from: source,
                            to: id,
                        })
                    }
                    Some(_) => None,
                },
                Some(EntityRef::Connection(_)) => None,
                None => {
                    self.state = InteractionState::Idle;
                    None
                }
            },
            _ => {
                self.state = match hit {
                    Some(EntityRef::Node(id)) => {
                        let origin = store.node(id)?.position();
                        InteractionState::Dragging(DragState {
                            node: id,
                            grab_offset: Point::new(at.x - origin.x, at.y - origin.y),
                            origin,
                            current: origin,
                        })
                    }
                    Some(EntityRef::Connection(id)) => InteractionState::ConnectionSelected(id),
                    None => InteractionState::BoxSelecting {
                        origin: at,
                        current: at,
                    },
                };
                None
            }
        }
    }

    fn pointer_move(&mut self, at: Point, store: &GraphStore, viewport: &Viewport) -> Option<Effect> {
        match &mut self.state {
            InteractionState::Dragging(drag) => {
                let node = store.node(drag.node)?;
                let mut target = Point::new(at.x - drag.grab_offset.x, at.y - drag.grab_offset.y);
                if viewport.grid.snap_to_grid {
                    target = snap_to_grid(target, viewport.grid.size);
                }
                let target = clamp_to_canvas(target, node.dimensions(), viewport.canvas);
                if target == drag.current {
                    return None;
                }
                drag.current = target;
                Some(Effect::MoveNode {
                    node: drag.node,
                    to: target,
                })
            }
            InteractionState::BoxSelecting { current, .. } => {
                *current = at;
                None
            }
            _ => None,
        }
    }

    fn pointer_up(&mut self, at: Point, store: &GraphStore) -> Option<Effect> {
        match self.state {
            InteractionState::Dragging(drag) => {
                self.state = InteractionState::NodeSelected(drag.node);
                (drag.current != drag.origin).then_some(Effect::CommitMove { node: drag.node })
            }
            InteractionState::BoxSelecting { origin, .. } => {
                let rect = Rect::from_corners(origin, at);
                let inside = nodes_within(store, &rect);
                // Only a single enclosed node becomes the selection.
                self.state = match inside.as_slice() {
                    [only] => InteractionState::NodeSelected(*only),
                    _ => InteractionState::Idle,
                };
                None
            }
            _ => None,
        }
    }

    fn key_press(&mut self, key: Key, modifiers: Modifiers) -> Option<Effect> {
        if key == Key::Escape {
            return self.cancel();
        }
        if self.is_dragging() {
            return None;
        }

        match key {
            Key::Delete | Key::Backspace => self.selection().entity().map(Effect::Remove),
            Key::Char(ch) if modifiers.ctrl => match ch.to_ascii_lowercase() {
                'z' if modifiers.shift => Some(Effect::Redo),
                'z' => Some(Effect::Undo),
                'y' => Some(Effect::Redo),
                'd' => match self.selection() {
                    Selection::Node(id) => Some(Effect::Duplicate(id)),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        }
    }
}
