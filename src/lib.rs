use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod graph;
pub mod history;
pub mod interaction;
pub mod layout;
pub mod script;
pub mod utils;

pub use config::*;
pub use document::*;
pub use editor::*;
pub use error::{EditorError, Result};
pub use graph::*;
pub use history::*;
pub use interaction::*;
pub use layout::*;
pub use utils::*;

pub const MAX_NODE_TEXT_LEN: usize = 50;
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_CANVAS_WIDTH: f32 = 800.0;
pub const DEFAULT_CANVAS_HEIGHT: f32 = 600.0;
pub const DEFAULT_GRID_SIZE: f32 = 20.0;
pub const DEFAULT_THEME: &str = "light";
pub const HORIZONTAL_SPACING: f32 = 200.0;
pub const ROW_HEIGHT: f32 = 120.0;
pub const LAYOUT_MARGIN: f32 = 50.0;
pub const PLACEMENT_START: f32 = 100.0;
pub const PLACEMENT_STEP_X: f32 = 150.0;
pub const PLACEMENT_STEP_Y: f32 = 100.0;
pub const PLACEMENT_ROWS: usize = 3;
pub const DUPLICATE_OFFSET_X: f32 = 150.0;
pub const DUPLICATE_OFFSET_Y: f32 = 50.0;
pub const ARROW_OFFSET: f32 = 10.0;
pub const EDGE_HIT_TOLERANCE: f32 = 6.0;
pub const MIN_ZOOM: f32 = 0.25;
pub const MAX_ZOOM: f32 = 4.0;

pub type NodeId = u64;
pub type ConnectionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeKind {
    #[default]
    Process,
    Decision,
    Start,
    End,
    Input,
    Output,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Process,
        NodeKind::Decision,
        NodeKind::Start,
        NodeKind::End,
        NodeKind::Input,
        NodeKind::Output,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Process => "process",
            NodeKind::Decision => "decision",
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::Input => "input",
            NodeKind::Output => "output",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw))
    }

    pub fn default_fill_color(&self) -> &'static str {
        match self {
            NodeKind::Process => "#fde68a",
            NodeKind::Decision => "#fbcfe8",
            NodeKind::Start => "#c6f6d5",
            NodeKind::End => "#fed7d7",
            NodeKind::Input => "#c4f1f9",
            NodeKind::Output => "#e9d8fd",
        }
    }
}

impl Serialize for NodeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(NodeKind::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(kind = %raw, "unknown node type, using process");
            NodeKind::Process
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl NodeSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeSize::Small => "small",
            NodeSize::Medium => "medium",
            NodeSize::Large => "large",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "small" => Some(NodeSize::Small),
            "medium" => Some(NodeSize::Medium),
            "large" => Some(NodeSize::Large),
            _ => None,
        }
    }

    /// Width and height of a node of this size.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            NodeSize::Small => (100.0, 50.0),
            NodeSize::Medium => (150.0, 60.0),
            NodeSize::Large => (200.0, 80.0),
        }
    }
}

impl Serialize for NodeSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// Unknown sizes fall back to medium so older documents keep loading.
impl<'de> Deserialize<'de> for NodeSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(NodeSize::parse(&raw).unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub color: String,
    pub size: NodeSize,
    pub x: f32,
    pub y: f32,
}

impl Node {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn set_position(&mut self, point: Point) {
        self.x = point.x;
        self.y = point.y;
    }

    pub fn dimensions(&self) -> (f32, f32) {
        node_dimensions(self.size)
    }

    pub fn bounds(&self) -> Rect {
        node_rect(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: NodeId,
    pub to: NodeId,
}

impl Connection {
    pub fn touches(&self, node: NodeId) -> bool {
        self.from == node || self.to == node
    }

    /// True when this connection joins `a` and `b` in either direction.
    pub fn joins(&self, a: NodeId, b: NodeId) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }
}

/// A reference to one diagram entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Node(NodeId),
    Connection(ConnectionId),
}
