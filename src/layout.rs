use serde::Serialize;

use crate::*;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Rect {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Rect {
    /// Builds the rectangle spanned by two corner points given in any order.
    pub fn from_corners(a: Point, b: Point) -> Rect {
        Rect {
            min_x: a.x.min(b.x),
            max_x: a.x.max(b.x),
            min_y: a.y.min(b.y),
            max_y: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point {
            x: (self.min_x + self.max_x) / 2.0,
            y: (self.min_y + self.max_y) / 2.0,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        let eps = 1e-3_f32;
        point.x >= self.min_x - eps
            && point.x <= self.max_x + eps
            && point.y >= self.min_y - eps
            && point.y <= self.max_y + eps
    }

    /// True when `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

/// Nodes are positioned by their top-left corner.
pub fn node_rect(node: &Node) -> Rect {
    let (width, height) = node.dimensions();
    Rect {
        min_x: node.x,
        max_x: node.x + width,
        min_y: node.y,
        max_y: node.y + height,
    }
}

pub fn node_dimensions(size: NodeSize) -> (f32, f32) {
    size.dimensions()
}

pub fn node_center(node: &Node) -> Point {
    node_rect(node).center()
}

/// Where a freshly created node lands when the caller gives no position.
pub fn default_position(existing: usize) -> Point {
    Point {
        x: PLACEMENT_START + existing as f32 * PLACEMENT_STEP_X,
        y: PLACEMENT_START + (existing % PLACEMENT_ROWS) as f32 * PLACEMENT_STEP_Y,
    }
}

pub fn columns_for_width(container_width: f32) -> usize {
    let columns = (container_width / HORIZONTAL_SPACING).floor();
    if columns.is_finite() && columns >= 1.0 {
        columns as usize
    } else {
        1
    }
}

/// Grid positions for `count` nodes in list order, row-major.
pub fn grid_positions(count: usize, container_width: f32) -> Vec<Point> {
    let columns = columns_for_width(container_width);
    (0..count)
        .map(|index| {
            let col = index % columns;
            let row = index / columns;
            Point {
                x: LAYOUT_MARGIN + col as f32 * HORIZONTAL_SPACING,
                y: LAYOUT_MARGIN + row as f32 * ROW_HEIGHT,
            }
        })
        .collect()
}

/// Returns the nodes repositioned on a grid that follows their list order.
pub fn auto_layout(nodes: &[Node], container_width: f32) -> Vec<Node> {
    nodes
        .iter()
        .zip(grid_positions(nodes.len(), container_width))
        .map(|(node, position)| {
            let mut placed = node.clone();
            placed.set_position(position);
            placed
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteDirection {
    Left,
    Right,
    Up,
    Down,
}

impl RouteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteDirection::Left => "left",
            RouteDirection::Right => "right",
            RouteDirection::Up => "up",
            RouteDirection::Down => "down",
        }
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, RouteDirection::Left | RouteDirection::Right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeRoute {
    pub from: Point,
    pub to: Point,
    pub direction: RouteDirection,
    pub arrow: Point,
}

/// Anchors an edge on the facing borders of its two nodes.
///
/// The dominant axis between the node centers picks horizontal or vertical
/// routing; a tie routes vertically. The arrowhead sits `ARROW_OFFSET` back
/// from the target anchor, on the source side of the border.
pub fn compute_edge_anchors(from: &Node, to: &Node) -> EdgeRoute {
    let from_rect = node_rect(from);
    let to_rect = node_rect(to);
    let from_center = from_rect.center();
    let to_center = to_rect.center();

    let dx = to_center.x - from_center.x;
    let dy = to_center.y - from_center.y;

    if dx.abs() > dy.abs() {
        let (start, end, direction) = if dx > 0.0 {
            (
                Point::new(from_rect.max_x, from_center.y),
                Point::new(to_rect.min_x, to_center.y),
                RouteDirection::Right,
            )
        } else {
            (
                Point::new(from_rect.min_x, from_center.y),
                Point::new(to_rect.max_x, to_center.y),
                RouteDirection::Left,
            )
        };
        let arrow_x = match direction {
            RouteDirection::Right => end.x - ARROW_OFFSET,
            _ => end.x + ARROW_OFFSET,
        };
        EdgeRoute {
            from: start,
            to: end,
            direction,
            arrow: Point::new(arrow_x, end.y),
        }
    } else {
        let (start, end, direction) = if dy > 0.0 {
            (
                Point::new(from_center.x, from_rect.max_y),
                Point::new(to_center.x, to_rect.min_y),
                RouteDirection::Down,
            )
        } else {
            (
                Point::new(from_center.x, from_rect.min_y),
                Point::new(to_center.x, to_rect.max_y),
                RouteDirection::Up,
            )
        };
        let arrow_y = match direction {
            RouteDirection::Down => end.y - ARROW_OFFSET,
            _ => end.y + ARROW_OFFSET,
        };
        EdgeRoute {
            from: start,
            to: end,
            direction,
            arrow: Point::new(end.x, arrow_y),
        }
    }
}

pub fn snap_to_grid(point: Point, pitch: f32) -> Point {
    if pitch <= 0.0 || !pitch.is_finite() {
        return point;
    }
    Point {
        x: (point.x / pitch).round() * pitch,
        y: (point.y / pitch).round() * pitch,
    }
}

/// Keeps a box of `size` with its top-left at `point` inside the canvas.
pub fn clamp_to_canvas(point: Point, size: (f32, f32), canvas: CanvasBounds) -> Point {
    let max_x = (canvas.width - size.0).max(0.0);
    let max_y = (canvas.height - size.1).max(0.0);
    Point {
        x: point.x.clamp(0.0, max_x),
        y: point.y.clamp(0.0, max_y),
    }
}

pub fn distance_to_segment(point: Point, a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq <= f32::EPSILON {
        0.0
    } else {
        (((point.x - a.x) * dx + (point.y - a.y) * dy) / length_sq).clamp(0.0, 1.0)
    };
    let closest_x = a.x + t * dx;
    let closest_y = a.y + t * dy;
    ((point.x - closest_x).powi(2) + (point.y - closest_y).powi(2)).sqrt()
}
