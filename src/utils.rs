use crate::{EditorError, MAX_NODE_TEXT_LEN, Point, Result};

/// Trims a node label and checks it against the length limits.
pub fn normalize_node_text(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(EditorError::validation("node text must not be empty"));
    }
    let length = trimmed.chars().count();
    if length > MAX_NODE_TEXT_LEN {
        return Err(EditorError::validation(format!(
            "node text is {length} characters long; the limit is {MAX_NODE_TEXT_LEN}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Accepts `#rrggbb` or the short `#rgb` (any case) and returns the
/// lowercased six-digit form.
pub fn normalize_color(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix('#')
        .filter(|digits| digits.chars().all(|ch| ch.is_ascii_hexdigit()));
    match digits {
        Some(digits) if digits.len() == 6 => Ok(trimmed.to_ascii_lowercase()),
        Some(digits) if digits.len() == 3 => {
            let mut expanded = String::with_capacity(7);
            expanded.push('#');
            for ch in digits.chars() {
                let ch = ch.to_ascii_lowercase();
                expanded.push(ch);
                expanded.push(ch);
            }
            Ok(expanded)
        }
        _ => Err(EditorError::validation(format!(
            "color '{trimmed}' must look like #rrggbb or #rgb"
        ))),
    }
}

/// Rejects positions that a document could not store.
pub fn finite_position(point: Point) -> Result<Point> {
    if !point.x.is_finite() || !point.y.is_finite() {
        return Err(EditorError::validation(format!(
            "position ({}, {}) is not finite",
            point.x, point.y
        )));
    }
    Ok(point)
}

/// Parses `x,y` into a point.
pub fn parse_point(raw: &str) -> Result<Point> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| EditorError::validation(format!("expected 'x,y', found '{raw}'")))?;
    Ok(Point::new(parse_coordinate(x)?, parse_coordinate(y)?))
}

pub fn parse_coordinate(raw: &str) -> Result<f32> {
    let value: f32 = raw
        .trim()
        .parse()
        .map_err(|_| EditorError::validation(format!("'{}' is not a number", raw.trim())))?;
    if !value.is_finite() {
        return Err(EditorError::validation(format!(
            "'{}' is not a finite number",
            raw.trim()
        )));
    }
    Ok(value)
}
