//! Line-oriented edit scripts.
//!
//! Each non-blank line that does not start with `#` is one command:
//!
//! ```text
//! add type=start size=small Start here
//! add Process
//! connect 0 1
//! press 110 120
//! drag 300 120
//! release 300 120
//! key ctrl+z
//! ```

use crate::*;

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCommand {
    Add(NewNode),
    Connect { from: NodeId, to: NodeId },
    Disconnect(ConnectionId),
    Remove(NodeId),
    Rename { id: NodeId, text: String },
    Update { id: NodeId, patch: NodePatch },
    Move { id: NodeId, to: Point },
    Duplicate(NodeId),
    Layout(Option<f32>),
    Clear,
    Undo,
    Redo,
    ConnectMode(bool),
    Snap(bool),
    Zoom(f32),
    Theme(String),
    Select(Option<EntityRef>),
    Cancel,
    Input(InputEvent),
}

#[derive(Debug, thiserror::Error)]
#[error("line {line}: {source}")]
pub struct ScriptError {
    pub line: usize,
    #[source]
    pub source: EditorError,
}

#[derive(Debug, Default)]
pub struct ScriptReport {
    pub applied: usize,
    /// Commands that named an entity which no longer exists.
    pub skipped: Vec<(usize, EditorError)>,
}

/// Parses one line; blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ScriptCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut tokens = line.split_whitespace();
    let Some(keyword) = tokens.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = tokens.collect();

    let name = keyword.to_ascii_lowercase();
    let command = match name.as_str() {
        "add" => ScriptCommand::Add(parse_add(&args)?),
        "connect" => {
            expect_args(keyword, &args, 2)?;
            ScriptCommand::Connect {
                from: parse_id(args[0])?,
                to: parse_id(args[1])?,
            }
        }
        "disconnect" => {
            expect_args(keyword, &args, 1)?;
            ScriptCommand::Disconnect(parse_id(args[0])?)
        }
        "remove" => {
            expect_args(keyword, &args, 1)?;
            ScriptCommand::Remove(parse_id(args[0])?)
        }
        "rename" => {
            if args.len() < 2 {
                return Err(EditorError::validation("rename expects an id and new text"));
            }
            ScriptCommand::Rename {
                id: parse_id(args[0])?,
                text: args[1..].join(" "),
            }
        }
        "update" => {
            let Some((id, pairs)) = args.split_first() else {
                return Err(EditorError::validation("update expects an id"));
            };
            let mut patch = NodePatch::default();
            for pair in pairs {
                apply_field(&mut patch, pair)?;
            }
            ScriptCommand::Update {
                id: parse_id(id)?,
                patch,
            }
        }
        "move" => {
            expect_args(keyword, &args, 3)?;
            ScriptCommand::Move {
                id: parse_id(args[0])?,
                to: Point::new(parse_coordinate(args[1])?, parse_coordinate(args[2])?),
            }
        }
        "duplicate" => {
            expect_args(keyword, &args, 1)?;
            ScriptCommand::Duplicate(parse_id(args[0])?)
        }
        "layout" => match args.as_slice() {
            [] => ScriptCommand::Layout(None),
            [width] => ScriptCommand::Layout(Some(parse_coordinate(width)?)),
            _ => return Err(EditorError::validation("layout takes at most a width")),
        },
        "clear" => ScriptCommand::Clear,
        "undo" => ScriptCommand::Undo,
        "redo" => ScriptCommand::Redo,
        "connect-mode" => {
            expect_args(keyword, &args, 1)?;
            ScriptCommand::ConnectMode(parse_switch(args[0])?)
        }
        "snap" => {
            expect_args(keyword, &args, 1)?;
            ScriptCommand::Snap(parse_switch(args[0])?)
        }
        "zoom" => {
            expect_args(keyword, &args, 1)?;
            ScriptCommand::Zoom(parse_coordinate(args[0])?)
        }
        "theme" => {
            expect_args(keyword, &args, 1)?;
            ScriptCommand::Theme(args[0].to_string())
        }
        "select" => match args.as_slice() {
            ["none"] => ScriptCommand::Select(None),
            ["node", id] => ScriptCommand::Select(Some(EntityRef::Node(parse_id(id)?))),
            ["connection", id] => {
                ScriptCommand::Select(Some(EntityRef::Connection(parse_id(id)?)))
            }
            _ => {
                return Err(EditorError::validation(
                    "select expects 'none', 'node <id>' or 'connection <id>'",
                ));
            }
        },
        "cancel" => ScriptCommand::Cancel,
        "press" | "drag" | "release" => {
            expect_args(keyword, &args, 2)?;
            let at = Point::new(parse_coordinate(args[0])?, parse_coordinate(args[1])?);
            ScriptCommand::Input(match name.as_str() {
                "press" => InputEvent::PointerDown { at, target: None },
                "drag" => InputEvent::PointerMove { at },
                _ => InputEvent::PointerUp { at },
            })
        }
        "key" => {
            expect_args(keyword, &args, 1)?;
            let (key, modifiers) = parse_key(args[0])?;
            ScriptCommand::Input(InputEvent::KeyPress { key, modifiers })
        }
        other => {
            return Err(EditorError::validation(format!("unknown command '{other}'")));
        }
    };

    Ok(Some(command))
}

pub fn parse_script(source: &str) -> std::result::Result<Vec<(usize, ScriptCommand)>, ScriptError> {
    let mut commands = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        match parse_line(line) {
            Ok(Some(command)) => commands.push((line_number, command)),
            Ok(None) => {}
            Err(source) => {
                return Err(ScriptError {
                    line: line_number,
                    source,
                });
            }
        }
    }
    Ok(commands)
}

/// Parses the whole script first, then applies it. Commands naming missing
/// entities are skipped; any other failure stops the run.
pub fn run_script(
    editor: &mut Editor,
    source: &str,
) -> std::result::Result<ScriptReport, ScriptError> {
    let commands = parse_script(source)?;
    let mut report = ScriptReport::default();
    for (line, command) in commands {
        match editor.apply_command(command) {
            Ok(()) => report.applied += 1,
            Err(err) if err.is_not_found() => {
                tracing::warn!(line, error = %err, "skipped command");
                report.skipped.push((line, err));
            }
            Err(source) => return Err(ScriptError { line, source }),
        }
    }
    Ok(report)
}

impl Editor {
    pub fn apply_command(&mut self, command: ScriptCommand) -> Result<()> {
        match command {
            ScriptCommand::Add(fields) => self.add_node(fields).map(|_| ()),
            ScriptCommand::Connect { from, to } => self.connect(from, to).map(|_| ()),
            ScriptCommand::Disconnect(id) => self
                .remove_connection(id)
                .map(|_| ())
                .ok_or(EditorError::ConnectionNotFound(id)),
            ScriptCommand::Remove(id) => self
                .remove_node(id)
                .map(|_| ())
                .ok_or(EditorError::NodeNotFound(id)),
            ScriptCommand::Rename { id, text } => self
                .update_node(
                    id,
                    NodePatch {
                        text: Some(text),
                        ..NodePatch::default()
                    },
                )
                .map(|_| ()),
            ScriptCommand::Update { id, patch } => self.update_node(id, patch).map(|_| ()),
            ScriptCommand::Move { id, to } => self.move_node(id, to).map(|_| ()),
            ScriptCommand::Duplicate(id) => self.duplicate_node(id).map(|_| ()),
            ScriptCommand::Layout(width) => {
                match width {
                    Some(width) => self.auto_layout_within(width),
                    None => self.auto_layout(),
                }
                Ok(())
            }
            ScriptCommand::Clear => {
                self.clear();
                Ok(())
            }
            ScriptCommand::Undo => {
                self.undo();
                Ok(())
            }
            ScriptCommand::Redo => {
                self.redo();
                Ok(())
            }
            ScriptCommand::ConnectMode(enabled) => {
                self.set_connect_mode(enabled);
                Ok(())
            }
            ScriptCommand::Snap(enabled) => {
                self.set_snap_to_grid(enabled);
                Ok(())
            }
            ScriptCommand::Zoom(zoom) => {
                self.set_zoom(zoom);
                Ok(())
            }
            ScriptCommand::Theme(theme) => self.set_theme(&theme),
            ScriptCommand::Select(entity) => self.select(entity),
            ScriptCommand::Cancel => {
                self.cancel();
                Ok(())
            }
            ScriptCommand::Input(event) => self.handle_event(&event).map(|_| ()),
        }
    }
}

fn expect_args(keyword: &str, args: &[&str], count: usize) -> Result<()> {
    if args.len() != count {
        return Err(EditorError::validation(format!(
            "{keyword} expects {count} argument(s), found {}",
            args.len()
        )));
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| EditorError::validation(format!("'{raw}' is not a valid id")))
}

fn parse_switch(raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(EditorError::validation(format!(
            "expected on or off, found '{raw}'"
        ))),
    }
}

fn parse_kind(raw: &str) -> Result<NodeKind> {
    NodeKind::parse(raw)
        .ok_or_else(|| EditorError::validation(format!("unknown node type '{raw}'")))
}

fn parse_size(raw: &str) -> Result<NodeSize> {
    NodeSize::parse(raw)
        .ok_or_else(|| EditorError::validation(format!("unknown node size '{raw}'")))
}

fn parse_add(args: &[&str]) -> Result<NewNode> {
    let mut fields = NewNode::new(String::new());
    let mut rest = args;
    while let Some((first, tail)) = rest.split_first() {
        let Some((key, value)) = first.split_once('=') else {
            break;
        };
        match key {
            "type" => fields.kind = parse_kind(value)?,
            "size" => fields.size = parse_size(value)?,
            "color" => fields.color = Some(value.to_string()),
            "at" => fields.position = Some(parse_point(value)?),
            _ => break,
        }
        rest = tail;
    }
    fields.text = rest.join(" ");
    Ok(fields)
}

fn apply_field(patch: &mut NodePatch, pair: &str) -> Result<()> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| EditorError::validation(format!("expected key=value, found '{pair}'")))?;
    match key {
        "text" => patch.text = Some(value.to_string()),
        "type" => patch.kind = Some(parse_kind(value)?),
        "size" => patch.size = Some(parse_size(value)?),
        "color" => patch.color = Some(value.to_string()),
        "at" => patch.position = Some(parse_point(value)?),
        other => {
            return Err(EditorError::validation(format!("unknown field '{other}'")));
        }
    }
    Ok(())
}

fn parse_key(raw: &str) -> Result<(Key, Modifiers)> {
    let mut modifiers = Modifiers::NONE;
    let mut parts: Vec<&str> = raw.split('+').collect();
    let name = parts
        .pop()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| EditorError::validation(format!("empty key in '{raw}'")))?;
    for part in parts {
        match part.to_ascii_lowercase().as_str() {
            "ctrl" | "cmd" | "meta" => modifiers.ctrl = true,
            "shift" => modifiers.shift = true,
            "alt" => modifiers.alt = true,
            other => {
                return Err(EditorError::validation(format!("unknown modifier '{other}'")));
            }
        }
    }

    let key = match name.to_ascii_lowercase().as_str() {
        "escape" | "esc" => Key::Escape,
        "delete" | "del" => Key::Delete,
        "backspace" => Key::Backspace,
        "enter" | "return" => Key::Enter,
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Key::Char(ch),
                _ => return Err(EditorError::validation(format!("unknown key '{name}'"))),
            }
        }
    };
    Ok((key, modifiers))
}
