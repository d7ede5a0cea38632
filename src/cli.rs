use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use flowdraw::script::run_script;
use flowdraw::{DiagramDocument, Editor, EditorConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, Clone)]
enum OutputDestination {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Parser)]
#[command(
    name = "flowdraw",
    version,
    about = "Create, inspect and script node-and-edge diagrams."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write an empty diagram document.
    New(NewArgs),
    /// Print the nodes and connections of a diagram.
    Show(ShowArgs),
    /// Run an edit script against a diagram and save the result.
    Apply(ApplyArgs),
}

#[derive(Debug, Args)]
struct NewArgs {
    /// Path of the document to create. Use '-' to write to stdout.
    #[arg(short = 'o', long = "output")]
    output: String,

    /// Theme stored in the new document.
    #[arg(long = "theme")]
    theme: Option<String>,

    /// Overwrite the output file if it already exists.
    #[arg(long = "force", action = ArgAction::SetTrue)]
    force: bool,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// Path to the diagram document. Use '-' to read from stdin.
    #[arg(short = 'i', long = "input")]
    input: Option<String>,

    /// Print the full render state as JSON.
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Args)]
struct ApplyArgs {
    /// Path to the diagram document. Use '-' to read from stdin.
    #[arg(short = 'i', long = "input")]
    input: String,

    /// Path to the edit script. Use '-' to read from stdin.
    #[arg(short = 's', long = "script")]
    script: String,

    /// Where to write the result (defaults to the input file). Use '-' for stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// JSON editor configuration.
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Snap dragged nodes to the grid.
    #[arg(long = "snap", action = ArgAction::SetTrue)]
    snap: bool,

    #[arg(long = "canvas-width")]
    canvas_width: Option<f32>,

    #[arg(long = "canvas-height")]
    canvas_height: Option<f32>,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,
}

pub fn dispatch() -> Result<()> {
    match Cli::parse().command {
        Command::New(args) => run_new(args),
        Command::Show(args) => run_show(args),
        Command::Apply(args) => run_apply(args),
    }
}

fn run_new(args: NewArgs) -> Result<()> {
    let mut config = EditorConfig::default();
    if let Some(theme) = args.theme {
        config.theme = theme;
    }
    config.validate()?;

    let destination = parse_output(Some(&args.output))?;
    if let OutputDestination::File(path) = &destination {
        if path.exists() && !args.force {
            bail!(
                "'{}' already exists; pass --force to overwrite it",
                path.display()
            );
        }
    }

    let editor = Editor::new(config);
    let json = editor.to_json()?;
    write_output(destination, json.as_bytes(), args.quiet)
}

fn run_show(args: ShowArgs) -> Result<()> {
    let source = parse_input(args.input.as_deref())?;
    let document = load_document(&source)?;
    let editor = Editor::open(EditorConfig::default(), &document)?;

    if args.json {
        let json = serde_json::to_string_pretty(&editor.view())
            .context("failed to serialize diagram view")?;
        println!("{json}");
        return Ok(());
    }

    let view = editor.view();
    println!(
        "{} node(s), {} connection(s), theme {}",
        view.nodes.len(),
        view.connections.len(),
        view.theme
    );
    for node in view.nodes {
        println!(
            "  node {} [{} {} {}] \"{}\" at ({}, {})",
            node.id,
            node.kind.as_str(),
            node.size.as_str(),
            node.color,
            node.text,
            node.x,
            node.y
        );
    }
    for routed in &view.routes {
        if let Some(conn) = view.connections.iter().find(|c| c.id == routed.connection) {
            println!(
                "  connection {}: {} -> {} ({})",
                conn.id,
                conn.from,
                conn.to,
                routed.route.direction.as_str()
            );
        }
    }
    Ok(())
}

fn run_apply(args: ApplyArgs) -> Result<()> {
    let input = parse_input(Some(&args.input))?;
    let script_source = parse_input(Some(&args.script))?;
    if input == InputSource::Stdin && script_source == InputSource::Stdin {
        bail!("the diagram and the script cannot both be read from stdin");
    }

    let mut config = match &args.config {
        Some(path) => EditorConfig::from_path(path)?,
        None => EditorConfig::default(),
    };
    if args.snap {
        config.grid.snap_to_grid = true;
    }
    if let Some(width) = args.canvas_width {
        config.canvas.width = width;
    }
    if let Some(height) = args.canvas_height {
        config.canvas.height = height;
    }
    config.validate()?;

    let document = load_document(&input)?;
    let script = read_source(&script_source, "script")?;
    let mut editor = Editor::open(config, &document)?;
    let report = run_script(&mut editor, &script)?;

    let destination = match args.output.as_deref() {
        Some(output) => parse_output(Some(output))?,
        None => match &input {
            InputSource::File(path) => OutputDestination::File(path.clone()),
            InputSource::Stdin => OutputDestination::Stdout,
        },
    };
    let to_file = matches!(destination, OutputDestination::File(_));
    write_output(destination, editor.to_json()?.as_bytes(), args.quiet)?;

    if to_file && !args.quiet {
        println!(
            "Applied {} command(s), skipped {}: {} node(s), {} connection(s)",
            report.applied,
            report.skipped.len(),
            editor.nodes().len(),
            editor.connections().len()
        );
        for (line, err) in &report.skipped {
            println!("  line {line}: {err}");
        }
    }
    Ok(())
}

fn parse_input(input: Option<&str>) -> Result<InputSource> {
    match input {
        Some("-") | None => Ok(InputSource::Stdin),
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if !path.exists() {
                return Err(anyhow!("input file '{path_str}' does not exist"));
            }
            Ok(InputSource::File(path))
        }
    }
}

fn parse_output(output: Option<&str>) -> Result<OutputDestination> {
    match output {
        Some("-") | None => Ok(OutputDestination::Stdout),
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(anyhow!(
                        "output directory '{}' does not exist",
                        parent.display()
                    ));
                }
            }
            Ok(OutputDestination::File(path))
        }
    }
}

fn read_source(source: &InputSource, what: &str) -> Result<String> {
    match source {
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
        InputSource::File(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {what} '{}'", path.display())),
    }
}

fn load_document(source: &InputSource) -> Result<DiagramDocument> {
    let contents = read_source(source, "diagram")?;
    if contents.trim().is_empty() {
        bail!("no diagram document supplied");
    }
    let document = DiagramDocument::from_json(&contents)?;
    Ok(document)
}

fn write_output(dest: OutputDestination, bytes: &[u8], quiet: bool) -> Result<()> {
    match dest {
        OutputDestination::Stdout => {
            let mut stdout = io::stdout();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
        OutputDestination::File(path) => {
            fs::write(&path, bytes)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            if !quiet {
                println!("Saved diagram -> {}", path.display());
            }
        }
    }
    Ok(())
}
