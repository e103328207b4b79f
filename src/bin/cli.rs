//! caseboard CLI - headless interface to the investigation board.
//!
//! Loads a board JSON file, applies one operation, and saves it back.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use caseboard_lib::{Board, GestureOutcome, Group, NetLookup, Node, Status};

#[derive(Parser)]
#[command(name = "caseboard", about = "Local OSINT node-and-edge board")]
struct Cli {
    /// Path to the board JSON file
    #[arg(short, long, default_value = "board.json")]
    board: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new board file
    Init {
        /// Seed the demo graph instead of an empty board
        #[arg(long)]
        demo: bool,
    },
    /// List nodes and edges
    Show {
        /// Print the raw JSON document instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Add a node
    Add {
        label: String,
        #[arg(short, long, default_value = "note")]
        group: String,
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        #[arg(long, default_value_t = 0.0)]
        y: f64,
    },
    /// Edit fields of a node (label or id)
    Edit {
        node: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        confidence: Option<String>,
        /// Comma-separated tag list; replaces the node's tags
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Connect two nodes with the two-step gesture
    Connect {
        source: String,
        target: String,
        #[arg(short, long)]
        label: Option<String>,
    },
    /// Change the label of the edge from source to target
    EditEdge {
        source: String,
        target: String,
        label: String,
    },
    /// Move a node to a new position
    Move {
        node: String,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    /// Delete a node (and its edges)
    Delete { node: String },
    /// Delete one edge by its (source, target, label) triple
    DeleteEdge {
        source: String,
        target: String,
        #[arg(short, long, default_value = "")]
        label: String,
    },
    /// Attach a URL to a node
    Attach {
        node: String,
        url: String,
        #[arg(short, long, default_value = "link")]
        label: String,
    },
    /// Remove a node's attachment by index (see `show`)
    Detach { node: String, index: usize },
    /// List nodes matching a query (empty query lists all)
    Search {
        #[arg(default_value = "")]
        query: String,
    },
    /// Run best-effort enrichment lookups on a node
    Enrich { node: String },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    if let Command::Init { demo } = cli.command {
        let board = if demo { Board::seed_example() } else { Board::new() };
        board
            .save_to(&cli.board)
            .map_err(|e| e.to_string())?;
        println!("Created {} ({} nodes)", cli.board.display(), board.graph.nodes.len());
        return Ok(());
    }

    let mut board = Board::new();
    board.load_from(&cli.board).map_err(|e| e.to_string())?;

    match cli.command {
        Command::Init { .. } => unreachable!("handled above"),

        Command::Show { json } => {
            if json {
                let doc = caseboard_lib::persist::to_json(&board.graph).map_err(|e| e.to_string())?;
                println!("{}", doc);
            } else {
                print_summary(&board);
            }
            return Ok(());
        }

        Command::Search { query } => {
            board.set_query(&query);
            for node in board.visible_nodes() {
                print_node_line(node);
            }
            return Ok(());
        }

        Command::Add { label, group, x, y } => {
            let group = Group::from_str(&group)
                .ok_or_else(|| format!("Unknown group '{}'", group))?;
            let id = board.add_node(x, y);
            board.form.set_label(&label);
            board.form.set_group(group);
            board.form_changed();
            println!("Added node {}", id);
        }

        Command::Edit { node, label, group, status, confidence, tags, notes } => {
            let id = resolve_node(&board, &node)?;
            board.select(Some(id));
            if let Some(v) = label {
                board.form.set_label(&v);
            }
            if let Some(v) = group {
                board
                    .form
                    .set_group(Group::from_str(&v).ok_or_else(|| format!("Unknown group '{}'", v))?);
            }
            if let Some(v) = status {
                board
                    .form
                    .set_status(Status::from_str(&v).ok_or_else(|| format!("Unknown status '{}'", v))?);
            }
            if let Some(v) = confidence {
                board.form.set_confidence(&v);
            }
            if let Some(v) = tags {
                board.form.set_tags(&v);
            }
            if let Some(v) = notes {
                board.form.set_notes(&v);
            }
            board.form_changed();
            print_node_line(board.selected_node().ok_or("node vanished")?);
        }

        Command::Connect { source, target, label } => {
            let source = resolve_node(&board, &source)?;
            let target = resolve_node(&board, &target)?;
            board.connect_click(source).map_err(|e| e.to_string())?;
            match board.connect_click(target).map_err(|e| e.to_string())? {
                GestureOutcome::Completed { source, target } => {
                    if board.finish_connection(source, target, label) {
                        println!("Connected {} -> {}", source, target);
                    } else {
                        println!("Edge already exists, nothing added");
                    }
                }
                GestureOutcome::Cancelled => {
                    println!("Source and target are the same node; gesture cancelled");
                }
                GestureOutcome::Armed(_) => unreachable!("second click cannot arm"),
            }
        }

        Command::EditEdge { source, target, label } => {
            let source = resolve_node(&board, &source)?;
            let target = resolve_node(&board, &target)?;
            if board.update_edge_label(source, target, &label) {
                println!("Relabelled edge {} -> {}", source, target);
            } else {
                return Err("No edge matches that (source, target)".to_string());
            }
        }

        Command::Move { node, x, y } => {
            let id = resolve_node(&board, &node)?;
            board.move_node(id, x, y);
            println!("Moved {} to ({}, {})", id, x, y);
        }

        Command::Delete { node } => {
            let id = resolve_node(&board, &node)?;
            board.delete_node(id);
            println!("Deleted {}", id);
        }

        Command::DeleteEdge { source, target, label } => {
            let source = resolve_node(&board, &source)?;
            let target = resolve_node(&board, &target)?;
            if board.delete_edge(source, target, &label) {
                println!("Deleted edge {} -> {}", source, target);
            } else {
                return Err("No edge matches that (source, target, label)".to_string());
            }
        }

        Command::Attach { node, url, label } => {
            let id = resolve_node(&board, &node)?;
            board.select(Some(id));
            board.add_attachment(&label, &url)?;
            println!("Attached {}", url);
        }

        Command::Detach { node, index } => {
            let id = resolve_node(&board, &node)?;
            board.select(Some(id));
            board.remove_attachment(index)?;
            println!("Removed attachment {}", index);
        }

        Command::Enrich { node } => {
            let id = resolve_node(&board, &node)?;
            let lookups = NetLookup::new()?;
            let summary = board.enrich(id, &lookups)?;
            println!(
                "Enrichment complete: {} tag(s), {} attachment(s)",
                summary.new_tags, summary.new_attachments
            );
        }
    }

    board.save_to(&cli.board).map_err(|e| e.to_string())
}

/// Accept a full UUID, a unique UUID prefix, or an exact label.
fn resolve_node(board: &Board, key: &str) -> Result<Uuid, String> {
    if let Ok(id) = Uuid::parse_str(key) {
        if board.graph.contains_node(id) {
            return Ok(id);
        }
        return Err(format!("No node with id {}", key));
    }

    let by_label: Vec<&Node> = board
        .graph
        .nodes
        .iter()
        .filter(|n| n.label == key)
        .collect();
    match by_label.len() {
        1 => return Ok(by_label[0].id),
        n if n > 1 => return Err(format!("Label '{}' is ambiguous ({} nodes)", key, n)),
        _ => {}
    }

    let by_prefix: Vec<&Node> = board
        .graph
        .nodes
        .iter()
        .filter(|n| n.id.to_string().starts_with(key))
        .collect();
    match by_prefix.len() {
        1 => Ok(by_prefix[0].id),
        0 => Err(format!("No node matches '{}'", key)),
        n => Err(format!("Id prefix '{}' is ambiguous ({} nodes)", key, n)),
    }
}

fn print_node_line(node: &Node) {
    let tags = if node.tags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", node.tags.join(", "))
    };
    println!(
        "{}  {:10} {:9} {:3}%  {}{}",
        node.id,
        node.group.as_str(),
        node.status.as_str(),
        node.confidence,
        node.label,
        tags
    );
}

fn print_summary(board: &Board) {
    println!("{} node(s), {} edge(s)", board.graph.nodes.len(), board.graph.edges.len());
    for node in &board.graph.nodes {
        print_node_line(node);
        for (i, a) in node.attachments.iter().enumerate() {
            println!("    [{}] {}  {}", i, a.label, a.url);
        }
    }
    for edge in &board.graph.edges {
        let name = |id: Uuid| {
            board
                .graph
                .node(id)
                .map(|n| n.label.clone())
                .unwrap_or_else(|| id.to_string())
        };
        let label = if edge.label.is_empty() {
            String::new()
        } else {
            format!("  \"{}\"", edge.label)
        };
        println!(
            "{} -> {} ({}){}",
            name(edge.source),
            name(edge.target),
            edge.style.as_str(),
            label
        );
    }
}
