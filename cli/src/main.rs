use std::path::PathBuf;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use foraging::{
    FileStore, GalleryStore, MoveArbiter, SessionConfig, SessionEvent, SessionHooks, SessionView,
};
use foraging_core::room_id::{RoomId, ROOM_ID_ALPHABET, ROOM_ID_LEN};
use foraging_core::{allowed_moves, is_movable, Cell, Shape};
use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "foraging-cli", version, about = "Tools for foraging rooms and shapes")]
struct Cli {
    /// Session config file (TOML). `FORAGING_*` variables override it.
    #[arg(long, global = true, env = "FORAGING_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Shape {
        #[command(subcommand)]
        command: ShapeCommand,
    },
    Rooms {
        #[command(subcommand)]
        command: RoomCommand,
    },
    Gallery {
        #[arg(long, env = "FORAGING_STORE_DIR", default_value = ".foraging")]
        store: PathBuf,
        #[command(subcommand)]
        command: GalleryCommand,
    },
    /// Plays a solo game from a move list such as `0:1,6;9:8,4`.
    Play {
        #[arg(long)]
        moves: String,
        /// Record the finished game in the gallery under this directory.
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ShapeCommand {
    /// Validates a shape given as `x,y;x,y;...`.
    Check {
        #[arg(long)]
        cells: String,
    },
    /// Lists where one piece may move.
    Moves {
        #[arg(long)]
        cells: Option<String>,
        #[arg(long)]
        piece: usize,
    },
}

#[derive(Subcommand)]
enum RoomCommand {
    NewId,
    Check { room_id: String },
}

#[derive(Subcommand)]
enum GalleryCommand {
    List,
    Clear,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = SessionConfig::load(cli.config.as_deref())?;
    let grid = config.grid();

    match cli.command {
        Commands::Shape { command } => match command {
            ShapeCommand::Check { cells } => {
                let shape = Shape::from_cells(parse_cells(&cells)?);
                match shape.validate_connected(grid) {
                    Ok(()) => println!("ok: {} cells, connected", shape.len()),
                    Err(err) => {
                        println!("invalid: {err}");
                        std::process::exit(1);
                    }
                }
            }
            ShapeCommand::Moves { cells, piece } => {
                let shape = match cells.as_deref() {
                    Some(raw) => Shape::from_cells(parse_cells(raw)?),
                    None => Shape::line(grid),
                };
                shape.validate(grid)?;
                if !is_movable(&shape, piece) {
                    println!("piece {piece} holds the shape together");
                    return Ok(());
                }
                let allowed = allowed_moves(&shape, piece, grid);
                println!("piece {piece}: {} destinations", allowed.len());
                for cell in allowed {
                    println!("  {cell}");
                }
            }
        },
        Commands::Rooms { command } => match command {
            RoomCommand::NewId => println!("{}", generate_room_id()),
            RoomCommand::Check { room_id } => match RoomId::parse(&room_id) {
                Ok(id) => println!("ok: {id}"),
                Err(err) => {
                    println!("invalid: {err}");
                    std::process::exit(1);
                }
            },
        },
        Commands::Gallery { store, command } => {
            let mut gallery = GalleryStore::new(Box::new(FileStore::new(&store)));
            match command {
                GalleryCommand::List => {
                    let records = gallery.load();
                    if records.is_empty() {
                        println!("gallery is empty");
                    }
                    for record in records {
                        println!(
                            "{} moves={} participants={} at={}",
                            record.room_id,
                            record.move_count,
                            record.participants.len(),
                            record.timestamp_ms
                        );
                        print_matrix(&record.grid);
                    }
                }
                GalleryCommand::Clear => {
                    gallery.clear()?;
                    info!(store = %store.display(), "gallery cleared");
                }
            }
        }
        Commands::Play { moves, store } => {
            let mut arbiter = MoveArbiter::solo(config);
            if let Some(store) = store {
                arbiter = arbiter.with_gallery(GalleryStore::new(Box::new(FileStore::new(store))));
            }
            arbiter.set_hooks(SessionHooks {
                on_event: Rc::new(|event: &SessionEvent, view: &SessionView| {
                    if let SessionEvent::Committed { piece, destination } = event {
                        println!("move {}: piece {piece} -> {destination}", view.move_count());
                    }
                }),
            });
            let now = unix_ms();
            for (step, (piece, destination)) in parse_moves(&moves)?.into_iter().enumerate() {
                let at = now + step as u64;
                if let Err(err) = arbiter
                    .select(piece, at)
                    .and_then(|()| arbiter.commit(destination, at))
                {
                    warn!(piece, %destination, %err, "move refused");
                    arbiter.deselect(at);
                }
            }
            arbiter.complete_shape(now + 1_000)?;
            print_matrix(&arbiter.shape().to_matrix(grid));
        }
    }

    Ok(())
}

fn generate_room_id() -> String {
    let mut rng = rand::rng();
    let alphabet = ROOM_ID_ALPHABET.as_bytes();
    let mut id = String::with_capacity(ROOM_ID_LEN);
    for _ in 0..ROOM_ID_LEN {
        let idx = rng.random_range(0..alphabet.len());
        id.push(alphabet[idx] as char);
    }
    id
}

fn parse_cell(raw: &str) -> Result<Cell, Box<dyn std::error::Error>> {
    let (x, y) = raw
        .trim()
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got {raw:?}"))?;
    Ok(Cell::new(x.trim().parse()?, y.trim().parse()?))
}

fn parse_cells(raw: &str) -> Result<Vec<Cell>, Box<dyn std::error::Error>> {
    raw.split(';')
        .filter(|part| !part.trim().is_empty())
        .map(parse_cell)
        .collect()
}

fn parse_moves(raw: &str) -> Result<Vec<(u32, Cell)>, Box<dyn std::error::Error>> {
    raw.split(';')
        .filter(|part| !part.trim().is_empty())
        .map(|part| -> Result<(u32, Cell), Box<dyn std::error::Error>> {
            let (piece, cell) = part
                .split_once(':')
                .ok_or_else(|| format!("expected piece:x,y but got {part:?}"))?;
            Ok((piece.trim().parse()?, parse_cell(cell)?))
        })
        .collect()
}

fn print_matrix(matrix: &[Vec<u8>]) {
    for row in matrix {
        let line: String = row
            .iter()
            .map(|value| if *value == 0 { '.' } else { '#' })
            .collect();
        println!("  {line}");
    }
}

fn unix_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
