//! Line-oriented console front-end.
//!
//! ```text
//! BROADSIDE_URL=ws://127.0.0.1:18080/ws cargo run -p broadside-console
//! ```
//!
//! `BROADSIDE_CONFIG` may point at a JSON file with any subset of the
//! client configuration. `RUST_LOG` controls log output (stderr).

use std::error::Error;

use broadside::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const GRID: i32 = 10;

const HELP: &str = "commands: create | search | join CODE | place | fire X Y | retry | menu | quit";

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn load_config() -> Result<ClientConfig, Box<dyn Error>> {
    let mut config = match std::env::var("BROADSIDE_CONFIG") {
        Ok(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        Err(_) => ClientConfig::default(),
    };
    if let Ok(url) = std::env::var("BROADSIDE_URL") {
        config = config.with_server_url(url);
    }
    Ok(config)
}

/// A fixed legal fleet: one 4-deck, two 3-deck, three 2-deck, four 1-deck.
fn default_layout() -> Vec<Vec<Coordinate>> {
    let ship = |x: i32, y: i32, len: i32| -> Vec<Coordinate> {
        (x..x + len).map(|x| Coordinate::new(x, y)).collect()
    };
    vec![
        ship(0, 0, 4),
        ship(5, 0, 3),
        ship(0, 2, 3),
        ship(4, 2, 2),
        ship(7, 2, 2),
        ship(0, 4, 2),
        ship(3, 4, 1),
        ship(5, 4, 1),
        ship(7, 4, 1),
        ship(9, 4, 1),
    ]
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

enum Command {
    Create,
    Search,
    Join(String),
    Place,
    Fire(Coordinate),
    Retry,
    Menu,
    Quit,
}

fn parse(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(HELP.to_owned());
    };
    let command = match verb {
        "create" => Command::Create,
        "search" => Command::Search,
        "join" => Command::Join(words.next().ok_or("join needs a room code")?.to_owned()),
        "place" => Command::Place,
        "fire" => {
            let mut axis = || -> Result<i32, String> {
                words
                    .next()
                    .ok_or("fire needs X and Y")?
                    .parse()
                    .map_err(|e| format!("bad coordinate: {e}"))
            };
            let x = axis()?;
            let y = axis()?;
            Command::Fire(Coordinate::new(x, y))
        }
        "retry" => Command::Retry,
        "menu" => Command::Menu,
        "quit" | "exit" => Command::Quit,
        _ => return Err(HELP.to_owned()),
    };
    Ok(command)
}

async fn dispatch(client: &ClientHandle, command: Command) -> Result<bool, ClientError> {
    match command {
        Command::Create => client.open_create().await?,
        Command::Search => client.open_search().await?,
        Command::Join(code) => client.join(code).await?,
        Command::Place => client.commit_placement(default_layout()).await?,
        Command::Fire(at) => client.fire(at).await?,
        Command::Retry => client.retry().await?,
        Command::Menu => client.back_to_menu().await?,
        Command::Quit => {
            client.shutdown().await?;
            return Ok(false);
        }
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn glyph(state: CellState) -> char {
    match state {
        CellState::Water => '.',
        CellState::Ship => '#',
        CellState::Miss => 'o',
        CellState::Hit => 'x',
        CellState::Sunk => 'X',
    }
}

fn render_boards(own: &BoardView, opponent: &BoardView) {
    println!("   own{:18}opponent", "");
    for y in 0..GRID {
        let row = |board: &BoardView| -> String {
            (0..GRID)
                .map(|x| glyph(board.cell(Coordinate::new(x, y))))
                .flat_map(|c| [c, ' '])
                .collect()
        };
        println!("{y:>2} {}  {}", row(own), row(opponent));
    }
}

fn render(view: &ClientView) {
    match view.screen {
        Screen::Loading => println!("connecting..."),
        Screen::Error => println!("connection lost. type `retry`"),
        Screen::MainMenu => println!("main menu. {HELP}"),
        Screen::Search => println!("enter a room code: join CODE"),
        Screen::Create => match &view.room_code {
            Some(code) => println!("room {code}. waiting for an opponent..."),
            None => println!("creating a room..."),
        },
        Screen::Build => println!("place your fleet: place"),
        Screen::InGame => {
            render_boards(&view.own_board, &view.opponent_board);
            if view.my_turn {
                println!("your turn: fire X Y");
            } else if view.shot_pending {
                println!("waiting for the shot result...");
            } else {
                println!("opponent's turn");
            }
        }
        Screen::EndGame => {
            render_boards(&view.own_board, &view.opponent_board);
            if let Some(outcome) = &view.outcome {
                let s = &outcome.stats;
                println!(
                    "{}! shots {} hits {} misses {} accuracy {:.1}% sunk {}",
                    if outcome.won { "victory" } else { "defeat" },
                    s.shots,
                    s.hits,
                    s.misses,
                    s.accuracy,
                    s.sunk_ships
                );
            }
            println!("type `menu` to play again");
        }
    }
    if let Some(notice) = &view.notice {
        println!("! {notice}");
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    tracing::info!(url = %config.server_url, "starting console client");
    let (client, mut view) = Client::start(config);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = view.borrow_and_update().clone();
                render(&current);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    client.shutdown().await?;
                    break;
                };
                match parse(&line) {
                    Ok(command) => {
                        if !dispatch(&client, command).await? {
                            break;
                        }
                    }
                    Err(msg) => println!("{msg}"),
                }
            }
        }
    }
    Ok(())
}
