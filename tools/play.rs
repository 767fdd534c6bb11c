/// Play: run a story in the terminal in real time.
///
/// Usage: play [--story <path>] [--config <path>]
///
/// Press enter on an empty line to skip the typewriter. Set RUST_LOG=debug to
/// watch scene transitions on stderr.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;
use tracing_subscriber::EnvFilter;
use ultimo_engine::core::game::{Game, GameEvent};
use ultimo_engine::core::markup::strip_markup;
use ultimo_engine::core::screen::{Screen, SurfaceId};

/// Longest the loop sleeps without input or a due timer.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Prints surfaces as plain lines, appending only what each write adds.
#[derive(Default)]
struct TermScreen {
    next_id: u64,
    current: Option<SurfaceId>,
    shown: String,
}

impl Screen for TermScreen {
    fn create_surface(&mut self, _persistent: bool) -> SurfaceId {
        self.next_id += 1;
        SurfaceId(self.next_id)
    }

    fn write(&mut self, surface: SurfaceId, content: &str) {
        let plain = strip_markup(content);
        let mut out = io::stdout();
        if self.current != Some(surface) {
            if self.current.is_some() {
                let _ = writeln!(out);
            }
            self.current = Some(surface);
            self.shown.clear();
        }
        match plain.strip_prefix(self.shown.as_str()) {
            Some(rest) => {
                let _ = write!(out, "{rest}");
            }
            None => {
                let _ = write!(out, "\r{plain}");
            }
        }
        self.shown = plain;
        let _ = out.flush();
    }

    fn clear(&mut self, retain_persistent: bool) {
        let mut out = io::stdout();
        if retain_persistent {
            let _ = writeln!(out);
        } else {
            let _ = write!(out, "\x1b[2J\x1b[H");
        }
        self.current = None;
        self.shown.clear();
        let _ = out.flush();
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut story_path = "stories/ultimo.ron".to_string();
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return;
            }
            "--story" if i + 1 < args.len() => {
                i += 1;
                story_path = args[i].clone();
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut builder = Game::builder().story_file(&story_path);
    if let Some(ref path) = config_path {
        builder = builder.config_file(path);
    }
    let mut game = match builder.build() {
        Ok(game) => game,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    let mut screen = TermScreen::default();
    if let Err(e) = game.start(&mut screen) {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }

    let started = Instant::now();
    loop {
        let wait = game
            .next_deadline()
            .map(|at| Duration::from_millis(at.saturating_sub(game.now())))
            .map_or(IDLE_POLL, |d| d.min(IDLE_POLL));

        let step = match rx.recv_timeout(wait) {
            Ok(input) => game
                .advance(behind(&game, started), &mut screen)
                .and_then(|()| game.submit(&input, &mut screen)),
            Err(RecvTimeoutError::Timeout) => game.advance(behind(&game, started), &mut screen),
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if let Err(e) = step {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }

        for event in game.drain_events() {
            match event {
                GameEvent::SceneEntered { scene } => info!(%scene, "scene"),
                GameEvent::CountdownStarted { duration } => info!(duration, "countdown"),
                GameEvent::CountdownTick { remaining } => info!(remaining, "countdown tick"),
                GameEvent::CountdownExpired { scene } => info!(%scene, "countdown expired"),
            }
        }
    }
    println!();
}

/// How far the game clock lags wall time since `started`.
fn behind(game: &Game, started: Instant) -> u64 {
    let wall = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    wall.saturating_sub(game.now())
}

fn print_usage() {
    println!("Usage: play [--story <path>] [--config <path>]");
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultimo_engine::core::screen::MemoryScreen;

    #[test]
    fn clock_catches_up_to_wall_time() {
        let started = Instant::now()
            .checked_sub(Duration::from_millis(1_500))
            .unwrap();
        let mut game = Game::builder()
            .story_file("stories/ultimo.ron")
            .build()
            .unwrap();
        assert!(behind(&game, started) >= 1_500);

        game.advance(1_000, &mut MemoryScreen::new()).unwrap();
        let lag = behind(&game, started);
        assert!((500..1_500).contains(&lag), "lag {lag}");
    }
}
