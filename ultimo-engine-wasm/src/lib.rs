//! WASM bindings for ultimo-engine, driving a story from a browser page.
//!
//! The page owns the real clock and the DOM. Every call returns the surface
//! operations to apply and the game events raised since the last call, as JSON.

use wasm_bindgen::prelude::*;

use ultimo_engine::core::game::{Game, GameEvent};
use ultimo_engine::core::screen::{MemoryScreen, SurfaceOp};
use ultimo_engine::core::story::Story;

// ---------------------------------------------------------------------------
// Embedded story, compiled into the WASM binary
// ---------------------------------------------------------------------------
const DEFAULT_STORY: &str = include_str!("../../stories/ultimo.ron");

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum EventInfo {
    SceneEntered { scene: String },
    CountdownStarted { duration: u64 },
    CountdownTick { remaining: u64 },
    CountdownExpired { scene: String },
}

impl From<GameEvent> for EventInfo {
    fn from(event: GameEvent) -> Self {
        match event {
            GameEvent::SceneEntered { scene } => EventInfo::SceneEntered { scene },
            GameEvent::CountdownStarted { duration } => EventInfo::CountdownStarted { duration },
            GameEvent::CountdownTick { remaining } => EventInfo::CountdownTick { remaining },
            GameEvent::CountdownExpired { scene } => EventInfo::CountdownExpired { scene },
        }
    }
}

#[derive(serde::Serialize)]
struct Frame {
    ops: Vec<SurfaceOp>,
    events: Vec<EventInfo>,
    scene: Option<String>,
    animating: bool,
    next_deadline: Option<u64>,
}

// ---------------------------------------------------------------------------
// WebGame: the exported API
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct WebGame {
    game: Game,
    screen: MemoryScreen,
}

#[wasm_bindgen]
impl WebGame {
    /// Load a story from RON text, or the bundled story when `story_ron` is empty.
    #[wasm_bindgen(constructor)]
    pub fn new(story_ron: &str) -> Result<WebGame, JsError> {
        let source = if story_ron.trim().is_empty() {
            DEFAULT_STORY
        } else {
            story_ron
        };
        let story = Story::parse_ron(source)
            .map_err(|e| JsError::new(&format!("Story parse error: {e}")))?;
        let game = Game::builder()
            .story(story)
            .build()
            .map_err(|e| JsError::new(&format!("Game build error: {e}")))?;
        Ok(WebGame {
            game,
            screen: MemoryScreen::new(),
        })
    }

    /// Enter the start scene. Returns a JSON frame.
    pub fn start(&mut self) -> Result<String, JsError> {
        self.game
            .start(&mut self.screen)
            .map_err(|e| JsError::new(&format!("Start error: {e}")))?;
        self.frame()
    }

    /// Submit one line of player input. Returns a JSON frame.
    pub fn submit(&mut self, input: &str) -> Result<String, JsError> {
        self.game
            .submit(input, &mut self.screen)
            .map_err(|e| JsError::new(&format!("Input error: {e}")))?;
        self.frame()
    }

    /// Move the clock forward by `elapsed_ms`. Returns a JSON frame.
    pub fn advance(&mut self, elapsed_ms: u64) -> Result<String, JsError> {
        self.game
            .advance(elapsed_ms, &mut self.screen)
            .map_err(|e| JsError::new(&format!("Advance error: {e}")))?;
        self.frame()
    }

    pub fn is_animating(&self) -> bool {
        self.game.is_animating()
    }

    /// Names of every scene, in registry order.
    pub fn scenes(&self) -> String {
        let names: Vec<&str> = self
            .game
            .story()
            .scenes()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
    }
}

impl WebGame {
    fn frame(&mut self) -> Result<String, JsError> {
        let frame = Frame {
            ops: self.screen.drain_ops(),
            events: self.game.drain_events().into_iter().map(EventInfo::from).collect(),
            scene: self.game.scene().map(str::to_string),
            animating: self.game.is_animating(),
            next_deadline: self
                .game
                .next_deadline()
                .map(|at| at.saturating_sub(self.game.now())),
        };
        serde_json::to_string(&frame)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok<T>(result: Result<T, JsError>) -> T {
        match result {
            Ok(value) => value,
            Err(_) => panic!("call returned an error"),
        }
    }

    #[test]
    fn bundled_story_plays() {
        let mut web = ok(WebGame::new(""));
        let frame = ok(web.start());
        assert!(frame.contains("\"op\":\"create\""));
        assert!(frame.contains("\"scene\":\"title\""));
        assert!(web.is_animating());

        let frame = ok(web.submit("start"));
        assert!(frame.contains("\"event\":\"scene_entered\""));
        assert!(frame.contains("\"scene\":\"morning\""));

        let frame = ok(web.advance(5_000));
        assert!(frame.contains("\"event\":\"countdown_started\""));
        assert!(!web.is_animating());
    }

    #[test]
    fn scene_names_are_listed() {
        let web = ok(WebGame::new(""));
        let names: Vec<String> = serde_json::from_str(&web.scenes()).unwrap();
        assert_eq!(names.first().map(String::as_str), Some("title"));
        assert_eq!(names.len(), 8);
    }
}
