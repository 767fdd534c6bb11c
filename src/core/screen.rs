/// Render surfaces, where output text ends up.
///
/// The engine never builds DOM or terminal widgets itself. It asks a `Screen`
/// for surfaces and writes markup into them.
use serde::{Deserialize, Serialize};

/// Opaque handle to one display target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

/// Surface factory and sink.
pub trait Screen {
    /// Create a surface at the end of the output.
    fn create_surface(&mut self, persistent: bool) -> SurfaceId;
    /// Replace the content of a surface.
    fn write(&mut self, surface: SurfaceId, content: &str);
    /// Remove surfaces; persistent ones stay when `retain_persistent` is set.
    fn clear(&mut self, retain_persistent: bool);
}

/// A change applied to the screen, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SurfaceOp {
    Create { id: SurfaceId, persistent: bool },
    Write { id: SurfaceId, content: String },
    Clear { retain_persistent: bool },
}

#[derive(Debug, Clone)]
struct Surface {
    id: SurfaceId,
    persistent: bool,
    content: String,
}

/// In-memory screen that keeps every surface and every write.
#[derive(Debug, Clone, Default)]
pub struct MemoryScreen {
    next_id: u64,
    surfaces: Vec<Surface>,
    history: Vec<(SurfaceId, String)>,
    ops: Vec<SurfaceOp>,
}

impl MemoryScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current content of a surface, if it still exists.
    pub fn content(&self, surface: SurfaceId) -> Option<&str> {
        self.surfaces
            .iter()
            .find(|s| s.id == surface)
            .map(|s| s.content.as_str())
    }

    /// Contents of every live surface, top to bottom.
    pub fn contents(&self) -> Vec<&str> {
        self.surfaces.iter().map(|s| s.content.as_str()).collect()
    }

    pub fn surface_ids(&self) -> Vec<SurfaceId> {
        self.surfaces.iter().map(|s| s.id).collect()
    }

    /// Every value ever written to `surface`, oldest first.
    pub fn writes(&self, surface: SurfaceId) -> Vec<&str> {
        self.history
            .iter()
            .filter(|(id, _)| *id == surface)
            .map(|(_, content)| content.as_str())
            .collect()
    }

    /// All live surface contents joined with newlines.
    pub fn text(&self) -> String {
        self.contents().join("\n")
    }

    /// Take the operations recorded since the last drain.
    pub fn drain_ops(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.ops)
    }
}

impl Screen for MemoryScreen {
    fn create_surface(&mut self, persistent: bool) -> SurfaceId {
        self.next_id += 1;
        let id = SurfaceId(self.next_id);
        self.surfaces.push(Surface {
            id,
            persistent,
            content: String::new(),
        });
        self.ops.push(SurfaceOp::Create { id, persistent });
        id
    }

    fn write(&mut self, surface: SurfaceId, content: &str) {
        // Writes to removed surfaces are dropped, like writes to detached DOM nodes.
        if let Some(s) = self.surfaces.iter_mut().find(|s| s.id == surface) {
            s.content.clear();
            s.content.push_str(content);
            self.history.push((surface, content.to_string()));
            self.ops.push(SurfaceOp::Write {
                id: surface,
                content: content.to_string(),
            });
        }
    }

    fn clear(&mut self, retain_persistent: bool) {
        self.surfaces.retain(|s| retain_persistent && s.persistent);
        self.ops.push(SurfaceOp::Clear { retain_persistent });
    }
}
