use crate::geometry::Bounds;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// Case-insensitive substring patterns that mark a widget or editor type
/// name as "a diagram surface". Heuristic and host-version-fragile by
/// nature; kept as a single list so a host adapter can audit it.
pub const SURFACE_NAME_PATTERNS: [&str; 5] = ["diagram", "uml", "graph", "schema", "erd"];

pub const MAX_ATTACH_ATTEMPTS: u32 = 10;
pub const ATTACH_RETRY_BASE: Duration = Duration::from_millis(50);

pub fn is_diagram_surface(type_name: &str) -> bool {
    let lowered = type_name.to_ascii_lowercase();
    SURFACE_NAME_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Ordinary widget with no special stacking semantics.
    Plain,
    /// Container supporting explicit z-ordered children; the preferred
    /// overlay anchor.
    Layered,
    /// Scrollable viewport; `content` is the inner view that actually holds
    /// the drawing.
    Viewport { content: NodeId },
}

/// One widget in a host-tree snapshot.
#[derive(Debug, Clone)]
pub struct WidgetNode {
    pub type_name: String,
    pub visible: bool,
    pub bounds: Bounds,
    pub kind: SurfaceKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Owned snapshot of the host's widget hierarchy. The host adapter rebuilds
/// it on demand; the locator never touches live host objects, which keeps
/// the discovery heuristics testable without a real host.
#[derive(Debug, Default)]
pub struct WidgetTree {
    nodes: Vec<WidgetNode>,
}

impl WidgetTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(
        &mut self,
        parent: Option<NodeId>,
        type_name: impl Into<String>,
        visible: bool,
        bounds: Bounds,
        kind: SurfaceKind,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(WidgetNode {
            type_name: type_name.into(),
            visible,
            bounds,
            kind,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            if let Some(node) = self.nodes.get_mut(parent) {
                node.children.push(id);
            }
        }
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&WidgetNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn usable(&self, id: NodeId) -> bool {
        self.node(id)
            .map(|n| n.visible && n.bounds.width > 0 && n.bounds.height > 0)
            .unwrap_or(false)
    }
}

/// Finds the widget suitable as an overlay anchor for the given editor
/// node. Layered fallback, attempted in order:
///
/// 1. the editor node itself, if visible with nonzero size;
/// 2. breadth-first over descendants for a usable layered surface;
/// 3. breadth-first for a viewport whose content view is usable;
/// 4. the nearest usable ancestor.
pub fn locate_anchor(tree: &WidgetTree, editor: NodeId) -> Option<NodeId> {
    let root = tree.node(editor)?;

    if tree.usable(editor) {
        return Some(editor);
    }

    let mut queue: VecDeque<NodeId> = root.children.iter().copied().collect();
    let mut viewport_content = None;
    while let Some(id) = queue.pop_front() {
        let Some(node) = tree.node(id) else { continue };
        match node.kind {
            SurfaceKind::Layered if tree.usable(id) => return Some(id),
            SurfaceKind::Viewport { content } => {
                if viewport_content.is_none() && tree.usable(content) {
                    viewport_content = Some(content);
                }
            }
            _ => {}
        }
        queue.extend(node.children.iter().copied());
    }
    if let Some(content) = viewport_content {
        return Some(content);
    }

    let mut ancestor = root.parent;
    while let Some(id) = ancestor {
        if tree.usable(id) {
            return Some(id);
        }
        ancestor = tree.node(id).and_then(|n| n.parent);
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    /// Waiting for the host tree to finish layout; `attempt` counts probes
    /// already made.
    Probing { attempt: u32 },
    Attached(NodeId),
    /// Retries exhausted. Carries the editor node as a best-effort anchor:
    /// the overlay attaches there rather than blocking forever.
    GaveUp(NodeId),
    Cancelled,
}

impl ProbeState {
    pub fn is_finished(self) -> bool {
        !matches!(self, Self::Probing { .. })
    }

    /// The anchor to attach to, if the probe resolved one.
    pub fn anchor(self) -> Option<NodeId> {
        match self {
            Self::Attached(id) | Self::GaveUp(id) => Some(id),
            _ => None,
        }
    }
}

/// Bounded, cancellable retry loop around [`locate_anchor`]. Host widgets
/// are often constructed before layout assigns them a size, so the first
/// probes may see zero-sized nodes. The probe owns the schedule; the caller
/// owns the timer.
#[derive(Debug)]
pub struct AttachProbe {
    editor: NodeId,
    state: ProbeState,
}

impl AttachProbe {
    pub fn new(editor: NodeId) -> Self {
        Self {
            editor,
            state: ProbeState::Probing { attempt: 0 },
        }
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    /// Delay to wait before the next [`attempt`](Self::attempt) call, or
    /// `None` once the probe has finished. Backoff grows linearly with the
    /// attempt count.
    pub fn next_delay(&self) -> Option<Duration> {
        match self.state {
            ProbeState::Probing { attempt } => Some(ATTACH_RETRY_BASE * (attempt + 1)),
            _ => None,
        }
    }

    /// Runs one discovery pass against a fresh tree snapshot.
    pub fn attempt(&mut self, tree: &WidgetTree) -> ProbeState {
        let ProbeState::Probing { attempt } = self.state else {
            return self.state;
        };

        if let Some(anchor) = locate_anchor(tree, self.editor) {
            debug!(attempt, anchor, "overlay anchor located");
            self.state = ProbeState::Attached(anchor);
        } else if attempt + 1 >= MAX_ATTACH_ATTEMPTS {
            debug!(attempt, "anchor discovery exhausted, attaching to editor node");
            self.state = ProbeState::GaveUp(self.editor);
        } else {
            self.state = ProbeState::Probing {
                attempt: attempt + 1,
            };
        }
        self.state
    }

    pub fn cancel(&mut self) {
        if !self.state.is_finished() {
            self.state = ProbeState::Cancelled;
        }
    }
}
