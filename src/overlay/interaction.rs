use crate::geometry::{Bounds, Point};
use crate::model::{
    Container, DiagramAnnotations, StickyNote, DEFAULT_CONTAINER_COLOR, DEFAULT_NOTE_COLOR,
};

/// Thickness of the resize band along shape edges, in overlay pixels.
pub const HANDLE_SIZE: i32 = 8;
/// Both dimensions of a drawn rectangle must exceed this or the draw is
/// cancelled instead of creating a degenerate shape.
pub const DRAW_MIN_SIZE: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeId {
    Container(String),
    Note(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Container,
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Gesture {
    Idle,
    Dragging { target: ShapeId, last: Point },
    Resizing { target: ShapeId, handle: Handle, last: Point },
    /// A draw command was issued; the next press anchors the rectangle.
    DrawArmed { kind: DrawKind },
    Drawing { kind: DrawKind, anchor: Point, current: Point },
}

/// What the overlay did with a pointer sample. `PassThrough` means the
/// event belongs to the host canvas underneath, not to the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerEffect {
    PassThrough,
    Consumed,
    /// Geometry changed mid-gesture; repaint but don't persist yet.
    Changed,
    /// A drag or resize finished; commit (persist + refresh).
    Committed,
    /// A draw gesture finished and created this shape.
    Created(ShapeId),
    /// The drawn rectangle was below the minimum size.
    DrawCancelled,
}

/// Cursor feedback for the point under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    Move,
    Resize(Handle),
}

/// Resize handle under `p` for a shape with the given bounds, or `None`
/// when the point sits in the interior. Corners win over edges.
pub fn handle_at(bounds: Bounds, p: Point) -> Option<Handle> {
    let on_left = (p.x - bounds.x).abs() <= HANDLE_SIZE;
    let on_right = (p.x - bounds.right()).abs() <= HANDLE_SIZE;
    let on_top = (p.y - bounds.y).abs() <= HANDLE_SIZE;
    let on_bottom = (p.y - bounds.bottom()).abs() <= HANDLE_SIZE;

    if on_top && on_left {
        Some(Handle::Nw)
    } else if on_top && on_right {
        Some(Handle::Ne)
    } else if on_bottom && on_left {
        Some(Handle::Sw)
    } else if on_bottom && on_right {
        Some(Handle::Se)
    } else if on_top {
        Some(Handle::N)
    } else if on_bottom {
        Some(Handle::S)
    } else if on_left {
        Some(Handle::W)
    } else if on_right {
        Some(Handle::E)
    } else {
        None
    }
}

/// Topmost shape under `p`. Notes are tested before containers (notes
/// always paint on top), and within each collection the most recently
/// added entry wins. Bounds are expanded by the handle band so edge grabs
/// just outside a shape still hit it.
pub fn hit_test(annotations: &DiagramAnnotations, p: Point) -> Option<ShapeId> {
    for note in annotations.notes.iter().rev() {
        if note.bounds().expanded(HANDLE_SIZE).contains(p) {
            return Some(ShapeId::Note(note.id.clone()));
        }
    }
    for container in annotations.containers.iter().rev() {
        if container.bounds().expanded(HANDLE_SIZE).contains(p) {
            return Some(ShapeId::Container(container.id.clone()));
        }
    }
    None
}

/// Per-handle bounds arithmetic. Edge handles move the near edge while the
/// opposite edge stays fixed; the result is unclamped, minimum-size
/// enforcement happens in the model setters.
pub fn apply_resize(bounds: Bounds, handle: Handle, dx: i32, dy: i32) -> Bounds {
    let mut b = bounds;
    match handle {
        Handle::N => {
            b.y += dy;
            b.height -= dy;
        }
        Handle::S => b.height += dy,
        Handle::E => b.width += dx,
        Handle::W => {
            b.x += dx;
            b.width -= dx;
        }
        Handle::Ne => {
            b.y += dy;
            b.height -= dy;
            b.width += dx;
        }
        Handle::Nw => {
            b.x += dx;
            b.width -= dx;
            b.y += dy;
            b.height -= dy;
        }
        Handle::Se => {
            b.width += dx;
            b.height += dy;
        }
        Handle::Sw => {
            b.x += dx;
            b.width -= dx;
            b.height += dy;
        }
    }
    b
}

fn shape_bounds(annotations: &DiagramAnnotations, id: &ShapeId) -> Option<Bounds> {
    match id {
        ShapeId::Container(cid) => annotations.container(cid).map(|c| c.bounds()),
        ShapeId::Note(nid) => annotations.note(nid).map(|n| n.bounds()),
    }
}

fn set_shape_bounds(annotations: &mut DiagramAnnotations, id: &ShapeId, bounds: Bounds) {
    match id {
        ShapeId::Container(cid) => {
            if let Some(container) = annotations.container_mut(cid) {
                container.set_bounds(bounds);
            }
        }
        ShapeId::Note(nid) => {
            if let Some(note) = annotations.note_mut(nid) {
                note.set_bounds(bounds);
            }
        }
    }
}

fn translate_shape(annotations: &mut DiagramAnnotations, id: &ShapeId, dx: i32, dy: i32) {
    match id {
        ShapeId::Container(cid) => {
            if let Some(container) = annotations.container_mut(cid) {
                container.translate(dx, dy);
            }
        }
        ShapeId::Note(nid) => {
            if let Some(note) = annotations.note_mut(nid) {
                note.translate(dx, dy);
            }
        }
    }
}

/// Pointer gesture state machine for the overlay: selection, drag-move,
/// drag-resize, and drawing new shapes. One gesture at a time; the caller
/// feeds press/move/release samples in overlay coordinates and persists
/// whenever a `Committed`/`Created` effect comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionState {
    gesture: Gesture,
    selected: Option<ShapeId>,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionState {
    pub fn new() -> Self {
        Self {
            gesture: Gesture::Idle,
            selected: None,
        }
    }

    pub fn selected(&self) -> Option<&ShapeId> {
        self.selected.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Enters draw mode; the next press starts the preview rectangle.
    pub fn arm_draw(&mut self, kind: DrawKind) {
        self.gesture = Gesture::DrawArmed { kind };
        self.selected = None;
    }

    pub fn cancel_draw(&mut self) {
        if matches!(
            self.gesture,
            Gesture::DrawArmed { .. } | Gesture::Drawing { .. }
        ) {
            self.gesture = Gesture::Idle;
        }
    }

    pub fn armed_draw(&self) -> Option<DrawKind> {
        match self.gesture {
            Gesture::DrawArmed { kind } | Gesture::Drawing { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Live preview rectangle while a draw gesture is in flight.
    pub fn preview_rect(&self) -> Option<(DrawKind, Bounds)> {
        match self.gesture {
            Gesture::Drawing {
                kind,
                anchor,
                current,
            } => Some((kind, Bounds::from_corners(anchor, current))),
            _ => None,
        }
    }

    pub fn gesture_active(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle | Gesture::DrawArmed { .. })
    }

    pub fn on_press(&mut self, p: Point, annotations: &mut DiagramAnnotations) -> PointerEffect {
        match self.gesture {
            Gesture::DrawArmed { kind } => {
                self.gesture = Gesture::Drawing {
                    kind,
                    anchor: p,
                    current: p,
                };
                PointerEffect::Consumed
            }
            Gesture::Idle => match hit_test(annotations, p) {
                Some(target) => {
                    let bounds = shape_bounds(annotations, &target).unwrap_or_default();
                    self.selected = Some(target.clone());
                    self.gesture = match handle_at(bounds, p) {
                        Some(handle) => Gesture::Resizing {
                            target,
                            handle,
                            last: p,
                        },
                        None => Gesture::Dragging { target, last: p },
                    };
                    PointerEffect::Consumed
                }
                None => {
                    self.selected = None;
                    PointerEffect::PassThrough
                }
            },
            // A second press mid-gesture should not happen; swallow it.
            _ => PointerEffect::Consumed,
        }
    }

    pub fn on_move(&mut self, p: Point, annotations: &mut DiagramAnnotations) -> PointerEffect {
        match &mut self.gesture {
            Gesture::Dragging { target, last } => {
                let (dx, dy) = (p.x - last.x, p.y - last.y);
                let target = target.clone();
                *last = p;
                translate_shape(annotations, &target, dx, dy);
                PointerEffect::Changed
            }
            Gesture::Resizing {
                target,
                handle,
                last,
            } => {
                let (dx, dy) = (p.x - last.x, p.y - last.y);
                let (target, handle) = (target.clone(), *handle);
                *last = p;
                if let Some(bounds) = shape_bounds(annotations, &target) {
                    set_shape_bounds(annotations, &target, apply_resize(bounds, handle, dx, dy));
                }
                PointerEffect::Changed
            }
            Gesture::Drawing { current, .. } => {
                *current = p;
                PointerEffect::Changed
            }
            _ => PointerEffect::PassThrough,
        }
    }

    pub fn on_release(&mut self, p: Point, annotations: &mut DiagramAnnotations) -> PointerEffect {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Dragging { .. } | Gesture::Resizing { .. } => PointerEffect::Committed,
            Gesture::Drawing { kind, anchor, .. } => {
                let rect = Bounds::from_corners(anchor, p);
                if rect.width > DRAW_MIN_SIZE && rect.height > DRAW_MIN_SIZE {
                    let id = create_shape(annotations, kind, rect);
                    self.selected = Some(id.clone());
                    PointerEffect::Created(id)
                } else {
                    PointerEffect::DrawCancelled
                }
            }
            Gesture::DrawArmed { kind } => {
                // Release without a press; stay armed.
                self.gesture = Gesture::DrawArmed { kind };
                PointerEffect::Consumed
            }
            Gesture::Idle => PointerEffect::PassThrough,
        }
    }

    /// Cursor feedback for hover, without mutating any state.
    pub fn hover_hint(&self, p: Point, annotations: &DiagramAnnotations) -> Option<CursorHint> {
        if self.armed_draw().is_some() {
            return None;
        }
        let target = hit_test(annotations, p)?;
        let bounds = shape_bounds(annotations, &target)?;
        Some(match handle_at(bounds, p) {
            Some(handle) => CursorHint::Resize(handle),
            None => CursorHint::Move,
        })
    }
}

fn create_shape(annotations: &mut DiagramAnnotations, kind: DrawKind, rect: Bounds) -> ShapeId {
    match kind {
        DrawKind::Container => {
            let title = format!("Group {}", annotations.containers.len() + 1);
            let container =
                Container::new(title, DEFAULT_CONTAINER_COLOR).with_bounds(rect);
            let id = container.id.clone();
            annotations.add_container(container);
            ShapeId::Container(id)
        }
        DrawKind::Note => {
            let note = StickyNote::new("", DEFAULT_NOTE_COLOR)
                .at(rect.position())
                .sized(rect.size());
            let id = note.id.clone();
            annotations.add_note(note);
            ShapeId::Note(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;

    fn annotations_with_container(bounds: Bounds) -> (DiagramAnnotations, String) {
        let mut ann = DiagramAnnotations::new();
        let container = Container::new("Sales", DEFAULT_CONTAINER_COLOR).with_bounds(bounds);
        let id = container.id.clone();
        ann.add_container(container);
        (ann, id)
    }

    #[test]
    fn corners_win_over_edges() {
        let bounds = Bounds::new(100, 100, 200, 100);
        assert_eq!(handle_at(bounds, Point::new(100, 100)), Some(Handle::Nw));
        assert_eq!(handle_at(bounds, Point::new(300, 100)), Some(Handle::Ne));
        assert_eq!(handle_at(bounds, Point::new(100, 200)), Some(Handle::Sw));
        assert_eq!(handle_at(bounds, Point::new(300, 200)), Some(Handle::Se));
        assert_eq!(handle_at(bounds, Point::new(200, 100)), Some(Handle::N));
        assert_eq!(handle_at(bounds, Point::new(200, 200)), Some(Handle::S));
        assert_eq!(handle_at(bounds, Point::new(100, 150)), Some(Handle::W));
        assert_eq!(handle_at(bounds, Point::new(300, 150)), Some(Handle::E));
        assert_eq!(handle_at(bounds, Point::new(200, 150)), None);
    }

    #[test]
    fn notes_hit_before_containers_and_topmost_first() {
        let mut ann = DiagramAnnotations::new();
        let container = Container::new("C", DEFAULT_CONTAINER_COLOR)
            .with_bounds(Bounds::new(0, 0, 400, 400));
        let container_id = container.id.clone();
        ann.add_container(container);

        let lower = StickyNote::new("lower", DEFAULT_NOTE_COLOR)
            .at(Point::new(50, 50))
            .sized(Size::new(100, 80));
        let lower_id = lower.id.clone();
        ann.add_note(lower);
        let upper = StickyNote::new("upper", DEFAULT_NOTE_COLOR)
            .at(Point::new(80, 60))
            .sized(Size::new(100, 80));
        let upper_id = upper.id.clone();
        ann.add_note(upper);

        // Overlap region of both notes: the most recently added wins.
        assert_eq!(
            hit_test(&ann, Point::new(100, 90)),
            Some(ShapeId::Note(upper_id))
        );
        // Only the lower note covers this point.
        assert_eq!(
            hit_test(&ann, Point::new(55, 120)),
            Some(ShapeId::Note(lower_id))
        );
        // Outside every note but inside the container.
        assert_eq!(
            hit_test(&ann, Point::new(350, 350)),
            Some(ShapeId::Container(container_id))
        );
        assert_eq!(hit_test(&ann, Point::new(600, 600)), None);
    }

    #[test]
    fn press_outside_everything_passes_through() {
        let (mut ann, _) = annotations_with_container(Bounds::new(100, 100, 200, 100));
        let mut state = InteractionState::new();
        assert_eq!(
            state.on_press(Point::new(500, 500), &mut ann),
            PointerEffect::PassThrough
        );
        assert!(state.selected().is_none());
        assert!(!state.gesture_active());
    }

    #[test]
    fn drag_translates_and_commits_on_release() {
        let (mut ann, id) = annotations_with_container(Bounds::new(100, 100, 200, 100));
        let mut state = InteractionState::new();

        assert_eq!(
            state.on_press(Point::new(200, 150), &mut ann),
            PointerEffect::Consumed
        );
        assert_eq!(state.selected(), Some(&ShapeId::Container(id.clone())));
        assert_eq!(
            state.on_move(Point::new(230, 170), &mut ann),
            PointerEffect::Changed
        );
        assert_eq!(
            state.on_release(Point::new(230, 170), &mut ann),
            PointerEffect::Committed
        );

        let bounds = ann.container(&id).expect("container").bounds();
        assert_eq!(bounds, Bounds::new(130, 120, 200, 100));
    }

    #[test]
    fn west_resize_keeps_opposite_edge_fixed() {
        let (mut ann, id) = annotations_with_container(Bounds::new(100, 100, 200, 100));
        let mut state = InteractionState::new();

        state.on_press(Point::new(100, 150), &mut ann);
        state.on_move(Point::new(80, 150), &mut ann);
        state.on_release(Point::new(80, 150), &mut ann);

        let bounds = ann.container(&id).expect("container").bounds();
        assert_eq!(bounds, Bounds::new(80, 100, 220, 100));
        assert_eq!(bounds.right(), 300);
    }

    #[test]
    fn southeast_resize_clamps_to_floor() {
        let (mut ann, id) = annotations_with_container(Bounds::new(0, 0, 150, 150));
        let mut state = InteractionState::new();

        state.on_press(Point::new(150, 150), &mut ann);
        state.on_move(Point::new(-850, -850), &mut ann);
        state.on_release(Point::new(-850, -850), &mut ann);

        let bounds = ann.container(&id).expect("container").bounds();
        assert_eq!(bounds.size(), Size::new(100, 50));
    }

    #[test]
    fn draw_below_threshold_creates_nothing() {
        let mut ann = DiagramAnnotations::new();
        let mut state = InteractionState::new();
        state.arm_draw(DrawKind::Note);

        state.on_press(Point::new(40, 40), &mut ann);
        state.on_move(Point::new(45, 43), &mut ann);
        assert_eq!(
            state.on_release(Point::new(45, 43), &mut ann),
            PointerEffect::DrawCancelled
        );
        assert!(ann.notes.is_empty());
        assert!(!state.gesture_active());
    }

    #[test]
    fn draw_above_threshold_creates_and_selects_shape() {
        let mut ann = DiagramAnnotations::new();
        let mut state = InteractionState::new();
        state.arm_draw(DrawKind::Container);

        state.on_press(Point::new(300, 200), &mut ann);
        assert_eq!(
            state.preview_rect(),
            Some((DrawKind::Container, Bounds::new(300, 200, 0, 0)))
        );
        state.on_move(Point::new(120, 80), &mut ann);
        let effect = state.on_release(Point::new(120, 80), &mut ann);

        let Some(container) = ann.containers.first() else {
            panic!("container not created");
        };
        assert_eq!(effect, PointerEffect::Created(ShapeId::Container(container.id.clone())));
        // Drag direction does not matter; the rectangle normalizes.
        assert_eq!(container.bounds(), Bounds::new(120, 80, 180, 120));
        assert_eq!(container.title, "Group 1");
    }

    #[test]
    fn hover_hint_reports_handles_and_move() {
        let (ann, _) = annotations_with_container(Bounds::new(100, 100, 200, 100));
        let state = InteractionState::new();
        assert_eq!(
            state.hover_hint(Point::new(100, 100), &ann),
            Some(CursorHint::Resize(Handle::Nw))
        );
        assert_eq!(
            state.hover_hint(Point::new(200, 150), &ann),
            Some(CursorHint::Move)
        );
        assert_eq!(state.hover_hint(Point::new(500, 500), &ann), None);
    }
}
