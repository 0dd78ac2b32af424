use crate::geometry::{Bounds, Point};
use crate::model::DiagramAnnotations;
use crate::overlay::interaction::{
    CursorHint, DrawKind, Handle, InteractionState, PointerEffect, ShapeId,
};
use crate::overlay::paint;
use eframe::egui::{CursorIcon, Rect, Ui};

/// What the host loop must do after a frame of overlay input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerResponse {
    /// Geometry changed mid-gesture; a repaint is enough.
    pub repaint: bool,
    /// A gesture finished; persist the aggregate and schedule a refresh.
    pub commit: bool,
    /// Shape created by a finished draw gesture (implies `commit`).
    pub created: Option<ShapeId>,
    /// The overlay claimed the pointer this frame; the host canvas should
    /// ignore it. False over empty overlay regions, which keeps normal
    /// diagram interaction working underneath.
    pub pointer_captured: bool,
}

/// Transparent interactive layer stacked over the located host canvas.
/// Holds its own copy of the aggregate (pushed by the refresh coordinator)
/// plus the gesture state, and mirrors the anchor's bounds every frame.
#[derive(Debug)]
pub struct OverlayLayer {
    annotations: DiagramAnnotations,
    interaction: InteractionState,
    bounds: Bounds,
}

impl OverlayLayer {
    pub fn new(annotations: DiagramAnnotations) -> Self {
        Self {
            annotations,
            interaction: InteractionState::new(),
            bounds: Bounds::default(),
        }
    }

    pub fn annotations(&self) -> &DiagramAnnotations {
        &self.annotations
    }

    /// Replaces the aggregate snapshot, dropping a selection that no longer
    /// resolves to a live shape.
    pub fn set_annotations(&mut self, annotations: DiagramAnnotations) {
        self.annotations = annotations;
        let stale = match self.interaction.selected() {
            Some(ShapeId::Container(id)) => self.annotations.container(id).is_none(),
            Some(ShapeId::Note(id)) => self.annotations.note(id).is_none(),
            None => false,
        };
        if stale {
            self.interaction.clear_selection();
        }
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn arm_draw(&mut self, kind: DrawKind) {
        self.interaction.arm_draw(kind);
    }

    pub fn cancel_draw(&mut self) {
        self.interaction.cancel_draw();
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Matches the overlay to the anchor's current bounds. Returns true
    /// when they changed, so callers can request a repaint.
    pub fn sync_bounds(&mut self, anchor: Bounds) -> bool {
        if self.bounds == anchor {
            return false;
        }
        self.bounds = anchor;
        true
    }

    /// Runs one frame of the overlay inside `rect`: samples the pointer,
    /// advances the gesture machine, paints, and reports what the host
    /// loop has to do. Pointer events over empty regions are left for the
    /// widgets underneath.
    pub fn show(&mut self, ui: &mut Ui, rect: Rect) -> LayerResponse {
        let mut response = LayerResponse::default();
        response.repaint = self.sync_bounds(Bounds::new(
            rect.min.x as i32,
            rect.min.y as i32,
            rect.width() as i32,
            rect.height() as i32,
        ));

        let pointer = ui.input(|i| {
            (
                i.pointer.interact_pos(),
                i.pointer.primary_pressed(),
                i.pointer.primary_down(),
                i.pointer.primary_released(),
            )
        });

        if let (Some(pos), pressed, down, released) = pointer {
            let local = Point::new((pos.x - rect.min.x) as i32, (pos.y - rect.min.y) as i32);
            let inside = rect.contains(pos);

            if pressed && inside {
                let effect = self.interaction.on_press(local, &mut self.annotations);
                apply_effect(effect, &mut response);
            } else if down && self.interaction.gesture_active() {
                let effect = self.interaction.on_move(local, &mut self.annotations);
                apply_effect(effect, &mut response);
            } else if released && self.interaction.gesture_active() {
                let effect = self.interaction.on_release(local, &mut self.annotations);
                apply_effect(effect, &mut response);
            }

            if inside {
                if self.interaction.armed_draw().is_some() {
                    ui.ctx().output_mut(|o| o.cursor_icon = CursorIcon::Crosshair);
                    response.pointer_captured = true;
                } else if let Some(hint) = self.interaction.hover_hint(local, &self.annotations) {
                    ui.ctx().output_mut(|o| o.cursor_icon = cursor_for_hint(hint));
                    response.pointer_captured = true;
                }
            }
        }

        let painter = ui.painter_at(rect);
        paint::paint_overlay(
            &painter,
            rect.min,
            rect.size(),
            &self.annotations,
            self.interaction.selected(),
            self.interaction.preview_rect(),
        );

        response
    }
}

fn apply_effect(effect: PointerEffect, response: &mut LayerResponse) {
    match effect {
        PointerEffect::PassThrough => {}
        PointerEffect::Consumed => response.pointer_captured = true,
        PointerEffect::Changed => {
            response.pointer_captured = true;
            response.repaint = true;
        }
        PointerEffect::Committed => {
            response.pointer_captured = true;
            response.repaint = true;
            response.commit = true;
        }
        PointerEffect::Created(id) => {
            response.pointer_captured = true;
            response.repaint = true;
            response.commit = true;
            response.created = Some(id);
        }
        PointerEffect::DrawCancelled => {
            response.pointer_captured = true;
            response.repaint = true;
        }
    }
}

fn cursor_for_hint(hint: CursorHint) -> CursorIcon {
    match hint {
        CursorHint::Move => CursorIcon::Grab,
        CursorHint::Resize(Handle::N) | CursorHint::Resize(Handle::S) => {
            CursorIcon::ResizeVertical
        }
        CursorHint::Resize(Handle::E) | CursorHint::Resize(Handle::W) => {
            CursorIcon::ResizeHorizontal
        }
        CursorHint::Resize(Handle::Ne) | CursorHint::Resize(Handle::Sw) => {
            CursorIcon::ResizeNeSw
        }
        CursorHint::Resize(Handle::Nw) | CursorHint::Resize(Handle::Se) => {
            CursorIcon::ResizeNwSe
        }
    }
}
