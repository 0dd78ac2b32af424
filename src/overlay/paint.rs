use crate::color::{self, Rgb};
use crate::geometry::Bounds;
use crate::model::{
    Container, DiagramAnnotations, StickyNote, DEFAULT_CONTAINER_COLOR, DEFAULT_NOTE_COLOR,
};
use crate::overlay::interaction::{DrawKind, ShapeId};
use eframe::egui::{
    Align2, Color32, FontId, Painter, Pos2, Rect, Rounding, Shape, Stroke, Vec2,
};

const CONTAINER_ARC: f32 = 10.0;
const NOTE_ARC: f32 = 5.0;
const CONTAINER_FILL_ALPHA: u8 = 38; // 0.15 * 255
const NOTE_FILL_ALPHA: u8 = 229; // 0.9 * 255
const TITLE_BAR_HEIGHT: f32 = 20.0;
const FOLD_SIZE: f32 = 12.0;
const SHADOW_OFFSET: f32 = 3.0;
const SHADOW_ALPHA: u8 = 30;
const TEXT_PADDING: f32 = 5.0;
const DASH_LEN: f32 = 5.0;
const GAP_LEN: f32 = 3.0;

fn font() -> FontId {
    FontId::proportional(11.0)
}

fn color32(rgb: Rgb, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(rgb.r, rgb.g, rgb.b, alpha)
}

fn to_rect(origin: Pos2, bounds: Bounds) -> Rect {
    Rect::from_min_size(
        origin + Vec2::new(bounds.x as f32, bounds.y as f32),
        Vec2::new(bounds.width as f32, bounds.height as f32),
    )
}

fn dashed_rect(painter: &Painter, rect: Rect, stroke: Stroke) {
    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
        rect.left_top(),
    ];
    for pair in corners.windows(2) {
        painter.extend(Shape::dashed_line(pair, stroke, DASH_LEN, GAP_LEN));
    }
}

/// Greedy word wrap matching the note body layout: words are packed onto a
/// line until the measured width exceeds `max_width`; an over-long single
/// word gets a line of its own. Pure so it can be tested with a synthetic
/// measuring closure.
pub fn wrap_text(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split(' ') {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };
        if !line.is_empty() && measure(&candidate) > max_width {
            lines.push(std::mem::take(&mut line));
            line = word.to_string();
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Paints the whole overlay: containers first (lowest z), then notes, then
/// the live draw preview. `origin` is the overlay's top-left in screen
/// coordinates; all shape geometry is overlay-relative.
pub fn paint_overlay(
    painter: &Painter,
    origin: Pos2,
    overlay_size: Vec2,
    annotations: &DiagramAnnotations,
    selected: Option<&ShapeId>,
    preview: Option<(DrawKind, Bounds)>,
) {
    if annotations.is_empty() && preview.is_none() {
        paint_empty_state(painter, origin, overlay_size);
        return;
    }

    for container in &annotations.containers {
        let is_selected = matches!(selected, Some(ShapeId::Container(id)) if *id == container.id);
        paint_container(painter, origin, container, is_selected);
    }
    for note in &annotations.notes {
        let is_selected = matches!(selected, Some(ShapeId::Note(id)) if *id == note.id);
        paint_note(painter, origin, note, is_selected);
    }
    if let Some((kind, rect)) = preview {
        paint_preview(painter, origin, kind, rect);
    }
}

fn paint_empty_state(painter: &Painter, origin: Pos2, overlay_size: Vec2) {
    let frame = Rect::from_min_size(origin, overlay_size).shrink(1.0);
    dashed_rect(
        painter,
        frame,
        Stroke::new(1.0, Color32::from_rgba_unmultiplied(0, 150, 255, 50)),
    );
    painter.text(
        origin + Vec2::new(10.0, 30.0),
        Align2::LEFT_BOTTOM,
        "Annotation overlay ready - draw containers or sticky notes",
        font(),
        Color32::from_rgba_unmultiplied(100, 100, 100, 100),
    );
}

fn paint_container(painter: &Painter, origin: Pos2, container: &Container, selected: bool) {
    let base = container
        .rgb()
        .or_else(|| color::parse_hex(DEFAULT_CONTAINER_COLOR))
        .unwrap_or(Rgb::new(0x45, 0xB7, 0xD1));
    let rect = to_rect(origin, container.bounds());

    painter.rect_filled(
        rect,
        Rounding::same(CONTAINER_ARC),
        color32(base, CONTAINER_FILL_ALPHA),
    );

    // Border: dashed normally, solid and thicker while selected.
    if selected {
        painter.rect_stroke(
            rect,
            Rounding::same(CONTAINER_ARC),
            Stroke::new(2.0, color32(color::border_shade(base), 255)),
        );
    } else {
        dashed_rect(painter, rect, Stroke::new(1.0, color32(base, 255)));
    }

    // Title bar sized to the title, capped at the container width.
    let title_galley = painter.layout_no_wrap(container.title.clone(), font(), Color32::WHITE);
    let bar_width = (title_galley.size().x + 20.0).min(rect.width());
    let bar = Rect::from_min_size(rect.min, Vec2::new(bar_width, TITLE_BAR_HEIGHT));
    painter.rect_filled(bar, Rounding::same(NOTE_ARC), color32(base, 255));
    painter.text(
        bar.min + Vec2::new(TEXT_PADDING, TITLE_BAR_HEIGHT / 2.0),
        Align2::LEFT_CENTER,
        &container.title,
        font(),
        color32(color::contrasting_text_color(base), 255),
    );
}

fn paint_note(painter: &Painter, origin: Pos2, note: &StickyNote, selected: bool) {
    let base = note.rgb();
    let rect = to_rect(origin, note.bounds());
    let edge = color::border_shade(base);

    painter.rect_filled(
        rect.translate(Vec2::splat(SHADOW_OFFSET)),
        Rounding::same(NOTE_ARC),
        Color32::from_rgba_unmultiplied(0, 0, 0, SHADOW_ALPHA),
    );
    painter.rect_filled(rect, Rounding::same(NOTE_ARC), color32(base, NOTE_FILL_ALPHA));

    let border = if selected {
        color::border_shade(edge)
    } else {
        edge
    };
    painter.rect_stroke(
        rect,
        Rounding::same(NOTE_ARC),
        Stroke::new(if selected { 2.0 } else { 1.0 }, color32(border, 255)),
    );

    // Folded corner, bottom-right.
    painter.add(Shape::convex_polygon(
        vec![
            Pos2::new(rect.max.x - FOLD_SIZE, rect.max.y),
            Pos2::new(rect.max.x, rect.max.y - FOLD_SIZE),
            rect.max,
        ],
        color32(edge, 255),
        Stroke::NONE,
    ));

    if note.text.is_empty() {
        return;
    }

    let text_color = color32(color::contrasting_text_color(base), 255);
    let max_width = rect.width() - TEXT_PADDING * 2.0;
    let max_bottom = rect.max.y - TEXT_PADDING;
    let line_height = painter.fonts(|f| f.row_height(&font()));
    let lines = wrap_text(&note.text, max_width, |candidate| {
        painter
            .layout_no_wrap(candidate.to_string(), font(), text_color)
            .size()
            .x
    });

    let mut y = rect.min.y + TEXT_PADDING;
    for line in lines {
        // Body text clips at the note's height; no overflow scrolling.
        if y + line_height > max_bottom {
            break;
        }
        painter.text(
            Pos2::new(rect.min.x + TEXT_PADDING, y),
            Align2::LEFT_TOP,
            line,
            font(),
            text_color,
        );
        y += line_height;
    }
}

fn paint_preview(painter: &Painter, origin: Pos2, kind: DrawKind, rect: Bounds) {
    let base = match kind {
        DrawKind::Container => color::parse_hex(DEFAULT_CONTAINER_COLOR),
        DrawKind::Note => color::parse_hex(DEFAULT_NOTE_COLOR),
    }
    .unwrap_or(Rgb::WHITE);
    let screen = to_rect(origin, rect);

    dashed_rect(painter, screen, Stroke::new(1.5, color32(base, 255)));
    painter.text(
        screen.max + Vec2::new(6.0, 6.0),
        Align2::LEFT_TOP,
        format!("{} x {}", rect.width, rect.height),
        font(),
        color32(base, 255),
    );
}
