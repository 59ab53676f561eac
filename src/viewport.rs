//! World-to-canvas mapping: fit-to-content, cursor-anchored zoom and panning.
//!
//! Screen coordinates here are local to the canvas, with the origin at its
//! top-left corner. The host adds the canvas offset when painting.

use eframe::egui::{Pos2, Rect, Vec2, vec2};

use crate::graph::Node;

pub const FIT_PADDING: f32 = 40.0;
pub const FIT_MAX_SCALE: f32 = 2.0;
pub const MIN_ZOOM: f32 = 0.05;
pub const MAX_ZOOM: f32 = 6.0;

const SCROLL_ZOOM_RATE: f32 = 0.0018;

/// `screen = world * scale + translate`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub translate: Vec2,
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

/// Transform that centers every placed node in a `width` x `height` canvas.
/// Returns `None` when nothing is placed or the canvas has no area.
pub fn compute_fit_transform(
    nodes: &[Node],
    node_radius: f32,
    width: f32,
    height: f32,
) -> Option<ViewTransform> {
    if !(width > 0.0 && height > 0.0) {
        return None;
    }

    let mut min = vec2(f32::INFINITY, f32::INFINITY);
    let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);
    for position in nodes.iter().filter_map(|node| node.position) {
        if !(position.x.is_finite() && position.y.is_finite()) {
            continue;
        }
        min = min.min(position);
        max = max.max(position);
    }
    if !(min.x.is_finite() && max.x.is_finite()) {
        return None;
    }

    let margin = node_radius.max(0.0) + FIT_PADDING;
    let min = min - Vec2::splat(margin);
    let max = max + Vec2::splat(margin);
    let size = (max - min).max(Vec2::splat(1.0));

    let scale = (width / size.x).min(height / size.y).min(FIT_MAX_SCALE);
    let center = (min + max) * 0.5;
    Some(ViewTransform {
        translate: vec2(width, height) * 0.5 - center * scale,
        scale,
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub transform: ViewTransform,
}

impl Viewport {
    pub fn zoom(&self) -> f32 {
        self.transform.scale
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        world * self.transform.scale + self.transform.translate
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        (screen - self.transform.translate) / self.transform.scale
    }

    /// Canvas-absolute position of a world point inside `rect`.
    pub fn to_canvas(&self, rect: Rect, world: Vec2) -> Pos2 {
        rect.min + self.world_to_screen(world)
    }

    pub fn from_canvas(&self, rect: Rect, point: Pos2) -> Vec2 {
        self.screen_to_world(point - rect.min)
    }

    /// Scroll zoom that keeps the world point under `pointer` fixed.
    pub fn zoom_at(&mut self, pointer: Vec2, scroll: f32) {
        if scroll.abs() <= f32::EPSILON || !scroll.is_finite() {
            return;
        }

        let world_before = self.screen_to_world(pointer);
        let factor = (1.0 + scroll * SCROLL_ZOOM_RATE).clamp(0.85, 1.15);
        self.transform.scale = (self.transform.scale * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.transform.translate = pointer - world_before * self.transform.scale;
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.transform.translate += delta;
    }

    /// Keeps the zoom and moves `world` to the middle of the canvas.
    pub fn center_on(&mut self, world: Vec2, width: f32, height: f32) {
        self.transform.translate = vec2(width, height) * 0.5 - world * self.transform.scale;
    }

    /// Applies the fit transform; leaves the view untouched when there is
    /// nothing to fit.
    pub fn fit(&mut self, nodes: &[Node], node_radius: f32, width: f32, height: f32) -> bool {
        match compute_fit_transform(nodes, node_radius, width, height) {
            Some(transform) => {
                self.transform = transform;
                true
            }
            None => false,
        }
    }
}
