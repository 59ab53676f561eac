use eframe::egui::{self, Key, PointerButton, Pos2, Rect, Ui};

use kg_lens::selection::{ClickMode, Interaction};

use super::super::render_utils::circle_visible;
use super::super::{ViewModel, ViewScratch};

/// Modifier keys held at click time, resolved into an explicit mode. Letter
/// keys are ignored while a text field has focus.
fn click_mode(ui: &Ui, letters_free: bool) -> ClickMode {
    ui.input(|input| {
        if input.modifiers.shift {
            ClickMode::Deselect
        } else if letters_free && input.key_down(Key::N) {
            ClickMode::Neighborhood
        } else if letters_free && input.key_down(Key::M) {
            ClickMode::ExactLayer
        } else {
            ClickMode::Plain
        }
    })
}

fn group_drag_held(ui: &Ui, letters_free: bool) -> bool {
    letters_free && ui.input(|input| input.key_down(Key::Space))
}

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        self.viewport.zoom_at(pointer - rect.min, scroll);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(PointerButton::Secondary)
            || response.dragged_by(PointerButton::Middle)
        {
            self.viewport.pan_by(response.drag_delta());
        }
    }

    pub(in crate::app) fn visible_indices_into(rect: Rect, scratch: &mut ViewScratch) {
        scratch.visible_indices.clear();
        scratch.visible_mask.clear();
        scratch.visible_mask.resize(scratch.screen_positions.len(), false);

        for (index, (&position, &radius)) in scratch
            .screen_positions
            .iter()
            .zip(&scratch.screen_radii)
            .enumerate()
        {
            if circle_visible(rect, position, radius) {
                scratch.visible_indices.push(index);
                scratch.visible_mask[index] = true;
            }
        }
    }

    /// Closest visible node whose disc contains `point`.
    pub(in crate::app) fn node_at(&self, point: Pos2) -> Option<usize> {
        let scratch = &self.view_scratch;
        scratch
            .visible_indices
            .iter()
            .filter_map(|&index| {
                let distance = scratch.screen_positions[index].distance(point);
                (distance <= scratch.screen_radii[index]).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    pub(in crate::app) fn hovered_index(&self, ui: &Ui) -> Option<usize> {
        ui.input(|input| input.pointer.hover_pos())
            .and_then(|pointer| self.node_at(pointer))
    }

    /// Turns primary-button clicks and drags on the canvas into selection
    /// interactions.
    pub(in crate::app) fn handle_graph_pointer(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        let (pointer, press_origin) = ui.input(|input| {
            (
                input.pointer.interact_pos(),
                input.pointer.press_origin(),
            )
        });

        if response.drag_started_by(PointerButton::Primary)
            && let Some(node) = press_origin.and_then(|origin| self.node_at(origin))
        {
            self.explorer.interact(Interaction::DragStart { node });
            self.drag_world_pos = None;
            self.focus_node(node);
        }

        if let Some(node) = self.explorer.selection().dragged_node() {
            if response.dragged_by(PointerButton::Primary)
                && let Some(pointer) = pointer
            {
                let position = self.viewport.from_canvas(rect, pointer);
                self.drag_world_pos = Some(position);
                self.explorer.interact(Interaction::DragMove {
                    node,
                    position,
                    group: group_drag_held(ui, !self.text_input_focused),
                });
            }

            if response.drag_stopped_by(PointerButton::Primary) {
                let position = self
                    .drag_world_pos
                    .take()
                    .or_else(|| {
                        let node = self.explorer.model().nodes.get(node)?;
                        node.fixed_position.or(node.position)
                    })
                    .unwrap_or_default();
                self.explorer
                    .interact(Interaction::DragEnd { node, position });
            }
        }

        if response.clicked_by(PointerButton::Primary) {
            let mode = click_mode(ui, !self.text_input_focused);
            match pointer.and_then(|pointer| self.node_at(pointer)) {
                Some(node) => {
                    self.explorer.interact(Interaction::ClickNode { node, mode });
                    self.focus_node(node);
                }
                None => {
                    self.explorer.interact(Interaction::ClickBackground { mode });
                }
            }
        }
    }

    pub(in crate::app) fn focus_node(&mut self, index: usize) {
        self.focused = self
            .explorer
            .model()
            .nodes
            .get(index)
            .map(|node| node.id.clone());
    }
}
