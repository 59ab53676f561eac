use std::collections::HashSet;

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Sense, Stroke, Ui, vec2};

use kg_lens::color::{HIGHLIGHT_COLOR, SELECTED_STROKE_COLOR, edge_style};
use kg_lens::physics::quadtree_cells;
use kg_lens::truncate_label;

use super::super::ViewModel;
use super::super::render_utils::{
    HOVER_COLOR, SEARCH_MATCH_COLOR, blend_color, dim_color, draw_background, edge_visible,
    screen_radius,
};

const SEARCH_HIGHLIGHT_LIMIT: usize = 64;
const LABEL_CHARS: usize = 28;

impl ViewModel {
    fn update_screen_space(&mut self, rect: egui::Rect) {
        let zoom = self.viewport.zoom();
        let base_radius = self.explorer.settings().node_radius;
        let center = rect.min + self.explorer.viewport_size() * 0.5;

        let scratch = &mut self.view_scratch;
        scratch.screen_positions.clear();
        scratch.screen_radii.clear();
        for node in &self.explorer.model().nodes {
            let position = node
                .position
                .map_or(center, |world| self.viewport.to_canvas(rect, world));
            scratch.screen_positions.push(position);
            scratch.screen_radii.push(screen_radius(base_radius, zoom));
        }
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.explorer.resize(rect.width(), rect.height());
        draw_background(&painter, rect, &self.viewport);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);

        if self.explorer.model().is_empty() {
            self.visible_node_count = 0;
            self.visible_edge_count = 0;
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "The graph has no nodes.",
                FontId::proportional(15.0),
                Color32::from_gray(200),
            );
            return;
        }

        if self.live_physics && self.explorer.tick() {
            ui.ctx().request_repaint();
        }
        if response.dragged() {
            ui.ctx().request_repaint();
        }

        if self.fit_requested || (self.fit_after_settle && !self.explorer.is_animating()) {
            let settings = self.explorer.settings();
            self.viewport.fit(
                &self.explorer.model().nodes,
                settings.node_radius,
                rect.width(),
                rect.height(),
            );
            self.fit_requested = false;
            self.fit_after_settle = false;
        }

        self.update_screen_space(rect);
        Self::visible_indices_into(rect, &mut self.view_scratch);
        self.visible_node_count = self.view_scratch.visible_indices.len();

        self.handle_graph_pointer(ui, rect, &response);
        // pointer handling may have pinned or moved nodes
        self.update_screen_space(rect);

        if self.show_quadtree_overlay {
            self.draw_quadtree_overlay(&painter, rect);
        }

        let hovered = self.hovered_index(ui);
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let search_matches = self
            .explorer
            .model()
            .search(&self.search, SEARCH_HIGHLIGHT_LIMIT)
            .into_iter()
            .collect::<HashSet<_>>();

        self.draw_edges(&painter, rect);
        self.draw_nodes(ui, &painter, hovered, &search_matches);

        if let Some(index) = hovered
            && let Some(node) = self.explorer.model().nodes.get(index)
        {
            let mut panel_text = format!(
                "{}  |  {}  |  degree {}",
                node.label,
                node.id,
                self.explorer.model().degree(index)
            );
            if let Some(tooltip) = &node.tooltip_text {
                panel_text.push('\n');
                panel_text.push_str(tooltip);
            }
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }
    }

    fn draw_quadtree_overlay(&mut self, painter: &egui::Painter, rect: egui::Rect) {
        quadtree_cells(self.explorer.model(), &mut self.view_scratch.quadtree_cells);
        for cell in &self.view_scratch.quadtree_cells {
            let min = self
                .viewport
                .to_canvas(rect, cell.center - vec2(cell.half_extent, cell.half_extent));
            let max = self
                .viewport
                .to_canvas(rect, cell.center + vec2(cell.half_extent, cell.half_extent));

            let alpha = if cell.is_leaf { 110 } else { 55 };
            let line_width = (1.4 - cell.depth as f32 * 0.09).clamp(0.45, 1.4);
            painter.rect_stroke(
                egui::Rect::from_min_max(min, max),
                0.0,
                Stroke::new(line_width, Color32::from_rgba_unmultiplied(106, 198, 255, alpha)),
                egui::StrokeKind::Middle,
            );
        }
    }

    fn draw_edges(&mut self, painter: &egui::Painter, rect: egui::Rect) {
        let model = self.explorer.model();
        let settings = self.explorer.settings();
        let scratch = &self.view_scratch;
        let zoom_sqrt = self.viewport.zoom().sqrt();

        let mut visible_edge_count = 0;
        for edge in &model.edges {
            let (Some(&start), Some(&end)) = (
                scratch.screen_positions.get(edge.source),
                scratch.screen_positions.get(edge.target),
            ) else {
                continue;
            };
            let endpoint_visible = scratch.visible_mask[edge.source] || scratch.visible_mask[edge.target];
            if !endpoint_visible && !edge_visible(rect, start, end, 2.5) {
                continue;
            }

            let style = edge_style(edge, settings.edge_color_scheme, settings.relevance_range);
            let width = (settings.edge_thickness * style.width_scale * zoom_sqrt).clamp(0.4, 8.0);
            let stroke = Stroke::new(width, style.color);

            if edge.is_self_loop() {
                let radius = scratch.screen_radii[edge.source];
                painter.circle_stroke(start - vec2(0.0, radius * 1.4), radius * 0.9, stroke);
            } else {
                painter.line_segment([start, end], stroke);
            }
            visible_edge_count += 1;

            if let Some(label) = &edge.highlight_label {
                painter.text(
                    start + (end - start) * 0.5 - vec2(0.0, 8.0),
                    Align2::CENTER_BOTTOM,
                    label,
                    FontId::proportional(12.0),
                    HIGHLIGHT_COLOR,
                );
            }
        }
        self.visible_edge_count = visible_edge_count;
    }

    fn draw_nodes(
        &self,
        ui: &Ui,
        painter: &egui::Painter,
        hovered: Option<usize>,
        search_matches: &HashSet<usize>,
    ) {
        let model = self.explorer.model();
        let scratch = &self.view_scratch;
        let zoom = self.viewport.zoom();
        let focus_active = model.nodes.iter().any(|node| node.highlighted);
        let mut selection_animating = false;

        for &index in &scratch.visible_indices {
            let node = &model.nodes[index];
            let position: Pos2 = scratch.screen_positions[index];
            let radius = scratch.screen_radii[index];
            let is_hovered = hovered == Some(index);
            let is_match = search_matches.contains(&index);

            let fill = if is_hovered {
                HOVER_COLOR
            } else if is_match {
                blend_color(node.color, SEARCH_MATCH_COLOR, 0.68)
            } else if focus_active && !node.highlighted && !node.selected {
                dim_color(node.color, 0.52)
            } else {
                node.color
            };
            painter.circle_filled(position, radius, fill);

            let selection_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("node-selection", node.id.as_str())),
                node.selected,
            );
            if selection_mix > 0.0 && selection_mix < 1.0 {
                selection_animating = true;
            }
            if selection_mix > 0.0 {
                let halo_strength = (selection_mix * (1.0 - selection_mix) * 4.0).clamp(0.0, 1.0);
                let halo_alpha = (30.0 + halo_strength * 145.0) as u8;
                painter.circle_stroke(
                    position,
                    radius + 4.0 + (1.0 - selection_mix) * 6.0,
                    Stroke::new(
                        1.0 + halo_strength * 1.6,
                        Color32::from_rgba_unmultiplied(245, 206, 93, halo_alpha),
                    ),
                );
            }

            let (ring_width, ring_color) = if node.highlighted {
                (2.4, HIGHLIGHT_COLOR)
            } else if node.selected {
                (1.0 + selection_mix * 1.2, SELECTED_STROKE_COLOR)
            } else {
                (1.0, Color32::from_rgba_unmultiplied(15, 15, 15, 190))
            };
            painter.circle_stroke(position, radius, Stroke::new(ring_width, ring_color));

            let should_draw_label = node.selected
                || node.highlighted
                || is_hovered
                || (is_match && zoom > 0.35)
                || zoom > 1.35;
            if should_draw_label {
                painter.text(
                    position + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    truncate_label(&node.label, LABEL_CHARS),
                    FontId::proportional(12.0),
                    Color32::from_gray(238),
                );
            }
        }

        if selection_animating {
            ui.ctx().request_repaint();
        }
    }
}
