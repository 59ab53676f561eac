use eframe::egui::{self, RichText, Ui};

use kg_lens::selection::Anchor;

use super::super::ViewModel;

const NEIGHBOR_ROWS: usize = 48;
const DROPPED_ROWS: usize = 24;

fn anchor_line(ui: &mut Ui, title: &str, anchor: &Anchor) {
    match &anchor.source {
        Some(source) => ui.label(format!("{title}: {source} at depth {}", anchor.depth)),
        None => ui.label(format!("{title}: none")),
    };
}

impl ViewModel {
    /// Focused node, else the first selected one.
    fn details_index(&self) -> Option<usize> {
        let model = self.explorer.model();
        self.focused
            .as_deref()
            .and_then(|id| model.index_of(id))
            .or_else(|| model.selected_indices().first().copied())
    }

    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        match self.details_index() {
            Some(index) => self.draw_node_details(ui, index),
            None => {
                ui.label("Click a node or pick a search result.");
            }
        }

        ui.separator();
        ui.label(RichText::new("Anchors").strong());
        let selection = self.explorer.selection();
        anchor_line(ui, "Neighborhood", selection.neighborhood_anchor());
        anchor_line(ui, "Exact layer", selection.exact_layer_anchor());

        self.draw_dropped_edges(ui);
    }

    fn draw_node_details(&mut self, ui: &mut Ui, index: usize) {
        let model = self.explorer.model();
        let Some(node) = model.nodes.get(index) else {
            ui.label("Focused node no longer exists in the graph.");
            return;
        };

        ui.label(RichText::new(&node.label).strong());
        ui.small(node.id.as_str());
        ui.add_space(6.0);

        ui.label(format!("Degree: {}", model.degree(index)));
        let mut flags = Vec::new();
        if node.selected {
            flags.push("selected");
        }
        if node.is_pinned() {
            flags.push("pinned");
        }
        if node.highlighted {
            flags.push("on path");
        }
        if !flags.is_empty() {
            ui.label(flags.join(", "));
        }
        if let Some(position) = node.position {
            ui.small(format!("at ({:.1}, {:.1})", position.x, position.y));
        }
        if let Some(tooltip) = &node.tooltip_text {
            ui.label(format!("Example: {tooltip}"));
        }

        let mut color = node.color;
        let source = node.color_source;
        let neighbors: Vec<(usize, String)> = model
            .neighbors(index)
            .iter()
            .take(NEIGHBOR_ROWS)
            .map(|&neighbor| (neighbor, model.nodes[neighbor].label.clone()))
            .collect();
        let neighbor_total = model.neighbors(index).len();

        ui.separator();
        ui.horizontal(|ui| {
            ui.label("Color");
            if egui::color_picker::color_edit_button_srgba(
                ui,
                &mut color,
                egui::color_picker::Alpha::Opaque,
            )
            .changed()
            {
                self.explorer.set_manual_color(index, color);
            }
            ui.small(format!("{source:?}").to_lowercase());
        });
        if ui.button("Use scheme color").clicked() {
            self.explorer.clear_manual_color(index);
        }

        ui.separator();
        ui.label(RichText::new(format!("Neighbors ({neighbor_total})")).strong());
        if neighbors.is_empty() {
            ui.label("Isolated node.");
        }
        let mut picked = None;
        for (neighbor, label) in neighbors {
            if ui.link(label).clicked() {
                picked = Some(neighbor);
            }
        }
        if neighbor_total > NEIGHBOR_ROWS {
            ui.small(format!("and {} more", neighbor_total - NEIGHBOR_ROWS));
        }
        if let Some(neighbor) = picked {
            self.focus_node(neighbor);
        }
    }

    fn draw_dropped_edges(&self, ui: &mut Ui) {
        let dropped = &self.explorer.model().dropped_edges;
        if dropped.is_empty() {
            return;
        }

        ui.separator();
        egui::CollapsingHeader::new(format!("Skipped edges ({})", dropped.len()))
            .default_open(false)
            .show(ui, |ui| {
                for edge in dropped.iter().take(DROPPED_ROWS) {
                    let missing = match (edge.missing_source, edge.missing_target) {
                        (true, true) => "both ends",
                        (true, false) => "source",
                        _ => "target",
                    };
                    ui.small(format!(
                        "#{} {} -> {} (unknown {missing})",
                        edge.position, edge.source_id, edge.target_id
                    ));
                }
            });
    }
}
