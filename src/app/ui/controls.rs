use eframe::egui::{self, Key, Response, RichText, Ui};

use kg_lens::color::{ColorScheme, CommunityDetection};
use kg_lens::highlight::PathQuery;
use kg_lens::physics::Reheat;
use kg_lens::selection::{ClickMode, Interaction};
use kg_lens::settings::{
    CHARGE_DISTANCE_RANGE, CHARGE_STRENGTH_RANGE, EDGE_THICKNESS_RANGE, GRAVITY_RANGE,
    LINK_DISTANCE_RANGE, LINK_STRENGTH_RANGE, NODE_RADIUS_RANGE, SliderRange,
    VELOCITY_DECAY_RANGE,
};

use super::super::{PathStatus, ViewModel};

const SLIDER_KEY_BASE_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;
const SEARCH_RESULT_ROWS: usize = 8;

#[derive(Clone, Copy, Default)]
struct SliderKeyHoldState {
    positive_secs: f32,
    negative_secs: f32,
}

fn slider_key_accel_multiplier(hold_secs: f32) -> f32 {
    let ramp = hold_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

/// Held arrow keys on a focused slider move it faster the longer they are held.
fn apply_slider_arrow_acceleration(
    ui: &Ui,
    response: &Response,
    value: &mut f32,
    range: SliderRange,
) -> bool {
    let state_id = response.id.with("arrow_key_hold_state");
    if !response.has_focus() {
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, SliderKeyHoldState::default()));
        return false;
    }

    let mut hold_state = ui.ctx().data(|data| {
        data.get_temp::<SliderKeyHoldState>(state_id)
            .unwrap_or_default()
    });
    let (delta_time, increase_down, decrease_down) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });

    hold_state.positive_secs = if increase_down {
        hold_state.positive_secs + delta_time
    } else {
        0.0
    };
    hold_state.negative_secs = if decrease_down {
        hold_state.negative_secs + delta_time
    } else {
        0.0
    };
    ui.ctx()
        .data_mut(|data| data.insert_temp(state_id, hold_state));

    let direction = (increase_down as i8) - (decrease_down as i8);
    if direction == 0 {
        return false;
    }

    let hold_secs = if direction > 0 {
        hold_state.positive_secs
    } else {
        hold_state.negative_secs
    };
    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold_secs);
    let old_value = *value;
    *value = range.clamp(*value + direction as f32 * range.step * speed * delta_time);
    ui.ctx().request_repaint();

    (*value - old_value).abs() > f32::EPSILON
}

fn settings_slider(ui: &mut Ui, value: &mut f32, range: SliderRange, text: &str, hover: &str) -> bool {
    let response = ui
        .add(
            egui::Slider::new(value, range.min..=range.max)
                .step_by(range.step as f64)
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    let mut changed = response.changed();
    changed |= apply_slider_arrow_acceleration(ui, &response, value, range);
    changed
}

fn scheme_picker(ui: &mut Ui, label: &str, value: &mut ColorScheme) -> bool {
    let mut changed = false;
    egui::ComboBox::from_label(label)
        .selected_text(value.label())
        .show_ui(ui, |ui| {
            for scheme in ColorScheme::ALL {
                changed |= ui.selectable_value(value, scheme, scheme.label()).changed();
            }
        });
    changed
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        let mut text_focus = self.draw_search(ui);
        ui.separator();

        let mut changed = false;
        let draft = &mut self.settings_draft;

        egui::CollapsingHeader::new("Physics")
            .default_open(true)
            .show(ui, |ui| {
                changed |= settings_slider(
                    ui,
                    &mut draft.link_distance,
                    LINK_DISTANCE_RANGE,
                    "Link distance",
                    "Rest length of every edge spring.",
                );
                changed |= settings_slider(
                    ui,
                    &mut draft.link_strength,
                    LINK_STRENGTH_RANGE,
                    "Link strength",
                    "How hard edges pull toward their rest length.",
                );
                changed |= settings_slider(
                    ui,
                    &mut draft.charge_strength,
                    CHARGE_STRENGTH_RANGE,
                    "Charge",
                    "Node repulsion; more negative pushes harder.",
                );
                changed |= settings_slider(
                    ui,
                    &mut draft.charge_distance_max,
                    CHARGE_DISTANCE_RANGE,
                    "Charge reach",
                    "Nodes farther apart than this ignore each other.",
                );
                changed |= settings_slider(
                    ui,
                    &mut draft.gravity,
                    GRAVITY_RANGE,
                    "Gravity",
                    "Pull toward the middle of the canvas.",
                );
                changed |= settings_slider(
                    ui,
                    &mut draft.velocity_decay,
                    VELOCITY_DECAY_RANGE,
                    "Velocity decay",
                    "Share of velocity lost every tick.",
                );
            });

        egui::CollapsingHeader::new("Appearance")
            .default_open(true)
            .show(ui, |ui| {
                changed |= settings_slider(
                    ui,
                    &mut draft.edge_thickness,
                    EDGE_THICKNESS_RANGE,
                    "Edge thickness",
                    "Base stroke width of edges.",
                );
                changed |= settings_slider(
                    ui,
                    &mut draft.node_radius,
                    NODE_RADIUS_RANGE,
                    "Node radius",
                    "Base radius of node discs.",
                );
                changed |= scheme_picker(ui, "Node colors", &mut draft.color_scheme);
                changed |= scheme_picker(ui, "Edge colors", &mut draft.edge_color_scheme);

                egui::ComboBox::from_label("Communities")
                    .selected_text(draft.community_detection.label())
                    .show_ui(ui, |ui| {
                        for community in CommunityDetection::ALL {
                            changed |= ui
                                .selectable_value(
                                    &mut draft.community_detection,
                                    community,
                                    community.label(),
                                )
                                .changed();
                        }
                    })
                    .response
                    .on_hover_text("Color nodes by a community grouping instead of by index.");
            });

        egui::CollapsingHeader::new("Relevance filter")
            .default_open(false)
            .show(ui, |ui| {
                let range = &mut draft.relevance_range;
                let min_changed = ui
                    .add(egui::Slider::new(&mut range.min, 0.0..=1.0).text("Minimum"))
                    .changed();
                let max_changed = ui
                    .add(egui::Slider::new(&mut range.max, 0.0..=1.0).text("Maximum"))
                    .changed();
                if min_changed && range.min > range.max {
                    range.max = range.min;
                }
                if max_changed && range.max < range.min {
                    range.min = range.max;
                }
                changed |= min_changed || max_changed;
                ui.small("Edges outside the range stay visible but grayed out.");
            });

        if changed {
            self.commit_settings();
        }
        if let Some(error) = &self.settings_error {
            ui.colored_label(egui::Color32::from_rgb(235, 110, 90), error);
        }

        ui.separator();
        text_focus |= self.draw_path_query(ui);
        self.text_input_focused = text_focus;

        ui.separator();
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.live_physics, "Live physics")
                .on_hover_text("Advance the layout every frame.");
            if ui.button("Reheat").clicked() {
                self.explorer.reheat(Reheat::Moderate);
            }
            if ui.button("Deselect all").clicked() {
                self.explorer.interact(Interaction::ClickBackground {
                    mode: ClickMode::Deselect,
                });
            }
        });
        ui.checkbox(&mut self.show_quadtree_overlay, "Show quadtree overlay")
            .on_hover_text("Draw the Barnes-Hut cells over the graph canvas.");

        ui.separator();
        egui::CollapsingHeader::new("Mouse and keys")
            .default_open(false)
            .show(ui, |ui| {
                for line in [
                    "Click: select and pin a node",
                    "Shift + click: deselect (background: everything)",
                    "N + click: grow the neighborhood by one hop",
                    "M + click: select the next exact hop layer",
                    "Drag: move a node; hold Space to move the selection",
                    "Right or middle drag: pan, scroll: zoom",
                ] {
                    ui.small(line);
                }
            });
    }

    fn commit_settings(&mut self) {
        match self.explorer.update_settings(self.settings_draft.clone()) {
            Ok(()) => {
                self.settings_error = None;
                self.settings_draft = self.explorer.settings().clone();
            }
            Err(error) => {
                tracing::warn!(%error, "settings rejected");
                self.settings_error = Some(error.to_string());
                self.settings_draft = self.explorer.settings().clone();
            }
        }
    }

    /// Returns whether the search box has keyboard focus.
    fn draw_search(&mut self, ui: &mut Ui) -> bool {
        ui.label("Find node").on_hover_text("Fuzzy match on label or id.");
        let focused = ui.text_edit_singleline(&mut self.search).has_focus();

        let matches = self.explorer.model().search(&self.search, SEARCH_RESULT_ROWS);
        let mut picked = None;
        for index in matches {
            let node = &self.explorer.model().nodes[index];
            if ui.link(&node.label).on_hover_text(node.id.as_str()).clicked() {
                picked = Some(index);
            }
        }

        if let Some(index) = picked {
            self.explorer.interact(Interaction::ClickNode {
                node: index,
                mode: ClickMode::Plain,
            });
            self.focus_node(index);
            let size = self.explorer.viewport_size();
            if let Some(position) = self.explorer.model().nodes[index].position {
                self.viewport.center_on(position, size.x, size.y);
            }
        }
        focused
    }

    fn draw_path_query(&mut self, ui: &mut Ui) -> bool {
        ui.label(RichText::new("Path highlight").strong());
        ui.label("Edge labels, comma separated");
        let focused = ui.text_edit_singleline(&mut self.path_labels).has_focus();

        ui.horizontal(|ui| {
            if ui.button("Highlight path").clicked() {
                let query = PathQuery::from_labels(&self.path_labels);
                self.run_path_query(&query);
            }
            if let Some(query) = self.loaded_query.clone()
                && ui
                    .button("Loaded query")
                    .on_hover_text("Re-run the query file given on the command line.")
                    .clicked()
            {
                self.path_labels = query.edge_types.join(", ");
                self.run_path_query(&query);
            }
            if ui.button("Clear").clicked() {
                self.explorer.reset_highlight();
                self.path_status = None;
            }
        });

        match &self.path_status {
            Some(PathStatus::Found { hops, attempts }) => {
                ui.label(format!("Highlighted {hops} hops after {attempts} attempts."));
            }
            Some(PathStatus::Failed(reason)) => {
                ui.colored_label(egui::Color32::from_rgb(235, 110, 90), reason);
            }
            None => {}
        }
        focused
    }
}
