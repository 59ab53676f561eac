use eframe::egui::{self, Align, Context, Layout};

use kg_lens::explorer::Explorer;
use kg_lens::graph::GraphPayload;
use kg_lens::highlight::PathQuery;
use kg_lens::viewport::Viewport;

use super::super::{PathStatus, ViewModel, ViewScratch};

impl ViewModel {
    pub(in crate::app) fn new(explorer: Explorer, source_label: String) -> Self {
        Self {
            settings_draft: explorer.settings().clone(),
            explorer,
            viewport: Viewport::default(),
            source_label,
            settings_error: None,
            search: String::new(),
            path_labels: String::new(),
            loaded_query: None,
            path_status: None,
            focused: None,
            text_input_focused: false,
            live_physics: true,
            show_quadtree_overlay: false,
            fit_after_settle: true,
            fit_requested: false,
            drag_world_pos: None,
            visible_node_count: 0,
            visible_edge_count: 0,
            view_scratch: ViewScratch::default(),
        }
    }

    /// Feeds a freshly read payload through the explorer and applies a path
    /// query shipped alongside it.
    pub(in crate::app) fn load(&mut self, payload: GraphPayload, query: Option<PathQuery>) {
        self.explorer.load(&payload);
        self.drag_world_pos = None;
        self.fit_after_settle = true;

        if let Some(query) = query {
            self.path_labels = query.edge_types.join(", ");
            self.run_path_query(&query);
            self.loaded_query = Some(query);
        }
    }

    pub(in crate::app) fn run_path_query(&mut self, query: &PathQuery) {
        self.path_status = Some(match self.explorer.highlight_path(query) {
            Ok(path) => PathStatus::Found {
                hops: path.edges.len(),
                attempts: path.attempts,
            },
            Err(error) => PathStatus::Failed(error.to_string()),
        });
    }

    fn status_text(&self) -> String {
        match self.explorer.engine() {
            Some(engine) if engine.is_running() => format!("simulating (alpha {:.3})", engine.alpha()),
            Some(engine) if engine.is_stopped() => "stopped".to_owned(),
            Some(_) => "settled".to_owned(),
            None => "idle".to_owned(),
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        let status_text = self.status_text();
        let visible_text = format!(
            "visible {} nodes / {} edges",
            self.visible_node_count, self.visible_edge_count
        );

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let model = self.explorer.model();
                    ui.heading("kg-lens");
                    ui.separator();
                    ui.label(format!("source: {}", self.source_label));
                    ui.label(format!("nodes: {}", model.nodes.len()));
                    ui.label(format!("edges: {}", model.edges.len()));
                    ui.label(format!("selected: {}", model.selected_indices().len()));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload graph"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if ui.button("Fit view").clicked() {
                        self.fit_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(status_text);
                        ui.label(visible_text);
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("controls_scroll")
                    .show(ui, |ui| self.draw_controls(ui));
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("details_scroll")
                    .show(ui, |ui| self.draw_details(ui));
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));
    }
}
