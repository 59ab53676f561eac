use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::Result;
use eframe::egui::{self, Context, Pos2};

use kg_lens::explorer::Explorer;
use kg_lens::graph::{GraphPayload, load_payload, parse_payload};
use kg_lens::highlight::PathQuery;
use kg_lens::physics::QuadtreeCell;
use kg_lens::settings::Settings;
use kg_lens::viewport::Viewport;

mod graph;
mod render_utils;
mod ui;

const SAMPLE_GRAPH: &str = include_str!("../../assets/sample_graph.json");

/// Files named on the command line; `None` falls back to bundled defaults.
#[derive(Clone, Debug, Default)]
pub struct LoadRequest {
    pub graph: Option<PathBuf>,
    pub settings: Option<PathBuf>,
    pub path_query: Option<PathBuf>,
}

impl LoadRequest {
    fn source_label(&self) -> String {
        self.graph
            .as_ref()
            .map_or_else(|| "bundled sample".to_owned(), |path| path.display().to_string())
    }

    fn load(&self) -> Result<LoadedGraph> {
        let payload = match &self.graph {
            Some(path) => load_payload(path)?,
            None => parse_payload(SAMPLE_GRAPH)?,
        };
        let settings = match &self.settings {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        let query = self.path_query.as_deref().map(PathQuery::load).transpose()?;

        Ok(LoadedGraph {
            payload,
            settings,
            query,
        })
    }
}

struct LoadedGraph {
    payload: GraphPayload,
    settings: Settings,
    query: Option<PathQuery>,
}

type LoadResult = Result<LoadedGraph, String>;

pub struct KgLensApp {
    request: LoadRequest,
    seed: Option<u64>,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    explorer: Explorer,
    viewport: Viewport,
    source_label: String,
    settings_draft: Settings,
    settings_error: Option<String>,
    search: String,
    path_labels: String,
    loaded_query: Option<PathQuery>,
    path_status: Option<PathStatus>,
    focused: Option<String>,
    text_input_focused: bool,
    live_physics: bool,
    show_quadtree_overlay: bool,
    fit_after_settle: bool,
    fit_requested: bool,
    drag_world_pos: Option<egui::Vec2>,
    visible_node_count: usize,
    visible_edge_count: usize,
    view_scratch: ViewScratch,
}

enum PathStatus {
    Found { hops: usize, attempts: usize },
    Failed(String),
}

#[derive(Default)]
struct ViewScratch {
    screen_positions: Vec<Pos2>,
    screen_radii: Vec<f32>,
    visible_indices: Vec<usize>,
    visible_mask: Vec<bool>,
    quadtree_cells: Vec<QuadtreeCell>,
}

impl KgLensApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, request: LoadRequest, seed: Option<u64>) -> Self {
        let state = Self::start_load(&request);
        Self {
            request,
            seed,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(request: LoadRequest) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = request.load().map_err(|error| {
                let message = format!("{error:#}");
                tracing::warn!(%message, "graph load failed");
                message
            });
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(request: &LoadRequest) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(request.clone()),
        }
    }

    fn build_view(request: &LoadRequest, seed: Option<u64>, loaded: LoadedGraph) -> ViewModel {
        let explorer = match seed {
            Some(seed) => Explorer::with_seed(loaded.settings, seed),
            None => Explorer::new(loaded.settings),
        };
        let mut view = ViewModel::new(explorer, request.source_label());
        view.load(loaded.payload, loaded.query);
        view
    }
}

impl eframe::App for KgLensApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(loaded)) => {
                        let view = Self::build_view(&self.request, self.seed, loaded);
                        transition = Some(AppState::Ready(Box::new(view)));
                    }
                    Ok(Err(error)) => transition = Some(AppState::Error(error)),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading knowledge graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load knowledge graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.request));
                    }
                });
            }
            AppState::Ready(view) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                view.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.request.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        // same ids keep their selection, pins and colors
                        Ok(Ok(loaded)) => view.load(loaded.payload, loaded.query),
                        Ok(Err(error)) => transition = Some(AppState::Error(error)),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(AppState::Error("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            if let AppState::Ready(view) = &mut self.state {
                view.explorer.stop();
            }
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
