//! Single owner of the graph, the simulation and the interaction state.
//!
//! The host forwards every input through here; nothing else mutates the model
//! between ticks.

use eframe::egui::{Color32, Vec2, vec2};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::color::{apply_color_scheme, clear_manual_color, set_manual_color};
use crate::graph::{GraphModel, GraphPayload};
use crate::highlight::{HighlightedPath, PathError, PathHighlighter, PathQuery};
use crate::physics::{EngineKey, PhysicsEngine, Reheat};
use crate::selection::{Interaction, SelectionController};
use crate::settings::{PhysicsParams, Settings, SettingsError};

/// Energy kept in the layout while a node is being dragged.
pub const DRAG_ALPHA_TARGET: f32 = 0.3;

const DEFAULT_VIEWPORT: Vec2 = vec2(800.0, 600.0);

pub struct Explorer {
    model: GraphModel,
    engine: Option<PhysicsEngine>,
    selection: SelectionController,
    highlighter: PathHighlighter,
    settings: Settings,
    viewport: Vec2,
    rng: StdRng,
    stopped: bool,
}

impl Explorer {
    pub fn new(settings: Settings) -> Self {
        Self::with_rng(settings, StdRng::from_os_rng())
    }

    /// Reproducible path sampling.
    pub fn with_seed(settings: Settings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: Settings, rng: StdRng) -> Self {
        let settings = settings.sanitized().unwrap_or_else(|error| {
            tracing::warn!(%error, "invalid initial settings, using defaults");
            Settings::default()
        });
        Self {
            model: GraphModel::default(),
            engine: None,
            selection: SelectionController::new(),
            highlighter: PathHighlighter::default(),
            settings,
            viewport: DEFAULT_VIEWPORT,
            rng,
            stopped: false,
        }
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn engine(&self) -> Option<&PhysicsEngine> {
        self.engine.as_ref()
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn viewport_size(&self) -> Vec2 {
        self.viewport
    }

    pub fn set_max_path_attempts(&mut self, max_attempts: usize) {
        self.highlighter = PathHighlighter::with_max_attempts(max_attempts);
    }

    /// Rebuilds the model from `payload`, carrying state over by node id, and
    /// restarts the simulation. After [`Explorer::stop`] the model is still
    /// rebuilt but no simulation runs.
    pub fn load(&mut self, payload: &GraphPayload) {
        let model = GraphModel::build(payload, Some(&self.model));
        if !model.dropped_edges.is_empty() {
            tracing::warn!(
                dropped = model.dropped_edges.len(),
                "edges with unknown endpoints were skipped"
            );
        }
        tracing::info!(
            nodes = model.nodes.len(),
            edges = model.edges.len(),
            revision = model.revision(),
            "graph loaded"
        );

        self.model = model;
        self.selection.cancel_drag();
        apply_color_scheme(
            &mut self.model,
            self.settings.color_scheme,
            self.settings.community_detection,
        );
        self.restart_engine();
    }

    /// Advances the layout one step; false once it has cooled or stopped.
    pub fn tick(&mut self) -> bool {
        match self.engine.as_mut() {
            Some(engine) => engine.tick(&mut self.model),
            None => false,
        }
    }

    pub fn is_animating(&self) -> bool {
        self.engine.as_ref().is_some_and(PhysicsEngine::is_running)
    }

    pub fn interact(&mut self, interaction: Interaction) -> Option<Reheat> {
        let reheat = self.selection.apply(&mut self.model, interaction);
        if let Some(engine) = self.engine.as_mut() {
            if let Some(reheat) = reheat {
                engine.reheat_with(reheat);
            }
            match interaction {
                Interaction::DragStart { .. } if self.selection.is_dragging() => {
                    engine.set_alpha_target(DRAG_ALPHA_TARGET);
                }
                Interaction::DragEnd { .. } => engine.set_alpha_target(0.0),
                _ => {}
            }
        }
        reheat
    }

    /// Kicks the layout without changing any state, e.g. from a host button.
    pub fn reheat(&mut self, reheat: Reheat) {
        if let Some(engine) = self.engine.as_mut() {
            engine.reheat_with(reheat);
        }
    }

    pub fn highlight_path(&mut self, query: &PathQuery) -> Result<HighlightedPath, PathError> {
        let path = self.highlighter.highlight(&mut self.model, query, &mut self.rng)?;
        if let Some(engine) = self.engine.as_mut() {
            engine.reheat_with(Reheat::Gentle);
        }
        Ok(path)
    }

    pub fn reset_highlight(&mut self) {
        PathHighlighter::reset(&mut self.model);
    }

    /// Validates and applies new settings. Rejected settings leave everything
    /// as it was.
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), SettingsError> {
        let next = settings.sanitized()?;
        let physics = next.physics()?;

        if let Some(engine) = self.engine.as_mut()
            && engine.params() != physics
        {
            engine.update_params(physics)?;
            engine.reheat_with(Reheat::Gentle);
        }

        if self.settings.colors_differ(&next) {
            apply_color_scheme(&mut self.model, next.color_scheme, next.community_detection);
            self.reheat(Reheat::Gentle);
            tracing::debug!(
                scheme = next.color_scheme.label(),
                community = next.community_detection.label(),
                "recolored nodes"
            );
        }

        self.settings = next;
        Ok(())
    }

    pub fn set_manual_color(&mut self, index: usize, color: Color32) -> bool {
        let Some(node) = self.model.nodes.get_mut(index) else {
            return false;
        };
        set_manual_color(node, color);
        self.reheat(Reheat::Gentle);
        true
    }

    /// Returns a manually colored node to the active scheme.
    pub fn clear_manual_color(&mut self, index: usize) -> bool {
        let Some(node) = self.model.nodes.get_mut(index) else {
            return false;
        };
        clear_manual_color(node);
        apply_color_scheme(
            &mut self.model,
            self.settings.color_scheme,
            self.settings.community_detection,
        );
        self.reheat(Reheat::Gentle);
        true
    }

    /// Records the canvas size; the simulation is rebuilt around the new
    /// center when it changed.
    pub fn resize(&mut self, width: f32, height: f32) {
        if self.stopped {
            tracing::debug!(width, height, "ignoring resize on stopped explorer");
            return;
        }
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return;
        }
        self.viewport = vec2(width, height);

        let key = EngineKey {
            revision: self.model.revision(),
            width,
            height,
        };
        if self.engine.as_ref().is_some_and(|engine| engine.key() != key) {
            self.restart_engine();
        }
    }

    /// Permanent: later loads, resizes and ticks never start a simulation.
    pub fn stop(&mut self) {
        self.stopped = true;
        if let Some(engine) = self.engine.as_mut() {
            engine.stop();
        }
    }

    fn restart_engine(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.stop();
        }
        if self.stopped {
            tracing::debug!("explorer stopped, not restarting the simulation");
            return;
        }
        let params = self.settings.physics().unwrap_or_else(|error| {
            tracing::warn!(%error, "stored settings rejected, using default physics");
            PhysicsParams::default()
        });
        self.engine = Some(PhysicsEngine::start(
            &mut self.model,
            self.viewport.x,
            self.viewport.y,
            params,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{ColorScheme, DEFAULT_NODE_COLOR};
    use crate::graph::{ColorSource, RawEdge, RawNode};
    use crate::selection::ClickMode;

    fn triangle() -> GraphPayload {
        GraphPayload {
            nodes: ["a", "b", "c"].into_iter().map(|id| RawNode::new(id, id)).collect(),
            edges: vec![
                RawEdge::new("a", "b", "x"),
                RawEdge::new("b", "c", "y"),
                RawEdge::new("c", "a", "z"),
            ],
        }
    }

    #[test]
    fn load_places_nodes_and_starts_engine() {
        let mut explorer = Explorer::with_seed(Settings::default(), 7);
        explorer.load(&triangle());

        assert!(explorer.is_animating());
        assert!(explorer.model().nodes.iter().all(|node| node.position.is_some()));
        assert!(explorer.tick());
    }

    #[test]
    fn invalid_settings_are_not_applied() {
        let mut explorer = Explorer::with_seed(Settings::default(), 7);
        explorer.load(&triangle());

        let bad = Settings {
            link_distance: f32::NAN,
            ..Settings::default()
        };
        assert!(explorer.update_settings(bad).is_err());
        assert_eq!(explorer.settings(), &Settings::default());
        assert_eq!(
            explorer.engine().map(PhysicsEngine::params),
            Some(PhysicsParams::default())
        );
    }

    #[test]
    fn scheme_change_keeps_manual_colors() {
        let mut explorer = Explorer::with_seed(Settings::default(), 7);
        explorer.load(&triangle());
        let picked = Color32::from_rgb(1, 2, 3);
        assert!(explorer.set_manual_color(1, picked));

        explorer
            .update_settings(Settings {
                color_scheme: ColorScheme::Viridis,
                ..Settings::default()
            })
            .unwrap();

        assert_eq!(explorer.model().nodes[1].color, picked);
        assert_eq!(explorer.model().nodes[1].color_source, ColorSource::Manual);
        assert_ne!(explorer.model().nodes[0].color, DEFAULT_NODE_COLOR);

        assert!(explorer.clear_manual_color(1));
        assert_ne!(explorer.model().nodes[1].color, picked);
    }

    #[test]
    fn drag_keeps_layout_warm_until_release() {
        let mut explorer = Explorer::with_seed(Settings::default(), 7);
        explorer.load(&triangle());
        while explorer.tick() {}
        assert!(!explorer.is_animating());

        explorer.interact(Interaction::DragStart { node: 0 });
        for _ in 0..500 {
            explorer.tick();
        }
        assert!(explorer.is_animating());

        explorer.interact(Interaction::DragEnd {
            node: 0,
            position: vec2(10.0, 10.0),
        });
        while explorer.tick() {}
        assert!(!explorer.is_animating());
        assert_eq!(explorer.model().nodes[0].fixed_position, Some(vec2(10.0, 10.0)));
    }

    #[test]
    fn deselect_all_reheats_a_settled_layout() {
        let mut explorer = Explorer::with_seed(Settings::default(), 7);
        explorer.load(&triangle());
        while explorer.tick() {}

        explorer.interact(Interaction::ClickNode {
            node: 2,
            mode: ClickMode::Plain,
        });
        let reheat = explorer.interact(Interaction::ClickBackground {
            mode: ClickMode::Deselect,
        });

        assert_eq!(reheat, Some(Reheat::Major));
        assert!(explorer.is_animating());
        assert_eq!(explorer.engine().map(PhysicsEngine::alpha), Some(0.5));
    }

    #[test]
    fn resize_restarts_only_on_change() {
        let mut explorer = Explorer::with_seed(Settings::default(), 7);
        explorer.load(&triangle());
        while explorer.tick() {}

        explorer.resize(800.0, 600.0);
        assert!(!explorer.is_animating());

        explorer.resize(1024.0, 768.0);
        assert!(explorer.is_animating());
        assert_eq!(
            explorer.engine().map(PhysicsEngine::center),
            Some(vec2(512.0, 384.0))
        );
    }

    #[test]
    fn stopped_explorer_ignores_ticks() {
        let mut explorer = Explorer::with_seed(Settings::default(), 7);
        explorer.load(&triangle());
        explorer.stop();

        let before = explorer.model().nodes[0].position;
        assert!(!explorer.tick());
        explorer.interact(Interaction::ClickBackground {
            mode: ClickMode::Deselect,
        });
        assert!(!explorer.tick());
        assert_eq!(explorer.model().nodes[0].position, before);
    }

    #[test]
    fn stopped_explorer_stays_stopped_after_resize_and_load() {
        let mut explorer = Explorer::with_seed(Settings::default(), 7);
        explorer.load(&triangle());
        explorer.stop();

        let before = explorer.model().nodes[0].position;
        explorer.resize(1024.0, 768.0);
        assert!(!explorer.tick());
        assert!(!explorer.is_animating());
        assert_eq!(explorer.model().nodes[0].position, before);

        explorer.load(&triangle());
        assert!(!explorer.tick());
        assert!(!explorer.is_animating());
        assert_eq!(explorer.model().nodes[0].position, before);
    }

    #[test]
    fn color_changes_gently_reheat_a_settled_layout() {
        let mut explorer = Explorer::with_seed(Settings::default(), 7);
        explorer.load(&triangle());
        while explorer.tick() {}

        explorer
            .update_settings(Settings {
                color_scheme: ColorScheme::Viridis,
                ..Settings::default()
            })
            .unwrap();
        assert!(explorer.is_animating());
        assert_eq!(
            explorer.engine().map(PhysicsEngine::alpha),
            Some(Reheat::Gentle.alpha())
        );

        while explorer.tick() {}
        assert!(explorer.set_manual_color(0, Color32::from_rgb(9, 9, 9)));
        assert!(explorer.is_animating());

        while explorer.tick() {}
        assert!(explorer.clear_manual_color(0));
        assert!(explorer.is_animating());
    }
}
