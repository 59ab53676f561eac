mod forces;
mod quadtree;

use eframe::egui::{Vec2, vec2};

use crate::graph::GraphModel;
use crate::settings::{PhysicsParams, SettingsError};
use crate::util::stable_pair;

use forces::{
    ChargeParams, LinkParams, accumulate_charge_for_node, apply_gravity, apply_link_force,
    link_biases,
};
pub use quadtree::QuadtreeCell;
use quadtree::{QuadNode, collect_quadtree_cells};

const BARNES_HUT_THETA: f32 = 0.9;
const ALPHA_MIN: f32 = 0.001;
/// Above this many nodes the engine cools in a few dozen ticks instead of ~300.
const LARGE_GRAPH_NODES: usize = 500;
const FAST_ALPHA_DECAY: f32 = 0.05;
const INITIAL_RADIUS: f32 = 10.0;
const MAX_SPEED: f32 = 60.0;

/// How hard to kick a settled layout after a discrete state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reheat {
    /// Selection, color or highlight tweaks.
    Gentle,
    /// Single-node deselection.
    Moderate,
    /// Wholesale changes such as deselect-all.
    Major,
}

impl Reheat {
    pub fn alpha(self) -> f32 {
        match self {
            Self::Gentle => 0.15,
            Self::Moderate => 0.3,
            Self::Major => 0.5,
        }
    }

    /// The stronger of two pending reheats.
    pub fn max(self, other: Self) -> Self {
        if other.alpha() > self.alpha() { other } else { self }
    }
}

/// Identifies the node set and viewport a simulation was built for; a new key
/// means a fresh engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineKey {
    pub revision: u64,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EngineState {
    Idle,
    Running,
    Stopped,
}

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    charge: Vec<Vec2>,
}

pub struct PhysicsEngine {
    params: PhysicsParams,
    key: EngineKey,
    center: Vec2,
    alpha: f32,
    alpha_target: f32,
    alpha_decay: f32,
    state: EngineState,
    node_count: usize,
    link_biases: Vec<f32>,
    scratch: PhysicsScratch,
}

impl PhysicsEngine {
    /// Builds the simulation for `model`, scatters unplaced nodes around the
    /// viewport center and starts ticking at full energy.
    pub fn start(model: &mut GraphModel, width: f32, height: f32, params: PhysicsParams) -> Self {
        let params = params.sanitized().unwrap_or_else(|error| {
            tracing::warn!(%error, "invalid physics parameters at start, using defaults");
            PhysicsParams::default()
        });
        let center = vec2(width.max(1.0) * 0.5, height.max(1.0) * 0.5);
        scatter_unplaced(model, center);

        let node_count = model.nodes.len();
        let alpha_decay = if node_count > LARGE_GRAPH_NODES {
            FAST_ALPHA_DECAY
        } else {
            1.0 - ALPHA_MIN.powf(1.0 / 300.0)
        };

        tracing::debug!(nodes = node_count, edges = model.edges.len(), alpha_decay, "physics engine started");

        Self {
            params,
            key: EngineKey {
                revision: model.revision(),
                width,
                height,
            },
            center,
            alpha: 1.0,
            alpha_target: 0.0,
            alpha_decay,
            state: EngineState::Running,
            node_count,
            link_biases: link_biases(node_count, &model.edges),
            scratch: PhysicsScratch::default(),
        }
    }

    pub fn key(&self) -> EngineKey {
        self.key
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn params(&self) -> PhysicsParams {
        self.params
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn is_stopped(&self) -> bool {
        self.state == EngineState::Stopped
    }

    /// Swaps force coefficients on the live simulation. Positions, velocities
    /// and alpha are untouched.
    pub fn update_params(&mut self, params: PhysicsParams) -> Result<(), SettingsError> {
        if self.is_stopped() {
            tracing::debug!("ignoring parameter update on stopped engine");
            return Ok(());
        }
        self.params = params.sanitized()?;
        Ok(())
    }

    pub fn reheat(&mut self, alpha: f32) {
        if self.is_stopped() || !alpha.is_finite() {
            return;
        }
        self.alpha = alpha.clamp(0.0, 1.0);
        if self.alpha >= ALPHA_MIN {
            self.state = EngineState::Running;
        }
        tracing::debug!(alpha = self.alpha, "physics reheat");
    }

    pub fn reheat_with(&mut self, reheat: Reheat) {
        self.reheat(reheat.alpha());
    }

    /// Energy the engine cools toward; a non-zero target keeps it ticking,
    /// e.g. for the duration of a drag.
    pub fn set_alpha_target(&mut self, target: f32) {
        if self.is_stopped() || !target.is_finite() {
            return;
        }
        self.alpha_target = target.clamp(0.0, 1.0);
        if self.alpha_target >= ALPHA_MIN && self.alpha < self.alpha_target {
            self.alpha = self.alpha_target;
        }
        if self.alpha >= ALPHA_MIN {
            self.state = EngineState::Running;
        }
    }

    pub fn stop(&mut self) {
        if self.state != EngineState::Stopped {
            tracing::debug!("physics engine stopped");
        }
        self.state = EngineState::Stopped;
    }

    /// One integration step. Returns whether the engine is still hot.
    pub fn tick(&mut self, model: &mut GraphModel) -> bool {
        if self.state != EngineState::Running {
            return false;
        }

        let node_count = model.nodes.len();
        if node_count != self.node_count || model.edges.len() != self.link_biases.len() {
            tracing::warn!(
                expected = self.node_count,
                found = node_count,
                "graph changed under a running engine, rebuilding link table"
            );
            self.node_count = node_count;
            self.link_biases = link_biases(node_count, &model.edges);
            scatter_unplaced(model, self.center);
        }

        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;

        if node_count > 0 {
            self.integrate(model);
        }

        if self.alpha < ALPHA_MIN {
            self.state = EngineState::Idle;
        }
        self.is_running()
    }

    /// Ticks until cool or `max_ticks` is reached; returns the ticks taken.
    pub fn run_until_settled(&mut self, model: &mut GraphModel, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.tick(model) {
            ticks += 1;
        }
        ticks
    }

    fn integrate(&mut self, model: &mut GraphModel) {
        let node_count = model.nodes.len();
        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.velocities.clear();
        for node in &model.nodes {
            let position = node.fixed_position.or(node.position).unwrap_or(self.center);
            scratch.positions.push(position);
            scratch.velocities.push(node.velocity);
        }

        let alpha = self.alpha;
        apply_link_force(
            &model.edges,
            &self.link_biases,
            &scratch.positions,
            &mut scratch.velocities,
            LinkParams {
                distance: self.params.link_distance,
                strength: self.params.link_strength,
                alpha,
            },
        );

        scratch.charge.clear();
        scratch.charge.resize(node_count, Vec2::ZERO);
        if self.params.charge_strength != 0.0
            && let Some(tree) = QuadNode::build(&scratch.positions)
        {
            let params = ChargeParams {
                strength: self.params.charge_strength,
                distance_max_sq: self.params.charge_distance_max * self.params.charge_distance_max,
                theta_sq: BARNES_HUT_THETA * BARNES_HUT_THETA,
                alpha,
            };
            for (index, delta) in scratch.charge.iter_mut().enumerate() {
                accumulate_charge_for_node(&tree, index, &scratch.positions, params, delta);
            }
        }
        for (velocity, delta) in scratch.velocities.iter_mut().zip(&scratch.charge) {
            *velocity += *delta;
        }

        apply_gravity(
            &scratch.positions,
            &mut scratch.velocities,
            self.center,
            self.params.gravity,
            alpha,
        );

        let retain = 1.0 - self.params.velocity_decay;
        for (index, node) in model.nodes.iter_mut().enumerate() {
            if let Some(fixed) = node.fixed_position {
                node.position = Some(fixed);
                node.velocity = Vec2::ZERO;
                continue;
            }

            let mut velocity = scratch.velocities[index] * retain;
            let speed = velocity.length();
            if !speed.is_finite() {
                velocity = Vec2::ZERO;
            } else if speed > MAX_SPEED {
                velocity *= MAX_SPEED / speed;
            }
            node.velocity = velocity;
            node.position = Some(scratch.positions[index] + velocity);
        }
    }
}

impl Drop for PhysicsEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builds the Barnes-Hut tree over current positions for the debug overlay.
pub fn quadtree_cells(model: &GraphModel, cells: &mut Vec<QuadtreeCell>) {
    cells.clear();
    let positions = model
        .nodes
        .iter()
        .filter_map(|node| node.position)
        .collect::<Vec<_>>();
    if let Some(tree) = QuadNode::build(&positions) {
        collect_quadtree_cells(&tree, 0, cells);
    }
}

/// Phyllotaxis spiral around `center` with a stable per-id jitter, so the same
/// graph always starts from the same picture.
fn scatter_unplaced(model: &mut GraphModel, center: Vec2) {
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    for (index, node) in model.nodes.iter_mut().enumerate() {
        if node.position.is_some() {
            continue;
        }
        if let Some(fixed) = node.fixed_position {
            node.position = Some(fixed);
            continue;
        }
        let radius = INITIAL_RADIUS * (0.5 + index as f32).sqrt();
        let angle = index as f32 * golden_angle;
        let (jx, jy) = stable_pair(&node.id);
        node.position = Some(center + vec2(angle.cos(), angle.sin()) * radius + vec2(jx, jy));
        node.velocity = Vec2::ZERO;
    }
}
