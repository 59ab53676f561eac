use eframe::egui::{Vec2, vec2};

use crate::graph::Edge;

use super::quadtree::QuadNode;

const DISTANCE_MIN_SQ: f32 = 1.0;

#[derive(Clone, Copy)]
pub(super) struct ChargeParams {
    pub(super) strength: f32,
    pub(super) distance_max_sq: f32,
    pub(super) theta_sq: f32,
    pub(super) alpha: f32,
}

/// Deterministic nudge for coincident points so they separate instead of
/// producing NaN directions.
fn jiggle(a: usize, b: usize) -> Vec2 {
    let angle = ((a as f32) * 0.618_034 + (b as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin()) * 1e-3
}

/// Many-body term for one node: velocity change from every other node,
/// approximated per quadtree cell once the cell looks small enough.
pub(super) fn accumulate_charge_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity_delta: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }
            let mut delta = positions[other] - point;
            let mut distance_sq = delta.length_sq();
            if distance_sq >= params.distance_max_sq {
                continue;
            }
            if distance_sq == 0.0 {
                delta = jiggle(index, other);
                distance_sq = delta.length_sq();
            }
            if distance_sq < DISTANCE_MIN_SQ {
                distance_sq = (DISTANCE_MIN_SQ * distance_sq).sqrt();
            }
            *velocity_delta += delta * (params.strength * params.alpha / distance_sq);
        }
        return;
    }

    let delta = node.center_of_mass - point;
    let distance_sq = delta.length_sq();
    let width = node.bounds.side_length();
    let far_enough = !node.bounds.contains(point) && (width * width) < params.theta_sq * distance_sq;

    if far_enough {
        if distance_sq < params.distance_max_sq {
            let distance_sq = distance_sq.max(DISTANCE_MIN_SQ);
            *velocity_delta +=
                delta * (params.strength * node.mass * params.alpha / distance_sq);
        }
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_charge_for_node(child, index, positions, params, velocity_delta);
    }
}

/// Share of a link's correction that goes to the source end: heavier-linked
/// endpoints move less.
pub(super) fn link_biases(node_count: usize, edges: &[Edge]) -> Vec<f32> {
    let mut counts = vec![0usize; node_count];
    for edge in edges {
        if edge.source < node_count && edge.target < node_count {
            counts[edge.source] += 1;
            counts[edge.target] += 1;
        }
    }

    edges
        .iter()
        .map(|edge| {
            let source = counts.get(edge.source).copied().unwrap_or(0) as f32;
            let target = counts.get(edge.target).copied().unwrap_or(0) as f32;
            if source + target > 0.0 {
                source / (source + target)
            } else {
                0.5
            }
        })
        .collect()
}

#[derive(Clone, Copy)]
pub(super) struct LinkParams {
    pub(super) distance: f32,
    pub(super) strength: f32,
    pub(super) alpha: f32,
}

pub(super) fn apply_link_force(
    edges: &[Edge],
    biases: &[f32],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    params: LinkParams,
) {
    let node_count = positions.len();
    for (edge_index, (edge, &bias)) in edges.iter().zip(biases).enumerate() {
        let (from, to) = (edge.source, edge.target);
        if from >= node_count || to >= node_count || from == to {
            continue;
        }

        let mut delta = (positions[to] + velocities[to]) - (positions[from] + velocities[from]);
        if delta.length_sq() == 0.0 {
            delta = jiggle(edge_index, to);
        }
        let distance = delta.length();
        let stretch = (distance - params.distance) / distance * params.alpha * params.strength;
        let correction = delta * stretch;

        velocities[to] -= correction * bias;
        velocities[from] += correction * (1.0 - bias);
    }
}

pub(super) fn apply_gravity(
    positions: &[Vec2],
    velocities: &mut [Vec2],
    center: Vec2,
    gravity: f32,
    alpha: f32,
) {
    for (position, velocity) in positions.iter().zip(velocities.iter_mut()) {
        *velocity += (center - *position) * (gravity * alpha);
    }
}
