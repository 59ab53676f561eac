//! Random-walk highlighting of a path whose edges carry a given label sequence.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::GraphModel;

pub const DEFAULT_MAX_ATTEMPTS: usize = 256;

/// A pair of entity names attached to one step of the path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Clause {
    #[serde(default)]
    pub entity1: Option<String>,
    #[serde(default)]
    pub entity2: Option<String>,
}

/// Labels for each hop, plus optional entity names and example text used for
/// node tooltips.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PathQuery {
    #[serde(alias = "edgeTypes")]
    pub edge_types: Vec<String>,
    #[serde(default)]
    pub clauses: Vec<Clause>,
    #[serde(default, alias = "entityExamples")]
    pub entity_examples: HashMap<String, String>,
}

impl PathQuery {
    pub fn new<I, S>(edge_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            edge_types: edge_types.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Parses a comma separated label list as typed into the host's query box.
    pub fn from_labels(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty()),
        )
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read path query {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse path query {}", path.display()))
    }

    fn tooltip_for(&self, entity: Option<&String>) -> Option<&String> {
        entity.and_then(|name| self.entity_examples.get(name))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("edge type sequence is empty")]
    EmptySequence,
    #[error("graph with {nodes} nodes and {edges} edges cannot hold a {requested}-edge path")]
    GraphTooSmall {
        nodes: usize,
        edges: usize,
        requested: usize,
    },
    #[error("no {requested}-edge path found after {attempts} attempts")]
    Exhausted { requested: usize, attempts: usize },
}

/// Node and edge indices of a highlighted walk. `nodes` has one more entry than
/// `edges`, and edge `i` joins `nodes[i]` to `nodes[i + 1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightedPath {
    pub nodes: Vec<usize>,
    pub edges: Vec<usize>,
    pub attempts: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct PathHighlighter {
    pub max_attempts: usize,
}

impl Default for PathHighlighter {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PathHighlighter {
    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Clears highlight flags, edge labels and tooltips. Selection and pins
    /// stay as they are.
    pub fn reset(model: &mut GraphModel) {
        for node in &mut model.nodes {
            node.highlighted = false;
            node.tooltip_text = None;
        }
        for edge in &mut model.edges {
            edge.highlighted = false;
            edge.highlight_label = None;
        }
    }

    /// Resets, then samples a walk of exactly `query.edge_types.len()` distinct
    /// edges and marks it on the model.
    pub fn highlight<R: Rng>(
        &self,
        model: &mut GraphModel,
        query: &PathQuery,
        rng: &mut R,
    ) -> Result<HighlightedPath, PathError> {
        Self::reset(model);

        let requested = query.edge_types.len();
        if requested == 0 {
            return Err(PathError::EmptySequence);
        }
        if model.nodes.len() < 2 || model.edges.len() < requested {
            return Err(PathError::GraphTooSmall {
                nodes: model.nodes.len(),
                edges: model.edges.len(),
                requested,
            });
        }

        let mut used = vec![false; model.edges.len()];
        for attempt in 1..=self.max_attempts {
            used.fill(false);
            if let Some((nodes, edges)) = sample_walk(model, requested, &mut used, rng) {
                apply_walk(model, query, &nodes, &edges);
                tracing::debug!(requested, attempts = attempt, "highlighted path");
                return Ok(HighlightedPath {
                    nodes,
                    edges,
                    attempts: attempt,
                });
            }
        }

        tracing::warn!(requested, attempts = self.max_attempts, "path search exhausted");
        Err(PathError::Exhausted {
            requested,
            attempts: self.max_attempts,
        })
    }
}

fn sample_walk<R: Rng>(
    model: &GraphModel,
    length: usize,
    used: &mut [bool],
    rng: &mut R,
) -> Option<(Vec<usize>, Vec<usize>)> {
    let mut current = rng.random_range(0..model.nodes.len());
    let mut nodes = Vec::with_capacity(length + 1);
    let mut edges = Vec::with_capacity(length);
    nodes.push(current);

    let mut candidates = Vec::new();
    for _ in 0..length {
        candidates.clear();
        candidates.extend(
            model
                .incident_edges(current)
                .iter()
                .copied()
                .filter(|&edge| !used[edge]),
        );
        let &edge = candidates.choose(rng)?;
        used[edge] = true;
        current = model.edges[edge].other_end(current);
        edges.push(edge);
        nodes.push(current);
    }

    Some((nodes, edges))
}

fn apply_walk(model: &mut GraphModel, query: &PathQuery, nodes: &[usize], edges: &[usize]) {
    for (step, &edge_index) in edges.iter().enumerate() {
        let edge = &mut model.edges[edge_index];
        edge.highlighted = true;
        edge.highlight_label = Some(query.edge_types[step].clone());
    }

    for &index in nodes {
        let node = &mut model.nodes[index];
        node.highlighted = true;
        node.select_and_pin();
    }

    for (step, clause) in query.clauses.iter().enumerate().take(edges.len()) {
        if let Some(example) = query.tooltip_for(clause.entity1.as_ref()) {
            model.nodes[nodes[step]].tooltip_text = Some(example.clone());
        }
        if let Some(example) = query.tooltip_for(clause.entity2.as_ref()) {
            model.nodes[nodes[step + 1]].tooltip_text = Some(example.clone());
        }
    }
}
