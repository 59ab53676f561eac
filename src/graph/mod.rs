mod model;
mod payload;
mod traverse;

pub use model::{
    Adjacency, ColorSource, DroppedEdge, Edge, GraphModel, Node, build_adjacency, relevance_score,
};
pub use payload::{DEFAULT_EDGE_TYPE, GraphPayload, RawEdge, RawNode, load_payload, parse_payload};
pub use traverse::{bfs_distances, bfs_layers, nodes_at_layer, nodes_within};
