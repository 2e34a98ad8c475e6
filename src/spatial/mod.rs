pub mod clustering;
pub mod index;

pub use clustering::{dominant_congestion, ClusterOutcome, Clusterer};
pub use index::{SpatialIndex, SpatialItem};
