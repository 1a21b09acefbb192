//! Region extraction around a point of interest. Pure computation.

mod region;

pub use region::{compute_box, extract, Extraction, RegionCrop, MARKER_COLOR, MARKER_RADIUS};
