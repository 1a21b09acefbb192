pub mod click;
pub mod extraction;
pub mod frame;

pub use click::{ClickEvent, MouseButton};
pub use extraction::{BoundingBox, ExtractionResult};
pub use frame::Frame;
