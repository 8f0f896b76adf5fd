pub mod model;
pub mod renderer;
pub(crate) mod shader;

pub use model::{directory_changed, reload_needed, GpuModel, ResourceGauge};
pub use renderer::{FrameCamera, Renderer};
