//! Real-time viewer for textured OBJ models.
//!
//! The crate parses Wavefront OBJ/MTL files into draw groups, uploads them
//! to the GPU through wgpu, and renders them with a two-light Phong shader
//! under a free-look camera. An egui panel edits material and light
//! parameters live and drives model reloads.

pub mod app;
pub mod camera;
pub mod input;
pub mod mesh;
pub mod panel;
pub mod render;
pub mod settings;

pub use app::{dispatch_keyboard, model_matrix, mouse_reaches_camera, print_model_summary};
pub use camera::{Camera, FreeLook, MoveDirection};
pub use input::{InputState, KeyCode, MouseButton, NamedKey};
pub use mesh::{load_model, Material, MeshError, ObjGroup, ObjMesh, ObjModel};
pub use panel::{PanelOutput, ParamPanel};
pub use render::{
    directory_changed, reload_needed, FrameCamera, GpuModel, Renderer, ResourceGauge,
};
pub use settings::{MaterialSettings, PointLightSettings, SceneSettings};
