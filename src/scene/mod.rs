//! Scene objects and per-frame traversal
//!
//! - Camera: view and projection
//! - Light: directional light, receives the fitted light-space transform
//! - Transform: cached TRS matrix
//! - Material: surface parameters of lit meshes
//! - Scene: object storage; `update` advances animation, `render` emits
//!   draw commands

pub mod camera;
pub mod light;
pub mod material;
pub mod scene;
pub mod transform;

pub use camera::Camera;
pub use light::Light;
pub use material::Material;
pub use scene::{MeshObject, Object, QuadObject, Renderable, Scene, TextObject};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct ObjectKey;
}
