//! dae-export library
//!
//! Provides the COLLADA character extraction pipeline and the runtime format
//! writers for use by other tools.

pub mod animation;
pub mod convert;
pub mod document;
pub mod formats;
pub mod geometry;
pub mod manifest;
pub mod material;
pub mod skeleton;
pub mod skin;

// Re-export the conversion entry points
pub use convert::{convert_dae, extract_character, ExtractedCharacter};
pub use document::Document;

// Re-export key extraction types
pub use animation::{extract_animation, AnimationClip, AnimationSample};
pub use geometry::{extract_geometry, FaceCorner, GeometryGroup, Uv, Vec3};
pub use material::{extract_materials, Material, MaterialParam, ParamValue};
pub use skeleton::{extract_skeleton, JointNode};
pub use skin::{
    extract_inverse_bind_matrices, extract_joint_table, extract_vertex_weights, JointTable,
    VertexWeight, MAX_INFLUENCES,
};
