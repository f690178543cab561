//! Runtime text format writers
//!
//! Serializers for the four output files. All writers are generic over
//! `std::io::Write`; callers own the file handles.

use anyhow::Result;
use std::io::Write;

use crate::animation::AnimationClip;
use crate::geometry::GeometryGroup;
use crate::material::{Material, ParamValue};
use crate::skeleton::JointNode;
use crate::skin::VertexWeight;

/// Shading semantic -> material file key.
const MTL_KEYS: &[(&str, &str)] = &[
    ("emission", "Ke"),
    ("ambient", "Ka"),
    ("diffuse", "Kd"),
    ("specular", "Ks"),
    ("shininess", "Ns"),
    ("transparency", "d"),
    ("normal", "Kn"),
];

/// Parameters never emitted to the material file.
const SKIPPED_PARAMS: &[&str] = &["reflectivity", "reflective", "transparent", "index_of_refraction"];

/// Write the mesh file: all positions, normals, and uvs across groups in
/// group order, then per-group faces as 1-based `position/uv/normal` triples
/// with cumulative index offsets.
pub fn write_obj<W: Write>(
    w: &mut W,
    groups: &[GeometryGroup],
    materials: &[Material],
    mtl_filename: &str,
) -> Result<()> {
    let has_materials = !materials.is_empty();

    if has_materials {
        writeln!(w, "mtllib {}", mtl_filename)?;
    }

    for group in groups {
        for p in &group.positions {
            writeln!(w, "v {} {} {}", p.x, p.y, p.z)?;
        }
    }
    for group in groups {
        for n in &group.normals {
            writeln!(w, "vn {} {} {}", n.x, n.y, n.z)?;
        }
    }
    for group in groups {
        for uv in &group.uvs {
            writeln!(w, "vt {} {}", uv.u, uv.v)?;
        }
    }

    let mut p_offset = 0;
    let mut u_offset = 0;
    let mut n_offset = 0;
    for group in groups {
        if has_materials {
            if let Some(material_id) = &group.material_id {
                writeln!(w, "usemtl {}", material_id)?;
            }
        }

        for tri in group.faces.chunks_exact(3) {
            write!(w, "f")?;
            for corner in tri {
                write!(
                    w,
                    " {}/{}/{}",
                    corner.p_index + 1 + p_offset,
                    corner.u_index + 1 + u_offset,
                    corner.n_index + 1 + n_offset
                )?;
            }
            writeln!(w)?;
        }

        p_offset += group.positions.len();
        u_offset += group.uvs.len();
        n_offset += group.normals.len();
    }

    Ok(())
}

/// Write the material file: one `newmtl` block per material, parameters
/// mapped through the fixed semantic -> key table.
pub fn write_mtl<W: Write>(w: &mut W, materials: &[Material]) -> Result<()> {
    for material in materials {
        writeln!(w, "newmtl {}", material.id)?;

        for param in &material.params {
            if SKIPPED_PARAMS.contains(&param.id.as_str()) {
                continue;
            }
            let Some(key) = mtl_key(&param.id) else {
                tracing::warn!("no material key for parameter '{}', skipping", param.id);
                continue;
            };

            match &param.value {
                ParamValue::Texture(file) => writeln!(w, "map_{} {}", key, file)?,
                ParamValue::Rgba([r, g, b, _a]) => writeln!(w, "{} {} {} {}", key, r, g, b)?,
                ParamValue::Float(v) => writeln!(w, "{} {}", key, v)?,
            }
        }
    }

    Ok(())
}

/// Write the skeleton file: joint tree in pre-order, inverse bind poses in
/// table order, then all weight triples.
pub fn write_skl<W: Write>(
    w: &mut W,
    skeleton: &JointNode,
    inverse_bind: &[[f32; 16]],
    weights: &[VertexWeight],
) -> Result<()> {
    writeln!(w, "joints")?;
    for joint in skeleton.flatten() {
        let parent = joint.parent_id.map(|p| p as i64).unwrap_or(-1);
        writeln!(
            w,
            "{} {} {} {}",
            joint.joint_id,
            joint.joint_name,
            parent,
            format_matrix(&joint.transform)
        )?;
    }

    writeln!(w, "bindpose_inv")?;
    for (joint_id, matrix) in inverse_bind.iter().enumerate() {
        writeln!(w, "{} {}", joint_id, format_matrix(matrix))?;
    }

    writeln!(w, "weights {}", weights.len())?;
    for weight in weights {
        writeln!(w, "{} {} {}", weight.vertex_id, weight.joint_id, weight.weight)?;
    }

    Ok(())
}

/// Write the animation file: raw keyframe times, then one block per
/// keyframe with every sampled joint's matrix in channel order.
pub fn write_anm<W: Write>(w: &mut W, clip: &AnimationClip) -> Result<()> {
    writeln!(w, "keyframes")?;
    for time in &clip.keyframes {
        writeln!(w, "{}", time)?;
    }

    for (index, frame) in clip.frames().iter().enumerate() {
        writeln!(w, "time {}", index)?;
        for (joint_id, matrix) in frame {
            writeln!(w, "{} {}", joint_id, format_matrix(matrix))?;
        }
    }

    Ok(())
}

fn mtl_key(id: &str) -> Option<&'static str> {
    MTL_KEYS
        .iter()
        .find(|(semantic, _)| *semantic == id)
        .map(|(_, key)| *key)
}

fn format_matrix(m: &[f32; 16]) -> String {
    m.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
