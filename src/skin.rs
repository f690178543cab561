//! Joint name table and skin extractor
//!
//! The joint table is the single joint-index authority for one conversion
//! run: skeleton nodes, skin weights, and animation channels all key on the
//! position of a joint's name in this table.

use anyhow::{bail, Context, Result};
use std::cmp::Ordering;

use crate::document::{
    self, chunk_matrices, descendant_by_tag, parse_floats, parse_indices, require_child,
    require_text, resolve_input_source, Document,
};

/// Influence count every vertex is limited to.
pub const MAX_INFLUENCES: usize = 3;

/// Ordered joint names; position = global joint index.
#[derive(Debug, Clone)]
pub struct JointTable {
    names: Vec<String>,
}

impl JointTable {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One bone influence on a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    pub vertex_id: usize,
    pub joint_id: usize,
    pub weight: f32,
}

/// Build the joint table from the skin controller's `JOINT` name source.
pub fn extract_joint_table(doc: &Document) -> Result<JointTable> {
    let controllers = doc.require_library("library_controllers")?;
    let joints = descendant_by_tag(controllers, "joints")
        .ok_or_else(|| document::ResolveError::MissingElement("joints".into()))?;

    let source = resolve_input_source(joints, controllers, "JOINT")?;
    let names = descendant_by_tag(source, "Name_array")
        .ok_or_else(|| document::ResolveError::MissingElement("Name_array".into()))?;

    let names = require_text(names)?
        .split_whitespace()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if names.is_empty() {
        bail!("skin controller has no joints");
    }

    Ok(JointTable::new(names))
}

/// Decode the inverse bind matrices, in document order.
///
/// Alignment with the joint table is positional; the source data carries no
/// joint identity to verify against.
pub fn extract_inverse_bind_matrices(doc: &Document) -> Result<Vec<[f32; 16]>> {
    let controllers = doc.require_library("library_controllers")?;
    let joints = descendant_by_tag(controllers, "joints")
        .ok_or_else(|| document::ResolveError::MissingElement("joints".into()))?;

    let source = resolve_input_source(joints, controllers, "INV_BIND_MATRIX")?;
    let array = descendant_by_tag(source, "float_array")
        .ok_or_else(|| document::ResolveError::MissingElement("float_array".into()))?;

    Ok(chunk_matrices(&parse_floats(&require_text(array)?)?))
}

/// Decode every vertex's influence list and limit it to exactly
/// `MAX_INFLUENCES` entries summing to 1.0.
pub fn extract_vertex_weights(doc: &Document) -> Result<Vec<VertexWeight>> {
    let controllers = doc.require_library("library_controllers")?;
    let vertex_weights = descendant_by_tag(controllers, "vertex_weights")
        .ok_or_else(|| document::ResolveError::MissingElement("vertex_weights".into()))?;

    let weight_source = resolve_input_source(vertex_weights, controllers, "WEIGHT")?;
    let weight_array = descendant_by_tag(weight_source, "float_array")
        .ok_or_else(|| document::ResolveError::MissingElement("float_array".into()))?;
    let weights = parse_floats(&require_text(weight_array)?)?;

    let counts = parse_indices(&require_text(require_child(vertex_weights, "vcount")?)?)?;
    let pairs = parse_indices(&require_text(require_child(vertex_weights, "v")?)?)?;

    let mut out = Vec::new();
    let mut pointer = 0;
    for (vertex_id, &count) in counts.iter().enumerate() {
        let mut influences = Vec::with_capacity(count);
        for _ in 0..count {
            let (joint_id, weight_id) = match (pairs.get(pointer), pairs.get(pointer + 1)) {
                (Some(&j), Some(&w)) => (j, w),
                _ => bail!("weight index stream truncated at vertex {}", vertex_id),
            };
            pointer += 2;

            let weight = *weights.get(weight_id).with_context(|| {
                format!("weight index {} out of range at vertex {}", weight_id, vertex_id)
            })?;
            influences.push(VertexWeight {
                vertex_id,
                joint_id,
                weight,
            });
        }

        out.extend(limit_influences(influences));
    }

    Ok(out)
}

/// Limit one vertex's influences to exactly `MAX_INFLUENCES` entries.
///
/// Highest weights win, ties broken by first-found; short lists are padded
/// by duplicating the strongest influence with weight 0. The kept weights
/// are renormalized to sum 1.0.
fn limit_influences(mut influences: Vec<VertexWeight>) -> Vec<VertexWeight> {
    if influences.is_empty() {
        return influences;
    }

    influences.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));

    match influences.len() {
        1 => {
            let pad = VertexWeight {
                weight: 0.0,
                ..influences[0]
            };
            influences.push(pad);
            influences.push(pad);
        }
        2 => {
            let pad = VertexWeight {
                weight: 0.0,
                ..influences[0]
            };
            influences.push(pad);
        }
        _ => influences.truncate(MAX_INFLUENCES),
    }

    let total: f32 = influences.iter().map(|v| v.weight).sum();
    if total > 0.0 {
        for v in &mut influences {
            v.weight /= total;
        }
    }

    influences
}
