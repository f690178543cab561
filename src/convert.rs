//! Conversion driver
//!
//! Runs the full extraction pipeline over one parsed document and writes the
//! four output files.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::animation::{self, AnimationClip};
use crate::document::Document;
use crate::formats;
use crate::geometry::{self, GeometryGroup};
use crate::material::{self, Material};
use crate::skeleton::{self, JointNode};
use crate::skin::{self, JointTable, VertexWeight};

/// Everything extracted from one character document, ready for export.
pub struct ExtractedCharacter {
    pub groups: Vec<GeometryGroup>,
    pub materials: Vec<Material>,
    pub joints: JointTable,
    pub inverse_bind: Vec<[f32; 16]>,
    pub weights: Vec<VertexWeight>,
    pub skeleton: JointNode,
    pub animation: AnimationClip,
}

/// Run every extractor over the document.
///
/// The joint table is computed before skin weights, skeleton, and animation:
/// joint index is the shared key across those three.
pub fn extract_character(doc: &Document) -> Result<ExtractedCharacter> {
    let groups = geometry::extract_geometry(doc).context("extracting geometry")?;
    let materials = material::extract_materials(doc).context("extracting materials")?;

    let joints = skin::extract_joint_table(doc).context("extracting joint table")?;
    let inverse_bind =
        skin::extract_inverse_bind_matrices(doc).context("extracting inverse bind matrices")?;
    let weights = skin::extract_vertex_weights(doc).context("extracting vertex weights")?;
    let skeleton = skeleton::extract_skeleton(doc, &joints).context("extracting skeleton")?;
    let animation = animation::extract_animation(doc, &joints).context("extracting animation")?;

    Ok(ExtractedCharacter {
        groups,
        materials,
        joints,
        inverse_bind,
        weights,
        skeleton,
        animation,
    })
}

/// Convert a `.dae` character to `<base>.obj/.mtl/.skl/.anm`.
pub fn convert_dae(input: &Path, output_base: &Path) -> Result<()> {
    let doc = Document::load(input)?;
    let character = extract_character(&doc)
        .with_context(|| format!("Failed to convert {:?}", input))?;

    write_outputs(&character, output_base)?;

    tracing::info!(
        "Exported character: {} groups, {} materials, {} joints, {} keyframes ({}s)",
        character.groups.len(),
        character.materials.len(),
        character.joints.len(),
        character.animation.keyframes.len(),
        character.animation.duration
    );

    Ok(())
}

/// Write the four output files next to each other.
pub fn write_outputs(character: &ExtractedCharacter, output_base: &Path) -> Result<()> {
    let obj_path = output_base.with_extension("obj");
    let mtl_path = output_base.with_extension("mtl");
    let skl_path = output_base.with_extension("skl");
    let anm_path = output_base.with_extension("anm");

    let mtl_filename = mtl_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "character.mtl".to_string());

    write_file(&obj_path, |w| {
        formats::write_obj(w, &character.groups, &character.materials, &mtl_filename)
    })?;
    write_file(&mtl_path, |w| formats::write_mtl(w, &character.materials))?;
    write_file(&skl_path, |w| {
        formats::write_skl(w, &character.skeleton, &character.inverse_bind, &character.weights)
    })?;
    write_file(&anm_path, |w| formats::write_anm(w, &character.animation))?;

    Ok(())
}

/// Scoped output handle: created, written, flushed, and dropped here, on
/// every exit path.
fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let file =
        File::create(path).with_context(|| format!("Failed to create output: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer
        .flush()
        .with_context(|| format!("Failed to write output: {:?}", path))?;
    Ok(())
}
