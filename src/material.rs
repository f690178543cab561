//! Material extractor
//!
//! Builds the texture-id -> filename table, resolves `newparam` indirection
//! inside each effect, and classifies the shading parameters of the common
//! profile's technique.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use xmltree::Element;

use crate::document::{
    self, child, children, descendant_by_tag, descendant_with_attr, element_children,
    first_descendant_of, require_attr, require_child, require_text, source_target, Document,
};

/// Shading model blocks tried in priority order; first present wins.
const SHADING_MODELS: &[&str] = &["lambert", "phong", "blinn"];

/// One shading attribute of a material.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialParam {
    /// Semantic name (`diffuse`, `specular`, `shininess`, ...).
    pub id: String,
    pub value: ParamValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Resolved texture filename.
    Texture(String),
    /// r, g, b, a
    Rgba([f32; 4]),
    Float(f32),
}

#[derive(Debug, Clone)]
pub struct Material {
    pub id: String,
    pub name: String,
    pub params: Vec<MaterialParam>,
}

/// Extract all materials with their classified shading parameters.
///
/// A missing image library degrades to an empty texture table; a missing
/// effects library degrades to no materials at all. An effect without the
/// common shading profile is fatal.
pub fn extract_materials(doc: &Document) -> Result<Vec<Material>> {
    let textures = extract_textures(doc)?;

    let Some(library_effects) = doc.library("library_effects") else {
        tracing::warn!("No effects library, exporting without materials");
        return Ok(Vec::new());
    };

    let mut effects: HashMap<String, Vec<MaterialParam>> = HashMap::new();
    for effect in children(library_effects, "effect") {
        let effect_id = require_attr(effect, "id")?;
        let newparams = extract_newparams(effect)
            .with_context(|| format!("in effect '{}'", effect_id))?;
        let params = extract_technique(effect, &newparams, &textures)
            .with_context(|| format!("in effect '{}'", effect_id))?;
        effects.insert(effect_id.to_string(), params);
    }

    let library_materials = doc.require_library("library_materials")?;
    let mut materials = Vec::new();
    for m in children(library_materials, "material") {
        let instance = require_child(m, "instance_effect")?;
        let effect_id = source_target(require_attr(instance, "url")?);
        let params = effects
            .get(effect_id)
            .ok_or_else(|| document::ResolveError::UnresolvedReference(effect_id.to_string()))?;

        materials.push(Material {
            id: require_attr(m, "id")?.to_string(),
            name: require_attr(m, "name")?.to_string(),
            params: params.clone(),
        });
    }

    Ok(materials)
}

/// Image id -> referenced filename, via the nested `<ref>` indirection when
/// present, else the inline `<init_from>` value.
fn extract_textures(doc: &Document) -> Result<HashMap<String, String>> {
    let mut textures = HashMap::new();

    let Some(library_images) = doc.library("library_images") else {
        tracing::warn!("No image library, texture parameters will not resolve");
        return Ok(textures);
    };

    for image in element_children(library_images) {
        let id = require_attr(image, "id")?;
        let init_from = require_child(image, "init_from")?;
        let filename = match child(init_from, "ref") {
            Some(r) => require_text(r)?,
            None => require_text(init_from)?,
        };
        textures.insert(id.to_string(), filename);
    }

    Ok(textures)
}

/// Resolve the effect's `newparam` definitions into a map keyed by `sid`.
///
/// A value is either a one-hop `<source>` reference to another newparam's
/// init value, a direct `<init_from>` value, or an `<instance_image>` url
/// (stored as the raw image id).
fn extract_newparams(effect: &Element) -> Result<HashMap<String, String>> {
    let Some(profile) = child(effect, "profile_COMMON") else {
        bail!("unsupported shading profile (expected profile_COMMON)");
    };

    let mut newparams = HashMap::new();
    for newparam in children(profile, "newparam") {
        let sid = require_attr(newparam, "sid")?;

        // newparam > (surface | sampler2D) > (source | init_from | instance_image)
        let inner = element_children(newparam)
            .next()
            .and_then(|wrapper| element_children(wrapper).next());
        let Some(inner) = inner else {
            continue;
        };

        let value = match inner.name.as_str() {
            "source" => {
                let target = require_text(inner)?;
                let referenced = descendant_with_attr(effect, "newparam", "sid", &target)
                    .ok_or_else(|| {
                        document::ResolveError::UnresolvedReference(target.clone())
                    })?;
                let init = descendant_by_tag(referenced, "init_from").ok_or_else(|| {
                    document::ResolveError::MissingElement("init_from".to_string())
                })?;
                require_text(init)?
            }
            "init_from" => require_text(inner)?,
            "instance_image" => source_target(require_attr(inner, "url")?).to_string(),
            _ => continue,
        };
        newparams.insert(sid.to_string(), value);
    }

    Ok(newparams)
}

/// Classify each parameter of the effect's shading block.
fn extract_technique(
    effect: &Element,
    newparams: &HashMap<String, String>,
    textures: &HashMap<String, String>,
) -> Result<Vec<MaterialParam>> {
    let Some(shading) = first_descendant_of(effect, SHADING_MODELS) else {
        bail!("no supported shading model (tried {:?})", SHADING_MODELS);
    };

    let mut params = Vec::new();
    for p in element_children(shading) {
        let value = classify_param(p, newparams, textures)
            .with_context(|| format!("in parameter '{}'", p.name))?;
        params.push(MaterialParam {
            id: p.name.clone(),
            value,
        });
    }

    // A displacement map, if authored, doubles as the normal map.
    if let Some(displacement) = descendant_by_tag(effect, "displacement") {
        let texture = require_child(displacement, "texture")?;
        params.push(MaterialParam {
            id: "normal".to_string(),
            value: resolve_texture(texture, newparams, textures)?,
        });
    }

    Ok(params)
}

/// A parameter is a texture, a color, or a scalar, in that test order.
fn classify_param(
    p: &Element,
    newparams: &HashMap<String, String>,
    textures: &HashMap<String, String>,
) -> Result<ParamValue> {
    if let Some(texture) = child(p, "texture") {
        return resolve_texture(texture, newparams, textures);
    }

    if let Some(color) = child(p, "color") {
        let values = document::parse_floats(&require_text(color)?)?;
        if values.len() < 4 {
            bail!("color needs 4 components, found {}", values.len());
        }
        return Ok(ParamValue::Rgba([values[0], values[1], values[2], values[3]]));
    }

    let float = require_child(p, "float")?;
    let values = document::parse_floats(&require_text(float)?)?;
    match values.first() {
        Some(&v) => Ok(ParamValue::Float(v)),
        None => bail!("empty float parameter"),
    }
}

/// Follow a `<texture texture="...">` reference through the newparam map
/// and then the texture table to the final filename.
fn resolve_texture(
    texture: &Element,
    newparams: &HashMap<String, String>,
    textures: &HashMap<String, String>,
) -> Result<ParamValue> {
    let sampler = require_attr(texture, "texture")?;
    let image_id = newparams
        .get(sampler)
        .ok_or_else(|| document::ResolveError::UnresolvedReference(sampler.to_string()))?;
    let filename = textures
        .get(image_id)
        .ok_or_else(|| document::ResolveError::UnresolvedReference(image_id.clone()))?;
    Ok(ParamValue::Texture(filename.clone()))
}
