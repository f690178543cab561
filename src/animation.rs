//! Animation extractor
//!
//! Pulls the global keyframe timeline from the first animation channel and
//! one matrix-per-keyframe stream per animated joint.

use anyhow::{bail, Context, Result};
use xmltree::Element;

use crate::document::{
    self, children, chunk_matrices, descendant_by_tag, descendant_with_attr, parse_floats,
    require_attr, require_child, require_text, Document,
};
use crate::skin::JointTable;

/// Matrix stream of one animated joint, one 16-float matrix per keyframe.
#[derive(Debug, Clone)]
pub struct AnimationSample {
    pub joint_id: usize,
    pub transforms: Vec<[f32; 16]>,
}

/// Global keyframe timeline plus every joint's matrix stream, in channel
/// extraction order.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub keyframes: Vec<f32>,
    pub samples: Vec<AnimationSample>,
    pub duration: f32,
}

impl AnimationClip {
    /// Per-keyframe view: for each keyframe index, the (joint_id, matrix)
    /// pairs contributed by every channel, in channel order. A channel
    /// shorter than the timeline contributes nothing to trailing keyframes.
    pub fn frames(&self) -> Vec<Vec<(usize, &[f32; 16])>> {
        (0..self.keyframes.len())
            .map(|i| {
                self.samples
                    .iter()
                    .filter_map(|s| s.transforms.get(i).map(|m| (s.joint_id, m)))
                    .collect()
            })
            .collect()
    }
}

/// Extract the animation clip for every channel in the document.
///
/// The first channel's time input is the timeline for all joints; uniform
/// timing across channels is assumed, not checked.
pub fn extract_animation(doc: &Document, joints: &JointTable) -> Result<AnimationClip> {
    let library = doc.require_library("library_animations")?;
    let scenes = doc.require_library("library_visual_scenes")?;

    let first = require_child(library, "animation")?;
    let time_source = descendant_by_tag(first, "source")
        .ok_or_else(|| document::ResolveError::MissingElement("source".into()))?;
    let time_array = descendant_by_tag(time_source, "float_array")
        .ok_or_else(|| document::ResolveError::MissingElement("float_array".into()))?;
    let keyframes = parse_floats(&require_text(time_array)?)?;

    let Some(&duration) = keyframes.last() else {
        bail!("animation has no keyframes");
    };

    let mut samples = Vec::new();
    for animation in children(library, "animation") {
        let sample = extract_channel(animation, scenes, joints)?;
        samples.push(sample);
    }

    Ok(AnimationClip {
        keyframes,
        samples,
        duration,
    })
}

/// Resolve one animation channel to its driven joint and matrix stream.
fn extract_channel(
    animation: &Element,
    scenes: &Element,
    joints: &JointTable,
) -> Result<AnimationSample> {
    let channel = require_child(animation, "channel")?;
    let target = require_attr(channel, "target")?;
    let node_id = target.split('/').next().unwrap_or(target);

    let node = descendant_with_attr(scenes, "node", "id", node_id)
        .ok_or_else(|| document::ResolveError::UnresolvedReference(node_id.to_string()))?;
    let sid = require_attr(node, "sid")?;
    let Some(joint_id) = joints.index_of(sid) else {
        bail!("animated joint '{}' is not in the joint table", sid);
    };

    let sampler = require_child(animation, "sampler")?;
    let output = document::resolve_input_source(sampler, animation, "OUTPUT")
        .with_context(|| format!("in channel targeting '{}'", target))?;
    let array = descendant_by_tag(output, "float_array")
        .ok_or_else(|| document::ResolveError::MissingElement("float_array".into()))?;
    let transforms = chunk_matrices(&parse_floats(&require_text(array)?)?);

    Ok(AnimationSample {
        joint_id,
        transforms,
    })
}
