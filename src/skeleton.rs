//! Skeleton extractor
//!
//! Walks the visual scene's joint hierarchy from the node referenced by the
//! skin controller's skeleton pointer, keeping only nodes whose `sid` is in
//! the joint table.

use anyhow::{bail, Context, Result};
use xmltree::Element;

use crate::document::{
    self, children, descendant_by_tag, descendant_with_attr, parse_floats, require_attr,
    require_child, require_text, source_target, Document,
};
use crate::skin::JointTable;

/// One joint in the skeleton tree. Each node exclusively owns its children;
/// the parent link is an index into the joint table, never ownership.
#[derive(Debug, Clone)]
pub struct JointNode {
    pub joint_id: usize,
    pub joint_name: String,
    pub transform: [f32; 16],
    pub parent_id: Option<usize>,
    pub children: Vec<JointNode>,
}

impl JointNode {
    /// Pre-order traversal (parent before children).
    pub fn flatten(&self) -> Vec<&JointNode> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a JointNode>) {
        out.push(self);
        for child in &self.children {
            child.collect(out);
        }
    }
}

/// Extract the joint tree rooted at the controller's head joint.
///
/// A node whose `sid` is absent from the joint table is dropped together
/// with its entire subtree, even if a deeper descendant would match.
pub fn extract_skeleton(doc: &Document, joints: &JointTable) -> Result<JointNode> {
    let scenes = doc.require_library("library_visual_scenes")?;

    let pointer = descendant_by_tag(scenes, "skeleton")
        .ok_or_else(|| document::ResolveError::MissingElement("skeleton".into()))?;
    let head_id = require_text(pointer)?;
    let head_id = source_target(&head_id);

    let head = descendant_with_attr(scenes, "node", "id", head_id)
        .ok_or_else(|| document::ResolveError::UnresolvedReference(head_id.to_string()))?;

    match extract_joint_node(head, joints, None)? {
        Some(root) => Ok(root),
        None => bail!("skeleton root node '{}' is not in the joint table", head_id),
    }
}

fn extract_joint_node(
    node: &Element,
    joints: &JointTable,
    parent_id: Option<usize>,
) -> Result<Option<JointNode>> {
    let joint_name = require_attr(node, "sid")?;
    let Some(joint_id) = joints.index_of(joint_name) else {
        tracing::debug!("skipping joint node '{}' and its subtree", joint_name);
        return Ok(None);
    };

    let matrix = require_child(node, "matrix")?;
    let values = parse_floats(&require_text(matrix)?)
        .with_context(|| format!("in joint '{}'", joint_name))?;
    if values.len() < 16 {
        bail!(
            "joint '{}' matrix has {} values, expected 16",
            joint_name,
            values.len()
        );
    }
    let mut transform = [0.0f32; 16];
    transform.copy_from_slice(&values[..16]);

    let mut child_nodes = Vec::new();
    for child in children(node, "node") {
        if let Some(accepted) = extract_joint_node(child, joints, Some(joint_id))? {
            child_nodes.push(accepted);
        }
    }

    Ok(Some(JointNode {
        joint_id,
        joint_name: joint_name.to_string(),
        transform,
        parent_id,
        children: child_nodes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: &str = "1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1";

    fn scene_doc(body: &str) -> Document {
        Document::parse(&format!(
            r#"<COLLADA><library_visual_scenes><visual_scene>
                 <node id="rig"><instance_controller><skeleton>#j-root</skeleton></instance_controller></node>
                 {}
               </visual_scene></library_visual_scenes></COLLADA>"#,
            body
        ))
        .unwrap()
    }

    #[test]
    fn test_hierarchy_and_parent_ids() {
        let doc = scene_doc(&format!(
            r#"<node id="j-root" sid="Root"><matrix>{m}</matrix>
                 <node id="j-a" sid="ArmL"><matrix>{m}</matrix>
                   <node id="j-b" sid="HandL"><matrix>{m}</matrix></node>
                 </node>
               </node>"#,
            m = IDENTITY
        ));
        let joints = JointTable::new(vec!["Root".into(), "ArmL".into(), "HandL".into()]);

        let root = extract_skeleton(&doc, &joints).unwrap();
        assert_eq!(root.joint_id, 0);
        assert_eq!(root.parent_id, None);
        assert_eq!(root.children.len(), 1);

        let arm = &root.children[0];
        assert_eq!(arm.joint_id, 1);
        assert_eq!(arm.parent_id, Some(0));

        let hand = &arm.children[0];
        assert_eq!(hand.joint_id, 2);
        assert_eq!(hand.parent_id, Some(1));
    }

    #[test]
    fn test_unmatched_node_prunes_whole_subtree() {
        // HandL is in the table but hangs under the unmatched Helper node
        let doc = scene_doc(&format!(
            r#"<node id="j-root" sid="Root"><matrix>{m}</matrix>
                 <node id="j-x" sid="Helper"><matrix>{m}</matrix>
                   <node id="j-b" sid="HandL"><matrix>{m}</matrix></node>
                 </node>
               </node>"#,
            m = IDENTITY
        ));
        let joints = JointTable::new(vec!["Root".into(), "HandL".into()]);

        let root = extract_skeleton(&doc, &joints).unwrap();
        assert!(root.children.is_empty());
        assert_eq!(root.flatten().len(), 1);
    }

    #[test]
    fn test_unmatched_root_is_fatal() {
        let doc = scene_doc(&format!(
            r#"<node id="j-root" sid="NotInTable"><matrix>{}</matrix></node>"#,
            IDENTITY
        ));
        let joints = JointTable::new(vec!["Root".into()]);
        assert!(extract_skeleton(&doc, &joints).is_err());
    }

    #[test]
    fn test_flatten_is_preorder() {
        let doc = scene_doc(&format!(
            r#"<node id="j-root" sid="Root"><matrix>{m}</matrix>
                 <node id="j-a" sid="ArmL"><matrix>{m}</matrix></node>
                 <node id="j-c" sid="ArmR"><matrix>{m}</matrix></node>
               </node>"#,
            m = IDENTITY
        ));
        let joints = JointTable::new(vec!["Root".into(), "ArmL".into(), "ArmR".into()]);

        let root = extract_skeleton(&doc, &joints).unwrap();
        let order: Vec<usize> = root.flatten().iter().map(|j| j.joint_id).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
