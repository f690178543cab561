//! Programmatic COLLADA fixture generation for integration tests.
//!
//! Builds a minimal rigged character: one geometry group (4 vertices,
//! 2 triangles), one diffuse-only material, a 2-joint skeleton, and a
//! 3-keyframe animation driving both joints.

use std::io::Write;
use std::path::Path;

pub const VERTEX_COUNT: usize = 4;
pub const TRIANGLE_COUNT: usize = 2;
pub const JOINT_COUNT: usize = 2;
pub const KEYFRAME_COUNT: usize = 3;

const IDENTITY: &str = "1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1";

/// Write the test character document to `path`.
pub fn generate_character_dae(path: &Path) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(character_dae().as_bytes())?;
    Ok(())
}

fn character_dae() -> String {
    format!(
        r##"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <library_images>
    <image id="img-diffuse"><init_from>hero.png</init_from></image>
  </library_images>
  <library_effects>
    <effect id="fx-body">
      <profile_COMMON>
        <technique sid="common">
          <lambert><diffuse><color>0.8 0.2 0.2 1</color></diffuse></lambert>
        </technique>
      </profile_COMMON>
    </effect>
  </library_effects>
  <library_materials>
    <material id="mat-body" name="Body"><instance_effect url="#fx-body"/></material>
  </library_materials>
  <library_geometries>
    <geometry id="geo-body"><mesh>
      <source id="geo-pos"><float_array id="geo-pos-arr" count="12">0 0 0 1 0 0 1 1 0 0 1 0</float_array></source>
      <source id="geo-nrm"><float_array id="geo-nrm-arr" count="3">0 0 1</float_array></source>
      <source id="geo-uv"><float_array id="geo-uv-arr" count="8">0 0 1 0 1 1 0 1</float_array></source>
      <vertices id="geo-verts"><input semantic="POSITION" source="#geo-pos"/></vertices>
      <triangles material="body-sym" count="2">
        <input semantic="VERTEX" source="#geo-verts" offset="0"/>
        <input semantic="NORMAL" source="#geo-nrm" offset="1"/>
        <input semantic="TEXCOORD" source="#geo-uv" offset="2"/>
        <p>0 0 0 1 0 1 2 0 2 0 0 0 2 0 2 3 0 3</p>
      </triangles>
    </mesh></geometry>
  </library_geometries>
  <library_controllers>
    <controller id="ctl-skin"><skin source="#geo-body">
      <source id="skin-joints"><Name_array id="skin-joints-arr" count="2">Root Limb</Name_array></source>
      <source id="skin-ibm"><float_array id="skin-ibm-arr" count="32">{m} {m}</float_array></source>
      <source id="skin-w"><float_array id="skin-w-arr" count="2">1 0.5</float_array></source>
      <joints>
        <input semantic="JOINT" source="#skin-joints"/>
        <input semantic="INV_BIND_MATRIX" source="#skin-ibm"/>
      </joints>
      <vertex_weights count="4">
        <input semantic="JOINT" source="#skin-joints" offset="0"/>
        <input semantic="WEIGHT" source="#skin-w" offset="1"/>
        <vcount>1 1 2 1</vcount>
        <v>0 0 0 0 0 1 1 1 1 0</v>
      </vertex_weights>
    </skin></controller>
  </library_controllers>
  <library_visual_scenes>
    <visual_scene id="scene">
      <node id="char"><instance_controller url="#ctl-skin">
        <skeleton>#j-root</skeleton>
        <bind_material><technique_common>
          <instance_material symbol="body-sym" target="#mat-body"/>
        </technique_common></bind_material>
      </instance_controller></node>
      <node id="j-root" sid="Root"><matrix>{m}</matrix>
        <node id="j-limb" sid="Limb"><matrix>{m}</matrix></node>
      </node>
    </visual_scene>
  </library_visual_scenes>
  <library_animations>
    <animation id="anim-root">
      <source id="anim-root-in"><float_array id="anim-root-in-arr" count="3">0 0.5 1</float_array></source>
      <source id="anim-root-out"><float_array id="anim-root-out-arr" count="48">{m} {m} {m}</float_array></source>
      <sampler id="anim-root-s">
        <input semantic="INPUT" source="#anim-root-in"/>
        <input semantic="OUTPUT" source="#anim-root-out"/>
      </sampler>
      <channel source="#anim-root-s" target="j-root/transform"/>
    </animation>
    <animation id="anim-limb">
      <source id="anim-limb-in"><float_array id="anim-limb-in-arr" count="3">0 0.5 1</float_array></source>
      <source id="anim-limb-out"><float_array id="anim-limb-out-arr" count="48">{m} {m} {m}</float_array></source>
      <sampler id="anim-limb-s">
        <input semantic="INPUT" source="#anim-limb-in"/>
        <input semantic="OUTPUT" source="#anim-limb-out"/>
      </sampler>
      <channel source="#anim-limb-s" target="j-limb/transform"/>
    </animation>
  </library_animations>
</COLLADA>
"##,
        m = IDENTITY
    )
}
