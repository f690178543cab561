//! Geometry extractor
//!
//! Resolves each geometry's raw position/normal/uv arrays and its triangle
//! index stream into a flat, index-addressed group.

use anyhow::{bail, Context, Result};
use xmltree::Element;

use crate::document::{
    self, attr, children, descendant_by_tag, descendant_with_attr, first_child_of,
    input_with_semantic, parse_floats, parse_indices, require_attr, require_child, require_text,
    resolve_input_source, source_target, Document,
};

/// Polygon block variants tried in priority order; first present wins.
/// Exactly one polygon block per geometry is supported.
const POLYGON_BLOCKS: &[&str] = &["triangles", "polylist"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uv {
    pub u: f32,
    pub v: f32,
}

/// One triangle corner; three consecutive corners form a triangle.
/// Indices are local to the owning group's raw arrays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceCorner {
    pub p_index: usize,
    pub n_index: usize,
    pub u_index: usize,
}

/// One submesh: raw attribute arrays plus the face corners indexing them.
#[derive(Debug, Clone)]
pub struct GeometryGroup {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Uv>,
    pub faces: Vec<FaceCorner>,
    pub material_id: Option<String>,
}

/// Extract every geometry group in document order.
pub fn extract_geometry(doc: &Document) -> Result<Vec<GeometryGroup>> {
    let library = doc.require_library("library_geometries")?;

    let mut groups = Vec::new();
    for geometry in children(library, "geometry") {
        let id = attr(geometry, "id").unwrap_or("unnamed");
        let group =
            extract_group(doc, geometry).with_context(|| format!("in geometry '{}'", id))?;
        groups.push(group);
    }

    Ok(groups)
}

fn extract_group(doc: &Document, geometry: &Element) -> Result<GeometryGroup> {
    let mesh = require_child(geometry, "mesh")?;
    let Some(poly) = first_child_of(mesh, POLYGON_BLOCKS) else {
        bail!("no polygon block (tried {:?})", POLYGON_BLOCKS);
    };

    let positions = extract_positions(mesh, poly)?;
    let normals = decode_vec3(resolve_input_source(poly, mesh, "NORMAL")?)?;
    let uvs = decode_uvs(resolve_input_source(poly, mesh, "TEXCOORD")?)?;
    let faces = extract_faces(poly)?;

    for corner in &faces {
        if corner.p_index >= positions.len()
            || corner.n_index >= normals.len()
            || corner.u_index >= uvs.len()
        {
            bail!(
                "face corner {:?} out of range ({} positions, {} normals, {} uvs)",
                corner,
                positions.len(),
                normals.len(),
                uvs.len()
            );
        }
    }

    let material_id = match attr(poly, "material") {
        Some(_) => Some(resolve_scene_material(doc)?),
        None => None,
    };

    Ok(GeometryGroup {
        positions,
        normals,
        uvs,
        faces,
        material_id,
    })
}

/// Follow the `VERTEX` -> `POSITION` input chain down to the float array.
fn extract_positions(mesh: &Element, poly: &Element) -> Result<Vec<Vec3>> {
    let vertex_input = input_with_semantic(poly, "VERTEX")
        .ok_or_else(|| document::ResolveError::MissingElement("input[@semantic=VERTEX]".into()))?;
    let vertices_id = source_target(require_attr(vertex_input, "source")?);
    let vertices = descendant_with_attr(mesh, "vertices", "id", vertices_id)
        .ok_or_else(|| document::ResolveError::UnresolvedReference(vertices_id.to_string()))?;

    decode_vec3(resolve_input_source(vertices, mesh, "POSITION")?)
}

/// Decode the face index stream. The record stride equals the number of
/// declared inputs; corners are read in fixed (position, normal, uv) order
/// rather than by declared per-input offsets.
fn extract_faces(poly: &Element) -> Result<Vec<FaceCorner>> {
    let stride = children(poly, "input").count();
    if stride < 3 {
        bail!(
            "polygon block declares {} inputs, expected position, normal, uv",
            stride
        );
    }

    let p = require_child(poly, "p")?;
    let indices = parse_indices(&require_text(p)?)?;

    Ok(indices
        .chunks_exact(stride)
        .map(|record| FaceCorner {
            p_index: record[0],
            n_index: record[1],
            u_index: record[2],
        })
        .collect())
}

/// The scene's single material binding; the polygon block's own symbol is
/// not consulted.
fn resolve_scene_material(doc: &Document) -> Result<String> {
    let scenes = doc.require_library("library_visual_scenes")?;
    let instance = descendant_by_tag(scenes, "instance_material")
        .ok_or_else(|| document::ResolveError::MissingElement("instance_material".into()))?;
    Ok(source_target(require_attr(instance, "target")?).to_string())
}

/// Decode a source's float array as x/y/z records.
fn decode_vec3(source: &Element) -> Result<Vec<Vec3>> {
    let floats = source_floats(source)?;
    Ok(floats
        .chunks_exact(3)
        .map(|c| Vec3 {
            x: c[0],
            y: c[1],
            z: c[2],
        })
        .collect())
}

/// Decode a source's float array as u/v records.
fn decode_uvs(source: &Element) -> Result<Vec<Uv>> {
    let floats = source_floats(source)?;
    Ok(floats.chunks_exact(2).map(|c| Uv { u: c[0], v: c[1] }).collect())
}

fn source_floats(source: &Element) -> Result<Vec<f32>> {
    let array = descendant_by_tag(source, "float_array")
        .ok_or_else(|| document::ResolveError::MissingElement("float_array".into()))?;
    Ok(parse_floats(&require_text(array)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOMETRY_DOC: &str = r##"<COLLADA>
      <library_geometries>
        <geometry id="g0"><mesh>
          <source id="pos"><float_array count="12">0 0 0 1 0 0 1 1 0 0 1 0</float_array></source>
          <source id="nrm"><float_array count="3">0 0 1</float_array></source>
          <source id="uv"><float_array count="4">0 0 1 1</float_array></source>
          <vertices id="verts"><input semantic="POSITION" source="#pos"/></vertices>
          <triangles material="mat-sym" count="2">
            <input semantic="VERTEX" source="#verts" offset="0"/>
            <input semantic="NORMAL" source="#nrm" offset="1"/>
            <input semantic="TEXCOORD" source="#uv" offset="2"/>
            <p>0 0 0 1 0 1 2 0 0 0 0 0 2 0 1 3 0 0</p>
          </triangles>
        </mesh></geometry>
      </library_geometries>
      <library_visual_scenes>
        <visual_scene><node><instance_geometry>
          <bind_material><technique_common>
            <instance_material symbol="mat-sym" target="#mat-body"/>
          </technique_common></bind_material>
        </instance_geometry></node></visual_scene>
      </library_visual_scenes>
    </COLLADA>"##;

    #[test]
    fn test_extract_geometry() {
        let doc = Document::parse(GEOMETRY_DOC).unwrap();
        let groups = extract_geometry(&doc).unwrap();
        assert_eq!(groups.len(), 1);

        let g = &groups[0];
        assert_eq!(g.positions.len(), 4);
        assert_eq!(g.normals.len(), 1);
        assert_eq!(g.uvs.len(), 2);
        assert_eq!(g.faces.len(), 6);
        assert_eq!(g.faces.len() % 3, 0);
        assert_eq!(
            g.positions[1],
            Vec3 {
                x: 1.0,
                y: 0.0,
                z: 0.0
            }
        );
        assert_eq!(
            g.faces[1],
            FaceCorner {
                p_index: 1,
                n_index: 0,
                u_index: 1
            }
        );
    }

    #[test]
    fn test_face_indices_in_bounds() {
        let doc = Document::parse(GEOMETRY_DOC).unwrap();
        let groups = extract_geometry(&doc).unwrap();
        for g in &groups {
            for corner in &g.faces {
                assert!(corner.p_index < g.positions.len());
                assert!(corner.n_index < g.normals.len());
                assert!(corner.u_index < g.uvs.len());
            }
        }
    }

    #[test]
    fn test_material_resolves_to_scene_binding() {
        let doc = Document::parse(GEOMETRY_DOC).unwrap();
        let groups = extract_geometry(&doc).unwrap();
        assert_eq!(groups[0].material_id.as_deref(), Some("mat-body"));
    }

    #[test]
    fn test_out_of_range_face_index_is_fatal() {
        let doc = Document::parse(&GEOMETRY_DOC.replace(
            "<p>0 0 0 1 0 1 2 0 0 0 0 0 2 0 1 3 0 0</p>",
            "<p>0 0 0 1 0 1 9 0 0</p>",
        ))
        .unwrap();
        assert!(extract_geometry(&doc).is_err());
    }
}
