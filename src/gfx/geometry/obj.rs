//! OBJ/MTL mesh loading.
//!
//! The loader runs in three stages: parse the MTL library into named
//! materials, triangulate the OBJ text in memory (quads become two triangles,
//! vertex positions are pre-scaled), then stream the triangulated text into
//! flat per-material vertex/normal buffers. Faces are expanded (not indexed)
//! so each material's triangles form one contiguous range and draw as a
//! single ranged call.
//!
//! Unsupported constructs (faces with more than 4 vertices, `vp`, `l`) are
//! hard errors rather than skipped lines.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, SceneError};
use crate::gfx::material::Material;

use super::MeshData;

/// A contiguous run of vertices sharing one material, `[start, end)` in
/// vertex units (3 per triangle).
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRange {
    /// Material name from the closest preceding `usemtl`, or `None` for
    /// faces before the first directive.
    pub name: Option<String>,
    pub start: u32,
    pub end: u32,
}

/// An OBJ-derived mesh: flattened buffers plus the material ranges and the
/// material table resolved from the MTL library.
#[derive(Debug, Clone)]
pub struct ObjMesh {
    pub mesh: MeshData,
    pub ranges: Vec<MaterialRange>,
    pub materials: HashMap<String, Material>,
}

impl ObjMesh {
    /// Material for a range, falling back to the default white diffuse when
    /// the range is unnamed or the MTL library does not define the name.
    pub fn material_for(&self, range: &MaterialRange) -> Material {
        range
            .name
            .as_ref()
            .and_then(|name| self.materials.get(name).copied())
            .unwrap_or_default()
    }
}

fn parse_f32(token: &str, line: usize) -> Result<f32> {
    token.parse::<f32>().map_err(|_| SceneError::MaterialParse {
        line,
        message: format!("expected a number, found {token:?}"),
    })
}

fn parse_color(tokens: &[&str], line: usize) -> Result<[f32; 3]> {
    if tokens.len() < 3 {
        return Err(SceneError::MaterialParse {
            line,
            message: format!("expected 3 components, found {}", tokens.len()),
        });
    }
    Ok([
        parse_f32(tokens[0], line)?,
        parse_f32(tokens[1], line)?,
        parse_f32(tokens[2], line)?,
    ])
}

/// Parse an MTL library into a name → [`Material`] mapping.
///
/// Recognized directives: `newmtl, Ns, Ka, Kd, Ks, Ke, Ni, d, illum`.
/// Fields absent from a material keep the construction defaults; malformed
/// numerics fail with [`SceneError::MaterialParse`].
pub fn parse_mtl(text: &str) -> Result<HashMap<String, Material>> {
    let mut materials = HashMap::new();
    let mut current: Option<(String, Material)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        let Some(&directive) = tokens.first() else {
            continue;
        };
        match directive {
            "newmtl" => {
                let name = tokens.get(1).ok_or(SceneError::MaterialParse {
                    line,
                    message: "newmtl without a name".into(),
                })?;
                if let Some((name, material)) = current.take() {
                    materials.insert(name, material);
                }
                current = Some((name.to_string(), Material::default()));
            }
            "Ns" | "Ka" | "Kd" | "Ks" | "Ke" | "Ni" | "d" | "illum" => {
                let Some((_, material)) = current.as_mut() else {
                    continue; // field outside any newmtl block
                };
                let value = tokens.get(1).copied().ok_or(SceneError::MaterialParse {
                    line,
                    message: format!("{directive} without a value"),
                })?;
                match directive {
                    "Ns" => material.shininess = parse_f32(value, line)?,
                    "Ka" => material.ambient = parse_color(&tokens[1..], line)?,
                    "Kd" => material.diffuse = parse_color(&tokens[1..], line)?,
                    "Ks" => material.specular = parse_color(&tokens[1..], line)?,
                    "Ke" => material.emission = parse_color(&tokens[1..], line)?,
                    // parsed for validation, not carried into shading
                    "Ni" | "d" => {
                        parse_f32(value, line)?;
                    }
                    "illum" => {
                        value
                            .parse::<i32>()
                            .map_err(|_| SceneError::MaterialParse {
                                line,
                                message: format!("malformed illum {value:?}"),
                            })?;
                    }
                    _ => unreachable!(),
                }
            }
            _ => {}
        }
    }
    if let Some((name, material)) = current.take() {
        materials.insert(name, material);
    }
    Ok(materials)
}

/// Triangulate OBJ text in memory.
///
/// Quad faces `(v0,v1,v2,v3)` split into `(v0,v1,v2)` and `(v2,v3,v0)`,
/// preserving winding; triangle faces pass through byte-identically; `v`
/// positions are scaled component-wise. Faces with more than 4 references,
/// `vp` and `l` elements are unsupported and abort the load.
pub fn triangulate(text: &str, scale: f32) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    for raw in text.lines() {
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        match tokens.first() {
            Some(&"f") => match tokens.len() - 1 {
                3 => {
                    out.push_str(raw);
                    out.push('\n');
                }
                4 => {
                    out.push_str(&format!("f {} {} {}\n", tokens[1], tokens[2], tokens[3]));
                    out.push_str(&format!("f {} {} {}\n", tokens[3], tokens[4], tokens[1]));
                }
                n => {
                    return Err(SceneError::UnsupportedGeometry(format!(
                        "face with {n} vertices"
                    )))
                }
            },
            Some(&"v") => {
                if tokens.len() < 4 {
                    return Err(SceneError::UnsupportedGeometry(format!(
                        "short vertex line: {raw:?}"
                    )));
                }
                let x: f32 = tokens[1]
                    .parse()
                    .map_err(|_| SceneError::UnsupportedGeometry(format!("malformed v: {raw:?}")))?;
                let y: f32 = tokens[2]
                    .parse()
                    .map_err(|_| SceneError::UnsupportedGeometry(format!("malformed v: {raw:?}")))?;
                let z: f32 = tokens[3]
                    .parse()
                    .map_err(|_| SceneError::UnsupportedGeometry(format!("malformed v: {raw:?}")))?;
                out.push_str(&format!("v {} {} {}\n", x * scale, y * scale, z * scale));
            }
            Some(&"vp") => {
                return Err(SceneError::UnsupportedGeometry("vp element".into()));
            }
            Some(&"l") => {
                return Err(SceneError::UnsupportedGeometry("l (line) element".into()));
            }
            _ => {
                out.push_str(raw);
                out.push('\n');
            }
        }
    }
    Ok(out)
}

/// One `i`, `i/j`, `i//k` or `i/j/k` face reference. Indices are 1-based.
struct FaceRef {
    position: usize,
    normal: Option<usize>,
}

fn parse_face_ref(token: &str) -> Result<FaceRef> {
    let mut parts = token.split('/');
    let position = parts
        .next()
        .and_then(|p| p.parse::<usize>().ok())
        .ok_or_else(|| SceneError::UnsupportedGeometry(format!("malformed face ref {token:?}")))?;
    let _texcoord = parts.next(); // texture index unused by the ranged path
    let normal = parts.next().and_then(|p| p.parse::<usize>().ok());
    Ok(FaceRef { position, normal })
}

fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        e1[1] * e2[2] - e1[2] * e2[1],
        e1[2] * e2[0] - e1[0] * e2[2],
        e1[0] * e2[1] - e1[1] * e2[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 0.0 {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

/// Stream already-triangulated OBJ text into an [`ObjMesh`].
///
/// Each `usemtl` closes the previous material's `[start, end)` vertex range;
/// the final range closes at end of input. Empty ranges are dropped so the
/// ranges partition the triangle list exactly.
pub fn load_obj_text(
    obj_text: &str,
    materials: HashMap<String, Material>,
    scale: f32,
) -> Result<ObjMesh> {
    let triangulated = triangulate(obj_text, scale)?;

    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut mesh = MeshData::new();
    let mut ranges = Vec::new();
    let mut current_name: Option<String> = None;
    let mut range_start = 0u32;

    let mut close_range = |name: Option<String>, start: u32, end: u32, out: &mut Vec<MaterialRange>| {
        if end > start {
            out.push(MaterialRange { name, start, end });
        }
    };

    for raw in triangulated.lines() {
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        match tokens.first() {
            Some(&"v") => {
                positions.push([
                    tokens[1].parse().unwrap_or(0.0),
                    tokens[2].parse().unwrap_or(0.0),
                    tokens[3].parse().unwrap_or(0.0),
                ]);
            }
            Some(&"vn") => {
                if tokens.len() < 4 {
                    return Err(SceneError::UnsupportedGeometry(format!(
                        "short normal line: {raw:?}"
                    )));
                }
                let component = |t: &str| -> Result<f32> {
                    t.parse().map_err(|_| {
                        SceneError::UnsupportedGeometry(format!("malformed vn: {raw:?}"))
                    })
                };
                normals.push([
                    component(tokens[1])?,
                    component(tokens[2])?,
                    component(tokens[3])?,
                ]);
            }
            Some(&"f") => {
                let refs = [
                    parse_face_ref(tokens[1])?,
                    parse_face_ref(tokens[2])?,
                    parse_face_ref(tokens[3])?,
                ];
                let corner = |r: &FaceRef| -> Result<[f32; 3]> {
                    positions.get(r.position - 1).copied().ok_or_else(|| {
                        SceneError::UnsupportedGeometry(format!(
                            "face references vertex {} of {}",
                            r.position,
                            positions.len()
                        ))
                    })
                };
                let corners = [corner(&refs[0])?, corner(&refs[1])?, corner(&refs[2])?];
                let flat = face_normal(corners[0], corners[1], corners[2]);
                for (r, p) in refs.iter().zip(corners) {
                    mesh.positions.push(p);
                    let n = r
                        .normal
                        .and_then(|i| normals.get(i - 1).copied())
                        .unwrap_or(flat);
                    mesh.normals.push(n);
                }
            }
            Some(&"usemtl") => {
                let end = mesh.positions.len() as u32;
                close_range(current_name.take(), range_start, end, &mut ranges);
                range_start = end;
                current_name = tokens.get(1).map(|s| s.to_string());
            }
            _ => {}
        }
    }
    close_range(current_name, range_start, mesh.positions.len() as u32, &mut ranges);

    mesh.validate()?;
    Ok(ObjMesh {
        mesh,
        ranges,
        materials,
    })
}

/// Load an OBJ from disk, with an optional MTL companion, scaling vertex
/// positions by `scale`.
pub fn load_obj(obj_path: &Path, mtl_path: Option<&Path>, scale: f32) -> Result<ObjMesh> {
    let materials = match mtl_path {
        Some(mtl_path) => {
            let mtl_text =
                fs::read_to_string(mtl_path).map_err(|source| SceneError::MissingFile {
                    path: mtl_path.to_path_buf(),
                    source,
                })?;
            parse_mtl(&mtl_text)?
        }
        None => HashMap::new(),
    };
    let obj_text = fs::read_to_string(obj_path).map_err(|source| SceneError::MissingFile {
        path: obj_path.to_path_buf(),
        source,
    })?;
    load_obj_text(&obj_text, materials, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";

    #[test]
    fn quad_splits_into_two_triangles_preserving_winding() {
        let out = triangulate(QUAD_OBJ, 1.0).unwrap();
        let faces: Vec<&str> = out.lines().filter(|l| l.starts_with('f')).collect();
        assert_eq!(faces, vec!["f 1 2 3", "f 3 4 1"]);
    }

    #[test]
    fn triangulation_is_idempotent_on_triangles() {
        let tri_only = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\nf 3 2 1\n";
        let once = triangulate(tri_only, 1.0).unwrap();
        let twice = triangulate(&once, 1.0).unwrap();
        let faces = |s: &str| -> Vec<String> {
            s.lines()
                .filter(|l| l.starts_with('f'))
                .map(str::to_string)
                .collect()
        };
        assert_eq!(faces(&once), faces(&twice));
        assert_eq!(faces(tri_only), faces(&once));
    }

    #[test]
    fn vertex_lines_are_scaled() {
        let out = triangulate("v 1 2 3\n", 0.5).unwrap();
        assert_eq!(out, "v 0.5 1 1.5\n");
    }

    #[test]
    fn unsupported_constructs_are_errors() {
        assert!(matches!(
            triangulate("f 1 2 3 4 5\n", 1.0),
            Err(SceneError::UnsupportedGeometry(_))
        ));
        assert!(matches!(
            triangulate("vp 0.5\n", 1.0),
            Err(SceneError::UnsupportedGeometry(_))
        ));
        assert!(matches!(
            triangulate("l 1 2\n", 1.0),
            Err(SceneError::UnsupportedGeometry(_))
        ));
    }

    #[test]
    fn mtl_fields_map_onto_material() {
        let text = "newmtl brick\nNs 32.0\nKa 0.1 0.1 0.1\nKd 0.8 0.2 0.2\nKs 0.5 0.5 0.5\nKe 0 0 0\nNi 1.45\nd 1.0\nillum 2\n";
        let materials = parse_mtl(text).unwrap();
        let brick = &materials["brick"];
        assert_eq!(brick.diffuse, [0.8, 0.2, 0.2]);
        assert_eq!(brick.shininess, 32.0);
    }

    #[test]
    fn mtl_missing_fields_keep_defaults() {
        let materials = parse_mtl("newmtl bare\nKd 0 1 0\n").unwrap();
        let bare = &materials["bare"];
        let default = Material::default();
        assert_eq!(bare.diffuse, [0.0, 1.0, 0.0]);
        assert_eq!(bare.ambient, default.ambient);
        assert_eq!(bare.shininess, default.shininess);
    }

    #[test]
    fn mtl_malformed_numeric_reports_line() {
        let err = parse_mtl("newmtl bad\nKd 0.5 oops 0.5\n").unwrap_err();
        match err {
            SceneError::MaterialParse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn material_ranges_partition_triangles_in_file_order() {
        let obj = "\
v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\n
f 1 2 3
usemtl red
f 1 2 4
f 2 3 4
usemtl blue
f 1 3 4
";
        let loaded = load_obj_text(obj, HashMap::new(), 1.0).unwrap();
        let names: Vec<Option<&str>> = loaded.ranges.iter().map(|r| r.name.as_deref()).collect();
        assert_eq!(names, vec![None, Some("red"), Some("blue")]);

        // contiguous cover, no gaps or overlaps, ends at the buffer length
        let mut cursor = 0;
        for range in &loaded.ranges {
            assert_eq!(range.start, cursor);
            assert!(range.end > range.start);
            cursor = range.end;
        }
        assert_eq!(cursor as usize, loaded.mesh.positions.len());
        assert_eq!(loaded.mesh.triangle_count(), 4);
    }

    #[test]
    fn faces_expand_flat_with_computed_normals() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let loaded = load_obj_text(obj, HashMap::new(), 2.0).unwrap();
        assert_eq!(loaded.mesh.positions.len(), 3);
        assert!(loaded.mesh.indices.is_none());
        assert_eq!(loaded.mesh.positions[1], [2.0, 0.0, 0.0]);
        // CCW in the xy plane: computed normal faces +z
        assert_eq!(loaded.mesh.normals[0], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn quad_face_expands_to_six_vertices() {
        let loaded = load_obj_text(QUAD_OBJ, HashMap::new(), 1.0).unwrap();
        assert_eq!(loaded.mesh.positions.len(), 6);
        // second triangle is (v2, v3, v0)
        assert_eq!(loaded.mesh.positions[3], [1.0, 1.0, 0.0]);
        assert_eq!(loaded.mesh.positions[4], [0.0, 1.0, 0.0]);
        assert_eq!(loaded.mesh.positions[5], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn malformed_normal_is_an_error() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 x 1\nf 1//1 2//1 3//1\n";
        assert!(matches!(
            load_obj_text(obj, HashMap::new(), 1.0),
            Err(SceneError::UnsupportedGeometry(_))
        ));
    }

    #[test]
    fn missing_file_error_carries_path() {
        let err = load_obj(
            Path::new("does_not_exist.obj"),
            Some(Path::new("does_not_exist.mtl")),
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, SceneError::MissingFile { .. }));
    }

    #[test]
    fn unknown_range_material_falls_back_to_default() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl ghost\nf 1 2 3\n";
        let loaded = load_obj_text(obj, HashMap::new(), 1.0).unwrap();
        let material = loaded.material_for(&loaded.ranges[0]);
        assert_eq!(material.diffuse, Material::default().diffuse);
    }
}
