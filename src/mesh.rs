use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::{Vec2, Vec3};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Floats per interleaved vertex: `position.xyz normal.xyz texcoord.uv`.
pub const VERTEX_STRIDE: usize = 8;

/// Errors produced while loading a model from disk.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("face references vertex {index} out of range")]
    IndexOutOfRange { index: i32 },
    #[error("OBJ file does not define any vertices")]
    NoVertices,
}

/// GPU ready mesh buffers produced from one OBJ draw group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjMesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl ObjMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Material resolved from an MTL library. Only the properties the shader
/// consumes per-mesh survive parsing; the panel owns the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub diffuse: Vec3,
    pub diffuse_texture: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            diffuse: Vec3::splat(0.8),
            diffuse_texture: None,
        }
    }
}

/// One draw group: a mesh plus the material it was declared under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjGroup {
    pub material: Material,
    pub mesh: ObjMesh,
}

/// A parsed model: the draw groups of a single OBJ file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjModel {
    pub groups: Vec<ObjGroup>,
}

impl ObjModel {
    pub fn vertex_count(&self) -> usize {
        self.groups.iter().map(|g| g.mesh.vertex_count()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.groups.iter().map(|g| g.mesh.triangle_count()).sum()
    }
}

/// Loads an OBJ file and any MTL libraries it references from the file's
/// directory. A missing or unreadable material library is not an error; the
/// affected groups fall back to the default flat material.
pub fn load_model(path: &Path) -> Result<ObjModel, MeshError> {
    let data = fs::read_to_string(path).map_err(|source| MeshError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    let mut materials = HashMap::new();
    for library in mtllib_references(&data) {
        let library_path = dir.join(&library);
        match fs::read_to_string(&library_path) {
            Ok(text) => materials.extend(parse_mtl(&text)),
            Err(err) => warn!(
                "material library {} not readable: {err}",
                library_path.display()
            ),
        }
    }

    parse_obj(&data, &materials)
}

/// Names of the MTL libraries an OBJ file references.
pub fn mtllib_references(data: &str) -> Vec<String> {
    data.lines()
        .filter_map(|line| line.trim().strip_prefix("mtllib "))
        .map(|rest| rest.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Parses an MTL library into a name -> material table. Malformed statements
/// are skipped; an MTL file is auxiliary data, not a load-bearing input.
pub fn parse_mtl(data: &str) -> HashMap<String, Material> {
    let mut materials = HashMap::new();
    let mut current: Option<Material> = None;

    for line in data.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        match tag {
            "newmtl" => {
                if let Some(finished) = current.take() {
                    materials.insert(finished.name.clone(), finished);
                }
                let name = parts.collect::<Vec<_>>().join(" ");
                if !name.is_empty() {
                    current = Some(Material {
                        name,
                        ..Material::default()
                    });
                }
            }
            "Kd" => {
                if let (Some(material), Ok(color)) = (current.as_mut(), parse_vec3(parts)) {
                    material.diffuse = color;
                }
            }
            "map_Kd" => {
                if let Some(material) = current.as_mut() {
                    let path = parts.collect::<Vec<_>>().join(" ");
                    if !path.is_empty() {
                        material.diffuse_texture = Some(path);
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(finished) = current.take() {
        materials.insert(finished.name.clone(), finished);
    }
    materials
}

/// Parses OBJ text into draw groups, splitting on `usemtl` and resolving
/// material names against the given table.
///
/// Faces with more than three vertices are fan-triangulated; negative
/// indices resolve from the end of the respective list; vertices are
/// deduplicated per group by their (position, texcoord, normal) triple.
/// Vertices whose face references omit a normal get smooth normals computed
/// from the triangle geometry; authored normals are kept as written.
pub fn parse_obj(
    data: &str,
    materials: &HashMap<String, Material>,
) -> Result<ObjModel, MeshError> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut texcoords = Vec::new();
    let mut groups: Vec<(Option<String>, Vec<[FaceIndex; 3]>)> = vec![(None, Vec::new())];

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        match tag {
            "v" => positions.push(parse_vec3(parts).map_err(|message| MeshError::Parse {
                line: line_no + 1,
                message: format!("invalid vertex: {message}"),
            })?),
            "vn" => normals.push(parse_vec3(parts).map_err(|message| MeshError::Parse {
                line: line_no + 1,
                message: format!("invalid normal: {message}"),
            })?),
            "vt" => texcoords.push(parse_vec2(parts).map_err(|message| MeshError::Parse {
                line: line_no + 1,
                message: format!("invalid texcoord: {message}"),
            })?),
            "f" => {
                let polygon = parse_face(parts).map_err(|message| MeshError::Parse {
                    line: line_no + 1,
                    message: format!("invalid face: {message}"),
                })?;
                if let Some((_, faces)) = groups.last_mut() {
                    triangulate_face(&polygon, faces);
                }
            }
            "usemtl" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                let name = (!name.is_empty()).then_some(name);
                match groups.last_mut() {
                    Some((material, faces)) if faces.is_empty() => *material = name,
                    _ => groups.push((name, Vec::new())),
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(MeshError::NoVertices);
    }

    let mut model = ObjModel::default();
    for (material_name, faces) in groups {
        if faces.is_empty() {
            continue;
        }
        let material = material_name
            .as_deref()
            .and_then(|name| materials.get(name).cloned())
            .or_else(|| {
                material_name.map(|name| Material {
                    name,
                    ..Material::default()
                })
            })
            .unwrap_or_default();

        let mut mesh = build_mesh(&positions, &normals, &texcoords, &faces)?;
        if needs_normals(&mesh.vertices) {
            fill_missing_normals(&mut mesh);
        }
        model.groups.push(ObjGroup { material, mesh });
    }

    Ok(model)
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3, String> {
    let x = parse_component(parts.next())?;
    let y = parse_component(parts.next())?;
    let z = parse_component(parts.next())?;
    Ok(Vec3::new(x, y, z))
}

fn parse_vec2<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec2, String> {
    let u = parse_component(parts.next())?;
    let v = parse_component(parts.next())?;
    Ok(Vec2::new(u, v))
}

fn parse_component(part: Option<&str>) -> Result<f32, String> {
    part.ok_or_else(|| "missing component".to_string())?
        .parse::<f32>()
        .map_err(|err| err.to_string())
}

#[derive(Debug, Clone, Copy)]
struct FaceIndex {
    v: i32,
    vt: i32,
    vn: i32,
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<FaceIndex>, String> {
    let mut indices = Vec::new();
    for part in parts {
        let mut segments = part.split('/');
        let v = segments
            .next()
            .ok_or_else(|| "missing vertex index".to_string())?
            .parse::<i32>()
            .map_err(|err| err.to_string())?;
        let vt = segments
            .next()
            .map(|s| if s.is_empty() { 0 } else { s.parse::<i32>().unwrap_or(0) })
            .unwrap_or(0);
        let vn = segments
            .next()
            .map(|s| if s.is_empty() { 0 } else { s.parse::<i32>().unwrap_or(0) })
            .unwrap_or(0);
        indices.push(FaceIndex { v, vt, vn });
    }
    if indices.len() < 3 {
        return Err("faces must reference at least 3 vertices".to_string());
    }
    Ok(indices)
}

fn triangulate_face(polygon: &[FaceIndex], faces: &mut Vec<[FaceIndex; 3]>) {
    if polygon.len() < 3 {
        return;
    }
    for i in 1..(polygon.len() - 1) {
        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Key {
    position: usize,
    texcoord: Option<usize>,
    normal: Option<usize>,
}

fn build_mesh(
    positions: &[Vec3],
    normals: &[Vec3],
    texcoords: &[Vec2],
    faces: &[[FaceIndex; 3]],
) -> Result<ObjMesh, MeshError> {
    let mut lookup: HashMap<Key, u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for face in faces {
        for idx in face {
            let pos_index =
                fix_index(idx.v, positions.len()).ok_or(MeshError::IndexOutOfRange { index: idx.v })?;
            let texcoord_index = fix_index(idx.vt, texcoords.len());
            let normal_index = fix_index(idx.vn, normals.len());
            let key = Key {
                position: pos_index,
                texcoord: texcoord_index,
                normal: normal_index,
            };
            let next_index = (vertices.len() / VERTEX_STRIDE) as u32;
            let entry = lookup.entry(key).or_insert_with(|| {
                let position = positions[pos_index];
                vertices.extend_from_slice(&[position.x, position.y, position.z]);
                let normal = normal_index.map(|i| normals[i]).unwrap_or(Vec3::ZERO);
                vertices.extend_from_slice(&[normal.x, normal.y, normal.z]);
                let texcoord = texcoord_index.map(|i| texcoords[i]).unwrap_or(Vec2::ZERO);
                vertices.extend_from_slice(&[texcoord.x, texcoord.y]);
                next_index
            });
            indices.push(*entry);
        }
    }

    Ok(ObjMesh { vertices, indices })
}

fn fix_index(index: i32, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let abs = (-index) as usize;
        (abs <= len).then_some(len - abs)
    } else {
        None
    }
}

fn needs_normals(vertices: &[f32]) -> bool {
    vertices
        .chunks_exact(VERTEX_STRIDE)
        .any(|chunk| chunk[3] == 0.0 && chunk[4] == 0.0 && chunk[5] == 0.0)
}

/// Computes smooth normals for the vertices that lack one. Authored normals
/// are left untouched, so a file with partial normal data keeps its shading.
fn fill_missing_normals(mesh: &mut ObjMesh) {
    let vertex_count = mesh.vertices.len() / VERTEX_STRIDE;
    let missing: Vec<bool> = mesh
        .vertices
        .chunks_exact(VERTEX_STRIDE)
        .map(|chunk| chunk[3] == 0.0 && chunk[4] == 0.0 && chunk[5] == 0.0)
        .collect();
    let mut accum = vec![Vec3::ZERO; vertex_count];

    for triangle in mesh.indices.chunks_exact(3) {
        let i0 = triangle[0] as usize;
        let i1 = triangle[1] as usize;
        let i2 = triangle[2] as usize;
        let p0 = Vec3::from_slice(&mesh.vertices[i0 * VERTEX_STRIDE..i0 * VERTEX_STRIDE + 3]);
        let p1 = Vec3::from_slice(&mesh.vertices[i1 * VERTEX_STRIDE..i1 * VERTEX_STRIDE + 3]);
        let p2 = Vec3::from_slice(&mesh.vertices[i2 * VERTEX_STRIDE..i2 * VERTEX_STRIDE + 3]);
        let normal = (p1 - p0).cross(p2 - p0);
        if normal.length_squared() > f32::EPSILON {
            let normal = normal.normalize();
            for index in [i0, i1, i2] {
                if missing[index] {
                    accum[index] += normal;
                }
            }
        }
    }

    for (i, normal) in accum.into_iter().enumerate() {
        if !missing[i] {
            continue;
        }
        let normal = normal.normalize_or_zero();
        mesh.vertices[i * VERTEX_STRIDE + 3] = normal.x;
        mesh.vertices[i * VERTEX_STRIDE + 4] = normal.y;
        mesh.vertices[i * VERTEX_STRIDE + 5] = normal.z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> ObjModel {
        parse_obj(data, &HashMap::new()).unwrap()
    }

    #[test]
    fn parses_simple_triangle() {
        let model = parse("\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        assert_eq!(model.groups.len(), 1);
        let mesh = &model.groups[0].mesh;
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices.len(), 3 * VERTEX_STRIDE);
        assert_eq!(model.triangle_count(), 1);
    }

    #[test]
    fn computes_missing_normals() {
        let model = parse("\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        for chunk in model.groups[0].mesh.vertices.chunks_exact(VERTEX_STRIDE) {
            let normal = Vec3::new(chunk[3], chunk[4], chunk[5]);
            assert!((normal.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn authored_normals_survive_partial_fill() {
        // Three corners carry an authored off-axis normal; the fourth omits
        // its normal. Only the fourth gets a computed one.
        let obj =
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 1 0 0\nf 1//1 2//1 3//1\nf 1//1 3//1 4\n";
        let model = parse(obj);
        let vertices = &model.groups[0].mesh.vertices;
        for i in 0..3 {
            let base = i * VERTEX_STRIDE + 3;
            assert_eq!(&vertices[base..base + 3], &[1.0, 0.0, 0.0]);
        }
        let base = 3 * VERTEX_STRIDE + 3;
        let computed = Vec3::new(vertices[base], vertices[base + 1], vertices[base + 2]);
        assert!((computed - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn quad_is_fan_triangulated() {
        let model = parse("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n");
        assert_eq!(model.triangle_count(), 2);
        assert_eq!(model.groups[0].mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn negative_indices_resolve_from_end() {
        let model = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n");
        assert_eq!(model.groups[0].mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn texcoords_survive_interleaving() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n";
        let model = parse(obj);
        let vertices = &model.groups[0].mesh.vertices;
        assert_eq!(&vertices[6..8], &[0.0, 0.0]);
        assert_eq!(&vertices[VERTEX_STRIDE + 6..VERTEX_STRIDE + 8], &[1.0, 0.0]);
    }

    #[test]
    fn usemtl_splits_draw_groups() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl a\nf 1 2 3\nusemtl b\nf 3 2 1\n";
        let mut materials = HashMap::new();
        materials.insert(
            "a".to_string(),
            Material {
                name: "a".to_string(),
                diffuse: Vec3::new(1.0, 0.0, 0.0),
                diffuse_texture: Some("a.png".to_string()),
            },
        );
        let model = parse_obj(obj, &materials).unwrap();
        assert_eq!(model.groups.len(), 2);
        assert_eq!(model.groups[0].material.diffuse, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(
            model.groups[0].material.diffuse_texture.as_deref(),
            Some("a.png")
        );
        // Unknown material name falls back to default properties.
        assert_eq!(model.groups[1].material.name, "b");
        assert_eq!(model.groups[1].material.diffuse, Vec3::splat(0.8));
    }

    #[test]
    fn empty_obj_is_an_error() {
        assert!(matches!(
            parse_obj("# nothing here\n", &HashMap::new()),
            Err(MeshError::NoVertices)
        ));
    }

    #[test]
    fn parses_mtl_library() {
        let mtl = "newmtl body\nKd 0.5 0.25 0.125\nmap_Kd tex/body diffuse.png\n\nnewmtl visor\nKd 0 0 1\n";
        let materials = parse_mtl(mtl);
        assert_eq!(materials.len(), 2);
        let body = &materials["body"];
        assert_eq!(body.diffuse, Vec3::new(0.5, 0.25, 0.125));
        assert_eq!(body.diffuse_texture.as_deref(), Some("tex/body diffuse.png"));
        assert!(materials["visor"].diffuse_texture.is_none());
    }

    #[test]
    fn mtllib_references_are_collected() {
        let obj = "mtllib model.mtl\nv 0 0 0\nmtllib extra.mtl\n";
        assert_eq!(mtllib_references(obj), vec!["model.mtl", "extra.mtl"]);
    }
}
