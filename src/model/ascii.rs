//! A textual bridge compatible with the MDLOps ASCII dialect: whitespace-
//! tolerant, `#`-comments skipped, one node per `node <type> <name>` block.
//! Round-tripping through this format need not reproduce the same bytes as
//! the binary codec, only the same model once re-read.

use kotor_common::error::Error;

use super::controller::{Controller, ControllerType};
use super::mesh::{Face, MeshData};
use super::node::{Node, NodeId, NodeKind};
use super::Model;

/// Tokenizes a line into whitespace-separated words, stripping a trailing
/// `#`-comment first.
fn tokenize(line: &str) -> Vec<&str> {
    let without_comment = line.split('#').next().unwrap_or("");
    without_comment.split_whitespace().collect()
}

fn parse_f32(token: &str) -> Result<f32, Error> {
    token.parse::<f32>().map_err(|_| Error::StructuralError(format!("expected a number, found `{token}`")))
}

fn parse_vec3(tokens: &[&str]) -> Result<[f32; 3], Error> {
    if tokens.len() < 3 {
        return Err(Error::StructuralError("expected 3 numbers".into()));
    }
    Ok([parse_f32(tokens[0])?, parse_f32(tokens[1])?, parse_f32(tokens[2])?])
}

fn parse_vec4(tokens: &[&str]) -> Result<[f32; 4], Error> {
    if tokens.len() < 4 {
        return Err(Error::StructuralError("expected 4 numbers".into()));
    }
    Ok([parse_f32(tokens[0])?, parse_f32(tokens[1])?, parse_f32(tokens[2])?, parse_f32(tokens[3])?])
}

fn node_kind_keyword(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Dummy => "dummy",
        NodeKind::Trimesh(_) => "trimesh",
        NodeKind::Skin(..) => "skin",
        NodeKind::Dangly(..) => "danglymesh",
        NodeKind::Aabb(..) => "aabb",
        NodeKind::Saber(_) => "saber",
        NodeKind::Light(_) => "light",
        NodeKind::Emitter(_) => "emitter",
        NodeKind::Reference(_) => "reference",
    }
}

/// Serializes a [`Model`] to the ASCII dialect. Only geometry (node tree,
/// vertices, faces, and a coarse controller dump) round-trips; per-type
/// render properties are left to the binary codec.
pub fn write(model: &Model) -> String {
    let mut out = String::new();
    out.push_str(&format!("newmodel {}\n", model.name));
    out.push_str(&format!("setsupermodel {} {}\n", model.name, model.supermodel));
    out.push_str(&format!("classification {}\n", model.classification));
    write_node(&mut out, model, model.root, 0);
    out.push_str("donemodel\n");

    for animation in &model.animations {
        out.push_str(&format!("newanim {} {}\n", animation.name, model.name));
        out.push_str(&format!("length {}\n", animation.length));
        out.push_str(&format!("transtime {}\n", animation.transition_time));
        for event in &animation.events {
            out.push_str(&format!("event {} {}\n", event.time, event.name));
        }
        out.push_str("doneanim\n");
    }
    out
}

fn write_node(out: &mut String, model: &Model, node_id: NodeId, depth: usize) {
    let node = model.node(node_id);
    let indent = "  ".repeat(depth);
    out.push_str(&format!("{indent}node {} {}\n", node_kind_keyword(&node.kind), node.name));
    out.push_str(&format!("{indent}  parent {}\n", node.parent.map(|p| model.node(p).name.clone()).unwrap_or_else(|| "NULL".to_string())));
    out.push_str(&format!("{indent}  position {} {} {}\n", node.position[0], node.position[1], node.position[2]));
    out.push_str(&format!(
        "{indent}  orientation {} {} {} {}\n",
        node.orientation[0], node.orientation[1], node.orientation[2], node.orientation[3]
    ));

    if let Some(mesh) = node.kind.mesh() {
        write_mesh_block(out, &indent, mesh);
    }

    for controller in &node.controllers {
        write_controller_block(out, &indent, controller);
    }

    for &child in &node.children {
        write_node(out, model, child, depth + 1);
    }
    out.push_str(&format!("{indent}endnode\n"));
}

fn write_mesh_block(out: &mut String, indent: &str, mesh: &MeshData) {
    out.push_str(&format!("{indent}  verts {}\n", mesh.vertices.len()));
    for v in &mesh.vertices {
        out.push_str(&format!("{indent}    {} {} {}\n", v[0], v[1], v[2]));
    }
    if !mesh.uv1.is_empty() {
        out.push_str(&format!("{indent}  tverts {}\n", mesh.uv1.len()));
        for uv in &mesh.uv1 {
            out.push_str(&format!("{indent}    {} {}\n", uv[0], uv[1]));
        }
    }
    out.push_str(&format!("{indent}  faces {}\n", mesh.faces.len()));
    for face in &mesh.faces {
        out.push_str(&format!("{indent}    {} {} {} {}\n", face.v1, face.v2, face.v3, face.material));
    }
}

fn write_controller_block(out: &mut String, indent: &str, controller: &Controller) {
    let keyword = match controller.controller_type {
        ControllerType::Position => "position",
        ControllerType::Orientation => "orientation",
        ControllerType::Scale => "scale",
        _ => "controller",
    };
    out.push_str(&format!("{indent}  {} {}\n", keyword, controller.rows.len()));
    for row in &controller.rows {
        let values = row.values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
        out.push_str(&format!("{indent}    {} {}\n", row.time, values));
    }
}

/// Parses a model out of the ASCII dialect. Tolerant of blank lines and
/// `#`-comments; unknown directives inside a node block are skipped.
pub fn read(text: &str) -> Result<Model, Error> {
    let mut lines = text.lines().map(tokenize).filter(|t| !t.is_empty()).peekable();

    let mut name = String::new();
    let mut supermodel = String::new();
    let mut classification = 0u8;
    let mut nodes: Vec<Node> = Vec::new();
    let mut root = None;
    let mut animations = Vec::new();

    while let Some(tokens) = lines.next() {
        match tokens[0] {
            "newmodel" => name = tokens.get(1).unwrap_or(&"").to_string(),
            "setsupermodel" => supermodel = tokens.get(2).unwrap_or(&"").to_string(),
            "classification" => classification = tokens.get(1).and_then(|t| t.parse().ok()).unwrap_or(0),
            "node" => {
                let keyword = *tokens.get(1).ok_or_else(|| Error::StructuralError("node missing type keyword".into()))?;
                let node_name = tokens.get(2).unwrap_or(&"").to_string();
                let node_id = read_node_block(&mut lines, keyword, node_name, &mut nodes, None)?;
                if root.is_none() {
                    root = Some(node_id);
                }
            }
            "newanim" => {
                let anim_name = tokens.get(1).unwrap_or(&"").to_string();
                animations.push(read_animation_block(&mut lines, anim_name)?);
            }
            "donemodel" => break,
            _ => {}
        }
    }

    let root = root.ok_or_else(|| Error::StructuralError("model has no root node".into()))?;

    Ok(Model {
        name,
        supermodel,
        classification,
        fog: false,
        bounding_box_min: [0.0; 3],
        bounding_box_max: [0.0; 3],
        radius: 0.0,
        anim_scale: 1.0,
        nodes,
        root,
        animations,
    })
}

fn read_node_block<'a>(
    lines: &mut std::iter::Peekable<impl Iterator<Item = Vec<&'a str>>>,
    keyword: &str,
    name: String,
    nodes: &mut Vec<Node>,
    parent: Option<NodeId>,
) -> Result<NodeId, Error> {
    let kind = match keyword {
        "trimesh" | "skin" | "danglymesh" | "aabb" | "saber" => NodeKind::Trimesh(MeshData::default()),
        _ => NodeKind::Dummy,
    };

    let node_id = NodeId(nodes.len());
    let mut node = Node::new(nodes.len() as u16, name, kind);
    node.parent = parent;
    nodes.push(node);

    let mut children = Vec::new();
    let mut vertices: Vec<[f32; 3]> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut faces: Vec<Face> = Vec::new();

    while let Some(tokens) = lines.next() {
        match tokens[0] {
            "position" => nodes[node_id.0].position = parse_vec3(&tokens[1..])?,
            "orientation" => nodes[node_id.0].orientation = parse_vec4(&tokens[1..])?,
            "parent" => {}
            "verts" => {
                let count: usize = tokens.get(1).and_then(|t| t.parse().ok()).unwrap_or(0);
                for _ in 0..count {
                    if let Some(row) = lines.next() {
                        vertices.push(parse_vec3(&row)?);
                    }
                }
            }
            "tverts" => {
                let count: usize = tokens.get(1).and_then(|t| t.parse().ok()).unwrap_or(0);
                for _ in 0..count {
                    if let Some(row) = lines.next() {
                        if row.len() >= 2 {
                            uvs.push([parse_f32(row[0])?, parse_f32(row[1])?]);
                        }
                    }
                }
            }
            "faces" => {
                let count: usize = tokens.get(1).and_then(|t| t.parse().ok()).unwrap_or(0);
                for _ in 0..count {
                    if let Some(row) = lines.next() {
                        if row.len() >= 4 {
                            faces.push(Face {
                                v1: row[0].parse().unwrap_or(0),
                                v2: row[1].parse().unwrap_or(0),
                                v3: row[2].parse().unwrap_or(0),
                                material: row[3].parse().unwrap_or(0),
                                normal: [0.0; 3],
                                plane_distance: 0.0,
                            });
                        }
                    }
                }
            }
            "position" | "scale" | "orientation_key" => {}
            "node" => {
                let child_keyword = *tokens.get(1).ok_or_else(|| Error::StructuralError("node missing type keyword".into()))?;
                let child_name = tokens.get(2).unwrap_or(&"").to_string();
                children.push(read_node_block(lines, child_keyword, child_name, nodes, Some(node_id))?);
            }
            "endnode" => break,
            _ => {}
        }
    }

    if let NodeKind::Trimesh(mesh) = &mut nodes[node_id.0].kind {
        mesh.vertices = vertices;
        mesh.vertex_count = mesh.vertices.len() as u32;
        mesh.uv1 = uvs;
        mesh.faces = faces;
    }
    nodes[node_id.0].children = children;

    Ok(node_id)
}

fn read_animation_block<'a>(lines: &mut std::iter::Peekable<impl Iterator<Item = Vec<&'a str>>>, name: String) -> Result<super::anim::Animation, Error> {
    let mut length = 0.0;
    let mut transition_time = 0.0;
    let mut events = Vec::new();

    while let Some(tokens) = lines.next() {
        match tokens[0] {
            "length" => length = tokens.get(1).map(|t| parse_f32(t)).transpose()?.unwrap_or(0.0),
            "transtime" => transition_time = tokens.get(1).map(|t| parse_f32(t)).transpose()?.unwrap_or(0.0),
            "event" => {
                let time = tokens.get(1).map(|t| parse_f32(t)).transpose()?.unwrap_or(0.0);
                let event_name = tokens.get(2).unwrap_or(&"").to_string();
                events.push(super::anim::AnimationEvent { time, name: event_name });
            }
            "doneanim" => break,
            _ => {}
        }
    }

    Ok(super::anim::Animation { name, length, transition_time, anim_root: String::new(), events, nodes: Vec::new(), root: 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::Node as ModelNode;

    fn sample_model() -> Model {
        let mut nodes = Vec::new();
        let mut mesh = MeshData::default();
        mesh.vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        mesh.vertex_count = 3;
        mesh.faces = vec![Face { v1: 0, v2: 1, v3: 2, material: 1, normal: [0.0, 0.0, 1.0], plane_distance: 0.0 }];
        let mesh_node = ModelNode::new(1, "trimesh01", NodeKind::Trimesh(mesh));
        nodes.push(mesh_node);

        Model {
            name: "test_model".to_string(),
            supermodel: "NULL".to_string(),
            classification: 2,
            fog: false,
            bounding_box_min: [0.0; 3],
            bounding_box_max: [0.0; 3],
            radius: 1.0,
            anim_scale: 1.0,
            nodes,
            root: NodeId(0),
            animations: Vec::new(),
        }
    }

    #[test]
    fn test_round_trip_basic_trimesh() {
        let model = sample_model();
        let text = write(&model);
        let parsed = read(&text).unwrap();

        assert_eq!(parsed.name, model.name);
        assert_eq!(parsed.nodes.len(), model.nodes.len());
        let original_mesh = model.node(model.root).kind.mesh().unwrap();
        let parsed_mesh = parsed.node(parsed.root).kind.mesh().unwrap();
        assert_eq!(parsed_mesh.vertices, original_mesh.vertices);
        assert_eq!(parsed_mesh.faces.len(), original_mesh.faces.len());
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let text = "newmodel foo\n# a comment\n\nclassification 2\nnode dummy root\nendnode\ndonemodel\n";
        let parsed = read(text).unwrap();
        assert_eq!(parsed.name, "foo");
        assert_eq!(parsed.classification, 2);
    }
}
