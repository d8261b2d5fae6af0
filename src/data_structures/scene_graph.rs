//! Arena-backed scene graph.
//!
//! Nodes live in a flat `Vec` and refer to each other through [`NodeId`]s. A node is either a
//! plain [`NodeKind::Group`] or a [`NodeKind::Mesh`] carrying geometry and an optional
//! material. Detached nodes stay in the arena but are no longer reachable from the root,
//! so every consumer (renderer, bounds, recolor) walks the graph from a root instead of
//! iterating the arena.
//!
//! Traversals keep a visited set: a node reachable twice (shared child or cycle) is only
//! yielded once.

use std::collections::HashSet;

use cgmath::{Matrix4, Point3, SquareMatrix};

use crate::data_structures::{bounds::Aabb, transform::Transform};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Linear RGB colour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::linear(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::linear(0.0, 0.0, 0.0);

    pub const fn linear(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// `0xRRGGBB` in sRGB, as colours are written in CSS or a colour picker.
    pub fn from_hex(hex: u32) -> Self {
        Self::from_srgb_u8([
            ((hex >> 16) & 0xff) as u8,
            ((hex >> 8) & 0xff) as u8,
            (hex & 0xff) as u8,
        ])
    }

    pub fn from_srgb_u8(rgb: [u8; 3]) -> Self {
        Self {
            r: srgb_to_linear(rgb[0]),
            g: srgb_to_linear(rgb[1]),
            b: srgb_to_linear(rgb[2]),
        }
    }

    pub fn to_srgb_u8(self) -> [u8; 3] {
        [
            linear_to_srgb(self.r),
            linear_to_srgb(self.g),
            linear_to_srgb(self.b),
        ]
    }

    pub fn to_hex(self) -> u32 {
        let [r, g, b] = self.to_srgb_u8();
        (r as u32) << 16 | (g as u32) << 8 | b as u32
    }

    pub fn scaled(self, factor: f32) -> [f32; 3] {
        [self.r * factor, self.g * factor, self.b * factor]
    }
}

impl From<[f32; 3]> for Color {
    fn from(rgb: [f32; 3]) -> Self {
        Self::linear(rgb[0], rgb[1], rgb[2])
    }
}

fn srgb_to_linear(channel: u8) -> f32 {
    let c = channel as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(channel: f32) -> u8 {
    let c = channel.clamp(0.0, 1.0);
    let srgb = if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (srgb * 255.0).round() as u8
}

/// Surface description of a mesh. `texture` indexes [`SceneGraph::images`].
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub color: Color,
    pub metalness: f32,
    pub roughness: f32,
    pub texture: Option<usize>,
    pub double_sided: bool,
}

impl Material {
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
            metalness: 0.0,
            roughness: 1.0,
            texture: None,
            double_sided: false,
        }
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness;
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.double_sided = true;
        self
    }
}

/// Triangle list geometry. `normals` and `uvs` are either empty or one per position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn local_bounds(&self) -> Aabb {
        Aabb::from_points(self.positions.iter().map(|p| Point3::from(*p)))
    }

    /// Recompute smooth vertex normals from the triangles.
    ///
    /// Face normals are accumulated unnormalized, so larger faces weigh more. Vertices
    /// that belong to no triangle keep a zero normal. Triangles with an out-of-range index
    /// are skipped.
    pub fn compute_vertex_normals(&mut self) {
        use cgmath::{InnerSpace, Vector3, Zero};

        let mut normals = vec![Vector3::<f32>::zero(); self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= normals.len() || b >= normals.len() || c >= normals.len() {
                continue;
            }
            let pa = Vector3::from(self.positions[a]);
            let pb = Vector3::from(self.positions[b]);
            let pc = Vector3::from(self.positions[c]);
            let face = (pc - pb).cross(pa - pb);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        self.normals = normals
            .into_iter()
            .map(|n| {
                if n.magnitude2() > 0.0 {
                    n.normalize().into()
                } else {
                    [0.0; 3]
                }
            })
            .collect();
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub geometry: Geometry,
    pub material: Option<Material>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Mesh {
    pub fn new(geometry: Geometry, material: Material) -> Self {
        Self {
            geometry,
            material: Some(material),
            cast_shadow: false,
            receive_shadow: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh(Mesh),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self::new(name, NodeKind::Mesh(mesh))
    }

    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform: Transform::new(),
            kind,
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Group => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Group => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    root: NodeId,
    /// Decoded textures referenced by [`Material::texture`].
    pub images: Vec<image::RgbaImage>,
}

impl SceneGraph {
    /// A graph holding a single root group.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::group(root_name)],
            root: NodeId(0),
            images: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Add a node without attaching it anywhere.
    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Add `node` as the last child of `parent`.
    pub fn add(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.insert(node);
        self.attach(parent, id);
        id
    }

    /// Make `child` the last child of `parent`, detaching it from any previous parent.
    ///
    /// No cycle check happens here, traversals tolerate cycles.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Remove `id` from its parent's children. The node and its subtree stay in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }
    }

    /// Whether `id` is reachable from the graph root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.descendants(self.root).contains(&id)
    }

    /// Move every node of `other` into this graph and attach its root under `parent`.
    ///
    /// Node ids and texture indices of `other` are remapped. Returns the new id of its root.
    pub fn graft(&mut self, parent: NodeId, other: SceneGraph) -> NodeId {
        let node_offset = self.nodes.len();
        let image_offset = self.images.len();
        let remap = |id: NodeId| NodeId(id.0 + node_offset);

        for mut node in other.nodes {
            node.children = node.children.into_iter().map(remap).collect();
            node.parent = node.parent.map(remap);
            if let NodeKind::Mesh(Mesh {
                material: Some(material),
                ..
            }) = &mut node.kind
            {
                material.texture = material.texture.map(|t| t + image_offset);
            }
            self.nodes.push(node);
        }
        self.images.extend(other.images);

        let grafted_root = remap(other.root);
        // The grafted root may carry a stale parent from its old graph.
        self.nodes[grafted_root.0].parent = None;
        self.attach(parent, grafted_root);
        grafted_root
    }

    /// Pre-order list of `root` and everything below it, each node at most once.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if id.0 >= self.nodes.len() || !visited.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        order
    }

    /// Visit `root`'s subtree with the world matrix of every node.
    ///
    /// `root` is treated as having no parent, so its world matrix is its local matrix
    /// premultiplied by `parent_matrix`.
    pub fn visit_world<F>(&self, root: NodeId, parent_matrix: Matrix4<f32>, mut visit: F)
    where
        F: FnMut(NodeId, &Node, &Matrix4<f32>),
    {
        let mut visited = HashSet::new();
        let mut stack = vec![(root, parent_matrix)];
        while let Some((id, parent)) = stack.pop() {
            if id.0 >= self.nodes.len() || !visited.insert(id) {
                continue;
            }
            let node = &self.nodes[id.0];
            let world = parent * node.transform.to_matrix();
            visit(id, node, &world);
            stack.extend(node.children.iter().rev().map(|child| (*child, world)));
        }
    }

    /// World matrix of `id`, following parent links up to the top.
    pub fn world_matrix(&self, id: NodeId) -> Matrix4<f32> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if !visited.insert(node_id) {
                break;
            }
            chain.push(node_id);
            current = self.nodes[node_id.0].parent;
        }
        chain
            .into_iter()
            .rev()
            .fold(Matrix4::identity(), |acc, node_id| {
                acc * self.nodes[node_id.0].transform.to_matrix()
            })
    }

    pub fn world_position(&self, id: NodeId) -> Point3<f32> {
        let m = self.world_matrix(id);
        Point3::new(m.w.x, m.w.y, m.w.z)
    }

    /// World-space box over every vertex below `root`, with `root` treated as parentless.
    pub fn world_bounds(&self, root: NodeId) -> Aabb {
        let mut aabb = Aabb::empty();
        self.visit_world(root, Matrix4::identity(), |_, node, world| {
            if let NodeKind::Mesh(mesh) = &node.kind {
                aabb.expand_transformed(&mesh.geometry.local_bounds(), world);
            }
        });
        aabb
    }

    /// Ids of the mesh nodes below `root`.
    pub fn meshes(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.nodes[id.0].as_mesh().is_some())
            .collect()
    }

    /// First node below `root` with the given name.
    pub fn find(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|id| self.nodes[id.0].name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    fn triangle() -> Geometry {
        Geometry {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            indices: vec![0, 1, 2],
            ..Default::default()
        }
    }

    #[test]
    fn hex_colours_round_trip_through_linear() {
        let red = Color::from_hex(0xff0000);
        assert!((red.r - 1.0).abs() < 1e-6);
        assert_eq!((red.g, red.b), (0.0, 0.0));
        assert_eq!(Color::from_hex(0xcccccc).to_hex(), 0xcccccc);
        assert!(Color::from_hex(0x888888).r < 0.5);
    }

    #[test]
    fn vertex_normals_face_out_of_a_ccw_triangle() {
        let mut geometry = triangle();
        geometry.compute_vertex_normals();
        assert_eq!(geometry.normals, vec![[0.0, 0.0, 1.0]; 3]);
    }

    #[test]
    fn unused_vertices_get_zero_normals() {
        let mut geometry = triangle();
        geometry.positions.push([5.0, 5.0, 5.0]);
        geometry.compute_vertex_normals();
        assert_eq!(geometry.normals[3], [0.0; 3]);
    }

    #[test]
    fn attach_moves_a_node_between_parents() {
        let mut graph = SceneGraph::new("root");
        let a = graph.add(graph.root(), Node::group("a"));
        let b = graph.add(graph.root(), Node::group("b"));
        let leaf = graph.add(a, Node::group("leaf"));
        graph.attach(b, leaf);
        assert!(graph.node(a).children().is_empty());
        assert_eq!(graph.node(b).children(), &[leaf]);
        assert_eq!(graph.node(leaf).parent(), Some(b));
    }

    #[test]
    fn detached_nodes_are_unreachable() {
        let mut graph = SceneGraph::new("root");
        let a = graph.add(graph.root(), Node::group("a"));
        let child = graph.add(a, Node::group("child"));
        graph.detach(a);
        assert!(!graph.is_attached(a));
        assert!(!graph.is_attached(child));
        assert_eq!(graph.descendants(graph.root()), vec![graph.root()]);
    }

    #[test]
    fn traversal_terminates_on_cycles() {
        let mut graph = SceneGraph::new("root");
        let a = graph.add(graph.root(), Node::group("a"));
        let b = graph.add(a, Node::group("b"));
        // b -> a closes a loop; a loses its link to root.
        graph.attach(b, a);
        assert_eq!(graph.descendants(a), vec![a, b]);
        let mut visits = 0;
        graph.visit_world(a, Matrix4::identity(), |_, _, _| visits += 1);
        assert_eq!(visits, 2);
        let _ = graph.world_matrix(a);
    }

    #[test]
    fn graft_remaps_ids_and_textures() {
        let mut scene = SceneGraph::new("scene");
        scene.images.push(image::RgbaImage::new(1, 1));

        let mut model = SceneGraph::new("model");
        model.images.push(image::RgbaImage::new(2, 2));
        let mut material = Material::new("paint", Color::WHITE);
        material.texture = Some(0);
        model.add(
            model.root(),
            Node::mesh("body", Mesh::new(triangle(), material)),
        );

        let grafted = scene.graft(scene.root(), model);
        assert_eq!(scene.node(grafted).name, "model");
        assert_eq!(scene.node(grafted).parent(), Some(scene.root()));
        let body = scene.node(grafted).children()[0];
        assert_eq!(body.index(), 2, "ids are offset by the host graph size");
        let texture = scene
            .node(body)
            .as_mesh()
            .and_then(|m| m.material.as_ref())
            .and_then(|m| m.texture);
        assert_eq!(texture, Some(1));
        assert_eq!(scene.images.len(), 2);
    }

    #[test]
    fn world_bounds_include_the_root_transform() {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        graph.node_mut(root).transform = Transform::from(Vector3::new(0.0, 1.0, 0.0));
        graph.add(
            root,
            Node::mesh("tri", Mesh::new(triangle(), Material::new("", Color::WHITE))),
        );
        let aabb = graph.world_bounds(root);
        assert_eq!(aabb.min, Point3::new(0.0, 1.0, 0.0));
        assert_eq!(aabb.max, Point3::new(1.0, 2.0, 0.0));
    }
}
