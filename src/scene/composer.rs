//! The showroom scene and everything that mutates it.
//!
//! [`Showroom`] is the single owner of the scene graph, the lights, the ground, the model
//! slot and the auto-rotate state. The control panel and the render loop both work on a
//! `&mut Showroom`, there is no other shared state.

use std::f32::consts::{FRAC_PI_2, TAU};

use cgmath::{Euler, Point3, Rad, Vector3};

use crate::{
    config::ViewerConfig,
    data_structures::{
        scene_graph::{Color, Material, Mesh, Node, NodeId, SceneGraph},
        transform::Transform,
    },
    resources::{
        LoadProgress,
        mesh::{box_geometry, plane_geometry},
    },
    scene::{
        classifier,
        lights::Lights,
        normalizer::{self, NormalizationTransform, NormalizeError},
    },
};

/// Where the spotlight moves once a model is in place.
const SPOT_POSITION_WITH_MODEL: Point3<f32> = Point3::new(0.0, 10.0, 0.0);
const MODEL_METALNESS: f32 = 0.7;
const MODEL_ROUGHNESS: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutoRotate {
    pub enabled: bool,
    /// Radians added to the model's yaw every frame.
    pub speed: f32,
}

impl Default for AutoRotate {
    fn default() -> Self {
        Self {
            enabled: true,
            speed: 0.005,
        }
    }
}

/// What currently occupies the model position. Exactly one of the two is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelSlot {
    Placeholder(NodeId),
    Loaded(NodeId),
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadStatus {
    Loading { loaded: u64, total: u64 },
    Ready,
    Failed(String),
}

impl LoadStatus {
    /// Completed fraction while loading.
    pub fn fraction(&self) -> Option<f32> {
        match self {
            LoadStatus::Loading { loaded, total } => Some(
                LoadProgress {
                    loaded: *loaded,
                    total: *total,
                }
                .fraction(),
            ),
            _ => None,
        }
    }
}

/// Every value the control panel can read and write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Param {
    ModelRotationY,
    ModelHeight,
    ModelScaleX,
    ModelScaleY,
    ModelScaleZ,
    BodyColor,
    SpotIntensity,
    SpotAngle,
    SpotPenumbra,
    SpotHeight,
    AutoRotateEnabled,
    AutoRotateSpeed,
    DirectionalShadowBias,
    SpotShadowBias,
    GroundHeight,
}

impl Param {
    /// Parameters that only exist once a model is attached.
    pub fn requires_model(self) -> bool {
        matches!(
            self,
            Param::ModelRotationY
                | Param::ModelHeight
                | Param::ModelScaleX
                | Param::ModelScaleY
                | Param::ModelScaleZ
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Number(f32),
    Flag(bool),
    Color(Color),
}

impl Value {
    pub fn as_number(self) -> Option<f32> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_flag(self) -> Option<bool> {
        match self {
            Value::Flag(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_color(self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Showroom {
    graph: SceneGraph,
    pub lights: Lights,
    ground: NodeId,
    slot: ModelSlot,
    pub auto_rotate: AutoRotate,
    body_color: Color,
    status: LoadStatus,
    target_size: f32,
    last_logged_decile: Option<u64>,
}

impl Showroom {
    /// The static scene: ground plane, grey placeholder box and the light rig.
    pub fn new(config: &ViewerConfig) -> Self {
        let mut graph = SceneGraph::new("Showroom");
        let root = graph.root();

        let mut ground_mesh = Mesh::new(
            plane_geometry(10.0, 10.0),
            Material::new("ground", Color::from_hex(0xcccccc))
                .with_roughness(0.8)
                .double_sided(),
        );
        ground_mesh.receive_shadow = true;
        let ground = graph.add(
            root,
            Node::mesh("ground", ground_mesh).with_transform(
                Transform::new()
                    .with_position(Vector3::new(0.0, -2.0, 0.0))
                    .with_rotation(Euler::new(Rad(FRAC_PI_2), Rad(0.0), Rad(0.0))),
            ),
        );

        let placeholder = graph.add(
            root,
            Node::mesh(
                "placeholder",
                Mesh::new(
                    box_geometry(1.0, 1.0, 1.0),
                    Material::new("placeholder", Color::from_hex(0x888888)).with_roughness(0.8),
                ),
            ),
        );

        Self {
            graph,
            lights: Lights::default(),
            ground,
            slot: ModelSlot::Placeholder(placeholder),
            auto_rotate: AutoRotate::default(),
            body_color: config.body_color,
            status: LoadStatus::Loading {
                loaded: 0,
                total: 0,
            },
            target_size: config.target_size,
            last_logged_decile: None,
        }
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn slot(&self) -> ModelSlot {
        self.slot
    }

    pub fn model(&self) -> Option<NodeId> {
        match self.slot {
            ModelSlot::Loaded(id) => Some(id),
            ModelSlot::Placeholder(_) => None,
        }
    }

    pub fn ground(&self) -> NodeId {
        self.ground
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn body_color(&self) -> Color {
        self.body_color
    }

    pub fn record_progress(&mut self, progress: LoadProgress) {
        if self.status == LoadStatus::Ready {
            return;
        }
        self.status = LoadStatus::Loading {
            loaded: progress.loaded,
            total: progress.total,
        };
        let decile = (progress.fraction() * 10.0).floor() as u64;
        if progress.total > 0 && self.last_logged_decile.is_none_or(|last| decile > last) {
            self.last_logged_decile = Some(decile);
            log::info!(
                "model {}% loaded ({} / {} bytes)",
                decile * 10,
                progress.loaded,
                progress.total
            );
        }
    }

    /// Swap the placeholder (or a previous model) for `model`.
    ///
    /// The model is prepared for the showroom (fresh normals, car paint material
    /// parameters, shadows on), normalized, attached, lit by the spotlight and painted in
    /// the current body colour. If normalization fails the scene is left untouched and
    /// the load is marked failed.
    pub fn attach_model(
        &mut self,
        mut model: SceneGraph,
    ) -> Result<NormalizationTransform, NormalizeError> {
        let model_root = model.root();
        prepare_model(&mut model);
        let normalization = match normalizer::normalize_to(&mut model, model_root, self.target_size) {
            Ok(normalization) => normalization,
            Err(e) => {
                self.fail_load(format!("model cannot be placed: {e}"));
                return Err(e);
            }
        };

        let previous = match self.slot {
            ModelSlot::Placeholder(id) | ModelSlot::Loaded(id) => id,
        };
        self.graph.detach(previous);
        let root = self.graph.root();
        let attached = self.graph.graft(root, model);
        self.slot = ModelSlot::Loaded(attached);

        self.lights.spot.position = SPOT_POSITION_WITH_MODEL;
        self.lights.spot.target = self.graph.world_position(attached);
        let painted = classifier::recolor(&mut self.graph, attached, self.body_color);
        self.status = LoadStatus::Ready;
        log::info!(
            "model attached: scale {:.4}, y offset {:.4}, {painted} body meshes",
            normalization.scale,
            normalization.y_offset
        );
        Ok(normalization)
    }

    /// Mark the load as failed. The placeholder stays in place.
    pub fn fail_load(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("model load failed: {message}");
        self.status = LoadStatus::Failed(message);
    }

    /// Store the body colour and repaint the attached model.
    pub fn set_body_color(&mut self, color: Color) {
        self.body_color = color;
        if let Some(model) = self.model() {
            classifier::recolor(&mut self.graph, model, color);
        }
    }

    /// Per-frame update: advance auto-rotation and keep the spotlight on the model.
    pub fn tick(&mut self) {
        let Some(model) = self.model() else {
            return;
        };
        if self.auto_rotate.enabled {
            let yaw = &mut self.graph.node_mut(model).transform.rotation.y;
            *yaw = Rad((yaw.0 + self.auto_rotate.speed).rem_euclid(TAU));
        }
        self.lights.spot.target = self.graph.world_position(model);
    }

    pub fn get(&self, param: Param) -> Option<Value> {
        let model = self.model().map(|id| &self.graph.node(id).transform);
        let number = |n: f32| Some(Value::Number(n));
        match param {
            Param::ModelRotationY => model.and_then(|t| number(t.rotation.y.0)),
            Param::ModelHeight => model.and_then(|t| number(t.position.y)),
            Param::ModelScaleX => model.and_then(|t| number(t.scale.x)),
            Param::ModelScaleY => model.and_then(|t| number(t.scale.y)),
            Param::ModelScaleZ => model.and_then(|t| number(t.scale.z)),
            Param::BodyColor => Some(Value::Color(self.body_color)),
            Param::SpotIntensity => number(self.lights.spot.intensity),
            Param::SpotAngle => number(self.lights.spot.angle),
            Param::SpotPenumbra => number(self.lights.spot.penumbra),
            Param::SpotHeight => number(self.lights.spot.position.y),
            Param::AutoRotateEnabled => Some(Value::Flag(self.auto_rotate.enabled)),
            Param::AutoRotateSpeed => number(self.auto_rotate.speed),
            Param::DirectionalShadowBias => number(self.lights.directional.shadow.bias),
            Param::SpotShadowBias => number(self.lights.spot.shadow.bias),
            Param::GroundHeight => number(self.graph.node(self.ground).transform.position.y),
        }
    }

    /// Write `value` to `param`. Returns false when the parameter does not exist yet or the
    /// value has the wrong type. Range limits are the panel's business.
    pub fn set(&mut self, param: Param, value: Value) -> bool {
        if let Param::BodyColor = param {
            return match value.as_color() {
                Some(color) => {
                    self.set_body_color(color);
                    true
                }
                None => false,
            };
        }
        if let Param::AutoRotateEnabled = param {
            return match value.as_flag() {
                Some(enabled) => {
                    self.auto_rotate.enabled = enabled;
                    true
                }
                None => false,
            };
        }
        let Some(n) = value.as_number() else {
            return false;
        };
        if param.requires_model() {
            let Some(model) = self.model() else {
                return false;
            };
            let transform = &mut self.graph.node_mut(model).transform;
            match param {
                Param::ModelRotationY => transform.rotation.y = Rad(n),
                Param::ModelHeight => transform.position.y = n,
                Param::ModelScaleX => transform.scale.x = n,
                Param::ModelScaleY => transform.scale.y = n,
                Param::ModelScaleZ => transform.scale.z = n,
                _ => return false,
            }
            self.lights.spot.target = self.graph.world_position(model);
            return true;
        }
        match param {
            Param::SpotIntensity => self.lights.spot.intensity = n,
            Param::SpotAngle => self.lights.spot.angle = n,
            Param::SpotPenumbra => self.lights.spot.penumbra = n,
            Param::SpotHeight => self.lights.spot.position.y = n,
            Param::AutoRotateSpeed => self.auto_rotate.speed = n,
            Param::DirectionalShadowBias => self.lights.directional.shadow.bias = n,
            Param::SpotShadowBias => self.lights.spot.shadow.bias = n,
            Param::GroundHeight => self.graph.node_mut(self.ground).transform.position.y = n,
            _ => return false,
        }
        true
    }
}

/// Give a freshly loaded model the showroom look: recomputed normals, car paint
/// metalness and roughness, and shadows cast and received by every mesh.
fn prepare_model(model: &mut SceneGraph) {
    for id in model.meshes(model.root()) {
        let Some(mesh) = model.node_mut(id).as_mesh_mut() else {
            continue;
        };
        mesh.geometry.compute_vertex_normals();
        mesh.cast_shadow = true;
        mesh.receive_shadow = true;
        if let Some(material) = mesh.material.as_mut() {
            material.metalness = MODEL_METALNESS;
            material.roughness = MODEL_ROUGHNESS;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::scene_graph::Geometry;

    fn car() -> SceneGraph {
        let mut car = SceneGraph::new("car");
        let root = car.root();
        car.add(
            root,
            Node::mesh(
                "Body",
                Mesh::new(box_geometry(4.0, 1.0, 2.0), Material::new("", Color::WHITE)),
            ),
        );
        car.add(
            root,
            Node::mesh(
                "Seat",
                Mesh::new(
                    box_geometry(1.0, 1.0, 1.0),
                    Material::new("interior_seat", Color::WHITE),
                ),
            ),
        );
        car
    }

    #[test]
    fn starts_with_the_placeholder() {
        let showroom = Showroom::new(&ViewerConfig::default());
        let ModelSlot::Placeholder(placeholder) = showroom.slot() else {
            panic!("expected the placeholder");
        };
        assert!(showroom.graph().is_attached(placeholder));
        assert_eq!(showroom.model(), None);
        assert_eq!(showroom.get(Param::ModelHeight), None);
    }

    #[test]
    fn prepare_sets_paint_and_shadows() {
        let mut model = car();
        prepare_model(&mut model);
        for id in model.meshes(model.root()) {
            let mesh = model.node(id).as_mesh().unwrap();
            assert!(mesh.cast_shadow && mesh.receive_shadow);
            let material = mesh.material.as_ref().unwrap();
            assert_eq!((material.metalness, material.roughness), (0.7, 0.3));
            assert_eq!(mesh.geometry.normals.len(), mesh.geometry.positions.len());
        }
    }

    #[test]
    fn rotation_wraps_around_a_full_turn() {
        let mut showroom = Showroom::new(&ViewerConfig::default());
        showroom.attach_model(car()).unwrap();
        showroom.set(Param::ModelRotationY, Value::Number(TAU - 0.001));
        showroom.tick();
        let Some(Value::Number(yaw)) = showroom.get(Param::ModelRotationY) else {
            panic!("rotation should be readable");
        };
        assert!((yaw - 0.004).abs() < 1e-4, "yaw {yaw}");
    }

    #[test]
    fn empty_models_fail_and_keep_the_placeholder() {
        let mut showroom = Showroom::new(&ViewerConfig::default());
        let mut empty = SceneGraph::new("empty");
        let root = empty.root();
        empty.add(root, Node::mesh("nothing", Mesh::new(Geometry::default(), Material::new("", Color::WHITE))));
        assert!(showroom.attach_model(empty).is_err());
        assert!(matches!(showroom.slot(), ModelSlot::Placeholder(_)));
        assert!(matches!(showroom.status(), LoadStatus::Failed(_)));
    }

    #[test]
    fn progress_reports_update_the_status() {
        let mut showroom = Showroom::new(&ViewerConfig::default());
        showroom.record_progress(LoadProgress {
            loaded: 50,
            total: 200,
        });
        assert_eq!(showroom.status().fraction(), Some(0.25));
    }
}
