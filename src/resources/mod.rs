//! Loading models and assets from disk.
//!
//! [`load_model_gltf`] reads a glTF/GLB file in chunks, reporting progress as it goes,
//! and decodes it into a [`SceneGraph`]. [`PendingLoad`] runs that on the tokio runtime and
//! hands progress and the final result back to the render thread through channels.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use futures::{
    FutureExt, StreamExt,
    channel::{mpsc, oneshot},
};
use tokio::io::AsyncReadExt;

use crate::data_structures::{
    scene_graph::{Color, Geometry, Material, Mesh, Node, NodeId, SceneGraph},
    transform::Transform,
};

pub mod mesh;
pub mod texture;

/// Size of a single read while streaming a model from disk.
const READ_CHUNK: usize = 64 * 1024;

const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

/// Bytes read so far out of the file size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl LoadProgress {
    /// Completed fraction in `[0, 1]`. Unknown totals count as not started.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.loaded as f64 / self.total as f64).clamp(0.0, 1.0) as f32
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read model {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode glTF {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("{} requires the unsupported extension {extension}", path.display())]
    UnsupportedExtension { path: PathBuf, extension: String },
    #[error("{} contains no scene", path.display())]
    EmptyScene { path: PathBuf },
    #[error("model load was cancelled before it finished")]
    Canceled,
}

/// Resolve a path relative to the asset directory.
///
/// Absolute paths and paths that exist relative to the working directory are used as
/// given. Otherwise `./assets/<path>` is tried, then the asset copy the build script
/// placed next to the build output.
pub fn resolve_asset_path(path: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }
    let local = Path::new("./").join("assets").join(path);
    if local.exists() {
        return local;
    }
    match option_env!("SHOWROOM_ASSET_DIR") {
        Some(bundled) if Path::new(bundled).join(path).exists() => Path::new(bundled).join(path),
        _ => local,
    }
}

/// Read a whole file, calling `on_progress` after every chunk.
///
/// `loaded` only grows and the last report has `loaded == total`.
pub async fn load_binary<F>(path: &Path, mut on_progress: F) -> Result<Vec<u8>, LoadError>
where
    F: FnMut(LoadProgress),
{
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = tokio::fs::File::open(path).await.map_err(io_err)?;
    let total = file.metadata().await.map_err(io_err)?.len();

    let mut data = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; READ_CHUNK];
    on_progress(LoadProgress { loaded: 0, total });
    loop {
        let read = file.read(&mut chunk).await.map_err(io_err)?;
        if read == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..read]);
        on_progress(LoadProgress {
            loaded: data.len() as u64,
            // A file that grew while reading reports its new size.
            total: total.max(data.len() as u64),
        });
    }
    let loaded = data.len() as u64;
    if loaded < total {
        // The file shrank while reading; close the sequence at what we actually got.
        on_progress(LoadProgress {
            loaded,
            total: loaded,
        });
    }
    Ok(data)
}

/// Load a glTF or GLB model into a scene graph.
///
/// Progress covers the file read. Decoding runs on the blocking pool afterwards.
pub async fn load_model_gltf<F>(path: &Path, on_progress: F) -> Result<SceneGraph, LoadError>
where
    F: FnMut(LoadProgress),
{
    log::info!("loading model {}", path.display());
    let bytes = load_binary(path, on_progress).await?;
    let owned_path = path.to_path_buf();
    let graph = tokio::task::spawn_blocking(move || decode_gltf(&bytes, &owned_path))
        .await
        .map_err(|_| LoadError::Canceled)??;
    log::info!(
        "decoded {}: {} nodes, {} meshes, {} images",
        path.display(),
        graph.len(),
        graph.meshes(graph.root()).len(),
        graph.images.len()
    );
    Ok(graph)
}

/// Decode glTF bytes. External buffers and images are resolved relative to `path`.
pub fn decode_gltf(bytes: &[u8], path: &Path) -> Result<SceneGraph, LoadError> {
    let decode_err = |source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    };

    // Validation rejects unknown required extensions with a generic message, so look for
    // Draco before validating to report it by name.
    if let Ok(unchecked) = gltf::Gltf::from_slice_without_validation(bytes) {
        if unchecked
            .extensions_required()
            .any(|extension| extension == DRACO_EXTENSION)
        {
            return Err(LoadError::UnsupportedExtension {
                path: path.to_path_buf(),
                extension: DRACO_EXTENSION.to_string(),
            });
        }
    }

    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes).map_err(decode_err)?;
    let base = path.parent();
    let buffers = gltf::import_buffers(&document, base, blob).map_err(decode_err)?;
    let images = gltf::import_images(&document, base, &buffers).map_err(decode_err)?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| LoadError::EmptyScene {
            path: path.to_path_buf(),
        })?;

    let mut graph = SceneGraph::new(scene.name().unwrap_or("Scene"));
    graph.images = images.into_iter().map(to_rgba).collect();

    let mut visited = HashSet::new();
    let root = graph.root();
    for node in scene.nodes() {
        add_node(&mut graph, root, node, &buffers, &mut visited);
    }
    Ok(graph)
}

fn add_node(
    graph: &mut SceneGraph,
    parent: NodeId,
    node: gltf::Node,
    buffers: &[gltf::buffer::Data],
    visited: &mut HashSet<usize>,
) {
    if !visited.insert(node.index()) {
        log::warn!("glTF node {} is referenced twice, skipping", node.index());
        return;
    }
    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Transform::from_decomposed(translation, rotation, scale);
    let name = node
        .name()
        .or_else(|| node.mesh().and_then(|mesh| mesh.name()))
        .unwrap_or("")
        .to_string();

    let meshes: Vec<Mesh> = node
        .mesh()
        .map(|mesh| {
            mesh.primitives()
                .filter_map(|primitive| read_primitive(&name, primitive, buffers))
                .collect()
        })
        .unwrap_or_default();

    // One primitive becomes the node itself, several become a group of mesh children.
    let id = match <[Mesh; 1]>::try_from(meshes) {
        Ok([mesh]) => graph.add(parent, Node::mesh(name, mesh).with_transform(transform)),
        Err(meshes) => {
            let group = graph.add(parent, Node::group(name.clone()).with_transform(transform));
            for (i, mesh) in meshes.into_iter().enumerate() {
                graph.add(group, Node::mesh(format!("{name}_{i}"), mesh));
            }
            group
        }
    };

    for child in node.children() {
        add_node(graph, id, child, buffers, visited);
    }
}

fn read_primitive(
    node_name: &str,
    primitive: gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> Option<Mesh> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!(
            "{node_name}: primitive {} uses {:?}, only triangles are drawn",
            primitive.index(),
            primitive.mode()
        );
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

    let Some(positions) = reader.read_positions() else {
        log::warn!("{node_name}: primitive {} has no positions", primitive.index());
        return None;
    };
    let positions: Vec<[f32; 3]> = positions.collect();
    let normals = reader
        .read_normals()
        .map(|normals| normals.collect())
        .unwrap_or_default();
    // Only the first uv set is used, secondary sets are dropped.
    let uvs = reader
        .read_tex_coords(0)
        .map(|uvs| uvs.into_f32().collect())
        .unwrap_or_default();
    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let geometry = Geometry {
        positions,
        normals,
        uvs,
        indices,
    };
    Some(Mesh {
        geometry,
        material: Some(read_material(primitive.material())),
        cast_shadow: false,
        receive_shadow: false,
    })
}

fn read_material(material: gltf::Material) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    Material {
        name: material.name().unwrap_or("").to_string(),
        color: Color::linear(r, g, b),
        metalness: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        texture: pbr
            .base_color_texture()
            .map(|info| info.texture().source().index()),
        double_sided: material.double_sided(),
    }
}

fn to_rgba(data: gltf::image::Data) -> image::RgbaImage {
    use gltf::image::Format;

    let (width, height) = (data.width, data.height);
    let converted = match data.format {
        Format::R8G8B8A8 => image::RgbaImage::from_raw(width, height, data.pixels),
        Format::R8G8B8 => image::RgbImage::from_raw(width, height, data.pixels)
            .map(|rgb| image::DynamicImage::ImageRgb8(rgb).to_rgba8()),
        Format::R8G8 => image::GrayAlphaImage::from_raw(width, height, data.pixels)
            .map(|la| image::DynamicImage::ImageLumaA8(la).to_rgba8()),
        Format::R8 => image::GrayImage::from_raw(width, height, data.pixels)
            .map(|l| image::DynamicImage::ImageLuma8(l).to_rgba8()),
        other => {
            log::warn!("texture format {other:?} is not supported, using white");
            None
        }
    };
    converted.unwrap_or_else(|| image::RgbaImage::from_pixel(1, 1, image::Rgba([255; 4])))
}

/// A model load running on the async runtime.
///
/// Progress is a finite stream that ends when the read finishes. The outcome arrives once.
/// Both are polled without blocking, so the render loop keeps drawing in the meantime.
pub struct PendingLoad {
    progress: mpsc::UnboundedReceiver<LoadProgress>,
    outcome: Option<oneshot::Receiver<Result<SceneGraph, LoadError>>>,
}

impl PendingLoad {
    pub fn spawn(runtime: &tokio::runtime::Handle, path: PathBuf) -> Self {
        let (progress_tx, progress) = mpsc::unbounded();
        let (outcome_tx, outcome) = oneshot::channel();
        runtime.spawn(async move {
            let result = load_model_gltf(&path, |progress| {
                // The receiver may be gone if the window closed mid-load.
                let _ = progress_tx.unbounded_send(progress);
            })
            .await;
            let _ = outcome_tx.send(result);
        });
        Self {
            progress,
            outcome: Some(outcome),
        }
    }

    /// Progress reports that arrived since the last call.
    pub fn drain_progress(&mut self) -> Vec<LoadProgress> {
        let mut drained = Vec::new();
        while let Some(Some(progress)) = self.progress.next().now_or_never() {
            drained.push(progress);
        }
        drained
    }

    /// The result, once. `None` while the load is running and after it was taken.
    pub fn poll_outcome(&mut self) -> Option<Result<SceneGraph, LoadError>> {
        let outcome = self.outcome.as_mut()?.now_or_never()?;
        self.outcome = None;
        Some(outcome.unwrap_or(Err(LoadError::Canceled)))
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_none()
    }
}
