use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::Vec3;
use log::warn;
use wgpu::util::DeviceExt;

use super::renderer::Renderer;
use crate::mesh::ObjModel;

/// Live count of GPU objects (buffers and textures) owned by uploaded
/// models. Each object holds a [`ResourceTicket`]; the count drops when the
/// ticket does, which makes release-then-acquire sequences observable from
/// tests without a GPU.
#[derive(Debug, Clone, Default)]
pub struct ResourceGauge {
    live: Arc<AtomicUsize>,
}

impl ResourceGauge {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub(crate) fn track(&self) -> ResourceTicket {
        self.live.fetch_add(1, Ordering::SeqCst);
        ResourceTicket {
            live: Arc::clone(&self.live),
        }
    }
}

#[derive(Debug)]
pub(crate) struct ResourceTicket {
    live: Arc<AtomicUsize>,
}

impl Drop for ResourceTicket {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Returns true when `requested` lives in a different directory than the
/// loaded model, i.e. when a reload is due. A bare filename compares as the
/// empty directory.
pub fn directory_changed(loaded_dir: &Path, requested: &Path) -> bool {
    requested.parent().unwrap_or_else(|| Path::new("")) != loaded_dir
}

/// Whether a requested path warrants a reload given the directory of the
/// currently resident model. With no model resident every request loads.
pub fn reload_needed(loaded_dir: Option<&Path>, requested: &Path) -> bool {
    match loaded_dir {
        Some(dir) => directory_changed(dir, requested),
        None => true,
    }
}

/// One uploaded draw group: vertex/index buffers plus the diffuse texture
/// bind group.
pub(crate) struct GpuGroup {
    pub(crate) vertex: wgpu::Buffer,
    pub(crate) index: wgpu::Buffer,
    pub(crate) index_count: u32,
    pub(crate) texture_bind_group: wgpu::BindGroup,
    _tickets: Vec<ResourceTicket>,
}

/// GPU residency for one model. Dropping it releases every buffer and
/// texture it owns; a reload must drop the old instance before uploading the
/// replacement.
pub struct GpuModel {
    source_dir: PathBuf,
    groups: Vec<GpuGroup>,
}

impl GpuModel {
    /// Uploads a parsed model. Texture decode failures degrade to a flat
    /// 1x1 texture of the material's diffuse color; they are steady-state
    /// issues, not load failures.
    pub fn upload(renderer: &Renderer, model: &ObjModel, source_dir: &Path) -> Self {
        let groups = model
            .groups
            .iter()
            .map(|group| {
                let mut tickets = Vec::new();

                let vertex = renderer
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{}-vertices", group.material.name)),
                        contents: bytemuck::cast_slice(&group.mesh.vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    });
                tickets.push(renderer.gauge.track());

                let index = renderer
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{}-indices", group.material.name)),
                        contents: bytemuck::cast_slice(&group.mesh.indices),
                        usage: wgpu::BufferUsages::INDEX,
                    });
                tickets.push(renderer.gauge.track());

                let texture_view = group
                    .material
                    .diffuse_texture
                    .as_deref()
                    .and_then(|relative| {
                        let path = source_dir.join(relative);
                        match image::open(&path) {
                            Ok(img) => Some(create_image_texture(renderer, &img.to_rgba8())),
                            Err(err) => {
                                warn!("texture {} not usable: {err}", path.display());
                                None
                            }
                        }
                    })
                    .unwrap_or_else(|| create_flat_texture(renderer, group.material.diffuse));
                tickets.push(renderer.gauge.track());

                let texture_bind_group =
                    renderer
                        .device
                        .create_bind_group(&wgpu::BindGroupDescriptor {
                            label: Some(&format!("{}-texture-bind", group.material.name)),
                            layout: &renderer.texture_layout,
                            entries: &[
                                wgpu::BindGroupEntry {
                                    binding: 0,
                                    resource: wgpu::BindingResource::TextureView(&texture_view),
                                },
                                wgpu::BindGroupEntry {
                                    binding: 1,
                                    resource: wgpu::BindingResource::Sampler(&renderer.sampler),
                                },
                            ],
                        });

                GpuGroup {
                    vertex,
                    index,
                    index_count: group.mesh.indices.len() as u32,
                    texture_bind_group,
                    _tickets: tickets,
                }
            })
            .collect();

        Self {
            source_dir: source_dir.to_path_buf(),
            groups,
        }
    }

    /// Directory the model was loaded from; the reload condition compares
    /// against this.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub(crate) fn groups(&self) -> &[GpuGroup] {
        &self.groups
    }
}

fn create_image_texture(renderer: &Renderer, rgba: &image::RgbaImage) -> wgpu::TextureView {
    let (width, height) = rgba.dimensions();
    create_texture(
        renderer,
        wgpu::TextureFormat::Rgba8UnormSrgb,
        width,
        height,
        rgba.as_raw(),
    )
}

fn create_flat_texture(renderer: &Renderer, color: Vec3) -> wgpu::TextureView {
    let pixel = [
        (color.x.clamp(0.0, 1.0) * 255.0) as u8,
        (color.y.clamp(0.0, 1.0) * 255.0) as u8,
        (color.z.clamp(0.0, 1.0) * 255.0) as u8,
        255,
    ];
    create_texture(renderer, wgpu::TextureFormat::Rgba8Unorm, 1, 1, &pixel)
}

fn create_texture(
    renderer: &Renderer,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    data: &[u8],
) -> wgpu::TextureView {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = renderer.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("diffuse-texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    renderer.queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_triggers_iff_directory_differs() {
        let loaded = Path::new("models/nanosuit");
        assert!(!directory_changed(loaded, Path::new("models/nanosuit/nanosuit.obj")));
        assert!(!directory_changed(loaded, Path::new("models/nanosuit/other.obj")));
        assert!(directory_changed(loaded, Path::new("models/cyborg/cyborg.obj")));
        assert!(directory_changed(loaded, Path::new("nanosuit.obj")));
        // A bare filename belongs to the empty directory.
        assert!(!directory_changed(Path::new(""), Path::new("nanosuit.obj")));
    }

    #[test]
    fn failed_load_leaves_the_path_retryable() {
        // A failed load keeps the resident model (and its directory)
        // unchanged, so resubmitting the same path reports the reload as
        // still due rather than silently ignoring it.
        let loaded = Path::new("models/nanosuit");
        let requested = Path::new("models/cyborg/cyborg.obj");
        assert!(reload_needed(Some(loaded), requested));
        assert!(reload_needed(Some(loaded), requested));
        assert!(reload_needed(None, Path::new("any.obj")));
        assert!(!reload_needed(
            Some(loaded),
            Path::new("models/nanosuit/nanosuit.obj")
        ));
    }

    #[test]
    fn gauge_counts_live_resources() {
        let gauge = ResourceGauge::default();
        assert_eq!(gauge.live(), 0);
        let ticket = gauge.track();
        assert_eq!(gauge.live(), 1);
        drop(ticket);
        assert_eq!(gauge.live(), 0);
    }

    #[test]
    fn release_then_acquire_never_leaks() {
        let gauge = ResourceGauge::default();
        let mut old: Vec<ResourceTicket> = (0..6).map(|_| gauge.track()).collect();
        assert_eq!(gauge.live(), 6);

        // Reload sequence: drop the previous set before creating the new
        // one, so the live count never exceeds either generation.
        old.clear();
        assert_eq!(gauge.live(), 0);
        let replacement: Vec<ResourceTicket> = (0..3).map(|_| gauge.track()).collect();
        assert_eq!(gauge.live(), replacement.len());
        drop(replacement);
        assert_eq!(gauge.live(), 0);
    }
}
