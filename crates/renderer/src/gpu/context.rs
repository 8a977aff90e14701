use anyhow::{Context as AnyhowContext, Result};

use crate::types::{AdapterProfile, BackendPreference, GpuPowerPreference, RendererError};

/// Headless wgpu device; every frame renders into an offscreen texture.
pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_profile: AdapterProfile,
    pub max_dimension: u32,
}

impl GpuContext {
    /// Walks the backend attempts in order and keeps the first adapter that
    /// also yields a device.
    pub(crate) fn new(
        backend: BackendPreference,
        power: GpuPowerPreference,
    ) -> Result<Self, RendererError> {
        let mut failures = Vec::new();
        for &backends in backend.attempts() {
            match Self::try_backends(backends, power) {
                Ok(context) => return Ok(context),
                Err(err) => {
                    tracing::warn!(?backends, error = %err, "GPU backend unavailable, trying next");
                    failures.push(format!("{backends:?}: {err:#}"));
                }
            }
        }
        Err(RendererError::NoAdapter {
            attempts: failures.join("; "),
        })
    }

    fn try_backends(backends: wgpu::Backends, power: GpuPowerPreference) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: power.to_wgpu(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        let compatibility = backends == wgpu::Backends::GL;
        let required_limits = if compatibility {
            wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
        } else {
            adapter.limits()
        };
        let adapter_profile = AdapterProfile::from_wgpu(&info, compatibility);
        tracing::debug!(
            name = %adapter_profile.name,
            backend = ?adapter_profile.backend,
            device_type = ?adapter_profile.device_type,
            is_software = adapter_profile.is_software(),
            compatibility,
            "selected GPU adapter"
        );

        let max_dimension = required_limits.max_texture_dimension_2d;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("photo editor device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        Ok(Self {
            _instance: instance,
            device,
            queue,
            adapter_profile,
            max_dimension,
        })
    }

    /// Rejects sizes the device cannot allocate a texture for.
    pub(crate) fn check_size(&self, width: u32, height: u32) -> Result<(), RendererError> {
        if width == 0 || height == 0 {
            return Err(RendererError::InvalidCanvas { width, height });
        }
        if width > self.max_dimension || height > self.max_dimension {
            return Err(RendererError::TooLarge {
                width,
                height,
                max: self.max_dimension,
            });
        }
        Ok(())
    }
}

/// Colour texture that programs draw into and that can be read back or
/// sampled by a later pass.
pub(crate) struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    pub(crate) fn new(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: crate::gpu::programs::TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    pub(crate) fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub(crate) fn destroy(&self) {
        self.texture.destroy();
    }
}
