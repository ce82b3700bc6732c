//! GPU context for off-screen compositing.
//!
//! The decal layer never touches a window, so the context is just an adapter,
//! a device, and a queue. Hosts that already own a device can pass it in with
//! [`GpuContext::from_parts`].

use log::info;

use crate::composite::CompositeError;

/// Wraps the wgpu device and queue the GPU backend draws with.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Create a headless context on the default adapter.
    pub fn headless() -> Result<Self, CompositeError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| CompositeError::Device(format!("no suitable GPU adapter: {e}")))?;

        let adapter_info = adapter.get_info();
        info!("composite adapter: {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("merki composite device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        }))
        .map_err(|e| CompositeError::Device(format!("failed to create GPU device: {e}")))?;

        Ok(Self { device, queue })
    }

    /// Use a device and queue the host already created.
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    /// Largest square target the device supports.
    pub fn max_resolution(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}
