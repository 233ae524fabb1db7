//! Surfaces the shader path renders into.

use crate::texture::GpuTexture;
use prism_color::DisplayColorspace;
use std::sync::Arc;
use tracing::{debug, warn};

/// One acquirable image to draw a frame into.
pub struct Drawable {
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl Drawable {
    pub fn new(view: wgpu::TextureView, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            view,
            width,
            height,
            format,
            surface_texture: None,
        }
    }

    /// Hand the image to the display. Offscreen drawables have nothing to do.
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

/// Where shader-path output goes: a window surface or an offscreen texture.
pub trait DrawTarget {
    /// Resize and/or change the pixel format of future drawables.
    fn configure(&mut self, width: u32, height: u32, format: wgpu::TextureFormat);

    /// Next image to draw into, or `None` when the surface has nothing
    /// available this tick.
    fn next_drawable(&mut self) -> Option<Drawable>;

    fn size(&self) -> (u32, u32);

    fn format(&self) -> wgpu::TextureFormat;

    /// Tag future drawables with a colorspace and EDR request. Targets whose
    /// output never reaches a display can ignore it.
    fn set_colorspace(&mut self, _colorspace: DisplayColorspace, _extended_dynamic_range: bool) {}
}

/// A window swapchain.
pub struct WindowTarget {
    device: Arc<wgpu::Device>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

impl WindowTarget {
    pub fn new(
        device: Arc<wgpu::Device>,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        Self {
            device,
            surface,
            config,
        }
    }

    /// Formats the surface can be configured with.
    pub fn supported_formats(surface: &wgpu::Surface<'_>, adapter: &wgpu::Adapter) -> Vec<wgpu::TextureFormat> {
        surface.get_capabilities(adapter).formats
    }
}

impl DrawTarget for WindowTarget {
    fn configure(&mut self, width: u32, height: u32, format: wgpu::TextureFormat) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height, format) == (self.config.width, self.config.height, self.config.format) {
            return;
        }
        debug!(width, height, ?format, "reconfiguring surface");
        self.config.width = width;
        self.config.height = height;
        self.config.format = format;
        self.surface.configure(&self.device, &self.config);
    }

    fn next_drawable(&mut self) -> Option<Drawable> {
        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                self.surface.configure(&self.device, &self.config);
                return None;
            }
            Err(wgpu::SurfaceError::Timeout) => return None,
            Err(err) => {
                warn!("surface unavailable: {err}");
                return None;
            }
        };
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Some(Drawable {
            view,
            width: self.config.width,
            height: self.config.height,
            format: self.config.format,
            surface_texture: Some(texture),
        })
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }
}

/// Renders into a texture owned by the target.
pub struct OffscreenTarget {
    device: Arc<wgpu::Device>,
    texture: GpuTexture,
}

impl OffscreenTarget {
    pub fn new(device: Arc<wgpu::Device>, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        let texture = GpuTexture::render_target(&device, width.max(1), height.max(1), format);
        Self { device, texture }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture.texture
    }
}

impl DrawTarget for OffscreenTarget {
    fn configure(&mut self, width: u32, height: u32, format: wgpu::TextureFormat) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height, format) == (self.texture.width, self.texture.height, self.texture.format) {
            return;
        }
        self.texture = GpuTexture::render_target(&self.device, width, height, format);
    }

    fn next_drawable(&mut self) -> Option<Drawable> {
        let view = self
            .texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Some(Drawable::new(
            view,
            self.texture.width,
            self.texture.height,
            self.texture.format,
        ))
    }

    fn size(&self) -> (u32, u32) {
        (self.texture.width, self.texture.height)
    }

    fn format(&self) -> wgpu::TextureFormat {
        self.texture.format
    }
}
