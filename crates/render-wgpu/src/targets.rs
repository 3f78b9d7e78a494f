/// Color format of the picking target; ids round-trip exactly through unorm8.
pub const PICKING_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Offscreen picking color + depth, and the depth buffer of the visible pass.
pub(crate) struct RenderTargets {
    pub picking: wgpu::Texture,
    pub picking_view: wgpu::TextureView,
    pub picking_depth: wgpu::TextureView,
    pub screen_depth: wgpu::TextureView,
}

impl RenderTargets {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let picking = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("picking_texture"),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PICKING_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let picking_view = picking.create_view(&Default::default());
        Self {
            picking,
            picking_view,
            picking_depth: create_depth_texture(device, "picking_depth", width, height),
            screen_depth: create_depth_texture(device, "screen_depth", width, height),
        }
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: 1,
    }
}

fn create_depth_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent(width, height),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

/// Texture row of a bottom-left based `y`.
pub(crate) fn texture_row(y: u32, height: u32) -> u32 {
    height.saturating_sub(1).saturating_sub(y)
}
