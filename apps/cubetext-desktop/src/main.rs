mod scene;

use anyhow::{Context as _, Result, anyhow};
use clap::{Parser, ValueEnum};
use cubetext_common::{InstanceKey, SizeConfig};
use cubetext_core::{
    Align, CubeOptions, CubeText, CubeTextConfig, DEFAULT_THRESHOLD, FrameScheduler, TextOptions,
};
use cubetext_glyph::{FontFamily, FontRasterizer};
use cubetext_render::{BatchId, ResizeEntry};
use cubetext_render_wgpu::WgpuBackend;
use scene::{PluginSpec, Scene};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Fonts tried in order when `--font` is not given.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Parser)]
#[command(name = "cubetext-desktop", about = "Draw text as animated cubes")]
struct Cli {
    /// Text to draw
    text: Option<String>,

    /// Default font file; common system fonts are tried when omitted
    #[arg(long)]
    font: Option<PathBuf>,

    /// Font file loaded in the background and used instead of the default font
    #[arg(long)]
    family: Option<PathBuf>,

    /// Font size in pixels
    #[arg(long)]
    font_size: Option<f32>,

    /// Edge length of one cube
    #[arg(long)]
    cube_size: Option<f32>,

    /// Distance between neighbouring cubes
    #[arg(long)]
    margin: Option<f32>,

    #[arg(long, value_enum)]
    align: Option<AlignArg>,

    /// Pixels with alpha at or below this produce no cube
    #[arg(long)]
    threshold: Option<u8>,

    /// JSON scene file with text, options and plugins
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlignArg {
    Left,
    Center,
    Right,
}

impl From<AlignArg> for Align {
    fn from(arg: AlignArg) -> Self {
        match arg {
            AlignArg::Left => Align::Left,
            AlignArg::Center => Align::Center,
            AlignArg::Right => Align::Right,
        }
    }
}

/// What to draw, after command-line flags are laid over the scene file.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    text: String,
    text_options: TextOptions,
    cube_options: CubeOptions,
    threshold: u8,
    family: Option<FontFamily>,
    plugins: Vec<PluginSpec>,
}

impl Settings {
    fn resolve(cli: &Cli, scene: Scene) -> Self {
        let mut text_options = scene.text_options.clone().unwrap_or_default();
        if let Some(size) = cli.font_size {
            text_options.size = size;
        }
        let mut cube_options = scene.cube_options.clone().unwrap_or_default();
        if let Some(size) = cli.cube_size {
            cube_options.size = size;
        }
        if let Some(margin) = cli.margin {
            cube_options.margin = margin;
        }
        if let Some(align) = cli.align {
            cube_options.align = align.into();
        }
        let family = cli.family.as_ref().map(|uri| FontFamily {
            name: uri
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| uri.display().to_string()),
            uri: uri.clone(),
        });
        Self {
            text: cli
                .text
                .clone()
                .or_else(|| scene.text.clone())
                .unwrap_or_else(|| "cube".into()),
            text_options,
            cube_options,
            threshold: cli.threshold.or(scene.threshold).unwrap_or(DEFAULT_THRESHOLD),
            family,
            plugins: scene.plugins(),
        }
    }
}

fn resolve_font(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    SYSTEM_FONTS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .ok_or_else(|| anyhow!("no system font found; pass one with --font"))
}

/// Redraw requests on the window stand in for display frames.
struct WindowScheduler {
    window: Arc<Window>,
    pending: bool,
}

impl WindowScheduler {
    fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

impl FrameScheduler for WindowScheduler {
    fn request_frame(&mut self) {
        self.pending = true;
        self.window.request_redraw();
    }

    fn cancel(&mut self) {
        self.pending = false;
    }
}

type DesktopCubeText = CubeText<WgpuBackend, FontRasterizer, WindowScheduler>;

struct GpuApp {
    settings: Settings,
    rasterizer: Option<FontRasterizer>,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    config: Option<wgpu::SurfaceConfiguration>,
    cube_text: Option<DesktopCubeText>,
    hovered: Option<(BatchId, InstanceKey)>,
    started: Instant,
}

impl GpuApp {
    fn new(settings: Settings, rasterizer: FontRasterizer) -> Self {
        Self {
            settings,
            rasterizer: Some(rasterizer),
            window: None,
            surface: None,
            config: None,
            cube_text: None,
            hovered: None,
            started: Instant::now(),
        }
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("cube text")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no suitable GPU adapter"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("cubetext_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("surface reports no formats"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        let backend = WgpuBackend::new(device, queue, surface_format, config.width, config.height);
        let rasterizer = self
            .rasterizer
            .take()
            .ok_or_else(|| anyhow!("cube text already initialized"))?;
        let scheduler = WindowScheduler {
            window: window.clone(),
            pending: false,
        };
        let mut cube_config = CubeTextConfig {
            threshold: self.settings.threshold,
            ..CubeTextConfig::default()
        };
        cube_config.world.clear_color = [0.04, 0.04, 0.06, 1.0];
        let mut cube_text = CubeText::new(
            backend,
            rasterizer,
            scheduler,
            logical_size(&window, size),
            cube_config,
        )?;
        cube_text.notify_resize(resize_entry(&window, size))?;

        for spec in &self.settings.plugins {
            let id = cube_text.register(spec.build());
            tracing::debug!(%id, ?spec, "plugin registered");
        }
        cube_text.draw_text(
            &self.settings.text,
            &self.settings.text_options,
            &self.settings.cube_options,
            self.settings.family.clone(),
        )?;
        tracing::info!(
            text = %self.settings.text,
            cubes = cube_text.cubes().map_or(0, |c| c.len()),
            "text drawn"
        );
        cube_text.run();

        self.window = Some(window);
        self.surface = Some(surface);
        self.config = Some(config);
        self.cube_text = Some(cube_text);
        self.started = Instant::now();
        Ok(())
    }

    fn redraw_text(&mut self) {
        let Some(cube_text) = &mut self.cube_text else {
            return;
        };
        cube_text.rewind_plugins();
        cube_text.reset_clock();
        if let Err(e) = cube_text.draw_text(
            &self.settings.text,
            &self.settings.text_options,
            &self.settings.cube_options,
            self.settings.family.clone(),
        ) {
            tracing::error!("failed to draw text: {e}");
        }
        // Frame times restart at zero together with the cube text clock.
        self.started = Instant::now();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) {
        match key {
            KeyCode::Escape => self.shutdown(event_loop),
            KeyCode::KeyR => self.redraw_text(),
            KeyCode::Space => {
                if let Some(cube_text) = &mut self.cube_text {
                    if cube_text.is_running() {
                        cube_text.stop();
                    } else {
                        cube_text.run();
                    }
                }
            }
            KeyCode::Delete | KeyCode::Backspace => {
                if let Some(cube_text) = &mut self.cube_text {
                    if let Err(e) = cube_text.clear_text() {
                        tracing::error!("failed to clear text: {e}");
                    }
                }
            }
            _ => {}
        }
    }

    fn render(&mut self) {
        let (Some(surface), Some(config), Some(cube_text)) =
            (&self.surface, &self.config, &mut self.cube_text)
        else {
            return;
        };
        if !cube_text.scheduler_mut().take() {
            return;
        }

        let output = match surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                surface.configure(cube_text.world().gpu().device(), config);
                cube_text.scheduler_mut().request_frame();
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let time = self.started.elapsed().as_secs_f32() * 1000.0;
        cube_text.world_mut().gpu_mut().set_frame_target(Some(view));
        let picked = cube_text.frame(time);
        cube_text.world_mut().gpu_mut().set_frame_target(None);
        output.present();

        match picked {
            Ok(picked) if picked != self.hovered => {
                if let Some((batch, key)) = picked {
                    tracing::info!(batch, key = key.0, "cube under pointer");
                }
                self.hovered = picked;
            }
            Ok(_) => {}
            Err(e) => tracing::error!("frame failed: {e}"),
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(cube_text) = &mut self.cube_text {
            cube_text.destroy();
        }
        event_loop.exit();
    }
}

fn logical_size(window: &Window, size: PhysicalSize<u32>) -> SizeConfig {
    let logical: LogicalSize<f32> = size.to_logical(window.scale_factor());
    SizeConfig::new(logical.width, logical.height)
}

fn resize_entry(window: &Window, size: PhysicalSize<u32>) -> ResizeEntry {
    ResizeEntry {
        device_pixel_size: Some((size.width, size.height)),
        logical_size: logical_size(window, size),
        device_pixel_ratio: window.scale_factor() as f32,
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init_gpu(event_loop) {
            tracing::error!("failed to start: {e:#}");
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::Resized(new_size) => {
                let (Some(window), Some(surface), Some(config), Some(cube_text)) = (
                    &self.window,
                    &self.surface,
                    &mut self.config,
                    &mut self.cube_text,
                ) else {
                    return;
                };
                config.width = new_size.width.max(1);
                config.height = new_size.height.max(1);
                surface.configure(cube_text.world().gpu().device(), config);
                if let Err(e) = cube_text.notify_resize(resize_entry(window, new_size)) {
                    tracing::error!("resize failed: {e}");
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let (Some(window), Some(cube_text)) = (&self.window, &mut self.cube_text) else {
                    return;
                };
                let logical = position.to_logical::<f32>(window.scale_factor());
                cube_text.set_pointer(logical.x, logical.y);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, key),
            WindowEvent::RedrawRequested => self.render(),
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("cubetext-desktop starting");

    let scene = match &cli.scene {
        Some(path) => Scene::load(path)
            .with_context(|| format!("failed to load scene {}", path.display()))?,
        None => Scene::default(),
    };
    let settings = Settings::resolve(&cli, scene);
    let font = resolve_font(cli.font.as_deref())?;
    tracing::info!(font = %font.display(), "default font");
    let rasterizer = FontRasterizer::from_file(&font)
        .with_context(|| format!("failed to load font {}", font.display()))?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = GpuApp::new(settings, rasterizer);
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let argv = std::iter::once("cubetext-desktop").chain(args.iter().copied());
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_without_flags_or_scene() {
        let settings = Settings::resolve(&parse(&[]), Scene::default());
        assert_eq!(settings.text, "cube");
        assert_eq!(settings.threshold, DEFAULT_THRESHOLD);
        assert_eq!(settings.cube_options, CubeOptions::default());
        assert_eq!(settings.plugins, scene::default_plugins());
        assert!(settings.family.is_none());
    }

    #[test]
    fn flags_override_scene() {
        let scene = Scene {
            text: Some("scene".into()),
            cube_options: Some(CubeOptions {
                margin: 5.0,
                size: 3.0,
                ..CubeOptions::default()
            }),
            threshold: Some(99),
            ..Scene::default()
        };
        let cli = parse(&["hello", "--margin", "1.5", "--align", "right", "--font-size", "40"]);
        let settings = Settings::resolve(&cli, scene);
        assert_eq!(settings.text, "hello");
        assert_eq!(settings.cube_options.margin, 1.5);
        assert_eq!(settings.cube_options.size, 3.0);
        assert_eq!(settings.cube_options.align, Align::Right);
        assert_eq!(settings.text_options.size, 40.0);
        assert_eq!(settings.threshold, 99);
    }

    #[test]
    fn family_is_named_after_its_file() {
        let cli = parse(&["--family", "/fonts/Inter-Bold.ttf"]);
        let family = Settings::resolve(&cli, Scene::default()).family.unwrap();
        assert_eq!(family.name, "Inter-Bold");
        assert_eq!(family.uri, PathBuf::from("/fonts/Inter-Bold.ttf"));
    }

    #[test]
    fn explicit_font_is_used_as_given() {
        let path = Path::new("/nowhere/font.ttf");
        assert_eq!(resolve_font(Some(path)).unwrap(), path);
    }
}
