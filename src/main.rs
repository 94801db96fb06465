use anyhow::Context;
use clap::{Parser, ValueEnum};
use floorcaster::camera::{CameraPolicy, Controls, ManualControl, Stationary};
use floorcaster::config::{PolicyKind, Settings, TextureSource};
use floorcaster::display::{Display, InputEvent, RenderTarget};
use floorcaster::util::FpsCounter;
use floorcaster::{DepthFogFilter, Error, FrameCompositor};
use sdl2::keyboard::Keycode;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "floorcaster.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CameraArg {
    Stationary,
    Spin,
    Walk,
    Manual,
    Remote,
}

#[derive(Parser)]
#[command(name = "floorcaster", version, about = "Raycast an infinite tiled floor and ceiling")]
struct Cli {
    /// Settings file (default: floorcaster.json if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Texture atlas image, overrides the settings file
    #[arg(short, long)]
    texture: Option<PathBuf>,

    /// Rotating checkerboard without texture, decorations or fog
    #[arg(long)]
    checkerboard: bool,

    #[arg(short = 'W', long)]
    width: Option<u32>,

    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Window pixels per frame pixel
    #[arg(short, long)]
    scale: Option<u32>,

    #[arg(long, value_enum)]
    camera: Option<CameraArg>,

    #[arg(long)]
    no_vsync: bool,

    #[arg(long)]
    no_fog: bool,

    /// Render rows and fog on all cores
    #[arg(long)]
    parallel: bool,

    #[arg(long)]
    mqtt_host: Option<String>,

    #[arg(long)]
    mqtt_topic: Option<String>,

    /// Render this many frames without a window, then report timing
    #[arg(long, value_name = "FRAMES")]
    headless: Option<u64>,

    /// Write the resolved settings to a file and exit
    #[arg(long, value_name = "PATH")]
    save_config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = if cli.checkerboard {
        Settings::checkerboard()
    } else if let Some(path) = &cli.config {
        Settings::load(path).with_context(|| format!("loading {}", path.display()))?
    } else {
        match Settings::load(DEFAULT_CONFIG) {
            Ok(settings) => {
                tracing::info!("settings loaded from {}", DEFAULT_CONFIG);
                settings
            }
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("no {} found, using built-in defaults", DEFAULT_CONFIG);
                Settings::default()
            }
            Err(e) => return Err(e).context(format!("loading {}", DEFAULT_CONFIG)),
        }
    };

    if let Some(path) = &cli.texture {
        settings.texture = TextureSource::File { path: path.clone() };
    }
    if let Some(width) = cli.width {
        settings.width = width;
    }
    if let Some(height) = cli.height {
        settings.height = height;
    }
    if let Some(scale) = cli.scale {
        settings.scale = scale;
    }
    if let Some(camera) = cli.camera {
        settings.camera.policy = match camera {
            CameraArg::Stationary => PolicyKind::Stationary,
            CameraArg::Spin => PolicyKind::Spin { turn_rate: 0.01 },
            CameraArg::Walk => PolicyKind::Walk {
                speed: 0.1,
                turn_rate: 0.002,
                bob: 0.15,
            },
            CameraArg::Manual => PolicyKind::Manual,
            CameraArg::Remote => PolicyKind::Remote,
        };
    }
    if cli.no_vsync {
        settings.vsync = false;
    }
    if cli.no_fog {
        settings.fog.enabled = false;
    }
    if cli.parallel {
        settings.renderer.parallel = true;
    }
    if let Some(host) = &cli.mqtt_host {
        settings.mqtt.host.clone_from(host);
    }
    if let Some(topic) = &cli.mqtt_topic {
        settings.mqtt.topic.clone_from(topic);
    }

    settings.validate()?;
    Ok(settings)
}

fn run_headless(compositor: &mut FrameCompositor, frames: u64) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut fps = FpsCounter::new(frames.clamp(1, 10_000) as usize);
    for _ in 0..frames {
        compositor.render_frame()?;
        fps.tick();
    }
    let elapsed = start.elapsed();
    let stats = fps.stats();
    tracing::info!(
        frames,
        elapsed_ms = elapsed.as_millis() as u64,
        avg_fps = stats.avg_fps,
        avg_ms = stats.avg_ms,
        "headless run finished"
    );
    Ok(())
}

/// Map a key to the movement flag it drives
fn control_flag(controls: &mut Controls, key: Keycode) -> Option<&mut bool> {
    Some(match key {
        Keycode::W | Keycode::Up => &mut controls.forward,
        Keycode::S | Keycode::Down => &mut controls.back,
        Keycode::A => &mut controls.strafe_left,
        Keycode::D => &mut controls.strafe_right,
        Keycode::Left => &mut controls.turn_left,
        Keycode::Right => &mut controls.turn_right,
        Keycode::PageUp | Keycode::E => &mut controls.rise,
        Keycode::PageDown | Keycode::Q => &mut controls.sink,
        _ => return None,
    })
}

/// Keyboard camera driven from the main loop. While active the compositor
/// runs `Stationary` and the configured policy is parked until Tab restores
/// it. A configured `manual` policy has nothing to restore, so it stays on.
struct KeyboardCamera {
    manual: ManualControl,
    parked: Option<Box<dyn CameraPolicy>>,
    locked: bool,
}

impl KeyboardCamera {
    fn new(settings: &Settings, compositor: &mut FrameCompositor) -> Self {
        let locked = settings.camera.policy == PolicyKind::Manual;
        if locked {
            compositor.set_policy(Box::new(Stationary));
        }
        Self {
            manual: settings.manual_control(),
            parked: None,
            locked,
        }
    }

    fn is_active(&self) -> bool {
        self.locked || self.parked.is_some()
    }

    fn toggle(&mut self, compositor: &mut FrameCompositor) {
        if self.locked {
            tracing::info!("keyboard camera is the configured policy, nothing to switch to");
            return;
        }
        self.parked = match self.parked.take() {
            Some(policy) => {
                compositor.set_policy(policy);
                self.manual.controls = Controls::default();
                None
            }
            None => Some(compositor.set_policy(Box::new(Stationary))),
        };
        tracing::info!(manual = self.is_active(), "keyboard camera toggled");
    }

    fn set_key(&mut self, key: Keycode, pressed: bool) {
        if let Some(flag) = control_flag(&mut self.manual.controls, key) {
            *flag = pressed;
        }
    }

    /// Move the camera for the coming frame
    fn drive(&mut self, compositor: &mut FrameCompositor) {
        if self.is_active() {
            let next = self.manual.update(compositor.frame() + 1, compositor.camera());
            compositor.set_camera(next);
        }
    }
}

fn run_windowed(settings: &Settings, compositor: &mut FrameCompositor) -> anyhow::Result<()> {
    let (mut display, texture_creator) = Display::with_options(
        "floorcaster",
        settings.width,
        settings.height,
        settings.scale,
        settings.vsync,
    )?;
    let mut target = RenderTarget::with_size(&texture_creator, settings.width, settings.height)?;

    let mut fps_counter = FpsCounter::new(60);
    let mut last_report = Instant::now();

    let mut keyboard = KeyboardCamera::new(settings, compositor);

    println!("Controls:");
    println!("  Tab              - Toggle keyboard camera");
    println!("  W/S, Up/Down     - Walk");
    println!("  A/D              - Strafe");
    println!("  Left/Right       - Turn");
    println!("  E/Q, PgUp/PgDn   - Raise/lower eye");
    println!("  F                - Toggle fog");
    println!("  P                - Toggle parallel rendering");
    println!("  Escape           - Quit");

    'main: loop {
        fps_counter.tick();

        for event in display.poll_events() {
            match event {
                InputEvent::Quit | InputEvent::KeyDown(Keycode::Escape) => break 'main,
                InputEvent::KeyDown(Keycode::Tab) => keyboard.toggle(compositor),
                InputEvent::KeyDown(Keycode::F) => {
                    let fog = match compositor.fog() {
                        Some(_) => None,
                        None => Some(DepthFogFilter {
                            density: settings.fog.density,
                            parallel: compositor.renderer().is_parallel(),
                        }),
                    };
                    tracing::info!(enabled = fog.is_some(), "fog toggled");
                    compositor.set_fog(fog);
                }
                InputEvent::KeyDown(Keycode::P) => {
                    let parallel = !compositor.renderer().is_parallel();
                    compositor.renderer_mut().set_parallel(parallel);
                    if let Some(fog) = compositor.fog().copied() {
                        compositor.set_fog(Some(DepthFogFilter { parallel, ..fog }));
                    }
                    tracing::info!(parallel, "parallel rendering toggled");
                }
                InputEvent::KeyDown(key) => keyboard.set_key(key, true),
                InputEvent::KeyUp(key) => keyboard.set_key(key, false),
            }
        }

        keyboard.drive(compositor);

        let frame = compositor.render_frame()?;
        display.present(&mut target, frame)?;

        if last_report.elapsed() >= Duration::from_secs(1) {
            last_report = Instant::now();
            let stats = fps_counter.stats();
            let camera = compositor.camera();
            let mode = if keyboard.is_active() {
                "manual"
            } else {
                compositor.policy_name()
            };
            display.set_title(&format!(
                "floorcaster | {} | {:.0} fps",
                mode, stats.avg_fps
            ));
            tracing::debug!(
                avg_fps = stats.avg_fps,
                min_fps = stats.min_fps,
                max_fps = stats.max_fps,
                avg_ms = stats.avg_ms,
                x = camera.x,
                y = camera.y,
                z = camera.z,
                yaw = camera.yaw,
                "frame stats"
            );
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Err(e) = run(&cli) {
        tracing::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = load_settings(cli)?;

    if let Some(path) = &cli.save_config {
        settings
            .save(path)
            .with_context(|| format!("saving {}", path.display()))?;
        tracing::info!("settings saved to {}", path.display());
        return Ok(());
    }

    let mut compositor = settings
        .build_compositor()
        .context("building the renderer")?;

    tracing::info!(
        "floorcaster {} at {}x{}",
        env!("CARGO_PKG_VERSION"),
        settings.width,
        settings.height
    );

    match cli.headless {
        Some(frames) => run_headless(&mut compositor, frames),
        None => run_windowed(&settings, &mut compositor),
    }
}
