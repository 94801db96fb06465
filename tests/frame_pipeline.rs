use floorcaster::camera::Stationary;
use floorcaster::config::{PolicyKind, TextureSource};
use floorcaster::display::pack_rgb;
use floorcaster::render::{RendererOptions, HORIZON_DEPTH};
use floorcaster::{
    AtlasTile, CameraState, DecorationRegion, DepthFogFilter, FrameCompositor, OffsetAnimation,
    PerspectiveRenderer, Settings, Surface, TextureAtlas,
};
use std::sync::Arc;

/// Left tile solid red, right tile solid blue
fn red_blue_atlas() -> Arc<TextureAtlas> {
    let pixels = (0..16)
        .flat_map(|_| (0..32).map(|x| if x < 16 { 0xFF0000 } else { 0x0000FF }))
        .collect();
    Arc::new(TextureAtlas::from_pixels(32, 16, pixels).unwrap())
}

#[test]
fn undecorated_floor_uses_left_tile() {
    let mut renderer = PerspectiveRenderer::new(8, 8, red_blue_atlas()).unwrap();
    renderer.render(&CameraState::default());

    let pixels = renderer.pixels();
    for y in 0..8 {
        for x in 0..8 {
            let color = pixels.get_pixel(x, y).unwrap();
            if y == 4 {
                assert_eq!(color, 0, "horizon row is blank");
            } else {
                assert_eq!(color, 0xFF0000);
            }
        }
    }
    assert_eq!(renderer.depth().depth_at(0, 4), Some(HORIZON_DEPTH));
    assert!(renderer.depth().depths().iter().all(|d| d.is_finite()));
}

#[test]
fn decorated_region_switches_tile_on_its_surface_only() {
    // 1x4 column with fov 4: row 3 looks at the floor 24 units ahead,
    // row 1 at the ceiling 24 units ahead, both inside region (0, 1)
    let options = RendererOptions {
        decorations: vec![DecorationRegion::new(0, 1, Surface::Floor)
            .with_atlas_tile(AtlasTile::new(1, 0))],
        ..RendererOptions::default()
    };
    let mut renderer = PerspectiveRenderer::with_options(1, 4, red_blue_atlas(), &options).unwrap();
    renderer.render(&CameraState::new(0.0, 0.0, 0.0, 0.0));

    assert_eq!(renderer.depth().depth_at(0, 3), Some(24.0));
    assert_eq!(renderer.pixels().get_pixel(0, 3), Some(0x0000FF));
    assert_eq!(renderer.pixels().get_pixel(0, 1), Some(0xFF0000));
}

#[test]
fn fogged_frame_through_compositor() {
    let renderer = PerspectiveRenderer::new(8, 8, red_blue_atlas()).unwrap();
    let mut compositor = FrameCompositor::new(
        8,
        8,
        renderer,
        CameraState::default(),
        Box::new(Stationary),
    )
    .with_fog(Some(DepthFogFilter::new(2.0)));

    let output = compositor.render_frame().unwrap();
    // Bottom row: yd = 3/8, zd = 9 / 0.375 = 24, brightness 207
    let expected = pack_rgb((255.0 / 255.0 * 207.0) as u8, 0, 0);
    assert_eq!(output.get_pixel(0, 7), Some(expected));
    // Row next to the horizon: zd = 72, brightness 111
    assert_eq!(output.get_pixel(0, 5), Some(pack_rgb(111, 0, 0)));
    assert_eq!(output.get_pixel(0, 4), Some(0));
}

#[test]
fn settings_drive_a_full_compositor() {
    let mut settings = Settings::default();
    settings.width = 48;
    settings.height = 32;
    settings.renderer.parallel = true;
    settings.camera.policy = PolicyKind::Walk {
        speed: 0.5,
        turn_rate: 0.01,
        bob: 0.1,
    };
    settings.offset = OffsetAnimation::Fixed { x: 0, y: 0 };

    let mut compositor = settings.build_compositor().unwrap();
    for _ in 0..5 {
        compositor.render_frame().unwrap();
    }
    assert_eq!(compositor.frame(), 5);
    assert_eq!(compositor.policy_name(), "walk");
    assert!(compositor.camera().y > 0.0);
    assert_eq!(compositor.output().width(), 48);
}

#[test]
fn checkerboard_preset_renders_without_fog() {
    let settings = Settings::checkerboard();
    assert_eq!(settings.texture, TextureSource::Checkerboard);

    let mut compositor = settings.build_compositor().unwrap();
    let first = compositor.render_frame().unwrap().clone();
    let second = compositor.render_frame().unwrap();
    // Spinning camera changes the view every frame
    assert_ne!(&first, second);
}
