mod pixel_buffer;

pub use pixel_buffer::{pack_rgb, unpack_rgb, PixelBuffer, TRANSPARENT};

use crate::error::{Error, Result};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, Texture, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::EventPump;

pub const DEFAULT_WIDTH: u32 = 320;
pub const DEFAULT_HEIGHT: u32 = 240;

/// SDL2 window that presents packed RGB frames
pub struct Display {
    canvas: Canvas<Window>,
    event_pump: EventPump,
    width: u32,
    height: u32,
}

/// Streaming texture the frame buffer is uploaded into
pub struct RenderTarget<'a> {
    texture: Texture<'a>,
    width: u32,
    height: u32,
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    Quit,
    KeyDown(Keycode),
    KeyUp(Keycode),
}

impl Display {
    /// Open a window of `width * scale` by `height * scale`; frames of
    /// `width x height` are stretched to fill it.
    pub fn with_options(
        title: &str,
        width: u32,
        height: u32,
        scale: u32,
        vsync: bool,
    ) -> Result<(Self, TextureCreator<WindowContext>)> {
        let sdl_context = sdl2::init().map_err(Error::Display)?;
        let video_subsystem = sdl_context.video().map_err(Error::Display)?;

        let scale = scale.max(1);
        let window = video_subsystem
            .window(title, width * scale, height * scale)
            .position_centered()
            .build()
            .map_err(|e| Error::Display(e.to_string()))?;

        let mut canvas_builder = window.into_canvas().accelerated();
        if vsync {
            canvas_builder = canvas_builder.present_vsync();
        }
        let canvas = canvas_builder
            .build()
            .map_err(|e| Error::Display(e.to_string()))?;

        let texture_creator = canvas.texture_creator();
        let event_pump = sdl_context.event_pump().map_err(Error::Display)?;

        Ok((
            Self {
                canvas,
                event_pump,
                width,
                height,
            },
            texture_creator,
        ))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_title(&mut self, title: &str) {
        if let Err(e) = self.canvas.window_mut().set_title(title) {
            tracing::warn!("failed to set window title: {}", e);
        }
    }

    pub fn present(&mut self, target: &mut RenderTarget, buffer: &PixelBuffer) -> Result<()> {
        if buffer.width() != target.width || buffer.height() != target.height {
            return Err(Error::Display(format!(
                "frame is {}x{} but render target is {}x{}",
                buffer.width(),
                buffer.height(),
                target.width,
                target.height
            )));
        }

        target
            .texture
            .update(None, buffer.as_bytes(), (buffer.width() * 4) as usize)
            .map_err(|e| Error::Display(e.to_string()))?;

        self.canvas
            .copy(&target.texture, None, None)
            .map_err(Error::Display)?;
        self.canvas.present();
        Ok(())
    }

    pub fn poll_events(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::new();

        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => events.push(InputEvent::Quit),
                Event::KeyDown {
                    keycode: Some(k),
                    repeat: false,
                    ..
                } => events.push(InputEvent::KeyDown(k)),
                Event::KeyUp {
                    keycode: Some(k), ..
                } => events.push(InputEvent::KeyUp(k)),
                _ => {}
            }
        }

        events
    }
}

impl<'a> RenderTarget<'a> {
    /// `RGB888` is 32 bits per pixel with the top byte unused, which is the
    /// same layout as `PixelBuffer`.
    pub fn with_size(
        texture_creator: &'a TextureCreator<WindowContext>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let texture = texture_creator
            .create_texture_streaming(PixelFormatEnum::RGB888, width, height)
            .map_err(|e| Error::Display(e.to_string()))?;
        Ok(Self {
            texture,
            width,
            height,
        })
    }
}
