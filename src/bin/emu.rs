use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use pixels::{Pixels, SurfaceTexture};
use rodio::{OutputStream, OutputStreamBuilder, Sink, Source, source::SquareWave};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use chip8_vm::emu::{DISPLAY_X, DISPLAY_Y, Display, Machine, RunConfig};

const TITLE: &str = "chip8-vm";

/// Render/input loop period (60Hz).
const FRAME_TIME: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// The rate at which pixels fade out (phosphor decay).
const DISPLAY_PHOSPHOR_RATE: f32 = 10.0;

/// Length of the alert played when the sound timer runs out.
const ALERT_DURATION: Duration = Duration::from_millis(150);

/// Physical keys for each keypad position, row by row:
/// 1234 / QWER / ASDF / ZXCV.
const KEY_MAP: [KeyCode; 16] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::KeyQ,
    KeyCode::KeyW,
    KeyCode::KeyE,
    KeyCode::KeyR,
    KeyCode::KeyA,
    KeyCode::KeyS,
    KeyCode::KeyD,
    KeyCode::KeyF,
    KeyCode::KeyZ,
    KeyCode::KeyX,
    KeyCode::KeyC,
    KeyCode::KeyV,
];

/// Keys currently held, by keypad position.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct HeldKeys([bool; 16]);

impl HeldKeys {
    /// Records a press or release. Keys outside the keypad map are ignored.
    fn update(&mut self, key: PhysicalKey, state: ElementState) {
        if let Some(pos) = KEY_MAP.iter().position(|&k| key == k) {
            self.0[pos] = state == ElementState::Pressed;
        }
    }

    /// Releases everything. Release events are not delivered to an unfocused window.
    fn release_all(&mut self) {
        self.0 = [false; 16];
    }

    fn state(&self) -> [bool; 16] {
        self.0
    }
}

struct App<'a> {
    machine: &'a Machine,
    scale: u32,

    pixels: Option<Pixels<'static>>,
    window: Option<Arc<Window>>,
    /// Stores the brightness of each pixel (0.0 to 1.0) to implement phosphor decay.
    display_float: Display<f32>,
    /// Pushed to the VM once per frame.
    keys: HeldKeys,

    /// Audio output stream (must be kept alive).
    _audio_stream: OutputStream,
    audio_sink: Sink,

    next_frame: Instant,
    last_frame_instant: Instant,

    /// Stores the result of the application to be returned from main.
    exit_result: anyhow::Result<()>,
}

impl<'a> App<'a> {
    fn new(machine: &'a Machine, scale: u32) -> anyhow::Result<Self> {
        let mut _audio_stream = OutputStreamBuilder::open_default_stream()
            .context("Failed to open audio output stream")?;
        _audio_stream.log_on_drop(false);
        let audio_sink = Sink::connect_new(_audio_stream.mixer());

        Ok(Self {
            machine,
            scale,
            pixels: None,
            window: None,
            display_float: [[0.0; DISPLAY_X]; DISPLAY_Y],
            keys: HeldKeys::default(),
            _audio_stream,
            audio_sink,
            next_frame: Instant::now(),
            last_frame_instant: Instant::now(),
            exit_result: Ok(()),
        })
    }

    fn set_title(&self) {
        let Some(window) = &self.window else {
            return;
        };
        if self.machine.is_ready() {
            window.set_title(TITLE);
        } else {
            window.set_title(&format!("{TITLE} - drop a ROM file to start"));
        }
    }

    fn load_rom(&mut self, path: &Path) {
        match self.machine.load_file(path) {
            Ok(()) => self.set_title(),
            Err(e) => {
                log::warn!("{e}");
                if let Some(window) = &self.window {
                    window.set_title(&format!("{TITLE} - {e}"));
                }
            }
        }
    }

    fn process_display(&mut self, dt: f32) -> anyhow::Result<()> {
        let screen = self.machine.framebuffer();
        let pixels = self.pixels.as_mut().context("Pixels surface missing")?;

        for (i, pxl) in pixels.frame_mut().chunks_exact_mut(4).enumerate() {
            let x = i % DISPLAY_X;
            let y = i / DISPLAY_X;

            // Lit pixels jump to full brightness, unlit ones fade out over time.
            self.display_float[y][x] = if screen[y][x] {
                1.0
            } else {
                (self.display_float[y][x] - DISPLAY_PHOSPHOR_RATE * dt).max(0.0)
            };

            let rgba = [0, 0xff, 0, (self.display_float[y][x] * 255.0) as u8];
            pxl.copy_from_slice(&rgba);
        }

        pixels.render().context("Pixels render error")
    }

    /// One tick of the render/input loop.
    fn frame(&mut self) -> anyhow::Result<()> {
        let now = Instant::now();
        let dt = (now - self.last_frame_instant).as_secs_f32();
        self.last_frame_instant = now;

        self.machine.set_keys(self.keys.state());

        if self.machine.take_sound_request() {
            self.audio_sink
                .append(SquareWave::new(440.0).take_duration(ALERT_DURATION).amplify(0.5));
        }

        self.process_display(dt)
    }

    fn try_resumed(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = {
            let size = LogicalSize::new(DISPLAY_X as u32 * self.scale, DISPLAY_Y as u32 * self.scale);
            let min_size = LogicalSize::new(DISPLAY_X as u32, DISPLAY_Y as u32);

            Arc::new(
                event_loop
                    .create_window(
                        Window::default_attributes()
                            .with_title(TITLE)
                            .with_inner_size(size)
                            .with_min_inner_size(min_size),
                    )
                    .context("Failed to create window")?,
            )
        };

        self.window = Some(window.clone());
        self.pixels = {
            let window_size = window.inner_size();
            let surface_texture =
                SurfaceTexture::new(window_size.width, window_size.height, window.clone());

            let pixels = Pixels::new(DISPLAY_X as u32, DISPLAY_Y as u32, surface_texture)
                .context("Failed to create pixels surface")?;
            Some(pixels)
        };
        self.set_title();

        // Avoid large dt on first frame
        self.last_frame_instant = Instant::now();
        self.next_frame = Instant::now();
        Ok(())
    }

    fn try_window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        event: WindowEvent,
    ) -> anyhow::Result<()> {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(pixels) = self.pixels.as_mut() {
                    pixels
                        .resize_surface(size.width, size.height)
                        .context("Failed to resize pixels surface")?;
                }
            }

            WindowEvent::DroppedFile(path) => {
                self.load_rom(&path);
            }

            WindowEvent::RedrawRequested => {
                self.frame()?;
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.machine.reset();
                self.display_float = [[0.0; DISPLAY_X]; DISPLAY_Y];
                self.set_title();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                self.keys.update(event.physical_key, event.state);
            }

            WindowEvent::Focused(false) => self.keys.release_all(),

            _ => (),
        }
        Ok(())
    }
}

impl ApplicationHandler for App<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.try_resumed(event_loop) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Err(e) = self.try_window_event(event_loop, event) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if !self.machine.is_running() {
            event_loop.exit();
            return;
        }

        let now = Instant::now();
        if now >= self.next_frame {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame = now + FRAME_TIME;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
    }
}

/// CHIP-8 virtual machine.
///
/// Keys 1-4, Q-R, A-F, Z-V map to the CHIP-8 keypad.
/// Escape resets the machine; drop a ROM file on the window to load it.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the CHIP-8 ROM file
    rom_path: Option<PathBuf>,

    /// Instructions executed per second
    #[arg(long, default_value_t = 500, value_parser = cpu_hz_in_range)]
    cpu_hz: u32,

    /// Window size as a multiple of the 64x32 screen
    #[arg(long, default_value_t = 10, value_parser = scale_in_range)]
    scale: u32,
}

fn cpu_hz_in_range(s: &str) -> Result<u32, String> {
    clap_num::number_range(s, 1, 5000)
}

fn scale_in_range(s: &str) -> Result<u32, String> {
    clap_num::number_range(s, 1, 40)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let machine = Machine::default();
    if let Some(path) = &args.rom_path {
        // A bad path is not fatal: the window opens and waits for a dropped ROM.
        if let Err(e) = machine.load_file(path) {
            log::warn!("{e}");
        }
    }

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let config = RunConfig {
        cpu_hz: args.cpu_hz,
        ..RunConfig::default()
    };

    machine.run(config, |machine| -> anyhow::Result<()> {
        let mut app = App::new(machine, args.scale).context("Failed to initialize application")?;
        event_loop
            .run_app(&mut app)
            .context("Error occurred during event loop execution")?;

        // Return the result captured during the event loop
        app.exit_result
    })?;

    match machine.take_fault() {
        Some(fault) => Err(anyhow::Error::new(fault).context("CHIP-8 execution halted")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_keys_follow_press_and_release() {
        let mut keys = HeldKeys::default();
        keys.update(PhysicalKey::Code(KeyCode::KeyQ), ElementState::Pressed);
        keys.update(PhysicalKey::Code(KeyCode::KeyV), ElementState::Pressed);
        assert!(keys.state()[4]);
        assert!(keys.state()[15]);

        keys.update(PhysicalKey::Code(KeyCode::KeyQ), ElementState::Released);
        assert!(!keys.state()[4]);
        assert!(keys.state()[15]);
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let mut keys = HeldKeys::default();
        keys.update(PhysicalKey::Code(KeyCode::KeyP), ElementState::Pressed);
        assert_eq!(keys, HeldKeys::default());
    }

    #[test]
    fn focus_loss_releases_held_keys() {
        let mut keys = HeldKeys::default();
        keys.update(PhysicalKey::Code(KeyCode::Digit1), ElementState::Pressed);
        keys.update(PhysicalKey::Code(KeyCode::KeyS), ElementState::Pressed);

        keys.release_all();
        assert_eq!(keys.state(), [false; 16]);
    }
}
