use stratum_engine::canvas::Canvas;
use stratum_engine::coords::{Angle, PixelPoint, PixelRect};
use stratum_engine::core::{App, AppControl, FrameCtx};
use stratum_engine::device::GpuInit;
use stratum_engine::gpu::scope::ScopeBlend;
use stratum_engine::gpu::Backend;
use stratum_engine::logging::{init_logging, LoggingConfig};
use stratum_engine::paint::{Brush, Color, Pen, PenStyle};
use stratum_engine::region::{draw_regions, FillMode, FillPolicy, RegionLook, RegionSettings, RegionShape};
use stratum_engine::text::{Font, FontSystem, TextCache};
use stratum_engine::window::{Runtime, RuntimeConfig};

use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{Key, NamedKey};

const GRID_STEP: i32 = 64;

/// Airspace overlay viewer: a few overlapping regions over a dashed grid,
/// with one aircraft circling the map centre.
struct AirspaceDemo {
    text: TextCache,
    font: Option<Font>,
    settings: RegionSettings,
}

impl AirspaceDemo {
    fn new() -> Self {
        let mut fonts = FontSystem::new();
        let font = match fonts.load_font(&load_font()) {
            Ok(id) => Some(Font::new(id, 14)),
            Err(err) => {
                log::warn!("no label font: {err}");
                None
            }
        };
        Self { text: TextCache::new(fonts), font, settings: RegionSettings::default() }
    }

    /// Cycles None -> All -> Padding.
    fn next_fill_mode(&mut self) {
        self.settings.fill_mode = match self.settings.fill_mode {
            FillMode::None => FillMode::All,
            FillMode::All => FillMode::Padding,
            FillMode::Padding => FillMode::None,
        };
        log::info!("fill mode {:?}", self.settings.fill_mode);
    }
}

impl App for AirspaceDemo {
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return AppControl::Continue;
        };
        if event.state != ElementState::Pressed {
            return AppControl::Continue;
        }
        match &event.logical_key {
            Key::Named(NamedKey::Escape) => return AppControl::Exit,
            Key::Character(c) if c.as_str() == "f" => self.next_fill_mode(),
            Key::Character(c) if c.as_str() == "o" => {
                self.settings.black_outline = !self.settings.black_outline;
            }
            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let t = ctx.time.elapsed.as_secs_f64();
        let settings = self.settings;
        let font = self.font;

        ctx.draw(Some(&mut self.text), |canvas| {
            let center = canvas.rect().center();

            canvas.clear(Color::rgb(18, 24, 32));
            draw_grid(canvas);
            draw_airspace(canvas, center, settings);
            draw_range_rings(canvas, center, t);
            draw_aircraft(canvas, center, t);
            if let Some(font) = font {
                draw_labels(canvas, font, settings);
            }
        })
    }
}

fn draw_grid<B: Backend>(canvas: &mut Canvas<'_, B>) {
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    canvas.select_pen(Pen::new(1, Color::DARK_GRAY).with_style(PenStyle::Dash2));
    for x in (0..w).step_by(GRID_STEP as usize) {
        canvas.draw_line(PixelPoint::new(x, 0), PixelPoint::new(x, h));
    }
    for y in (0..h).step_by(GRID_STEP as usize) {
        canvas.draw_line(PixelPoint::new(0, y), PixelPoint::new(w, y));
    }
}

fn draw_airspace<B: Backend>(canvas: &mut Canvas<'_, B>, c: PixelPoint, settings: RegionSettings) {
    let at = |dx: i32, dy: i32| PixelPoint::new(c.x + dx, c.y + dy);

    let shapes = [
        RegionShape::circle(at(-90, -40), 140)
            .with_fill(FillPolicy::IfSelected, Color::RED)
            .with_outline(2, Color::RED),
        RegionShape::circle(at(80, 30), 110)
            .with_fill(FillPolicy::Always, Color::BLUE)
            .with_outline(1, Color::BLUE),
        RegionShape::polygon(vec![at(-220, 90), at(-20, 160), at(60, 260), at(-160, 240)])
            .with_fill(FillPolicy::IfSelected, Color::YELLOW)
            .with_outline(2, Color::YELLOW)
            .with_selected(true),
        RegionShape::polygon(vec![at(120, -220), at(260, -180), at(240, -60), at(100, -90)])
            .with_fill(FillPolicy::IfSelected, Color::GREEN)
            .with_outline(1, Color::GREEN),
    ];

    let bounds = canvas.rect();
    draw_regions(canvas, settings, RegionLook::default(), &shapes, |shape| {
        shape.bounds().is_some_and(|b| b.intersect(bounds).is_some())
    });
}

fn draw_range_rings<B: Backend>(canvas: &mut Canvas<'_, B>, c: PixelPoint, t: f64) {
    canvas.select_pen(Pen::new(1, Color::GRAY));
    canvas.select_hollow_brush();
    for r in [60, 120, 180] {
        canvas.draw_circle(c, r);
    }

    // Sweep sector that follows the clock.
    let start = Angle::degrees((t * 30.0) % 360.0);
    let end = Angle::degrees(start.as_degrees() + 40.0);
    {
        let mut blend = ScopeBlend::alpha(&mut *canvas);
        blend.select_null_pen();
        blend.select_brush(Brush::solid(Color::GREEN.with_alpha(60)));
        blend.draw_annulus(c, 20, 180, start, end);
    }

    canvas.select_pen(Pen::new(1, Color::WHITE).with_style(PenStyle::Dash1));
    canvas.select_hollow_brush();
    canvas.draw_keyhole(c, 12, 48, Angle::degrees(-20.0), Angle::degrees(20.0));
}

fn draw_aircraft<B: Backend>(canvas: &mut Canvas<'_, B>, c: PixelPoint, t: f64) {
    let bearing = (t * 20.0) % 360.0;
    let (s, co) = bearing.to_radians().sin_cos();
    let pos = PixelPoint::new(c.x + (150.0 * s) as i32, c.y - (150.0 * co) as i32);

    canvas.select_black_pen();
    canvas.select_brush(Brush::solid(Color::WHITE));
    // Heading is tangential to the orbit.
    canvas.with_rotate_shift(pos, Angle::degrees(bearing + 90.0), 1.0, |canvas| {
        canvas.draw_polygon(&[
            PixelPoint::new(0, -12),
            PixelPoint::new(8, 10),
            PixelPoint::new(0, 5),
            PixelPoint::new(-8, 10),
        ]);
    });
}

fn draw_labels<B: Backend>(canvas: &mut Canvas<'_, B>, font: Font, settings: RegionSettings) {
    canvas.select_font(font);
    canvas.set_text_color(Color::WHITE);
    canvas.set_background_transparent();

    let status = format!(
        "fill {:?}  black outline {}  [f] fill  [o] outline  [esc] quit",
        settings.fill_mode,
        if settings.black_outline { "on" } else { "off" },
    );
    let h = canvas.calc_text_height(&status) as i32;
    let w = canvas.width() as i32;

    let bar = PixelRect::new(0, 0, w, h + 8);
    ScopeBlend::alpha(&mut *canvas).draw_filled_rectangle(bar, Color::BLACK.with_alpha(160));
    canvas.draw_clipped_text(PixelPoint::new(6, 4), bar, &status);
}

fn load_font() -> Vec<u8> {
    [
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    ]
    .iter()
    .find_map(|p| std::fs::read(p).ok())
    .unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "Stratum Airspace".to_string(),
        initial_size: LogicalSize::new(1024.0, 768.0),
    };
    Runtime::run(config, GpuInit::default(), AirspaceDemo::new())
}
