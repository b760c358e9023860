//! Terminal mosaic display.
//!
//! Renders the latest frame of every stream as a grid of tiles using
//! Unicode half-block characters, two vertical pixels per cell.

use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
    },
};
use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
    Terminal,
};
use tracing::debug;

use crate::error::Result;
use crate::pipeline::RenderFrames;
use crate::traits::{DisplaySurface, Frame, FrameImage};

const WAITING: &str = "Waiting for frames...";

/// Time one `show` may take, input handling included (about 60 Hz).
const FRAME_BUDGET: Duration = Duration::from_millis(16);

/// What is left of the frame budget after `elapsed`.
const fn remaining_budget(elapsed: Duration) -> Duration {
    FRAME_BUDGET.saturating_sub(elapsed)
}

/// Switch `out` to the alternate screen, then run `build`. If either step
/// fails, `out` is switched back before the error is returned.
fn enter_screen<W, T, B>(out: &mut W, title: &str, build: B) -> io::Result<T>
where
    W: Write,
    B: FnOnce() -> io::Result<T>,
{
    let result = execute!(out, EnterAlternateScreen, SetTitle(title), Hide).and_then(|()| build());
    if result.is_err() {
        leave_screen(out);
    }
    result
}

fn leave_screen<W: Write>(out: &mut W) {
    let _ = execute!(out, LeaveAlternateScreen, Show);
}

/// Largest rectangle inside `area` with a `width:height` pixel aspect,
/// centered. Each cell is one pixel wide and two pixels tall.
#[must_use]
pub fn fit_canvas(area: Rect, width: u32, height: u32) -> Rect {
    if width == 0 || height == 0 || area.width == 0 || area.height == 0 {
        return Rect::new(area.x, area.y, 0, 0);
    }
    let (w, h) = (u64::from(width), u64::from(height));
    let avail_w = u64::from(area.width);
    let avail_h = u64::from(area.height) * 2;

    let (cols, rows) = if avail_w * h <= avail_h * w {
        (avail_w, avail_w * h / w / 2)
    } else {
        (avail_h * w / h, u64::from(area.height))
    };
    let cols = u16::try_from(cols).unwrap_or(area.width).min(area.width);
    let rows = u16::try_from(rows).unwrap_or(area.height).min(area.height);

    Rect::new(
        area.x + (area.width - cols) / 2,
        area.y + (area.height - rows) / 2,
        cols,
        rows,
    )
}

/// Split `area` into `count` tiles, row-major, on a grid with
/// `ceil(sqrt(count))` columns.
#[must_use]
pub fn mosaic_grid(count: usize, area: Rect) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let mut cols = 1;
    while cols * cols < count {
        cols += 1;
    }
    let rows = count.div_ceil(cols);

    let cols_u16 = u16::try_from(cols).unwrap_or(u16::MAX);
    let rows_u16 = u16::try_from(rows).unwrap_or(u16::MAX);
    let tile_w = area.width / cols_u16;
    let tile_h = area.height / rows_u16;

    (0..count)
        .map(|i| {
            let col = u16::try_from(i % cols).unwrap_or(0);
            let row = u16::try_from(i / cols).unwrap_or(0);
            Rect::new(
                area.x + col * tile_w,
                area.y + row * tile_h,
                tile_w,
                tile_h,
            )
        })
        .collect()
}

/// One captioned tile of the mosaic.
#[derive(Debug)]
pub struct Tile<'a> {
    /// Caption drawn on the tile's first row.
    pub caption: String,
    /// Image drawn below the caption.
    pub image: FrameImage<'a>,
}

/// Widget drawing all tiles inside a canvas of the window's aspect ratio.
#[derive(Debug)]
pub struct MosaicView<'a> {
    tiles: Vec<Tile<'a>>,
    width: u32,
    height: u32,
}

impl<'a> MosaicView<'a> {
    /// Create a view over `tiles` on a `width` x `height` pixel canvas.
    #[must_use]
    pub const fn new(tiles: Vec<Tile<'a>>, width: u32, height: u32) -> Self {
        Self {
            tiles,
            width,
            height,
        }
    }

    /// Build one tile per stream, in ascending stream id order.
    pub fn from_frames<F: Frame>(
        frames: &'a RenderFrames<F>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let mut tiles = Vec::with_capacity(frames.len());
        for (id, frame) in frames {
            let profile = frame.profile()?;
            tiles.push(Tile {
                caption: format!("{id} {} {}", profile.stream, profile.format),
                image: frame.image()?,
            });
        }
        Ok(Self::new(tiles, width, height))
    }

    /// Tiles in drawing order.
    pub fn tiles(&self) -> &[Tile<'a>] {
        &self.tiles
    }
}

impl Widget for &MosaicView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.tiles.is_empty() {
            let width = u16::try_from(WAITING.len()).unwrap_or(u16::MAX);
            let x = area.x + area.width.saturating_sub(width) / 2;
            let y = area.y + area.height / 2;
            if area.height > 0 {
                buf.set_stringn(x, y, WAITING, usize::from(area.width), Style::default());
            }
            return;
        }

        let canvas = fit_canvas(area, self.width, self.height);
        let cells = mosaic_grid(self.tiles.len(), canvas);
        for (tile, cell_area) in self.tiles.iter().zip(cells) {
            render_tile(tile, cell_area, buf);
        }
    }
}

fn render_tile(tile: &Tile<'_>, area: Rect, buf: &mut Buffer) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    buf.set_stringn(
        area.x,
        area.y,
        &tile.caption,
        usize::from(area.width),
        Style::default().fg(Color::White).bg(Color::DarkGray),
    );
    let image_area = Rect::new(area.x, area.y + 1, area.width, area.height - 1);
    render_image(&tile.image, image_area, buf);
}

/// Draw `image` scaled to fit `area`, keeping its aspect ratio.
pub fn render_image(image: &FrameImage<'_>, area: Rect, buf: &mut Buffer) {
    let fit = fit_canvas(area, image.width, image.height);
    if fit.width == 0 || fit.height == 0 {
        return;
    }
    let cols = u32::from(fit.width);
    let rows_px = u32::from(fit.height) * 2;

    for ty in 0..fit.height {
        for tx in 0..fit.width {
            let src_x = u32::from(tx) * image.width / cols;
            let src_top = u32::from(ty) * 2 * image.height / rows_px;
            let src_bottom = (u32::from(ty) * 2 + 1) * image.height / rows_px;

            if let Some(cell) = buf.cell_mut((fit.x + tx, fit.y + ty)) {
                cell.set_char('▀');
                cell.set_fg(sample(image, src_x, src_top));
                cell.set_bg(sample(image, src_x, src_bottom));
            }
        }
    }
}

fn sample(image: &FrameImage<'_>, x: u32, y: u32) -> Color {
    image
        .pixel_at(x, y)
        .map_or(Color::Black, |(r, g, b)| Color::Rgb(r, g, b))
}

/// Whether a key press should close the window: `q`, `Esc` or `Ctrl+C`.
#[must_use]
pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Display surface drawing into the terminal's alternate screen.
///
/// Raw mode and the alternate screen are restored on drop.
pub struct TerminalWindow {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    width: u32,
    height: u32,
    open: bool,
}

impl TerminalWindow {
    /// Take over the terminal and title it `title`. `width` x `height` is
    /// the pixel canvas the mosaic is fitted to.
    pub fn open(title: &str, width: u32, height: u32) -> Result<Self> {
        enable_raw_mode()?;
        let terminal = enter_screen(&mut io::stdout(), title, || {
            Terminal::new(CrosstermBackend::new(io::stdout()))
        })
        .inspect_err(|_| {
            let _ = disable_raw_mode();
        })?;
        debug!(title, width, height, "Opened terminal window");

        Ok(Self {
            terminal,
            width,
            height,
            open: true,
        })
    }

    /// Handle input until the frame budget started at `started` runs out.
    fn process_events(&mut self, started: Instant) -> Result<()> {
        while event::poll(remaining_budget(started.elapsed()))? {
            if let Event::Key(key) = event::read()? {
                if is_quit_key(&key) {
                    self.open = false;
                    break;
                }
            }
        }
        Ok(())
    }
}

impl Drop for TerminalWindow {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        leave_screen(self.terminal.backend_mut());
    }
}

impl<F: Frame> DisplaySurface<F> for TerminalWindow {
    fn is_open(&self) -> bool {
        self.open
    }

    fn show(&mut self, frames: &RenderFrames<F>) -> Result<()> {
        let started = Instant::now();
        let view = MosaicView::from_frames(frames, self.width, self.height)?;
        self.terminal.draw(|f| {
            let area = f.area();
            f.render_widget(&view, area);
        })?;
        self.process_events(started)
    }
}
