// Terminal display - shows QR bitmaps with ratatui half blocks
//
// Each cell is a `▀` carrying two module rows: the top module as foreground
// colour and the bottom one as background, both taken from the display
// settings. On a real terminal the widget lives on the alternate screen and
// reads q / Esc / Ctrl+C as its close button.

use super::surfaces::{ButtonRouter, DisplayLayout, WidgetButtons};
use crate::models::{Color, DisplaySettings};
use crate::services::QrBitmap;
use crate::session::{DisplayFactory, DisplaySurface, SessionError, Widget, WidgetEvent};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal, TerminalOptions, Viewport,
    backend::{Backend, CrosstermBackend},
    buffer::Buffer,
    layout::Rect,
    style::Color as CellColor,
    widgets::{Clear, Widget as RenderWidget},
};
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tokio::sync::broadcast;

const KEY_POLL: Duration = Duration::from_millis(50);

fn cell_color(color: Color) -> CellColor {
    let [r, g, b, _] = color.to_rgba();
    CellColor::Rgb(r, g, b)
}

/// Half-block view of a QR bitmap with a light border `quiet_zone` modules wide
pub struct QrView<'a> {
    bitmap: &'a QrBitmap,
    quiet_zone: u32,
    dark: CellColor,
    light: CellColor,
}

impl<'a> QrView<'a> {
    pub fn new(bitmap: &'a QrBitmap, quiet_zone: u32, dark: Color, light: Color) -> Self {
        Self {
            bitmap,
            quiet_zone,
            dark: cell_color(dark),
            light: cell_color(light),
        }
    }

    /// Modules per side, quiet zone included
    fn side(&self) -> u32 {
        self.bitmap
            .size
            .saturating_add(self.quiet_zone.saturating_mul(2))
    }

    /// Cells needed to draw the whole symbol, as (columns, rows)
    pub fn cells(&self) -> (u32, u32) {
        let side = self.side();
        (side, side.div_ceil(2))
    }

    fn module_color(&self, x: u32, y: u32) -> CellColor {
        let zone = self.quiet_zone;
        let dark = x >= zone && y >= zone && self.bitmap.is_dark(x - zone, y - zone);
        if dark { self.dark } else { self.light }
    }
}

impl RenderWidget for &QrView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let side = self.side();
        let (columns, rows) = self.cells();
        let width = columns.min(u32::from(area.width)) as u16;
        let height = rows.min(u32::from(area.height)) as u16;

        // Centered; a symbol larger than the area is clipped
        let x_offset = area.x + (area.width - width) / 2;
        let y_offset = area.y + (area.height - height) / 2;

        for ty in 0..height {
            for tx in 0..width {
                let x = u32::from(tx);
                let top = u32::from(ty) * 2;
                let top_color = self.module_color(x, top);
                // Odd side: the missing bottom row counts as background
                let bottom_color = if top + 1 < side {
                    self.module_color(x, top + 1)
                } else {
                    self.light
                };

                if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                    cell.set_char('▀').set_fg(top_color).set_bg(bottom_color);
                }
            }
        }
    }
}

/// Widget event for a key press, if the key closes the display
pub fn key_action(key: &KeyEvent) -> Option<WidgetEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(WidgetEvent::ClosePressed),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(WidgetEvent::ClosePressed)
        }
        _ => None,
    }
}

/// Background thread forwarding close keys to a widget's event channel
struct KeyReader {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl KeyReader {
    fn spawn(events: broadcast::Sender<WidgetEvent>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                let key = match event::poll(KEY_POLL) {
                    Ok(true) => event::read(),
                    Ok(false) => continue,
                    Err(e) => Err(e),
                };
                match key {
                    Ok(Event::Key(key)) => {
                        if let Some(action) = key_action(&key) {
                            let _ = events.send(action);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("Stopped reading keys: {}", e);
                        break;
                    }
                }
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// How a display takes over the terminal while visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenMode {
    /// Draw into the backend as is; nothing else is touched
    Inline,
    /// Raw mode plus the alternate screen of stdout, with close keys read from stdin
    Alternate,
}

/// Display widget drawing through a ratatui terminal
pub struct TerminalDisplay<B: Backend> {
    terminal: Terminal<B>,
    mode: ScreenMode,
    events: broadcast::Sender<WidgetEvent>,
    close_keys: bool,
    keys: Option<KeyReader>,
    bitmap: Option<QrBitmap>,
    quiet_zone: u32,
    dark: Color,
    light: Color,
    visible: bool,
    entered: bool,
}

impl<B: Backend> TerminalDisplay<B> {
    pub fn has_texture(&self) -> bool {
        self.bitmap.is_some()
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }

    fn draw(&mut self) {
        let Some(bitmap) = &self.bitmap else {
            return;
        };
        let view = QrView::new(bitmap, self.quiet_zone, self.dark, self.light);
        let drawn = self.terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(&view, area);
        });
        if let Err(e) = drawn {
            tracing::warn!("Failed to draw QR code: {}", e);
        }
    }

    /// Overwrite every drawn cell with a blank one
    fn blank(&mut self) {
        let drawn = self.terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(Clear, area);
        });
        if let Err(e) = drawn {
            tracing::warn!("Failed to clear QR code: {}", e);
        }
    }

    fn enter(&mut self) {
        if self.mode == ScreenMode::Alternate && !self.entered {
            let entered = enable_raw_mode().and_then(|()| execute!(io::stdout(), EnterAlternateScreen));
            match entered {
                Ok(()) => self.entered = true,
                Err(e) => {
                    tracing::warn!("Failed to enter the alternate screen: {}", e);
                    let _ = disable_raw_mode();
                }
            }
            if self.close_keys {
                self.keys = Some(KeyReader::spawn(self.events.clone()));
            }
        }
        // Forget what was drawn before so the next draw repaints every cell
        if let Err(e) = self.terminal.clear() {
            tracing::warn!("Failed to clear terminal: {}", e);
        }
    }

    fn leave(&mut self) {
        if let Some(keys) = self.keys.take() {
            keys.stop();
        }
        self.blank();
        if self.entered {
            self.entered = false;
            let left = execute!(io::stdout(), LeaveAlternateScreen).and_then(|()| disable_raw_mode());
            if let Err(e) = left {
                tracing::warn!("Failed to restore the terminal: {}", e);
            }
            if let Err(e) = self.terminal.show_cursor() {
                tracing::warn!("Failed to show cursor: {}", e);
            }
        }
    }
}

impl<B: Backend> Widget for TerminalDisplay<B> {
    fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }

    fn destroy(&mut self) {
        if self.visible || self.entered {
            self.leave();
        }
        self.visible = false;
        self.bitmap = None;
    }
}

impl<B: Backend> DisplaySurface for TerminalDisplay<B> {
    fn set_texture(&mut self, bitmap: Option<&QrBitmap>) {
        self.bitmap = bitmap.cloned();
        if !self.visible {
            return;
        }
        if self.bitmap.is_some() {
            self.draw();
        } else {
            self.blank();
        }
    }

    fn show(&mut self) {
        if self.visible {
            return;
        }
        self.visible = true;
        self.enter();
        self.draw();
    }

    fn hide(&mut self) {
        if !self.visible {
            return;
        }
        self.visible = false;
        self.leave();
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

/// Creates [`TerminalDisplay`]s, one backend per widget
pub struct TerminalDisplayFactory<B: Backend> {
    make_backend: Box<dyn Fn() -> B>,
    viewport: Viewport,
    mode: ScreenMode,
    layout: DisplayLayout,
    router: ButtonRouter,
}

impl TerminalDisplayFactory<CrosstermBackend<io::Stdout>> {
    /// Full-screen displays on stdout's alternate screen
    pub fn stdout() -> Self {
        Self {
            make_backend: Box::new(|| CrosstermBackend::new(io::stdout())),
            viewport: Viewport::Fullscreen,
            mode: ScreenMode::Alternate,
            layout: DisplayLayout::standard(),
            router: ButtonRouter::default(),
        }
    }
}

impl<W: Write> TerminalDisplayFactory<CrosstermBackend<W>> {
    /// Displays drawing into any writer, over an area of `columns` by `rows` cells
    pub fn with_writer(make_writer: impl Fn() -> W + 'static, columns: u16, rows: u16) -> Self {
        Self::new(
            move || CrosstermBackend::new(make_writer()),
            Rect::new(0, 0, columns, rows),
        )
    }
}

impl<B: Backend> TerminalDisplayFactory<B> {
    /// Inline displays over a fixed `area` of each backend
    pub fn new(make_backend: impl Fn() -> B + 'static, area: Rect) -> Self {
        Self {
            make_backend: Box::new(make_backend),
            viewport: Viewport::Fixed(area),
            mode: ScreenMode::Inline,
            layout: DisplayLayout::standard(),
            router: ButtonRouter::default(),
        }
    }

    pub fn with_layout(mut self, layout: DisplayLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn mode(&self) -> ScreenMode {
        self.mode
    }

    /// Buttons of the newest widget this factory creates
    pub fn buttons(&self) -> WidgetButtons {
        WidgetButtons::for_display(self.router.clone(), &self.layout)
    }
}

impl<B: Backend> DisplayFactory for TerminalDisplayFactory<B> {
    type Surface = TerminalDisplay<B>;

    fn instantiate(&self, settings: &DisplaySettings) -> Result<Self::Surface, SessionError> {
        self.layout.validate()?;
        let options = TerminalOptions {
            viewport: self.viewport.clone(),
        };
        let terminal = Terminal::with_options((self.make_backend)(), options)
            .map_err(|e| SessionError::Configuration(format!("terminal unavailable: {e}")))?;

        Ok(TerminalDisplay {
            terminal,
            mode: self.mode,
            events: self.router.attach(),
            close_keys: self.layout.close_button.is_some(),
            keys: None,
            bitmap: None,
            quiet_zone: settings.quiet_zone,
            dark: settings.dark_color,
            light: settings.light_color,
            visible: false,
            entered: false,
        })
    }
}
