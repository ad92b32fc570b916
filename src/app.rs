use crate::palette::PALETTE_LEN;
use crate::presets::PresetId;
use crate::reconciler::Edit;
use crate::session::Session;
use std::time::Instant;

/// Focused slider on the Values tab
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Focus {
    #[default]
    Number,
    Size,
    Speed,
}

impl Focus {
    pub fn next(&self) -> Focus {
        match self {
            Focus::Number => Focus::Size,
            Focus::Size => Focus::Speed,
            Focus::Speed => Focus::Number,
        }
    }

    pub fn prev(&self) -> Focus {
        match self {
            Focus::Number => Focus::Speed,
            Focus::Size => Focus::Number,
            Focus::Speed => Focus::Size,
        }
    }

    /// Step applied by one arrow press
    fn step(&self) -> u32 {
        match self {
            Focus::Number => 5,
            Focus::Size => 1,
            Focus::Speed => 10,
        }
    }
}

/// Main application state: the session plus what only the terminal view needs
pub struct App {
    pub session: Session,
    pub focus: Focus,
    pub color_cursor: usize,
    pub preset_cursor: usize,
    /// Preset row currently held down with the mouse
    pub pressed: Option<usize>,
    pub fullscreen_mode: bool,
    pub show_help: bool,
    pub help_scroll: u16,
}

impl App {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            focus: Focus::default(),
            color_cursor: 0,
            preset_cursor: 0,
            pressed: None,
            fullscreen_mode: false,
            show_help: false,
            help_scroll: 0,
        }
    }

    /// Advance timers, remote results and the animation
    pub fn tick(&mut self, now: Instant) -> bool {
        let changed = self.session.pump(now);
        self.clamp_preset_cursor();
        changed
    }

    pub fn next_tab(&mut self, now: Instant) {
        let tab = self.session.tab().next();
        self.session.select_tab(tab, now);
    }

    pub fn prev_tab(&mut self, now: Instant) {
        let tab = self.session.tab().prev();
        self.session.select_tab(tab, now);
    }

    // === Colors tab ===

    pub fn move_color_cursor(&mut self, delta: isize) {
        let len = PALETTE_LEN as isize;
        self.color_cursor = (self.color_cursor as isize + delta).rem_euclid(len) as usize;
    }

    pub fn toggle_color(&mut self, index: usize, now: Instant) {
        self.color_cursor = index;
        self.session.edit(Edit::ToggleColor(index), now);
    }

    // === Values tab ===

    pub fn next_focus(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn prev_focus(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Nudge the focused slider; the configuration clamps to its range
    pub fn adjust_focused(&mut self, up: bool, now: Instant) {
        let config = self.session.config();
        let step = |value: u32| {
            if up {
                value.saturating_add(self.focus.step())
            } else {
                value.saturating_sub(self.focus.step())
            }
        };
        let edit = match self.focus {
            Focus::Number => Edit::NumSparkles(step(config.num_sparkles)),
            Focus::Size => Edit::SparkleSize(step(config.sparkle_size)),
            Focus::Speed => Edit::Speed(step(config.speed)),
        };
        self.session.edit(edit, now);
    }

    // === Presets tab ===

    pub fn move_preset_cursor(&mut self, delta: isize) {
        let len = self.session.presets().len();
        if len == 0 {
            self.preset_cursor = 0;
            return;
        }
        let last = len as isize - 1;
        self.preset_cursor = (self.preset_cursor as isize + delta).clamp(0, last) as usize;
    }

    fn clamp_preset_cursor(&mut self) {
        let len = self.session.presets().len();
        self.preset_cursor = self.preset_cursor.min(len.saturating_sub(1));
    }

    fn preset_id(&self, index: usize) -> Option<PresetId> {
        self.session.presets().get(index).map(|p| p.id)
    }

    pub fn select_preset_at_cursor(&mut self, now: Instant) {
        if let Some(id) = self.preset_id(self.preset_cursor) {
            self.session.select_preset(id, now);
        }
    }

    /// Keyboard shortcut for the long press
    pub fn delete_preset_at_cursor(&mut self, now: Instant) {
        if let Some(id) = self.preset_id(self.preset_cursor) {
            self.session.long_press(id, now);
        }
    }

    /// Mouse went down on a preset row
    pub fn press_preset(&mut self, index: usize, now: Instant) {
        if let Some(id) = self.preset_id(index) {
            self.preset_cursor = index;
            self.pressed = Some(index);
            self.session.press_start(id, now);
        }
    }

    /// Mouse moved while held; leaving the pressed row cancels the gesture
    pub fn drag_to(&mut self, index: Option<usize>) {
        if self.pressed.is_some() && index != self.pressed {
            self.pressed = None;
            self.session.press_cancel();
        }
    }

    pub fn release(&mut self, now: Instant) {
        if self.pressed.take().is_some() {
            self.session.press_end(now);
        }
    }

    pub fn resolve_confirmation(&mut self, confirmed: bool, now: Instant) {
        self.session.resolve_confirmation(confirmed, now);
        self.clamp_preset_cursor();
    }

    pub fn press_primary(&mut self, now: Instant) {
        self.session.press_primary(now);
    }

    // === View ===

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen_mode = !self.fullscreen_mode;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        if self.show_help {
            self.help_scroll = 0;
        }
    }

    pub fn scroll_help_up(&mut self) {
        self.help_scroll = self.help_scroll.saturating_sub(1);
    }

    pub fn scroll_help_down(&mut self, max_scroll: u16) {
        self.help_scroll = (self.help_scroll + 1).min(max_scroll);
    }
}
