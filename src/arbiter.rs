//! Input arbitration
//!
//! Keeps one authoritative intent vector. Whichever source wrote last owns
//! it until another source writes; there is no time-based decay. Handing
//! ownership to a new source discards the previous source's held state
//! (held keys, an in-progress drag).

use tracing::debug;

use crate::input::gamepad::{analog::radial_clamp, process_stick, StickSample};
use crate::input::{Direction, HeldKeys, InputSource, Intent, Point, PointerGeometry};

#[derive(Debug, Clone)]
pub struct InputArbiter {
    intent: Intent,
    active: InputSource,
    keys: HeldKeys,
    dragging: bool,
    geometry: PointerGeometry,
    deadzone: f32,
}

impl InputArbiter {
    pub fn new(geometry: PointerGeometry, deadzone: f32) -> Self {
        Self {
            intent: Intent::ZERO,
            active: InputSource::None,
            keys: HeldKeys::new(),
            dragging: false,
            geometry,
            deadzone,
        }
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn active(&self) -> InputSource {
        self.active
    }

    pub fn keys(&self) -> &HeldKeys {
        &self.keys
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Replace pointer geometry and stick deadzone
    pub fn set_tuning(&mut self, geometry: PointerGeometry, deadzone: f32) {
        self.geometry = geometry;
        self.deadzone = deadzone;
    }

    /// Hand ownership to `source`, dropping the previous owner's held state
    fn claim(&mut self, source: InputSource) {
        if self.active == source {
            return;
        }

        match self.active {
            InputSource::Keyboard => self.keys.clear(),
            InputSource::Pointer => self.dragging = false,
            InputSource::Gamepad | InputSource::None => {},
        }

        debug!("Input source {} -> {}", self.active, source);
        self.active = source;
    }

    pub fn key_down(&mut self, direction: Direction) -> Intent {
        self.claim(InputSource::Keyboard);
        self.keys.press(direction);
        self.intent = self.keys.intent();
        self.intent
    }

    pub fn key_up(&mut self, direction: Direction) -> Intent {
        self.claim(InputSource::Keyboard);
        self.keys.release(direction);
        self.intent = self.keys.intent();
        self.intent
    }

    pub fn pointer_down(&mut self, point: Point) -> Intent {
        self.claim(InputSource::Pointer);
        self.dragging = true;
        self.intent = self.geometry.intent_at(point);
        self.intent
    }

    /// Drag update; ignored unless a drag owned by the pointer is in progress
    pub fn pointer_move(&mut self, point: Point) -> Option<Intent> {
        if !self.dragging || self.active != InputSource::Pointer {
            return None;
        }
        self.intent = self.geometry.intent_at(point);
        Some(self.intent)
    }

    /// End a drag: intent returns to exactly zero and nobody owns it
    pub fn pointer_up(&mut self) -> Option<Intent> {
        if !self.dragging {
            return None;
        }
        self.dragging = false;
        self.intent = Intent::ZERO;
        self.active = InputSource::None;
        Some(self.intent)
    }

    /// One gamepad poll
    ///
    /// The gamepad takes over when its raw reading is non-zero, checked
    /// before the deadzone: a stick nudged inside the deadzone still claims
    /// the intent (and writes zero). A controller reporting exact zero never
    /// takes over. Once it owns the intent it keeps writing every tick, at
    /// rest included, until another source writes.
    pub fn gamepad_tick(&mut self, sample: StickSample) -> Option<Intent> {
        let touched = sample.x != 0.0 || sample.y != 0.0;
        if !touched && self.active != InputSource::Gamepad {
            return None;
        }

        let (x, y) = process_stick(sample.x, sample.y, self.deadzone);
        let (x, y) = radial_clamp(x, y);

        self.claim(InputSource::Gamepad);
        self.intent = Intent::new(x, y);
        Some(self.intent)
    }

    /// The driving controller went away: stop if it owned the intent
    pub fn gamepad_lost(&mut self) -> Option<Intent> {
        if self.active != InputSource::Gamepad {
            return None;
        }
        self.intent = Intent::ZERO;
        self.active = InputSource::None;
        Some(self.intent)
    }
}
