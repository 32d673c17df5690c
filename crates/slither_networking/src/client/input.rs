//! Local input latch.
//!
//! Pointer, touch and key handlers write here at whatever rate they fire;
//! the frame path reads the latched angle once per rendered frame.

use crate::config::Viewport;

/// Input device events fed to the session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    /// Mouse or touch position, in canvas pixels.
    PointerMoved {
        /// Horizontal pixel.
        x: f64,
        /// Vertical pixel.
        y: f64,
    },
    /// Boost button, mouse button or space bar changed.
    Boost(bool),
    /// The canvas was resized.
    Resized(Viewport),
}

/// Latest steering intent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputState {
    angle: f64,
    boosting: bool,
    viewport: Viewport,
}

impl InputState {
    /// Creates a latch facing +x, not boosting.
    #[must_use]
    pub const fn new(viewport: Viewport) -> Self {
        Self {
            angle: 0.0,
            boosting: false,
            viewport,
        }
    }

    /// Latched angle in radians.
    #[inline]
    #[must_use]
    pub const fn angle(&self) -> f64 {
        self.angle
    }

    /// Latched boost state.
    #[inline]
    #[must_use]
    pub const fn boosting(&self) -> bool {
        self.boosting
    }

    /// Canvas used to find the screen center.
    #[inline]
    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Latches the direction from the canvas center to the pointer.
    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        self.angle = (y - self.viewport.half_height()).atan2(x - self.viewport.half_width());
    }

    /// Updates the canvas size.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Latches the boost state. Returns true only if it changed.
    pub fn set_boost(&mut self, boosting: bool) -> bool {
        if self.boosting == boosting {
            return false;
        }
        self.boosting = boosting;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_pointer_angle_from_center() {
        let mut input = InputState::new(Viewport::new(800.0, 600.0));

        input.pointer_moved(500.0, 300.0);
        assert_eq!(input.angle(), 0.0);

        input.pointer_moved(400.0, 400.0);
        assert!((input.angle() - FRAC_PI_2).abs() < 1e-12);

        input.pointer_moved(300.0, 300.0);
        assert!((input.angle() - PI).abs() < 1e-12);
    }

    #[test]
    fn test_resize_moves_center() {
        let mut input = InputState::new(Viewport::new(800.0, 600.0));
        input.resize(Viewport::new(1000.0, 600.0));
        input.pointer_moved(500.0, 200.0);
        assert!((input.angle() + FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_boost_edges() {
        let mut input = InputState::new(Viewport::default());
        assert!(!input.set_boost(false));
        assert!(input.set_boost(true));
        assert!(!input.set_boost(true));
        assert!(!input.set_boost(true));
        assert!(input.set_boost(false));
        assert!(!input.boosting());
    }
}
