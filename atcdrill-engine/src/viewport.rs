//! Display-space inputs: viewport dimensions and the pixel-per-NM scale.
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    BOTTOM_BUFFER_PX, DEFAULT_PIXELS_PER_NM, SCALE_REFERENCE_SPEED_KT, SCALE_WINDOW_MINUTES,
    SECONDS_PER_HOUR, TOP_BUFFER_PX,
};
use crate::kinematics::Position;

#[derive(Debug, Error, PartialEq)]
pub enum ViewportError {
    #[error("viewport {field} must be a positive number of pixels (got {value})")]
    Dimension { field: &'static str, value: f64 },
    #[error("pixel scale must be a positive number of pixels per NM (got {0})")]
    Scale(f64),
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Size of the radar viewport in pixels at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// # Errors
    ///
    /// Returns `ViewportError::Dimension` for a zero, negative or non-finite side.
    pub fn validate(&self) -> Result<(), ViewportError> {
        for (field, value) in [("width", self.width), ("height", self.height)] {
            if !positive(value) {
                return Err(ViewportError::Dimension { field, value });
            }
        }
        Ok(())
    }

    /// Height of the band between the top and bottom control buffers.
    #[must_use]
    pub fn play_height(&self) -> f64 {
        self.height - TOP_BUFFER_PX - BOTTOM_BUFFER_PX
    }

    #[must_use]
    pub const fn play_top(&self) -> f64 {
        TOP_BUFFER_PX
    }

    #[must_use]
    pub fn play_bottom(&self) -> f64 {
        self.height - BOTTOM_BUFFER_PX
    }

    /// Visual centre of the usable play area.
    #[must_use]
    pub fn play_center(&self) -> Position {
        Position::new(self.width / 2.0, TOP_BUFFER_PX + self.play_height() / 2.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1_280.0, 900.0)
    }
}

/// Pixels per nautical mile. Recomputed by the display layer on zoom.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PixelScale(f64);

impl PixelScale {
    #[must_use]
    pub const fn new(pixels_per_nm: f64) -> Self {
        Self(pixels_per_nm)
    }

    #[must_use]
    pub const fn pixels_per_nm(self) -> f64 {
        self.0
    }

    /// # Errors
    ///
    /// Returns `ViewportError::Scale` unless the scale is finite and positive.
    pub fn validate(self) -> Result<(), ViewportError> {
        if positive(self.0) {
            Ok(())
        } else {
            Err(ViewportError::Scale(self.0))
        }
    }

    #[must_use]
    pub fn knots_to_px_per_sec(self, knots: f64) -> f64 {
        knots / SECONDS_PER_HOUR * self.0
    }

    #[must_use]
    pub fn px_to_nm(self, pixels: f64) -> f64 {
        pixels / self.0
    }

    /// Draw a fresh scale for a new exercise: half the viewport width spans
    /// what a reference-speed aircraft covers in 4 to 9 minutes.
    pub fn sample<R: Rng + ?Sized>(viewport: &Viewport, rng: &mut R) -> Self {
        let (low, high) = SCALE_WINDOW_MINUTES;
        let minutes = low + rng.r#gen::<f64>() * (high - low);
        let target_nm = SCALE_REFERENCE_SPEED_KT * (minutes / 60.0);
        Self(viewport.width / 2.0 / target_nm)
    }
}

impl Default for PixelScale {
    fn default() -> Self {
        Self(DEFAULT_PIXELS_PER_NM)
    }
}
