//! Gesture classification boundary.
//!
//! The neural network runtime lives outside this crate; it is reached through
//! [`InferenceModel`]. This module owns what surrounds it: turning a camera
//! frame into the model's input tensor and turning the model's scores back
//! into a [`Gesture`].

use serde::{Deserialize, Serialize};

use crate::error::{PinguError, Result};
use crate::types::Gesture;

/// Anything that can map a frame to a gesture. `None` means "no confident
/// answer" and must leave the game untouched.
pub trait GestureClassifier: Send + Sync {
    fn classify(&self, frame: &Frame) -> Option<Gesture>;
}

/// The bundled model runtime: one forward pass, one score per class.
pub trait InferenceModel: Send + Sync {
    fn forward(&self, input: &Tensor) -> std::result::Result<Vec<f32>, String>;
}

/// Camera frame, ARGB_8888 packed one `u32` per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<u32>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Solid-colour frame, mostly useful in tests and demos.
    pub fn filled(width: u32, height: u32, argb: u32) -> Self {
        Self::new(width, height, vec![argb; (width as usize) * (height as usize)])
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PinguError::InvalidFrame {
                reason: format!("empty frame {}x{}", self.width, self.height),
            });
        }
        let expected = (self.width as usize) * (self.height as usize);
        if self.pixels.len() != expected {
            return Err(PinguError::InvalidFrame {
                reason: format!(
                    "expected {} pixels for {}x{}, got {}",
                    expected,
                    self.width,
                    self.height,
                    self.pixels.len()
                ),
            });
        }
        Ok(())
    }

    fn luminance_at(&self, x: usize, y: usize) -> f32 {
        let pixel = self.pixels[y * self.width as usize + x];
        let r = ((pixel >> 16) & 0xFF) as f32 / 255.0;
        let g = ((pixel >> 8) & 0xFF) as f32 / 255.0;
        let b = (pixel & 0xFF) as f32 / 255.0;
        0.299 * r + 0.587 * g + 0.114 * b
    }
}

/// Dense float tensor in NCHW layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

/// Preprocessing parameters. Must match what the model was exported with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub input_width: u32,
    pub input_height: u32,
    pub mean: f32,
    pub std: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            input_width: 48,
            input_height: 48,
            mean: 0.5,
            std: 0.5,
        }
    }
}

/// Resize → grayscale → normalize into a `[1, 1, H, W]` tensor.
///
/// Resizing samples luminance bilinearly with pixel centres aligned, so a
/// frame already at the target size passes through unchanged.
pub fn preprocess(frame: &Frame, config: &ClassifierConfig) -> Result<Tensor> {
    frame.validate()?;
    if config.input_width == 0 || config.input_height == 0 || config.std == 0.0 {
        return Err(PinguError::InvalidFrame {
            reason: format!(
                "unusable model input {}x{} (std {})",
                config.input_width, config.input_height, config.std
            ),
        });
    }

    let out_w = config.input_width as usize;
    let out_h = config.input_height as usize;
    let src_w = frame.width as usize;
    let src_h = frame.height as usize;
    let scale_x = src_w as f32 / out_w as f32;
    let scale_y = src_h as f32 / out_h as f32;

    let mut data = Vec::with_capacity(out_w * out_h);
    for oy in 0..out_h {
        let sy = ((oy as f32 + 0.5) * scale_y - 0.5).clamp(0.0, (src_h - 1) as f32);
        let y0 = sy.floor() as usize;
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = sy - y0 as f32;

        for ox in 0..out_w {
            let sx = ((ox as f32 + 0.5) * scale_x - 0.5).clamp(0.0, (src_w - 1) as f32);
            let x0 = sx.floor() as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = sx - x0 as f32;

            let top = lerp(frame.luminance_at(x0, y0), frame.luminance_at(x1, y0), fx);
            let bottom = lerp(frame.luminance_at(x0, y1), frame.luminance_at(x1, y1), fx);
            let gray = lerp(top, bottom, fy);

            data.push((gray - config.mean) / config.std);
        }
    }

    Ok(Tensor {
        shape: [1, 1, out_h, out_w],
        data,
    })
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Maps model scores to a gesture by argmax, in [`Gesture::ALL`] order.
///
/// Empty output, a class index past the known gestures, or a non-finite
/// score yield `None`.
pub fn gesture_from_scores(scores: &[f32]) -> Option<Gesture> {
    if scores.iter().any(|score| !score.is_finite()) {
        return None;
    }
    let (index, _) = scores
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))?;
    Gesture::ALL.get(index).copied()
}

/// Classifier backed by an [`InferenceModel`].
pub struct ModelClassifier<M> {
    model: M,
    config: ClassifierConfig,
}

impl<M: InferenceModel> ModelClassifier<M> {
    pub fn new(model: M, config: ClassifierConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }
}

impl<M: InferenceModel> GestureClassifier for ModelClassifier<M> {
    fn classify(&self, frame: &Frame) -> Option<Gesture> {
        let input = match preprocess(frame, &self.config) {
            Ok(input) => input,
            Err(err) => {
                tracing::error!(error = %err, "Frame preprocessing failed");
                return None;
            }
        };

        let scores = match self.model.forward(&input) {
            Ok(scores) => scores,
            Err(err) => {
                tracing::error!(error = %err, "Inference failed");
                return None;
            }
        };

        if scores.is_empty() {
            tracing::error!("Model returned no scores");
            return None;
        }

        let predicted = gesture_from_scores(&scores);
        tracing::debug!(predicted = ?predicted, "Frame classified");
        predicted
    }
}
