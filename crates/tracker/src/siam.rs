//! Template/search siamese tracker internals
//!
//! The network takes a template patch cropped around the initial box and a
//! search patch cropped around the previous prediction, both square and
//! normalized, and outputs the tracked box in search-patch coordinates
//! (cx, cy, w, h, each in [0, 1]) plus a confidence score.

use image::RgbImage;
use ndarray::{Array, Array4};
use ort::{session::Session, value::TensorRef};
use tracing::debug;
use visiotrack_common::{BoundingBox, PipelineError, Result};

/// Siamese tracker configuration
#[derive(Debug, Clone)]
pub struct SiamTrackerConfig {
    /// Template patch side in pixels
    pub template_size: u32,
    /// Search patch side in pixels
    pub search_size: u32,
    /// Context padding around the target, as a fraction of `w + h`
    pub context_amount: f32,
}

impl Default for SiamTrackerConfig {
    fn default() -> Self {
        Self {
            template_size: 127,
            search_size: 255,
            context_amount: 0.5,
        }
    }
}

/// Per-run tracking state, created by `init` and discarded with the run.
pub(crate) struct TrackState {
    template: Array4<f32>,
    center: (f32, f32),
    size: (f32, f32),
}

pub(crate) fn init_state(
    config: &SiamTrackerConfig,
    frame: &RgbImage,
    bbox: BoundingBox,
) -> TrackState {
    let center = bbox.center();
    let size = (bbox.w as f32, bbox.h as f32);
    let window = context_window(size, config.context_amount);
    let template = crop_patch(frame, center, window, config.template_size);
    TrackState {
        template,
        center,
        size,
    }
}

pub(crate) fn update_state(
    session: &mut Session,
    config: &SiamTrackerConfig,
    state: &mut TrackState,
    frame: &RgbImage,
) -> Result<BoundingBox> {
    // The search region covers the template context scaled up to the
    // search resolution, centered on the previous prediction
    let scale = config.search_size as f32 / config.template_size as f32;
    let region = context_window(state.size, config.context_amount) * scale;
    let search = crop_patch(frame, state.center, region, config.search_size);

    let template_tensor = TensorRef::from_array_view(state.template.view())
        .map_err(|e| PipelineError::Tracker(format!("Failed to build template tensor: {e}")))?;
    let search_tensor = TensorRef::from_array_view(search.view())
        .map_err(|e| PipelineError::Tracker(format!("Failed to build search tensor: {e}")))?;

    let outputs = session
        .run(ort::inputs![template_tensor, search_tensor])
        .map_err(|e| PipelineError::Tracker(format!("Inference failed: {e}")))?;

    let (shape, data) = outputs[0]
        .try_extract_tensor::<f32>()
        .map_err(|e| PipelineError::Tracker(format!("Failed to extract output tensor: {e}")))?;

    let dims = shape.as_ref();
    let len: i64 = dims.iter().product();
    if len < 4 {
        return Err(PipelineError::Tracker(format!(
            "Unexpected box output shape: {dims:?}"
        )));
    }

    // Normalized (cx, cy, w, h) within the search patch
    let (cx, cy, w, h) = (data[0], data[1], data[2], data[3]);

    if outputs.len() > 1 {
        if let Ok((_, score)) = outputs[1].try_extract_tensor::<f32>() {
            if let Some(confidence) = score.first() {
                debug!("Tracker confidence: {:.3}", confidence);
            }
        }
    }

    // Map the prediction back to frame coordinates
    let region_x0 = state.center.0 - region / 2.0;
    let region_y0 = state.center.1 - region / 2.0;
    let center = (region_x0 + cx * region, region_y0 + cy * region);
    let size = ((w * region).max(1.0), (h * region).max(1.0));

    state.center = center;
    state.size = size;

    Ok(BoundingBox::new(
        (center.0 - size.0 / 2.0).round() as i32,
        (center.1 - size.1 / 2.0).round() as i32,
        size.0.round().max(1.0) as i32,
        size.1.round().max(1.0) as i32,
    ))
}

/// Square context window side for a target of the given size.
fn context_window(size: (f32, f32), context_amount: f32) -> f32 {
    let (w, h) = size;
    let pad = context_amount * (w + h);
    ((w + pad) * (h + pad)).sqrt()
}

/// Crop a square window centered on `center`, pad out-of-frame pixels with
/// black, resize to `out_size` and normalize to CHW [0, 1].
fn crop_patch(frame: &RgbImage, center: (f32, f32), window: f32, out_size: u32) -> Array4<f32> {
    let side = window.round().max(2.0) as i64;
    let x0 = (center.0 - window / 2.0).round() as i64;
    let y0 = (center.1 - window / 2.0).round() as i64;

    let width = i64::from(frame.width());
    let height = i64::from(frame.height());

    let mut patch = RgbImage::new(side as u32, side as u32);
    for y in 0..side {
        let sy = y0 + y;
        if sy < 0 || sy >= height {
            continue;
        }
        for x in 0..side {
            let sx = x0 + x;
            if sx < 0 || sx >= width {
                continue;
            }
            patch.put_pixel(x as u32, y as u32, *frame.get_pixel(sx as u32, sy as u32));
        }
    }

    let resized = image::imageops::resize(
        &patch,
        out_size,
        out_size,
        image::imageops::FilterType::Triangle,
    );

    let size = out_size as usize;
    let mut array = Array::zeros((1, 3, size, size));
    for y in 0..size {
        for x in 0..size {
            let pixel = resized.get_pixel(x as u32, y as u32);
            array[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
            array[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
            array[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
        }
    }

    array
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_window_exceeds_target() {
        let window = context_window((50.0, 50.0), 0.5);
        assert!(window > 50.0);
        // sqrt((50 + 50) * (50 + 50)) = 100
        assert!((window - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_context_window_of_flat_target_is_finite() {
        let window = context_window((80.0, 10.0), 0.5);
        assert!(window.is_finite());
        assert!(window > 10.0);
    }

    #[test]
    fn test_crop_patch_shape_and_range() {
        let frame = RgbImage::from_pixel(64, 64, image::Rgb([255, 128, 0]));
        let patch = crop_patch(&frame, (32.0, 32.0), 40.0, 127);
        assert_eq!(patch.shape(), &[1, 3, 127, 127]);
        assert!((patch[[0, 0, 63, 63]] - 1.0).abs() < 1e-3);
        assert!((patch[[0, 2, 63, 63]]).abs() < 1e-3);
    }

    #[test]
    fn test_crop_patch_pads_outside_with_black() {
        let frame = RgbImage::from_pixel(32, 32, image::Rgb([255, 255, 255]));
        // Window centered at the frame corner: three quarters fall outside
        let patch = crop_patch(&frame, (0.0, 0.0), 32.0, 64);
        assert!((patch[[0, 0, 0, 0]]).abs() < 1e-3, "top-left is padding");
        assert!(
            (patch[[0, 0, 48, 48]] - 1.0).abs() < 1e-2,
            "bottom-right is frame content"
        );
    }

    #[test]
    fn test_init_state_records_geometry() {
        let frame = RgbImage::new(128, 128);
        let config = SiamTrackerConfig::default();
        let state = init_state(&config, &frame, BoundingBox::new(40, 40, 20, 30));
        assert_eq!(state.center, (50.0, 55.0));
        assert_eq!(state.size, (20.0, 30.0));
        assert_eq!(state.template.shape(), &[1, 3, 127, 127]);
    }
}
