//! Frame annotation overlays
//!
//! Draws the tracking rectangle and the per-frame counter onto output
//! frames. Annotation is purely visual: the frame loop only annotates
//! buffers that are already past the tracker.

mod font;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use visiotrack_common::BoundingBox;

/// Overlay color for the box and the counter
pub const TRACK_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const BOX_THICKNESS: i32 = 3;
const LABEL_X: u32 = 10;
const LABEL_Y: u32 = 10;
const LABEL_SCALE: u32 = 3;

/// Draw the tracking box and the 1-indexed frame counter onto a frame.
///
/// The box must already be clamped to the frame; the label is clipped to
/// the frame bounds.
pub fn annotate_frame(frame: &mut RgbImage, bbox: &BoundingBox, frame_number: u64) {
    draw_tracking_box(frame, bbox);
    font::draw_label(
        frame,
        &format!("Frame: {frame_number}"),
        LABEL_X,
        LABEL_Y,
        LABEL_SCALE,
        TRACK_COLOR,
    );
}

/// Draw a hollow rectangle around the tracked object.
pub fn draw_tracking_box(frame: &mut RgbImage, bbox: &BoundingBox) {
    // Thickness grows inward so the outline stays inside a clamped box
    for inset in 0..BOX_THICKNESS {
        let w = bbox.w - 2 * inset;
        let h = bbox.h - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        draw_hollow_rect_mut(
            frame,
            Rect::at(bbox.x + inset, bbox.y + inset).of_size(w as u32, h as u32),
            TRACK_COLOR,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_outline_is_drawn() {
        let mut frame = RgbImage::new(100, 100);
        let bbox = BoundingBox::new(20, 20, 40, 40);
        draw_tracking_box(&mut frame, &bbox);

        // Top-left corner of the outline
        assert_eq!(*frame.get_pixel(20, 20), TRACK_COLOR);
        // Inset rows of the 3px border
        assert_eq!(*frame.get_pixel(30, 21), TRACK_COLOR);
        assert_eq!(*frame.get_pixel(30, 22), TRACK_COLOR);
        // Interior stays untouched
        assert_eq!(*frame.get_pixel(40, 40), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_box_at_frame_edge_does_not_panic() {
        let mut frame = RgbImage::new(100, 100);
        let bbox = BoundingBox::new(97, 97, 3, 3);
        draw_tracking_box(&mut frame, &bbox);
        assert_eq!(*frame.get_pixel(97, 97), TRACK_COLOR);
    }

    #[test]
    fn test_degenerate_box_draws_only_outer_ring() {
        let mut frame = RgbImage::new(100, 100);
        let bbox = BoundingBox::new(10, 10, 2, 2);
        draw_tracking_box(&mut frame, &bbox);
        assert_eq!(*frame.get_pixel(10, 10), TRACK_COLOR);
        assert_eq!(*frame.get_pixel(11, 11), TRACK_COLOR);
    }

    #[test]
    fn test_annotate_writes_counter_label() {
        let mut frame = RgbImage::new(320, 240);
        let bbox = BoundingBox::new(100, 100, 50, 50);
        annotate_frame(&mut frame, &bbox, 1);

        // Some label pixels land in the top-left HUD area
        let mut lit = 0usize;
        for y in 0..40 {
            for x in 0..200 {
                if *frame.get_pixel(x, y) == TRACK_COLOR {
                    lit += 1;
                }
            }
        }
        assert!(lit > 0, "expected counter label pixels in the HUD area");
    }

    #[test]
    fn test_annotate_on_tiny_frame_does_not_panic() {
        // Label would extend past the frame; it must clip, not panic
        let mut frame = RgbImage::new(16, 8);
        let bbox = BoundingBox::new(0, 0, 4, 4);
        annotate_frame(&mut frame, &bbox, 123_456);
    }
}
