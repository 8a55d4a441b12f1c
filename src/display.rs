use anyhow::Result;
use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Size},
    highgui, imgproc,
    prelude::*,
};
use rand::{rngs::ThreadRng, thread_rng, Rng};

use crate::{
    monitor::MonitorGeometry,
    target::{Orientation, Target},
};

/// Input poll timeout for one loop iteration, in milliseconds.
pub const POLL_INTERVAL_MS: i32 = 50;

// Cue circle shrink per rendered frame until the confirm-ready threshold.
const SHRINK_FACTOR: f64 = 0.9;

/// Decoded key press relevant to the session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Arrow(Orientation),
    Quit,
}

/// Decode a raw `wait_key` code. Arrow codes are the GTK backend values;
/// modifier bits above the low byte are masked off. Timeouts (-1) and
/// unrecognized keys yield `None`.
pub fn decode_key(raw: i32) -> Option<KeyEvent> {
    if raw < 0 {
        return None;
    }
    match raw & 0xff {
        81 => Some(KeyEvent::Arrow(Orientation::Left)),
        82 => Some(KeyEvent::Arrow(Orientation::Up)),
        83 => Some(KeyEvent::Arrow(Orientation::Right)),
        84 => Some(KeyEvent::Arrow(Orientation::Down)),
        27 => Some(KeyEvent::Quit),
        code if code == i32::from(b'q') => Some(KeyEvent::Quit),
        _ => None,
    }
}

/// Rendering and input seam. The session state machine only sees key
/// events; the cue animation stays on this side of the trait.
pub trait Surface {
    /// A new target became active; reset the cue animation for it.
    fn arm(&mut self, target: &Target) -> Result<()>;

    /// Draw the stimulus and, when available, the live camera preview.
    fn render(&mut self, target: &Target, preview: Option<&Mat>) -> Result<()>;

    /// Blank the window while no target is active.
    fn render_idle(&mut self) -> Result<()>;

    /// Wait up to the poll interval for one key press.
    fn poll_key(&mut self) -> Result<Option<KeyEvent>>;
}

/// Fullscreen highgui window showing the shrinking circle-and-arrow cue.
/// The cue color flips once the circle has shrunk past a per-target random
/// threshold; that flip is purely a UI signal and carries no state.
pub struct DisplaySurface {
    window: String,
    geometry: MonitorGeometry,
    scale: f64,
    ready_scale: f64,
    rng: ThreadRng,
}

impl DisplaySurface {
    pub fn create(window: &str, geometry: MonitorGeometry) -> Result<Self> {
        highgui::named_window(window, highgui::WINDOW_NORMAL)?;
        highgui::set_window_property(
            window,
            highgui::WND_PROP_FULLSCREEN,
            f64::from(highgui::WINDOW_FULLSCREEN),
        )?;

        Ok(DisplaySurface {
            window: window.to_string(),
            geometry,
            scale: 1.0,
            ready_scale: 0.3,
            rng: thread_rng(),
        })
    }

    fn blank_canvas(&self) -> Result<Mat> {
        let canvas = Mat::new_rows_cols_with_default(
            self.geometry.height_px as i32,
            self.geometry.width_px as i32,
            core::CV_8UC3,
            Scalar::all(0.0),
        )?;
        Ok(canvas)
    }

    fn draw_preview(&self, canvas: &mut Mat, frame: &Mat) -> Result<()> {
        if frame.cols() == 0 || frame.rows() == 0 {
            return Ok(());
        }

        let width = (self.geometry.width_px as i32 / 5).max(1);
        let height = (width * frame.rows() / frame.cols()).max(1);

        let mut small = Mat::default();
        imgproc::resize(
            frame,
            &mut small,
            Size::new(width, height),
            0.0,
            0.0,
            imgproc::INTER_AREA,
        )?;

        let mut inset = Mat::roi(&*canvas, Rect::new(0, 0, width, height))?;
        small.copy_to(&mut inset)?;
        Ok(())
    }

    fn draw_cue(&self, canvas: &mut Mat, target: &Target, ready: bool) -> Result<()> {
        let center = Point::new(target.x as i32, target.y as i32);
        let radius = ((self.geometry.height_px as f64 / 20.0 * self.scale) as i32).max(4);

        imgproc::circle(
            canvas,
            center,
            radius,
            Scalar::new(32.0, 32.0, 32.0, 0.0),
            imgproc::FILLED,
            imgproc::LINE_AA,
            0,
        )?;

        let (dx, dy) = target.orientation.direction();
        let reach = (radius * 2) / 3;
        let tail = Point::new(center.x - dx * reach, center.y - dy * reach);
        let tip = Point::new(center.x + dx * reach, center.y + dy * reach);
        imgproc::arrowed_line(
            canvas,
            tail,
            tip,
            cue_color(ready),
            2,
            imgproc::LINE_AA,
            0,
            0.3,
        )?;

        Ok(())
    }
}

impl Surface for DisplaySurface {
    fn arm(&mut self, _target: &Target) -> Result<()> {
        self.scale = 1.0;
        self.ready_scale = self.rng.gen_range(0.1, 0.5);
        Ok(())
    }

    fn render(&mut self, target: &Target, preview: Option<&Mat>) -> Result<()> {
        let mut canvas = self.blank_canvas()?;
        if let Some(frame) = preview {
            self.draw_preview(&mut canvas, frame)?;
        }

        let ready = self.scale <= self.ready_scale;
        self.draw_cue(&mut canvas, target, ready)?;
        highgui::imshow(&self.window, &canvas)?;

        if !ready {
            self.scale *= SHRINK_FACTOR;
        }
        Ok(())
    }

    fn render_idle(&mut self) -> Result<()> {
        let canvas = self.blank_canvas()?;
        highgui::imshow(&self.window, &canvas)?;
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<KeyEvent>> {
        let raw = highgui::wait_key(POLL_INTERVAL_MS)?;
        Ok(decode_key(raw))
    }
}

impl Drop for DisplaySurface {
    fn drop(&mut self) {
        let _ = highgui::destroy_all_windows();
    }
}

// BGR. Muted orange while the cue is still shrinking, bright blue once it
// accepts confirmation.
fn cue_color(ready: bool) -> Scalar {
    if ready {
        Scalar::new(252.0, 125.0, 11.0, 0.0)
    } else {
        Scalar::new(17.0, 112.0, 170.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_gtk_arrow_codes() {
        assert_eq!(decode_key(81), Some(KeyEvent::Arrow(Orientation::Left)));
        assert_eq!(decode_key(82), Some(KeyEvent::Arrow(Orientation::Up)));
        assert_eq!(decode_key(83), Some(KeyEvent::Arrow(Orientation::Right)));
        assert_eq!(decode_key(84), Some(KeyEvent::Arrow(Orientation::Down)));
    }

    #[test]
    fn masks_modifier_bits() {
        // X11 keysym-style codes carry the arrow value in the low byte.
        assert_eq!(decode_key(65361), Some(KeyEvent::Arrow(Orientation::Left)));
        assert_eq!(decode_key(65363), Some(KeyEvent::Arrow(Orientation::Right)));
    }

    #[test]
    fn quit_on_q_or_escape() {
        assert_eq!(decode_key(i32::from(b'q')), Some(KeyEvent::Quit));
        assert_eq!(decode_key(27), Some(KeyEvent::Quit));
    }

    #[test]
    fn timeout_and_unknown_keys_are_ignored() {
        assert_eq!(decode_key(-1), None);
        assert_eq!(decode_key(i32::from(b'a')), None);
        assert_eq!(decode_key(i32::from(b' ')), None);
    }
}
