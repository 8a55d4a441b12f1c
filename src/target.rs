use rand::{rngs::ThreadRng, thread_rng, Rng};

use crate::{error::ConfigError, monitor::MonitorGeometry};

/// Arrow direction a target asks the operator to confirm with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Up,
    Down,
    Left,
    Right,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Up,
        Orientation::Down,
        Orientation::Left,
        Orientation::Right,
    ];

    /// Unit direction of the arrow cue in screen coordinates (y grows
    /// downward).
    pub fn direction(self) -> (i32, i32) {
        match self {
            Orientation::Up => (0, -1),
            Orientation::Down => (0, 1),
            Orientation::Left => (-1, 0),
            Orientation::Right => (1, 0),
        }
    }
}

/// One stimulus: a pixel position on the monitor and the arrow key that
/// confirms fixation on it. Immutable until replaced by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub x: u32,
    pub y: u32,
    pub orientation: Orientation,
}

/// Produces the sequence of stimulus positions for one collection run.
pub trait TargetScheduler {
    /// `None` once the sequence is exhausted.
    fn next_target(&mut self) -> Option<Target>;
}

impl<T: TargetScheduler + ?Sized> TargetScheduler for Box<T> {
    fn next_target(&mut self) -> Option<Target> {
        (**self).next_target()
    }
}

/// Fixed `rows x cols` grid in row-major order, inset from the screen
/// edges so the stimulus stays fully visible. Orientations are drawn at
/// random; positions are deterministic.
pub struct GridScheduler {
    geometry: MonitorGeometry,
    rows: u32,
    cols: u32,
    next: u32,
    rng: ThreadRng,
}

impl GridScheduler {
    pub fn new(rows: u32, cols: u32, geometry: MonitorGeometry) -> Self {
        GridScheduler {
            geometry,
            rows,
            cols,
            next: 0,
            rng: thread_rng(),
        }
    }
}

impl TargetScheduler for GridScheduler {
    fn next_target(&mut self) -> Option<Target> {
        if self.next >= self.rows * self.cols {
            return None;
        }

        let row = self.next / self.cols;
        let col = self.next % self.cols;
        self.next += 1;

        Some(Target {
            x: spread(self.geometry.width_px, self.cols, col),
            y: spread(self.geometry.height_px, self.rows, row),
            orientation: random_orientation(&mut self.rng),
        })
    }
}

/// Uniformly random positions over the whole monitor; never exhausts, the
/// run ends on the quit key instead.
pub struct RandomScheduler {
    geometry: MonitorGeometry,
    rng: ThreadRng,
}

impl RandomScheduler {
    pub fn new(geometry: MonitorGeometry) -> Self {
        RandomScheduler {
            geometry,
            rng: thread_rng(),
        }
    }
}

impl TargetScheduler for RandomScheduler {
    fn next_target(&mut self) -> Option<Target> {
        Some(Target {
            x: self.rng.gen_range(0, self.geometry.width_px),
            y: self.rng.gen_range(0, self.geometry.height_px),
            orientation: random_orientation(&mut self.rng),
        })
    }
}

fn random_orientation(rng: &mut ThreadRng) -> Orientation {
    Orientation::ALL[rng.gen_range(0, Orientation::ALL.len())]
}

// Grid coordinate along one axis, inset by a 10% margin on each side.
fn spread(extent: u32, steps: u32, step: u32) -> u32 {
    let margin = extent / 10;
    if steps <= 1 {
        extent / 2
    } else {
        margin + step * (extent - 2 * margin) / (steps - 1)
    }
}

// Keeps the per-axis index arithmetic comfortably inside u32.
const MAX_GRID_SIDE: u32 = 1000;

/// Parse a CLI grid layout of the form "ROWSxCOLS".
pub fn parse_grid(input: &str) -> Result<(u32, u32), ConfigError> {
    let invalid = || ConfigError::Grid {
        input: input.to_string(),
    };

    let mut parts = input.splitn(2, 'x');
    let rows: u32 = parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(invalid)?;
    let cols: u32 = parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(invalid)?;

    if rows == 0 || cols == 0 || rows > MAX_GRID_SIDE || cols > MAX_GRID_SIDE {
        return Err(invalid());
    }
    Ok((rows, cols))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> MonitorGeometry {
        MonitorGeometry::new((400, 300), (1920, 1080))
    }

    #[test]
    fn grid_yields_rows_times_cols_then_none() {
        let mut scheduler = GridScheduler::new(3, 3, geometry());
        let targets: Vec<Target> = std::iter::from_fn(|| scheduler.next_target()).collect();

        assert_eq!(targets.len(), 9);
        assert_eq!(scheduler.next_target(), None);
        assert_eq!(scheduler.next_target(), None);
    }

    #[test]
    fn grid_is_row_major_and_inset() {
        let mut scheduler = GridScheduler::new(2, 2, geometry());
        let targets: Vec<Target> = std::iter::from_fn(|| scheduler.next_target()).collect();

        assert_eq!((targets[0].x, targets[0].y), (192, 108));
        assert_eq!((targets[1].x, targets[1].y), (1728, 108));
        assert_eq!((targets[2].x, targets[2].y), (192, 972));
        assert_eq!((targets[3].x, targets[3].y), (1728, 972));
    }

    #[test]
    fn single_cell_grid_targets_screen_center() {
        let mut scheduler = GridScheduler::new(1, 1, geometry());
        let target = scheduler.next_target().unwrap();
        assert_eq!((target.x, target.y), (960, 540));
        assert_eq!(scheduler.next_target(), None);
    }

    #[test]
    fn random_positions_stay_on_screen() {
        let mut scheduler = RandomScheduler::new(geometry());
        for _ in 0..200 {
            let target = scheduler.next_target().unwrap();
            assert!(target.x < 1920);
            assert!(target.y < 1080);
        }
    }

    #[test]
    fn parses_grid_layout() {
        assert_eq!(parse_grid("3x3").unwrap(), (3, 3));
        assert_eq!(parse_grid("4x5").unwrap(), (4, 5));
    }

    #[test]
    fn rejects_malformed_grid_layout() {
        assert!(parse_grid("3").is_err());
        assert!(parse_grid("0x3").is_err());
        assert!(parse_grid("3x").is_err());
        assert!(parse_grid("axb").is_err());
    }

    #[test]
    fn rejects_oversized_grid_layout() {
        // Side counts past the cap would overflow the u32 cell index.
        assert!(parse_grid("100000x100000").is_err());
        assert!(parse_grid("1001x2").is_err());
        assert!(parse_grid("2x1001").is_err());
        assert_eq!(parse_grid("1000x1000").unwrap(), (1000, 1000));
    }
}
