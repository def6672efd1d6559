//! Pure pursuit path and its text file format
//!
//! The file is a header line holding the number of points followed by one line per point:
//!
//! ```text
//! 3
//! 0.000 0.000 0.000 inf 0.000
//! 12.000 0.000 12.000 inf 2.000
//! 24.000 0.000 24.000 inf 0.000
//! ```
//!
//! The columns are x, y, distance along the path, radius and velocity, written to 3 decimal
//! places. Infinite radii are written as `inf`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use nalgebra::Point2;
use serde::Serialize;

use super::BezierProfile;
use crate::physics::IN_PER_FT;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One point on a pursuit path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PursuitPoint {
    pub point_in: Point2<f64>,

    /// Distance along the path from the first point
    ///
    /// Units: inches
    pub distance_in: f64,

    /// Unsigned radius of the path at this point, infinite on straight sections
    ///
    /// Units: inches
    pub radius_in: f64,

    /// Profiled speed of the robot's centre
    ///
    /// Units: feet/second
    pub velocity_fps: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PursuitPath {
    points: Vec<PursuitPoint>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PursuitPathError {
    #[error("Could not access the path file: {0}")]
    Io(#[from] std::io::Error),

    #[error("The path file is empty")]
    MissingHeader,

    #[error("Invalid point count in the path file header: {0:?}")]
    InvalidHeader(String),

    #[error("Expected {expected} points in the path file but found {found}")]
    WrongPointCount { expected: usize, found: usize },

    #[error("Line {0} should have 5 values: {1:?}")]
    InvalidLine(usize, String),

    #[error("Line {line} contains an invalid number: {source}")]
    InvalidNumber {
        line: usize,
        source: std::num::ParseFloatError,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PursuitPath {
    pub fn new(points: Vec<PursuitPoint>) -> Self {
        Self { points }
    }

    /// Reduce a profile to its pursuit points.
    pub fn from_profile(profile: &BezierProfile) -> Self {
        let points = profile
            .points()
            .iter()
            .zip(profile.distances_in())
            .zip(profile.radii_in())
            .zip(profile.center_vel_ips())
            .map(|(((p, d), r), v)| PursuitPoint {
                point_in: *p,
                distance_in: *d,
                radius_in: *r,
                velocity_fps: v / IN_PER_FT,
            })
            .collect();

        Self { points }
    }

    pub fn points(&self) -> &[PursuitPoint] {
        &self.points
    }

    /// The positions of all points, in order.
    pub fn goals(&self) -> Vec<Point2<f64>> {
        self.points.iter().map(|p| p.point_in).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Write the path in the text format.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<(), PursuitPathError> {
        writeln!(writer, "{}", self.points.len())?;

        for p in self.points.iter() {
            writeln!(
                writer,
                "{:.3} {:.3} {:.3} {:.3} {:.3}",
                p.point_in.x, p.point_in.y, p.distance_in, p.radius_in, p.velocity_fps
            )?;
        }

        writer.flush()?;

        Ok(())
    }

    /// Read a path in the text format.
    pub fn read<R: BufRead>(reader: R) -> Result<Self, PursuitPathError> {
        let mut lines = reader.lines();

        let header = lines.next().ok_or(PursuitPathError::MissingHeader)??;
        let expected: usize = header
            .trim()
            .parse()
            .map_err(|_| PursuitPathError::InvalidHeader(header.clone()))?;

        let mut points = Vec::with_capacity(expected);

        for (i, line) in lines.enumerate() {
            let line = line?;
            let line_num = i + 2;

            if line.trim().is_empty() {
                continue;
            }

            let values = line
                .split_whitespace()
                .map(|w| {
                    w.parse::<f64>().map_err(|e| PursuitPathError::InvalidNumber {
                        line: line_num,
                        source: e,
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;

            if values.len() != 5 {
                return Err(PursuitPathError::InvalidLine(line_num, line));
            }

            points.push(PursuitPoint {
                point_in: Point2::new(values[0], values[1]),
                distance_in: values[2],
                radius_in: values[3],
                velocity_fps: values[4],
            });
        }

        if points.len() != expected {
            return Err(PursuitPathError::WrongPointCount {
                expected,
                found: points.len(),
            });
        }

        Ok(Self { points })
    }

    /// Save the path to a file, overwriting any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PursuitPathError> {
        self.write(BufWriter::new(File::create(path)?))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PursuitPathError> {
        Self::read(BufReader::new(File::open(path)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traj::{ProfileParams, QuinticBezierPath};

    fn profile_path() -> PursuitPath {
        let path = QuinticBezierPath::new([
            Point2::new(0.0, 0.0),
            Point2::new(40.0, 0.0),
            Point2::new(60.0, 0.0),
            Point2::new(60.0, 60.0),
            Point2::new(80.0, 60.0),
            Point2::new(120.0, 60.0),
        ]);
        let params = ProfileParams {
            resolution: 100,
            ..ProfileParams::default()
        };

        PursuitPath::from_profile(&BezierProfile::new(&path, 30.0, &params).unwrap())
    }

    #[test]
    fn test_persistence() {
        let original = profile_path();
        assert_eq!(original.len(), 100);

        let mut buf = Vec::new();
        original.write(&mut buf).unwrap();
        let loaded = PursuitPath::read(buf.as_slice()).unwrap();

        assert_eq!(loaded.len(), original.len());
        for (a, b) in original.points().iter().zip(loaded.points()) {
            assert!((a.point_in - b.point_in).norm() < 1e-3);
            assert!((a.distance_in - b.distance_in).abs() <= 5e-4);
            assert!((a.velocity_fps - b.velocity_fps).abs() <= 5e-4);

            if a.radius_in.is_infinite() {
                assert!(b.radius_in.is_infinite());
            } else {
                assert!((a.radius_in - b.radius_in).abs() <= 5e-4);
            }
        }
    }

    #[test]
    fn test_format() {
        let path = PursuitPath::new(vec![
            PursuitPoint {
                point_in: Point2::new(1.0, 2.5),
                distance_in: 0.0,
                radius_in: std::f64::INFINITY,
                velocity_fps: 0.0,
            },
            PursuitPoint {
                point_in: Point2::new(3.14159, -2.0),
                distance_in: 3.0,
                radius_in: 48.0,
                velocity_fps: 1.25,
            },
        ]);

        let mut buf = Vec::new();
        path.write(&mut buf).unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "2\n1.000 2.500 0.000 inf 0.000\n3.142 -2.000 3.000 48.000 1.250\n"
        );
    }

    #[test]
    fn test_read_errors() {
        assert!(matches!(
            PursuitPath::read("".as_bytes()),
            Err(PursuitPathError::MissingHeader)
        ));
        assert!(matches!(
            PursuitPath::read("two\n".as_bytes()),
            Err(PursuitPathError::InvalidHeader(_))
        ));
        assert!(matches!(
            PursuitPath::read("2\n1 2 3 4 5\n".as_bytes()),
            Err(PursuitPathError::WrongPointCount {
                expected: 2,
                found: 1
            })
        ));
        assert!(matches!(
            PursuitPath::read("1\n1 2 3 4\n".as_bytes()),
            Err(PursuitPathError::InvalidLine(2, _))
        ));
        assert!(matches!(
            PursuitPath::read("1\n1 2 x 4 5\n".as_bytes()),
            Err(PursuitPathError::InvalidNumber { line: 2, .. })
        ));
    }
}
