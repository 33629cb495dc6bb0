//! Precomputed annulus ("donut") vertex table.
//!
//! The table holds `CIRCLE_SIZE + 1` inner/outer vertex pairs around a
//! full circle, the last pair repeating the first. An arc of an annulus is
//! drawn as one or two triangle strips over a slice of the table.

use std::f64::consts::TAU;

use crate::coords::{Angle, Vec2};

/// Angular resolution of the table.
pub const CIRCLE_SIZE: usize = 64;

/// Table index one past the last distinct vertex pair (two vertices per
/// angle step).
pub const MAX_ANGLE: usize = CIRCLE_SIZE * 2;

/// Inner/outer vertex pairs for one annulus.
#[derive(Debug, Clone)]
pub struct DonutVertices {
    vertices: Vec<Vec2>,
}

impl DonutVertices {
    pub fn new(center: Vec2, inner_radius: f32, outer_radius: f32) -> Self {
        let mut vertices = Vec::with_capacity(MAX_ANGLE + 2);
        for k in 0..=CIRCLE_SIZE {
            let phi = (k % CIRCLE_SIZE) as f64 / CIRCLE_SIZE as f64 * TAU;
            let dir = Vec2::new(phi.cos() as f32, phi.sin() as f32);
            vertices.push(center + dir * inner_radius);
            vertices.push(center + dir * outer_radius);
        }
        Self { vertices }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Inner circle as a closed point list (`CIRCLE_SIZE + 1` points).
    pub fn inner_circle(&self) -> Vec<Vec2> {
        self.vertices.iter().step_by(2).copied().collect()
    }

    /// Outer circle as a closed point list (`CIRCLE_SIZE + 1` points).
    pub fn outer_circle(&self) -> Vec<Vec2> {
        self.vertices.iter().skip(1).step_by(2).copied().collect()
    }

    #[inline]
    pub const fn next_angle(i: usize) -> usize {
        (i + 2) % MAX_ANGLE
    }

    #[inline]
    pub const fn previous_angle(i: usize) -> usize {
        (i + MAX_ANGLE - 2) % MAX_ANGLE
    }
}

/// Table index of the vertex pair at bearing `angle`.
///
/// Table angle 0 points along +X; bearing 0 (north) sits three quarters of
/// the way round on a y-down screen.
pub fn angle_to_donut_vertex(angle: Angle) -> usize {
    let turns = angle.as_bearing().as_radians() / TAU + 0.75;
    let step = (turns * CIRCLE_SIZE as f64).floor() as usize % CIRCLE_SIZE;
    step * 2
}

/// Table indices `(start, end)` for the clockwise arc from `start` to `end`.
///
/// A (near) zero-length arc means the full circle: `(0, MAX_ANGLE)`.
/// Otherwise the two indices always differ, even when both angles fall
/// into the same table step.
pub fn angle_to_donut_vertices(start: Angle, end: Angle) -> (usize, usize) {
    let epsilon = Angle::FULL_CIRCLE.as_radians() / (CIRCLE_SIZE * 4) as f64;
    let delta = end - start;

    if delta.as_delta().abs().as_radians() <= epsilon {
        return (0, MAX_ANGLE);
    }

    let istart = angle_to_donut_vertex(start);
    let mut iend = angle_to_donut_vertex(end);

    if istart == iend {
        iend = if delta.as_bearing() >= Angle::HALF_CIRCLE {
            DonutVertices::previous_angle(iend)
        } else {
            DonutVertices::next_angle(iend)
        };
    }

    (istart, iend)
}

/// Strips `(first_vertex, vertex_count)` covering the table slice from
/// `istart` to `iend`, split in two when the arc wraps past the table end.
pub fn donut_strips(istart: usize, iend: usize) -> Vec<(usize, usize)> {
    if istart > iend {
        vec![(istart, MAX_ANGLE - istart + 2), (0, iend + 2)]
    } else {
        vec![(istart, iend - istart + 2)]
    }
}
