//! Point lists for arcs and arc-bounded shapes.
//!
//! Bearings run clockwise from north. All generators walk clockwise from
//! `start` to `end`; equal angles mean a full circle.

use std::f64::consts::TAU;

use crate::coords::{Angle, PixelPoint, PixelRect};

/// Points per full circle.
const ARC_SEGMENTS: f64 = 64.0;

#[inline]
fn bearing_point(center: PixelPoint, radius: u32, angle: Angle) -> PixelPoint {
    let r = radius as f64;
    PixelPoint::new(
        center.x + (angle.sin() * r).round() as i32,
        center.y - (angle.cos() * r).round() as i32,
    )
}

fn push_distinct(points: &mut Vec<PixelPoint>, p: PixelPoint) {
    if points.last() != Some(&p) {
        points.push(p);
    }
}

/// Clockwise sweep from `start` to `end`; zero means full circle.
#[inline]
fn sweep(start: Angle, end: Angle) -> f64 {
    let s = (end - start).as_bearing().as_radians();
    if s <= 0.0 { TAU } else { s }
}

fn append_arc(points: &mut Vec<PixelPoint>, center: PixelPoint, radius: u32, start: Angle, sweep: f64) {
    let steps = ((sweep / TAU) * ARC_SEGMENTS).ceil().max(2.0) as usize;
    for i in 0..=steps {
        let a = start + Angle::radians(sweep * i as f64 / steps as f64);
        push_distinct(points, bearing_point(center, radius, a));
    }
}

/// Open arc from `start` to `end`.
pub fn arc_points(center: PixelPoint, radius: u32, start: Angle, end: Angle) -> Vec<PixelPoint> {
    let mut points = Vec::new();
    append_arc(&mut points, center, radius, start, sweep(start, end));
    points
}

/// Circle sector (pie slice). With `horizon` the centre is omitted and the
/// chord closes the shape instead.
pub fn segment_points(
    center: PixelPoint,
    radius: u32,
    start: Angle,
    end: Angle,
    horizon: bool,
) -> Vec<PixelPoint> {
    let mut points = Vec::new();
    if !horizon {
        points.push(center);
    }
    append_arc(&mut points, center, radius, start, sweep(start, end));
    points
}

/// Ring sector between `small_radius` and `big_radius`.
pub fn annulus_points(
    center: PixelPoint,
    small_radius: u32,
    big_radius: u32,
    start: Angle,
    end: Angle,
) -> Vec<PixelPoint> {
    let s = sweep(start, end);
    let mut points = Vec::new();
    append_arc(&mut points, center, big_radius, start, s);

    let mut inner = Vec::new();
    append_arc(&mut inner, center, small_radius, start, s);
    for p in inner.into_iter().rev() {
        push_distinct(&mut points, p);
    }
    points
}

/// Sector of `big_radius` joined to a full circle of `small_radius`.
pub fn keyhole_points(
    center: PixelPoint,
    small_radius: u32,
    big_radius: u32,
    start: Angle,
    end: Angle,
) -> Vec<PixelPoint> {
    let mut points = Vec::new();
    append_arc(&mut points, center, big_radius, start, sweep(start, end));
    append_arc(&mut points, center, small_radius, end, sweep(end, start));
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Rectangle with quarter-circle corners of `radius`.
pub fn round_rect_points(rect: PixelRect, radius: u32) -> Vec<PixelPoint> {
    let r = radius.min((rect.width().min(rect.height()).max(0) / 2) as u32) as i32;
    let corners = [
        (PixelPoint::new(rect.right - r, rect.top + r), 0.0),
        (PixelPoint::new(rect.right - r, rect.bottom - r), 90.0),
        (PixelPoint::new(rect.left + r, rect.bottom - r), 180.0),
        (PixelPoint::new(rect.left + r, rect.top + r), 270.0),
    ];

    let mut points = Vec::new();
    for (c, deg) in corners {
        let start = Angle::degrees(deg);
        append_arc(&mut points, c, r as u32, start, std::f64::consts::FRAC_PI_2);
    }
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}
