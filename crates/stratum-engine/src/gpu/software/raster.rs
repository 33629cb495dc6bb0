//! Coverage for triangles and lines.
//!
//! Pixels are sampled at their centres. Triangles use a consistent tie
//! rule so that two triangles sharing an edge never both cover a pixel on
//! it. Lines are half-open: the end pixel of a segment is not drawn, so
//! joints of a strip are hit once.

use crate::coords::Vec2;

/// Half-open pixel bounds `[x0, x1) x [y0, y1)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) struct Bounds {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Bounds {
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && y >= self.y0 && x < self.x1 && y < self.y1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }
}

/// Transformed vertex: pixel-space position plus texcoord.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(super) struct RasterVertex {
    pub pos: Vec2,
    pub uv: Vec2,
}

#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Edge function evaluated with the endpoints in a fixed order, so a shared
/// edge yields exactly negated values in the two triangles using it.
#[inline]
fn edge_stable(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    if a.x < b.x || (a.x == b.x && a.y <= b.y) {
        edge(a, b, p)
    } else {
        -edge(b, a, p)
    }
}

/// Whether a sample lying exactly on edge `a -> b` belongs to the triangle.
/// Reversing the edge flips the answer.
#[inline]
fn owns_edge(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    d.y > 0.0 || (d.y == 0.0 && d.x < 0.0)
}

#[inline]
fn inside(w: f32, owned: bool) -> bool {
    w > 0.0 || (w == 0.0 && owned)
}

pub(super) fn triangle(
    a: RasterVertex,
    b: RasterVertex,
    c: RasterVertex,
    bounds: Bounds,
    mut emit: impl FnMut(i32, i32, Vec2),
) {
    let (a, b, c) = match edge(a.pos, b.pos, c.pos) {
        area if area > 0.0 => (a, b, c),
        area if area < 0.0 => (a, c, b),
        _ => return,
    };
    let area = edge(a.pos, b.pos, c.pos);
    if !area.is_finite() {
        return;
    }

    let min_x = a.pos.x.min(b.pos.x).min(c.pos.x).floor() as i32;
    let max_x = a.pos.x.max(b.pos.x).max(c.pos.x).ceil() as i32;
    let min_y = a.pos.y.min(b.pos.y).min(c.pos.y).floor() as i32;
    let max_y = a.pos.y.max(b.pos.y).max(c.pos.y).ceil() as i32;

    let x0 = min_x.max(bounds.x0);
    let x1 = max_x.min(bounds.x1);
    let y0 = min_y.max(bounds.y0);
    let y1 = max_y.min(bounds.y1);

    let own_bc = owns_edge(b.pos, c.pos);
    let own_ca = owns_edge(c.pos, a.pos);
    let own_ab = owns_edge(a.pos, b.pos);

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let wa = edge_stable(b.pos, c.pos, p);
            let wb = edge_stable(c.pos, a.pos, p);
            let wc = edge_stable(a.pos, b.pos, p);
            if inside(wa, own_bc) && inside(wb, own_ca) && inside(wc, own_ab) {
                let uv = (a.uv * wa + b.uv * wb + c.uv * wc) / (wa + wb + wc);
                emit(x, y, uv);
            }
        }
    }
}

pub(super) fn line(a: RasterVertex, b: RasterVertex, bounds: Bounds, mut emit: impl FnMut(i32, i32, Vec2)) {
    let d = b.pos - a.pos;
    let steps = d.x.abs().max(d.y.abs()).ceil();
    if !(steps >= 1.0) || !steps.is_finite() {
        return;
    }

    let n = steps as i32;
    let mut last = None;
    for i in 0..n {
        let t = i as f32 / steps;
        let p = a.pos + d * t;
        let px = (p.x.floor() as i32, p.y.floor() as i32);
        if last == Some(px) {
            continue;
        }
        last = Some(px);
        if bounds.contains(px.0, px.1) {
            emit(px.0, px.1, a.uv + (b.uv - a.uv) * t);
        }
    }
}
