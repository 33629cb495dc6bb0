use crate::coords::Vec2;

/// Longest miter, in half-widths, before a sharp joint is clamped.
const MITER_LIMIT: f32 = 4.0;

/// Expands a polyline into a triangle strip of the given width.
///
/// Each input point contributes a pair of vertices on either side of the
/// line, offset along the joint's miter. A closed loop repeats its first
/// pair at the end. With `extend_caps` the open ends are pushed out by
/// half the width, so adjoining pieces drawn separately leave no gap.
///
/// Consecutive duplicate points are skipped; fewer than two distinct
/// points produce an empty strip.
pub fn line_to_triangles(points: &[Vec2], width: f32, closed: bool, extend_caps: bool) -> Vec<Vec2> {
    let mut pts: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        if pts.last() != Some(&p) {
            pts.push(p);
        }
    }
    if closed {
        while pts.len() > 1 && pts.first() == pts.last() {
            pts.pop();
        }
    }

    let n = pts.len();
    if n < 2 || !(width > 0.0) {
        return Vec::new();
    }
    let closed = closed && n > 2;

    let half = width * 0.5;
    let dir = |a: Vec2, b: Vec2| (b - a).normalized().unwrap_or(Vec2::new(1.0, 0.0));

    let mut strip = Vec::with_capacity(2 * (n + 1));
    for i in 0..n {
        let p = pts[i];
        let prev = if i > 0 { Some(pts[i - 1]) } else if closed { Some(pts[n - 1]) } else { None };
        let next = if i + 1 < n { Some(pts[i + 1]) } else if closed { Some(pts[0]) } else { None };

        let (centre, offset) = match (prev, next) {
            (None, Some(next)) => {
                let d = dir(p, next);
                let c = if extend_caps { p - d * half } else { p };
                (c, d.perp() * half)
            }
            (Some(prev), None) => {
                let d = dir(prev, p);
                let c = if extend_caps { p + d * half } else { p };
                (c, d.perp() * half)
            }
            (Some(prev), Some(next)) => {
                let n_in = dir(prev, p).perp();
                let n_out = dir(p, next).perp();
                match (n_in + n_out).normalized() {
                    Some(miter) => {
                        let cos = miter.dot(n_in).max(1.0 / MITER_LIMIT);
                        (p, miter * (half / cos))
                    }
                    // 180 degree turn: square off along the incoming normal.
                    None => (p, n_in * half),
                }
            }
            (None, None) => unreachable!("n >= 2"),
        };

        strip.push(centre + offset);
        strip.push(centre - offset);
    }

    if closed {
        strip.push(strip[0]);
        strip.push(strip[1]);
    }
    strip
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    #[test]
    fn two_distinct_points_are_never_empty() {
        let s = line_to_triangles(&[v(0.0, 0.0), v(10.0, 0.0)], 3.0, false, false);
        assert_eq!(s.len(), 4);
        assert_eq!(s[0], v(0.0, 1.5));
        assert_eq!(s[1], v(0.0, -1.5));
    }

    #[test]
    fn duplicates_only_is_empty() {
        assert!(line_to_triangles(&[v(1.0, 1.0), v(1.0, 1.0)], 4.0, false, false).is_empty());
    }

    #[test]
    fn extended_caps_push_ends_out() {
        let s = line_to_triangles(&[v(0.0, 0.0), v(10.0, 0.0)], 4.0, false, true);
        assert_eq!(s[0].x, -2.0);
        assert_eq!(s[3].x, 12.0);
    }

    #[test]
    fn closed_loop_repeats_first_pair() {
        let sq = [v(0.0, 0.0), v(10.0, 0.0), v(10.0, 10.0), v(0.0, 10.0), v(0.0, 0.0)];
        let s = line_to_triangles(&sq, 2.0, true, false);
        assert_eq!(s.len(), 2 * 4 + 2);
        assert_eq!(s[8], s[0]);
        assert_eq!(s[9], s[1]);
    }

    #[test]
    fn right_angle_miter_reaches_corner_offset() {
        let sq = [v(0.0, 0.0), v(10.0, 0.0), v(10.0, 10.0), v(0.0, 10.0)];
        let s = line_to_triangles(&sq, 2.0, true, false);
        // Corner (10, 0): one side at (11, -1), the other at (9, 1).
        let pair = [s[2], s[3]];
        let has = |p: Vec2| pair.iter().any(|q| (q.x - p.x).abs() < 1e-4 && (q.y - p.y).abs() < 1e-4);
        assert!(has(v(11.0, -1.0)) || has(v(9.0, 1.0)));
        assert!(has(v(11.0, -1.0)) && has(v(9.0, 1.0)));
    }

    #[test]
    fn sharp_joint_is_clamped() {
        let s = line_to_triangles(&[v(0.0, 0.0), v(100.0, 0.0), v(0.0, 1.0)], 2.0, false, false);
        for p in &s[2..4] {
            assert!((p.x - 100.0).abs() <= 4.0 + 1e-3 && p.y.abs() <= 4.0 + 1e-3);
        }
    }
}
