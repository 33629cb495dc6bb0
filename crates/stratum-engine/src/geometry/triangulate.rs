use lyon::lyon_tessellation::{BuffersBuilder, FillOptions, FillTessellator, FillVertex, VertexBuffers};
use lyon::math::point;
use lyon::path::Path;

use crate::coords::{PixelPoint, Vec2};

/// Twice the signed area of triangle `abc` (positive when `a -> b -> c`
/// turns clockwise on a y-down screen).
#[inline]
fn cross(a: PixelPoint, b: PixelPoint, c: PixelPoint) -> i64 {
    let (abx, aby) = ((b.x - a.x) as i64, (b.y - a.y) as i64);
    let (bcx, bcy) = ((c.x - b.x) as i64, (c.y - b.y) as i64);
    abx * bcy - aby * bcx
}

/// Twice the signed polygon area (shoelace).
pub fn signed_area2(points: &[PixelPoint]) -> i64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
        })
        .sum()
}

/// Indexed triangle list produced by [`polygon_to_triangles`].
///
/// Indices refer to `vertices`, not to the input points; the tessellator
/// adds vertices where edges cross.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Triangles {
    pub vertices: Vec<Vec2>,
    pub indices: Vec<u16>,
}

impl Triangles {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Fills a polygon given by its pixel corners with the even-odd rule.
///
/// Consecutive duplicates and a closing duplicate are dropped first. Fewer
/// than three distinct points, all-collinear input, tessellation failure
/// and outlines too large for 16-bit indices yield no triangles.
pub fn polygon_to_triangles(points: &[PixelPoint]) -> Triangles {
    if points.len() > u16::MAX as usize {
        return Triangles::default();
    }

    let mut ring: Vec<PixelPoint> = Vec::with_capacity(points.len());
    for &p in points {
        if ring.last() != Some(&p) {
            ring.push(p);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < 3 || !has_area(&ring) {
        return Triangles::default();
    }

    let mut builder = Path::builder();
    builder.begin(point(ring[0].x as f32, ring[0].y as f32));
    for p in &ring[1..] {
        builder.line_to(point(p.x as f32, p.y as f32));
    }
    builder.end(true);
    let path = builder.build();

    let mut buffers: VertexBuffers<Vec2, u16> = VertexBuffers::new();
    let result = FillTessellator::new().tessellate_path(
        &path,
        &FillOptions::default(),
        &mut BuffersBuilder::new(&mut buffers, |v: FillVertex| Vec2::new(v.position().x, v.position().y)),
    );
    if let Err(err) = result {
        log::debug!("polygon tessellation failed for {} points: {err:?}", ring.len());
        return Triangles::default();
    }

    Triangles { vertices: buffers.vertices, indices: buffers.indices }
}

/// True when some three points are not collinear.
fn has_area(ring: &[PixelPoint]) -> bool {
    let a = ring[0];
    let Some(&b) = ring.iter().find(|&&p| p != a) else {
        return false;
    };
    ring.iter().any(|&c| cross(a, b, c) != 0)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn p(x: i32, y: i32) -> PixelPoint {
        PixelPoint::new(x, y)
    }

    /// Twice the covered area, summed over unsigned triangle areas.
    fn area2(t: &Triangles) -> f64 {
        t.indices
            .chunks_exact(3)
            .map(|i| {
                let (a, b, c) = (t.vertices[i[0] as usize], t.vertices[i[1] as usize], t.vertices[i[2] as usize]);
                let (abx, aby) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
                let (acx, acy) = ((c.x - a.x) as f64, (c.y - a.y) as f64);
                (abx * acy - aby * acx).abs()
            })
            .sum()
    }

    fn assert_area2(t: &Triangles, expected: i64) {
        let got = area2(t);
        assert!((got - expected as f64).abs() < 0.5, "area2 {got}, expected {expected}");
    }

    // ── degenerate input ─────────────────────────────────────────────────

    #[test]
    fn fewer_than_three_points_is_empty() {
        assert!(polygon_to_triangles(&[p(0, 0), p(1, 1)]).is_empty());
        assert!(polygon_to_triangles(&[]).is_empty());
    }

    #[test]
    fn collinear_points_are_empty() {
        assert!(polygon_to_triangles(&[p(0, 0), p(5, 5), p(10, 10), p(3, 3)]).is_empty());
    }

    #[test]
    fn duplicates_collapse_to_nothing() {
        assert!(polygon_to_triangles(&[p(4, 4), p(4, 4), p(4, 4)]).is_empty());
        assert!(polygon_to_triangles(&[p(4, 4), p(9, 4), p(4, 4)]).is_empty());
    }

    // ── simple polygons ──────────────────────────────────────────────────

    #[test]
    fn square_gives_two_triangles() {
        let t = polygon_to_triangles(&[p(0, 0), p(10, 0), p(10, 10), p(0, 10)]);
        assert_eq!(t.indices.len(), 6);
        assert_area2(&t, 200);
    }

    #[test]
    fn indices_stay_inside_the_vertex_list() {
        let t = polygon_to_triangles(&[p(0, 0), p(20, 0), p(20, 5), p(5, 5), p(5, 20), p(0, 20)]);
        assert!(!t.is_empty());
        assert_eq!(t.indices.len() % 3, 0);
        assert!(t.indices.iter().all(|&i| (i as usize) < t.vertices.len()));
    }

    #[test]
    fn closing_duplicate_and_collinear_vertex_are_ignored() {
        let t = polygon_to_triangles(&[p(0, 0), p(5, 0), p(10, 0), p(10, 10), p(0, 10), p(0, 0)]);
        assert_area2(&t, 200);
    }

    #[test]
    fn concave_polygon_area_is_preserved() {
        let l = [p(0, 0), p(20, 0), p(20, 5), p(5, 5), p(5, 20), p(0, 20)];
        assert_area2(&polygon_to_triangles(&l), signed_area2(&l).abs());
    }

    #[test]
    fn winding_does_not_matter() {
        let mut l = vec![p(0, 0), p(20, 0), p(20, 5), p(5, 5), p(5, 20), p(0, 20)];
        let a = area2(&polygon_to_triangles(&l));
        l.reverse();
        assert!((area2(&polygon_to_triangles(&l)) - a).abs() < 0.5);
    }

    // ── self-intersecting outlines ───────────────────────────────────────

    #[test]
    fn bowtie_fills_both_lobes() {
        // Net signed area is zero; each lobe covers 25 square pixels.
        let bowtie = [p(0, 0), p(10, 10), p(10, 0), p(0, 10)];
        assert_eq!(signed_area2(&bowtie), 0);
        let t = polygon_to_triangles(&bowtie);
        assert_area2(&t, 100);
        // The crossing at (5, 5) becomes a vertex.
        assert!(t.vertices.iter().any(|v| (v.x - 5.0).abs() < 1e-3 && (v.y - 5.0).abs() < 1e-3));
    }

    #[test]
    fn outline_touching_itself_still_fills() {
        // Two squares meeting at (10, 10), traced as one outline.
        let t = polygon_to_triangles(&[
            p(0, 0),
            p(10, 0),
            p(10, 10),
            p(20, 10),
            p(20, 20),
            p(10, 20),
            p(10, 10),
            p(0, 10),
        ]);
        assert_area2(&t, 400);
    }

    #[test]
    fn random_star_polygons_cover_their_area() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let n = rng.random_range(3..16);
            let step = std::f64::consts::TAU / n as f64;
            let poly: Vec<_> = (0..n)
                .map(|i| {
                    let a = (i as f64 + rng.random_range(0.2..0.8)) * step;
                    let r = rng.random_range(100.0..400.0);
                    p(500 + (a.cos() * r).round() as i32, 500 + (a.sin() * r).round() as i32)
                })
                .collect();

            assert_area2(&polygon_to_triangles(&poly), signed_area2(&poly).abs());
        }
    }
}
