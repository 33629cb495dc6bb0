//! CPU-side geometry for the canvas.
//!
//! - polygon fill tessellation (lyon)
//! - thick-stroke expansion into triangle strips
//! - the precomputed donut table used for annuli
//! - arc, segment, annulus and keyhole outlines

pub mod donut;
pub mod outline;
pub mod stroke;
pub mod triangulate;

pub use donut::{angle_to_donut_vertex, angle_to_donut_vertices, donut_strips, DonutVertices, CIRCLE_SIZE, MAX_ANGLE};
pub use outline::{annulus_points, arc_points, keyhole_points, round_rect_points, segment_points};
pub use stroke::line_to_triangles;
pub use triangulate::{polygon_to_triangles, Triangles};
