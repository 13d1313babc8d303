use imageproc::point::Point;

/// Area enclosed by a contour polygon, by the shoelace formula.
///
/// The polygon is implicitly closed (last point connects back to the first).
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut twice_area: i64 = 0;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }

    (twice_area.abs() as f64) / 2.0
}

/// Axis-aligned bounding rectangle `(x, y, width, height)` of a point set.
///
/// Width and height are inclusive pixel counts: a single point has a 1x1 rectangle.
pub fn bounding_rect(points: &[Point<i32>]) -> Option<(i32, i32, i32, i32)> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Convex hull of a point set, as a counter-clockwise polygon (Andrew's
/// monotone chain).
pub fn convex_hull(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let mut sorted: Vec<Point<i32>> = points.to_vec();
    sorted.sort_by(|a, b| (a.x, a.y).cmp(&(b.x, b.y)));
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    fn cross(o: Point<i32>, a: Point<i32>, b: Point<i32>) -> i64 {
        (a.x as i64 - o.x as i64) * (b.y as i64 - o.y as i64)
            - (a.y as i64 - o.y as i64) * (b.x as i64 - o.x as i64)
    }

    let mut hull: Vec<Point<i32>> = Vec::with_capacity(sorted.len() * 2);

    // Lower hull
    for &p in &sorted {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }

    // Upper hull
    let lower_len = hull.len() + 1;
    for &p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }

    hull.pop();
    hull
}

/// Angle, in degrees within `(-90, 90]`, of the minimum-area rectangle enclosing
/// a point set (rotating calipers over the convex hull).
///
/// The returned angle is the inclination of the rectangle's reference edge; it is
/// inherently ambiguous modulo 90 degrees, callers must normalize it for their use.
pub fn min_area_rect_angle(points: &[Point<i32>]) -> Option<f64> {
    let hull = convex_hull(points);

    if hull.len() < 2 {
        return None;
    }
    if hull.len() == 2 {
        let dx = (hull[1].x - hull[0].x) as f64;
        let dy = (hull[1].y - hull[0].y) as f64;
        return Some(normalize_half_turn(dy.atan2(dx).to_degrees()));
    }

    let mut best_area = f64::INFINITY;
    let mut best_angle = 0.0;

    for i in 0..hull.len() {
        let p = hull[i];
        let q = hull[(i + 1) % hull.len()];
        let angle = ((q.y - p.y) as f64).atan2((q.x - p.x) as f64);

        let (sin, cos) = angle.sin_cos();
        let (mut min_u, mut max_u) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_v, mut max_v) = (f64::INFINITY, f64::NEG_INFINITY);

        // Project every hull point on the edge direction and its normal
        for h in &hull {
            let u = h.x as f64 * cos + h.y as f64 * sin;
            let v = -(h.x as f64) * sin + h.y as f64 * cos;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }

        let area = (max_u - min_u) * (max_v - min_v);
        if area < best_area {
            best_area = area;
            best_angle = angle.to_degrees();
        }
    }

    Some(normalize_half_turn(best_angle))
}

/// Brings an angle in degrees into `(-90, 90]`
fn normalize_half_turn(mut angle: f64) -> f64 {
    while angle > 90.0 {
        angle -= 180.0;
    }
    while angle <= -90.0 {
        angle += 180.0;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> Point<i32> {
        Point::new(x, y)
    }

    #[test]
    fn polygon_area_of_a_square() {
        let square = [p(0, 0), p(10, 0), p(10, 10), p(0, 10)];
        assert_eq!(polygon_area(&square), 100.0);
    }

    #[test]
    fn polygon_area_of_a_degenerate_contour_is_zero() {
        assert_eq!(polygon_area(&[p(0, 0), p(10, 0)]), 0.0);
    }

    #[test]
    fn bounding_rect_spans_min_to_max_inclusive() {
        let points = [p(3, 7), p(12, 2), p(5, 9)];
        assert_eq!(bounding_rect(&points), Some((3, 2, 10, 8)));
    }

    #[test]
    fn bounding_rect_of_nothing_is_none() {
        assert_eq!(bounding_rect(&[]), None);
    }

    #[test]
    fn convex_hull_drops_interior_points() {
        let points = [p(0, 0), p(10, 0), p(10, 10), p(0, 10), p(5, 5)];
        let hull = convex_hull(&points);

        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&p(5, 5)));
    }

    #[test]
    fn min_area_rect_angle_of_an_axis_aligned_rectangle_is_a_quarter_turn_multiple() {
        let rect = [p(0, 0), p(40, 0), p(40, 20), p(0, 20)];
        let angle = min_area_rect_angle(&rect).unwrap();
        assert!(
            angle.abs() < 1e-6 || (angle - 90.0).abs() < 1e-6,
            "unexpected angle {angle}"
        );
    }

    #[test]
    fn min_area_rect_angle_follows_a_tilted_rectangle() {
        // Rectangle rotated by 30 degrees
        let (sin, cos) = 30f64.to_radians().sin_cos();
        let corners: Vec<Point<i32>> = [(0.0, 0.0), (100.0, 0.0), (100.0, 40.0), (0.0, 40.0)]
            .iter()
            .map(|(x, y): &(f64, f64)| {
                p(
                    (x * cos - y * sin).round() as i32,
                    (x * sin + y * cos).round() as i32,
                )
            })
            .collect();

        let angle = min_area_rect_angle(&corners).unwrap();
        // Either the long or the short edge may be reported: 30 or -60 degrees
        assert!(
            (angle - 30.0).abs() < 1.0 || (angle + 60.0).abs() < 1.0,
            "unexpected angle {angle}"
        );
    }
}
