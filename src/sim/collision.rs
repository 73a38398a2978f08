//! Overlap tests between the player, terrain hazards and projectiles
//!
//! Everything here is a pure predicate. The engine decides what a hit means.

use glam::Vec2;

/// Axis-aligned rectangle (top-left origin, Y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_top_left(pos: Vec2, width: f32, height: f32) -> Self {
        Self {
            min: pos,
            max: pos + Vec2::new(width, height),
        }
    }

    /// Square bounding box of a circle
    pub fn around_circle(center: Vec2, radius: f32) -> Self {
        Self {
            min: center - Vec2::splat(radius),
            max: center + Vec2::splat(radius),
        }
    }

    /// Strict overlap on both axes (touching edges do not count)
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.max.x > other.min.x
            && self.min.x < other.max.x
            && self.max.y > other.min.y
            && self.min.y < other.max.y
    }

    /// Closest point inside the box to `p`
    #[inline]
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }
}

/// Circle vs circle: center distance below the sum of radii
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) < r * r
}

/// Circle vs box
#[inline]
pub fn circle_box_overlap(center: Vec2, radius: f32, aabb: &Aabb) -> bool {
    center.distance_squared(aabb.closest_point(center)) < radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_overlap() {
        let a = Aabb::from_top_left(Vec2::new(0.0, 0.0), 10.0, 10.0);
        let b = Aabb::from_top_left(Vec2::new(5.0, 5.0), 10.0, 10.0);
        let c = Aabb::from_top_left(Vec2::new(20.0, 0.0), 10.0, 10.0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_aabb_touching_edges_do_not_overlap() {
        let a = Aabb::from_top_left(Vec2::new(0.0, 0.0), 10.0, 10.0);
        let b = Aabb::from_top_left(Vec2::new(10.0, 0.0), 10.0, 10.0);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_player_box_vs_obstacle() {
        // Player circle r=30 at (240, 500) vs obstacle whose top is just above the player's bottom
        let player = Aabb::around_circle(Vec2::new(240.0, 500.0), 30.0);
        let obstacle = Aabb::from_top_left(Vec2::new(260.0, 525.0), 40.0, 60.0);
        assert!(player.overlaps(&obstacle));
        let below = Aabb::from_top_left(Vec2::new(260.0, 531.0), 40.0, 60.0);
        assert!(!player.overlaps(&below));
    }

    #[test]
    fn test_circles_overlap() {
        assert!(circles_overlap(Vec2::ZERO, 30.0, Vec2::new(60.0, 0.0), 35.0));
        assert!(!circles_overlap(Vec2::ZERO, 30.0, Vec2::new(65.0, 0.0), 35.0));
        // Diagonal: distance ~70.7 > 65
        assert!(!circles_overlap(Vec2::ZERO, 30.0, Vec2::new(50.0, 50.0), 35.0));
    }

    #[test]
    fn test_circle_box_overlap_corner() {
        let aabb = Aabb::from_top_left(Vec2::new(100.0, 100.0), 40.0, 40.0);
        // Near the corner but outside the rounded reach
        assert!(!circle_box_overlap(Vec2::new(90.0, 90.0), 10.0, &aabb));
        assert!(circle_box_overlap(Vec2::new(95.0, 95.0), 10.0, &aabb));
        // Center inside the box
        assert!(circle_box_overlap(Vec2::new(120.0, 120.0), 1.0, &aabb));
    }
}
