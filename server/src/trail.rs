//! The wall a bike leaves behind it.
//!
//! A trail is the polyline `origin, verts[0], .., verts[n-1], end`. Vertices
//! are only ever appended, one per confirmed turn, and `end` follows the bike.
//! Since bikes only travel along the axes every segment is either horizontal
//! or vertical, which keeps the point test to two comparisons per segment.

use shared::{TrailSnapshot, TrailState, VertexSnapshot, TRAIL_EPSILON};

/// A point in arena coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns this point moved `distance` along the unit vector `dir`.
    pub fn offset(&self, (ux, uy): (f64, f64), distance: f64) -> Point {
        Point {
            x: self.x + ux * distance,
            y: self.y + uy * distance,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trail {
    state: TrailState,
    colour: String,
    origin: Point,
    verts: Vec<Point>,
    end: Point,
    /// Seconds left before a dead bike's trail stops colliding.
    retire_in: Option<f64>,
}

impl Trail {
    pub fn new(origin: Point, colour: impl Into<String>) -> Self {
        Self {
            state: TrailState::Active,
            colour: colour.into(),
            origin,
            verts: Vec::new(),
            end: origin,
            retire_in: None,
        }
    }

    pub fn state(&self) -> TrailState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TrailState::Active
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn verts(&self) -> &[Point] {
        &self.verts
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn colour(&self) -> &str {
        &self.colour
    }

    pub(crate) fn set_end(&mut self, end: Point) {
        self.end = end;
    }

    pub(crate) fn push_vertex(&mut self, vertex: Point) {
        self.verts.push(vertex);
        self.end = vertex;
    }

    /// Starts the grace countdown. Calling it again does not reset the clock.
    pub(crate) fn schedule_retirement(&mut self, grace: f64) {
        if self.is_active() && self.retire_in.is_none() {
            self.retire_in = Some(grace);
        }
    }

    /// Seconds left in the grace window, if one is running.
    pub fn retire_in(&self) -> Option<f64> {
        self.retire_in
    }

    /// Counts the grace window down by `dt`. Returns true when the trail
    /// went inactive on this call.
    pub(crate) fn elapse(&mut self, dt: f64) -> bool {
        match self.retire_in {
            Some(remaining) if remaining - dt <= 0.0 => {
                self.retire();
                true
            }
            Some(remaining) => {
                self.retire_in = Some(remaining - dt);
                false
            }
            None => false,
        }
    }

    fn retire(&mut self) {
        self.retire_in = None;
        self.state = TrailState::Inactive;
    }

    /// Returns true if `point` lies on any segment of this trail.
    pub fn on_trail(&self, point: Point) -> bool {
        self.on_trail_within(point, TRAIL_EPSILON)
    }

    pub fn on_trail_within(&self, point: Point, epsilon: f64) -> bool {
        self.crossed_within(point, point, epsilon)
    }

    /// Returns true if the straight move `from -> to` touches any segment of
    /// this trail. Both points must share an axis.
    pub fn crossed_by(&self, from: Point, to: Point) -> bool {
        self.crossed_within(from, to, TRAIL_EPSILON)
    }

    fn crossed_within(&self, from: Point, to: Point, epsilon: f64) -> bool {
        let mut start = self.origin;
        for &next in self.verts.iter().chain(std::iter::once(&self.end)) {
            if path_meets_segment(from, to, start, next, epsilon) {
                return true;
            }
            start = next;
        }
        false
    }

    pub fn snapshot(&self) -> TrailSnapshot {
        TrailSnapshot {
            state: self.state,
            colour: self.colour.clone(),
            start_x: self.origin.x,
            start_y: self.origin.y,
            verts: self
                .verts
                .iter()
                .map(|v| VertexSnapshot { x: v.x, y: v.y })
                .collect(),
            end_x: self.end.x,
            end_y: self.end.y,
        }
    }
}

/// Axis-aligned segment test for the path `from -> to` (a single point when
/// the two are equal). Along the segment the path must overlap the open
/// interval between its endpoints; across it the path must come within
/// `epsilon` of the segment's line. A zero-length segment never matches.
fn path_meets_segment(from: Point, to: Point, a: Point, b: Point, epsilon: f64) -> bool {
    let (x_lo, x_hi) = ordered(from.x, to.x);
    let (y_lo, y_hi) = ordered(from.y, to.y);

    if a.x != b.x {
        let (lo, hi) = ordered(a.x, b.x);
        let gap = (a.y.clamp(y_lo, y_hi) - a.y).abs();
        return gap < epsilon && lo < x_hi && x_lo < hi;
    }
    if a.y != b.y {
        let (lo, hi) = ordered(a.y, b.y);
        let gap = (a.x.clamp(x_lo, x_hi) - a.x).abs();
        return gap < epsilon && lo < y_hi && y_lo < hi;
    }
    false
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
