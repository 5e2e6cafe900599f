//! Incremental Delaunay triangulation (Bowyer-Watson).
//!
//! Points are normalized into the unit square before insertion so the
//! in-circle tolerance does not depend on world scale. Output triangles index
//! the input slice and are counter-clockwise in (x, y).
//!
//! Triangles keep their edge neighbors. Each insertion walks from the last
//! created triangle to the one containing the point and grows the cavity
//! through neighbors, so the cost per point stays local to the point.

use std::collections::HashMap;

use glam::DVec2;

/// Tolerance of the in-circle test on normalized coordinates
const INCIRCLE_EPSILON: f64 = 1e-12;

/// Squared normalized distance under which two points are the same point
const COINCIDENT_EPSILON: f64 = 1e-24;

/// Distance of the enclosing triangle's vertices from the unit square center
const SUPER_RADIUS: f64 = 1.0e3;

/// No triangle across this edge
const NONE: usize = usize::MAX;

/// Counter-clockwise triangle over input indices
pub type Triangle = [usize; 3];

/// Triangle soup with edge adjacency.
///
/// `neighbors[t][k]` is the triangle across edge `(tri[k], tri[k + 1])`.
/// Slots of removed triangles are recycled through `free`.
struct Mesh {
    verts: Vec<DVec2>,
    triangles: Vec<Triangle>,
    neighbors: Vec<[usize; 3]>,
    alive: Vec<bool>,
    free: Vec<usize>,
    /// Insertion that last put a triangle in the cavity
    visited: Vec<usize>,
}

impl Mesh {
    fn point(&self, v: usize) -> DVec2 {
        self.verts[v]
    }

    fn allocate(&mut self, tri: Triangle) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.triangles[slot] = tri;
                self.neighbors[slot] = [NONE; 3];
                self.alive[slot] = true;
                slot
            }
            None => {
                self.triangles.push(tri);
                self.neighbors.push([NONE; 3]);
                self.alive.push(true);
                self.visited.push(usize::MAX);
                self.triangles.len() - 1
            }
        }
    }

    /// Whether `p` lies inside or on triangle `t`
    fn contains(&self, t: usize, p: DVec2) -> bool {
        let [a, b, c] = self.triangles[t];
        let (a, b, c) = (self.point(a), self.point(b), self.point(c));
        orient(a, b, p) >= 0.0 && orient(b, c, p) >= 0.0 && orient(c, a, p) >= 0.0
    }

    /// Triangle containing `p`, walking from `start`
    fn locate(&self, start: usize, p: DVec2) -> Option<usize> {
        let mut t = start;
        let mut steps = 0;
        'walk: while steps <= self.triangles.len() {
            let tri = self.triangles[t];
            for k in 0..3 {
                // Rotate the first edge tried so the walk cannot cycle
                let e = (k + steps) % 3;
                if orient(self.point(tri[e]), self.point(tri[(e + 1) % 3]), p) < 0.0 {
                    let next = self.neighbors[t][e];
                    if next == NONE {
                        break 'walk;
                    }
                    t = next;
                    steps += 1;
                    continue 'walk;
                }
            }
            return Some(t);
        }

        (0..self.triangles.len()).find(|&t| self.alive[t] && self.contains(t, p))
    }

    fn in_circumcircle(&self, t: usize, p: DVec2) -> bool {
        let [a, b, c] = self.triangles[t];
        in_circumcircle(self.point(a), self.point(b), self.point(c), p)
    }

    /// Insert vertex `i`, starting the point location at `hint`.
    ///
    /// Returns a triangle touching the new vertex, or `None` when the vertex
    /// was skipped.
    fn insert(&mut self, i: usize, hint: usize, links: &mut HashMap<usize, usize>) -> Option<usize> {
        let p = self.point(i);
        let start = self.locate(hint, p)?;
        let tri = self.triangles[start];
        if tri.iter().any(|&v| (self.point(v) - p).length_squared() <= COINCIDENT_EPSILON) {
            return None;
        }

        // Flood the cavity. A neighbor joins when its circumcircle holds `p`,
        // or when `p` does not lie strictly left of the shared edge, which
        // would leave a flat or flipped triangle on the cavity boundary.
        let mut cavity = vec![start];
        let mut stack = vec![start];
        self.visited[start] = i;
        while let Some(t) = stack.pop() {
            let tri = self.triangles[t];
            for k in 0..3 {
                let n = self.neighbors[t][k];
                if n == NONE || self.visited[n] == i {
                    continue;
                }
                let (a, b) = (self.point(tri[k]), self.point(tri[(k + 1) % 3]));
                if self.in_circumcircle(n, p) || orient(a, b, p) <= 0.0 {
                    self.visited[n] = i;
                    cavity.push(n);
                    stack.push(n);
                }
            }
        }

        // Boundary edges with the triangle outside each of them
        let mut boundary = Vec::new();
        for &t in &cavity {
            let tri = self.triangles[t];
            for k in 0..3 {
                let n = self.neighbors[t][k];
                if n == NONE || self.visited[n] != i {
                    boundary.push((tri[k], tri[(k + 1) % 3], n));
                }
            }
        }

        for &t in &cavity {
            self.alive[t] = false;
            self.free.push(t);
        }

        // Fan the boundary around `p`. Each new triangle (a, b, p) meets the
        // fan triangle starting at `b` across (b, p).
        links.clear();
        let mut created = Vec::with_capacity(boundary.len());
        for &(a, b, outer) in &boundary {
            let t = self.allocate([a, b, i]);
            self.neighbors[t][0] = outer;
            if outer != NONE {
                let otri = self.triangles[outer];
                for k in 0..3 {
                    if otri[k] == b && otri[(k + 1) % 3] == a {
                        self.neighbors[outer][k] = t;
                    }
                }
            }
            links.insert(a, t);
            created.push((t, b));
        }
        for &(t, b) in &created {
            if let Some(&next) = links.get(&b) {
                self.neighbors[t][1] = next;
                self.neighbors[next][2] = t;
            }
        }

        created.first().map(|&(t, _)| t)
    }
}

/// Triangulate `points`.
///
/// Points that coincide with an already inserted point, or that are not
/// finite, are skipped, so they appear in no triangle. Fewer than three
/// points, or a fully degenerate set, produce no triangles.
pub fn triangulate(points: &[DVec2]) -> Vec<Triangle> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    let (min, max) = points
        .iter()
        .filter(|p| p.is_finite())
        .fold((DVec2::splat(f64::MAX), DVec2::splat(f64::MIN)), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
    let extent = (max - min).max_element();
    if !(extent > 0.0) || !extent.is_finite() {
        return Vec::new();
    }

    let mut verts: Vec<DVec2> = points.iter().map(|p| (*p - min) / extent).collect();
    let center = DVec2::splat(0.5);
    for k in 0..3 {
        let angle = std::f64::consts::FRAC_PI_2 + k as f64 * std::f64::consts::TAU / 3.0;
        verts.push(center + DVec2::new(angle.cos(), angle.sin()) * SUPER_RADIUS);
    }

    let mut mesh = Mesh {
        verts,
        triangles: Vec::with_capacity(2 * n + 1),
        neighbors: Vec::with_capacity(2 * n + 1),
        alive: Vec::with_capacity(2 * n + 1),
        free: Vec::new(),
        visited: Vec::with_capacity(2 * n + 1),
    };
    let mut hint = mesh.allocate([n, n + 1, n + 2]);
    let mut links = HashMap::new();

    for i in 0..n {
        if !mesh.point(i).is_finite() {
            continue;
        }
        if let Some(t) = mesh.insert(i, hint, &mut links) {
            hint = t;
        }
    }

    mesh.triangles
        .iter()
        .zip(&mesh.alive)
        .filter(|(t, alive)| **alive && t.iter().all(|&v| v < n))
        .map(|(t, _)| *t)
        .collect()
}


/// Whether `p` lies strictly inside the circumcircle of counter-clockwise `(a, b, c)`
fn in_circumcircle(a: DVec2, b: DVec2, c: DVec2, p: DVec2) -> bool {
    let ad = a - p;
    let bd = b - p;
    let cd = c - p;
    let det = ad.length_squared() * bd.perp_dot(cd)
        + bd.length_squared() * cd.perp_dot(ad)
        + cd.length_squared() * ad.perp_dot(bd);
    det > INCIRCLE_EPSILON
}

/// Twice the signed area of `(a, b, c)`, positive when counter-clockwise
pub fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}
