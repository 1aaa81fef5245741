//! Barnes–Hut quadtree for approximate pairwise repulsion.

use scorigami_core::types::Position;

const MAX_DEPTH: u8 = 24;

#[derive(Debug, Clone)]
struct Cell {
    cx: f64,
    cy: f64,
    half: f64,
    depth: u8,
    mass: f64,
    mass_x: f64,
    mass_y: f64,
    children: Option<[usize; 4]>,
    /// Bodies held by a leaf. More than one only at `MAX_DEPTH`.
    members: Vec<usize>,
}

impl Cell {
    fn new(cx: f64, cy: f64, half: f64, depth: u8) -> Self {
        Self {
            cx,
            cy,
            half,
            depth,
            mass: 0.0,
            mass_x: 0.0,
            mass_y: 0.0,
            children: None,
            members: Vec::new(),
        }
    }

    fn quadrant(&self, p: &Position) -> usize {
        let east = usize::from(p.x >= self.cx);
        let south = usize::from(p.y >= self.cy);
        east | (south << 1)
    }

    fn contains(&self, p: &Position) -> bool {
        (p.x - self.cx).abs() <= self.half && (p.y - self.cy).abs() <= self.half
    }

    fn add_mass(&mut self, p: &Position, m: f64) {
        self.mass += m;
        self.mass_x += m * p.x;
        self.mass_y += m * p.y;
    }
}

/// Quadtree over a fixed set of weighted points.
#[derive(Debug, Clone)]
pub struct QuadTree {
    cells: Vec<Cell>,
}

impl QuadTree {
    /// Build over `points` with per-point `masses` (same length).
    pub fn build(points: &[Position], masses: &[f64]) -> Self {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if points.is_empty() {
            (min_x, min_y, max_x, max_y) = (0.0, 0.0, 0.0, 0.0);
        }
        let half = ((max_x - min_x).max(max_y - min_y) / 2.0).max(1.0) * 1.01;
        let root = Cell::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0, half, 0);

        let mut tree = Self {
            cells: Vec::with_capacity(points.len() * 2 + 1),
        };
        tree.cells.push(root);
        for i in 0..points.len() {
            tree.insert(i, points, masses);
        }
        tree
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn total_mass(&self) -> f64 {
        self.cells.first().map_or(0.0, |c| c.mass)
    }

    fn insert(&mut self, i: usize, points: &[Position], masses: &[f64]) {
        let p = points[i];
        let mass = mass_of(masses, i);
        let mut c = 0;
        loop {
            let was_empty = self.cells[c].members.is_empty() && self.cells[c].children.is_none();
            self.cells[c].add_mass(&p, mass);

            if was_empty {
                self.cells[c].members.push(i);
                return;
            }
            if let Some(children) = self.cells[c].children {
                c = children[self.cells[c].quadrant(&p)];
                continue;
            }
            if self.cells[c].depth >= MAX_DEPTH {
                self.cells[c].members.push(i);
                return;
            }

            // split the leaf and push its member down one level
            let children = self.split(c);
            let members = std::mem::take(&mut self.cells[c].members);
            for j in members {
                let q = points[j];
                let child = children[self.cells[c].quadrant(&q)];
                self.cells[child].add_mass(&q, mass_of(masses, j));
                self.cells[child].members.push(j);
            }
            c = children[self.cells[c].quadrant(&p)];
        }
    }

    fn split(&mut self, c: usize) -> [usize; 4] {
        let (cx, cy, half, depth) = {
            let cell = &self.cells[c];
            (cell.cx, cell.cy, cell.half / 2.0, cell.depth + 1)
        };
        let base = self.cells.len();
        for q in 0..4 {
            let dx = if q & 1 == 1 { half } else { -half };
            let dy = if q & 2 == 2 { half } else { -half };
            self.cells.push(Cell::new(cx + dx, cy + dy, half, depth));
        }
        let children = [base, base + 1, base + 2, base + 3];
        self.cells[c].children = Some(children);
        children
    }

    /// Approximate repulsion on body `i` at `p` with mass `m`.
    ///
    /// Pairwise force follows ForceAtlas2: magnitude `k · mᵢ · mⱼ / d`,
    /// pointing away from the other body. A cell whose width over distance
    /// is below `theta` is treated as one body at its centre of mass, unless
    /// it holds `p` itself; those cells are always opened so body `i` never
    /// pushes on itself.
    #[allow(clippy::too_many_arguments)]
    pub fn repulsion(
        &self,
        i: usize,
        p: &Position,
        m: f64,
        theta: f64,
        k: f64,
        points: &[Position],
        masses: &[f64],
    ) -> (f64, f64) {
        let mut fx = 0.0;
        let mut fy = 0.0;
        if self.cells.is_empty() {
            return (fx, fy);
        }

        let mut stack = vec![0usize];
        while let Some(c) = stack.pop() {
            let cell = &self.cells[c];
            if cell.mass == 0.0 {
                continue;
            }

            match cell.children {
                None => {
                    for &j in &cell.members {
                        if j == i {
                            continue;
                        }
                        let q = points[j];
                        apply(&mut fx, &mut fy, p.x - q.x, p.y - q.y, k * m * mass_of(masses, j));
                    }
                }
                Some(children) => {
                    let com_x = cell.mass_x / cell.mass;
                    let com_y = cell.mass_y / cell.mass;
                    let dx = p.x - com_x;
                    let dy = p.y - com_y;
                    let dist = (dx * dx + dy * dy).sqrt();
                    if dist > 0.0 && (cell.half * 2.0) / dist < theta && !cell.contains(p) {
                        apply(&mut fx, &mut fy, dx, dy, k * m * cell.mass);
                    } else {
                        stack.extend_from_slice(&children);
                    }
                }
            }
        }
        (fx, fy)
    }
}

fn mass_of(masses: &[f64], i: usize) -> f64 {
    masses.get(i).copied().unwrap_or(1.0)
}

fn apply(fx: &mut f64, fy: &mut f64, dx: f64, dy: f64, coefficient: f64) {
    let d2 = dx * dx + dy * dy;
    if d2 < 1e-12 {
        return;
    }
    let factor = coefficient / d2;
    *fx += dx * factor;
    *fy += dy * factor;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(i: usize, points: &[Position], masses: &[f64], k: f64) -> (f64, f64) {
        let (mut fx, mut fy) = (0.0, 0.0);
        for (j, q) in points.iter().enumerate() {
            if j != i {
                let p = points[i];
                apply(&mut fx, &mut fy, p.x - q.x, p.y - q.y, k * masses[i] * masses[j]);
            }
        }
        (fx, fy)
    }

    fn grid(n: usize) -> Vec<Position> {
        (0..n)
            .map(|i| Position::new((i % 17) as f64 * 13.0, (i / 17) as f64 * 11.0 + (i % 3) as f64))
            .collect()
    }

    #[test]
    fn theta_zero_matches_exact_forces() {
        let points = grid(120);
        let masses: Vec<f64> = (0..points.len()).map(|i| 1.0 + (i % 4) as f64).collect();
        let tree = QuadTree::build(&points, &masses);
        assert!((tree.total_mass() - masses.iter().sum::<f64>()).abs() < 1e-9);

        for i in [0, 7, 60, 119] {
            let (ax, ay) = tree.repulsion(i, &points[i], masses[i], 0.0, 10.0, &points, &masses);
            let (ex, ey) = exact(i, &points, &masses, 10.0);
            assert!((ax - ex).abs() < 1e-6 * ex.abs().max(1.0), "x for {}", i);
            assert!((ay - ey).abs() < 1e-6 * ey.abs().max(1.0), "y for {}", i);
        }
    }

    #[test]
    fn coarse_theta_stays_close() {
        let points = grid(400);
        let masses = vec![1.0; points.len()];
        let tree = QuadTree::build(&points, &masses);
        let (ax, ay) = tree.repulsion(5, &points[5], 1.0, 0.8, 1.0, &points, &masses);
        let (ex, ey) = exact(5, &points, &masses, 1.0);
        let err = ((ax - ex).powi(2) + (ay - ey).powi(2)).sqrt();
        let norm = (ex * ex + ey * ey).sqrt();
        assert!(err / norm < 0.25, "relative error {}", err / norm);
    }

    #[test]
    fn own_cell_is_never_approximated() {
        let points = vec![
            Position::new(0.0, 0.0),
            Position::new(100.0, 0.0),
            Position::new(100.0, 100.0),
        ];
        let masses = vec![5.0, 1.0, 1.0];
        let tree = QuadTree::build(&points, &masses);

        // a theta this wide would collapse the root if it were allowed to
        let (ax, ay) = tree.repulsion(0, &points[0], 5.0, 100.0, 1.0, &points, &masses);
        let (ex, ey) = exact(0, &points, &masses, 1.0);
        assert!((ax - ex).abs() < 1e-9, "x {} vs {}", ax, ex);
        assert!((ay - ey).abs() < 1e-9, "y {} vs {}", ay, ey);
    }

    #[test]
    fn coincident_points_do_not_recurse_forever() {
        let points = vec![Position::new(3.0, 3.0); 50];
        let masses = vec![1.0; 50];
        let tree = QuadTree::build(&points, &masses);
        assert_eq!(tree.total_mass(), 50.0);
        assert_eq!(tree.repulsion(0, &points[0], 1.0, 0.5, 1.0, &points, &masses), (0.0, 0.0));
    }
}
