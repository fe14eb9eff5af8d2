/// An inclusive rectangle of block columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_z: i32,
    pub max_z: i32,
}

impl PlotBounds {
    pub fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    /// The horizontal centre, as used for teleports.
    pub fn center(&self) -> (f64, f64) {
        let x = self.min_x as f64 + (self.max_x - self.min_x + 1) as f64 / 2.0;
        let z = self.min_z as f64 + (self.max_z - self.min_z + 1) as f64 / 2.0;
        (x, z)
    }
}
