/// Classifies block columns of a plot world into plot and road.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotGrid {
    plot_size: i32,
    total_size: i32,
}

impl PlotGrid {
    pub fn new(plot_size: i32, road_size: i32) -> PlotGrid {
        let plot_size = plot_size.max(1);
        PlotGrid {
            plot_size,
            total_size: plot_size + road_size.max(0),
        }
    }

    /// Same alignment as the plot lookup, so negative coordinates line up.
    fn dif(&self, coord: i32) -> i32 {
        let raw = (coord + 1) % self.total_size;
        if coord >= 0 { raw } else { self.total_size + raw }
    }

    fn is_road_dif(&self, dif: i32) -> bool {
        dif > self.plot_size || dif == 0
    }

    fn is_edge_dif(&self, dif: i32) -> bool {
        dif == 0 || dif == self.plot_size + 1 || dif == self.total_size
    }

    pub fn is_road(&self, x: i32, z: i32) -> bool {
        self.is_road_dif(self.dif(x)) || self.is_road_dif(self.dif(z))
    }

    /// A road column next to plot area along exactly one axis.
    pub fn is_road_edge(&self, x: i32, z: i32) -> bool {
        let (dif_x, dif_z) = (self.dif(x), self.dif(z));
        let road_x = self.is_road_dif(dif_x);
        let road_z = self.is_road_dif(dif_z);
        if road_x == road_z {
            return false;
        }
        (road_x && self.is_edge_dif(dif_x)) || (road_z && self.is_edge_dif(dif_z))
    }

    /// Where two road edges cross.
    pub fn is_road_corner(&self, x: i32, z: i32) -> bool {
        let (dif_x, dif_z) = (self.dif(x), self.dif(z));
        self.is_road_dif(dif_x)
            && self.is_road_dif(dif_z)
            && self.is_edge_dif(dif_x)
            && self.is_edge_dif(dif_z)
    }
}
