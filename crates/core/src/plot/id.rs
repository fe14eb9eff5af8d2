use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use thiserror::Error;

/// Grid coordinate of a plot cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PlotId {
    pub x: i32,
    pub z: i32,
}

impl PlotId {
    pub const fn new(x: i32, z: i32) -> PlotId {
        PlotId { x, z }
    }

    pub fn offset(self, dx: i32, dz: i32) -> PlotId {
        PlotId::new(self.x + dx, self.z + dz)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlotIdParseError {
    #[error("invalid plot id {0:?}: expected x;z")]
    MissingSeparator(String),

    #[error("invalid plot id coordinate")]
    Coordinate(#[from] ParseIntError),
}

impl FromStr for PlotId {
    type Err = PlotIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, z) = s
            .split_once(';')
            .ok_or_else(|| PlotIdParseError::MissingSeparator(s.to_owned()))?;
        Ok(PlotId::new(x.parse()?, z.parse()?))
    }
}

impl fmt::Display for PlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.x, self.z)
    }
}

impl From<(i32, i32)> for PlotId {
    fn from((x, z): (i32, i32)) -> PlotId {
        PlotId::new(x, z)
    }
}

impl From<PlotId> for (i32, i32) {
    fn from(id: PlotId) -> (i32, i32) {
        (id.x, id.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!("3;-4".parse(), Ok(PlotId::new(3, -4)));
        assert_eq!("0;0".parse(), Ok(PlotId::new(0, 0)));
        assert!(matches!(
            "3".parse::<PlotId>(),
            Err(PlotIdParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            "a;1".parse::<PlotId>(),
            Err(PlotIdParseError::Coordinate(_))
        ));
        // Only the first separator splits.
        assert!("1;2;3".parse::<PlotId>().is_err());
    }

    #[test]
    fn display() {
        assert_eq!(PlotId::new(-7, 12).to_string(), "-7;12");
    }
}
