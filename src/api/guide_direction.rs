/// The direction in which a guide pulse moves the mount.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum GuideDirection {
    /// North (+ declination/altitude).
    North = 0,

    /// South (- declination/altitude).
    South = 1,

    /// East (+ right ascension/azimuth).
    East = 2,

    /// West (- right ascension/azimuth).
    West = 3,
}

impl GuideDirection {
    /// All directions, in pulse-guide test order.
    pub const ALL: [Self; 4] = [Self::North, Self::South, Self::East, Self::West];
}
