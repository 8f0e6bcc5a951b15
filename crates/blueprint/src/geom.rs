//! Coordinate transforms for blueprint placement.
//!
//! All placement geometry is a mirror step followed by a rotation around a
//! pivot column `(px, pz)`. Y is never transformed. The integer form works on
//! cell coordinates; the float form is used for entity positions and reflects
//! across cell centers (`1.0 - c`) so sub-cell offsets stay continuous.

use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};

/// Mirror applied before rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Mirror {
    #[default]
    None,
    /// Reflects along Z (`z' = -z`).
    LeftRight,
    /// Reflects along X (`x' = -x`).
    FrontBack,
}

/// Quarter-turn rotation around the Y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Ccw90,
}

impl Rotation {
    /// The rotation that undoes this one.
    pub fn inverse(self) -> Rotation {
        match self {
            Rotation::None => Rotation::None,
            Rotation::Cw90 => Rotation::Ccw90,
            Rotation::Cw180 => Rotation::Cw180,
            Rotation::Ccw90 => Rotation::Cw90,
        }
    }

    /// Yaw in degrees added to an entity's facing by this rotation.
    pub fn yaw_offset(self) -> f64 {
        match self {
            Rotation::None => 0.0,
            Rotation::Cw90 => 90.0,
            Rotation::Cw180 => 180.0,
            Rotation::Ccw90 => 270.0,
        }
    }

    pub fn rotate_direction(self, dir: Direction) -> Direction {
        if dir.is_vertical() {
            return dir;
        }
        match self {
            Rotation::None => dir,
            Rotation::Cw90 => dir.clockwise(),
            Rotation::Cw180 => dir.clockwise().clockwise(),
            Rotation::Ccw90 => dir.clockwise().clockwise().clockwise(),
        }
    }
}

impl Mirror {
    pub fn mirror_direction(self, dir: Direction) -> Direction {
        match (self, dir) {
            (Mirror::LeftRight, Direction::North) => Direction::South,
            (Mirror::LeftRight, Direction::South) => Direction::North,
            (Mirror::FrontBack, Direction::East) => Direction::West,
            (Mirror::FrontBack, Direction::West) => Direction::East,
            _ => dir,
        }
    }

    /// Mirrored entity yaw in degrees.
    pub fn mirror_yaw(self, yaw: f64) -> f64 {
        match self {
            Mirror::None => yaw,
            Mirror::LeftRight => 180.0 - yaw,
            Mirror::FrontBack => -yaw,
        }
    }
}

/// The six cell-face directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// The four horizontal directions.
    pub const LATERAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    pub fn offset(self) -> IVec3 {
        match self {
            Direction::Down => IVec3::new(0, -1, 0),
            Direction::Up => IVec3::new(0, 1, 0),
            Direction::North => IVec3::new(0, 0, -1),
            Direction::South => IVec3::new(0, 0, 1),
            Direction::West => IVec3::new(-1, 0, 0),
            Direction::East => IVec3::new(1, 0, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    fn clockwise(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            other => other,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Up => "up",
            Direction::North => "north",
            Direction::South => "south",
            Direction::West => "west",
            Direction::East => "east",
        }
    }

    pub fn from_name(name: &str) -> Option<Direction> {
        Direction::ALL.into_iter().find(|d| d.name() == name)
    }
}

/// Transforms a cell coordinate: mirror first, then rotate around the pivot
/// column `(pivot.x, pivot.z)`.
pub fn transform_point(p: IVec3, mirror: Mirror, rotation: Rotation, pivot: IVec3) -> IVec3 {
    let (mut x, y, mut z) = (p.x, p.y, p.z);
    match mirror {
        Mirror::None => {}
        Mirror::LeftRight => z = -z,
        Mirror::FrontBack => x = -x,
    }
    let (px, pz) = (pivot.x, pivot.z);
    match rotation {
        Rotation::None => IVec3::new(x, y, z),
        Rotation::Ccw90 => IVec3::new(px - pz + z, y, px + pz - x),
        Rotation::Cw90 => IVec3::new(px + pz - z, y, pz - px + x),
        Rotation::Cw180 => IVec3::new(px + px - x, y, pz + pz - z),
    }
}

/// Float-coordinate transform for entity positions. Mirroring reflects across
/// the cell center (`1.0 - c`) instead of negating, so an entity standing a
/// quarter of the way into a cell stays a quarter of the way in.
pub fn transform_point_f(p: DVec3, mirror: Mirror, rotation: Rotation, pivot: IVec3) -> DVec3 {
    let (mut x, y, mut z) = (p.x, p.y, p.z);
    match mirror {
        Mirror::None => {}
        Mirror::LeftRight => z = 1.0 - z,
        Mirror::FrontBack => x = 1.0 - x,
    }
    let (px, pz) = (pivot.x as f64, pivot.z as f64);
    match rotation {
        Rotation::None => DVec3::new(x, y, z),
        Rotation::Ccw90 => DVec3::new(px - pz + z, y, px + pz - x),
        Rotation::Cw90 => DVec3::new(px + pz - z, y, pz - px + x),
        Rotation::Cw180 => DVec3::new(px + px - x, y, pz + pz - z),
    }
}

/// Region extents after rotation: the two quarter turns swap X and Z.
pub fn size_after_rotation(size: IVec3, rotation: Rotation) -> IVec3 {
    match rotation {
        Rotation::Cw90 | Rotation::Ccw90 => IVec3::new(size.z, size.y, size.x),
        Rotation::None | Rotation::Cw180 => size,
    }
}

/// Placement anchor such that the transformed region's bounding box keeps
/// non-negative offsets from `pos` for any mirror/rotation combination.
pub fn origin_after_transform(
    pos: IVec3,
    mirror: Mirror,
    rotation: Rotation,
    size_x: i32,
    size_z: i32,
) -> IVec3 {
    let sx = size_x - 1;
    let sz = size_z - 1;
    let i = if mirror == Mirror::FrontBack { sx } else { 0 };
    let j = if mirror == Mirror::LeftRight { sz } else { 0 };
    match rotation {
        Rotation::None => pos + IVec3::new(i, 0, j),
        Rotation::Cw90 => pos + IVec3::new(sz - j, 0, i),
        Rotation::Ccw90 => pos + IVec3::new(j, 0, sx - i),
        Rotation::Cw180 => pos + IVec3::new(sx - i, 0, sz - j),
    }
}

/// Inclusive axis-aligned box of cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: IVec3,
    pub max: IVec3,
}

impl BoundingBox {
    /// Box spanning the two corners, in any order.
    pub fn from_corners(a: IVec3, b: IVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Degenerate box containing a single cell.
    pub fn single(p: IVec3) -> Self {
        Self { min: p, max: p }
    }

    pub fn contains(&self, p: IVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Grows the box to include `p`.
    pub fn encapsulate(&mut self, p: IVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn size(&self) -> IVec3 {
        self.max - self.min + IVec3::ONE
    }

    /// Iterates every cell position in the box, Y-major then X then Z.
    pub fn iter(&self) -> impl Iterator<Item = IVec3> + '_ {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| {
            (min.x..=max.x).flat_map(move |x| (min.z..=max.z).map(move |z| IVec3::new(x, y, z)))
        })
    }

    /// Cells on the outward shell of the box, each visited exactly once, in
    /// the same Y-major order as [`BoundingBox::iter`]. Interior rows
    /// contribute only their two Z endpoints, so the walk never touches the
    /// inside of the volume.
    pub fn shell(&self) -> Vec<IVec3> {
        let (min, max) = (self.min, self.max);
        let mut out = Vec::new();
        for y in min.y..=max.y {
            let cap = y == min.y || y == max.y;
            for x in min.x..=max.x {
                if cap || x == min.x || x == max.x {
                    for z in min.z..=max.z {
                        out.push(IVec3::new(x, y, z));
                    }
                } else {
                    out.push(IVec3::new(x, y, min.z));
                    if max.z > min.z {
                        out.push(IVec3::new(x, y, max.z));
                    }
                }
            }
        }
        out
    }

    /// True if `p` lies on the outward shell of the box.
    pub fn on_shell(&self, p: IVec3) -> bool {
        self.contains(p)
            && (p.x == self.min.x
                || p.x == self.max.x
                || p.y == self.min.y
                || p.y == self.max.y
                || p.z == self.min.z
                || p.z == self.max.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_180_is_involution() {
        let pivot = IVec3::new(3, 0, -2);
        let p = IVec3::new(7, 4, 11);
        let once = transform_point(p, Mirror::None, Rotation::Cw180, pivot);
        let twice = transform_point(once, Mirror::None, Rotation::Cw180, pivot);
        assert_eq!(twice, p);
    }

    #[test]
    fn test_mirror_twice_is_identity() {
        let pivot = IVec3::ZERO;
        for mirror in [Mirror::LeftRight, Mirror::FrontBack] {
            let p = IVec3::new(5, 2, -3);
            let once = transform_point(p, mirror, Rotation::None, pivot);
            let twice = transform_point(once, mirror, Rotation::None, pivot);
            assert_eq!(twice, p);
        }
    }

    #[test]
    fn test_cw_then_ccw_is_identity() {
        let pivot = IVec3::new(1, 0, 4);
        let p = IVec3::new(-2, 9, 6);
        let cw = transform_point(p, Mirror::None, Rotation::Cw90, pivot);
        let back = transform_point(cw, Mirror::None, Rotation::Ccw90, pivot);
        assert_eq!(back, p);
    }

    #[test]
    fn test_cw90_concrete() {
        // (1,0,0) around pivot (0,0): (px+pz-z, y, pz-px+x) = (0, 0, 1)
        let p = transform_point(
            IVec3::new(1, 0, 0),
            Mirror::None,
            Rotation::Cw90,
            IVec3::ZERO,
        );
        assert_eq!(p, IVec3::new(0, 0, 1));
    }

    #[test]
    fn test_size_after_rotation_swaps_for_quarter_turns() {
        let size = IVec3::new(3, 7, 5);
        assert_eq!(size_after_rotation(size, Rotation::Cw90), IVec3::new(5, 7, 3));
        assert_eq!(size_after_rotation(size, Rotation::Ccw90), IVec3::new(5, 7, 3));
        assert_eq!(size_after_rotation(size, Rotation::Cw180), size);
        assert_eq!(size_after_rotation(size, Rotation::None), size);
    }

    #[test]
    fn test_origin_after_transform_keeps_box_non_negative() {
        let size = IVec3::new(4, 1, 3);
        for mirror in [Mirror::None, Mirror::LeftRight, Mirror::FrontBack] {
            for rotation in [
                Rotation::None,
                Rotation::Cw90,
                Rotation::Cw180,
                Rotation::Ccw90,
            ] {
                let anchor = origin_after_transform(IVec3::ZERO, mirror, rotation, size.x, size.z);
                for x in 0..size.x {
                    for z in 0..size.z {
                        let p = transform_point(IVec3::new(x, 0, z), mirror, rotation, IVec3::ZERO)
                            + anchor;
                        assert!(
                            p.x >= 0 && p.z >= 0,
                            "negative offset for {mirror:?}/{rotation:?} at ({x},{z}): {p:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_float_mirror_reflects_across_cell_center() {
        let p = DVec3::new(0.25, 1.0, 0.75);
        let m = transform_point_f(p, Mirror::FrontBack, Rotation::None, IVec3::ZERO);
        assert_eq!(m, DVec3::new(0.75, 1.0, 0.75));
    }

    #[test]
    fn test_direction_rotation_cycle() {
        assert_eq!(
            Rotation::Cw90.rotate_direction(Direction::North),
            Direction::East
        );
        assert_eq!(
            Rotation::Ccw90.rotate_direction(Direction::North),
            Direction::West
        );
        assert_eq!(Rotation::Cw180.rotate_direction(Direction::West), Direction::East);
        assert_eq!(Rotation::Cw90.rotate_direction(Direction::Up), Direction::Up);
    }

    #[test]
    fn test_bounding_box_shell() {
        let b = BoundingBox::from_corners(IVec3::ZERO, IVec3::new(2, 2, 2));
        assert!(b.on_shell(IVec3::new(0, 1, 1)));
        assert!(b.on_shell(IVec3::new(2, 2, 2)));
        assert!(!b.on_shell(IVec3::new(1, 1, 1)));
        assert_eq!(b.size(), IVec3::new(3, 3, 3));
        assert_eq!(b.iter().count(), 27);
    }

    #[test]
    fn test_shell_walk_matches_shell_predicate() {
        for (a, b) in [
            (IVec3::ZERO, IVec3::new(2, 2, 2)),
            (IVec3::new(-1, 0, -1), IVec3::new(3, 4, 2)),
            (IVec3::ZERO, IVec3::new(3, 0, 2)),
            (IVec3::ZERO, IVec3::ZERO),
        ] {
            let bounds = BoundingBox::from_corners(a, b);
            let walked = bounds.shell();
            let filtered: Vec<IVec3> = bounds.iter().filter(|&p| bounds.on_shell(p)).collect();
            assert_eq!(walked, filtered, "shell mismatch for {a:?}..{b:?}");
        }
    }
}
