use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Signed offset or position expressed in tile coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle in integer grid units.
///
/// Rectangular entities may span multiple cells; snake segments are always
/// 1×1. Two tiles are congruent when all four fields are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Tile {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A single-cell tile at the given position.
    pub fn unit(x: i32, y: i32) -> Self {
        Self::new(x, y, 1, 1)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn congruent(&self, other: &Tile) -> bool {
        self == other
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

bitflags! {
    /// Collision color of a surface or snake.
    ///
    /// `WHITE` and `BLACK` are mutually exclusive board colors; `BOTH` is
    /// the bitwise union and is reserved for entities (crates) that block
    /// both colors. A solid entity never carries the empty layer.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct CollisionLayer: u8 {
        const WHITE = 1 << 0;
        const BLACK = 1 << 1;
        const BOTH = Self::WHITE.bits() | Self::BLACK.bits();
    }
}

impl CollisionLayer {
    pub const NONE: Self = Self::empty();

    /// Shared-bit test: two layers collide when they have a color in common.
    pub fn collides_with(self, other: CollisionLayer) -> bool {
        !(self & other).is_empty()
    }

    /// Swaps white and black; `NONE` and `BOTH` are their own inverses.
    pub fn inverted(self) -> Self {
        if self == Self::WHITE {
            Self::BLACK
        } else if self == Self::BLACK {
            Self::WHITE
        } else {
            self
        }
    }
}

impl fmt::Display for CollisionLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if *self == Self::NONE {
            "none"
        } else if *self == Self::WHITE {
            "white"
        } else if *self == Self::BLACK {
            "black"
        } else {
            "both"
        };
        f.write_str(name)
    }
}

// The wire format stores the layer as its numeric bit value (0-3), so the
// serde representation is pinned to `bits` rather than flag names.
impl Serialize for CollisionLayer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for CollisionLayer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        CollisionLayer::from_bits(bits)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid collision layer {bits}")))
    }
}

/// Four-directional movement on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Right,
    Down,
    Left,
    Up,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Down,
        Direction::Left,
        Direction::Up,
    ];

    pub fn delta(self) -> Point {
        match self {
            Direction::Right => Point::new(1, 0),
            Direction::Down => Point::new(0, 1),
            Direction::Left => Point::new(-1, 0),
            Direction::Up => Point::new(0, -1),
        }
    }
}

/// Rasterizes a path from `from` to `to` (inclusive) moving one cell at a
/// time along a single axis: a staircase rather than a diagonal line.
///
/// Snake bodies must stay axis-adjacent, so snake dragging and the snake
/// brush walk this path instead of a Bresenham line. Each step takes the
/// axis with the larger remaining distance, ties going to x.
pub fn line_no_diagonals(from: Point, to: Point) -> Vec<Point> {
    let mut points = vec![from];
    let mut current = from;
    while current != to {
        let dx = to.x - current.x;
        let dy = to.y - current.y;
        if dx.abs() >= dy.abs() {
            current.x += dx.signum();
        } else {
            current.y += dy.signum();
        }
        points.push(current);
    }
    points
}

/// Playable board dimensions, stored in the level file since format v3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub width: i32,
    pub height: i32,
}

impl LevelInfo {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// True when the whole rectangle lies inside the level bounds.
    pub fn contains(&self, tile: &Tile) -> bool {
        tile.x >= 0
            && tile.y >= 0
            && tile.x + tile.width <= self.width
            && tile.y + tile.height <= self.height
    }
}

impl Default for LevelInfo {
    fn default() -> Self {
        Self::new(
            crate::config::GameConfig::DEFAULT_LEVEL_WIDTH,
            crate::config::GameConfig::DEFAULT_LEVEL_HEIGHT,
        )
    }
}
