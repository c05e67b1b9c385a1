use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::grid::{CollisionLayer, Tile};

/// Runtime handle for any entity tracked by a session.
///
/// Allocated monotonically and never reused within a session, so handles
/// stay meaningful across the draw-order reshuffles a move performs. Never
/// serialized; fresh handles are allocated on every deserialize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Persistent snake identity, written to the save format as `id`.
///
/// Survives serialization and undo; regenerated on clipboard paste so that
/// pasted snakes never collide with their source.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnakeUid(String);

impl SnakeUid {
    /// Generates a UUIDv4-shaped identifier from the given RNG.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 16];
        rng.fill_bytes(&mut bytes);
        // RFC 4122 version 4, variant 1 bits.
        bytes[6] = (bytes[6] & 0x0f) | 0x40;
        bytes[8] = (bytes[8] & 0x3f) | 0x80;
        let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
        let joined = hex.concat();
        Self(format!(
            "{}-{}-{}-{}-{}",
            &joined[0..8],
            &joined[8..12],
            &joined[12..16],
            &joined[16..20],
            &joined[20..32]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SnakeUid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SnakeUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialization tag for each entity variant.
///
/// These are the historical wire names: `Block` tags the wall variant, and
/// pre-v5 files used `Collectable` where `Food` now appears. Kept decoupled
/// from the Rust type names so a rename can never silently change the save
/// format.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
pub enum EntityKind {
    Block,
    Crate,
    Food,
    Inverter,
    Snake,
}

/// Shared data of every non-snake entity: a rectangle with one collision
/// color. Crates and collectables are always 1×1 in practice; walls may span
/// larger rectangles.
#[derive(Clone, Debug, PartialEq)]
pub struct RectEntity {
    pub id: EntityId,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub layer: CollisionLayer,
}

impl RectEntity {
    pub fn new(id: EntityId, x: i32, y: i32, layer: CollisionLayer) -> Self {
        Self {
            id,
            x,
            y,
            width: 1,
            height: 1,
            layer,
        }
    }

    pub fn tile(&self) -> Tile {
        Tile::new(self.x, self.y, self.width, self.height)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.tile().contains(x, y)
    }
}

/// One cell of a snake's body. Always 1×1; the width/height fields exist
/// because the save format records them per segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnakeSegment {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub layer: CollisionLayer,
}

impl SnakeSegment {
    pub fn new(x: i32, y: i32, layer: CollisionLayer) -> Self {
        Self {
            x,
            y,
            width: 1,
            height: 1,
            layer,
        }
    }

    pub fn tile(&self) -> Tile {
        Tile::new(self.x, self.y, self.width, self.height)
    }
}

/// A multi-segment snake. Head is segment 0, tail is the last segment.
///
/// Invariant: `segments` is never empty. A one-segment snake is a valid
/// "head-only" snake; movement rules are identical.
#[derive(Clone, Debug, PartialEq)]
pub struct Snake {
    pub id: EntityId,
    pub uid: SnakeUid,
    pub segments: Vec<SnakeSegment>,
    pub grow_on_next_move: bool,
}

impl Snake {
    pub fn new(id: EntityId, uid: SnakeUid, segments: Vec<SnakeSegment>) -> Self {
        debug_assert!(!segments.is_empty(), "a snake must have at least one segment");
        Self {
            id,
            uid,
            segments,
            grow_on_next_move: false,
        }
    }

    pub fn head(&self) -> &SnakeSegment {
        &self.segments[0]
    }

    pub fn tail(&self) -> &SnakeSegment {
        &self.segments[self.segments.len() - 1]
    }

    pub fn layer(&self) -> CollisionLayer {
        self.head().layer
    }

    /// Index of the first segment covering the given cell, if any.
    pub fn segment_at(&self, x: i32, y: i32) -> Option<usize> {
        self.segments.iter().position(|seg| seg.tile().contains(x, y))
    }
}

/// Every placeable object, as a closed union with an explicit discriminant.
///
/// Call sites dispatch by exhaustive match, so adding a variant forces every
/// one of them to be revisited.
#[derive(Clone, Debug, PartialEq)]
pub enum Entity {
    Wall(RectEntity),
    Crate(RectEntity),
    Food(RectEntity),
    Inverter(RectEntity),
    Snake(Snake),
}

impl Entity {
    pub fn id(&self) -> EntityId {
        match self {
            Entity::Wall(rect)
            | Entity::Crate(rect)
            | Entity::Food(rect)
            | Entity::Inverter(rect) => rect.id,
            Entity::Snake(snake) => snake.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Wall(_) => EntityKind::Block,
            Entity::Crate(_) => EntityKind::Crate,
            Entity::Food(_) => EntityKind::Food,
            Entity::Inverter(_) => EntityKind::Inverter,
            Entity::Snake(_) => EntityKind::Snake,
        }
    }

    /// Solid entities participate in top-layer collision blocking.
    /// Collectables are decorative until eaten and block nothing.
    pub fn solid(&self) -> bool {
        match self {
            Entity::Wall(_) | Entity::Crate(_) | Entity::Snake(_) => true,
            Entity::Food(_) | Entity::Inverter(_) => false,
        }
    }

    pub fn is_collectable(&self) -> bool {
        matches!(self, Entity::Food(_) | Entity::Inverter(_))
    }

    pub fn as_rect(&self) -> Option<&RectEntity> {
        match self {
            Entity::Wall(rect)
            | Entity::Crate(rect)
            | Entity::Food(rect)
            | Entity::Inverter(rect) => Some(rect),
            Entity::Snake(_) => None,
        }
    }

    pub fn as_rect_mut(&mut self) -> Option<&mut RectEntity> {
        match self {
            Entity::Wall(rect)
            | Entity::Crate(rect)
            | Entity::Food(rect)
            | Entity::Inverter(rect) => Some(rect),
            Entity::Snake(_) => None,
        }
    }

    pub fn as_snake(&self) -> Option<&Snake> {
        match self {
            Entity::Snake(snake) => Some(snake),
            _ => None,
        }
    }

    pub fn as_snake_mut(&mut self) -> Option<&mut Snake> {
        match self {
            Entity::Snake(snake) => Some(snake),
            _ => None,
        }
    }

    /// Per-entity hit test at one cell.
    ///
    /// Rectangular entities use a point-in-rect test; snakes test each
    /// segment, reporting the first covering segment's index. When
    /// `ignore_tail` is set the snake's last segment is excluded from its
    /// own results (so a mover can step onto the tile its tail vacates).
    pub fn hit_at(
        &self,
        x: i32,
        y: i32,
        ignore_tail: bool,
    ) -> Option<(CollisionLayer, Option<usize>)> {
        match self {
            Entity::Wall(rect)
            | Entity::Crate(rect)
            | Entity::Food(rect)
            | Entity::Inverter(rect) => rect.contains(x, y).then_some((rect.layer, None)),
            Entity::Snake(snake) => {
                let tail_index = snake.segments.len() - 1;
                snake
                    .segments
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !(ignore_tail && *i == tail_index))
                    .find(|(_, seg)| seg.tile().contains(x, y))
                    .map(|(i, seg)| (seg.layer, Some(i)))
            }
        }
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        match self {
            Entity::Wall(rect)
            | Entity::Crate(rect)
            | Entity::Food(rect)
            | Entity::Inverter(rect) => {
                rect.x += dx;
                rect.y += dy;
            }
            Entity::Snake(snake) => {
                for segment in &mut snake.segments {
                    segment.x += dx;
                    segment.y += dy;
                }
            }
        }
    }

    /// Flips this entity's collision color(s) in place.
    pub fn invert_layers(&mut self) {
        match self {
            Entity::Wall(rect)
            | Entity::Crate(rect)
            | Entity::Food(rect)
            | Entity::Inverter(rect) => rect.layer = rect.layer.inverted(),
            Entity::Snake(snake) => {
                for segment in &mut snake.segments {
                    segment.layer = segment.layer.inverted();
                }
            }
        }
    }

    /// Draw-order rank used by [`GameSession::sort_entities`]: collectables
    /// sort above everything, snakes above walls and crates.
    ///
    /// [`GameSession::sort_entities`]: super::GameSession::sort_entities
    pub(crate) fn sort_rank(&self) -> u8 {
        match self {
            Entity::Wall(_) | Entity::Crate(_) => 0,
            Entity::Snake(_) => 1,
            Entity::Food(_) | Entity::Inverter(_) => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn segment_run(len: usize) -> Vec<SnakeSegment> {
        (0..len)
            .map(|i| SnakeSegment::new(i as i32, 0, CollisionLayer::WHITE))
            .collect()
    }

    #[test]
    fn snake_uid_is_uuid_shaped() {
        let mut rng = StdRng::seed_from_u64(7);
        let uid = SnakeUid::random(&mut rng);
        let parts: Vec<&str> = uid.as_str().split('-').collect();
        let lengths: Vec<usize> = parts.iter().map(|p| p.len()).collect();
        assert_eq!(lengths, vec![8, 4, 4, 4, 12]);
        assert_ne!(uid, SnakeUid::random(&mut rng));
    }

    #[test]
    fn snake_hit_test_skips_only_the_tail_when_asked() {
        let snake = Snake::new(EntityId(1), SnakeUid::from("s".to_string()), segment_run(3));
        let entity = Entity::Snake(snake);
        assert_eq!(entity.hit_at(2, 0, false), Some((CollisionLayer::WHITE, Some(2))));
        assert_eq!(entity.hit_at(2, 0, true), None);
        assert_eq!(entity.hit_at(1, 0, true), Some((CollisionLayer::WHITE, Some(1))));
    }

    #[test]
    fn entity_kind_tags_use_historical_names() {
        let wall = Entity::Wall(RectEntity::new(EntityId(1), 0, 0, CollisionLayer::WHITE));
        assert_eq!(serde_json::to_string(&wall.kind()).unwrap(), "\"Block\"");
        assert_eq!("Inverter".parse::<EntityKind>().unwrap(), EntityKind::Inverter);
        assert!("Wall".parse::<EntityKind>().is_err());
    }

    #[test]
    fn collectables_are_not_solid() {
        let food = Entity::Food(RectEntity::new(EntityId(1), 0, 0, CollisionLayer::WHITE));
        let krate = Entity::Crate(RectEntity::new(EntityId(2), 0, 0, CollisionLayer::BOTH));
        assert!(!food.solid());
        assert!(food.is_collectable());
        assert!(krate.solid());
        assert!(!krate.is_collectable());
    }
}
