/// Compile-time constants shared across the crate.
pub struct GameConfig;

impl GameConfig {
    /// Historical default board size, used for new levels and by the v2→v3
    /// migration (levels older than v3 did not store their dimensions).
    pub const DEFAULT_LEVEL_WIDTH: i32 = 16;
    pub const DEFAULT_LEVEL_HEIGHT: i32 = 16;

    /// Format tag and current version written by [`crate::level::serialize`].
    pub const FORMAT_NAME: &'static str = "snakeshift";
    pub const LEVEL_FORMAT_VERSION: u32 = 6;

    /// Format tag and current version of recorded playthroughs.
    pub const PLAYTHROUGH_FORMAT_NAME: &'static str = "snakeshift-playthrough";
    pub const PLAYTHROUGH_FORMAT_VERSION: u32 = 2;
}
