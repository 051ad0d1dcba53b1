//! Playability bounds shared by the validator, the audit and generation requests.

/// Smallest spacing between obstacles that a jump can clear.
pub const MIN_SPACING: f32 = 80.0;
/// Highest spawn density a pattern may carry.
pub const MAX_DENSITY: f32 = 0.7;
/// Inclusive difficulty range.
pub const DIFFICULTY_RANGE: (u8, u8) = (1, 10);
/// Most spikes a single jump can clear.
pub const MAX_SPIKE_COUNT: u8 = 5;
/// Widest block a single jump can clear.
pub const MAX_BLOCK_WIDTH: f32 = 70.0;
/// Inclusive range of authored gap widths.
pub const GAP_WIDTH_RANGE: (f32, f32) = (60.0, 120.0);
/// Highest difficulty allowed for the opening and closing patterns.
pub const EDGE_DIFFICULTY_CAP: u8 = 3;
/// Largest advisable difficulty change between consecutive patterns.
pub const MAX_DIFFICULTY_STEP: u8 = 2;
/// Longest advisable run of obstacle patterns without a breather.
pub const MAX_OBSTACLE_RUN: usize = 5;

/// Spacing used when a pattern carries none.
pub const DEFAULT_SPACING: f32 = 100.0;
/// Density used when a pattern carries none.
pub const DEFAULT_DENSITY: f32 = 0.3;
/// Difficulty used when a pattern carries none.
pub const DEFAULT_DIFFICULTY: u8 = 3;
/// Spacing assigned to intervals inserted into timeline holes.
pub const FILLER_SPACING: f32 = 100.0;
/// Number of samples in a derived difficulty curve.
pub const CURVE_SAMPLES: usize = 10;

/// Human-readable rules sent along with generation requests.
pub const PLAYABILITY_RULES: &str = "\
Every pattern must respect these limits or the level cannot be beaten:
1. spacing >= 80px between any two obstacles
2. spikeCount <= 5 per cluster
3. blockWidth <= 70px
4. gapWidth between 60px and 120px
5. density <= 0.7, with 0.6 as a comfortable peak
6. after every 3 to 5 obstacle patterns add a 'gaps' or 'collectibles' breather (density <= 0.25, duration >= 4000ms)
7. difficulty changes by at most 2 between consecutive patterns
8. the first pattern has difficulty <= 3
9. the last pattern has difficulty <= 3";
