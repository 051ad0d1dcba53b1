#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared host contracts for Pulse Runner adapters.
//!
//! Hosts feed a [`FrameInput`] per frame and receive a [`FrameOutput`]
//! describing what to draw and what to announce. Drawing itself stays with the
//! host.

use anyhow::Result as AnyResult;
use glam::Vec2;
use pulse_runner_core::{
    Event, GameplayParameters, ObstacleId, ObstacleKind, Rgb, TrackChangeReason, TrackId,
};
use std::{error::Error, fmt, time::Duration};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }

    /// Returns the color with a different opacity.
    #[must_use]
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            ..self
        }
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Self::from_rgb_u8(rgb.red(), rgb.green(), rgb.blue())
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Input snapshot gathered by adapters before advancing the session.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FrameInput {
    /// Simulated time since the previous frame.
    pub dt: Duration,
    /// Whether the jump control was pressed on this frame.
    pub jump_pressed: bool,
    /// Whether the host asked to skip to the next track on this frame.
    pub skip_track_pressed: bool,
}

/// Drawing instructions derived from world events.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    /// A new obstacle should be drawn.
    SpawnObstacle {
        /// Identifier used by later removal commands.
        obstacle: ObstacleId,
        /// Type of obstacle, which selects its sprite.
        kind: ObstacleKind,
        /// Bottom-left corner in world units.
        position: Vec2,
        /// Width and height in world units.
        size: Vec2,
        /// Fill color.
        color: Color,
    },
    /// An obstacle should no longer be drawn.
    RemoveObstacle {
        /// Identifier of the obstacle.
        obstacle: ObstacleId,
    },
}

/// Messages the host should surface to the player.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// The score changed.
    ScoreChanged {
        /// Score after the change.
        score: u32,
    },
    /// The run ended.
    GameOver {
        /// Final score.
        score: u32,
    },
    /// A different track started.
    TrackChanged {
        /// Index of the track in the playlist.
        index: usize,
        /// Identifier of the track.
        track_id: TrackId,
        /// What caused the change.
        reason: TrackChangeReason,
    },
}

/// Colors used to draw obstacles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    /// Fill of lethal obstacles.
    pub obstacle: Color,
    /// Fill of collectibles.
    pub collectible: Color,
}

impl Palette {
    /// Derives the palette from the live gameplay parameters.
    #[must_use]
    pub fn from_parameters(parameters: &GameplayParameters) -> Self {
        Self {
            obstacle: parameters.obstacle_color.into(),
            collectible: Color::from(parameters.obstacle_glow).lighten(0.4),
        }
    }

    const fn color_for(&self, kind: ObstacleKind) -> Color {
        match kind {
            ObstacleKind::Spike | ObstacleKind::Block => self.obstacle,
            ObstacleKind::Collectible => self.collectible,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            obstacle: Color::from_rgb_u8(0xff, 0x44, 0x44),
            collectible: Color::from_rgb_u8(0xff, 0xd7, 0x00),
        }
    }
}

/// Everything the host needs to present one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameOutput {
    /// Drawing instructions in event order.
    pub commands: Vec<RenderCommand>,
    /// Notifications in event order.
    pub notifications: Vec<Notification>,
    /// Bottom-left corner of the player in world units.
    pub player_position: Vec2,
}

impl FrameOutput {
    /// Translates world events into drawing instructions and notifications.
    #[must_use]
    pub fn from_events(events: &[Event], palette: &Palette, player_position: Vec2) -> Self {
        let mut output = Self {
            player_position,
            ..Self::default()
        };
        for event in events {
            output.push_event(event, palette);
        }
        output
    }

    fn push_event(&mut self, event: &Event, palette: &Palette) {
        match event {
            Event::ObstacleSpawned {
                obstacle,
                kind,
                bounds,
            } => self.commands.push(RenderCommand::SpawnObstacle {
                obstacle: *obstacle,
                kind: *kind,
                position: Vec2::new(bounds.left(), bounds.bottom()),
                size: Vec2::new(bounds.width(), bounds.height()),
                color: palette.color_for(*kind),
            }),
            Event::ObstacleRemoved { obstacle, .. } => self
                .commands
                .push(RenderCommand::RemoveObstacle {
                    obstacle: *obstacle,
                }),
            Event::ScoreChanged { score, .. } => self
                .notifications
                .push(Notification::ScoreChanged { score: *score }),
            Event::GameOver { score } => self
                .notifications
                .push(Notification::GameOver { score: *score }),
            Event::TrackChanged {
                index,
                track_id,
                reason,
            } => self.notifications.push(Notification::TrackChanged {
                index: *index,
                track_id: track_id.clone(),
                reason: *reason,
            }),
            _ => {}
        }
    }
}

/// Static description of the host window.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Simulated frames per second.
    pub frames_per_second: u32,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RenderingError::InvalidFrameRate`] when `frames_per_second` is zero.
    pub fn new<T>(
        window_title: T,
        clear_color: Color,
        frames_per_second: u32,
    ) -> Result<Self, RenderingError>
    where
        T: Into<String>,
    {
        if frames_per_second == 0 {
            return Err(RenderingError::InvalidFrameRate { frames_per_second });
        }
        Ok(Self {
            window_title: window_title.into(),
            clear_color,
            frames_per_second,
        })
    }

    /// Simulated time covered by one frame.
    #[must_use]
    pub fn frame_time(&self) -> Duration {
        Duration::from_secs(1) / self.frames_per_second.max(1)
    }
}

/// Host backend capable of driving Pulse Runner sessions.
pub trait HostBackend {
    /// Runs the backend until it is requested to exit.
    ///
    /// The provided `update` closure receives the per-frame input captured by
    /// the host and returns what should be presented for that frame.
    fn run<F>(self, presentation: Presentation, update: F) -> AnyResult<()>
    where
        F: FnMut(FrameInput) -> FrameOutput + 'static;
}

/// Errors that can occur when constructing host descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// The frame rate must be positive to yield a finite frame time.
    InvalidFrameRate {
        /// Provided frame rate that failed validation.
        frames_per_second: u32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFrameRate { frames_per_second } => {
                write!(
                    f,
                    "frames_per_second must be positive (received {frames_per_second})"
                )
            }
        }
    }
}

impl Error for RenderingError {}
