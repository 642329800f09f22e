//! Melee swing state carried by weapons.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BoundingBox, Direction};

/// Durations of the two halves of a swing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwingTiming {
    /// Time from the start of the swing until the blade is fully extended.
    pub wind_up: Duration,
    /// Time from full extension until the blade is back at rest.
    pub retract: Duration,
}

impl Default for SwingTiming {
    fn default() -> Self {
        Self {
            wind_up: Duration::from_millis(120),
            retract: Duration::from_millis(180),
        }
    }
}

/// Phase of a weapon swing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwingState {
    /// The weapon is at rest.
    Idle,
    /// The blade is travelling outwards and cannot land yet.
    WindingUp {
        /// Direction the swing is aimed at.
        direction: Direction,
        /// Time spent winding up so far.
        elapsed: Duration,
    },
    /// The blade reached full extension and is travelling back.
    Retracting {
        /// Direction the swing is aimed at.
        direction: Direction,
        /// Time spent retracting so far.
        elapsed: Duration,
    },
}

/// Melee weapon with an explicit swing state machine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weapon {
    timing: SwingTiming,
    reach: f32,
    blade_width: f32,
    state: SwingState,
}

impl Weapon {
    /// Creates an idle weapon.
    #[must_use]
    pub const fn new(timing: SwingTiming, reach: f32, blade_width: f32) -> Self {
        Self {
            timing,
            reach,
            blade_width,
            state: SwingState::Idle,
        }
    }

    /// Current swing phase.
    #[must_use]
    pub const fn state(&self) -> SwingState {
        self.state
    }

    /// Abandons any swing in progress.
    pub fn reset(&mut self) {
        self.state = SwingState::Idle;
    }

    /// Starts a swing towards `direction`. Returns `false` when a swing is
    /// already in progress.
    pub fn begin_swing(&mut self, direction: Direction) -> bool {
        if self.state != SwingState::Idle {
            return false;
        }
        self.state = SwingState::WindingUp {
            direction,
            elapsed: Duration::ZERO,
        };
        true
    }

    /// Advances the swing by `dt`.
    ///
    /// Reaching full extension always yields at least one frame in the
    /// retracting phase, even when `dt` would cover both halves.
    pub fn advance(&mut self, dt: Duration) {
        self.state = match self.state {
            SwingState::Idle => SwingState::Idle,
            SwingState::WindingUp { direction, elapsed } => {
                let elapsed = elapsed.saturating_add(dt);
                if elapsed >= self.timing.wind_up {
                    SwingState::Retracting {
                        direction,
                        elapsed: Duration::ZERO,
                    }
                } else {
                    SwingState::WindingUp { direction, elapsed }
                }
            }
            SwingState::Retracting { direction, elapsed } => {
                let elapsed = elapsed.saturating_add(dt);
                if elapsed >= self.timing.retract {
                    SwingState::Idle
                } else {
                    SwingState::Retracting { direction, elapsed }
                }
            }
        };
    }

    /// Reports whether the blade is at (or returning from) full extension.
    #[must_use]
    pub const fn is_fully_extended(&self) -> bool {
        matches!(self.state, SwingState::Retracting { .. })
    }

    /// Contact region of the blade for a holder occupying `holder`, available
    /// only while fully extended.
    #[must_use]
    pub fn blade_box(&self, holder: BoundingBox) -> Option<BoundingBox> {
        let SwingState::Retracting { direction, .. } = self.state else {
            return None;
        };

        let center = holder.center();
        let half_width = self.blade_width * 0.5;
        let blade = match direction {
            Direction::Up => BoundingBox::new(
                center.x - half_width,
                holder.top() - self.reach,
                center.x + half_width,
                holder.top(),
            ),
            Direction::Down => BoundingBox::new(
                center.x - half_width,
                holder.bottom(),
                center.x + half_width,
                holder.bottom() + self.reach,
            ),
            Direction::Left => BoundingBox::new(
                holder.left() - self.reach,
                center.y - half_width,
                holder.left(),
                center.y + half_width,
            ),
            Direction::Right => BoundingBox::new(
                holder.right(),
                center.y - half_width,
                holder.right() + self.reach,
                center.y + half_width,
            ),
        };
        Some(blade)
    }
}

impl Default for Weapon {
    fn default() -> Self {
        Self::new(SwingTiming::default(), 14.0, 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn holder() -> BoundingBox {
        BoundingBox::from_origin_and_size(Vec2::new(100.0, 100.0), Vec2::new(12.0, 12.0))
    }

    #[test]
    fn swing_walks_through_every_phase() {
        let mut weapon = Weapon::default();
        assert!(weapon.begin_swing(Direction::Right));
        assert!(!weapon.begin_swing(Direction::Left), "swing already running");
        assert!(weapon.blade_box(holder()).is_none(), "no contact while winding up");

        weapon.advance(Duration::from_millis(120));
        assert!(weapon.is_fully_extended());

        weapon.advance(Duration::from_millis(100));
        assert!(weapon.is_fully_extended());

        weapon.advance(Duration::from_millis(80));
        assert_eq!(weapon.state(), SwingState::Idle);
    }

    #[test]
    fn long_frames_still_pass_through_full_extension() {
        let mut weapon = Weapon::default();
        let _ = weapon.begin_swing(Direction::Up);
        weapon.advance(Duration::from_secs(5));
        assert!(weapon.is_fully_extended());
    }

    #[test]
    fn blade_extends_from_the_facing_edge() {
        let mut weapon = Weapon::default();
        let _ = weapon.begin_swing(Direction::Right);
        weapon.advance(Duration::from_millis(120));

        let blade = weapon.blade_box(holder()).expect("extended blade");
        assert_eq!(blade.left(), 112.0);
        assert_eq!(blade.right(), 126.0);
        assert_eq!(blade.center().y, holder().center().y);
    }
}
