#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns weapon swings into obstacle strikes.

use std::time::Duration;

use tilescape_core::{BoundingBox, Command, Direction, ObstacleId, SwingState, Weapon};
use tilescape_world::TileMapGrid;
use tracing::debug;

/// Swing in flight that has not landed yet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveStrike {
    swinger: BoundingBox,
    weapon: Weapon,
}

impl ActiveStrike {
    /// Creates a strike for a swinger occupying `swinger` with `weapon`
    /// already mid-swing.
    #[must_use]
    pub const fn new(swinger: BoundingBox, weapon: Weapon) -> Self {
        Self { swinger, weapon }
    }

    /// Bounding box of the swinger.
    #[must_use]
    pub const fn swinger(&self) -> BoundingBox {
        self.swinger
    }

    /// Weapon carrying the swing state.
    #[must_use]
    pub const fn weapon(&self) -> Weapon {
        self.weapon
    }
}

/// Outcome of one [`resolve_strikes`] pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrikeReport {
    /// Strikes removed from the active list, whether they landed or expired.
    pub consumed: usize,
    /// Obstacles hit during the pass, in strike order.
    pub landed: Vec<ObstacleId>,
}

/// Resolves every active strike against the idle obstacles of the swinger's
/// tile map.
///
/// Strikes still winding up are skipped. A fully extended blade that overlaps
/// an idle obstacle emits a single [`Command::StrikeObstacle`] and the strike
/// is retired, so each swing lands at most once. Strikes whose weapon has
/// returned to rest are retired without effect.
pub fn resolve_strikes(
    grid: &TileMapGrid,
    strikes: &mut Vec<ActiveStrike>,
    out: &mut Vec<Command>,
) -> StrikeReport {
    let mut report = StrikeReport::default();
    strikes.retain(|strike| match strike.weapon.state() {
        SwingState::Idle => {
            report.consumed += 1;
            false
        }
        SwingState::WindingUp { .. } => true,
        SwingState::Retracting { .. } => match landing(grid, strike) {
            Some(obstacle) => {
                debug!(obstacle = obstacle.get(), "strike_landed");
                out.push(Command::StrikeObstacle { obstacle });
                report.landed.push(obstacle);
                report.consumed += 1;
                false
            }
            None => true,
        },
    });
    report
}

fn landing(grid: &TileMapGrid, strike: &ActiveStrike) -> Option<ObstacleId> {
    let blade = strike.weapon.blade_box(strike.swinger)?;
    let map = grid.tile_map_at(strike.swinger.center())?;
    map.obstacles()
        .iter()
        .find(|obstacle| obstacle.is_harvestable() && obstacle.bounds().intersects(&blade))
        .map(|obstacle| obstacle.id())
}

/// Swing tracker for a single weapon holder.
///
/// The holder's weapon keeps animating after its strike lands; a new swing can
/// only begin once it is back at rest.
#[derive(Debug, Default)]
pub struct Strikes {
    weapon: Weapon,
    active: Vec<ActiveStrike>,
}

impl Strikes {
    /// Creates a tracker for `weapon`.
    #[must_use]
    pub fn new(weapon: Weapon) -> Self {
        Self {
            weapon,
            active: Vec::new(),
        }
    }

    /// Weapon of the holder, including its current swing phase.
    #[must_use]
    pub const fn weapon(&self) -> Weapon {
        self.weapon
    }

    /// Strikes that have not landed or expired yet.
    #[must_use]
    pub fn active(&self) -> &[ActiveStrike] {
        &self.active
    }

    /// Starts a swing towards `direction`. Returns `false` while the previous
    /// swing is still in progress.
    pub fn begin(&mut self, swinger: BoundingBox, direction: Direction) -> bool {
        if !self.weapon.begin_swing(direction) {
            return false;
        }
        self.active.push(ActiveStrike::new(swinger, self.weapon));
        true
    }

    /// Moves pending strikes along with the holder.
    pub fn follow(&mut self, swinger: BoundingBox) {
        for strike in &mut self.active {
            strike.swinger = swinger;
        }
    }

    /// Drops pending strikes and returns the weapon to rest.
    pub fn cancel(&mut self) {
        self.active.clear();
        self.weapon.reset();
    }

    /// Advances every swing by `dt` and resolves the strikes against `grid`.
    pub fn handle(
        &mut self,
        grid: &TileMapGrid,
        dt: Duration,
        out: &mut Vec<Command>,
    ) -> StrikeReport {
        self.weapon.advance(dt);
        for strike in &mut self.active {
            strike.weapon.advance(dt);
        }
        resolve_strikes(grid, &mut self.active, out)
    }
}
