//! Transition markers derived from connector tiles.

use glam::Vec2;
use tilescape_core::{BoundingBox, GridId, MapRef, MarkerId, TileCoord, TileKind};

use crate::{
    grid::{LayeredGridStack, TileMapGrid},
    tile_map::TileMap,
    WorldBuildError,
};

/// Trigger region on a connector tile that sends the player to a paired
/// location in another grid.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionMarker {
    id: MarkerId,
    region: BoundingBox,
    connector: TileKind,
    destination: MapRef,
    spawn: Vec2,
}

impl TransitionMarker {
    /// Identifier of the marker, unique within one marker build.
    #[must_use]
    pub const fn id(&self) -> MarkerId {
        self.id
    }

    /// World-space trigger region.
    #[must_use]
    pub const fn region(&self) -> BoundingBox {
        self.region
    }

    /// Connector tile the marker sits on.
    #[must_use]
    pub const fn connector(&self) -> TileKind {
        self.connector
    }

    /// Map the marker leads to.
    #[must_use]
    pub const fn destination(&self) -> MapRef {
        self.destination
    }

    /// Center of the arrival tile in the destination grid.
    #[must_use]
    pub const fn spawn(&self) -> Vec2 {
        self.spawn
    }

    /// Upper-left position that centers a box of `size` on the spawn point.
    #[must_use]
    pub fn spawn_origin(&self, size: Vec2) -> Vec2 {
        self.spawn - size * 0.5
    }
}

/// Where a connector leads and how to find the arrival tile.
struct Pairing {
    grid: GridId,
    counterpart: TileKind,
    sealed: Option<TileKind>,
    arrival_offset: i64,
}

fn pairing(connector: TileKind, source: GridId, stack: &LayeredGridStack) -> Option<Pairing> {
    match connector {
        TileKind::Door if !stack.contains(source) => Some(Pairing {
            grid: stack.ground()?,
            counterpart: TileKind::Exit,
            sealed: None,
            arrival_offset: -1,
        }),
        TileKind::Exit if stack.ground() == Some(source) => Some(Pairing {
            grid: stack.exterior()?,
            counterpart: TileKind::Door,
            sealed: Some(TileKind::DoorClosed),
            arrival_offset: 1,
        }),
        TileKind::StairsUp => Some(Pairing {
            grid: stack.above(source)?,
            counterpart: TileKind::StairsDown,
            sealed: None,
            arrival_offset: 1,
        }),
        TileKind::StairsDown => Some(Pairing {
            grid: stack.below(source)?,
            counterpart: TileKind::StairsUp,
            sealed: None,
            arrival_offset: 1,
        }),
        _ => None,
    }
}

/// Discards every marker and derives a fresh set from the connector tiles of
/// all grids. Returns the number of markers created.
///
/// Markers are computed before any map is touched, so a failed rebuild leaves
/// the previous markers in place.
pub(crate) fn rebuild(
    grids: &mut [TileMapGrid],
    stack: &LayeredGridStack,
) -> Result<usize, WorldBuildError> {
    let mut pending = Vec::new();
    for grid in grids.iter() {
        for map in grid.maps() {
            for (tile, kind) in map.tiles().filter(|(_, kind)| kind.is_connector()) {
                let Some(pairing) = pairing(kind, map.grid(), stack) else {
                    continue;
                };
                let destination = grids
                    .iter()
                    .find(|candidate| candidate.id() == pairing.grid)
                    .and_then(|candidate| candidate.tile_map(map.coord()));
                let Some((destination, spawn)) =
                    resolve_arrival(map, tile, &pairing, destination)?
                else {
                    continue;
                };
                pending.push((map.map_ref(), kind, map.tile_bounds(tile), destination, spawn));
            }
        }
    }

    for grid in grids.iter_mut() {
        for map in grid.maps_mut() {
            map.clear_markers();
        }
    }

    let count = pending.len();
    for (index, pending) in pending.into_iter().enumerate() {
        let (source, connector, region, destination, spawn) = pending;
        let marker = TransitionMarker {
            id: MarkerId::new(u32::try_from(index).unwrap_or(u32::MAX)),
            region,
            connector,
            destination,
            spawn,
        };
        let owner = grids
            .iter_mut()
            .find(|grid| grid.id() == source.grid)
            .and_then(|grid| grid.tile_map_mut(source.map));
        if let Some(owner) = owner {
            owner.add_marker(marker);
        }
    }
    Ok(count)
}

/// Pairs the connector at `tile` with the nearest counterpart (or sealed
/// counterpart) of the destination map, measured in tiles.
fn resolve_arrival(
    source: &TileMap,
    tile: TileCoord,
    pairing: &Pairing,
    destination: Option<&TileMap>,
) -> Result<Option<(MapRef, Vec2)>, WorldBuildError> {
    let grid = source.grid().get();
    let map_row = source.coord().row();
    let map_column = source.coord().column();
    let connector = source_kind(source, tile);
    let unmatched = || WorldBuildError::UnmatchedConnector {
        grid,
        map_row,
        map_column,
        column: tile.column(),
        row: tile.row(),
        connector,
    };

    let Some(destination) = destination else {
        return Err(unmatched());
    };

    let mut nearest: Option<(u64, TileCoord, TileKind)> = None;
    let mut tied = false;
    for (candidate, kind) in destination.tiles() {
        if kind != pairing.counterpart && Some(kind) != pairing.sealed {
            continue;
        }
        let distance = u64::from(candidate.column().abs_diff(tile.column()))
            + u64::from(candidate.row().abs_diff(tile.row()));
        match nearest {
            Some((best, _, _)) if distance > best => {}
            Some((best, _, _)) if distance == best => tied = true,
            _ => {
                nearest = Some((distance, candidate, kind));
                tied = false;
            }
        }
    }

    let Some((_, counterpart, kind)) = nearest else {
        return Err(unmatched());
    };
    if tied {
        return Err(WorldBuildError::AmbiguousConnector {
            grid,
            map_row,
            map_column,
            column: tile.column(),
            row: tile.row(),
            connector,
        });
    }
    if kind != pairing.counterpart {
        return Ok(None);
    }

    let row = i64::from(counterpart.row()) + pairing.arrival_offset;
    let arrival = u32::try_from(row)
        .ok()
        .map(|row| TileCoord::new(counterpart.column(), row))
        .filter(|arrival| destination.tile(*arrival).is_some())
        .ok_or_else(unmatched)?;
    Ok(Some((destination.map_ref(), destination.tile_center(arrival))))
}

fn source_kind(map: &TileMap, tile: TileCoord) -> char {
    map.tile(tile).map_or('?', TileKind::symbol)
}
