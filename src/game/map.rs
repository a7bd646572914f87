//! Map catalog: team start positions and neutral structures

use super::error::GameError;
use super::stats::StructureType;
use super::vector::Vec2;

/// Fixed layout a match is created from
#[derive(Debug, Clone, Copy)]
pub struct MapLayout {
    pub name: &'static str,
    /// Start position of team `n` at index `n - 1`
    pub start_positions: &'static [Vec2],
    /// Structures spawned for the neutral team at match creation
    pub neutral_structures: &'static [(StructureType, Vec2)],
}

const PLAINS: MapLayout = MapLayout {
    name: "plains",
    start_positions: &[Vec2::new(600.0, 2000.0), Vec2::new(3400.0, 2000.0)],
    neutral_structures: &[
        (StructureType::Wall, Vec2::new(2000.0, 1600.0)),
        (StructureType::Wall, Vec2::new(2000.0, 2000.0)),
        (StructureType::Wall, Vec2::new(2000.0, 2400.0)),
    ],
};

const CROSSROADS: MapLayout = MapLayout {
    name: "crossroads",
    start_positions: &[
        Vec2::new(600.0, 600.0),
        Vec2::new(3400.0, 600.0),
        Vec2::new(3400.0, 3400.0),
        Vec2::new(600.0, 3400.0),
    ],
    neutral_structures: &[
        (StructureType::WatchTower, Vec2::new(2000.0, 2000.0)),
        (StructureType::Wall, Vec2::new(1700.0, 2000.0)),
        (StructureType::Wall, Vec2::new(2300.0, 2000.0)),
        (StructureType::Wall, Vec2::new(2000.0, 1700.0)),
        (StructureType::Wall, Vec2::new(2000.0, 2300.0)),
    ],
};

pub const MAPS: [MapLayout; 2] = [PLAINS, CROSSROADS];

pub fn lookup(name: &str) -> Result<MapLayout, GameError> {
    MAPS.iter()
        .find(|map| map.name == name)
        .copied()
        .ok_or_else(|| GameError::not_found("map", name))
}
