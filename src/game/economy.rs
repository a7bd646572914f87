//! Resource channels and the per-player rate formula
//!
//! A player's net rate on each channel is
//! `round(base_generation × bonus_multiplier) − minimum_consumption`,
//! where every term is derived from a tally of the structures and units
//! the player owns.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::stats::{StructureType, UnitType};

/// One resource channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Wood,
    Stone,
    Food,
    Gold,
    Ammo,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Wood,
        Channel::Stone,
        Channel::Food,
        Channel::Gold,
        Channel::Ammo,
    ];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Wood => "wood",
            Channel::Stone => "stone",
            Channel::Food => "food",
            Channel::Gold => "gold",
            Channel::Ammo => "ammo",
        };
        f.write_str(name)
    }
}

/// Amount per channel. Used for stock, rates, costs and upkeep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resources {
    pub wood: i64,
    pub stone: i64,
    pub food: i64,
    pub gold: i64,
    pub ammo: i64,
}

impl Resources {
    pub const ZERO: Self = Self::new(0, 0, 0, 0, 0);

    pub const fn new(wood: i64, stone: i64, food: i64, gold: i64, ammo: i64) -> Self {
        Self {
            wood,
            stone,
            food,
            gold,
            ammo,
        }
    }

    pub fn get(&self, channel: Channel) -> i64 {
        match channel {
            Channel::Wood => self.wood,
            Channel::Stone => self.stone,
            Channel::Food => self.food,
            Channel::Gold => self.gold,
            Channel::Ammo => self.ammo,
        }
    }

    pub fn get_mut(&mut self, channel: Channel) -> &mut i64 {
        match channel {
            Channel::Wood => &mut self.wood,
            Channel::Stone => &mut self.stone,
            Channel::Food => &mut self.food,
            Channel::Gold => &mut self.gold,
            Channel::Ammo => &mut self.ammo,
        }
    }

    pub fn add(&mut self, other: &Resources) {
        for channel in Channel::ALL {
            *self.get_mut(channel) += other.get(channel);
        }
    }

    pub fn subtract(&mut self, other: &Resources) {
        for channel in Channel::ALL {
            *self.get_mut(channel) -= other.get(channel);
        }
    }

    /// True when no channel is zero.
    pub fn all_non_zero(&self) -> bool {
        Channel::ALL.iter().all(|c| self.get(*c) != 0)
    }

    /// Channels where `self` (the cost) exceeds `available`.
    pub fn shortfalls(&self, available: &Resources) -> Vec<Shortfall> {
        Channel::ALL
            .iter()
            .filter(|c| self.get(**c) > available.get(**c))
            .map(|c| Shortfall {
                channel: *c,
                required: self.get(*c),
                available: available.get(*c),
            })
            .collect()
    }
}

/// Missing amount on one channel for a requested purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub channel: Channel,
    pub required: i64,
    pub available: i64,
}

impl Shortfall {
    pub fn missing(&self) -> i64 {
        self.required - self.available
    }
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: need {}, have {} (short {})",
            self.channel,
            self.required,
            self.available,
            self.missing()
        )
    }
}

/// Yield of one owned `main_base` on every channel.
pub const HOME_YIELD: Resources = Resources::new(3, 2, 3, 2, 1);

/// Yield of one resource structure on its channel.
pub const RESOURCE_STRUCTURE_YIELD: i64 = 2;

/// Named counters of owned entities by type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    structures: HashMap<StructureType, u32>,
    units: HashMap<UnitType, u32>,
}

impl Tally {
    pub fn from_types<S, U>(structures: S, units: U) -> Self
    where
        S: IntoIterator<Item = StructureType>,
        U: IntoIterator<Item = UnitType>,
    {
        let mut tally = Self::default();
        for structure in structures {
            *tally.structures.entry(structure).or_insert(0) += 1;
        }
        for unit in units {
            *tally.units.entry(unit).or_insert(0) += 1;
        }
        tally
    }

    pub fn structures(&self, structure_type: StructureType) -> u32 {
        self.structures.get(&structure_type).copied().unwrap_or(0)
    }
}

/// Home yield plus per-resource-structure yield, per channel.
pub fn base_generation(tally: &Tally) -> Resources {
    let mut base = Resources::ZERO;
    for _ in 0..tally.structures(StructureType::MainBase) {
        base.add(&HOME_YIELD);
    }
    for (structure_type, count) in &tally.structures {
        if let Some(channel) = structure_type.stats().produces {
            *base.get_mut(channel) += RESOURCE_STRUCTURE_YIELD * i64::from(*count);
        }
    }
    base
}

/// Multiplier per channel from bonus structures.
pub fn bonus_multiplier(tally: &Tally, channel: Channel) -> f64 {
    tally
        .structures
        .iter()
        .filter_map(|(structure_type, count)| {
            structure_type
                .stats()
                .bonus
                .filter(|(bonus_channel, _)| *bonus_channel == channel)
                .map(|(_, factor)| factor * f64::from(*count))
        })
        .fold(1.0, |acc, extra| acc + extra)
}

/// Upkeep drawn by owned structures and units.
pub fn minimum_consumption(tally: &Tally) -> Resources {
    let mut upkeep = Resources::ZERO;
    for (structure_type, count) in &tally.structures {
        for _ in 0..*count {
            upkeep.add(&structure_type.stats().upkeep);
        }
    }
    for (unit_type, count) in &tally.units {
        for _ in 0..*count {
            upkeep.add(&unit_type.stats().upkeep);
        }
    }
    upkeep
}

/// Net per-tick rate on every channel. May be negative.
pub fn resource_rates(tally: &Tally) -> Resources {
    let base = base_generation(tally);
    let upkeep = minimum_consumption(tally);
    let mut rates = Resources::ZERO;
    for channel in Channel::ALL {
        let generated = (base.get(channel) as f64 * bonus_multiplier(tally, channel)).round() as i64;
        *rates.get_mut(channel) = generated - upkeep.get(channel);
    }
    rates
}
