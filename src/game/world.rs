//! Dense entity arenas owned by a match

use super::combat::{Attacker, Damageable};
use super::physics::Body;
use super::projectile::Projectile;
use super::structure::Structure;
use super::unit::Unit;
use super::EntityId;

/// Tag plus index into one of the three arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Unit(usize),
    Structure(usize),
    Projectile(usize),
}

/// Units, structures and projectiles of one match.
///
/// Destroyed entities stay in place, flagged, until `purge_destroyed`
/// runs at the end of the tick.
#[derive(Debug, Default)]
pub struct Entities {
    pub units: Vec<Unit>,
    pub structures: Vec<Structure>,
    pub projectiles: Vec<Projectile>,
    next_id: u64,
}

/// Entities removed by one compaction pass.
#[derive(Debug, Default)]
pub struct Purged {
    pub units: Vec<Unit>,
    pub structures: Vec<Structure>,
    pub projectiles: usize,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId(self.next_id)
    }

    pub fn len(&self) -> usize {
        self.units.len() + self.structures.len() + self.projectiles.len()
    }

    /// Units, then structures, then projectiles, each in arena order.
    pub fn combined(&self) -> Vec<EntityRef> {
        let mut refs = Vec::with_capacity(self.len());
        refs.extend((0..self.units.len()).map(EntityRef::Unit));
        refs.extend((0..self.structures.len()).map(EntityRef::Structure));
        refs.extend((0..self.projectiles.len()).map(EntityRef::Projectile));
        refs
    }

    pub fn body(&self, entity: EntityRef) -> Option<&Body> {
        match entity {
            EntityRef::Unit(i) => self.units.get(i).map(|u| &u.body),
            EntityRef::Structure(i) => self.structures.get(i).map(|s| &s.body),
            EntityRef::Projectile(i) => self.projectiles.get(i).map(|p| &p.body),
        }
    }

    pub fn id_of(&self, entity: EntityRef) -> Option<EntityId> {
        match entity {
            EntityRef::Unit(i) => self.units.get(i).map(|u| u.id),
            EntityRef::Structure(i) => self.structures.get(i).map(|s| s.id),
            EntityRef::Projectile(i) => self.projectiles.get(i).map(|p| p.id),
        }
    }

    pub fn is_destroyed(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Unit(i) => self.units.get(i).map_or(true, |u| u.is_destroyed()),
            EntityRef::Structure(i) => self.structures.get(i).map_or(true, |s| s.is_destroyed()),
            EntityRef::Projectile(i) => self.projectiles.get(i).map_or(true, |p| p.destroyed),
        }
    }

    fn damageable_mut(&mut self, entity: EntityRef) -> Option<&mut dyn Damageable> {
        match entity {
            EntityRef::Unit(i) => self.units.get_mut(i).map(|u| u as &mut dyn Damageable),
            EntityRef::Structure(i) => self
                .structures
                .get_mut(i)
                .map(|s| s as &mut dyn Damageable),
            EntityRef::Projectile(_) => None,
        }
    }

    /// Damage a unit or structure. `Some(true)` if the hit killed it,
    /// `None` if the entity cannot take damage.
    pub fn damage(&mut self, entity: EntityRef, amount: f64) -> Option<bool> {
        self.damageable_mut(entity).map(|target| target.damage(amount))
    }

    pub fn is_dead(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Unit(i) => self.units.get(i).map_or(true, |u| u.is_dead()),
            EntityRef::Structure(i) => self.structures.get(i).map_or(true, |s| s.is_dead()),
            EntityRef::Projectile(_) => false,
        }
    }

    /// Resolve a projectile's weak source reference. Missing or destroyed
    /// firers resolve to `None`.
    pub fn resolve_source(&self, source: Option<EntityId>) -> Option<EntityRef> {
        let id = source?;
        if let Some(i) = self.units.iter().position(|u| u.id == id) {
            return (!self.units[i].destroyed).then_some(EntityRef::Unit(i));
        }
        if let Some(i) = self.structures.iter().position(|s| s.id == id) {
            return (!self.structures[i].destroyed).then_some(EntityRef::Structure(i));
        }
        None
    }

    pub fn credit_kill(&mut self, attacker: Option<EntityRef>) {
        match attacker {
            Some(EntityRef::Unit(i)) => {
                if let Some(unit) = self.units.get_mut(i) {
                    unit.credit_kill();
                }
            }
            Some(EntityRef::Structure(i)) => {
                if let Some(structure) = self.structures.get_mut(i) {
                    structure.credit_kill();
                }
            }
            _ => {}
        }
    }

    pub fn unit_index(&self, id: EntityId) -> Option<usize> {
        self.units.iter().position(|u| u.id == id)
    }

    pub fn structure_index(&self, id: EntityId) -> Option<usize> {
        self.structures.iter().position(|s| s.id == id)
    }

    /// Remove every flagged entity in one pass.
    pub fn purge_destroyed(&mut self) -> Purged {
        let (dead_units, live_units): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.units).into_iter().partition(|u| u.destroyed);
        let (dead_structures, live_structures): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.structures)
                .into_iter()
                .partition(|s| s.destroyed);
        self.units = live_units;
        self.structures = live_structures;

        let before = self.projectiles.len();
        self.projectiles.retain(|p| !p.destroyed);

        Purged {
            units: dead_units,
            structures: dead_structures,
            projectiles: before - self.projectiles.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::stats::{StructureType, UnitType};
    use crate::game::vector::Vec2;

    fn populated() -> Entities {
        let mut entities = Entities::new();
        for x in [100.0, 200.0] {
            let id = entities.allocate_id();
            entities
                .units
                .push(Unit::new(id, UnitType::Archer, 1, None, Vec2::new(x, 100.0)));
        }
        let id = entities.allocate_id();
        entities.structures.push(Structure::new(
            id,
            StructureType::WatchTower,
            2,
            None,
            Vec2::new(300.0, 300.0),
        ));
        entities
    }

    #[test]
    fn test_combined_order_is_units_structures_projectiles() {
        let mut entities = populated();
        let archer = entities.units[0].clone();
        let id = entities.allocate_id();
        entities
            .projectiles
            .push(Projectile::create_from_unit(id, &archer, 0.0).unwrap());

        assert_eq!(
            entities.combined(),
            vec![
                EntityRef::Unit(0),
                EntityRef::Unit(1),
                EntityRef::Structure(0),
                EntityRef::Projectile(0),
            ]
        );
    }

    #[test]
    fn test_destroyed_source_resolves_to_unknown() {
        let mut entities = populated();
        let firer = entities.units[1].id;
        assert_eq!(entities.resolve_source(Some(firer)), Some(EntityRef::Unit(1)));

        entities.units[1].destroyed = true;
        assert_eq!(entities.resolve_source(Some(firer)), None);

        entities.purge_destroyed();
        assert_eq!(entities.resolve_source(Some(firer)), None);
        assert_eq!(entities.resolve_source(None), None);
    }

    #[test]
    fn test_purge_keeps_survivor_order() {
        let mut entities = populated();
        let survivor = entities.units[1].id;
        assert_eq!(entities.damage(EntityRef::Unit(0), 500.0), Some(true));
        assert_eq!(entities.damage(EntityRef::Projectile(0), 500.0), None);

        let purged = entities.purge_destroyed();
        assert_eq!(purged.units.len(), 1);
        assert_eq!(entities.units.len(), 1);
        assert_eq!(entities.units[0].id, survivor);
        assert_eq!(entities.structures.len(), 1);
    }
}
