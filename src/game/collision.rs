//! Pairwise collision detection and resolution
//!
//! Every unordered pair of the combined entity list is tested once, in
//! ascending list order. The first matching rule wins:
//!
//! 1. projectile vs unit/structure it was not fired by: splash (if
//!    exploding), then direct damage unless the target already died
//! 2. unit vs structure: impulse on the unit only
//! 3. unit vs unit: symmetric impulse
//! 4. projectile vs projectile: splash of each exploding one, both destroyed
//!
//! Nothing is removed here; destroyed entities are only flagged.

use tracing::debug;

use super::combat::CombatEvent;
use super::error::PairFault;
use super::physics::PhysicsSystem;
use super::projectile::Projectile;
use super::world::{Entities, EntityRef};

/// Counters from one resolution pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollisionReport {
    pub pairs_checked: usize,
    pub collisions: usize,
    pub skipped: usize,
}

/// Resolve every colliding pair among the match's entities.
pub fn resolve_collisions(entities: &mut Entities, events: &mut Vec<CombatEvent>) -> CollisionReport {
    let refs = entities.combined();
    let mut report = CollisionReport::default();

    for i in 0..refs.len() {
        for j in (i + 1)..refs.len() {
            let (a, b) = (refs[i], refs[j]);
            report.pairs_checked += 1;

            let collided = match (entities.body(a), entities.body(b)) {
                (Some(body_a), Some(body_b)) => PhysicsSystem::collided(body_a, body_b),
                _ => {
                    debug!(?a, ?b, fault = %PairFault::StaleReference, "Skipping pair");
                    report.skipped += 1;
                    continue;
                }
            };
            if !collided || entities.is_destroyed(a) || entities.is_destroyed(b) {
                continue;
            }

            report.collisions += 1;
            if let Err(fault) = resolve_pair(entities, a, b, events) {
                debug!(?a, ?b, %fault, "Skipping pair");
                report.skipped += 1;
            }
        }
    }

    report
}

fn resolve_pair(
    entities: &mut Entities,
    a: EntityRef,
    b: EntityRef,
    events: &mut Vec<CombatEvent>,
) -> Result<(), PairFault> {
    match (a, b) {
        (EntityRef::Projectile(p), target @ (EntityRef::Unit(_) | EntityRef::Structure(_)))
        | (target @ (EntityRef::Unit(_) | EntityRef::Structure(_)), EntityRef::Projectile(p)) => {
            projectile_hit(entities, p, target, events)
        }
        (EntityRef::Unit(u), EntityRef::Structure(s))
        | (EntityRef::Structure(s), EntityRef::Unit(u)) => unit_against_structure(entities, u, s),
        (EntityRef::Unit(first), EntityRef::Unit(second)) => unit_against_unit(entities, first, second),
        (EntityRef::Projectile(first), EntityRef::Projectile(second)) => {
            projectile_against_projectile(entities, first, second, events)
        }
        (EntityRef::Structure(_), EntityRef::Structure(_)) => Ok(()),
    }
}

fn projectile_hit(
    entities: &mut Entities,
    p: usize,
    target: EntityRef,
    events: &mut Vec<CombatEvent>,
) -> Result<(), PairFault> {
    let projectile = entities
        .projectiles
        .get(p)
        .cloned()
        .ok_or(PairFault::StaleReference)?;
    let target_id = entities.id_of(target).ok_or(PairFault::StaleReference)?;

    // never hits its own firer
    if projectile.source == Some(target_id) {
        return Ok(());
    }

    let firer = entities.resolve_source(projectile.source);
    if projectile.explodes {
        detonate(entities, &projectile, events);
    }

    if !entities.is_dead(target) {
        if let Some(killed) = entities.damage(target, projectile.damage) {
            events.push(CombatEvent::Hit {
                source: projectile.source,
                target: target_id,
                damage: projectile.damage,
            });
            if killed {
                entities.credit_kill(firer);
                events.push(CombatEvent::Kill {
                    killer: firer.and_then(|f| entities.id_of(f)),
                    victim: target_id,
                });
            }
        }
    }

    entities.projectiles[p].destroyed = true;
    Ok(())
}

fn unit_against_structure(entities: &mut Entities, u: usize, s: usize) -> Result<(), PairFault> {
    let unit_body = entities.units.get(u).ok_or(PairFault::StaleReference)?.body;
    let structure_body = entities.structures.get(s).ok_or(PairFault::StaleReference)?.body;

    let velocity = PhysicsSystem::resolve_against_static(&unit_body, &structure_body)
        .ok_or(PairFault::DegenerateNormal)?;
    entities.units[u].body.velocity = velocity;
    Ok(())
}

fn unit_against_unit(entities: &mut Entities, first: usize, second: usize) -> Result<(), PairFault> {
    let body_a = entities.units.get(first).ok_or(PairFault::StaleReference)?.body;
    let body_b = entities.units.get(second).ok_or(PairFault::StaleReference)?.body;

    let result = PhysicsSystem::resolve_pair(&body_a, &body_b).ok_or(PairFault::DegenerateNormal)?;
    entities.units[first].body.velocity = result.velocity_a;
    entities.units[second].body.velocity = result.velocity_b;
    Ok(())
}

fn projectile_against_projectile(
    entities: &mut Entities,
    first: usize,
    second: usize,
    events: &mut Vec<CombatEvent>,
) -> Result<(), PairFault> {
    let a = entities
        .projectiles
        .get(first)
        .cloned()
        .ok_or(PairFault::StaleReference)?;
    let b = entities
        .projectiles
        .get(second)
        .cloned()
        .ok_or(PairFault::StaleReference)?;

    for projectile in [&a, &b] {
        if projectile.explodes {
            detonate(entities, projectile, events);
        }
    }

    entities.projectiles[first].destroyed = true;
    entities.projectiles[second].destroyed = true;
    Ok(())
}

/// Splash damage to every live unit and structure within the blast radius,
/// the firer's own entities included. Kills are credited to the firer.
fn detonate(entities: &mut Entities, projectile: &Projectile, events: &mut Vec<CombatEvent>) {
    let center = projectile.body.position;
    let radius_sq = projectile.splash_radius * projectile.splash_radius;
    let firer = entities.resolve_source(projectile.source);

    events.push(CombatEvent::Detonation {
        projectile: projectile.id,
        x: center.x,
        y: center.y,
        radius: projectile.splash_radius,
    });

    for entity in entities.combined() {
        if matches!(entity, EntityRef::Projectile(_)) || entities.is_destroyed(entity) {
            continue;
        }
        let in_blast = entities
            .body(entity)
            .map_or(false, |body| body.position.distance_squared(center) <= radius_sq);
        if !in_blast {
            continue;
        }

        if entities.damage(entity, projectile.splash_damage) == Some(true) {
            entities.credit_kill(firer);
            if let Some(victim) = entities.id_of(entity) {
                events.push(CombatEvent::Kill {
                    killer: firer.and_then(|f| entities.id_of(f)),
                    victim,
                });
            }
        }
    }
}
