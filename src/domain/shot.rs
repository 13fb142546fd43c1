//! Turns one trigger pull into pellet raycasts, cosmetic FX and authoritative
//! damage submissions.

use glam::Vec3;
use rand::Rng;
use smallvec::SmallVec;
use crate::domain::relay::{damage_allowed, DamageRequest, MatchSettings, ShotFx, TeamRoster};
use crate::domain::simulator::{CollisionWorld, LayerMask};
use crate::domain::{BodyPart, PlayerId};
use crate::utils::mathf::inverse_lerp;
use crate::utils::weapondb::WeaponDefinition;

/// Tracer length when nothing was hit
pub const MAX_RANGE: f32 = 600.0;

/// Camera-relative aim frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimBasis {
    pub origin: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl AimBasis {
    /// Build a basis around `forward` with world up as the reference
    pub fn from_forward(origin: Vec3, forward: Vec3) -> Self {
        let forward = forward.normalize_or(Vec3::Z);
        let reference = if forward.dot(Vec3::Y).abs() > 0.999 { Vec3::Z } else { Vec3::Y };
        let right = reference.cross(forward).normalize();
        let up = forward.cross(right).normalize();
        Self { origin, forward, right, up }
    }
}

/// Who fired and with what
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotContext {
    pub shooter: PlayerId,
    pub weapon_index: usize,
    /// Sequence number of the first pellet; pellets count up from here
    pub first_shot_seq: u64,
    pub multiplier: f32,
}

/// One resolved pellet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotEvent {
    pub shot_seq: u64,
    pub origin: Vec3,
    pub direction: Vec3,
    pub impact_point: Vec3,
    pub impact_normal: Vec3,
    pub made_impact: bool,
    pub target: Option<PlayerId>,
    pub friendly_fire_suppressed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ShotResolution {
    pub shots: SmallVec<[ShotEvent; 8]>,
    pub fx: SmallVec<[ShotFx; 8]>,
    pub damage: SmallVec<[DamageRequest; 8]>,
}

/// Uniform sample inside the spread cone, expressed in the aim basis
pub fn spread_direction<R: Rng + ?Sized>(basis: &AimBasis, spread_degrees: f32, rng: &mut R) -> Vec3 {
    if spread_degrees <= 0.0 {
        return basis.forward;
    }
    let radius = spread_degrees.min(89.0).to_radians().tan();
    let r = rng.gen::<f32>().sqrt() * radius;
    let theta = rng.gen::<f32>() * std::f32::consts::TAU;
    (basis.forward + basis.right * (r * theta.cos()) + basis.up * (r * theta.sin())).normalize()
}

/// Damage for a hit at `distance` before the multiplier cap is applied
pub fn compute_damage(def: &WeaponDefinition, distance: f32, multiplier: f32) -> f32 {
    let profile = &def.damage;
    let mut damage = profile.base_damage;

    if let Some(falloff) = profile.falloff {
        if distance > falloff.max_damage_range {
            let t = inverse_lerp(falloff.max_damage_range, falloff.min_damage_range, distance);
            damage = profile.base_damage + (falloff.min_damage - profile.base_damage) * t;
        }
    }

    if let Some(pellets) = profile.pellets {
        damage *= pellets.pellet_damage_multiplier;
    }

    (damage * multiplier).min(profile.damage_cap)
}

pub fn resolve_shot<W, S, R>(
    ctx: &ShotContext,
    basis: &AimBasis,
    def: &WeaponDefinition,
    world: &W,
    settings: &S,
    rng: &mut R,
) -> ShotResolution
where
    W: CollisionWorld + ?Sized,
    S: MatchSettings + TeamRoster + ?Sized,
    R: Rng + ?Sized,
{
    let mut resolution = ShotResolution::default();
    let mode = settings.game_mode();
    let shooter_team = settings.team_of(ctx.shooter);

    for pellet in 0..def.pellet_count() {
        let shot_seq = ctx.first_shot_seq + u64::from(pellet);
        let direction = spread_direction(basis, def.damage.bullet_spread, rng);
        let hit = world.raycast(
            basis.origin,
            direction,
            f32::INFINITY,
            LayerMask::SHOT,
            Some(ctx.shooter),
        );

        let mut event = ShotEvent {
            shot_seq,
            origin: basis.origin,
            direction,
            impact_point: basis.origin + direction * MAX_RANGE,
            impact_normal: -direction,
            made_impact: false,
            target: None,
            friendly_fire_suppressed: false,
        };

        if let Some(hit) = hit {
            event.impact_point = hit.point;
            event.impact_normal = hit.normal;
            event.made_impact = true;
            event.target = hit.collider.player();

            if let Some(target) = event.target {
                if damage_allowed(mode, shooter_team, settings.team_of(target)) {
                    let body_part = hit.collider.body_part;
                    resolution.damage.push(DamageRequest {
                        target,
                        damage: compute_damage(def, hit.distance, ctx.multiplier),
                        hit_point: hit.point,
                        hit_direction: direction,
                        body_part,
                        is_headshot: body_part == Some(BodyPart::Head),
                        weapon_index: ctx.weapon_index,
                        shot_seq,
                    });
                } else {
                    event.friendly_fire_suppressed = true;
                }
            }
        }

        resolution.fx.push(ShotFx {
            start: basis.origin,
            end_point: event.impact_point,
            hit_normal: event.impact_normal,
            made_impact: event.made_impact,
            hit_player: event.target.is_some(),
            play_muzzle_flash: pellet == 0,
        });
        resolution.shots.push(event);
    }

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::relay::GameMode;
    use crate::domain::simulator::{ArenaWorld, PlayerHitbox};
    use crate::domain::TeamId;
    use crate::utils::weapondb::WeaponDb;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    struct Match {
        mode: GameMode,
        teams: HashMap<PlayerId, TeamId>,
    }

    impl MatchSettings for Match {
        fn game_mode(&self) -> GameMode {
            self.mode
        }
    }

    impl TeamRoster for Match {
        fn team_of(&self, player: PlayerId) -> Option<TeamId> {
            self.teams.get(&player).copied()
        }
    }

    fn same_team(mode: GameMode) -> Match {
        Match { mode, teams: HashMap::from([(1, 0), (2, 0)]) }
    }

    fn duel_world(target_z: f32) -> ArenaWorld {
        let mut world = ArenaWorld::for_scene("flat");
        world.set_hitboxes([
            PlayerHitbox { player: 1, feet: Vec3::ZERO },
            PlayerHitbox { player: 2, feet: Vec3::new(0.0, 0.0, target_z) },
        ]);
        world
    }

    fn torso_aim() -> AimBasis {
        AimBasis::from_forward(Vec3::new(0.0, 1.15, 0.0), Vec3::Z)
    }

    fn ctx(multiplier: f32) -> ShotContext {
        ShotContext { shooter: 1, weapon_index: 0, first_shot_seq: 40, multiplier }
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let basis = AimBasis::from_forward(Vec3::ZERO, Vec3::new(1.0, 0.2, 0.5));
        assert!(basis.forward.dot(basis.right).abs() < 1e-5);
        assert!(basis.forward.dot(basis.up).abs() < 1e-5);
        assert!((basis.right.length() - 1.0).abs() < 1e-5);
        let straight_up = AimBasis::from_forward(Vec3::ZERO, Vec3::Y);
        assert!(straight_up.right.is_finite());
    }

    #[test]
    fn test_spread_stays_inside_cone() {
        let basis = torso_aim();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let limit = 6.0_f32.to_radians().cos();
        for _ in 0..500 {
            let dir = spread_direction(&basis, 6.0, &mut rng);
            assert!(dir.dot(basis.forward) >= limit - 1e-5);
        }
        assert_eq!(spread_direction(&basis, 0.0, &mut rng), basis.forward);
    }

    #[test]
    fn test_compute_damage_falloff() {
        let db = WeaponDb::load();
        let rifle = db.get(1).unwrap();
        assert_eq!(compute_damage(rifle, 10.0, 1.0), 20.0);
        assert_eq!(compute_damage(rifle, 30.0, 1.0), 20.0);
        assert!((compute_damage(rifle, 55.0, 1.0) - 16.0).abs() < 1e-4);
        assert_eq!(compute_damage(rifle, 500.0, 1.0), 12.0);
        // multiplier then cap
        assert_eq!(compute_damage(rifle, 10.0, 2.0), 40.0);
        assert_eq!(compute_damage(rifle, 10.0, 4.0), 60.0);
    }

    #[test]
    fn test_hit_produces_one_damage_request() {
        let db = WeaponDb::load();
        let pistol = db.get(2).unwrap();
        let world = duel_world(10.0);
        let settings = Match { mode: GameMode::FreeForAll, teams: HashMap::new() };
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let res = resolve_shot(&ctx(1.5), &torso_aim(), pistol, &world, &settings, &mut rng);
        assert_eq!(res.shots.len(), 1);
        assert_eq!(res.fx.len(), 1);
        assert_eq!(res.damage.len(), 1);
        let request = res.damage[0];
        assert_eq!(request.target, 2);
        assert_eq!(request.damage, 37.5);
        assert_eq!(request.shot_seq, 40);
        assert_eq!(request.body_part, Some(BodyPart::Torso));
        assert!(!request.is_headshot);
        assert!(res.fx[0].hit_player);
        assert!(res.fx[0].play_muzzle_flash);
    }

    #[test]
    fn test_miss_traces_to_max_range() {
        let db = WeaponDb::load();
        let pistol = db.get(2).unwrap();
        let world = ArenaWorld::for_scene("flat");
        let settings = Match { mode: GameMode::FreeForAll, teams: HashMap::new() };
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let res = resolve_shot(&ctx(1.0), &torso_aim(), pistol, &world, &settings, &mut rng);
        let shot = res.shots[0];
        assert!(!shot.made_impact);
        assert_eq!(shot.impact_point, Vec3::new(0.0, 1.15, 600.0));
        assert!(res.damage.is_empty());
        assert!(!res.fx[0].made_impact);
    }

    #[test]
    fn test_friendly_fire_pellets_fx_only() {
        let db = WeaponDb::load();
        let scatter = db.get(3).unwrap();
        let world = duel_world(3.0);
        let settings = same_team(GameMode::TeamDeathmatch);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let res = resolve_shot(&ctx(1.0), &torso_aim(), scatter, &world, &settings, &mut rng);
        assert_eq!(res.shots.len(), 8);
        assert_eq!(res.fx.len(), 8);
        assert!(res.damage.is_empty());
        assert!(res.shots.iter().all(|s| s.target == Some(2) && s.friendly_fire_suppressed));
        assert_eq!(res.fx.iter().filter(|fx| fx.play_muzzle_flash).count(), 1);
    }

    #[test]
    fn test_same_team_in_free_for_all_takes_damage() {
        let db = WeaponDb::load();
        let scatter = db.get(3).unwrap();
        let world = duel_world(3.0);
        let settings = same_team(GameMode::FreeForAll);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let res = resolve_shot(&ctx(1.0), &torso_aim(), scatter, &world, &settings, &mut rng);
        assert_eq!(res.damage.len(), 8);
        let seqs: Vec<u64> = res.damage.iter().map(|d| d.shot_seq).collect();
        assert_eq!(seqs, (40..48).collect::<Vec<u64>>());
        for request in &res.damage {
            assert!((request.damage - 3.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_headshot_flag() {
        let db = WeaponDb::load();
        let pistol = db.get(2).unwrap();
        let world = duel_world(10.0);
        let settings = Match { mode: GameMode::FreeForAll, teams: HashMap::new() };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let aim = AimBasis::from_forward(Vec3::new(0.0, 1.7, 0.0), Vec3::Z);

        let res = resolve_shot(&ctx(1.0), &aim, pistol, &world, &settings, &mut rng);
        assert!(res.damage[0].is_headshot);
        assert_eq!(res.damage[0].body_part, Some(BodyPart::Head));
    }
}
