use glam::Vec3;
use crate::domain::{BodyPart, PlayerId};

/// Collision layers a raycast can test against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerMask(u8);

impl LayerMask {
    pub const WORLD: LayerMask = LayerMask(0b01);
    pub const ENEMY: LayerMask = LayerMask(0b10);
    pub const SHOT: LayerMask = LayerMask(0b11);

    pub fn contains(self, other: LayerMask) -> bool {
        self.0 & other.0 == other.0
    }
}

/// What a raycast struck
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderRef {
    /// Player owning the collider directly
    pub owner: Option<PlayerId>,
    /// Player owning the physics body the collider is attached to
    pub body_owner: Option<PlayerId>,
    pub body_part: Option<BodyPart>,
}

impl ColliderRef {
    pub fn world() -> Self {
        Self { owner: None, body_owner: None, body_part: None }
    }

    /// Networked player behind this collider, if any
    pub fn player(&self) -> Option<PlayerId> {
        self.owner.or(self.body_owner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub collider: ColliderRef,
}

pub trait CollisionWorld {
    /// Closest hit along `direction` (unit length) within `max_distance`,
    /// skipping colliders belonging to `ignore`
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
        ignore: Option<PlayerId>,
    ) -> Option<RaycastHit>;
}

/// Axis aligned static geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min: min.min(max), max: min.max(max) }
    }

    /// Slab test, returns entry distance and surface normal
    fn intersect(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<(f32, Vec3)> {
        let mut t_min = 0.0_f32;
        let mut t_max = max_distance;
        let mut normal = Vec3::ZERO;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            if d.abs() < 1e-8 {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t1 = (self.min[axis] - o) * inv;
            let mut t2 = (self.max[axis] - o) * inv;
            let mut axis_normal = Vec3::ZERO;
            axis_normal[axis] = -d.signum();
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            if t1 > t_min {
                t_min = t1;
                normal = axis_normal;
            }
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }

        // origin inside the box
        if normal == Vec3::ZERO {
            normal = -direction;
        }
        Some((t_min, normal))
    }
}

/// Player hit volumes, spheres stacked from the feet up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerHitbox {
    pub player: PlayerId,
    pub feet: Vec3,
}

const LEGS: (f32, f32) = (0.45, 0.42);
const TORSO: (f32, f32) = (1.15, 0.45);
const HEAD: (f32, f32) = (1.7, 0.2);

/// Eye height above the feet, where shots originate
pub const EYE_HEIGHT: f32 = 1.65;

fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(direction);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sqrt = disc.sqrt();
    let t = -b - sqrt;
    if t >= 0.0 {
        return Some(t);
    }
    let t = -b + sqrt;
    if t >= 0.0 { Some(0.0) } else { None }
}

impl PlayerHitbox {
    fn parts(&self) -> [(BodyPart, Vec3, f32); 3] {
        [
            (BodyPart::Head, self.feet + Vec3::Y * HEAD.0, HEAD.1),
            (BodyPart::Torso, self.feet + Vec3::Y * TORSO.0, TORSO.1),
            (BodyPart::Legs, self.feet + Vec3::Y * LEGS.0, LEGS.1),
        ]
    }

    fn intersect(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RaycastHit> {
        let mut best: Option<RaycastHit> = None;
        for (part, center, radius) in self.parts() {
            let Some(t) = ray_sphere(origin, direction, center, radius) else {
                continue;
            };
            if t > max_distance || best.map(|b| t >= b.distance).unwrap_or(false) {
                continue;
            }
            let point = origin + direction * t;
            // Legs hang off the ragdoll body rather than the player root
            let collider = if part == BodyPart::Legs {
                ColliderRef { owner: None, body_owner: Some(self.player), body_part: Some(part) }
            } else {
                ColliderRef { owner: Some(self.player), body_owner: None, body_part: Some(part) }
            };
            best = Some(RaycastHit {
                point,
                normal: (point - center).normalize_or(-direction),
                distance: t,
                collider,
            });
        }
        best
    }
}

/// Static arena geometry plus the current player hit volumes
#[derive(Debug, Clone, Default)]
pub struct ArenaWorld {
    pub geometry: Vec<Aabb>,
    pub hitboxes: Vec<PlayerHitbox>,
}

impl ArenaWorld {
    pub fn new(geometry: Vec<Aabb>) -> Self {
        Self { geometry, hitboxes: Vec::new() }
    }

    /// Geometry for a named scene; unknown scenes get a bare floor
    pub fn for_scene(scene: &str) -> Self {
        let floor = Aabb::new(Vec3::new(-200.0, -1.0, -200.0), Vec3::new(200.0, 0.0, 200.0));
        let geometry = match scene {
            "arena" | "world" | "test_world" => vec![
                floor,
                Aabb::new(Vec3::new(-2.0, 0.0, 20.0), Vec3::new(2.0, 4.0, 22.0)),
                Aabb::new(Vec3::new(15.0, 0.0, -5.0), Vec3::new(17.0, 6.0, 5.0)),
            ],
            _ => {
                log::debug!("No geometry for scene '{}', using floor only", scene);
                vec![floor]
            }
        };
        Self::new(geometry)
    }

    pub fn set_hitboxes(&mut self, hitboxes: impl IntoIterator<Item = PlayerHitbox>) {
        self.hitboxes.clear();
        self.hitboxes.extend(hitboxes);
    }

    /// Nothing static between the two points
    pub fn check_line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
        let delta = to - from;
        let distance = delta.length();
        if distance <= f32::EPSILON {
            return true;
        }
        let direction = delta / distance;
        // stop just short so the surface a hit landed on does not block it
        self.raycast(from, direction, distance - 0.05, LayerMask::WORLD, None).is_none()
    }

}

impl CollisionWorld for ArenaWorld {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
        ignore: Option<PlayerId>,
    ) -> Option<RaycastHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || max_distance <= 0.0 {
            return None;
        }
        let mut best: Option<RaycastHit> = None;

        if mask.contains(LayerMask::WORLD) {
            for aabb in &self.geometry {
                if let Some((t, normal)) = aabb.intersect(origin, direction, max_distance) {
                    if best.map(|b| t < b.distance).unwrap_or(true) {
                        best = Some(RaycastHit {
                            point: origin + direction * t,
                            normal,
                            distance: t,
                            collider: ColliderRef::world(),
                        });
                    }
                }
            }
        }

        if mask.contains(LayerMask::ENEMY) {
            for hitbox in &self.hitboxes {
                if Some(hitbox.player) == ignore {
                    continue;
                }
                if let Some(hit) = hitbox.intersect(origin, direction, max_distance) {
                    if best.map(|b| hit.distance < b.distance).unwrap_or(true) {
                        best = Some(hit);
                    }
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_target() -> ArenaWorld {
        let mut world = ArenaWorld::for_scene("arena");
        world.set_hitboxes([
            PlayerHitbox { player: 1, feet: Vec3::new(0.0, 0.0, 0.0) },
            PlayerHitbox { player: 2, feet: Vec3::new(0.0, 0.0, 10.0) },
        ]);
        world
    }

    #[test]
    fn test_check_line_of_sight() {
        let world = ArenaWorld::for_scene("arena");
        assert!(world.check_line_of_sight(Vec3::new(0.0, 1.5, 0.0), Vec3::new(0.0, 1.5, 10.0)));
        // wall between z=20 and z=22
        assert!(!world.check_line_of_sight(Vec3::new(0.0, 1.5, 0.0), Vec3::new(0.0, 1.5, 30.0)));
    }

    #[test]
    fn test_shot_ray_hits_torso() {
        let world = world_with_target();
        let hit = world
            .raycast(Vec3::new(0.0, 1.15, 0.0), Vec3::Z, 100.0, LayerMask::SHOT, Some(1))
            .unwrap();
        assert_eq!(hit.collider.player(), Some(2));
        assert_eq!(hit.collider.body_part, Some(BodyPart::Torso));
        assert!((hit.distance - 9.55).abs() < 1e-3);
    }

    #[test]
    fn test_legs_resolve_through_body_owner() {
        let world = world_with_target();
        let hit = world
            .raycast(Vec3::new(0.0, 0.45, 2.0), Vec3::Z, f32::INFINITY, LayerMask::SHOT, Some(1))
            .unwrap();
        assert_eq!(hit.collider.owner, None);
        assert_eq!(hit.collider.player(), Some(2));
    }

    #[test]
    fn test_world_hit_normal_faces_ray() {
        let world = ArenaWorld::for_scene("arena");
        let hit = world
            .raycast(Vec3::new(0.0, 1.0, 0.0), Vec3::Z, f32::INFINITY, LayerMask::SHOT, None)
            .unwrap();
        assert!((hit.distance - 20.0).abs() < 1e-4);
        assert_eq!(hit.normal, Vec3::new(0.0, 0.0, -1.0));
        assert!(hit.collider.player().is_none());
    }

    #[test]
    fn test_ignored_player_is_transparent() {
        let world = world_with_target();
        let hit = world.raycast(Vec3::new(0.0, 1.15, -5.0), Vec3::Z, f32::INFINITY, LayerMask::SHOT, Some(1));
        assert_eq!(hit.unwrap().collider.player(), Some(2));
    }

    #[test]
    fn test_miss_into_sky() {
        let world = ArenaWorld::for_scene("arena");
        assert!(world.raycast(Vec3::new(0.0, 1.0, 0.0), Vec3::Y, f32::INFINITY, LayerMask::SHOT, None).is_none());
    }
}
