//! Broad-phase collision detection and callback dispatch
//!
//! The engine keeps non-owning handles to registered entities. Every step it
//! pulls fresh bounds from the world, tests every unordered pair in
//! registration order and invokes both collision hooks once per overlapping
//! pair. Overlap that persists across steps fires again on every step.

use std::fmt::Debug;

use glam::Vec3;

use super::bounds::{Aabb, Ray, Sphere};
use super::entity::EntityId;
use super::error::LifecycleError;

/// What an entity's collision hook reports about itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionResponse {
    /// No gameplay meaning (or no hook)
    #[default]
    Ignore,
    /// Solid obstacle: touching it is a crash
    Blocking,
    /// Pickup: touching it collects it
    Collectible,
}

/// Capability to take part in collision checks
pub trait Collidable<K = EntityId> {
    /// Current world position (sphere center for the fast path)
    fn position(&self) -> Vec3;

    /// Bounding box computed from the current transform
    fn bounding_box(&self) -> Option<Aabb> {
        None
    }

    /// Radius for the sphere fast path
    fn collision_radius(&self) -> Option<f32> {
        None
    }

    /// Called once per overlapping pair per step with the other party
    fn on_collision(&mut self, _other: K) -> CollisionResponse {
        CollisionResponse::Ignore
    }
}

/// Bounding geometry used for ray queries: box when present, else sphere
pub fn ray_volume<K>(collidable: &dyn Collidable<K>) -> Result<RayVolume, LifecycleError> {
    if let Some(aabb) = collidable.bounding_box() {
        return Ok(RayVolume::Box(aabb));
    }
    match collidable.collision_radius() {
        Some(radius) => Ok(RayVolume::Sphere(Sphere::new(collidable.position(), radius))),
        None => Err(LifecycleError::InvalidBounds),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RayVolume {
    Box(Aabb),
    Sphere(Sphere),
}

impl RayVolume {
    fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        match self {
            RayVolume::Box(aabb) => aabb.intersect_ray(ray),
            RayVolume::Sphere(sphere) => sphere.intersect_ray(ray),
        }
    }
}

/// Read access to the entities behind registered handles
pub trait CollisionView<K> {
    fn collidable(&self, id: K) -> Option<&dyn Collidable<K>>;
}

/// Mutable access, needed to run collision hooks
pub trait CollisionWorld<K>: CollisionView<K> {
    fn collidable_mut(&mut self, id: K) -> Option<&mut dyn Collidable<K>>;
}

/// One overlapping pair, with each side's hook response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact<K> {
    /// Earlier in registration order
    pub a: K,
    pub b: K,
    /// What `a`'s hook returned when told about `b`
    pub response_a: CollisionResponse,
    /// What `b`'s hook returned when told about `a`
    pub response_b: CollisionResponse,
}

/// Outcome of one collision pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport<K> {
    /// Pairs where both sides had bounds and were tested
    pub pairs_tested: usize,
    /// Overlapping pairs in detection order
    pub contacts: Vec<Contact<K>>,
    /// Registered entities skipped for missing bounds (or missing from the world)
    pub skipped: usize,
}

impl<K> Default for StepReport<K> {
    fn default() -> Self {
        Self {
            pairs_tested: 0,
            contacts: Vec::new(),
            skipped: 0,
        }
    }
}

/// Nearest ray hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit<K> {
    pub id: K,
    pub distance: f32,
    pub point: Vec3,
}

#[derive(Debug, Clone)]
struct Registration<K> {
    id: K,
    /// Box from the most recent step
    bounds: Option<Aabb>,
}

/// Registered-collidable set plus the pairwise overlap pass
#[derive(Debug, Clone)]
pub struct CollisionEngine<K = EntityId> {
    entries: Vec<Registration<K>>,
}

impl<K> Default for CollisionEngine<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: Copy + Eq + Debug> CollisionEngine<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the checked set. Returns false (and changes nothing) when
    /// the entity is already registered.
    pub fn register(&mut self, id: K) -> bool {
        if self.is_registered(id) {
            log::trace!("{:?} already registered", id);
            return false;
        }
        self.entries.push(Registration { id, bounds: None });
        true
    }

    /// Remove from the checked set, keeping the order of the others
    pub fn try_deregister(&mut self, id: K) -> Result<(), LifecycleError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(LifecycleError::NotRegistered)?;
        self.entries.remove(index);
        Ok(())
    }

    /// Remove from the checked set; no-op when absent
    pub fn deregister(&mut self, id: K) -> bool {
        match self.try_deregister(id) {
            Ok(()) => true,
            Err(err) => {
                log::trace!("deregister {:?}: {}", id, err);
                false
            }
        }
    }

    pub fn is_registered(&self, id: K) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered handles in registration order
    pub fn ids(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    /// Box computed for `id` by the last step
    pub fn bounds_of(&self, id: K) -> Option<Aabb> {
        self.entries.iter().find(|e| e.id == id).and_then(|e| e.bounds)
    }

    /// Drop every registration
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Refresh bounds, test all pairs, dispatch hooks
    pub fn step<W>(&mut self, world: &mut W) -> StepReport<K>
    where
        W: CollisionWorld<K> + ?Sized,
    {
        let mut report = StepReport::default();

        for entry in &mut self.entries {
            entry.bounds = world.collidable(entry.id).and_then(|c| c.bounding_box());
            if entry.bounds.is_none() {
                report.skipped += 1;
            }
        }

        let mut pairs = Vec::new();
        for (i, a) in self.entries.iter().enumerate() {
            let Some(box_a) = a.bounds else { continue };
            for b in &self.entries[i + 1..] {
                let Some(box_b) = b.bounds else { continue };
                report.pairs_tested += 1;
                if box_a.intersects(&box_b) {
                    pairs.push((a.id, b.id));
                }
            }
        }

        report.contacts = dispatch(world, pairs);
        report
    }

    /// Center-distance pass using collision radii instead of boxes.
    /// Triggers when the distance is below the sum of radii.
    pub fn step_spheres<W>(&mut self, world: &mut W) -> StepReport<K>
    where
        W: CollisionWorld<K> + ?Sized,
    {
        let mut report = StepReport::default();

        let spheres: Vec<(K, Option<Sphere>)> = self
            .entries
            .iter()
            .map(|e| {
                let sphere = world.collidable(e.id).and_then(|c| {
                    c.collision_radius()
                        .map(|radius| Sphere::new(c.position(), radius))
                });
                (e.id, sphere)
            })
            .collect();
        report.skipped = spheres.iter().filter(|(_, s)| s.is_none()).count();

        let mut pairs = Vec::new();
        for (i, (id_a, sphere_a)) in spheres.iter().enumerate() {
            let Some(sphere_a) = sphere_a else { continue };
            for (id_b, sphere_b) in &spheres[i + 1..] {
                let Some(sphere_b) = sphere_b else { continue };
                report.pairs_tested += 1;
                if sphere_a.overlaps(sphere_b) {
                    pairs.push((*id_a, *id_b));
                }
            }
        }

        report.contacts = dispatch(world, pairs);
        report
    }

    /// Nearest registered entity hit by a ray within `max_distance`
    pub fn cast_ray<V>(
        &self,
        view: &V,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<RayHit<K>>
    where
        V: CollisionView<K> + ?Sized,
    {
        self.cast_ray_filtered(view, origin, direction, max_distance, |_| true)
    }

    /// Like [`cast_ray`](Self::cast_ray), considering only ids accepted by `filter`
    pub fn cast_ray_filtered<V, F>(
        &self,
        view: &V,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: F,
    ) -> Option<RayHit<K>>
    where
        V: CollisionView<K> + ?Sized,
        F: Fn(K) -> bool,
    {
        let ray = Ray::new(origin, direction)?;
        let mut nearest: Option<RayHit<K>> = None;

        for entry in self.entries.iter().filter(|e| filter(e.id)) {
            let Some(collidable) = view.collidable(entry.id) else {
                continue;
            };
            let volume = match ray_volume(collidable) {
                Ok(volume) => volume,
                Err(err) => {
                    log::trace!("ray skips {:?}: {}", entry.id, err);
                    continue;
                }
            };
            let Some(t) = volume.intersect_ray(&ray) else {
                continue;
            };
            if t > max_distance {
                continue;
            }
            if nearest.is_none_or(|hit| t < hit.distance) {
                nearest = Some(RayHit {
                    id: entry.id,
                    distance: t,
                    point: ray.point_at(t),
                });
            }
        }

        nearest
    }
}

/// Run `a`'s hook with `b`, then `b`'s hook with `a`, for every pair
fn dispatch<K, W>(world: &mut W, pairs: Vec<(K, K)>) -> Vec<Contact<K>>
where
    K: Copy + Debug,
    W: CollisionWorld<K> + ?Sized,
{
    pairs
        .into_iter()
        .map(|(a, b)| {
            let response_a = world
                .collidable_mut(a)
                .map(|c| c.on_collision(b))
                .unwrap_or_default();
            let response_b = world
                .collidable_mut(b)
                .map(|c| c.on_collision(a))
                .unwrap_or_default();
            log::trace!("contact {:?} <-> {:?}", a, b);
            Contact {
                a,
                b,
                response_a,
                response_b,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    /// Minimal collidable that records every hook call
    #[derive(Debug, Default)]
    struct Probe {
        aabb: Option<Aabb>,
        radius: Option<f32>,
        center: Vec3,
        hits: Vec<u32>,
    }

    impl Probe {
        fn boxed(min: Vec3, max: Vec3) -> Self {
            let aabb = Aabb::new(min, max);
            Self {
                aabb: Some(aabb),
                center: aabb.center(),
                ..Default::default()
            }
        }

        fn sphere(center: Vec3, radius: f32) -> Self {
            Self {
                radius: Some(radius),
                center,
                ..Default::default()
            }
        }
    }

    impl Collidable<u32> for Probe {
        fn position(&self) -> Vec3 {
            self.center
        }
        fn bounding_box(&self) -> Option<Aabb> {
            self.aabb
        }
        fn collision_radius(&self) -> Option<f32> {
            self.radius
        }
        fn on_collision(&mut self, other: u32) -> CollisionResponse {
            self.hits.push(other);
            CollisionResponse::Blocking
        }
    }

    #[derive(Default)]
    struct TestWorld {
        probes: HashMap<u32, Probe>,
    }

    impl CollisionView<u32> for TestWorld {
        fn collidable(&self, id: u32) -> Option<&dyn Collidable<u32>> {
            self.probes.get(&id).map(|p| p as &dyn Collidable<u32>)
        }
    }

    impl CollisionWorld<u32> for TestWorld {
        fn collidable_mut(&mut self, id: u32) -> Option<&mut dyn Collidable<u32>> {
            self.probes.get_mut(&id).map(|p| p as &mut dyn Collidable<u32>)
        }
    }

    fn world_with(probes: Vec<(u32, Probe)>) -> (TestWorld, CollisionEngine<u32>) {
        let mut engine = CollisionEngine::new();
        let mut world = TestWorld::default();
        for (id, probe) in probes {
            engine.register(id);
            world.probes.insert(id, probe);
        }
        (world, engine)
    }

    #[test]
    fn test_overlapping_boxes_fire_both_hooks_once() {
        let (mut world, mut engine) = world_with(vec![
            (1, Probe::boxed(Vec3::ZERO, Vec3::ONE)),
            (2, Probe::boxed(Vec3::splat(0.5), Vec3::splat(1.5))),
        ]);

        let report = engine.step(&mut world);

        assert_eq!(report.contacts.len(), 1);
        assert_eq!(report.contacts[0].a, 1);
        assert_eq!(report.contacts[0].b, 2);
        assert_eq!(report.contacts[0].response_a, CollisionResponse::Blocking);
        assert_eq!(world.probes[&1].hits, vec![2]);
        assert_eq!(world.probes[&2].hits, vec![1]);
    }

    #[test]
    fn test_sustained_overlap_fires_every_step() {
        let (mut world, mut engine) = world_with(vec![
            (1, Probe::boxed(Vec3::ZERO, Vec3::ONE)),
            (2, Probe::boxed(Vec3::splat(0.5), Vec3::splat(1.5))),
        ]);

        for _ in 0..3 {
            engine.step(&mut world);
        }
        assert_eq!(world.probes[&1].hits, vec![2, 2, 2]);
        assert_eq!(world.probes[&2].hits, vec![1, 1, 1]);
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let (mut world, mut engine) = world_with(vec![
            (1, Probe::boxed(Vec3::ZERO, Vec3::ONE)),
            (2, Probe::boxed(Vec3::splat(0.5), Vec3::splat(1.5))),
        ]);
        assert!(!engine.register(1));
        assert!(!engine.register(2));
        assert_eq!(engine.len(), 2);

        let report = engine.step(&mut world);
        assert_eq!(report.contacts.len(), 1);
        assert_eq!(world.probes[&1].hits.len(), 1);
    }

    #[test]
    fn test_deregister_absent_is_noop() {
        let mut engine: CollisionEngine<u32> = CollisionEngine::new();
        engine.register(7);
        assert!(!engine.deregister(3));
        assert_eq!(engine.try_deregister(3), Err(LifecycleError::NotRegistered));
        assert!(engine.deregister(7));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_zero_or_one_entity_has_no_pairs() {
        let (mut world, mut engine) = world_with(vec![]);
        let report = engine.step(&mut world);
        assert_eq!(report.pairs_tested, 0);

        let (mut world, mut engine) = world_with(vec![(1, Probe::boxed(Vec3::ZERO, Vec3::ONE))]);
        let report = engine.step(&mut world);
        assert_eq!(report.pairs_tested, 0);
        assert!(report.contacts.is_empty());
    }

    #[test]
    fn test_unbounded_entity_is_skipped_but_stays_registered() {
        let (mut world, mut engine) = world_with(vec![
            (1, Probe::boxed(Vec3::ZERO, Vec3::ONE)),
            (2, Probe::sphere(Vec3::splat(0.5), 1.0)),
        ]);

        let report = engine.step(&mut world);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.pairs_tested, 0);
        assert!(report.contacts.is_empty());
        assert!(engine.is_registered(2));
    }

    #[test]
    fn test_bounds_refresh_each_step() {
        let (mut world, mut engine) = world_with(vec![
            (1, Probe::boxed(Vec3::ZERO, Vec3::ONE)),
            (2, Probe::boxed(Vec3::splat(5.0), Vec3::splat(6.0))),
        ]);
        assert!(engine.step(&mut world).contacts.is_empty());

        // Move probe 2 onto probe 1; the next step must see the new box
        if let Some(probe) = world.probes.get_mut(&2) {
            probe.aabb = Some(Aabb::new(Vec3::splat(0.9), Vec3::splat(2.0)));
        }
        assert_eq!(engine.step(&mut world).contacts.len(), 1);
        assert_eq!(
            engine.bounds_of(2),
            Some(Aabb::new(Vec3::splat(0.9), Vec3::splat(2.0)))
        );
    }

    #[test]
    fn test_deregistered_entity_never_collides() {
        let (mut world, mut engine) = world_with(vec![
            (1, Probe::boxed(Vec3::ZERO, Vec3::ONE)),
            (2, Probe::boxed(Vec3::splat(0.5), Vec3::splat(1.5))),
        ]);
        engine.deregister(2);
        assert!(engine.step(&mut world).contacts.is_empty());
        assert!(world.probes[&1].hits.is_empty());
    }

    #[test]
    fn test_sphere_fast_path() {
        let (mut world, mut engine) = world_with(vec![
            (1, Probe::sphere(Vec3::ZERO, 1.0)),
            (2, Probe::sphere(Vec3::new(1.5, 0.0, 0.0), 1.0)),
            (3, Probe::sphere(Vec3::new(10.0, 0.0, 0.0), 1.0)),
            (4, Probe::boxed(Vec3::ZERO, Vec3::ONE)),
        ]);

        let report = engine.step_spheres(&mut world);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.pairs_tested, 3);
        assert_eq!(report.contacts.len(), 1);
        assert_eq!(world.probes[&1].hits, vec![2]);
        assert_eq!(world.probes[&2].hits, vec![1]);
        assert!(world.probes[&3].hits.is_empty());
    }

    #[test]
    fn test_cast_ray_returns_nearest() {
        let (world, engine) = world_with(vec![
            (1, Probe::boxed(Vec3::new(-1.0, -1.0, -30.0), Vec3::new(1.0, 1.0, -28.0))),
            (2, Probe::boxed(Vec3::new(-1.0, -1.0, -12.0), Vec3::new(1.0, 1.0, -10.0))),
            (3, Probe::sphere(Vec3::new(0.0, 0.0, -20.0), 1.0)),
            (4, Probe::boxed(Vec3::new(5.0, -1.0, -6.0), Vec3::new(6.0, 1.0, -4.0))),
        ]);

        let hit = engine
            .cast_ray(&world, Vec3::ZERO, Vec3::NEG_Z, 100.0)
            .expect("hit");
        assert_eq!(hit.id, 2);
        assert!((hit.distance - 10.0).abs() < 1e-4);
        assert!((hit.point.z + 10.0).abs() < 1e-4);

        // Filter out the nearest; the sphere is next
        let hit = engine
            .cast_ray_filtered(&world, Vec3::ZERO, Vec3::NEG_Z, 100.0, |id| id != 2)
            .expect("hit");
        assert_eq!(hit.id, 3);
    }

    #[test]
    fn test_cast_ray_respects_max_distance() {
        let (world, engine) = world_with(vec![(
            1,
            Probe::boxed(Vec3::new(-1.0, -1.0, -30.0), Vec3::new(1.0, 1.0, -28.0)),
        )]);
        assert!(engine.cast_ray(&world, Vec3::ZERO, Vec3::NEG_Z, 20.0).is_none());
        assert!(engine.cast_ray(&world, Vec3::ZERO, Vec3::ZERO, 100.0).is_none());
    }

    #[test]
    fn test_ray_volume_requires_bounds() {
        let probe = Probe::default();
        assert_eq!(
            ray_volume::<u32>(&probe).unwrap_err(),
            LifecycleError::InvalidBounds
        );
    }

    fn arb_box() -> impl Strategy<Value = Aabb> {
        (
            -5.0f32..5.0,
            -5.0f32..5.0,
            -5.0f32..5.0,
            0.1f32..3.0,
            0.1f32..3.0,
            0.1f32..3.0,
        )
            .prop_map(|(x, y, z, w, h, d)| {
                Aabb::new(Vec3::new(x, y, z), Vec3::new(x + w, y + h, z + d))
            })
    }

    proptest! {
        #[test]
        fn prop_pairwise_completeness(boxes in prop::collection::vec(arb_box(), 0..12)) {
            let probes = boxes
                .iter()
                .enumerate()
                .map(|(i, b)| (i as u32, Probe::boxed(b.min, b.max)))
                .collect();
            let (mut world, mut engine) = world_with(probes);

            let report = engine.step(&mut world);

            let mut expected = 0;
            for i in 0..boxes.len() {
                for j in i + 1..boxes.len() {
                    if boxes[i].intersects(&boxes[j]) {
                        expected += 1;
                    }
                }
            }
            prop_assert_eq!(report.contacts.len(), expected);

            for (id, probe) in &world.probes {
                // No self collision
                prop_assert!(!probe.hits.contains(id));
                // Exactly the overlapping partners, each once
                let i = *id as usize;
                let partners: Vec<u32> = (0..boxes.len())
                    .filter(|&j| j != i && boxes[i].intersects(&boxes[j]))
                    .map(|j| j as u32)
                    .collect();
                let mut hits = probe.hits.clone();
                hits.sort_unstable();
                prop_assert_eq!(hits, partners);
            }
            let total: usize = world.probes.values().map(|p| p.hits.len()).sum();
            prop_assert_eq!(total, expected * 2);
        }
    }
}
