//! Scene graph: actors, generational handles and the world container.

pub mod actor;
pub mod world;

pub use actor::{
    Actor, IcosphereConfig, ManipulationState, ObjConfig, RenderStrategy, ShapeConfig,
    SphereConfig, Vertex,
};
pub use world::World;

/// Uniform fill mode for every actor in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawStyle {
    Points,
    Wireframe,
    #[default]
    Solid,
    SolidWithEdges,
}

/// Shading quality switch; Low selects flat per-face shading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Shading {
    Low,
    #[default]
    High,
}

/// Generational actor id. A handle taken before `remove` never resolves to a
/// later occupant of the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    actor: Option<Actor>,
}

/// Ordered actor table. Iteration follows insertion order, which is also the
/// render order.
#[derive(Debug, Default)]
pub struct Scene {
    slots: Vec<Slot>,
    order: Vec<ActorHandle>,
    free: Vec<u32>,
    pub draw_style: DrawStyle,
    pub shading: Shading,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, actor: Actor) -> ActorHandle {
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.actor = Some(actor);
                ActorHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    actor: Some(actor),
                });
                ActorHandle {
                    index,
                    generation: 0,
                }
            }
        };
        self.order.push(handle);
        handle
    }

    /// Remove an actor, invalidating its handle. Stale handles are ignored.
    pub fn remove(&mut self, handle: ActorHandle) -> Option<Actor> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let actor = slot.actor.take()?;
        slot.generation += 1;
        self.free.push(handle.index);
        self.order.retain(|h| *h != handle);
        Some(actor)
    }

    pub fn get(&self, handle: ActorHandle) -> Option<&Actor> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.actor.as_ref()
    }

    pub fn get_mut(&mut self, handle: ActorHandle) -> Option<&mut Actor> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.actor.as_mut()
    }

    pub fn contains(&self, handle: ActorHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActorHandle, &Actor)> {
        self.order
            .iter()
            .filter_map(|h| self.get(*h).map(|a| (*h, a)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Actor> {
        self.slots.iter_mut().filter_map(|s| s.actor.as_mut())
    }

    /// Drain every actor in insertion order, resetting the table.
    pub fn drain(&mut self) -> Vec<Actor> {
        let order = std::mem::take(&mut self.order);
        let mut out = Vec::with_capacity(order.len());
        for handle in order {
            let slot = &mut self.slots[handle.index as usize];
            if let Some(actor) = slot.actor.take() {
                slot.generation += 1;
                self.free.push(handle.index);
                out.push(actor);
            }
        }
        out
    }
}

/// Plain ordered actor collection without handles; the gnomon overlay and
/// other fixed furniture use this.
#[derive(Debug, Default)]
pub struct Group {
    actors: Vec<Actor>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, actor: Actor) {
        self.actors.push(actor);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.actors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Actor> {
        self.actors.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_actor() -> Actor {
        Actor::shape(ShapeConfig::new(crate::gfx::geometry::primitives::cube()))
    }

    #[test]
    fn handles_stay_valid_across_unrelated_removals() {
        let mut scene = Scene::new();
        let a = scene.add(test_actor());
        let b = scene.add(test_actor());
        scene.remove(a);
        assert!(scene.get(b).is_some());
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn stale_handle_never_resolves_to_a_reused_slot() {
        let mut scene = Scene::new();
        let a = scene.add(test_actor());
        scene.remove(a);
        let b = scene.add(test_actor()); // reuses the slot
        assert!(scene.get(a).is_none());
        assert!(scene.remove(a).is_none());
        assert!(scene.get(b).is_some());
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut scene = Scene::new();
        for name in ["first", "second", "third"] {
            let mut actor = test_actor();
            actor.name = Some(name.to_string());
            scene.add(actor);
        }
        let names: Vec<_> = scene
            .iter()
            .filter_map(|(_, a)| a.name.as_deref())
            .collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn drain_empties_and_invalidates() {
        let mut scene = Scene::new();
        let a = scene.add(test_actor());
        scene.add(test_actor());
        let drained = scene.drain();
        assert_eq!(drained.len(), 2);
        assert!(scene.is_empty());
        assert!(scene.get(a).is_none());
    }
}
