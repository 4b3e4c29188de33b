mod state_machine;
mod world;

pub use state_machine::{State, StateMachine, StateMachineError, Subscription, SubscriptionId};
pub use world::{Entity, EntityDesc, EntityId, EntityIdAllocator, Transform, Vec2, Vec3, World};
