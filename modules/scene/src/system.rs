//! Per-scene behaviours driven by the frame loop.

use std::any::Any;

use crate::scene::Scene;
use crate::types::prelude::{ComponentType, Property, SystemType};
use crate::Entity;

/// Conversion into `Any`, implemented for every sized `'static` type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The state and callbacks of a system added to a scene.
///
/// Systems are updated and rendered in the order they were added. While one of
/// its callbacks runs, a system is detached from the scene and can not be
/// looked up through `Scene::system`.
pub trait System: AsAny + 'static {
    fn update(&mut self, ty: SystemType, scene: &mut Scene, dt: f32);

    fn render(&mut self, _ty: SystemType, _scene: &Scene, _params: &RenderParams) {}

    /// Called once when the scene is dropped, before any component is destructed.
    fn free(&mut self, _scene: &mut Scene) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderPass {
    Shadow,
    Opaque,
    Transparent,
    Ui,
}

/// Parameters of a single `Scene::render` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub pass: RenderPass,
    pub camera: Option<Entity>,
}

impl RenderParams {
    pub fn new(pass: RenderPass) -> Self {
        RenderParams { pass, camera: None }
    }
}

/// Receives the reflected contents of a scene from `Scene::visit`.
pub trait SceneVisitor {
    fn visit_entity(&mut self, _entity: Entity, _name: &str, _parent: Option<Entity>) {}

    fn visit_component(
        &mut self,
        _entity: Entity,
        _ty: ComponentType,
        _name: &str,
        _properties: &[Property],
        _value: &dyn Any,
    ) {
    }

    fn visit_system(
        &mut self,
        _ty: SystemType,
        _name: &str,
        _properties: &[Property],
        _state: &dyn Any,
    ) {
    }
}
