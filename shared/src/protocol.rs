use crate::{
    component_bindings::{ComponentBinding, ComponentBindings, ComponentRole},
    types::{ComponentId, ObjectOffset},
    ObjectRef,
};

pub mod error;
pub use error::ProtocolError;

// Protocol Plugin
pub trait ProtocolPlugin {
    fn build(&self, protocol: &mut Protocol);
}

// Protocol
#[derive(Default)]
pub struct Protocol {
    pub component_bindings: ComponentBindings,
    locked: bool,
}

impl Protocol {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn add_plugin<P: ProtocolPlugin>(&mut self, plugin: P) -> &mut Self {
        self.check_lock();
        plugin.build(self);
        self
    }

    /// Binds a component that carries spawn data for the entity's root object.
    pub fn add_spawn_component(&mut self, component_id: ComponentId) -> &mut Self {
        self.add_component(component_id, ObjectRef::ROOT_OFFSET, ComponentRole::Spawn)
    }

    /// Binds a component to the object at `offset` inside every entity that
    /// carries it.
    pub fn add_component(
        &mut self,
        component_id: ComponentId,
        offset: ObjectOffset,
        role: ComponentRole,
    ) -> &mut Self {
        self.check_lock();
        if !self
            .component_bindings
            .insert(component_id, ComponentBinding::new(role, offset))
        {
            panic!("Component {} is already bound in this protocol", component_id);
        }
        self
    }

    // Non-panicking builder methods

    pub fn try_add_plugin<P: ProtocolPlugin>(&mut self, plugin: P) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        plugin.build(self);
        Ok(self)
    }

    pub fn try_add_spawn_component(
        &mut self,
        component_id: ComponentId,
    ) -> Result<&mut Self, ProtocolError> {
        self.try_add_component(component_id, ObjectRef::ROOT_OFFSET, ComponentRole::Spawn)
    }

    pub fn try_add_component(
        &mut self,
        component_id: ComponentId,
        offset: ObjectOffset,
        role: ComponentRole,
    ) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        if !self
            .component_bindings
            .insert(component_id, ComponentBinding::new(role, offset))
        {
            return Err(ProtocolError::DuplicateComponent { component_id });
        }
        Ok(self)
    }

    pub fn try_lock(&mut self) -> Result<(), ProtocolError> {
        self.try_check_lock()?;
        self.locked = true;
        Ok(())
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Checks if protocol is locked without panicking
    /// Returns Err if protocol is locked
    pub fn try_check_lock(&self) -> Result<(), ProtocolError> {
        if self.locked {
            Err(ProtocolError::AlreadyLocked)
        } else {
            Ok(())
        }
    }

    /// Checks if protocol is locked, panics if it is
    pub fn check_lock(&self) {
        if self.locked {
            panic!("Protocol already locked!");
        }
    }

    pub fn build(&mut self) -> Self {
        std::mem::take(self)
    }
}
