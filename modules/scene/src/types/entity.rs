use inlinable_string::{InlinableString, StringExt};
use smallvec::SmallVec;

use lodge::errors::*;

use super::component::ComponentType;
use super::TypeDesc;

impl_handle!(EntityType);

/// A named template listing the components an entity starts with.
#[derive(Debug, Clone)]
pub struct EntityTypeDesc {
    pub name: InlinableString,
    pub description: InlinableString,
    pub components: SmallVec<[ComponentType; 8]>,
}

impl EntityTypeDesc {
    pub fn new<T: Into<InlinableString>>(name: T) -> Self {
        EntityTypeDesc {
            name: name.into(),
            description: InlinableString::new(),
            components: SmallVec::new(),
        }
    }

    pub fn description<T: Into<InlinableString>>(mut self, description: T) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a component type to the template.
    pub fn component(mut self, ty: ComponentType) -> Self {
        self.components.push(ty);
        self
    }
}

impl TypeDesc for EntityTypeDesc {
    fn name(&self) -> &str {
        self.name.as_ref()
    }

    fn description(&self) -> &str {
        self.description.as_ref()
    }

    fn validate(&self) -> Result<()> {
        for (i, v) in self.components.iter().enumerate() {
            if self.components[..i].contains(v) {
                return Err(Error::InvalidProperty(format!(
                    "{} is listed twice in entity type '{}'",
                    v, self.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use lodge::utils::HandleLike;

    #[test]
    fn duplicated_components() {
        let ty = ComponentType::from_id(1).unwrap();
        let desc = EntityTypeDesc::new("player").component(ty);
        assert!(desc.validate().is_ok());

        let desc = desc.component(ty);
        match desc.validate() {
            Err(Error::InvalidProperty(_)) => {}
            _ => panic!("component types are unique"),
        }
    }
}
