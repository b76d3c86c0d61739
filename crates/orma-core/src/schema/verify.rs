use super::{visit_entity, CollectNavigables, Generation, Metamodel};
use crate::{Error, Result};

use std::collections::HashMap;

struct Verify<'a> {
    metamodel: &'a Metamodel,
}

impl Metamodel {
    pub(super) fn verify(&self) -> Result<()> {
        Verify { metamodel: self }.verify()
    }
}

impl Verify<'_> {
    fn verify(&self) -> Result<()> {
        self.verify_roles_are_unique()?;
        self.verify_identity_generation_is_integer()?;
        self.verify_shared_tables_are_discriminated()?;
        Ok(())
    }

    fn verify_roles_are_unique(&self) -> Result<()> {
        let mut seen = HashMap::new();

        for entity in &self.metamodel.entities {
            let mut collect = CollectNavigables::default();
            visit_entity(entity, &mut collect);
            debug_assert!(collect.is_complete());

            for navigable in collect.navigables {
                let role = navigable.role();
                if let Some(previous) = seen.insert(role.clone(), navigable.kind_name()) {
                    return Err(Error::mapping(format!(
                        "navigable role `{role}` is used by both a {previous} and a {}",
                        navigable.kind_name()
                    )));
                }
            }
        }

        Ok(())
    }

    fn verify_identity_generation_is_integer(&self) -> Result<()> {
        for entity in &self.metamodel.entities {
            let identifier = &entity.identifier;
            if identifier.generation == Generation::Identity && !identifier.ty.is_integer() {
                return Err(Error::mapping(format!(
                    "`{}` uses identity generation but has type {}",
                    identifier.role,
                    identifier.ty.name()
                )));
            }
        }

        Ok(())
    }

    /// Entities mapped to the same primary table must each carry a
    /// discriminator, or their rows cannot be told apart.
    fn verify_shared_tables_are_discriminated(&self) -> Result<()> {
        let entities = &self.metamodel.entities;

        for (i, entity) in entities.iter().enumerate() {
            for other in &entities[i + 1..] {
                if entity.table != other.table {
                    continue;
                }

                if entity.discriminator.is_none() || other.discriminator.is_none() {
                    return Err(Error::mapping(format!(
                        "entities `{}` and `{}` share table `{}` without discriminators",
                        entity.name,
                        other.name,
                        self.metamodel.table(entity.table).name
                    )));
                }
            }
        }

        Ok(())
    }
}
