use super::{AttributeTy, EntityType, Navigable};

/// Receives the navigables of an entity in a fixed traversal order.
///
/// Join emission for fetched associations depends on this order, so it must
/// not change: entity, identifier, discriminator, tenant id, version, row id,
/// singular attributes, then plural attributes. Each plural attribute is
/// followed by its foreign key, collection identifier, index, and element.
pub trait NavigableVisitor<'a> {
    fn prepare_for_visitation(&mut self) {}

    fn visit(&mut self, navigable: Navigable<'a>);

    fn visitation_complete(&mut self) {}
}

/// Walks every navigable reachable from `entity` exactly once.
///
/// Associations are visited as attributes; the walk does not descend into
/// their target entities.
pub fn visit_entity<'a, V>(entity: &'a EntityType, visitor: &mut V)
where
    V: NavigableVisitor<'a> + ?Sized,
{
    visitor.prepare_for_visitation();

    visitor.visit(Navigable::Entity(entity));
    visitor.visit(Navigable::Identifier(entity, &entity.identifier));

    if let Some(discriminator) = &entity.discriminator {
        visitor.visit(Navigable::Discriminator(entity, discriminator));
    }

    if let Some(tenant_id) = &entity.tenant_id {
        visitor.visit(Navigable::TenantId(entity, tenant_id));
    }

    if let Some(version) = &entity.version {
        visitor.visit(Navigable::Version(entity, version));
    }

    if let Some(row_id) = &entity.row_id {
        visitor.visit(Navigable::RowId(entity, row_id));
    }

    for attribute in entity.singular_attributes() {
        visitor.visit(Navigable::Singular(attribute));
    }

    for attribute in entity.plural_attributes() {
        let AttributeTy::Plural(plural) = &attribute.ty else {
            unreachable!()
        };

        visitor.visit(Navigable::Plural(attribute, plural));
        visitor.visit(Navigable::ForeignKey(attribute, &plural.key));

        if plural.collection_id.is_some() {
            visitor.visit(Navigable::CollectionIdentifier(attribute, plural));
        }

        if plural.index.is_some() {
            visitor.visit(Navigable::CollectionIndex(attribute, plural));
        }

        visitor.visit(Navigable::CollectionElement(attribute, &plural.element));
    }

    visitor.visitation_complete();
}

/// Collects navigables in visitation order.
#[derive(Debug, Default)]
pub struct CollectNavigables<'a> {
    pub navigables: Vec<Navigable<'a>>,
    complete: bool,
}

impl CollectNavigables<'_> {
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

impl<'a> NavigableVisitor<'a> for CollectNavigables<'a> {
    fn prepare_for_visitation(&mut self) {
        self.navigables.clear();
        self.complete = false;
    }

    fn visit(&mut self, navigable: Navigable<'a>) {
        assert!(!self.complete, "visit after visitation_complete");
        self.navigables.push(navigable);
    }

    fn visitation_complete(&mut self) {
        self.complete = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        schema::{Builder, TypeConfiguration},
        stmt::Type,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn visits_in_fixed_order() {
        let mut builder = Builder::new();
        builder.entity("Ticket", |e| {
            // Plural attributes are declared first but visited last
            e.id("id", Type::I64)
                .element_collection("history", Type::String, |p| {
                    p.list_index("position").collection_id("history_id");
                })
                .tenant_column("tenant")
                .version("version")
                .basic("title", Type::String)
                .element_collection("tags", Type::String, |p| {
                    p.set();
                });
        });
        let metamodel = builder.build(&TypeConfiguration::new()).unwrap();
        let entity = metamodel.entity_by_name("Ticket").unwrap();

        let mut collect = CollectNavigables::default();
        visit_entity(entity, &mut collect);
        assert!(collect.is_complete());

        let visited: Vec<_> = collect
            .navigables
            .iter()
            .map(|navigable| (navigable.kind_name(), navigable.role().to_string()))
            .collect();

        let expected = [
            ("entity", "Ticket"),
            ("identifier", "Ticket.{id}"),
            ("tenant-id", "Ticket.{tenant}"),
            ("version", "Ticket.{version}"),
            ("singular-attribute", "Ticket.title"),
            ("plural-attribute", "Ticket.history"),
            ("foreign-key", "Ticket.history.{key}"),
            ("collection-identifier", "Ticket.history.{collection-id}"),
            ("collection-index", "Ticket.history.{index}"),
            ("collection-element", "Ticket.history.{element}"),
            ("plural-attribute", "Ticket.tags"),
            ("foreign-key", "Ticket.tags.{key}"),
            ("collection-element", "Ticket.tags.{element}"),
        ];
        let expected: Vec<_> = expected
            .iter()
            .map(|(kind, role)| (*kind, role.to_string()))
            .collect();
        assert_eq!(visited, expected);
    }

    #[test]
    fn collector_resets_between_walks() {
        let mut builder = Builder::new();
        builder.entity("Tag", |e| {
            e.id("id", Type::I64).basic("name", Type::String);
        });
        let metamodel = builder.build(&TypeConfiguration::new()).unwrap();
        let entity = metamodel.entity_by_name("Tag").unwrap();

        let mut collect = CollectNavigables::default();
        visit_entity(entity, &mut collect);
        visit_entity(entity, &mut collect);

        assert_eq!(collect.navigables.len(), 3);
    }
}
