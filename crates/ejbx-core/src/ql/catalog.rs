//! Registry of deployed entity beans

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::bridge::EntityBridge;
use super::error::{QlError, QlResult};

/// Entity lookup by abstract schema name, EJB name and component
/// interface. Every index refers to the same shared bridge.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entities: Vec<Arc<EntityBridge>>,
    by_abstract_schema: HashMap<String, Arc<EntityBridge>>,
    by_ejb_name: HashMap<String, Arc<EntityBridge>>,
    by_interface: HashMap<String, Arc<EntityBridge>>,
}

#[derive(Deserialize)]
struct CatalogFile {
    entities: Vec<EntityBridge>,
}

impl Catalog {
    /// Empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity under all of its names
    pub fn add_entity(&mut self, entity: EntityBridge) -> QlResult<Arc<EntityBridge>> {
        if self.by_abstract_schema.contains_key(&entity.abstract_schema_name) {
            return Err(QlError::InvalidCatalog(format!(
                "abstract schema '{}' is registered twice",
                entity.abstract_schema_name
            )));
        }
        if self.by_ejb_name.contains_key(&entity.ejb_name) {
            return Err(QlError::InvalidCatalog(format!(
                "EJB name '{}' is registered twice",
                entity.ejb_name
            )));
        }

        let entity = Arc::new(entity);
        self.by_abstract_schema
            .insert(entity.abstract_schema_name.clone(), Arc::clone(&entity));
        self.by_ejb_name
            .insert(entity.ejb_name.clone(), Arc::clone(&entity));
        for interface in [&entity.remote_interface, &entity.local_interface]
            .into_iter()
            .flatten()
        {
            self.by_interface
                .insert(interface.clone(), Arc::clone(&entity));
        }
        self.entities.push(Arc::clone(&entity));
        tracing::debug!(
            ejb_name = %entity.ejb_name,
            schema = %entity.abstract_schema_name,
            "Registered entity"
        );
        Ok(entity)
    }

    /// Entity with the given abstract schema name
    #[must_use]
    pub fn entity_by_abstract_schema(&self, name: &str) -> Option<&Arc<EntityBridge>> {
        self.by_abstract_schema.get(name)
    }

    /// Entity with the given EJB name
    #[must_use]
    pub fn entity_by_ejb_name(&self, name: &str) -> Option<&Arc<EntityBridge>> {
        self.by_ejb_name.get(name)
    }

    /// Entity exposing the given remote or local interface
    #[must_use]
    pub fn entity_by_interface(&self, interface: &str) -> Option<&Arc<EntityBridge>> {
        self.by_interface.get(interface)
    }

    /// Number of registered entities
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Registered entities in registration order
    pub fn entities(&self) -> impl Iterator<Item = &Arc<EntityBridge>> {
        self.entities.iter()
    }

    /// Check that every relationship points at a registered entity
    pub fn validate(&self) -> QlResult<()> {
        for entity in &self.entities {
            for cmr in &entity.cmr_fields {
                if !self.by_ejb_name.contains_key(&cmr.related_entity) {
                    return Err(QlError::InvalidCatalog(format!(
                        "{}.{} refers to unknown entity '{}'",
                        entity.ejb_name, cmr.field_name, cmr.related_entity
                    )));
                }
                if cmr.key_mapping.is_empty() {
                    return Err(QlError::InvalidCatalog(format!(
                        "{}.{} has no key mapping",
                        entity.ejb_name, cmr.field_name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Load `{"entities": [...]}` and validate it
    pub fn from_json_str(json: &str) -> QlResult<Self> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|e| QlError::InvalidCatalog(e.to_string()))?;
        let mut catalog = Self::new();
        for entity in file.entities {
            catalog.add_entity(entity)?;
        }
        catalog.validate()?;
        Ok(catalog)
    }

    /// Read and load a catalog file
    pub fn from_json_file(path: impl AsRef<Path>) -> QlResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| QlError::InvalidCatalog(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }
}

impl FromIterator<EntityBridge> for Catalog {
    /// Later entities with a name already taken are skipped
    fn from_iter<I: IntoIterator<Item = EntityBridge>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for entity in iter {
            if let Err(e) = catalog.add_entity(entity) {
                tracing::warn!("Skipping entity: {e}");
            }
        }
        catalog
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::ql::bridge::{CmpFieldBridge, CmrFieldBridge, ColumnPair};

    /// Customer 1-n Order 1-n LineItem n-1 Product
    pub(crate) fn order_catalog() -> Catalog {
        let customer = EntityBridge::new("CustomerEJB", "Customer", "customer")
            .with_local_interface("com.acme.CustomerLocal")
            .with_cmp_field(CmpFieldBridge::new("id", "id", "long").primary_key())
            .with_cmp_field(CmpFieldBridge::new("name", "name", "java.lang.String"))
            .with_cmr_field(CmrFieldBridge::new(
                "orders",
                "OrderEJB",
                true,
                vec![ColumnPair::new("id", "customer_id")],
            ));
        let order = EntityBridge::new("OrderEJB", "Order", "orders")
            .with_remote_interface("com.acme.Order")
            .with_local_interface("com.acme.OrderLocal")
            .with_cmp_field(CmpFieldBridge::new("id", "order_id", "long").primary_key())
            .with_cmp_field(CmpFieldBridge::new("amount", "amount", "double"))
            .with_cmp_field(CmpFieldBridge::new("status", "status", "java.lang.String"))
            .with_cmp_field(CmpFieldBridge::new("paid", "paid", "boolean"))
            .with_cmp_field(CmpFieldBridge::new("placed", "placed_at", "java.sql.Timestamp"))
            .with_cmr_field(CmrFieldBridge::new(
                "customer",
                "CustomerEJB",
                false,
                vec![ColumnPair::new("customer_id", "id")],
            ))
            .with_cmr_field(CmrFieldBridge::new(
                "lineItems",
                "LineItemEJB",
                true,
                vec![ColumnPair::new("order_id", "order_id")],
            ));
        let line = EntityBridge::new("LineItemEJB", "LineItem", "line_item")
            .with_cmp_field(CmpFieldBridge::new("id", "line_id", "long").primary_key())
            .with_cmp_field(CmpFieldBridge::new("quantity", "qty", "int"))
            .with_cmr_field(CmrFieldBridge::new(
                "order",
                "OrderEJB",
                false,
                vec![ColumnPair::new("order_id", "order_id")],
            ))
            .with_cmr_field(CmrFieldBridge::new(
                "product",
                "ProductEJB",
                false,
                vec![ColumnPair::new("product_id", "product_id")],
            ));
        let product = EntityBridge::new("ProductEJB", "Product", "product")
            .with_cmp_field(CmpFieldBridge::new("id", "product_id", "long").primary_key())
            .with_cmp_field(CmpFieldBridge::new("name", "name", "java.lang.String"))
            .with_cmp_field(CmpFieldBridge::new("price", "price", "java.math.BigDecimal"));

        [customer, order, line, product].into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexes_share_one_bridge() {
        let catalog = fixtures::order_catalog();
        assert_eq!(catalog.entity_count(), 4);
        let by_schema = catalog.entity_by_abstract_schema("Order").unwrap();
        let by_name = catalog.entity_by_ejb_name("OrderEJB").unwrap();
        let by_remote = catalog.entity_by_interface("com.acme.Order").unwrap();
        let by_local = catalog.entity_by_interface("com.acme.OrderLocal").unwrap();
        assert!(Arc::ptr_eq(by_schema, by_name));
        assert!(Arc::ptr_eq(by_schema, by_remote));
        assert!(Arc::ptr_eq(by_schema, by_local));
        assert!(catalog.entity_by_abstract_schema("order").is_none());
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut catalog = Catalog::new();
        catalog
            .add_entity(EntityBridge::new("A", "Alpha", "a"))
            .unwrap();
        assert!(matches!(
            catalog.add_entity(EntityBridge::new("B", "Alpha", "b")),
            Err(QlError::InvalidCatalog(_))
        ));
        assert!(matches!(
            catalog.add_entity(EntityBridge::new("A", "Beta", "b")),
            Err(QlError::InvalidCatalog(_))
        ));
        assert_eq!(catalog.entity_count(), 1);
    }

    #[test]
    fn test_from_json_validates_relationships() {
        let ok = Catalog::from_json_str(
            r#"{"entities": [
                {"ejb_name": "A", "abstract_schema_name": "Alpha", "table_name": "a"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(ok.entities().count(), 1);

        let dangling = Catalog::from_json_str(
            r#"{"entities": [
                {"ejb_name": "A", "abstract_schema_name": "Alpha", "table_name": "a",
                 "cmr_fields": [{"field_name": "b", "related_entity": "B",
                                 "key_mapping": [{"local_column": "b_id", "related_column": "id"}]}]}
            ]}"#,
        );
        assert!(matches!(dangling, Err(QlError::InvalidCatalog(msg)) if msg.contains("unknown entity 'B'")));

        assert!(Catalog::from_json_str("{").is_err());
        assert!(Catalog::from_json_file("/nonexistent/catalog.json").is_err());
    }
}
