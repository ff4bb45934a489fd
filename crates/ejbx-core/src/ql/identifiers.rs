//! Identification variables and resolved paths of one query

use std::collections::HashMap;
use std::sync::Arc;

use super::ast::PathElement;
use super::bridge::EntityBridge;
use super::catalog::Catalog;
use super::error::{QlError, QlResult};

#[derive(Debug, Clone)]
struct Declaration {
    name: String,
    schema: String,
    /// `None` while the abstract schema is unknown and validation is deferred
    entity: Option<Arc<EntityBridge>>,
    collection_path: Option<String>,
}

#[derive(Debug, Clone)]
struct ResolvedPath {
    path_list: Vec<String>,
    field_list: Vec<PathElement>,
}

/// Declared identification variables and the path cache.
///
/// Identification variables are case-insensitive. An unknown abstract
/// schema is recorded and reported by [`check_declarations`] unless
/// `eager` validation is on, in which case declaring it fails at once.
///
/// [`check_declarations`]: IdentifierManager::check_declarations
#[derive(Debug)]
pub struct IdentifierManager<'c> {
    catalog: &'c Catalog,
    eager: bool,
    declarations: HashMap<String, Declaration>,
    order: Vec<String>,
    paths: HashMap<String, ResolvedPath>,
}

fn key(identifier: &str) -> String {
    identifier.to_lowercase()
}

/// Cache key of a path: the root variable is case-insensitive, field names
/// are not
pub(crate) fn path_key(path: &str) -> String {
    match path.split_once('.') {
        Some((root, rest)) => format!("{}.{rest}", key(root)),
        None => key(path),
    }
}

impl<'c> IdentifierManager<'c> {
    /// Manager resolving schemas against `catalog`
    #[must_use]
    pub fn new(catalog: &'c Catalog, eager: bool) -> Self {
        Self {
            catalog,
            eager,
            declarations: HashMap::new(),
            order: Vec::new(),
            paths: HashMap::new(),
        }
    }

    /// Catalog the manager resolves against
    #[must_use]
    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    fn insert(&mut self, declaration: Declaration) -> QlResult<()> {
        let k = key(&declaration.name);
        if self.declarations.contains_key(&k) {
            return Err(QlError::DuplicateIdentifier(declaration.name));
        }
        self.order.push(declaration.name.clone());
        self.declarations.insert(k, declaration);
        Ok(())
    }

    /// Declare `identifier` as ranging over the abstract schema `schema`
    pub fn declare_range_variable(&mut self, identifier: &str, schema: &str) -> QlResult<()> {
        let entity = self.catalog.entity_by_abstract_schema(schema).cloned();
        if entity.is_none() {
            let error = QlError::UnknownSchema {
                identifier: identifier.to_string(),
                schema: schema.to_string(),
            };
            if self.eager {
                return Err(error);
            }
            tracing::debug!("Deferring validation: {error}");
        }
        self.insert(Declaration {
            name: identifier.to_string(),
            schema: schema.to_string(),
            entity,
            collection_path: None,
        })
    }

    /// Declare `identifier` as ranging over the members of a registered
    /// collection-valued path
    pub fn declare_collection_member(&mut self, identifier: &str, path: &str) -> QlResult<()> {
        let fields = self
            .field_list(path)
            .ok_or_else(|| QlError::invalid_path(path, "path is not resolved"))?;
        let entity = match fields.last() {
            Some(PathElement::Cmr {
                field, related, ..
            }) if field.collection_valued => Arc::clone(related),
            _ => return Err(QlError::NotCollectionValued(path.to_string())),
        };
        self.insert(Declaration {
            name: identifier.to_string(),
            schema: entity.abstract_schema_name.clone(),
            entity: Some(entity),
            collection_path: Some(path.to_string()),
        })
    }

    /// True when `identifier` has been declared
    #[must_use]
    pub fn is_declared(&self, identifier: &str) -> bool {
        self.declarations.contains_key(&key(identifier))
    }

    /// Entity `identifier` ranges over
    pub fn entity(&self, identifier: &str) -> QlResult<Arc<EntityBridge>> {
        let declaration = self
            .declarations
            .get(&key(identifier))
            .ok_or_else(|| QlError::UnknownIdentifier(identifier.to_string()))?;
        declaration
            .entity
            .clone()
            .ok_or_else(|| QlError::UnknownSchema {
                identifier: declaration.name.clone(),
                schema: declaration.schema.clone(),
            })
    }

    /// Collection path a collection member variable was declared over
    #[must_use]
    pub fn collection_path(&self, identifier: &str) -> Option<&str> {
        self.declarations
            .get(&key(identifier))
            .and_then(|d| d.collection_path.as_deref())
    }

    /// Declared identifiers in declaration order, as written
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Report the first deferred declaration error
    pub fn check_declarations(&self) -> QlResult<()> {
        for name in &self.order {
            if let Some(declaration) = self.declarations.get(&key(name))
                && declaration.entity.is_none()
            {
                return Err(QlError::UnknownSchema {
                    identifier: declaration.name.clone(),
                    schema: declaration.schema.clone(),
                });
            }
        }
        Ok(())
    }

    /// Cache the resolution of `path`. Both lists must have one entry per
    /// path prefix.
    pub fn register_path(
        &mut self,
        path: &str,
        path_list: Vec<String>,
        field_list: Vec<PathElement>,
    ) -> QlResult<()> {
        if path_list.len() != field_list.len() {
            return Err(QlError::PathListMismatch {
                paths: path_list.len(),
                fields: field_list.len(),
            });
        }
        self.paths.insert(
            path_key(path),
            ResolvedPath {
                path_list,
                field_list,
            },
        );
        Ok(())
    }

    /// Prefixes of a registered path
    #[must_use]
    pub fn path_list(&self, path: &str) -> Option<&[String]> {
        self.paths.get(&path_key(path)).map(|p| p.path_list.as_slice())
    }

    /// Elements of a registered path
    #[must_use]
    pub fn field_list(&self, path: &str) -> Option<&[PathElement]> {
        self.paths.get(&path_key(path)).map(|p| p.field_list.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ql::catalog::fixtures::order_catalog;

    fn line_items_path(manager: &mut IdentifierManager<'_>) {
        let order = manager.entity("o").unwrap();
        let field = order.cmr_field("lineItems").unwrap().clone();
        let related = Arc::clone(manager.catalog().entity_by_ejb_name("LineItemEJB").unwrap());
        manager
            .register_path(
                "o.lineItems",
                vec!["o".into(), "o.lineItems".into()],
                vec![
                    PathElement::Entity(Arc::clone(&order)),
                    PathElement::Cmr {
                        owner: order,
                        field,
                        related,
                    },
                ],
            )
            .unwrap();
    }

    #[test]
    fn test_declarations_are_case_insensitive() {
        let catalog = order_catalog();
        let mut manager = IdentifierManager::new(&catalog, false);
        manager.declare_range_variable("Ord", "Order").unwrap();
        assert!(manager.is_declared("ord"));
        assert_eq!(manager.entity("ORD").unwrap().ejb_name, "OrderEJB");
        assert_eq!(
            manager.declare_range_variable("ord", "Customer"),
            Err(QlError::DuplicateIdentifier("ord".into()))
        );
        assert_eq!(
            manager.entity("x"),
            Err(QlError::UnknownIdentifier("x".into()))
        );
    }

    #[test]
    fn test_unknown_schema_deferred_or_eager() {
        let catalog = order_catalog();
        let mut lazy = IdentifierManager::new(&catalog, false);
        lazy.declare_range_variable("w", "Widget").unwrap();
        let expected = QlError::UnknownSchema {
            identifier: "w".into(),
            schema: "Widget".into(),
        };
        assert_eq!(lazy.check_declarations(), Err(expected.clone()));
        assert_eq!(lazy.entity("w"), Err(expected.clone()));

        let mut eager = IdentifierManager::new(&catalog, true);
        assert_eq!(eager.declare_range_variable("w", "Widget"), Err(expected));
        assert!(!eager.is_declared("w"));
    }

    #[test]
    fn test_collection_member_declaration() {
        let catalog = order_catalog();
        let mut manager = IdentifierManager::new(&catalog, false);
        manager.declare_range_variable("o", "Order").unwrap();
        assert!(manager.declare_collection_member("l", "o.lineItems").is_err());

        line_items_path(&mut manager);
        manager.declare_collection_member("l", "o.lineItems").unwrap();
        assert_eq!(manager.entity("l").unwrap().ejb_name, "LineItemEJB");
        assert_eq!(manager.collection_path("L"), Some("o.lineItems"));
        assert_eq!(manager.identifiers().collect::<Vec<_>>(), vec!["o", "l"]);

        let order = manager.entity("o").unwrap();
        manager
            .register_path("o", vec!["o".into()], vec![PathElement::Entity(order)])
            .unwrap();
        assert_eq!(
            manager.declare_collection_member("x", "o"),
            Err(QlError::NotCollectionValued("o".into()))
        );
    }

    #[test]
    fn test_path_lists_must_match() {
        let catalog = order_catalog();
        let mut manager = IdentifierManager::new(&catalog, false);
        assert_eq!(
            manager.register_path("o.amount", vec!["o".into(), "o.amount".into()], Vec::new()),
            Err(QlError::PathListMismatch { paths: 2, fields: 0 })
        );
        manager.declare_range_variable("o", "Order").unwrap();
        line_items_path(&mut manager);
        assert_eq!(manager.path_list("O.lineItems").unwrap().len(), 2);
        assert!(manager.field_list("o.lineitems").is_none());
    }
}
