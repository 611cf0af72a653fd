//! Entity relation graph.
//!
//! A node tree mirroring the populated relations of one value. Nodes live in a
//! flat arena addressed by [`NodeId`]; each node knows its parent, its children
//! and the relation that reached it.

use serde_json::{Map, Value};

use crate::error::{Result, TesselError};
use crate::meta::{ColumnMeta, DataType, EntityClass, MetadataRegistry, RelationMeta};
use crate::prelude::*;
use crate::relations::{Include, Relations};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// One entity value in the graph.
#[derive(Debug, Clone)]
pub struct GraphNode<'r, 'v> {
    pub entity: EntityClass,
    pub value: &'v Map<String, Value>,
    /// Relation on the parent that holds this node.
    pub via: Option<&'r RelationMeta>,
    /// Position inside the parent's collection, for one-to-many values.
    pub index: Option<usize>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub columns: &'r [ColumnMeta],
    pub relations: &'r [RelationMeta],
}

impl<'r, 'v> GraphNode<'r, 'v> {
    /// The node's value for a column property; `None` when absent.
    pub fn column_value(&self, column: &ColumnMeta) -> Option<&'v Value> {
        self.value.get(&column.property_name)
    }

    pub fn primary_key(&self) -> Option<&'r ColumnMeta> {
        self.columns.iter().find(|c| c.primary_key)
    }
}

/// Graph of one entity value and every related value it carries.
#[derive(Debug, Clone)]
pub struct EntityRelationGraph<'r, 'v> {
    registry: &'r MetadataRegistry,
    nodes: Vec<GraphNode<'r, 'v>>,
}

impl<'r, 'v> EntityRelationGraph<'r, 'v> {
    /// Builds the graph rooted at `entity` for `value`, which must be an object.
    ///
    /// Array relations fan out into one child per element, object relations give
    /// one child, and absent or `null` relations give none.
    pub fn build(
        registry: &'r MetadataRegistry,
        entity: EntityClass,
        value: &'v Value,
    ) -> Result<Self> {
        crate::tessel_profile_scope!("graph", "build");
        registry.get_class_meta(entity)?;

        let Value::Object(map) = value else {
            return Err(TesselError::DataShape(format!(
                "`{}` value must be an object, got {}",
                entity, value
            )));
        };

        let mut graph = Self {
            registry,
            nodes: Vec::new(),
        };
        graph.push_node(entity, map, None, None, None)?;
        Ok(graph)
    }

    fn push_node(
        &mut self,
        entity: EntityClass,
        value: &'v Map<String, Value>,
        via: Option<&'r RelationMeta>,
        index: Option<usize>,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let registry = self.registry;
        let id = NodeId(self.nodes.len());
        self.nodes.push(GraphNode {
            entity,
            value,
            via,
            index,
            parent,
            children: Vec::new(),
            columns: registry.get_properties_by_class(entity),
            relations: registry.get_relations_by_class(entity),
        });

        if self.is_on_path(id, value) {
            return Ok(id);
        }

        self.check_undeclared_relations(entity, value)?;

        for relation in registry.get_relations_by_class(entity) {
            let children: Vec<(Option<usize>, &'v Value)> = match value.get(&relation.property_name) {
                None | Some(Value::Null) => continue,
                Some(Value::Array(items)) => {
                    items.iter().enumerate().map(|(i, v)| (Some(i), v)).collect()
                }
                Some(object @ Value::Object(_)) => vec![(None, object)],
                // A foreign key scalar under a property that is also a column.
                Some(_) if registry.get_column(entity, &relation.property_name).is_some() => {
                    continue;
                }
                Some(other) => {
                    return Err(TesselError::DataShape(format!(
                        "relation `{}.{}` must hold an object or an array, got {}",
                        entity, relation.property_name, other
                    )));
                }
            };
            let related = registry.resolve_related_entity_of(relation)?;

            for (index, child) in children {
                let Value::Object(child) = child else {
                    return Err(TesselError::DataShape(format!(
                        "elements of `{}.{}` must be objects, got {}",
                        entity, relation.property_name, child
                    )));
                };
                let child_id = self.push_node(related, child, Some(relation), index, Some(id))?;
                self.nodes[id.0].children.push(child_id);
            }
        }

        Ok(id)
    }

    /// Whether the same value is already being walked by an ancestor.
    fn is_on_path(&self, id: NodeId, value: &Map<String, Value>) -> bool {
        let mut current = self.nodes[id.0].parent;
        while let Some(ancestor) = current {
            let node = &self.nodes[ancestor.0];
            if core::ptr::eq(node.value, value) {
                return true;
            }
            current = node.parent;
        }
        false
    }

    /// Nested values under keys with no relation metadata are configuration errors.
    fn check_undeclared_relations(
        &self,
        entity: EntityClass,
        value: &Map<String, Value>,
    ) -> Result<()> {
        for (property, nested) in value {
            if !matches!(nested, Value::Object(_) | Value::Array(_)) {
                continue;
            }
            if self
                .registry
                .get_relations_for_property(entity, property)
                .is_some()
            {
                continue;
            }
            let structured_column = self
                .registry
                .get_column(entity, property)
                .is_some_and(|c| matches!(c.data_type, DataType::Json | DataType::Blob));
            if !structured_column {
                return Err(TesselError::MetadataResolution {
                    entity,
                    property: property.clone(),
                    reason: "no relation metadata is declared for this property".into(),
                });
            }
        }
        Ok(())
    }

    pub fn registry(&self) -> &'r MetadataRegistry {
        self.registry
    }

    pub fn root(&self) -> &GraphNode<'r, 'v> {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn node(&self, id: NodeId) -> &GraphNode<'r, 'v> {
        &self.nodes[id.0]
    }

    /// Nodes in depth-first pre-order; parents always precede their children.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GraphNode<'r, 'v>)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Primary key column of every node that declares one, in traversal order.
    pub fn primary_key_metas(&self) -> Vec<(NodeId, &'r ColumnMeta)> {
        self.nodes()
            .filter_map(|(id, node)| node.primary_key().map(|column| (id, column)))
            .collect()
    }

    /// Scope key columns of every node, in traversal order.
    pub fn scope_key_metas(&self) -> Vec<(NodeId, &'r ColumnMeta)> {
        self.nodes()
            .flat_map(|(id, node)| {
                node.columns
                    .iter()
                    .filter(|c| c.is_scope_key())
                    .map(move |column| (id, column))
            })
            .collect()
    }

    /// Resolves a path such as `children.1.toys` or `children[1].toys`.
    ///
    /// Each key must name a relation of the current node; a numeric step selects an
    /// element of a collection, and a collection step without one selects its first
    /// element. A trailing column property resolves to the node that owns it.
    pub fn node_at_path(&self, path: &str) -> Option<NodeId> {
        let steps = parse_path(path);
        let mut current = NodeId::ROOT;
        let mut i = 0;

        while i < steps.len() {
            let PathStep::Key(key) = steps[i] else {
                return None;
            };
            let node = &self.nodes[current.0];

            let mut candidates = node.children.iter().copied().filter(|child| {
                self.nodes[child.0]
                    .via
                    .is_some_and(|relation| relation.property_name == key)
            });

            match steps.get(i + 1) {
                Some(PathStep::Index(wanted)) => {
                    current = candidates.find(|child| self.nodes[child.0].index == Some(*wanted))?;
                    i += 2;
                }
                _ => match candidates.next() {
                    Some(child) => {
                        current = child;
                        i += 1;
                    }
                    None => {
                        let is_last = i + 1 == steps.len();
                        let is_column = node.columns.iter().any(|c| c.property_name == key);
                        return (is_last && is_column).then_some(current);
                    }
                },
            }
        }

        Some(current)
    }

    /// JSON pointer of a node inside the root value, e.g. `/children/1`.
    pub fn pointer(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id.0];
            if let Some(index) = node.index {
                segments.push(index.to_string());
            }
            if let Some(relation) = node.via {
                segments.push(relation.property_name.replace('~', "~0").replace('/', "~1"));
            }
            current = node.parent;
        }

        segments.iter().rev().fold(String::new(), |mut pointer, segment| {
            pointer.push('/');
            pointer.push_str(segment);
            pointer
        })
    }

    /// Relation inclusion shape covering every populated relation of the graph.
    pub fn relations(&self) -> Relations {
        self.relations_below(NodeId::ROOT)
    }

    fn relations_below(&self, id: NodeId) -> Relations {
        let mut relations = Relations::new();
        for child in &self.nodes[id.0].children {
            let Some(relation) = self.nodes[child.0].via else {
                continue;
            };
            let nested = self.relations_below(*child);
            let include = if nested.is_empty() {
                Include::All
            } else {
                Include::Nested(nested)
            };
            relations.insert(relation.property_name.as_str(), include);
        }
        relations
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathStep<'p> {
    Key(&'p str),
    Index(usize),
}

fn parse_path(path: &str) -> Vec<PathStep<'_>> {
    let mut steps = Vec::new();
    for part in path.split('.').filter(|part| !part.is_empty()) {
        let (key, rest) = part.split_once('[').unwrap_or((part, ""));
        if !key.is_empty() {
            match key.parse::<usize>() {
                Ok(index) => steps.push(PathStep::Index(index)),
                Err(_) => steps.push(PathStep::Key(key)),
            }
        }
        for index in rest.split('[') {
            if let Ok(index) = index.trim_end_matches(']').parse::<usize>() {
                steps.push(PathStep::Index(index));
            }
        }
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_accept_dots_and_brackets() {
        assert_eq!(
            parse_path("children[1].toys"),
            vec![PathStep::Key("children"), PathStep::Index(1), PathStep::Key("toys")]
        );
        assert_eq!(
            parse_path("children.1.toys"),
            vec![PathStep::Key("children"), PathStep::Index(1), PathStep::Key("toys")]
        );
        assert_eq!(parse_path(""), vec![]);
    }
}
