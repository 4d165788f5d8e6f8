//! Scene nodes: a transform hierarchy living inside the graph arena.

use indexmap::IndexMap;
use log::debug;
use rigflow_api_core::{Value, Xfo};

use crate::config::WritePolicy;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::param::{ParamOwner, ParamRole};
use crate::types::{NodeId, ParamId, Vertex};

pub const LOCAL_XFO: &str = "LocalXfo";
pub const GLOBAL_XFO: &str = "GlobalXfo";

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) local: ParamId,
    pub(crate) global: ParamId,
    pub(crate) params: IndexMap<String, ParamId>,
    pub(crate) visible: bool,
}

impl SceneNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn local_param(&self) -> ParamId {
        self.local
    }

    pub fn global_param(&self) -> ParamId {
        self.global
    }

    /// Owned parameters in creation order, `LocalXfo` and `GlobalXfo` first.
    pub fn params(&self) -> impl Iterator<Item = (&str, ParamId)> + '_ {
        self.params.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl Graph {
    pub fn node(&self, id: NodeId) -> Result<&SceneNode, GraphError> {
        self.nodes.get(id.index()).ok_or(GraphError::UnknownNode(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::from_index(i), n))
    }

    /// Top-level nodes in insertion order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn add_node(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        local: Xfo,
    ) -> Result<NodeId, GraphError> {
        if let Some(parent) = parent {
            self.node(parent)?;
        }
        let id = NodeId::from_index(self.nodes.len());
        let local_param = self.push_param(
            LOCAL_XFO.into(),
            ParamOwner::Node(id),
            ParamRole::LocalXfo,
            Value::Transform(local),
        );
        let global_param = self.push_param(
            GLOBAL_XFO.into(),
            ParamOwner::Node(id),
            ParamRole::GlobalXfo,
            Value::Transform(local),
        );
        self.params[global_param.index()].dirty = true;

        let mut params = IndexMap::new();
        params.insert(LOCAL_XFO.to_string(), local_param);
        params.insert(GLOBAL_XFO.to_string(), global_param);
        self.nodes.push(SceneNode {
            name: name.into(),
            parent,
            children: Vec::new(),
            local: local_param,
            global: global_param,
            params,
            visible: true,
        });
        match parent {
            Some(p) => self.nodes[p.index()].children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    pub fn add_node_parameter(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<ParamId, GraphError> {
        let name = name.into();
        if self.node(node)?.params.contains_key(&name) {
            return Err(GraphError::DuplicateName(name));
        }
        let id = self.push_param(name.clone(), ParamOwner::Node(node), ParamRole::Plain, value.into());
        self.nodes[node.index()].params.insert(name, id);
        Ok(id)
    }

    pub fn node_parameter(&self, node: NodeId, name: &str) -> Option<ParamId> {
        self.nodes.get(node.index())?.params.get(name).copied()
    }

    pub fn set_visible(&mut self, node: NodeId, visible: bool) -> Result<(), GraphError> {
        self.node(node)?;
        self.nodes[node.index()].visible = visible;
        Ok(())
    }

    /// First direct child called `name`. Grandchildren are not searched.
    pub fn child_by_name(&self, node: NodeId, name: &str) -> Result<Option<NodeId>, GraphError> {
        Ok(self
            .node(node)?
            .children
            .iter()
            .copied()
            .find(|c| self.nodes[c.index()].name == name))
    }

    pub fn find_root(&self, name: &str) -> Option<NodeId> {
        self.roots
            .iter()
            .copied()
            .find(|r| self.nodes[r.index()].name == name)
    }

    /// Walk `path` one direct child at a time starting below `node`.
    pub fn resolve_path(&self, node: NodeId, path: &[&str]) -> Result<NodeId, GraphError> {
        let mut current = node;
        for (depth, segment) in path.iter().enumerate() {
            current = self
                .child_by_name(current, segment)?
                .ok_or_else(|| GraphError::MissingNode(path[..=depth].join("/")))?;
        }
        Ok(current)
    }

    /// `node` and all of its descendants, depth first, parents before children.
    pub fn descendants(&self, node: NodeId) -> Result<Vec<NodeId>, GraphError> {
        self.node(node)?;
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n.index()].children.iter().rev().copied());
        }
        Ok(out)
    }

    /// Strict ancestry: a node is not its own ancestor.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes.get(node.index()).and_then(|n| n.parent);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.nodes[n.index()].parent;
        }
        false
    }

    pub fn global_transform(&mut self, node: NodeId) -> Result<Xfo, GraphError> {
        let global = self.node(node)?.global;
        self.get_transform(global)
    }

    pub fn local_transform(&mut self, node: NodeId) -> Result<Xfo, GraphError> {
        let local = self.node(node)?.local;
        self.get_transform(local)
    }

    pub fn set_local_transform(&mut self, node: NodeId, xfo: Xfo) -> Result<(), GraphError> {
        let local = self.node(node)?.local;
        self.set_value(local, xfo)
    }

    /// Place `node` at `xfo` in world space by rewriting its local transform.
    /// A driven `GlobalXfo` follows the write policy instead.
    pub fn set_global_transform(&mut self, node: NodeId, xfo: Xfo) -> Result<(), GraphError> {
        let n = self.node(node)?;
        let (global, local, parent) = (n.global, n.local, n.parent);
        if self.params[global.index()].writer.is_some() {
            match self.config.write_policy {
                WritePolicy::Reject => return Err(GraphError::BoundParameter(self.param_label(global))),
                WritePolicy::Override => {
                    log::warn!("write to driven parameter '{}' will be overridden", self.param_label(global));
                    self.params[global.index()].value = Value::Transform(xfo);
                    self.mark_dirty(Vertex::Param(global));
                    return Ok(());
                }
            }
        }
        let local_xfo = match parent {
            Some(p) => self.global_transform(p)?.inverse() * xfo,
            None => xfo,
        };
        self.set_value(local, local_xfo)
    }

    /// Move `node` under `new_parent` (or to the top level). Fails without
    /// touching the hierarchy if the move would create a tree or dataflow cycle.
    pub fn set_parent(&mut self, node: NodeId, new_parent: Option<NodeId>) -> Result<(), GraphError> {
        let current = self.node(node)?.parent;
        if let Some(p) = new_parent {
            self.node(p)?;
            if p == node || self.is_ancestor(node, p) {
                return Err(GraphError::Cycle {
                    from: self.nodes[p.index()].name.clone(),
                    to: self.nodes[node.index()].name.clone(),
                });
            }
            let global = self.nodes[node.index()].global;
            if self.params[global.index()].writer.is_none() {
                let parent_global = self.nodes[p.index()].global;
                self.ensure_acyclic(Vertex::Param(parent_global), Vertex::Param(global))?;
            }
        }
        if current == new_parent {
            return Ok(());
        }

        match current {
            Some(old) => self.nodes[old.index()].children.retain(|c| *c != node),
            None => self.roots.retain(|r| *r != node),
        }
        match new_parent {
            Some(p) => self.nodes[p.index()].children.push(node),
            None => self.roots.push(node),
        }
        self.nodes[node.index()].parent = new_parent;
        debug!("reparented '{}'", self.nodes[node.index()].name);

        let global = self.nodes[node.index()].global;
        self.mark_dirty(Vertex::Param(global));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigflow_api_core::{Quat, Vec3};

    fn approx(a: Vec3, b: Vec3) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    #[test]
    fn globals_compose_down_the_tree() {
        let mut g = Graph::new();
        let root = g
            .add_node(None, "root", Xfo::from_translation(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let arm = g
            .add_node(
                Some(root),
                "arm",
                Xfo::from_tr_ori(
                    Vec3::new(0.0, 2.0, 0.0),
                    Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2),
                ),
            )
            .unwrap();
        let hand = g
            .add_node(Some(arm), "hand", Xfo::from_translation(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        assert!(approx(g.global_transform(hand).unwrap().tr, Vec3::new(1.0, 3.0, 0.0)));

        g.set_local_transform(root, Xfo::IDENTITY).unwrap();
        assert!(g.node(hand).map(|n| g.is_dirty(Vertex::Param(n.global))).unwrap());
        assert!(approx(g.global_transform(hand).unwrap().tr, Vec3::new(0.0, 3.0, 0.0)));
    }

    #[test]
    fn set_global_rewrites_local() {
        let mut g = Graph::new();
        let root = g
            .add_node(None, "root", Xfo::from_translation(Vec3::new(0.0, 0.0, 5.0)))
            .unwrap();
        let child = g.add_node(Some(root), "child", Xfo::IDENTITY).unwrap();
        let target = Xfo::from_translation(Vec3::new(1.0, 1.0, 1.0));
        g.set_global_transform(child, target).unwrap();
        assert!(approx(g.local_transform(child).unwrap().tr, Vec3::new(1.0, 1.0, -4.0)));
        assert!(approx(g.global_transform(child).unwrap().tr, target.tr));
    }

    #[test]
    fn child_lookup_is_direct_only() {
        let mut g = Graph::new();
        let root = g.add_node(None, "root", Xfo::IDENTITY).unwrap();
        let a = g.add_node(Some(root), "a", Xfo::IDENTITY).unwrap();
        let b = g.add_node(Some(a), "b", Xfo::IDENTITY).unwrap();
        assert_eq!(g.child_by_name(root, "b").unwrap(), None);
        assert_eq!(g.resolve_path(root, &["a", "b"]).unwrap(), b);
        assert_eq!(
            g.resolve_path(root, &["a", "c"]),
            Err(GraphError::MissingNode("a/c".into()))
        );
        assert_eq!(g.descendants(root).unwrap(), vec![root, a, b]);
    }

    #[test]
    fn node_parameters_are_unique_per_node() {
        let mut g = Graph::new();
        let n = g.add_node(None, "n", Xfo::IDENTITY).unwrap();
        let axis = g.add_node_parameter(n, "Axis", Vec3::X).unwrap();
        assert_eq!(g.node_parameter(n, "Axis"), Some(axis));
        assert!(matches!(
            g.add_node_parameter(n, "Axis", Vec3::Y),
            Err(GraphError::DuplicateName(_))
        ));
        assert!(matches!(
            g.add_node_parameter(n, GLOBAL_XFO, Xfo::IDENTITY),
            Err(GraphError::DuplicateName(_))
        ));
    }
}
