//! Generic Bayes tree: a forest of cliques with a variable index.
//!
//! Cliques live in an arena owned by the tree and refer to each other by
//! [`CliqueId`]. Children are the ownership edges; the parent handle is only a
//! back-reference, so the structure has no reference cycles and dropping the
//! tree drops every clique exactly once.
//!
//! Every walk over the tree uses an explicit work-list, so depth is bounded by
//! heap rather than stack.

use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use crate::error::{ElimError, Result};
use crate::types::Key;

use super::bayes_net::BayesNet;
use super::clique::{Clique, CliqueId};
use super::conditional::Conditional;

/// A forest of cliques satisfying the running-intersection property, plus an
/// O(1) index from each variable to the clique where it is frontal.
#[derive(Debug)]
pub struct BayesTree<C> {
    cliques: Vec<Clique<C>>,
    roots: Vec<CliqueId>,
    nodes: HashMap<Key, CliqueId>,
}

/// Structural copy: new cliques and links, conditionals shared with the source.
impl<C> Clone for BayesTree<C> {
    fn clone(&self) -> Self {
        Self {
            cliques: self.cliques.clone(),
            roots: self.roots.clone(),
            nodes: self.nodes.clone(),
        }
    }
}

impl<C> Default for BayesTree<C> {
    fn default() -> Self {
        Self {
            cliques: Vec::new(),
            roots: Vec::new(),
            nodes: HashMap::new(),
        }
    }
}

impl<C: Conditional> BayesTree<C> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clique holding `conditional`, as a child of `parent` or as a new root.
    ///
    /// This is the assembly entry point for an eliminator. The variable index is
    /// updated; the running-intersection property is not checked here (see
    /// [`BayesTree::validate`]).
    ///
    /// # Errors
    /// - [`ElimError::StructuralMismatch`] if `parent` is not a clique of this tree.
    /// - [`ElimError::DuplicateFrontal`] if a frontal key is already in the tree.
    pub fn add_clique(
        &mut self,
        conditional: impl Into<Arc<C>>,
        parent: Option<CliqueId>,
    ) -> Result<CliqueId> {
        let conditional = conditional.into();
        if let Some(p) = parent {
            if p.0 >= self.cliques.len() {
                return Err(ElimError::StructuralMismatch(format!(
                    "parent clique {} does not exist",
                    p
                )));
            }
        }
        if let Some(&key) = conditional
            .frontals()
            .iter()
            .find(|k| self.nodes.contains_key(*k))
        {
            return Err(ElimError::DuplicateFrontal(key));
        }

        let id = CliqueId(self.cliques.len());
        for &key in conditional.frontals() {
            self.nodes.insert(key, id);
        }
        self.cliques.push(Clique::new(conditional, parent));
        match parent {
            Some(p) => self.cliques[p.0].children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    pub fn roots(&self) -> &[CliqueId] {
        &self.roots
    }

    /// Number of cliques.
    pub fn len(&self) -> usize {
        self.cliques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cliques.is_empty()
    }

    pub fn clique(&self, id: CliqueId) -> Option<&Clique<C>> {
        self.cliques.get(id.0)
    }

    /// The clique in which `key` is frontal.
    pub fn clique_id(&self, key: Key) -> Option<CliqueId> {
        self.nodes.get(&key).copied()
    }

    /// Like [`BayesTree::clique_id`], returning the clique itself.
    ///
    /// # Errors
    /// Returns [`ElimError::UnboundVariable`] if `key` is not frontal anywhere in the tree.
    pub fn clique_for(&self, key: Key) -> Result<&Clique<C>> {
        self.clique_id(key)
            .map(|id| &self.cliques[id.0])
            .ok_or(ElimError::UnboundVariable(key))
    }

    pub fn parent_of(&self, id: CliqueId) -> Option<CliqueId> {
        self.clique(id).and_then(|c| c.parent)
    }

    /// Number of cliques in the subtree rooted at `id` (including `id`).
    pub fn subtree_size(&self, id: CliqueId) -> usize {
        if id.0 >= self.cliques.len() {
            return 0;
        }
        let mut count = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            count += 1;
            stack.extend(self.cliques[current.0].children.iter().copied());
        }
        count
    }

    /// Cliques top-down: every parent before its children, roots and children in order.
    pub fn preorder(&self) -> Vec<CliqueId> {
        let mut order = Vec::with_capacity(self.cliques.len());
        let mut stack: Vec<CliqueId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.cliques[id.0].children.iter().rev().copied());
        }
        order
    }

    /// Cliques bottom-up: every child before its parent.
    pub fn postorder(&self) -> Vec<CliqueId> {
        let mut order = Vec::with_capacity(self.cliques.len());
        let mut stack: Vec<CliqueId> = self.roots.clone();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.cliques[id.0].children.iter().copied());
        }
        order.reverse();
        order
    }

    /// Frontal keys of all cliques, top-down.
    pub fn frontal_keys(&self) -> Vec<Key> {
        self.preorder()
            .into_iter()
            .flat_map(|id| self.cliques[id.0].frontals().iter().copied())
            .collect()
    }

    /// Recursive equality: same number of roots and, pairwise, equal
    /// conditionals with equal children in the same order.
    pub fn equals(&self, other: &Self, tol: f64) -> bool {
        if self.roots.len() != other.roots.len() {
            return false;
        }
        let mut stack: Vec<(CliqueId, CliqueId)> = self
            .roots
            .iter()
            .copied()
            .zip(other.roots.iter().copied())
            .collect();
        while let Some((a, b)) = stack.pop() {
            let (ca, cb) = (&self.cliques[a.0], &other.cliques[b.0]);
            if ca.children.len() != cb.children.len()
                || !ca.conditional.equals(&cb.conditional, tol)
            {
                return false;
            }
            stack.extend(ca.children.iter().copied().zip(cb.children.iter().copied()));
        }
        true
    }

    /// Recompute the variable index from the cliques.
    ///
    /// # Errors
    /// Returns [`ElimError::DuplicateFrontal`] if a key is frontal in two cliques;
    /// the existing index is left untouched in that case.
    pub fn rebuild_index(&mut self) -> Result<()> {
        let mut nodes = HashMap::with_capacity(self.nodes.len());
        for (i, clique) in self.cliques.iter().enumerate() {
            for &key in clique.frontals() {
                if nodes.insert(key, CliqueId(i)).is_some() {
                    return Err(ElimError::DuplicateFrontal(key));
                }
            }
        }
        self.nodes = nodes;
        Ok(())
    }

    /// Check every structural invariant of the tree.
    ///
    /// # Errors
    /// - [`ElimError::RunningIntersection`] if a separator variable of a
    ///   non-root clique is neither frontal nor separator in its parent.
    /// - [`ElimError::DuplicateFrontal`] if the index maps a frontal key elsewhere.
    /// - [`ElimError::StructuralMismatch`] for inconsistent links, unreachable
    ///   cliques, or stale index entries.
    pub fn validate(&self) -> Result<()> {
        let n = self.cliques.len();
        let mut visited = vec![false; n];
        let mut stack: Vec<(CliqueId, Option<CliqueId>)> =
            self.roots.iter().map(|&r| (r, None)).collect();

        while let Some((id, expected_parent)) = stack.pop() {
            if id.0 >= n {
                return Err(ElimError::StructuralMismatch(format!(
                    "clique {} does not exist",
                    id
                )));
            }
            if visited[id.0] {
                return Err(ElimError::StructuralMismatch(format!(
                    "clique {} is reachable twice",
                    id
                )));
            }
            visited[id.0] = true;

            let clique = &self.cliques[id.0];
            if clique.parent != expected_parent {
                return Err(ElimError::StructuralMismatch(format!(
                    "clique {} has parent link {:?} but is owned by {:?}",
                    id, clique.parent, expected_parent
                )));
            }
            if let Some(p) = expected_parent {
                let parent = &self.cliques[p.0];
                if let Some(&key) = clique.separator().iter().find(|&&k| !parent.involves(k)) {
                    return Err(ElimError::RunningIntersection {
                        clique: clique.conditional.first_frontal(),
                        key,
                    });
                }
            }
            for &key in clique.frontals() {
                match self.nodes.get(&key) {
                    Some(&indexed) if indexed == id => {}
                    Some(_) => return Err(ElimError::DuplicateFrontal(key)),
                    None => {
                        return Err(ElimError::StructuralMismatch(format!(
                            "variable {} is missing from the index",
                            key
                        )))
                    }
                }
            }
            stack.extend(clique.children.iter().map(|&c| (c, Some(id))));
        }

        if let Some(orphan) = visited.iter().position(|v| !v) {
            return Err(ElimError::StructuralMismatch(format!(
                "clique #{} is not reachable from any root",
                orphan
            )));
        }
        let nr_frontals: usize = self.cliques.iter().map(|c| c.frontals().len()).sum();
        if nr_frontals != self.nodes.len() {
            return Err(ElimError::StructuralMismatch(format!(
                "variable index has {} entries for {} frontal variables",
                self.nodes.len(),
                nr_frontals
            )));
        }
        Ok(())
    }

    /// Remove the subtree rooted at `id` and return it as a tree of its own.
    ///
    /// Conditionals are moved by reference, not copied. All [`CliqueId`]s of
    /// both trees are re-issued, so handles taken before the call are invalid.
    pub fn detach_subtree(&mut self, id: CliqueId) -> Result<BayesTree<C>> {
        if id.0 >= self.cliques.len() {
            return Err(ElimError::StructuralMismatch(format!(
                "clique {} does not exist",
                id
            )));
        }
        let none_skipped = vec![false; self.cliques.len()];
        let mut detached = BayesTree::new();
        self.copy_subtree(id, None, &mut detached, &none_skipped)?;

        let mut skip = vec![false; self.cliques.len()];
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            skip[current.0] = true;
            stack.extend(self.cliques[current.0].children.iter().copied());
        }
        let mut kept = BayesTree::new();
        for &root in &self.roots {
            self.copy_subtree(root, None, &mut kept, &skip)?;
        }

        log::debug!(
            "detached {} cliques, {} remain",
            detached.len(),
            kept.len()
        );
        *self = kept;
        Ok(detached)
    }

    fn copy_subtree(
        &self,
        root: CliqueId,
        new_parent: Option<CliqueId>,
        into: &mut BayesTree<C>,
        skip: &[bool],
    ) -> Result<()> {
        let mut stack = vec![(root, new_parent)];
        while let Some((old, parent)) = stack.pop() {
            if skip[old.0] {
                continue;
            }
            let clique = &self.cliques[old.0];
            let new_id = into.add_clique(Arc::clone(&clique.conditional), parent)?;
            stack.extend(clique.children.iter().rev().map(|&c| (c, Some(new_id))));
        }
        Ok(())
    }

    /// Flatten into a Bayes net in a valid elimination order (children first).
    pub fn to_bayes_net(&self) -> BayesNet<C> {
        let mut net = BayesNet::new();
        for id in self.postorder() {
            net.push_shared(Arc::clone(&self.cliques[id.0].conditional));
        }
        net
    }

    /// A tree of identical shape whose conditionals are `f` applied to ours.
    ///
    /// # Errors
    /// Returns [`ElimError::DuplicateFrontal`] if `f` makes two cliques share a frontal key.
    pub fn map_conditionals<D, F>(&self, f: F) -> Result<BayesTree<D>>
    where
        D: Conditional,
        F: Fn(&C) -> D,
    {
        let mut mapped = BayesTree {
            cliques: self
                .cliques
                .iter()
                .map(|c| Clique {
                    conditional: Arc::new(f(&*c.conditional)),
                    parent: c.parent,
                    children: c.children.clone(),
                })
                .collect(),
            roots: self.roots.clone(),
            nodes: HashMap::new(),
        };
        mapped.rebuild_index()?;
        Ok(mapped)
    }

    /// Graphviz rendering: one box per clique labelled `frontals : separator`.
    pub fn to_dot(&self) -> String {
        let join = |keys: &[Key]| {
            keys.iter()
                .map(|k| k.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        let mut dot = String::from("digraph bayes_tree {\n  node [shape=box];\n");
        for id in self.preorder() {
            let clique = &self.cliques[id.0];
            dot.push_str(&format!(
                "  c{} [label=\"{} : {}\"];\n",
                id.0,
                join(clique.frontals()),
                join(clique.separator())
            ));
            if let Some(p) = clique.parent {
                dot.push_str(&format!("  c{} -> c{};\n", p.0, id.0));
            }
        }
        dot.push_str("}\n");
        dot
    }
}

/// # Panics
/// Panics if `id` was not issued by this tree.
impl<C> Index<CliqueId> for BayesTree<C> {
    type Output = Clique<C>;

    fn index(&self, id: CliqueId) -> &Clique<C> {
        &self.cliques[id.0]
    }
}

impl<C: Conditional + fmt::Display> fmt::Display for BayesTree<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BayesTree with {} cliques", self.cliques.len())?;
        let mut stack: Vec<(CliqueId, usize)> =
            self.roots.iter().rev().map(|&r| (r, 1)).collect();
        while let Some((id, depth)) = stack.pop() {
            let clique = &self.cliques[id.0];
            writeln!(f, "{}- {}", "  ".repeat(depth), clique.conditional)?;
            stack.extend(clique.children.iter().rev().map(|&c| (c, depth + 1)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::SymbolicConditional;

    fn sc(frontals: &[Key], parents: &[Key]) -> SymbolicConditional {
        SymbolicConditional::new(frontals.to_vec(), parents.to_vec()).unwrap()
    }

    /// ```text
    ///        (3,4)
    ///        /   \
    ///    (1|3)   (2|4)
    ///      |
    ///   (0|1,3)
    /// ```
    fn build_tree() -> (BayesTree<SymbolicConditional>, [CliqueId; 4]) {
        let mut tree: BayesTree<SymbolicConditional> = BayesTree::new();
        let root = tree.add_clique(sc(&[3, 4], &[]), None).unwrap();
        let a = tree.add_clique(sc(&[1], &[3]), Some(root)).unwrap();
        let b = tree.add_clique(sc(&[2], &[4]), Some(root)).unwrap();
        let c = tree.add_clique(sc(&[0], &[1, 3]), Some(a)).unwrap();
        (tree, [root, a, b, c])
    }

    #[test]
    fn test_structure_and_lookup() {
        let (tree, [root, a, b, c]) = build_tree();
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.roots(), &[root]);
        assert_eq!(tree.clique_id(4), Some(root));
        assert_eq!(tree.clique_id(0), Some(c));
        assert_eq!(tree.clique_id(9), None);
        assert_eq!(tree[a].children(), &[c]);
        assert_eq!(tree.parent_of(c), Some(a));
        assert_eq!(tree.parent_of(root), None);
        assert!(tree[root].is_root());
        assert_eq!(tree[b].separator(), &[4]);
        assert_eq!(tree.subtree_size(root), 4);
        assert_eq!(tree.subtree_size(a), 2);
        assert!(tree.clique_for(2).is_ok());
        assert!(matches!(tree.clique_for(9), Err(ElimError::UnboundVariable(9))));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_traversal_orders() {
        let (tree, [root, a, b, c]) = build_tree();
        assert_eq!(tree.preorder(), vec![root, a, c, b]);
        assert_eq!(tree.postorder(), vec![c, a, b, root]);
        assert_eq!(tree.frontal_keys(), vec![3, 4, 1, 0, 2]);
    }

    #[test]
    fn test_duplicate_frontal_rejected() {
        let (mut tree, [root, ..]) = build_tree();
        let err = tree.add_clique(sc(&[1], &[3]), Some(root)).unwrap_err();
        assert_eq!(err, ElimError::DuplicateFrontal(1));
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut tree: BayesTree<SymbolicConditional> = BayesTree::new();
        let err = tree.add_clique(sc(&[1], &[]), Some(CliqueId(7))).unwrap_err();
        assert!(matches!(err, ElimError::StructuralMismatch(_)));
    }

    #[test]
    fn test_running_intersection_violation() {
        // Separator 1 of the child is not available in the root, which holds 0.
        let mut tree: BayesTree<SymbolicConditional> = BayesTree::new();
        let root = tree.add_clique(sc(&[0], &[]), None).unwrap();
        tree.add_clique(sc(&[2], &[1]), Some(root)).unwrap();
        assert_eq!(
            tree.validate(),
            Err(ElimError::RunningIntersection { clique: 2, key: 1 })
        );
    }

    #[test]
    fn test_separator_may_come_from_parent_separator() {
        let (tree, _) = build_tree();
        // (0 | 1, 3): 3 is in the parent's separator, not its frontals.
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_equals_and_clone() {
        let (tree, _) = build_tree();
        let (other, _) = build_tree();
        assert!(tree.equals(&tree, 0.0));
        assert!(tree.equals(&other, 1e-9));
        assert!(other.equals(&tree, 1e-9));

        let copy = tree.clone();
        assert!(copy.equals(&tree, 1e-9));
        for id in tree.preorder() {
            assert!(Arc::ptr_eq(tree[id].conditional(), copy[id].conditional()));
            assert!(!std::ptr::eq(&tree[id], &copy[id]));
        }
    }

    #[test]
    fn test_not_equal_when_shape_differs() {
        let (tree, [root, ..]) = build_tree();
        let mut bigger = tree.clone();
        bigger.add_clique(sc(&[5], &[3]), Some(root)).unwrap();
        assert!(!tree.equals(&bigger, 1e-9));

        let mut two_roots = tree.clone();
        two_roots.add_clique(sc(&[6], &[]), None).unwrap();
        assert!(!tree.equals(&two_roots, 1e-9));
    }

    #[test]
    fn test_detach_in_clone_leaves_original() {
        let (tree, [_, a, ..]) = build_tree();
        let mut copy = tree.clone();
        let detached = copy.detach_subtree(a).unwrap();

        assert_eq!(detached.len(), 2);
        assert_eq!(detached.frontal_keys(), vec![1, 0]);
        assert_eq!(copy.len(), 2);
        assert_eq!(copy.clique_id(1), None);
        assert_eq!(copy.frontal_keys(), vec![3, 4, 2]);
        assert!(copy.validate().is_ok());

        assert_eq!(tree.len(), 4);
        assert!(tree.validate().is_ok());
        assert!(!tree.equals(&copy, 1e-9));
    }

    #[test]
    fn test_to_bayes_net_is_valid_chain() {
        let (tree, _) = build_tree();
        let net = tree.to_bayes_net();
        assert_eq!(net.len(), 4);
        assert_eq!(net.frontal_keys(), vec![0, 1, 2, 3, 4]);
        assert!(net.validate().is_ok());
    }

    #[test]
    fn test_rebuild_index() {
        let (mut tree, [root, ..]) = build_tree();
        tree.rebuild_index().unwrap();
        assert_eq!(tree.clique_id(3), Some(root));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_map_conditionals_keeps_shape() {
        let (tree, _) = build_tree();
        let mapped = tree.map_conditionals(|c| c.clone()).unwrap();
        assert!(mapped.equals(&tree, 0.0));
        assert!(mapped.validate().is_ok());
    }

    #[test]
    fn test_to_dot() {
        let (tree, _) = build_tree();
        let dot = tree.to_dot();
        assert!(dot.starts_with("digraph bayes_tree {"));
        assert!(dot.contains("c0 [label=\"3,4 : \"];"));
        assert!(dot.contains("c3 [label=\"0 : 1,3\"];"));
        assert!(dot.contains("c1 -> c3;"));
    }

    #[test]
    fn test_forest() {
        let mut tree: BayesTree<SymbolicConditional> = BayesTree::new();
        tree.add_clique(sc(&[0], &[]), None).unwrap();
        tree.add_clique(sc(&[1], &[]), None).unwrap();
        assert_eq!(tree.roots().len(), 2);
        assert!(tree.validate().is_ok());
    }
}
