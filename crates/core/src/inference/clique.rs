use std::fmt;
use std::sync::Arc;

use crate::types::Key;

use super::conditional::Conditional;

/// Handle to a clique inside the [`BayesTree`](super::BayesTree) that issued it.
///
/// Handles are plain indices into the tree's arena; they do not own anything
/// and are invalidated by [`BayesTree::detach_subtree`](super::BayesTree::detach_subtree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CliqueId(pub(crate) usize);

impl CliqueId {
    /// Position of the clique in the tree's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CliqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of a Bayes tree.
///
/// The tree arena owns every clique, and a clique's `children` are the
/// ownership edges. `parent` is a back-reference used for lookups only.
#[derive(Debug)]
pub struct Clique<C> {
    pub(crate) conditional: Arc<C>,
    pub(crate) parent: Option<CliqueId>,
    pub(crate) children: Vec<CliqueId>,
}

impl<C> Clone for Clique<C> {
    fn clone(&self) -> Self {
        Self {
            conditional: Arc::clone(&self.conditional),
            parent: self.parent,
            children: self.children.clone(),
        }
    }
}

impl<C: Conditional> Clique<C> {
    pub(crate) fn new(conditional: Arc<C>, parent: Option<CliqueId>) -> Self {
        Self {
            conditional,
            parent,
            children: Vec::new(),
        }
    }

    pub fn conditional(&self) -> &Arc<C> {
        &self.conditional
    }

    pub fn parent(&self) -> Option<CliqueId> {
        self.parent
    }

    pub fn children(&self) -> &[CliqueId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn frontals(&self) -> &[Key] {
        self.conditional.frontals()
    }

    /// The separator: parent variables of this clique's conditional.
    pub fn separator(&self) -> &[Key] {
        self.conditional.parents()
    }

    /// Whether `key` is a frontal or separator variable of this clique.
    pub fn involves(&self, key: Key) -> bool {
        self.conditional.keys().contains(&key)
    }
}
