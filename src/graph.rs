/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Node pool and interference graph (component 4.D). One node per VReg
//! (virtual or pre-colored) occurring in the function; edges connect nodes
//! whose live ranges overlap within the same RegType.

use crate::data_structures::{HashSet, Map, RealReg, RegType, VReg};
use crate::interval::IntervalIx;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIx(pub u32);

impl std::fmt::Debug for NodeIx {
  fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(fmt, "n{}", self.0)
  }
}

pub struct Node {
  pub vreg: VReg,
  /// `Some` once colored (or always, for a pre-colored node). `None` means
  /// "spilled" once coloring has finished.
  pub assigned: Option<RealReg>,
  pub intervals: Vec<IntervalIx>,
  pub neighbors: HashSet<NodeIx>,
  pub copy_from_vreg: Option<NodeIx>,
  pub copy_to_vreg: Option<NodeIx>,
  pub copy_from_real: Option<RealReg>,
  pub copy_to_real: Option<RealReg>,
}

impl Node {
  fn new(vreg: VReg) -> Self {
    Self {
      vreg,
      assigned: vreg.real_reg(),
      intervals: Vec::new(),
      neighbors: HashSet::default(),
      copy_from_vreg: None,
      copy_to_vreg: None,
      copy_from_real: None,
      copy_to_real: None,
    }
  }

  pub fn is_precolored(&self) -> bool {
    self.vreg.is_real_reg()
  }

  pub fn is_spilled(&self) -> bool {
    self.assigned.is_none()
  }
}

/// Arena of `Node`s for one function, indexed by position (not address).
/// `reset` rewinds to empty without releasing the backing `Vec` capacity.
pub struct NodePool {
  nodes: Vec<Node>,
  vreg_id_to_node: Map<u32, NodeIx>,
}

impl NodePool {
  pub fn new() -> Self {
    Self { nodes: Vec::new(), vreg_id_to_node: Map::default() }
  }

  pub fn reset(&mut self) {
    self.nodes.clear();
    self.vreg_id_to_node.clear();
  }

  /// Returns the node for `vreg`, creating it on first reference. A VReg
  /// ID must map to exactly one node for the lifetime of the function.
  pub fn get_or_create(&mut self, vreg: VReg) -> NodeIx {
    if let Some(&ix) = self.vreg_id_to_node.get(&vreg.id()) {
      return ix;
    }
    let ix = NodeIx(self.nodes.len() as u32);
    self.nodes.push(Node::new(vreg));
    self.vreg_id_to_node.insert(vreg.id(), ix);
    ix
  }

  pub fn lookup(&self, vreg_id: u32) -> Option<NodeIx> {
    self.vreg_id_to_node.get(&vreg_id).copied()
  }

  pub fn view(&self, ix: NodeIx) -> &Node {
    &self.nodes[ix.0 as usize]
  }

  pub fn view_mut(&mut self, ix: NodeIx) -> &mut Node {
    &mut self.nodes[ix.0 as usize]
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn all_ids(&self) -> impl Iterator<Item = NodeIx> {
    (0..self.nodes.len() as u32).map(NodeIx)
  }

  /// Non-pre-colored nodes of `ty`, sorted by VReg ID for determinism.
  pub fn virtual_nodes_of_type(&self, ty: RegType) -> Vec<NodeIx> {
    let mut v: Vec<NodeIx> = self
      .all_ids()
      .filter(|&ix| {
        let n = self.view(ix);
        !n.is_precolored() && n.vreg.reg_type() == ty
      })
      .collect();
    v.sort_by_key(|&ix| self.view(ix).vreg.id());
    v
  }

  /// Adds a mutual interference edge. A node is never its own neighbor;
  /// edges never cross RegType. Idempotent.
  pub fn add_edge(&mut self, a: NodeIx, b: NodeIx) {
    if a == b {
      panic!("NodePool::add_edge: self-edge on {:?}", a);
    }
    let ta = self.view(a).vreg.reg_type();
    let tb = self.view(b).vreg.reg_type();
    if ta != tb {
      panic!(
        "NodePool::add_edge: RegType mismatch between {:?} ({:?}) and {:?} ({:?})",
        a, ta, b, tb
      );
    }
    self.view_mut(a).neighbors.insert(b);
    self.view_mut(b).neighbors.insert(a);
  }

  /// Debug-only: verifies no two colored neighbors share a color, and that
  /// every edge connects same-RegType nodes.
  #[cfg(debug_assertions)]
  pub fn verify_coloring(&self) {
    for ix in self.all_ids() {
      let n = self.view(ix);
      for &m in &n.neighbors {
        let nb = self.view(m);
        debug_assert_eq!(
          n.vreg.reg_type(),
          nb.vreg.reg_type(),
          "RegType-crossing edge between {:?} and {:?}",
          ix, m
        );
        if let (Some(ra), Some(rb)) = (n.assigned, nb.assigned) {
          debug_assert!(
            ra != rb,
            "coloring conflict: {:?} and {:?} both assigned {:?}",
            ix, m, ra
          );
        }
      }
    }
  }
}
