/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Per-block interval manager (component 4.C): stores `[begin, end]`
//! program-counter ranges, dedupes identical ranges onto one slot, links
//! overlapping intervals as interference-graph neighbors, and answers
//! point queries via a monotone cursor.

use crate::data_structures::Map;
use crate::graph::NodeIx;
use crate::graph::NodePool;

/// Sentinel end for a value live through the whole block.
pub const PC_MAX: usize = usize::max_value();

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntervalIx(pub u32);

pub struct Interval {
  pub begin: usize,
  pub end: usize,
  pub nodes: Vec<NodeIx>,
}

pub struct IntervalManager {
  intervals: Vec<Interval>,
  by_range: Map<(usize, usize), IntervalIx>,
  order_by_begin: Vec<IntervalIx>,
  built: bool,
  // Sweep state for `collect_active_nodes`; `cursor`/`active` assume the
  // caller queries PCs in non-decreasing order within a block.
  cursor: usize,
  active: Vec<IntervalIx>,
}

impl IntervalManager {
  pub fn new() -> Self {
    Self {
      intervals: Vec::new(),
      by_range: Map::default(),
      order_by_begin: Vec::new(),
      built: false,
      cursor: 0,
      active: Vec::new(),
    }
  }

  pub fn reset(&mut self) {
    self.intervals.clear();
    self.by_range.clear();
    self.order_by_begin.clear();
    self.built = false;
    self.cursor = 0;
    self.active.clear();
  }

  /// Inserts `node` as alive over `[begin, end]`. Multiple nodes sharing an
  /// identical range collapse onto one interval slot.
  pub fn insert(&mut self, node: NodeIx, begin: usize, end: usize) -> IntervalIx {
    debug_assert!(end >= begin, "Interval::insert: end {} < begin {}", end, begin);
    if let Some(&ix) = self.by_range.get(&(begin, end)) {
      self.intervals[ix.0 as usize].nodes.push(node);
      return ix;
    }
    let ix = IntervalIx(self.intervals.len() as u32);
    self.intervals.push(Interval { begin, end, nodes: vec![node] });
    self.by_range.insert((begin, end), ix);
    ix
  }

  /// Sorts intervals by `(begin, end)` and links every overlapping pair's
  /// nodes as mutual interference-graph neighbors, via a sweep over the
  /// begin-sorted order (O(n log n + overlaps) rather than the O(n^2)
  /// textbook pairwise scan).
  pub fn build(&mut self, graph: &mut NodePool) {
    self.order_by_begin = (0..self.intervals.len() as u32).map(IntervalIx).collect();
    self.order_by_begin.sort_by_key(|ix| {
      let iv = &self.intervals[ix.0 as usize];
      (iv.begin, iv.end)
    });

    let mut sweep_active: Vec<IntervalIx> = Vec::new();
    for &cur in &self.order_by_begin {
      let cur_begin = self.intervals[cur.0 as usize].begin;
      sweep_active.retain(|&other| self.intervals[other.0 as usize].end >= cur_begin);
      for &other in &sweep_active {
        link_nodes(graph, &self.intervals[cur.0 as usize].nodes, &self.intervals[other.0 as usize].nodes);
      }
      sweep_active.push(cur);
    }

    self.cursor = 0;
    self.active.clear();
    self.built = true;
  }

  /// Gathers all nodes alive at `pc`. Queries within one block must be
  /// non-decreasing in `pc`. `only_real`: if true, only nodes with an
  /// assigned RealReg; if false, only non-spilled, non-pre-colored nodes.
  pub fn collect_active_nodes(&mut self, pc: usize, only_real: bool, graph: &NodePool, out: &mut Vec<NodeIx>) {
    debug_assert!(self.built, "collect_active_nodes called before build()");
    while self.cursor < self.order_by_begin.len() {
      let ix = self.order_by_begin[self.cursor];
      if self.intervals[ix.0 as usize].begin > pc {
        break;
      }
      self.active.push(ix);
      self.cursor += 1;
    }
    self.active.retain(|&ix| self.intervals[ix.0 as usize].end >= pc);

    out.clear();
    for &ix in &self.active {
      for &n in &self.intervals[ix.0 as usize].nodes {
        let node = graph.view(n);
        let include = if only_real {
          node.assigned.is_some()
        } else {
          !node.is_precolored() && !node.is_spilled()
        };
        if include {
          out.push(n);
        }
      }
    }
  }
}

/// Links `a`×`b` as mutual neighbors, skipping pairs of different RegType:
/// a block's `IntervalManager` holds both Int and Float occurrences, but
/// the interference graph is disjoint by type (`NodePool::add_edge` would
/// otherwise panic on the cross-type pairs this sweep inevitably produces
/// whenever an Int and a Float value are both live-through the same block).
fn link_nodes(graph: &mut NodePool, a: &[NodeIx], b: &[NodeIx]) {
  for &na in a {
    for &nb in b {
      if na != nb && graph.view(na).vreg.reg_type() == graph.view(nb).vreg.reg_type() {
        graph.add_edge(na, nb);
      }
    }
  }
}
