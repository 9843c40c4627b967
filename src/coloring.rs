/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Chaitin-style simplify/spill/select coloring (component 4.G), run
//! independently per `RegType` since the two interference graphs never
//! share edges or colors.

use std::collections::VecDeque;

use log::{debug, trace};

use crate::data_structures::{Bitset, RegType};
use crate::graph::{NodeIx, NodePool};
use crate::interface::RegisterInfo;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SpillHeuristic {
  /// Spill the candidate with the highest interference degree first.
  HighestDegree,
  /// Spill the candidate with the longest total live range first.
  LongestInterval,
}

#[derive(Clone)]
pub struct AllocatorConfig {
  pub spill_heuristic: SpillHeuristic,
  /// Re-derives and checks every interference edge after coloring
  /// (debug builds only; a no-op release-mode field access).
  pub verify: bool,
}

impl Default for AllocatorConfig {
  fn default() -> Self {
    Self { spill_heuristic: SpillHeuristic::HighestDegree, verify: true }
  }
}

/// Colors every non-pre-colored node of `ty`. Returns via `graph`'s
/// `Node::assigned` field: `Some(r)` on success, `None` means spilled.
pub fn color(info: &RegisterInfo, config: &AllocatorConfig, ty: RegType, graph: &mut NodePool, clobbered: &mut Bitset) {
  let k = info.allocatable_for(ty).len();
  if k == 0 {
    return;
  }

  let candidates = graph.virtual_nodes_of_type(ty);
  trace!("coloring::color: {:?}, {} candidate(s), k={}", ty, candidates.len(), k);
  let mut remaining: std::collections::HashSet<NodeIx> = candidates.iter().copied().collect();
  let mut degree: std::collections::HashMap<NodeIx, usize> = std::collections::HashMap::new();
  for &n in &candidates {
    let deg = graph
      .view(n)
      .neighbors
      .iter()
      .filter(|m| remaining.contains(*m) || graph.view(**m).is_precolored())
      .count();
    degree.insert(n, deg);
  }

  let mut simplify_worklist: VecDeque<NodeIx> = VecDeque::new();
  let mut spill_worklist: Vec<NodeIx> = Vec::new();
  for &n in &candidates {
    if degree[&n] < k {
      simplify_worklist.push_back(n);
    } else {
      spill_worklist.push(n);
    }
  }

  let mut select_stack: Vec<NodeIx> = Vec::new();

  loop {
    while let Some(n) = simplify_worklist.pop_front() {
      if !remaining.remove(&n) {
        continue;
      }
      select_stack.push(n);
      let neighbors: Vec<NodeIx> = graph.view(n).neighbors.iter().copied().collect();
      for m in neighbors {
        if remaining.contains(&m) {
          let d = degree.get_mut(&m).unwrap();
          if *d == k {
            // Crossing back below K makes m simplifiable.
            *d -= 1;
            spill_worklist.retain(|&x| x != m);
            simplify_worklist.push_back(m);
          } else if *d > 0 {
            *d -= 1;
          }
        }
      }
    }

    if spill_worklist.is_empty() {
      break;
    }

    let victim = pick_spill_victim(config.spill_heuristic, graph, &spill_worklist);
    debug!("coloring::color: tentatively spilling {:?} ({:?})", victim, graph.view(victim).vreg);
    spill_worklist.retain(|&x| x != victim);
    if remaining.remove(&victim) {
      select_stack.push(victim);
      let neighbors: Vec<NodeIx> = graph.view(victim).neighbors.iter().copied().collect();
      for m in neighbors {
        if let Some(d) = degree.get_mut(&m) {
          if *d > 0 {
            *d -= 1;
          }
        }
      }
    }
  }

  while let Some(n) = select_stack.pop() {
    assign_color(info, graph, n, clobbered);
  }

  #[cfg(debug_assertions)]
  {
    if config.verify {
      graph.verify_coloring();
    }
  }
}

fn pick_spill_victim(heuristic: SpillHeuristic, graph: &NodePool, worklist: &[NodeIx]) -> NodeIx {
  let mut best = worklist[0];
  let mut best_key = spill_key(heuristic, graph, best);
  for &n in &worklist[1..] {
    let key = spill_key(heuristic, graph, n);
    // Higher key wins; ties broken by lowest VReg ID for determinism.
    if key > best_key || (key == best_key && graph.view(n).vreg.id() < graph.view(best).vreg.id()) {
      best = n;
      best_key = key;
    }
  }
  best
}

fn spill_key(heuristic: SpillHeuristic, graph: &NodePool, n: NodeIx) -> usize {
  let node = graph.view(n);
  match heuristic {
    SpillHeuristic::HighestDegree => node.neighbors.len(),
    SpillHeuristic::LongestInterval => node.intervals.len(),
  }
}

fn assign_color(info: &RegisterInfo, graph: &mut NodePool, n: NodeIx, clobbered: &mut Bitset) {
  let ty = graph.view(n).vreg.reg_type();
  let mut used = Bitset::new();
  let neighbors: Vec<NodeIx> = graph.view(n).neighbors.iter().copied().collect();
  for m in neighbors {
    if let Some(r) = graph.view(m).assigned {
      used.set(r.index());
    }
  }

  let allocatable = info.allocatable_for(ty);

  let chosen = color_hints(graph, n)
    .iter()
    .filter_map(|h| *h)
    .find(|r| !used.has(r.index()) && allocatable.iter().any(|a| a == r))
    .or_else(|| allocatable.iter().copied().find(|r| !used.has(r.index())));

  match chosen {
    Some(r) => {
      debug!("coloring::assign_color: {:?} <- {:?} ({:?})", n, r, graph.view(n).vreg);
      graph.view_mut(n).assigned = Some(r);
      clobbered.set(r.index());
    }
    None => {
      debug!("coloring::assign_color: {:?} ({:?}) could not be colored, spilling", n, graph.view(n).vreg);
      graph.view_mut(n).assigned = None;
    }
  }
}

/// The copy-coalescing hint chain, in full preference order: a colored
/// `copyFromVReg`, then a colored `copyToVReg`, then `copyFromReal`, then
/// `copyToReal`. `assign_color` must try each in turn rather than stopping
/// at the first one merely *present* -- an early hint that's already taken
/// by a neighbor should not shadow a later hint that would still fit.
fn color_hints(graph: &NodePool, n: NodeIx) -> [Option<crate::data_structures::RealReg>; 4] {
  let node = graph.view(n);
  [
    node.copy_from_vreg.and_then(|from| graph.view(from).assigned),
    node.copy_to_vreg.and_then(|to| graph.view(to).assigned),
    node.copy_from_real,
    node.copy_to_real,
  ]
}
