/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Liveness analysis (component 4.E): iterative dataflow over the CFG,
//! augmented with the host's loop-nesting forest for correctness in the
//! presence of back edges (SSA Book, Algorithm 9.3), plus phi/block-param
//! awareness.

use log::{debug, trace};

use crate::data_structures::{VRegSet, VRegTable, REAL_REGS_NUM_MAX};
use crate::graph::NodePool;
use crate::interface::{BlockId, Function, Instr};
use crate::interval::IntervalManager;

pub const PC_STRIDE: usize = 2;

pub fn use_pc(instr_index: usize) -> usize {
  instr_index * PC_STRIDE
}

pub fn def_pc(instr_index: usize) -> usize {
  instr_index * PC_STRIDE + 1
}

/// Per-block dataflow state (component 4.E's `BlockInfo`).
pub struct BlockInfo {
  pub live_ins: VRegSet,
  pub live_outs: VRegSet,
  pub last_uses: VRegTable,
  pub defs: VRegTable,
  pub kills: VRegSet,
  /// Indexed by RealReg index: PCs at which that real register is used or
  /// defined within this block. A pre-colored register can have several
  /// disjoint live ranges per block (e.g. two independent calls).
  pub real_reg_uses: Vec<Vec<usize>>,
  pub real_reg_defs: Vec<Vec<usize>>,
  pub intervals: IntervalManager,
}

impl BlockInfo {
  pub fn new() -> Self {
    Self {
      live_ins: VRegSet::new(),
      live_outs: VRegSet::new(),
      last_uses: VRegTable::new(),
      defs: VRegTable::new(),
      kills: VRegSet::new(),
      real_reg_uses: vec![Vec::new(); REAL_REGS_NUM_MAX],
      real_reg_defs: vec![Vec::new(); REAL_REGS_NUM_MAX],
      intervals: IntervalManager::new(),
    }
  }

  pub fn reset(&mut self, min_id: u32) {
    self.live_ins.reset(min_id);
    self.live_outs.reset(min_id);
    self.last_uses.reset(min_id);
    self.defs.reset(min_id);
    self.kills.reset(min_id);
    for v in &mut self.real_reg_uses {
      v.clear();
    }
    for v in &mut self.real_reg_defs {
      v.clear();
    }
    self.intervals.reset();
  }
}

/// Runs liveness analysis over every block of `func`, populating `infos`
/// (already sized to `func.num_blocks()` by the caller) and recording
/// copy-hint relations into `graph`.
pub fn analyze<F: Function>(func: &mut F, graph: &mut NodePool, infos: &mut [BlockInfo], min_id: u32) {
  let num_blocks = func.num_blocks();
  trace!("liveness::analyze: starting over {} blocks", num_blocks);
  for info in infos.iter_mut() {
    info.reset(min_id);
  }

  let post_order: Vec<BlockId> = func.post_order().to_vec();
  let mut processed = vec![false; num_blocks];
  let mut use_buf = Vec::new();
  let mut def_buf = Vec::new();

  for &b in &post_order {
    trace!("liveness: visiting block {} in post-order", b);
    if func.block_preds(b).is_empty() && b != func.entry_block() {
      panic!("liveness: block {} has no predecessors and is not the entry block", b);
    }

    for &p in func.block_params(b) {
      if !p.is_real_reg() {
        graph.get_or_create(p);
      }
    }

    // Step 3: successor propagation. Successors already processed (i.e.
    // forward edges in this post-order walk) seed liveOuts/liveIns as
    // candidates; a "dedup" check (`processed`) distinguishes back edges,
    // which are instead handled by the loop-forest pass below.
    for &s in func.block_succs(b) {
      if processed[s as usize] {
        let phi_targets = func.block_params(s).to_vec();
        let live_in_s = infos[s as usize].live_ins.to_vec();
        for v in live_in_s {
          if !phi_targets.iter().any(|t| t.id() == v) {
            infos[b as usize].live_outs.insert(v);
            infos[b as usize].live_ins.insert(v);
          }
        }
      }
    }

    // Step 2: per-block backward scan.
    let n_instrs = func.block_instrs(b).len();
    for i in (0..n_instrs).rev() {
      use_buf.clear();
      def_buf.clear();
      {
        let instr = &func.block_instrs(b)[i];
        instr.uses(&mut use_buf);
        instr.defs(&mut def_buf);
      }

      for &d in &def_buf {
        if d.is_real_reg() {
          infos[b as usize].real_reg_defs[d.real_reg().unwrap().index()].push(def_pc(i));
        } else {
          graph.get_or_create(d);
          infos[b as usize].defs.insert(d.id(), def_pc(i));
          infos[b as usize].live_ins.remove(d.id());
        }
      }
      for &u in &use_buf {
        if u.is_real_reg() {
          infos[b as usize].real_reg_uses[u.real_reg().unwrap().index()].push(use_pc(i));
        } else {
          graph.get_or_create(u);
          if infos[b as usize].last_uses.lookup(u.id()).is_none() {
            infos[b as usize].last_uses.insert(u.id(), use_pc(i));
          }
          infos[b as usize].live_ins.insert(u.id());
        }
      }

      let is_copy = func.block_instrs(b)[i].is_copy();
      if is_copy {
        record_copy(graph, &use_buf, &def_buf);

        // If the copy's destination is a phi parameter of some successor
        // (i.e. this copy implements that phi's incoming-edge argument),
        // its source must stay live out of this block so the phi copy
        // still sees the right value at the block boundary.
        if let (Some(&src), Some(&dst)) = (use_buf.first(), def_buf.first()) {
          if !dst.is_real_reg() {
            let is_phi_arg = func
              .block_succs(b)
              .iter()
              .any(|&s| func.block_params(s).iter().any(|p| p.id() == dst.id()));
            if is_phi_arg && !src.is_real_reg() {
              infos[b as usize].live_outs.insert(src.id());
            }
          }
        }
      }
    }

    processed[b as usize] = true;
  }

  // Step 4: loop propagation (Algorithm 9.3).
  let all_blocks: Vec<BlockId> = (0..num_blocks as u32).collect();
  let roots: Vec<BlockId> = func.loop_nesting_forest_roots().to_vec();
  debug!("liveness: propagating {} loop-nesting-forest root(s)", roots.len());
  for root in roots {
    propagate_loop(func, infos, root, &all_blocks);
  }

  // Step 5: kills.
  for b in 0..num_blocks {
    let mut last_use_ids = Vec::new();
    infos[b].last_uses.range(|id, _| last_use_ids.push(id));
    for id in last_use_ids {
      if !infos[b].live_outs.contains(id) {
        infos[b].kills.insert(id);
      }
    }
  }
  trace!("liveness::analyze: done");
}

fn record_copy(
  graph: &mut NodePool,
  use_buf: &[crate::data_structures::VReg],
  def_buf: &[crate::data_structures::VReg],
) {
  let (src, dst) = match (use_buf.first(), def_buf.first()) {
    (Some(&s), Some(&d)) => (s, d),
    _ => return,
  };
  match (src.is_real_reg(), dst.is_real_reg()) {
    (false, false) => {
      let src_node = graph.get_or_create(src);
      let dst_node = graph.get_or_create(dst);
      graph.view_mut(dst_node).copy_from_vreg = Some(src_node);
      graph.view_mut(src_node).copy_to_vreg = Some(dst_node);
    }
    (true, false) => {
      let dst_node = graph.get_or_create(dst);
      graph.view_mut(dst_node).copy_from_real = src.real_reg();
    }
    (false, true) => {
      let src_node = graph.get_or_create(src);
      graph.view_mut(src_node).copy_to_real = dst.real_reg();
    }
    (true, true) => {}
  }
}

fn is_in_loop<F: Function>(func: &F, block: BlockId, header: BlockId) -> bool {
  let mut cur = Some(block);
  while let Some(c) = cur {
    if c == header {
      return true;
    }
    cur = func.loop_header_of(c);
  }
  false
}

fn propagate_loop<F: Function>(func: &F, infos: &mut [BlockInfo], root: BlockId, all_blocks: &[BlockId]) {
  let mut stack = vec![root];
  while let Some(header) = stack.pop() {
    debug!("liveness: propagating loop header {}", header);
    let phi_targets = func.block_params(header).to_vec();
    let carry: Vec<u32> = {
      let mut v = Vec::new();
      infos[header as usize].live_ins.iter_ids(|id| v.push(id));
      v.into_iter().filter(|id| !phi_targets.iter().any(|t| t.id() == *id)).collect()
    };
    for &b in all_blocks {
      if is_in_loop(func, b, header) {
        for &v in &carry {
          infos[b as usize].live_ins.insert(v);
          infos[b as usize].live_outs.insert(v);
        }
      }
    }
    let children = func.loop_nesting_forest_children(header);
    for &c in children {
      stack.push(c);
    }
  }
}
