/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Live-range builder (component 4.F): turns each block's liveness facts
//! into `[begin, end]` program-counter intervals and feeds them into the
//! per-block `IntervalManager`, which links overlapping ranges into
//! interference-graph edges.

use crate::graph::NodePool;
use crate::interface::{Function, RegisterInfo};
use crate::interval::PC_MAX;
use crate::liveness::BlockInfo;

/// Computes live ranges for every block of `func` and links interference
/// edges. Must run after `liveness::analyze` and before `coloring::color`.
pub fn build<F: Function>(func: &F, info: &RegisterInfo, graph: &mut NodePool, infos: &mut [BlockInfo]) {
  for b in 0..func.num_blocks() as u32 {
    build_block(graph, &mut infos[b as usize]);
  }
  for b in 0..func.num_blocks() as u32 {
    build_precolored(info, graph, &mut infos[b as usize]);
    infos[b as usize].intervals.build(graph);
  }
}

fn build_block(graph: &mut NodePool, block: &mut BlockInfo) {
  // Union of every virtual VReg ID this block knows about, in ID order.
  let mut ids: Vec<u32> = Vec::new();
  block.live_ins.iter_ids(|id| ids.push(id));
  {
    let mut def_ids = Vec::new();
    block.defs.range(|id, _| def_ids.push(id));
    for id in def_ids {
      if !ids.contains(&id) {
        ids.push(id);
      }
    }
  }
  ids.sort_unstable();
  ids.dedup();

  for id in ids {
    let node = match graph.lookup(id) {
      Some(n) => n,
      None => continue,
    };
    let live_in = block.live_ins.contains(id);
    let live_out = block.live_outs.contains(id);
    let def_pc = block.defs.lookup(id);
    let last_use = block.last_uses.lookup(id);

    let (begin, end) = if live_in && live_out {
      (0, PC_MAX)
    } else if live_in {
      // Live-in, not live-out: dies at its last use in this block. A
      // live-in value with no recorded use here still spans to block
      // entry, since it must be carried through for a successor.
      (0, last_use.unwrap_or(0))
    } else if let Some(dpc) = def_pc {
      if live_out {
        (dpc, PC_MAX)
      } else {
        match last_use {
          Some(upc) => (dpc, upc),
          None => (dpc, dpc),
        }
      }
    } else {
      // Neither live-in, live-out, nor defined here: nothing to record
      // (can happen for a block_param that this block never touches).
      continue;
    };

    let ix = block.intervals.insert(node, begin, end);
    graph.view_mut(node).intervals.push(ix);
  }
}

fn build_precolored(info: &RegisterInfo, graph: &mut NodePool, block: &mut BlockInfo) {
  for idx in 0..crate::data_structures::REAL_REGS_NUM_MAX {
    let mut defs = block.real_reg_defs[idx].clone();
    let mut uses = block.real_reg_uses[idx].clone();
    if defs.is_empty() && uses.is_empty() {
      continue;
    }
    defs.sort_unstable();
    uses.sort_unstable();
    if defs.len() != uses.len() {
      panic!(
        "live_range: real register {} has {} defs but {} uses in one block; pre-colored live ranges must pair up 1:1",
        info.name_of(crate::data_structures::RealReg(idx as u8)),
        defs.len(),
        uses.len()
      );
    }
    let real = crate::data_structures::RealReg(idx as u8);
    let ty = (info.real_reg_type)(real);
    let vreg = (info.real_reg_to_vreg)(real);
    debug_assert_eq!(vreg.reg_type(), ty);
    let node = graph.get_or_create(vreg);
    for (&dpc, &upc) in defs.iter().zip(uses.iter()) {
      let (begin, end) = if dpc <= upc { (dpc, upc) } else { (upc, dpc) };
      let ix = block.intervals.insert(node, begin, end);
      graph.view_mut(node).intervals.push(ix);
    }
  }
}
