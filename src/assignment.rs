/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Assignment pass (components 4.H/4.I): rewrites every instruction's
//! operands to their assigned real registers, inserts caller-saved
//! save/restore pairs around call sites, and reloads/stores values that
//! coloring left un-colored (spilled).

use log::{debug, trace};

use crate::data_structures::{Map, RegType, VReg};
use crate::graph::{NodeIx, NodePool};
use crate::interface::{BlockId, Function, Instr, RegisterInfo};
use crate::liveness::{use_pc, BlockInfo};

/// Walks blocks in reverse post-order, per spec.md §4.H. Each block's pass
/// only reads and writes its own `BlockInfo`, so this ordering doesn't
/// change which operand any one instruction ends up with -- it's followed
/// for parity with the liveness and live-range passes, which both rely on
/// reverse-post-order-like traversal to see definitions before uses.
pub fn assign<F: Function>(func: &mut F, info: &RegisterInfo, graph: &mut NodePool, infos: &mut [BlockInfo]) {
  let rpo: Vec<BlockId> = func.reverse_post_order().to_vec();
  for b in rpo {
    assign_block(func, info, graph, &mut infos[b as usize], b);
  }
}

fn assign_block<F: Function>(
  func: &mut F,
  info: &RegisterInfo,
  graph: &mut NodePool,
  block: &mut BlockInfo,
  b: BlockId,
) {
  trace!("assignment: visiting block {}", b);
  let n_instrs = func.block_instrs(b).len();
  let mut use_buf = Vec::new();
  let mut def_buf = Vec::new();
  let mut active = Vec::new();

  for i in 0..n_instrs {
    use_buf.clear();
    def_buf.clear();
    let (is_call, is_indirect_call, is_return) = {
      let instr = &func.block_instrs(b)[i];
      instr.uses(&mut use_buf);
      instr.defs(&mut def_buf);
      (instr.is_call(), instr.is_indirect_call(), instr.is_return())
    };

    if is_return {
      continue;
    }

    let pc_u = use_pc(i);

    if is_call || is_indirect_call {
      block.intervals.collect_active_nodes(pc_u, false, graph, &mut active);
      let mut caller_saved: Vec<NodeIx> = active
        .iter()
        .copied()
        .filter(|&n| graph.view(n).assigned.map_or(false, |r| info.is_caller_saved(r)))
        .collect();
      caller_saved.sort_by_key(|&n| graph.view(n).vreg.id());
      for n in caller_saved {
        let v = graph.view(n).vreg;
        debug!("assignment: block {} instr {}: saving caller-saved {:?} around call", b, i, v);
        func.store_register_before(v, b, i);
        func.reload_register_after(v, b, i);
      }
      // A direct call's operands are already placed by the calling
      // convention; only an indirect call still needs its function-pointer
      // use rewritten below.
      if !is_indirect_call {
        continue;
      }
    }

    block.intervals.collect_active_nodes(pc_u, false, graph, &mut active);
    let mut spiller = SpillHandler::new();

    let uses_snapshot = use_buf.clone();
    for (idx, &u) in uses_snapshot.iter().enumerate() {
      if u.is_real_reg() {
        continue;
      }
      let node = graph
        .lookup(u.id())
        .unwrap_or_else(|| panic!("assignment: no interference-graph node for used VReg {:?}", u));
      let real = match graph.view(node).assigned {
        Some(r) => r,
        None => {
          let r = spiller.reserve(func, info, u.reg_type(), &active, graph, b, i);
          debug!("assignment: block {} instr {}: reloading spilled use {:?} into {:?}", b, i, u, r);
          func.reload_register_before(u, b, i);
          r
        }
      };
      func.block_instrs_mut(b)[i].assign_use(idx, u.set_real_reg(real));
    }

    // Calls with more than one def (their return-value registers) follow
    // the calling convention directly and are never rewritten here.
    if is_indirect_call {
      continue;
    }
    if def_buf.len() == 1 {
      let d = def_buf[0];
      if !d.is_real_reg() {
        let node = graph
          .lookup(d.id())
          .unwrap_or_else(|| panic!("assignment: no interference-graph node for defined VReg {:?}", d));
        let real = match graph.view(node).assigned {
          Some(r) => r,
          None => {
            let r = spiller.reserve(func, info, d.reg_type(), &active, graph, b, i);
            debug!("assignment: block {} instr {}: storing spilled def {:?} from {:?}", b, i, d, r);
            func.store_register_after(d, b, i);
            r
          }
        };
        func.block_instrs_mut(b)[i].assign_def(d.set_real_reg(real));
      }
    }
  }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RegSlotState {
  Free,
  BeingUsedNow,
  Evicted(NodeIx),
}

/// Hands out scratch real registers for values coloring left un-colored,
/// scoped to a single instruction: a register reserved here is only safe
/// to reuse once the next instruction starts.
struct SpillHandler {
  slots: Map<u8, RegSlotState>,
}

impl SpillHandler {
  fn new() -> Self {
    Self { slots: Map::default() }
  }

  fn state(&self, idx: u8) -> RegSlotState {
    self.slots.get(&idx).copied().unwrap_or(RegSlotState::Free)
  }

  /// Picks a real register of `ty` to hold a spilled value across this one
  /// instruction: an unoccupied one if one exists, otherwise evicts the
  /// first occupied-but-free-to-borrow one (its resident value is saved
  /// before this instruction and reloaded right after).
  fn reserve<F: Function>(
    &mut self,
    func: &mut F,
    info: &RegisterInfo,
    ty: RegType,
    active: &[NodeIx],
    graph: &NodePool,
    block: BlockId,
    instr_index: usize,
  ) -> crate::data_structures::RealReg {
    for &r in info.allocatable_for(ty) {
      if self.state(r.0) != RegSlotState::Free {
        continue;
      }
      let occupied = active.iter().any(|&n| {
        let node = graph.view(n);
        node.vreg.reg_type() == ty && node.assigned == Some(r)
      });
      if !occupied {
        self.slots.insert(r.0, RegSlotState::BeingUsedNow);
        return r;
      }
    }

    for &n in active {
      let node = graph.view(n);
      if node.vreg.reg_type() != ty {
        continue;
      }
      if let Some(r) = node.assigned {
        if self.state(r.0) == RegSlotState::Free {
          debug!(
            "assignment: block {} instr {}: evicting {:?} (holding {:?}) for a scratch register",
            block, instr_index, r, node.vreg
          );
          func.store_register_before(node.vreg, block, instr_index);
          func.reload_register_after(node.vreg, block, instr_index);
          self.slots.insert(r.0, RegSlotState::Evicted(n));
          return r;
        }
      }
    }

    panic!(
      "SpillHandler::reserve: no scratch {:?} register available at block {} instr {}",
      ty, block, instr_index
    );
  }
}
