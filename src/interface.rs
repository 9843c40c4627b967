/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! The capability sets the host compiler backend implements so this crate
//! can drive liveness, coloring and rewriting over its own IR. Kept small
//! and trait-based: a single `Function` trait exposed to the embedder.

use crate::data_structures::{RealReg, RegType, VReg, REAL_REGS_NUM_MAX};

pub type BlockId = u32;

/// A single instruction in the host's IR.
pub trait Instr {
  /// Appends this instruction's used VRegs into `out`, preserving operand
  /// order (`AssignUse`'s `index` refers to this order).
  fn uses(&self, out: &mut Vec<VReg>);

  /// Appends this instruction's defined VRegs into `out`.
  fn defs(&self, out: &mut Vec<VReg>);

  /// Rewrites the `index`-th use (as enumerated by `uses`) to `real`.
  fn assign_use(&mut self, index: usize, real: VReg);

  /// Rewrites this instruction's single def to `real`. Never called for
  /// instructions with more than one def (e.g. calls, which receive their
  /// results per the calling convention directly).
  fn assign_def(&mut self, real: VReg);

  fn is_copy(&self) -> bool {
    false
  }

  fn is_call(&self) -> bool {
    false
  }

  fn is_indirect_call(&self) -> bool {
    false
  }

  fn is_return(&self) -> bool {
    false
  }
}

/// A function: the whole unit the allocator processes in one
/// `do_allocation` call.
pub trait Function {
  type Instr: Instr;

  fn num_blocks(&self) -> usize;

  fn entry_block(&self) -> BlockId {
    0
  }

  /// VRegs defined at this block's entry by its predecessors (phi/block
  /// params). Empty for the entry block.
  fn block_params(&self, block: BlockId) -> &[VReg];

  fn block_instrs(&self, block: BlockId) -> &[Self::Instr];

  fn block_instrs_mut(&mut self, block: BlockId) -> &mut [Self::Instr];

  fn block_preds(&self, block: BlockId) -> &[BlockId];

  fn block_succs(&self, block: BlockId) -> &[BlockId];

  /// This function's blocks in post-order (children before parents).
  fn post_order(&self) -> &[BlockId];

  /// This function's blocks in reverse post-order (parents before
  /// children, modulo back edges).
  fn reverse_post_order(&self) -> &[BlockId];

  /// Roots of the loop-nesting forest (outermost loop headers). Supplied
  /// by the host; computing it is out of scope here.
  fn loop_nesting_forest_roots(&self) -> &[BlockId];

  /// Nested loop headers directly inside `header`'s loop body.
  fn loop_nesting_forest_children(&self, header: BlockId) -> &[BlockId];

  /// The innermost loop header enclosing `block`, or `None` if `block` is
  /// not inside any loop. Corresponds to `Block::LoopHeader()`.
  fn loop_header_of(&self, block: BlockId) -> Option<BlockId>;

  /// Publishes the sorted list of callee-saved real registers (encoded as
  /// their pseudo-VRegs) actually used by this function.
  fn clobbered_registers(&mut self, regs: Vec<VReg>);

  fn store_register_before(&mut self, v: VReg, block: BlockId, instr_index: usize);
  fn store_register_after(&mut self, v: VReg, block: BlockId, instr_index: usize);
  fn reload_register_before(&mut self, v: VReg, block: BlockId, instr_index: usize);
  fn reload_register_after(&mut self, v: VReg, block: BlockId, instr_index: usize);

  fn done(&mut self) {}
}

/// Static, per-ISA description of the allocatable real-register set. Built
/// once and shared by reference across every function allocated in a
/// compilation unit.
pub struct RegisterInfo {
  /// Allocatable registers per type, in preference order.
  pub allocatable: [Vec<RealReg>; crate::data_structures::NUM_REG_TYPES],
  pub callee_saved: crate::data_structures::Bitset,
  pub caller_saved: crate::data_structures::Bitset,
  pub name: fn(RealReg) -> &'static str,
  pub real_reg_type: fn(RealReg) -> RegType,
  pub real_reg_to_vreg: fn(RealReg) -> VReg,
}

impl RegisterInfo {
  pub fn allocatable_for(&self, ty: RegType) -> &[RealReg] {
    &self.allocatable[ty.to_index()]
  }

  pub fn is_callee_saved(&self, r: RealReg) -> bool {
    self.callee_saved.has(r.index())
  }

  pub fn is_caller_saved(&self, r: RealReg) -> bool {
    self.caller_saved.has(r.index())
  }

  pub fn name_of(&self, r: RealReg) -> &'static str {
    (self.name)(r)
  }

  /// Validates internal consistency: every allocatable register is in
  /// range, no register repeats across type lists, and callee-saved/
  /// caller-saved membership is mutually exclusive. Run once at
  /// `Allocator::new` time, not per function.
  pub fn check_is_sane(&self) {
    let mut seen = crate::data_structures::Bitset::new();
    for ty_list in &self.allocatable {
      for &r in ty_list {
        if r.index() >= REAL_REGS_NUM_MAX {
          panic!(
            "RegisterInfo::check_is_sane: real register index {} exceeds REAL_REGS_NUM_MAX ({})",
            r.index(), REAL_REGS_NUM_MAX
          );
        }
        if seen.has(r.index()) {
          panic!(
            "RegisterInfo::check_is_sane: real register {} ({}) listed as allocatable in more than one RegType",
            r.index(), self.name_of(r)
          );
        }
        seen.set(r.index());
        let callee = self.is_callee_saved(r);
        let caller = self.is_caller_saved(r);
        if callee == caller {
          panic!(
            "RegisterInfo::check_is_sane: allocatable register {} ({}) must be exactly one of callee-saved/caller-saved, got callee={} caller={}",
            r.index(), self.name_of(r), callee, caller
          );
        }
      }
    }
  }
}
