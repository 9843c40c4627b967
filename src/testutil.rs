/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! A minimal in-memory `Function` used only by this crate's own unit
//! tests. Not part of the public API.

#![cfg(test)]

use std::collections::HashMap;

use crate::data_structures::VReg;
use crate::interface::{BlockId, Function, Instr};

#[derive(Clone)]
pub struct MockInstr {
  pub uses: Vec<VReg>,
  pub defs: Vec<VReg>,
  pub is_copy: bool,
  pub is_call: bool,
  pub is_indirect_call: bool,
  pub is_return: bool,
}

impl MockInstr {
  pub fn op(defs: Vec<VReg>, uses: Vec<VReg>) -> Self {
    Self { uses, defs, is_copy: false, is_call: false, is_indirect_call: false, is_return: false }
  }

  pub fn copy(dst: VReg, src: VReg) -> Self {
    Self { uses: vec![src], defs: vec![dst], is_copy: true, is_call: false, is_indirect_call: false, is_return: false }
  }

  pub fn call(defs: Vec<VReg>, uses: Vec<VReg>) -> Self {
    Self { uses, defs, is_copy: false, is_call: true, is_indirect_call: false, is_return: false }
  }

  pub fn indirect_call(defs: Vec<VReg>, uses: Vec<VReg>) -> Self {
    Self { uses, defs, is_copy: false, is_call: false, is_indirect_call: true, is_return: false }
  }

  pub fn ret(uses: Vec<VReg>) -> Self {
    Self { uses, defs: Vec::new(), is_copy: false, is_call: false, is_indirect_call: false, is_return: true }
  }
}

impl Instr for MockInstr {
  fn uses(&self, out: &mut Vec<VReg>) {
    out.extend_from_slice(&self.uses);
  }
  fn defs(&self, out: &mut Vec<VReg>) {
    out.extend_from_slice(&self.defs);
  }
  fn assign_use(&mut self, index: usize, real: VReg) {
    self.uses[index] = real;
  }
  fn assign_def(&mut self, real: VReg) {
    self.defs[0] = real;
  }
  fn is_copy(&self) -> bool {
    self.is_copy
  }
  fn is_call(&self) -> bool {
    self.is_call
  }
  fn is_indirect_call(&self) -> bool {
    self.is_indirect_call
  }
  fn is_return(&self) -> bool {
    self.is_return
  }
}

pub struct MockBlock {
  pub params: Vec<VReg>,
  pub instrs: Vec<MockInstr>,
  pub preds: Vec<BlockId>,
  pub succs: Vec<BlockId>,
  pub loop_header: Option<BlockId>,
}

impl MockBlock {
  pub fn new(instrs: Vec<MockInstr>) -> Self {
    Self { params: Vec::new(), instrs, preds: Vec::new(), succs: Vec::new(), loop_header: None }
  }
}

#[derive(Default)]
pub struct MockFunction {
  pub blocks: Vec<MockBlock>,
  pub post_order: Vec<BlockId>,
  pub rpo: Vec<BlockId>,
  pub loop_roots: Vec<BlockId>,
  pub loop_children: HashMap<BlockId, Vec<BlockId>>,
  pub clobbered: Vec<VReg>,
  pub store_before: Vec<(VReg, BlockId, usize)>,
  pub store_after: Vec<(VReg, BlockId, usize)>,
  pub reload_before: Vec<(VReg, BlockId, usize)>,
  pub reload_after: Vec<(VReg, BlockId, usize)>,
  pub done_called: bool,
}

impl MockFunction {
  /// A straight-line chain of blocks 0..N-1, each falling through to the
  /// next; the last block has no successors.
  pub fn linear(mut blocks: Vec<MockBlock>) -> Self {
    let n = blocks.len() as u32;
    for (i, b) in blocks.iter_mut().enumerate() {
      if i > 0 {
        b.preds.push(i as u32 - 1);
      }
      if (i as u32) + 1 < n {
        b.succs.push(i as u32 + 1);
      }
    }
    Self {
      blocks,
      post_order: (0..n).rev().collect(),
      rpo: (0..n).collect(),
      ..Default::default()
    }
  }

  /// Build from fully explicit per-block edges -- used for non-linear CFGs
  /// (loops, diamonds).
  pub fn with_edges(blocks: Vec<MockBlock>, post_order: Vec<BlockId>, rpo: Vec<BlockId>) -> Self {
    Self { blocks, post_order, rpo, ..Default::default() }
  }
}

impl Function for MockFunction {
  type Instr = MockInstr;

  fn num_blocks(&self) -> usize {
    self.blocks.len()
  }
  fn block_params(&self, block: BlockId) -> &[VReg] {
    &self.blocks[block as usize].params
  }
  fn block_instrs(&self, block: BlockId) -> &[MockInstr] {
    &self.blocks[block as usize].instrs
  }
  fn block_instrs_mut(&mut self, block: BlockId) -> &mut [MockInstr] {
    &mut self.blocks[block as usize].instrs
  }
  fn block_preds(&self, block: BlockId) -> &[BlockId] {
    &self.blocks[block as usize].preds
  }
  fn block_succs(&self, block: BlockId) -> &[BlockId] {
    &self.blocks[block as usize].succs
  }
  fn post_order(&self) -> &[BlockId] {
    &self.post_order
  }
  fn reverse_post_order(&self) -> &[BlockId] {
    &self.rpo
  }
  fn loop_nesting_forest_roots(&self) -> &[BlockId] {
    &self.loop_roots
  }
  fn loop_nesting_forest_children(&self, header: BlockId) -> &[BlockId] {
    self.loop_children.get(&header).map(|v| v.as_slice()).unwrap_or(&[])
  }
  fn loop_header_of(&self, block: BlockId) -> Option<BlockId> {
    self.blocks[block as usize].loop_header
  }
  fn clobbered_registers(&mut self, regs: Vec<VReg>) {
    self.clobbered = regs;
  }
  fn store_register_before(&mut self, v: VReg, block: BlockId, instr_index: usize) {
    self.store_before.push((v, block, instr_index));
  }
  fn store_register_after(&mut self, v: VReg, block: BlockId, instr_index: usize) {
    self.store_after.push((v, block, instr_index));
  }
  fn reload_register_before(&mut self, v: VReg, block: BlockId, instr_index: usize) {
    self.reload_before.push((v, block, instr_index));
  }
  fn reload_register_after(&mut self, v: VReg, block: BlockId, instr_index: usize) {
    self.reload_after.push((v, block, instr_index));
  }
  fn done(&mut self) {
    self.done_called = true;
  }
}

/// A tiny two-type (Int only, 4 registers) RegisterInfo for tests.
pub fn test_register_info() -> crate::interface::RegisterInfo {
  use crate::data_structures::{Bitset, RealReg, RegType};

  fn name(r: RealReg) -> &'static str {
    match r.0 {
      0 => "r0",
      1 => "r1",
      2 => "r2",
      3 => "r3",
      4 => "r4",
      _ => "r?",
    }
  }
  fn real_reg_type(_r: RealReg) -> RegType {
    RegType::Int
  }
  fn real_reg_to_vreg(r: RealReg) -> VReg {
    VReg::new_real(r.0 as u32, r, RegType::Int)
  }

  let mut caller_saved = Bitset::new();
  let mut callee_saved = Bitset::new();
  // r0, r1 caller-saved; r2, r3 callee-saved; r4 is caller-saved too.
  for i in [0u8, 1, 4] {
    caller_saved.set(i as usize);
  }
  for i in [2u8, 3] {
    callee_saved.set(i as usize);
  }

  crate::interface::RegisterInfo {
    allocatable: [vec![RealReg(0), RealReg(1), RealReg(2), RealReg(3), RealReg(4)], vec![]],
    callee_saved,
    caller_saved,
    name,
    real_reg_type,
    real_reg_to_vreg,
  }
}
