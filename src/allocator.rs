/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! The driver (component 4.I): wires liveness, live-range building,
//! coloring and assignment into the single `do_allocation` entry point a
//! host calls once per function.

use log::debug;

use crate::coloring::{self, AllocatorConfig};
use crate::data_structures::{Bitset, RegType, VReg};
use crate::graph::NodePool;
use crate::interface::{Function, RegisterInfo};
use crate::liveness::{self, BlockInfo};
use crate::live_range;

pub struct Allocator<'a> {
  info: &'a RegisterInfo,
  config: AllocatorConfig,
  graph: NodePool,
  blocks: Vec<BlockInfo>,
  clobbered: Bitset,
}

impl<'a> Allocator<'a> {
  pub fn new(info: &'a RegisterInfo) -> Self {
    Self::with_config(info, AllocatorConfig::default())
  }

  pub fn with_config(info: &'a RegisterInfo, config: AllocatorConfig) -> Self {
    info.check_is_sane();
    Self { info, config, graph: NodePool::new(), blocks: Vec::new(), clobbered: Bitset::new() }
  }

  fn reset(&mut self, num_blocks: usize, min_id: u32) {
    self.graph.reset();
    self.clobbered.clear();
    if self.blocks.len() < num_blocks {
      self.blocks.resize_with(num_blocks, BlockInfo::new);
    }
    self.blocks.truncate(num_blocks);
    for b in &mut self.blocks {
      b.reset(min_id);
    }
  }

  /// Runs the full pipeline over `func`: liveness, live-range
  /// construction, per-type coloring, operand rewriting, and publishing
  /// the function's clobbered callee-saved registers.
  pub fn do_allocation<F: Function>(&mut self, func: &mut F) {
    let num_blocks = func.num_blocks();
    if num_blocks == 0 {
      return;
    }
    debug!("Allocator::do_allocation: starting over {} blocks", num_blocks);
    self.reset(num_blocks, 0);

    liveness::analyze(func, &mut self.graph, &mut self.blocks, 0);
    live_range::build(func, self.info, &mut self.graph, &mut self.blocks);

    for &ty in &[RegType::Int, RegType::Float] {
      coloring::color(self.info, &self.config, ty, &mut self.graph, &mut self.clobbered);
    }

    crate::assignment::assign(func, self.info, &mut self.graph, &mut self.blocks);

    self.publish_clobbered(func);
    func.done();
    debug!("Allocator::do_allocation: done");
  }

  fn publish_clobbered<F: Function>(&self, func: &mut F) {
    let mut regs: Vec<VReg> = Vec::new();
    self.clobbered.scan(|idx| {
      let r = crate::data_structures::RealReg(idx as u8);
      if self.info.is_callee_saved(r) {
        regs.push((self.info.real_reg_to_vreg)(r));
      }
    });
    regs.sort_by_key(|v| v.id());
    func.clobbered_registers(regs);
  }
}
