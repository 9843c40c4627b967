/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! A Chaitin-style graph-coloring register allocator for a compiler
//! backend. The host implements `Function`/`Instr` over its own IR and
//! hands a mutable function to an `Allocator` built from a static
//! `RegisterInfo` describing the target ISA's register file; the
//! allocator rewrites every virtual register operand to a real one (or a
//! spill slot) in place.

mod assignment;
mod coloring;
mod data_structures;
mod graph;
mod interface;
mod interval;
mod live_range;
mod liveness;

mod allocator;
#[cfg(test)]
mod testutil;

pub use allocator::Allocator;
pub use coloring::{AllocatorConfig, SpillHeuristic};
pub use data_structures::{reg_type_of, Bitset, IrType, RealReg, RegType, VReg};
pub use interface::{BlockId, Function, Instr, RegisterInfo};
