//! Execution semantics for decoded operations.
//!
//! Bit-level behavior follows the RV64GC architectural definitions:
//! word-form results sign-extend to 64 bits, shift amounts are
//! masked, division by zero yields all-ones/dividend, and the
//! multiply-high family runs through 128-bit products.

use rvsim_core::{ArchState, System};

use crate::fpu;
use crate::op::*;

/// Sign-extend the low 32 bits.
#[inline]
fn sext32(v: u32) -> u64 {
    v as i32 as i64 as u64
}

/// Sign-extend the low `size` bytes of a zero-extended load value.
fn sext_load(val: u64, size: u8) -> u64 {
    match size {
        1 => val as u8 as i8 as i64 as u64,
        2 => val as u16 as i16 as i64 as u64,
        4 => sext32(val as u32),
        _ => val,
    }
}

impl AluFun {
    /// 64-bit ALU evaluation. Shift amounts come in pre-masked.
    fn apply(self, a: u64, b: u64) -> u64 {
        match self {
            AluFun::Add => a.wrapping_add(b),
            AluFun::Sub => a.wrapping_sub(b),
            AluFun::Sll => a << (b & 0x3f),
            AluFun::Slt => ((a as i64) < (b as i64)) as u64,
            AluFun::Sltu => (a < b) as u64,
            AluFun::Xor => a ^ b,
            AluFun::Srl => a >> (b & 0x3f),
            AluFun::Sra => ((a as i64) >> (b & 0x3f)) as u64,
            AluFun::Or => a | b,
            AluFun::And => a & b,
        }
    }

    /// Word-form evaluation; the result is sign-extended by the
    /// caller. Register shift amounts carry 6 bits and saturate:
    /// 32 and above yields 0 (logical) or pure sign-fill
    /// (arithmetic), not a modular shift.
    fn apply_w(self, a: u32, b: u64) -> u32 {
        let amt = (b & 0x3f) as u32;
        match self {
            AluFun::Add => a.wrapping_add(b as u32),
            AluFun::Sub => a.wrapping_sub(b as u32),
            AluFun::Sll => {
                if amt >= 32 {
                    0
                } else {
                    a << amt
                }
            }
            AluFun::Srl => {
                if amt >= 32 {
                    0
                } else {
                    a >> amt
                }
            }
            AluFun::Sra => {
                if amt >= 32 {
                    ((a as i32) >> 31) as u32
                } else {
                    ((a as i32) >> amt) as u32
                }
            }
            // Only add/sub/shift exist in W form.
            _ => 0,
        }
    }
}

impl MulFun {
    fn apply(self, a: u64, b: u64) -> u64 {
        match self {
            MulFun::Mul => a.wrapping_mul(b),
            MulFun::Mulh => {
                let p = (a as i64 as i128) * (b as i64 as i128);
                (p >> 64) as u64
            }
            MulFun::Mulhsu => {
                // signed x unsigned; u64 -> i128 zero-extends.
                let p = (a as i64 as i128) * (b as i128);
                (p >> 64) as u64
            }
            MulFun::Mulhu => {
                let p = (a as u128) * (b as u128);
                (p >> 64) as u64
            }
            MulFun::Div => {
                if b == 0 {
                    u64::MAX
                } else {
                    (a as i64).wrapping_div(b as i64) as u64
                }
            }
            MulFun::Divu => {
                if b == 0 {
                    u64::MAX
                } else {
                    a / b
                }
            }
            MulFun::Rem => {
                if b == 0 {
                    a
                } else {
                    (a as i64).wrapping_rem(b as i64) as u64
                }
            }
            MulFun::Remu => {
                if b == 0 {
                    a
                } else {
                    a % b
                }
            }
        }
    }

    fn apply_w(self, a: u32, b: u32) -> u32 {
        match self {
            MulFun::Mul => a.wrapping_mul(b),
            MulFun::Div => {
                if b == 0 {
                    u32::MAX
                } else {
                    (a as i32).wrapping_div(b as i32) as u32
                }
            }
            MulFun::Divu => {
                if b == 0 {
                    u32::MAX
                } else {
                    a / b
                }
            }
            MulFun::Rem => {
                if b == 0 {
                    a
                } else {
                    (a as i32).wrapping_rem(b as i32) as u32
                }
            }
            MulFun::Remu => {
                if b == 0 {
                    a
                } else {
                    a % b
                }
            }
            // MULH* have no word form.
            _ => 0,
        }
    }
}

impl AmoFun {
    fn apply(self, old: u64, rhs: u64) -> u64 {
        match self {
            AmoFun::Swap => rhs,
            AmoFun::Add => old.wrapping_add(rhs),
            AmoFun::Xor => old ^ rhs,
            AmoFun::And => old & rhs,
            AmoFun::Or => old | rhs,
            AmoFun::Min => (old as i64).min(rhs as i64) as u64,
            AmoFun::Max => (old as i64).max(rhs as i64) as u64,
            AmoFun::MinU => old.min(rhs),
            AmoFun::MaxU => old.max(rhs),
        }
    }

    fn apply_w(self, old: u32, rhs: u32) -> u32 {
        match self {
            AmoFun::Swap => rhs,
            AmoFun::Add => old.wrapping_add(rhs),
            AmoFun::Xor => old ^ rhs,
            AmoFun::And => old & rhs,
            AmoFun::Or => old | rhs,
            AmoFun::Min => (old as i32).min(rhs as i32) as u32,
            AmoFun::Max => (old as i32).max(rhs as i32) as u32,
            AmoFun::MinU => old.min(rhs),
            AmoFun::MaxU => old.max(rhs),
        }
    }
}

impl BrCond {
    fn taken(self, a: u64, b: u64) -> bool {
        match self {
            BrCond::Eq => a == b,
            BrCond::Ne => a != b,
            BrCond::Lt => (a as i64) < (b as i64),
            BrCond::Ge => (a as i64) >= (b as i64),
            BrCond::Ltu => a < b,
            BrCond::Geu => a >= b,
        }
    }
}

pub fn execute(op: &Op, s: &mut ArchState, sys: &mut dyn System) {
    use Insn::*;
    let len = op.len as i64;

    match op.insn {
        Lui { rd, imm } | Li { rd, imm } => {
            s.set_reg(rd, imm as u64);
            s.inc_pc(len);
        }
        Auipc { rd, imm } => {
            let v = s.pc().wrapping_add(imm as u64);
            s.set_reg(rd, v);
            s.inc_pc(len);
        }
        Mv { rd, rs } => {
            let v = s.get_reg(rs);
            s.set_reg(rd, v);
            s.inc_pc(len);
        }
        Jal { rd, imm } => {
            let link = s.pc().wrapping_add(len as u64);
            s.set_reg(rd, link);
            s.inc_pc(imm);
        }
        Jalr { rd, rs1, imm } => {
            // rs1 is read before rd is written: rd == rs1 must link
            // the old value, then jump through it.
            let target =
                s.get_reg(rs1).wrapping_add(imm as u64) & !1u64;
            let link = s.pc().wrapping_add(len as u64);
            s.set_reg(rd, link);
            s.set_pc(target);
        }
        Branch { cond, rs1, rs2, imm } => {
            let taken = cond.taken(s.get_reg(rs1), s.get_reg(rs2));
            if taken {
                s.inc_pc(imm);
            } else {
                s.inc_pc(len);
            }
        }
        Load { rd, rs1, imm, size, signed } => {
            let ea = s.get_reg(rs1).wrapping_add(imm as u64);
            let mval = s.read_mem(ea, size as u32);
            let val = if signed { sext_load(mval, size) } else { mval };
            s.set_reg(rd, val);
            s.inc_pc(len);
        }
        Store { rs1, rs2, imm, size } => {
            let ea = s.get_reg(rs1).wrapping_add(imm as u64);
            let val = s.get_reg(rs2);
            s.write_mem(ea, size as u32, val);
            s.inc_pc(len);
        }
        OpImm { fun, rd, rs1, imm } => {
            let v = fun.apply(s.get_reg(rs1), imm as u64);
            s.set_reg(rd, v);
            s.inc_pc(len);
        }
        OpImmW { fun, rd, rs1, imm } => {
            let v = fun.apply_w(s.get_reg(rs1) as u32, imm as u64);
            s.set_reg(rd, sext32(v));
            s.inc_pc(len);
        }
        OpReg { fun, rd, rs1, rs2 } => {
            let v = fun.apply(s.get_reg(rs1), s.get_reg(rs2));
            s.set_reg(rd, v);
            s.inc_pc(len);
        }
        OpRegW { fun, rd, rs1, rs2 } => {
            let v = fun.apply_w(s.get_reg(rs1) as u32, s.get_reg(rs2));
            s.set_reg(rd, sext32(v));
            s.inc_pc(len);
        }
        MulDiv { fun, rd, rs1, rs2, word } => {
            let a = s.get_reg(rs1);
            let b = s.get_reg(rs2);
            let v = if word {
                sext32(fun.apply_w(a as u32, b as u32))
            } else {
                fun.apply(a, b)
            };
            s.set_reg(rd, v);
            s.inc_pc(len);
        }
        Lr { rd, rs1, size } => {
            let ea = s.get_reg(rs1);
            let mval = s.read_mem(ea, size as u32);
            let val = if size == 4 { sext32(mval as u32) } else { mval };
            s.set_reg(rd, val);
            s.inc_pc(len);
        }
        Sc { rd, rs1, rs2, size } => {
            // No reservation model: SC always succeeds.
            let ea = s.get_reg(rs1);
            s.write_mem(ea, size as u32, s.get_reg(rs2));
            s.set_reg(rd, 0);
            s.inc_pc(len);
        }
        Amo { fun, rd, rs1, rs2, size } => {
            let ea = s.get_reg(rs1);
            let rhs = s.get_reg(rs2);
            // A plain swap that discards the pre-image must not
            // touch memory on the read side.
            let elide_read = fun == AmoFun::Swap && rd == 0;
            let old = if elide_read {
                0
            } else {
                s.read_mem(ea, size as u32)
            };
            let new = if size == 4 {
                fun.apply_w(old as u32, rhs as u32) as u64
            } else {
                fun.apply(old, rhs)
            };
            s.write_mem(ea, size as u32, new);
            let ret = if size == 4 { sext32(old as u32) } else { old };
            s.set_reg(rd, ret);
            s.inc_pc(len);
        }
        FpLoad { frd, rs1, imm, size } => {
            let ea = s.get_reg(rs1).wrapping_add(imm as u64);
            let mval = s.read_mem(ea, size as u32);
            if size == 4 {
                s.set_float_bits(frd, mval as u32);
            } else {
                s.set_double_bits(frd, mval);
            }
            s.inc_pc(len);
        }
        FpStore { rs1, frs2, imm, size } => {
            let ea = s.get_reg(rs1).wrapping_add(imm as u64);
            if size == 4 {
                s.write_mem(ea, 4, s.get_float_bits(frs2) as u64);
            } else {
                s.write_mem(ea, 8, s.get_double_bits(frs2));
            }
            s.inc_pc(len);
        }
        FpFma { fun, frd, frs1, frs2, frs3, dbl, .. } => {
            if dbl {
                let (a, b, c) = (
                    s.get_double(frs1),
                    s.get_double(frs2),
                    s.get_double(frs3),
                );
                s.set_double(frd, fpu::fma64(fun, a, b, c));
            } else {
                let (a, b, c) = (
                    s.get_float(frs1),
                    s.get_float(frs2),
                    s.get_float(frs3),
                );
                s.set_float(frd, fpu::fma32(fun, a, b, c));
            }
            s.inc_pc(len);
        }
        FpOp { fun, frd, frs1, frs2, dbl, .. } => {
            fpu::exec_fp_op(s, fun, frd, frs1, frs2, dbl);
            s.inc_pc(len);
        }
        FpCmp { fun, rd, frs1, frs2, dbl } => {
            let v = fpu::exec_fp_cmp(s, fun, frs1, frs2, dbl);
            s.set_reg(rd, v);
            s.inc_pc(len);
        }
        FpCvtToInt { rd, frs1, ty, dbl, .. } => {
            let v = if dbl {
                fpu::cvt_f64_to_int(s, s.get_double(frs1), ty)
            } else {
                fpu::cvt_f64_to_int(s, s.get_float(frs1) as f64, ty)
            };
            s.set_reg(rd, v);
            s.inc_pc(len);
        }
        FpCvtFromInt { frd, rs1, ty, dbl, .. } => {
            let raw = s.get_reg(rs1);
            if dbl {
                s.set_double(frd, fpu::cvt_int_to_f64(raw, ty));
            } else {
                s.set_float(frd, fpu::cvt_int_to_f32(raw, ty));
            }
            s.inc_pc(len);
        }
        FpCvtSD { frd, frs1, to_dbl, .. } => {
            if to_dbl {
                let v = s.get_float(frs1) as f64;
                s.set_double(frd, v);
            } else {
                let v = s.get_double(frs1) as f32;
                s.set_float(frd, v);
            }
            s.inc_pc(len);
        }
        FpMvToInt { rd, frs1, dbl } => {
            let v = if dbl {
                s.get_double_bits(frs1)
            } else {
                sext32(s.get_float_bits(frs1))
            };
            s.set_reg(rd, v);
            s.inc_pc(len);
        }
        FpMvFromInt { frd, rs1, dbl } => {
            let raw = s.get_reg(rs1);
            if dbl {
                s.set_double_bits(frd, raw);
            } else {
                s.set_float_bits(frd, raw as u32);
            }
            s.inc_pc(len);
        }
        FpClass { rd, frs1, dbl } => {
            let v = if dbl {
                fpu::fclass_f64(s.get_double_bits(frs1))
            } else {
                fpu::fclass_f32(s.get_float(frs1).to_bits())
            };
            s.set_reg(rd, v);
            s.inc_pc(len);
        }
        Fence => s.inc_pc(len),
        Ecall => {
            sys.ecall(s);
            s.inc_pc(len);
        }
        Ebreak => {
            sys.ebreak(s);
            s.inc_pc(len);
        }
    }
}
