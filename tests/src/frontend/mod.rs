//! Decode → execute scenarios: single instructions against a known
//! state, checking the architectural result bit for bit.

use rvsim_core::state::{CSR_FFLAGS, FFLAGS_NV};
use rvsim_core::{ArchState, NullSystem, SparseMem};
use rvsim_frontend::{decode, decode16, decode32};

use crate::encode::*;

fn zero_state() -> ArchState {
    ArchState::new(SparseMem::new())
}

fn state_with_block(va: u64, size: usize) -> ArchState {
    let mut mem = SparseMem::new();
    mem.add_zero_block(va, size).unwrap();
    ArchState::new(mem)
}

/// Decode `word` and execute it once.
fn exec(state: &mut ArchState, word: u32) {
    let op = decode(word).expect("decode failed");
    let mut sys = NullSystem::default();
    op.execute(state, &mut sys);
}

// ── Seed scenarios ─────────────────────────────────────────────

#[test]
fn test_c_li_negative() {
    let mut s = zero_state();
    exec(&mut s, 0x55f1); // c.li a1, -4
    assert_eq!(s.get_reg(11), 0xffff_ffff_ffff_fffc);
    assert_eq!(s.pc(), 2);
}

#[test]
fn test_c_li_one() {
    let mut s = zero_state();
    exec(&mut s, 0x4605); // c.li a2, 1
    assert_eq!(s.get_reg(12), 1);
    assert_eq!(s.pc(), 2);
}

#[test]
fn test_c_addw() {
    let mut s = zero_state();
    s.set_reg(11, (-4i64) as u64);
    s.set_reg(12, 1);
    exec(&mut s, 0x9e2d); // c.addw a2, a1
    assert_eq!(s.get_reg(12), 0xffff_ffff_ffff_fffd);
    assert_eq!(s.pc(), 2);
}

#[test]
fn test_addi() {
    let mut s = zero_state();
    exec(&mut s, 0x00500513); // addi a0, zero, 5
    assert_eq!(s.get_reg(10), 5);
    assert_eq!(s.pc(), 4);
}

// ── ALU and shifts ─────────────────────────────────────────────

#[test]
fn test_word_shift_by_31_and_32() {
    let mut s = zero_state();
    // sllw t2, t0, t1
    let sllw = rv_r(0, 6, 5, 1, 7, OP_REG32);
    s.set_reg(5, 1);
    s.set_reg(6, 31);
    exec(&mut s, sllw);
    assert_eq!(s.get_reg(7), 0xffff_ffff_8000_0000);

    // Amount 32 yields zero, not a modular shift-by-0.
    s.set_reg(6, 32);
    exec(&mut s, sllw);
    assert_eq!(s.get_reg(7), 0);

    // srlw by 32 also yields zero.
    let srlw = rv_r(0, 6, 5, 5, 7, OP_REG32);
    s.set_reg(5, 0xffff_ffff);
    exec(&mut s, srlw);
    assert_eq!(s.get_reg(7), 0);

    // sraw by 32 yields pure sign-fill.
    let sraw = rv_r(0x20, 6, 5, 5, 7, OP_REG32);
    s.set_reg(5, 0x8000_0000);
    exec(&mut s, sraw);
    assert_eq!(s.get_reg(7), u64::MAX);
    s.set_reg(5, 0x7fff_ffff);
    exec(&mut s, sraw);
    assert_eq!(s.get_reg(7), 0);
}

#[test]
fn test_shift64_by_63_and_64() {
    let mut s = zero_state();
    let sll = rv_r(0, 6, 5, 1, 7, OP_REG);
    s.set_reg(5, 1);
    s.set_reg(6, 63);
    exec(&mut s, sll);
    assert_eq!(s.get_reg(7), 1u64 << 63);

    // Amount 64 is masked to 0: the value passes through.
    s.set_reg(6, 64);
    exec(&mut s, sll);
    assert_eq!(s.get_reg(7), 1);

    let sra = rv_r(0x20, 6, 5, 5, 7, OP_REG);
    s.set_reg(5, u64::MAX);
    s.set_reg(6, 63);
    exec(&mut s, sra);
    assert_eq!(s.get_reg(7), u64::MAX);
}

#[test]
fn test_srai_63() {
    let mut s = zero_state();
    s.set_reg(5, i64::MIN as u64);
    // srai t2, t0, 63
    exec(&mut s, rv_i(0x400 | 63, 5, 5, 7, OP_IMM));
    assert_eq!(s.get_reg(7), u64::MAX);
}

#[test]
fn test_sltiu_and_slt() {
    let mut s = zero_state();
    s.set_reg(5, u64::MAX); // -1 signed, huge unsigned
    exec(&mut s, rv_i(0, 5, 2, 7, OP_IMM)); // slti t2, t0, 0
    assert_eq!(s.get_reg(7), 1);
    exec(&mut s, rv_i(0, 5, 3, 7, OP_IMM)); // sltiu t2, t0, 0
    assert_eq!(s.get_reg(7), 0);
}

#[test]
fn test_addiw_sign_extends() {
    let mut s = zero_state();
    s.set_reg(5, 0x7fff_ffff);
    exec(&mut s, rv_i(1, 5, 0, 7, OP_IMM32)); // addiw t2, t0, 1
    assert_eq!(s.get_reg(7), 0xffff_ffff_8000_0000);
}

// ── Multiply / divide ──────────────────────────────────────────

#[test]
fn test_mulh_variants() {
    let mut s = zero_state();
    s.set_reg(5, u64::MAX); // -1 signed
    s.set_reg(6, u64::MAX);

    exec(&mut s, rv_r(1, 6, 5, 1, 7, OP_REG)); // mulh
    assert_eq!(s.get_reg(7), 0); // (-1) * (-1) = 1

    exec(&mut s, rv_r(1, 6, 5, 3, 7, OP_REG)); // mulhu
    assert_eq!(s.get_reg(7), 0xffff_ffff_ffff_fffe);

    exec(&mut s, rv_r(1, 6, 5, 2, 7, OP_REG)); // mulhsu
    assert_eq!(s.get_reg(7), u64::MAX); // -1 * (2^64-1)

    // Low half is the same for all.
    exec(&mut s, rv_r(1, 6, 5, 0, 7, OP_REG)); // mul
    assert_eq!(s.get_reg(7), 1);
}

#[test]
fn test_div_by_zero() {
    let mut s = zero_state();
    s.set_reg(5, 42);
    s.set_reg(6, 0);
    exec(&mut s, rv_r(1, 6, 5, 4, 7, OP_REG)); // div
    assert_eq!(s.get_reg(7), u64::MAX);
    exec(&mut s, rv_r(1, 6, 5, 5, 7, OP_REG)); // divu
    assert_eq!(s.get_reg(7), u64::MAX);
    exec(&mut s, rv_r(1, 6, 5, 6, 7, OP_REG)); // rem
    assert_eq!(s.get_reg(7), 42);
    exec(&mut s, rv_r(1, 6, 5, 7, 7, OP_REG)); // remu
    assert_eq!(s.get_reg(7), 42);
}

#[test]
fn test_signed_division_overflow() {
    let mut s = zero_state();
    s.set_reg(5, i64::MIN as u64);
    s.set_reg(6, (-1i64) as u64);
    exec(&mut s, rv_r(1, 6, 5, 4, 7, OP_REG)); // div
    assert_eq!(s.get_reg(7), i64::MIN as u64);
    exec(&mut s, rv_r(1, 6, 5, 6, 7, OP_REG)); // rem
    assert_eq!(s.get_reg(7), 0);
}

#[test]
fn test_divw_by_zero_sign_extends() {
    let mut s = zero_state();
    s.set_reg(5, 7);
    s.set_reg(6, 0);
    exec(&mut s, rv_r(1, 6, 5, 4, 7, OP_REG32)); // divw
    assert_eq!(s.get_reg(7), u64::MAX);
    exec(&mut s, rv_r(1, 6, 5, 6, 7, OP_REG32)); // remw
    assert_eq!(s.get_reg(7), 7);
}

#[test]
fn test_mulw_truncates_then_extends() {
    let mut s = zero_state();
    s.set_reg(5, 0x1_0000_0001); // low word 1
    s.set_reg(6, 0x8000_0000);
    exec(&mut s, rv_r(1, 6, 5, 0, 7, OP_REG32)); // mulw
    assert_eq!(s.get_reg(7), 0xffff_ffff_8000_0000);
}

// ── Loads and stores ───────────────────────────────────────────

#[test]
fn test_load_sign_extension() {
    let mut s = state_with_block(0x1000, 64);
    s.mem.write(0x1000, 8, 0xffff_ffff_ffff_ff80);
    s.set_reg(5, 0x1000);

    exec(&mut s, rv_i(0, 5, 0, 7, OP_LOAD)); // lb
    assert_eq!(s.get_reg(7), 0xffff_ffff_ffff_ff80);
    exec(&mut s, rv_i(0, 5, 4, 7, OP_LOAD)); // lbu
    assert_eq!(s.get_reg(7), 0x80);
    exec(&mut s, rv_i(0, 5, 1, 7, OP_LOAD)); // lh
    assert_eq!(s.get_reg(7), 0xffff_ffff_ffff_ff80);
    exec(&mut s, rv_i(0, 5, 5, 7, OP_LOAD)); // lhu
    assert_eq!(s.get_reg(7), 0xff80);
    exec(&mut s, rv_i(0, 5, 2, 7, OP_LOAD)); // lw
    assert_eq!(s.get_reg(7), 0xffff_ffff_ffff_ff80);
    exec(&mut s, rv_i(0, 5, 6, 7, OP_LOAD)); // lwu
    assert_eq!(s.get_reg(7), 0xffff_ff80);
    exec(&mut s, rv_i(0, 5, 3, 7, OP_LOAD)); // ld
    assert_eq!(s.get_reg(7), 0xffff_ffff_ffff_ff80);
}

#[test]
fn test_store_sizes() {
    let mut s = state_with_block(0x1000, 64);
    s.set_reg(5, 0x1000);
    s.set_reg(6, 0x1122_3344_5566_7788);

    exec(&mut s, rv_s(0, 6, 5, 0, OP_STORE)); // sb
    assert_eq!(s.mem.read(0x1000, 8), 0x88);
    exec(&mut s, rv_s(8, 6, 5, 1, OP_STORE)); // sh
    assert_eq!(s.mem.read(0x1008, 8), 0x7788);
    exec(&mut s, rv_s(16, 6, 5, 2, OP_STORE)); // sw
    assert_eq!(s.mem.read(0x1010, 8), 0x5566_7788);
    exec(&mut s, rv_s(24, 6, 5, 3, OP_STORE)); // sd
    assert_eq!(s.mem.read(0x1018, 8), 0x1122_3344_5566_7788);
}

#[test]
fn test_negative_store_offset() {
    let mut s = state_with_block(0x1000, 64);
    s.set_reg(5, 0x1020);
    s.set_reg(6, 0xaa);
    exec(&mut s, rv_s(-8, 6, 5, 3, OP_STORE)); // sd t1, -8(t0)
    assert_eq!(s.mem.read(0x1018, 8), 0xaa);
}

// ── Atomics ────────────────────────────────────────────────────

#[test]
fn test_amoadd_w_returns_sign_extended_preimage() {
    let mut s = state_with_block(0x1000, 64);
    s.mem.write(0x1000, 4, 0x8000_0000);
    s.set_reg(5, 0x1000);
    s.set_reg(6, 1);
    // amoadd.w t2, t1, (t0)
    exec(&mut s, rv_r(0x00 << 2, 6, 5, 2, 7, OP_AMO));
    assert_eq!(s.get_reg(7), 0xffff_ffff_8000_0000);
    assert_eq!(s.mem.read(0x1000, 4), 0x8000_0001);
}

#[test]
fn test_amoswap_to_x0_still_stores() {
    let mut s = state_with_block(0x1000, 64);
    s.mem.write(0x1000, 8, 0x1234);
    s.set_reg(5, 0x1000);
    s.set_reg(6, 0x5678);
    // amoswap.d zero, t1, (t0): the read is elided, the store is
    // not, and x0 stays zero.
    exec(&mut s, rv_r(0x01 << 2, 6, 5, 3, 0, OP_AMO));
    assert_eq!(s.mem.read(0x1000, 8), 0x5678);
    assert_eq!(s.get_reg(0), 0);
}

#[test]
fn test_amomax_signed_word() {
    let mut s = state_with_block(0x1000, 64);
    s.mem.write(0x1000, 4, 0xffff_fff6); // -10 as a word
    s.set_reg(5, 0x1000);
    s.set_reg(6, 3);
    // amomax.w t2, t1, (t0): max(-10, 3) = 3
    exec(&mut s, rv_r(0x14 << 2, 6, 5, 2, 7, OP_AMO));
    assert_eq!(s.mem.read(0x1000, 4), 3);
    assert_eq!(s.get_reg(7), 0xffff_ffff_ffff_fff6);

    // amominu.w: unsigned min keeps 3 against huge 0xfff..f6.
    s.set_reg(6, 0xffff_fff6);
    exec(&mut s, rv_r(0x18 << 2, 6, 5, 2, 7, OP_AMO));
    assert_eq!(s.mem.read(0x1000, 4), 3);
}

#[test]
fn test_lr_sc_always_succeeds() {
    let mut s = state_with_block(0x1000, 64);
    s.mem.write(0x1000, 4, 0x8000_0000);
    s.set_reg(5, 0x1000);
    // lr.w t2, (t0): loads sign-extended.
    exec(&mut s, rv_r(0x02 << 2, 0, 5, 2, 7, OP_AMO));
    assert_eq!(s.get_reg(7), 0xffff_ffff_8000_0000);

    // sc.w t2, t1, (t0): commits and writes success.
    s.set_reg(6, 42);
    s.set_reg(7, 99);
    exec(&mut s, rv_r(0x03 << 2, 6, 5, 2, 7, OP_AMO));
    assert_eq!(s.get_reg(7), 0);
    assert_eq!(s.mem.read(0x1000, 4), 42);
}

// ── Control flow ───────────────────────────────────────────────

#[test]
fn test_jal_links_and_jumps() {
    let mut s = zero_state();
    s.set_pc(0x1000);
    exec(&mut s, rv_j(-16, 1)); // jal ra, -16
    assert_eq!(s.get_reg(1), 0x1004);
    assert_eq!(s.pc(), 0xff0);
}

#[test]
fn test_jalr_rd_aliases_rs1() {
    let mut s = zero_state();
    s.set_pc(0x1000);
    s.set_reg(5, 0x2000);
    // jalr t0, t0, 0: rs1 is read before the link write.
    exec(&mut s, rv_i(0, 5, 0, 5, 0x67));
    assert_eq!(s.pc(), 0x2000);
    assert_eq!(s.get_reg(5), 0x1004);
}

#[test]
fn test_jalr_forces_even_target() {
    let mut s = zero_state();
    s.set_pc(0x1000);
    s.set_reg(5, 0x2001);
    exec(&mut s, rv_i(0, 5, 0, 1, 0x67)); // jalr ra, t0, 0
    assert_eq!(s.pc(), 0x2000);
}

#[test]
fn test_branch_signed_vs_unsigned() {
    // blt: -1 < 1 signed.
    let mut s = zero_state();
    s.set_pc(0x1000);
    s.set_reg(5, u64::MAX);
    s.set_reg(6, 1);
    exec(&mut s, rv_b(16, 6, 5, 4)); // blt t0, t1, +16
    assert_eq!(s.pc(), 0x1010);

    // bltu: 0xffff..ff is not < 1 unsigned.
    s.set_pc(0x1000);
    exec(&mut s, rv_b(16, 6, 5, 6)); // bltu
    assert_eq!(s.pc(), 0x1004);
}

#[test]
fn test_compressed_branch_not_taken_advances_by_2() {
    let mut s = zero_state();
    s.set_pc(0x1000);
    s.set_reg(10, 5);
    // c.beqz a0, +8 with a0 != 0: falls through by 2.
    // f3=110 q1, rs1'=a0(2), off8 -> bit [5]? off=8: imm[3]=1 -> h[10].
    let h: u16 = 0xc000 | (2 << 7) | (1 << 10) | 0x01;
    let op = decode16(h).expect("decode c.beqz");
    let mut sys = NullSystem::default();
    op.execute(&mut s, &mut sys);
    assert_eq!(s.pc(), 0x1002);

    // Taken when a0 == 0.
    s.set_pc(0x1000);
    s.set_reg(10, 0);
    op.execute(&mut s, &mut sys);
    assert_eq!(s.pc(), 0x1008);
}

#[test]
fn test_c_jalr_links_pc_plus_2() {
    let mut s = zero_state();
    s.set_pc(0x1000);
    s.set_reg(10, 0x3000);
    // c.jalr a0: quadrant 2, f3=100, bit12=1, rd=a0, rs2=0.
    let h: u16 = 0x9000 | (10 << 7) | 0x02;
    let op = decode16(h).expect("decode c.jalr");
    let mut sys = NullSystem::default();
    op.execute(&mut s, &mut sys);
    assert_eq!(s.get_reg(1), 0x1002);
    assert_eq!(s.pc(), 0x3000);
}

// ── Compressed memory forms ────────────────────────────────────

#[test]
fn test_c_addi4spn() {
    let mut s = zero_state();
    s.set_reg(2, 0x100);
    // c.addi4spn a0, sp, 16
    let op = decode16(0x0808).expect("decode");
    let mut sys = NullSystem::default();
    op.execute(&mut s, &mut sys);
    assert_eq!(s.get_reg(10), 0x110);
    assert_eq!(s.pc(), 2);
}

#[test]
fn test_c_lwsp_and_c_sdsp() {
    let mut s = state_with_block(0x1000, 256);
    s.set_reg(2, 0x1000);
    s.mem.write(0x1008, 4, 0x8000_0001);

    // c.lwsp a0, 8(sp)
    let lwsp: u16 = 0x4000 | (10 << 7) | (1 << 5) | 0x02;
    assert_eq!(
        decode16(lwsp).unwrap().disasm(0),
        "c.lwsp a0, 8(sp)"
    );
    let op = decode16(lwsp).unwrap();
    let mut sys = NullSystem::default();
    op.execute(&mut s, &mut sys);
    assert_eq!(s.get_reg(10), 0xffff_ffff_8000_0001);

    // c.sdsp a0, 16(sp)
    let sdsp: u16 = 0xe000 | (1 << 11) | (10 << 2) | 0x02;
    assert_eq!(
        decode16(sdsp).unwrap().disasm(0),
        "c.sdsp a0, 16(sp)"
    );
    let op = decode16(sdsp).unwrap();
    op.execute(&mut s, &mut sys);
    assert_eq!(s.mem.read(0x1010, 8), 0xffff_ffff_8000_0001);
}

#[test]
fn test_c_ld_prime_registers() {
    let mut s = state_with_block(0x1000, 256);
    s.set_reg(9, 0x1000); // s1 = x9, prime index 1
    s.mem.write(0x1010, 8, 0xdead_beef);
    // c.ld a0, 16(s1): f3=011, rs1'=1, rd'=2, imm[4:3]=h[11:10].
    let h: u16 = 0x6000 | (2 << 10) | (1 << 7) | (2 << 2);
    assert_eq!(decode16(h).unwrap().disasm(0), "c.ld a0, 16(s1)");
    let op = decode16(h).unwrap();
    let mut sys = NullSystem::default();
    op.execute(&mut s, &mut sys);
    assert_eq!(s.get_reg(10), 0xdead_beef);
}

// ── Floating point ─────────────────────────────────────────────

#[test]
fn test_flw_nanboxes() {
    let mut s = state_with_block(0x1000, 64);
    s.mem.write(0x1000, 4, 1.5f32.to_bits() as u64);
    s.set_reg(5, 0x1000);
    exec(&mut s, rv_i(0, 5, 2, 10, 0x07)); // flw fa0, 0(t0)
    assert_eq!(s.get_float(10), 1.5);
    assert_eq!(s.get_double_bits(10) >> 32, 0xffff_ffff);
    assert!(s.get_double(10).is_nan());
}

#[test]
fn test_fld_fsd_roundtrip() {
    let mut s = state_with_block(0x1000, 64);
    s.mem.write(0x1000, 8, (-2.5f64).to_bits());
    s.set_reg(5, 0x1000);
    exec(&mut s, rv_i(0, 5, 3, 10, 0x07)); // fld fa0, 0(t0)
    assert_eq!(s.get_double(10), -2.5);
    exec(&mut s, rv_s(16, 10, 5, 3, 0x27)); // fsd fa0, 16(t0)
    assert_eq!(s.mem.read(0x1010, 8), (-2.5f64).to_bits());
}

#[test]
fn test_fadd_s_and_d() {
    let mut s = zero_state();
    s.set_float(1, 1.25);
    s.set_float(2, 2.5);
    exec(&mut s, rv_r(0x00, 2, 1, 7, 3, OP_FP)); // fadd.s f3, f1, f2
    assert_eq!(s.get_float(3), 3.75);

    s.set_double(4, 0.5);
    s.set_double(5, -1.5);
    exec(&mut s, rv_r(0x01, 5, 4, 7, 6, OP_FP)); // fadd.d f6, f4, f5
    assert_eq!(s.get_double(6), -1.0);
}

#[test]
fn test_fmadd_s() {
    let mut s = zero_state();
    s.set_float(1, 2.0);
    s.set_float(2, 3.0);
    s.set_float(3, 1.0);
    // fmadd.s f4, f1, f2, f3 = 2*3 + 1
    let insn = rv_r(3 << 2, 2, 1, 7, 4, 0x43);
    exec(&mut s, insn);
    assert_eq!(s.get_float(4), 7.0);

    // fnmsub.s f4, f1, f2, f3 = -(2*3) + 1
    let insn = rv_r(3 << 2, 2, 1, 7, 4, 0x4b);
    exec(&mut s, insn);
    assert_eq!(s.get_float(4), -5.0);
}

#[test]
fn test_fcvt_w_s_truncates() {
    let mut s = zero_state();
    s.set_float(1, 3.7);
    exec(&mut s, rv_r(0x60, 0, 1, 1, 7, OP_FP)); // fcvt.w.s t2, f1
    assert_eq!(s.get_reg(7), 3);
    s.set_float(1, -3.7);
    exec(&mut s, rv_r(0x60, 0, 1, 1, 7, OP_FP));
    assert_eq!(s.get_reg(7), (-3i64) as u64);
}

#[test]
fn test_fcvt_saturation_and_nan() {
    let mut s = zero_state();
    s.set_float(1, f32::NAN);
    exec(&mut s, rv_r(0x60, 0, 1, 1, 7, OP_FP)); // fcvt.w.s
    assert_eq!(s.get_reg(7), i32::MAX as i64 as u64);
    assert_ne!(s.get_cr(CSR_FFLAGS) & FFLAGS_NV, 0);

    s.set_float(1, 1e10);
    exec(&mut s, rv_r(0x60, 0, 1, 1, 7, OP_FP));
    assert_eq!(s.get_reg(7), i32::MAX as i64 as u64);

    s.set_float(1, -1e10);
    exec(&mut s, rv_r(0x60, 0, 1, 1, 7, OP_FP));
    assert_eq!(s.get_reg(7), i32::MIN as i64 as u64);

    // fcvt.wu.s of a negative saturates to 0.
    s.set_float(1, -3.0);
    exec(&mut s, rv_r(0x60, 1, 1, 1, 7, OP_FP));
    assert_eq!(s.get_reg(7), 0);
}

#[test]
fn test_fcvt_from_int() {
    let mut s = zero_state();
    s.set_reg(5, (-2i64) as u64);
    exec(&mut s, rv_r(0x68, 0, 5, 7, 1, OP_FP)); // fcvt.s.w f1, t0
    assert_eq!(s.get_float(1), -2.0);
    exec(&mut s, rv_r(0x69, 2, 5, 7, 2, OP_FP)); // fcvt.d.l f2, t0
    assert_eq!(s.get_double(2), -2.0);
    // fcvt.d.lu treats the bits as unsigned.
    exec(&mut s, rv_r(0x69, 3, 5, 7, 3, OP_FP));
    assert!(s.get_double(3) > 1e19);
}

#[test]
fn test_fcvt_s_d_narrows() {
    let mut s = zero_state();
    s.set_double(1, 2.25);
    exec(&mut s, rv_r(0x20, 1, 1, 7, 2, OP_FP)); // fcvt.s.d f2, f1
    assert_eq!(s.get_float(2), 2.25);
    exec(&mut s, rv_r(0x21, 0, 2, 7, 3, OP_FP)); // fcvt.d.s f3, f2
    assert_eq!(s.get_double(3), 2.25);
}

#[test]
fn test_fmin_nan_propagation() {
    let mut s = zero_state();
    s.set_float(1, 1.0);
    s.set_float_bits(2, 0x7fc0_0000); // quiet NaN
    exec(&mut s, rv_r(0x14, 2, 1, 0, 3, OP_FP)); // fmin.s f3, f1, f2
    assert_eq!(s.get_float(3), 1.0);
    // Quiet NaN raises nothing.
    assert_eq!(s.get_cr(CSR_FFLAGS) & FFLAGS_NV, 0);

    // Signaling NaN raises NV.
    s.set_float_bits(2, 0x7f80_0001);
    exec(&mut s, rv_r(0x14, 2, 1, 0, 3, OP_FP));
    assert_eq!(s.get_float(3), 1.0);
    assert_ne!(s.get_cr(CSR_FFLAGS) & FFLAGS_NV, 0);

    // Both NaN yields the canonical NaN.
    s.set_float_bits(1, 0x7fc0_0000);
    exec(&mut s, rv_r(0x14, 2, 1, 0, 3, OP_FP));
    assert_eq!(s.get_float(3).to_bits(), 0x7fc0_0000);
}

#[test]
fn test_feq_quiet_flt_signaling() {
    let mut s = zero_state();
    s.set_float(1, 1.0);
    s.set_float_bits(2, 0x7fc0_0000); // quiet NaN
    exec(&mut s, rv_r(0x50, 2, 1, 2, 7, OP_FP)); // feq.s
    assert_eq!(s.get_reg(7), 0);
    assert_eq!(s.get_cr(CSR_FFLAGS) & FFLAGS_NV, 0);

    exec(&mut s, rv_r(0x50, 2, 1, 1, 7, OP_FP)); // flt.s
    assert_eq!(s.get_reg(7), 0);
    assert_ne!(s.get_cr(CSR_FFLAGS) & FFLAGS_NV, 0);

    s.set_float(2, 1.0);
    exec(&mut s, rv_r(0x50, 2, 1, 2, 7, OP_FP)); // feq.s, equal
    assert_eq!(s.get_reg(7), 1);
    exec(&mut s, rv_r(0x50, 2, 1, 0, 7, OP_FP)); // fle.s
    assert_eq!(s.get_reg(7), 1);
}

#[test]
fn test_fsgnjn_negates() {
    let mut s = zero_state();
    s.set_float(1, 2.0);
    // fneg.s f2, f1 is fsgnjn.s f2, f1, f1.
    let insn = rv_r(0x10, 1, 1, 1, 2, OP_FP);
    exec(&mut s, insn);
    assert_eq!(s.get_float(2), -2.0);
    assert_eq!(decode32(insn).unwrap().disasm(0), "fneg.s ft2, ft1");
}

#[test]
fn test_fsgnjx_abs() {
    let mut s = zero_state();
    s.set_double(1, -4.0);
    // fabs.d f2, f1 is fsgnjx.d f2, f1, f1.
    exec(&mut s, rv_r(0x11, 1, 1, 2, 2, OP_FP));
    assert_eq!(s.get_double(2), 4.0);
}

#[test]
fn test_fmv_x_w_sign_extends() {
    let mut s = zero_state();
    s.set_float(1, -1.0); // bits 0xbf800000, sign bit set
    exec(&mut s, rv_r(0x70, 0, 1, 0, 7, OP_FP)); // fmv.x.w t2, f1
    assert_eq!(s.get_reg(7), 0xffff_ffff_bf80_0000);

    s.set_reg(5, 0x3f80_0000);
    exec(&mut s, rv_r(0x78, 0, 5, 0, 2, OP_FP)); // fmv.w.x f2, t0
    assert_eq!(s.get_float(2), 1.0);
}

#[test]
fn test_fclass() {
    let mut s = zero_state();
    s.set_float(1, 1.0);
    exec(&mut s, rv_r(0x70, 0, 1, 1, 7, OP_FP)); // fclass.s
    assert_eq!(s.get_reg(7), 1 << 6);

    s.set_double(2, f64::NEG_INFINITY);
    exec(&mut s, rv_r(0x71, 0, 2, 1, 7, OP_FP)); // fclass.d
    assert_eq!(s.get_reg(7), 1 << 0);

    s.set_double_bits(2, 0x7ff8_0000_0000_0000); // quiet NaN
    exec(&mut s, rv_r(0x71, 0, 2, 1, 7, OP_FP));
    assert_eq!(s.get_reg(7), 1 << 9);
}

// ── Decode failures and rendering ──────────────────────────────

#[test]
fn test_unknown_encodings_return_none() {
    // custom-0 major group
    assert!(decode32(0x0000_000b).is_none());
    // the canonical all-zero illegal halfword
    assert!(decode16(0x0000).is_none());
    // CSR instructions are outside the supported SYSTEM subset
    assert!(decode32(0x0030_1073).is_none()); // csrrw x0, fcsr, x0
}

#[test]
fn test_disasm_pseudo_ops() {
    assert_eq!(decode32(rv_j(8, 0)).unwrap().disasm(0x1000), "j 0x1008");
    assert_eq!(
        decode32(rv_j(8, 1)).unwrap().disasm(0x1000),
        "jal ra, 0x1008"
    );
    assert_eq!(
        decode32(rv_i(5, 0, 0, 10, OP_IMM)).unwrap().disasm(0),
        "li a0, 5"
    );
    assert_eq!(decode16(0x55f1).unwrap().disasm(0), "c.li a1, -4");
    assert_eq!(
        decode32(rv_b(-4, 0, 10, 1)).unwrap().disasm(0x1004),
        "bnez a0, 0x1000"
    );
    assert_eq!(decode32(0x0000_0073).unwrap().disasm(0), "ecall");
}

#[test]
fn test_op_metadata_for_dfg() {
    use rvsim_frontend::{OpKind, RegFile};

    // sw t1, 4(t0): store data source is t1, base is t0.
    let op = decode32(rv_s(4, 6, 5, 2, OP_STORE)).unwrap();
    assert_eq!(op.kind(), OpKind::Store);
    assert_eq!(op.mem_size(), 4);
    let std = op.store_src().unwrap();
    assert_eq!((std.rf, std.num), (RegFile::Int, 6));

    let mut s = zero_state();
    s.set_reg(5, 0x1000);
    assert_eq!(op.calc_ea(&s), Some(0x1004));

    // x0 never shows up in dependency lists.
    let op = decode32(0x00500513).unwrap(); // addi a0, zero, 5
    assert!(op.srcs().is_empty());
    let op = decode32(rv_i(0, 5, 0, 0, OP_IMM)).unwrap(); // addi zero, t0, 0
    assert!(op.dsts().is_empty());
}
