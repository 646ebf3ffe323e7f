//! Steps a small mixed-encoding program and prints a per-instruction trace.
//!
//! Run with `cargo run --example trace_run`.

use cpu_core::{disasm, AccessKind, Bus, CoreVariant, Cpu, StepOutcome, PC};

struct RamBus {
    mem: Vec<u8>,
}

impl RamBus {
    fn new(size: usize) -> Self {
        Self { mem: vec![0; size] }
    }

    fn load_words(&mut self, base: u32, words: &[u32]) {
        for (i, word) in words.iter().enumerate() {
            let addr = base as usize + i * 4;
            self.mem[addr..addr + 4].copy_from_slice(&word.to_le_bytes());
        }
    }

    fn load_halves(&mut self, base: u32, halves: &[u16]) {
        for (i, half) in halves.iter().enumerate() {
            let addr = base as usize + i * 2;
            self.mem[addr..addr + 2].copy_from_slice(&half.to_le_bytes());
        }
    }
}

impl Bus for RamBus {
    fn read8(&mut self, addr: u32, _kind: AccessKind) -> u8 {
        self.mem[addr as usize]
    }

    fn read16(&mut self, addr: u32, _kind: AccessKind) -> u16 {
        let addr = addr as usize;
        u16::from_le_bytes([self.mem[addr], self.mem[addr + 1]])
    }

    fn read32(&mut self, addr: u32, _kind: AccessKind) -> u32 {
        let addr = addr as usize;
        u32::from_le_bytes([
            self.mem[addr],
            self.mem[addr + 1],
            self.mem[addr + 2],
            self.mem[addr + 3],
        ])
    }

    fn write8(&mut self, addr: u32, value: u8, _kind: AccessKind) {
        self.mem[addr as usize] = value;
    }

    fn write16(&mut self, addr: u32, value: u16, _kind: AccessKind) {
        self.mem[addr as usize..addr as usize + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn write32(&mut self, addr: u32, value: u32, _kind: AccessKind) {
        self.mem[addr as usize..addr as usize + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn pending_interrupt(&self) -> bool {
        false
    }
}

fn main() {
    let mut bus = RamBus::new(0x1000);
    // Wide prologue: compute a value, then drop into the compact encoding.
    bus.load_words(
        0,
        &[
            0xE3A0_0C01, // mov r0, #0x100
            0xE280_0001, // add r0, r0, #1
            0xE12F_FF10, // bx r0
        ],
    );
    // Compact body at 0x100: count down from three.
    bus.load_halves(
        0x100,
        &[
            0x2303, // mov r3, #3
            0x3B01, // sub r3, #1
            0xD1FD, // bne back to the sub
            0x4770, // bx lr (lr is zero; halts the demo loop below)
        ],
    );

    let mut cpu = Cpu::new(CoreVariant::Arm7);
    for _ in 0..32 {
        let pc = cpu.reg(PC);
        let text = if cpu.cpsr().thumb() {
            let half = bus.read16(pc & !1, AccessKind::InstructionNonSequential);
            disasm::thumb(half, pc)
        } else {
            let word = bus.read32(pc & !3, AccessKind::InstructionNonSequential);
            disasm::arm(word, pc)
        };
        let outcome = match cpu.step(&mut bus) {
            Ok(outcome) => outcome,
            Err(err) => {
                eprintln!("{pc:#010x}  {text:<28} ! {err}");
                break;
            }
        };
        println!("{pc:#010x}  {text:<28} {outcome:?}");
        if outcome == StepOutcome::Executed && cpu.reg(PC) == 0 && pc != 0 {
            break;
        }
    }

    println!();
    for index in 0..16 {
        print!("r{index:<2} = {:#010x}  ", cpu.reg(index));
        if index % 4 == 3 {
            println!();
        }
    }
    println!("cpsr = {:#010x}", cpu.cpsr().bits());
}
