//! Small programs run end to end on a flat memory.

use arm7::bus::Bus;
use arm7::cpu::arm7tdmi::{Arm7tdmi, StepOutcome};
use arm7::cpu::cpu_modes::Mode;
use arm7::cpu::exception::ExceptionKind;
use arm7::cpu::psr::{CpuState, Psr};
use arm7::cpu::registers::{REG_LR, REG_SP};
use arm7::memory::FlatMemory;
use pretty_assertions::assert_eq;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn load(program: &[(u32, &[u32])]) -> Arm7tdmi<FlatMemory> {
    init_tracing();

    let mut memory = FlatMemory::new(0x2000);
    for (address, words) in program {
        memory.load_words(*address, words);
    }

    Arm7tdmi::new(memory)
}

/// Steps until PC reaches `address`, failing after `limit` steps.
fn run_until(cpu: &mut Arm7tdmi<FlatMemory>, address: u32, limit: usize) -> usize {
    for steps in 0..limit {
        if cpu.registers.program_counter() == address {
            return steps;
        }
        cpu.step().unwrap();
    }

    panic!(
        "PC never reached 0x{address:08X}, stuck at 0x{:08X}",
        cpu.registers.program_counter()
    );
}

#[test]
fn countdown_loop() {
    let mut cpu = load(&[(
        0,
        &[
            0xE3A0_0005, // MOV R0, #5
            0xE3A0_1000, // MOV R1, #0
            0xE081_1000, // loop: ADD R1, R1, R0
            0xE250_0001, // SUBS R0, R0, #1
            0x1AFF_FFFC, // BNE loop
            0xEAFF_FFFE, // B .
        ],
    )]);

    let steps = run_until(&mut cpu, 0x14, 100);

    assert_eq!(steps, 2 + 5 * 3);
    assert_eq!(cpu.registers.register_at(0), Ok(0));
    assert_eq!(cpu.registers.register_at(1), Ok(15));
    assert!(cpu.registers.cpsr.zero_flag());
}

#[test]
fn subroutine_with_stack_frame() {
    let mut cpu = load(&[
        (
            0x40,
            &[
                0xE3A0_DA01, // MOV SP, #0x1000
                0xE3A0_0003, // MOV R0, #3
                0xEB00_0004, // BL func
                0xEAFF_FFFE, // B .
            ],
        ),
        (
            0x60,
            &[
                0xE92D_4010, // func: STMDB SP!, {R4, LR}
                0xE1A0_4100, // MOV R4, R0, LSL #2
                0xE284_0001, // ADD R0, R4, #1
                0xE8BD_8010, // LDMIA SP!, {R4, PC}
            ],
        ),
    ]);
    cpu.registers.set_register_at(4, 0x4444).unwrap();
    cpu.registers.set_program_counter(0x40);

    run_until(&mut cpu, 0x4C, 20);

    assert_eq!(cpu.registers.register_at(0), Ok(13));
    assert_eq!(cpu.registers.register_at(4), Ok(0x4444));
    assert_eq!(cpu.registers.register_at(REG_SP), Ok(0x1000));
    assert_eq!(cpu.registers.register_at(REG_LR), Ok(0x4C));
    assert_eq!(cpu.bus.read_word(0xFFC), 0x4C);
}

#[test]
fn interrupt_round_trip() {
    let mut cpu = load(&[
        (0x00, &[0xEA00_000E]), // B start
        (0x18, &[0xEA00_0038]), // B irq_handler
        (
            0x40,
            &[
                0xE3A0_DA01, // start: MOV SP, #0x1000
                0xE321_F010, // MSR CPSR_c, #0x10
                0xE3A0_2000, // MOV R2, #0
                0xE282_2001, // spin: ADD R2, R2, #1
                0xEAFF_FFFD, // B spin
            ],
        ),
        (
            0x100,
            &[
                0xE3A0_5055, // irq_handler: MOV R5, #0x55
                0xE25E_F004, // SUBS PC, LR, #4
            ],
        ),
    ]);

    run_until(&mut cpu, 0x50, 10);
    assert_eq!(cpu.registers.operating_mode(), Ok(Mode::User));
    let user_cpsr = cpu.registers.cpsr;

    assert!(cpu.raise_exception(ExceptionKind::NormalInterrupt));
    assert_eq!(cpu.step(), Ok(StepOutcome::Interrupted(ExceptionKind::NormalInterrupt)));
    assert_eq!(cpu.registers.operating_mode(), Ok(Mode::Irq));
    assert_eq!(cpu.registers.register_at(REG_LR), Ok(0x54));
    assert_eq!(cpu.registers.program_counter(), 0x18);

    run_until(&mut cpu, 0x50, 10);

    assert_eq!(cpu.registers.cpsr, user_cpsr);
    assert_eq!(cpu.registers.register_at(5), Ok(0x55));
    assert_eq!(cpu.registers.register_at(2), Ok(1));
    assert!(cpu.pending_exceptions().is_empty());

    // The interrupted branch runs again.
    assert_eq!(
        cpu.step(),
        Ok(StepOutcome::Executed {
            address: 0x50,
            op_code: 0xEAFF_FFFD
        })
    );
    assert_eq!(cpu.registers.program_counter(), 0x4C);
}

#[test]
fn supervisor_call_and_return() {
    let mut cpu = load(&[
        (0x08, &[0xEA00_007C]), // B swi_handler
        (
            0x40,
            &[
                0xEF00_0001, // SWI 1
                0xE3A0_8008, // MOV R8, #8
            ],
        ),
        (
            0x200,
            &[
                0xE3A0_7007, // swi_handler: MOV R7, #7
                0xE1B0_F00E, // MOVS PC, LR
            ],
        ),
    ]);
    cpu.registers.cpsr = Psr::from(Mode::User);
    cpu.registers.set_program_counter(0x40);

    assert!(matches!(cpu.step(), Ok(StepOutcome::Trapped(_))));
    assert_eq!(cpu.registers.operating_mode(), Ok(Mode::Supervisor));

    run_until(&mut cpu, 0x44, 10);
    assert_eq!(cpu.registers.operating_mode(), Ok(Mode::User));
    assert_eq!(cpu.registers.register_at(7), Ok(7));

    cpu.step().unwrap();
    assert_eq!(cpu.registers.register_at(8), Ok(8));
}

#[test]
fn arm_thumb_arm() {
    let mut cpu = load(&[(
        0x40,
        &[
            0xE28F_0001, // ADD R0, PC, #1
            0xE12F_FF10, // BX R0
            0x46C0_4778, // BX PC ; (padding)
            0xE3A0_1001, // MOV R1, #1
        ],
    )]);
    cpu.registers.set_program_counter(0x40);

    cpu.step().unwrap();
    assert_eq!(cpu.registers.register_at(0), Ok(0x49));

    cpu.step().unwrap();
    assert_eq!(cpu.cpu_state(), CpuState::Thumb);
    assert_eq!(cpu.registers.program_counter(), 0x48);

    assert_eq!(
        cpu.step(),
        Ok(StepOutcome::Executed {
            address: 0x48,
            op_code: 0x4778
        })
    );
    assert_eq!(cpu.cpu_state(), CpuState::Arm);
    assert_eq!(cpu.registers.program_counter(), 0x4C);

    cpu.step().unwrap();
    assert_eq!(cpu.registers.register_at(1), Ok(1));
}

#[test]
fn banked_stacks_survive_mode_changes() {
    let mut cpu = load(&[]);

    for (index, mode) in [Mode::Fiq, Mode::Irq, Mode::Supervisor, Mode::Abort, Mode::Undefined, Mode::User]
        .into_iter()
        .enumerate()
    {
        cpu.registers.set_operating_mode(mode);
        cpu.registers
            .set_register_at(REG_SP, 0x100 * (index as u32 + 1))
            .unwrap();
    }

    cpu.registers.set_operating_mode(Mode::System);
    assert_eq!(cpu.registers.register_at(REG_SP), Ok(0x600));

    for (index, mode) in [Mode::Fiq, Mode::Irq, Mode::Supervisor, Mode::Abort, Mode::Undefined]
        .into_iter()
        .enumerate()
    {
        assert_eq!(
            cpu.registers.register_in_mode(mode, REG_SP),
            0x100 * (index as u32 + 1)
        );
    }
}
