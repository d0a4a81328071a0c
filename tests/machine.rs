use std::{
    thread,
    time::{Duration, Instant},
};

use chip8_vm::emu::{Chip8, Chip8Error, Machine, RunConfig, StepResult};

fn rom(program: &[u16]) -> Vec<u8> {
    program.iter().flat_map(|op| op.to_be_bytes()).collect()
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < timeout {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[test]
fn bcd_program_end_to_end() {
    let mut chip8 = Chip8::new();
    chip8.load(&rom(&[0x6A02, 0xFA33])).unwrap();

    chip8.step().unwrap();
    chip8.step().unwrap();

    let i = chip8.registers().i;
    let memory = chip8.memory();
    assert_eq!(
        [memory.read(i), memory.read(i + 1), memory.read(i + 2)],
        [0, 0, 2]
    );
    assert_eq!(chip8.registers().pc, 0x204);
}

#[test]
fn clear_screen_end_to_end() {
    // Draw glyph 0 at (0, 0), then clear
    let mut chip8 = Chip8::new();
    chip8.load(&rom(&[0xF029, 0xD005, 0x00E0])).unwrap();
    chip8.step().unwrap();
    chip8.step().unwrap();
    assert!(!chip8.display().is_blank());

    let pc = chip8.registers().pc;
    assert_eq!(chip8.step().unwrap(), StepResult::Executed);
    assert!(chip8.display().is_blank());
    assert_eq!(chip8.registers().pc, pc + 2);
}

#[test]
fn subroutine_call_and_return_end_to_end() {
    // 0x200: call 0x204, 0x202: spin, 0x204: return
    let mut chip8 = Chip8::new();
    chip8.load(&rom(&[0x2204, 0x1202, 0x00EE])).unwrap();

    chip8.step().unwrap();
    assert_eq!(chip8.registers().pc, 0x204);
    assert_eq!(chip8.stack().frames(), &[0x200]);

    chip8.step().unwrap();
    assert_eq!(chip8.registers().pc, 0x202);
    assert!(chip8.stack().is_empty());
}

#[test]
fn load_file_reads_rom_from_disk() {
    let path = std::env::temp_dir().join(format!("chip8-vm-e2e-{}.ch8", std::process::id()));
    std::fs::write(&path, rom(&[0x6A02, 0xFA33])).unwrap();

    let machine = Machine::default();
    let loaded = machine.load_file(&path);
    std::fs::remove_file(&path).ok();
    loaded.unwrap();

    assert!(machine.is_ready());
    assert_eq!(machine.step().unwrap(), StepResult::Executed);
    machine.with_chip8(|chip8| assert_eq!(chip8.registers().v[0xA], 2));
}

#[test]
fn unreadable_rom_is_recoverable() {
    let machine = Machine::default();
    let err = machine.load_file("/no/such/dir/game.ch8").unwrap_err();
    assert!(matches!(err, Chip8Error::LoadFailure { .. }));
    assert!(!machine.is_ready());

    machine.load(&rom(&[0x1200])).unwrap();
    assert!(machine.is_ready());
}

#[test]
fn fault_halts_every_loop() {
    let machine = Machine::default();
    // 0x200: V0 = 1, 0x202: return with an empty stack
    machine.load(&rom(&[0x6001, 0x00EE])).unwrap();

    let config = RunConfig {
        cpu_hz: 1000,
        timer_hz: 60,
    };
    let halted = machine.run(config, |machine| {
        wait_until(Duration::from_secs(2), || machine.is_halted())
    });

    assert!(halted);
    assert!(!machine.is_running());
    assert!(matches!(
        machine.take_fault(),
        Some(Chip8Error::StackUnderflow { pc: 0x202 })
    ));
}

#[test]
fn stop_ends_loops() {
    let machine = Machine::default();
    // Spin forever on a jump to self
    machine.load(&rom(&[0x1200])).unwrap();

    let started = Instant::now();
    machine.run(RunConfig::default(), |machine| {
        thread::sleep(Duration::from_millis(50));
        machine.stop();
    });

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!machine.is_halted());
    assert!(machine.take_fault().is_none());
}

#[test]
fn timer_loop_counts_delay_down() {
    let machine = Machine::default();
    // V0 = 3, DT = V0, spin
    machine.load(&rom(&[0x6003, 0xF015, 0x1204])).unwrap();

    let expired = machine.run(RunConfig::default(), |machine| {
        wait_until(Duration::from_secs(2), || {
            machine.with_chip8(|chip8| {
                chip8.registers().pc == 0x204 && chip8.registers().delay_timer.load() == 0
            })
        })
    });
    assert!(expired);
}

#[test]
fn sound_request_is_latched_once() {
    let machine = Machine::default();
    // V0 = 2, ST = V0, spin
    machine.load(&rom(&[0x6002, 0xF018, 0x1204])).unwrap();

    let requests = machine.run(RunConfig::default(), |machine| {
        let mut requests = 0;
        let started = Instant::now();
        while started.elapsed() < Duration::from_millis(300) {
            if machine.take_sound_request() {
                requests += 1;
            }
            thread::sleep(Duration::from_millis(5));
        }
        requests
    });
    assert_eq!(requests, 1);
}

#[test]
fn key_wait_resumes_after_latch_write() {
    let machine = Machine::default();
    // V3 = key, then spin
    machine.load(&rom(&[0xF30A, 0x1202])).unwrap();

    let value = machine.run(RunConfig::default(), |machine| {
        thread::sleep(Duration::from_millis(30));
        assert_eq!(machine.with_chip8(|chip8| chip8.registers().pc), 0x200);

        let mut keys = [false; 16];
        keys[4] = true;
        machine.set_keys(keys);

        wait_until(Duration::from_secs(2), || {
            machine.with_chip8(|chip8| chip8.registers().pc) == 0x202
        });
        machine.with_chip8(|chip8| chip8.registers().v[3])
    });
    assert_eq!(value, 0x4);
}

#[test]
fn reset_while_running_returns_to_idle() {
    let machine = Machine::default();
    machine.load(&rom(&[0x7001, 0x1200])).unwrap();

    machine.run(RunConfig::default(), |machine| {
        thread::sleep(Duration::from_millis(20));
        machine.reset();
        assert!(!machine.is_ready());

        thread::sleep(Duration::from_millis(20));
        machine.with_chip8(|chip8| {
            assert_eq!(chip8.registers().pc, 0x200);
            assert_eq!(chip8.registers().v[0], 0);
        });
        assert!(machine.is_running());
    });
}
