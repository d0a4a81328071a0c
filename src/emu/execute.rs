use super::{AluOp, Chip8, Chip8Error, Opcode, StepResult, font::glyph_address};
use crate::u4;

impl Chip8 {
    /// Executes a decoded opcode fetched from the current PC.
    ///
    /// PC is only moved once the instruction has succeeded, so a faulting
    /// instruction leaves PC pointing at itself.
    pub(crate) fn execute(&mut self, opcode: Opcode) -> Result<StepResult, Chip8Error> {
        let pc = self.registers.pc;
        let v = &mut self.registers.v;

        match opcode {
            Opcode::NoOp => {}
            Opcode::ClearDisplay => {
                self.display.clear();
            }
            Opcode::Return => {
                let caller = self.stack.pop().ok_or(Chip8Error::StackUnderflow { pc })?;
                // The pushed address is the call itself; resume after it.
                self.registers.pc = caller.wrapping_add(2);
                return Ok(StepResult::Executed);
            }
            Opcode::Jump { nnn } => {
                self.registers.pc = nnn;
                return Ok(StepResult::Executed);
            }
            Opcode::Call { nnn } => {
                self.stack
                    .push(pc)
                    .map_err(|_| Chip8Error::StackOverflow { pc })?;
                self.registers.pc = nnn;
                return Ok(StepResult::Executed);
            }
            Opcode::JumpWithOffset { nnn } => {
                self.registers.pc = nnn.wrapping_add(v[0].into());
                return Ok(StepResult::Executed);
            }
            Opcode::SkipRegEqualImm { x, nn } => {
                let skip = v[x] == nn;
                self.skip_if(skip);
            }
            Opcode::SkipRegNotEqualImm { x, nn } => {
                let skip = v[x] != nn;
                self.skip_if(skip);
            }
            Opcode::SkipRegEqualReg { x, y } => {
                let skip = v[x] == v[y];
                self.skip_if(skip);
            }
            Opcode::SkipRegNotEqualReg { x, y } => {
                let skip = v[x] != v[y];
                self.skip_if(skip);
            }
            Opcode::SetRegImm { x, nn } => {
                v[x] = nn;
            }
            Opcode::AddRegImm { x, nn } => {
                v[x] = v[x].wrapping_add(nn);
            }
            Opcode::Alu { x, y, op } => {
                execute_alu(v, x, y, op);
            }
            Opcode::SetIndexImm { nnn } => {
                self.registers.i = nnn;
            }
            Opcode::AddIndexReg { x } => {
                self.registers.i = self.registers.i.wrapping_add(v[x].into());
            }
            Opcode::Random { x, nn } => {
                let rand_byte: u8 = rand::random();
                v[x] = rand_byte & nn;
            }
            Opcode::Draw { x, y, n } => {
                self.execute_draw(x, y, n);
            }
            Opcode::SkipIfPressed { x } => {
                let pressed = self.keypad.is_pressed(v[x]);
                self.skip_if(pressed);
            }
            Opcode::SkipIfNotPressed { x } => {
                let pressed = self.keypad.is_pressed(v[x]);
                self.skip_if(!pressed);
            }
            Opcode::WaitForKey { x } => match self.keypad.first_pressed() {
                Some(key) => v[x] = key,
                // Retry this instruction on the next step
                None => return Ok(StepResult::WaitingForKey),
            },
            Opcode::ReadDelayTimer { x } => {
                v[x] = self.registers.delay_timer.load();
            }
            Opcode::SetDelayTimer { x } => {
                self.registers.delay_timer.store(v[x]);
            }
            Opcode::SetSoundTimer { x } => {
                self.registers.sound_timer.store(v[x]);
            }
            Opcode::FontChar { x } => {
                self.registers.i = glyph_address(v[x]);
            }
            Opcode::Bcd { x } => {
                let value = v[x];
                let i = self.registers.i;
                self.memory.write(i, value / 100);
                self.memory.write(i.wrapping_add(1), (value / 10) % 10);
                self.memory.write(i.wrapping_add(2), value % 10);
            }
            Opcode::StoreRegs { x } => {
                let i = self.registers.i;
                for (offset, &value) in (0u16..).zip(&v[..=usize::from(x)]) {
                    self.memory.write(i.wrapping_add(offset), value);
                }
            }
            Opcode::LoadRegs { x } => {
                let i = self.registers.i;
                for (offset, reg) in (0u16..).zip(&mut v[..=usize::from(x)]) {
                    *reg = self.memory.read(i.wrapping_add(offset));
                }
            }
            Opcode::Unknown(opcode) => {
                return Err(Chip8Error::UnknownOpcode { opcode, pc });
            }
        };

        self.registers.advance();
        Ok(StepResult::Executed)
    }

    /// Skips over the next instruction; the regular advance follows in `execute`.
    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.registers.advance();
        }
    }

    fn execute_draw(&mut self, x: u4, y: u4, n: u4) {
        let x_pos = usize::from(self.registers.v[x]);
        let y_pos = usize::from(self.registers.v[y]);

        for row in 0..u16::from(n.get()) {
            let sprite_byte = self.memory.read(self.registers.i.wrapping_add(row));

            for col in 0..8 {
                // If current sprite bit is non-zero
                if sprite_byte & (0x80 >> col) != 0 {
                    let prior = self.display.flip(x_pos + col, y_pos + usize::from(row));
                    self.registers.v[u4::FLAG] = prior;
                }
            }
        }
    }
}

/// 8xyN. VF is written before the result, so when x is F the result wins
/// and when y is F the result sees the new flag.
fn execute_alu(v: &mut [u8; 16], x: u4, y: u4, op: AluOp) {
    const F: u4 = u4::FLAG;

    match op {
        AluOp::Set => v[x] = v[y],
        AluOp::Or => v[x] |= v[y],
        AluOp::And => v[x] &= v[y],
        AluOp::Xor => v[x] ^= v[y],
        AluOp::Add => {
            v[F] = u8::from(v[x].checked_add(v[y]).is_none());
            v[x] = v[x].wrapping_add(v[y]);
        }
        AluOp::Sub => {
            v[F] = u8::from(v[x] >= v[y]);
            v[x] = v[x].wrapping_sub(v[y]);
        }
        AluOp::SubReverse => {
            v[F] = u8::from(v[y] >= v[x]);
            v[x] = v[y].wrapping_sub(v[x]);
        }
        AluOp::ShiftRight => {
            v[F] = v[x] & 1;
            v[x] >>= 1;
        }
        AluOp::ShiftLeft => {
            v[F] = v[x] >> 7;
            v[x] <<= 1;
        }
    }
}
