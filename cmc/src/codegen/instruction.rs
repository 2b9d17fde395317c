use std::fmt::Display;

/// Opcodes of the abstract register VM. The binary encoder for these
/// lives outside the front-end; the emitter only builds the records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OpCode {
    #[default]
    Nop,
    Push,
    Pop,
    Mov,
    Store,
    Load,
    Leave,
    End,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reg {
    #[default]
    None,
    Sp,
    Bp,
}

impl Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reg::None => write!(f, "?"),
            Reg::Sp => write!(f, "sp"),
            Reg::Bp => write!(f, "bp"),
        }
    }
}

/// One VM instruction. Fields that an opcode does not use stay at their
/// defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub sreg: Reg,
    pub dreg: Reg,
    pub imm64: u64,
    pub disp: i32,
    pub size: u8,
}

pub type InstructionList = Vec<Instruction>;

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.opcode {
            OpCode::Nop => write!(f, "nop"),
            OpCode::Push => write!(f, "push {}", self.sreg),
            OpCode::Pop => write!(f, "pop {}", self.dreg),
            OpCode::Mov => write!(f, "mov {}, {}", self.dreg, self.sreg),
            OpCode::Store => write!(
                f,
                "store [{}+{}], {} ; size {}",
                self.sreg, self.disp, self.imm64, self.size
            ),
            OpCode::Load => write!(
                f,
                "load {}, [{}+{}] ; size {}",
                self.dreg, self.sreg, self.disp, self.size
            ),
            OpCode::Leave => write!(f, "leave"),
            OpCode::End => write!(f, "end"),
        }
    }
}
