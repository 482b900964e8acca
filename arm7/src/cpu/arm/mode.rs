use serde::{Deserialize, Serialize};

use crate::cpu::arm::instructions::ArmModeInstruction;
use crate::cpu::condition::Condition;

/// One fetched ARM word with its condition and decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmModeOpcode {
    pub instruction: ArmModeInstruction,
    pub condition: Condition,
    pub raw: u32,
}

impl ArmModeOpcode {
    #[cfg(feature = "disassembler")]
    #[must_use]
    pub fn disassembler(&self) -> String {
        self.instruction.disassembler(self.condition)
    }
}

impl From<u32> for ArmModeOpcode {
    fn from(op_code: u32) -> Self {
        Self {
            instruction: ArmModeInstruction::from(op_code),
            condition: Condition::from_op_code(op_code),
            raw: op_code,
        }
    }
}

impl std::fmt::Display for ArmModeOpcode {
    /// Dumps the raw bits under the field layout of the decoded format.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes_pos1 = "POS: |..3 ..................2 ..................1 ..................0|";
        let bytes_pos2 = "     |1_0_9_8_7_6_5_4_3_2_1_0_9_8_7_6_5_4_3_2_1_0_9_8_7_6_5_4_3_2_1_0|";

        let op_code_format = match &self.instruction {
            ArmModeInstruction::DataProcessing { .. } => {
                "FMT: |_Cond__|0_0|I|_code__|S|__Rn___|__Rd___|_______operand2________|"
            }
            ArmModeInstruction::Multiply { .. } => {
                "FMT: |_Cond__|0_0_0_0_0_0|A|S|__Rd___|__Rn___|__Rs___|1_0_0_1|__Rm___|"
            }
            ArmModeInstruction::MultiplyLong { .. } => {
                "FMT: |_Cond__|0_0_0_0_1|U|A|S|_RdHi__|_RdLo__|__Rs___|1_0_0_1|__Rm___|"
            }
            ArmModeInstruction::PsrTransfer { .. } => {
                "FMT: |_Cond__|0_0|I|1_0|P|D|0|_Field_|__Rd___|_______operand2________|"
            }
            ArmModeInstruction::SingleDataSwap { .. } => {
                "FMT: |_Cond__|0_0_0_1_0|B|0_0|__Rn___|__Rd___|0_0_0_0|1_0_0_1|__Rm___|"
            }
            ArmModeInstruction::BranchAndExchange { .. } => {
                "FMT: |_Cond__|0_0_0_1|0_0_1_0|1_1_1_1|1_1_1_1|1_1_1_1|0_0_0_1|__Rn___|"
            }
            ArmModeInstruction::HalfwordDataTransfer { .. } => {
                "FMT: |_Cond__|0_0_0|P|U|I|W|L|__Rn___|__Rd___|_Offset|1|S|H|1|_Offset|"
            }
            ArmModeInstruction::SingleDataTransfer { .. } => {
                "FMT: |_Cond__|0_1|I|P|U|B|W|L|__Rn___|__Rd___|________Offset_________|"
            }
            ArmModeInstruction::BlockDataTransfer { .. } => {
                "FMT: |_Cond__|1_0_0|P|U|S|W|L|__Rn___|_____________Reg_List__________|"
            }
            ArmModeInstruction::Branch { .. } => {
                "FMT: |_Cond__|1_0_1|L|______________________Offset___________________|"
            }
            ArmModeInstruction::SoftwareInterrupt { .. } => {
                "FMT: |_Cond__|1_1_1_1|_____________Comment field (ignored)___________|"
            }
            ArmModeInstruction::Undefined => "FMT: |_Cond__|",
        };

        let raw_bits = format!("{:032b}", self.raw)
            .chars()
            .map(String::from)
            .collect::<Vec<_>>()
            .join("_");

        writeln!(f, "INS: {:?}", self.instruction)?;
        writeln!(f, "{bytes_pos1}")?;
        writeln!(f, "{bytes_pos2}")?;
        writeln!(f, "RAW: |{raw_bits}|")?;
        writeln!(f, "{op_code_format}")
    }
}
