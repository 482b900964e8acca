use thiserror::Error;

/// Errors that stop the emulation.
///
/// None of these can be triggered by guest code on its own: they signal a
/// processor state the core should never have produced. Architectural
/// events (undefined instructions, SWI, aborts, interrupts) are not errors,
/// they go through the exception dispatcher.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    #[error("corrupted processor state: mode bits 0b{mode_bits:05b} in PSR 0x{psr:08X}")]
    CorruptedMode { psr: u32, mode_bits: u32 },

    #[error("invalid condition field 0x{0:X}")]
    InvalidCondition(u8),

    #[error("invalid bus transfer size {0}, expected 1, 2 or 4 bytes")]
    InvalidTransferSize(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_corrupted_mode() {
        let e = CpuError::CorruptedMode {
            psr: 0x6000_0005,
            mode_bits: 0b00101,
        };
        assert_eq!(
            e.to_string(),
            "corrupted processor state: mode bits 0b00101 in PSR 0x60000005"
        );
    }
}
