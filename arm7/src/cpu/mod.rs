pub mod arm;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::module_name_repetitions)]
pub mod arm7tdmi;
pub mod condition;
pub mod cpu_modes;
pub mod exception;
pub mod flags;
pub mod psr;
pub mod register_bank;
pub mod registers;
pub mod thumb;
