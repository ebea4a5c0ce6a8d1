pub mod bank;

pub use bank::{BankSource, DirBankSource, MemoryBankSource, DEFAULT_BANK_EXTENSION};
