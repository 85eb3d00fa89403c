use easyerr::Error;

/// A caller broke the contract of an operation. These are programmer errors, not runtime
/// conditions of the emulated hardware.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("apbp data slot {index} is out of range (expected 0..3)")]
    Slot { index: u8 },
    #[error("dma channel {index} is out of range (expected 0..8)")]
    Channel { index: u8 },
    #[error("timer {index} is out of range (expected 0..2)")]
    Timer { index: u8 },
    #[error("btdmp unit {index} is out of range (expected 0..2)")]
    Btdmp { index: u8 },
}
