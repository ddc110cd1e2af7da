#[derive(thiserror::Error, Debug)]
pub enum WireError {
    #[error("frame declares length {declared} but only {available} bytes are buffered")]
    Truncated { declared: usize, available: usize },

    #[error("unknown packet header byte {0:#04x}")]
    UnknownHeader(u8),

    #[error("inner struct is not bounded by 0x7E sentinels")]
    UnboundedInnerStruct,

    #[error("inner struct too short to contain a checksum ({0} bytes)")]
    InnerStructTooShort(usize),

    #[error("unknown lightshow effect {0:?}")]
    UnknownEffect(String),

    #[error("value {value} out of range for {field} (expected {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },
}
