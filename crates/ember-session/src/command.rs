//! Line protocol command parsing
//!
//! Commands are `NAME` or `NAME=value`. Names are matched exactly; value
//! validation belongs to the handlers, since most expected lengths depend
//! on the deployment key size.

/// One parsed protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// Generate a keypair and stage the public modulus and cipher blob
    GenKey,
    /// Stage the model number (unsigned decimal)
    SetModel(&'a str),
    /// Stage the serial number (unsigned decimal)
    SetSerial(&'a str),
    /// Stage the public modulus (hex)
    SetPubkeyN(&'a str),
    /// Stage the encrypted wrapped-key blob (hex)
    SetCipherData(&'a str),
    /// Stage the prior attestation chain link (hex)
    SetAttest(&'a str),
    /// Mix bytes into the keygen entropy pool
    StirEntropy(&'a str),
    /// Mix bytes into the wrapping IV
    StirIv(&'a str),
    /// Mix bytes into the wrapping key
    StirKey(&'a str),
    /// Load model/serial from the fuse device-info block
    LoadEfuse,
    /// Load persisted blobs from the store
    LoadNvs,
    /// Build and sign an attestation; value is the 16-hex-char timestamp
    Attest(&'a str),
    /// Burn identity registers and the wrapping key, irreversibly
    Burn,
    /// Persist the staged blobs
    Write,
    /// Report fuse, store, and staged state
    Dump,
    /// Liveness check; re-arms readiness announcements
    Ping,
    /// No-op
    Nop,
    /// Report the protocol version
    Version,
    /// Acknowledge, then restart the process
    Reset,
    /// Anything else
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    /// Parse one trimmed protocol line.
    pub fn parse(line: &'a str) -> Self {
        let (name, value) = match line.split_once('=') {
            Some((name, value)) => (name, value),
            None => (line, ""),
        };

        match name {
            "GEN-KEY" => Command::GenKey,
            "SET-MODEL" => Command::SetModel(value),
            "SET-SERIAL" => Command::SetSerial(value),
            "SET-PUBKEYN" => Command::SetPubkeyN(value),
            "SET-CIPHERDATA" => Command::SetCipherData(value),
            "SET-ATTEST" => Command::SetAttest(value),
            "STIR-ENTROPY" => Command::StirEntropy(value),
            "STIR-IV" => Command::StirIv(value),
            "STIR-KEY" => Command::StirKey(value),
            "LOAD-EFUSE" => Command::LoadEfuse,
            "LOAD-NVS" => Command::LoadNvs,
            "ATTEST" => Command::Attest(value),
            "BURN" => Command::Burn,
            "WRITE" => Command::Write,
            "DUMP" => Command::Dump,
            "PING" => Command::Ping,
            "NOP" => Command::Nop,
            "VERSION" => Command::Version,
            "RESET" => Command::Reset,
            _ => Command::Unknown(line),
        }
    }
}
