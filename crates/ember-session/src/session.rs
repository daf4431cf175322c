//! The provisioning session
//!
//! A guarded command interpreter over one mutable state record. There is
//! exactly one session per process execution; staged fields are cleared
//! only by explicit commands or process restart, never silently. Readiness
//! predicates gate the dangerous commands and are pure functions of the
//! staged state.

use rand::{CryptoRng, RngCore};
use tracing::{info, warn};
use zeroize::Zeroizing;

use ember_core::parse::{decode_hex_exact, parse_decimal};
use ember_core::types::{EntropyPool, PriorAttest, WrapIv, WrapKey};
use ember_core::{
    cipher_data_len, modulus_len, stir, ParseError, ATTEST_LEN, PROTOCOL_VERSION, TIMESTAMP_LEN,
};
use ember_hal::{BlobStore, DsHsm, FuseStore, KeyPurpose, KeySlot, DEVICE_INFO_REGS};
use ember_keys::{KeyPair, WrappedKeyParams};

use crate::attest::build_attestation;
use crate::command::Command;
use crate::error::{Result, SessionError};
use crate::reply::{PostAction, Reply};

/// Blob store key for the attestation chain link
pub const BLOB_ATTEST: &str = "attest";
/// Blob store key for the public modulus
pub const BLOB_PUBKEY: &str = "pubkey-n";
/// Blob store key for the encrypted wrapped-key blob
pub const BLOB_CIPHERDATA: &str = "cipherdata";

/// Device-info register carrying the layout version
const REG_VERSION: usize = 0;
/// Device-info register carrying the model number
const REG_MODEL: usize = 1;
/// Device-info register carrying the serial number
const REG_SERIAL: usize = 2;
/// Device-info register carrying the anti-reuse marker
const REG_RAND_MARKER: usize = 4;

/// The provisioning session state machine.
///
/// Owns every piece of staged identity material plus the three secret
/// buffers feeding key wrapping and generation. Commands run one at a
/// time, to completion, against synchronous collaborators.
pub struct Session<H, F, B, R> {
    hsm: H,
    fuse: F,
    store: B,
    rng: R,

    key_bits: usize,
    attest_slot: KeySlot,

    model: u32,
    serial: u32,
    pubkey_n: Vec<u8>,
    cipher_data: Vec<u8>,
    prior_attest: PriorAttest,
    has_pubkey: bool,
    has_cipherdata: bool,
    has_attest: bool,

    wrap_iv: WrapIv,
    wrap_key: WrapKey,
    entropy: EntropyPool,
    rand_marker: u32,
}

impl<H, F, B, R> Session<H, F, B, R>
where
    H: DsHsm,
    F: FuseStore,
    B: BlobStore,
    R: RngCore + CryptoRng,
{
    /// Create a session with freshly seeded secret buffers.
    ///
    /// The anti-reuse marker is drawn nonzero so a burned device-info
    /// block is always distinguishable from a blank one.
    pub fn new(hsm: H, fuse: F, store: B, mut rng: R, key_bits: usize, attest_slot: KeySlot) -> Self {
        let wrap_iv = WrapIv::random(&mut rng);
        let wrap_key = WrapKey::random(&mut rng);
        let entropy = EntropyPool::random(&mut rng);

        let mut rand_marker = rng.next_u32();
        while rand_marker == 0 {
            rand_marker = rng.next_u32();
        }

        Self {
            hsm,
            fuse,
            store,
            rng,
            key_bits,
            attest_slot,
            model: 0,
            serial: 0,
            pubkey_n: Vec::new(),
            cipher_data: Vec::new(),
            prior_attest: PriorAttest::new([0u8; ATTEST_LEN]),
            has_pubkey: false,
            has_cipherdata: false,
            has_attest: false,
            wrap_iv,
            wrap_key,
            entropy,
            rand_marker,
        }
    }

    /// Whether `GEN-KEY` would run without resetting staged key material.
    pub fn can_generate_key(&self) -> bool {
        !self.has_cipherdata
    }

    /// Whether every `ATTEST` prerequisite is staged.
    pub fn can_attest(&self) -> bool {
        self.attest_missing().is_empty()
    }

    /// Whether every `WRITE` prerequisite is staged.
    pub fn can_write(&self) -> bool {
        self.write_missing().is_empty()
    }

    fn attest_missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.has_pubkey {
            missing.push("pubkey");
        }
        if !self.has_cipherdata {
            missing.push("cipherdata");
        }
        if !self.has_attest {
            missing.push("attest");
        }
        if self.model == 0 {
            missing.push("model");
        }
        if self.serial == 0 {
            missing.push("serial");
        }
        missing
    }

    fn write_missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.has_attest {
            missing.push("attest");
        }
        if !self.has_cipherdata {
            missing.push("cipherdata");
        }
        if !self.has_pubkey {
            missing.push("pubkey");
        }
        missing
    }

    /// Handle one protocol line.
    ///
    /// Recoverable failures come back as an `<ERROR` reply with the state
    /// untouched. `Err` is reserved for fatal conditions the host must not
    /// continue past.
    pub fn handle_line(&mut self, line: &str) -> Result<Reply> {
        match self.dispatch(Command::parse(line.trim())) {
            Ok(reply) => Ok(reply),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, line, "command rejected");
                let mut reply = Reply::error();
                reply.info(e);
                Ok(reply)
            }
        }
    }

    fn dispatch(&mut self, cmd: Command<'_>) -> Result<Reply> {
        match cmd {
            Command::GenKey => self.gen_key(),
            Command::SetModel(v) => self.set_model(v),
            Command::SetSerial(v) => self.set_serial(v),
            Command::SetPubkeyN(v) => self.set_pubkey_n(v),
            Command::SetCipherData(v) => self.set_cipher_data(v),
            Command::SetAttest(v) => self.set_attest(v),
            Command::StirEntropy(v) => {
                stir(&mut self.rng, self.entropy.as_mut_slice(), v.as_bytes());
                Ok(Reply::ok())
            }
            Command::StirIv(v) => {
                stir(&mut self.rng, self.wrap_iv.as_mut_slice(), v.as_bytes());
                Ok(Reply::ok())
            }
            Command::StirKey(v) => {
                stir(&mut self.rng, self.wrap_key.as_mut_slice(), v.as_bytes());
                Ok(Reply::ok())
            }
            Command::LoadEfuse => self.load_efuse(),
            Command::LoadNvs => self.load_nvs(),
            Command::Attest(v) => self.attest(v),
            Command::Burn => self.burn(),
            Command::Write => self.write(),
            Command::Dump => self.dump(),
            Command::Ping => Ok(Reply::ok().with_action(PostAction::RearmReady)),
            Command::Nop => Ok(Reply::ok()),
            Command::Version => {
                let mut reply = Reply::ok();
                reply.kv("version", PROTOCOL_VERSION);
                Ok(reply)
            }
            Command::Reset => {
                info!("restart requested");
                Ok(Reply::ok().with_action(PostAction::Restart))
            }
            Command::Unknown(_) => {
                let mut reply = Reply::error();
                reply.info("unknown command");
                Ok(reply)
            }
        }
    }

    fn gen_key(&mut self) -> Result<Reply> {
        let mut reply = Reply::ok();

        // Regeneration is allowed but never silent: old staged key
        // material is acknowledged before being discarded, so no mix of
        // old and new material can survive.
        if self.has_pubkey {
            reply.progress("GEN-KEY resetting staged public key");
            self.pubkey_n.clear();
            self.has_pubkey = false;
        }
        if self.has_cipherdata {
            reply.progress("GEN-KEY resetting staged cipher data");
            self.cipher_data.clear();
            self.has_cipherdata = false;
        }

        reply.progress(format!("starting key generation ({}-bit)", self.key_bits));

        let keypair = KeyPair::generate(&mut self.rng, self.key_bits, self.entropy.as_bytes())?;

        // The plaintext parameter block lives exactly as long as the
        // encrypt call needs it.
        let block = {
            let params = WrappedKeyParams::build(&keypair)?;
            Zeroizing::new(params.to_bytes())
        };
        let cipher =
            self.hsm
                .encrypt_params(&block, self.wrap_iv.as_bytes(), self.wrap_key.as_bytes())?;

        self.pubkey_n = keypair.modulus_bytes();
        self.has_pubkey = true;
        self.cipher_data = cipher;
        self.has_cipherdata = true;

        info!(key_bits = self.key_bits, "staged fresh identity key");

        reply.raw(format!(
            "<pubkey.N={} (length={} bits)",
            hex::encode(&self.pubkey_n),
            self.key_bits
        ));
        reply.buffer("cipherdata", &self.cipher_data);
        Ok(reply)
    }

    fn set_model(&mut self, value: &str) -> Result<Reply> {
        let n = parse_decimal(value)?;
        if n == 0 {
            return Err(ParseError::ZeroValue.into());
        }
        let mut reply = Reply::ok();
        if self.model != 0 && self.model != n {
            reply.progress(format!("replacing staged model {}", self.model));
        }
        self.model = n;
        reply.kv("model", n);
        Ok(reply)
    }

    fn set_serial(&mut self, value: &str) -> Result<Reply> {
        let n = parse_decimal(value)?;
        if n == 0 {
            return Err(ParseError::ZeroValue.into());
        }
        let mut reply = Reply::ok();
        if self.serial != 0 && self.serial != n {
            reply.progress(format!("replacing staged serial {}", self.serial));
        }
        self.serial = n;
        reply.kv("serial", n);
        Ok(reply)
    }

    fn set_pubkey_n(&mut self, value: &str) -> Result<Reply> {
        let bytes = decode_hex_exact(value, modulus_len(self.key_bits))?;
        self.pubkey_n = bytes;
        self.has_pubkey = true;
        Ok(Reply::ok())
    }

    fn set_cipher_data(&mut self, value: &str) -> Result<Reply> {
        let bytes = decode_hex_exact(value, cipher_data_len(self.key_bits))?;
        self.cipher_data = bytes;
        self.has_cipherdata = true;
        Ok(Reply::ok())
    }

    fn set_attest(&mut self, value: &str) -> Result<Reply> {
        let bytes = decode_hex_exact(value, ATTEST_LEN)?;
        let mut link = [0u8; ATTEST_LEN];
        link.copy_from_slice(&bytes);
        self.prior_attest = PriorAttest::new(link);
        self.has_attest = true;
        Ok(Reply::ok())
    }

    fn load_efuse(&mut self) -> Result<Reply> {
        let mut reply = Reply::ok();

        if self.fuse.read_reg(REG_VERSION)? == 0 {
            reply.info("device-info block not burned");
            return Ok(reply);
        }

        self.model = self.fuse.read_reg(REG_MODEL)?;
        self.serial = self.fuse.read_reg(REG_SERIAL)?;
        reply.kv("model", self.model);
        reply.kv("serial", self.serial);
        Ok(reply)
    }

    fn load_nvs(&mut self) -> Result<Reply> {
        let mut reply = Reply::ok();
        let n_len = modulus_len(self.key_bits);
        let cd_len = cipher_data_len(self.key_bits);

        match self.store.get_blob(BLOB_ATTEST)? {
            Some(blob) if blob.len() == ATTEST_LEN => {
                let mut link = [0u8; ATTEST_LEN];
                link.copy_from_slice(&blob);
                self.prior_attest = PriorAttest::new(link);
                self.has_attest = true;
                reply.progress(format!("loaded nvs.{} ({} bytes)", BLOB_ATTEST, blob.len()));
            }
            Some(blob) => reply.info(format!(
                "nvs.{} has unexpected length {}, skipping",
                BLOB_ATTEST,
                blob.len()
            )),
            None => reply.info(format!("nvs.{} absent", BLOB_ATTEST)),
        }

        match self.store.get_blob(BLOB_PUBKEY)? {
            Some(blob) if blob.len() == n_len => {
                self.pubkey_n = blob;
                self.has_pubkey = true;
                reply.progress(format!("loaded nvs.{} ({} bytes)", BLOB_PUBKEY, n_len));
            }
            Some(blob) => reply.info(format!(
                "nvs.{} has unexpected length {}, skipping",
                BLOB_PUBKEY,
                blob.len()
            )),
            None => reply.info(format!("nvs.{} absent", BLOB_PUBKEY)),
        }

        match self.store.get_blob(BLOB_CIPHERDATA)? {
            Some(blob) if blob.len() == cd_len => {
                self.cipher_data = blob;
                self.has_cipherdata = true;
                reply.progress(format!("loaded nvs.{} ({} bytes)", BLOB_CIPHERDATA, cd_len));
            }
            Some(blob) => reply.info(format!(
                "nvs.{} has unexpected length {}, skipping",
                BLOB_CIPHERDATA,
                blob.len()
            )),
            None => reply.info(format!("nvs.{} absent", BLOB_CIPHERDATA)),
        }

        Ok(reply)
    }

    fn attest(&mut self, value: &str) -> Result<Reply> {
        let missing = self.attest_missing();
        if !missing.is_empty() {
            return Err(SessionError::Guard { missing });
        }

        let bytes = decode_hex_exact(value, TIMESTAMP_LEN)?;
        let mut timestamp = [0u8; TIMESTAMP_LEN];
        timestamp.copy_from_slice(&bytes);

        let record = build_attestation(
            &mut self.rng,
            &self.hsm,
            self.attest_slot,
            &timestamp,
            self.model,
            self.serial,
            &self.pubkey_n,
            &self.prior_attest,
            &self.cipher_data,
        )?;

        let mut reply = Reply::ok();
        reply.buffer("attest", &record);
        Ok(reply)
    }

    fn burn(&mut self) -> Result<Reply> {
        // Burning is permitted at most once; the check runs against the
        // fuse store itself, not the session state.
        if self.fuse.read_reg(REG_VERSION)? != 0 {
            return Err(SessionError::Rejected("device-info block already burned"));
        }
        if !self.fuse.key_slot_unused(self.attest_slot)? {
            return Err(SessionError::Rejected("attestation key slot already burned"));
        }

        let mut reply = Reply::ok();
        reply.progress(format!(
            "burning device info (model={} serial={})",
            self.model, self.serial
        ));

        self.fuse.batch_write(&[
            (REG_VERSION, PROTOCOL_VERSION),
            (REG_MODEL, self.model),
            (REG_SERIAL, self.serial),
            (REG_RAND_MARKER, self.rand_marker),
        ])?;
        self.fuse.write_key_slot(
            self.attest_slot,
            KeyPurpose::HmacDownDigitalSignature,
            self.wrap_key.as_bytes(),
        )?;

        info!(
            model = self.model,
            serial = self.serial,
            slot = self.attest_slot.index(),
            "burned device identity"
        );
        Ok(reply)
    }

    fn write(&mut self) -> Result<Reply> {
        let missing = self.write_missing();
        if !missing.is_empty() {
            return Err(SessionError::Guard { missing });
        }

        self.store.set_blob(BLOB_ATTEST, self.prior_attest.as_ref())?;
        self.store.set_blob(BLOB_PUBKEY, &self.pubkey_n)?;
        self.store.set_blob(BLOB_CIPHERDATA, &self.cipher_data)?;

        info!("persisted staged identity blobs");

        let mut reply = Reply::ok();
        reply.progress(format!(
            "wrote nvs.{}, nvs.{}, nvs.{}",
            BLOB_ATTEST, BLOB_PUBKEY, BLOB_CIPHERDATA
        ));
        Ok(reply)
    }

    fn dump(&mut self) -> Result<Reply> {
        let mut reply = Reply::ok();
        let slot = self.attest_slot;

        reply.kv(
            &format!("efuse.key{}.unused", slot.index()),
            u8::from(self.fuse.key_slot_unused(slot)?),
        );
        let protection = self.fuse.key_slot_protection(slot)?;
        reply.kv(
            &format!("efuse.key{}.protected", slot.index()),
            format!(
                "rd_dis={} wr_dis={}",
                u8::from(protection.read_disabled),
                u8::from(protection.write_disabled)
            ),
        );
        reply.buffer(
            &format!("efuse.keyHmac{}", slot.index()),
            &self.fuse.read_key_block(slot)?,
        );

        for reg in 0..DEVICE_INFO_REGS {
            reply.kv(
                &format!("efuse.blk3.reg{}", reg),
                format!("{:#010x}", self.fuse.read_reg(reg)?),
            );
        }
        if self.fuse.read_reg(REG_VERSION)? != 0 {
            reply.kv("efuse.version", self.fuse.read_reg(REG_VERSION)?);
            reply.kv("efuse.model", self.fuse.read_reg(REG_MODEL)?);
            reply.kv("efuse.serial", self.fuse.read_reg(REG_SERIAL)?);
            reply.kv(
                "efuse.randMarker",
                format!("{:#010x}", self.fuse.read_reg(REG_RAND_MARKER)?),
            );
        }

        let n_len = modulus_len(self.key_bits);
        let cd_len = cipher_data_len(self.key_bits);
        for (key, expected) in [
            (BLOB_ATTEST, ATTEST_LEN),
            (BLOB_PUBKEY, n_len),
            (BLOB_CIPHERDATA, cd_len),
        ] {
            match self.store.get_blob(key)? {
                Some(blob) => {
                    if blob.len() != expected {
                        reply.info(format!("nvs.{} has unexpected length", key));
                    }
                    reply.buffer(&format!("nvs.{}", key), &blob);
                }
                None => reply.kv(&format!("nvs.{}", key), "[ nil ]"),
            }
        }

        reply.kv("pending.model", self.model);
        reply.kv("pending.serial", self.serial);
        if self.has_pubkey {
            reply.buffer("pending.pubkey", &self.pubkey_n);
        } else {
            reply.kv("pending.pubkey", "[ nil ]");
        }
        if self.has_cipherdata {
            reply.buffer("pending.cipherdata", &self.cipher_data);
        } else {
            reply.kv("pending.cipherdata", "[ nil ]");
        }
        if self.has_attest {
            reply.buffer("pending.attest", self.prior_attest.as_ref());
        } else {
            reply.kv("pending.attest", "[ nil ]");
        }

        reply.kv("ready", u8::from(self.can_attest()));
        Ok(reply)
    }
}
