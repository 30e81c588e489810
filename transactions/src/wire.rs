//! Transaction wire codec.
//!
//! A serialized transaction is a version word followed by the prefix (inputs'
//! outpoints, outputs, lock time, expiry) and the witness (per-input value and
//! signature script). The low 16 bits of the version word carry the
//! transaction version and the high 16 bits the serialization type. Only full
//! serializations are accepted from clients. The transaction hash covers the
//! prefix alone, so witness data cannot change it.

use vsp_types::{Amount, TxHash};

use crate::TxError;

const SER_FULL: u16 = 0;
const SER_NO_WITNESS: u16 = 1;

/// Minimum encoded sizes, used to bound counts read from untrusted input.
const MIN_PREFIX_INPUT_LEN: u64 = 32 + 4 + 1 + 4;
const MIN_OUTPUT_LEN: u64 = 8 + 2 + 1;
const MIN_WITNESS_LEN: u64 = 8 + 4 + 4 + 1;

/// A reference to an output of a previous transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub hash: TxHash,
    pub index: u32,
    /// Regular (0) or stake (1) transaction tree.
    pub tree: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub prev_out: OutPoint,
    pub sequence: u32,
    pub value_in: i64,
    pub block_height: u32,
    pub block_index: u32,
    pub signature_script: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    pub value: i64,
    pub script_version: u16,
    pub pk_script: Vec<u8>,
}

impl TxOut {
    pub fn amount(&self) -> Amount {
        Amount::from_atoms(self.value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgTx {
    pub version: u16,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
    pub expiry: u32,
}

impl MsgTx {
    pub fn new(version: u16) -> Self {
        Self {
            version,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
            expiry: 0,
        }
    }

    pub fn from_hex(s: &str) -> Result<Self, TxError> {
        let bytes = hex::decode(s.trim()).map_err(|e| TxError::Hex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TxError> {
        let mut r = Reader::new(bytes);
        let word = r.u32("version")?;
        let version = (word & 0xffff) as u16;
        let ser_type = (word >> 16) as u16;
        if ser_type != SER_FULL {
            return Err(TxError::UnsupportedSerType(ser_type));
        }

        let input_count = r.count("inputs", MIN_PREFIX_INPUT_LEN)?;
        let mut prefix_inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            let hash = TxHash::new(r.array::<32>("outpoint hash")?);
            let index = r.u32("outpoint index")?;
            let tree = r.u8("outpoint tree")?;
            let sequence = r.u32("sequence")?;
            prefix_inputs.push((OutPoint { hash, index, tree }, sequence));
        }

        let output_count = r.count("outputs", MIN_OUTPUT_LEN)?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            let value = r.i64("output value")?;
            let script_version = r.u16("script version")?;
            let pk_script = r.var_bytes("pk script")?;
            outputs.push(TxOut {
                value,
                script_version,
                pk_script,
            });
        }

        let lock_time = r.u32("lock time")?;
        let expiry = r.u32("expiry")?;

        let witness_count = r.count("witness", MIN_WITNESS_LEN)?;
        if witness_count != prefix_inputs.len() {
            return Err(TxError::WitnessMismatch {
                prefix: prefix_inputs.len(),
                witness: witness_count,
            });
        }
        let mut inputs = Vec::with_capacity(witness_count);
        for (prev_out, sequence) in prefix_inputs {
            let value_in = r.i64("value in")?;
            let block_height = r.u32("block height")?;
            let block_index = r.u32("block index")?;
            let signature_script = r.var_bytes("signature script")?;
            inputs.push(TxIn {
                prev_out,
                sequence,
                value_in,
                block_height,
                block_index,
                signature_script,
            });
        }

        if r.remaining() > 0 {
            return Err(TxError::TrailingBytes(r.remaining()));
        }

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
            expiry,
        })
    }

    /// Full serialization (prefix and witness).
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.estimated_size());
        put_u32(&mut buf, self.version_word(SER_FULL));
        self.write_prefix(&mut buf);
        self.write_witness(&mut buf);
        buf
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    pub fn serialize_size(&self) -> usize {
        self.serialize().len()
    }

    pub fn tx_hash(&self) -> TxHash {
        let mut buf = Vec::with_capacity(self.estimated_size());
        put_u32(&mut buf, self.version_word(SER_NO_WITNESS));
        self.write_prefix(&mut buf);
        vsp_crypto::hash_transaction(&buf)
    }

    fn version_word(&self, ser_type: u16) -> u32 {
        u32::from(self.version) | (u32::from(ser_type) << 16)
    }

    fn estimated_size(&self) -> usize {
        let scripts: usize = self
            .outputs
            .iter()
            .map(|o| o.pk_script.len() + 11)
            .chain(self.inputs.iter().map(|i| i.signature_script.len() + 58))
            .sum();
        scripts + 32
    }

    fn write_prefix(&self, buf: &mut Vec<u8>) {
        put_var_int(buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.extend_from_slice(input.prev_out.hash.as_bytes());
            put_u32(buf, input.prev_out.index);
            buf.push(input.prev_out.tree);
            put_u32(buf, input.sequence);
        }
        put_var_int(buf, self.outputs.len() as u64);
        for output in &self.outputs {
            buf.extend_from_slice(&output.value.to_le_bytes());
            buf.extend_from_slice(&output.script_version.to_le_bytes());
            put_var_bytes(buf, &output.pk_script);
        }
        put_u32(buf, self.lock_time);
        put_u32(buf, self.expiry);
    }

    fn write_witness(&self, buf: &mut Vec<u8>) {
        put_var_int(buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.extend_from_slice(&input.value_in.to_le_bytes());
            put_u32(buf, input.block_height);
            put_u32(buf, input.block_index);
            put_var_bytes(buf, &input.signature_script);
        }
    }
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_var_int(buf: &mut Vec<u8>, v: u64) {
    match v {
        0..=0xfc => buf.push(v as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(v as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(v as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }
}

fn put_var_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_var_int(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], TxError> {
        if self.remaining() < n {
            return Err(TxError::UnexpectedEof(what));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], TxError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, TxError> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, TxError> {
        Ok(u16::from_le_bytes(self.array(what)?))
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, TxError> {
        Ok(u32::from_le_bytes(self.array(what)?))
    }

    fn i64(&mut self, what: &'static str) -> Result<i64, TxError> {
        Ok(i64::from_le_bytes(self.array(what)?))
    }

    fn var_int(&mut self, what: &'static str) -> Result<u64, TxError> {
        let v = match self.u8(what)? {
            0xfd => u64::from(self.u16(what)?),
            0xfe => u64::from(self.u32(what)?),
            0xff => u64::from_le_bytes(self.array(what)?),
            n => u64::from(n),
        };
        Ok(v)
    }

    /// Read an item count, refusing counts the remaining bytes cannot hold.
    fn count(&mut self, what: &'static str, min_item_len: u64) -> Result<usize, TxError> {
        let count = self.var_int(what)?;
        if count.saturating_mul(min_item_len) > self.remaining() as u64 {
            return Err(TxError::TooManyItems { what, count });
        }
        Ok(count as usize)
    }

    fn var_bytes(&mut self, what: &'static str) -> Result<Vec<u8>, TxError> {
        let len = self.count(what, 1)?;
        Ok(self.take(len, what)?.to_vec())
    }
}
