//! In-process controller used by the integration tests.
//!
//! `FakePlc` parses real request frames and answers from a byte map keyed by
//! area and block number. Reads of a block it does not hold fail with
//! "object does not exist" (0x0A); accesses past the end of a block fail with
//! "address out of range" (0x05).

#![allow(dead_code)]

use std::collections::HashMap;

use s7_tags::utils::{get_bit, set_bit};
use s7_tags::{MemoryArea, Result, S7Error, Transport, FUNCTION_READ, FUNCTION_WRITE};

const ITEM_NOT_FOUND: u8 = 0x0A;
const OUT_OF_RANGE: u8 = 0x05;
const SUCCESS: u8 = 0xFF;

pub fn area_code(area: MemoryArea) -> u8 {
    match area {
        MemoryArea::Input => 0x81,
        MemoryArea::Output => 0x82,
        MemoryArea::Memory => 0x83,
        MemoryArea::DataBlock => 0x84,
        MemoryArea::Counter => 0x1C,
        MemoryArea::Timer => 0x1D,
    }
}

/// Element width of a read item's transport code.
fn element_size(code: u8) -> usize {
    match code {
        0x04 | 0x05 => 2,
        0x06..=0x08 => 4,
        _ => 1,
    }
}

/// Transport size and length field the controller answers a read item with.
fn response_header(code: u8, len: usize) -> (u8, u16) {
    match code {
        0x01 => (0x03, 1),
        0x05 | 0x07 => (0x05, (len * 8) as u16),
        0x08 => (0x07, len as u16),
        _ => (0x04, (len * 8) as u16),
    }
}

/// One parsed item specification.
#[derive(Debug, Clone, Copy)]
struct ItemSpec {
    code: u8,
    count: usize,
    db: u16,
    area: u8,
    address: usize,
}

impl ItemSpec {
    fn parse(spec: &[u8]) -> Self {
        Self {
            code: spec[3],
            count: u16::from_be_bytes([spec[4], spec[5]]) as usize,
            db: u16::from_be_bytes([spec[6], spec[7]]),
            area: spec[8],
            address: ((spec[9] as usize) << 16) | ((spec[10] as usize) << 8) | spec[11] as usize,
        }
    }

    fn key(&self) -> (u8, u16) {
        (self.area, self.db)
    }

    fn is_bit(&self) -> bool {
        self.code == 0x01
    }

    /// Byte index and bit number addressed by a bit item.
    fn bit(&self) -> (usize, u8) {
        (self.address / 8, 7 - (self.address % 8) as u8)
    }
}

#[derive(Debug, Default)]
pub struct FakePlc {
    blocks: HashMap<(u8, u16), Vec<u8>>,
    /// Added to every echoed PDU reference.
    pub pdu_ref_skew: u16,
    /// Header error class and code for every response.
    pub reject: Option<(u8, u8)>,
    /// Number of request frames served.
    pub exchanges: usize,
    /// Item counts of the requests served, in order.
    pub item_counts: Vec<usize>,
}

impl FakePlc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(mut self, area: MemoryArea, db: u16, bytes: Vec<u8>) -> Self {
        self.blocks.insert((area_code(area), db), bytes);
        self
    }

    pub fn block(&self, area: MemoryArea, db: u16) -> &[u8] {
        &self.blocks[&(area_code(area), db)]
    }

    fn read_item(&self, spec: &ItemSpec) -> std::result::Result<Vec<u8>, u8> {
        let block = self.blocks.get(&spec.key()).ok_or(ITEM_NOT_FOUND)?;
        if spec.is_bit() {
            let (byte, bit) = spec.bit();
            let value = block.get(byte).ok_or(OUT_OF_RANGE)?;
            return Ok(vec![u8::from(get_bit(*value, bit))]);
        }
        let start = spec.address / 8;
        let end = start + spec.count * element_size(spec.code);
        block.get(start..end).map(<[u8]>::to_vec).ok_or(OUT_OF_RANGE)
    }

    fn write_item(&mut self, spec: &ItemSpec, payload: &[u8]) -> u8 {
        let Some(block) = self.blocks.get_mut(&spec.key()) else {
            return ITEM_NOT_FOUND;
        };
        if spec.is_bit() {
            let (byte, bit) = spec.bit();
            return match block.get_mut(byte) {
                Some(value) => {
                    *value = set_bit(*value, bit, payload[0] != 0);
                    SUCCESS
                }
                None => OUT_OF_RANGE,
            };
        }
        let start = spec.address / 8;
        match block.get_mut(start..start + payload.len()) {
            Some(target) => {
                target.copy_from_slice(payload);
                SUCCESS
            }
            None => OUT_OF_RANGE,
        }
    }

    fn serve_read(&self, specs: &[ItemSpec]) -> Vec<u8> {
        let mut data = Vec::new();
        let last = specs.len() - 1;
        for (i, spec) in specs.iter().enumerate() {
            match self.read_item(spec) {
                Ok(payload) => {
                    let (transport_size, length) = response_header(spec.code, payload.len());
                    data.push(SUCCESS);
                    data.push(transport_size);
                    data.extend_from_slice(&length.to_be_bytes());
                    data.extend_from_slice(&payload);
                    if payload.len() % 2 == 1 && i != last {
                        data.push(0x00);
                    }
                }
                Err(code) => data.extend_from_slice(&[code, 0x00, 0x00, 0x00]),
            }
        }
        data
    }

    fn serve_write(&mut self, specs: &[ItemSpec], mut data: &[u8]) -> Vec<u8> {
        let last = specs.len() - 1;
        let mut statuses = Vec::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            let transport_size = data[1];
            let length = u16::from_be_bytes([data[2], data[3]]) as usize;
            let len = match transport_size {
                0x03..=0x05 => length.div_ceil(8),
                _ => length,
            };
            let payload = &data[4..4 + len];
            statuses.push(self.write_item(spec, payload));
            let used = 4 + len + usize::from(len % 2 == 1 && i != last);
            data = &data[used.min(data.len())..];
        }
        statuses
    }
}

impl Transport for FakePlc {
    fn send_receive(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        if request.len() < 19 || request[0] != 0x03 || request[7] != 0x32 {
            return Err(S7Error::protocol("fake controller got a malformed frame"));
        }
        self.exchanges += 1;

        let pdu_ref = u16::from_be_bytes([request[11], request[12]]);
        let param_len = u16::from_be_bytes([request[13], request[14]]) as usize;
        let function = request[17];
        let count = request[18] as usize;
        self.item_counts.push(count);

        let specs: Vec<ItemSpec> = request[19..19 + count * 12]
            .chunks(12)
            .map(ItemSpec::parse)
            .collect();

        let data = match function {
            FUNCTION_READ => self.serve_read(&specs),
            FUNCTION_WRITE => self.serve_write(&specs, &request[17 + param_len..]),
            other => {
                return Err(S7Error::protocol(format!(
                    "fake controller does not serve function 0x{other:02X}"
                )))
            }
        };

        let (error_class, error_code) = self.reject.unwrap_or((0, 0));
        let total = 21 + data.len();
        let mut frame = vec![0x03, 0x00];
        frame.extend_from_slice(&(total as u16).to_be_bytes());
        frame.extend_from_slice(&[0x02, 0xF0, 0x80, 0x32, 0x03, 0x00, 0x00]);
        frame.extend_from_slice(&pdu_ref.wrapping_add(self.pdu_ref_skew).to_be_bytes());
        frame.extend_from_slice(&[0x00, 0x02]);
        frame.extend_from_slice(&(data.len() as u16).to_be_bytes());
        frame.extend_from_slice(&[error_class, error_code, function, count as u8]);
        frame.extend_from_slice(&data);
        Ok(frame)
    }
}
