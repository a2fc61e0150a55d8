//! Minimal RLP encoder for Flow's canonical transaction forms.
//!
//! Only encoding is needed: the updater signs what it builds and never
//! decodes ledger payloads.

/// An RLP value: a byte string or a list of values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Bytes(Vec<u8>),
    List(Vec<Item>),
}

impl Item {
    pub fn bytes(data: impl AsRef<[u8]>) -> Self {
        Item::Bytes(data.as_ref().to_vec())
    }

    /// Unsigned integer as a minimal big-endian byte string (zero is empty)
    pub fn uint(value: u64) -> Self {
        Item::Bytes(minimal_be(value))
    }

    pub fn list(items: Vec<Item>) -> Self {
        Item::List(items)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Item::Bytes(data) => {
                if data.len() == 1 && data[0] < 0x80 {
                    out.push(data[0]);
                } else {
                    write_header(out, 0x80, data.len());
                    out.extend_from_slice(data);
                }
            }
            Item::List(items) => {
                let mut payload = Vec::new();
                for item in items {
                    item.encode_into(&mut payload);
                }
                write_header(out, 0xc0, payload.len());
                out.extend_from_slice(&payload);
            }
        }
    }
}

fn minimal_be(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

fn write_header(out: &mut Vec<u8>, offset: u8, len: usize) {
    if len <= 55 {
        out.push(offset + len as u8);
    } else {
        let len_bytes = minimal_be(len as u64);
        out.push(offset + 55 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
    }
}
