use std::error;
use std::fmt;
use std::result;

/// A fault raised by the bus or the decoder.
///
/// Every variant carries the positional context needed to report the
/// failure: the offending address or port, the value being moved for
/// writes, and for decode misses the prefix page the byte was found on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Memory read failed.
    MemRead { addr: u16 },
    /// Memory write failed.
    MemWrite { addr: u16, value: u8 },
    /// I/O port read failed.
    PortRead { port: u8 },
    /// I/O port write failed.
    PortWrite { port: u8, value: u8 },
    /// No defined behavior for this byte on any decode page.
    /// `prefix` is the page the byte was fetched under (e.g. 0xED).
    IllegalOpcode {
        addr: u16,
        opcode: u8,
        prefix: Option<u8>,
    },
}

pub type Result<T> = result::Result<T, Fault>;

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Fault::MemRead { addr } => write!(f, "unreadable memory at {:04X}h", addr),
            Fault::MemWrite { addr, value } => {
                write!(f, "unwritable memory at {:04X}h (value {:02X}h)", addr, value)
            }
            Fault::PortRead { port } => write!(f, "unreadable port {:02X}h", port),
            Fault::PortWrite { port, value } => {
                write!(f, "unwritable port {:02X}h (value {:02X}h)", port, value)
            }
            Fault::IllegalOpcode {
                addr,
                opcode,
                prefix: Some(prefix),
            } => write!(
                f,
                "illegal opcode {:02X} {:02X}h at {:04X}h",
                prefix, opcode, addr
            ),
            Fault::IllegalOpcode { addr, opcode, .. } => {
                write!(f, "illegal opcode {:02X}h at {:04X}h", opcode, addr)
            }
        }
    }
}

impl error::Error for Fault {}
