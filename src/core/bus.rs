use crate::core::error::Result;

/// Memory and I/O interface seen by the CPU and the disassembler.
///
/// The address space is 64 KiB of memory plus 256 I/O ports; the bus
/// decides what lives where (ROM, RAM, banked pages, memory-mapped
/// devices). Every operation may fault, and the CPU surfaces the fault
/// from `step()` without retrying.
///
/// Reads take `&mut self` because reading can have side effects on real
/// hardware (clear-on-read status ports, FIFO pops).
pub trait Bus {
    fn mem_read(&mut self, addr: u16) -> Result<u8>;
    fn mem_write(&mut self, addr: u16, value: u8) -> Result<()>;

    /// Read from I/O port address space (separate from memory on Z80).
    /// Default: open bus, reads 0xFF. Override for machines with ports.
    fn port_in(&mut self, port: u8) -> Result<u8> {
        let _ = port;
        Ok(0xFF)
    }

    /// Write to I/O port address space.
    /// Default: discards the byte. Override for machines with ports.
    fn port_out(&mut self, port: u8, value: u8) -> Result<()> {
        let _ = (port, value);
        Ok(())
    }
}
