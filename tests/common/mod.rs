use z80_core::core::{Bus, Fault, Result};

/// Minimal bus for testing: flat 64KB RAM, a 256-entry input-port
/// latch, an output-port journal, and optional per-address fault
/// injection for error-path tests.
pub struct TestBus {
    pub memory: [u8; 0x10000],
    pub ports_in: [u8; 256],
    pub ports_out: Vec<(u8, u8)>,
    pub fail_read: Option<u16>,
    pub fail_write: Option<u16>,
    pub fail_port: Option<u8>,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: [0; 0x10000],
            ports_in: [0xFF; 256],
            ports_out: Vec::new(),
            fail_read: None,
            fail_write: None,
            fail_port: None,
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl Bus for TestBus {
    fn mem_read(&mut self, addr: u16) -> Result<u8> {
        if self.fail_read == Some(addr) {
            return Err(Fault::MemRead { addr });
        }
        Ok(self.memory[addr as usize])
    }

    fn mem_write(&mut self, addr: u16, value: u8) -> Result<()> {
        if self.fail_write == Some(addr) {
            return Err(Fault::MemWrite { addr, value });
        }
        self.memory[addr as usize] = value;
        Ok(())
    }

    fn port_in(&mut self, port: u8) -> Result<u8> {
        if self.fail_port == Some(port) {
            return Err(Fault::PortRead { port });
        }
        Ok(self.ports_in[port as usize])
    }

    fn port_out(&mut self, port: u8, value: u8) -> Result<()> {
        if self.fail_port == Some(port) {
            return Err(Fault::PortWrite { port, value });
        }
        self.ports_out.push((port, value));
        Ok(())
    }
}
