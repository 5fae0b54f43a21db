//! A bus of simulated drivers that answers the master the way real drivers do.

#![allow(dead_code)]

use smd::crc::crc32;
use smd::packet::{self, Command};
use smd::{Index, RegisterTable, Transport, Value, BROADCAST_ID, HEADER, PRODUCT_TYPE};
use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::time::Duration;

/// Fault injected into every reply until cleared.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Fault {
    None,
    /// Drop the last byte, as if the read timed out.
    Truncate,
    /// Flip a bit in the header without fixing up the CRC.
    Corrupt,
}

pub struct SimulatedBus {
    drivers: BTreeMap<u8, RegisterTable>,
    module_masks: BTreeMap<u8, u64>,
    pending: VecDeque<u8>,
    pub written: Vec<Vec<u8>>,
    pub fault: Fault,
    /// Answer with this device ID in the header instead of the addressed one.
    pub reply_as: Option<u8>,
    /// Fail the write of any frame addressed to this ID.
    pub unplugged_at: Option<u8>,
    pub timeouts: Vec<Duration>,
    pub baud_rate: Option<u32>,
    pub input_clears: usize,
    pub output_clears: usize,
}

impl SimulatedBus {
    pub fn new(ids: &[u8]) -> Self {
        Self {
            drivers: ids.iter().map(|&id| (id, RegisterTable::new(id))).collect(),
            module_masks: BTreeMap::new(),
            pending: VecDeque::new(),
            written: vec![],
            fault: Fault::None,
            reply_as: None,
            unplugged_at: None,
            timeouts: vec![],
            baud_rate: None,
            input_clears: 0,
            output_clears: 0,
        }
    }

    pub fn driver(&self, id: u8) -> &RegisterTable {
        &self.drivers[&id]
    }

    pub fn set_register(&mut self, id: u8, index: Index, value: Value) {
        self.drivers
            .get_mut(&id)
            .unwrap()
            .set(index, value)
            .unwrap();
    }

    pub fn set_module_mask(&mut self, id: u8, mask: u64) {
        self.module_masks.insert(id, mask);
    }

    /// Opcodes of every frame written so far.
    pub fn commands(&self) -> Vec<u8> {
        self.written
            .iter()
            .map(|frame| frame[Index::Command as usize])
            .collect()
    }

    fn reply(&mut self, id: u8, command: u8, payload: &[u8]) {
        let sender = self.reply_as.unwrap_or(id);
        let mut frame = vec![HEADER, sender, PRODUCT_TYPE, 0, command, 0];
        frame.extend_from_slice(payload);
        frame[Index::PackageSize as usize] = (frame.len() + 4) as u8;
        let crc = crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());

        match self.fault {
            Fault::None => {}
            Fault::Truncate => {
                frame.pop();
            }
            Fault::Corrupt => frame[1] ^= 0x10,
        }
        self.pending.extend(frame);
    }

    fn handle(&mut self, frame: &[u8]) {
        let id = frame[Index::DeviceId as usize];
        let command = frame[Index::Command as usize];
        let payload = packet::payload(frame).to_vec();

        if command == Command::SyncWrite.to_byte() {
            self.sync_write(&payload);
            return;
        }
        if id == BROADCAST_ID || !self.drivers.contains_key(&id) {
            return;
        }

        if command == Command::Ping.to_byte() || command == Command::EepromWriteAck.to_byte() {
            self.reply(id, command, &[]);
        } else if command == Command::Read.to_byte() {
            let driver = &self.drivers[&id];
            let mut reply = vec![];
            for &byte in &payload {
                let index = Index::from_byte(byte).unwrap();
                reply.push(byte);
                driver.get(index).extend_le_bytes(&mut reply);
            }
            self.reply(id, command, &reply);
        } else if command == Command::Write.to_byte() || command == Command::WriteAck.to_byte() {
            let mut driver = self.drivers.remove(&id).unwrap();
            for (index, value) in packet::parse_payload(&payload).unwrap() {
                if index == Index::DeviceId {
                    driver = renumbered(&driver, value.as_u8().unwrap());
                } else {
                    driver.set(index, value).unwrap();
                }
            }
            self.drivers.insert(driver.device_id(), driver);
            if command == Command::WriteAck.to_byte() {
                self.reply(id, command, &payload);
            }
        } else if command == Command::ModuleScan.to_byte() {
            let mask = self.module_masks.get(&id).copied().unwrap_or(0);
            self.reply(id, command, &mask.to_le_bytes());
        }
    }

    fn sync_write(&mut self, payload: &[u8]) {
        let index = Index::from_byte(payload[0]).unwrap();
        let format = index.wire_format();
        for chunk in payload[1..].chunks(1 + format.size()) {
            let value = format.read(&chunk[1..]).unwrap();
            if let Some(driver) = self.drivers.get_mut(&chunk[0]) {
                driver.set(index, value).unwrap();
            }
        }
    }
}

/// A copy of `driver`'s writable registers under a new device ID.
fn renumbered(driver: &RegisterTable, id: u8) -> RegisterTable {
    let mut table = RegisterTable::new(id);
    for variable in driver.iter().filter(|variable| variable.is_mutable()) {
        table.set(variable.index(), variable.get().clone()).unwrap();
    }
    table
}

impl Transport for SimulatedBus {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if let Some(id) = self.unplugged_at {
            if bytes.get(Index::DeviceId as usize) == Some(&id) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
            }
        }
        self.written.push(bytes.to_vec());
        if smd::crc::is_valid(bytes) {
            self.handle(bytes);
        }
        Ok(())
    }

    fn read_up_to(&mut self, count: usize) -> io::Result<Vec<u8>> {
        let count = count.min(self.pending.len());
        Ok(self.pending.drain(..count).collect())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.input_clears += 1;
        self.pending.clear();
        Ok(())
    }

    fn clear_output(&mut self) -> io::Result<()> {
        self.output_clears += 1;
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.timeouts.push(timeout);
        Ok(())
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()> {
        self.baud_rate = Some(baud_rate);
        Ok(())
    }
}
