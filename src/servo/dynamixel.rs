// Dynamixel Protocol 2.0 serial implementation
//
// Packet format: [0xFF, 0xFF, 0xFD, 0x00, ID, LEN_L, LEN_H, Instruction,
// Params..., CRC_L, CRC_H] with CRC-16 (poly 0x8005) over everything
// before the CRC. Status packets carry instruction 0x55 and an error byte.

use serialport::{self, SerialPort};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

/// Default serial configuration for the servo bus
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Packet header bytes (the fourth byte is reserved)
const HEADER: [u8; 4] = [0xFF, 0xFF, 0xFD, 0x00];

/// Status packet instruction byte
const STATUS_INSTRUCTION: u8 = 0x55;

/// Instruction set
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Instruction {
    Ping = 0x01,
    Read = 0x02,
    Write = 0x03,
}

/// Control table addresses for X-series servos
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Register {
    // EEPROM area (persists across power cycles)
    ModelNumber = 0, // 2 bytes, read-only
    Id = 7,          // 1 byte
    BaudRate = 8,    // 1 byte

    // RAM area (volatile)
    OperatingMode = 11, // 1 byte
    TorqueEnable = 64,  // 1 byte: 0=off, 1=on
    Led = 65,           // 1 byte
    GoalPosition = 116, // 4 bytes
}

/// Operating modes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatingMode {
    Current = 0,
    Velocity = 1,
    Position = 3,
    ExtendedPosition = 4,
    Pwm = 16,
}

/// Error types for bus communication
#[derive(Debug, thiserror::Error)]
pub enum DynamixelError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response from servo {id}: {reason}")]
    InvalidResponse { id: u8, reason: String },

    #[error("CRC mismatch in response from servo {id}")]
    CrcMismatch { id: u8 },

    #[error("Servo {id} returned error status: 0x{status:02X}")]
    StatusError { id: u8, status: u8 },

    #[error("Timeout waiting for response from servo {id}")]
    Timeout { id: u8 },
}

pub type Result<T> = std::result::Result<T, DynamixelError>;

/// Servo bus - handles Protocol 2.0 serial communication
pub struct DynamixelBus {
    port: Box<dyn SerialPort>,
}

impl DynamixelBus {
    /// Open a new connection to the servo bus
    pub fn open(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self { port })
    }

    /// CRC-16 (poly 0x8005, init 0) over a whole packet minus the CRC bytes
    fn crc16(data: &[u8]) -> u16 {
        let mut crc: u16 = 0;
        for &byte in data {
            crc ^= (byte as u16) << 8;
            for _ in 0..8 {
                if crc & 0x8000 != 0 {
                    crc = (crc << 1) ^ 0x8005;
                } else {
                    crc <<= 1;
                }
            }
        }
        crc
    }

    /// Build a packet with header, length and CRC
    fn build_packet(id: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
        // Length counts instruction + params + 2 CRC bytes
        let length = (params.len() + 3) as u16;
        let mut packet = Vec::with_capacity(10 + params.len());

        packet.extend_from_slice(&HEADER);
        packet.push(id);
        packet.extend_from_slice(&length.to_le_bytes());
        packet.push(instruction as u8);
        packet.extend_from_slice(params);

        let crc = Self::crc16(&packet);
        packet.extend_from_slice(&crc.to_le_bytes());

        packet
    }

    fn send_packet(&mut self, packet: &[u8]) -> Result<()> {
        self.port.write_all(packet)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read a status packet and return its parameters
    fn read_status(&mut self, expected_id: u8) -> Result<Vec<u8>> {
        let map_timeout = |e: std::io::Error| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                DynamixelError::Timeout { id: expected_id }
            } else {
                DynamixelError::Io(e)
            }
        };

        // Header, ID and length first
        let mut head = [0u8; 7];
        self.port.read_exact(&mut head).map_err(map_timeout)?;

        let length = u16::from_le_bytes([head[5], head[6]]) as usize;
        if length < 4 {
            return Err(DynamixelError::InvalidResponse {
                id: expected_id,
                reason: format!("Status length {} too short", length),
            });
        }

        // Instruction + error + params + CRC
        let mut body = vec![0u8; length];
        self.port.read_exact(&mut body).map_err(map_timeout)?;

        validate_status(expected_id, &head, &body)
    }

    /// Send an instruction and wait for the matching status packet
    fn transact(&mut self, id: u8, instruction: Instruction, params: &[u8]) -> Result<Vec<u8>> {
        let packet = Self::build_packet(id, instruction, params);
        self.send_packet(&packet)?;
        self.read_status(id)
    }

    /// Ping a servo to check if it's connected
    pub fn ping(&mut self, id: u8) -> Result<bool> {
        match self.transact(id, Instruction::Ping, &[]) {
            Ok(_) => Ok(true),
            Err(DynamixelError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Write raw bytes to a control table address
    fn write_registers(&mut self, id: u8, register: Register, data: &[u8]) -> Result<()> {
        // Protocol 2.0 addresses are u16 little-endian
        let mut params = Vec::with_capacity(2 + data.len());
        params.push(register as u8);
        params.push(0);
        params.extend_from_slice(data);

        debug!("Write to servo {}: reg={:?}, data={:02X?}", id, register, data);
        let _ = self.transact(id, Instruction::Write, &params)?;
        Ok(())
    }

    /// Write a single byte to a register
    pub fn write_u8(&mut self, id: u8, register: Register, value: u8) -> Result<()> {
        self.write_registers(id, register, &[value])
    }

    /// Write four bytes (little-endian) to a register
    pub fn write_u32(&mut self, id: u8, register: Register, value: u32) -> Result<()> {
        self.write_registers(id, register, &value.to_le_bytes())
    }
}

/// Check header, ID, CRC and error byte of a status packet; returns the
/// parameter bytes. `head` is the 7 leading bytes, `body` the remaining
/// `length` bytes (instruction, error, params, CRC).
fn validate_status(expected_id: u8, head: &[u8; 7], body: &[u8]) -> Result<Vec<u8>> {
    if head[0..4] != HEADER {
        return Err(DynamixelError::InvalidResponse {
            id: expected_id,
            reason: format!("Invalid header: {:02X?}", &head[0..4]),
        });
    }

    let id = head[4];
    if id != expected_id {
        return Err(DynamixelError::InvalidResponse {
            id: expected_id,
            reason: format!("ID mismatch: expected {}, got {}", expected_id, id),
        });
    }

    let mut crc_data = Vec::with_capacity(head.len() + body.len() - 2);
    crc_data.extend_from_slice(head);
    crc_data.extend_from_slice(&body[..body.len() - 2]);
    let expected_crc = DynamixelBus::crc16(&crc_data);
    let received_crc = u16::from_le_bytes([body[body.len() - 2], body[body.len() - 1]]);
    if expected_crc != received_crc {
        return Err(DynamixelError::CrcMismatch { id });
    }

    if body[0] != STATUS_INSTRUCTION {
        return Err(DynamixelError::InvalidResponse {
            id,
            reason: format!("Expected status instruction 0x55, got 0x{:02X}", body[0]),
        });
    }

    // Low bits are the error number; bit 7 is the alert flag
    let error_status = body[1];
    if error_status & 0x7F != 0 {
        return Err(DynamixelError::StatusError {
            id,
            status: error_status,
        });
    }

    Ok(body[2..body.len() - 2].to_vec())
}

impl super::ServoBus for DynamixelBus {
    fn ping(&mut self, id: u8) -> Result<bool> {
        DynamixelBus::ping(self, id)
    }

    fn torque_on(&mut self, id: u8) -> Result<()> {
        self.write_u8(id, Register::TorqueEnable, 1)
    }

    fn torque_off(&mut self, id: u8) -> Result<()> {
        self.write_u8(id, Register::TorqueEnable, 0)
    }

    fn set_operating_mode(&mut self, id: u8, mode: OperatingMode) -> Result<()> {
        self.write_u8(id, Register::OperatingMode, mode as u8)
    }

    fn set_goal_position(&mut self, id: u8, position: u16) -> Result<()> {
        // Goal position is a 4-byte register; wire positions are u16
        self.write_u32(id, Register::GoalPosition, position as u32)
    }
}
