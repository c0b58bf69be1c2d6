//! Register-level model of the LPC17xx USB device controller.
//!
//! Implements [`UsbRegisters`] with the handshakes the driver depends on
//! (CCEMPTY/CDFULL for SIE phases, EP_RLZED for realisation, PKT_RDY for
//! reads, EpIntSt summarised into EP_SLOW), plus a "host" side that queues
//! SETUP/OUT packets, raises bus resets and records every validated IN
//! packet. Host tests drive the full stack through it.

use heapless::{Deque, Vec};

use super::registers::{
    Reg, UsbRegisters, CCEMPTY, CDFULL, DEV_STAT, DV, EP_FAST, EP_RLZED, EP_SLOW, FRAME,
    PKT_LNGTH_MASK, PKT_RDY, RD_EN, WR_EN,
};
use super::sie::{
    CMD_CLEAR_BUFFER, CMD_CONFIGURE_DEVICE, CMD_DEVICE_STATUS, CMD_SET_ADDRESS,
    CMD_VALIDATE_BUFFER, CONF_DEVICE, DSA_DEV_EN, DS_CON, DS_CON_CH, DS_RST, DS_SUS_CH,
    SES_CND_ST, SES_ST, SE_FE, SE_ST, SE_STP,
};
use super::Endpoint;

/// Largest packet the model carries.
pub const SIM_MAX_PACKET: usize = 64;

const ENDPOINTS: usize = Endpoint::ALL.len();
const RX_DEPTH: usize = 4;
const SENT_DEPTH: usize = 32;

/// Sources that assert the USB interrupt line.
const IRQ_SOURCES: u32 = FRAME | EP_FAST | EP_SLOW | DEV_STAT;

/// One packet as seen on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentPacket {
    pub endpoint: Endpoint,
    pub data: Vec<u8, SIM_MAX_PACKET>,
}

#[derive(Clone, Debug)]
struct RxPacket {
    data: Vec<u8, SIM_MAX_PACKET>,
    setup: bool,
}

pub struct SimPeripheral {
    dev_int_st: u32,
    dev_int_en: u32,
    ep_int_st: u32,
    ep_int_en: u32,
    re_ep: u32,
    ep_ind: u32,
    max_packet: [Option<u16>; ENDPOINTS],
    ctrl: u32,

    command: u8,
    cmd_data: u32,
    selected: Option<Endpoint>,

    rx: [Deque<RxPacket, RX_DEPTH>; ENDPOINTS],
    rx_cursor: usize,
    tx: Vec<u8, SIM_MAX_PACKET>,
    tx_len: usize,

    device_status: u8,
    address: Option<u8>,
    configured: bool,
    stalled: u32,

    sent: Deque<SentPacket, SENT_DEPTH>,
    clear_buffers: usize,
    validates: usize,
    hold_interrupt_in: bool,
}

impl Default for SimPeripheral {
    fn default() -> Self {
        Self::new()
    }
}

impl SimPeripheral {
    pub fn new() -> Self {
        Self {
            dev_int_st: 0,
            dev_int_en: 0,
            ep_int_st: 0,
            ep_int_en: 0,
            re_ep: 0,
            ep_ind: 0,
            max_packet: [None; ENDPOINTS],
            ctrl: 0,
            command: 0,
            cmd_data: 0,
            selected: None,
            rx: core::array::from_fn(|_| Deque::new()),
            rx_cursor: 0,
            tx: Vec::new(),
            tx_len: 0,
            device_status: 0,
            address: None,
            configured: false,
            stalled: 0,
            sent: Deque::new(),
            clear_buffers: 0,
            validates: 0,
            hold_interrupt_in: false,
        }
    }

    // ---- host side ----

    /// Deliver a SETUP packet on EP0 OUT.
    ///
    /// SETUP is always accepted: it overwrites any unread EP0 OUT data and
    /// clears a control-pipe stall.
    pub fn host_setup(&mut self, packet: [u8; 8]) {
        self.stalled &= !(Endpoint::ControlOut.mask() | Endpoint::ControlIn.mask());
        let queue = &mut self.rx[Endpoint::ControlOut.physical() as usize];
        queue.clear();
        let _ = queue.push_back(RxPacket {
            data: Vec::from_slice(&packet).unwrap_or_default(),
            setup: true,
        });
        self.raise(Endpoint::ControlOut);
    }

    /// Deliver a data packet on an OUT endpoint. Data past one packet is cut off.
    pub fn host_out(&mut self, ep: Endpoint, data: &[u8]) {
        let data = &data[..data.len().min(SIM_MAX_PACKET)];
        let _ = self.rx[ep.physical() as usize].push_back(RxPacket {
            data: Vec::from_slice(data).unwrap_or_default(),
            setup: false,
        });
        self.raise(ep);
    }

    /// Signal a bus reset: address, configuration, stalls and pending
    /// endpoint traffic are dropped.
    pub fn host_bus_reset(&mut self) {
        self.address = None;
        self.configured = false;
        self.stalled = 0;
        self.ep_int_st = 0;
        self.dev_int_st &= !EP_SLOW;
        for queue in self.rx.iter_mut() {
            queue.clear();
        }
        self.device_status |= DS_RST;
        self.dev_int_st |= DEV_STAT;
    }

    /// When held, interrupt-IN packets stay unacknowledged until
    /// [`host_ack_in`](Self::host_ack_in).
    pub fn hold_interrupt_in(&mut self, hold: bool) {
        self.hold_interrupt_in = hold;
    }

    /// Host acknowledges an IN packet.
    pub fn host_ack_in(&mut self, ep: Endpoint) {
        self.raise(ep);
    }

    /// Oldest packet the device put on the wire.
    pub fn pop_sent(&mut self) -> Option<SentPacket> {
        self.sent.pop_front()
    }

    /// `true` while an enabled source asserts the interrupt line.
    pub fn irq_pending(&self) -> bool {
        self.dev_int_st & self.dev_int_en & IRQ_SOURCES != 0
    }

    pub fn is_connected(&self) -> bool {
        self.device_status & DS_CON != 0
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn address(&self) -> Option<u8> {
        self.address
    }

    pub fn is_stalled(&self, ep: Endpoint) -> bool {
        self.stalled & ep.mask() != 0
    }

    /// Max packet size of a realized endpoint.
    pub fn realized(&self, ep: Endpoint) -> Option<u16> {
        if self.re_ep & ep.mask() == 0 {
            return None;
        }
        self.max_packet[ep.physical() as usize]
    }

    pub fn endpoint_event_enabled(&self, ep: Endpoint) -> bool {
        self.ep_int_en & ep.mask() != 0
    }

    pub fn clear_buffer_count(&self) -> usize {
        self.clear_buffers
    }

    pub fn validate_count(&self) -> usize {
        self.validates
    }

    // ---- controller side ----

    fn raise(&mut self, ep: Endpoint) {
        self.ep_int_st |= ep.mask();
        self.summarise();
    }

    fn summarise(&mut self) {
        if self.ep_int_st & self.ep_int_en != 0 {
            self.dev_int_st |= EP_SLOW;
        }
    }

    fn rx_endpoint(&self) -> Option<Endpoint> {
        if self.ctrl & RD_EN == 0 {
            return None;
        }
        Endpoint::from_physical((((self.ctrl >> 2) & 0x0F) as u8) << 1)
    }

    fn rx_front(&self) -> Option<&RxPacket> {
        let ep = self.rx_endpoint()?;
        self.rx[ep.physical() as usize].front()
    }

    fn select_status(&self, ep: Endpoint) -> u8 {
        let mut status = 0;
        if let Some(front) = self.rx[ep.physical() as usize].front() {
            status |= SE_FE;
            if front.setup {
                status |= SE_STP;
            }
        }
        if self.is_stalled(ep) {
            status |= SE_ST;
        }
        status
    }

    fn command_phase(&mut self, code: u8) {
        self.command = code;
        match code {
            0x00..=0x05 => self.selected = Endpoint::from_physical(code),
            0x40..=0x45 => self.selected = Endpoint::from_physical(code - 0x40),
            CMD_CLEAR_BUFFER => {
                if let Some(ep) = self.selected {
                    self.rx[ep.physical() as usize].pop_front();
                }
                self.rx_cursor = 0;
                self.clear_buffers += 1;
            }
            CMD_VALIDATE_BUFFER => self.validate(),
            _ => {}
        }
        self.dev_int_st |= CCEMPTY;
    }

    fn write_phase(&mut self, data: u8) {
        match self.command {
            CMD_DEVICE_STATUS => {
                self.device_status = (self.device_status & !DS_CON) | (data & DS_CON);
            }
            CMD_SET_ADDRESS => {
                self.address = (data & DSA_DEV_EN != 0).then_some(data & 0x7F);
            }
            CMD_CONFIGURE_DEVICE => self.configured = data & CONF_DEVICE != 0,
            code @ 0x40..=0x45 => {
                if let Some(ep) = Endpoint::from_physical(code - 0x40) {
                    if data & SES_CND_ST != 0 {
                        self.stalled |= Endpoint::ControlOut.mask() | Endpoint::ControlIn.mask();
                    } else if data & SES_ST != 0 {
                        self.stalled |= ep.mask();
                    } else {
                        self.stalled &= !ep.mask();
                    }
                }
            }
            _ => {}
        }
        self.dev_int_st |= CCEMPTY;
    }

    fn read_phase(&mut self, code: u8) {
        self.cmd_data = match code {
            CMD_DEVICE_STATUS => {
                let status = self.device_status;
                self.device_status &= !(DS_RST | DS_CON_CH | DS_SUS_CH);
                status as u32
            }
            0x00..=0x05 | 0x40..=0x45 => match self.selected {
                Some(ep) => self.select_status(ep) as u32,
                None => 0,
            },
            _ => 0,
        };
        self.dev_int_st |= CDFULL;
    }

    fn validate(&mut self) {
        self.validates += 1;
        let Some(ep) = self.selected else {
            return;
        };
        if self.sent.is_full() {
            self.sent.pop_front();
        }
        let _ = self.sent.push_back(SentPacket {
            endpoint: ep,
            data: core::mem::take(&mut self.tx),
        });
        if ep.is_control() || !self.hold_interrupt_in {
            self.raise(ep);
        }
    }
}

impl UsbRegisters for SimPeripheral {
    fn read(&mut self, reg: Reg) -> u32 {
        match reg {
            Reg::DevIntSt => self.dev_int_st,
            Reg::DevIntEn => self.dev_int_en,
            Reg::EpIntSt => self.ep_int_st,
            Reg::EpIntEn => self.ep_int_en,
            Reg::ReEp => self.re_ep,
            Reg::EpInd => self.ep_ind,
            Reg::Ctrl => self.ctrl,
            Reg::CmdData => self.cmd_data,
            Reg::RxPLen => match self.rx_front() {
                Some(packet) => PKT_RDY | DV | (packet.data.len() as u32 & PKT_LNGTH_MASK),
                None => 0,
            },
            Reg::RxData => {
                let cursor = self.rx_cursor;
                let word = match self.rx_front() {
                    Some(packet) => packet
                        .data
                        .iter()
                        .skip(cursor)
                        .take(4)
                        .enumerate()
                        .fold(0u32, |acc, (i, &b)| acc | (b as u32) << (i * 8)),
                    None => 0,
                };
                self.rx_cursor += 4;
                word
            }
            _ => 0,
        }
    }

    fn write(&mut self, reg: Reg, value: u32) {
        match reg {
            Reg::DevIntEn => self.dev_int_en = value,
            Reg::DevIntClr => {
                self.dev_int_st &= !value;
                if value & EP_SLOW != 0 {
                    self.summarise();
                }
            }
            Reg::EpIntEn => {
                self.ep_int_en = value;
                self.summarise();
            }
            Reg::EpIntClr => {
                self.ep_int_st &= !value;
                let ep = Endpoint::ALL.into_iter().find(|ep| value & ep.mask() != 0);
                self.selected = ep;
                self.cmd_data = ep.map_or(0, |ep| self.select_status(ep) as u32);
                self.dev_int_st |= CDFULL;
            }
            Reg::ReEp => self.re_ep = value,
            Reg::EpInd => self.ep_ind = value,
            Reg::MaxPSize => {
                if let Some(slot) = self.max_packet.get_mut(self.ep_ind as usize) {
                    *slot = Some((value & PKT_LNGTH_MASK) as u16);
                }
                self.dev_int_st |= EP_RLZED;
            }
            Reg::Ctrl => {
                self.ctrl = value;
                if value & RD_EN != 0 {
                    self.rx_cursor = 0;
                }
                if value & WR_EN != 0 {
                    self.tx.clear();
                }
            }
            Reg::TxPLen => {
                self.tx.clear();
                self.tx_len = (value & PKT_LNGTH_MASK) as usize;
            }
            Reg::TxData => {
                for byte in value.to_le_bytes() {
                    if self.tx.len() >= self.tx_len {
                        break;
                    }
                    let _ = self.tx.push(byte);
                }
            }
            Reg::CmdCode => {
                let phase = (value >> 8) & 0xFF;
                let data = (value >> 16) as u8;
                match phase {
                    0x05 => self.command_phase(data),
                    0x01 => self.write_phase(data),
                    0x02 => self.read_phase(data),
                    _ => {}
                }
            }
            _ => {}
        }
    }
}
