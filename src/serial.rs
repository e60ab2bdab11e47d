//!
//! Serial over USB.
//!
//! The USB interrupt keeps the device alive with [`UsbSerial::poll`]; the main
//! loop moves bytes through a [`SerialLink`].  Outgoing frames wait in a
//! bounded queue until the host takes them, so a slow host loses whole frames
//! and never the tail of one.
//!

use heapless::Deque;
use rtic::Mutex;
use teensy4_bsp::hal::usbd::{BusAdapter, EndpointMemory, EndpointState, Speed};
use usb_device::{
    bus::UsbBusAllocator,
    device::{UsbDevice, UsbDeviceBuilder, UsbDeviceState},
};
use usbd_serial::{SerialPort, UsbError};

use swarmnode_common::{ByteSink, ByteSource, FrameQueue};

use crate::config::{SERIAL_TX_LEN, USB_MANUFACTURER, USB_PRODUCT, VID_PID};

/// Full speed keeps the bulk packets at 64 bytes.
pub const SPEED: Speed = Speed::Full;
/// Largest bulk packet.
pub const PACKET_LEN: usize = 64;

/// This allocation is shared across all USB endpoints. It needs to be large
/// enough to hold the maximum packet size for *all* endpoints.
pub static EP_MEMORY: EndpointMemory<1024> = EndpointMemory::new();
/// This manages the endpoints.
pub static EP_STATE: EndpointState = EndpointState::max_endpoints();

pub type Bus = BusAdapter;

pub struct UsbSerial {
    device: UsbDevice<'static, Bus>,
    class: SerialPort<'static, Bus>,
    configured: bool,
}

impl UsbSerial {
    pub fn new(bus: &'static UsbBusAllocator<Bus>) -> Self {
        let class = SerialPort::new(bus);
        let device = UsbDeviceBuilder::new(bus, VID_PID)
            .manufacturer(USB_MANUFACTURER)
            .product(USB_PRODUCT)
            .device_class(usbd_serial::USB_CLASS_CDC)
            .max_packet_size_0(64)
            .build();

        Self {
            device,
            class,
            configured: false,
        }
    }

    /// Service the USB device.  Called from the USB interrupt.
    pub fn poll(&mut self) {
        self.device.poll(&mut [&mut self.class]);

        if self.device.state() == UsbDeviceState::Configured {
            if !self.configured {
                self.device.bus().configure();
                log::info!("USB configured");
            }
            self.configured = true;
        } else {
            self.configured = false;
        }
    }

    /// Copy whatever has arrived into `buffer`.
    pub fn read(&mut self, buffer: &mut [u8]) -> usize {
        if !self.configured {
            return 0;
        }

        match self.class.read(buffer) {
            Ok(count) => count,
            Err(UsbError::WouldBlock) => 0,
            Err(err) => {
                log::warn!("USB read failed: {:?}", err);
                0
            }
        }
    }

    /// Hand `bytes` to the class.  Returns how many it took; with no host
    /// attached, or with the transmit buffer full, that is none.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        if !self.configured {
            return 0;
        }

        match self.class.write(bytes) {
            Ok(count) => count,
            Err(UsbError::WouldBlock) => 0,
            Err(err) => {
                log::warn!("USB write failed: {:?}", err);
                0
            }
        }
    }
}

/// The main loop's end of the serial link.
pub struct SerialLink<S> {
    usb: S,
    received: Deque<u8, PACKET_LEN>,
    transmit: FrameQueue<SERIAL_TX_LEN>,
}

impl<S: Mutex<T = UsbSerial>> SerialLink<S> {
    pub fn new(usb: S) -> Self {
        Self {
            usb,
            received: Deque::new(),
            transmit: FrameQueue::new(),
        }
    }

    /// Move as much of the transmit queue to the host as it will take.
    pub fn pump(&mut self) {
        let transmit = &mut self.transmit;
        self.usb.lock(|usb| transmit.pump(|bytes| usb.write(bytes)));
    }
}

impl<S: Mutex<T = UsbSerial>> ByteSource for SerialLink<S> {
    fn read_byte(&mut self) -> Option<u8> {
        if self.received.is_empty() {
            let mut packet = [0u8; PACKET_LEN];
            let count = self.usb.lock(|usb| usb.read(&mut packet));
            for &byte in &packet[..count] {
                // at most one packet is read into an empty queue
                let _ = self.received.push_back(byte);
            }
        }
        self.received.pop_front()
    }
}

impl<S: Mutex<T = UsbSerial>> ByteSink for SerialLink<S> {
    fn write_all(&mut self, bytes: &[u8]) {
        if self.transmit.push_frame(bytes) {
            let dropped = self.transmit.take_dropped();
            if dropped > 0 {
                log::warn!("serial queue full, dropped {} frames", dropped);
            }
        }
        self.pump();
    }
}
