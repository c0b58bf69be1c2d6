//! HID class tests against the simulated controller.
//!
//! A second thread plays the interrupt context: it services the USB line
//! while the test thread makes blocking report calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::vec::Vec;

use super::keymap::SHIFT;
use super::{Pointer, ReportFlags, UsbHid, BUTTON_LEFT, BUTTON_RIGHT};
use crate::error::Error;
use crate::usb::sim::SimPeripheral;
use crate::usb::{DeviceState, Endpoint, SpinLimit};

fn hid(flags: &ReportFlags) -> UsbHid<'_, SimPeripheral> {
    UsbHid::new(SimPeripheral::new(), flags, SpinLimit::Polls(100_000))
}

fn pump(hid: &UsbHid<'_, SimPeripheral>) {
    while hid.with_peripheral(|p| p.irq_pending()) {
        hid.on_interrupt();
    }
}

fn setup(hid: &UsbHid<'_, SimPeripheral>, packet: [u8; 8]) {
    hid.with_peripheral(|p| p.host_setup(packet));
    pump(hid);
}

/// Everything sent so far, as (endpoint, bytes).
fn drain(hid: &UsbHid<'_, SimPeripheral>) -> Vec<(Endpoint, Vec<u8>)> {
    hid.with_peripheral(|p| {
        let mut out = Vec::new();
        while let Some(packet) = p.pop_sent() {
            out.push((packet.endpoint, packet.data.to_vec()));
        }
        out
    })
}

fn reports(hid: &UsbHid<'_, SimPeripheral>) -> Vec<Vec<u8>> {
    drain(hid)
        .into_iter()
        .filter(|(ep, _)| *ep == Endpoint::InterruptIn)
        .map(|(_, data)| data)
        .collect()
}

fn enumerate(hid: &UsbHid<'_, SimPeripheral>) {
    hid.connect();
    hid.with_peripheral(|p| p.host_bus_reset());
    pump(hid);
    setup(hid, [0x00, 0x05, 0x01, 0, 0, 0, 0, 0]);
    setup(hid, [0x00, 0x09, 0x01, 0, 0, 0, 0, 0]);
    drain(hid);
}

struct StopOnDrop<'a>(&'a AtomicBool);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Run `app` while another thread services the interrupt line.
fn with_isr<T>(hid: &UsbHid<'_, SimPeripheral>, app: impl FnOnce() -> T) -> T {
    let stop = AtomicBool::new(false);
    std::thread::scope(|s| {
        s.spawn(|| {
            while !stop.load(Ordering::Acquire) {
                pump(hid);
                std::thread::yield_now();
            }
        });
        let _stop = StopOnDrop(&stop);
        app()
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Class requests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn configuration_realizes_interrupt_endpoint() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    assert!(hid.is_configured());
    assert_eq!(hid.state(), DeviceState::Configured);
    assert_eq!(hid.with_peripheral(|p| p.realized(Endpoint::InterruptIn)), Some(64));
    assert!(hid.with_peripheral(|p| p.endpoint_event_enabled(Endpoint::InterruptIn)));
}

#[test]
fn bus_reset_clears_configured() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    hid.with_peripheral(|p| p.host_bus_reset());
    pump(&hid);
    assert!(!hid.is_configured());
    assert_eq!(hid.state(), DeviceState::Default);
}

#[test]
fn report_descriptor_is_served() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    // GET_DESCRIPTOR(Report) to interface 0, 121 bytes: 64 + 57.
    setup(&hid, [0x81, 0x06, 0x00, 0x22, 0x00, 0x00, 0x79, 0x00]);
    let sent = drain(&hid);
    let data: Vec<u8> = sent
        .iter()
        .filter(|(ep, _)| *ep == Endpoint::ControlIn)
        .flat_map(|(_, d)| d.iter().copied())
        .collect();
    assert_eq!(data.as_slice(), &super::descriptors::REPORT_DESCRIPTOR[..]);
}

#[test]
fn hid_descriptor_is_served_from_configuration_bundle() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    setup(&hid, [0x81, 0x06, 0x00, 0x21, 0x00, 0x00, 0x09, 0x00]);
    let sent = drain(&hid);
    assert_eq!(sent[0].1, super::descriptors::HID_DESCRIPTOR);
}

#[test]
fn string_descriptor_stalls() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    setup(&hid, [0x80, 0x06, 0x01, 0x03, 0x09, 0x04, 0xFF, 0x00]);
    assert!(hid.with_peripheral(|p| p.is_stalled(Endpoint::ControlOut)));
    assert!(drain(&hid).is_empty());
}

#[test]
fn set_report_stores_led_state() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);
    assert_eq!(hid.keyboard_leds(), 0);

    // SET_REPORT(Output, id 1), two bytes: report ID + Caps Lock.
    setup(&hid, [0x21, 0x09, 0x01, 0x02, 0x00, 0x00, 0x02, 0x00]);
    hid.with_peripheral(|p| p.host_out(Endpoint::ControlOut, &[0x01, 0x02]));
    pump(&hid);

    assert_eq!(hid.keyboard_leds(), super::keyboard::LED_CAPS_LOCK);
    let sent = drain(&hid);
    assert_eq!(sent, [(Endpoint::ControlIn, Vec::new())]);
}

#[test]
fn set_report_for_mouse_id_stalls() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    setup(&hid, [0x21, 0x09, 0x02, 0x02, 0x00, 0x00, 0x01, 0x00]);
    assert!(hid.with_peripheral(|p| p.is_stalled(Endpoint::ControlOut)));
}

#[test]
fn oversized_set_report_stalls() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    setup(&hid, [0x21, 0x09, 0x01, 0x02, 0x00, 0x00, 0x10, 0x00]);
    assert!(hid.with_peripheral(|p| p.is_stalled(Endpoint::ControlOut)));
}

// ═══════════════════════════════════════════════════════════════════════════
// Input reports
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn oversized_report_is_rejected_before_any_write() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);
    let before = hid.with_peripheral(|p| p.validate_count());

    assert_eq!(hid.send_input_report(1, None, 9), Err(Error::TransferSize));
    assert_eq!(hid.with_peripheral(|p| p.validate_count()), before);
}

#[test]
fn short_payload_is_rejected() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    assert_eq!(hid.send_input_report(2, Some(&[1, 2]), 4), Err(Error::TransferSize));
    assert!(reports(&hid).is_empty());
}

#[test]
fn absent_payload_sends_zeros() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    with_isr(&hid, || hid.send_input_report(7, None, 3)).unwrap();
    assert_eq!(reports(&hid), [vec![7, 0, 0, 0]]);
}

#[test]
fn shifted_character_sets_modifier() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    with_isr(&hid, || hid.keyboard_char('A')).unwrap();
    assert_eq!(
        reports(&hid),
        [
            vec![1, SHIFT, 0, 0x04, 0, 0, 0, 0, 0],
            vec![1, 0, 0, 0, 0, 0, 0, 0, 0],
        ]
    );
}

#[test]
fn unmapped_character_sends_nothing() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    assert_eq!(hid.keyboard_char('€'), Err(Error::UnmappedCharacter));
    assert!(reports(&hid).is_empty());
}

#[test]
fn keyless_control_character_sends_empty_reports() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    with_isr(&hid, || hid.keyboard_char('\x1b')).unwrap();
    assert_eq!(reports(&hid), vec![vec![1, 0, 0, 0, 0, 0, 0, 0, 0]; 2]);
}

#[test]
fn string_stops_at_nul_and_at_first_failure() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    with_isr(&hid, || hid.keyboard_str("hi\0ignored")).unwrap();
    assert_eq!(reports(&hid).len(), 4);

    let result = with_isr(&hid, || hid.keyboard_str("ok€no"));
    assert_eq!(result, Err(Error::UnmappedCharacter));
    assert_eq!(reports(&hid).len(), 4);
}

// ═══════════════════════════════════════════════════════════════════════════
// Pointer
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn pointer_splits_large_moves() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    with_isr(&hid, || Pointer::new(&hid).move_by(300, -200)).unwrap();
    assert_eq!(
        reports(&hid),
        [
            vec![2, 0, 127, 0, 0],
            vec![2, 0, 127, 0, 0],
            vec![2, 0, 0, (-128i8) as u8, 0],
            vec![2, 0, 46, (-72i8) as u8, 0],
        ]
    );
}

#[test]
fn pointer_keeps_buttons_between_calls() {
    let flags = ReportFlags::new();
    let hid = hid(&flags);
    enumerate(&hid);

    with_isr(&hid, || {
        let mut pointer = Pointer::new(&hid);
        pointer.set_buttons(true, false, true)?;
        assert_eq!(pointer.buttons(), BUTTON_LEFT | BUTTON_RIGHT);
        pointer.scroll(-3)
    })
    .unwrap();

    assert_eq!(
        reports(&hid),
        [vec![2, 0x03, 0, 0, 0], vec![2, 0x03, 0, 0, (-3i8) as u8]]
    );
}
