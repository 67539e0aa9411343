//! OneWire server message catalog only (default port 5234 in its own
//! namespace) — no driver logic, per spec.md §1's explicit exclusion of the
//! 1-Wire bus itself. Grounded on
//! `original_source/OneWireServer/api/one_wire_server.h`'s
//! `OneWireReqMsgHeader`/`OneWireResult` and spec.md §6.2's description of
//! DS2408 (PIO)/DS2438 (battery monitor) operations; the entries file itself
//! (`one_wire_msgs.h`) was not present in the retrieved source, so the
//! concrete operation list below is this crate's own minimal, spec-matching
//! set rather than a transcription.

/// Default port, named per spec.md §7 for tests/documentation; every binary
/// still takes its port as a CLI argument.
pub const DEFAULT_PORT: u16 = 5234;

/// `OneWireReqMsgHeader` — every OneWire request names the device it
/// targets by 1-Wire network port and 8-byte ROM serial number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneWireReqMsgHeader {
    pub port_number: i32,
    pub serial_number: [u8; 8],
}

impl crate::catalog::Encode for OneWireReqMsgHeader {
    fn encode(&self, out: &mut Vec<u8>) {
        crate::fabric::wire::put_i32(out, self.port_number);
        out.extend_from_slice(&self.serial_number);
    }
}
impl crate::catalog::DecodeR for OneWireReqMsgHeader {
    fn decode_r(r: &mut crate::catalog::Reader) -> anyhow::Result<Self> {
        Ok(Self { port_number: r.i32()?, serial_number: crate::catalog::DecodeR::decode_r(r)? })
    }
}

crate::declare_catalog! {
    catalog = OneWire, header = OneWireReqMsgHeader, success_cnf, no_ind;
    OneWirePioRead = 0, OneWirePioReadReq, OneWirePioReadCnf {
        req {},
        cnf { pio_state: u8 }
    };
    OneWirePioWrite = 1, OneWirePioWriteReq, OneWirePioWriteCnf {
        req { pio_state: u8 },
        cnf {}
    };
    OneWireBatteryMonitorRead = 2, OneWireBatteryMonitorReadReq, OneWireBatteryMonitorReadCnf {
        req {},
        cnf { voltage: u16, current: i16, temperature: i16 }
    };
}
