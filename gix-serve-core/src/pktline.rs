//! pkt-line framing for the advertisement preface.
//!
//! Only encoding is needed here: the bridge prefixes the ref advertisement with a
//! service announcement and otherwise relays `git`'s output verbatim.

use gix_packetline_blocking as pkt;

/// The largest payload a single pkt-line can carry: `0xffff` minus the four header bytes
/// and the twelve bytes git reserves.
pub const MAX_DATA_LEN: usize = 65516;

/// The flush packet, marking an explicit stream boundary.
pub const FLUSH: &[u8; 4] = b"0000";

/// Frame `line` as a single pkt-line: four lowercase hex digits holding the length of
/// `line` plus the header itself, followed by `line` verbatim.
///
/// Unlike [`gix_packetline_blocking::encode::data_to_write()`] an empty `line` is permitted and
/// yields `0004`.
pub fn encode(line: impl AsRef<[u8]>) -> Result<Vec<u8>, crate::Error> {
    let line = line.as_ref();
    if line.len() > MAX_DATA_LEN {
        return Err(crate::Error::Protocol(format!(
            "pkt-line payload of {} bytes exceeds the limit of {MAX_DATA_LEN} bytes",
            line.len()
        )));
    }
    let mut out = Vec::with_capacity(line.len() + 4);
    out.extend_from_slice(format!("{:04x}", line.len() + 4).as_bytes());
    out.extend_from_slice(line);
    Ok(out)
}

/// Write a flush packet.
pub fn write_flush(out: impl std::io::Write) -> std::io::Result<()> {
    pkt::encode::flush_to_write(out).map(|_| ())
}

/// The preface of a smart-HTTP ref advertisement for `service`: the
/// `# service=git-<service>` announcement followed by a flush packet.
pub fn service_preface(service: crate::ServiceKind) -> Result<Vec<u8>, crate::Error> {
    let mut out = encode(format!("# service=git-{service}\n"))?;
    write_flush(&mut out)?;
    Ok(out)
}
