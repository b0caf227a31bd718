//! Server-side service kinds and the protocol-header allow-list.

use once_cell::sync::Lazy;
use regex::Regex;

/// The kind of server-side service to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ServiceKind {
    /// Upload-pack: fetch/clone.
    UploadPack,
    /// Receive-pack: push.
    ReceivePack,
}

impl ServiceKind {
    /// The name of the service as it appears on the wire and as `git` sub-command.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::UploadPack => "upload-pack",
            ServiceKind::ReceivePack => "receive-pack",
        }
    }

    /// Parse a wire name like `upload-pack`. The `git-` prefixed form used in
    /// HTTP query strings is accepted as well.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.strip_prefix("git-").unwrap_or(name) {
            "upload-pack" => Some(ServiceKind::UploadPack),
            "receive-pack" => Some(ServiceKind::ReceivePack),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| crate::Error::Validation(format!("unsupported service {s:?}")))
    }
}

static SAFE_GIT_PROTOCOL_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-zA-Z]+=[0-9a-zA-Z]+(:[0-9a-zA-Z]+=[0-9a-zA-Z]+)*$").expect("valid pattern")
});

/// Return `true` if `header`, as received in a `Git-Protocol` request header, may be passed
/// to `git` as `GIT_PROTOCOL`.
///
/// The value is network supplied; anything but `key=value` pairs of ASCII alphanumerics
/// joined by `:` is refused.
pub fn is_safe_protocol_header(header: &str) -> bool {
    SAFE_GIT_PROTOCOL_HEADER.is_match(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_names_roundtrip_through_their_wire_form() {
        for kind in [ServiceKind::UploadPack, ServiceKind::ReceivePack] {
            assert_eq!(ServiceKind::from_name(kind.as_str()), Some(kind));
            assert_eq!(kind.to_string().parse::<ServiceKind>().unwrap(), kind);
        }
        assert_eq!(ServiceKind::from_name("git-receive-pack"), Some(ServiceKind::ReceivePack));
    }

    #[test]
    fn unknown_services_are_refused() {
        for name in ["", "upload-archive", "git-", "upload-pack ", "--upload-pack", "UPLOAD-PACK"] {
            assert!(ServiceKind::from_name(name).is_none(), "{name:?}");
        }
        assert!(matches!(
            "config".parse::<ServiceKind>(),
            Err(crate::Error::Validation(msg)) if msg.contains("config")
        ));
    }

    #[test]
    fn well_formed_protocol_headers_are_accepted() {
        for header in ["version=2", "version=1", "a=b:c=d", "version=2:object0format=sha256"] {
            assert!(is_safe_protocol_header(header), "{header:?}");
        }
    }

    #[test]
    fn malformed_protocol_headers_are_refused() {
        for header in [
            "",
            "version",
            "version=",
            "=2",
            "version=2:",
            ":version=2",
            "version=2\nGIT_DIR=/tmp",
            "version=2 ",
            "version=2;rm -rf",
            "version=2::a=b",
            "object-format=sha256",
            "version=2=3",
            "vérsion=2",
        ] {
            assert!(!is_safe_protocol_header(header), "{header:?}");
        }
    }
}
