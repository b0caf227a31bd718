//! The messages exchanged with the transport and the traits it implements.

use std::io;

use gix_serve_core::stream::ChunkSource;

/// Request of a ref advertisement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InfoRefsRequest {
    /// The repository to advertise.
    pub repo_uid: String,
    /// The service to advertise for, `upload-pack` or `receive-pack`.
    pub service: String,
    /// The protocol header sent by the client, if any.
    pub git_protocol: Option<String>,
}

/// A message of the client half of a service-pack exchange.
///
/// The first message carries the metadata and no data, all following ones carry only data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServicePackRequest {
    /// The repository to operate on.
    pub repo_uid: String,
    /// The service to run, `upload-pack` or `receive-pack`.
    pub service: String,
    /// The protocol header sent by the client, if any.
    pub git_protocol: Option<String>,
    /// The authenticated principal, present for write operations only.
    pub principal_id: Option<String>,
    /// A chunk of the request body.
    pub data: Vec<u8>,
}

impl ServicePackRequest {
    /// A data-only message carrying `data`.
    pub fn with_data(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }
}

/// The receiving half of a service-pack exchange.
pub trait RequestStream {
    /// Block until the next message arrives and return it, or `None` once the client
    /// finished sending.
    fn recv(&mut self) -> io::Result<Option<ServicePackRequest>>;
}

impl<F> RequestStream for F
where
    F: FnMut() -> io::Result<Option<ServicePackRequest>>,
{
    fn recv(&mut self) -> io::Result<Option<ServicePackRequest>> {
        self()
    }
}

/// The request body of an exchange: the data of every message after the first.
pub(crate) struct Payloads<R>(pub R);

impl<R: RequestStream> ChunkSource for Payloads<R> {
    fn recv(&mut self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.0.recv()?.map(|msg| msg.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_only_carry_data() {
        let mut messages = vec![
            ServicePackRequest::with_data(*b"0032want"),
            ServicePackRequest {
                repo_uid: "ignored".into(),
                data: b"0000".to_vec(),
                ..Default::default()
            },
        ]
        .into_iter();
        let mut payloads = Payloads(move || Ok::<_, io::Error>(messages.next()));
        assert_eq!(payloads.recv().unwrap(), Some(b"0032want".to_vec()));
        assert_eq!(payloads.recv().unwrap(), Some(b"0000".to_vec()));
        assert_eq!(payloads.recv().unwrap(), None);
    }
}
