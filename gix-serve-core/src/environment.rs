//! Subprocess environment management.
//!
//! This module builds the variables layered on top of the inherited host environment
//! when running `git`. Some of them are not meant for `git` itself but for the hooks it
//! runs as children, which is how a push is correlated with the principal performing it.

use crate::protocol::is_safe_protocol_header;
use crate::ServiceKind;

/// Names the repository a push goes to. Only set for authenticated pushes.
pub const ENV_REPO_UID: &str = "GITRPC_REPO_UID";
/// Names the principal performing a push. Only set for authenticated pushes.
pub const ENV_PUSHER_ID: &str = "GITRPC_PUSHER_ID";
/// Names the service `git` runs for, so hooks can tell which operation triggered them.
pub const ENV_SERVICE: &str = "SSH_ORIGINAL_COMMAND";
/// The protocol selection forwarded to `git`.
pub const ENV_GIT_PROTOCOL: &str = "GIT_PROTOCOL";

/// An ordered list of variables to set on top of the inherited environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubprocessEnvironment {
    vars: Vec<(String, String)>,
}

impl SubprocessEnvironment {
    /// The environment for a ref advertisement, which only forwards a safe `protocol`.
    pub fn for_advertisement(protocol: Option<&str>) -> Self {
        let mut env = Self::default();
        env.push_protocol(protocol);
        env
    }

    /// Iterate over all `(key, value)` pairs in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Return the value of `key` if it is set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.iter().find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Return `true` if `key` is set.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Return the number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Return `true` if no variable is set.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Render all variables as `KEY=VALUE`.
    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    fn push(&mut self, key: &str, value: impl Into<String>) {
        self.vars.push((key.to_owned(), value.into()));
    }

    fn push_protocol(&mut self, protocol: Option<&str>) {
        match protocol.filter(|p| !p.is_empty()) {
            Some(protocol) if is_safe_protocol_header(protocol) => self.push(ENV_GIT_PROTOCOL, protocol),
            Some(protocol) => {
                tracing::debug!(protocol = ?protocol, "dropping malformed git protocol header");
            }
            None => {}
        }
    }
}

impl IntoIterator for SubprocessEnvironment {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.into_iter()
    }
}

/// Builder for the environment of a `git <service> --stateless-rpc` invocation.
#[derive(Debug, Clone)]
pub struct EnvironmentBuilder {
    service: ServiceKind,
    repo_uid: String,
    protocol: Option<String>,
    principal_id: Option<String>,
}

impl EnvironmentBuilder {
    /// Create a new builder for `service` operating on the repository identified by `repo_uid`.
    pub fn new(service: ServiceKind, repo_uid: impl Into<String>) -> Self {
        Self {
            service,
            repo_uid: repo_uid.into(),
            protocol: None,
            principal_id: None,
        }
    }

    /// Set the protocol header as sent by the client. It is validated only when building.
    pub fn with_protocol(mut self, protocol: Option<impl Into<String>>) -> Self {
        self.protocol = protocol.map(Into::into);
        self
    }

    /// Set the principal on whose behalf the operation runs.
    pub fn with_principal(mut self, principal_id: Option<impl Into<String>>) -> Self {
        self.principal_id = principal_id.map(Into::into);
        self
    }

    /// Build the variables, in order:
    ///
    /// 1. push correlation, only for `receive-pack` with a principal,
    /// 2. the service marker,
    /// 3. the protocol header, only if it passes [`is_safe_protocol_header()`].
    ///
    /// A protocol header failing validation is dropped, which forfeits protocol negotiation
    /// but never fails the call.
    pub fn build(self) -> SubprocessEnvironment {
        let mut env = SubprocessEnvironment::default();
        if let (ServiceKind::ReceivePack, Some(principal_id)) =
            (self.service, self.principal_id.filter(|p| !p.is_empty()))
        {
            env.push(ENV_REPO_UID, self.repo_uid);
            env.push(ENV_PUSHER_ID, principal_id);
        }
        env.push(ENV_SERVICE, self.service.as_str());
        env.push_protocol(self.protocol.as_deref());
        env
    }
}
