//! The hook side of the environment contract.
//!
//! Hooks run as children of `git` and only see what was put into the environment by
//! [`EnvironmentBuilder`](crate::environment::EnvironmentBuilder). This module reads it
//! back into a structured context. Deciding what to allow stays with the hook.

use crate::environment::{ENV_PUSHER_ID, ENV_REPO_UID, ENV_SERVICE};
use crate::ServiceKind;

/// Correlates a push with the repository it targets and the principal performing it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PushCorrelation {
    /// The repository identifier as addressed by the caller.
    pub repo_uid: String,
    /// The authenticated principal.
    pub principal_id: String,
}

/// What a hook knows about the operation that triggered it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HookContext {
    /// The service `git` was started for, if it was started by the bridge.
    pub service: Option<ServiceKind>,
    /// Set only for authenticated pushes. Its absence means there is no push-correlation context.
    pub push: Option<PushCorrelation>,
}

impl HookContext {
    /// Read the context from the environment of the current process.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))))
    }

    /// Read the context from `vars`, as `(key, value)` pairs.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut service = None;
        let mut repo_uid = None;
        let mut principal_id = None;
        for (key, value) in vars {
            match key.as_ref() {
                ENV_SERVICE => service = ServiceKind::from_name(&Into::<String>::into(value)),
                ENV_REPO_UID => repo_uid = Some(value.into()),
                ENV_PUSHER_ID => principal_id = Some(value.into()),
                _ => {}
            }
        }
        let push = match (repo_uid, principal_id) {
            (Some(repo_uid), Some(principal_id)) if !repo_uid.is_empty() && !principal_id.is_empty() => {
                Some(PushCorrelation { repo_uid, principal_id })
            }
            _ => None,
        };
        Self { service, push }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentBuilder;

    #[test]
    fn reads_back_what_the_builder_produced() {
        let env = EnvironmentBuilder::new(ServiceKind::ReceivePack, "r1")
            .with_principal(Some("p1"))
            .build();
        let ctx = HookContext::from_vars(env);
        assert_eq!(ctx.service, Some(ServiceKind::ReceivePack));
        assert_eq!(
            ctx.push,
            Some(PushCorrelation {
                repo_uid: "r1".into(),
                principal_id: "p1".into()
            })
        );
    }

    #[test]
    fn missing_or_partial_correlation_means_none() {
        let ctx = HookContext::from_vars([(ENV_SERVICE, "receive-pack"), (ENV_REPO_UID, "r1")]);
        assert_eq!(ctx.service, Some(ServiceKind::ReceivePack));
        assert_eq!(ctx.push, None);

        let ctx = HookContext::from_vars([(ENV_REPO_UID, "r1"), (ENV_PUSHER_ID, "")]);
        assert_eq!(ctx.push, None);
    }

    #[test]
    fn unrelated_environment_yields_empty_context() {
        let ctx = HookContext::from_vars([("PATH", "/usr/bin"), (ENV_SERVICE, "git-upload-archive")]);
        assert_eq!(ctx, HookContext::default());
    }
}
