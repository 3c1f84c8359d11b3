//! Security-group reconciler
//!
//! New groups are attached before old ones are detached so the instance is
//! never left without rules. Every call is gated by a RUNNING wait.

use async_trait::async_trait;
use cumulus_core::context::OperationContext;

use crate::error::ScpResult;

/// Membership change between two security-group lists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl MembershipDelta {
    /// `add = new \ old`, `remove = old \ new`, both in input order
    pub fn between(old: &[String], new: &[String]) -> Self {
        Self {
            add: new.iter().filter(|g| !old.contains(g)).cloned().collect(),
            remove: old.iter().filter(|g| !new.contains(g)).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Instance whose security groups are reconciled
#[async_trait]
pub trait SecurityGroupTarget: Send + Sync {
    async fn attach_security_group(&self, ctx: &OperationContext, id: &str) -> ScpResult<()>;
    async fn detach_security_group(&self, ctx: &OperationContext, id: &str) -> ScpResult<()>;
    async fn wait_running(&self, ctx: &OperationContext) -> ScpResult<()>;
}

pub async fn reconcile(
    target: &dyn SecurityGroupTarget,
    ctx: &OperationContext,
    old: &[String],
    new: &[String],
) -> ScpResult<()> {
    let delta = MembershipDelta::between(old, new);
    for id in &delta.add {
        log::info!("attaching security group {}", id);
        target.attach_security_group(ctx, id).await?;
        target.wait_running(ctx).await?;
    }
    for id in &delta.remove {
        log::info!("detaching security group {}", id);
        target.detach_security_group(ctx, id).await?;
        target.wait_running(ctx).await?;
    }
    Ok(())
}
