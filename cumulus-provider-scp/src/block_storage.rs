//! Block-storage coordinator
//!
//! Volumes are matched by position. Existing elements keep their role and
//! type and never shrink; new elements are appended. Whether trailing
//! elements may be removed depends on the resource: cluster storage is
//! intrinsic to the cluster, external server storage is a standalone volume.
//!
//! Positions are those of the desired-state list. The remote lists the OS
//! volume first, so element `i` is remote element `i + 1`.

use async_trait::async_trait;
use cumulus_core::context::OperationContext;
use cumulus_core::diagnostic::{AttributePath, Diagnostic};

use crate::error::{ScpError, ScpResult};

/// Offset of desired-state positions within the remote volume list
pub const OS_VOLUME_OFFSET: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    /// Role of cluster storage (DATA, ARCHIVE, ...); none for server volumes
    pub role: Option<String>,
    /// Disk product name (SSD, HDD)
    pub disk_type: String,
    pub size_gb: i32,
    pub name: Option<String>,
    pub encrypted: bool,
}

/// Constraints and attribute names of one storage list
#[derive(Debug, Clone, Copy)]
pub struct Rules {
    pub attribute: &'static str,
    pub max_count: usize,
    /// Trailing elements may be dropped
    pub removable: bool,
    pub role_field: &'static str,
    pub type_field: &'static str,
    pub size_field: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Resize { index: usize, size_gb: i32 },
    Add { index: usize },
    Remove { index: usize },
}

/// Check the positional invariants and list the sub-operations, resizes
/// first, then additions, then removals from the back
pub fn plan(rules: &Rules, old: &[Volume], new: &[Volume]) -> ScpResult<Vec<Step>> {
    let mut diagnostics = Vec::new();
    let at = |i: usize, field: &str| AttributePath::root(rules.attribute).index(i).attribute(field);

    if new.len() > rules.max_count {
        diagnostics.push(
            Diagnostic::error(format!(
                "at most {} block storages are allowed, got {}",
                rules.max_count,
                new.len()
            ))
            .at(rules.attribute),
        );
    }
    if new.len() < old.len() && !rules.removable {
        diagnostics.push(
            Diagnostic::error("removing additional storage is not allowed").at(rules.attribute),
        );
    }

    for (i, (o, n)) in old.iter().zip(new).enumerate() {
        if o.role != n.role {
            diagnostics.push(
                Diagnostic::error("changing block storage role is not allowed")
                    .with_detail(format!(
                        "{} -> {}",
                        o.role.as_deref().unwrap_or("null"),
                        n.role.as_deref().unwrap_or("null")
                    ))
                    .at(at(i, rules.role_field)),
            );
        }
        if o.disk_type != n.disk_type {
            diagnostics.push(
                Diagnostic::error("changing block storage type is not allowed")
                    .with_detail(format!("{} -> {}", o.disk_type, n.disk_type))
                    .at(at(i, rules.type_field)),
            );
        }
        if n.size_gb < o.size_gb {
            diagnostics.push(
                Diagnostic::error("decreasing size is not allowed")
                    .with_detail(format!("{} -> {}", o.size_gb, n.size_gb))
                    .at(at(i, rules.size_field)),
            );
        }
        if o.name.is_some() && n.name.is_some() && o.name != n.name {
            diagnostics.push(
                Diagnostic::error("renaming block storage is not allowed").at(at(i, "name")),
            );
        }
        if o.encrypted != n.encrypted {
            diagnostics.push(
                Diagnostic::error("changing block storage encryption is not allowed")
                    .at(at(i, "encrypted")),
            );
        }
    }
    if !diagnostics.is_empty() {
        return Err(ScpError::InvalidChange(diagnostics));
    }

    let mut steps: Vec<Step> = old
        .iter()
        .zip(new)
        .enumerate()
        .filter(|(_, (o, n))| n.size_gb > o.size_gb)
        .map(|(index, (_, n))| Step::Resize {
            index,
            size_gb: n.size_gb,
        })
        .collect();
    steps.extend((old.len()..new.len()).map(|index| Step::Add { index }));
    steps.extend((new.len()..old.len()).rev().map(|index| Step::Remove { index }));
    Ok(steps)
}

/// Instance owning the volumes
#[async_trait]
pub trait StorageHost: Send + Sync {
    async fn resize_volume(&self, ctx: &OperationContext, index: usize, size_gb: i32)
    -> ScpResult<()>;
    async fn add_volume(&self, ctx: &OperationContext, volume: &Volume) -> ScpResult<()>;
    async fn remove_volume(&self, ctx: &OperationContext, index: usize) -> ScpResult<()>;
    /// Wait until the host accepts the next storage call
    async fn wait_ready(&self, ctx: &OperationContext) -> ScpResult<()>;
}

/// Plan and run the reconciliation, each call followed by a readiness wait
pub async fn reconcile(
    host: &dyn StorageHost,
    ctx: &OperationContext,
    rules: &Rules,
    old: &[Volume],
    new: &[Volume],
) -> ScpResult<()> {
    let steps = plan(rules, old, new)?;
    for step in steps {
        match step {
            Step::Resize { index, size_gb } => {
                log::info!("resizing {}[{}] to {} GB", rules.attribute, index, size_gb);
                host.resize_volume(ctx, index, size_gb).await?;
            }
            Step::Add { index } => {
                log::info!("adding {}[{}]", rules.attribute, index);
                host.add_volume(ctx, &new[index]).await?;
            }
            Step::Remove { index } => {
                log::info!("removing {}[{}]", rules.attribute, index);
                host.remove_volume(ctx, index).await?;
            }
        }
        host.wait_ready(ctx).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const CLUSTER: Rules = Rules {
        attribute: "block_storages",
        max_count: 10,
        removable: false,
        role_field: "block_storage_role_type",
        type_field: "block_storage_type",
        size_field: "block_storage_size",
    };

    const SERVER: Rules = Rules {
        attribute: "external_storage",
        max_count: 25,
        removable: true,
        role_field: "role",
        type_field: "product_name",
        size_field: "size_gb",
    };

    fn data(disk: &str, size: i32) -> Volume {
        Volume {
            role: Some("DATA".to_string()),
            disk_type: disk.to_string(),
            size_gb: size,
            name: None,
            encrypted: false,
        }
    }

    fn summaries(err: ScpError) -> Vec<String> {
        match err {
            ScpError::InvalidChange(diags) => diags.iter().map(|d| d.to_string()).collect(),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn resize_then_add() {
        let old = vec![data("SSD", 100)];
        let new = vec![data("SSD", 200), data("SSD", 50)];
        assert_eq!(
            plan(&CLUSTER, &old, &new).unwrap(),
            vec![
                Step::Resize {
                    index: 0,
                    size_gb: 200
                },
                Step::Add { index: 1 }
            ]
        );
    }

    #[test]
    fn unchanged_list_has_no_steps() {
        let old = vec![data("SSD", 100)];
        assert!(plan(&CLUSTER, &old, &old).unwrap().is_empty());
    }

    #[test]
    fn shrinking_is_rejected() {
        let err = plan(&CLUSTER, &[data("SSD", 200)], &[data("SSD", 100)]).unwrap_err();
        assert_eq!(
            summaries(err),
            vec!["block_storages[0].block_storage_size: decreasing size is not allowed (200 -> 100)"]
        );
    }

    #[test]
    fn role_and_type_are_fixed() {
        let mut archive = data("HDD", 100);
        archive.role = Some("ARCHIVE".to_string());
        let err = plan(&CLUSTER, &[data("SSD", 100)], &[archive]).unwrap_err();
        let messages = summaries(err);
        assert!(messages[0].contains("changing block storage role is not allowed"));
        assert!(messages[1].contains("changing block storage type is not allowed"));
    }

    #[test]
    fn cluster_storage_is_append_only() {
        let err = plan(&CLUSTER, &[data("SSD", 100), data("SSD", 100)], &[data("SSD", 100)])
            .unwrap_err();
        assert_eq!(
            summaries(err),
            vec!["block_storages: removing additional storage is not allowed"]
        );
    }

    #[test]
    fn maximum_count() {
        let one = Rules {
            max_count: 1,
            ..CLUSTER
        };
        assert!(plan(&one, &[data("SSD", 100)], &[data("SSD", 100), data("SSD", 1)]).is_err());
    }

    #[test]
    fn server_volumes_are_removed_from_the_back() {
        let old = vec![data("SSD", 10), data("SSD", 20), data("SSD", 30)];
        let new = vec![data("SSD", 15)];
        assert_eq!(
            plan(&SERVER, &old, &new).unwrap(),
            vec![
                Step::Resize {
                    index: 0,
                    size_gb: 15
                },
                Step::Remove { index: 2 },
                Step::Remove { index: 1 }
            ]
        );
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StorageHost for Recorder {
        async fn resize_volume(&self, _: &OperationContext, index: usize, size: i32) -> ScpResult<()> {
            self.calls.lock().unwrap().push(format!("resize {index} {size}"));
            Ok(())
        }

        async fn add_volume(&self, _: &OperationContext, volume: &Volume) -> ScpResult<()> {
            self.calls.lock().unwrap().push(format!("add {}", volume.size_gb));
            Ok(())
        }

        async fn remove_volume(&self, _: &OperationContext, index: usize) -> ScpResult<()> {
            self.calls.lock().unwrap().push(format!("remove {index}"));
            Ok(())
        }

        async fn wait_ready(&self, _: &OperationContext) -> ScpResult<()> {
            self.calls.lock().unwrap().push("wait".to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn every_call_is_gated_by_a_wait() {
        let host = Recorder::default();
        reconcile(
            &host,
            &OperationContext::new(),
            &CLUSTER,
            &[data("SSD", 100)],
            &[data("SSD", 200), data("HDD", 30)],
        )
        .await
        .unwrap();
        assert_eq!(
            *host.calls.lock().unwrap(),
            vec!["resize 0 200", "wait", "add 30", "wait"]
        );
    }

    #[tokio::test]
    async fn invalid_plan_makes_no_calls() {
        let host = Recorder::default();
        let result = reconcile(
            &host,
            &OperationContext::new(),
            &CLUSTER,
            &[data("SSD", 200)],
            &[data("SSD", 100)],
        )
        .await;
        assert!(result.is_err());
        assert!(host.calls.lock().unwrap().is_empty());
    }
}
