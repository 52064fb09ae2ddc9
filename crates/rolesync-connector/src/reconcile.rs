//! Desired-state construction and the two-phase catalogue diff
//!
//! Everything here is pure: the connector feeds in the discovered trust map
//! and the provider's current catalogue, and gets back the exact catalogue
//! payloads to write.

use rolesync_core::{parse_role_arn, AppRole, Result, RoleSyncError, TrustMap, MSIAM_ACCESS};
use uuid::Uuid;

/// Derive the deterministic display name for a trusted role.
pub fn display_name_for(role_arn: &str) -> Result<String> {
    let (account_id, role_name) = parse_role_arn(role_arn)?;
    Ok(format!("AWS {account_id} - {role_name}"))
}

fn find_by_display_name<'a>(catalogue: &'a [AppRole], display_name: &str) -> Option<&'a AppRole> {
    catalogue.iter().find(|r| r.display_name == display_name)
}

/// Build the desired catalogue: the unchanged sentinel first, then one
/// record per `(provider, role)` pair in aggregation order.
///
/// Records whose display name already exists keep their id and enabled
/// flag; new records get a fresh id and start enabled. Two pairs deriving
/// the same display name is a configuration error, never silently resolved.
pub fn build_desired(trust: &TrustMap, existing: &[AppRole]) -> Result<Vec<AppRole>> {
    let sentinel = find_by_display_name(existing, MSIAM_ACCESS).ok_or_else(|| {
        RoleSyncError::configuration(
            "reserved msiam_access app role is missing from the application catalogue",
        )
    })?;

    let mut desired = vec![sentinel.clone()];

    for (provider_arn, role_arns) in trust.iter() {
        for role_arn in role_arns {
            let display_name = display_name_for(role_arn)?;
            if desired.iter().any(|r| r.display_name == display_name) {
                return Err(RoleSyncError::configuration(format!(
                    "duplicate app role name '{display_name}' derived from {role_arn}"
                )));
            }

            let prior = find_by_display_name(existing, &display_name);
            desired.push(AppRole {
                allowed_member_types: vec!["User".to_string()],
                description: Some(display_name.clone()),
                display_name,
                id: prior.map(|r| r.id).unwrap_or_else(Uuid::new_v4),
                is_enabled: prior.map(|r| r.is_enabled).unwrap_or(true),
                origin: "Application".to_string(),
                value: Some(format!("{role_arn},{provider_arn}")),
            });
        }
    }

    Ok(desired)
}

/// The catalogue writes that converge remote state to the desired set.
///
/// `converge` is always written first and carries the desired records plus
/// every removed record soft-disabled. `prune` exists only when removals
/// occurred; it is written second and excludes the disabled names, which
/// completes the removal. The remote API has no atomic delete inside a
/// single patch, so disabling first avoids a window where a role is both
/// referenced and absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    pub converge: Vec<AppRole>,
    pub prune: Option<Vec<AppRole>>,
    pub created: usize,
    pub preserved: usize,
    pub disabled: usize,
}

/// Diff the desired catalogue against the existing one. `desired` must
/// already lead with the sentinel (see [`build_desired`]).
pub fn plan(desired: Vec<AppRole>, existing: &[AppRole]) -> ReconcilePlan {
    let created = desired
        .iter()
        .filter(|r| !r.is_sentinel())
        .filter(|r| find_by_display_name(existing, &r.display_name).is_none())
        .count();
    let preserved = desired.iter().filter(|r| !r.is_sentinel()).count() - created;

    let to_disable: Vec<AppRole> = existing
        .iter()
        .filter(|r| !r.is_sentinel())
        .filter(|r| find_by_display_name(&desired, &r.display_name).is_none())
        .map(|r| {
            let mut disabled = r.clone();
            disabled.is_enabled = false;
            disabled
        })
        .collect();

    if to_disable.is_empty() {
        return ReconcilePlan {
            converge: desired,
            prune: None,
            created,
            preserved,
            disabled: 0,
        };
    }

    let disabled_names: Vec<String> = to_disable.iter().map(|r| r.display_name.clone()).collect();
    let disabled = disabled_names.len();

    let mut converge = desired;
    converge.extend(to_disable);

    let prune: Vec<AppRole> = converge
        .iter()
        .filter(|r| !disabled_names.contains(&r.display_name))
        .cloned()
        .collect();

    ReconcilePlan {
        converge,
        prune: Some(prune),
        created,
        preserved,
        disabled,
    }
}
