use std::collections::BTreeMap;

use crate::model::PrivilegeSet;
use crate::pg::sqlgen::{ObjectKind, ScriptGenerator};

/// Pairwise privilege diff. Roles missing from the source are left alone:
/// only roles present in the source are granted or adjusted.
pub(super) fn diff_privileges<P: PrivilegeSet>(
    sql: &ScriptGenerator,
    kind: ObjectKind,
    object: &str,
    source: &BTreeMap<String, P>,
    target: &BTreeMap<String, P>,
) -> Vec<String> {
    let mut scripts = Vec::new();

    for (role, source_privileges) in source {
        match target.get(role) {
            Some(target_privileges) => {
                let changes = source_privileges.changes_from(target_privileges);
                if !changes.is_empty() {
                    scripts.push(sql.generate_change_role_grants_script(kind, object, role, &changes));
                }
            }
            None => {
                scripts.push(sql.generate_role_grants_script(kind, object, role, source_privileges));
            }
        }
    }

    scripts
}

pub(super) fn diff_owner(
    sql: &ScriptGenerator,
    kind: ObjectKind,
    object: &str,
    source_owner: &str,
    target_owner: &str,
) -> Option<String> {
    (source_owner != target_owner).then(|| sql.generate_change_owner_script(kind, object, source_owner))
}
