//! Generic three-group ACL model and its translation to native grants.
//!
//! The generic model knows exactly three groups (the owner, authenticated
//! users, everyone) and two permissions, with full control represented as
//! both permissions at once. Translation from the native model is a known
//! lossy projection: grants to individual identities other than the owner
//! have no generic representation and are dropped.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::backend::{
    NativeAcl, NativeGrant, NativeGrantee, NativeGroup, NativeOwner, NativePermission,
};

/// Grantee group of the generic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AclGroup {
    Owner,
    AuthenticatedUsers,
    Everyone,
}

/// Permission of the generic model. Full control is `{Read, Write}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AclPermission {
    Read,
    Write,
}

/// Generic access control list.
///
/// Invariant: a group with no permissions is absent from the map, never
/// stored with an empty set. The mutators below maintain this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    owner: NativeOwner,
    grants: BTreeMap<AclGroup, BTreeSet<AclPermission>>,
}

impl Acl {
    /// Empty ACL owned by `owner`.
    pub fn new(owner: NativeOwner) -> Self {
        Acl {
            owner,
            grants: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> &NativeOwner {
        &self.owner
    }

    /// Grant one permission to a group.
    pub fn allow(&mut self, group: AclGroup, permission: AclPermission) {
        self.grants.entry(group).or_default().insert(permission);
    }

    /// Grant both read and write to a group.
    pub fn allow_full_control(&mut self, group: AclGroup) {
        self.allow(group, AclPermission::Read);
        self.allow(group, AclPermission::Write);
    }

    /// Revoke one permission; the group disappears when its set empties.
    pub fn deny(&mut self, group: AclGroup, permission: AclPermission) {
        if let Some(set) = self.grants.get_mut(&group) {
            set.remove(&permission);
            if set.is_empty() {
                self.grants.remove(&group);
            }
        }
    }

    pub fn is_allowed(&self, group: AclGroup, permission: AclPermission) -> bool {
        self.grants
            .get(&group)
            .is_some_and(|set| set.contains(&permission))
    }

    /// Permission set for a group; `None` when the group holds no grant.
    pub fn permissions(&self, group: AclGroup) -> Option<&BTreeSet<AclPermission>> {
        self.grants.get(&group)
    }

    /// Groups holding at least one permission, in model order.
    pub fn groups(&self) -> impl Iterator<Item = AclGroup> + '_ {
        self.grants.keys().copied()
    }

    /// Build the generic model from a native ACL.
    ///
    /// Unrecognized native permissions are skipped with a warning; grantees
    /// outside the three-group model (foreign canonical ids, other native
    /// groups) are dropped.
    pub fn from_native(native: &NativeAcl) -> Acl {
        let mut acl = Acl::new(native.owner.clone());

        for grant in &native.grants {
            let rights: &[AclPermission] = match grant.permission {
                NativePermission::FullControl => &[AclPermission::Read, AclPermission::Write],
                NativePermission::Read => &[AclPermission::Read],
                NativePermission::Write => &[AclPermission::Write],
                other => {
                    warn!(permission = ?other, "skipping unmapped native permission");
                    continue;
                }
            };

            let group = match &grant.grantee {
                NativeGrantee::Group(NativeGroup::AllUsers) => AclGroup::Everyone,
                NativeGrantee::Group(NativeGroup::AuthenticatedUsers) => {
                    AclGroup::AuthenticatedUsers
                }
                NativeGrantee::Canonical { id } if *id == native.owner.id => AclGroup::Owner,
                other => {
                    // Lossy projection: no generic group exists for this
                    // grantee.
                    warn!(grantee = ?other, "dropping grant outside the three-group model");
                    continue;
                }
            };

            for right in rights {
                acl.allow(group, *right);
            }
        }

        acl
    }

    /// Produce the native ACL equivalent, owned by `owner`.
    ///
    /// A group granted exactly `{Read, Write}` becomes full control; when the
    /// set cannot be matched exactly, read wins over write. Groups with no
    /// permissions produce no grant.
    pub fn to_native(&self, owner: &NativeOwner) -> NativeAcl {
        let mut grants = Vec::new();

        for (group, rights) in &self.grants {
            if rights.is_empty() {
                continue;
            }

            let permission = if rights.contains(&AclPermission::Read)
                && rights.contains(&AclPermission::Write)
            {
                NativePermission::FullControl
            } else if rights.contains(&AclPermission::Read) {
                NativePermission::Read
            } else {
                NativePermission::Write
            };

            let grantee = match group {
                AclGroup::Everyone => NativeGrantee::Group(NativeGroup::AllUsers),
                AclGroup::AuthenticatedUsers => NativeGrantee::Group(NativeGroup::AuthenticatedUsers),
                AclGroup::Owner => NativeGrantee::Canonical {
                    id: owner.id.clone(),
                },
            };

            grants.push(NativeGrant {
                grantee,
                permission,
            });
        }

        NativeAcl {
            owner: owner.clone(),
            grants,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> NativeOwner {
        NativeOwner {
            id: "owner-123".to_string(),
            display_name: Some("The Owner".to_string()),
        }
    }

    fn grant(grantee: NativeGrantee, permission: NativePermission) -> NativeGrant {
        NativeGrant {
            grantee,
            permission,
        }
    }

    #[test]
    fn full_control_maps_to_both_permissions() {
        let native = NativeAcl {
            owner: owner(),
            grants: vec![grant(
                NativeGrantee::Canonical {
                    id: "owner-123".to_string(),
                },
                NativePermission::FullControl,
            )],
        };
        let acl = Acl::from_native(&native);
        assert!(acl.is_allowed(AclGroup::Owner, AclPermission::Read));
        assert!(acl.is_allowed(AclGroup::Owner, AclPermission::Write));
    }

    #[test]
    fn group_grantees_map_to_generic_groups() {
        let native = NativeAcl {
            owner: owner(),
            grants: vec![
                grant(
                    NativeGrantee::Group(NativeGroup::AllUsers),
                    NativePermission::Read,
                ),
                grant(
                    NativeGrantee::Group(NativeGroup::AuthenticatedUsers),
                    NativePermission::Write,
                ),
            ],
        };
        let acl = Acl::from_native(&native);
        assert!(acl.is_allowed(AclGroup::Everyone, AclPermission::Read));
        assert!(!acl.is_allowed(AclGroup::Everyone, AclPermission::Write));
        assert!(acl.is_allowed(AclGroup::AuthenticatedUsers, AclPermission::Write));
    }

    #[test]
    fn foreign_canonical_grants_are_dropped() {
        let native = NativeAcl {
            owner: owner(),
            grants: vec![grant(
                NativeGrantee::Canonical {
                    id: "someone-else".to_string(),
                },
                NativePermission::FullControl,
            )],
        };
        let acl = Acl::from_native(&native);
        assert_eq!(acl.groups().count(), 0);

        // And the drop is permanent: writing back produces no grant either.
        let back = acl.to_native(&owner());
        assert!(back.grants.is_empty());
    }

    #[test]
    fn unmapped_native_permissions_are_skipped() {
        let native = NativeAcl {
            owner: owner(),
            grants: vec![grant(
                NativeGrantee::Group(NativeGroup::AllUsers),
                NativePermission::WriteAcp,
            )],
        };
        let acl = Acl::from_native(&native);
        assert_eq!(acl.groups().count(), 0);
    }

    #[test]
    fn write_prefers_exact_full_control() {
        let mut acl = Acl::new(owner());
        acl.allow_full_control(AclGroup::Everyone);
        acl.allow(AclGroup::AuthenticatedUsers, AclPermission::Read);
        acl.allow(AclGroup::Owner, AclPermission::Write);

        let native = acl.to_native(&owner());
        assert_eq!(native.grants.len(), 3);

        let by_grantee = |grantee: &NativeGrantee| {
            native
                .grants
                .iter()
                .find(|g| g.grantee == *grantee)
                .map(|g| g.permission)
        };
        assert_eq!(
            by_grantee(&NativeGrantee::Group(NativeGroup::AllUsers)),
            Some(NativePermission::FullControl)
        );
        assert_eq!(
            by_grantee(&NativeGrantee::Group(NativeGroup::AuthenticatedUsers)),
            Some(NativePermission::Read)
        );
        assert_eq!(
            by_grantee(&NativeGrantee::Canonical {
                id: "owner-123".to_string()
            }),
            Some(NativePermission::Write)
        );
    }

    #[test]
    fn round_trip_preserves_expressible_grants() {
        let native = NativeAcl {
            owner: owner(),
            grants: vec![
                grant(
                    NativeGrantee::Canonical {
                        id: "owner-123".to_string(),
                    },
                    NativePermission::FullControl,
                ),
                grant(
                    NativeGrantee::Group(NativeGroup::AllUsers),
                    NativePermission::Read,
                ),
            ],
        };
        let round_tripped = Acl::from_native(&native).to_native(&owner());
        let again = Acl::from_native(&round_tripped);
        assert_eq!(Acl::from_native(&native), again);
    }

    #[test]
    fn deny_removes_empty_groups() {
        let mut acl = Acl::new(owner());
        acl.allow(AclGroup::Everyone, AclPermission::Read);
        acl.deny(AclGroup::Everyone, AclPermission::Read);
        assert!(acl.permissions(AclGroup::Everyone).is_none());
        assert_eq!(acl.groups().count(), 0);
    }
}
