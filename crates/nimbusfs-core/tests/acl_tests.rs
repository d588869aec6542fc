mod common;

use common::seeded_fs;
use nimbusfs_core::{
    AclGroup, AclPermission, Backend, NativeGrant, NativeGrantee, NativeGroup, NativePermission,
};

#[test]
fn test_owner_gets_full_control_by_default() {
    let (fs, _backend) = seeded_fs(&[("secret.txt", b"s")]);
    let mut node = fs.resolve("mem://bucket/secret.txt").unwrap();

    let acl = node.acl().unwrap();
    assert_eq!(acl.owner().id, "memory-owner");
    assert!(acl.is_allowed(AclGroup::Owner, AclPermission::Read));
    assert!(acl.is_allowed(AclGroup::Owner, AclPermission::Write));
    assert!(!acl.is_allowed(AclGroup::Everyone, AclPermission::Read));
}

#[test]
fn test_grants_survive_a_write_read_cycle() {
    let (fs, _backend) = seeded_fs(&[("shared.txt", b"s")]);
    let mut node = fs.resolve("mem://bucket/shared.txt").unwrap();

    let mut acl = node.acl().unwrap();
    acl.allow(AclGroup::Everyone, AclPermission::Read);
    acl.allow_full_control(AclGroup::AuthenticatedUsers);
    node.set_acl(&acl).unwrap();

    let fetched = node.acl().unwrap();
    assert!(fetched.is_allowed(AclGroup::Everyone, AclPermission::Read));
    assert!(!fetched.is_allowed(AclGroup::Everyone, AclPermission::Write));
    assert!(fetched.is_allowed(AclGroup::AuthenticatedUsers, AclPermission::Read));
    assert!(fetched.is_allowed(AclGroup::AuthenticatedUsers, AclPermission::Write));
    assert!(fetched.is_allowed(AclGroup::Owner, AclPermission::Write));
}

#[test]
fn test_deny_revokes_a_single_permission() {
    let (fs, _backend) = seeded_fs(&[("locked.txt", b"l")]);
    let mut node = fs.resolve("mem://bucket/locked.txt").unwrap();

    let mut acl = node.acl().unwrap();
    acl.allow_full_control(AclGroup::Everyone);
    acl.deny(AclGroup::Everyone, AclPermission::Write);
    node.set_acl(&acl).unwrap();

    let fetched = node.acl().unwrap();
    assert!(fetched.is_allowed(AclGroup::Everyone, AclPermission::Read));
    assert!(!fetched.is_allowed(AclGroup::Everyone, AclPermission::Write));
}

#[test]
fn test_foreign_grants_are_dropped_on_read() {
    let (fs, backend) = seeded_fs(&[("mixed.txt", b"m")]);
    let mut node = fs.resolve("mem://bucket/mixed.txt").unwrap();

    // Seed a native ACL holding grants the generic model cannot express.
    let mut native = backend.get_acl("mixed.txt").unwrap();
    native.grants.push(NativeGrant {
        grantee: NativeGrantee::Canonical {
            id: "somebody-else".to_string(),
        },
        permission: NativePermission::Read,
    });
    native.grants.push(NativeGrant {
        grantee: NativeGrantee::Group(NativeGroup::LogDelivery),
        permission: NativePermission::Write,
    });
    native.grants.push(NativeGrant {
        grantee: NativeGrantee::Group(NativeGroup::AllUsers),
        permission: NativePermission::ReadAcp,
    });
    backend.set_acl("mixed.txt", &native).unwrap();

    let acl = node.acl().unwrap();
    // Only the owner's FullControl maps; the rest is outside the model.
    assert_eq!(acl.groups().collect::<Vec<_>>(), vec![AclGroup::Owner]);

    // Writing back persists the projected view, losing the foreign grants.
    node.set_acl(&acl).unwrap();
    let rewritten = backend.get_acl("mixed.txt").unwrap();
    assert_eq!(rewritten.grants.len(), 1);
    assert_eq!(rewritten.grants[0].permission, NativePermission::FullControl);
}

#[test]
fn test_container_acl_via_root_node() {
    let (fs, _backend) = seeded_fs(&[]);
    let mut root = fs.root("mem", "bucket").unwrap();

    let mut acl = root.acl().unwrap();
    acl.allow(AclGroup::AuthenticatedUsers, AclPermission::Read);
    root.set_acl(&acl).unwrap();

    let fetched = root.acl().unwrap();
    assert!(fetched.is_allowed(AclGroup::AuthenticatedUsers, AclPermission::Read));
}
