use std::collections::HashSet;

use pretty_assertions::assert_eq;
use vmaudit_core::{
    datastore_path, find_duplicate_cloud_ids, is_system_folder, orphaned_files, render_delimited,
    rules_for_vm, ClusterRule, DatastoreFile, Organization, OrgScope, PowerState, RuleKind, Vdc,
    VmRecord,
};

fn vm(id: &str, name: &str, cloud_id: Option<&str>) -> VmRecord {
    VmRecord {
        id: id.to_string(),
        name: name.to_string(),
        vcenter: "vc01".to_string(),
        cluster: Some("domain-c8".to_string()),
        host: Some("esx01".to_string()),
        resource_pool: None,
        power_state: PowerState::PoweredOn,
        cloud_id: cloud_id.map(str::to_string),
    }
}

#[test]
fn duplicates_group_shared_ids_and_skip_blank_ones() {
    let vms = vec![
        vm("vm-1", "web02", Some("c-1")),
        vm("vm-2", "web01", Some("c-1")),
        vm("vm-3", "db01", Some("c-2")),
        vm("vm-4", "tmp01", Some("  ")),
        vm("vm-5", "tmp02", Some("")),
        vm("vm-6", "tmp03", None),
        vm("vm-7", "tmp04", None),
    ];

    let rows = find_duplicate_cloud_ids(&vms);
    let names: Vec<_> = rows.iter().map(|row| row.vm.as_str()).collect();
    assert_eq!(names, vec!["web01", "web02"]);
    assert!(rows.iter().all(|row| row.cloud_id == "c-1" && row.copies == 2));
    assert_eq!(rows[0].power_state, "poweredOn");
}

#[test]
fn duplicates_span_vcenters() {
    let mut other = vm("vm-1", "web01", Some("c-9"));
    other.vcenter = "vc02".to_string();
    let vms = vec![vm("vm-1", "web01", Some("c-9")), other];

    let rows = find_duplicate_cloud_ids(&vms);
    let vcenters: Vec<_> = rows.iter().map(|row| row.vcenter.as_str()).collect();
    assert_eq!(vcenters, vec!["vc01", "vc02"]);
}

#[test]
fn org_scope_matches_vdc_backed_resource_pools() {
    let org = Organization {
        id: "urn:vcloud:org:1".to_string(),
        name: "Acme".to_string(),
    };
    let vdcs = vec![Vdc {
        id: "urn:vcloud:vdc:3F2A-77".to_string(),
        name: "Acme-VDC".to_string(),
    }];
    let scope = OrgScope::new(org, &vdcs);

    let mut inside = vm("vm-1", "web01", None);
    inside.resource_pool = Some("Acme-VDC (3f2a-77)".to_string());
    let mut outside = vm("vm-2", "web02", None);
    outside.resource_pool = Some("Other (9999)".to_string());
    let unpooled = vm("vm-3", "web03", None);

    assert_eq!(scope.vdc_count(), 1);
    assert!(scope.contains(&inside));
    assert!(!scope.contains(&outside));
    assert!(!scope.contains(&unpooled));
}

#[test]
fn rules_for_vm_only_returns_referencing_rules() {
    let rules = vec![
        ClusterRule {
            name: "keep-apart".to_string(),
            kind: RuleKind::VmAntiAffinity,
            enabled: true,
            mandatory: false,
            vm_ids: vec!["vm-1".to_string(), "vm-2".to_string()],
        },
        ClusterRule {
            name: "other".to_string(),
            kind: RuleKind::VmAffinity,
            enabled: true,
            mandatory: false,
            vm_ids: vec!["vm-9".to_string()],
        },
    ];

    let rows = rules_for_vm("Acme", &vm("vm-1", "web01", None), &rules);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].rule, "keep-apart");
    assert_eq!(rows[0].kind, "anti-affinity");
    assert_eq!(rows[0].members, 2);

    let mut no_cluster = vm("vm-1", "web01", None);
    no_cluster.cluster = None;
    assert!(rules_for_vm("Acme", &no_cluster, &rules).is_empty());
}

#[test]
fn orphans_exclude_registered_files() {
    let files = vec![
        DatastoreFile {
            path: "web01/web01.vmx".to_string(),
            size_bytes: 3_000,
            modified: Some("2024-01-01T00:00:00Z".to_string()),
        },
        DatastoreFile {
            path: "web01/old-disk.vmdk".to_string(),
            size_bytes: 42,
            modified: None,
        },
    ];
    let registered: HashSet<String> = [datastore_path("ds1", "web01/web01.vmx")].into();

    let rows = orphaned_files("ds1", "/web01/", &files, &registered);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].folder, "web01");
    assert_eq!(rows[0].file, "old-disk.vmdk");
    assert_eq!(
        render_delimited(&rows, ','),
        "Datastore,Folder,File,SizeBytes,Modified\nds1,web01,old-disk.vmdk,42,\n"
    );
}

#[test]
fn system_folders_are_recognised() {
    assert!(is_system_folder(".sdd.sf"));
    assert!(is_system_folder("/.vSphere-HA/"));
    assert!(!is_system_folder("web01"));
    assert_eq!(datastore_path("ds1", "/a/b.vmx"), "[ds1] a/b.vmx");
}
