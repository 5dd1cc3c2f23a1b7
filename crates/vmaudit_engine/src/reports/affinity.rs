use std::collections::HashMap;
use std::sync::Arc;

use audit_logging::audit_info;
use vmaudit_core::{rules_for_vm, AffinityRow, OrgScope, TaskError, TaskOutcome, VmRecord};

use crate::reports::ReportOutcome;
use crate::{Connections, ProgressSink, SetupError, TaskRunner, VsphereInventory, WorkItem};

/// One organization VM whose cluster rules are looked up.
#[derive(Debug, Clone)]
pub struct VmItem(pub VmRecord);

impl WorkItem for VmItem {
    fn label(&self) -> String {
        format!("{}/{}", self.0.vcenter, self.0.name)
    }
}

struct AffinityContext {
    org: String,
    inventories: HashMap<String, Arc<dyn VsphereInventory>>,
}

/// Rules touching any VM of `org_name`, one rule lookup per VM.
pub async fn affinity_report(
    connections: &Connections,
    org_name: &str,
    runner: &TaskRunner,
    sink: &dyn ProgressSink,
) -> Result<ReportOutcome<AffinityRow>, SetupError> {
    let director = connections.cloud_director()?;
    if connections.vcenters.is_empty() {
        return Err(SetupError::NoVcenters);
    }

    let org = director
        .find_org(org_name)
        .await
        .map_err(|err| SetupError::inventory(director.name(), err))?
        .ok_or_else(|| SetupError::OrgNotFound(org_name.to_string()))?;
    let vdcs = director
        .org_vdcs(&org)
        .await
        .map_err(|err| SetupError::inventory(director.name(), err))?;
    let scope = OrgScope::new(org, &vdcs);
    audit_info!(
        "Organization {} ({}) has {} VDCs",
        scope.org.name,
        scope.org.id,
        scope.vdc_count()
    );

    let mut items = Vec::new();
    for conn in &connections.vcenters {
        let vms = conn
            .inventory
            .list_vms(None)
            .await
            .map_err(|err| SetupError::inventory(&conn.name, err))?;
        items.extend(vms.into_iter().filter(|vm| scope.contains(vm)).map(VmItem));
    }
    audit_info!("{} VMs belong to {}", items.len(), scope.org.name);

    let context = Arc::new(AffinityContext {
        org: scope.org.name.clone(),
        inventories: connections
            .vcenters
            .iter()
            .map(|conn| (conn.name.clone(), Arc::clone(&conn.inventory)))
            .collect(),
    });
    let summary = runner.run(items, context, vm_rules, sink).await;

    let mut outcome = ReportOutcome::from_summary(summary);
    outcome
        .rows
        .sort_by(|a, b| (&a.vm, &a.vcenter, &a.rule).cmp(&(&b.vm, &b.vcenter, &b.rule)));
    Ok(outcome)
}

async fn vm_rules(item: VmItem, context: Arc<AffinityContext>) -> TaskOutcome<Vec<AffinityRow>> {
    let vm = item.0;
    let Some(cluster) = vm.cluster.as_deref() else {
        return TaskOutcome::Empty;
    };
    let Some(inventory) = context.inventories.get(&vm.vcenter) else {
        return TaskOutcome::Failed(TaskError::Query(format!(
            "no connection for vCenter {}",
            vm.vcenter
        )));
    };

    match inventory.cluster_rules(cluster).await {
        Ok(rules) => {
            let rows = rules_for_vm(&context.org, &vm, &rules);
            TaskOutcome::from_option((!rows.is_empty()).then_some(rows))
        }
        Err(err) => TaskOutcome::Failed(err.into()),
    }
}
