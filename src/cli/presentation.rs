//! CLI presentation: report, plan and ledger formatters.

use crate::ledger::Ledger;
use crate::reconcile::ReconcilePlan;
use crate::sync::SyncReport;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;

const SHORT_ID_LEN: usize = 12;

fn short_hex(bytes: &[u8]) -> String {
    let mut s = hex::encode(bytes);
    s.truncate(SHORT_ID_LEN);
    s
}

pub fn format_sync_report(report: &SyncReport, bindings: &[String]) -> String {
    let mut s = String::new();
    if !bindings.is_empty() {
        s.push_str("Bindings:");
        for line in bindings {
            s.push_str(&format!("\n  {}", line));
        }
        s.push_str("\n\n");
    }

    s.push_str(&format!(
        "Synchronized {} slot(s): {} added, {} updated, {} removed, {} pruned",
        report.bound_slots,
        report.added.len(),
        report.updated.len(),
        report.removed.len(),
        report.pruned.len()
    ));
    if !report.snapshot_fetched {
        s.push_str("\n  No internal emotes; registry not contacted");
    }
    if !report.failures.is_empty() {
        s.push_str(&format!("\n\nFailures ({}):", report.failures.len()));
        for failure in &report.failures {
            s.push_str(&format!(
                "\n  - {} [{}]: {}",
                failure.key, failure.phase, failure.error
            ));
        }
    }
    if !report.unbound_keys.is_empty() {
        s.push_str(&format!(
            "\n\nUnbound keys: {}",
            report.unbound_keys.join(", ")
        ));
    }
    s
}

pub fn format_plan_text(plan: &ReconcilePlan) -> String {
    if plan.is_empty() {
        return "Registry is up to date.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Action", "Key", "Remote ID", "Detail"]);
    for entry in &plan.prune {
        table.add_row(vec![
            "prune".to_string(),
            entry.key.clone(),
            entry.remote_id.to_string(),
            "remote resource already gone".to_string(),
        ]);
    }
    for entry in &plan.remove {
        table.add_row(vec![
            "remove".to_string(),
            entry.key.clone(),
            entry.remote_id.to_string(),
            "no longer declared".to_string(),
        ]);
    }
    for add in &plan.add {
        let detail = if add.orphans.is_empty() {
            "upload".to_string()
        } else {
            let ids: Vec<String> = add.orphans.iter().map(|id| id.to_string()).collect();
            format!("upload, delete orphans {}", ids.join(", "))
        };
        table.add_row(vec!["add".to_string(), add.key.clone(), "-".to_string(), detail]);
    }
    for update in &plan.update {
        table.add_row(vec![
            "update".to_string(),
            update.key.clone(),
            update.remote_id.to_string(),
            format!("{} -> {}", short_hex(&update.stored), short_hex(&update.current)),
        ]);
    }
    format!(
        "{}\nEstimated registry calls: {}",
        table,
        plan.registry_call_estimate()
    )
}

pub fn format_plan_json(plan: &ReconcilePlan) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(plan)
}

pub fn format_ledger_text(ledger: &Ledger) -> String {
    if ledger.is_empty() {
        return "Ledger is empty.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Key", "Remote ID", "Animated", "Handle", "Content"]);
    for entry in ledger {
        table.add_row(vec![
            entry.key.clone(),
            entry.remote_id.to_string(),
            if entry.animated { "yes" } else { "no" }.to_string(),
            entry.handle().to_string(),
            short_hex(&entry.content_identifier),
        ]);
    }
    format!("{}\n{} emote(s) tracked", table, ledger.len())
}

pub fn format_ledger_json(ledger: &Ledger) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(ledger)
}
