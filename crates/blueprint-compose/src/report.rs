//! Human-readable synthesis summary.

use crate::stack::Stack;

pub fn format_report(stack: &Stack) -> String {
    let config = &stack.config;
    let mut out = String::new();

    out.push_str("\n╔══════════════════════════════════════════╗\n");
    out.push_str("║  Blueprint Stack Synthesis               ║\n");
    out.push_str("╠══════════════════════════════════════════╣\n");
    out.push_str(&format!("║  Project:     {:<27}║\n", config.project.name));
    out.push_str(&format!("║  Environment: {:<27}║\n", config.environment().as_str()));
    out.push_str(&format!("║  Data tier:   {:<27}║\n", stack.capability.tier().as_str()));
    out.push_str("╚══════════════════════════════════════════╝\n\n");

    out.push_str(&format!("Resources ({} total):\n", stack.graph.len()));
    for (kind, count) in stack.graph.count_by_kind() {
        out.push_str(&format!("  {kind:<18} {count}\n"));
    }
    out.push('\n');

    out.push_str(&format!(
        "Compute units ({}, role {}):\n",
        stack.binding.units.len(),
        stack.binding.grant.role_name
    ));
    for unit in &stack.binding.units {
        out.push_str(&format!(
            "  {:<7} {:<28} → {}\n",
            unit.route.method.as_str(),
            unit.route.normalized_path(),
            unit.function_name
        ));
    }
    out.push('\n');

    if let Some(dashboard) = &stack.dashboard {
        out.push_str(&format!(
            "Dashboard: {} ({} widgets)\n\n",
            dashboard.dashboard_name,
            dashboard.widget_titles.len()
        ));
    }

    out.push_str("Outputs:\n");
    for output in &stack.outputs {
        out.push_str(&format!("  {:<20} {}\n", output.name, output.value));
    }

    out
}
