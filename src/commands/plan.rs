// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use keep_relay::{FileRelaySettings, RelayPlan, RelayPlanRequest, RelayPlanner, Result};

use crate::cli::PlanArgs;
use crate::output::Output;

pub fn cmd_plan(out: &Output, args: &PlanArgs) -> Result<()> {
    let settings = match &args.config {
        Some(path) => FileRelaySettings::new(path),
        None => FileRelaySettings::from_default_path(),
    };
    let plan = RelayPlanner::new(Arc::new(settings)).compute(&build_request(args))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    print_plan(out, &plan);
    Ok(())
}

fn build_request(args: &PlanArgs) -> RelayPlanRequest {
    let mut request = RelayPlanRequest::new().explicit_relays(args.relay.clone());
    if let Some(group) = &args.group {
        request = request.group_credential(group);
    }
    if let Some(relay) = &args.env_relay {
        request = request.env_relay(relay);
    }
    if args.no_base {
        request = request.base_relays(Vec::new());
    } else if !args.base.is_empty() {
        request = request.base_relays(args.base.clone());
    }
    request
}

fn print_plan(out: &Output, plan: &RelayPlan) {
    out.header("Relay plan");
    out.relay_list("Relays", &plan.relays);

    out.header("Sources");
    out.relay_list("Explicit", &plan.explicit_relays);
    out.relay_list("Environment", &plan.env_relays);
    out.relay_list("Defaults", &plan.default_relays);
    out.relay_list("Group", &plan.group_relays);
    out.relay_list("Group extras", &plan.group_extras);

    if plan.is_env_override() {
        out.warn("Environment override active: default and group relays are not used");
    }
}
