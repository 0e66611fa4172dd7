//! Observability aggregator.
//!
//! Pure consumer: it only reads metric references the binder and the
//! asset selector already expose, and groups them into dashboard widgets.
//! Aggregation itself happens in the observability backend.

use tracing::{debug, info};

use blueprint_core::config::ObservabilityConfig;
use blueprint_core::resource::{DashboardProps, ResourceProps, Widget};
use blueprint_core::{ConfigResult, ResourceRef};

use crate::assets::DistributionHandle;
use crate::binder::{ComputeUnit, EntryPoint};
use crate::stack::Scope;

const FULL_WIDTH: u32 = 24;
const HALF_WIDTH: u32 = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardHandle {
    pub resource: ResourceRef,
    pub dashboard_name: String,
    pub widget_titles: Vec<String>,
}

/// Build the dashboard, or do nothing when observability is not configured.
pub fn aggregate(
    spec: Option<&ObservabilityConfig>,
    units: &[ComputeUnit],
    entry_point: &EntryPoint,
    distribution: Option<&DistributionHandle>,
    scope: &mut Scope,
) -> ConfigResult<Option<DashboardHandle>> {
    let Some(spec) = spec else {
        debug!("observability not configured, skipping dashboard");
        return Ok(None);
    };

    let mut widgets = vec![
        Widget {
            title: "Entry point traffic".to_string(),
            width: FULL_WIDTH,
            metrics: vec![
                entry_point.metrics.requests.clone(),
                entry_point.metrics.latency.clone(),
                entry_point.metrics.client_errors.clone(),
                entry_point.metrics.server_errors.clone(),
            ],
        },
        Widget {
            title: "Compute duration".to_string(),
            width: HALF_WIDTH,
            metrics: units.iter().map(|u| u.metrics.duration.clone()).collect(),
        },
        Widget {
            title: "Compute invocations and errors".to_string(),
            width: HALF_WIDTH,
            metrics: units
                .iter()
                .flat_map(|u| [u.metrics.invocations.clone(), u.metrics.errors.clone()])
                .collect(),
        },
    ];

    if let Some(distribution) = distribution {
        widgets.push(Widget {
            title: "Distribution traffic".to_string(),
            width: FULL_WIDTH,
            metrics: vec![
                distribution.metrics.requests.clone(),
                distribution.metrics.client_error_rate.clone(),
                distribution.metrics.server_error_rate.clone(),
            ],
        });
    }

    let dashboard_name = spec
        .dashboard_name
        .clone()
        .unwrap_or_else(|| scope.namer.physical("dashboard"));
    let widget_titles = widgets.iter().map(|w| w.title.clone()).collect();

    let resource = scope.graph.add(
        "Dashboard",
        ResourceProps::Dashboard(DashboardProps {
            dashboard_name: dashboard_name.clone(),
            period_secs: spec.period_secs,
            widgets,
        }),
    )?;

    info!(dashboard = %dashboard_name, units = units.len(), "declared dashboard");

    Ok(Some(DashboardHandle {
        resource,
        dashboard_name,
        widget_titles,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::config::{AssetsConfig, StackConfig, TierKind};
    use blueprint_core::environment::Environment;

    use crate::{assets, binder, data_tier};

    fn setup(distribution: bool) -> (StackConfig, Scope, binder::Binding, assets::Assets) {
        let config = StackConfig::scaffold("shop", Environment::Staging, TierKind::Keyed);
        let mut scope = Scope::new(&config);
        let capability = data_tier::select(&config.data, &mut scope).unwrap();
        let binding = binder::bind(&config.routes, &capability, &config.compute, &mut scope).unwrap();
        let spec = AssetsConfig {
            hosting: true,
            distribution,
            domain: None,
        };
        let assets = assets::provision(&spec, &mut scope).unwrap();
        (config, scope, binding, assets)
    }

    #[test]
    fn absent_spec_is_a_no_op() {
        let (_, mut scope, binding, assets) = setup(true);
        let before = scope.graph.len();
        let dashboard = aggregate(
            None,
            &binding.units,
            &binding.entry_point,
            assets.distribution.as_ref(),
            &mut scope,
        )
        .unwrap();
        assert!(dashboard.is_none());
        assert_eq!(scope.graph.len(), before);
    }

    #[test]
    fn groups_metrics_per_concern() {
        let (config, mut scope, binding, _) = setup(false);
        let dashboard = aggregate(
            config.observability.as_ref(),
            &binding.units,
            &binding.entry_point,
            None,
            &mut scope,
        )
        .unwrap()
        .unwrap();

        assert_eq!(dashboard.dashboard_name, "shop-staging-dashboard");
        assert_eq!(dashboard.widget_titles.len(), 3);

        let ResourceProps::Dashboard(props) = &scope.graph.get("Dashboard").unwrap().props else {
            panic!("expected dashboard");
        };
        assert_eq!(props.widgets[0].metrics.len(), 4);
        assert_eq!(props.widgets[1].metrics.len(), binding.units.len());
        assert_eq!(props.widgets[2].metrics.len(), binding.units.len() * 2);
        assert_eq!(props.widgets[1].metrics[0], binding.units[0].metrics.duration);
    }

    #[test]
    fn distribution_adds_a_widget() {
        let (config, mut scope, binding, assets) = setup(true);
        let dashboard = aggregate(
            config.observability.as_ref(),
            &binding.units,
            &binding.entry_point,
            assets.distribution.as_ref(),
            &mut scope,
        )
        .unwrap()
        .unwrap();
        assert_eq!(dashboard.widget_titles.last().unwrap(), "Distribution traffic");
        assert_eq!(
            scope.graph.get("Dashboard").unwrap().depends_on.len(),
            binding.units.len() + 1
        );
    }
}
