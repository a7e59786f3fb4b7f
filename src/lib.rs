//! Topic-reconciliation service: an online topic registry with a scheduled
//! merge/rename/split/anchor/prune refactor engine.
//!
//! The registry (`registry`) is the core: a single coarse lock around an
//! insertion-ordered topic store, a cosine-similarity kernel (`similarity`)
//! over token histograms (`topic`), and a tokenizer/slugifier pair used to
//! turn free text into registry keys. `api` and `scheduler` are the
//! request/clock adapters wrapped around it.

pub mod api;
pub mod config;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod similarity;
pub mod slug;
pub mod tokenizer;
pub mod topic;

pub use config::Config;
pub use registry::Registry;

/// Prometheus `/metrics` helper.
///
/// Doesn't touch the router on its own; call it after `api::create_router`
/// to install the recorder and add the route.
///
/// ```ignore
/// let (app, _handle) = topic_gardener::prometheus::attach_metrics_route(app);
/// ```
pub mod prometheus {
    use axum::{routing::get, Router};
    use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

    pub fn attach_metrics_route(app: Router) -> (Router, PrometheusHandle) {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus recorder installed");

        let app = app.route(
            "/metrics",
            get({
                let handle = handle.clone();
                move || async move { handle.render() }
            }),
        );

        (app, handle)
    }
}
