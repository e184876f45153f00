use std::sync::Arc;

use wayfind_core::AppConfig;
use wayfind_discovery::{
    CameraCommand, DiscoverySession, DiscoveryView, LocationNotice, SessionConfig, SessionState,
};
use wayfind_feed::HttpFeed;
use wayfind_geo::ChannelSensor;

use crate::args::{CriteriaArgs, LocationArgs};
use crate::nearby::render_view;
use crate::source::feed_config;

/// Follow the configured feed, printing the view each time it changes.
///
/// A `--lat`/`--lng` pair is delivered once as the device fix. Without one
/// the location watcher times out and its notice is printed instead.
///
/// # Errors
///
/// Returns an error if no feed is configured or an argument is out of range.
pub(crate) async fn run_watch(
    config: &AppConfig,
    location: &LocationArgs,
    criteria: &CriteriaArgs,
) -> anyhow::Result<()> {
    let criteria = criteria.to_criteria()?;
    let fix = location.user_location()?;
    let feed = HttpFeed::new(&feed_config(config)?)?;

    let (sensor, sensor_handle) = ChannelSensor::new();
    if let Some(fix) = fix {
        sensor_handle.push_fix(fix);
    }

    let mut session = DiscoverySession::start(
        SessionConfig::from_app_config(config),
        feed,
        sensor,
        Vec::<CameraCommand>::new(),
    );
    session.set_criteria(criteria)?;
    tracing::info!("watching facility feed; press Ctrl-C to stop");

    let mut state = session.state();
    let mut printed = Printed::default();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                if let Some(text) = printed.update(&current) {
                    print!("{text}");
                }
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

/// What was last written to stdout, so unchanged states print nothing.
#[derive(Default)]
pub(crate) struct Printed {
    view: Option<Arc<DiscoveryView>>,
    notice: Option<LocationNotice>,
}

impl Printed {
    pub(crate) fn update(&mut self, state: &SessionState) -> Option<String> {
        let mut out = String::new();

        let notice = state.notice.filter(LocationNotice::is_visible);
        if notice != self.notice {
            if let Some(notice) = notice {
                out.push_str(&format!("! {notice}\n"));
            }
            self.notice = notice;
        }

        let view_changed = self
            .view
            .as_ref()
            .is_none_or(|last| !Arc::ptr_eq(last, &state.view));
        if state.revision > 0 && view_changed {
            out.push_str(&format!("-- revision {} --\n", state.revision));
            out.push_str(&render_view(&state.view));
            self.view = Some(Arc::clone(&state.view));
        }

        (!out.is_empty()).then_some(out)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping watch");
}
