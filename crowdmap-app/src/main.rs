use anyhow::Context;
use crowdmap::prelude::*;
use crowdmap::services::HttpPlaceService;

/// One scripted camera settle
struct CameraStep {
    center: LatLng,
    zoom: f64,
    dwell_ms: u64,
}

fn camera_path() -> Vec<CameraStep> {
    let step = |lat, lng, zoom, dwell_ms| CameraStep {
        center: LatLng::new(lat, lng),
        zoom,
        dwell_ms,
    };
    vec![
        // zoomed out too far to query
        step(37.5665, 126.9780, 9.5, 400),
        step(37.5665, 126.9780, 13.0, 100),
        step(37.5700, 126.9820, 13.4, 100),
        step(37.5712, 126.9845, 14.2, 800),
        step(37.5796, 126.9770, 15.0, 800),
        step(37.5512, 126.9882, 16.5, 800),
    ]
}

/// Span of a phone-sized viewport at `zoom`, in degrees
fn viewport_span(zoom: f64) -> (f64, f64) {
    let lng_span = 360.0 / 2f64.powf(zoom) * 1.6;
    (lng_span * 1.8, lng_span)
}

fn log_state(controller: &MapController) {
    let overlay = controller.overlay();
    log::info!(
        "mode={:?} panel={} official={} realtime={}+{} clusters favorites={}",
        controller.mode(),
        controller.panel().name(),
        overlay.marker_count(OverlayGroup::Official, ItemKind::Point),
        overlay.marker_count(OverlayGroup::Realtime, ItemKind::Point),
        overlay.marker_count(OverlayGroup::Realtime, ItemKind::Cluster),
        controller.favorite_count(),
    );
}

async fn replay(controller: &mut MapController, notices: &NoticeReceiver) {
    for (index, step) in camera_path().into_iter().enumerate() {
        if index == 4 {
            controller.select_mode(MapMode::Realtime);
        }
        let (lat_span, lng_span) = viewport_span(step.zoom);
        controller.on_camera_stopped(ViewportRect::around(step.center, lat_span, lng_span), step.zoom);

        tokio::time::sleep(Duration::from_millis(step.dwell_ms)).await;
        if controller.pump() > 0 {
            log_state(controller);
        }
        while let Ok(notice) = notices.try_recv() {
            log::warn!("{}", notice);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => EngineConfig::default(),
    };
    log::info!("using backend {}", config.backend.base_url);

    let service = Arc::new(HttpPlaceService::from_config(&config.backend)?);
    let location = Arc::new(ManualLocationProvider::with_position(LatLng::new(37.5665, 126.9780)));
    let (mut controller, notices) = MapController::new(config, service, location)?;

    tokio::select! {
        _ = replay(&mut controller, &notices) => log::info!("camera path finished"),
        _ = tokio::signal::ctrl_c() => log::info!("interrupted"),
    }

    controller.pipeline().shutdown();
    log_state(&controller);
    Ok(())
}
