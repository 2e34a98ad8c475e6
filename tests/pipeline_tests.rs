mod support;

use crowdmap::core::config::PipelineConfig;
use crowdmap::notice::{self, NoticeKind, NoticeReceiver};
use crowdmap::pipeline::AnchorSource;
use crowdmap::prelude::*;
use crowdmap::services::ManualLocationProvider;
use crowdmap::{CameraStop, LatLng, PlaceKind, ViewportRect, ZoomLevel};
use support::{official, rect, FakePlaceService};

fn spawn_pipeline(
    service: Arc<FakePlaceService>,
    location: Arc<ManualLocationProvider>,
) -> (PipelineHandle, NoticeReceiver) {
    let (notices, rx) = notice::channel();
    let handle = ViewportPipeline::spawn(PipelineConfig::default(), service, location, notices);
    (handle, rx)
}

fn stop(rect: ViewportRect, zoom: u8) -> CameraStop {
    CameraStop::new(rect, ZoomLevel::new(zoom))
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[cfg(test)]
mod gating {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_zoom_below_minimum_never_reaches_backend() {
        let service = Arc::new(FakePlaceService::new());
        let (pipeline, _notices) = spawn_pipeline(service.clone(), Arc::new(ManualLocationProvider::new()));

        pipeline.camera_stopped(stop(rect(126.90), 10));
        sleep_ms(1_000).await;
        assert!(service.official_calls().is_empty());
        assert!(service.user_calls().is_empty());

        pipeline.camera_stopped(stop(rect(126.90), 11));
        sleep_ms(1_000).await;
        assert_eq!(service.official_calls().len(), 1);
        assert_eq!(service.user_calls().len(), 1);
        assert_eq!(service.official_calls()[0].zoom, ZoomLevel::new(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_rect_at_six_digits_is_deduplicated() {
        let service = Arc::new(FakePlaceService::new());
        let (pipeline, _notices) = spawn_pipeline(service.clone(), Arc::new(ManualLocationProvider::new()));

        let first = rect(126.90);
        let mut nudged = first;
        nudged.west += 1e-8;
        nudged.north -= 1e-8;

        pipeline.camera_stopped(stop(first, 14));
        sleep_ms(1_000).await;
        pipeline.camera_stopped(stop(nudged, 14));
        sleep_ms(1_000).await;
        assert_eq!(service.official_calls().len(), 1);

        pipeline.camera_stopped(stop(rect(126.91), 14));
        sleep_ms(1_000).await;
        assert_eq!(service.official_calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rects_agreeing_through_six_digits_query_once() {
        let service = Arc::new(FakePlaceService::new());
        let (pipeline, _notices) = spawn_pipeline(service.clone(), Arc::new(ManualLocationProvider::new()));

        let first = ViewportRect::new(126.9000004, 37.5500004, 126.9200004, 37.5700004);
        let second = ViewportRect::new(126.9000006, 37.5500006, 126.9200006, 37.5700006);

        pipeline.camera_stopped(stop(first, 14));
        sleep_ms(1_000).await;
        pipeline.camera_stopped(stop(second, 14));
        sleep_ms(1_000).await;

        let calls = service.official_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].rect.west, 126.9000004);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_stops_issues_single_query_after_quiet_period() {
        let service = Arc::new(FakePlaceService::new());
        let (pipeline, _notices) = spawn_pipeline(service.clone(), Arc::new(ManualLocationProvider::new()));

        // five distinct stops within 100ms
        for i in 0..5 {
            pipeline.camera_stopped(stop(rect(126.90 + i as f64 * 0.01), 14));
            if i < 4 {
                sleep_ms(25).await;
            }
        }
        sleep_ms(240).await;
        assert!(service.official_calls().is_empty(), "fired before the quiet period elapsed");

        sleep_ms(20).await;
        let calls = service.official_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].rect, rect(126.94));

        sleep_ms(1_000).await;
        assert_eq!(service.official_calls().len(), 1);
    }
}

#[cfg(test)]
mod fetching {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_new_query_supersedes_inflight_fetch() {
        let service = Arc::new(FakePlaceService::with_official(vec![official("a", 37.56, 126.91)]));
        service.delay_for(rect(126.90), Duration::from_millis(500));
        let (pipeline, _notices) = spawn_pipeline(service.clone(), Arc::new(ManualLocationProvider::new()));
        let mut official_rx = pipeline.official();

        pipeline.camera_stopped(stop(rect(126.90), 14));
        sleep_ms(300).await;
        assert_eq!(service.official_calls().len(), 1);

        pipeline.camera_stopped(stop(rect(126.95), 14));
        sleep_ms(2_000).await;

        assert_eq!(service.official_calls().len(), 2);
        assert!(official_rx.has_changed().unwrap());
        let batch = official_rx.borrow_and_update().clone();
        assert_eq!(batch.generation, 2);
        assert_eq!(batch.query.as_ref().map(|q| q.rect), Some(rect(126.95)));
        assert_eq!(batch.places.len(), 1);

        // the superseded response never lands
        sleep_ms(2_000).await;
        assert!(!official_rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_kinds_are_fetched_for_each_query() {
        let service = Arc::new(FakePlaceService::new());
        service.set_user(
            vec![support::report("u1", 37.56, 126.91, crowdmap::CongestionLevel::Busy)],
            Vec::new(),
        );
        let (pipeline, _notices) = spawn_pipeline(service.clone(), Arc::new(ManualLocationProvider::new()));
        let mut user_rx = pipeline.user();

        pipeline.camera_stopped(stop(rect(126.90), 14));
        sleep_ms(300).await;

        assert_eq!(service.official_calls(), service.user_calls());
        assert!(user_rx.has_changed().unwrap());
        assert_eq!(user_rx.borrow_and_update().places.len(), 1);
        assert_eq!(pipeline.queries().borrow().as_ref().map(|q| q.rect), Some(rect(126.90)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_yields_empty_batch_and_notice_then_recovers() {
        let service = Arc::new(FakePlaceService::with_official(vec![official("a", 37.56, 126.91)]));
        service.fail_official(true);
        let (pipeline, notices) = spawn_pipeline(service.clone(), Arc::new(ManualLocationProvider::new()));
        let mut official_rx = pipeline.official();

        pipeline.camera_stopped(stop(rect(126.90), 14));
        sleep_ms(300).await;

        let batch = official_rx.borrow_and_update().clone();
        assert!(batch.is_failure());
        assert!(batch.places.is_empty());
        let notice = notices.try_recv().expect("failure notice");
        assert_eq!(notice.kind, NoticeKind::FetchFailed(PlaceKind::Official));
        assert!(pipeline.is_running());

        service.fail_official(false);
        pipeline.camera_stopped(stop(rect(126.95), 14));
        sleep_ms(300).await;
        let batch = official_rx.borrow_and_update().clone();
        assert!(!batch.is_failure());
        assert_eq!(batch.places.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requery_reruns_last_rect_for_one_kind() {
        let service = Arc::new(FakePlaceService::new());
        let (pipeline, _notices) = spawn_pipeline(service.clone(), Arc::new(ManualLocationProvider::new()));

        pipeline.requery(PlaceKind::User);
        sleep_ms(10).await;
        assert!(service.user_calls().is_empty());

        pipeline.camera_stopped(stop(rect(126.90), 14));
        sleep_ms(300).await;
        pipeline.requery(PlaceKind::User);
        sleep_ms(10).await;

        assert_eq!(service.official_calls().len(), 1);
        let user_calls = service.user_calls();
        assert_eq!(user_calls.len(), 2);
        assert_eq!(user_calls[1].rect, rect(126.90));
    }
}

#[cfg(test)]
mod location {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_anchor_prefers_fresh_device_fix() {
        let service = Arc::new(FakePlaceService::new());
        let device = LatLng::new(37.5665, 126.978);
        let (pipeline, _notices) = spawn_pipeline(
            service.clone(),
            Arc::new(ManualLocationProvider::with_position(device)),
        );

        pipeline.camera_stopped(stop(rect(126.90), 14));
        sleep_ms(300).await;

        let query = service.official_calls().remove(0);
        assert_eq!(query.anchor_source, AnchorSource::Device);
        assert_eq!(query.anchor, device);
    }

    #[tokio::test(start_paused = true)]
    async fn test_anchor_falls_back_to_viewport_center() {
        let service = Arc::new(FakePlaceService::new());
        let (pipeline, _notices) = spawn_pipeline(service.clone(), Arc::new(ManualLocationProvider::new()));

        pipeline.camera_stopped(stop(rect(126.90), 14));
        sleep_ms(300).await;

        let query = service.official_calls().remove(0);
        assert_eq!(query.anchor_source, AnchorSource::ViewportCenter);
        assert!((query.anchor.lat - 37.56).abs() < 1e-9);
        assert!((query.anchor.lng - 126.91).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_update_alone_does_not_trigger_query() {
        let service = Arc::new(FakePlaceService::new());
        let location = Arc::new(ManualLocationProvider::new());
        let (pipeline, _notices) = spawn_pipeline(service.clone(), location.clone());

        pipeline.camera_stopped(stop(rect(126.90), 14));
        sleep_ms(300).await;
        assert_eq!(service.official_calls().len(), 1);

        location.set_position(LatLng::new(37.5, 127.0));
        sleep_ms(1_000).await;
        assert_eq!(service.official_calls().len(), 1);

        pipeline.locate_me();
        sleep_ms(10).await;
        let calls = service.official_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].rect, rect(126.90));
        assert_eq!(calls[1].anchor_source, AnchorSource::Device);
    }

    #[tokio::test(start_paused = true)]
    async fn test_locate_me_times_out_with_notice() {
        let service = Arc::new(FakePlaceService::new());
        let (pipeline, notices) = spawn_pipeline(service.clone(), Arc::new(ManualLocationProvider::new()));

        pipeline.locate_me();
        sleep_ms(119_000).await;
        assert!(notices.try_recv().is_err());

        sleep_ms(2_000).await;
        let notice = notices.try_recv().expect("location notice");
        assert_eq!(notice.kind, NoticeKind::LocationFailed);
        assert!(service.official_calls().is_empty());
        assert!(pipeline.is_running());
    }
}
