//! Bridge simulator: runs the host controller against an in-process
//! rendering surface and plays through a disaster scenario.
//!
//! The surface half runs as its own task behind the bridge channel, so
//! every interaction crosses the wire format exactly as it would in a
//! real embedding. The script:
//!
//! 1. Host pushes a location fix before the surface is up (queued).
//! 2. Surface attaches, initializes, reports `map_ready`; queue flushes.
//! 3. Host switches the theme, pushes a disaster payload, and jumps the
//!    camera to Gimhae.
//! 4. Viewport change triggers a shelter fetch and an overlay update.
//! 5. Surface simulates a marker tap and a directions request.
//! 6. Host answers with a route; surface pins the goal and fits to it.
//! 7. Host queries visible bounds and sweeps for timeouts while waiting.

use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;
use std::time::Instant;

use bridge::{Endpoint, PendingReply, DEFAULT_REQUEST_TIMEOUT_MS};
use geo::{LatLng, ViewportBounds};
use host::{BoxFuture, FetchError, HostController, ShelterSearch};
use protocol::{
    decode_command, decode_event, encode_event, shelter_id, DisasterNotice, MapTheme, RouteResult,
    RouteSummary, ShelterMarker, SurfaceEvent,
};
use surface::{PolygonEntry, SurfaceRuntime};
use tokio::time::{timeout, Duration};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const GIMHAE: LatLng = LatLng {
    lat: 35.2285,
    lng: 128.8894,
};

struct FixtureSearch;

impl ShelterSearch for FixtureSearch {
    fn find_in_bounds(
        &self,
        bounds: ViewportBounds,
    ) -> BoxFuture<'_, Result<Vec<ShelterMarker>, FetchError>> {
        let shelters: Vec<ShelterMarker> = fixture_shelters()
            .into_iter()
            .filter(|s| bounds.contains(LatLng::new(s.lat, s.lng)))
            .collect();
        Box::pin(async move { Ok(shelters) })
    }
}

fn fixture_shelters() -> Vec<ShelterMarker> {
    vec![
        // Close enough to the scenario start to sit inside a zoom-15
        // viewport; the second fixture is deliberately outside it.
        ShelterMarker {
            id: shelter_id(Some("김해중앙체육관"), 35.2290, 128.8870),
            name: "김해중앙체육관".to_string(),
            kind: "지진".to_string(),
            lat: 35.2290,
            lng: 128.8870,
        },
        ShelterMarker {
            id: shelter_id(None, 35.2587, 128.8703),
            name: "삼계초등학교".to_string(),
            kind: "호우".to_string(),
            lat: 35.2587,
            lng: 128.8703,
        },
    ]
}

fn disaster_payload() -> protocol::DisasterPayload {
    let mut payload = BTreeMap::new();
    payload.insert(
        "경상남도".to_string(),
        DisasterNotice {
            disaster_type: "호우".to_string(),
            severity_color: "#ff6b35".to_string(),
        },
    );
    payload
}

fn boundary_fixtures() -> Vec<PolygonEntry> {
    vec![
        PolygonEntry::new(
            "경상남도",
            vec![
                LatLng::new(34.9, 128.0),
                LatLng::new(35.6, 128.0),
                LatLng::new(35.6, 129.2),
                LatLng::new(34.9, 129.2),
            ],
        ),
        PolygonEntry::new(
            "부산광역시",
            vec![
                LatLng::new(35.0, 128.9),
                LatLng::new(35.3, 128.9),
                LatLng::new(35.3, 129.3),
                LatLng::new(35.0, 129.3),
            ],
        ),
    ]
}

/// Surface half: decode commands off the wire, reduce, encode events back.
/// Simulates the marker-tap gesture once shelters appear on the map.
async fn run_surface(mut endpoint: Endpoint, init_ticks: u32) {
    let mut runtime = SurfaceRuntime::new();

    send_event(&endpoint, &runtime.attach());

    // The map library takes a few retry ticks to come up.
    for tick in 0u32.. {
        if let Some(ready) = runtime.tick_init(tick >= init_ticks) {
            send_event(&endpoint, &ready);
            break;
        }
    }
    runtime.install_polygons(boundary_fixtures());

    let mut tapped = false;
    while let Some(raw) = endpoint.recv().await {
        let command = match decode_command(&raw) {
            Ok(command) => command,
            Err(err) => {
                warn!(%err, "malformed command dropped");
                continue;
            }
        };
        let is_shelter_update =
            matches!(&command, protocol::SurfaceCommand::UpdateShelters { shelters } if !shelters.is_empty());

        for event in runtime.apply(command) {
            send_event(&endpoint, &event);
        }

        if is_shelter_update && !tapped {
            tapped = true;
            let first = fixture_shelters().remove(0);
            for event in runtime.tap_marker(&first.id) {
                send_event(&endpoint, &event);
            }
            for event in runtime.request_route_for_selected() {
                send_event(&endpoint, &event);
            }
        }
    }
    info!("host gone; surface shutting down");
}

fn send_event(endpoint: &Endpoint, event: &SurfaceEvent) {
    match encode_event(event) {
        Ok(raw) => endpoint.send(raw),
        Err(err) => warn!(%err, "event encode failed; dropped"),
    }
}

fn straight_route(from: LatLng, to: ShelterMarker) -> RouteResult {
    RouteResult {
        path: vec![from, LatLng::new(to.lat, to.lng)],
        summary: RouteSummary {
            distance: 1_800.0,
            duration: 420.0,
            toll: 0,
        },
        goal_shelter_id: to.id,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let timeout_ms = env_var_u64("BRIDGE_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS);
    // Clamped so the surface always comes up within its bounded retries.
    let init_ticks = (env_var_u64("SIM_INIT_TICKS", 2) as u32).min(surface::MAX_INIT_ATTEMPTS - 1);

    let (host_end, surface_end) = bridge::channel();
    let surface_task = tokio::spawn(run_surface(surface_end, init_ticks));

    let mut host =
        HostController::new(host_end, Arc::new(FixtureSearch)).with_request_timeout(timeout_ms);

    // Issued before the surface is even attached; must queue.
    host.update_location(GIMHAE, Some(15));

    let started = Instant::now();
    let mut bounds_reply: Option<PendingReply> = None;
    let mut route_drawn = false;

    loop {
        // Bounded wait so pending-request sweeps keep running even when
        // the surface goes quiet.
        match timeout(Duration::from_millis(250), host.recv_raw()).await {
            Ok(Some(raw)) => {
                let event = match decode_event(&raw) {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(%err, "malformed event dropped");
                        continue;
                    }
                };
                let was_ready = host.is_map_ready();
                host.handle_surface_event(event).await;

                if host.is_map_ready() && !was_ready {
                    host.set_theme(MapTheme::Dark);
                    host.update_disaster_map(disaster_payload());
                    host.move_and_zoom(GIMHAE, 15);
                }
                if let Some(request) = host.take_route_request() {
                    info!(goal = %request.goal_name, "routing to shelter");
                    let goal = fixture_shelters()
                        .into_iter()
                        .find(|s| s.name == request.goal_name)
                        .expect("fixture goal");
                    host.draw_route(straight_route(GIMHAE, goal));
                    route_drawn = true;
                    bounds_reply = Some(host.request_visible_bounds(now_ms(started)));
                }
            }
            Ok(None) => {
                warn!("surface endpoint closed");
                break;
            }
            Err(_) => {
                let expired = host.sweep_pending(now_ms(started));
                if expired > 0 {
                    warn!(expired, "bounds requests timed out");
                }
            }
        }

        if let Some(reply) = bounds_reply.as_mut() {
            match reply.try_take() {
                Some(Ok(bounds)) => {
                    info!(?bounds, "surface reported visible bounds");
                    break;
                }
                Some(Err(err)) => {
                    let fallback = host.fallback_bounds();
                    warn!(%err, ?fallback, "bounds request failed; using fallback");
                    break;
                }
                None => {}
            }
        }
    }

    if route_drawn {
        host.clear_route();
    }
    info!(
        shelters = host.shelters().len(),
        elapsed_ms = now_ms(started),
        "scenario complete"
    );

    drop(host);
    let _ = surface_task.await;
}

fn now_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
