use actix_web::http::header;
use actix_web::web::{self, Bytes};
use actix_web::HttpResponse;
use async_stream::stream;

use facedoor_core::lifecycle::session_slot::SessionSlot;
use facedoor_core::shared::constants::STREAM_CONTENT_TYPE;
use facedoor_core::streaming::frame_streamer::FrameStreamer;

use crate::viewer_page::VIEWER_HTML;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/serve", web::get().to(serve_video));
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(VIEWER_HTML)
}

/// Live annotated feed for one viewer at a time.
///
/// Every chunk pulled by the client runs exactly one pipeline iteration on
/// the blocking pool. Dropping the response hands the controller back.
async fn serve_video(slot: web::Data<SessionSlot>) -> HttpResponse {
    let Some(lease) = slot.checkout() else {
        log::info!("Rejecting viewer: another session is active");
        return HttpResponse::ServiceUnavailable()
            .insert_header((header::RETRY_AFTER, "5"))
            .body("Another viewer is connected. Try again shortly.");
    };
    log::info!("Viewer connected");

    let stream = stream! {
        let mode = lease.mode();
        let mut streamer = Some(FrameStreamer::new(lease, mode));
        while let Some(mut current) = streamer.take() {
            let pulled = web::block(move || {
                let next = current.next();
                (current, next)
            })
            .await;
            match pulled {
                Ok((current, Some(frame))) => {
                    streamer = Some(current);
                    yield Ok::<Bytes, actix_web::Error>(Bytes::from(frame.to_multipart_part()));
                }
                Ok((_, None)) => break,
                Err(e) => {
                    log::error!("Frame worker failed: {e}");
                    break;
                }
            }
        }
    };

    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header((header::CONTENT_TYPE, STREAM_CONTENT_TYPE))
        .streaming(stream)
}
