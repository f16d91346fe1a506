//! End-to-end workflow tests for the try-on studio against a scripted backend

mod common;

use std::sync::Arc;

use common::mock_backend::{
    MockBackend, analysis_response, full_analysis, image_response, status_error,
    text_only_response,
};
use common::studio::{load, studio_with};
use common::test_images::{png, png_base64};
use neural_tryon::studio::StageStatus;
use neural_tryon::{
    ActiveView, BodySize, ImageRole, Persona, RESULT_FILENAME, WorkflowState, WorkflowStatus,
};
use serde_json::json;

fn scripted_success(backend: &MockBackend) {
    backend.push(analysis_response(full_analysis()));
    backend.push(image_response("image/png", &png_base64()));
}

async fn wait_for_calls(backend: &MockBackend, count: usize) {
    while backend.call_count() < count {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_person_and_top_sends_two_images_in_order() {
    let backend = Arc::new(MockBackend::new());
    scripted_success(&backend);
    let studio = studio_with(backend.clone(), Persona::Men);
    load(&studio, &[ImageRole::Top, ImageRole::Person]).await;

    let state = studio.run().await.unwrap();
    assert_eq!(state.status, WorkflowStatus::Success);

    let images = studio.images();
    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].model, "gemini-3-flash-preview");
    assert_eq!(
        calls[0].image_data(),
        vec![
            images.person.unwrap().to_base64(),
            images.top.unwrap().to_base64()
        ]
    );
    assert!(calls[0].texts()[0].contains("MEN subject"));
}

#[tokio::test]
async fn test_women_person_and_dress_sends_two_images() {
    let backend = Arc::new(MockBackend::new());
    scripted_success(&backend);
    let studio = studio_with(backend.clone(), Persona::Women);
    load(&studio, &[ImageRole::Person, ImageRole::Dress]).await;

    studio.run().await.unwrap();

    let images = studio.images();
    let analysis = &backend.calls()[0];
    assert_eq!(
        analysis.image_data(),
        vec![
            images.person.unwrap().to_base64(),
            images.dress.unwrap().to_base64()
        ]
    );
    assert!(analysis.texts()[0].contains("WOMEN subject"));

    let synthesis = &backend.calls()[1];
    assert!(synthesis.texts().iter().any(|t| t.starts_with("REFERENCE DRESS")));
}

#[tokio::test]
async fn test_synthesis_follows_analysis_with_its_directive() {
    let backend = Arc::new(MockBackend::new());
    scripted_success(&backend);
    let studio = studio_with(backend.clone(), Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Top, ImageRole::Bottom]).await;

    let state = studio.run().await.unwrap();

    let calls = backend.calls();
    assert_eq!(calls[1].model, "gemini-2.5-flash-image");
    assert_eq!(calls[1].image_data().len(), 3);
    let closing = calls[1].texts().last().cloned().unwrap();
    assert!(closing.contains(
        "BLENDING CONTEXT: short sleeves end mid-bicep; keep the watch in front"
    ));
    assert!(closing.contains("size L"));

    assert_eq!(state.body_size, Some(BodySize::L));
    assert_eq!(
        state.result_image.unwrap().mime_type(),
        "image/png"
    );
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_empty_synthesis_result_is_an_error_and_keeps_analysis() {
    let backend = Arc::new(MockBackend::new());
    backend.push(analysis_response(full_analysis()));
    backend.push(text_only_response());
    let studio = studio_with(backend.clone(), Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Top]).await;

    let state = studio.run().await.unwrap();

    assert_eq!(state.status, WorkflowStatus::Error);
    assert!(state.error.as_deref().unwrap().contains("empty result"));
    assert_eq!(
        state.garment_description.as_deref(),
        Some("white cotton t-shirt, short sleeves")
    );
    assert!(state.result_image.is_none());
    assert_eq!(studio.state(), state);
}

#[tokio::test]
async fn test_synthesis_transport_failure_keeps_analysis() {
    let backend = Arc::new(MockBackend::new());
    backend.push(analysis_response(full_analysis()));
    backend.push(status_error(500));
    let studio = studio_with(backend.clone(), Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Top]).await;

    let state = studio.run().await.unwrap();

    assert_eq!(backend.call_count(), 2);
    assert_eq!(state.status, WorkflowStatus::Error);
    let message = state.error.as_deref().unwrap();
    assert!(message.starts_with("Synthesis failed"), "{message}");
    assert!(message.contains("500"), "{message}");
    assert_eq!(
        state.garment_description.as_deref(),
        Some("white cotton t-shirt, short sleeves")
    );
    assert!(state.technical_prompt.is_some());
    assert!(state.result_image.is_none());
}

#[tokio::test]
async fn test_corrupt_inline_image_is_synthesis_error() {
    let backend = Arc::new(MockBackend::new());
    backend.push(analysis_response(full_analysis()));
    backend.push(image_response("image/png", "@@@"));
    let studio = studio_with(backend.clone(), Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Top]).await;

    let state = studio.run().await.unwrap();

    assert_eq!(state.status, WorkflowStatus::Error);
    let message = state.error.as_deref().unwrap();
    assert!(message.starts_with("Synthesis failed"), "{message}");
    assert!(state.garment_description.is_some());
    assert!(state.result_image.is_none());
}

#[tokio::test]
async fn test_active_view_can_return_to_inputs_after_run() {
    let backend = Arc::new(MockBackend::new());
    scripted_success(&backend);
    let studio = studio_with(backend.clone(), Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Top]).await;
    assert_eq!(studio.active_view(), ActiveView::Inputs);

    studio.run().await.unwrap();
    assert_eq!(studio.active_view(), ActiveView::Result);

    studio.set_active_view(ActiveView::Inputs);
    assert_eq!(studio.active_view(), ActiveView::Inputs);
    assert_eq!(studio.state().status, WorkflowStatus::Success);

    studio.set_active_view(ActiveView::Result);
    assert_eq!(studio.active_view(), ActiveView::Result);
}

#[tokio::test]
async fn test_missing_body_size_synthesizes_medium() {
    let backend = Arc::new(MockBackend::new());
    backend.push(analysis_response(json!({
        "garmentDescription": "denim jacket",
        "personDescription": "side profile",
        "technicalPrompt": "keep hair over the collar"
    })));
    backend.push(image_response("image/png", &png_base64()));
    let studio = studio_with(backend.clone(), Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Top]).await;

    let state = studio.run().await.unwrap();

    assert_eq!(state.status, WorkflowStatus::Success);
    assert_eq!(state.body_size, Some(BodySize::M));
    let closing = backend.calls()[1].texts().last().cloned().unwrap();
    assert!(closing.contains("size M"));
}

#[tokio::test]
async fn test_analysis_failure_skips_synthesis() {
    let backend = Arc::new(MockBackend::new());
    backend.push(status_error(503));
    let studio = studio_with(backend.clone(), Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Bottom]).await;

    let state = studio.run().await.unwrap();

    assert_eq!(backend.call_count(), 1);
    assert_eq!(state.status, WorkflowStatus::Error);
    let message = state.error.unwrap();
    assert!(message.starts_with("Analysis failed"), "{message}");
    assert!(message.contains("503"));
    assert!(state.garment_description.is_none());
}

#[tokio::test]
async fn test_schema_violation_is_analysis_error() {
    let backend = Arc::new(MockBackend::new());
    backend.push(analysis_response(json!({"personDescription": "only this"})));
    let studio = studio_with(backend.clone(), Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Top]).await;

    let state = studio.run().await.unwrap();

    assert_eq!(state.status, WorkflowStatus::Error);
    assert!(state.error.unwrap().starts_with("Analysis failed"));
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_run_refused_until_ready() {
    let backend = Arc::new(MockBackend::new());
    let studio = studio_with(backend.clone(), Persona::Men);

    assert!(!studio.can_run());
    let err = studio.run().await.unwrap_err();
    assert_eq!(err.category(), "readiness");

    load(&studio, &[ImageRole::Person]).await;
    assert!(!studio.can_run());
    assert_eq!(studio.run().await.unwrap_err().category(), "readiness");

    studio.reset();
    load(&studio, &[ImageRole::Top, ImageRole::Bottom]).await;
    assert!(!studio.can_run());
    assert_eq!(studio.run().await.unwrap_err().category(), "readiness");

    assert_eq!(backend.call_count(), 0);
    assert_eq!(studio.state(), WorkflowState::idle());
    assert_eq!(studio.active_view(), ActiveView::Inputs);
}

#[tokio::test]
async fn test_processing_state_is_published_mid_run() {
    let backend = Arc::new(MockBackend::new());
    scripted_success(&backend);
    let release = backend.hold_next();
    let studio = studio_with(backend.clone(), Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Top]).await;
    let mut updates = studio.subscribe();

    let runner = studio.clone();
    let run = tokio::spawn(async move { runner.run().await });
    wait_for_calls(&backend, 1).await;

    let current = updates.borrow_and_update().clone();
    assert_eq!(current.status, WorkflowStatus::Processing);
    assert_eq!(studio.active_view(), ActiveView::Result);
    assert!(!studio.can_run());
    assert_eq!(
        current.pipeline().map(|stage| stage.status),
        [StageStatus::Active, StageStatus::Pending, StageStatus::Pending]
    );
    assert_eq!(studio.run().await.unwrap_err().category(), "readiness");

    release.send(()).unwrap();
    let state = run.await.unwrap().unwrap();
    assert_eq!(state.status, WorkflowStatus::Success);
    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().status, WorkflowStatus::Success);
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn test_reset_then_rerun_starts_fresh() {
    let backend = Arc::new(MockBackend::new());
    backend.push(analysis_response(full_analysis()));
    backend.push(text_only_response());
    let studio = studio_with(backend.clone(), Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Top]).await;

    let first = studio.run().await.unwrap();
    assert_eq!(first.status, WorkflowStatus::Error);

    studio.reset();
    studio.reset();
    assert_eq!(studio.state(), WorkflowState::idle());
    assert!(studio.images().is_empty());
    assert_eq!(studio.active_view(), ActiveView::Inputs);

    backend.push(analysis_response(json!({
        "garmentDescription": "wool sweater",
        "personDescription": "seated",
        "bodySize": "S",
        "technicalPrompt": "long sleeves"
    })));
    backend.push(image_response("image/png", &png_base64()));
    load(&studio, &[ImageRole::Person, ImageRole::Top]).await;

    let second = studio.run().await.unwrap();
    assert_eq!(second.status, WorkflowStatus::Success);
    assert!(second.error.is_none());
    assert!(second.styling_suggestions.is_none());
    assert_eq!(second.garment_description.as_deref(), Some("wool sweater"));
    assert_eq!(second.body_size, Some(BodySize::S));
}

#[tokio::test]
async fn test_persona_change_clears_everything() {
    let backend = Arc::new(MockBackend::new());
    scripted_success(&backend);
    let studio = studio_with(backend.clone(), Persona::Women);
    load(&studio, &[ImageRole::Person, ImageRole::Dress]).await;
    studio.run().await.unwrap();
    assert_eq!(studio.state().status, WorkflowStatus::Success);

    studio.select_persona(Persona::Men);

    assert_eq!(studio.persona(), Persona::Men);
    assert!(studio.images().is_empty());
    assert_eq!(studio.state(), WorkflowState::idle());
    assert_eq!(studio.active_view(), ActiveView::Inputs);
    let err = studio
        .load_image(ImageRole::Dress, png(4, 4, [1, 2, 3]))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "validation");
}

#[tokio::test]
async fn test_stale_run_is_discarded_after_reset() {
    let backend = Arc::new(MockBackend::new());
    scripted_success(&backend);
    let release = backend.hold_next();
    let studio = studio_with(backend.clone(), Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Top]).await;

    let runner = studio.clone();
    let run = tokio::spawn(async move { runner.run().await });
    wait_for_calls(&backend, 1).await;

    studio.reset();
    release.send(()).unwrap();
    let state = run.await.unwrap().unwrap();

    assert_eq!(state, WorkflowState::idle());
    assert_eq!(studio.state(), WorkflowState::idle());
    assert_eq!(backend.call_count(), 1, "synthesis must not start for a stale run");
}

#[tokio::test]
async fn test_stale_run_is_discarded_after_persona_change() {
    let backend = Arc::new(MockBackend::new());
    backend.push(analysis_response(full_analysis()));
    backend.push(image_response("image/png", &png_base64()));
    let studio = studio_with(backend.clone(), Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Top]).await;

    let _ = backend.hold_next();
    let release = backend.hold_next();
    let runner = studio.clone();
    let run = tokio::spawn(async move { runner.run().await });
    wait_for_calls(&backend, 2).await;

    studio.select_persona(Persona::Women);
    release.send(()).unwrap();
    run.await.unwrap().unwrap();

    let state = studio.state();
    assert_eq!(state.status, WorkflowStatus::Idle);
    assert!(state.result_image.is_none());
    assert!(state.garment_description.is_none());
}

#[tokio::test]
async fn test_undecodable_upload_leaves_images_untouched() {
    let backend = Arc::new(MockBackend::new());
    let studio = studio_with(backend, Persona::Men);
    load(&studio, &[ImageRole::Person]).await;
    let before = studio.images();

    let err = studio
        .load_image(ImageRole::Person, b"GIF89a but not really".to_vec())
        .await
        .unwrap_err();
    assert_eq!(err.category(), "capture");
    assert_eq!(studio.images(), before);

    let err = studio
        .load_image_path(ImageRole::Top, "/definitely/missing/top.png")
        .await
        .unwrap_err();
    assert_eq!(err.category(), "io");
    assert!(studio.images().top.is_none());
}

#[tokio::test]
async fn test_save_result_writes_fixed_filename() {
    let backend = Arc::new(MockBackend::new());
    scripted_success(&backend);
    let studio = studio_with(backend, Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Top]).await;

    let dir = tempfile::tempdir().unwrap();
    let err = studio.save_result(dir.path()).await.unwrap_err();
    assert_eq!(err.category(), "validation");

    studio.run().await.unwrap();
    let path = studio.save_result(dir.path()).await.unwrap();

    assert_eq!(path, dir.path().join(RESULT_FILENAME));
    let written = std::fs::read(&path).unwrap();
    assert_eq!(image::guess_format(&written).unwrap(), image::ImageFormat::Png);
}

#[tokio::test]
async fn test_save_result_converts_jpeg_to_png() {
    use base64::Engine as _;

    let jpeg = studio_jpeg();
    let backend = Arc::new(MockBackend::new());
    backend.push(analysis_response(full_analysis()));
    backend.push(image_response(
        "image/jpeg",
        &base64::engine::general_purpose::STANDARD.encode(&jpeg),
    ));
    let studio = studio_with(backend, Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Top]).await;
    studio.run().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = studio.save_result(dir.path()).await.unwrap();
    let written = std::fs::read(path).unwrap();
    assert_eq!(image::guess_format(&written).unwrap(), image::ImageFormat::Png);
}

fn studio_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([90, 90, 90]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Jpeg)
        .unwrap();
    out
}

#[tokio::test]
async fn test_telemetry_report() {
    let backend = Arc::new(MockBackend::new());
    scripted_success(&backend);
    let studio = studio_with(backend, Persona::Men);
    load(&studio, &[ImageRole::Person, ImageRole::Top]).await;
    studio.run().await.unwrap();

    let report: serde_json::Value = serde_json::from_str(&studio.telemetry_json().unwrap()).unwrap();
    assert_eq!(report["persona"], "MEN");
    assert_eq!(report["view"], "result");
    assert_eq!(report["status"], "success");
    assert_eq!(report["bodySize"], "L");
    assert_eq!(report["coordinatedPiece"], "light wash denim");
    assert_eq!(report["stylingSuggestions"]["styleVibe"], "casual");
    assert_eq!(report["pipeline"].as_array().unwrap().len(), 3);
    assert_eq!(report["pipeline"][2]["status"], "done");
    assert!(report.get("resultImage").is_none());
}
