//! Common test utilities for the try-on studio tests
//!
//! Provides a scripted generative backend, a mock camera that counts open
//! streams, and small generated images.

#![allow(dead_code)]

/// Scripted `GenerativeBackend` that records every request
pub mod mock_backend {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use neural_tryon::remote::wire::{Candidate, Content, InlineData, Part};
    use neural_tryon::remote::{
        BackendError, GenerateContentRequest, GenerateContentResponse, GenerativeBackend,
    };
    use serde_json::Value;
    use tokio::sync::oneshot;

    type Scripted = Result<GenerateContentResponse, BackendError>;

    /// A recorded call: model name and request body.
    #[derive(Debug, Clone)]
    pub struct Call {
        pub model: String,
        pub request: GenerateContentRequest,
    }

    impl Call {
        /// Base64 bodies of the inline images, in request order.
        pub fn image_data(&self) -> Vec<String> {
            self.request.inline_images().map(|d| d.data.clone()).collect()
        }

        pub fn texts(&self) -> Vec<String> {
            self.request.texts().map(str::to_string).collect()
        }
    }

    #[derive(Default)]
    pub struct MockBackend {
        responses: Mutex<VecDeque<Scripted>>,
        calls: Mutex<Vec<Call>>,
        gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the response for the next call.
        pub fn push(&self, response: Scripted) -> &Self {
            self.responses.lock().unwrap().push_back(response);
            self
        }

        /// Make the next call wait until the returned sender fires (or drops).
        pub fn hold_next(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push_back(rx);
            tx
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerativeBackend for MockBackend {
        async fn generate_content(
            &self,
            model: &str,
            request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse, BackendError> {
            self.calls.lock().unwrap().push(Call {
                model: model.to_string(),
                request: request.clone(),
            });
            let gate = self.gates.lock().unwrap().pop_front();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(BackendError::Transport("no scripted response".into())))
        }
    }

    fn response(parts: Vec<Part>) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts,
                }),
                finish_reason: Some("STOP".to_string()),
            }],
            prompt_feedback: None,
        }
    }

    /// Analysis response whose text is `body` serialized.
    pub fn analysis_response(body: Value) -> Scripted {
        Ok(response(vec![Part::text(body.to_string())]))
    }

    /// A complete analysis body.
    pub fn full_analysis() -> Value {
        serde_json::json!({
            "garmentDescription": "white cotton t-shirt, short sleeves",
            "personDescription": "standing, arms relaxed, watch on left wrist",
            "bodySize": "L",
            "technicalPrompt": "short sleeves end mid-bicep; keep the watch in front",
            "stylingSuggestions": {
                "suggestedPants": "light wash denim",
                "suggestedShoes": "white sneakers",
                "styleVibe": "casual"
            }
        })
    }

    /// Synthesis response carrying one inline image.
    pub fn image_response(mime_type: &str, data_base64: &str) -> Scripted {
        Ok(response(vec![
            Part::text("here is the result"),
            Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: mime_type.to_string(),
                    data: data_base64.to_string(),
                }),
            },
        ]))
    }

    /// Synthesis response with text only.
    pub fn text_only_response() -> Scripted {
        Ok(response(vec![Part::text("I cannot render that.")]))
    }

    pub fn status_error(code: u16) -> Scripted {
        Err(BackendError::Status {
            code,
            body: "{\"error\":\"scripted\"}".to_string(),
        })
    }
}

/// Camera backend that counts open streams
pub mod mock_camera {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    use neural_tryon::capture::{CameraBackend, CameraError, CameraFrame, CameraStream};

    #[derive(Default)]
    pub struct MockCamera {
        active: Arc<AtomicUsize>,
        opened: AtomicUsize,
        deny: AtomicBool,
        shot: Arc<Shot>,
    }

    /// Lets a test hold the next snapshot inside the device call.
    #[derive(Default)]
    struct Shot {
        hold: Mutex<Option<mpsc::Receiver<()>>>,
        started: AtomicBool,
    }

    impl MockCamera {
        pub fn new() -> Self {
            Self::default()
        }

        /// Camera whose activation is always refused.
        pub fn denied() -> Self {
            let camera = Self::default();
            camera.deny.store(true, Ordering::SeqCst);
            camera
        }

        /// Streams currently open.
        pub fn active_streams(&self) -> usize {
            self.active.load(Ordering::SeqCst)
        }

        /// Streams opened over the camera's lifetime.
        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        /// Block the next snapshot until the returned sender fires.
        pub fn hold_snapshot(&self) -> mpsc::Sender<()> {
            let (tx, rx) = mpsc::channel();
            *self.shot.hold.lock().unwrap() = Some(rx);
            tx
        }

        /// Whether a snapshot has entered the device call.
        pub fn snapshot_started(&self) -> bool {
            self.shot.started.load(Ordering::SeqCst)
        }
    }

    impl CameraBackend for MockCamera {
        fn open(&self) -> Result<Box<dyn CameraStream>, CameraError> {
            if self.deny.load(Ordering::SeqCst) {
                return Err(CameraError::PermissionDenied);
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.active.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockStream {
                active: Arc::clone(&self.active),
                shot: Arc::clone(&self.shot),
                stopped: false,
            }))
        }
    }

    struct MockStream {
        active: Arc<AtomicUsize>,
        shot: Arc<Shot>,
        stopped: bool,
    }

    impl CameraStream for MockStream {
        fn snapshot(&mut self) -> Result<CameraFrame, CameraError> {
            let hold = self.shot.hold.lock().unwrap().take();
            self.shot.started.store(true, Ordering::SeqCst);
            if let Some(release) = hold {
                release.recv().ok();
            }
            Ok(CameraFrame {
                width: 12,
                height: 16,
                rgb: vec![180u8; 12 * 16 * 3],
            })
        }

        fn stop(&mut self) {
            if !self.stopped {
                self.stopped = true;
                self.active.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
}

/// Generated test images
pub mod test_images {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    /// Solid-color PNG bytes.
    pub fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .expect("encode test png");
        out
    }

    /// A tiny PNG, base64-encoded, for scripted synthesis results.
    pub fn png_base64() -> String {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD.encode(png(2, 2, [10, 200, 30]))
    }
}

/// Studio construction helpers
pub mod studio {
    use std::sync::Arc;

    use neural_tryon::{ImageRole, Persona, Studio};

    use super::mock_backend::MockBackend;
    use super::mock_camera::MockCamera;
    use super::test_images::png;

    pub fn studio_with(backend: Arc<MockBackend>, persona: Persona) -> Studio {
        Studio::builder()
            .with_backend(backend)
            .with_persona(persona)
            .build()
            .expect("studio builds with a backend")
    }

    pub fn studio_with_camera(backend: Arc<MockBackend>, camera: Arc<MockCamera>) -> Studio {
        Studio::builder()
            .with_backend(backend)
            .with_camera(camera)
            .build()
            .expect("studio builds with a backend")
    }

    /// Load a distinct solid-color image for each role.
    pub async fn load(studio: &Studio, roles: &[ImageRole]) {
        for role in roles {
            let color = match role {
                ImageRole::Person => [200, 160, 140],
                ImageRole::Top => [250, 250, 250],
                ImageRole::Bottom => [20, 40, 120],
                ImageRole::Dress => [180, 20, 60],
            };
            studio
                .load_image(*role, png(24, 32, color))
                .await
                .expect("test image loads");
        }
    }
}
